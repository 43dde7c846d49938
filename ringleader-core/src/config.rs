//! Runtime configuration for registrar and node processes.

use std::time::Duration;

/// Tunable timings and budgets for the election protocol and transport.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Host of the process-wide name registry
    pub registry_host: String,
    /// Port of the process-wide name registry
    pub registry_port: u16,
    /// How long an initiator waits for its election round to complete
    pub election_timeout: Duration,
    /// Period of the failure detector's leader probe
    pub heartbeat_interval: Duration,
    /// Maximum local election attempts before surfacing failure
    pub max_rounds: u32,
    /// Simulated link latency prefixed to each forwarded hop
    pub network_delay: Duration,
    /// Bounded retry budget per outbound message
    pub forward_retries: u32,
    /// Spacing between forwarding retries
    pub retry_delay: Duration,
    /// Timeout for establishing an RPC connection
    pub connect_timeout: Duration,
    /// Timeout for a single request/response exchange
    pub call_timeout: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            registry_host: "127.0.0.1".to_string(),
            registry_port: 1099,
            election_timeout: Duration::from_millis(60_000),
            heartbeat_interval: Duration::from_millis(5_000),
            max_rounds: 5,
            network_delay: Duration::from_millis(500),
            forward_retries: 15,
            retry_delay: Duration::from_millis(1_500),
            connect_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl RingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads configuration from `RINGLEADER_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    ///
    /// Recognized: `RINGLEADER_REGISTRY_HOST`, `RINGLEADER_REGISTRY_PORT`,
    /// `RINGLEADER_ELECTION_TIMEOUT_MS`, `RINGLEADER_HEARTBEAT_INTERVAL_MS`,
    /// `RINGLEADER_MAX_ROUNDS`, `RINGLEADER_NETWORK_DELAY_MS`,
    /// `RINGLEADER_FORWARD_RETRIES`, `RINGLEADER_RETRY_DELAY_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("RINGLEADER_REGISTRY_HOST") {
            if !host.is_empty() {
                config.registry_host = host;
            }
        }
        if let Some(port) = env_parse::<u16>("RINGLEADER_REGISTRY_PORT") {
            config.registry_port = port;
        }
        if let Some(ms) = env_parse::<u64>("RINGLEADER_ELECTION_TIMEOUT_MS") {
            config.election_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("RINGLEADER_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(rounds) = env_parse::<u32>("RINGLEADER_MAX_ROUNDS") {
            config.max_rounds = rounds;
        }
        if let Some(ms) = env_parse::<u64>("RINGLEADER_NETWORK_DELAY_MS") {
            config.network_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = env_parse::<u32>("RINGLEADER_FORWARD_RETRIES") {
            config.forward_retries = retries;
        }
        if let Some(ms) = env_parse::<u64>("RINGLEADER_RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(ms);
        }

        config
    }

    pub fn with_registry(mut self, host: impl Into<String>, port: u16) -> Self {
        self.registry_host = host.into();
        self.registry_port = port;
        self
    }

    pub fn with_election_timeout(mut self, timeout: Duration) -> Self {
        self.election_timeout = timeout;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_network_delay(mut self, delay: Duration) -> Self {
        self.network_delay = delay;
        self
    }

    pub fn with_forward_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.forward_retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Registry endpoint as a `host:port` string.
    pub fn registry_endpoint(&self) -> String {
        format!("{}:{}", self.registry_host, self.registry_port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
