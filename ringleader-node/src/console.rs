//! Operator console: line-oriented commands dispatched to the local node.

use crate::node::RingNode;
use ringleader_core::{NodeHandle as _, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  start    initiate a leader election
  leader   print the current leader
  kill     simulate a crash of this node
  recover  revive this node and rejoin the ring
  status   print a one-line node status
  debug    print a JSON snapshot of node internals
  reset    clear election state back to idle
  help     show this help
  exit     deregister and shut down";

/// Run the command loop until `exit` or stdin closes.
pub async fn run(node: Arc<RingNode>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    println!("node {} ready; type 'help' for commands", node.uid());
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(ringleader_core::RingError::Io)?
    {
        match line.trim() {
            "" => {}
            "start" => match node.initiate_election_as(false).await {
                Ok(()) => println!("election initiated"),
                Err(e) => println!("cannot initiate election: {e}"),
            },
            "leader" => match node.leader() {
                Some(leader) if node.is_leader() => println!("leader: {leader} (this node)"),
                Some(leader) => println!("leader: {leader}"),
                None => println!("no leader elected"),
            },
            "kill" => {
                if let Err(e) = node.set_alive(false).await {
                    println!("kill failed: {e}");
                } else {
                    println!("node is now simulating a crash");
                }
            }
            "recover" => match node.recover_node().await {
                Ok(()) => println!("node recovered"),
                Err(e) => println!("recovery failed: {e}"),
            },
            "status" => println!("{}", node.status_line()),
            "debug" => match serde_json::to_string_pretty(&node.snapshot()) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("snapshot failed: {e}"),
            },
            "reset" => {
                node.reset();
                println!("election state reset");
            }
            "help" => println!("{HELP}"),
            "exit" => break,
            other => println!("unknown command {other:?}; type 'help'"),
        }
    }
    Ok(())
}
