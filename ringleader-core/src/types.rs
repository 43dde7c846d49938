//! # Core Types
//!
//! Fundamental types used throughout the Ringleader election protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the ring.
///
/// Every node participating in an election holds a positive integer UID,
/// fixed for the lifetime of the process. UIDs drive both ring ordering
/// (ascending, wrapping from largest back to smallest) and the election
/// outcome (the largest live UID wins).
///
/// # Examples
///
/// ```rust
/// use ringleader_core::NodeUid;
///
/// let a = NodeUid::new(5);
/// let b = NodeUid::new(11);
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeUid(pub u32);

impl NodeUid {
    /// Creates a node UID from its numeric value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the numeric value of this UID.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeUid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry name under which a node binds its endpoint.
pub fn node_name(uid: NodeUid) -> String {
    format!("node-{}", uid)
}

/// Registry name under which the registrar binds its endpoint.
pub const REGISTRAR_NAME: &str = "registrar";

/// Computes successor assignments for a set of live nodes.
///
/// The ring is a single cycle ordered by ascending UID: each node's
/// successor is the next-larger live UID, and the largest wraps to the
/// smallest. Returns one `(node, successor)` pair per live node, in ring
/// order. Duplicates in the input are collapsed.
///
/// Returns an empty vector when fewer than two nodes are given; a ring
/// needs at least two members.
///
/// # Examples
///
/// ```rust
/// use ringleader_core::{ring_order, NodeUid};
///
/// let live = vec![NodeUid::new(7), NodeUid::new(2), NodeUid::new(11)];
/// let ring = ring_order(&live);
/// assert_eq!(ring[0], (NodeUid::new(2), NodeUid::new(7)));
/// assert_eq!(ring[2], (NodeUid::new(11), NodeUid::new(2)));
/// ```
pub fn ring_order(live: &[NodeUid]) -> Vec<(NodeUid, NodeUid)> {
    let mut sorted: Vec<NodeUid> = live.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.len() < 2 {
        return Vec::new();
    }

    let n = sorted.len();
    sorted
        .iter()
        .enumerate()
        .map(|(i, &uid)| (uid, sorted[(i + 1) % n]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ring_order_sorts_and_wraps() {
        let live = vec![NodeUid::new(11), NodeUid::new(2), NodeUid::new(7), NodeUid::new(5)];
        let ring = ring_order(&live);

        assert_eq!(
            ring,
            vec![
                (NodeUid::new(2), NodeUid::new(5)),
                (NodeUid::new(5), NodeUid::new(7)),
                (NodeUid::new(7), NodeUid::new(11)),
                (NodeUid::new(11), NodeUid::new(2)),
            ]
        );
    }

    #[test]
    fn ring_order_two_nodes_is_a_two_cycle() {
        let ring = ring_order(&[NodeUid::new(8), NodeUid::new(3)]);
        assert_eq!(
            ring,
            vec![
                (NodeUid::new(3), NodeUid::new(8)),
                (NodeUid::new(8), NodeUid::new(3)),
            ]
        );
    }

    #[test]
    fn ring_order_rejects_single_node() {
        assert!(ring_order(&[NodeUid::new(5)]).is_empty());
        assert!(ring_order(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn ring_is_a_single_ascending_cycle(uids in proptest::collection::hash_set(1u32..10_000, 2..64)) {
            let live: Vec<NodeUid> = uids.iter().copied().map(NodeUid::new).collect();
            let ring = ring_order(&live);

            prop_assert_eq!(ring.len(), uids.len());

            // Every node's successor is the next-larger live UID, wrapping once.
            let mut sorted: Vec<u32> = uids.into_iter().collect();
            sorted.sort_unstable();
            for (i, &(node, succ)) in ring.iter().enumerate() {
                prop_assert_eq!(node.value(), sorted[i]);
                prop_assert_eq!(succ.value(), sorted[(i + 1) % sorted.len()]);
            }

            // Walking successors visits every node exactly once before closing.
            let mut seen = std::collections::HashSet::new();
            let mut cursor = ring[0].0;
            for _ in 0..ring.len() {
                prop_assert!(seen.insert(cursor));
                cursor = ring.iter().find(|(n, _)| *n == cursor).unwrap().1;
            }
            prop_assert_eq!(cursor, ring[0].0);
        }
    }
}
