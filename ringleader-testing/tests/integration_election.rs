//! End-to-end election scenarios over an in-process ring.

use ringleader_core::{NodeUid, RingError};
use ringleader_node::ElectionState;
use ringleader_testing::TestCluster;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

#[tokio::test]
async fn four_node_clean_election() {
    init_logging();
    let cluster = TestCluster::start(&[2, 5, 7, 11]).await.unwrap();

    // Registration alone produced the sorted ring.
    assert_eq!(
        cluster.successors(),
        vec![(2, 5), (5, 7), (7, 11), (11, 2)]
    );

    cluster.node(5).initiate_election_as(false).await.unwrap();

    assert!(cluster.wait_for_leader(11, DEADLINE).await);
    for node in cluster.nodes() {
        assert_eq!(node.leader(), Some(NodeUid::new(11)));
        assert_eq!(node.election_state(), ElectionState::LeaderAnnounced);
        assert_eq!(node.is_leader(), node.uid() == NodeUid::new(11));
    }
    assert!(!cluster.registrar.election_in_progress());
    cluster.shutdown();
}

#[tokio::test]
async fn maximum_uid_initiator_wins_in_a_single_lap() {
    init_logging();
    let cluster = TestCluster::start(&[2, 5, 7, 11]).await.unwrap();

    cluster.node(11).initiate_election_as(false).await.unwrap();

    assert!(cluster.wait_for_leader(11, DEADLINE).await);
    assert!(cluster.node(11).is_leader());
    cluster.shutdown();
}

#[tokio::test]
async fn two_node_ring_elects_the_larger() {
    init_logging();
    let cluster = TestCluster::start(&[3, 8]).await.unwrap();

    assert_eq!(cluster.successors(), vec![(3, 8), (8, 3)]);

    cluster.node(3).initiate_election_as(false).await.unwrap();

    assert!(cluster.wait_for_leader(8, DEADLINE).await);
    assert!(cluster.node(8).is_leader());
    assert!(!cluster.node(3).is_leader());
    cluster.shutdown();
}

#[tokio::test]
async fn concurrent_initiators_converge_on_one_leader() {
    init_logging();
    let cluster = TestCluster::start(&[3, 8]).await.unwrap();

    let low = cluster.node(3);
    let high = cluster.node(8);
    let (a, b) = tokio::join!(
        low.initiate_election_as(false),
        high.initiate_election_as(false)
    );
    a.unwrap();
    b.unwrap();

    assert!(cluster.wait_for_leader(8, DEADLINE).await);
    let leaders: Vec<_> = cluster.nodes().iter().filter(|n| n.is_leader()).collect();
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].uid(), NodeUid::new(8));
    cluster.shutdown();
}

#[tokio::test]
async fn single_node_has_no_ring_to_elect_over() {
    init_logging();
    let cluster = TestCluster::start(&[5]).await.unwrap();

    assert!(cluster.successors().is_empty());
    let err = cluster
        .node(5)
        .initiate_election_as(false)
        .await
        .unwrap_err();
    assert!(matches!(err, RingError::NoSuccessor { uid } if uid == NodeUid::new(5)));
    cluster.shutdown();
}

#[tokio::test]
async fn initiation_is_rejected_while_leader_is_valid() {
    init_logging();
    let cluster = TestCluster::start(&[2, 5]).await.unwrap();

    cluster.node(2).initiate_election_as(false).await.unwrap();
    assert!(cluster.wait_for_leader(5, DEADLINE).await);

    // A second operator start is a logged no-op: no new election opens at
    // the registrar.
    cluster.node(2).initiate_election_as(false).await.unwrap();
    assert!(!cluster.registrar.election_in_progress());
    assert_eq!(cluster.node(2).leader(), Some(NodeUid::new(5)));
    cluster.shutdown();
}
