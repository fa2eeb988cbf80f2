// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::{FakeClock, SequentialIdGen};
use std::time::Duration;

type TestCoordinator = Coordinator<SequentialIdGen>;

fn build() -> Arc<TestCoordinator> {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    Coordinator::new(EventBus::new(), clock, SequentialIdGen::new("c"))
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn barrier_completes_once_every_participant_signals() {
    let coordinator = build();

    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .create_barrier(set(&["w1", "w2"]), Duration::from_secs(5))
            .await
    });

    // Give create_barrier a chance to register before signaling.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let barrier_id = coordinator
        .barriers
        .lock()
        .keys()
        .next()
        .cloned()
        .expect("barrier registered");

    assert!(!coordinator.signal_barrier(&barrier_id, "w1").unwrap());
    assert!(coordinator.signal_barrier(&barrier_id, "w2").unwrap());

    let outcome = wait.await.unwrap();
    assert_eq!(outcome, BarrierOutcome::Complete);
}

#[tokio::test]
async fn barrier_signal_is_idempotent() {
    let coordinator = build();
    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .create_barrier(set(&["w1"]), Duration::from_secs(5))
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let barrier_id = coordinator.barriers.lock().keys().next().cloned().unwrap();

    assert!(coordinator.signal_barrier(&barrier_id, "w1").unwrap());
    assert!(!coordinator.signal_barrier(&barrier_id, "w1").unwrap());

    assert_eq!(wait.await.unwrap(), BarrierOutcome::Complete);
}

#[tokio::test]
async fn barrier_times_out_when_not_satisfied() {
    let coordinator = build();
    let outcome = coordinator
        .create_barrier(set(&["w1", "w2"]), Duration::from_millis(20))
        .await;
    assert_eq!(outcome, BarrierOutcome::Timeout);
}

#[tokio::test]
async fn signal_unknown_barrier_returns_not_found() {
    let coordinator = build();
    let err = coordinator
        .signal_barrier(&BarrierId::new("ghost"), "w1")
        .unwrap_err();
    assert!(matches!(err, OrcError::NotFound(_)));
}

#[tokio::test]
async fn election_resolves_early_once_every_candidate_votes() {
    let coordinator = build();
    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .conduct_election(set(&["a", "b"]), Duration::from_secs(5))
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let election_id = coordinator.elections.lock().keys().next().cloned().unwrap();

    assert!(!coordinator.cast_vote(&election_id, "v1", "a").unwrap());
    assert!(coordinator.cast_vote(&election_id, "v2", "a").unwrap());

    let result = wait.await.unwrap();
    assert_eq!(result.winner, "a");
}

#[tokio::test]
async fn election_ties_break_on_lexicographically_smallest_candidate() {
    let coordinator = build();
    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .conduct_election(set(&["b", "a"]), Duration::from_secs(5))
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let election_id = coordinator.elections.lock().keys().next().cloned().unwrap();

    assert!(!coordinator.cast_vote(&election_id, "v1", "a").unwrap());
    assert!(coordinator.cast_vote(&election_id, "v2", "b").unwrap());

    let result = wait.await.unwrap();
    assert_eq!(result.winner, "a");
}

#[tokio::test]
async fn election_times_out_and_resolves_with_partial_votes() {
    let coordinator = build();
    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .conduct_election(set(&["a", "b", "c"]), Duration::from_millis(20))
            .await
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let election_id = coordinator.elections.lock().keys().next().cloned().unwrap();
    coordinator.cast_vote(&election_id, "v1", "b").unwrap();

    let result = wait.await.unwrap();
    assert_eq!(result.winner, "b");
}

#[tokio::test]
async fn cast_vote_rejects_a_repeat_voter() {
    let coordinator = build();
    let coordinator2 = Arc::clone(&coordinator);
    let wait = tokio::spawn(async move {
        coordinator2
            .conduct_election(set(&["a", "b"]), Duration::from_millis(50))
            .await
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let election_id = coordinator.elections.lock().keys().next().cloned().unwrap();
    coordinator.cast_vote(&election_id, "v1", "a").unwrap();
    let err = coordinator.cast_vote(&election_id, "v1", "b").unwrap_err();
    assert!(matches!(err, OrcError::Conflict(_)));

    wait.await.unwrap();
}

#[test]
fn partition_round_robin_assigns_each_agent_its_own_slot() {
    let coordinator_clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let coordinator = Coordinator::new(EventBus::new(), coordinator_clock, SequentialIdGen::new("p"));
    let task = serde_json::json!({"kind": "review"});
    let descriptors = coordinator.partition_task(&task, 4, PartitionStrategy::RoundRobin, "partition_key");

    assert_eq!(descriptors.len(), 4);
    let mut agent_indices: Vec<usize> = descriptors.iter().map(|d| d.agent_index).collect();
    agent_indices.sort_unstable();
    assert_eq!(agent_indices, vec![0, 1, 2, 3]);
    for (i, d) in descriptors.iter().enumerate() {
        assert_eq!(d.partition_index, i);
        assert_eq!(d.total_partitions, 4);
        assert_eq!(d.task["partitionIndex"], i);
        assert_eq!(d.task["totalPartitions"], 4);
    }
}

#[test]
fn partition_hash_is_deterministic_for_the_same_key() {
    let coordinator_clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let coordinator = Coordinator::new(EventBus::new(), coordinator_clock, SequentialIdGen::new("p"));
    let task = serde_json::json!({"partition_key": "shard-7"});

    let first = coordinator.partition_task(&task, 5, PartitionStrategy::Hash, "partition_key");
    let second = coordinator.partition_task(&task, 5, PartitionStrategy::Hash, "partition_key");

    let first_assignment: Vec<usize> = first.iter().map(|d| d.agent_index).collect();
    let second_assignment: Vec<usize> = second.iter().map(|d| d.agent_index).collect();
    assert_eq!(first_assignment, second_assignment);
}

#[test]
fn partition_hash_falls_back_to_round_robin_without_a_key() {
    let coordinator_clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let coordinator = Coordinator::new(EventBus::new(), coordinator_clock, SequentialIdGen::new("p"));
    let task = serde_json::json!({});

    let hashed = coordinator.partition_task(&task, 3, PartitionStrategy::Hash, "partition_key");
    let round_robin = coordinator.partition_task(&task, 3, PartitionStrategy::RoundRobin, "partition_key");

    let hashed_assignment: Vec<usize> = hashed.iter().map(|d| d.agent_index).collect();
    let rr_assignment: Vec<usize> = round_robin.iter().map(|d| d.agent_index).collect();
    assert_eq!(hashed_assignment, rr_assignment);
}
