// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::str::FromStr;

#[test]
fn strategy_round_trips_through_str() {
    assert_eq!(PartitionStrategy::from_str("round-robin").unwrap(), PartitionStrategy::RoundRobin);
    assert_eq!(PartitionStrategy::from_str("hash").unwrap(), PartitionStrategy::Hash);
    assert!(PartitionStrategy::from_str("bogus").is_err());
}

#[test]
fn strategy_display_matches_wire_shape() {
    assert_eq!(PartitionStrategy::RoundRobin.to_string(), "round-robin");
    assert_eq!(PartitionStrategy::Hash.to_string(), "hash");
}

#[test]
fn descriptor_serializes_with_expected_fields() {
    let d = PartitionDescriptor {
        partition_id: PartitionId::new("p1"),
        agent_index: 0,
        partition_index: 0,
        total_partitions: 3,
        task: serde_json::json!({"name": "build"}),
    };
    let v = serde_json::to_value(&d).unwrap();
    assert_eq!(v["agent_index"], 0);
    assert_eq!(v["total_partitions"], 3);
}
