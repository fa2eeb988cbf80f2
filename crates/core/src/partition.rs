// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure task-partitioning strategies (§4.E Partitioner).

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a partition instance.
    pub struct PartitionId;
}

/// Supported partitioning strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionStrategy {
    RoundRobin,
    Hash,
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionStrategy::RoundRobin => write!(f, "round-robin"),
            PartitionStrategy::Hash => write!(f, "hash"),
        }
    }
}

impl std::str::FromStr for PartitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(PartitionStrategy::RoundRobin),
            "hash" => Ok(PartitionStrategy::Hash),
            other => Err(format!("unknown partition strategy: {other}")),
        }
    }
}

/// One assigned slice of a task, handed to a single agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub partition_id: PartitionId,
    pub agent_index: usize,
    pub partition_index: usize,
    pub total_partitions: usize,
    pub task: serde_json::Value,
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;
