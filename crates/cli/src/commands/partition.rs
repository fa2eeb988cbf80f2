// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task partitioning command handlers

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::OutputFormat;

use orc_core::PartitionStrategy;

#[derive(Args)]
pub struct PartitionArgs {
    #[command(subcommand)]
    pub command: PartitionCommand,
}

#[derive(Subcommand)]
pub enum PartitionCommand {
    /// Split a task into per-agent partitions
    Split {
        /// Path to a JSON file describing the task (use `-` for stdin)
        task_file: PathBuf,
        /// Number of agents to split the task across
        #[arg(short, long)]
        agent_count: usize,
        /// Partitioning strategy
        #[arg(long, default_value = "round-robin", value_parser = PartitionStrategy::from_str)]
        strategy: PartitionStrategy,
        /// Field in the task object used as the hash partition key (strategy=hash)
        #[arg(long, default_value = "")]
        partition_key_field: String,
    },
}

pub async fn handle(command: PartitionCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        PartitionCommand::Split { task_file, agent_count, strategy, partition_key_field } => {
            let raw = if task_file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&task_file)
                    .with_context(|| format!("failed to read {}", task_file.display()))?
            };
            let task: serde_json::Value = serde_json::from_str(&raw).context("task file is not valid JSON")?;

            let partitions = client.partition_task(task, agent_count, strategy, partition_key_field).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partitions)?),
                OutputFormat::Text => {
                    for p in &partitions {
                        println!(
                            "agent {} -> partition {} of {} ({})",
                            p.agent_index, p.partition_index, p.total_partitions, p.partition_id
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
