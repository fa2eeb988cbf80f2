// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier command handlers

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct BarrierArgs {
    #[command(subcommand)]
    pub command: BarrierCommand,
}

#[derive(Subcommand)]
pub enum BarrierCommand {
    /// Create a barrier and block until every participant signals or it times out
    Create {
        /// Barrier id, shared out of band with every participant
        id: String,
        /// Expected participant names, repeatable
        #[arg(long = "expect", required = true)]
        expected: Vec<String>,
        /// Timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
    },
    /// Record a participant's arrival at a barrier
    Signal {
        /// Barrier id
        id: String,
        /// Participant name
        worker: String,
    },
}

pub async fn handle(command: BarrierCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        BarrierCommand::Create { id, expected, timeout_ms } => {
            let outcome = client.create_barrier(id, expected, timeout_ms).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => println!("{outcome}"),
            }
        }
        BarrierCommand::Signal { id, worker } => {
            let completed = client.signal_barrier(id, worker).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "completed": completed }))?)
                }
                OutputFormat::Text => {
                    if completed {
                        println!("Barrier complete");
                    } else {
                        println!("Signal recorded");
                    }
                }
            }
        }
    }
    Ok(())
}
