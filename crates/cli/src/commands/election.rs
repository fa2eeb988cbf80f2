// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Election command handlers

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ElectionArgs {
    #[command(subcommand)]
    pub command: ElectionCommand,
}

#[derive(Subcommand)]
pub enum ElectionCommand {
    /// Start an election and block until every candidate votes or it times out
    Start {
        /// Election id, shared out of band with every candidate
        id: String,
        /// Candidate names, repeatable
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
        /// Timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
    },
    /// Cast one vote in an in-progress election
    Vote {
        /// Election id
        id: String,
        /// Voter name
        voter: String,
        /// Candidate being voted for
        candidate: String,
    },
}

pub async fn handle(command: ElectionCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        ElectionCommand::Start { id, candidates, timeout_ms } => {
            let result = client.start_election(id, candidates, timeout_ms).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    println!("Winner: {}", result.winner);
                    for (candidate, votes) in &result.votes {
                        println!("  {candidate}: {votes} vote(s)");
                    }
                }
            }
        }
        ElectionCommand::Vote { id, voter, candidate } => {
            let resolved = client.cast_vote(id, voter, candidate).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "resolved": resolved }))?)
                }
                OutputFormat::Text => {
                    if resolved {
                        println!("Election resolved");
                    } else {
                        println!("Vote recorded");
                    }
                }
            }
        }
    }
    Ok(())
}
