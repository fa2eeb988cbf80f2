// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree command handlers

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::OutputFormat;
use crate::table::{Column, Table};

#[derive(Args)]
pub struct WorktreeArgs {
    #[command(subcommand)]
    pub command: WorktreeCommand,
}

#[derive(Subcommand)]
pub enum WorktreeCommand {
    /// List the worktrees owned by workers in a project
    List {
        /// Project path
        project: PathBuf,
    },
    /// Show a worktree's unified diff against a base revision
    Diff {
        /// Worktree path
        worktree: PathBuf,
        /// Base revision to diff against
        #[arg(long, default_value = "HEAD")]
        base_revision: String,
    },
}

pub async fn handle(command: WorktreeCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        WorktreeCommand::List { project } => {
            let worktrees = client.list_worktrees(project).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&worktrees)?),
                OutputFormat::Text => {
                    if worktrees.is_empty() {
                        println!("No worktrees found");
                        return Ok(());
                    }
                    let mut table = Table::new(vec![Column::left("PATH"), Column::left("BRANCH")]);
                    for w in &worktrees {
                        table.row(vec![w.path.display().to_string(), w.branch.clone()]);
                    }
                    table.render(&mut std::io::stdout());
                }
            }
        }
        WorktreeCommand::Diff { worktree, base_revision } => {
            let files = client.get_worktree_diff(worktree, base_revision).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&files)?),
                OutputFormat::Text => {
                    if files.is_empty() {
                        println!("No changes");
                        return Ok(());
                    }
                    for file in &files {
                        let marker = if file.deleted {
                            "deleted"
                        } else if file.added {
                            "added"
                        } else {
                            "modified"
                        };
                        println!("{} ({marker})", file.path.display());
                        if let Some(content) = &file.content {
                            print!("{content}");
                            if !content.ends_with('\n') {
                                println!();
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
