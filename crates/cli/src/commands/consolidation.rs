// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consolidation command handlers

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::color;
use crate::output::OutputFormat;
use crate::table::{Column, Table};

use orc_core::{ConsolidationId, Resolution, ResolutionAction, WorkerId};
use orc_daemon::ParticipantSpec;

#[derive(Args)]
pub struct ConsolidationArgs {
    #[command(subcommand)]
    pub command: ConsolidationCommand,
}

#[derive(Subcommand)]
pub enum ConsolidationCommand {
    /// Analyze the divergent work of several workers against a base revision
    Create {
        /// Project path
        project: PathBuf,
        /// Base revision every participant diverged from
        #[arg(long, default_value = "HEAD")]
        base_revision: String,
        /// A participant as `worker_id:worktree_path:branch`, repeatable
        #[arg(long = "participant", required = true, value_parser = parse_participant)]
        participants: Vec<ParticipantSpec>,
    },
    /// Apply resolutions to an analyzed consolidation, producing a merge plan
    Resolve {
        /// Consolidation id
        id: String,
        /// A resolution as `path:action[:worker]`, repeatable. Actions: merge,
        /// reject, keep-ours, keep-theirs, voting, union, manual
        #[arg(long = "resolve", required = true, value_parser = parse_resolution)]
        resolutions: Vec<Resolution>,
    },
    /// Apply a consolidation's merge plan onto a fresh checkout
    Export {
        /// Consolidation id
        id: String,
        /// Scratch checkout path to apply the plan into
        scratch_path: PathBuf,
        /// Commit message for the merge commit
        #[arg(long, default_value = "Consolidate worker changes")]
        message: String,
    },
    /// Delete a consolidation record
    Delete {
        /// Consolidation id
        id: String,
    },
    /// Show a single consolidation
    Show {
        /// Consolidation id
        id: String,
    },
    /// List all consolidations
    List {},
}

fn parse_participant(s: &str) -> Result<ParticipantSpec, String> {
    let mut parts = s.splitn(3, ':');
    let worker = parts.next().ok_or("missing worker id")?;
    let worktree = parts.next().ok_or("missing worktree path")?;
    let branch = parts.next().ok_or("missing branch")?;
    Ok(ParticipantSpec {
        worker: WorkerId::new(worker),
        worktree: PathBuf::from(worktree),
        branch: branch.to_string(),
    })
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    let mut parts = s.splitn(3, ':');
    let path = parts.next().ok_or("missing path")?;
    let action = parts.next().ok_or("missing action")?;
    let chosen_worker = parts.next().map(|w| WorkerId::new(w));
    let action = match action {
        "merge" => ResolutionAction::Merge,
        "reject" => ResolutionAction::Reject,
        "keep-ours" => ResolutionAction::KeepOurs,
        "keep-theirs" => ResolutionAction::KeepTheirs,
        "voting" => ResolutionAction::Voting,
        "union" => ResolutionAction::Union,
        "manual" => ResolutionAction::Manual,
        other => return Err(format!("unknown resolution action '{other}'")),
    };
    Ok(Resolution {
        path: PathBuf::from(path),
        action,
        chosen_worker,
        manual_content: None,
    })
}

pub async fn handle(
    command: ConsolidationCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConsolidationCommand::Create { project, base_revision, participants } => {
            let id = client.create_consolidation(project, base_revision, participants).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&id)?),
                OutputFormat::Text => println!("Consolidation created: {}", color::header(id.as_str())),
            }
        }
        ConsolidationCommand::Resolve { id, resolutions } => {
            let plan = client
                .resolve_consolidation(&ConsolidationId::new(id), resolutions)
                .await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Text => {
                    println!("Planned files ({}):", plan.files.len());
                    for f in &plan.files {
                        println!("  {} <- {}", f.path.display(), f.source_worker);
                    }
                    if !plan.rejected.is_empty() {
                        println!("Rejected files ({}):", plan.rejected.len());
                        for p in &plan.rejected {
                            println!("  {}", p.display());
                        }
                    }
                }
            }
        }
        ConsolidationCommand::Export { id, scratch_path, message } => {
            let result = client
                .export_consolidation(&ConsolidationId::new(id), scratch_path, message)
                .await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    println!("Merged {} file(s)", result.merged.len());
                    if let Some(commit) = &result.commit_id {
                        println!("Commit: {commit}");
                    }
                    for (path, reason) in &result.failed {
                        println!("Failed: {} ({reason})", path.display());
                    }
                }
            }
        }
        ConsolidationCommand::Delete { id } => {
            client.delete_consolidation(&ConsolidationId::new(id.clone())).await?;
            println!("Consolidation '{}' deleted", color::header(&id));
        }
        ConsolidationCommand::Show { id } => {
            let consolidation = client.get_consolidation(&ConsolidationId::new(id)).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&consolidation)?),
                OutputFormat::Text => {
                    println!("ID:       {}", consolidation.id);
                    println!("Project:  {}", consolidation.project.display());
                    println!("Base:     {}", consolidation.base_revision);
                    println!("Status:   {}", color::status(&consolidation.status.to_string()));
                    println!("Workers:  {}", consolidation.participants.len());
                }
            }
        }
        ConsolidationCommand::List {} => {
            let consolidations = client.list_consolidations().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&consolidations)?),
                OutputFormat::Text => {
                    if consolidations.is_empty() {
                        println!("No consolidations found");
                        return Ok(());
                    }
                    let mut table = Table::new(vec![
                        Column::left("ID"),
                        Column::left("PROJECT"),
                        Column::status("STATUS"),
                        Column::left("WORKERS"),
                    ]);
                    for c in &consolidations {
                        table.row(vec![
                            c.id.short(8).to_string(),
                            c.project.display().to_string(),
                            c.status.to_string(),
                            c.participants.len().to_string(),
                        ]);
                    }
                    table.render(&mut std::io::stdout());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "consolidation_tests.rs"]
mod tests;
