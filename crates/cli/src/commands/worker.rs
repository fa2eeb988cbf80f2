// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker command handlers

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::color;
use crate::output::OutputFormat;
use crate::table::{project_cell, should_show_project, Column, Table};

use orc_core::{WorkerId, WorkerStatus};

#[derive(Args)]
pub struct WorkerArgs {
    #[command(subcommand)]
    pub command: WorkerCommand,
}

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Spawn one or more workers from a template
    Spawn {
        /// Project path to spawn workers in
        project: PathBuf,
        /// Worker name (suffixed with -0, -1, ... when count > 1)
        name: String,
        /// Worker kind/persona
        #[arg(long, default_value = "default")]
        kind: String,
        /// Task description handed to the worker
        #[arg(long)]
        task: Option<String>,
        /// Base revision to branch the worktree from
        #[arg(long, default_value = "HEAD")]
        base_revision: String,
        /// Custom branch name (defaults to a generated one)
        #[arg(long)]
        branch: Option<String>,
        /// Number of workers to spawn (1-10)
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=10))]
        count: u32,
    },
    /// Terminate a worker by id (idempotent)
    Terminate {
        /// Worker id
        id: String,
    },
    /// List workers
    List {
        /// Filter by status (pending, active, terminating, completed, failed)
        #[arg(long)]
        status: Option<String>,
        /// Filter by project path
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Show a single worker's record
    Show {
        /// Worker id
        id: String,
    },
    /// View a worker's activity log
    Logs {
        /// Worker id
        id: String,
        /// Line offset to start from
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "200")]
        count: usize,
    },
    /// Show a worker's resource stats (CPU, memory)
    Stats {
        /// Worker id
        id: String,
    },
}

fn parse_status(s: &str) -> Result<WorkerStatus> {
    match s {
        "pending" => Ok(WorkerStatus::Pending),
        "active" => Ok(WorkerStatus::Active),
        "terminating" => Ok(WorkerStatus::Terminating),
        "completed" => Ok(WorkerStatus::Completed),
        "failed" => Ok(WorkerStatus::Failed),
        other => anyhow::bail!("unknown worker status '{other}'"),
    }
}

pub async fn handle(command: WorkerCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        WorkerCommand::Spawn { project, name, kind, task, base_revision, branch, count } => {
            let ids = client
                .spawn_workers(project, name, kind, task, base_revision, branch, count)
                .await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
                OutputFormat::Text => {
                    for id in &ids {
                        println!("Worker spawned: {}", color::header(id.as_str()));
                    }
                }
            }
        }
        WorkerCommand::Terminate { id } => {
            client.terminate_worker(&WorkerId::new(id.clone())).await?;
            println!("Worker '{}' terminated", color::header(&id));
        }
        WorkerCommand::List { status, project } => {
            let status = status.map(|s| parse_status(&s)).transpose()?;
            let mut workers = client.list_workers(status, project).await?;
            workers.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&workers)?),
                OutputFormat::Text => {
                    if workers.is_empty() {
                        println!("No workers found");
                        return Ok(());
                    }
                    let projects: Vec<String> =
                        workers.iter().map(|w| w.project.display().to_string()).collect();
                    let show_project = should_show_project(projects.iter().map(|s| s.as_str()));

                    let mut cols = vec![Column::left("ID"), Column::left("NAME")];
                    if show_project {
                        cols.push(Column::left("PROJECT"));
                    }
                    cols.extend([Column::status("STATUS"), Column::left("BRANCH")]);
                    let mut table = Table::new(cols);

                    for w in &workers {
                        let mut cells = vec![w.id.short(8).to_string(), w.name.clone()];
                        if show_project {
                            cells.push(project_cell(&w.project.display().to_string()));
                        }
                        cells.extend([w.status.to_string(), w.branch.clone()]);
                        table.row(cells);
                    }
                    table.render(&mut std::io::stdout());
                }
            }
        }
        WorkerCommand::Show { id } => {
            let worker = client.get_worker(&WorkerId::new(id)).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&worker)?),
                OutputFormat::Text => {
                    println!("ID:          {}", worker.id);
                    println!("Name:        {}", worker.name);
                    println!("Kind:        {}", worker.kind);
                    println!("Status:      {}", color::status(&worker.status.to_string()));
                    println!("Project:     {}", worker.project.display());
                    println!("Worktree:    {}", worker.worktree_path.display());
                    println!("Branch:      {}", worker.branch);
                    println!("Base rev:    {}", worker.base_revision);
                }
            }
        }
        WorkerCommand::Logs { id, offset, count } => {
            let lines = client.get_worker_logs(&WorkerId::new(id.clone()), offset, count).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
                OutputFormat::Text => {
                    if lines.is_empty() {
                        eprintln!("No log entries found for worker {id}");
                    }
                    for line in &lines {
                        println!("[{:?}] {}", line.stream, line.data);
                    }
                }
            }
        }
        WorkerCommand::Stats { id } => {
            let stats = client.get_worker_stats(&WorkerId::new(id)).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Text => {
                    println!("Memory (current): {} MB", stats.current_memory_bytes / 1_000_000);
                    println!("Memory (peak):    {} MB", stats.peak_memory_bytes / 1_000_000);
                    println!("CPU ticks:         {}", stats.current_cpu_ticks_delta);
                    println!("Uptime:            {} ms", stats.uptime_ms);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
