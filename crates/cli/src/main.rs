// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! orc - multi-agent orchestrator CLI

mod client;
mod client_lifecycle;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod help;
mod output;
mod table;

use output::OutputFormat;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{barrier, consolidation, daemon, election, partition, worker, worktree};
use std::path::PathBuf;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "orc",
    version,
    disable_version_flag = true,
    about = "A multi-agent orchestrator for running and coordinating worker processes"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Worker management
    Worker(worker::WorkerArgs),
    /// Worktree management
    Worktree(worktree::WorktreeArgs),
    /// Consolidation management
    Consolidation(consolidation::ConsolidationArgs),
    /// Barrier coordination
    Barrier(barrier::BarrierArgs),
    /// Election coordination
    Election(election::ElectionArgs),
    /// Task partitioning
    Partition(partition::PartitionArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain to avoid noisy duplicate output (common when
/// thiserror variants use `#[error("... {0}")]` with `#[from]`).
/// Otherwise we render the full chain so context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    // Walk the source chain; if every source message already appears
    // in the top-level string, the chain is redundant.
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    // Non-redundant chain — render like anyhow's Debug.
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

fn cli_command() -> clap::Command {
    Cli::command()
        .help_template(help::template())
        .before_help(help::commands())
        .after_help(help::after_help())
        .styles(help::styles())
        .arg(
            clap::Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .action(clap::ArgAction::Version)
                .help("Print version"),
        )
}

async fn run() -> Result<()> {
    let matches = match cli_command().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            if e.kind() == clap::error::ErrorKind::DisplayHelp {
                // Intercept help requests → post-hoc colorized output
                let args: Vec<String> = std::env::args().collect();
                let args = strip_global_flags(&args);
                print_formatted_help(&args);
                return Ok(());
            }
            // DisplayVersion and other errors: let clap handle
            e.exit();
        }
    };
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    // Apply -C: change working directory early.
    if let Some(ref dir) = cli.directory {
        let canonical = std::fs::canonicalize(dir).map_err(|e| {
            anyhow::anyhow!("cannot change to directory '{}': {}", dir.display(), e)
        })?;
        std::env::set_current_dir(&canonical).map_err(|e| {
            anyhow::anyhow!(
                "cannot change to directory '{}': {}",
                canonical.display(),
                e
            )
        })?;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            // No subcommand provided — print colorized help and exit 0
            help::print_help(cli_command());
            return Ok(());
        }
    };

    // Handle daemon command separately (doesn't need a client connection).
    if let Commands::Daemon(args) = command {
        return daemon::daemon(args, format).await;
    }

    // Dispatch commands with appropriate client semantics:
    // - Action commands: auto-start daemon, max 1 restart (user-initiated mutations)
    // - Query commands: connect only, no restart (reads that need existing state)
    // - Signal commands: connect only, no restart (agent-initiated, context-dependent)
    match command {
        Commands::Worker(args) => match &args.command {
            worker::WorkerCommand::List { .. }
            | worker::WorkerCommand::Show { .. }
            | worker::WorkerCommand::Logs { .. }
            | worker::WorkerCommand::Stats { .. } => {
                let client = DaemonClient::for_query()?;
                worker::handle(args.command, &client, format).await?
            }
            worker::WorkerCommand::Spawn { .. } | worker::WorkerCommand::Terminate { .. } => {
                let client = DaemonClient::for_action()?;
                worker::handle(args.command, &client, format).await?
            }
        },

        Commands::Worktree(args) => {
            let client = DaemonClient::for_query()?;
            worktree::handle(args.command, &client, format).await?
        }

        Commands::Consolidation(args) => match &args.command {
            consolidation::ConsolidationCommand::Show { .. }
            | consolidation::ConsolidationCommand::List {} => {
                let client = DaemonClient::for_query()?;
                consolidation::handle(args.command, &client, format).await?
            }
            _ => {
                let client = DaemonClient::for_action()?;
                consolidation::handle(args.command, &client, format).await?
            }
        },

        // Barriers and elections are agent-initiated coordination primitives;
        // restarting the daemon mid-rendezvous would lose in-flight state.
        Commands::Barrier(args) => {
            let client = DaemonClient::for_signal()?;
            barrier::handle(args.command, &client, format).await?
        }
        Commands::Election(args) => {
            let client = DaemonClient::for_signal()?;
            election::handle(args.command, &client, format).await?
        }

        Commands::Partition(args) => {
            let client = DaemonClient::for_action()?;
            match args.command {
                partition::PartitionCommand::Split { .. } => {
                    partition::handle(args.command, &client, format).await?
                }
            }
        }

        Commands::Daemon(_) => unreachable!(),
    }

    Ok(())
}

/// Print help with post-hoc colorization, resolving the correct subcommand from args.
fn print_formatted_help(args: &[String]) {
    let cmd = cli_command();

    // Extract subcommand names from args (skip binary name and flags).
    // Handle both "orc worker --help" and "orc help worker" patterns.
    let non_flags: Vec<&String> = args
        .iter()
        .skip(1)
        .filter(|arg| !arg.starts_with('-'))
        .collect();

    let subcommand_names: Vec<&str> = if non_flags.first().map(|s| s.as_str()) == Some("help") {
        non_flags.iter().skip(1).map(|s| s.as_str()).collect()
    } else {
        non_flags.iter().map(|s| s.as_str()).collect()
    };

    let target_cmd = find_subcommand(cmd, &subcommand_names);
    help::print_help(target_cmd);
}

/// Strip `-C <value>` from args to avoid mistaking its value for a subcommand name.
fn strip_global_flags(args: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(args.len());
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "-C" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("-C") && arg.len() > 2 {
            continue;
        }
        result.push(arg.clone());
    }
    result
}

/// Recursively find a nested subcommand by name path.
pub(crate) fn find_subcommand(mut cmd: clap::Command, names: &[&str]) -> clap::Command {
    for name in names {
        let mut found_sub = None;
        for sub in cmd.get_subcommands() {
            if sub.get_name() == *name || sub.get_all_aliases().any(|a| a == *name) {
                found_sub = Some(sub.get_name().to_string());
                break;
            }
        }
        if let Some(sub_name) = found_sub {
            if let Some(sub) = cmd.find_subcommand_mut(&sub_name) {
                cmd = sub.clone();
            } else {
                break;
            }
        } else {
            break;
        }
    }
    cmd
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
