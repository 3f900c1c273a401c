//! sync-agent: Push and pull data snapshots to a WebDAV store.
//!
//! # Usage
//!
//! ```bash
//! # Archive /srv/app/data and upload it, keeping the newest 5 snapshots
//! sync-agent push https://dav.example.com/dav alice s3cret backups/app /srv/app/data
//!
//! # Restore the newest snapshot over /srv/app/data
//! sync-agent pull https://dav.example.com/dav alice s3cret backups/app /srv/app/data
//! ```
//!
//! Exit codes: 0 on upload, restore or nothing to archive; 3 when there is
//! nothing to restore; 1 on failure; 2 on usage errors.
//!
//! A first pull against an empty store exits 3, which a `set -e` script
//! treats as fatal. Accept it explicitly where starting fresh is fine:
//!
//! ```bash
//! sync-agent pull "$URL" "$USER" "$PASS" backups/app /srv/app/data || [ $? -eq 3 ]
//! ```

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use sync_agent::{
    Agent, AgentConfig, AgentError, ConnectionDescriptor, PullOutcome, PushOutcome, SyncTarget,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_NOTHING_TO_RESTORE: i32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Archive the local path and upload it
    Push,
    /// Restore the newest snapshot over the local path
    Pull,
}

/// Push and pull data snapshots to a WebDAV store.
///
/// Snapshots are `.tar.gz` archives named `<prefix><YYYYMMDD_HHMMSS>.tar.gz`.
/// A push keeps only the newest snapshots; a pull restores the newest one.
#[derive(Parser, Debug)]
#[command(name = "sync-agent")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Exit codes: 0 done, 1 failed, 2 usage error, \
3 pull found nothing to restore. Under `set -e`, allow code 3 with `|| [ $? -eq 3 ]`.")]
struct Args {
    /// Operation to run
    #[arg(value_enum)]
    action: Action,

    /// WebDAV base URL
    base_url: String,

    /// WebDAV user name (empty for anonymous access)
    username: String,

    /// WebDAV password (empty for anonymous access)
    password: String,

    /// Remote directory below the base URL (`/` for the base itself)
    remote_dir: String,

    /// Local data directory
    local_path: PathBuf,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of snapshots to keep
    #[arg(long, value_name = "N")]
    max_backups: Option<usize>,

    /// Directory name to leave out of archives; replaces the configured list
    #[arg(long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Where archives are built and snapshots downloaded
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,

    /// Push repeatedly, pausing this many seconds between runs (push only)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct FailureReport<'a> {
    outcome: &'static str,
    kind: &'static str,
    error: &'a str,
}

/// Reject flag combinations clap cannot express on its own.
fn check_usage(args: &Args) -> Result<(), clap::Error> {
    if args.action == Action::Pull && args.interval.is_some() {
        return Err(Args::command().error(
            ErrorKind::ArgumentConflict,
            "--interval only applies to push",
        ));
    }
    Ok(())
}

fn pull_exit_code(outcome: &PullOutcome) -> i32 {
    match outcome {
        PullOutcome::Restored { .. } => 0,
        PullOutcome::NothingToRestore => EXIT_NOTHING_TO_RESTORE,
    }
}

fn load_config(args: &Args) -> anyhow::Result<AgentConfig> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AgentConfig::default(),
    };

    if let Some(max_backups) = args.max_backups {
        config.max_backups = max_backups;
    }
    if !args.exclude.is_empty() {
        config.exclude_dirs = args.exclude.clone();
    }
    if let Some(dir) = &args.scratch_dir {
        config.scratch_dir = dir.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize outcome: {}", e),
    }
}

fn fail(args: &Args, err: &AgentError) -> ! {
    if args.json {
        print_json(&FailureReport {
            outcome: "failed",
            kind: err.kind(),
            error: &err.to_string(),
        });
    }
    process::exit(EXIT_FAILURE);
}

fn main() {
    let args = Args::parse();
    if let Err(e) = check_usage(&args) {
        e.exit();
    }

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    let agent = match Agent::new(config) {
        Ok(a) => a,
        Err(e) => {
            error!("{}", e);
            fail(&args, &e);
        }
    };

    let target = match SyncTarget::new(&args.remote_dir, &args.local_path) {
        Ok(t) => t,
        Err(e) => {
            error!("{}", e);
            fail(&args, &e);
        }
    };

    let descriptor = ConnectionDescriptor::new(&args.base_url, &args.username, &args.password);

    match args.action {
        Action::Push => {
            if let Some(secs) = args.interval {
                info!("Pushing every {} seconds", secs);
                if let Err(e) =
                    agent.run_periodic(&descriptor, &target, Duration::from_secs(secs), None)
                {
                    error!("{}", e);
                    fail(&args, &e);
                }
                return;
            }

            match agent.push(&descriptor, &target) {
                Ok(outcome) => {
                    if args.json {
                        print_json(&outcome);
                    }
                    if let PushOutcome::Uploaded {
                        retention: Some(report),
                        ..
                    } = &outcome
                    {
                        if !report.is_clean() {
                            info!(
                                "{} old snapshots could not be deleted",
                                report.failed.len()
                            );
                        }
                    }
                }
                Err(e) => fail(&args, &e),
            }
        }
        Action::Pull => match agent.pull(&descriptor, &target) {
            Ok(outcome) => {
                if args.json {
                    print_json(&outcome);
                }
                let code = pull_exit_code(&outcome);
                if code != 0 {
                    process::exit(code);
                }
            }
            Err(e) => fail(&args, &e),
        },
    }
}
