//! Fetch, merge and rebuild a working copy from a chosen remote branch.
//!
//! Reads `.updater/config.toml` (or `--config`) once per command, so every
//! step of a run sees the same settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use updater::core::outcome::describe_build;
use updater::error::BuildError;
use updater::exit_codes;
use updater::io::config::{DEFAULT_CONFIG_PATH, Settings, UpdaterConfig, load_config, write_config};
use updater::io::console::{FixedConfirm, PromptConfirm};
use updater::logging;
use updater::orchestrator::Confirm;
use updater::update::{list_branches, run_build, run_update};

#[derive(Parser)]
#[command(
    name = "updater",
    version,
    about = "Fetch, merge and rebuild a working copy from a remote branch"
)]
struct Cli {
    /// Config file to read settings from.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Debug logging for the updater (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the current branch and the remote branches available to merge.
    Branches {
        #[arg(long)]
        json: bool,
    },
    /// Fetch, pull BRANCH from origin, abort on failure, then offer a release build.
    Merge {
        branch: String,
        /// Do not ask; merge and build.
        #[arg(short, long)]
        yes: bool,
        /// Merge only; never start the build.
        #[arg(long)]
        no_build: bool,
        #[arg(long)]
        json: bool,
    },
    /// Run the release build without merging.
    Build {
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Branches { json } => cmd_branches(&load_settings(&cli.config)?, json),
        Command::Merge {
            branch,
            yes,
            no_build,
            json,
        } => cmd_merge(&load_settings(&cli.config)?, &branch, yes, no_build, json),
        Command::Build { json } => cmd_build(&load_settings(&cli.config)?, json),
    }
}

fn load_settings(config_path: &Path) -> Result<Settings> {
    let cfg = load_config(config_path)?;
    let cwd = std::env::current_dir().context("read current directory")?;
    Ok(cfg.snapshot(&cwd))
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &UpdaterConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

#[derive(Serialize)]
struct BranchesView {
    current: Option<String>,
    candidates: Vec<String>,
}

fn cmd_branches(settings: &Settings, json: bool) -> Result<i32> {
    let listing = list_branches(settings)?;
    let view = BranchesView {
        candidates: listing.candidates(),
        current: listing.current,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(exit_codes::OK);
    }
    println!(
        "Current branch: {}",
        view.current.as_deref().unwrap_or("(unknown)")
    );
    if view.candidates.is_empty() {
        println!("No other branches to merge.");
    }
    for name in &view.candidates {
        println!("  {name}");
    }
    Ok(exit_codes::OK)
}

fn cmd_merge(
    settings: &Settings,
    branch: &str,
    yes: bool,
    no_build: bool,
    json: bool,
) -> Result<i32> {
    if !yes {
        let prompt = format!("Do you want to attempt to merge the branch \"{branch}\"?");
        if !PromptConfirm::stdio().confirm(&prompt) {
            println!("Merge cancelled.");
            return Ok(exit_codes::OK);
        }
    }

    let mut confirm: Box<dyn Confirm> = if no_build {
        Box::new(FixedConfirm(false))
    } else if yes {
        Box::new(FixedConfirm(true))
    } else {
        Box::new(PromptConfirm::stdio())
    };
    let outcome = run_update(settings, branch, confirm.as_mut())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
    } else if outcome.is_success() {
        println!("{}", outcome.message());
    } else {
        eprintln!("{}", outcome.message());
    }
    Ok(outcome.exit_code())
}

fn cmd_build(settings: &Settings, json: bool) -> Result<i32> {
    let (code, state, message) = match run_build(settings)? {
        Ok(report) if report.success() => (exit_codes::OK, "build_succeeded", describe_build(&report)),
        Ok(report) => (exit_codes::BUILD_FAILED, "build_failed", describe_build(&report)),
        Err(err @ BuildError::ToolchainMissing { .. }) => {
            (exit_codes::TOOL_MISSING, "toolchain_missing", err.to_string())
        }
        Err(err @ BuildError::Interrupted(_)) => {
            (exit_codes::BUILD_FAILED, "build_interrupted", err.to_string())
        }
    };
    if json {
        let view = json!({ "state": state, "success": code == exit_codes::OK, "message": message });
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else if code == exit_codes::OK {
        println!("{message}");
    } else {
        eprintln!("{message}");
    }
    Ok(code)
}
