//! migtrack: branch-aware migration tracking and recovery.

mod prompt;

use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use migtrack_recovery::RecoveryAnalyzer;
use migtrack_tracker::{
    env_forces_non_interactive, recover, rollback_orphaned, rollback_specific, run_ci, status, BatchSession,
    OutputFormat, Strictness, TrackerConfig, Workspace,
};
use migtrack_types::{RecoveryAction, Timestamp};
use migtrack_utils::{init_logging, LogFormat};

use crate::prompt::PromptOperator;

/// Looked up in the repository root when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "migtrack.toml";

#[derive(Parser)]
#[command(name = "migtrack", about = "Track migrations across branches and recover diverged ledgers")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "MIGTRACK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Root of the git working tree.
    #[arg(long, env = "MIGTRACK_REPO_ROOT", global = true)]
    repo_root: Option<PathBuf>,

    /// Migration directory, relative to the repository root.
    #[arg(long, env = "MIGTRACK_MIGRATIONS_DIR", global = true)]
    migrations_dir: Option<String>,

    /// Trunk branch.
    #[arg(long, env = "MIGTRACK_MAIN_BRANCH", global = true)]
    main_branch: Option<String>,

    /// Authoritative branches (comma-separated). Defaults to the trunk.
    #[arg(long, env = "MIGTRACK_TARGET_BRANCHES", value_delimiter = ',', global = true)]
    target_branches: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MIGTRACK_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MIGTRACK_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    /// Never prompt; take each issue's first recovery option.
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show orphaned and missing migrations for the current branch.
    Status {
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Run every script the schema ledger has not recorded.
    Migrate,
    /// Roll back every applied migration that no target branch contains.
    #[command(name = "rollback-orphaned", alias = "rollback_orphaned")]
    RollbackOrphaned,
    /// Roll back one tracked migration.
    #[command(name = "rollback-specific", alias = "rollback_specific")]
    RollbackSpecific {
        /// Version prefix of the migration.
        version: String,
    },
    /// Analyze both ledgers and list the issues found.
    Analyze,
    /// Analyze, then recover issue by issue.
    Recover {
        /// Run this action on every issue that accepts it.
        #[arg(long)]
        action: Option<RecoveryAction>,
    },
    /// Check the environment migtrack depends on.
    Doctor,
    /// One-shot verdict for CI pipelines.
    Ci {
        #[arg(long, default_value = "text")]
        format: OutputFormat,
        #[arg(long, default_value = "warning")]
        strictness: Strictness,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<TrackerConfig> {
    let root = cli.repo_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let implicit = root.join(DEFAULT_CONFIG_FILE);
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => implicit.exists().then_some(implicit),
    };
    let mut config = match &path {
        Some(path) => TrackerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    if let Some(repo_root) = &cli.repo_root {
        config.repo_root = repo_root.clone();
    }
    if let Some(dir) = &cli.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(branch) = &cli.main_branch {
        config.main_branch = branch.clone();
    }
    if !cli.target_branches.is_empty() {
        config.target_branches = cli.target_branches.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

fn is_interactive(cli: &Cli) -> bool {
    !cli.non_interactive
        && !env_forces_non_interactive(|var| std::env::var(var).ok())
        && io::stdin().is_terminal()
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}

fn run(cli: &Cli, config: TrackerConfig) -> anyhow::Result<ExitCode> {
    let interactive = is_interactive(cli);
    let ws = Workspace::open(config)?;
    let ctx = ws.context();

    match &cli.command {
        Command::Status { format } => {
            let report = status(&ctx)?;
            match format {
                OutputFormat::Text => print!("{}", report.render_text()),
                OutputFormat::Json => println!("{}", report.to_json()?),
            }
        }
        Command::Migrate => {
            let batch = BatchSession::start(&ws.config().main_branch, Timestamp::now());
            let ran = ctx.tracked_runner(&batch).migrate_pending(ctx.scripts)?;
            for warning in batch.close() {
                tracing::warn!("{warning}");
            }
            if ran.is_empty() {
                println!("Nothing to migrate.");
            } else {
                println!("Migrated {}: {}", ran.len(), ran.join(", "));
            }
        }
        Command::RollbackOrphaned => {
            let batch = BatchSession::start(&ws.config().main_branch, Timestamp::now());
            let summary = rollback_orphaned(&ctx, &ctx.tracked_runner(&batch))?;
            for version in &summary.rolled_back {
                println!("Rolled back {version}");
            }
            for (version, reason) in &summary.failed {
                println!("FAILED {version}: {reason}");
            }
            if !summary.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::RollbackSpecific { version } => {
            let batch = BatchSession::start(&ws.config().main_branch, Timestamp::now());
            rollback_specific(&ctx, &ctx.tracked_runner(&batch), version)?;
            println!("Rolled back {version}");
        }
        Command::Analyze => {
            let operator = PromptOperator::new(io::empty(), io::stderr());
            let recovery = ctx.recovery(&operator);
            let mut analyzer = RecoveryAnalyzer::new(&recovery, ws.config().stuck_rollback_timeout_secs);
            analyzer.analyze();
            print!("{}", analyzer.format_analysis_report());
            if analyzer.has_issues() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Recover { action } => {
            let operator = PromptOperator::new(BufReader::new(io::stdin()), io::stderr());
            let summary = recover(&ctx, &operator, ws.backup_manager(), interactive, *action);
            if summary.total() == 0 {
                println!("No migration issues detected.");
            } else {
                println!(
                    "Recovered {}, failed {}, skipped {}",
                    summary.succeeded.len(),
                    summary.failed.len(),
                    summary.skipped.len()
                );
                for failed in &summary.failed {
                    println!("  failed: {failed}");
                }
            }
            if !summary.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Doctor => {
            let report = ws.doctor();
            print!("{}", report.render_text());
            if !report.is_healthy() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ci { format, strictness } => {
            let report = run_ci(&ctx, *strictness);
            print!("{}", report.render(*format));
            return Ok(exit_code(report.exit_code));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return exit_code(2);
        }
    };
    let format = config.log_format.parse().unwrap_or(LogFormat::Human);
    init_logging(format, &config.log_level);
    tracing::debug!(repo = %config.repo_root.display(), command = ?std::env::args().nth(1), "starting");

    match run(&cli, config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            exit_code(2)
        }
    }
}
