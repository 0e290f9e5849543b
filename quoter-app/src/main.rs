use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quoter_common::observability::{LogConfig, init_logging};
use quoter_config::{QuoterConfig, QuoterConfigLoader, TOKEN_ENV};
use quoter_core::UpdateCycle;
use quoter_runtime::{QuoterRuntime, Sleeper, TokioSleeper, sleep_or_cancel};
use quoter_social::StatusPublisher;
use quoter_web::QuotesSource;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiring::{PublisherSetup, build_source, cycle_settings, effective_refresh};
mod wiring;

#[derive(Debug, Parser)]
#[command(name = "quoter", version, about = "Publish a quote of the day as your GitHub status")]
struct Cli {
    /// Config file (YAML, JSON or TOML).
    #[arg(short, long, env = "QUOTER_CONFIG", default_value = "quoter.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a quote and publish it, repeating every refresh interval.
    Run {
        /// Run a single cycle even if looping is enabled.
        #[arg(long)]
        once: bool,
        /// Build the status request but do not send it.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        debug: bool,
    },
    /// Fetch the quotes page once and print every extracted candidate.
    Selectors,
    /// Print the status currently set on GitHub.
    Status,
}

impl Default for Command {
    fn default() -> Self {
        Command::Run {
            once: false,
            dry_run: false,
            debug: false,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let mut cfg: QuoterConfig = QuoterConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let command = cli.command.unwrap_or_default();
    if let Command::Run {
        once,
        dry_run,
        debug,
    } = &command
    {
        apply_run_flags(&mut cfg, *once, *dry_run, *debug);
    }

    let log_path = init_logging(LogConfig {
        app_name: "quoter",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::debug!(log = %log_path.display(), config = %cli.config.display(), "logging.ready");

    let runtime = QuoterRuntime::build("quoter")?;
    let outcome = match command {
        Command::Run { .. } => {
            runtime.cancel_on_ctrl_c();
            let cancel = runtime.cancellation();
            runtime.block_on(run(&cfg, cancel))
        }
        Command::Selectors => runtime.block_on(print_candidates(&cfg)),
        Command::Status => runtime.block_on(print_status(&cfg)),
    };
    runtime.shutdown(Duration::from_secs(1));

    match outcome {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "quoter.failed");
            Err(err)
        }
    }
}

fn apply_run_flags(cfg: &mut QuoterConfig, once: bool, dry_run: bool, debug: bool) {
    if once {
        cfg.loop_enabled = false;
    }
    if debug {
        cfg.debug = true;
    }
    if dry_run {
        if let Some(github) = cfg.github.as_mut() {
            github.dry_run = true;
        }
    }
}

/// Outer loop. Returns `Ok(false)` when a cycle failed.
async fn run(cfg: &QuoterConfig, cancel: CancellationToken) -> Result<bool> {
    let source = build_source(cfg)?;
    let setup = PublisherSetup::from_config(cfg, std::env::var(TOKEN_ENV).ok());
    setup.describe();

    let refresh = effective_refresh(cfg, &setup);
    let sleeper = TokioSleeper;
    let cycle = UpdateCycle::new(
        &source,
        setup.publisher(),
        &sleeper,
        cycle_settings(cfg, refresh),
    )
    .with_cancellation(cancel.clone());
    run_cycles(&cycle, refresh, &sleeper, &cancel).await
}

async fn run_cycles(
    cycle: &UpdateCycle<'_>,
    refresh: Duration,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<bool> {
    loop {
        if cycle.update_once().await.is_err() {
            return Ok(false);
        }
        if refresh.is_zero() || cancel.is_cancelled() {
            return Ok(true);
        }

        tracing::info!("Next status update in {} seconds", refresh.as_secs());
        if !sleep_or_cancel(sleeper, refresh, cancel).await {
            tracing::info!("Stopped by Ctrl+C");
            return Ok(true);
        }
    }
}

async fn print_candidates(cfg: &QuoterConfig) -> Result<bool> {
    let source = build_source(cfg)?;
    println!("Testing selectors on {}", source.location());
    let candidates = source.fetch_all().await?;
    if candidates.is_empty() {
        println!("No candidates found");
    }
    for (idx, candidate) in candidates.iter().enumerate() {
        let quote = candidate
            .quote
            .as_deref()
            .filter(|q| !q.is_empty())
            .unwrap_or("<no quote>");
        let author = candidate
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("<no source>");
        println!("{}. {quote} — {author}", idx + 1);
    }
    Ok(true)
}

async fn print_status(cfg: &QuoterConfig) -> Result<bool> {
    let setup = PublisherSetup::from_config(cfg, std::env::var(TOKEN_ENV).ok());
    let client = match &setup {
        PublisherSetup::Ready(client) if !client.is_dry_run() => client,
        PublisherSetup::Ready(_) => {
            println!("Dry-run mode, the current status is not requested");
            return Ok(true);
        }
        PublisherSetup::Disabled => {
            println!("GitHub status publishing is disabled");
            return Ok(false);
        }
        PublisherSetup::Misconfigured { reason } => {
            println!("GitHub status client is not configured: {reason}");
            return Ok(false);
        }
    };

    match client.fetch_status().await? {
        Some(status) => {
            println!("Message: {}", status.message);
            println!("Emoji:   {}", status.emoji.as_deref().unwrap_or("<none>"));
            match status.expires_at {
                Some(at) => println!("Expires: {}", at.to_rfc3339()),
                None => println!("Expires: never"),
            }
        }
        None => println!("No status set"),
    }
    Ok(true)
}
