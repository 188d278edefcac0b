//! design-runner - console front end for the job controller
//!
//! # Overview
//!
//! Reads one command per line from stdin and drives a [`JobController`] backed by
//! an external generator program ([`ProcessGenerator`]). Reports are rendered by a
//! [`ConsoleReporter`] on its own thread via [`ReporterBridge`].
//!
//! # Commands
//!
//! - `run <count> [target]`: supersede any running job with a new one
//! - `cancel`: cancel the running job
//! - `status`: print the controller state and last outcome
//! - `results`: print the current alignment
//! - `quit`: cancel, wait for the controller and exit (also on EOF)
//!
//! # Configuration
//!
//! `<config-dir>/runner.yaml`, overridable with `DESIGN_RUNNER__SECTION__KEY`
//! environment variables. See [`ConfigManager`].

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use design_runner::models::{Job, OrchestratorSettings};
use design_runner::reporting::controls::{ControlState, on_run_control_clicked};
use design_runner::reporting::{ConsoleReporter, ReporterBridge};
use design_runner::{APP_NAME, ConfigManager, JobController, Metrics, ProcessGenerator, VERSION};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Console backlog beyond which progress lines are skipped
const PROGRESS_BACKLOG: usize = 1024;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "design-runner",
    version,
    about = "Run batched sequence design jobs against an external generator"
)]
struct Cli {
    /// Directory holding runner.yaml
    #[arg(long, default_value = "design-runner")]
    config_dir: Utf8PathBuf,

    /// Default target sequence for `run`; '-' marks positions to design
    #[arg(long)]
    target: Option<String>,

    /// Native sequence shown as the reference row (defaults to the target)
    #[arg(long)]
    reference: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

/// One parsed stdin command
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run {
        count: usize,
        target: Option<String>,
    },
    Cancel,
    Status,
    Results,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "run" => {
            let count = words
                .next()
                .context("usage: run <count> [target]")?
                .parse()
                .context("design count must be a non-negative integer")?;
            Command::Run {
                count,
                target: words.next().map(str::to_string),
            }
        }
        "cancel" => Command::Cancel,
        "status" => Command::Status,
        "results" => Command::Results,
        "quit" | "exit" => Command::Quit,
        other => anyhow::bail!("unknown command: {}", other),
    };
    Ok(Some(command))
}

fn build_job(cli: &Cli, count: usize, target: Option<String>) -> Result<Job> {
    let target = target
        .or_else(|| cli.target.clone())
        .context("no target sequence: pass one to `run` or start with --target")?;

    let job = match &cli.reference {
        Some(reference) => Job::with_reference(&target, reference, count)?,
        None => Job::new(&target, count)?,
    };
    Ok(job)
}

async fn command_loop(cli: &Cli, controller: &JobController<ProcessGenerator>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{:#}", e);
                continue;
            }
        };

        match command {
            Command::Run { count, target } => match build_job(cli, count, target) {
                Ok(job) => {
                    on_run_control_clicked(controller, ControlState::Enabled, job);
                }
                Err(e) => eprintln!("{:#}", e),
            },
            Command::Cancel => controller.cancel(),
            Command::Status => {
                let outcome = controller
                    .last_outcome()
                    .map(|outcome| outcome.status().to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!("state: {:?}, last outcome: {}", controller.state(), outcome);
            }
            Command::Results => {
                for item in controller.results() {
                    println!("{}", item.alignment_row());
                }
            }
            Command::Quit => break,
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let mut settings = config_manager.load_settings()?;
    settings.logging.debug |= cli.debug;

    // Held until exit so buffered log lines are flushed
    let _log_guard = design_runner::logging::setup_logging_with_console(&settings.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("design-runner-worker")
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let bridge = Arc::new(ReporterBridge::new(
        ConsoleReporter::new(),
        PROGRESS_BACKLOG,
        metrics.clone(),
    ));

    let generator = ProcessGenerator::new(&settings.generator);
    let orchestrator: OrchestratorSettings = settings.orchestrator.clone();

    tracing::info!(
        "Generator: {} (poll {:?}, channel capacity {})",
        settings.generator.program,
        orchestrator.poll_interval(),
        orchestrator.channel_capacity
    );

    let result = runtime.block_on(async {
        let controller =
            JobController::spawn(generator, bridge.clone(), orchestrator, metrics.clone());

        let result = command_loop(&cli, &controller).await;

        tracing::info!("Shutting down controller");
        controller.shutdown().await;
        result
    });

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    metrics.log_summary();

    // Flush remaining report lines before exit
    match Arc::try_unwrap(bridge) {
        Ok(bridge) => bridge.close(),
        Err(_) => tracing::warn!("Reporter bridge still shared at exit; pending reports may be lost"),
    }

    tracing::info!("Application shutdown complete");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(
            parse_command("run 5").unwrap(),
            Some(Command::Run {
                count: 5,
                target: None
            })
        );
        assert_eq!(
            parse_command("run 2 MKV--L").unwrap(),
            Some(Command::Run {
                count: 2,
                target: Some("MKV--L".to_string())
            })
        );
        assert_eq!(parse_command("cancel").unwrap(), Some(Command::Cancel));
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("run").is_err());
        assert!(parse_command("run -3").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn test_build_job_uses_cli_defaults() {
        let cli = Cli::parse_from(["design-runner", "--target", "MKV-L", "--reference", "MKVAL"]);

        let job = build_job(&cli, 3, None).unwrap();
        assert_eq!(job.target().as_str(), "MKV-L");
        assert_eq!(job.reference().as_str(), "MKVAL");

        let cli = Cli::parse_from(["design-runner"]);
        assert!(build_job(&cli, 3, None).is_err());
    }
}
