use super::channel::ResultSender;
use super::worker::{CancelSignal, DesignGenerator, GenerationError};
use crate::models::{Design, GeneratorSettings, Job};
use regex::Regex;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// One classified line of generator stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Design(Design),
    Error(String),
    /// Blank line or `#` comment
    Ignored,
}

/// Generator that runs an external program as a separate OS process.
///
/// The program prints one design per stdout line, either `SEQUENCE` or
/// `LABEL<TAB>SEQUENCE`. A line starting with `ERROR:` ends the job with that
/// message; so does a non-zero exit status.
///
/// # Fields
///
/// Output patterns are compiled once at construction:
///
/// - `design_pattern`: `^(?:([^\t]+)\t)?([A-Za-z-]+)$`
/// - `error_pattern`: `^ERROR:\s*(.*)$`
pub struct ProcessGenerator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,

    /// Matches `SEQUENCE` or `LABEL<TAB>SEQUENCE`
    design_pattern: Regex,

    /// Matches `ERROR: message`
    error_pattern: Regex,
}

impl ProcessGenerator {
    pub fn new(settings: &GeneratorSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            timeout: settings.timeout(),
            design_pattern: Regex::new(r"^(?:([^\t]+)\t)?([A-Za-z-]+)$")
                .expect("Invalid design regex"),
            error_pattern: Regex::new(r"^ERROR:\s*(.*)$").expect("Invalid error regex"),
        }
    }

    /// Argument list for `job`, with `{count}`, `{target}` and `{reference}` substituted
    pub fn build_args(&self, job: &Job) -> Vec<String> {
        let count = job.design_count().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{count}", &count)
                    .replace("{target}", job.target().as_str())
                    .replace("{reference}", job.reference().as_str())
            })
            .collect()
    }

    /// Classify one stdout line
    pub fn parse_line(&self, line: &str) -> Result<OutputLine, GenerationError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            return Ok(OutputLine::Ignored);
        }

        if let Some(caps) = self.error_pattern.captures(line) {
            return Ok(OutputLine::Error(caps[1].trim().to_string()));
        }

        if let Some(caps) = self.design_pattern.captures(line.trim()) {
            let sequence = caps[2].to_ascii_uppercase();
            let design = match caps.get(1) {
                Some(label) => Design::labeled(label.as_str().trim(), sequence),
                None => Design::new(sequence),
            };
            return Ok(OutputLine::Design(design));
        }

        Err(GenerationError::InvalidOutput(line.to_string()))
    }

    fn spawn(&self, job: &Job) -> Result<Child, GenerationError> {
        let args = self.build_args(job);
        tracing::info!("Executing: {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }
}

async fn stop_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill generator process: {}", e);
    }
}

/// Resolves at `deadline`, or never when there is none
async fn expire(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl DesignGenerator for ProcessGenerator {
    async fn generate(
        &self,
        job: Job,
        sink: ResultSender,
        mut cancel: CancelSignal,
    ) -> Result<(), GenerationError> {
        let start = Instant::now();
        let mut child = self.spawn(&job)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            GenerationError::ProcessError(std::io::Error::other("stdout not captured"))
        })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "generator", "{}", line);
                }
            });
        }

        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let mut lines = BufReader::new(stdout).lines();
        let mut produced = 0usize;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = cancel.cancelled() => {
                    tracing::info!("Generator cancelled after {} designs", produced);
                    stop_child(&mut child).await;
                    return Err(GenerationError::Cancelled);
                }
                _ = expire(deadline) => {
                    let timeout = self.timeout.unwrap_or_default();
                    tracing::warn!("Generator process timed out after {:?}", timeout);
                    stop_child(&mut child).await;
                    return Err(GenerationError::Timeout(timeout));
                }
            };

            let Some(line) = line else { break };

            match self.parse_line(&line) {
                Ok(OutputLine::Ignored) => continue,
                Ok(OutputLine::Design(design)) => {
                    if sink.send(design).await.is_err() {
                        tracing::debug!("Result channel closed - stopping generator process");
                        stop_child(&mut child).await;
                        return Ok(());
                    }
                    produced += 1;
                }
                Ok(OutputLine::Error(message)) => {
                    stop_child(&mut child).await;
                    return Err(GenerationError::Reported(message));
                }
                Err(e) => {
                    stop_child(&mut child).await;
                    return Err(e);
                }
            }
        }

        // stdout can close long before the process exits
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                tracing::info!("Generator cancelled after closing its output");
                stop_child(&mut child).await;
                return Err(GenerationError::Cancelled);
            }
            _ = expire(deadline) => {
                let timeout = self.timeout.unwrap_or_default();
                tracing::warn!("Generator process timed out after {:?}", timeout);
                stop_child(&mut child).await;
                return Err(GenerationError::Timeout(timeout));
            }
        };
        let exit_code = status.code().unwrap_or(-1);

        tracing::info!(
            "Generator process completed in {:.2}s with exit code {} ({} designs)",
            start.elapsed().as_secs_f32(),
            exit_code,
            produced
        );

        if status.success() {
            Ok(())
        } else {
            Err(GenerationError::ExitStatus(exit_code))
        }
    }
}
