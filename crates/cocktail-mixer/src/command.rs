//! [`Mixer`] backed by an external program.
//!
//! The program receives one JSON job document on stdin and reports on
//! stdout.  Its last non-empty stdout line is read as a status document:
//! `{"status": "ok"}` on success or `{"error": "<message>"}` on failure.  A
//! non-zero exit without a status document is reported with everything the
//! program wrote to stderr, trimmed.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MixError, Result};
use crate::mixer::{MixKind, Mixer};
use crate::types::{DataMix, ModelFamily, WeightedMix};

/// Python driver that dispatches a job document to the `LM_Cocktail` package.
pub const LM_COCKTAIL_DRIVER: &str = include_str!("../driver/lm_cocktail_driver.py");

/// Job document written to the mixer program's stdin.
///
/// Optional values that are not set are omitted so the library's own
/// defaults apply.
#[derive(Debug, Serialize)]
pub struct MixInvocation<'a> {
    pub operation: &'static str,
    pub model_names_or_paths: &'a [String],
    pub model_type: ModelFamily,
    pub output_path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_data: Option<Vec<Map<String, Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_input_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neg_number: Option<u32>,
}

impl<'a> MixInvocation<'a> {
    /// Document for a uniform or by-layer mix.
    pub fn weighted(kind: MixKind, job: &'a WeightedMix) -> Self {
        Self {
            operation: kind.operation(),
            model_names_or_paths: job.models(),
            model_type: job.family(),
            output_path: job.output_path(),
            weights: Some(job.weights()),
            example_data: None,
            temperature: None,
            max_input_length: None,
            neg_number: None,
        }
    }

    /// Document for a data-driven mix.  Tuning values are only present for
    /// embedder jobs.
    pub fn with_data(job: &'a DataMix) -> Self {
        let tuning = job.examples().tuning().unwrap_or_default();
        Self {
            operation: MixKind::WithData.operation(),
            model_names_or_paths: job.models(),
            model_type: job.family(),
            output_path: job.output_path(),
            weights: None,
            example_data: Some(job.examples().records()),
            temperature: Some(job.temperature()),
            max_input_length: tuning.max_input_length,
            neg_number: tuning.neg_number,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DriverReport {
    #[serde(default)]
    error: Option<String>,
}

/// Runs each mix as a child process.
#[derive(Debug, Clone)]
pub struct CommandMixer {
    program: String,
    args: Vec<String>,
}

impl CommandMixer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run the bundled [`LM_COCKTAIL_DRIVER`] with the given Python
    /// interpreter.
    pub fn lm_cocktail(python: impl Into<String>) -> Self {
        Self::new(python, ["-c", LM_COCKTAIL_DRIVER])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, invocation: &MixInvocation<'_>) -> Result<()> {
        let document = serde_json::to_vec(invocation)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MixError::Launch {
                program: self.program.clone(),
                source,
            })?;

        debug!(
            program = %self.program,
            pid = ?child.id(),
            operation = invocation.operation,
            "mixer process started"
        );

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&document).await {
                Ok(()) => {}
                // The program exited without reading its job; the exit
                // status below says why.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("mixer process closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let output = child.wait_with_output().await?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("[mixer] {}", line);
        }

        interpret(&output)
    }
}

fn interpret(output: &Output) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report = last_line(&stdout).and_then(|line| serde_json::from_str::<DriverReport>(line).ok());

    if let Some(DriverReport {
        error: Some(message),
    }) = report
    {
        return Err(MixError::Backend(message));
    }
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return Err(MixError::Backend(format!(
            "mixer program exited with {}",
            output.status
        )));
    }
    Err(MixError::Backend(stderr.to_owned()))
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

#[async_trait]
impl Mixer for CommandMixer {
    fn name(&self) -> &str {
        "command"
    }

    async fn mix(&self, job: &WeightedMix) -> Result<()> {
        self.run(&MixInvocation::weighted(MixKind::Uniform, job)).await?;
        info!(output_path = %job.output_path().display(), "uniform mix written");
        Ok(())
    }

    async fn mix_by_layers(&self, job: &WeightedMix) -> Result<()> {
        self.run(&MixInvocation::weighted(MixKind::ByLayers, job)).await?;
        info!(output_path = %job.output_path().display(), "by-layer mix written");
        Ok(())
    }

    async fn mix_with_data(&self, job: &DataMix) -> Result<()> {
        self.run(&MixInvocation::with_data(job)).await?;
        info!(output_path = %job.output_path().display(), "data-driven mix written");
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
