//! Invocation of the external natural-language-to-Cypher translator.
//!
//! The translator is an opaque program: it receives the question as its last
//! argv element and prints the translated query on stdout. No shell is
//! involved at any point.

mod outcome;
mod process;
mod question;
mod stream;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;

pub use outcome::TranslateOutcome;
pub use question::{Question, QuestionError};

use process::{apply_process_group, ProcessGroup, RunGuard};
use stream::read_capped;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["Tokenize.py".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl TranslatorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.program.trim().is_empty() {
            anyhow::bail!("translator program must not be empty");
        }
        if self.timeout.is_zero() {
            anyhow::bail!("translator timeout must be greater than zero");
        }
        if self.max_output_bytes == 0 {
            anyhow::bail!("translator max_output_bytes must be greater than zero");
        }
        if self.env.keys().any(|key| key.trim().is_empty()) {
            anyhow::bail!("translator env keys must not be empty");
        }
        Ok(())
    }
}

#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, question: &Question) -> TranslateOutcome;
}

#[derive(Debug, Clone)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn command(&self, question: &Question) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);
        cmd.arg(question.as_str());
        if let Some(dir) = self.config.working_dir.as_ref() {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.config.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        apply_process_group(&mut cmd);
        cmd
    }

    async fn run(&self, question: &Question) -> anyhow::Result<TranslateOutcome> {
        let deadline = Instant::now() + self.config.timeout;
        let mut child = match self.command(question).spawn() {
            Ok(child) => child,
            Err(err) => {
                return Ok(TranslateOutcome::unavailable(format!(
                    "failed to spawn {}: {err}",
                    self.config.program
                )))
            }
        };
        let group = ProcessGroup::of(&child);

        let stdout = child.stdout.take().context("missing stdout")?;
        let stderr = child.stderr.take().context("missing stderr")?;
        let max_bytes = self.config.max_output_bytes;
        let mut stdout_task = tokio::spawn(read_capped(stdout, max_bytes));
        let mut stderr_task = tokio::spawn(read_capped(stderr, max_bytes));
        let guard = RunGuard::new(
            group,
            vec![stdout_task.abort_handle(), stderr_task.abort_handle()],
        );

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status.context("wait on translator")?,
            Err(_) => {
                let status = guard.group().terminate(&mut child).await;
                tracing::debug!(
                    event = "translator.terminated",
                    exit_code = ?status.and_then(|status| status.code()),
                    "translator process group terminated"
                );
                return Ok(self.timed_out());
            }
        };

        // The leader is gone, but a background child can keep the pipes open.
        let drained = tokio::time::timeout_at(deadline, async {
            tokio::join!(&mut stdout_task, &mut stderr_task)
        })
        .await;
        let Ok((stdout, stderr)) = drained else {
            tracing::debug!(
                event = "translator.pipes_held",
                "translator exited but its pipes stayed open"
            );
            return Ok(self.timed_out());
        };
        let stdout = stdout.context("stdout task join")?.context("stdout read")?;
        let stderr = stderr.context("stderr task join")?.context("stderr read")?;
        guard.complete();

        if status.success() {
            let truncated = stdout.truncated;
            return Ok(TranslateOutcome::Translated {
                text: stdout.into_text(),
                truncated,
            });
        }
        let stderr = stderr.into_text();
        let stderr = stderr.trim();
        Ok(TranslateOutcome::failed(
            status.code(),
            (!stderr.is_empty()).then(|| stderr.to_string()),
        ))
    }

    fn timed_out(&self) -> TranslateOutcome {
        TranslateOutcome::TimedOut {
            after: self.config.timeout,
        }
    }
}

#[async_trait]
impl Translate for Translator {
    async fn translate(&self, question: &Question) -> TranslateOutcome {
        let started = std::time::Instant::now();
        let outcome = match self.run(question).await {
            Ok(outcome) => outcome,
            Err(err) => TranslateOutcome::unavailable(format!("{err:#}")),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let label = outcome.label();
        match &outcome {
            TranslateOutcome::Translated { text, truncated } => tracing::info!(
                event = "translator.completed",
                outcome = label,
                question_chars = question.char_count(),
                output_bytes = text.len(),
                truncated = *truncated,
                elapsed_ms = elapsed_ms,
                "translator completed"
            ),
            TranslateOutcome::Failed { exit_code, stderr } => tracing::warn!(
                event = "translator.failed",
                outcome = label,
                question_chars = question.char_count(),
                exit_code = ?exit_code,
                stderr = stderr.as_deref().unwrap_or("-"),
                elapsed_ms = elapsed_ms,
                "translator exited with failure"
            ),
            TranslateOutcome::TimedOut { after } => tracing::warn!(
                event = "translator.timeout",
                outcome = label,
                question_chars = question.char_count(),
                timeout_ms = after.as_millis() as u64,
                "translator timed out"
            ),
            TranslateOutcome::Unavailable { reason } => tracing::error!(
                event = "translator.unavailable",
                outcome = label,
                program = %self.config.program,
                reason = %reason,
                "translator unavailable"
            ),
        }
        outcome
    }
}
