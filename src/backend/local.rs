//! Local text-generation pipeline backend
//!
//! Runs a locally hosted generation program on the flattened transcript.
//! Unlike the remote backends this one never fails: when generation yields
//! nothing usable, the reply is [`FALLBACK_REPLY`].

use super::{BackendKind, ChatBackend, NormalizedReply};
use crate::config::LocalPipelineConfig;
use crate::conversation::Conversation;
use crate::error::ChatError;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Reply used when the pipeline produced no new text
pub const FALLBACK_REPLY: &str = "no reply generated";

const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Sampling parameters passed to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub do_sample: bool,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            do_sample: true,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// One candidate produced by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSequence {
    pub generated_text: String,
}

/// A loaded text-generation model
#[async_trait]
pub trait TextGenerationPipeline: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<GeneratedSequence>, ChatError>;
}

/// Backend running an in-process or local pipeline
pub struct LocalPipelineBackend {
    pipeline: Arc<dyn TextGenerationPipeline>,
    params: GenerationParams,
}

impl LocalPipelineBackend {
    pub fn new(pipeline: Arc<dyn TextGenerationPipeline>) -> Self {
        Self {
            pipeline,
            params: GenerationParams::default(),
        }
    }

    /// Generate from an already flattened prompt
    pub async fn generate_from_prompt(&self, prompt: &str) -> NormalizedReply {
        let sequences = match self.pipeline.generate(prompt, &self.params).await {
            Ok(sequences) => sequences,
            Err(e) => {
                tracing::warn!(error_kind = %e.kind, error = %e.message, "Local generation failed");
                return NormalizedReply::new(FALLBACK_REPLY);
            }
        };

        let reply = sequences
            .first()
            .and_then(|seq| extract_reply(prompt, &seq.generated_text));

        match reply {
            Some(text) => NormalizedReply::new(text),
            None => {
                tracing::warn!(sequences = sequences.len(), "Local generation produced no new text");
                NormalizedReply::new(FALLBACK_REPLY)
            }
        }
    }
}

/// Strip an echoed prompt and trim; `None` when nothing remains
fn extract_reply(prompt: &str, generated: &str) -> Option<String> {
    let continuation = generated
        .strip_prefix(prompt)
        .or_else(|| generated.split_once(prompt).map(|(_, rest)| rest))
        .unwrap_or(generated);

    let trimmed = continuation.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl ChatBackend for LocalPipelineBackend {
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        Ok(self.generate_from_prompt(&conversation.to_transcript()).await)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::LocalPipeline
    }
}

/// Pipeline backed by a local generation program.
///
/// The prompt is written to the program's stdin and its stdout is taken as
/// the single generated sequence. Sampling parameters are passed through the
/// `GEN_*` environment variables.
pub struct CommandPipeline {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPipeline {
    pub fn new(config: &LocalPipelineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: GENERATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextGenerationPipeline for CommandPipeline {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<GeneratedSequence>, ChatError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("GEN_MAX_NEW_TOKENS", params.max_new_tokens.to_string())
            .env("GEN_DO_SAMPLE", params.do_sample.to_string())
            .env("GEN_TEMPERATURE", params.temperature.to_string())
            .env("GEN_TOP_P", params.top_p.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ChatError::unavailable(format!("Failed to spawn {}: {e}", self.program))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            // Written from its own task: the child may fill stdout before it drains stdin
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!(error = %e, "Generation program closed stdin early");
                }
            });
        }

        tokio::select! {
            () = tokio::time::sleep(self.timeout) => {
                Err(ChatError::timeout(format!(
                    "Generation program timed out after {:?}",
                    self.timeout
                )))
            }
            result = child.wait_with_output() => {
                let output = result.map_err(|e| {
                    ChatError::unavailable(format!("Generation program failed: {e}"))
                })?;
                if !output.status.success() {
                    let exit_code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(ChatError::unavailable(format!(
                        "Generation program exited with code {exit_code}: {stderr}"
                    )));
                }
                Ok(vec![GeneratedSequence {
                    generated_text: String::from_utf8_lossy(&output.stdout).into_owned(),
                }])
            }
        }
    }
}
