//! Startup configuration
//!
//! Values are read once by the binaries and shared read-only afterwards. The
//! dispatcher and backends only ever see the structs below; nothing outside
//! this module touches the process environment.

use std::time::Duration;

/// Default HTTP backend timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default managed model identifier
pub const DEFAULT_MODEL_ID: &str = "us.amazon.nova-lite-v1:0";
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;
pub const DEFAULT_PREDICT_PORT: u16 = 8001;

/// Which backends are enabled, in precedence order: HTTP beats managed
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub http: Option<HttpBackendConfig>,
    pub managed: Option<ManagedBackendConfig>,
}

/// External HTTP endpoint speaking `{"text"}` -> `{"answer"}`
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub url: String,
    pub timeout: Duration,
    pub prompt_format: PromptFormat,
}

impl HttpBackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            prompt_format: PromptFormat::Transcript,
        }
    }
}

/// How the HTTP backend receives the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFormat {
    /// `{"text": <transcript>}`
    #[default]
    Transcript,
    /// `{"text": <transcript>, "messages": [{role, content}, ...]}`
    Structured,
}

impl PromptFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "transcript" => Some(Self::Transcript),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

/// Managed inference service (Bedrock Converse)
#[derive(Debug, Clone)]
pub struct ManagedBackendConfig {
    pub model_id: String,
    pub api_key: String,
    /// Identifier of the running function/service, used to derive the region
    pub runtime_identifier: Option<String>,
    /// Base URL override; derived from the region when unset
    pub endpoint: Option<String>,
}

impl ManagedBackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_key: api_key.into(),
            runtime_identifier: None,
            endpoint: None,
        }
    }
}

/// Local generation program used by the predict service
#[derive(Debug, Clone)]
pub struct LocalPipelineConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl LocalPipelineConfig {
    /// Split a command line on whitespace into program and arguments
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Listener settings for the binaries
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http = get("API_URL").map(|url| {
            let timeout = get("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);
            let prompt_format = get("HTTP_PROMPT_FORMAT")
                .and_then(|v| PromptFormat::parse(&v))
                .unwrap_or_default();
            HttpBackendConfig {
                url: url.trim().to_string(),
                timeout,
                prompt_format,
            }
        });

        let managed = get("AWS_BEARER_TOKEN_BEDROCK").map(|api_key| ManagedBackendConfig {
            model_id: get("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            api_key,
            runtime_identifier: get("RUNTIME_ARN"),
            endpoint: get("MANAGED_ENDPOINT"),
        });

        Self { http, managed }
    }
}

impl LocalPipelineConfig {
    pub fn from_env() -> Option<Self> {
        std::env::var("LOCAL_PIPELINE_COMMAND")
            .ok()
            .and_then(|cmd| Self::from_command_line(&cmd))
    }
}

impl ServerConfig {
    pub fn from_env(var: &str, default_port: u16) -> Self {
        let port = std::env::var(var)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);
        Self { port }
    }
}
