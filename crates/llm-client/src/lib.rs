//! # LLM Client
//!
//! Invocation of interchangeable chat-completion endpoints.
//!
//! An [`InvocationManager`] owns an ordered list of [`ChatEndpoint`]s and a shared cursor into
//! it. A call tries the current endpoint and rotates on failure; a full sweep of failures is
//! followed by a backoff sleep and another sweep, up to [`BackoffPolicy::max_cycles`].
//! [`InvocationManager::invoke_with_json_retry`] layers structured parsing on top and re-asks
//! for pure JSON when the reply cannot be parsed.
//!
//! Endpoint descriptors come from YAML ([`EndpointsFile`]); credentials are resolved from the
//! environment once at startup and never read from the file.

mod config;
mod endpoint;
mod manager;
mod sleeper;

pub use config::{
    load_endpoints_file, BackoffPolicy, Credential, EndpointConfig, EndpointsFile,
    ResolvedEndpoint,
};
pub use endpoint::{AzureChatEndpoint, ChatEndpoint, ChatRequest, JSON_ONLY_REMINDER};
pub use manager::{Completion, InvocationManager, InvocationStats, StructuredReply};
pub use sleeper::{Sleeper, TokioSleeper};

pub use llm_parse::{ParseFailure, ParseStrategy, Record};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("endpoint {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("all endpoints failed after {cycles} cycles (last error: {last_error})")]
    EndpointsExhausted { cycles: u32, last_error: String },
    #[error("response could not be parsed: {0}")]
    Unparseable(#[from] ParseFailure),
    #[error("invalid endpoint configuration: {0}")]
    InvalidConfig(String),
    #[error("credential environment variable {variable} is not set for endpoint {endpoint}")]
    MissingCredential { endpoint: String, variable: String },
    #[error("failed to read endpoint configuration: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to deserialize endpoint configuration: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;
