//! Error types for the model client, flows, store and configuration.
//!
//! Every failure is surfaced to the caller once; nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the remote model API.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("model API HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("model API error: {0}")]
    Api(String),

    #[error("model returned no choices")]
    NoChoices,
}

/// Failure anywhere in a prompt flow.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The input deserialized but a field is out of bounds.
    #[error("invalid '{field}': {message}")]
    Validation { field: String, message: String },

    /// The input could not be deserialized into the flow's input type.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown flow '{0}'")]
    UnknownFlow(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned an empty reply")]
    EmptyResponse,

    /// The reply was not a JSON object.
    #[error("model reply is not valid JSON: {0}")]
    MalformedOutput(String),

    /// The reply was JSON but broke the output contract.
    #[error("model reply violates the output schema:\n{}", .0.join("\n"))]
    SchemaViolation(Vec<String>),
}

impl FlowError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FlowError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the caller supplied bad input, as opposed to the model or
    /// transport failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FlowError::Validation { .. } | FlowError::InvalidInput(_) | FlowError::UnknownFlow(_)
        )
    }
}

/// Failure reading or writing a document.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid document key '{0}'")]
    InvalidKey(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt document {collection}/{key}: {source}")]
    Corrupt {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failure in the account records built on top of the store.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("invalid '{field}': {message}")]
    Validation { field: &'static str, message: String },

    #[error("no profile for user '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinguished_from_upstream_failures() {
        assert!(FlowError::validation("content", "too short").is_client_error());
        assert!(FlowError::InvalidInput("missing field".into()).is_client_error());
        assert!(FlowError::UnknownFlow("nope".into()).is_client_error());
        assert!(!FlowError::EmptyResponse.is_client_error());
        assert!(!FlowError::SchemaViolation(vec![]).is_client_error());
        assert!(!FlowError::Model(ModelError::NoChoices).is_client_error());
    }

    #[test]
    fn schema_violation_lists_every_error() {
        let err = FlowError::SchemaViolation(vec!["  - /a: bad".into(), "  - /b: worse".into()]);
        let text = err.to_string();
        assert!(text.contains("/a: bad"));
        assert!(text.contains("/b: worse"));
    }
}
