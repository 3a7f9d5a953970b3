//! Registry error types

use std::fmt;

use thiserror::Error;

/// Errors raised while declaring attributes on a namespace
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid attribute name: {0:?}")]
    InvalidName(String),

    #[error("Unknown constraint(s) for {attribute}: {}", .keys.join(", "))]
    UnknownConstraint { attribute: String, keys: Vec<String> },

    #[error("Constraint {key} for {attribute} expects a {expected}")]
    MisplacedConstraint {
        attribute: String,
        key: String,
        expected: &'static str,
    },

    #[error("Attribute {attribute} already declared in namespace {namespace}")]
    DuplicateAttribute { namespace: String, attribute: String },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Error returned by a caller-supplied validator.
///
/// The store never inspects it; it is handed back to the caller of the
/// rejected set exactly as the validator produced it.
#[derive(Debug)]
pub struct ValidationError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error raised inside the validator.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors surfaced by an accessor set
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Rejected value for {attribute}: {source}")]
    Rejected {
        attribute: String,
        #[source]
        source: ValidationError,
    },

    #[error("Attribute {attribute} belongs to reclaimed namespace {namespace}")]
    Reclaimed { namespace: String, attribute: String },
}

impl AccessError {
    /// The validator's error, if this set was rejected by one.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Rejected { source, .. } => Some(source),
            Self::Reclaimed { .. } => None,
        }
    }

    pub fn into_validation(self) -> Option<ValidationError> {
        match self {
            Self::Rejected { source, .. } => Some(source),
            Self::Reclaimed { .. } => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed registry configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
