use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("No handler registered for event type '{event_type}'")]
    UnhandledEvent { event_type: String },

    #[error("Repository inconsistency: {reason}")]
    Inconsistent { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::Inconsistent { reason: reason.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// A utility formula received a categorical input outside its table.
/// Callers treat this as a failed search for the subject, not a crash.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Domain input error: {input}={value} ({reason})")]
pub struct DomainInputError {
    pub input:  &'static str,
    pub value:  i64,
    pub reason: String,
}

impl DomainInputError {
    pub fn out_of_range(input: &'static str, value: usize, len: usize) -> Self {
        Self {
            input,
            value:  value as i64,
            reason: format!("expected a value below {len}"),
        }
    }
}

pub type UtilityResult<T> = Result<T, DomainInputError>;
