//! Typed errors surfaced by the coordination core.
//!
//! Only transport-level failures are propagated to callers (see the error
//! handling policy in the top-level crate docs): a lost race on an LWT is a
//! `false` return, never an `Err`.

use scylla::errors::{DeserializationError, ExecutionError, IntoRowsResultError, NewSessionError, PrepareError, RowsError};

/// Failure establishing a session against, or preparing the statements
/// against, the coordination store at construction time.
#[derive(Debug, thiserror::Error)]
pub enum PrepareStatementsError {
    #[error("failed to connect to the coordination store")]
    Connect(#[from] NewSessionError),
    #[error("failed to prepare statement: {0}")]
    Prepare(#[from] PrepareError),
}

/// Failure inferring [`crate::config::CoordinatorConfig`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),
    #[error("environment variable {var} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// A store-level failure executing a prepared statement or batch.
///
/// This is the only error kind the core ever returns; condition-not-applied
/// is represented as `Ok(false)`, not as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("coordination store request failed: {0}")]
    Execution(#[from] ExecutionError),
    #[error("coordination store returned a malformed result: {0}")]
    Rows(#[from] IntoRowsResultError),
    #[error("coordination store returned a malformed result: {0}")]
    RowsTypeCheck(#[from] RowsError),
    #[error("failed to deserialize a row from the coordination store: {0}")]
    Deserialize(#[from] DeserializationError),
}
