//! CLI support for ndjson-select
//!
//! Provides programmatic access to the `ndsel` command so it can be embedded
//! in other tools.

mod check;

pub use check::{CheckOptions, CheckResult, execute_check};

use std::io;

use crate::{EvalError, QueryError};

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Query failed to parse or validate
    Query(QueryError),
    /// Evaluation error
    Eval(EvalError),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Query(e) => write!(f, "{}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(
                f,
                "No input provided. Use --input or pipe NDJSON to stdin."
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Query(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoInput => None,
        }
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        CliError::Query(e)
    }
}

impl From<EvalError> for CliError {
    fn from(e: EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
