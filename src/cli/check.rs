//! Run a query against NDJSON input

use log::info;

use super::CliError;
use crate::{EngineKind, Plan, prepare};

/// Options for one `ndsel` invocation
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query text
    pub query: String,
    /// NDJSON input bytes
    pub input: Option<Vec<u8>>,
    /// Engine evaluating the query
    pub engine: EngineKind,
    /// Only parse and validate, don't execute
    pub syntax_only: bool,
    /// Print the canonical query and slot map instead of executing
    pub explain: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Query parsed and validated
    SyntaxValid,
    /// Canonical query text followed by the slot map
    Explained(String),
    /// Output rows, one JSON document per line
    Success(Vec<u8>),
}

/// Prepare and, unless told otherwise, execute a query
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let query = prepare(&options.query)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    if options.explain {
        let (_, index) = Plan::new(&query).compile();
        return Ok(CheckResult::Explained(format!("{}\n{}", query, index.explain())));
    }

    let input = options.input.as_ref().ok_or(CliError::NoInput)?;
    let engine = options.engine.engine();
    info!("running {} engine over {} byte(s)", engine.name(), input.len());
    Ok(CheckResult::Success(engine.evaluate(&query, input)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(query: &str) -> CheckOptions {
        CheckOptions {
            query: query.to_string(),
            ..CheckOptions::default()
        }
    }

    #[test]
    fn test_syntax_only_skips_input() {
        let opts = CheckOptions {
            syntax_only: true,
            ..options("SELECT * FROM S3Object")
        };
        assert!(matches!(execute_check(&opts), Ok(CheckResult::SyntaxValid)));
    }

    #[test]
    fn test_explain_lists_slots() {
        let opts = CheckOptions {
            explain: true,
            ..options("SELECT s.a FROM S3Object s WHERE s.b > 1")
        };
        let Ok(CheckResult::Explained(text)) = execute_check(&opts) else {
            panic!("expected explain output");
        };
        assert_eq!(
            text,
            "SELECT s.a FROM S3Object s WHERE (s.b > 1)\nslot 0: s.a (passthrough)\nslot 1: s.b\n"
        );
    }

    #[test]
    fn test_missing_input_is_reported() {
        assert!(matches!(
            execute_check(&options("SELECT * FROM S3Object")),
            Err(CliError::NoInput)
        ));
    }

    #[test]
    fn test_invalid_query_is_reported() {
        assert!(matches!(
            execute_check(&options("SELECT * FROM logs")),
            Err(CliError::Query(_))
        ));
    }
}
