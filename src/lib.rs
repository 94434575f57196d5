//! SQL-subset queries over newline-delimited JSON.
//!
//! ```
//! use ndjson_select::{evaluate, prepare};
//!
//! let query = prepare("SELECT AVG(s.a) FROM S3Object s").unwrap();
//! let output = evaluate(&query, b"{\"a\":5}\n{\"a\":10}\n{\"a\":15}\n").unwrap();
//! assert_eq!(output, b"{\"_1\":10}\n");
//! ```

pub mod aggregate;
pub mod ast;
pub mod capture;
pub mod cli;
pub mod engine;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod path_index;
pub mod pattern;
pub mod validate;
pub mod value;

pub use aggregate::AggregateProcessor;
pub use ast::{BinOp, Expr, Identifier, Query, Token};
pub use engine::{EagerEngine, Engine, EngineKind, IndexedEngine, NaiveEngine, Plan, evaluate};
pub use evaluator::{EvalContext, EvalError, Evaluator};
pub use lexer::Lexer;
pub use output::to_json;
pub use parser::{ParseError, Parser, parse};
pub use validate::{QueryError, ValidationError, ValidationErrors, prepare, validate};
pub use value::Value;
