//! # Query Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the SQL subset
//! evaluated over newline-delimited JSON records.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, paths, operations)
//! - **[operators]** - Binary and unary operators, sort direction
//! - **[functions]** - Scalar and aggregate function calls
//! - **[query]** - Clauses and the complete query
//! - **[display]** - Canonical text rendering
//!
//! ## Quick Start
//!
//! ```text
//! SELECT s.name, s.age AS years FROM S3Object s WHERE s.age > 18 LIMIT 10
//! ```
//!
//! This query keeps records whose `age` exceeds 18 and projects two fields
//! from at most ten of them.
//!
//! ## Core Concepts
//!
//! ### Clause Order
//!
//! Clauses always appear in this order, only SELECT and FROM being required:
//!
//! ```text
//! SELECT ... FROM ... [WHERE ...] [ORDER BY ...] [LIMIT n [OFFSET m]]
//! ```
//!
//! ### Table Alias
//!
//! Every qualified path is rooted at the table alias (`s` above, or
//! `s3object` when the FROM clause names none). An unqualified name refers
//! to a top-level field of the record.
//!
//! ### Missing vs Null
//!
//! A path that does not exist in a record evaluates to *missing*, which is
//! distinct from a present JSON `null`. Only `IS [NOT] MISSING` observes
//! missing values directly.
//!
//! ### Canonical Text
//!
//! Rendering a query with `Display` brackets every operator sub-expression,
//! so parsing the rendered text yields a structurally equal query.
//!
//! ## Examples
//!
//! ### Aggregates
//!
//! ```text
//! SELECT COUNT(*), AVG(s.price) AS avg_price FROM S3Object s
//! ```
//!
//! ### Pattern Matching
//!
//! ```text
//! SELECT * FROM S3Object s WHERE s.code LIKE '%x^%' ESCAPE '^'
//! ```
//!
//! ### Presence Checks
//!
//! ```text
//! SELECT * FROM S3Object s WHERE s.nickname IS MISSING
//! ```
pub mod display;
pub mod expressions;
pub mod functions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use expressions::{Expr, Identifier, InList, IndexReference, Qualified};
pub use functions::{Aggregate, Function};
pub use operators::{BinOp, Direction, UnaryOp};
pub use query::{
    Column, DEFAULT_TABLE, FromClause, LimitClause, OrderClause, OrderKey, Query, SelectClause,
    WhereClause,
};
pub use tokens::Token;
