//! Semantic checks run between parsing and evaluation.
//!
//! Problems are collected rather than reported one at a time, since a query
//! can break several rules at once.

use std::fmt;

use crate::{
    ast::{DEFAULT_TABLE, Expr, Function, Query, SelectClause},
    parser::{ParseError, parse},
};

/// Scalar functions the evaluator resolves, with their arity.
const SCALAR_FUNCTIONS: &[(&str, usize)] = &[("LOWER", 1)];

/// One semantic problem with a parsed query.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// FROM names something other than the record stream
    UnsupportedTable(String),

    /// `alias.*` used anywhere
    QualifiedStar(String),

    /// Aggregate and plain columns in the same select list
    MixedAggregates,

    /// Aggregate inside another aggregate or inside a column expression
    NestedAggregate(String),

    /// Aggregate in WHERE or ORDER BY
    AggregateOutsideSelect { clause: &'static str, expr: String },

    UnknownFunction(String),

    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnsupportedTable(table) => write!(
                f,
                "Unsupported table '{}'; queries must read FROM S3Object",
                table
            ),
            ValidationError::QualifiedStar(expr) => {
                write!(f, "Qualified star {} is not supported", expr)
            }
            ValidationError::MixedAggregates => write!(
                f,
                "Select list mixes aggregate and non-aggregate columns"
            ),
            ValidationError::NestedAggregate(expr) => write!(
                f,
                "Aggregate calls must be whole select columns: {}",
                expr
            ),
            ValidationError::AggregateOutsideSelect { clause, expr } => {
                write!(f, "Aggregate {} is not allowed in {}", expr, clause)
            }
            ValidationError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            ValidationError::WrongArity {
                name,
                expected,
                found,
            } => write!(
                f,
                "{}() takes {} argument(s), got {}",
                name, expected, found
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Every problem found in one query, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Failure to turn query text into an executable query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    Parse(ParseError),
    Invalid(ValidationErrors),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Parse(e) => write!(f, "Syntax error: {}", e),
            QueryError::Invalid(e) => write!(f, "Invalid query: {}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<ParseError> for QueryError {
    fn from(e: ParseError) -> Self {
        QueryError::Parse(e)
    }
}

impl From<ValidationErrors> for QueryError {
    fn from(e: ValidationErrors) -> Self {
        QueryError::Invalid(e)
    }
}

/// Parses and validates query text.
///
/// # Examples
///
/// ```
/// use ndjson_select::{QueryError, prepare};
///
/// assert!(prepare("SELECT s.a FROM S3Object s").is_ok());
/// assert!(matches!(
///     prepare("SELECT s.*, COUNT(*) FROM logs s"),
///     Err(QueryError::Invalid(errors)) if errors.0.len() == 3
/// ));
/// ```
pub fn prepare(text: &str) -> Result<Query, QueryError> {
    let query = parse(text)?;
    validate(&query)?;
    Ok(query)
}

/// Checks a parsed query, collecting every problem found.
pub fn validate(query: &Query) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if !query.from.table.matches(DEFAULT_TABLE) {
        errors.push(ValidationError::UnsupportedTable(
            query.from.table.name.clone(),
        ));
    }

    if let SelectClause::List(columns) = &query.select {
        let aggregates = columns
            .iter()
            .filter(|c| c.expr.as_aggregate().is_some())
            .count();
        if aggregates > 0 && aggregates < columns.len() {
            errors.push(ValidationError::MixedAggregates);
        }

        for column in columns {
            match column.expr.as_aggregate() {
                Some(aggregate) => {
                    if aggregate.argument().is_some_and(Expr::contains_aggregate) {
                        errors.push(ValidationError::NestedAggregate(column.expr.to_string()));
                    }
                }
                None if column.expr.contains_aggregate() => {
                    errors.push(ValidationError::NestedAggregate(column.expr.to_string()));
                }
                None => {}
            }
            check_expression(&column.expr, &mut errors);
        }
    }

    if let Some(where_clause) = &query.where_clause {
        check_clause("WHERE", &where_clause.condition, &mut errors);
    }
    if let Some(order_by) = &query.order_by {
        for key in &order_by.keys {
            check_clause("ORDER BY", &key.expr, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn check_clause(clause: &'static str, expr: &Expr, errors: &mut Vec<ValidationError>) {
    if expr.contains_aggregate() {
        errors.push(ValidationError::AggregateOutsideSelect {
            clause,
            expr: expr.to_string(),
        });
    }
    check_expression(expr, errors);
}

/// Node-level rules that apply in every clause.
fn check_expression(expr: &Expr, errors: &mut Vec<ValidationError>) {
    match expr {
        Expr::Qualified(q) if q.star => {
            errors.push(ValidationError::QualifiedStar(expr.to_string()));
        }
        Expr::Function(Function::Scalar { name, args }) => {
            match SCALAR_FUNCTIONS
                .iter()
                .find(|(known, _)| name.eq_ignore_ascii_case(known))
            {
                None => errors.push(ValidationError::UnknownFunction(name.clone())),
                Some((_, arity)) if *arity != args.len() => {
                    errors.push(ValidationError::WrongArity {
                        name: name.clone(),
                        expected: *arity,
                        found: args.len(),
                    })
                }
                Some(_) => {}
            }
        }
        _ => {}
    }

    for child in expr.children() {
        check_expression(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(text: &str) -> Vec<ValidationError> {
        let query = parse(text).unwrap();
        match validate(&query) {
            Ok(()) => vec![],
            Err(errors) => errors.0,
        }
    }

    #[test]
    fn test_valid_queries() {
        assert!(problems("SELECT * FROM S3Object").is_empty());
        assert!(problems("SELECT LOWER(s.name) FROM s3object s WHERE s.a > 1").is_empty());
        assert!(problems("SELECT COUNT(*), MAX(s.a) AS top FROM s3object s").is_empty());
    }

    #[test]
    fn test_problems_are_collected() {
        let found = problems("SELECT s.*, UPPER(s.a) FROM data s WHERE SUM(s.a) > 1");
        assert_eq!(
            found,
            vec![
                ValidationError::UnsupportedTable("data".to_string()),
                ValidationError::QualifiedStar("s.*".to_string()),
                ValidationError::UnknownFunction("UPPER".to_string()),
                ValidationError::AggregateOutsideSelect {
                    clause: "WHERE",
                    expr: "(SUM(s.a) > 1)".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_placement() {
        assert_eq!(
            problems("SELECT COUNT(*), s.a FROM s3object s"),
            vec![ValidationError::MixedAggregates]
        );
        assert_eq!(
            problems("SELECT SUM(s.a) + 1 FROM s3object s"),
            vec![ValidationError::NestedAggregate("(SUM(s.a) + 1)".to_string())]
        );
        assert_eq!(
            problems("SELECT LOWER(s.a, s.b) FROM s3object s"),
            vec![ValidationError::WrongArity {
                name: "LOWER".to_string(),
                expected: 1,
                found: 2,
            }]
        );
    }
}
