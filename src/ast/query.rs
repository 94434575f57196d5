use crate::ast::{Direction, Expr, Identifier};

/// Table name every query must read from, and the alias used when the
/// FROM clause names none.
pub const DEFAULT_TABLE: &str = "s3object";

/// Complete parsed query.
///
/// Clauses always appear in the fixed order SELECT, FROM, WHERE, ORDER BY,
/// LIMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub select: SelectClause,
    pub from: FromClause,
    pub where_clause: Option<WhereClause>,
    pub order_by: Option<OrderClause>,
    pub limit: Option<LimitClause>,
}

impl Query {
    /// Whether the select list consists of aggregate calls.
    pub fn is_aggregate(&self) -> bool {
        match &self.select {
            SelectClause::Star => false,
            SelectClause::List(columns) => columns.iter().any(|c| c.expr.as_aggregate().is_some()),
        }
    }
}

/// `SELECT *` or `SELECT col [AS alias], ...`
#[derive(Debug, Clone, PartialEq)]
pub enum SelectClause {
    Star,
    List(Vec<Column>),
}

/// One projected column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub expr: Expr,
    pub alias: Option<Identifier>,
}

impl Column {
    /// Key of this column in an output row: the alias, else the last name of
    /// a field reference, else `_<index + 1>`.
    pub fn output_name(&self, index: usize) -> String {
        if let Some(alias) = &self.alias {
            return alias.name.clone();
        }

        let expr = match &self.expr {
            Expr::IndexReference(reference) => reference.source.as_ref(),
            other => other,
        };
        match expr {
            Expr::Identifier(id) => id.name.clone(),
            Expr::Qualified(q) if !q.star => match q.names.last() {
                Some(last) => last.name.clone(),
                None => format!("_{}", index + 1),
            },
            _ => format!("_{}", index + 1),
        }
    }
}

/// `FROM table [[AS] alias]`
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: Identifier,
    pub alias: Option<Identifier>,
}

impl FromClause {
    /// The identifier rooting every qualified path in the query.
    pub fn binding(&self) -> Identifier {
        self.alias
            .clone()
            .unwrap_or_else(|| Identifier::new(DEFAULT_TABLE))
    }
}

/// `WHERE condition`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub condition: Expr,
}

/// `ORDER BY key [ASC|DESC], ...`; earlier keys take priority.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub keys: Vec<OrderKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub direction: Direction,
}

/// `LIMIT n [OFFSET m]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitClause {
    pub limit: u64,
    pub offset: Option<u64>,
}
