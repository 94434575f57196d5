use crate::ast::Expr;

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// Per-record function resolved by name at evaluation time
    ///
    /// # Example
    /// ```text
    /// LOWER(s.name)
    /// ```
    Scalar { name: String, args: Vec<Expr> },

    /// Cross-record aggregate; only valid as a top-level select column
    Aggregate(Aggregate),
}

/// Aggregate function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// `AVG(expr)`
    Average(Box<Expr>),
    /// `COUNT(expr)`, or `COUNT(*)` when the argument is absent
    Count(Option<Box<Expr>>),
    /// `MAX(expr)`
    Max(Box<Expr>),
    /// `MIN(expr)`
    Min(Box<Expr>),
    /// `SUM(expr)`
    Sum(Box<Expr>),
}

impl Aggregate {
    /// Canonical function name.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Average(_) => "AVG",
            Aggregate::Count(_) => "COUNT",
            Aggregate::Max(_) => "MAX",
            Aggregate::Min(_) => "MIN",
            Aggregate::Sum(_) => "SUM",
        }
    }

    /// The argument expression; `None` only for `COUNT(*)`.
    pub fn argument(&self) -> Option<&Expr> {
        match self {
            Aggregate::Average(e) | Aggregate::Max(e) | Aggregate::Min(e) | Aggregate::Sum(e) => {
                Some(e.as_ref())
            }
            Aggregate::Count(e) => e.as_deref(),
        }
    }

    /// Same aggregate over a transformed argument.
    pub fn map_argument(&self, mut f: impl FnMut(&Expr) -> Expr) -> Aggregate {
        let mut boxed = |e: &Expr| Box::new(f(e));
        match self {
            Aggregate::Average(e) => Aggregate::Average(boxed(e)),
            Aggregate::Count(e) => Aggregate::Count(e.as_deref().map(boxed)),
            Aggregate::Max(e) => Aggregate::Max(boxed(e)),
            Aggregate::Min(e) => Aggregate::Min(boxed(e)),
            Aggregate::Sum(e) => Aggregate::Sum(boxed(e)),
        }
    }
}
