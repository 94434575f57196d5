use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::ast::{Aggregate, BinOp, Function, UnaryOp};

/// A possibly-quoted name.
///
/// Only identifiers written in double quotes are matched case-sensitively;
/// bare identifiers fall back to a case-insensitive key scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub case_sensitive: bool,
}

impl Identifier {
    /// A bare (case-insensitive) identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            case_sensitive: false,
        }
    }

    /// A quoted (case-sensitive) identifier.
    pub fn quoted(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            case_sensitive: true,
        }
    }

    /// Whether this identifier refers to `key`, honouring case sensitivity.
    pub fn matches(&self, key: &str) -> bool {
        if self.case_sensitive {
            self.name == key
        } else {
            keys_match_ignore_case(&self.name, key)
        }
    }
}

/// Case-insensitive key comparison used by every lookup path.
pub fn keys_match_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || (!a.is_ascii() && a.to_lowercase() == b.to_lowercase())
}

/// Dotted path such as `s.address.city` or `s.*`.
///
/// Always names at least two components: a single identifier is an
/// [`Expr::Identifier`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Qualified {
    pub names: Vec<Identifier>,
    /// Trailing `*` component
    pub star: bool,
}

/// `expr IN (a, b, ...)`.
///
/// When every candidate is a string literal, the candidates are also kept
/// as a set so membership is a hash lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct InList {
    pub expr: Box<Expr>,
    pub matches: Vec<Expr>,
    literals: Option<HashSet<String>>,
}

impl InList {
    pub fn new(expr: Expr, matches: Vec<Expr>) -> Self {
        let literals = matches
            .iter()
            .map(|m| match m {
                Expr::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect::<Option<HashSet<String>>>();

        InList {
            expr: Box::new(expr),
            matches,
            literals,
        }
    }

    /// Precomputed candidate set, present only for all-string-literal lists.
    pub fn literal_set(&self) -> Option<&HashSet<String>> {
        self.literals.as_ref()
    }
}

/// Reference to a captured slot, produced only by the path index compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReference {
    pub slot: usize,
    /// The path expression this reference replaced; used for rendering.
    pub source: Box<Expr>,
}

/// Expression tree node.
///
/// Closed set of node kinds; trees are immutable once built and compared
/// structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// String literal
    ///
    /// # Example
    /// ```text
    /// 'hello'
    /// ```
    String(String),

    /// Numeric literal with exact decimal precision
    ///
    /// # Example
    /// ```text
    /// 42.50
    /// ```
    Number(Decimal),

    /// Boolean literal
    Boolean(bool),

    // References
    /// Single name, either the table alias or a top-level field
    Identifier(Identifier),

    /// Dotted path
    ///
    /// # Examples
    /// ```text
    /// s.name
    /// s.address.city
    /// ```
    Qualified(Qualified),

    /// Scalar or aggregate function call
    Function(Function),

    // Operations
    /// `NOT expr` or `-expr`
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Binary operation (logical, comparison, arithmetic, concatenation)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `expr [NOT] BETWEEN lower AND upper`
    Between {
        negate: bool,
        expr: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },

    /// `expr IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negate: bool },

    /// `expr IS [NOT] MISSING`
    Presence { expr: Box<Expr>, negate: bool },

    /// `expr IN (...)`
    In(InList),

    /// `expr LIKE pattern [ESCAPE escape]`
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
    },

    /// Slot reference, never produced by the parser
    IndexReference(IndexReference),
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Expr {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Builds a dotted path, collapsing a lone name to an identifier.
    pub fn path(mut names: Vec<Identifier>, star: bool) -> Expr {
        if names.len() == 1 && !star {
            if let Some(name) = names.pop() {
                return Expr::Identifier(name);
            }
        }
        Expr::Qualified(Qualified { names, star })
    }

    pub fn in_list(expr: Expr, matches: Vec<Expr>) -> Expr {
        Expr::In(InList::new(expr, matches))
    }

    /// The aggregate, if this node is a top-level aggregate call.
    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            Expr::Function(Function::Aggregate(agg)) => Some(agg),
            _ => None,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::String(_)
            | Expr::Number(_)
            | Expr::Boolean(_)
            | Expr::Identifier(_)
            | Expr::Qualified(_)
            | Expr::IndexReference(_) => vec![],
            Expr::Function(Function::Scalar { args, .. }) => args.iter().collect(),
            Expr::Function(Function::Aggregate(agg)) => agg.argument().into_iter().collect(),
            Expr::Unary { expr, .. } => vec![expr.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Between {
                expr, lower, upper, ..
            } => vec![expr.as_ref(), lower.as_ref(), upper.as_ref()],
            Expr::IsNull { expr, .. } | Expr::Presence { expr, .. } => vec![expr.as_ref()],
            Expr::In(list) => std::iter::once(list.expr.as_ref())
                .chain(list.matches.iter())
                .collect(),
            Expr::Like {
                expr,
                pattern,
                escape,
            } => {
                let mut children = vec![expr.as_ref(), pattern.as_ref()];
                if let Some(escape) = escape {
                    children.push(escape.as_ref());
                }
                children
            }
        }
    }

    /// Whether any node in this tree satisfies `predicate`.
    pub fn any(&self, predicate: &impl Fn(&Expr) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|c| c.any(predicate))
    }

    /// Whether an aggregate call appears anywhere in this tree.
    pub fn contains_aggregate(&self) -> bool {
        self.any(&|e| e.as_aggregate().is_some())
    }

    /// Builds a new tree, replacing every node for which `replace` returns
    /// `Some`. Replaced nodes are not descended into.
    pub fn rewrite(&self, replace: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replacement) = replace(self) {
            return replacement;
        }

        match self {
            Expr::String(_)
            | Expr::Number(_)
            | Expr::Boolean(_)
            | Expr::Identifier(_)
            | Expr::Qualified(_)
            | Expr::IndexReference(_) => self.clone(),
            Expr::Function(Function::Scalar { name, args }) => Expr::Function(Function::Scalar {
                name: name.clone(),
                args: args.iter().map(|a| a.rewrite(replace)).collect(),
            }),
            Expr::Function(Function::Aggregate(agg)) => {
                Expr::Function(Function::Aggregate(agg.map_argument(|a| a.rewrite(replace))))
            }
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: rewrite_boxed(expr, replace),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: rewrite_boxed(left, replace),
                right: rewrite_boxed(right, replace),
            },
            Expr::Between {
                negate,
                expr,
                lower,
                upper,
            } => Expr::Between {
                negate: *negate,
                expr: rewrite_boxed(expr, replace),
                lower: rewrite_boxed(lower, replace),
                upper: rewrite_boxed(upper, replace),
            },
            Expr::IsNull { expr, negate } => Expr::IsNull {
                expr: rewrite_boxed(expr, replace),
                negate: *negate,
            },
            Expr::Presence { expr, negate } => Expr::Presence {
                expr: rewrite_boxed(expr, replace),
                negate: *negate,
            },
            Expr::In(list) => {
                let target = list.expr.rewrite(replace);
                let matches = list.matches.iter().map(|m| m.rewrite(replace)).collect();
                Expr::in_list(target, matches)
            }
            Expr::Like {
                expr,
                pattern,
                escape,
            } => Expr::Like {
                expr: rewrite_boxed(expr, replace),
                pattern: rewrite_boxed(pattern, replace),
                escape: escape.as_ref().map(|e| rewrite_boxed(e, replace)),
            },
        }
    }
}

fn rewrite_boxed(expr: &Expr, replace: &mut impl FnMut(&Expr) -> Option<Expr>) -> Box<Expr> {
    Box::new(expr.rewrite(replace))
}
