//! Canonical text rendering.
//!
//! Every operator node is rendered inside parentheses, so the text parses
//! back to a structurally equal tree regardless of precedence.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{
    Aggregate, Column, Direction, Expr, FromClause, Function, Identifier, LimitClause,
    OrderClause, Qualified, Query, SelectClause, UnaryOp,
};

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.case_sensitive {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            f.write_str(&self.name)
        }
    }
}

impl Display for Qualified {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_list(f, &self.names, ".")?;
        if self.star {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Function::Scalar { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args, ", ")?;
                f.write_char(')')
            }
            Function::Aggregate(Aggregate::Count(None)) => f.write_str("COUNT(*)"),
            Function::Aggregate(agg) => match agg.argument() {
                Some(arg) => write!(f, "{}({})", agg.name(), arg),
                None => write!(f, "{}(*)", agg.name()),
            },
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Boolean(true) => f.write_str("TRUE"),
            Expr::Boolean(false) => f.write_str("FALSE"),
            Expr::Identifier(id) => write!(f, "{}", id),
            Expr::Qualified(q) => write!(f, "{}", q),
            Expr::Function(func) => write!(f, "{}", func),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => write!(f, "(NOT {})", expr),
            Expr::Unary {
                op: UnaryOp::Negate,
                expr,
            } => write!(f, "(-{})", expr),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Between {
                negate,
                expr,
                lower,
                upper,
            } => write!(
                f,
                "({} {}BETWEEN {} AND {})",
                expr,
                if *negate { "NOT " } else { "" },
                lower,
                upper
            ),
            Expr::IsNull { expr, negate } => {
                write!(f, "({} IS {}NULL)", expr, if *negate { "NOT " } else { "" })
            }
            Expr::Presence { expr, negate } => {
                write!(f, "({} IS {}MISSING)", expr, if *negate { "NOT " } else { "" })
            }
            Expr::In(list) => {
                write!(f, "({} IN (", list.expr)?;
                write_list(f, &list.matches, ", ")?;
                f.write_str("))")
            }
            Expr::Like {
                expr,
                pattern,
                escape,
            } => match escape {
                Some(escape) => write!(f, "({} LIKE {} ESCAPE {})", expr, pattern, escape),
                None => write!(f, "({} LIKE {})", expr, pattern),
            },
            Expr::IndexReference(reference) => write!(f, "{}", reference.source),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl Display for SelectClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectClause::Star => f.write_str("*"),
            SelectClause::List(columns) => write_list(f, columns, ", "),
        }
    }
}

impl Display for FromClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " {}", alias)?;
        }
        Ok(())
    }
}

impl Display for OrderClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key.expr)?;
            if key.direction == Direction::Desc {
                f.write_str(" DESC")?;
            }
        }
        Ok(())
    }
}

impl Display for LimitClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.limit)?;
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.select, self.from)?;
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {}", where_clause.condition)?;
        }
        if let Some(order_by) = &self.order_by {
            write!(f, " ORDER BY {}", order_by)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
