use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::{
    ast::{BinOp, Expr, Function, Identifier, InList, UnaryOp},
    pattern::{PatternCache, escape_char},
    value::{Value, compare_numbers},
};

/// Source of captured slot values for path-indexed evaluation.
pub trait SlotSource {
    /// Value captured for `slot`; `None` when the path was absent.
    fn slot(&self, slot: usize) -> Result<Option<Value>, EvalError>;
}

/// What references in an expression resolve against.
#[derive(Clone, Copy)]
pub enum EvalContext<'r> {
    /// A whole record bound to the table alias
    Document {
        binding: &'r Identifier,
        record: &'r Value,
    },
    /// Slots captured by a streaming pass; only slot references resolve
    Slots(&'r dyn SlotSource),
}

impl<'r> EvalContext<'r> {
    pub fn document(binding: &'r Identifier, record: &'r Value) -> Self {
        EvalContext::Document { binding, record }
    }
}

/// The expression evaluator.
///
/// Results are `Option<Value>`: `None` is a missing value, which is distinct
/// from a present `Value::Null`. The evaluator owns the per-run LIKE pattern
/// cache, so one instance should not be shared across runs.
#[derive(Default)]
pub struct Evaluator {
    patterns: PatternCache,
}

/// Errors that abort evaluation.
///
/// Missing fields are never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Operand of the wrong kind for an operator or function
    TypeError(String),

    /// Division or modulo by zero
    DivisionByZero,

    /// Malformed ESCAPE operand or dangling escape in a LIKE pattern
    InvalidEscape(String),

    /// Aggregate call evaluated per record
    AggregateOutsideContext(String),

    /// Scalar function name that does not resolve
    UnknownFunction(String),

    /// Reference that was not compiled to a slot, or a slot never allocated
    UnresolvedSlot(String),

    /// Input line that is not valid UTF-8 or not a JSON document
    InvalidInput { line: usize, message: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::InvalidEscape(msg) => write!(f, "Invalid LIKE escape: {}", msg),
            EvalError::AggregateOutsideContext(expr) => write!(
                f,
                "Aggregate {} cannot be evaluated outside an aggregate projection",
                expr
            ),
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            EvalError::UnresolvedSlot(msg) => write!(f, "Unresolved slot: {}", msg),
            EvalError::InvalidInput { line, message } => {
                write!(f, "Invalid input on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Path of a plain field reference relative to the record.
///
/// A leading identifier equal to the table alias is stripped; the alias on
/// its own yields the empty path (the whole record). Returns `None` for
/// anything that is not a plain reference, including `alias.*`.
pub fn reference_path<'e>(expr: &'e Expr, binding: &Identifier) -> Option<&'e [Identifier]> {
    let empty: &[Identifier] = &[];
    match expr {
        Expr::Identifier(id) if id.matches(&binding.name) => Some(empty),
        Expr::Identifier(id) => Some(std::slice::from_ref(id)),
        Expr::Qualified(q) if !q.star => match q.names.split_first() {
            Some((head, rest)) if head.matches(&binding.name) => Some(rest),
            _ => Some(&q.names),
        },
        _ => None,
    }
}

fn resolve_path(record: &Value, path: &[Identifier]) -> Option<Value> {
    let mut current = record;
    for name in path {
        current = current.get(name)?;
    }
    Some(current.clone())
}

impl Evaluator {
    /// Creates a new evaluator with an empty pattern cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates an expression in the given context.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndjson_select::{EvalContext, Evaluator, Identifier, Value, parser::parse_expression};
    ///
    /// let record = Value::parse_json(r#"{"a": 2}"#).unwrap();
    /// let alias = Identifier::new("s");
    /// let expr = parse_expression("s.a * 3").unwrap();
    ///
    /// let mut evaluator = Evaluator::new();
    /// let result = evaluator
    ///     .eval_expression(&expr, EvalContext::document(&alias, &record))
    ///     .unwrap();
    /// assert_eq!(result, Some(Value::Integer(6)));
    /// ```
    pub fn eval_expression(
        &mut self,
        expr: &Expr,
        ctx: EvalContext<'_>,
    ) -> Result<Option<Value>, EvalError> {
        self.eval_expr(expr, ctx)
    }

    /// Whether a record qualifies under a WHERE condition.
    ///
    /// Only `TRUE` qualifies; `FALSE`, `NULL` and missing do not.
    pub fn matches(&mut self, condition: &Expr, ctx: EvalContext<'_>) -> Result<bool, EvalError> {
        match self.eval_expr(condition, ctx)? {
            Some(Value::Boolean(b)) => Ok(b),
            Some(Value::Null) | None => Ok(false),
            Some(other) => Err(EvalError::TypeError(format!(
                "WHERE condition {} evaluated to {}, expected boolean",
                condition,
                other.type_name()
            ))),
        }
    }

    fn eval_expr(&mut self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Option<Value>, EvalError> {
        match expr {
            Expr::String(s) => Ok(Some(Value::String(s.clone()))),
            Expr::Number(n) => Ok(Some(Value::from_decimal(*n))),
            Expr::Boolean(b) => Ok(Some(Value::Boolean(*b))),
            Expr::Identifier(_) | Expr::Qualified(_) => self.eval_reference(expr, ctx),
            Expr::IndexReference(reference) => match ctx {
                EvalContext::Slots(slots) => slots.slot(reference.slot),
                EvalContext::Document { .. } => self.eval_reference(&reference.source, ctx),
            },
            Expr::Function(Function::Scalar { name, args }) => self.eval_scalar(name, args, ctx),
            Expr::Function(Function::Aggregate(_)) => {
                Err(EvalError::AggregateOutsideContext(expr.to_string()))
            }
            Expr::Unary { op, expr } => {
                let operand = self.eval_expr(expr, ctx)?;
                operand.map(|v| apply_unary(*op, v)).transpose()
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left, ctx)?;
                let right = self.eval_expr(right, ctx)?;
                match (left, right) {
                    (Some(l), Some(r)) => apply_binop(*op, &l, &r).map(Some),
                    // missing + X yields X, X + missing yields null
                    (None, r) if *op == BinOp::Add => Ok(r),
                    (Some(_), None) if *op == BinOp::Add => Ok(Some(Value::Null)),
                    _ => Ok(None),
                }
            }
            Expr::Between {
                negate,
                expr,
                lower,
                upper,
            } => {
                let value = self.eval_expr(expr, ctx)?;
                let lower = self.eval_expr(lower, ctx)?;
                let upper = self.eval_expr(upper, ctx)?;
                let (Some(value), Some(lower), Some(upper)) = (value, lower, upper) else {
                    return Ok(None);
                };

                let above = apply_binop(BinOp::GreaterOrEqual, &value, &lower)?;
                let below = apply_binop(BinOp::LesserOrEqual, &value, &upper)?;
                let within = apply_binop(BinOp::And, &above, &below)?;
                Ok(Some(match within {
                    Value::Boolean(b) => Value::Boolean(b != *negate),
                    other => other,
                }))
            }
            Expr::IsNull { expr, negate } => {
                let value = self.eval_expr(expr, ctx)?;
                Ok(Some(Value::Boolean(
                    matches!(value, Some(Value::Null)) != *negate,
                )))
            }
            Expr::Presence { expr, negate } => {
                let value = self.eval_expr(expr, ctx)?;
                Ok(Some(Value::Boolean(value.is_none() != *negate)))
            }
            Expr::In(list) => self.eval_in(list, ctx),
            Expr::Like {
                expr,
                pattern,
                escape,
            } => self.eval_like(expr, pattern, escape.as_deref(), ctx),
        }
    }

    fn eval_reference(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Option<Value>, EvalError> {
        match ctx {
            EvalContext::Document { binding, record } => match reference_path(expr, binding) {
                Some(path) => Ok(resolve_path(record, path)),
                None => Err(EvalError::TypeError(format!(
                    "{} cannot be evaluated as a value",
                    expr
                ))),
            },
            EvalContext::Slots(_) => Err(EvalError::UnresolvedSlot(format!(
                "reference {} was not compiled to a slot",
                expr
            ))),
        }
    }

    fn eval_scalar(
        &mut self,
        name: &str,
        args: &[Expr],
        ctx: EvalContext<'_>,
    ) -> Result<Option<Value>, EvalError> {
        if !name.eq_ignore_ascii_case("LOWER") {
            return Err(EvalError::UnknownFunction(name.to_string()));
        }
        let [arg] = args else {
            return Err(EvalError::TypeError(format!(
                "{}() takes exactly one argument, got {}",
                name,
                args.len()
            )));
        };

        match self.eval_expr(arg, ctx)? {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(Value::Null)),
            Some(Value::String(s)) => Ok(Some(Value::String(s.to_lowercase()))),
            Some(other) => Err(EvalError::TypeError(format!(
                "{}() requires string, got {}",
                name,
                other.type_name()
            ))),
        }
    }

    fn eval_in(&mut self, list: &InList, ctx: EvalContext<'_>) -> Result<Option<Value>, EvalError> {
        let Some(target) = self.eval_expr(&list.expr, ctx)? else {
            return Ok(None);
        };

        if let Some(literals) = list.literal_set() {
            let found = match &target {
                Value::String(s) => literals.contains(s),
                _ => false,
            };
            return Ok(Some(Value::Boolean(found)));
        }

        for candidate in &list.matches {
            if let Some(candidate) = self.eval_expr(candidate, ctx)?
                && target.same_kind(&candidate)
                && target.loosely_equals(&candidate)
            {
                return Ok(Some(Value::Boolean(true)));
            }
        }
        Ok(Some(Value::Boolean(false)))
    }

    fn eval_like(
        &mut self,
        expr: &Expr,
        pattern: &Expr,
        escape: Option<&Expr>,
        ctx: EvalContext<'_>,
    ) -> Result<Option<Value>, EvalError> {
        let value = self.eval_expr(expr, ctx)?;
        let pattern = self.eval_expr(pattern, ctx)?;

        let escape = match escape {
            None => None,
            Some(escape) => match self.eval_expr(escape, ctx)? {
                Some(Value::String(s)) => Some(escape_char(&s)?),
                None => return Ok(Some(Value::Boolean(false))),
                Some(other) => {
                    return Err(EvalError::InvalidEscape(format!(
                        "ESCAPE must be a string, got {}",
                        other.type_name()
                    )));
                }
            },
        };

        let (Some(Value::String(value)), Some(Value::String(pattern))) = (value, pattern) else {
            return Ok(Some(Value::Boolean(false)));
        };

        let compiled = self.patterns.get(&pattern, escape)?;
        Ok(Some(Value::Boolean(compiled.is_match(&value))))
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Negate, Value::Integer(n)) => Ok(n
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or(Value::Float(-(n as f64)))),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, v) => Err(EvalError::TypeError(format!(
            "NOT requires boolean, got {}",
            v.type_name()
        ))),
        (UnaryOp::Negate, v) => Err(EvalError::TypeError(format!(
            "Cannot negate {}",
            v.type_name()
        ))),
    }
}

/// Applies a binary operator to two present operands.
pub fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::And | BinOp::Or => logical(op, left, right),
        BinOp::Equal => Ok(Value::Boolean(
            left.same_kind(right) && left.loosely_equals(right),
        )),
        BinOp::NotEqual => Ok(Value::Boolean(
            !(left.same_kind(right) && left.loosely_equals(right)),
        )),
        BinOp::Lesser | BinOp::Greater | BinOp::LesserOrEqual | BinOp::GreaterOrEqual => {
            if matches!(left, Value::Null) || matches!(right, Value::Null) {
                return Ok(Value::Null);
            }
            let ordering = match compare_numbers(left, right) {
                Some(ordering) if left.is_number() && right.is_number() => ordering,
                _ => {
                    return Err(EvalError::TypeError(format!(
                        "Cannot compare {} {} {} (comparison requires numeric types)",
                        left.type_name(),
                        op.symbol(),
                        right.type_name()
                    )));
                }
            };
            Ok(Value::Boolean(match op {
                BinOp::Lesser => ordering == Ordering::Less,
                BinOp::Greater => ordering == Ordering::Greater,
                BinOp::LesserOrEqual => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinOp::Add if !(left.is_number() && right.is_number()) => Ok(Value::String(format!(
            "{}{}",
            left.as_text(),
            right.as_text()
        ))),
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
            if matches!(left, Value::Null) || matches!(right, Value::Null) {
                return Ok(Value::Null);
            }
            arithmetic(op, left, right)
        }
        BinOp::Concat => Ok(Value::String(format!(
            "{}{}",
            left.as_text(),
            right.as_text()
        ))),
    }
}

/// Three-valued AND/OR over booleans and null.
fn logical(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let truth = |v: &Value| match v {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(EvalError::TypeError(format!(
            "{} requires boolean operands, got {}",
            op.symbol(),
            other.type_name()
        ))),
    };
    let (l, r) = (truth(left)?, truth(right)?);

    let result = match op {
        BinOp::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        _ => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    };
    Ok(result.map(Value::Boolean).unwrap_or(Value::Null))
}

/// Numeric arithmetic, exact through `Decimal` whenever both operands are
/// representable and the result does not overflow.
pub fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(EvalError::TypeError(format!(
            "Cannot apply {} to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )));
    };

    if let (Some(ad), Some(bd)) = (left.as_decimal(), right.as_decimal()) {
        if matches!(op, BinOp::Divide | BinOp::Modulo) && bd.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        let result: Option<Decimal> = match op {
            BinOp::Add => ad.checked_add(bd),
            BinOp::Subtract => ad.checked_sub(bd),
            BinOp::Multiply => ad.checked_mul(bd),
            BinOp::Divide => ad.checked_div(bd),
            BinOp::Modulo => ad.checked_rem(bd),
            _ => None,
        };
        if let Some(rd) = result {
            return Ok(Value::from_decimal(rd));
        }
    }

    if matches!(op, BinOp::Divide | BinOp::Modulo) && b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let res = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        BinOp::Modulo => a % b,
        _ => {
            return Err(EvalError::TypeError(format!(
                "{} is not an arithmetic operator",
                op.symbol()
            )));
        }
    };
    Ok(Value::Float(res))
}
