//! Aggregate processor.
//!
//! One accumulator per select column, folded over every qualifying record.
//! Numeric totals are summed exactly, so record order never changes the
//! result.

use std::{cmp::Ordering, collections::BTreeMap};

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    ast::{Aggregate, Column},
    evaluator::{EvalContext, EvalError, Evaluator},
    value::{Value, compare_numbers},
};

/// Running numeric total.
///
/// Decimal inputs are summed as integer mantissas, one bucket per scale, and
/// the buckets are only combined when the result is read. Numbers with no
/// decimal form go into a separate float sum.
#[derive(Debug, Clone, Default, PartialEq)]
struct Total {
    mantissas: BTreeMap<u32, i128>,
    approximate: Option<f64>,
}

impl Total {
    fn add(&mut self, value: &Value) {
        if let Some(d) = value.as_decimal() {
            let bucket = self.mantissas.entry(d.scale()).or_insert(0);
            if let Some(sum) = bucket.checked_add(d.mantissa()) {
                *bucket = sum;
                return;
            }
        }
        *self.approximate.get_or_insert(0.0) += value.as_float().unwrap_or(0.0);
    }

    /// Buckets combined in scale order; `None` once the sum leaves the
    /// decimal range.
    fn exact(&self) -> Option<Decimal> {
        self.mantissas
            .iter()
            .try_fold(Decimal::ZERO, |sum, (&scale, &mantissa)| {
                sum.checked_add(Decimal::try_from_i128_with_scale(mantissa, scale).ok()?)
            })
    }

    fn as_float(&self) -> f64 {
        let exact = match self.exact() {
            Some(d) => d.to_f64().unwrap_or(f64::NAN),
            None => self
                .mantissas
                .iter()
                .map(|(&scale, &mantissa)| mantissa as f64 / 10f64.powi(scale as i32))
                .sum(),
        };
        exact + self.approximate.unwrap_or(0.0)
    }

    fn to_value(&self) -> Value {
        match (self.approximate, self.exact()) {
            (None, Some(d)) => Value::from_decimal(d),
            _ => Value::Float(self.as_float()),
        }
    }

    fn average(&self, count: u64) -> Value {
        if self.approximate.is_none()
            && let Some(mean) = self
                .exact()
                .and_then(|sum| sum.checked_div(Decimal::from(count)))
        {
            return Value::from_decimal(mean);
        }
        Value::Float(self.as_float() / count as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Accumulator {
    Average { count: u64, total: Total },
    Count(u64),
    Max(Option<Value>),
    Min(Option<Value>),
    Sum(Option<Total>),
}

impl Accumulator {
    fn for_aggregate(aggregate: &Aggregate) -> Self {
        match aggregate {
            Aggregate::Average(_) => Accumulator::Average {
                count: 0,
                total: Total::default(),
            },
            Aggregate::Count(_) => Accumulator::Count(0),
            Aggregate::Max(_) => Accumulator::Max(None),
            Aggregate::Min(_) => Accumulator::Min(None),
            Aggregate::Sum(_) => Accumulator::Sum(None),
        }
    }

    fn fold(&mut self, name: &str, value: Option<Value>) -> Result<(), EvalError> {
        match self {
            Accumulator::Count(count) => {
                if value.is_some() {
                    *count += 1;
                }
            }
            Accumulator::Average { count, total } => {
                if let Some(v) = numeric_input(name, value)? {
                    total.add(&v);
                    *count += 1;
                }
            }
            Accumulator::Sum(total) => {
                if let Some(v) = numeric_input(name, value)? {
                    total.get_or_insert_with(Total::default).add(&v);
                }
            }
            Accumulator::Max(best) => keep_best(name, best, value, Ordering::Greater)?,
            Accumulator::Min(best) => keep_best(name, best, value, Ordering::Less)?,
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        match self {
            Accumulator::Average { count: 0, .. } => Value::Null,
            Accumulator::Average { count, total } => total.average(*count),
            Accumulator::Count(count) => Value::Integer(i64::try_from(*count).unwrap_or(i64::MAX)),
            Accumulator::Max(best) | Accumulator::Min(best) => best.clone().unwrap_or(Value::Null),
            Accumulator::Sum(total) => total.as_ref().map(Total::to_value).unwrap_or(Value::Null),
        }
    }
}

/// Missing and null inputs are skipped; anything else must be a number.
fn numeric_input(name: &str, value: Option<Value>) -> Result<Option<Value>, EvalError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) if v.is_number() => Ok(Some(v)),
        Some(v) => Err(EvalError::TypeError(format!(
            "{}() requires numeric values, got {}",
            name,
            v.type_name()
        ))),
    }
}

fn keep_best(
    name: &str,
    best: &mut Option<Value>,
    value: Option<Value>,
    wanted: Ordering,
) -> Result<(), EvalError> {
    let candidate = match value {
        None | Some(Value::Null) => return Ok(()),
        Some(v @ (Value::Integer(_) | Value::Float(_) | Value::String(_))) => v,
        Some(v) => {
            return Err(EvalError::TypeError(format!(
                "{}() requires numbers or strings, got {}",
                name,
                v.type_name()
            )));
        }
    };

    let Some(current) = best.as_ref() else {
        *best = Some(candidate);
        return Ok(());
    };

    let ordering = match (&candidate, current) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (a, b) if a.is_number() && b.is_number() => {
            compare_numbers(a, b).unwrap_or(Ordering::Equal)
        }
        (a, b) => {
            return Err(EvalError::TypeError(format!(
                "{}() cannot compare {} with {}",
                name,
                a.type_name(),
                b.type_name()
            )));
        }
    };
    if ordering == wanted {
        *best = Some(candidate);
    }
    Ok(())
}

struct AggregateColumn {
    key: String,
    aggregate: Aggregate,
    accumulator: Accumulator,
}

/// Accumulates one aggregate row across records.
///
/// # Examples
///
/// ```
/// use ndjson_select::{AggregateProcessor, EvalContext, Evaluator, Identifier, Value, parse};
/// use ndjson_select::ast::SelectClause;
///
/// let query = parse("SELECT COUNT(*), SUM(s.n) AS total FROM s3object s").unwrap();
/// let SelectClause::List(columns) = &query.select else { unreachable!() };
///
/// let alias = Identifier::new("s");
/// let mut evaluator = Evaluator::new();
/// let mut processor = AggregateProcessor::new(columns).unwrap();
/// for line in [r#"{"n": 2}"#, r#"{"n": 3}"#] {
///     let record = Value::parse_json(line).unwrap();
///     processor
///         .process_record(&mut evaluator, EvalContext::document(&alias, &record))
///         .unwrap();
/// }
/// assert_eq!(processor.finish().to_string(), r#"{"_1":2,"total":5}"#);
/// ```
pub struct AggregateProcessor {
    columns: Vec<AggregateColumn>,
}

impl AggregateProcessor {
    /// Builds one accumulator per column. Every column must be an aggregate call.
    pub fn new(columns: &[Column]) -> Result<Self, EvalError> {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let aggregate = column.expr.as_aggregate().ok_or_else(|| {
                    EvalError::TypeError(format!(
                        "column {} is not an aggregate call",
                        column.expr
                    ))
                })?;
                Ok(AggregateColumn {
                    key: column.output_name(index),
                    aggregate: aggregate.clone(),
                    accumulator: Accumulator::for_aggregate(aggregate),
                })
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        Ok(AggregateProcessor { columns })
    }

    /// Folds one qualifying record into every accumulator.
    pub fn process_record(
        &mut self,
        evaluator: &mut Evaluator,
        ctx: EvalContext<'_>,
    ) -> Result<(), EvalError> {
        for column in &mut self.columns {
            let value = match column.aggregate.argument() {
                Some(arg) => evaluator.eval_expression(arg, ctx)?,
                // COUNT(*) counts every record
                None => Some(Value::Boolean(true)),
            };
            column.accumulator.fold(column.aggregate.name(), value)?;
        }
        Ok(())
    }

    /// The single output row.
    pub fn finish(&self) -> Value {
        Value::Object(
            self.columns
                .iter()
                .map(|c| (c.key.clone(), c.accumulator.finish()))
                .collect(),
        )
    }
}
