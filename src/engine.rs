//! Query execution over newline-delimited JSON.
//!
//! A [`Plan`] is derived once from a query. Every engine feeds one record at
//! a time through the same runner, which applies the WHERE filter, builds
//! rows or folds aggregates, sorts and applies LIMIT/OFFSET. Engines differ
//! only in how a record is made available to the evaluator:
//!
//! - [`NaiveEngine`] parses each line into a [`Value`] and walks it per
//!   reference.
//! - [`IndexedEngine`] compiles references to slots and captures raw JSON
//!   slices in one pass, parsing a slot only when it is read.
//! - [`EagerEngine`] compiles the same way but parses captured slices while
//!   streaming.
//!
//! All three produce byte-identical output.

use std::cmp::Ordering;

use log::{debug, trace};

use crate::{
    aggregate::AggregateProcessor,
    ast::{Column, Direction, Expr, Identifier, LimitClause, Query, SelectClause},
    capture::{Eager, Lazy, SlotPool, SlotTable, Strategy, capture_record},
    evaluator::{EvalContext, EvalError, Evaluator},
    output::to_json,
    path_index::PathIndex,
    value::Value,
};

/// What each qualifying record turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT *`: the value bound to the alias
    Record(Expr),
    /// One object per record, missing columns omitted
    Columns(Vec<Column>),
    /// One object for the whole run
    Aggregate(Vec<Column>),
}

/// Execution plan for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub binding: Identifier,
    pub projection: Projection,
    pub condition: Option<Expr>,
    pub order: Vec<(Expr, Direction)>,
    pub limit: Option<LimitClause>,
}

impl Plan {
    pub fn new(query: &Query) -> Plan {
        let binding = query.from.binding();
        let projection = match &query.select {
            SelectClause::Star => Projection::Record(Expr::Identifier(binding.clone())),
            SelectClause::List(columns) if query.is_aggregate() => {
                Projection::Aggregate(columns.clone())
            }
            SelectClause::List(columns) => Projection::Columns(columns.clone()),
        };

        Plan {
            binding,
            projection,
            condition: query.where_clause.as_ref().map(|w| w.condition.clone()),
            order: query
                .order_by
                .as_ref()
                .map(|o| o.keys.iter().map(|k| (k.expr.clone(), k.direction)).collect())
                .unwrap_or_default(),
            limit: query.limit,
        }
    }

    /// Copy of this plan with every field reference compiled to a slot.
    pub fn compile(&self) -> (Plan, PathIndex) {
        let mut index = PathIndex::new(self.binding.clone());

        let projection = match &self.projection {
            Projection::Record(expr) => Projection::Record(index.rewrite_projected(expr)),
            Projection::Columns(columns) => Projection::Columns(project(columns, &mut index)),
            Projection::Aggregate(columns) => Projection::Aggregate(project(columns, &mut index)),
        };
        let condition = self.condition.as_ref().map(|c| index.rewrite(c));
        let order = self
            .order
            .iter()
            .map(|(expr, direction)| (index.rewrite(expr), *direction))
            .collect();

        debug!("compiled plan to {} slot(s)", index.len());
        let plan = Plan {
            binding: self.binding.clone(),
            projection,
            condition,
            order,
            limit: self.limit,
        };
        (plan, index)
    }

    fn offset(&self) -> u64 {
        self.limit.and_then(|l| l.offset).unwrap_or(0)
    }

    fn max_rows(&self) -> Option<u64> {
        self.limit.map(|l| l.limit)
    }

    fn qualifies(&self, evaluator: &mut Evaluator, ctx: EvalContext<'_>) -> Result<bool, EvalError> {
        match &self.condition {
            Some(condition) => evaluator.matches(condition, ctx),
            None => Ok(true),
        }
    }

    fn row(&self, evaluator: &mut Evaluator, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        match &self.projection {
            Projection::Record(expr) => Ok(evaluator.eval_expression(expr, ctx)?.unwrap_or(Value::Null)),
            Projection::Columns(columns) => {
                let mut entries = Vec::with_capacity(columns.len());
                for (index, column) in columns.iter().enumerate() {
                    if let Some(value) = evaluator.eval_expression(&column.expr, ctx)? {
                        entries.push((column.output_name(index), value));
                    }
                }
                Ok(Value::Object(entries))
            }
            Projection::Aggregate(_) => Err(EvalError::AggregateOutsideContext(
                "aggregate projection evaluated per record".to_string(),
            )),
        }
    }

    fn sort_keys(
        &self,
        evaluator: &mut Evaluator,
        ctx: EvalContext<'_>,
    ) -> Result<Vec<Option<Value>>, EvalError> {
        self.order
            .iter()
            .map(|(expr, _)| evaluator.eval_expression(expr, ctx))
            .collect()
    }

    fn compare_keys(&self, a: &[Option<Value>], b: &[Option<Value>]) -> Ordering {
        for ((x, y), (_, direction)) in a.iter().zip(b).zip(&self.order) {
            let ordering = Value::sort_cmp(x.as_ref(), y.as_ref());
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn project(columns: &[Column], index: &mut PathIndex) -> Vec<Column> {
    columns
        .iter()
        .map(|c| Column {
            expr: index.rewrite_projected(&c.expr),
            alias: c.alias.clone(),
        })
        .collect()
}

/// Makes one record line available to the evaluator.
trait Records<'a> {
    fn with_record<T>(
        &self,
        line: usize,
        text: &'a str,
        f: impl FnOnce(EvalContext<'_>) -> Result<T, EvalError>,
    ) -> Result<T, EvalError>;
}

struct Documents<'p> {
    binding: &'p Identifier,
}

impl<'a> Records<'a> for Documents<'_> {
    fn with_record<T>(
        &self,
        line: usize,
        text: &'a str,
        f: impl FnOnce(EvalContext<'_>) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let record = Value::parse_json(text).map_err(|e| EvalError::InvalidInput {
            line,
            message: e.to_string(),
        })?;
        f(EvalContext::document(self.binding, &record))
    }
}

struct Slotted<'p, 'a, S: Strategy> {
    index: &'p PathIndex,
    pool: SlotPool<S::Slot<'a>>,
}

impl<'a, S: Strategy> Records<'a> for Slotted<'_, 'a, S> {
    fn with_record<T>(
        &self,
        line: usize,
        text: &'a str,
        f: impl FnOnce(EvalContext<'_>) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let mut slots = self.pool.acquire();
        capture_record::<S>(self.index, text, &mut slots[..]).map_err(|e| EvalError::InvalidInput {
            line,
            message: e.to_string(),
        })?;
        let table = SlotTable::new(&slots[..], line);
        f(EvalContext::Slots(&table))
    }
}

/// Non-blank lines with their 1-based line numbers.
fn lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn decode(input: &[u8]) -> Result<&str, EvalError> {
    std::str::from_utf8(input).map_err(|e| {
        let line = input[..e.valid_up_to()].iter().filter(|&&b| b == b'\n').count() + 1;
        EvalError::InvalidInput {
            line,
            message: e.to_string(),
        }
    })
}

fn emit(out: &mut Vec<u8>, row: &Value) {
    out.extend_from_slice(to_json(row).as_bytes());
    out.push(b'\n');
}

/// Runs a plan over every record. Shared by all engines.
fn run<'a, R: Records<'a>>(plan: &Plan, input: &'a str, records: &R) -> Result<Vec<u8>, EvalError> {
    let mut evaluator = Evaluator::new();
    let mut out = Vec::new();
    let offset = plan.offset();
    let max_rows = plan.max_rows();
    let mut scanned = 0usize;
    let mut qualified = 0u64;

    if let Projection::Aggregate(columns) = &plan.projection {
        let mut processor = AggregateProcessor::new(columns)?;
        for (line, text) in lines(input) {
            if max_rows.is_some_and(|max| qualified >= offset.saturating_add(max)) {
                break;
            }
            scanned += 1;
            records.with_record(line, text, |ctx| {
                if !plan.qualifies(&mut evaluator, ctx)? {
                    return Ok(());
                }
                qualified += 1;
                if qualified <= offset {
                    return Ok(());
                }
                trace!("folding line {}", line);
                processor.process_record(&mut evaluator, ctx)
            })?;
        }
        emit(&mut out, &processor.finish());
        debug!("aggregated {} of {} record(s)", qualified.saturating_sub(offset), scanned);
        return Ok(out);
    }

    if plan.order.is_empty() {
        let mut emitted = 0u64;
        for (line, text) in lines(input) {
            if max_rows.is_some_and(|max| emitted >= max) {
                break;
            }
            scanned += 1;
            let row = records.with_record(line, text, |ctx| {
                if !plan.qualifies(&mut evaluator, ctx)? {
                    return Ok(None);
                }
                qualified += 1;
                if qualified <= offset {
                    return Ok(None);
                }
                plan.row(&mut evaluator, ctx).map(Some)
            })?;
            if let Some(row) = row {
                trace!("line {} produced a row", line);
                emit(&mut out, &row);
                emitted += 1;
            }
        }
        debug!("emitted {} row(s) from {} record(s)", emitted, scanned);
        return Ok(out);
    }

    let mut rows = Vec::new();
    for (line, text) in lines(input) {
        scanned += 1;
        let keyed = records.with_record(line, text, |ctx| {
            if !plan.qualifies(&mut evaluator, ctx)? {
                return Ok(None);
            }
            let keys = plan.sort_keys(&mut evaluator, ctx)?;
            Ok(Some((keys, plan.row(&mut evaluator, ctx)?)))
        })?;
        rows.extend(keyed);
    }

    // stable: ties keep input order
    rows.sort_by(|(a, _), (b, _)| plan.compare_keys(a, b));
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = max_rows
        .and_then(|max| usize::try_from(max).ok())
        .unwrap_or(usize::MAX);
    let mut emitted = 0usize;
    for (_, row) in rows.iter().skip(skip).take(take) {
        emit(&mut out, row);
        emitted += 1;
    }
    debug!(
        "sorted {} row(s) from {} record(s), emitted {}",
        rows.len(),
        scanned,
        emitted
    );
    Ok(out)
}

/// A strategy for evaluating a query over a buffer of NDJSON records.
pub trait Engine {
    fn name(&self) -> &'static str;

    /// Evaluates `query` over `input`, returning one JSON line per output row.
    ///
    /// The query is expected to have passed validation (see
    /// [`prepare`](crate::prepare)).
    fn evaluate(&self, query: &Query, input: &[u8]) -> Result<Vec<u8>, EvalError>;
}

/// Parses every record in full.
pub struct NaiveEngine;

impl Engine for NaiveEngine {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn evaluate(&self, query: &Query, input: &[u8]) -> Result<Vec<u8>, EvalError> {
        let input = decode(input)?;
        let plan = Plan::new(query);
        debug!("{}: {}", self.name(), query);
        run(&plan, input, &Documents { binding: &plan.binding })
    }
}

/// Slot-compiled evaluation with lazily parsed captures.
pub struct IndexedEngine;

impl Engine for IndexedEngine {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn evaluate(&self, query: &Query, input: &[u8]) -> Result<Vec<u8>, EvalError> {
        debug!("{}: {}", self.name(), query);
        run_slotted::<Lazy>(query, decode(input)?)
    }
}

/// Slot-compiled evaluation with captures parsed while streaming.
pub struct EagerEngine;

impl Engine for EagerEngine {
    fn name(&self) -> &'static str {
        "eager"
    }

    fn evaluate(&self, query: &Query, input: &[u8]) -> Result<Vec<u8>, EvalError> {
        debug!("{}: {}", self.name(), query);
        run_slotted::<Eager>(query, decode(input)?)
    }
}

fn run_slotted<S: Strategy>(query: &Query, input: &str) -> Result<Vec<u8>, EvalError> {
    let (plan, index) = Plan::new(query).compile();
    let records = Slotted::<S> {
        index: &index,
        pool: SlotPool::new(index.len()),
    };
    run(&plan, input, &records)
}

/// Selects an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineKind {
    Naive,
    #[default]
    Indexed,
    Eager,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [EngineKind::Naive, EngineKind::Indexed, EngineKind::Eager];

    pub fn engine(self) -> Box<dyn Engine> {
        match self {
            EngineKind::Naive => Box::new(NaiveEngine),
            EngineKind::Indexed => Box::new(IndexedEngine),
            EngineKind::Eager => Box::new(EagerEngine),
        }
    }
}

/// Evaluates `query` over `input` with the default engine.
///
/// # Examples
///
/// ```
/// use ndjson_select::{evaluate, prepare};
///
/// let query = prepare("SELECT s.name FROM S3Object s WHERE s.age > 30").unwrap();
/// let input = b"{\"name\":\"Ann\",\"age\":41}\n{\"name\":\"Bo\",\"age\":12}\n";
/// assert_eq!(evaluate(&query, input).unwrap(), b"{\"name\":\"Ann\"}\n");
/// ```
pub fn evaluate(query: &Query, input: &[u8]) -> Result<Vec<u8>, EvalError> {
    EngineKind::default().engine().evaluate(query, input)
}
