//! Streaming capture of slotted paths.
//!
//! A record line is walked once, guided by the [`PathIndex`] trie. Only the
//! objects on a referenced path are scanned; member values are kept as raw
//! JSON slices and never materialized unless a slot needs them.

use std::{
    cell::RefCell,
    fmt,
    ops::{Deref, DerefMut},
};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use serde_json::value::RawValue;

use crate::{
    ast::Identifier,
    evaluator::{EvalError, SlotSource},
    path_index::{PathIndex, PathNode},
    value::Value,
};

/// Members of one JSON object in document order, values left unparsed.
///
/// Duplicate keys are kept; lookups resolve them the way a parsed object
/// does, where the last value wins at the first key's position.
struct ObjectEntries<'a>(Vec<(String, &'a RawValue)>);

impl<'a> ObjectEntries<'a> {
    fn last_value(&self, key: &str) -> Option<&'a RawValue> {
        self.0.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Same resolution as [`Value::get`].
    fn get(&self, name: &Identifier) -> Option<&'a RawValue> {
        if let Some(value) = self.last_value(&name.name) {
            return Some(value);
        }
        if name.case_sensitive {
            return None;
        }
        let (key, _) = self.0.iter().find(|(k, _)| name.matches(k))?;
        self.last_value(key)
    }
}

impl<'de> Deserialize<'de> for ObjectEntries<'de> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ObjectEntries<'de>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    let value: &'de RawValue = map.next_value()?;
                    entries.push((key, value));
                }
                Ok(ObjectEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn is_object(raw: &RawValue) -> bool {
    raw.get().trim_start().starts_with('{')
}

/// A captured slot that can produce its value.
pub trait Captured {
    fn load(&self) -> Result<Value, serde_json::Error>;
}

impl Captured for &RawValue {
    fn load(&self) -> Result<Value, serde_json::Error> {
        Value::parse_json(self.get())
    }
}

impl Captured for Value {
    fn load(&self) -> Result<Value, serde_json::Error> {
        Ok(self.clone())
    }
}

/// How a slot is stored at capture time.
pub trait Strategy {
    type Slot<'a>: Captured;

    fn capture<'a>(raw: &'a RawValue) -> Result<Self::Slot<'a>, serde_json::Error>;
}

/// Keeps the raw byte range and parses it when the slot is read.
pub struct Lazy;

/// Parses the value while streaming.
pub struct Eager;

impl Strategy for Lazy {
    type Slot<'a> = &'a RawValue;

    fn capture<'a>(raw: &'a RawValue) -> Result<Self::Slot<'a>, serde_json::Error> {
        Ok(raw)
    }
}

impl Strategy for Eager {
    type Slot<'a> = Value;

    fn capture<'a>(raw: &'a RawValue) -> Result<Self::Slot<'a>, serde_json::Error> {
        Value::parse_json(raw.get())
    }
}

/// Walks one record line and fills `slots` for every referenced path present.
///
/// Slots for absent paths are left `None`. The whole line is still validated
/// as JSON.
pub fn capture_record<'a, S: Strategy>(
    index: &PathIndex,
    line: &'a str,
    slots: &mut [Option<S::Slot<'a>>],
) -> Result<(), serde_json::Error> {
    let raw: &'a RawValue = serde_json::from_str(line)?;
    walk::<S>(index.root(), raw, slots)
}

fn walk<'a, S: Strategy>(
    node: &PathNode,
    raw: &'a RawValue,
    slots: &mut [Option<S::Slot<'a>>],
) -> Result<(), serde_json::Error> {
    if let Some(slot) = node.slot()
        && let Some(target) = slots.get_mut(slot)
    {
        *target = Some(S::capture(raw)?);
    }

    if node.children().is_empty() || !is_object(raw) {
        return Ok(());
    }

    let entries: ObjectEntries<'a> = serde_json::from_str(raw.get())?;
    for (name, child) in node.children() {
        if let Some(value) = entries.get(name) {
            walk::<S>(child, value, slots)?;
        }
    }
    Ok(())
}

/// Captured slots for one record, read by the evaluator.
pub struct SlotTable<'t, T> {
    slots: &'t [Option<T>],
    line: usize,
}

impl<'t, T> SlotTable<'t, T> {
    pub fn new(slots: &'t [Option<T>], line: usize) -> Self {
        SlotTable { slots, line }
    }
}

impl<T: Captured> SlotSource for SlotTable<'_, T> {
    fn slot(&self, slot: usize) -> Result<Option<Value>, EvalError> {
        match self.slots.get(slot) {
            None => Err(EvalError::UnresolvedSlot(format!(
                "slot {} was never allocated",
                slot
            ))),
            Some(None) => Ok(None),
            Some(Some(captured)) => {
                captured
                    .load()
                    .map(Some)
                    .map_err(|e| EvalError::InvalidInput {
                        line: self.line,
                        message: e.to_string(),
                    })
            }
        }
    }
}

/// Reusable slot buffers for one run.
///
/// A buffer is taken per record and goes back to the pool when its guard is
/// dropped, on success and error paths alike.
pub struct SlotPool<T> {
    width: usize,
    free: RefCell<Vec<Vec<Option<T>>>>,
}

impl<T> SlotPool<T> {
    pub fn new(width: usize) -> Self {
        SlotPool {
            width,
            free: RefCell::new(Vec::new()),
        }
    }

    /// A cleared buffer with one empty entry per slot.
    pub fn acquire(&self) -> SlotBuffer<'_, T> {
        let mut slots = self.free.borrow_mut().pop().unwrap_or_default();
        slots.resize_with(self.width, || None);
        SlotBuffer { pool: self, slots }
    }

    /// Buffers currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }
}

/// Guard over a pooled buffer.
pub struct SlotBuffer<'p, T> {
    pool: &'p SlotPool<T>,
    slots: Vec<Option<T>>,
}

impl<T> Deref for SlotBuffer<'_, T> {
    type Target = [Option<T>];

    fn deref(&self) -> &Self::Target {
        &self.slots
    }
}

impl<T> DerefMut for SlotBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slots
    }
}

impl<T> Drop for SlotBuffer<'_, T> {
    fn drop(&mut self) {
        let mut slots = std::mem::take(&mut self.slots);
        slots.clear();
        self.pool.free.borrow_mut().push(slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn index_for(exprs: &[&str]) -> PathIndex {
        let mut index = PathIndex::new(Identifier::new("s"));
        for expr in exprs {
            index.rewrite(&parse_expression(expr).unwrap());
        }
        index
    }

    #[test]
    fn test_lazy_capture_keeps_raw_text() {
        let index = index_for(&["s.a.b", "s.c"]);
        let mut slots = vec![None; index.len()];
        capture_record::<Lazy>(&index, r#"{"a": {"b": [1, 2]}, "z": {"deep": 1}}"#, &mut slots)
            .unwrap();

        assert_eq!(slots[0].map(RawValue::get), Some("[1, 2]"));
        assert!(slots[1].is_none());
    }

    #[test]
    fn test_eager_capture_uses_record_lookup_rules() {
        let index = index_for(&["s.NAME", r#"s."Id""#, "s.k"]);
        let mut slots = vec![None; index.len()];
        capture_record::<Eager>(&index, r#"{"name": "x", "id": 1, "k": 1, "k": 2}"#, &mut slots)
            .unwrap();

        assert_eq!(slots[0], Some(Value::String("x".to_string())));
        assert_eq!(slots[1], None);
        assert_eq!(slots[2], Some(Value::Integer(2)));
    }

    #[test]
    fn test_paths_through_scalars_are_missing() {
        let index = index_for(&["s.a.b"]);
        let mut slots: Vec<Option<&RawValue>> = vec![None; index.len()];
        capture_record::<Lazy>(&index, r#"{"a": 5}"#, &mut slots).unwrap();
        assert!(slots[0].is_none());
    }

    #[test]
    fn test_malformed_line_is_rejected() {
        let index = index_for(&["s.a"]);
        let mut slots: Vec<Option<&RawValue>> = vec![None; index.len()];
        assert!(capture_record::<Lazy>(&index, r#"{"a": 1"#, &mut slots).is_err());
    }

    #[test]
    fn test_buffer_returns_to_pool_on_drop() {
        let pool: SlotPool<Value> = SlotPool::new(2);
        {
            let mut buffer = pool.acquire();
            buffer[1] = Some(Value::Null);
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);

        let buffer = pool.acquire();
        assert!(buffer.iter().all(Option::is_none));
        assert_eq!(buffer.len(), 2);
    }
}
