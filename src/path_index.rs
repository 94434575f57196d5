//! Path index and slot compiler.
//!
//! Every distinct field path a query references is collected into a trie
//! rooted at the table alias and given a dense slot number. Referencing
//! expressions are rewritten to [`IndexReference`] nodes, so a record only
//! has to be walked once, capturing the slotted subtrees, before the
//! rewritten query evaluates against the captured slots alone.

use std::fmt::Write;

use log::debug;

use crate::{
    ast::{Expr, Identifier, IndexReference},
    evaluator::reference_path,
};

/// One trie node: a path from the record root.
#[derive(Debug, Default)]
pub struct PathNode {
    slot: Option<usize>,
    children: Vec<(Identifier, PathNode)>,
}

impl PathNode {
    /// Slot capturing the value at this path, if the path is referenced.
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// Child paths keyed by the member name they step through.
    pub fn children(&self) -> &[(Identifier, PathNode)] {
        &self.children
    }

    fn child_mut(&mut self, name: &Identifier) -> &mut PathNode {
        let position = match self.children.iter().position(|(n, _)| n == name) {
            Some(position) => position,
            None => {
                self.children.push((name.clone(), PathNode::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[position].1
    }
}

/// Description of one allocated slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    /// Path relative to the record; empty for the record itself
    pub path: Vec<Identifier>,
    /// Projected unchanged as a select column
    pub passthrough: bool,
}

/// Trie of referenced paths plus the slot table layout.
///
/// # Examples
///
/// ```
/// use ndjson_select::{Identifier, parser::parse_expression};
/// use ndjson_select::path_index::PathIndex;
///
/// let mut index = PathIndex::new(Identifier::new("s"));
/// let expr = parse_expression("s.a.b + s.c + s.a.b").unwrap();
/// let rewritten = index.rewrite(&expr);
///
/// assert_eq!(index.len(), 2);
/// assert_eq!(rewritten.to_string(), expr.to_string());
/// ```
#[derive(Debug)]
pub struct PathIndex {
    binding: Identifier,
    root: PathNode,
    slots: Vec<SlotInfo>,
}

impl PathIndex {
    pub fn new(binding: Identifier) -> Self {
        PathIndex {
            binding,
            root: PathNode::default(),
            slots: Vec::new(),
        }
    }

    pub fn root(&self) -> &PathNode {
        &self.root
    }

    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    /// Number of slots a capture table needs.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot for `path`, allocating the next one on first use.
    pub fn slot_for(&mut self, path: &[Identifier]) -> usize {
        let mut node = &mut self.root;
        for name in path {
            node = node.child_mut(name);
        }

        match node.slot {
            Some(slot) => slot,
            None => {
                let slot = self.slots.len();
                node.slot = Some(slot);
                self.slots.push(SlotInfo {
                    path: path.to_vec(),
                    passthrough: false,
                });
                debug!("allocated slot {} for {}", slot, render_path(&self.binding, path));
                slot
            }
        }
    }

    /// New tree with every field reference replaced by its slot reference.
    pub fn rewrite(&mut self, expr: &Expr) -> Expr {
        let binding = self.binding.clone();
        expr.rewrite(&mut |node| {
            let path = reference_path(node, &binding)?;
            Some(Expr::IndexReference(IndexReference {
                slot: self.slot_for(path),
                source: Box::new(node.clone()),
            }))
        })
    }

    /// Like [`rewrite`](Self::rewrite) for a select column; a column that is
    /// itself a field reference marks its slot as passthrough.
    pub fn rewrite_projected(&mut self, expr: &Expr) -> Expr {
        let rewritten = self.rewrite(expr);
        if let Expr::IndexReference(reference) = &rewritten
            && let Some(info) = self.slots.get_mut(reference.slot)
        {
            info.passthrough = true;
        }
        rewritten
    }

    /// Human-readable slot map, one slot per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        for (slot, info) in self.slots.iter().enumerate() {
            let _ = write!(out, "slot {}: {}", slot, render_path(&self.binding, &info.path));
            if info.passthrough {
                out.push_str(" (passthrough)");
            }
            out.push('\n');
        }
        out
    }
}

fn render_path(binding: &Identifier, path: &[Identifier]) -> String {
    std::iter::once(binding)
        .chain(path)
        .map(|name| name.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn index() -> PathIndex {
        PathIndex::new(Identifier::new("s"))
    }

    #[test]
    fn test_shared_prefixes_share_trie_nodes() {
        let mut index = index();
        index.rewrite(&parse_expression("s.a.b = s.a.c AND s.a IS NOT NULL").unwrap());

        assert_eq!(index.len(), 3);
        let a = &index.root().children()[0].1;
        assert_eq!(a.slot(), Some(2));
        assert_eq!(a.children().len(), 2);
    }

    #[test]
    fn test_alias_and_bare_names_resolve_from_record() {
        let mut index = index();
        let rewritten = index.rewrite(&parse_expression("s.x + x + s").unwrap());

        assert_eq!(index.len(), 2);
        assert_eq!(index.root().slot(), Some(1));
        assert_eq!(
            index.slots()[0].path,
            vec![Identifier::new("x")]
        );
        assert_eq!(rewritten.to_string(), "((s.x + x) + s)");
    }

    #[test]
    fn test_quoted_and_bare_names_get_distinct_slots() {
        let mut index = index();
        index.rewrite(&parse_expression(r#"s."Name" || s.name"#).unwrap());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_explain_marks_passthrough() {
        let mut index = index();
        index.rewrite_projected(&parse_expression("s.a").unwrap());
        index.rewrite_projected(&parse_expression("LOWER(s.b)").unwrap());
        assert_eq!(index.explain(), "slot 0: s.a (passthrough)\nslot 1: s.b\n");
    }
}
