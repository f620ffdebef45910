//! Structural array edits and the index remapping they imply.
//!
//! An [`ArrayEdit`] describes one splice of an array-valued field. The same
//! edit is applied to the array's items and, through [`ArrayEdit::map_index`],
//! to every path-keyed map that holds per-item state (field records, error
//! buckets), so item state follows the item rather than the position.

use crate::{Path, Seg};
use serde_json::Value;
use std::collections::BTreeMap;

/// A structural edit of one array.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayEdit {
    /// Insert `value` before `index`.
    Insert { index: usize, value: Value },
    /// Remove the item at `index`.
    Remove { index: usize },
    /// Exchange the items at `a` and `b`.
    Swap { a: usize, b: usize },
    /// Take the item at `from` out and reinsert it at `to`.
    Move { from: usize, to: usize },
}

/// Clamp an insertion point into `[0, len]`.
#[inline]
pub fn clamp_insert(index: usize, len: usize) -> usize {
    index.min(len)
}

/// Clamp an index into `[0, len - 1]`. `None` for an empty array.
#[inline]
pub fn clamp_existing(index: usize, len: usize) -> Option<usize> {
    len.checked_sub(1).map(|last| index.min(last))
}

impl ArrayEdit {
    pub fn name(&self) -> &'static str {
        match self {
            ArrayEdit::Insert { .. } => "insert",
            ArrayEdit::Remove { .. } => "remove",
            ArrayEdit::Swap { .. } => "swap",
            ArrayEdit::Move { .. } => "move",
        }
    }

    /// Clamp the edit's indices against an array of `len` items.
    ///
    /// Returns `None` when the clamped edit changes nothing: removing from an
    /// empty array, or swapping/moving an index onto itself.
    pub fn clamped(self, len: usize) -> Option<ArrayEdit> {
        match self {
            ArrayEdit::Insert { index, value } => Some(ArrayEdit::Insert {
                index: clamp_insert(index, len),
                value,
            }),
            ArrayEdit::Remove { index } => {
                clamp_existing(index, len).map(|index| ArrayEdit::Remove { index })
            }
            ArrayEdit::Swap { a, b } => {
                let a = clamp_existing(a, len)?;
                let b = clamp_existing(b, len)?;
                (a != b).then_some(ArrayEdit::Swap { a, b })
            }
            ArrayEdit::Move { from, to } => {
                let from = clamp_existing(from, len)?;
                let to = clamp_existing(to, len)?;
                (from != to).then_some(ArrayEdit::Move { from, to })
            }
        }
    }

    /// Apply the edit to the items. Indices must already be clamped.
    pub fn apply_to(&self, items: &mut Vec<Value>) {
        match self {
            ArrayEdit::Insert { index, value } => items.insert(*index, value.clone()),
            ArrayEdit::Remove { index } => {
                items.remove(*index);
            }
            ArrayEdit::Swap { a, b } => items.swap(*a, *b),
            ArrayEdit::Move { from, to } => {
                let item = items.remove(*from);
                items.insert(*to, item);
            }
        }
    }

    /// New position of the item that sat at `old` before the edit.
    ///
    /// `None` means the item was removed. After an insert, the inserted slot
    /// has no predecessor and is filled by the caller.
    pub fn map_index(&self, old: usize) -> Option<usize> {
        match *self {
            ArrayEdit::Insert { index, .. } => Some(if old >= index { old + 1 } else { old }),
            ArrayEdit::Remove { index } => match old.cmp(&index) {
                std::cmp::Ordering::Less => Some(old),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(old - 1),
            },
            ArrayEdit::Swap { a, b } => Some(if old == a {
                b
            } else if old == b {
                a
            } else {
                old
            }),
            ArrayEdit::Move { from, to } => Some(if old == from {
                to
            } else if from < to && old > from && old <= to {
                old - 1
            } else if to < from && old >= to && old < from {
                old + 1
            } else {
                old
            }),
        }
    }
}

/// Rekey every entry below `array` according to `edit`.
///
/// Entries outside the array's item subtrees are carried over unchanged
/// (cloned, so `Arc` values keep their identity). Entries of removed items
/// are dropped.
pub fn remap_entries<T: Clone>(
    map: &BTreeMap<Path, T>,
    array: &Path,
    edit: &ArrayEdit,
) -> BTreeMap<Path, T> {
    let depth = array.len();
    let mut out = BTreeMap::new();
    for (path, value) in map {
        if !path.is_descendant_of(array) {
            out.insert(path.clone(), value.clone());
            continue;
        }
        match path[depth] {
            Seg::Index(old) => {
                if let Some(new) = edit.map_index(old) {
                    out.insert(path.with_segment_at(depth, Seg::Index(new)), value.clone());
                }
            }
            Seg::Key(_) => {
                out.insert(path.clone(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn apply(items: Value, edit: ArrayEdit) -> Value {
        let mut items = items.as_array().cloned().unwrap();
        if let Some(edit) = edit.clamped(items.len()) {
            edit.apply_to(&mut items);
        }
        Value::Array(items)
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_insert(10, 3), 3);
        assert_eq!(clamp_existing(10, 3), Some(2));
        assert_eq!(clamp_existing(0, 0), None);
    }

    #[test]
    fn test_insert_clamps_to_end() {
        let out = apply(
            json!(["a", "b"]),
            ArrayEdit::Insert {
                index: 99,
                value: json!("z"),
            },
        );
        assert_eq!(out, json!(["a", "b", "z"]));
    }

    #[test]
    fn test_move_forward_and_back() {
        let moved = apply(json!(["a", "b", "c"]), ArrayEdit::Move { from: 0, to: 2 });
        assert_eq!(moved, json!(["b", "c", "a"]));
        let back = apply(moved, ArrayEdit::Move { from: 2, to: 0 });
        assert_eq!(back, json!(["a", "b", "c"]));
    }

    #[test]
    fn test_noop_edits_clamp_to_none() {
        assert!(ArrayEdit::Swap { a: 1, b: 1 }.clamped(3).is_none());
        assert!(ArrayEdit::Move { from: 5, to: 9 }.clamped(3).is_none());
        assert!(ArrayEdit::Remove { index: 0 }.clamped(0).is_none());
    }

    #[test]
    fn test_map_index_matches_value_edit() {
        let edits = [
            ArrayEdit::Insert {
                index: 1,
                value: json!("x"),
            },
            ArrayEdit::Remove { index: 1 },
            ArrayEdit::Swap { a: 0, b: 3 },
            ArrayEdit::Move { from: 3, to: 1 },
            ArrayEdit::Move { from: 0, to: 2 },
        ];
        for edit in edits {
            let before: Vec<Value> = (0..4).map(|i| json!(i)).collect();
            let mut after = before.clone();
            edit.apply_to(&mut after);
            for (old, item) in before.iter().enumerate() {
                if let Some(new) = edit.map_index(old) {
                    assert_eq!(&after[new], item, "{} moved item {old}", edit.name());
                }
            }
        }
    }

    #[test]
    fn test_remap_entries_only_touches_items_of_array() {
        let mut map = BTreeMap::new();
        map.insert(path!("tags"), "array");
        map.insert(path!("tags", 0), "x");
        map.insert(path!("tags", 1), "y");
        map.insert(path!("tags", 1, "label"), "y.label");
        map.insert(path!("other", 0), "other");

        let out = remap_entries(&map, &path!("tags"), &ArrayEdit::Remove { index: 0 });
        assert_eq!(out[&path!("tags")], "array");
        assert_eq!(out[&path!("tags", 0)], "y");
        assert_eq!(out[&path!("tags", 0, "label")], "y.label");
        assert_eq!(out[&path!("other", 0)], "other");
        assert!(!out.contains_key(&path!("tags", 1)));
    }
}
