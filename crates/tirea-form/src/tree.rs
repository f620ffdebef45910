//! Reading, writing and enumerating the value tree.
//!
//! Writers never mutate their input: [`write`] clones the tree and returns the
//! updated copy, so published snapshots stay untouched.

use crate::error::{value_type_name, FormError, FormResult};
use crate::{Path, Seg};
use serde_json::{Map, Value};

/// Get a reference to the value at a path.
///
/// Returns `None` as soon as an intermediate is missing or is not a container.
/// An index segment against an object looks up the decimal key.
pub fn read<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = tree;
    for seg in path.segments() {
        current = match (seg, current) {
            (Seg::Key(key), Value::Object(obj)) => obj.get(key)?,
            (Seg::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            (Seg::Index(idx), Value::Object(obj)) => obj.get(&idx.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Largest number of `null` holes a single write may pad an array with.
///
/// Writing further past the end of an array is rejected with
/// [`FormError::IndexOutOfRange`].
pub const MAX_INDEX_GAP: usize = 1024;

/// Return a copy of `tree` with `value` stored at `path` (pure function).
///
/// Missing intermediates are created: objects for key segments, arrays for
/// index segments. Arrays are padded with `null` up to the written index, at
/// most [`MAX_INDEX_GAP`] slots past their current end.
pub fn write(tree: &Value, path: &Path, value: Value) -> FormResult<Value> {
    let mut result = tree.clone();
    write_in_place(&mut result, path, 0, value)?;
    Ok(result)
}

fn write_in_place(current: &mut Value, path: &Path, depth: usize, value: Value) -> FormResult<()> {
    let Some(seg) = path.segments().get(depth) else {
        *current = value;
        return Ok(());
    };
    match seg {
        Seg::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(obj) => {
                    let entry = obj.entry(key.clone()).or_insert(Value::Null);
                    write_in_place(entry, path, depth + 1, value)
                }
                _ => Ok(()),
            }
        }
        Seg::Index(idx) => {
            if let Value::Object(obj) = current {
                let entry = obj.entry(idx.to_string()).or_insert(Value::Null);
                return write_in_place(entry, path, depth + 1, value);
            }
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            match current {
                Value::Array(arr) => {
                    let len = arr.len();
                    if *idx >= len {
                        if *idx - len > MAX_INDEX_GAP {
                            return Err(FormError::IndexOutOfRange {
                                path: Path::from_segments(path.segments()[..=depth].to_vec()),
                                index: *idx,
                                len,
                            });
                        }
                        arr.resize(*idx + 1, Value::Null);
                    }
                    write_in_place(&mut arr[*idx], path, depth + 1, value)
                }
                _ => Ok(()),
            }
        }
    }
}

/// Enumerate every addressable path below `base` in `value`, depth-first.
///
/// Each object key and each array element yields one path, recursively. The
/// base path itself is not included.
pub fn enumerate_from(value: &Value, base: &Path) -> Vec<Path> {
    let mut out = Vec::new();
    collect(value, base.clone(), &mut out);
    out
}

/// Enumerate every addressable path of a whole tree (root excluded).
pub fn enumerate(tree: &Value) -> Vec<Path> {
    enumerate_from(tree, &Path::root())
}

fn collect(value: &Value, base: Path, out: &mut Vec<Path>) {
    match value {
        Value::Object(obj) => {
            for (key, child) in obj {
                let path = base.clone().key(key.clone());
                out.push(path.clone());
                collect(child, path, out);
            }
        }
        Value::Array(arr) => {
            for (idx, child) in arr.iter().enumerate() {
                let path = base.clone().index(idx);
                out.push(path.clone());
                collect(child, path, out);
            }
        }
        _ => {}
    }
}

/// Read the array at `path` as an owned vector.
///
/// A missing or `null` value counts as an empty array; anything else that is
/// not an array is a type mismatch.
pub fn array_at(tree: &Value, path: &Path) -> FormResult<Vec<Value>> {
    match read(tree, path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(FormError::type_mismatch(
            path.clone(),
            "array",
            value_type_name(other),
        )),
    }
}
