//! Structural helpers: copy, merge, shape predicates
//!
//! Arrays are replaced wholesale by `deep_merge`, never merged slot by slot.
//! Lists such as server names or filetypes in a user config are meant to
//! replace the defaults entirely.

use super::{Table, Value};

/// Independent copy of `value`
///
/// Tables own their contents, so a clone never aliases the original.
/// Functions are shared, not duplicated.
pub fn deep_copy(value: &Value) -> Value {
    value.clone()
}

/// Merge `overrides` on top of `base`, producing a new value
///
/// Record-shaped tables present on both sides are merged recursively; in
/// every other case (including array against array) the override wins.
/// Neither input is modified.
pub fn deep_merge(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Table(base), Value::Table(overrides)) => Value::Table(merge_tables(base, overrides)),
        (base, Value::Nil) => deep_copy(base),
        (_, overrides) => deep_copy(overrides),
    }
}

fn merge_tables(base: &Table, overrides: &Table) -> Table {
    let mut result = base.clone();
    for (key, value) in overrides {
        let merged = match (result.get(key.clone()), value) {
            (Value::Table(current), Value::Table(incoming))
                if !current.is_array() && !incoming.is_array() =>
            {
                Value::Table(merge_tables(current, incoming))
            }
            _ => deep_copy(value),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// True iff `value` is a table with keys exactly `1..=N`
pub fn is_array(value: &Value) -> bool {
    value.as_table().is_some_and(Table::is_array)
}

/// True for non-table values and for tables with no entries
pub fn is_empty(value: &Value) -> bool {
    value.as_table().is_none_or(Table::is_empty)
}
