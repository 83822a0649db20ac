//! Path-addressed reads and writes on a JSON document.
//!
//! `DocCell` is a thin lock around these functions.

use crate::{
    error::{value_type_name, FormError, FormResult},
    Path, Seg,
};
use serde_json::{Map, Value};

/// Finds the value at `path`, or `None` once a step leads nowhere.
///
/// A position step on an object reads the member named by the number, which
/// is how sparse item maps are addressed.
///
/// ```
/// use formstate::{get_at_path, path};
/// use serde_json::json;
///
/// let doc = json!({"items": [{"a": 1}]});
/// assert_eq!(get_at_path(&doc, &path!("items", 0, "a")), Some(&json!(1)));
/// assert_eq!(get_at_path(&doc, &path!("items", 3, "a")), None);
/// ```
pub fn get_at_path<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    path.iter().try_fold(doc, |slot, seg| match (seg, slot) {
        (Seg::Key(key), Value::Object(members)) => members.get(key),
        (Seg::Index(position), Value::Array(items)) => items.get(*position),
        (Seg::Index(position), Value::Object(members)) => members.get(&position.to_string()),
        _ => None,
    })
}

fn lookup_mut<'a>(doc: &'a mut Value, steps: &[Seg]) -> Option<&'a mut Value> {
    steps.iter().try_fold(doc, |slot, seg| match (seg, slot) {
        (Seg::Key(key), Value::Object(members)) => members.get_mut(key),
        (Seg::Index(position), Value::Array(items)) => items.get_mut(*position),
        (Seg::Index(position), Value::Object(members)) => members.get_mut(&position.to_string()),
        _ => None,
    })
}

/// Writes `value` at `path`.
///
/// Key steps turn whatever they meet into an object. Position steps need an
/// existing array element; items are only added through [`insert_at_path`].
pub fn set_at_path(doc: &mut Value, path: &Path, value: Value) -> FormResult<()> {
    let mut slot = doc;
    for (depth, seg) in path.iter().enumerate() {
        slot = match seg {
            Seg::Key(key) => {
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                &mut slot[key.as_str()]
            }
            Seg::Index(position) => {
                let array_path = || path.segments()[..depth].iter().cloned().collect::<Path>();
                match slot {
                    Value::Array(items) => {
                        let len = items.len();
                        items.get_mut(*position).ok_or_else(|| {
                            FormError::index_out_of_bounds(array_path(), *position, len)
                        })?
                    }
                    other => {
                        return Err(FormError::type_mismatch(
                            array_path(),
                            "array",
                            value_type_name(other),
                        ))
                    }
                }
            }
        };
    }
    *slot = value;
    Ok(())
}

/// Deletes the member at `path`. Missing paths are left alone.
///
/// An array element cannot be deleted without shifting its siblings, so it
/// is nulled instead.
pub fn unset_at_path(doc: &mut Value, path: &Path) {
    let Some((last, parent)) = path.segments().split_last() else {
        *doc = Value::Null;
        return;
    };
    match (last, lookup_mut(doc, parent)) {
        (Seg::Key(key), Some(Value::Object(members))) => {
            members.remove(key);
        }
        (Seg::Index(position), Some(Value::Object(members))) => {
            members.remove(&position.to_string());
        }
        (Seg::Index(position), Some(Value::Array(items))) => {
            if let Some(item) = items.get_mut(*position) {
                *item = Value::Null;
            }
        }
        _ => {}
    }
}

/// Item count of the array at `path`, `None` when something else is there.
pub fn array_len_at(doc: &Value, path: &Path) -> Option<usize> {
    get_at_path(doc, path).and_then(Value::as_array).map(Vec::len)
}

fn items_mut<'a>(doc: &'a mut Value, path: &Path) -> FormResult<&'a mut Vec<Value>> {
    match lookup_mut(doc, path.segments()) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(FormError::type_mismatch(
            path.clone(),
            "array",
            value_type_name(other),
        )),
        None => Err(FormError::path_not_found(path.clone())),
    }
}

/// Puts `value` at `index` of the array at `path`; later items move up.
pub fn insert_at_path(doc: &mut Value, path: &Path, index: usize, value: Value) -> FormResult<()> {
    let items = items_mut(doc, path)?;
    if index > items.len() {
        return Err(FormError::index_out_of_bounds(path.clone(), index, items.len()));
    }
    items.insert(index, value);
    Ok(())
}

/// Takes item `index` out of the array at `path`; later items move down.
pub fn remove_at_path(doc: &mut Value, path: &Path, index: usize) -> FormResult<Value> {
    let items = items_mut(doc, path)?;
    if index >= items.len() {
        return Err(FormError::index_out_of_bounds(path.clone(), index, items.len()));
    }
    Ok(items.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_get_at_path() {
        let doc = json!({"a": {"b": [10, 20]}});
        assert_eq!(get_at_path(&doc, &path!("a", "b", 1)), Some(&json!(20)));
        assert_eq!(get_at_path(&doc, &Path::root()), Some(&doc));
    }

    #[test]
    fn test_get_at_path_stops_at_missing_intermediate() {
        let doc = json!({"a": 1});
        assert_eq!(get_at_path(&doc, &path!("missing", "deeper", 0)), None);
        assert_eq!(get_at_path(&doc, &path!("a", "b")), None);
    }

    #[test]
    fn test_get_index_on_object_uses_decimal_key() {
        let doc = json!({"m": {"3": "three"}});
        assert_eq!(get_at_path(&doc, &path!("m", 3)), Some(&json!("three")));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = json!({});
        set_at_path(&mut doc, &path!("a", "b", "c"), json!(1)).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_index_out_of_bounds() {
        let mut doc = json!({"items": []});
        let err = set_at_path(&mut doc, &path!("items", 0, "a"), json!(1)).unwrap_err();
        assert!(matches!(err, FormError::IndexOutOfBounds { index: 0, len: 0, .. }));
    }

    #[test]
    fn test_set_index_into_non_array() {
        let mut doc = json!({"items": {}});
        let err = set_at_path(&mut doc, &path!("items", 0), json!(1)).unwrap_err();
        assert!(matches!(err, FormError::TypeMismatch { expected: "array", found: "object", .. }));
    }

    #[test]
    fn test_unset_removes_key() {
        let mut doc = json!({"a": 1, "b": 2});
        unset_at_path(&mut doc, &path!("a"));
        assert_eq!(doc, json!({"b": 2}));
        // missing path is a no-op
        unset_at_path(&mut doc, &path!("x", "y"));
        assert_eq!(doc, json!({"b": 2}));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc = json!({"items": [1, 3]});
        insert_at_path(&mut doc, &path!("items"), 1, json!(2)).unwrap();
        assert_eq!(doc["items"], json!([1, 2, 3]));
        assert_eq!(array_len_at(&doc, &path!("items")), Some(3));

        let removed = remove_at_path(&mut doc, &path!("items"), 0).unwrap();
        assert_eq!(removed, json!(1));
        assert_eq!(doc["items"], json!([2, 3]));
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut doc = json!({"items": [1]});
        assert!(matches!(
            remove_at_path(&mut doc, &path!("items"), 1),
            Err(FormError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            remove_at_path(&mut doc, &path!("nothing"), 0),
            Err(FormError::PathNotFound { .. })
        ));
    }
}
