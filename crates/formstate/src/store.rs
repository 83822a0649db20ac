//! Path-keyed stores and array renumbering.
//!
//! Per-field state (raw input, errors, dirty flags, conversion tickets) is
//! kept in maps keyed by the field's absolute path. When an array element is
//! removed or inserted, every entry below the array has to move with its
//! element; [`remove_index_and_renumber`] and [`insert_index_and_renumber`]
//! compute the rekeyed map.

use crate::{Path, Seg};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Rekey a store after the array element at `removed` was deleted.
///
/// Let `base` be `removed` without its last step and `n` its last step.
/// Entries below `base` whose next step is an index:
/// - smaller than `n` are kept,
/// - equal to `n` are dropped,
/// - greater than `n` are moved one index down, keeping the rest of the path.
///
/// Every other entry is copied unchanged, including entries whose next step
/// is a key. If the last step of `removed` is not an index, the store is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use formstate::{path, remove_index_and_renumber};
/// use std::collections::BTreeMap;
///
/// let store: BTreeMap<_, _> = [
///     (path!("items", 0, "a"), "zero"),
///     (path!("items", 1, "a"), "one"),
///     (path!("items", 2, "a"), "two"),
/// ]
/// .into_iter()
/// .collect();
///
/// let renumbered = remove_index_and_renumber(&store, &path!("items", 1));
/// assert_eq!(renumbered.len(), 2);
/// assert_eq!(renumbered[&path!("items", 0, "a")], "zero");
/// assert_eq!(renumbered[&path!("items", 1, "a")], "two");
/// ```
pub fn remove_index_and_renumber<V: Clone>(
    store: &BTreeMap<Path, V>,
    removed: &Path,
) -> BTreeMap<Path, V> {
    let Some((base, removed_index)) = split_index(removed) else {
        tracing::warn!(path = %removed, "renumber requested for a path without a trailing index");
        return store.clone();
    };

    let mut result = BTreeMap::new();
    for (key, value) in store {
        match index_below(key, &base) {
            Some(n) if n == removed_index => {}
            Some(n) if n > removed_index => {
                result.insert(with_index_at(key, base.len(), n - 1), value.clone());
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    result
}

/// Rekey a store after an element was inserted at `inserted`.
///
/// Entries below the array whose index is at least the inserted index move
/// one index up; everything else is copied unchanged.
pub fn insert_index_and_renumber<V: Clone>(
    store: &BTreeMap<Path, V>,
    inserted: &Path,
) -> BTreeMap<Path, V> {
    let Some((base, inserted_index)) = split_index(inserted) else {
        tracing::warn!(path = %inserted, "renumber requested for a path without a trailing index");
        return store.clone();
    };

    store
        .iter()
        .map(|(key, value)| match index_below(key, &base) {
            Some(n) if n >= inserted_index => (with_index_at(key, base.len(), n + 1), value.clone()),
            _ => (key.clone(), value.clone()),
        })
        .collect()
}

fn split_index(path: &Path) -> Option<(Path, usize)> {
    let index = path.last()?.as_index()?;
    Some((path.parent()?, index))
}

/// The index step directly below `base` in `key`, if `key` lies under `base`.
fn index_below(key: &Path, base: &Path) -> Option<usize> {
    if key.len() <= base.len() || !key.starts_with(base) {
        return None;
    }
    key[base.len()].as_index()
}

fn with_index_at(key: &Path, position: usize, index: usize) -> Path {
    key.iter()
        .enumerate()
        .map(|(i, seg)| if i == position { Seg::Index(index) } else { seg.clone() })
        .collect()
}

/// Copy-on-write map from paths to per-field state.
///
/// Readers holding a [`PathStore::snapshot`] keep a consistent view while a
/// renumbering produces a fresh map that replaces the old one in one step.
#[derive(Debug)]
pub struct PathStore<V> {
    entries: Arc<BTreeMap<Path, V>>,
}

impl<V> Default for PathStore<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(BTreeMap::new()),
        }
    }
}

impl<V> Clone for PathStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V: Clone> PathStore<V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry at a path.
    #[inline]
    pub fn get(&self, path: &Path) -> Option<&V> {
        self.entries.get(path)
    }

    /// Check whether an entry exists at a path.
    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the entry at a path.
    pub fn insert(&mut self, path: Path, value: V) {
        Arc::make_mut(&mut self.entries).insert(path, value);
    }

    /// Remove the entry at a path.
    pub fn remove(&mut self, path: &Path) -> Option<V> {
        if !self.entries.contains_key(path) {
            return None;
        }
        Arc::make_mut(&mut self.entries).remove(path)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &V)> {
        self.entries.iter()
    }

    /// Shared handle to the current map.
    pub fn snapshot(&self) -> Arc<BTreeMap<Path, V>> {
        Arc::clone(&self.entries)
    }

    /// Drop the entries of the removed array element and shift later ones.
    pub fn remove_index(&mut self, removed: &Path) {
        self.entries = Arc::new(remove_index_and_renumber(&self.entries, removed));
    }

    /// Shift entries to make room for an inserted array element.
    pub fn insert_index(&mut self, inserted: &Path) {
        self.entries = Arc::new(insert_index_and_renumber(&self.entries, inserted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    fn items_store() -> BTreeMap<Path, &'static str> {
        [
            (path!("items", 0, "a"), "a0"),
            (path!("items", 1, "a"), "a1"),
            (path!("items", 2, "a"), "a2"),
            (path!("items", 2, "b"), "b2"),
            (path!("other"), "other"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_remove_renumbers_higher_indices() {
        let result = remove_index_and_renumber(&items_store(), &path!("items", 1));
        let keys: Vec<String> = result.keys().map(Path::encode).collect();
        assert_eq!(keys, vec!["/items/0/a", "/items/1/a", "/items/1/b", "/other"]);
        assert_eq!(result[&path!("items", 1, "a")], "a2");
        assert_eq!(result[&path!("items", 1, "b")], "b2");
    }

    #[test]
    fn test_remove_first_and_last() {
        let first = remove_index_and_renumber(&items_store(), &path!("items", 0));
        assert_eq!(first[&path!("items", 0, "a")], "a1");
        assert_eq!(first[&path!("items", 1, "a")], "a2");

        let last = remove_index_and_renumber(&items_store(), &path!("items", 2));
        assert_eq!(last.len(), 3);
        assert!(!last.contains_key(&path!("items", 2, "b")));
    }

    #[test]
    fn test_remove_ignores_sibling_with_key_step() {
        let store: BTreeMap<Path, i32> = [
            (path!("items", "meta"), 1),
            (path!("items", 3, "x"), 2),
            (path!("items"), 3),
        ]
        .into_iter()
        .collect();
        let result = remove_index_and_renumber(&store, &path!("items", 0));
        assert_eq!(result[&path!("items", "meta")], 1);
        assert_eq!(result[&path!("items", 2, "x")], 2);
        assert_eq!(result[&path!("items")], 3);
    }

    #[test]
    fn test_remove_does_not_match_longer_key_name() {
        let store: BTreeMap<Path, i32> = [(path!("items2", 1, "a"), 1)].into_iter().collect();
        let result = remove_index_and_renumber(&store, &path!("items", 0));
        assert_eq!(result, store);
    }

    #[test]
    fn test_remove_with_non_index_last_step_is_noop() {
        let store = items_store();
        let result = remove_index_and_renumber(&store, &path!("items", "a"));
        assert_eq!(result, store);
    }

    #[test]
    fn test_remove_nested_arrays() {
        let store: BTreeMap<Path, i32> = [
            (path!("outer", 0, "inner", 0, "v"), 1),
            (path!("outer", 0, "inner", 1, "v"), 2),
            (path!("outer", 1, "inner", 1, "v"), 3),
        ]
        .into_iter()
        .collect();
        let result = remove_index_and_renumber(&store, &path!("outer", 0, "inner", 0));
        assert_eq!(result.len(), 2);
        assert_eq!(result[&path!("outer", 0, "inner", 0, "v")], 2);
        // the other outer element is untouched
        assert_eq!(result[&path!("outer", 1, "inner", 1, "v")], 3);
    }

    #[test]
    fn test_insert_shifts_up() {
        let result = insert_index_and_renumber(&items_store(), &path!("items", 1));
        assert_eq!(result[&path!("items", 0, "a")], "a0");
        assert!(!result.contains_key(&path!("items", 1, "a")));
        assert_eq!(result[&path!("items", 2, "a")], "a1");
        assert_eq!(result[&path!("items", 3, "a")], "a2");
        assert_eq!(result[&path!("items", 3, "b")], "b2");
    }

    #[test]
    fn test_path_store_snapshot_survives_renumber() {
        let mut store = PathStore::new();
        store.insert(path!("items", 0, "a"), 1);
        store.insert(path!("items", 1, "a"), 2);

        let before = store.snapshot();
        store.remove_index(&path!("items", 0));

        assert_eq!(before.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&path!("items", 0, "a")), Some(&2));
    }
}
