//! Where form data lives.
//!
//! Form state reads and writes values only through [`DataSource`], so it
//! works over any store that can address JSON by [`Path`]. [`DocCell`] is the
//! in-memory one.

use crate::apply::{
    array_len_at, get_at_path, insert_at_path, remove_at_path, set_at_path, unset_at_path,
};
use crate::{FormResult, Path};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// The data a form edits.
///
/// Every call is applied atomically. Form state asks for values when it
/// needs them, so a source has no change notifications to send.
pub trait DataSource: Send + Sync {
    fn get(&self, path: &Path) -> Option<Value>;

    fn set(&self, path: &Path, value: Value) -> FormResult<()>;

    /// Leaves nothing at `path`, so a later `get` returns `None`.
    fn unset(&self, path: &Path) -> FormResult<()>;

    /// `None` unless an array is stored at `path`.
    fn array_len(&self, path: &Path) -> Option<usize>;

    fn insert_at(&self, path: &Path, index: usize, value: Value) -> FormResult<()>;

    fn remove_at(&self, path: &Path, index: usize) -> FormResult<Value>;
}

/// A JSON document behind a mutex.
///
/// ```
/// use formstate::{path, DataSource, DocCell};
/// use serde_json::json;
///
/// let doc = DocCell::new(json!({"name": "Tea"}));
/// doc.set(&path!("price"), json!("3.50")).unwrap();
/// assert_eq!(doc.snapshot(), json!({"name": "Tea", "price": "3.50"}));
/// ```
pub struct DocCell(Mutex<Value>);

impl DocCell {
    pub fn new(doc: Value) -> Self {
        Self(Mutex::new(doc))
    }

    fn doc(&self) -> MutexGuard<'_, Value> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A copy of the whole document as it is now.
    pub fn snapshot(&self) -> Value {
        self.doc().clone()
    }

    pub fn into_inner(self) -> Value {
        self.0
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DataSource for DocCell {
    fn get(&self, path: &Path) -> Option<Value> {
        get_at_path(&self.doc(), path).cloned()
    }

    fn set(&self, path: &Path, value: Value) -> FormResult<()> {
        set_at_path(&mut self.doc(), path, value)
    }

    fn unset(&self, path: &Path) -> FormResult<()> {
        unset_at_path(&mut self.doc(), path);
        Ok(())
    }

    fn array_len(&self, path: &Path) -> Option<usize> {
        array_len_at(&self.doc(), path)
    }

    fn insert_at(&self, path: &Path, index: usize, value: Value) -> FormResult<()> {
        insert_at_path(&mut self.doc(), path, index, value)
    }

    fn remove_at(&self, path: &Path, index: usize) -> FormResult<Value> {
        remove_at_path(&mut self.doc(), path, index)
    }
}

/// An empty object.
impl Default for DocCell {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}

/// Copies the document; the two cells do not share edits.
impl Clone for DocCell {
    fn clone(&self) -> Self {
        Self::new(self.snapshot())
    }
}

impl fmt::Debug for DocCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocCell").field(&*self.doc()).finish()
    }
}
