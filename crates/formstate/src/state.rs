//! Live form state.
//!
//! A [`FormState`] binds a [`Form`] definition to a [`DataSource`]. It keeps
//! the per-field stores (raw input, error, dirty flag, conversion ticket)
//! keyed by absolute path, and hands out accessors that read and write them.
//! Validity of composites is computed on every query; nothing is cached.
//!
//! The store lock is never held across an `.await`: `set_raw` records the raw
//! and a fresh ticket, releases the lock, awaits the conversion, then applies
//! the outcome wherever that ticket lives now. Tickets move with their item
//! when a repeating form is renumbered; a ticket that was replaced by a newer
//! one, or dropped with its item, marks the outcome as stale.

use crate::converter::Controlled;
use crate::error::{FormError, FormResult};
use crate::field::FieldDef;
use crate::form::{Form, Member};
use crate::options::FormOptions;
use crate::source::DataSource;
use crate::store::PathStore;
use crate::validation::{Outcome, Write};
use crate::{Path, Seg};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Stores {
    raw: PathStore<Value>,
    errors: PathStore<String>,
    dirty: PathStore<bool>,
    tickets: PathStore<u64>,
    next_ticket: u64,
}

impl Stores {
    fn issue_ticket(&mut self, path: &Path) -> u64 {
        self.next_ticket += 1;
        self.tickets.insert(path.clone(), self.next_ticket);
        self.next_ticket
    }

    /// Where the field holding `ticket` lives now. Tickets move with their
    /// item on renumbering; `None` once the item is gone or a newer ticket
    /// replaced this one.
    fn locate(&self, ticket: u64) -> Option<Path> {
        self.tickets
            .iter()
            .find(|(_, issued)| **issued == ticket)
            .map(|(path, _)| path.clone())
    }

    fn remove_index(&mut self, removed: &Path) {
        self.raw.remove_index(removed);
        self.errors.remove_index(removed);
        self.dirty.remove_index(removed);
        self.tickets.remove_index(removed);
    }

    fn insert_index(&mut self, inserted: &Path) {
        self.raw.insert_index(inserted);
        self.errors.insert_index(inserted);
        self.dirty.insert_index(inserted);
        self.tickets.insert_index(inserted);
    }
}

struct Shared {
    source: Arc<dyn DataSource>,
    options: FormOptions,
    stores: Mutex<Stores>,
}

impl Shared {
    #[inline]
    fn stores(&self) -> MutexGuard<'_, Stores> {
        self.stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Editing state of a form over a data source.
///
/// Cloning is cheap; clones share the same stores.
///
/// ```
/// use formstate::{converters, DocCell, Field, Form};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # futures::executor::block_on(async {
/// let doc = Arc::new(DocCell::new(json!({"age": 3})));
/// let state = Form::new()
///     .field("age", Field::new(converters::integer()))
///     .state(doc.clone())
///     .unwrap();
///
/// let age = state.field("age").unwrap();
/// assert_eq!(age.raw(), json!("3"));
///
/// age.set_raw("x").await.unwrap();
/// assert_eq!(age.error().as_deref(), Some("Could not convert"));
/// assert_eq!(doc.snapshot(), json!({"age": 3}));
///
/// age.set_raw("42").await.unwrap();
/// assert!(state.is_valid());
/// assert_eq!(doc.snapshot(), json!({"age": 42}));
/// # });
/// ```
#[derive(Clone)]
pub struct FormState {
    root: FormAccessor,
}

impl FormState {
    /// Create a state for `form` editing `source`.
    ///
    /// Fails if the options or the group definitions are invalid.
    pub fn new(form: Form, source: Arc<dyn DataSource>, options: FormOptions) -> FormResult<Self> {
        options.check()?;
        form.check()?;
        let shared = Arc::new(Shared {
            source,
            options,
            stores: Mutex::new(Stores::default()),
        });
        Ok(Self {
            root: FormAccessor {
                shared,
                form: Arc::new(form),
                base: Path::root(),
            },
        })
    }

    /// Accessor for the top-level form.
    #[inline]
    pub fn root(&self) -> &FormAccessor {
        &self.root
    }

    /// The options this state was created with.
    #[inline]
    pub fn options(&self) -> &FormOptions {
        &self.root.shared.options
    }

    /// The data being edited.
    #[inline]
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.root.shared.source
    }

    /// Current data at the root.
    pub fn data(&self) -> Option<Value> {
        self.source().get(&Path::root())
    }

    /// See [`FormAccessor::field`].
    pub fn field(&self, key: &str) -> FormResult<FieldAccessor> {
        self.root.field(key)
    }

    /// See [`FormAccessor::field_at`].
    pub fn field_at(&self, path: &Path) -> FormResult<FieldAccessor> {
        self.root.field_at(path)
    }

    /// See [`FormAccessor::sub_form`].
    pub fn sub_form(&self, key: &str) -> FormResult<FormAccessor> {
        self.root.sub_form(key)
    }

    /// See [`FormAccessor::repeating_form`].
    pub fn repeating_form(&self, key: &str) -> FormResult<RepeatingFormAccessor> {
        self.root.repeating_form(key)
    }

    /// See [`FormAccessor::group`].
    pub fn group(&self, name: &str) -> FormResult<GroupAccessor> {
        self.root.group(name)
    }

    /// Whether every member of the form is valid.
    pub fn is_valid(&self) -> bool {
        self.root.is_valid()
    }

    /// Whether any field has been edited.
    pub fn is_dirty(&self) -> bool {
        self.root.is_dirty()
    }

    /// Re-run every field against its current raw, then report validity.
    ///
    /// Unlike `set_raw` this does not mark fields dirty, so required fields
    /// that were never touched get their error here.
    pub async fn validate(&self) -> FormResult<bool> {
        self.root.validate().await
    }
}

impl fmt::Debug for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormState")
            .field("form", &self.root.form)
            .field("options", &self.root.shared.options)
            .finish_non_exhaustive()
    }
}

/// Accessor for a form, a sub-form, or one item of a repeating form.
#[derive(Clone)]
pub struct FormAccessor {
    shared: Arc<Shared>,
    form: Arc<Form>,
    base: Path,
}

impl FormAccessor {
    /// Absolute path of the object this accessor edits.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.base
    }

    fn member(&self, key: &str) -> FormResult<&Member> {
        self.form
            .member(key)
            .ok_or_else(|| FormError::unknown_member(self.base.clone(), key))
    }

    fn scoped(&self, form: &Arc<Form>, base: Path) -> FormAccessor {
        FormAccessor {
            shared: Arc::clone(&self.shared),
            form: Arc::clone(form),
            base,
        }
    }

    /// Accessor for a field of this form.
    pub fn field(&self, key: &str) -> FormResult<FieldAccessor> {
        let path = self.base.clone().key(key);
        match self.member(key)? {
            Member::Field(def) => Ok(FieldAccessor {
                shared: Arc::clone(&self.shared),
                def: Arc::clone(def),
                path,
            }),
            other => Err(FormError::member_kind(path, "field", other.kind_name())),
        }
    }

    /// Accessor for a sub-form of this form.
    pub fn sub_form(&self, key: &str) -> FormResult<FormAccessor> {
        let path = self.base.clone().key(key);
        match self.member(key)? {
            Member::SubForm(form) => Ok(self.scoped(form, path)),
            other => Err(FormError::member_kind(path, "sub form", other.kind_name())),
        }
    }

    /// Accessor for a repeating form of this form.
    pub fn repeating_form(&self, key: &str) -> FormResult<RepeatingFormAccessor> {
        let path = self.base.clone().key(key);
        match self.member(key)? {
            Member::Repeating(form) => Ok(RepeatingFormAccessor {
                shared: Arc::clone(&self.shared),
                form: Arc::clone(form),
                path,
            }),
            other => Err(FormError::member_kind(path, "repeating form", other.kind_name())),
        }
    }

    /// Accessor for a group of this form.
    pub fn group(&self, name: &str) -> FormResult<GroupAccessor> {
        let group = self
            .form
            .group_def(name)
            .ok_or_else(|| FormError::unknown_group(self.base.clone(), name))?;
        Ok(GroupAccessor {
            members: self.form.group_members(group),
            name: name.to_owned(),
            scope: self.clone(),
        })
    }

    /// Resolve a field by a path relative to this form.
    ///
    /// Key steps select members; a repeating form must be followed by an
    /// index step.
    pub fn field_at(&self, path: &Path) -> FormResult<FieldAccessor> {
        let not_found = || FormError::path_not_found(path.clone());
        let (last, parents) = path.segments().split_last().ok_or_else(not_found)?;

        let mut scope = self.clone();
        let mut steps = parents.iter();
        while let Some(step) = steps.next() {
            let Seg::Key(key) = step else {
                return Err(not_found());
            };
            let next = match scope.member(key)? {
                Member::SubForm(_) => scope.sub_form(key)?,
                Member::Repeating(_) => {
                    let index = steps.next().and_then(Seg::as_index).ok_or_else(not_found)?;
                    scope.repeating_form(key)?.index(index)
                }
                Member::Field(_) => return Err(not_found()),
            };
            scope = next;
        }

        match last {
            Seg::Key(key) => scope.field(key),
            Seg::Index(_) => Err(not_found()),
        }
    }

    fn member_valid(&self, key: &str, member: &Member) -> bool {
        let path = self.base.clone().key(key);
        match member {
            Member::Field(_) => !self.shared.stores().errors.contains(&path),
            Member::SubForm(form) => self.scoped(form, path).is_valid(),
            Member::Repeating(form) => RepeatingFormAccessor {
                shared: Arc::clone(&self.shared),
                form: Arc::clone(form),
                path,
            }
            .is_valid(),
        }
    }

    /// Whether every member is valid. Sub-structures contribute their own
    /// aggregate validity.
    pub fn is_valid(&self) -> bool {
        self.form
            .members()
            .all(|(key, member)| self.member_valid(key, member))
    }

    /// Whether any field below this form has been edited.
    pub fn is_dirty(&self) -> bool {
        self.shared
            .stores()
            .dirty
            .iter()
            .any(|(path, dirty)| *dirty && path.starts_with(&self.base))
    }

    /// Every field below this form, including the items of repeating forms
    /// that currently exist in the data.
    pub fn fields(&self) -> Vec<FieldAccessor> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, out: &mut Vec<FieldAccessor>) {
        for (key, member) in self.form.members() {
            let path = self.base.clone().key(key.as_str());
            match member {
                Member::Field(def) => out.push(FieldAccessor {
                    shared: Arc::clone(&self.shared),
                    def: Arc::clone(def),
                    path,
                }),
                Member::SubForm(form) => self.scoped(form, path).collect_fields(out),
                Member::Repeating(form) => {
                    let len = self.shared.source.array_len(&path).unwrap_or(0);
                    for index in 0..len {
                        self.scoped(form, path.clone().index(index)).collect_fields(out);
                    }
                }
            }
        }
    }

    /// Re-run every field below this form; see [`FormState::validate`].
    pub async fn validate(&self) -> FormResult<bool> {
        for field in self.fields() {
            field.validate().await?;
        }
        Ok(self.is_valid())
    }
}

impl fmt::Debug for FormAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormAccessor").field("path", &self.base).finish_non_exhaustive()
    }
}

/// Accessor for a single field.
#[derive(Clone)]
pub struct FieldAccessor {
    shared: Arc<Shared>,
    def: Arc<dyn FieldDef>,
    path: Path,
}

impl FieldAccessor {
    /// Absolute path of the field.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw as last entered, or rendered from the data if never edited.
    pub fn raw(&self) -> Value {
        let stored = self.shared.stores().raw.get(&self.path).cloned();
        match stored {
            Some(raw) => raw,
            None => {
                let value = self.shared.source.get(&self.path);
                self.def.render(value.as_ref(), &self.shared.options.converter)
            }
        }
    }

    /// The converted value currently in the data.
    pub fn value(&self) -> Option<Value> {
        self.shared.source.get(&self.path)
    }

    /// The converted value deserialized into `T`.
    pub fn value_as<T: DeserializeOwned>(&self) -> FormResult<Option<T>> {
        self.value()
            .map(serde_json::from_value)
            .transpose()
            .map_err(FormError::from)
    }

    /// The current error message.
    pub fn error(&self) -> Option<String> {
        self.shared.stores().errors.get(&self.path).cloned()
    }

    /// Whether the field has no error.
    pub fn is_valid(&self) -> bool {
        !self.shared.stores().errors.contains(&self.path)
    }

    /// Whether the field has been edited through [`set_raw`](Self::set_raw).
    pub fn is_dirty(&self) -> bool {
        self.shared
            .stores()
            .dirty
            .get(&self.path)
            .copied()
            .unwrap_or(false)
    }

    /// Whether empty input is rejected.
    pub fn is_required(&self) -> bool {
        self.def.is_required()
    }

    /// Which control property the field binds to.
    pub fn controlled(&self) -> Controlled {
        self.def.controlled()
    }

    /// Enter a new raw value.
    ///
    /// The raw is stored and the field marked dirty immediately. Once the
    /// conversion completes the outcome is applied, unless a newer raw was
    /// entered for the same field in the meantime.
    pub async fn set_raw(&self, raw: impl Into<Value>) -> FormResult<()> {
        let raw = raw.into();
        let ticket = {
            let mut stores = self.shared.stores();
            stores.raw.insert(self.path.clone(), raw.clone());
            stores.dirty.insert(self.path.clone(), true);
            stores.issue_ticket(&self.path)
        };
        self.settle(raw, ticket).await
    }

    /// Re-run the field against its current raw without marking it dirty.
    pub async fn validate(&self) -> FormResult<bool> {
        let raw = self.raw();
        let ticket = self.shared.stores().issue_ticket(&self.path);
        self.settle(raw, ticket).await?;
        Ok(self.is_valid())
    }

    async fn settle(&self, raw: Value, ticket: u64) -> FormResult<()> {
        let outcome = self.def.process(raw, &self.shared.options.converter).await;

        let mut stores = self.shared.stores();
        let Some(path) = stores.locate(ticket) else {
            tracing::debug!(path = %self.path, ticket, "discarding stale conversion result");
            return Ok(());
        };
        stores.tickets.remove(&path);
        if path != self.path {
            tracing::debug!(from = %self.path, to = %path, "conversion result follows its item");
        }
        tracing::trace!(path = %path, outcome = outcome.kind(), "field processed");

        let options = &self.shared.options;
        match outcome {
            Outcome::Accepted(write) => {
                self.write(&path, write)?;
                stores.errors.remove(&path);
            }
            Outcome::Required(write) => {
                if let Some(write) = write {
                    self.write(&path, write)?;
                }
                let message = self.def.required_error().unwrap_or(options.required_error.as_str());
                stores.errors.insert(path, message.to_owned());
            }
            Outcome::ConversionFailed => {
                let message = self
                    .def
                    .conversion_error()
                    .unwrap_or(options.conversion_error.as_str());
                stores.errors.insert(path, message.to_owned());
            }
            Outcome::Invalid(message) => {
                stores.errors.insert(path, message);
            }
        }
        Ok(())
    }

    fn write(&self, path: &Path, write: Write) -> FormResult<()> {
        match write {
            Write::Set(value) => self.shared.source.set(path, value),
            Write::Unset => self.shared.source.unset(path),
        }
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Accessor for an array of sub-forms.
#[derive(Clone)]
pub struct RepeatingFormAccessor {
    shared: Arc<Shared>,
    form: Arc<Form>,
    path: Path,
}

impl RepeatingFormAccessor {
    /// Absolute path of the array.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of items in the data; zero if there is no array.
    pub fn len(&self) -> usize {
        self.shared.source.array_len(&self.path).unwrap_or(0)
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accessor for the item at `index`.
    pub fn index(&self, index: usize) -> FormAccessor {
        FormAccessor {
            shared: Arc::clone(&self.shared),
            form: Arc::clone(&self.form),
            base: self.path.clone().index(index),
        }
    }

    /// Accessors for every item.
    pub fn items(&self) -> Vec<FormAccessor> {
        (0..self.len()).map(|index| self.index(index)).collect()
    }

    /// Whether every item is valid.
    pub fn is_valid(&self) -> bool {
        (0..self.len()).all(|index| self.index(index).is_valid())
    }

    /// Append an item.
    pub fn push(&self, value: Value) -> FormResult<()> {
        self.insert(self.len(), value)
    }

    /// Insert an item, moving the state of later items along with them.
    ///
    /// An absent array is created, but only for an insert at index 0.
    pub fn insert(&self, index: usize, value: Value) -> FormResult<()> {
        let mut stores = self.shared.stores();
        if self.shared.source.array_len(&self.path).is_none() {
            if index > 0 {
                return Err(FormError::index_out_of_bounds(self.path.clone(), index, 0));
            }
            self.shared.source.set(&self.path, Value::Array(Vec::new()))?;
        }
        self.shared.source.insert_at(&self.path, index, value)?;
        stores.insert_index(&self.path.clone().index(index));
        tracing::debug!(path = %self.path, index, "inserted repeating form item");
        Ok(())
    }

    /// Remove an item and return its data.
    ///
    /// The state of the removed item is dropped and the state of later items
    /// moves down one index, in one step.
    pub fn remove(&self, index: usize) -> FormResult<Value> {
        let mut stores = self.shared.stores();
        let removed = self.shared.source.remove_at(&self.path, index)?;
        stores.remove_index(&self.path.clone().index(index));
        tracing::debug!(path = %self.path, index, "removed repeating form item");
        Ok(removed)
    }
}

impl fmt::Debug for RepeatingFormAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatingFormAccessor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Accessor for a group of members.
#[derive(Clone)]
pub struct GroupAccessor {
    scope: FormAccessor,
    name: String,
    members: Vec<String>,
}

impl GroupAccessor {
    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected member keys.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Whether every selected member is valid. An empty group is valid.
    pub fn is_valid(&self) -> bool {
        self.members.iter().all(|key| {
            self.scope
                .form
                .member(key)
                .map_or(true, |member| self.scope.member_valid(key, member))
        })
    }
}

impl fmt::Debug for GroupAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupAccessor")
            .field("path", &self.scope.base)
            .field("name", &self.name)
            .field("members", &self.members)
            .finish()
    }
}
