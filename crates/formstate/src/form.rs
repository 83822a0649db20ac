//! Form definitions: fields, sub-forms, repeating forms and groups.
//!
//! A definition is immutable once built and can be shared by any number of
//! [`FormState`](crate::FormState)s.
//!
//! ```
//! use formstate::{converters, Field, Form, Group, RepeatingForm};
//!
//! let form = Form::new()
//!     .field("name", Field::new(converters::string()).required())
//!     .field("age", Field::new(converters::integer()))
//!     .repeating_form(
//!         "pets",
//!         RepeatingForm::new(Form::new().field("name", Field::new(converters::string()))),
//!     )
//!     .group("person", Group::include(["name", "age"]));
//! assert!(form.check().is_ok());
//! ```

use crate::converter::RawRepr;
use crate::error::{FormError, FormResult};
use crate::field::{Field, FieldDef};
use crate::options::FormOptions;
use crate::source::DataSource;
use crate::state::FormState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A named entry of a form.
#[derive(Clone)]
pub(crate) enum Member {
    Field(Arc<dyn FieldDef>),
    SubForm(Arc<Form>),
    Repeating(Arc<Form>),
}

impl Member {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Member::Field(_) => "field",
            Member::SubForm(_) => "sub form",
            Member::Repeating(_) => "repeating form",
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field(_) => f.write_str("Field"),
            Member::SubForm(form) => f.debug_tuple("SubForm").field(form).finish(),
            Member::Repeating(form) => f.debug_tuple("Repeating").field(form).finish(),
        }
    }
}

/// A nested object edited as part of its parent.
#[derive(Debug, Clone, Default)]
pub struct SubForm(Form);

impl SubForm {
    /// Wrap a form definition for use at an object-valued key.
    pub fn new(form: Form) -> Self {
        Self(form)
    }
}

/// An array of objects, each edited with the same definition.
#[derive(Debug, Clone, Default)]
pub struct RepeatingForm(Form);

impl RepeatingForm {
    /// Wrap a form definition for use at an array-valued key.
    pub fn new(form: Form) -> Self {
        Self(form)
    }
}

/// A named subset of sibling members whose validity is aggregated.
///
/// The two variants make include and exclude lists mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group {
    /// Exactly these members.
    Include(Vec<String>),
    /// Every member except these.
    Exclude(Vec<String>),
}

impl Group {
    /// Group of the listed members.
    pub fn include<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Group::Include(keys.into_iter().map(Into::into).collect())
    }

    /// Group of every member except the listed ones.
    pub fn exclude<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Group::Exclude(keys.into_iter().map(Into::into).collect())
    }

    fn listed(&self) -> &[String] {
        match self {
            Group::Include(keys) | Group::Exclude(keys) => keys,
        }
    }

    /// Member keys selected from `all`.
    pub(crate) fn select<'a>(&self, all: impl Iterator<Item = &'a String>) -> Vec<String> {
        match self {
            Group::Include(keys) => keys.clone(),
            Group::Exclude(keys) => all.filter(|key| !keys.contains(key)).cloned().collect(),
        }
    }
}

/// Definition of a (sub-)form.
#[derive(Debug, Clone, Default)]
pub struct Form {
    members: BTreeMap<String, Member>,
    groups: BTreeMap<String, Group>,
}

impl Form {
    /// Create an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field<R, V>(mut self, key: impl Into<String>, field: Field<R, V>) -> Self
    where
        R: RawRepr,
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.members.insert(key.into(), Member::Field(Arc::new(field)));
        self
    }

    /// Add a sub-form.
    pub fn sub_form(mut self, key: impl Into<String>, sub_form: SubForm) -> Self {
        self.members
            .insert(key.into(), Member::SubForm(Arc::new(sub_form.0)));
        self
    }

    /// Add a repeating form.
    pub fn repeating_form(mut self, key: impl Into<String>, repeating: RepeatingForm) -> Self {
        self.members
            .insert(key.into(), Member::Repeating(Arc::new(repeating.0)));
        self
    }

    /// Add a group over members of this form.
    pub fn group(mut self, name: impl Into<String>, group: Group) -> Self {
        self.groups.insert(name.into(), group);
        self
    }

    /// Member keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Group names in order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub(crate) fn member(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = (&String, &Member)> {
        self.members.iter()
    }

    pub(crate) fn group_def(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Selected member keys of a group.
    pub(crate) fn group_members(&self, group: &Group) -> Vec<String> {
        group.select(self.members.keys())
    }

    /// Check that every group refers only to members defined beside it,
    /// recursively.
    pub fn check(&self) -> FormResult<()> {
        for (name, group) in &self.groups {
            if let Some(key) = group.listed().iter().find(|k| !self.members.contains_key(*k)) {
                return Err(FormError::invalid_group(name.clone(), key.clone()));
            }
        }
        for member in self.members.values() {
            match member {
                Member::SubForm(form) | Member::Repeating(form) => form.check()?,
                Member::Field(_) => {}
            }
        }
        Ok(())
    }

    /// Create a state editing `source` with default options.
    pub fn state(self, source: Arc<dyn DataSource>) -> FormResult<FormState> {
        FormState::new(self, source, FormOptions::default())
    }
}
