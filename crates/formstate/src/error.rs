//! Errors from defining forms and touching their data.
//!
//! A raw that fails to convert or validate is not a `FormError`. That outcome
//! is kept on the field and read back through `FieldAccessor::error`.

use crate::Path;
use serde_json::Value;
use thiserror::Error;

pub type FormResult<T> = Result<T, FormError>;

#[derive(Debug, Error)]
pub enum FormError {
    /// The form at `path` defines nothing called `key`.
    #[error("no member `{key}` defined at {path}")]
    UnknownMember { path: Path, key: String },

    /// A member was asked for as one kind but is defined as another.
    #[error("member at {path} is a {found}, not a {expected}")]
    MemberKind {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    #[error("no group `{name}` defined at {path}")]
    UnknownGroup { path: Path, name: String },

    /// A group lists a key its form does not define.
    #[error("group `{group}` refers to undefined member `{key}`")]
    InvalidGroup { group: String, key: String },

    /// Nothing in the form definition or data lives at this path.
    #[error("nothing at {path}")]
    PathNotFound { path: Path },

    #[error("no item {index} in array of {len} at {path}")]
    IndexOutOfBounds {
        /// The array, not the item.
        path: Path,
        index: usize,
        len: usize,
    },

    /// The data holds the wrong JSON type for the operation.
    #[error("expected {expected} at {path}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    /// Separators or other options that cannot work together.
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    /// Stored data did not deserialize into the requested type.
    #[error("cannot read value: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl FormError {
    pub fn unknown_member(path: Path, key: impl Into<String>) -> Self {
        Self::UnknownMember {
            path,
            key: key.into(),
        }
    }

    pub fn member_kind(path: Path, expected: &'static str, found: &'static str) -> Self {
        Self::MemberKind {
            path,
            expected,
            found,
        }
    }

    pub fn unknown_group(path: Path, name: impl Into<String>) -> Self {
        Self::UnknownGroup {
            path,
            name: name.into(),
        }
    }

    pub fn invalid_group(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::InvalidGroup {
            group: group.into(),
            key: key.into(),
        }
    }

    pub fn path_not_found(path: Path) -> Self {
        Self::PathNotFound { path }
    }

    pub fn index_out_of_bounds(path: Path, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { path, index, len }
    }

    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}

/// The JSON type of `value`, as used in [`FormError::TypeMismatch`].
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
