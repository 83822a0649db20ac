//! Locations inside form data.
//!
//! Form data is a tree of JSON objects and arrays, and every field, sub form
//! and repeating form lives somewhere in it. A [`Path`] names that place as a
//! list of [`Seg`] steps. Its text form is the steps joined by `/` behind a
//! single leading `/`, so the second item's `name` is `/items/1/name`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// One step of a [`Path`]: an object member or an array position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    Key(String),
    Index(usize),
}

impl Seg {
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }

    pub fn index(position: usize) -> Self {
        Self::Index(position)
    }

    /// Reads one step of path text.
    ///
    /// Only `0` and digit runs without a leading zero become positions. `"01"`
    /// stays a key, otherwise it would come back out as `"1"`.
    pub fn parse(step: &str) -> Self {
        let digits = !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit());
        let canonical = step == "0" || !step.starts_with('0');
        match step.parse::<usize>() {
            Ok(position) if digits && canonical => Self::Index(position),
            _ => Self::Key(step.to_owned()),
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        if let Self::Index(position) = self {
            Some(*position)
        } else {
            None
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(name) => f.write_str(name),
            Self::Index(position) => write!(f, "{position}"),
        }
    }
}

impl From<&str> for Seg {
    fn from(name: &str) -> Self {
        Self::key(name)
    }
}

impl From<String> for Seg {
    fn from(name: String) -> Self {
        Self::Key(name)
    }
}

impl From<usize> for Seg {
    fn from(position: usize) -> Self {
        Self::Index(position)
    }
}

/// Where a value sits in form data.
///
/// The empty path is the document itself.
///
/// ```
/// use formstate::Path;
///
/// let name = Path::root().key("items").index(1).key("name");
/// assert_eq!(name.encode(), "/items/1/name");
/// assert_eq!("/items/1/name".parse::<Path>().unwrap(), name);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Reads path text.
    ///
    /// At most one leading `/` is dropped before splitting, so `""` and `"/"`
    /// both give a path with one empty key, and `"//a"` keeps an empty first
    /// step.
    pub fn decode(text: &str) -> Self {
        let body = text.strip_prefix('/').unwrap_or(text);
        body.split('/').map(Seg::parse).collect()
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Extends the path by an object member.
    pub fn key(self, name: impl Into<String>) -> Self {
        self.then(Seg::Key(name.into()))
    }

    /// Extends the path by an array position.
    pub fn index(self, position: usize) -> Self {
        self.then(Seg::Index(position))
    }

    fn then(mut self, seg: Seg) -> Self {
        self.0.push(seg);
        self
    }

    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Seg> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// The path one step up, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, init) = self.0.split_last()?;
        Some(Path(init.to_vec()))
    }

    /// Whether `prefix` is this path or an ancestor of it.
    ///
    /// Steps are compared whole: `/items2/0` is not under `/items`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("/");
        }
        self.iter().try_for_each(|seg| write!(f, "/{seg}"))
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::decode(text))
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(steps: I) -> Self {
        Self(steps.into_iter().collect())
    }
}

impl Index<usize> for Path {
    type Output = Seg;

    fn index(&self, position: usize) -> &Seg {
        &self.0[position]
    }
}

/// Builds a [`Path`] from keys (`&str`, `String`) and positions (`usize`).
///
/// ```
/// use formstate::path;
///
/// assert_eq!(path!("items", 1, "name").encode(), "/items/1/name");
/// assert_eq!(path!().encode(), "/");
/// ```
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        <$crate::Path as ::std::iter::FromIterator<$crate::Seg>>::from_iter([
            $($crate::Seg::from($seg)),*
        ])
    };
}
