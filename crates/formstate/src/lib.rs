//! Typed form state with bidirectional conversion and validation.
//!
//! `formstate` keeps, for every editable leaf of a JSON document, the raw
//! input a user typed next to the converted domain value, and propagates
//! validity up through groups, sub-forms and repeating forms.
//!
//! # Core Concepts
//!
//! - **Converter**: turns a raw (usually text) into a typed value and back
//! - **Field**: a converter plus required flag, validators and messages
//! - **Form**: named fields, sub-forms, repeating forms and groups
//! - **FormState**: a form bound to a [`DataSource`], holding raw input,
//!   errors and dirty flags per path
//! - **Path**: addresses a value inside the document (`/items/0/name`)
//!
//! # Data Flow
//!
//! ```text
//! raw ─▶ preprocess ─▶ empty / required ─▶ convert ─▶ validators ─▶ DataSource
//!  ▲                                                                   │
//!  └──────────────────────────── render ◀──────────────────────────────┘
//! ```
//!
//! Conversion and validation failures never reach the data: the previous
//! value stays in place and the field carries an error message instead.
//!
//! # Quick Start
//!
//! ```
//! use formstate::{converters, DocCell, Field, Form, FormOptions, FormState, Group};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # futures::executor::block_on(async {
//! let form = Form::new()
//!     .field("name", Field::new(converters::string()).required())
//!     .field("price", Field::new(converters::decimal(Default::default())))
//!     .group("summary", Group::include(["name"]));
//!
//! let doc = Arc::new(DocCell::new(json!({"name": "Tea"})));
//! let options = FormOptions::default().with_separators(',', '.');
//! let state = FormState::new(form, doc.clone(), options).unwrap();
//!
//! state.field("price").unwrap().set_raw("3,5").await.unwrap();
//! assert_eq!(state.field("price").unwrap().raw(), json!("3,5"));
//! assert_eq!(doc.snapshot(), json!({"name": "Tea", "price": "3.50"}));
//!
//! state.field("name").unwrap().set_raw("").await.unwrap();
//! assert!(!state.group("summary").unwrap().is_valid());
//! # });
//! ```

mod apply;
mod converter;
pub mod converters;
mod decimal;
mod error;
mod field;
mod form;
mod options;
mod path;
mod source;
mod state;
mod store;
pub mod validation;

// Addressing
pub use apply::get_at_path;
pub use path::{Path, Seg};
pub use store::{insert_index_and_renumber, remove_index_and_renumber, PathStore};

// Conversion
pub use converter::{
    Controlled, Conversion, ConversionError, ConversionResult, Converter, ConverterKind,
    EmptyEncoding, RawRepr,
};
pub use decimal::{DecimalError, DecimalOptions};

// Definitions and state
pub use error::{value_type_name, FormError, FormResult};
pub use field::Field;
pub use form::{Form, Group, RepeatingForm, SubForm};
pub use options::{ConverterOptions, FormOptions};
pub use source::{DataSource, DocCell};
pub use state::{FieldAccessor, FormAccessor, FormState, GroupAccessor, RepeatingFormAccessor};
pub use validation::Validator;

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
