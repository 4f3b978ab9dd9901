//!
//! # Conceptforms Core
//!
//! Conceptforms core defines the data model shared by the form widgets of a query builder
//! and the backend evaluating the queries, and the translation between the two.
//!
//! ## Glossary
//!
//! **Concept** - a queryable unit of data exposed to the user. A concept maps to one or more
//! backend fields and is shown through one or more views (forms, charts, custom plugins).
//!
//! **[Form key](crate::key::FormKey)** - the name of an input widget. It encodes the concept,
//! the field and the role of the value (single value, one side of a range, operator,
//! or chosen field). See [key](crate::key).
//!
//! **[Form data-source](crate::form::FormData)** - flat map from form keys to the values
//! entered by the user. Every concept owns one data-source, created empty or from an existing query,
//! and updated whenever an input changes.
//!
//! **[Query document](crate::query::QueryDocument)** - the structured filter sent to the backend:
//! a [condition](crate::query::QueryNode) on one field or a [branch](crate::query::QueryBranch)
//! combining several conditions.
//!
//! **Field choice** - an input letting the user pick which of several candidate fields a condition
//! applies to. The choice is stored under its own [form key](crate::key::FormKey::FieldChoice) and
//! reappears in the query as `id_choices`.
//!
//! **[Translator](crate::translate::Translator)** - converts a data-source to a query document
//! and back. See [translate](crate::translate).
extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod error;
pub mod form;
pub mod key;
pub mod parse;
pub mod query;
pub mod translate;
pub mod value;

pub use config::FormsConfig;
pub use error::{Error, ErrorType};
pub use form::FormData;
pub use key::{FieldRef, FormKey, InputSlot};
pub use parse::parse_form_key;
pub use query::{BranchType, QueryBranch, QueryDocument, QueryNode};
pub use translate::{form_from_query, query_from_form, Translator};
pub use value::Value;
