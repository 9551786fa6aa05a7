//! Protocol definition model and loader for BGAPI-style APIs.
//!
//! A definition document declares, per device, the message classes with
//! their commands (arguments and response fields), and events, plus an API
//! version token. The loader turns one or more documents into an immutable
//! [`Schema`] shared read-only by the codec and the dispatch engine.

pub mod error;
pub mod field;
pub mod loader;
pub mod model;
pub mod schema;

pub use error::{DefinitionError, Result};
pub use field::{FieldDescriptor, FieldType};
pub use model::{ClassDescriptor, CommandEntry, DeviceSchema, MessageDescriptor, MessageKind};
pub use schema::{Schema, SchemaBuilder};
