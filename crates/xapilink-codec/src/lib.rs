//! Schema-driven payload serialization for BGAPI-style messages.
//!
//! Given a [`MessageDescriptor`](xapilink_schema::MessageDescriptor), this
//! crate encodes positional argument lists into wire payloads and decodes
//! wire payloads into [`DecodedValue`] records addressable by field name and
//! by position. Fixed-width integers are little-endian; variable-length
//! fields carry their length prefix immediately before the raw bytes.

pub mod decode;
pub mod encode;
pub mod error;
pub mod value;

pub use decode::decode_payload;
pub use encode::encode_payload;
pub use error::{ArgumentError, DecodeError};
pub use value::{DecodedValue, Value};
