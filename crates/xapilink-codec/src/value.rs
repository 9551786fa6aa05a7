use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use xapilink_schema::{FieldType, MessageDescriptor, MessageKind};

/// One field value, as supplied to `encode_payload` or produced by
/// `decode_payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned integers, enumerations, bitmasks, result codes.
    Unsigned(u64),
    /// Signed integers.
    Signed(i64),
    /// Fixed-size and length-prefixed byte arrays, UUIDs, keys.
    Bytes(Bytes),
    /// Length-prefixed strings.
    Text(String),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Signed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Bytes(v) => {
                for byte in v.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Text(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! value_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Unsigned(v as u64)
            }
        })*
    };
}

macro_rules! value_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Signed(v as i64)
            }
        })*
    };
}

value_from_unsigned!(u8, u16, u32, u64);
value_from_signed!(i8, i16, i32, i64);

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Immutable decoded response or event.
///
/// An ordered record over the descriptor's field order, addressable by name
/// and by position, and value-equal to the flat ordered list of its field
/// values.
#[derive(Debug, Clone)]
pub struct DecodedValue {
    descriptor: Arc<MessageDescriptor>,
    values: Vec<Value>,
}

impl DecodedValue {
    pub fn new(descriptor: Arc<MessageDescriptor>, values: Vec<Value>) -> Self {
        Self { descriptor, values }
    }

    /// The descriptor this value was decoded against.
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Message kind (command, response, or event).
    pub fn kind(&self) -> MessageKind {
        self.descriptor.kind
    }

    /// `<device>_<cmd|rsp|evt>_<class>_<name>`.
    pub fn qualified_name(&self) -> String {
        self.descriptor.qualified_name()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field value by ordinal position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// Iterate `(field name, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.descriptor
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }

    /// All values in wire order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The result/status code of a response, if its descriptor declares one.
    ///
    /// Zero means success; any other value maps to a command failure.
    pub fn result_code(&self) -> Option<u16> {
        let index = self
            .descriptor
            .fields
            .iter()
            .position(|f| f.kind == FieldType::ErrorCode)?;
        self.values.get(index)?.as_u64().map(|v| v as u16)
    }
}

impl std::ops::Index<usize> for DecodedValue {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl PartialEq for DecodedValue {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor && self.values == other.values
    }
}

impl PartialEq<[Value]> for DecodedValue {
    fn eq(&self, other: &[Value]) -> bool {
        self.values.as_slice() == other
    }
}

impl PartialEq<Vec<Value>> for DecodedValue {
    fn eq(&self, other: &Vec<Value>) -> bool {
        &self.values == other
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.qualified_name())?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}
