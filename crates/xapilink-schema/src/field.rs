/// Wire type of a single message field.
///
/// Fixed-width kinds occupy exactly `fixed_width()` bytes. Variable-length
/// kinds are encoded as their length prefix (u8 or u16, little-endian)
/// immediately followed by that many raw bytes, so the length field always
/// precedes the data it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    /// Result/status code of a response (u16). Responses carry exactly one.
    ErrorCode,
    /// Integer-backed enumeration or bitmask, 1 byte wide.
    Enum8,
    /// Integer-backed enumeration or bitmask, 2 bytes wide.
    Enum16,
    /// Integer-backed enumeration or bitmask, 4 bytes wide.
    Enum32,
    /// Fixed-size byte array of the declared length.
    ByteArray(usize),
    /// 16-byte identifier (UUIDs, 128-bit keys, hash values).
    Uuid128,
    /// Byte array with a u8 length prefix (max 255 bytes).
    Array8,
    /// Byte array with a u16 length prefix (max 65535 bytes).
    Array16,
    /// Text with a u8 length prefix.
    String8,
}

impl FieldType {
    /// Wire width in bytes for fixed-width kinds, `None` for variable kinds.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            FieldType::Uint8 | FieldType::Int8 | FieldType::Enum8 => Some(1),
            FieldType::Uint16 | FieldType::Int16 | FieldType::ErrorCode | FieldType::Enum16 => {
                Some(2)
            }
            FieldType::Uint32 | FieldType::Int32 | FieldType::Enum32 => Some(4),
            FieldType::Uint64 | FieldType::Int64 => Some(8),
            FieldType::ByteArray(len) => Some(*len),
            FieldType::Uuid128 => Some(16),
            FieldType::Array8 | FieldType::Array16 | FieldType::String8 => None,
        }
    }

    /// Width of the length prefix for variable-length kinds.
    pub fn length_prefix_width(&self) -> Option<usize> {
        match self {
            FieldType::Array8 | FieldType::String8 => Some(1),
            FieldType::Array16 => Some(2),
            _ => None,
        }
    }

    /// The type name used in definition documents.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Uint8 => "uint8",
            FieldType::Int8 => "int8",
            FieldType::Uint16 => "uint16",
            FieldType::Int16 => "int16",
            FieldType::Uint32 => "uint32",
            FieldType::Int32 => "int32",
            FieldType::Uint64 => "uint64",
            FieldType::Int64 => "int64",
            FieldType::ErrorCode => "errorcode",
            FieldType::Enum8 => "enum8",
            FieldType::Enum16 => "enum16",
            FieldType::Enum32 => "enum32",
            FieldType::ByteArray(_) => "byte_array",
            FieldType::Uuid128 => "uuid_128",
            FieldType::Array8 => "uint8array",
            FieldType::Array16 => "uint16array",
            FieldType::String8 => "string",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::ByteArray(len) => write!(f, "byte_array[{len}]"),
            other => f.write_str(other.name()),
        }
    }
}

/// One named field of a message. Wire order is the field's position in the
/// owning [`MessageDescriptor`](crate::MessageDescriptor)'s field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}
