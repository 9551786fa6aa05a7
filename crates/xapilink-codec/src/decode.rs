use std::sync::Arc;

use bytes::{Buf, Bytes};
use xapilink_schema::{FieldType, MessageDescriptor};

use crate::error::DecodeError;
use crate::value::{DecodedValue, Value};

/// Decode a payload against a message descriptor.
///
/// Total over well-formed payloads: every field is produced in declared
/// order or the whole decode fails. The payload must account for exactly the
/// bytes the descriptor implies — truncation and trailing bytes are both
/// errors. Signed fields are sign-extended from their declared width only.
pub fn decode_payload(
    descriptor: Arc<MessageDescriptor>,
    payload: &[u8],
) -> Result<DecodedValue, DecodeError> {
    let mut buf = payload;
    let mut values = Vec::with_capacity(descriptor.fields.len());

    for field in &descriptor.fields {
        let value = decode_field(&descriptor, &field.name, field.kind, &mut buf)?;
        values.push(value);
    }

    if !buf.is_empty() {
        return Err(DecodeError::TrailingBytes {
            message: descriptor.qualified_name(),
            extra: buf.len(),
        });
    }

    Ok(DecodedValue::new(descriptor, values))
}

fn decode_field(
    descriptor: &MessageDescriptor,
    field: &str,
    kind: FieldType,
    buf: &mut &[u8],
) -> Result<Value, DecodeError> {
    let need = |buf: &&[u8], needed: usize| -> Result<(), DecodeError> {
        if buf.len() < needed {
            Err(DecodeError::Truncated {
                message: descriptor.qualified_name(),
                field: field.to_string(),
                needed,
                remaining: buf.len(),
            })
        } else {
            Ok(())
        }
    };

    let value = match kind {
        FieldType::Uint8 | FieldType::Enum8 => {
            need(buf, 1)?;
            Value::Unsigned(buf.get_u8() as u64)
        }
        FieldType::Uint16 | FieldType::Enum16 | FieldType::ErrorCode => {
            need(buf, 2)?;
            Value::Unsigned(buf.get_u16_le() as u64)
        }
        FieldType::Uint32 | FieldType::Enum32 => {
            need(buf, 4)?;
            Value::Unsigned(buf.get_u32_le() as u64)
        }
        FieldType::Uint64 => {
            need(buf, 8)?;
            Value::Unsigned(buf.get_u64_le())
        }
        FieldType::Int8 => {
            need(buf, 1)?;
            Value::Signed(buf.get_i8() as i64)
        }
        FieldType::Int16 => {
            need(buf, 2)?;
            Value::Signed(buf.get_i16_le() as i64)
        }
        FieldType::Int32 => {
            need(buf, 4)?;
            Value::Signed(buf.get_i32_le() as i64)
        }
        FieldType::Int64 => {
            need(buf, 8)?;
            Value::Signed(buf.get_i64_le())
        }
        FieldType::ByteArray(len) => {
            need(buf, len)?;
            Value::Bytes(take_bytes(buf, len))
        }
        FieldType::Uuid128 => {
            need(buf, 16)?;
            Value::Bytes(take_bytes(buf, 16))
        }
        FieldType::Array8 => {
            need(buf, 1)?;
            let declared = buf.get_u8() as usize;
            take_declared(descriptor, field, buf, declared).map(Value::Bytes)?
        }
        FieldType::Array16 => {
            need(buf, 2)?;
            let declared = buf.get_u16_le() as usize;
            take_declared(descriptor, field, buf, declared).map(Value::Bytes)?
        }
        FieldType::String8 => {
            need(buf, 1)?;
            let declared = buf.get_u8() as usize;
            let bytes = take_declared(descriptor, field, buf, declared)?;
            // Device strings are not guaranteed UTF-8; replace rather than drop.
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
    };
    Ok(value)
}

fn take_bytes(buf: &mut &[u8], len: usize) -> Bytes {
    let bytes = Bytes::copy_from_slice(&buf[..len]);
    buf.advance(len);
    bytes
}

fn take_declared(
    descriptor: &MessageDescriptor,
    field: &str,
    buf: &mut &[u8],
    declared: usize,
) -> Result<Bytes, DecodeError> {
    if buf.len() < declared {
        return Err(DecodeError::LengthOverrun {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            declared,
            remaining: buf.len(),
        });
    }
    Ok(take_bytes(buf, declared))
}
