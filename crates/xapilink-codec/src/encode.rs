use bytes::{BufMut, Bytes, BytesMut};
use xapilink_schema::{FieldType, MessageDescriptor};

use crate::error::ArgumentError;
use crate::value::Value;

/// Encode a positional argument list against a message descriptor.
///
/// Arguments map to fields by position. Integers are range-checked against
/// the declared width; byte sequences against the declared (or maximum
/// expressible) length. Variable-length fields are written as length prefix
/// then raw bytes.
pub fn encode_payload(
    descriptor: &MessageDescriptor,
    args: &[Value],
) -> Result<Bytes, ArgumentError> {
    if args.len() != descriptor.fields.len() {
        return Err(ArgumentError::Arity {
            message: descriptor.qualified_name(),
            expected: descriptor.fields.len(),
            given: args.len(),
        });
    }

    let mut buf = BytesMut::new();
    for (field, arg) in descriptor.fields.iter().zip(args) {
        encode_field(descriptor, &field.name, field.kind, arg, &mut buf)?;
    }
    Ok(buf.freeze())
}

fn encode_field(
    descriptor: &MessageDescriptor,
    field: &str,
    kind: FieldType,
    arg: &Value,
    buf: &mut BytesMut,
) -> Result<(), ArgumentError> {
    match kind {
        FieldType::Uint8 | FieldType::Enum8 => {
            let v = unsigned_in_range(descriptor, field, arg, u8::MAX as u64, 1)?;
            buf.put_u8(v as u8);
        }
        FieldType::Uint16 | FieldType::Enum16 | FieldType::ErrorCode => {
            let v = unsigned_in_range(descriptor, field, arg, u16::MAX as u64, 2)?;
            buf.put_u16_le(v as u16);
        }
        FieldType::Uint32 | FieldType::Enum32 => {
            let v = unsigned_in_range(descriptor, field, arg, u32::MAX as u64, 4)?;
            buf.put_u32_le(v as u32);
        }
        FieldType::Uint64 => {
            let v = unsigned_in_range(descriptor, field, arg, u64::MAX, 8)?;
            buf.put_u64_le(v);
        }
        FieldType::Int8 => {
            let v = signed_in_range(descriptor, field, arg, i8::MIN as i64, i8::MAX as i64, 1)?;
            buf.put_i8(v as i8);
        }
        FieldType::Int16 => {
            let v = signed_in_range(descriptor, field, arg, i16::MIN as i64, i16::MAX as i64, 2)?;
            buf.put_i16_le(v as i16);
        }
        FieldType::Int32 => {
            let v = signed_in_range(descriptor, field, arg, i32::MIN as i64, i32::MAX as i64, 4)?;
            buf.put_i32_le(v as i32);
        }
        FieldType::Int64 => {
            let v = signed_in_range(descriptor, field, arg, i64::MIN, i64::MAX, 8)?;
            buf.put_i64_le(v);
        }
        FieldType::ByteArray(len) => {
            let bytes = expect_bytes(descriptor, field, arg)?;
            if bytes.len() != len {
                return Err(ArgumentError::FixedLengthMismatch {
                    message: descriptor.qualified_name(),
                    field: field.to_string(),
                    expected: len,
                    given: bytes.len(),
                });
            }
            buf.put_slice(bytes);
        }
        FieldType::Uuid128 => {
            let bytes = expect_bytes(descriptor, field, arg)?;
            if bytes.len() != 16 {
                return Err(ArgumentError::FixedLengthMismatch {
                    message: descriptor.qualified_name(),
                    field: field.to_string(),
                    expected: 16,
                    given: bytes.len(),
                });
            }
            buf.put_slice(bytes);
        }
        FieldType::Array8 => {
            let bytes = expect_bytes(descriptor, field, arg)?;
            let len = prefixed_len(descriptor, field, bytes.len(), u8::MAX as usize)?;
            buf.put_u8(len as u8);
            buf.put_slice(bytes);
        }
        FieldType::Array16 => {
            let bytes = expect_bytes(descriptor, field, arg)?;
            let len = prefixed_len(descriptor, field, bytes.len(), u16::MAX as usize)?;
            buf.put_u16_le(len as u16);
            buf.put_slice(bytes);
        }
        FieldType::String8 => {
            let text = match arg {
                Value::Text(s) => s.as_bytes(),
                _ => {
                    return Err(ArgumentError::TypeMismatch {
                        message: descriptor.qualified_name(),
                        field: field.to_string(),
                        expected: "a string value",
                    })
                }
            };
            let len = prefixed_len(descriptor, field, text.len(), u8::MAX as usize)?;
            buf.put_u8(len as u8);
            buf.put_slice(text);
        }
    }
    Ok(())
}

fn unsigned_in_range(
    descriptor: &MessageDescriptor,
    field: &str,
    arg: &Value,
    max: u64,
    width: usize,
) -> Result<u64, ArgumentError> {
    let v = arg
        .as_u64()
        .ok_or_else(|| ArgumentError::TypeMismatch {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            expected: "an unsigned integer",
        })?;
    if v > max {
        return Err(ArgumentError::OutOfRange {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            value: v as i128,
            width,
        });
    }
    Ok(v)
}

fn signed_in_range(
    descriptor: &MessageDescriptor,
    field: &str,
    arg: &Value,
    min: i64,
    max: i64,
    width: usize,
) -> Result<i64, ArgumentError> {
    let v = arg
        .as_i64()
        .ok_or_else(|| ArgumentError::TypeMismatch {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            expected: "a signed integer",
        })?;
    if v < min || v > max {
        return Err(ArgumentError::OutOfRange {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            value: v as i128,
            width,
        });
    }
    Ok(v)
}

fn expect_bytes<'a>(
    descriptor: &MessageDescriptor,
    field: &str,
    arg: &'a Value,
) -> Result<&'a [u8], ArgumentError> {
    arg.as_bytes().ok_or_else(|| ArgumentError::TypeMismatch {
        message: descriptor.qualified_name(),
        field: field.to_string(),
        expected: "a byte sequence",
    })
}

fn prefixed_len(
    descriptor: &MessageDescriptor,
    field: &str,
    len: usize,
    max: usize,
) -> Result<usize, ArgumentError> {
    if len > max {
        return Err(ArgumentError::TooLong {
            message: descriptor.qualified_name(),
            field: field.to_string(),
            given: len,
            max,
        });
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use xapilink_schema::{FieldDescriptor, MessageKind};

    fn descriptor(fields: Vec<FieldDescriptor>) -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor {
            kind: MessageKind::Command,
            device_id: 0,
            device_name: "bt".to_string(),
            class_id: 1,
            class_name: "system".to_string(),
            id: 2,
            name: "probe".to_string(),
            fields,
        })
    }

    #[test]
    fn integers_are_little_endian() {
        let desc = descriptor(vec![
            FieldDescriptor::new("a", FieldType::Uint16),
            FieldDescriptor::new("b", FieldType::Uint32),
        ]);
        let payload = encode_payload(
            &desc,
            &[Value::Unsigned(0x1234), Value::Unsigned(0xAABBCCDD)],
        )
        .unwrap();
        assert_eq!(payload.as_ref(), &[0x34, 0x12, 0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn signed_integers_encode_twos_complement() {
        let desc = descriptor(vec![
            FieldDescriptor::new("rssi", FieldType::Int8),
            FieldDescriptor::new("offset", FieldType::Int16),
        ]);
        let payload =
            encode_payload(&desc, &[Value::Signed(-40), Value::Signed(-2)]).unwrap();
        assert_eq!(payload.as_ref(), &[0xD8, 0xFE, 0xFF]);
    }

    #[test]
    fn variable_fields_carry_length_prefix() {
        let desc = descriptor(vec![
            FieldDescriptor::new("data", FieldType::Array8),
            FieldDescriptor::new("blob", FieldType::Array16),
        ]);
        let payload = encode_payload(
            &desc,
            &[Value::from(&b"ab"[..]), Value::from(&b"xyz"[..])],
        )
        .unwrap();
        assert_eq!(
            payload.as_ref(),
            &[2, b'a', b'b', 3, 0, b'x', b'y', b'z']
        );
    }

    #[test]
    fn string_encodes_prefix_and_utf8() {
        let desc = descriptor(vec![FieldDescriptor::new("name", FieldType::String8)]);
        let payload = encode_payload(&desc, &[Value::from("ok")]).unwrap();
        assert_eq!(payload.as_ref(), &[2, b'o', b'k']);
    }

    #[test]
    fn empty_message_encodes_empty_payload() {
        let desc = descriptor(vec![]);
        let payload = encode_payload(&desc, &[]).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn arity_mismatch_fails() {
        let desc = descriptor(vec![FieldDescriptor::new("a", FieldType::Uint8)]);
        let err = encode_payload(&desc, &[]).unwrap_err();
        assert!(matches!(
            err,
            ArgumentError::Arity {
                expected: 1,
                given: 0,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_integer_fails() {
        let desc = descriptor(vec![FieldDescriptor::new("a", FieldType::Uint8)]);
        let err = encode_payload(&desc, &[Value::Unsigned(256)]).unwrap_err();
        assert!(matches!(err, ArgumentError::OutOfRange { width: 1, .. }));

        let desc = descriptor(vec![FieldDescriptor::new("a", FieldType::Int8)]);
        let err = encode_payload(&desc, &[Value::Signed(128)]).unwrap_err();
        assert!(matches!(err, ArgumentError::OutOfRange { .. }));
    }

    #[test]
    fn type_mismatch_fails() {
        let desc = descriptor(vec![FieldDescriptor::new("a", FieldType::Uint8)]);
        let err = encode_payload(&desc, &[Value::from("nope")]).unwrap_err();
        assert!(matches!(err, ArgumentError::TypeMismatch { .. }));
    }

    #[test]
    fn fixed_array_length_is_enforced() {
        let desc = descriptor(vec![FieldDescriptor::new(
            "addr",
            FieldType::ByteArray(6),
        )]);
        let err = encode_payload(&desc, &[Value::from(&b"abc"[..])]).unwrap_err();
        assert!(matches!(
            err,
            ArgumentError::FixedLengthMismatch {
                expected: 6,
                given: 3,
                ..
            }
        ));
    }

    #[test]
    fn oversized_array8_fails() {
        let desc = descriptor(vec![FieldDescriptor::new("data", FieldType::Array8)]);
        let err = encode_payload(&desc, &[Value::from(vec![0u8; 256])]).unwrap_err();
        assert!(matches!(err, ArgumentError::TooLong { max: 255, .. }));
    }
}
