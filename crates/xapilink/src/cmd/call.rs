use std::sync::Arc;

use xapilink_codec::Value;
use xapilink_host::{Link, LinkConfig};
use xapilink_schema::{FieldType, MessageDescriptor, Schema};

use crate::cmd::{connect, parse_duration, CallArgs};
use crate::exit::{definition_error, host_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let schema = Schema::from_files(&args.api)
        .map_err(|err| definition_error("loading definitions failed", err))?;

    let (device, class, command) = split_command(&args.command)?;
    let entry = schema.command(device, class, command).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!("unknown command {device}.{class}.{command} in the loaded definitions"),
        )
    })?;
    let values = parse_args(&entry.command, &args.args)?;

    let stream = connect(&args.addr, timeout)?;
    let config = LinkConfig {
        response_timeout: timeout,
        ..LinkConfig::default()
    };
    let link = Link::open(stream, Arc::new(schema), config)
        .map_err(|err| host_error("link setup failed", err))?;

    let response = link
        .call(device, class, command, &values)
        .map_err(|err| host_error("call failed", err))?;

    print_message(&response, format);
    Ok(SUCCESS)
}

fn split_command(spec: &str) -> CliResult<(&str, &str, &str)> {
    let mut parts = spec.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(device), Some(class), Some(command), None)
            if !device.is_empty() && !class.is_empty() && !command.is_empty() =>
        {
            Ok((device, class, command))
        }
        _ => Err(CliError::new(
            USAGE,
            format!("expected device.class.command, got {spec:?}"),
        )),
    }
}

/// Parse CLI strings against the command's declared parameters.
fn parse_args(descriptor: &MessageDescriptor, inputs: &[String]) -> CliResult<Vec<Value>> {
    if inputs.len() != descriptor.fields.len() {
        return Err(CliError::new(
            USAGE,
            format!(
                "{} takes {} argument(s), got {}",
                descriptor.qualified_name(),
                descriptor.fields.len(),
                inputs.len()
            ),
        ));
    }

    let mut values = Vec::with_capacity(inputs.len());
    for (field, input) in descriptor.fields.iter().zip(inputs) {
        let value = match field.kind {
            FieldType::Uint8
            | FieldType::Uint16
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::ErrorCode
            | FieldType::Enum8
            | FieldType::Enum16
            | FieldType::Enum32 => Value::Unsigned(parse_unsigned(&field.name, input)?),
            FieldType::Int8 | FieldType::Int16 | FieldType::Int32 | FieldType::Int64 => {
                Value::Signed(parse_signed(&field.name, input)?)
            }
            FieldType::ByteArray(_)
            | FieldType::Uuid128
            | FieldType::Array8
            | FieldType::Array16 => Value::from(parse_hex(&field.name, input)?),
            FieldType::String8 => Value::from(input.as_str()),
        };
        values.push(value);
    }
    Ok(values)
}

fn parse_unsigned(field: &str, input: &str) -> CliResult<u64> {
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::new(USAGE, format!("{field}: invalid unsigned value {input:?}")))
}

fn parse_signed(field: &str, input: &str) -> CliResult<i64> {
    input
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("{field}: invalid signed value {input:?}")))
}

fn parse_hex(field: &str, input: &str) -> CliResult<Vec<u8>> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("{field}: hex value must have an even number of digits"),
        ));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| {
                CliError::new(USAGE, format!("{field}: invalid hex value {input:?}"))
            })
        })
        .collect()
}
