//! Parses definition documents into the schema model.
//!
//! A definition is one JSON document per device:
//!
//! ```json
//! {
//!   "device_id": 0,
//!   "device_name": "bt",
//!   "version": "3.2.1",
//!   "classes": [
//!     {
//!       "name": "system", "id": 1,
//!       "commands": [
//!         { "name": "hello", "id": 0, "params": [],
//!           "returns": [ { "name": "result", "type": "errorcode" } ] }
//!       ],
//!       "events": [
//!         { "name": "boot", "id": 0, "params": [
//!             { "name": "major", "type": "uint16" },
//!             { "name": "minor", "type": "uint16" } ] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{DefinitionError, Result};
use crate::field::{FieldDescriptor, FieldType};
use crate::model::{ClassDescriptor, CommandEntry, DeviceSchema, MessageDescriptor, MessageKind};

/// Device ids share header byte 0 with the type bit and length bits.
pub const MAX_DEVICE_ID: u8 = 15;

#[derive(Debug, Deserialize)]
struct DefinitionDoc {
    device_id: u8,
    device_name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    classes: Vec<ClassDef>,
}

#[derive(Debug, Deserialize)]
struct ClassDef {
    name: String,
    id: u8,
    #[serde(default)]
    commands: Vec<CommandDef>,
    #[serde(default)]
    events: Vec<EventDef>,
}

#[derive(Debug, Deserialize)]
struct CommandDef {
    name: String,
    id: u8,
    #[serde(default)]
    params: Vec<FieldDef>,
    #[serde(default)]
    returns: Vec<FieldDef>,
    /// Fire-and-forget: the device never answers this command.
    #[serde(default)]
    no_response: bool,
}

#[derive(Debug, Deserialize)]
struct EventDef {
    name: String,
    id: u8,
    #[serde(default)]
    params: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    length: Option<usize>,
}

/// Parse one definition document into a device schema.
pub fn parse_definition(origin: &str, json: &str) -> Result<DeviceSchema> {
    let doc: DefinitionDoc =
        serde_json::from_str(json).map_err(|source| DefinitionError::Parse {
            origin: origin.to_string(),
            source,
        })?;

    if doc.device_id > MAX_DEVICE_ID {
        return Err(DefinitionError::DeviceIdOutOfRange {
            id: doc.device_id,
            origin: origin.to_string(),
        });
    }

    let mut device = DeviceSchema::new(doc.device_id, doc.device_name.clone(), doc.version);

    for class_def in doc.classes {
        if device.has_class(&class_def.name, class_def.id) {
            return Err(DefinitionError::DuplicateClass {
                device: doc.device_name,
                name: class_def.name,
                id: class_def.id,
            });
        }
        let class = build_class(&device, class_def)?;
        device.insert_class(class);
    }

    debug!(origin, device = %device.name, "parsed definition document");
    Ok(device)
}

fn build_class(device: &DeviceSchema, def: ClassDef) -> Result<ClassDescriptor> {
    let mut class = ClassDescriptor::new(def.id, def.name.clone());

    for command_def in def.commands {
        if class.has_command(&command_def.name, command_def.id) {
            return Err(DefinitionError::DuplicateMessage {
                class: def.name,
                kind: "command",
                name: command_def.name,
                id: command_def.id,
            });
        }

        let command = Arc::new(build_message(
            MessageKind::Command,
            device,
            &def.name,
            def.id,
            command_def.id,
            &command_def.name,
            command_def.params,
        )?);
        let response = if command_def.no_response {
            None
        } else {
            Some(Arc::new(build_message(
                MessageKind::Response,
                device,
                &def.name,
                def.id,
                command_def.id,
                &command_def.name,
                command_def.returns,
            )?))
        };
        class.insert_command(CommandEntry { command, response });
    }

    for event_def in def.events {
        if class.has_event(&event_def.name, event_def.id) {
            return Err(DefinitionError::DuplicateMessage {
                class: def.name,
                kind: "event",
                name: event_def.name,
                id: event_def.id,
            });
        }

        let event = Arc::new(build_message(
            MessageKind::Event,
            device,
            &def.name,
            def.id,
            event_def.id,
            &event_def.name,
            event_def.params,
        )?);
        class.insert_event(event);
    }

    Ok(class)
}

#[allow(clippy::too_many_arguments)]
fn build_message(
    kind: MessageKind,
    device: &DeviceSchema,
    class_name: &str,
    class_id: u8,
    id: u8,
    name: &str,
    field_defs: Vec<FieldDef>,
) -> Result<MessageDescriptor> {
    let message_name = format!("{class_name}.{name}");
    let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(field_defs.len());

    for field_def in field_defs {
        if fields.iter().any(|f| f.name == field_def.name) {
            return Err(DefinitionError::DuplicateField {
                message: message_name,
                field: field_def.name,
            });
        }
        let kind = parse_field_type(&message_name, &field_def)?;
        fields.push(FieldDescriptor::new(field_def.name, kind));
    }

    Ok(MessageDescriptor {
        kind,
        device_id: device.id,
        device_name: device.name.clone(),
        class_id,
        class_name: class_name.to_string(),
        id,
        name: name.to_string(),
        fields,
    })
}

fn parse_field_type(message: &str, def: &FieldDef) -> Result<FieldType> {
    let kind = match def.ty.as_str() {
        "uint8" => FieldType::Uint8,
        "int8" => FieldType::Int8,
        "uint16" => FieldType::Uint16,
        "int16" => FieldType::Int16,
        "uint32" => FieldType::Uint32,
        "int32" => FieldType::Int32,
        "uint64" => FieldType::Uint64,
        "int64" => FieldType::Int64,
        "errorcode" => FieldType::ErrorCode,
        "enum8" => FieldType::Enum8,
        "enum16" => FieldType::Enum16,
        "enum32" => FieldType::Enum32,
        "uuid_128" | "aes_key_128" => FieldType::Uuid128,
        "uint8array" => FieldType::Array8,
        "uint16array" => FieldType::Array16,
        "string" => FieldType::String8,
        "byte_array" => match def.length {
            Some(len) if len > 0 => FieldType::ByteArray(len),
            _ => {
                return Err(DefinitionError::MissingLength {
                    message: message.to_string(),
                    field: def.name.clone(),
                })
            }
        },
        other => {
            return Err(DefinitionError::UnknownType {
                message: message.to_string(),
                field: def.name.clone(),
                ty: other.to_string(),
            })
        }
    };
    Ok(kind)
}
