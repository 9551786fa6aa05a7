use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DefinitionError, Result};
use crate::loader;
use crate::model::{CommandEntry, DeviceSchema, MessageDescriptor};

/// Immutable registry of loaded protocol definitions, keyed by device.
///
/// Built once at load time and shared read-only (typically via `Arc`) by the
/// codec, the framer configuration, and the dispatch engine.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    devices_by_id: HashMap<u8, DeviceSchema>,
    devices_by_name: HashMap<String, u8>,
}

impl Schema {
    /// Start an incremental build over several definition sources.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema::default(),
        }
    }

    /// Build a schema from in-memory definition documents.
    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let mut builder = Self::builder();
        for source in sources {
            builder = builder.source(source.as_ref())?;
        }
        builder.build()
    }

    /// Build a schema from definition files.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut builder = Self::builder();
        for path in paths {
            builder = builder.file(path.as_ref())?;
        }
        builder.build()
    }

    /// Look up a device by name.
    pub fn device(&self, name: &str) -> Option<&DeviceSchema> {
        self.devices_by_name
            .get(name)
            .and_then(|id| self.devices_by_id.get(id))
    }

    /// Look up a device by id.
    pub fn device_by_id(&self, id: u8) -> Option<&DeviceSchema> {
        self.devices_by_id.get(&id)
    }

    /// All loaded device ids, sorted. Feeds header plausibility in the framer.
    pub fn device_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.devices_by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Devices sorted by id.
    pub fn devices(&self) -> Vec<&DeviceSchema> {
        let mut devices: Vec<&DeviceSchema> = self.devices_by_id.values().collect();
        devices.sort_by_key(|d| d.id);
        devices
    }

    /// Look up a command entry by device, class, and command name.
    pub fn command(&self, device: &str, class: &str, command: &str) -> Option<&CommandEntry> {
        self.device(device)?.class(class)?.command(command)
    }

    /// Response descriptor for a (device, class, message) id triple.
    ///
    /// This is the correlation lookup the reader loop performs for every
    /// response frame.
    pub fn response_for(
        &self,
        device_id: u8,
        class_id: u8,
        message_id: u8,
    ) -> Option<&Arc<MessageDescriptor>> {
        self.devices_by_id
            .get(&device_id)?
            .class_by_id(class_id)?
            .command_by_id(message_id)?
            .response
            .as_ref()
    }

    /// Event descriptor for a (device, class, message) id triple.
    pub fn event_for(
        &self,
        device_id: u8,
        class_id: u8,
        message_id: u8,
    ) -> Option<&Arc<MessageDescriptor>> {
        self.devices_by_id
            .get(&device_id)?
            .class_by_id(class_id)?
            .event_by_id(message_id)
    }

    /// Declared API version token of a device, if any.
    pub fn version(&self, device: &str) -> Option<&str> {
        self.device(device)?.version.as_deref()
    }

    fn merge(&mut self, device: DeviceSchema) -> Result<()> {
        if self.devices_by_id.contains_key(&device.id)
            || self.devices_by_name.contains_key(&device.name)
        {
            return Err(DefinitionError::DuplicateDevice {
                name: device.name,
                id: device.id,
            });
        }
        debug!(
            device = %device.name,
            id = device.id,
            classes = device.classes().len(),
            "loaded device definition"
        );
        self.devices_by_name.insert(device.name.clone(), device.id);
        self.devices_by_id.insert(device.id, device);
        Ok(())
    }
}

/// Incremental schema builder over multiple definition sources.
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Add a definition document from an in-memory string.
    pub fn source(mut self, json: &str) -> Result<Self> {
        let device = loader::parse_definition("<inline>", json)?;
        self.schema.merge(device)?;
        Ok(self)
    }

    /// Add a definition document from a file.
    pub fn file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DefinitionError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let device = loader::parse_definition(&path.display().to_string(), &content)?;
        self.schema.merge(device)?;
        Ok(self)
    }

    /// Finish the build. Fails if no device was loaded.
    pub fn build(self) -> Result<Schema> {
        if self.schema.devices_by_id.is_empty() {
            return Err(DefinitionError::Empty);
        }
        Ok(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::model::MessageKind;

    const BT_DEFINITION: &str = r#"{
        "device_id": 0,
        "device_name": "bt",
        "version": "3.2.1",
        "classes": [
            {
                "name": "system",
                "id": 1,
                "commands": [
                    {
                        "name": "hello",
                        "id": 0,
                        "params": [],
                        "returns": [ { "name": "result", "type": "errorcode" } ]
                    },
                    {
                        "name": "reset",
                        "id": 1,
                        "params": [ { "name": "dfu", "type": "uint8" } ],
                        "no_response": true
                    }
                ],
                "events": [
                    {
                        "name": "boot",
                        "id": 0,
                        "params": [
                            { "name": "major", "type": "uint16" },
                            { "name": "minor", "type": "uint16" }
                        ]
                    }
                ]
            }
        ]
    }"#;

    const WIFI_DEFINITION: &str = r#"{
        "device_id": 3,
        "device_name": "wifi",
        "classes": [
            { "name": "sme", "id": 2, "commands": [], "events": [] }
        ]
    }"#;

    #[test]
    fn loads_and_indexes_a_device() {
        let schema = Schema::from_sources(&[BT_DEFINITION]).expect("definition should load");

        assert_eq!(schema.device_ids(), vec![0]);
        let device = schema.device("bt").expect("device should resolve by name");
        assert_eq!(device.id, 0);
        assert_eq!(device.version.as_deref(), Some("3.2.1"));

        let class = device.class("system").expect("class should resolve");
        assert_eq!(class.id, 1);

        let hello = class.command("hello").expect("command should resolve");
        assert_eq!(hello.command.kind, MessageKind::Command);
        assert!(hello.command.fields.is_empty());
        let response = hello.response.as_ref().expect("hello has a response");
        assert_eq!(response.kind, MessageKind::Response);
        assert_eq!(response.fields[0].kind, FieldType::ErrorCode);
        assert_eq!(response.qualified_name(), "bt_rsp_system_hello");

        let reset = class.command("reset").expect("command should resolve");
        assert!(reset.response.is_none());

        let boot = class.event("boot").expect("event should resolve");
        assert_eq!(boot.kind, MessageKind::Event);
        assert_eq!(boot.field_index("minor"), Some(1));
    }

    #[test]
    fn correlation_lookups_by_id_triple() {
        let schema = Schema::from_sources(&[BT_DEFINITION]).unwrap();

        let response = schema.response_for(0, 1, 0).expect("response should resolve");
        assert_eq!(response.name, "hello");

        let event = schema.event_for(0, 1, 0).expect("event should resolve");
        assert_eq!(event.name, "boot");

        assert!(schema.response_for(0, 1, 9).is_none());
        assert!(schema.response_for(2, 1, 0).is_none());
        // Fire-and-forget commands have no response descriptor.
        assert!(schema.response_for(0, 1, 1).is_none());
    }

    #[test]
    fn merges_multiple_devices() {
        let schema =
            Schema::from_sources(&[BT_DEFINITION, WIFI_DEFINITION]).expect("both should load");
        assert_eq!(schema.device_ids(), vec![0, 3]);
        assert!(schema.device("wifi").is_some());
        assert_eq!(schema.version("wifi"), None);
    }

    #[test]
    fn rejects_duplicate_device() {
        let err = Schema::from_sources(&[BT_DEFINITION, BT_DEFINITION]).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateDevice { .. }));
    }

    #[test]
    fn empty_build_fails() {
        let err = Schema::builder().build().unwrap_err();
        assert!(matches!(err, DefinitionError::Empty));
    }

    #[test]
    fn file_loading_reports_path_context() {
        let err = Schema::from_files(&["/nonexistent/bt.json"]).unwrap_err();
        assert!(matches!(err, DefinitionError::ReadFailed { .. }));
        assert!(err.to_string().contains("/nonexistent/bt.json"));
    }
}
