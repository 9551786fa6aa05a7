use std::collections::HashMap;
use std::sync::Arc;

use crate::field::FieldDescriptor;

/// Which direction/role a message descriptor plays on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Response,
    Event,
}

impl MessageKind {
    /// The short tag used in qualified message names (`cmd`, `rsp`, `evt`).
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::Command => "cmd",
            MessageKind::Response => "rsp",
            MessageKind::Event => "evt",
        }
    }
}

/// Full identity and field layout of one command, response, or event.
///
/// Shared behind `Arc`: the schema owns one copy and decoded values keep a
/// reference to the descriptor they were decoded against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    pub kind: MessageKind,
    pub device_id: u8,
    pub device_name: String,
    pub class_id: u8,
    pub class_name: String,
    pub id: u8,
    pub name: String,
    /// Wire order is the order of this list and is fixed at load time.
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// `<device>_<cmd|rsp|evt>_<class>_<name>`, e.g. `bt_rsp_system_hello`.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.device_name,
            self.kind.tag(),
            self.class_name,
            self.name
        )
    }

    /// Ordinal of the named field, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A command paired with its response layout.
///
/// The pairing is by (device, class, message) id: the peer answers a command
/// with a response frame carrying the same identifiers. Fire-and-forget
/// commands have no response descriptor.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub command: Arc<MessageDescriptor>,
    pub response: Option<Arc<MessageDescriptor>>,
}

/// One message class: a numeric id, a name, and its commands and events.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub id: u8,
    pub name: String,
    commands_by_id: HashMap<u8, CommandEntry>,
    commands_by_name: HashMap<String, u8>,
    events_by_id: HashMap<u8, Arc<MessageDescriptor>>,
    events_by_name: HashMap<String, u8>,
}

impl ClassDescriptor {
    pub(crate) fn new(id: u8, name: String) -> Self {
        Self {
            id,
            name,
            commands_by_id: HashMap::new(),
            commands_by_name: HashMap::new(),
            events_by_id: HashMap::new(),
            events_by_name: HashMap::new(),
        }
    }

    pub(crate) fn insert_command(&mut self, entry: CommandEntry) {
        let id = entry.command.id;
        self.commands_by_name.insert(entry.command.name.clone(), id);
        self.commands_by_id.insert(id, entry);
    }

    pub(crate) fn insert_event(&mut self, event: Arc<MessageDescriptor>) {
        self.events_by_name.insert(event.name.clone(), event.id);
        self.events_by_id.insert(event.id, event);
    }

    pub(crate) fn has_command(&self, name: &str, id: u8) -> bool {
        self.commands_by_name.contains_key(name) || self.commands_by_id.contains_key(&id)
    }

    pub(crate) fn has_event(&self, name: &str, id: u8) -> bool {
        self.events_by_name.contains_key(name) || self.events_by_id.contains_key(&id)
    }

    /// Look up a command by name.
    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands_by_name
            .get(name)
            .and_then(|id| self.commands_by_id.get(id))
    }

    /// Look up a command by message id.
    pub fn command_by_id(&self, id: u8) -> Option<&CommandEntry> {
        self.commands_by_id.get(&id)
    }

    /// Look up an event by name.
    pub fn event(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.events_by_name
            .get(name)
            .and_then(|id| self.events_by_id.get(id))
    }

    /// Look up an event by message id.
    pub fn event_by_id(&self, id: u8) -> Option<&Arc<MessageDescriptor>> {
        self.events_by_id.get(&id)
    }

    /// Commands sorted by message id.
    pub fn commands(&self) -> Vec<&CommandEntry> {
        let mut entries: Vec<&CommandEntry> = self.commands_by_id.values().collect();
        entries.sort_by_key(|e| e.command.id);
        entries
    }

    /// Events sorted by message id.
    pub fn events(&self) -> Vec<&Arc<MessageDescriptor>> {
        let mut events: Vec<&Arc<MessageDescriptor>> = self.events_by_id.values().collect();
        events.sort_by_key(|e| e.id);
        events
    }
}

/// All classes of one device, plus its declared API version token.
#[derive(Debug, Clone)]
pub struct DeviceSchema {
    pub id: u8,
    pub name: String,
    pub version: Option<String>,
    classes_by_id: HashMap<u8, ClassDescriptor>,
    classes_by_name: HashMap<String, u8>,
}

impl DeviceSchema {
    pub(crate) fn new(id: u8, name: String, version: Option<String>) -> Self {
        Self {
            id,
            name,
            version,
            classes_by_id: HashMap::new(),
            classes_by_name: HashMap::new(),
        }
    }

    pub(crate) fn insert_class(&mut self, class: ClassDescriptor) {
        self.classes_by_name.insert(class.name.clone(), class.id);
        self.classes_by_id.insert(class.id, class);
    }

    pub(crate) fn has_class(&self, name: &str, id: u8) -> bool {
        self.classes_by_name.contains_key(name) || self.classes_by_id.contains_key(&id)
    }

    /// Look up a class by name.
    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes_by_name
            .get(name)
            .and_then(|id| self.classes_by_id.get(id))
    }

    /// Look up a class by id.
    pub fn class_by_id(&self, id: u8) -> Option<&ClassDescriptor> {
        self.classes_by_id.get(&id)
    }

    /// Classes sorted by id.
    pub fn classes(&self) -> Vec<&ClassDescriptor> {
        let mut classes: Vec<&ClassDescriptor> = self.classes_by_id.values().collect();
        classes.sort_by_key(|c| c.id);
        classes
    }
}
