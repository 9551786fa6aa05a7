use std::path::PathBuf;

/// Errors raised while loading or validating a protocol definition.
///
/// All of these are fatal to the load; a schema is either complete and
/// internally consistent or it is not built at all.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// The definition file could not be read.
    #[error("failed to read definition {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The definition document is not well-formed.
    #[error("malformed definition {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },

    /// Device ids share the header with the message type bit; only 0..=15 fit.
    #[error("device id {id} out of range (0..=15) in {origin}")]
    DeviceIdOutOfRange { id: u8, origin: String },

    /// The same device was declared by more than one definition source.
    #[error("device '{name}' (id {id}) defined more than once")]
    DuplicateDevice { name: String, id: u8 },

    /// Two classes within a device share an id or a name.
    #[error("duplicate class '{name}' (id {id}) in device '{device}'")]
    DuplicateClass {
        device: String,
        name: String,
        id: u8,
    },

    /// Two commands or events within a class share an id or a name.
    #[error("duplicate {kind} '{name}' (id {id}) in class '{class}'")]
    DuplicateMessage {
        class: String,
        kind: &'static str,
        name: String,
        id: u8,
    },

    /// Two fields within a message share a name.
    #[error("duplicate field '{field}' in message '{message}'")]
    DuplicateField { message: String, field: String },

    /// A field references a type the model does not define.
    #[error("unknown field type '{ty}' for field '{field}' in message '{message}'")]
    UnknownType {
        message: String,
        field: String,
        ty: String,
    },

    /// Fixed-size byte arrays must declare their length.
    #[error("field '{field}' in message '{message}' is a byte_array without a nonzero length")]
    MissingLength { message: String, field: String },

    /// The builder was asked to produce a schema with no devices.
    #[error("definition declares no devices")]
    Empty,
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
