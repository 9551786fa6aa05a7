use std::time::Duration;

use xapilink_codec::DecodedValue;

/// Errors that can occur while driving a device link.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xapilink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xapilink_frame::FrameError),

    /// Arguments did not match the command's parameter list.
    #[error("invalid arguments: {0}")]
    Argument(#[from] xapilink_codec::ArgumentError),

    /// The named device is not in the loaded definitions.
    #[error("unknown device {0:?}")]
    UnknownDevice(String),

    /// The named class is not in the device's definition.
    #[error("unknown class {class:?} on device {device:?}")]
    UnknownClass { device: String, class: String },

    /// The named command is not in the class's definition.
    #[error("unknown command {command:?} in {device}.{class}")]
    UnknownCommand {
        device: String,
        class: String,
        command: String,
    },

    /// The device answered with a non-zero result code.
    #[error("{command} failed with result code 0x{code:04x}")]
    CommandFailed {
        code: u16,
        command: String,
        response: DecodedValue,
    },

    /// No response arrived within the deadline. The link returns to idle;
    /// a response arriving later is discarded.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The link is closed. Set after a transport failure or an explicit
    /// close; every subsequent call fails the same way.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, HostError>;
