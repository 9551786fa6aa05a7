//! Host-side engine for binary request/response/event device protocols.
//!
//! xapilink talks to firmware stacks that expose a BGAPI-style serial API:
//! commands flow host-to-device, each answered by exactly one response,
//! while events arrive unsolicited. The API surface is not hardcoded; it is
//! loaded at runtime from JSON definition documents.
//!
//! # Crate Structure
//!
//! - [`transport`] — Stream transports (TCP, Unix domain sockets)
//! - [`frame`] — 4-byte-header wire framing with corruption recovery
//! - [`schema`] — Runtime API definitions (devices, classes, messages)
//! - [`codec`] — Typed payload encoding and decoding
//! - [`host`] — Command dispatch and event delivery (behind `host` feature)

/// Re-export transport types.
pub mod transport {
    pub use xapilink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xapilink_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use xapilink_schema::*;
}

/// Re-export codec types.
pub mod codec {
    pub use xapilink_codec::*;
}

/// Re-export host types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use xapilink_host::*;
}
