//! Command/response dispatch and event delivery over a device link.
//!
//! This is the "just works" layer. Open a [`Link`] over a connected stream,
//! call commands by name with typed arguments, and drain unsolicited events
//! from the queue (or have them delivered to a handler).
//!
//! The protocol is half-duplex on the command channel: at most one command
//! is outstanding per link, enforced by an internal gate. Events arrive at
//! any time and never block command traffic.

pub mod error;
pub mod events;
pub mod facade;
pub mod link;

pub use error::{HostError, Result};
pub use events::EventStream;
pub use facade::{ClassHandle, DeviceHandle};
pub use link::{EventMode, Link, LinkConfig};
