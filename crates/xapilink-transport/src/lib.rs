//! Byte-stream transports for BGAPI-style device links.
//!
//! The engine only needs a blocking read/write byte stream with timeouts.
//! This crate provides a unified [`LinkStream`] over the supported
//! mechanisms:
//! - TCP sockets (network-attached devices, protocol bridges)
//! - Unix domain sockets (local device daemons, simulators)
//!
//! This is the lowest layer of xapilink. Everything else builds on top of
//! the [`LinkStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::LinkStream;
pub use tcp::TcpTransport;

#[cfg(unix)]
pub use uds::UnixSocketTransport;
