//! BGAPI-style wire framing with corruption recovery.
//!
//! Every message on the wire is a 4-byte header followed by the payload:
//! - Byte 0: type bit (command/response vs event), 4-bit device id, and the
//!   top 3 bits of the payload length
//! - Byte 1: low 8 bits of the payload length (max payload 2047 bytes)
//! - Byte 2: class id
//! - Byte 3: message id
//!
//! The reader tolerates line noise: bytes that cannot start a plausible
//! header are discarded one at a time (and counted) until a valid frame
//! boundary is found again.

pub mod error;
pub mod header;
pub mod reader;
pub mod scan;
pub mod writer;

pub use error::{FrameError, Result};
pub use header::{Frame, FrameHeader, FrameType, HEADER_SIZE, MAX_WIRE_PAYLOAD};
pub use reader::FrameReader;
pub use scan::{scan_frame, FrameConfig, Scan, SkipReason};
pub use writer::FrameWriter;
