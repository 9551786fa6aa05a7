use std::time::Duration;

use bytes::Bytes;

use crate::header::{Frame, FrameHeader, HEADER_SIZE, MAX_WIRE_PAYLOAD};

/// Tunables for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest payload this side will accept. Never above the wire limit.
    pub max_payload: usize,
    /// Read timeout applied to the underlying stream, if any.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the underlying stream, if any.
    pub write_timeout: Option<Duration>,
    /// Bytes the reader may discard while hunting for a frame boundary
    /// before giving up on the stream.
    pub max_resync_skips: usize,
    /// Device ids considered valid on this link. A first header byte naming
    /// any other device cannot start a frame. `None` disables the check
    /// (every 4-bit id is accepted).
    pub devices: Option<Vec<u8>>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload: MAX_WIRE_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
            max_resync_skips: 4096,
            devices: None,
        }
    }
}

impl FrameConfig {
    pub fn with_devices(mut self, devices: Vec<u8>) -> Self {
        self.devices = Some(devices);
        self
    }

    fn device_known(&self, id: u8) -> bool {
        match &self.devices {
            Some(devices) => devices.contains(&id),
            None => true,
        }
    }
}

/// Why a buffered byte was rejected as a frame start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The device id bits name a device not present on this link.
    UnknownDevice(u8),
    /// The header declares a payload above the configured maximum.
    FrameTooLarge { size: usize, max: usize },
}

/// Outcome of scanning the buffer head for a frame.
#[derive(Debug)]
pub enum Scan {
    /// A complete frame starts at the buffer head.
    Frame(Frame),
    /// The head looks plausible but the frame is not fully buffered yet.
    NeedMore,
    /// The head byte cannot start a frame. The caller discards one byte and
    /// rescans.
    Skip(SkipReason),
}

/// Scan the head of `buf` for a complete frame. Does not consume input;
/// on `Scan::Frame` the caller advances by `frame.wire_size()`, on
/// `Scan::Skip` by exactly one byte.
pub fn scan_frame(buf: &[u8], config: &FrameConfig) -> Scan {
    if buf.is_empty() {
        return Scan::NeedMore;
    }

    let device_id = FrameHeader::peek_device_id(buf[0]);
    if !config.device_known(device_id) {
        return Scan::Skip(SkipReason::UnknownDevice(device_id));
    }

    if buf.len() < HEADER_SIZE {
        return Scan::NeedMore;
    }

    let header = FrameHeader::parse([buf[0], buf[1], buf[2], buf[3]]);
    if header.payload_len > config.max_payload {
        return Scan::Skip(SkipReason::FrameTooLarge {
            size: header.payload_len,
            max: config.max_payload,
        });
    }

    let total = HEADER_SIZE + header.payload_len;
    if buf.len() < total {
        return Scan::NeedMore;
    }

    let payload = Bytes::copy_from_slice(&buf[HEADER_SIZE..total]);
    Scan::Frame(Frame::new(header, payload))
}
