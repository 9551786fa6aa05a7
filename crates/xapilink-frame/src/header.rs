use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: type/device/length (2) + class id (1) + message id (1).
pub const HEADER_SIZE: usize = 4;

/// The header length field is 11 bits wide.
pub const MAX_WIRE_PAYLOAD: usize = 0x7FF;

const TYPE_BIT: u8 = 0x80;
const DEVICE_MASK: u8 = 0x78;
const DEVICE_SHIFT: u8 = 3;
const LEN_HIGH_MASK: u8 = 0x07;

/// Direction-independent frame type flag.
///
/// `Command` marks the command/response channel (host-to-device frames are
/// commands, device-to-host frames are responses); `Event` marks unsolicited
/// device notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Command,
    Event,
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub device_id: u8,
    pub class_id: u8,
    pub message_id: u8,
    pub payload_len: usize,
}

impl FrameHeader {
    pub fn new(
        frame_type: FrameType,
        device_id: u8,
        class_id: u8,
        message_id: u8,
        payload_len: usize,
    ) -> Self {
        Self {
            frame_type,
            device_id,
            class_id,
            message_id,
            payload_len,
        }
    }

    /// Device id encoded in the first header byte, without full parsing.
    ///
    /// Used for resynchronization: an unknown device id means the byte
    /// cannot start a frame.
    pub fn peek_device_id(first_byte: u8) -> u8 {
        (first_byte & DEVICE_MASK) >> DEVICE_SHIFT
    }

    /// Parse a wire header.
    pub fn parse(raw: [u8; HEADER_SIZE]) -> Self {
        let frame_type = if raw[0] & TYPE_BIT != 0 {
            FrameType::Event
        } else {
            FrameType::Command
        };
        Self {
            frame_type,
            device_id: Self::peek_device_id(raw[0]),
            class_id: raw[2],
            message_id: raw[3],
            payload_len: (((raw[0] & LEN_HIGH_MASK) as usize) << 8) | raw[1] as usize,
        }
    }

    /// Encode to the wire layout. Fails if the device id or payload length
    /// does not fit the header's bit budget.
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        if self.device_id > 15 {
            return Err(FrameError::DeviceIdOutOfRange(self.device_id));
        }
        if self.payload_len > MAX_WIRE_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: self.payload_len,
                max: MAX_WIRE_PAYLOAD,
            });
        }
        let type_bit = match self.frame_type {
            FrameType::Command => 0,
            FrameType::Event => TYPE_BIT,
        };
        Ok([
            type_bit | (self.device_id << DEVICE_SHIFT) | ((self.payload_len >> 8) as u8),
            (self.payload_len & 0xFF) as u8,
            self.class_id,
            self.message_id,
        ])
    }
}

/// A complete wire frame. Ephemeral: exists only between the framer and the
/// codec.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
pub fn encode_frame(header: &FrameHeader, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() != header.payload_len {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: header.payload_len,
        });
    }
    let raw = header.encode()?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&raw);
    dst.put_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FrameHeader::new(FrameType::Event, 5, 0x20, 0x01, 0x123);
        let raw = header.encode().unwrap();
        assert_eq!(FrameHeader::parse(raw), header);
    }

    #[test]
    fn bit_layout_matches_the_wire() {
        // command, device 0, class 1, message 0, empty payload: BGAPI hello
        let header = FrameHeader::new(FrameType::Command, 0, 1, 0, 0);
        assert_eq!(header.encode().unwrap(), [0x00, 0x00, 0x01, 0x00]);

        // event bit set, device 2, 0x1FF payload bytes
        let header = FrameHeader::new(FrameType::Event, 2, 0xAA, 0xBB, 0x1FF);
        assert_eq!(header.encode().unwrap(), [0x80 | 0x10 | 0x01, 0xFF, 0xAA, 0xBB]);
    }

    #[test]
    fn peek_device_id_reads_bits_6_to_3() {
        assert_eq!(FrameHeader::peek_device_id(0x78), 15);
        assert_eq!(FrameHeader::peek_device_id(0x80), 0);
        assert_eq!(FrameHeader::peek_device_id(0x08), 1);
    }

    #[test]
    fn rejects_oversized_length() {
        let header = FrameHeader::new(FrameType::Command, 0, 0, 0, MAX_WIRE_PAYLOAD + 1);
        assert!(matches!(
            header.encode(),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_device() {
        let header = FrameHeader::new(FrameType::Command, 16, 0, 0, 0);
        assert!(matches!(
            header.encode(),
            Err(FrameError::DeviceIdOutOfRange(16))
        ));
    }

    #[test]
    fn encode_frame_checks_payload_consistency() {
        let header = FrameHeader::new(FrameType::Command, 0, 1, 0, 2);
        let mut dst = BytesMut::new();
        assert!(encode_frame(&header, b"xy", &mut dst).is_ok());
        assert_eq!(dst.len(), HEADER_SIZE + 2);

        let mut dst = BytesMut::new();
        assert!(encode_frame(&header, b"xyz", &mut dst).is_err());
    }
}
