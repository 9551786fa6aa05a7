use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use xapilink_transport::LinkStream;

use crate::error::{FrameError, Result};
use crate::header::{encode_frame, Frame, FrameHeader, FrameType};
use crate::reader::transport_to_frame_error;
use crate::scan::FrameConfig;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(
            frame.header.frame_type,
            frame.header.device_id,
            frame.header.class_id,
            frame.header.message_id,
            frame.payload.as_ref(),
        )
    }

    /// Frame and send a payload (blocking).
    pub fn send(
        &mut self,
        frame_type: FrameType,
        device_id: u8,
        class_id: u8,
        message_id: u8,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() > self.config.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload,
            });
        }

        let header = FrameHeader::new(frame_type, device_id, class_id, message_id, payload.len());
        self.buf.clear();
        encode_frame(&header, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<LinkStream> {
    /// Create a frame writer for `LinkStream` and apply the write timeout
    /// from config.
    pub fn with_config_stream(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::scan::{scan_frame, Scan};

    fn decode_one(bytes: &[u8]) -> Frame {
        match scan_frame(bytes, &FrameConfig::default()) {
            Scan::Frame(frame) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(FrameType::Command, 1, 4, 1, b"hello").unwrap();

        let bytes = writer.into_inner().into_inner();
        let frame = decode_one(&bytes);
        assert_eq!(frame.header.frame_type, FrameType::Command);
        assert_eq!(frame.header.device_id, 1);
        assert_eq!(frame.header.class_id, 4);
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(FrameType::Command, 0, 1, 0, b"one").unwrap();
        writer.send(FrameType::Event, 0, 2, 9, b"two").unwrap();

        let bytes = writer.into_inner().into_inner();
        let f1 = decode_one(&bytes);
        let f2 = decode_one(&bytes[f1.wire_size()..]);

        assert_eq!(f1.payload.as_ref(), b"one");
        assert_eq!(f2.header.frame_type, FrameType::Event);
        assert_eq!(f2.header.message_id, 9);
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer
            .send(FrameType::Command, 0, 1, 0, b"oversized")
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn device_id_out_of_range_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer
            .send(FrameType::Command, 16, 1, 0, b"")
            .unwrap_err();
        assert!(matches!(err, FrameError::DeviceIdOutOfRange(16)));
    }

    #[test]
    fn write_frame_method() {
        let header = FrameHeader::new(FrameType::Event, 2, 7, 3, 3);
        let frame = Frame::new(header, &b"abc"[..]);

        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame).unwrap();

        let bytes = writer.into_inner().into_inner();
        let decoded = decode_one(&bytes);
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload.as_ref(), b"abc");
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(FrameType::Command, 0, 1, 0, b"retry").unwrap();

        let inner = writer.into_inner();
        assert!(!inner.data.is_empty());
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(OneBytePerWrite { data: Vec::new() });
        writer.send(FrameType::Command, 0, 1, 0, b"chunked").unwrap();

        let inner = writer.into_inner();
        let frame = decode_one(&inner.data);
        assert_eq!(frame.payload.as_ref(), b"chunked");
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(FrameType::Command, 0, 1, 0, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct OneBytePerWrite {
        data: Vec<u8>,
    }

    impl Write for OneBytePerWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
