use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::warn;
use xapilink_transport::LinkStream;

use crate::error::{FrameError, Result};
use crate::header::Frame;
use crate::scan::{scan_frame, FrameConfig, Scan, SkipReason};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete frames.
/// Bytes that cannot start a frame are discarded one at a time until a
/// plausible header is found again; the discard count is bounded by
/// `FrameConfig::max_resync_skips`, after which the stream is declared
/// desynchronized.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    /// Bytes discarded since the last good frame.
    resync_run: usize,
    /// Bytes discarded over the reader's lifetime.
    skipped_total: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            resync_run: 0,
            skipped_total: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::TimedOut)` when the underlying stream has a
    /// read timeout and it fires; buffered bytes are retained, so the next
    /// call resumes mid-frame. Returns `Err(FrameError::ConnectionClosed)`
    /// on EOF and `Err(FrameError::Desync)` when the resynchronization
    /// bound is exhausted.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.scan_buffer()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock
                        || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(FrameError::TimedOut)
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Scan buffered bytes for a frame, discarding junk as needed.
    fn scan_buffer(&mut self) -> Result<Option<Frame>> {
        loop {
            match scan_frame(&self.buf, &self.config) {
                Scan::Frame(frame) => {
                    self.buf.advance(frame.wire_size());
                    if self.resync_run > 0 {
                        warn!(
                            skipped = self.resync_run,
                            device_id = frame.header.device_id,
                            "resynchronized after discarding bytes"
                        );
                        self.resync_run = 0;
                    }
                    return Ok(Some(frame));
                }
                Scan::NeedMore => return Ok(None),
                Scan::Skip(reason) => {
                    self.buf.advance(1);
                    self.resync_run += 1;
                    self.skipped_total += 1;
                    if let SkipReason::FrameTooLarge { size, max } = reason {
                        warn!(size, max, "discarding header declaring oversized frame");
                    }
                    if self.resync_run > self.config.max_resync_skips {
                        return Err(FrameError::Desync {
                            skipped: self.resync_run,
                        });
                    }
                }
            }
        }
    }

    /// Total bytes discarded during resynchronization since creation.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_total
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LinkStream> {
    /// Create a frame reader for `LinkStream` and apply the read timeout
    /// from config.
    pub fn with_config_stream(inner: LinkStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: xapilink_transport::TransportError) -> FrameError {
    match err {
        xapilink_transport::TransportError::Io(io)
        | xapilink_transport::TransportError::Accept(io) => FrameError::Io(io),
        xapilink_transport::TransportError::Bind { source, .. }
        | xapilink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
