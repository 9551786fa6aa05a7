/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds what the header length field (or configuration)
    /// allows.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Device ids occupy 4 bits of the header.
    #[error("device id {0} out of range (0..=15)")]
    DeviceIdOutOfRange(u8),

    /// The resynchronization bound was exhausted without finding a valid
    /// header. Escalated by the dispatch engine to a transport failure.
    #[error("stream desynchronized ({skipped} bytes discarded without a valid frame)")]
    Desync { skipped: usize },

    /// The read timed out before a complete frame arrived. Buffered bytes
    /// are retained; the next read resumes mid-frame.
    #[error("frame read timed out")]
    TimedOut,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
