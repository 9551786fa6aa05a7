use std::io::{Read, Write};
use std::net::TcpStream;

use crate::error::Result;

/// A connected byte stream to a device — implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// Wraps a TCP socket or, on Unix, a Unix domain socket stream. The engine
/// never assumes more than blocking reads/writes with optional timeouts.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    /// Create a LinkStream from a TCP socket.
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: LinkStreamInner::Tcp(stream),
        }
    }

    /// Create a LinkStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    /// Wrap one end of a connected Unix socket pair.
    ///
    /// Used by simulated devices in tests and demos.
    #[cfg(unix)]
    pub fn from_unix_stream(stream: std::os::unix::net::UnixStream) -> Self {
        Self::from_unix(stream)
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            LinkStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            LinkStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    ///
    /// The dispatch engine uses this to split a link into an independently
    /// owned read side (reader thread) and write side (callers).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkStreamInner::Tcp(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_tcp(cloned))
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
        }
    }

    /// Shut down both directions of the stream.
    ///
    /// Unblocks any thread parked in a read on a clone of this stream.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            LinkStreamInner::Tcp(stream) => {
                stream.shutdown(std::net::Shutdown::Both).map_err(Into::into)
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => {
                stream.shutdown(std::net::Shutdown::Both).map_err(Into::into)
            }
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LinkStreamInner::Tcp(_) => f.debug_struct("LinkStream").field("type", &"tcp").finish(),
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => {
                f.debug_struct("LinkStream").field("type", &"unix").finish()
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn socketpair_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut a = LinkStream::from_unix_stream(left);
        let mut b = LinkStream::from_unix_stream(right);

        a.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn clone_shares_the_connection() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let a = LinkStream::from_unix_stream(left);
        let mut b = LinkStream::from_unix_stream(right);

        let mut writer = a.try_clone().unwrap();
        writer.write_all(b"x").unwrap();

        let mut buf = [0u8; 1];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn read_timeout_applies() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut a = LinkStream::from_unix_stream(left);
        let _b = LinkStream::from_unix_stream(right);

        a.set_read_timeout(Some(std::time::Duration::from_millis(20)))
            .unwrap();
        let mut buf = [0u8; 1];
        let err = a.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn shutdown_unblocks_reader() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let a = LinkStream::from_unix_stream(left);
        let _b = LinkStream::from_unix_stream(right);

        let mut reader = a.try_clone().unwrap();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        a.shutdown().unwrap();
        let result = handle.join().unwrap();
        // EOF (Ok(0)) or an error, but never a hang.
        assert!(matches!(result, Ok(0) | Err(_)));
    }
}
