use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// TCP transport for network-attached devices and protocol bridges.
///
/// Many BGAPI-capable devices are reachable through a TCP bridge (a serial
/// server or an emulator); this is the connector for those, and the listener
/// side doubles as the harness for simulated devices.
pub struct TcpTransport {
    listener: TcpListener,
    addr: String,
}

impl TcpTransport {
    /// Bind and listen on a TCP address.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        let target = addr.to_string();
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            addr: target.clone(),
            source: e,
        })?;
        info!(addr = %target, "listening on tcp socket");
        Ok(Self {
            listener,
            addr: target,
        })
    }

    /// The local address this transport is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }

    /// The address string this transport was bound with.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<LinkStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        stream.set_nodelay(true).map_err(TransportError::Accept)?;
        Ok(LinkStream::from_tcp(stream))
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<LinkStream> {
        let target = addr.to_string();
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::Connect {
            addr: target.clone(),
            source: e,
        })?;
        Self::finish_connect(stream, target)
    }

    /// Connect with an upper bound on connection establishment time.
    pub fn connect_timeout(addr: impl ToSocketAddrs + std::fmt::Display, timeout: Duration) -> Result<LinkStream> {
        let target = addr.to_string();
        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to no candidates",
        );
        let candidates = addr.to_socket_addrs().map_err(|e| TransportError::Connect {
            addr: target.clone(),
            source: e,
        })?;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => return Self::finish_connect(stream, target),
                Err(e) => last_err = e,
            }
        }
        Err(TransportError::Connect {
            addr: target,
            source: last_err,
        })
    }

    fn finish_connect(stream: TcpStream, addr: String) -> Result<LinkStream> {
        stream.set_nodelay(true).map_err(|e| TransportError::Connect {
            addr: addr.clone(),
            source: e,
        })?;
        debug!(%addr, "connected to tcp endpoint");
        Ok(LinkStream::from_tcp(stream))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use super::*;

    #[test]
    fn bind_accept_connect_roundtrip() {
        let transport = TcpTransport::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = transport.local_addr().expect("local addr should resolve");

        let server = thread::spawn(move || {
            let mut stream = transport.accept().expect("accept should succeed");
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).expect("read should succeed");
            stream.write_all(&buf).expect("echo should succeed");
        });

        let mut client = TcpTransport::connect(addr).expect("connect should succeed");
        client.write_all(b"hello").expect("write should succeed");
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).expect("read should succeed");
        assert_eq!(&buf, b"hello");

        server.join().expect("server thread should complete");
    }

    #[test]
    fn connect_to_closed_port_fails_with_context() {
        let transport = TcpTransport::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = transport.local_addr().expect("local addr should resolve");
        drop(transport);

        let err = TcpTransport::connect_timeout(addr, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.to_string().contains("failed to connect"));
    }
}
