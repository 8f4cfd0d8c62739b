//! Transport boundary and the TCP implementation.
//!
//! A [`Transport`] moves whole messages: it writes queued requests and feeds
//! decoded responses into a [`MessageHandler`]. How a message becomes bytes
//! is delegated to a [`MessageFormat`], which this crate does not define.
//!
//! [`SocketTransport`] opens a TCP connection and performs the version
//! handshake:
//!
//! ```text
//! C: 60 60 B0 17                      preamble
//! C: v1 v2 v3 v4                      four proposed versions, u32 big-endian
//! S: vv                               agreed version, 0 if none
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use boltwire_core::error::{ConnectionError, ConnectionErrorKind, ProtocolError};
use boltwire_core::{Error, Message};

use crate::config::ConnectionConfig;
use crate::handler::MessageHandler;

/// Handshake preamble identifying the protocol.
pub const PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Version reply meaning "none of the proposed versions".
pub const NO_PROTOCOL_VERSION: u32 = 0;

/// "HTTP" read as a big-endian u32: the peer is an HTTP server.
pub const HTTP: u32 = 0x4854_5450;

/// Moves messages to and from the server.
pub trait Transport {
    /// Open the underlying channel.
    fn start(&mut self) -> Result<(), Error>;

    /// Close the underlying channel. Must be idempotent.
    fn stop(&mut self);

    fn is_open(&self) -> bool;

    /// Write queued messages in order, removing each from `messages` once it
    /// has been written. Returns how many were written.
    ///
    /// On error the message being written stays at the front of `messages`,
    /// though some of its bytes may already have been sent.
    fn send_all(&mut self, messages: &mut VecDeque<Message>) -> io::Result<usize>;

    /// Read responses until `handler` has no requests waiting.
    /// Returns how many messages were read.
    fn receive_all(&mut self, handler: &mut dyn MessageHandler) -> io::Result<usize>;

    /// Read exactly one message.
    fn receive_one(&mut self, handler: &mut dyn MessageHandler) -> io::Result<()>;
}

/// Serialization of individual messages.
pub trait MessageFormat {
    /// Encode one request.
    fn write(&mut self, message: &Message, out: &mut dyn Write) -> io::Result<()>;

    /// Decode one response and dispatch it to `handler`.
    fn read(&mut self, input: &mut dyn Read, handler: &mut dyn MessageHandler) -> io::Result<()>;
}

/// TCP transport.
#[derive(Debug)]
pub struct SocketTransport<F> {
    address: String,
    connect_timeout: Duration,
    network_timeout: Option<Duration>,
    protocol_versions: [u32; 4],
    format: F,
    stream: Option<TcpStream>,
    protocol_version: Option<u32>,
    buffer: Vec<u8>,
}

impl<F: MessageFormat> SocketTransport<F> {
    pub fn new(config: &ConnectionConfig, format: F) -> Self {
        Self {
            address: config.socket_addr(),
            connect_timeout: config.connect_timeout,
            network_timeout: config.network_timeout,
            protocol_versions: config.protocol_versions,
            format,
            stream: None,
            protocol_version: None,
            buffer: Vec::new(),
        }
    }

    /// Version agreed during the handshake.
    pub fn protocol_version(&self) -> Option<u32> {
        self.protocol_version
    }

    fn connect(&self) -> Result<TcpStream, Error> {
        let addrs = self.address.to_socket_addrs().map_err(|e| {
            connect_error(
                format!("Unable to resolve {}: {}", self.address, e),
                Some(e),
            )
        })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        let message = match &last_error {
            Some(e) => format!("Unable to connect to {}: {}", self.address, e),
            None => format!("Unable to connect to {}: no addresses", self.address),
        };
        Err(connect_error(message, last_error))
    }

    fn handshake(&self, stream: &mut TcpStream) -> Result<u32, Error> {
        let mut request = Vec::with_capacity(20);
        request.extend_from_slice(&PREAMBLE);
        for version in self.protocol_versions {
            request.extend_from_slice(&version.to_be_bytes());
        }

        stream
            .write_all(&request)
            .and_then(|()| stream.flush())
            .map_err(|e| connect_error(format!("Failed to send handshake: {}", e), Some(e)))?;

        let mut reply = [0u8; 4];
        stream
            .read_exact(&mut reply)
            .map_err(|e| connect_error(format!("Failed to read handshake: {}", e), Some(e)))?;

        match u32::from_be_bytes(reply) {
            NO_PROTOCOL_VERSION => Err(connect_error(
                "The server does not support any of the protocol versions supported by this \
                 driver. Ensure that you are using driver and server versions that are \
                 compatible with one another.",
                None,
            )),
            HTTP => Err(connect_error(
                "Server responded HTTP. Make sure you are not trying to connect to the http \
                 endpoint (HTTP defaults to port 7474 whereas BOLT defaults to port 7687)",
                None,
            )),
            version if self.protocol_versions.contains(&version) => Ok(version),
            version => Err(Error::Protocol(ProtocolError {
                message: format!(
                    "Server negotiated protocol version {} which was not proposed",
                    version
                ),
                source: None,
            })),
        }
    }
}

impl<F: MessageFormat> Transport for SocketTransport<F> {
    fn start(&mut self) -> Result<(), Error> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mut stream = self.connect()?;
        stream.set_nodelay(true).ok();
        stream
            .set_read_timeout(self.network_timeout)
            .and_then(|()| stream.set_write_timeout(self.network_timeout))
            .map_err(|e| connect_error(format!("Failed to configure socket: {}", e), Some(e)))?;

        let version = self.handshake(&mut stream)?;
        tracing::debug!(address = %self.address, version, "Handshake complete");

        self.protocol_version = Some(version);
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            // Best effort - the peer may already be gone
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!(address = %self.address, "Socket closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn send_all(&mut self, messages: &mut VecDeque<Message>) -> io::Result<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let mut sent = 0;
        while let Some(message) = messages.front() {
            self.buffer.clear();
            self.format.write(message, &mut self.buffer)?;
            stream.write_all(&self.buffer)?;
            messages.pop_front();
            sent += 1;
        }
        stream.flush()?;
        Ok(sent)
    }

    fn receive_all(&mut self, handler: &mut dyn MessageHandler) -> io::Result<usize> {
        let mut received = 0;
        while handler.collectors_waiting() > 0 {
            self.receive_one(handler)?;
            received += 1;
        }
        Ok(received)
    }

    fn receive_one(&mut self, handler: &mut dyn MessageHandler) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        self.format.read(stream, handler)
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not open")
}

fn connect_error(message: impl Into<String>, source: Option<io::Error>) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: message.into(),
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    })
}
