//! Error types for boltwire operations.

use std::fmt;

/// The primary error type for all boltwire operations.
#[derive(Debug)]
pub enum Error {
    /// Connectivity errors (send, receive, timeout, closed)
    Connection(ConnectionError),
    /// Logical failure reported by the server for a completed request
    Server(ServerError),
    /// Protocol errors (handshake, unexpected responses)
    Protocol(ProtocolError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the connection or negotiate a protocol version
    Connect,
    /// Transmitting queued messages failed
    Send,
    /// The server did not reply within the network timeout
    ResponseTimeout,
    /// Any other failure while reading a response
    ResponseRead,
    /// The connection has been closed
    Closed,
}

/// A failure the server reported in response to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    pub message: String,
    pub classification: ServerErrorClassification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorClassification {
    /// The request was invalid; retrying it unchanged will fail again
    Client,
    /// Temporary condition; the request may succeed if retried
    Transient,
    /// The database itself failed
    Database,
    /// Code did not follow the `Neo.<Classification>.<Category>.<Title>` shape
    Unknown,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ServerError {
    /// Build a server error, deriving the classification from the status code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let classification = ServerErrorClassification::from_code(&code);
        Self {
            code,
            message: message.into(),
            classification,
        }
    }
}

impl ServerErrorClassification {
    /// Classify a status code by its second dotted segment.
    pub fn from_code(code: &str) -> Self {
        match code.split('.').nth(1) {
            Some("ClientError") => Self::Client,
            Some("TransientError") => Self::Transient,
            Some("DatabaseError") => Self::Database,
            _ => Self::Unknown,
        }
    }
}

impl Error {
    /// Is this a retryable error (transient server failure, connectivity, timeouts)?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Server(s) => s.classification == ServerErrorClassification::Transient,
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Send
                    | ConnectionErrorKind::ResponseTimeout
                    | ConnectionErrorKind::ResponseRead
            ),
            _ => false,
        }
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Protocol(_))
    }

    /// Did a receive exceed the network timeout?
    pub fn is_response_timeout(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::ResponseTimeout,
                ..
            })
        )
    }

    /// Connection error kind, if this is a connection error.
    pub fn connection_kind(&self) -> Option<ConnectionErrorKind> {
        match self {
            Error::Connection(c) => Some(c.kind),
            _ => None,
        }
    }

    /// Server status code, if the server reported this failure.
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Error::Server(s) => Some(&s.code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Server(e) => write!(f, "Server error ({}): {}", e.code, e.message),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Server(_) => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ServerError {}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Server(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

/// Result type alias for boltwire operations.
pub type Result<T> = std::result::Result<T, Error>;
