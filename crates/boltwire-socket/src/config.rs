//! Connection configuration.
//!
//! Provides the parameters for opening a socket connection: address,
//! timeouts, proposed protocol versions and the logging provider.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use boltwire_core::{Logging, TracingLogging};

/// Default server port.
pub const DEFAULT_PORT: u16 = 7687;

/// Versions proposed during the handshake when none are configured.
pub const DEFAULT_PROTOCOL_VERSIONS: [u32; 4] = [1, 0, 0, 0];

/// Socket connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Hostname or IP address
    pub host: String,
    /// Port number (default: 7687)
    pub port: u16,
    /// Client identity sent with INIT
    pub user_agent: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Read/write timeout on the established socket; `None` blocks forever
    pub network_timeout: Option<Duration>,
    /// Protocol versions proposed during the handshake, in preference order
    pub protocol_versions: [u32; 4],
    /// Logger provider
    pub logging: Arc<dyn Logging>,
    /// Use legacy notification-filter key names in transaction metadata
    pub legacy_notifications: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("network_timeout", &self.network_timeout)
            .field("protocol_versions", &self.protocol_versions)
            .field("legacy_notifications", &self.legacy_notifications)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user_agent: format!("boltwire/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(30),
            network_timeout: None,
            protocol_versions: DEFAULT_PROTOCOL_VERSIONS,
            logging: Arc::new(TracingLogging),
            legacy_notifications: true,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client identity.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the network read/write timeout.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Set the proposed protocol versions.
    pub fn protocol_versions(mut self, versions: [u32; 4]) -> Self {
        self.protocol_versions = versions;
        self
    }

    /// Set the logging provider.
    pub fn logging(mut self, logging: Arc<dyn Logging>) -> Self {
        self.logging = logging;
        self
    }

    /// Choose legacy or current notification-filter key names.
    pub fn legacy_notifications(mut self, legacy: bool) -> Self {
        self.legacy_notifications = legacy;
        self
    }

    /// Get the socket address string for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
