//! Pipelined socket connection for boltwire.
//!
//! `boltwire-socket` queues protocol messages locally, writes them to the
//! server in one batch and routes every response back to the collector that
//! was queued with its request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use boltwire_socket::{ConnectionConfig, RecordCollector, SocketConnection};
//!
//! let config = ConnectionConfig::new()
//!     .host("localhost")
//!     .network_timeout(std::time::Duration::from_secs(30));
//! let mut conn = SocketConnection::connect(&config, MyFormat::default())?;
//!
//! let records = RecordCollector::shared();
//! conn.init(config.user_agent.clone(), BTreeMap::new());
//! conn.run("RETURN 1 AS n", BTreeMap::new(), RecordCollector::shared());
//! conn.pull_all(records.clone());
//! conn.sync()?;
//! ```
//!
//! # Failure recovery
//!
//! After a FAILURE the server ignores every request until it sees RESET.
//! [`SocketConnection`] queues and sends that RESET itself before returning
//! the failure, and the failure is returned exactly once.

pub mod collector;
pub mod config;
pub mod connection;
pub mod handler;
pub mod transport;

pub use collector::{Collector, NoOpCollector, Outcome, RecordCollector};
pub use config::ConnectionConfig;
pub use connection::SocketConnection;
pub use handler::{MessageHandler, ResponseHandler};
pub use transport::{MessageFormat, SocketTransport, Transport};
