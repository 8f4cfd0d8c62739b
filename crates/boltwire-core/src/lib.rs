//! Core types for boltwire.
//!
//! This crate provides the protocol-independent building blocks shared by
//! every connection implementation:
//!
//! - [`Value`] - dynamically-typed wire values
//! - [`Error`] - connectivity, server and protocol errors
//! - [`Logging`] - logger provider resolved lazily by components
//! - [`Bookmark`], [`AccessMode`], [`DatabaseName`], [`NotificationConfig`] -
//!   transaction configuration
//! - [`messaging`] - request messages and the transaction metadata encoder

pub mod bookmark;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod types;
pub mod value;

pub use bookmark::Bookmark;
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, Result, ServerError, ServerErrorClassification,
};
pub use logging::{Logger, Logging, NoLogging, TracingLogging};
pub use messaging::{
    Message, TransactionConfig, TransactionMetadata, TransactionMetadataBuilder, build_metadata,
};
pub use types::{
    AccessMode, DatabaseName, NotificationClassification, NotificationConfig,
    NotificationSeverity,
};
pub use value::Value;
