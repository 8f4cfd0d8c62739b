//! Request messages and transaction metadata encoding.
//!
//! Every request the client can pipeline is a variant of [`Message`]. The
//! byte-level layout of each message is owned by the serialization layer;
//! this module only fixes the variants, their payloads and their
//! signatures.

pub mod metadata;

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

pub use metadata::{
    TransactionConfig, TransactionMetadata, TransactionMetadataBuilder, build_metadata,
};

/// Message signatures (tag bytes) as assigned by the protocol.
pub mod signature {
    pub const INIT: u8 = 0x01;
    pub const RUN: u8 = 0x10;
    pub const BEGIN: u8 = 0x11;
    pub const COMMIT: u8 = 0x12;
    pub const ROLLBACK: u8 = 0x13;
    pub const RESET: u8 = 0x0F;
    pub const DISCARD_ALL: u8 = 0x2F;
    pub const PULL_ALL: u8 = 0x3F;
}

/// A request message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Initialize the connection with client identity and credentials
    Init {
        client_name: String,
        auth_token: BTreeMap<String, Value>,
    },
    /// Run a statement
    Run {
        statement: String,
        parameters: BTreeMap<String, Value>,
    },
    /// Stream all records of the last result
    PullAll,
    /// Discard all records of the last result
    DiscardAll,
    /// Clear failure state and roll back any open transaction
    Reset,
    /// Open an explicit transaction
    Begin { metadata: TransactionMetadata },
    /// Commit the open transaction
    Commit,
    /// Roll back the open transaction
    Rollback,
}

impl Message {
    pub fn init(client_name: impl Into<String>, auth_token: BTreeMap<String, Value>) -> Self {
        Message::Init {
            client_name: client_name.into(),
            auth_token,
        }
    }

    pub fn run(statement: impl Into<String>, parameters: BTreeMap<String, Value>) -> Self {
        Message::Run {
            statement: statement.into(),
            parameters,
        }
    }

    pub fn begin(metadata: TransactionMetadata) -> Self {
        Message::Begin { metadata }
    }

    /// Protocol name of this message.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Message::Init { .. } => "INIT",
            Message::Run { .. } => "RUN",
            Message::PullAll => "PULL_ALL",
            Message::DiscardAll => "DISCARD_ALL",
            Message::Reset => "RESET",
            Message::Begin { .. } => "BEGIN",
            Message::Commit => "COMMIT",
            Message::Rollback => "ROLLBACK",
        }
    }

    /// Signature byte of this message.
    #[must_use]
    pub const fn signature(&self) -> u8 {
        match self {
            Message::Init { .. } => signature::INIT,
            Message::Run { .. } => signature::RUN,
            Message::PullAll => signature::PULL_ALL,
            Message::DiscardAll => signature::DISCARD_ALL,
            Message::Reset => signature::RESET,
            Message::Begin { .. } => signature::BEGIN,
            Message::Commit => signature::COMMIT,
            Message::Rollback => signature::ROLLBACK,
        }
    }
}

/// Log-friendly rendering. Auth tokens are never printed.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Init { client_name, .. } => write!(f, "INIT \"{}\" {{...}}", client_name),
            Message::Run {
                statement,
                parameters,
            } => write!(f, "RUN \"{}\" {:?}", statement, parameters),
            Message::Begin { metadata } => write!(f, "BEGIN {:?}", metadata.as_map()),
            other => f.write_str(other.name()),
        }
    }
}
