//! Pipelined connection.
//!
//! Requests are queued locally together with their collectors and only hit
//! the wire on [`SocketConnection::send_all`]. Responses are read on
//! [`SocketConnection::receive_all`] / [`SocketConnection::receive_one`] and
//! handed to collectors in the order the requests were queued.
//!
//! When the server reports a failure, everything after it in the pipeline
//! is ignored by the server until a RESET arrives. The connection sends that
//! RESET itself before surfacing the failure, so the caller gets a reusable
//! connection along with the error.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

use boltwire_core::error::{ConnectionError, ConnectionErrorKind};
use boltwire_core::{
    Error, Logger, Logging, Message, TransactionMetadata, TransactionMetadataBuilder, Value,
};

use crate::collector::{Collector, NoOpCollector};
use crate::config::ConnectionConfig;
use crate::handler::{MessageHandler, ResponseHandler};
use crate::transport::{MessageFormat, SocketTransport, Transport};

/// Name under which the connection asks the logging provider for its logger.
pub const LOGGER_NAME: &str = "SocketConnection";

/// A single pipelined connection.
///
/// Not shareable: every operation takes `&mut self`, so one caller owns the
/// connection at a time.
pub struct SocketConnection<T: Transport> {
    transport: T,
    pending: VecDeque<Message>,
    handler: ResponseHandler,
    logging: Arc<dyn Logging>,
    log: Arc<dyn Logger>,
    legacy_notifications: bool,
    write_failed: bool,
    closed: bool,
}

impl<T: Transport> std::fmt::Debug for SocketConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketConnection")
            .field("pending", &self.pending.len())
            .field("handler", &self.handler)
            .field("write_failed", &self.write_failed)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<F: MessageFormat> SocketConnection<SocketTransport<F>> {
    /// Open a TCP connection using `format` to encode messages.
    pub fn connect(config: &ConnectionConfig, format: F) -> Result<Self, Error> {
        Self::open(SocketTransport::new(config, format), config)
    }
}

impl<T: Transport> SocketConnection<T> {
    /// Start `transport` and wrap it.
    pub fn open(mut transport: T, config: &ConnectionConfig) -> Result<Self, Error> {
        transport.start()?;
        let log = config.logging.get_log(LOGGER_NAME);
        Ok(Self {
            transport,
            pending: VecDeque::new(),
            handler: ResponseHandler::with_logger(Arc::clone(&log)),
            logging: Arc::clone(&config.logging),
            log,
            legacy_notifications: config.legacy_notifications,
            write_failed: false,
            closed: false,
        })
    }

    /// Queue INIT. Its result is discarded.
    pub fn init(&mut self, client_name: impl Into<String>, auth_token: BTreeMap<String, Value>) {
        self.queue_message(Message::init(client_name, auth_token), NoOpCollector);
    }

    /// Queue RUN.
    pub fn run<C: Collector + 'static>(
        &mut self,
        statement: impl Into<String>,
        parameters: BTreeMap<String, Value>,
        collector: C,
    ) {
        self.queue_message(Message::run(statement, parameters), collector);
    }

    /// Queue DISCARD_ALL. Its result is discarded.
    pub fn discard_all(&mut self) {
        self.queue_message(Message::DiscardAll, NoOpCollector);
    }

    /// Queue PULL_ALL.
    pub fn pull_all<C: Collector + 'static>(&mut self, collector: C) {
        self.queue_message(Message::PullAll, collector);
    }

    /// Queue RESET.
    pub fn reset<C: Collector + 'static>(&mut self, collector: C) {
        self.queue_message(Message::Reset, collector);
    }

    /// Queue BEGIN with metadata built from `tx`.
    ///
    /// The notification key naming and the logging provider come from the
    /// connection configuration.
    pub fn begin<C: Collector + 'static>(&mut self, tx: TransactionMetadataBuilder, collector: C) {
        let metadata = tx
            .legacy_notifications(self.legacy_notifications)
            .build(self.logging.as_ref());
        self.begin_with_metadata(metadata, collector);
    }

    /// Queue BEGIN with pre-built metadata.
    pub fn begin_with_metadata<C: Collector + 'static>(
        &mut self,
        metadata: TransactionMetadata,
        collector: C,
    ) {
        self.queue_message(Message::begin(metadata), collector);
    }

    /// Queue COMMIT.
    pub fn commit<C: Collector + 'static>(&mut self, collector: C) {
        self.queue_message(Message::Commit, collector);
    }

    /// Queue ROLLBACK.
    pub fn rollback<C: Collector + 'static>(&mut self, collector: C) {
        self.queue_message(Message::Rollback, collector);
    }

    /// Send and, if anything was sent, receive everything.
    pub fn sync(&mut self) -> Result<(), Error> {
        if self.send_all()? > 0 {
            self.receive_all()?;
        }
        Ok(())
    }

    /// Write every queued message. Returns how many were written.
    ///
    /// On failure, messages that did reach the transport stay sent and their
    /// collectors keep waiting for responses; messages that did not are
    /// dropped together with their collectors.
    ///
    /// A failed write may leave part of a message on the wire, so after a
    /// [`ConnectionErrorKind::Send`] error the connection accepts no further
    /// writes and reports itself as not open. Responses to fully written
    /// messages can still be received; the connection should then be closed.
    pub fn send_all(&mut self) -> Result<usize, Error> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Ok(0);
        }
        if self.write_failed {
            let unsent = self.pending.len();
            self.pending.clear();
            self.handler.discard_newest(unsent);
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Send,
                message: "Unable to send messages to server: an earlier write failed part way \
                          through; the connection must be closed"
                    .to_string(),
                source: None,
            }));
        }

        if self.log.is_debug_enabled() {
            for message in &self.pending {
                self.log.debug(&format!("C: {message}"));
            }
        }

        let queued = self.pending.len();
        let result = self.transport.send_all(&mut self.pending);

        let unsent = self.pending.len();
        self.pending.clear();
        self.handler.discard_newest(unsent);
        self.handler.mark_sent(queued - unsent);

        match result {
            Ok(_) => Ok(queued - unsent),
            Err(e) => {
                self.write_failed = true;
                if self.log.is_debug_enabled() {
                    self.log
                        .debug(&format!("Send failed with {unsent} message(s) unsent: {e}"));
                }
                Err(send_error(e))
            }
        }
    }

    /// Read responses for every request sent so far.
    pub fn receive_all(&mut self) -> Result<usize, Error> {
        self.ensure_open()?;
        let received = self
            .transport
            .receive_all(&mut self.handler)
            .map_err(receive_error)?;
        self.surface_server_failure()?;
        Ok(received)
    }

    /// Read a single response message.
    pub fn receive_one(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        self.transport
            .receive_one(&mut self.handler)
            .map_err(receive_error)?;
        self.surface_server_failure()
    }

    /// Close the transport. Queued messages are dropped silently.
    pub fn close(&mut self) {
        if !self.closed {
            self.transport.stop();
            self.closed = true;
        }
        self.pending.clear();
        self.handler.clear();
    }

    /// Open and still writable.
    pub fn is_open(&self) -> bool {
        !self.closed && !self.write_failed && self.transport.is_open()
    }

    /// Messages queued but not yet sent.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Sent requests still waiting for a summary response.
    pub fn collectors_waiting(&self) -> usize {
        self.handler.collectors_waiting()
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn queue_message<C: Collector + 'static>(&mut self, message: Message, collector: C) {
        self.pending.push_back(message);
        self.handler.append_collector(Box::new(collector));
    }

    fn ensure_open(&mut self) -> Result<(), Error> {
        if self.closed {
            self.pending.clear();
            self.handler.clear();
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Closed,
                message: "Connection has been closed".to_string(),
                source: None,
            }));
        }
        Ok(())
    }

    /// Reset the server and raise a captured failure, once.
    fn surface_server_failure(&mut self) -> Result<(), Error> {
        if !self.handler.server_failure_occurred() {
            return Ok(());
        }

        self.reset(NoOpCollector);
        if let Err(e) = self.send_all() {
            self.log
                .warn(&format!("Unable to send RESET after server failure: {e}"));
        }

        match self.handler.take_server_failure() {
            Some(failure) => Err(Error::Server(failure)),
            None => Ok(()),
        }
    }
}

fn send_error(e: io::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Send,
        message: format!("Unable to send messages to server: {}", describe(&e)),
        source: Some(Box::new(e)),
    })
}

fn receive_error(e: io::Error) -> Error {
    if matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    ) {
        return Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::ResponseTimeout,
            message: "Server did not reply within the network timeout limit.".to_string(),
            source: Some(Box::new(e)),
        });
    }

    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::ResponseRead,
        message: format!("Unable to read response from server: {}", describe(&e)),
        source: Some(Box::new(e)),
    })
}

/// Message text of `e`, or its kind when it carries no text.
fn describe(e: &io::Error) -> String {
    if e.get_ref().is_some() || e.raw_os_error().is_some() {
        e.to_string()
    } else {
        format!("{:?}", e.kind())
    }
}
