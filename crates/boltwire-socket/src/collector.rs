//! Per-message result sinks.
//!
//! Every queued message is paired with one [`Collector`]. Responses are
//! delivered to collectors strictly in queue order: zero or more records
//! followed by exactly one terminal signal (success, failure or ignored).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use boltwire_core::{ServerError, Value};

/// Receives the response stream of one request.
///
/// All methods default to doing nothing.
pub trait Collector: Send {
    /// A record belonging to this request's result.
    fn on_record(&mut self, _fields: &[Value]) {}

    /// The request completed; `metadata` is the summary the server sent.
    fn on_success(&mut self, _metadata: &BTreeMap<String, Value>) {}

    /// The server rejected the request.
    fn on_failure(&mut self, _error: &ServerError) {}

    /// The server skipped the request because an earlier one failed.
    fn on_ignored(&mut self) {}
}

/// Collector for requests whose result is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCollector;

impl Collector for NoOpCollector {}

/// Shared handle: lets callers keep access to a collector the connection
/// owns until its response arrives.
impl<C: Collector> Collector for Arc<Mutex<C>> {
    fn on_record(&mut self, fields: &[Value]) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_record(fields);
    }

    fn on_success(&mut self, metadata: &BTreeMap<String, Value>) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_success(metadata);
    }

    fn on_failure(&mut self, error: &ServerError) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_failure(error);
    }

    fn on_ignored(&mut self) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_ignored();
    }
}

/// Terminal state of a [`RecordCollector`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No terminal response yet
    Pending,
    Success(BTreeMap<String, Value>),
    Failure(ServerError),
    Ignored,
}

/// Collector that keeps everything it receives.
#[derive(Debug, Clone)]
pub struct RecordCollector {
    records: Vec<Vec<Value>>,
    outcome: Outcome,
}

impl Default for RecordCollector {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            outcome: Outcome::Pending,
        }
    }
}

impl RecordCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in a shared handle suitable for queueing.
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn records(&self) -> &[Vec<Value>] {
        &self.records
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_done(&self) -> bool {
        !matches!(self.outcome, Outcome::Pending)
    }

    /// Summary metadata, if the request succeeded.
    pub fn summary(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.outcome {
            Outcome::Success(metadata) => Some(metadata),
            _ => None,
        }
    }

    /// Field names announced in the RUN summary.
    pub fn keys(&self) -> Vec<String> {
        self.summary()
            .and_then(|m| m.get("fields"))
            .and_then(Value::as_list)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn take_records(&mut self) -> Vec<Vec<Value>> {
        std::mem::take(&mut self.records)
    }
}

impl Collector for RecordCollector {
    fn on_record(&mut self, fields: &[Value]) {
        self.records.push(fields.to_vec());
    }

    fn on_success(&mut self, metadata: &BTreeMap<String, Value>) {
        self.outcome = Outcome::Success(metadata.clone());
    }

    fn on_failure(&mut self, error: &ServerError) {
        self.outcome = Outcome::Failure(error.clone());
    }

    fn on_ignored(&mut self) {
        self.outcome = Outcome::Ignored;
    }
}
