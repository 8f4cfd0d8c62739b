//! Response dispatch.
//!
//! The [`MessageHandler`] trait is what a transport feeds decoded responses
//! into. [`ResponseHandler`] is the connection's implementation: an ordered
//! queue of collectors, one per request, consumed front to back as summary
//! responses arrive.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use boltwire_core::{Logger, Logging, NoLogging, ServerError, Value};

use crate::collector::Collector;

/// Sink for decoded responses.
pub trait MessageHandler {
    /// SUCCESS summary for the oldest outstanding request.
    fn handle_success(&mut self, metadata: &BTreeMap<String, Value>);

    /// RECORD belonging to the oldest outstanding request. Not a summary.
    fn handle_record(&mut self, fields: &[Value]);

    /// FAILURE summary for the oldest outstanding request.
    fn handle_failure(&mut self, code: &str, message: &str);

    /// IGNORED summary for the oldest outstanding request.
    fn handle_ignored(&mut self);

    /// Number of sent requests still waiting for a summary.
    fn collectors_waiting(&self) -> usize;
}

/// Ordered collector queue plus captured server failure.
///
/// Collectors are appended when their request is queued but only count as
/// waiting once the request has been handed to the transport (see
/// [`ResponseHandler::mark_sent`]). Responses are only ever matched against
/// waiting collectors.
pub struct ResponseHandler {
    collectors: VecDeque<Box<dyn Collector>>,
    in_flight: usize,
    error: Option<ServerError>,
    log: Arc<dyn Logger>,
    log_responses: bool,
}

impl Default for ResponseHandler {
    fn default() -> Self {
        Self::with_logger(NoLogging.get_log(""))
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("queued", &self.collectors.len())
            .field("in_flight", &self.in_flight)
            .field("error", &self.error)
            .field("log_responses", &self.log_responses)
            .finish_non_exhaustive()
    }
}

impl ResponseHandler {
    /// Silent handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler reporting to `log`. Every response is logged at debug level
    /// when `log` has debug enabled at construction time.
    pub fn with_logger(log: Arc<dyn Logger>) -> Self {
        let log_responses = log.is_debug_enabled();
        Self {
            collectors: VecDeque::new(),
            in_flight: 0,
            error: None,
            log,
            log_responses,
        }
    }

    /// Queue the collector for the next request.
    pub fn append_collector(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push_back(collector);
    }

    /// The oldest `count` not-yet-sent requests reached the transport.
    pub fn mark_sent(&mut self, count: usize) {
        self.in_flight = (self.in_flight + count).min(self.collectors.len());
    }

    /// Drop the `count` most recently queued collectors.
    ///
    /// Used when their requests were never transmitted and so will never be
    /// answered.
    pub fn discard_newest(&mut self, count: usize) {
        let keep = self.collectors.len().saturating_sub(count);
        self.collectors.truncate(keep);
        self.in_flight = self.in_flight.min(keep);
    }

    /// Drop every queued collector and any captured failure.
    pub fn clear(&mut self) {
        self.collectors.clear();
        self.in_flight = 0;
        self.error = None;
    }

    /// Did the server report a failure that has not been surfaced yet?
    pub fn server_failure_occurred(&self) -> bool {
        self.error.is_some()
    }

    /// Take the captured failure, clearing the failure state.
    pub fn take_server_failure(&mut self) -> Option<ServerError> {
        self.error.take()
    }

    fn next_collector(&mut self, response: &str) -> Option<Box<dyn Collector>> {
        if self.in_flight == 0 {
            self.log
                .warn(&format!("{response} arrived with no request waiting for it"));
            return None;
        }
        self.in_flight -= 1;
        self.collectors.pop_front()
    }
}

impl MessageHandler for ResponseHandler {
    fn handle_success(&mut self, metadata: &BTreeMap<String, Value>) {
        if self.log_responses {
            self.log.debug(&format!("S: SUCCESS {metadata:?}"));
        }
        if let Some(mut collector) = self.next_collector("SUCCESS") {
            collector.on_success(metadata);
        }
    }

    fn handle_record(&mut self, fields: &[Value]) {
        if self.log_responses {
            self.log.debug(&format!("S: RECORD {fields:?}"));
        }
        match self.collectors.front_mut() {
            Some(collector) if self.in_flight > 0 => collector.on_record(fields),
            _ => self.log.warn("RECORD arrived with no request waiting for it"),
        }
    }

    fn handle_failure(&mut self, code: &str, message: &str) {
        if self.log_responses {
            self.log.debug(&format!("S: FAILURE {code} \"{message}\""));
        }
        let error = ServerError::new(code, message);
        if let Some(mut collector) = self.next_collector("FAILURE") {
            collector.on_failure(&error);
        }
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn handle_ignored(&mut self) {
        if self.log_responses {
            self.log.debug("S: IGNORED");
        }
        if let Some(mut collector) = self.next_collector("IGNORED") {
            collector.on_ignored();
        }
    }

    fn collectors_waiting(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::collector::{NoOpCollector, Outcome, RecordCollector};

    fn shared() -> Arc<Mutex<RecordCollector>> {
        RecordCollector::shared()
    }

    /// Logger keeping every line, with a configurable debug switch.
    struct Lines {
        debug: bool,
        lines: Mutex<Vec<String>>,
    }

    impl Lines {
        fn new(debug: bool) -> Arc<Self> {
            Arc::new(Self {
                debug,
                lines: Mutex::new(Vec::new()),
            })
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.lines.lock().unwrap())
        }
    }

    impl Logger for Lines {
        fn error(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("ERROR {message}"));
        }
        fn warn(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("WARN {message}"));
        }
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("INFO {message}"));
        }
        fn debug(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("DEBUG {message}"));
        }
        fn is_debug_enabled(&self) -> bool {
            self.debug
        }
    }

    #[test]
    fn dispatches_in_queue_order() {
        let run = shared();
        let pull = shared();
        let mut handler = ResponseHandler::new();
        handler.append_collector(Box::new(Arc::clone(&run)));
        handler.append_collector(Box::new(Arc::clone(&pull)));
        handler.mark_sent(2);

        handler.handle_success(&BTreeMap::new());
        assert_eq!(handler.collectors_waiting(), 1);

        handler.handle_record(&[Value::Integer(1)]);
        handler.handle_record(&[Value::Integer(2)]);
        handler.handle_success(&BTreeMap::new());

        assert_eq!(handler.collectors_waiting(), 0);
        assert!(run.lock().unwrap().records().is_empty());
        assert!(run.lock().unwrap().is_done());
        assert_eq!(pull.lock().unwrap().records().len(), 2);
        assert!(!handler.server_failure_occurred());
    }

    #[test]
    fn unsent_collectors_are_not_waiting() {
        let run = shared();
        let pull = shared();
        let mut handler = ResponseHandler::new();
        handler.append_collector(Box::new(Arc::clone(&run)));
        assert_eq!(handler.collectors_waiting(), 0);

        handler.mark_sent(1);
        handler.append_collector(Box::new(Arc::clone(&pull)));
        assert_eq!(handler.collectors_waiting(), 1);
        assert_eq!(handler.collectors.len(), 2);

        handler.handle_success(&BTreeMap::new());
        assert_eq!(handler.collectors_waiting(), 0);

        // Nothing in flight: the unsent PULL_ALL collector must not be consumed
        handler.handle_record(&[Value::Integer(9)]);
        handler.handle_success(&BTreeMap::new());
        assert!(pull.lock().unwrap().records().is_empty());
        assert!(!pull.lock().unwrap().is_done());
        assert_eq!(handler.collectors.len(), 1);

        // Marking more than is queued never overshoots
        handler.mark_sent(5);
        assert_eq!(handler.collectors_waiting(), 1);
    }

    #[test]
    fn failure_is_captured_once_and_cleared_by_take() {
        let run = shared();
        let pull = shared();
        let mut handler = ResponseHandler::new();
        handler.append_collector(Box::new(Arc::clone(&run)));
        handler.append_collector(Box::new(Arc::clone(&pull)));
        handler.mark_sent(2);

        handler.handle_failure("Neo.ClientError.Statement.SyntaxError", "bad");
        handler.handle_ignored();

        assert!(handler.server_failure_occurred());
        assert!(matches!(run.lock().unwrap().outcome(), Outcome::Failure(_)));
        assert_eq!(pull.lock().unwrap().outcome(), &Outcome::Ignored);

        let taken = handler.take_server_failure();
        assert_eq!(
            taken.as_ref().map(|e| e.code.as_str()),
            Some("Neo.ClientError.Statement.SyntaxError")
        );
        assert_eq!(taken.map(|e| e.message), Some("bad".to_string()));
        assert!(!handler.server_failure_occurred());
        assert!(handler.take_server_failure().is_none());
    }

    #[test]
    fn discard_newest_keeps_oldest() {
        let first = shared();
        let mut handler = ResponseHandler::new();
        handler.append_collector(Box::new(Arc::clone(&first)));
        handler.append_collector(Box::new(NoOpCollector));
        handler.append_collector(Box::new(NoOpCollector));
        handler.mark_sent(1);

        handler.discard_newest(2);
        assert_eq!(handler.collectors.len(), 1);
        assert_eq!(handler.collectors_waiting(), 1);

        handler.handle_success(&BTreeMap::new());
        assert!(first.lock().unwrap().is_done());

        handler.discard_newest(5);
        assert_eq!(handler.collectors_waiting(), 0);
    }

    #[test]
    fn unsolicited_responses_are_tolerated() {
        let log = Lines::new(false);
        let mut handler = ResponseHandler::with_logger(Arc::clone(&log) as Arc<dyn Logger>);
        handler.handle_record(&[Value::Null]);
        handler.handle_success(&BTreeMap::new());
        handler.handle_failure("Neo.DatabaseError.General.UnknownError", "boom");
        assert!(handler.server_failure_occurred());
        assert_eq!(log.take().len(), 3);

        handler.clear();
        assert!(!handler.server_failure_occurred());
    }

    #[test]
    fn responses_are_logged_only_with_debug_enabled() {
        let quiet = Lines::new(false);
        let mut handler = ResponseHandler::with_logger(Arc::clone(&quiet) as Arc<dyn Logger>);
        handler.append_collector(Box::new(NoOpCollector));
        handler.mark_sent(1);
        handler.handle_success(&BTreeMap::new());
        assert!(quiet.take().is_empty());

        let verbose = Lines::new(true);
        let mut handler = ResponseHandler::with_logger(Arc::clone(&verbose) as Arc<dyn Logger>);
        handler.append_collector(Box::new(NoOpCollector));
        handler.append_collector(Box::new(NoOpCollector));
        handler.mark_sent(2);
        handler.handle_record(&[Value::Integer(1)]);
        handler.handle_success(&BTreeMap::new());
        handler.handle_ignored();

        assert_eq!(
            verbose.take(),
            vec![
                "DEBUG S: RECORD [Integer(1)]".to_string(),
                "DEBUG S: SUCCESS {}".to_string(),
                "DEBUG S: IGNORED".to_string(),
            ]
        );
    }
}
