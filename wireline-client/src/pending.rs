//! Reply correlation: pending requests keyed by request id.

use crate::error::ClientError;
use parking_lot::Mutex;
use std::collections::HashMap;
use wireline_protocol::{RequestId, Value};

/// Continuation invoked exactly once when a pending request completes.
pub type Completion = Box<dyn FnOnce(Result<Value, ClientError>) + Send>;

/// Correlation table matching inbound replies to waiting requests.
///
/// Replies may arrive in any order relative to the sends that caused them;
/// the request id in the reply header selects the completion. A completion is
/// removed from the table before it runs, so it fires at most once no matter
/// which path (reply, write failure, connection loss) completes it.
#[derive(Default)]
pub struct ReplyRouter {
    pending: Mutex<HashMap<RequestId, Completion>>,
}

impl ReplyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a completion for `request_id`.
    ///
    /// Returns `false` (leaving the table unchanged) when the id is already
    /// pending.
    pub fn register(&self, request_id: RequestId, completion: Completion) -> bool {
        let mut pending = self.pending.lock();
        if pending.contains_key(&request_id) {
            return false;
        }
        pending.insert(request_id, completion);
        true
    }

    /// Delivers a reply value to the completion waiting on `request_id`.
    ///
    /// Returns `false` when nothing is waiting; the reply is dropped.
    pub fn resolve(&self, request_id: RequestId, value: Value) -> bool {
        // Take the entry out before invoking so the completion runs outside
        // the table lock and may itself register new requests.
        let completion = self.pending.lock().remove(&request_id);
        match completion {
            Some(completion) => {
                completion(Ok(value));
                true
            }
            None => false,
        }
    }

    /// Fails the completion waiting on `request_id`.
    pub fn fail(&self, request_id: RequestId, error: ClientError) -> bool {
        let completion = self.pending.lock().remove(&request_id);
        match completion {
            Some(completion) => {
                completion(Err(error));
                true
            }
            None => false,
        }
    }

    /// Removes a pending completion without running it.
    pub fn discard(&self, request_id: RequestId) {
        self.pending.lock().remove(&request_id);
    }

    /// Fails every pending completion, draining the table.
    pub fn fail_all(&self, error: impl Fn() -> ClientError) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (_, completion) in drained {
            completion(Err(error()));
        }
    }

    /// True while `request_id` has a completion waiting.
    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.lock().contains_key(&request_id)
    }

    /// Number of requests currently awaiting replies.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
