//! Conversation display engine
//!
//! Owns the chat log and the busy flag. A submission spawns one task that
//! fetches the reply and paces its reveal; that task only sends
//! [`RevealStep`]s back over a channel; the owner applies them with
//! [`ConversationEngine::apply`]. Steps carry the request id they were
//! produced for, and anything not belonging to the active request is dropped.

use futures_util::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::{ReplyError, ReplyService};
use crate::reveal::{reveal, RevealContext, RevealStep, DEFAULT_REVEAL_DELAY};
use crate::state::{ChatEntry, ChatLog, RequestId};

/// Reply shown in place of anything the service failed to produce
pub const SERVER_ERROR: &str = "Server error";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub reveal_delay: Duration,
    pub fetch_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reveal_delay: DEFAULT_REVEAL_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

pub struct ConversationEngine {
    log: ChatLog,
    service: Arc<dyn ReplyService>,
    settings: EngineSettings,
    active: Option<RequestId>,
    next_id: u64,
    task: Option<JoinHandle<()>>,
    step_tx: mpsc::UnboundedSender<RevealStep>,
    step_rx: mpsc::UnboundedReceiver<RevealStep>,
}

impl ConversationEngine {
    pub fn new(service: Arc<dyn ReplyService>, settings: EngineSettings) -> Self {
        let (step_tx, step_rx) = mpsc::unbounded_channel();
        Self {
            log: ChatLog::new(),
            service,
            settings,
            active: None,
            next_id: 0,
            task: None,
            step_tx,
            step_rx,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        self.log.entries()
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// True from an accepted submit until its reply is fully revealed
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active
    }

    /// Changes whenever the log does; the view scrolls to the newest entry on change
    pub fn revision(&self) -> u64 {
        self.log.revision()
    }

    /// Submit a user message.
    ///
    /// Blank input and input arriving while a reply is in flight are ignored
    /// and return `None`. Otherwise the trimmed message is logged and sent to
    /// the reply service, and the caller should clear its input buffer.
    pub fn submit(&mut self, text: &str) -> Option<RequestId> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        if let Some(active) = self.active {
            debug!(request = %active, "submit ignored while busy");
            return None;
        }

        self.next_id += 1;
        let request_id = RequestId(self.next_id);
        self.log.push_user(request_id, message);
        self.active = Some(request_id);
        info!(request = %request_id, chars = message.chars().count(), "submitting message");

        let service = Arc::clone(&self.service);
        let settings = self.settings.clone();
        let step_tx = self.step_tx.clone();
        let message = message.to_string();

        self.task = Some(tokio::spawn(async move {
            let reply =
                fetch_or_fallback(service.as_ref(), &message, settings.fetch_timeout).await;
            let mut steps = reveal(RevealContext::new(request_id, reply), settings.reveal_delay);
            while let Some(step) = steps.next().await {
                if step_tx.send(step).is_err() {
                    break;
                }
            }
        }));

        Some(request_id)
    }

    /// Wait for the next step produced by the in-flight submission
    pub async fn next_step(&mut self) -> Option<RevealStep> {
        self.step_rx.recv().await
    }

    /// Apply a step to the log. Returns false for steps of a request that is
    /// no longer active, which leave the log untouched.
    pub fn apply(&mut self, step: RevealStep) -> bool {
        if self.active != Some(step.request_id) {
            debug!(request = %step.request_id, "dropping stale reveal step");
            return false;
        }

        self.log
            .publish_assistant(step.request_id, &step.text, !step.finished);

        if step.finished {
            info!(request = %step.request_id, chars = step.text.chars().count(), "reply revealed");
            self.active = None;
            self.task = None;
        }
        true
    }

    /// Drive the in-flight submission until its reply is finalized
    pub async fn run_until_idle(&mut self) {
        while self.is_busy() {
            match self.step_rx.recv().await {
                Some(step) => {
                    self.apply(step);
                }
                None => break,
            }
        }
    }

    /// Abort the in-flight submission.
    ///
    /// A reply already being revealed is finalized with the text shown so far;
    /// if the fetch had not finished, no assistant entry is added.
    pub fn cancel(&mut self) -> bool {
        let Some(request_id) = self.active.take() else {
            return false;
        };

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.log.finalize(request_id);
        info!(request = %request_id, "reply cancelled");
        true
    }
}

impl Drop for ConversationEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn fetch_or_fallback(service: &dyn ReplyService, message: &str, limit: Duration) -> String {
    // A panicking service must still end in a finalized reply
    let fetch = AssertUnwindSafe(service.fetch_reply(message)).catch_unwind();
    let result = match tokio::time::timeout(limit, fetch).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ReplyError::Panicked),
        Err(_) => Err(ReplyError::Timeout(limit)),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "reply fetch failed, showing fallback");
            SERVER_ERROR.to_string()
        }
    }
}
