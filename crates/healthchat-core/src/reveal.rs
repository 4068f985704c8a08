//! Letter-by-letter reveal of a complete reply
//!
//! [`RevealContext`] is the clock-free part: an iterator of growing prefixes
//! tagged with the request they belong to. [`reveal`] paces it with a tokio
//! timer and hands back a stream, so callers decide what a step does to the log.

use futures_util::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

use crate::state::RequestId;

/// Default pause between two revealed characters
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(5);

/// One published state of a revealing reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealStep {
    pub request_id: RequestId,
    /// Prefix of the full reply revealed so far
    pub text: String,
    /// Set on the last step only
    pub finished: bool,
}

/// Per-animation state: which request, what to reveal, how far we are
#[derive(Debug, Clone)]
pub struct RevealContext {
    request_id: RequestId,
    target: String,
    revealed: usize,
    offset: usize,
    finished: bool,
}

impl RevealContext {
    pub fn new(request_id: RequestId, target: impl Into<String>) -> Self {
        Self {
            request_id,
            target: target.into(),
            revealed: 0,
            offset: 0,
            finished: false,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of characters published so far
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reveal one more character.
    ///
    /// An empty target still yields a single, finished step with empty text.
    pub fn advance(&mut self) -> Option<RevealStep> {
        if self.finished {
            return None;
        }

        if let Some(ch) = self.target[self.offset..].chars().next() {
            self.offset += ch.len_utf8();
            self.revealed += 1;
        }
        self.finished = self.offset >= self.target.len();

        Some(RevealStep {
            request_id: self.request_id,
            text: self.target[..self.offset].to_string(),
            finished: self.finished,
        })
    }
}

impl Iterator for RevealContext {
    type Item = RevealStep;

    fn next(&mut self) -> Option<RevealStep> {
        self.advance()
    }
}

pub type RevealStream = BoxStream<'static, RevealStep>;

/// Pace a reveal: the first step is immediate, each later one waits `delay`
/// after the previous step was produced.
pub fn reveal(context: RevealContext, delay: Duration) -> RevealStream {
    stream::unfold((context, true), move |(mut context, first)| async move {
        if context.is_finished() {
            return None;
        }
        if !first {
            tokio::time::sleep(delay).await;
        }
        let step = context.advance()?;
        Some((step, (context, false)))
    })
    .boxed()
}
