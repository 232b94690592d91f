//! Traversal progress events.
//!
//! The engine reports two events per module: once when the module is first
//! discovered (its path becomes known, its transform has not returned) and
//! once when it is finished (transform returned, children enqueued). Each
//! event carries the cumulative counter pair; their sum increases by
//! exactly one per event, so a sink can render a `finished/discovered`
//! fraction without extra bookkeeping.

use serde::Serialize;
use tokio::sync::mpsc;

/// Cumulative counters for one traversal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Modules whose transform returned and whose children are enqueued.
    pub finished: usize,
    /// Modules whose existence is known.
    pub discovered: usize,
}

/// Optional sink for progress events. Sends never block; a dropped
/// receiver silently disables reporting.
pub type ProgressSender = mpsc::UnboundedSender<Progress>;

/// Per-call counter pair. One event is emitted per increment.
#[derive(Debug)]
pub(crate) struct ProgressCounter {
    sender: Option<ProgressSender>,
    finished: usize,
    discovered: usize,
}

impl ProgressCounter {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self {
            sender,
            finished: 0,
            discovered: 0,
        }
    }

    /// A module's path became known.
    pub(crate) fn module_discovered(&mut self) {
        self.discovered += 1;
        self.emit();
    }

    /// A module's transform returned and its children were enqueued.
    pub(crate) fn module_finished(&mut self) {
        self.finished += 1;
        self.emit();
    }

    fn emit(&self) {
        if let Some(sender) = &self.sender {
            sender
                .send(Progress {
                    finished: self.finished,
                    discovered: self.discovered,
                })
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_increment_emits_one_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut counter = ProgressCounter::new(Some(tx));

        counter.module_discovered();
        counter.module_discovered();
        counter.module_finished();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                Progress { finished: 0, discovered: 1 },
                Progress { finished: 0, discovered: 2 },
                Progress { finished: 1, discovered: 2 },
            ]
        );
        // Sum law: event i carries counters summing to i+1.
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.finished + event.discovered, i + 1);
        }
    }

    #[test]
    fn missing_sink_is_a_no_op() {
        let mut counter = ProgressCounter::new(None);
        counter.module_discovered();
        counter.module_finished();
    }
}
