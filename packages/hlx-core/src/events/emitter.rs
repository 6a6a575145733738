//! Stock [`StateChangeSink`](super::StateChangeSink) implementations.

use super::{StateChange, StateChangeSink};

/// Discards every event. Used by the server, which delivers state changes
/// to peers as response/notification frames rather than through this sink.
pub struct NoopStateChangeSink;

impl StateChangeSink for NoopStateChangeSink {
    fn on_state_change(&self, _change: StateChange) {}
}

/// Logs every event at debug level. Useful for a client REPL with no richer
/// UI to forward state changes to.
pub struct LoggingStateChangeSink;

impl StateChangeSink for LoggingStateChangeSink {
    fn on_state_change(&self, change: StateChange) {
        log::debug!(
            "state change: {:?} id={:?} -> {}",
            change.kind,
            change.identifier,
            change.new_value
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StateChangeKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        count: AtomicUsize,
    }

    impl StateChangeSink for CountingSink {
        fn on_state_change(&self, _change: StateChange) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_sink_tracks_events() {
        let sink = CountingSink {
            count: AtomicUsize::new(0),
        };
        sink.on_state_change(StateChange::new(StateChangeKind::ZoneVolume, Some(1), "-40"));
        sink.on_state_change(StateChange::new(StateChangeKind::ZoneMute, Some(1), "false"));
        assert_eq!(sink.count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn noop_sink_accepts_events() {
        NoopStateChangeSink.on_state_change(StateChange::new(StateChangeKind::Network, None, "x"));
    }
}
