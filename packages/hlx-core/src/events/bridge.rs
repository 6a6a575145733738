//! Bridges [`StateChange`] delivery to a broadcast channel, so more than
//! one consumer (a REPL printer, a future UI) can observe the same client
//! state without the sub-controllers knowing about either.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{StateChange, StateChangeSink};

#[derive(Clone)]
pub struct BroadcastStateChangeBridge {
    tx: broadcast::Sender<StateChange>,
    external_sink: Arc<RwLock<Option<Arc<dyn StateChangeSink>>>>,
}

impl BroadcastStateChangeBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_sink: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_external_sink(&self, sink: Arc<dyn StateChangeSink>) {
        *self.external_sink.write() = Some(sink);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }
}

impl StateChangeSink for BroadcastStateChangeBridge {
    fn on_state_change(&self, change: StateChange) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.on_state_change(change.clone());
        }
        if let Err(e) = self.tx.send(change) {
            log::trace!("[StateChangeBridge] no broadcast receivers: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StateChangeKind;

    #[test]
    fn subscriber_receives_forwarded_event() {
        let bridge = BroadcastStateChangeBridge::new(8);
        let mut rx = bridge.subscribe();
        bridge.on_state_change(StateChange::new(StateChangeKind::ZoneVolume, Some(3), "-40"));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.identifier, Some(3));
    }

    #[test]
    fn external_sink_also_receives_event() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counter(AtomicUsize);
        impl StateChangeSink for Counter {
            fn on_state_change(&self, _change: StateChange) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let bridge = BroadcastStateChangeBridge::new(8);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bridge.set_external_sink(counter.clone());
        bridge.on_state_change(StateChange::new(StateChangeKind::Network, None, "x"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
