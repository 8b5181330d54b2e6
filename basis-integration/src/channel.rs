use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tracing::warn;

/// Event feeds connect the long-running component tasks of the engine: a venue private
/// stream feeds its exchange manager, and the manager's fan-out feeds the engine loop.
///
/// Producers outlive consumers here - a private stream supervisor keeps reconciling venue
/// state even after the engine stops listening - so a detached receiver must not error
/// every subsequent send. [`EventTx`] latches into a detached state instead: the first
/// failed delivery logs once, and all later sends (from any clone) become cheap no-ops.
///
/// Construct a feed with [`event_feed`].
#[derive(Debug)]
pub struct EventTx<Event> {
    /// Name of the feed, used when logging detachment.
    feed: &'static str,
    tx: mpsc::UnboundedSender<Event>,
    /// Shared across clones - once any sender observes the receiver gone, all go quiet.
    detached: Arc<AtomicBool>,
}

impl<Event> Clone for EventTx<Event> {
    fn clone(&self) -> Self {
        Self {
            feed: self.feed,
            tx: self.tx.clone(),
            detached: Arc::clone(&self.detached),
        }
    }
}

impl<Event> EventTx<Event> {
    /// Deliver an event to the consumer.
    ///
    /// Returns whether the consumer is still attached. Delivery never blocks the producer.
    pub fn send(&self, event: Event) -> bool {
        if self.detached.load(Ordering::Relaxed) {
            return false;
        }

        if self.tx.send(event).is_err() {
            if !self.detached.swap(true, Ordering::Relaxed) {
                warn!(
                    feed = self.feed,
                    "event feed receiver detached - no further events will be delivered"
                );
            }
            return false;
        }

        true
    }

    /// Whether the consuming half of the feed still exists.
    pub fn is_attached(&self) -> bool {
        !self.detached.load(Ordering::Relaxed)
    }
}

/// Consuming half of an event feed.
#[derive(Debug)]
pub struct EventRx<Event> {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl<Event> EventRx<Event> {
    /// Await the next event. Resolves `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take the next already-queued event without waiting.
    ///
    /// The engine loop drains queued account and market updates this way between state
    /// machine dispatches.
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Adapt into a [`Stream`](futures::Stream) for combinator-style consumption.
    pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<Event> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}

/// Construct a named unbounded event feed.
pub fn event_feed<Event>(feed: &'static str) -> (EventTx<Event>, EventRx<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventTx {
            feed,
            tx,
            detached: Arc::new(AtomicBool::new(false)),
        },
        EventRx { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_drain() {
        let (tx, mut rx) = event_feed::<u8>("account_events");

        assert!(tx.send(1));
        assert!(tx.send(2));

        assert_eq!(rx.try_next(), Some(1));
        assert_eq!(rx.try_next(), Some(2));
        assert_eq!(rx.try_next(), None);
    }

    #[test]
    fn test_detaches_once_receiver_dropped() {
        let (tx, rx) = event_feed::<u8>("account_events");

        assert!(tx.is_attached());
        drop(rx);

        // First failed delivery latches the feed as detached
        assert!(!tx.send(1));
        assert!(!tx.is_attached());
        // Later sends stay quiet no-ops
        assert!(!tx.send(2));
    }

    #[test]
    fn test_detachment_is_shared_across_clones() {
        let (tx, rx) = event_feed::<u8>("manager_events");
        let clone = tx.clone();
        drop(rx);

        assert!(!tx.send(1));
        // The clone observes the latch without attempting a delivery of its own
        assert!(!clone.is_attached());
        assert!(!clone.send(2));
    }
}
