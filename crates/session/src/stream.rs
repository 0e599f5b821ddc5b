use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use webchat_protocol::ChatEvent;

/// Ordered view of the events of one chat.
///
/// The underlying channel is bounded. A consumer that falls behind loses the
/// oldest undelivered events; the loss is logged and added to [`EventStream::dropped`].
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<ChatEvent>,
    dropped: u64,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<ChatEvent>) -> Self {
        Self {
            receiver,
            dropped: 0,
        }
    }

    /// Waits for the next event. `None` once the session and its task are gone.
    pub async fn next(&mut self) -> Option<ChatEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already delivered event without waiting.
    pub fn try_next(&mut self) -> Option<ChatEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Number of events lost because this consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        warn!(
            skipped,
            total_dropped = self.dropped,
            "chat event consumer lagged, oldest events dropped"
        );
    }
}
