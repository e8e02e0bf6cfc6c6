//! Change notifications
//!
//! Writers publish fire-and-forget [`ChangeEvent`]s after a successful write.
//! Payloads are hints only: observers must re-fetch authoritative state, and
//! should coalesce bursts with a [`Debouncer`] before doing so.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use crate::types::OrderStatus;

/// Default broadcast buffer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// Default coalescing window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A change observers may care about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    TicketCreated {
        ticket_id: Uuid,
    },
    TicketStatusChanged {
        ticket_id: Uuid,
    },
    OrderCreated {
        order_id: Uuid,
        ticket_id: Uuid,
        vendor_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        vendor_id: Uuid,
        status: OrderStatus,
    },
}

/// Publishing side of the change feed
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish without waiting; having no subscribers is fine
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Subscribe through a debouncer
    pub fn debounced(&self, window: Duration) -> Debouncer {
        Debouncer::new(self.subscribe(), window)
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Coalesces bursts of notifications
///
/// A batch closes once `window` passes without a new event, or once
/// `10 * window` has passed since the batch opened.
pub struct Debouncer {
    rx: broadcast::Receiver<ChangeEvent>,
    window: Duration,
    max_wait: Duration,
}

impl Debouncer {
    pub fn new(rx: broadcast::Receiver<ChangeEvent>, window: Duration) -> Self {
        Self {
            rx,
            window,
            max_wait: window * 10,
        }
    }

    /// Wait for the next coalesced batch
    ///
    /// Returns `None` once the channel is closed and nothing is pending. A
    /// lagged receiver still yields a batch, possibly empty, so the caller
    /// re-fetches.
    pub async fn next_batch(&mut self) -> Option<Vec<ChangeEvent>> {
        let mut batch = Vec::new();

        match self.rx.recv().await {
            Ok(event) => batch.push(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "change feed lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }

        let opened = Instant::now();
        let mut deadline = opened + self.window;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                result = self.rx.recv() => match result {
                    Ok(event) => {
                        batch.push(event);
                        deadline = (Instant::now() + self.window).min(opened + self.max_wait);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        Some(batch)
    }
}
