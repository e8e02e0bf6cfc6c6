//! Order lifecycle state machine
//!
//! `preparing -> ready -> collected`, linear with no skipping and no way
//! back. A request for the current status is a no-op. Each status timestamp
//! is written once, on first entry.

use chrono::{DateTime, Utc};
use common::Clock;
use observability::TicketingMetrics;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TicketingError};
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::store::OrderStore;
use crate::types::{Actor, Order, OrderEvent, OrderRef, OrderStatus};

/// Whether `from -> to` is one of the two forward steps
pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Preparing, OrderStatus::Ready) | (OrderStatus::Ready, OrderStatus::Collected)
    )
}

/// Conflict unless `from -> to` is legal
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(TicketingError::conflict(format!(
            "invalid status transition: {} -> {}",
            from, to
        )))
    }
}

/// Whether an event history is a valid walk: a creation event into
/// `preparing` followed by legal steps, each starting where the last ended
pub fn is_valid_walk(events: &[OrderEvent]) -> bool {
    let Some((first, rest)) = events.split_first() else {
        return false;
    };
    if first.from_status.is_some() || first.to_status != OrderStatus::Preparing {
        return false;
    }

    let mut current = first.to_status;
    for event in rest {
        match event.from_status {
            Some(from) if from == current && is_legal_transition(from, event.to_status) => {
                current = event.to_status;
            }
            _ => return false,
        }
    }
    true
}

/// Load an order by id or code
pub(crate) async fn load_order(store: &dyn OrderStore, order_ref: &OrderRef) -> Result<Order> {
    let found = match order_ref {
        OrderRef::Id(id) => store.get_order(*id).await?,
        OrderRef::Code(code) => store.get_order_by_code(code).await?,
    };
    found.ok_or_else(|| TicketingError::not_found(format!("order {} not found", order_ref)))
}

/// Applies status changes
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Move an order to `to`
    ///
    /// The check and the write are one conditional store update, so two
    /// racing requests from the same status cannot both win. Audit event
    /// failures are logged and do not undo the change.
    #[instrument(skip(self), fields(order = %order_ref))]
    pub async fn update_status(
        &self,
        order_ref: &OrderRef,
        to: OrderStatus,
        actor: Actor,
        at: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let current = load_order(self.store.as_ref(), order_ref).await?;

        if current.status == to {
            debug!(order_id = %current.order_id, status = %to, "status unchanged");
            return Ok(current);
        }
        check_transition(current.status, to)?;

        let at = at.unwrap_or_else(|| self.clock.now());
        let from = current.status;

        let updated = match self
            .store
            .transition_status(current.order_id, from, to, at)
            .await?
        {
            Some(order) => order,
            None => {
                // lost a race; whoever won decides the answer
                let latest = load_order(self.store.as_ref(), &OrderRef::Id(current.order_id)).await?;
                if latest.status == to {
                    return Ok(latest);
                }
                return Err(TicketingError::conflict(format!(
                    "invalid status transition: {} -> {}",
                    latest.status, to
                )));
            }
        };

        let event = OrderEvent::new(updated.order_id, Some(from), to, actor, at);
        if let Err(err) = self.store.append_event(&event).await {
            warn!(order_id = %updated.order_id, error = %err, "failed to append status event");
        }

        info!(
            order_id = %updated.order_id,
            order_code = %updated.order_code,
            from = %from,
            to = %to,
            actor = %actor,
            "order status changed"
        );
        TicketingMetrics::status_transition(from.as_str(), to.as_str(), actor.as_str());
        self.notifier.notify(ChangeEvent::OrderStatusChanged {
            order_id: updated.order_id,
            vendor_id: updated.vendor_id,
            status: to,
        });

        Ok(updated)
    }
}
