//! Ticket (pickup slip) manager

use common::Clock;
use observability::TicketingMetrics;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::codes::{CodeAllocator, CodeKind};
use crate::error::{Result, TicketingError};
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::store::OrderStore;
use crate::types::{Ticket, TicketStatus};

/// Creates and resolves the ticket that groups vendor orders
#[derive(Clone)]
pub struct TicketManager {
    store: Arc<dyn OrderStore>,
    codes: CodeAllocator,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
}

impl TicketManager {
    pub fn new(
        store: Arc<dyn OrderStore>,
        codes: CodeAllocator,
        clock: Arc<dyn Clock>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            store,
            codes,
            clock,
            notifier,
        }
    }

    /// Load the given ticket, or open a new one when no id is given
    #[instrument(skip(self))]
    pub async fn ensure_ticket(&self, ticket_id: Option<Uuid>) -> Result<Ticket> {
        match ticket_id {
            Some(id) => self.get_ticket(id).await,
            None => self.open_ticket().await,
        }
    }

    /// Open a fresh ticket with a newly allocated code
    pub async fn open_ticket(&self) -> Result<Ticket> {
        let store = &self.store;
        let created_at = self.clock.now();

        let ticket = self
            .codes
            .allocate(CodeKind::Ticket, |code| {
                let ticket = Ticket::open(code, created_at);
                async move { store.insert_ticket(&ticket).await.map(|_| ticket) }
            })
            .await?;

        info!(ticket_id = %ticket.ticket_id, ticket_code = %ticket.ticket_code, "ticket opened");
        TicketingMetrics::ticket_created();
        self.notifier.notify(ChangeEvent::TicketCreated {
            ticket_id: ticket.ticket_id,
        });

        Ok(ticket)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> Result<Ticket> {
        self.store
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| TicketingError::not_found(format!("ticket {} not found", ticket_id)))
    }

    pub async fn find_by_code(&self, ticket_code: &str) -> Result<Option<Ticket>> {
        Ok(self.store.get_ticket_by_code(ticket_code).await?)
    }

    /// Store a status decided by the surrounding business process
    #[instrument(skip(self))]
    pub async fn set_ticket_status(&self, ticket_id: Uuid, status: TicketStatus) -> Result<Ticket> {
        let ticket = self
            .store
            .set_ticket_status(ticket_id, status)
            .await?
            .ok_or_else(|| TicketingError::not_found(format!("ticket {} not found", ticket_id)))?;

        info!(ticket_id = %ticket_id, status = %status, "ticket status set");
        self.notifier
            .notify(ChangeEvent::TicketStatusChanged { ticket_id });

        Ok(ticket)
    }
}
