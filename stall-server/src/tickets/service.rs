//! Ticket operations for kitchen staff

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{BoardItem, BoardOption, BoardTicket, Kitchen, Ticket, TicketStatus};

use super::machine::{transition, transition_events};
use crate::db::{Catalog, OrderStore};
use crate::message::EventBus;

#[derive(Debug, Clone)]
pub struct TicketService {
    catalog: Arc<Catalog>,
    store: Arc<OrderStore>,
    bus: EventBus,
}

impl TicketService {
    pub fn new(catalog: Arc<Catalog>, store: Arc<OrderStore>, bus: EventBus) -> Self {
        Self {
            catalog,
            store,
            bus,
        }
    }

    fn kitchen(&self, prefix: &str) -> AppResult<Kitchen> {
        self.catalog.kitchen_by_prefix(prefix).ok_or_else(|| {
            AppError::new(ErrorCode::KitchenNotFound).with_detail("prefix", prefix)
        })
    }

    /// Move the ticket `prefix`-`seq` to `status`
    ///
    /// Delivered tickets are rejected with a conflict and left untouched.
    #[tracing::instrument(skip(self))]
    pub fn advance(&self, prefix: &str, seq: i64, status: TicketStatus) -> AppResult<Ticket> {
        let kitchen = self.kitchen(prefix)?;
        let ticket = self.store.ticket_by_seq(kitchen.id, seq)?.ok_or_else(|| {
            AppError::new(ErrorCode::TicketNotFound)
                .with_detail("prefix", kitchen.prefix.clone())
                .with_detail("seq", seq)
        })?;

        let updated = self
            .store
            .with_ticket_mut(ticket.id, |t| {
                t.status = transition(t.status, status)?;
                Ok::<_, super::TransitionError>(t.clone())
            })?
            .ok_or_else(|| AppError::new(ErrorCode::TicketNotFound))?
            .map_err(|e| {
                tracing::warn!(prefix = %kitchen.prefix, seq, "Transition on delivered ticket");
                AppError::from(e)
                    .with_detail("prefix", kitchen.prefix.clone())
                    .with_detail("seq", seq)
            })?;

        tracing::info!(
            prefix = %kitchen.prefix,
            seq,
            from = %ticket.status,
            to = %updated.status,
            "Ticket status changed"
        );
        for event in transition_events(&kitchen.prefix, seq, updated.status) {
            self.bus.publish(event);
        }
        Ok(updated)
    }

    /// Open tickets of a kitchen with their lines, by pickup number
    pub fn board(&self, prefix: &str) -> AppResult<Vec<BoardTicket>> {
        let kitchen = self.kitchen(prefix)?;

        let mut board = Vec::new();
        for ticket in self.store.open_tickets(kitchen.id)? {
            let order_created_at = self
                .store
                .order(ticket.order_id)?
                .map(|o| o.created_at)
                .unwrap_or(ticket.created_at);
            let items = self
                .store
                .lines(ticket.order_id)?
                .into_iter()
                .filter(|l| l.kitchen_id == Some(kitchen.id))
                .map(|l| BoardItem {
                    name: l.name,
                    qty: l.qty,
                    options: l
                        .options
                        .into_iter()
                        .map(|o| BoardOption {
                            name: o.name,
                            value: o.value,
                        })
                        .collect(),
                    notes: l.notes,
                })
                .collect();

            board.push(BoardTicket {
                id: ticket.id,
                seq: ticket.pickup_seq,
                status: ticket.status,
                order_id: ticket.order_id,
                order_created_at,
                items,
            });
        }

        Ok(board)
    }
}
