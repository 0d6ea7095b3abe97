//! Ticket service: orchestrates validated input against the store.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

use super::{Comment, NewTicket, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};

/// A partial update to an existing ticket.
///
/// Absent fields leave the ticket untouched. The comment is appended only
/// when both `commenter` and `comment` are present; the boundary validators
/// have already dropped blank values.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub assignee: Option<String>,
    pub status: Option<TicketStatus>,
    pub commenter: Option<String>,
    pub comment: Option<String>,
}

/// Ticket operations over an injected store handle.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
}

/// Current time truncated to microseconds, the precision the store keeps.
/// Stamping at store precision means a returned ticket always equals the
/// persisted one, timestamps included.
fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1000 * 1000)
        .unwrap_or(now)
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Fetch a ticket by id. Any lookup miss maps to `NotFound`.
    pub fn get(&self, id: &str) -> Result<Ticket, TicketError> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    /// Create a ticket from pre-validated fields, stamping `create_time`.
    ///
    /// `close_time` starts out null even when the initial status is
    /// `closed`; only an update to `closed` stamps it.
    pub fn create(
        &self,
        title: String,
        text: String,
        status: TicketStatus,
        creator: String,
        assignee: String,
    ) -> Result<Ticket, TicketError> {
        let ticket = self.store.insert(NewTicket {
            title,
            text,
            status,
            creator,
            assignee,
            create_time: now(),
        })?;
        debug!(id = %ticket.id, status = %ticket.status, "created ticket");
        Ok(ticket)
    }

    /// List tickets matching the conjunctive filter.
    pub fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.store.find_by_filter(filter)
    }

    /// Apply a partial update: fetch, mutate, save.
    ///
    /// Writing status `closed` stamps `close_time = now()`; writing any
    /// other status resets it to null, even when it was already null. The
    /// fetch/save pair is not transactional; concurrent updates to the same
    /// ticket are last-write-wins.
    pub fn update(&self, id: &str, update: TicketUpdate) -> Result<Ticket, TicketError> {
        let mut ticket = self.get(id)?;

        if let Some(assignee) = update.assignee {
            ticket.assignee = assignee;
        }

        if let Some(status) = update.status {
            ticket.close_time = match status {
                TicketStatus::Closed => Some(now()),
                _ => None,
            };
            ticket.status = status;
        }

        if let (Some(commenter), Some(text)) = (update.commenter, update.comment) {
            ticket.comments.push(Comment { commenter, text });
        }

        self.store.save(&ticket)?;
        debug!(id = %ticket.id, status = %ticket.status, "updated ticket");
        Ok(ticket)
    }
}
