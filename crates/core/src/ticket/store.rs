//! Ticket storage trait and query types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ticket::{Ticket, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Request field failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No ticket matches the given id.
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Storage-level failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// A new ticket, validated but not yet persisted.
///
/// The store assigns the id on insertion; `create_time` is stamped by the
/// service before the insert.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub text: String,
    pub status: TicketStatus,
    pub creator: String,
    pub assignee: String,
    pub create_time: DateTime<Utc>,
}

/// Conjunctive filter for querying tickets.
///
/// A ticket matches when it satisfies every supplied condition; the empty
/// filter matches all tickets. `statuses` is a membership filter (union
/// across the given values) and all date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Match tickets whose status is in this set. Empty means any status.
    pub statuses: Vec<TicketStatus>,
    /// Inclusive lower bound on `create_time`.
    pub create_lb: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `create_time`.
    pub create_ub: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `close_time`. Tickets without a close time
    /// never match a close bound.
    pub close_lb: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `close_time`.
    pub close_ub: Option<DateTime<Utc>>,
}

impl TicketFilter {
    /// Create an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a status to the membership set.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.statuses.push(status);
        self
    }

    /// Set the inclusive creation-time bounds.
    pub fn with_create_bounds(
        mut self,
        lb: Option<DateTime<Utc>>,
        ub: Option<DateTime<Utc>>,
    ) -> Self {
        self.create_lb = lb;
        self.create_ub = ub;
        self
    }

    /// Set the inclusive close-time bounds.
    pub fn with_close_bounds(
        mut self,
        lb: Option<DateTime<Utc>>,
        ub: Option<DateTime<Utc>>,
    ) -> Self {
        self.close_lb = lb;
        self.close_ub = ub;
        self
    }
}

/// Trait for ticket storage backends.
///
/// A thin CRUD surface over the ticket collection: no caching, no retries,
/// no transactions spanning calls. Result ordering from `find_by_filter` is
/// backend-defined.
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket, assigning its id. Returns the stored document.
    fn insert(&self, new: NewTicket) -> Result<Ticket, TicketError>;

    /// Look up a ticket by id.
    fn find_by_id(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter.
    fn find_by_filter(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Upsert a ticket by id.
    fn save(&self, ticket: &Ticket) -> Result<(), TicketError>;
}
