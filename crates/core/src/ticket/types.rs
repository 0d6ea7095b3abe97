//! Core ticket data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket.
///
/// `Closed` is the only status that carries a side effect: writing it stamps
/// the ticket's `close_time`, and writing any other status clears it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Backlog,
    Progress,
    Review,
    Closed,
}

impl TicketStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Backlog,
        TicketStatus::Progress,
        TicketStatus::Review,
        TicketStatus::Closed,
    ];

    /// Parse a status literal. The input must already be trimmed and
    /// lowercased; anything outside the four literals is rejected.
    pub fn parse(raw: &str) -> Option<TicketStatus> {
        match raw {
            "backlog" => Some(TicketStatus::Backlog),
            "progress" => Some(TicketStatus::Progress),
            "review" => Some(TicketStatus::Review),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    /// Returns the status as its wire literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Backlog => "backlog",
            TicketStatus::Progress => "progress",
            TicketStatus::Review => "review",
            TicketStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A comment attached to a ticket.
///
/// Comments are embedded in their ticket and append-only: there is no
/// independent identity, edit, or delete path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// Email of the comment author.
    pub commenter: String,
    /// Comment body.
    pub text: String,
}

/// A tracked work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier, assigned by the store on insertion.
    pub id: String,

    /// Short summary. Non-blank, immutable after creation.
    pub title: String,

    /// Current status.
    pub status: TicketStatus,

    /// Free-form description. Immutable via the API.
    pub text: String,

    /// When the ticket was created. Stamped server-side, never changed.
    pub create_time: DateTime<Utc>,

    /// Present iff the status was `closed` at the last write.
    pub close_time: Option<DateTime<Utc>>,

    /// Reserved. No exposed operation sets it.
    pub delete_time: Option<DateTime<Utc>>,

    /// Email of the user who created the ticket. Immutable.
    pub creator: String,

    /// Email of the current assignee. Mutable.
    pub assignee: String,

    /// Ordered, append-only comments.
    pub comments: Vec<Comment>,
}
