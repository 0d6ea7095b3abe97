//! Ticket tracking: domain types, boundary validators, storage, service.

mod parse;
mod service;
mod sqlite_store;
mod store;
mod types;

pub use parse::{non_blank, parse_date, parse_status, parse_title};
pub use service::{TicketService, TicketUpdate};
pub use sqlite_store::SqliteTicketStore;
pub use store::{NewTicket, TicketError, TicketFilter, TicketStore};
pub use types::{Comment, Ticket, TicketStatus};
