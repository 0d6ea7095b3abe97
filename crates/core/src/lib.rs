pub mod config;
pub mod ticket;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig,
};
pub use ticket::{
    non_blank, parse_date, parse_status, parse_title, Comment, NewTicket, SqliteTicketStore,
    Ticket, TicketError, TicketFilter, TicketService, TicketStatus, TicketStore, TicketUpdate,
};
