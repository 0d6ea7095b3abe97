use ticketd_core::{Config, TicketService};

/// Shared application state
pub struct AppState {
    config: Config,
    tickets: TicketService,
}

impl AppState {
    pub fn new(config: Config, tickets: TicketService) -> Self {
        Self { config, tickets }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tickets(&self) -> &TicketService {
        &self.tickets
    }
}
