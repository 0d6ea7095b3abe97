//! SQLite-backed ticket store implementation.
//!
//! Tickets live in a single table with the embedded comments serialized into
//! a JSON column. Timestamps are stored as fixed-width RFC 3339 text so the
//! inclusive date bounds in [`TicketFilter`] compare correctly in SQL.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use super::{Comment, NewTicket, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};

const TICKET_COLUMNS: &str =
    "id, title, status, text, create_time, close_time, delete_time, creator, assignee, comments";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Open a store at the given path, creating the database file and tables
    /// if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                text TEXT NOT NULL,
                create_time TEXT NOT NULL,
                close_time TEXT,
                delete_time TEXT,
                creator TEXT NOT NULL,
                assignee TEXT NOT NULL,
                comments TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_create_time ON tickets(create_time);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    /// Fixed-width UTC text form; lexicographic order equals chronological.
    fn format_time(t: DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            conditions.push(format!("status IN ({})", placeholders));
            for status in &filter.statuses {
                params.push(Box::new(status.as_str().to_string()));
            }
        }

        if let Some(lb) = filter.create_lb {
            conditions.push("create_time >= ?".to_string());
            params.push(Box::new(Self::format_time(lb)));
        }

        if let Some(ub) = filter.create_ub {
            conditions.push("create_time <= ?".to_string());
            params.push(Box::new(Self::format_time(ub)));
        }

        // NULL close_time never satisfies a close bound.
        if let Some(lb) = filter.close_lb {
            conditions.push("close_time >= ?".to_string());
            params.push(Box::new(Self::format_time(lb)));
        }

        if let Some(ub) = filter.close_ub {
            conditions.push("close_time <= ?".to_string());
            params.push(Box::new(Self::format_time(ub)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let status_str: String = row.get(2)?;
        let text: String = row.get(3)?;
        let create_time_str: String = row.get(4)?;
        let close_time_str: Option<String> = row.get(5)?;
        let delete_time_str: Option<String> = row.get(6)?;
        let creator: String = row.get(7)?;
        let assignee: String = row.get(8)?;
        let comments_json: String = row.get(9)?;

        let status = TicketStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown status '{}'", status_str).into(),
            )
        })?;

        let create_time = Self::parse_time(4, &create_time_str)?;
        let close_time = close_time_str
            .as_deref()
            .map(|s| Self::parse_time(5, s))
            .transpose()?;
        let delete_time = delete_time_str
            .as_deref()
            .map(|s| Self::parse_time(6, s))
            .transpose()?;

        let comments: Vec<Comment> = serde_json::from_str(&comments_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

        Ok(Ticket {
            id,
            title,
            status,
            text,
            create_time,
            close_time,
            delete_time,
            creator,
            assignee,
            comments,
        })
    }
}

impl TicketStore for SqliteTicketStore {
    fn insert(&self, new: NewTicket) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO tickets (id, title, status, text, create_time, close_time, delete_time, creator, assignee, comments) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?, ?, '[]')",
            params![
                id,
                new.title,
                new.status.as_str(),
                new.text,
                Self::format_time(new.create_time),
                new.creator,
                new.assignee,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(Ticket {
            id,
            title: new.title,
            status: new.status,
            text: new.text,
            create_time: new.create_time,
            close_time: None,
            delete_time: None,
            creator: new.creator,
            assignee: new.assignee,
            comments: Vec::new(),
        })
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TicketError::Database(e.to_string())),
        }
    }

    fn find_by_filter(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT {} FROM tickets {}", TICKET_COLUMNS, where_clause);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            let ticket = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    fn save(&self, ticket: &Ticket) -> Result<(), TicketError> {
        let conn = self.conn.lock().unwrap();

        let comments_json = serde_json::to_string(&ticket.comments)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO tickets (id, title, status, text, create_time, close_time, delete_time, creator, assignee, comments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                status = excluded.status,
                text = excluded.text,
                create_time = excluded.create_time,
                close_time = excluded.close_time,
                delete_time = excluded.delete_time,
                creator = excluded.creator,
                assignee = excluded.assignee,
                comments = excluded.comments
            "#,
            params![
                ticket.id,
                ticket.title,
                ticket.status.as_str(),
                ticket.text,
                Self::format_time(ticket.create_time),
                ticket.close_time.map(Self::format_time),
                ticket.delete_time.map(Self::format_time),
                ticket.creator,
                ticket.assignee,
                comments_json,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }
}
