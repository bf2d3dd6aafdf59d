use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;

/// SQLite store of raw classifier replies, keyed by client, model and the
/// rendered request. Only successful replies are ever written.
pub struct ResponseCache {
    conn: Mutex<Connection>,
}

impl ResponseCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_db()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_db()?;
        Ok(cache)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // SQLite statements are atomic; a poisoned lock still guards a valid connection
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_db(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                id INTEGER PRIMARY KEY,
                client TEXT NOT NULL,
                model TEXT NOT NULL,
                request TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(client, model, request)
            );

            CREATE INDEX IF NOT EXISTS idx_responses_lookup ON responses(client, model, request);
            "#,
        )?;

        Ok(())
    }

    pub fn get(&self, client: &str, model: &str, request: &str) -> Result<Option<String>> {
        let response = self
            .conn()
            .query_row(
                "SELECT response FROM responses WHERE client = ?1 AND model = ?2 AND request = ?3",
                params![client, model, request],
                |row| row.get(0),
            )
            .optional()?;

        Ok(response)
    }

    pub fn put(&self, client: &str, model: &str, request: &str, response: &str) -> Result<()> {
        self.conn().execute(
            r#"
            INSERT INTO responses (client, model, request, response, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(client, model, request) DO UPDATE SET
                response = excluded.response,
                created_at = excluded.created_at
            "#,
            params![client, model, request, response, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
