//! SQLite-backed key-value state.
//!
//! A single `state` table keeps named string parameters (currently just the
//! watcher liveness flag, read by external monitoring). Writes go through an
//! explicit transaction, one commit per logical operation.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::error;

pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// `":memory:"` works too.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open state database at {path}"))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS state (
                id INTEGER PRIMARY KEY,
                parameter TEXT NOT NULL,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create state table")?;
        Ok(Self { conn })
    }

    /// Upsert a parameter. Failures are logged and swallowed; the watcher
    /// must keep running whether or not state lands in the database.
    pub fn set_parameter(&self, parameter: &str, value: &str) {
        if let Err(e) = self.try_set(parameter, value) {
            error!("Exception while updating state in DB: {e:#}");
        }
    }

    // Read-then-update-or-insert inside one transaction. The transaction
    // rolls back on drop if anything before commit fails.
    fn try_set(&self, parameter: &str, value: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM state WHERE parameter = ?1",
                params![parameter],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => {
                tx.execute("UPDATE state SET value = ?1 WHERE id = ?2", params![value, id])?;
            }
            None => {
                tx.execute(
                    "INSERT INTO state (parameter, value) VALUES (?1, ?2)",
                    params![parameter, value],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read a parameter. A missing row is `None`; a failed query is an error
    /// the caller deals with.
    pub fn get_parameter(&self, parameter: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM state WHERE parameter = ?1",
                params![parameter],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read state parameter {parameter}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_is_none() {
        let store = StateStore::open(":memory:").unwrap();
        assert_eq!(store.get_parameter("nope").unwrap(), None);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let store = StateStore::open(":memory:").unwrap();
        store.set_parameter("is_running", "true");
        assert_eq!(
            store.get_parameter("is_running").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let store = StateStore::open(":memory:").unwrap();
        store.set_parameter("is_running", "true");
        store.set_parameter("is_running", "false");
        assert_eq!(
            store.get_parameter("is_running").unwrap().as_deref(),
            Some("false")
        );

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM state", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_parameters_are_independent() {
        let store = StateStore::open(":memory:").unwrap();
        store.set_parameter("a", "1");
        store.set_parameter("b", "2");
        assert_eq!(store.get_parameter("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get_parameter("b").unwrap().as_deref(), Some("2"));
    }
}
