//! SQLite persistence: idempotent table creation and bulk batch writes.
//!
//! Each dataset owns exactly one table. Writes happen in one transaction per
//! batch, either upserting on the declared primary key or replacing the whole
//! table contents.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::Value, Connection};
use tracing::{debug, info};

use crate::dataset::{TableSpec, WriteMode};

pub struct Sink {
    conn: Connection,
}

impl Sink {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening store at `{}`", path.display()))?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Idempotently create `table`. Safe to call on every run.
    pub fn ensure_table(&self, table: &TableSpec) -> Result<()> {
        let columns = table
            .columns
            .iter()
            .map(|(name, ty)| format!("    {} {}", name, ty))
            .collect::<Vec<_>>()
            .join(",\n");
        let primary_key = if table.primary_key.is_empty() {
            String::new()
        } else {
            format!(",\n    PRIMARY KEY ({})", table.primary_key.join(", "))
        };
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}{}\n)",
            table.name, columns, primary_key
        );

        self.conn
            .execute(&ddl, [])
            .with_context(|| format!("creating table {}", table.name))?;
        debug!(table = table.name, "schema ensured");
        Ok(())
    }

    /// Write `rows` into `table` in a single transaction.
    ///
    /// [`WriteMode::Upsert`] inserts-or-updates on the declared key;
    /// [`WriteMode::Replace`] clears the table first. Returns the number of
    /// rows written.
    pub fn write(&mut self, table: &TableSpec, rows: &[Vec<Value>], mode: WriteMode) -> Result<usize> {
        let tx = self.conn.transaction()?;

        if mode == WriteMode::Replace {
            tx.execute(&format!("DELETE FROM {}", table.name), [])
                .with_context(|| format!("clearing table {}", table.name))?;
        }

        let placeholders = (1..=table.columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let verb = match mode {
            WriteMode::Upsert => "INSERT OR REPLACE",
            WriteMode::Replace => "INSERT",
        };
        let sql = format!(
            "{} INTO {} ({}) VALUES ({})",
            verb,
            table.name,
            table.column_names().join(", "),
            placeholders
        );

        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))
                    .with_context(|| format!("inserting into {}", table.name))?;
            }
        }
        tx.commit()
            .with_context(|| format!("committing batch for {}", table.name))?;

        info!(table = table.name, rows = rows.len(), ?mode, "batch written");
        Ok(rows.len())
    }

    /// Current row count of `table_name`.
    pub fn count_rows(&self, table_name: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table_name), [], |r| {
                r.get(0)
            })?;
        Ok(count)
    }

    /// Shared access to the underlying connection for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
