use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;

use crate::config::Config;

/// Table holding each question partition. Sections never share a table, so
/// similarity scans never cross section boundaries.
const PARTITION_TABLES: &[&str] = &["section2_questions", "section3_questions"];

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open or create the question database under the data directory
    pub fn open() -> Result<Self> {
        Self::open_at_path(Config::data_dir()?.join("questions.db"))
    }

    /// Open or create a database at a specific path
    pub fn open_at_path(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        let db = Self { conn, path };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (used by tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;

        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema: one table per question section
    fn init_schema(&self) -> Result<()> {
        for table in PARTITION_TABLES {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        question_id TEXT PRIMARY KEY,
                        source_id TEXT NOT NULL,
                        question_index INTEGER NOT NULL,
                        payload TEXT NOT NULL,
                        embedding BLOB NOT NULL,
                        created_at TEXT NOT NULL
                    )"
                ),
                [],
            )?;

            self.conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_source_id ON {table}(source_id)"
                ),
                [],
            )?;
        }

        Ok(())
    }
}
