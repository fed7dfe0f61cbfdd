//! Durable record of run failures.
//!
//! Messages go to a `logs` table in a SQLite database. When that write fails
//! the message is appended to a plain text file instead. Neither path ever
//! reports an error back to the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Clone)]
pub struct ErrorJournal {
    database: PathBuf,
    fallback: PathBuf,
}

impl ErrorJournal {
    pub fn new(database: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            fallback: fallback.into(),
        }
    }

    pub fn record(&self, message: &str) {
        tracing::error!("{message}");

        let Err(error) = self.insert(message) else {
            return;
        };
        tracing::warn!(
            database = %self.database.display(),
            "could not journal to database, using fallback file: {error}"
        );

        if let Err(error) = self.append_fallback(message) {
            tracing::warn!(
                fallback = %self.fallback.display(),
                "could not journal to fallback file: {error}"
            );
        }
    }

    fn insert(&self, message: &str) -> rusqlite::Result<()> {
        let connection = Connection::open(&self.database)?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                message TEXT NOT NULL
            );",
        )?;
        connection.execute(
            "INSERT INTO logs (timestamp, message) VALUES (CURRENT_TIMESTAMP, ?1)",
            [message],
        )?;
        Ok(())
    }

    fn append_fallback(&self, message: &str) -> std::io::Result<()> {
        let parent = self.fallback.parent();
        if let Some(parent) = parent.filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.fallback)?;
        writeln!(
            file,
            "[{}], SQL error while inserting log to database: {message}",
            current_time()
        )
    }

    pub fn database(&self) -> &Path {
        &self.database
    }
}

fn current_time() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| now.unix_timestamp().to_string())
}
