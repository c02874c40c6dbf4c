//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open the single file or in-memory connection owned by the queue.
//! - Configure durability, busy timeout and statement caching.
//!
//! # Invariants
//! - Returned connections have `synchronous` set from config.
//! - Schema creation and migrations are NOT run here; the store runs them
//!   through the queue after it starts.

use super::DbResult;
use crate::config::StoreConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Where the queue's connection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    File(PathBuf),
    Memory,
}

impl ConnectionTarget {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens and configures a connection.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(target: &ConnectionTarget, config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match target {
        ConnectionTarget::File(path) => Connection::open(path),
        ConnectionTarget::Memory => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={} synchronous={}",
                started_at.elapsed().as_millis(),
                config.synchronous.as_pragma()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA synchronous = {};",
        config.synchronous.as_pragma()
    ))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
    Ok(())
}
