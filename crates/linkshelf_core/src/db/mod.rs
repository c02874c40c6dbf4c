//! SQLite storage bootstrap, serialized access and schema migrations.
//!
//! # Responsibility
//! - Own the single SQLite connection behind a serialized queue.
//! - Classify engine failures into a small fixed error set.
//! - Apply schema DDL and versioned migrations before any data access.
//!
//! # Invariants
//! - Only the queue worker thread ever touches the connection.
//! - Schema version is the maximum row of the `migrations` table.

use rusqlite::ffi;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod queue;
pub mod schema;

pub use open::{open_connection, ConnectionTarget};
pub use queue::{Pending, SerialQueue};

pub type DbResult<T> = Result<T, DbError>;

/// Classified database failure.
#[derive(Debug)]
pub enum DbError {
    /// The queue was suspended when this unit of work reached the worker.
    Suspended,
    /// An insert or update violated a UNIQUE or PRIMARY KEY constraint.
    UniqueConstraintViolation(rusqlite::Error),
    /// The engine reported resource exhaustion.
    OutOfMemory,
    /// Any other engine failure, passed through unchanged.
    Unclassified(rusqlite::Error),
    /// The worker thread is gone and can no longer accept work.
    Disconnected,
    /// The worker or delivery thread could not be started.
    WorkerSpawn(std::io::Error),
    /// A non-blocking unit of work panicked; carries the panic message.
    Panicked(String),
}

impl DbError {
    /// Returns the native SQLite extended result code, when one exists.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::UniqueConstraintViolation(err) | Self::Unclassified(err) => {
                err.sqlite_error().map(|code| code.extended_code)
            }
            Self::OutOfMemory => Some(ffi::SQLITE_NOMEM),
            Self::Suspended
            | Self::Disconnected
            | Self::WorkerSpawn(_)
            | Self::Panicked(_) => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueConstraintViolation(_))
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suspended => write!(f, "database queue is suspended"),
            Self::UniqueConstraintViolation(err) => {
                write!(f, "unique constraint violation: {err}")
            }
            Self::OutOfMemory => write!(f, "database engine is out of memory"),
            Self::Unclassified(err) => write!(f, "{err}"),
            Self::Disconnected => write!(f, "database worker is no longer running"),
            Self::WorkerSpawn(err) => write!(f, "failed to start database worker: {err}"),
            Self::Panicked(message) => write!(f, "unit of work panicked: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UniqueConstraintViolation(err) | Self::Unclassified(err) => Some(err),
            Self::WorkerSpawn(err) => Some(err),
            Self::Suspended
            | Self::OutOfMemory
            | Self::Disconnected
            | Self::Panicked(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        classify(value)
    }
}

/// Maps a raw engine error onto the classified set.
pub fn classify(err: rusqlite::Error) -> DbError {
    let Some((primary, extended)) = err
        .sqlite_error()
        .map(|code| (code.code, code.extended_code))
    else {
        return DbError::Unclassified(err);
    };

    match primary {
        ErrorCode::ConstraintViolation
            if extended == ffi::SQLITE_CONSTRAINT_UNIQUE
                || extended == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DbError::UniqueConstraintViolation(err)
        }
        ErrorCode::OutOfMemory => DbError::OutOfMemory,
        _ => DbError::Unclassified(err),
    }
}
