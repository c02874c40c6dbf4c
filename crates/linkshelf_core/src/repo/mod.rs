//! Repository layer over the serialized connection.
//!
//! # Responsibility
//! - Translate typed record operations into builder statements.
//! - Own relationship bookkeeping that triggers cannot express: junction
//!   replacement on link writes and relationship attachment on link reads.
//!
//! # Invariants
//! - Repositories borrow a `Connection` handed to them by a queue block; they
//!   never open or hold connections themselves.
//! - Errors are propagated unchanged; nothing is retried or swallowed.
//! - All statements go through the prepared statement cache.

use crate::db::DbError;
use crate::mapper::DecodeError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod label_repo;
pub mod link_repo;
pub mod migration_repo;
pub mod table;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Decode(DecodeError),
    NotFound { table: &'static str, id: Uuid },
    /// A lookup expected to be unique matched several rows.
    MultipleRows { table: &'static str },
}

impl RepoError {
    /// Returns the classified database error, when this is one.
    pub fn as_db(&self) -> Option<&DbError> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Decode(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} not found: {id}"),
            Self::MultipleRows { table } => {
                write!(f, "unique lookup on {table} matched more than one row")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::NotFound { .. } | Self::MultipleRows { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<DecodeError> for RepoError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::from(value))
    }
}
