//! Local link-library storage.
//!
//! A [`LinkStore`] owns one SQLite file and serializes every access through a
//! single worker thread. Links carry an optional group and any number of tags;
//! a full-text shadow index tracks url, title and description.

pub mod config;
pub mod db;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod repo;
pub mod search;
pub mod sql;
pub mod store;

pub use config::{ConfigError, StoreConfig, SynchronousMode};
pub use db::migrations::{Migration, MigrationReport, MigrationRunner, MigrationSet};
pub use db::{ConnectionTarget, DbError, DbResult, Pending, SerialQueue};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mapper::{DecodeError, Entity};
pub use model::{Group, GroupId, Link, LinkId, Tag, TagId};
pub use repo::link_repo::{DailyCount, LinkFilter, LinkOrder, LinkStats};
pub use repo::{RepoError, RepoResult};
pub use search::fts::{SearchError, SearchResult};
pub use store::LinkStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
