//! Bookmark domain model.
//!
//! # Responsibility
//! - Define the records persisted by the store: links, tags and groups.
//! - Keep relationships on the owning link (`Link::tags`, `Link::group`).
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Timestamps are whole seconds since the Unix epoch.

pub mod group;
pub mod link;
pub mod tag;

pub use group::{Group, GroupId};
pub use link::{Link, LinkId};
pub use tag::{Tag, TagId};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in whole seconds since the Unix epoch.
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
