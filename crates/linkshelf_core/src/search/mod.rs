//! Full-text search entry points.
//!
//! # Responsibility
//! - Query the trigger-maintained `search` FTS5 table.
//! - Return link ids only; callers re-fetch full links by id.

pub mod fts;
