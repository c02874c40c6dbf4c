//! Migration scripts shipped with the crate.
//!
//! Versions are build timestamps (`YYYYMMDDhhmm`).

use super::Migration;

/// Drops the UNIQUE constraint on `tag.name`; duplicates are allowed since.
const TAG_NAME_NOT_UNIQUE: i64 = 202305140900;
/// Lookup indexes for url existence checks and junction reverse lookups.
const LOOKUP_INDEXES: i64 = 202311020800;

const TAG_NAME_NOT_UNIQUE_SQL: &[&str] = &[
    "DROP TABLE IF EXISTS tag_rebuild;",
    "CREATE TABLE tag_rebuild (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        color TEXT NOT NULL,
        description TEXT
    );",
    "INSERT INTO tag_rebuild (id, name, color, description)
     SELECT id, name, color, description FROM tag;",
    "DROP TABLE IF EXISTS tag;",
    "ALTER TABLE tag_rebuild RENAME TO tag;",
    // Dropping `tag` dropped its trigger too.
    "CREATE TRIGGER IF NOT EXISTS tag_ad AFTER DELETE ON tag BEGIN
        DELETE FROM tag_link WHERE tag_id = old.id;
    END;",
    "INSERT OR IGNORE INTO migrations (version) VALUES (202305140900);",
];

const LOOKUP_INDEXES_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_link_url ON link (url);",
    "CREATE INDEX IF NOT EXISTS idx_tag_link_tag ON tag_link (tag_id);",
    "CREATE INDEX IF NOT EXISTS idx_category_link_category ON category_link (category_id);",
    "INSERT OR IGNORE INTO migrations (version) VALUES (202311020800);",
];

pub(super) fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(TAG_NAME_NOT_UNIQUE, TAG_NAME_NOT_UNIQUE_SQL.iter().copied()),
        Migration::new(LOOKUP_INDEXES, LOOKUP_INDEXES_SQL.iter().copied()),
    ]
}
