//! Baseline schema DDL.
//!
//! Applied on every open before migrations run. Every statement is guarded
//! with `IF NOT EXISTS`, so existing files keep their data.
//!
//! Relationships are kept by triggers instead of foreign keys:
//! - link insert/update mirrors searchable fields into `search`
//! - link delete removes its junction rows and search row
//! - tag/category delete removes their junction rows only

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    icon TEXT NOT NULL,
    color TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS link (
    id TEXT PRIMARY KEY NOT NULL,
    url TEXT NOT NULL,
    starred INTEGER NOT NULL DEFAULT 0,
    unread INTEGER NOT NULL DEFAULT 1,
    note TEXT,
    archived INTEGER NOT NULL DEFAULT 0,
    color TEXT NOT NULL,
    og_title TEXT,
    og_description TEXT,
    og_image_url TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS category_link (
    link_id TEXT NOT NULL,
    category_id TEXT NOT NULL,
    PRIMARY KEY (link_id, category_id)
);

CREATE TABLE IF NOT EXISTS tag_link (
    link_id TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    PRIMARY KEY (link_id, tag_id)
);

CREATE VIRTUAL TABLE IF NOT EXISTS search USING fts5(
    id UNINDEXED,
    url,
    title,
    description
);

CREATE TABLE IF NOT EXISTS migrations (
    version INTEGER PRIMARY KEY NOT NULL
);

CREATE TRIGGER IF NOT EXISTS link_ai AFTER INSERT ON link BEGIN
    INSERT INTO search (id, url, title, description)
    VALUES (new.id, new.url, new.og_title, new.og_description);
END;

CREATE TRIGGER IF NOT EXISTS link_au AFTER UPDATE ON link BEGIN
    UPDATE search
    SET url = new.url,
        title = new.og_title,
        description = new.og_description
    WHERE id = old.id;
END;

CREATE TRIGGER IF NOT EXISTS link_ad AFTER DELETE ON link BEGIN
    DELETE FROM category_link WHERE link_id = old.id;
    DELETE FROM tag_link WHERE link_id = old.id;
    DELETE FROM search WHERE id = old.id;
END;

CREATE TRIGGER IF NOT EXISTS category_ad AFTER DELETE ON category BEGIN
    DELETE FROM category_link WHERE category_id = old.id;
END;

CREATE TRIGGER IF NOT EXISTS tag_ad AFTER DELETE ON tag BEGIN
    DELETE FROM tag_link WHERE tag_id = old.id;
END;
"#;

/// Creates every table and trigger that does not exist yet.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
