//! Typed mapping between domain records and SQLite rows.
//!
//! # Responsibility
//! - Describe each persisted record's table and column order.
//! - Encode records into positional parameter lists.
//! - Decode rows into records, validating presence and type of every column.
//!
//! # Invariants
//! - `COLUMNS[0]` is always the `id` primary key.
//! - `to_values` yields exactly one value per column, in `COLUMNS` order.
//! - Boolean columns only accept `0` or `1`.
//! - Relationships (`Link::tags`, `Link::group`) are not part of the row;
//!   the link repository attaches them.

use crate::model::{Group, Link, Tag};
use rusqlite::types::Value;
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Row decoding failure naming the offending column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub table: &'static str,
    pub column: &'static str,
    pub message: String,
}

impl DecodeError {
    fn new(table: &'static str, column: &'static str, message: impl Into<String>) -> Self {
        Self {
            table,
            column,
            message: message.into(),
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot decode {}.{}: {}",
            self.table, self.column, self.message
        )
    }
}

impl Error for DecodeError {}

/// A record stored as one row of one table.
pub trait Entity: Sized + Send + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Uuid;

    /// Encodes the record's own columns, in `COLUMNS` order.
    fn to_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError>;

    /// Column list for `select` statements.
    fn select_list() -> String {
        Self::COLUMNS.join(", ")
    }
}

/// Column reader bound to one row of one table.
pub struct RowDecoder<'a, 'stmt> {
    row: &'a Row<'stmt>,
    table: &'static str,
}

impl<'a, 'stmt> RowDecoder<'a, 'stmt> {
    pub fn new(row: &'a Row<'stmt>, table: &'static str) -> Self {
        Self { row, table }
    }

    pub fn text(&self, column: &'static str) -> Result<String, DecodeError> {
        self.row
            .get::<_, String>(column)
            .map_err(|err| DecodeError::new(self.table, column, err.to_string()))
    }

    pub fn optional_text(&self, column: &'static str) -> Result<Option<String>, DecodeError> {
        self.row
            .get::<_, Option<String>>(column)
            .map_err(|err| DecodeError::new(self.table, column, err.to_string()))
    }

    pub fn integer(&self, column: &'static str) -> Result<i64, DecodeError> {
        self.row
            .get::<_, i64>(column)
            .map_err(|err| DecodeError::new(self.table, column, err.to_string()))
    }

    pub fn flag(&self, column: &'static str) -> Result<bool, DecodeError> {
        match self.integer(column)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::new(
                self.table,
                column,
                format!("expected 0 or 1, found {other}"),
            )),
        }
    }

    pub fn uuid(&self, column: &'static str) -> Result<Uuid, DecodeError> {
        let text = self.text(column)?;
        Uuid::parse_str(&text)
            .map_err(|_| DecodeError::new(self.table, column, format!("invalid uuid `{text}`")))
    }
}

pub fn uuid_value(id: Uuid) -> Value {
    Value::Text(id.to_string())
}

fn text_value(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn optional_text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text_value)
}

fn flag_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

impl Entity for Link {
    const TABLE: &'static str = "link";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "url",
        "starred",
        "unread",
        "note",
        "archived",
        "color",
        "og_title",
        "og_description",
        "og_image_url",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.id),
            text_value(&self.url),
            flag_value(self.starred),
            flag_value(self.unread),
            optional_text_value(self.note.as_deref()),
            flag_value(self.archived),
            text_value(&self.color),
            optional_text_value(self.og_title.as_deref()),
            optional_text_value(self.og_description.as_deref()),
            optional_text_value(self.og_image_url.as_deref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError> {
        let row = RowDecoder::new(row, Self::TABLE);
        Ok(Self {
            id: row.uuid("id")?,
            url: row.text("url")?,
            starred: row.flag("starred")?,
            unread: row.flag("unread")?,
            archived: row.flag("archived")?,
            note: row.optional_text("note")?,
            color: row.text("color")?,
            og_title: row.optional_text("og_title")?,
            og_description: row.optional_text("og_description")?,
            og_image_url: row.optional_text("og_image_url")?,
            created_at: row.integer("created_at")?,
            updated_at: row.integer("updated_at")?,
            group: None,
            tags: Vec::new(),
        })
    }
}

impl Entity for Tag {
    const TABLE: &'static str = "tag";
    const COLUMNS: &'static [&'static str] = &["id", "name", "color", "description"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.id),
            text_value(&self.name),
            text_value(&self.color),
            optional_text_value(self.description.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError> {
        let row = RowDecoder::new(row, Self::TABLE);
        Ok(Self {
            id: row.uuid("id")?,
            name: row.text("name")?,
            color: row.text("color")?,
            description: row.optional_text("description")?,
        })
    }
}

impl Entity for Group {
    const TABLE: &'static str = "category";
    const COLUMNS: &'static [&'static str] = &["id", "name", "icon", "color"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.id),
            text_value(&self.name),
            text_value(&self.icon),
            text_value(&self.color),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError> {
        let row = RowDecoder::new(row, Self::TABLE);
        Ok(Self {
            id: row.uuid("id")?,
            name: row.text("name")?,
            icon: row.text("icon")?,
            color: row.text("color")?,
        })
    }
}
