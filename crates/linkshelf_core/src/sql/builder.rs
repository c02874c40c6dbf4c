//! Parameterized SQL statement assembly.
//!
//! # Responsibility
//! - Render `select`/`insert`/`update`/`delete`/`count` strings from table,
//!   column, predicate and ordering inputs.
//! - Never touch a connection; output depends only on inputs.
//!
//! # Invariants
//! - Placeholders are positional `?`, one per column, in column order.
//! - Ordering is always rendered with `collate nocase`.
//! - `update` with zero columns is a caller defect and panics.

use std::fmt::{Display, Formatter};

/// Sort direction for an ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `(column, direction)` pair rendered as a case-insensitive order clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering<'a> {
    pub column: &'a str,
    pub direction: Direction,
}

impl<'a> Ordering<'a> {
    pub const fn new(column: &'a str, direction: Direction) -> Self {
        Self { column, direction }
    }

    pub const fn asc(column: &'a str) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub const fn desc(column: &'a str) -> Self {
        Self::new(column, Direction::Desc)
    }
}

impl<'a> From<(&'a str, Direction)> for Ordering<'a> {
    fn from((column, direction): (&'a str, Direction)) -> Self {
        Self::new(column, direction)
    }
}

/// Builds `select <columns> from <table> [where ...] [order by ...]`.
pub fn select(
    columns: &str,
    table: &str,
    predicate: Option<&str>,
    ordering: Option<Ordering<'_>>,
) -> String {
    let mut sql = format!("select {columns} from {table}");
    push_predicate(&mut sql, predicate);
    if let Some(ordering) = ordering {
        sql.push_str(&format!(
            " order by {} collate nocase {}",
            ordering.column, ordering.direction
        ));
    }
    sql
}

/// Builds `insert into <table> (<c1>,<c2>) values (?,?)`.
pub fn insert(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "insert into {table} ({}) values ({placeholders})",
        columns.join(",")
    )
}

/// Builds `update <table> set c1 = ?, c2 = ? where <predicate>`.
///
/// # Panics
/// Panics when `columns` is empty.
pub fn update(table: &str, columns: &[&str], predicate: &str) -> String {
    assert!(
        !columns.is_empty(),
        "update statement for `{table}` requires at least one column"
    );
    let assignments = columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("update {table} set {assignments} where {predicate}")
}

/// Builds `delete from <table> where <predicate>`.
pub fn delete(table: &str, predicate: &str) -> String {
    format!("delete from {table} where {predicate}")
}

/// Builds `select count(*) from <table> [where ...]`.
pub fn count(table: &str, predicate: Option<&str>) -> String {
    select("count(*)", table, predicate, None)
}

fn push_predicate(sql: &mut String, predicate: Option<&str>) {
    if let Some(predicate) = predicate.map(str::trim).filter(|p| !p.is_empty()) {
        sql.push_str(" where ");
        sql.push_str(predicate);
    }
}
