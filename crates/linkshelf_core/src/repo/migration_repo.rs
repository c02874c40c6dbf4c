//! Migration record table.

use crate::db::DbResult;
use crate::sql::builder;
use rusqlite::Connection;

const TABLE: &str = "migrations";

/// Append-only list of applied migration versions.
pub struct MigrationTable<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MigrationTable<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Highest recorded version, or 0 when nothing has been applied.
    pub fn max_version(&self) -> DbResult<i64> {
        let sql = builder::select("coalesce(max(version), 0)", TABLE, None, None);
        let version = self
            .conn
            .prepare_cached(&sql)?
            .query_row([], |row| row.get(0))?;
        Ok(version)
    }

    /// All recorded versions, ascending.
    pub fn versions(&self) -> DbResult<Vec<i64>> {
        let sql = format!("{} order by version asc", builder::select("version", TABLE, None, None));
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let versions = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(versions)
    }
}
