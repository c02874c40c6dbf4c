//! Tag and group repositories.
//!
//! Both are named labels joined to links through a junction table, so they
//! share one implementation parameterized by [`Label`].

use super::table::{count_rows, Table};
use super::RepoResult;
use crate::mapper::{uuid_value, Entity};
use crate::model::{Group, Tag};
use crate::sql::Ordering;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::ops::Deref;
use uuid::Uuid;

/// A named record linked to links through a junction table.
pub trait Label: Entity {
    const JUNCTION: &'static str;
    /// Junction column holding this label's id.
    const JUNCTION_KEY: &'static str;
}

impl Label for Tag {
    const JUNCTION: &'static str = "tag_link";
    const JUNCTION_KEY: &'static str = "tag_id";
}

impl Label for Group {
    const JUNCTION: &'static str = "category_link";
    const JUNCTION_KEY: &'static str = "category_id";
}

pub struct LabelTable<'conn, E> {
    conn: &'conn Connection,
    table: Table<'conn, E>,
}

pub type TagTable<'conn> = LabelTable<'conn, Tag>;
pub type GroupTable<'conn> = LabelTable<'conn, Group>;

impl<'conn, E: Label> LabelTable<'conn, E> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            table: Table::new(conn),
        }
    }

    /// All labels, ordered by name case-insensitively.
    pub fn fetch_all_by_name(&self) -> RepoResult<Vec<E>> {
        self.table.fetch_all(None, &[], Some(Ordering::asc("name")))
    }

    /// Whether any label has exactly this name.
    pub fn exists(&self, name: &str) -> RepoResult<bool> {
        let total = self
            .table
            .count(Some("name = ?"), &[Value::Text(name.to_string())])?;
        Ok(total > 0)
    }

    /// Number of links currently joined to this label.
    pub fn links_count(&self, id: Uuid) -> RepoResult<i64> {
        let predicate = format!("{} = ?", E::JUNCTION_KEY);
        count_rows(self.conn, E::JUNCTION, Some(&predicate), &[uuid_value(id)])
    }
}

impl<'conn, E> Deref for LabelTable<'conn, E> {
    type Target = Table<'conn, E>;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::{GroupTable, TagTable};
    use crate::db::schema::create_schema;
    use crate::model::{Group, Tag};
    use crate::repo::RepoError;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn tag_names_may_repeat_but_group_names_may_not() {
        let conn = conn();
        let tags = TagTable::new(&conn);
        tags.insert(&Tag::new("read later", "#000000")).unwrap();
        tags.insert(&Tag::new("read later", "#FFFFFF")).unwrap();
        assert!(tags.exists("read later").unwrap());
        assert!(!tags.exists("Read Later").unwrap());

        let groups = GroupTable::new(&conn);
        groups.insert(&Group::new("Work", "briefcase", "#0000FF")).unwrap();
        let err = groups
            .insert(&Group::new("Work", "folder", "#00FF00"))
            .unwrap_err();
        assert!(matches!(err, RepoError::Db(ref db) if db.is_unique_violation()));
    }

    #[test]
    fn links_count_reads_junction_rows() {
        let conn = conn();
        let tags = TagTable::new(&conn);
        let tag = Tag::new("rust", "#FF0000");
        tags.insert(&tag).unwrap();
        conn.execute(
            "INSERT INTO tag_link (link_id, tag_id) VALUES ('a', ?1), ('b', ?1);",
            [tag.id.to_string()],
        )
        .unwrap();
        assert_eq!(tags.links_count(tag.id).unwrap(), 2);
    }
}
