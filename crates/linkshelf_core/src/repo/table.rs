//! Generic single-table access for any [`Entity`].

use super::{RepoError, RepoResult};
use crate::mapper::{uuid_value, Entity, RowDecoder};
use crate::sql::builder;
use crate::sql::Ordering;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;
use uuid::Uuid;

const ID_PREDICATE: &str = "id = ?";

pub struct Table<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<E>,
}

impl<'conn, E: Entity> Table<'conn, E> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub fn insert(&self, entity: &E) -> RepoResult<()> {
        let sql = builder::insert(E::TABLE, E::COLUMNS);
        self.conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(entity.to_values()))?;
        Ok(())
    }

    /// Writes every non-id column. Fails with `NotFound` when no row matched.
    pub fn update(&self, entity: &E) -> RepoResult<()> {
        let sql = builder::update(E::TABLE, &E::COLUMNS[1..], ID_PREDICATE);
        let mut values = entity.to_values();
        let id = values.remove(0);
        values.push(id);

        let changed = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: E::TABLE,
                id: entity.id(),
            });
        }
        Ok(())
    }

    /// Deletes by id. Returns whether a row was removed.
    pub fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let sql = builder::delete(E::TABLE, ID_PREDICATE);
        let changed = self.conn.prepare_cached(&sql)?.execute([id.to_string()])?;
        Ok(changed > 0)
    }

    /// Fetches the only row matching `predicate`.
    ///
    /// Returns `MultipleRows` when the predicate is not actually unique.
    pub fn fetch_single(&self, predicate: &str, params: &[Value]) -> RepoResult<Option<E>> {
        let sql = builder::select(&E::select_list(), E::TABLE, Some(predicate), None);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let entity = E::from_row(row)?;
        if rows.next()?.is_some() {
            return Err(RepoError::MultipleRows { table: E::TABLE });
        }
        Ok(Some(entity))
    }

    pub fn fetch_by_id(&self, id: Uuid) -> RepoResult<Option<E>> {
        self.fetch_single(ID_PREDICATE, &[uuid_value(id)])
    }

    pub fn fetch_all(
        &self,
        predicate: Option<&str>,
        params: &[Value],
        ordering: Option<Ordering<'_>>,
    ) -> RepoResult<Vec<E>> {
        let sql = builder::select(&E::select_list(), E::TABLE, predicate, ordering);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    pub fn fetch_ids(
        &self,
        predicate: Option<&str>,
        params: &[Value],
        ordering: Option<Ordering<'_>>,
    ) -> RepoResult<Vec<Uuid>> {
        let sql = builder::select("id", E::TABLE, predicate, ordering);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(RowDecoder::new(row, E::TABLE).uuid("id")?);
        }
        Ok(ids)
    }

    pub fn count(&self, predicate: Option<&str>, params: &[Value]) -> RepoResult<i64> {
        count_rows(self.conn, E::TABLE, predicate, params)
    }
}

pub(crate) fn count_rows(
    conn: &Connection,
    table: &str,
    predicate: Option<&str>,
    params: &[Value],
) -> RepoResult<i64> {
    let sql = builder::count(table, predicate);
    let total = conn
        .prepare_cached(&sql)?
        .query_row(params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::Table;
    use crate::db::schema::create_schema;
    use crate::mapper::uuid_value;
    use crate::model::Tag;
    use crate::repo::RepoError;
    use crate::sql::Ordering;
    use rusqlite::types::Value;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_fetch_update_delete() {
        let conn = conn();
        let table = Table::<Tag>::new(&conn);
        let mut tag = Tag::new("rust", "#FF0000");
        table.insert(&tag).unwrap();
        assert_eq!(table.fetch_by_id(tag.id).unwrap(), Some(tag.clone()));

        tag.description = Some("systems".to_string());
        table.update(&tag).unwrap();
        assert_eq!(table.fetch_by_id(tag.id).unwrap(), Some(tag.clone()));

        assert!(table.delete(tag.id).unwrap());
        assert!(!table.delete(tag.id).unwrap());
        assert_eq!(table.fetch_by_id(tag.id).unwrap(), None);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let conn = conn();
        let table = Table::<Tag>::new(&conn);
        let tag = Tag::new("ghost", "#000000");
        let err = table.update(&tag).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { table: "tag", id } if id == tag.id));
    }

    #[test]
    fn fetch_single_rejects_ambiguous_predicate() {
        let conn = conn();
        let table = Table::<Tag>::new(&conn);
        table.insert(&Tag::new("dup", "#111111")).unwrap();
        table.insert(&Tag::new("dup", "#222222")).unwrap();

        let err = table
            .fetch_single("name = ?", &[Value::Text("dup".to_string())])
            .unwrap_err();
        assert!(matches!(err, RepoError::MultipleRows { table: "tag" }));
    }

    #[test]
    fn fetch_all_orders_case_insensitively() {
        let conn = conn();
        let table = Table::<Tag>::new(&conn);
        for name in ["beta", "Alpha", "gamma"] {
            table.insert(&Tag::new(name, "#000000")).unwrap();
        }
        let names = table
            .fetch_all(None, &[], Some(Ordering::asc("name")))
            .unwrap()
            .into_iter()
            .map(|tag| tag.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);

        let tag = Tag::new("delta", "#000000");
        table.insert(&tag).unwrap();
        let ids = table
            .fetch_ids(Some("id = ?"), &[uuid_value(tag.id)], None)
            .unwrap();
        assert_eq!(ids, vec![tag.id]);
        assert_eq!(table.count(None, &[]).unwrap(), 4);
    }
}
