//! Link repository.
//!
//! # Responsibility
//! - Persist links together with their tag/group junction rows.
//! - Attach group and tags to links on read.
//! - Answer existence, ordering/filter and aggregate statistic queries.
//!
//! # Invariants
//! - `update` fully replaces junction rows from the in-memory link; it never
//!   diffs. Callers that want to keep membership must re-supply it.
//! - Multi-statement writes expect to run inside a queue transaction.
//! - Attachment reads are separate statements and are not consistent with
//!   the primary row read unless the caller wraps them in a transaction.

use super::table::Table;
use super::RepoResult;
use crate::mapper::uuid_value;
use crate::model::{Group, GroupId, Link, LinkId, Tag, TagId};
use crate::sql::{builder, Ordering};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const TAG_JUNCTION: &str = "tag_link";
const GROUP_JUNCTION: &str = "category_link";
const TAG_JUNCTION_COLUMNS: &[&str] = &["link_id", "tag_id"];
const GROUP_JUNCTION_COLUMNS: &[&str] = &["link_id", "category_id"];

/// Named sort option for link listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkOrder {
    Name,
    LastUpdated,
    Oldest,
    #[default]
    Newest,
}

impl LinkOrder {
    pub fn ordering(self) -> Ordering<'static> {
        match self {
            Self::Name => Ordering::asc("og_title"),
            Self::LastUpdated => Ordering::desc("updated_at"),
            Self::Oldest => Ordering::asc("created_at"),
            Self::Newest => Ordering::desc("created_at"),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::LastUpdated => "lastUpdated",
            Self::Oldest => "oldest",
            Self::Newest => "newest",
        }
    }
}

impl Display for LinkOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "name" => Ok(Self::Name),
            "lastUpdated" | "last_updated" => Ok(Self::LastUpdated),
            "oldest" => Ok(Self::Oldest),
            "newest" => Ok(Self::Newest),
            other => Err(format!(
                "unsupported link order `{other}`; expected name|lastUpdated|oldest|newest"
            )),
        }
    }
}

/// Row filter for link listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkFilter {
    #[default]
    All,
    Starred,
    Unread,
    Archived,
    InGroup(GroupId),
    WithTag(TagId),
}

impl LinkFilter {
    fn predicate(self) -> (Option<&'static str>, Vec<Value>) {
        match self {
            Self::All => (None, Vec::new()),
            Self::Starred => (Some("starred = 1"), Vec::new()),
            Self::Unread => (Some("unread = 1"), Vec::new()),
            Self::Archived => (Some("archived = 1"), Vec::new()),
            Self::InGroup(id) => (
                Some("id in (select link_id from category_link where category_id = ?)"),
                vec![uuid_value(id)],
            ),
            Self::WithTag(id) => (
                Some("id in (select link_id from tag_link where tag_id = ?)"),
                vec![uuid_value(id)],
            ),
        }
    }
}

/// Collection-wide counters for informational displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub total: i64,
    pub unread: i64,
    pub starred: i64,
    pub archived: i64,
}

/// Number of links created on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub count: i64,
}

pub struct LinkTable<'conn> {
    conn: &'conn Connection,
    links: Table<'conn, Link>,
}

impl<'conn> LinkTable<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            links: Table::new(conn),
        }
    }

    /// Inserts the link row plus one junction row per tag and for the group.
    ///
    /// No existence check is performed; see [`exists`](Self::exists).
    pub fn insert(&self, link: &Link) -> RepoResult<()> {
        self.links.insert(link)?;
        self.insert_relationships(link)
    }

    /// Updates scalar columns, then replaces all junction rows.
    pub fn update(&self, link: &Link) -> RepoResult<()> {
        self.links.update(link)?;
        self.delete_relationships(link.id)?;
        self.insert_relationships(link)
    }

    /// Deletes the link; triggers remove its junction and search rows.
    pub fn delete(&self, id: LinkId) -> RepoResult<bool> {
        self.links.delete(id)
    }

    /// Fetches one link by a unique predicate and attaches its relationships.
    pub fn fetch_single(&self, predicate: &str, params: &[Value]) -> RepoResult<Option<Link>> {
        let Some(mut link) = self.links.fetch_single(predicate, params)? else {
            return Ok(None);
        };
        self.attach(&mut link)?;
        Ok(Some(link))
    }

    pub fn fetch_by_id(&self, id: LinkId) -> RepoResult<Option<Link>> {
        self.fetch_single("id = ?", &[uuid_value(id)])
    }

    pub fn fetch_ids(&self, order: LinkOrder, filter: LinkFilter) -> RepoResult<Vec<LinkId>> {
        let (predicate, params) = filter.predicate();
        self.links
            .fetch_ids(predicate, &params, Some(order.ordering()))
    }

    pub fn fetch_all(&self, order: LinkOrder, filter: LinkFilter) -> RepoResult<Vec<Link>> {
        let (predicate, params) = filter.predicate();
        let mut links = self
            .links
            .fetch_all(predicate, &params, Some(order.ordering()))?;
        for link in &mut links {
            self.attach(link)?;
        }
        Ok(links)
    }

    pub fn exists(&self, url: &str) -> RepoResult<bool> {
        let total = self
            .links
            .count(Some("url = ?"), &[Value::Text(url.to_string())])?;
        Ok(total > 0)
    }

    pub fn stats(&self) -> RepoResult<LinkStats> {
        let sql = builder::select(
            "count(*), coalesce(sum(unread), 0), coalesce(sum(starred), 0), coalesce(sum(archived), 0)",
            "link",
            None,
            None,
        );
        let stats = self.conn.prepare_cached(&sql)?.query_row([], |row| {
            Ok(LinkStats {
                total: row.get(0)?,
                unread: row.get(1)?,
                starred: row.get(2)?,
                archived: row.get(3)?,
            })
        })?;
        Ok(stats)
    }

    /// Per-day creation counts for links created at or after `since`,
    /// newest day first, at most `limit` days.
    pub fn added_per_day(&self, since: i64, limit: u32) -> RepoResult<Vec<DailyCount>> {
        let sql = format!(
            "{} group by day order by day desc limit ?",
            builder::select(
                "date(created_at, 'unixepoch') as day, count(*) as total",
                "link",
                Some("created_at >= ?"),
                None,
            )
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let counts = stmt
            .query_map(
                params_from_iter([Value::Integer(since), Value::Integer(i64::from(limit))]),
                |row| {
                    Ok(DailyCount {
                        day: row.get("day")?,
                        count: row.get("total")?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Reads the owning group and the tag set into `link`.
    pub fn attach(&self, link: &mut Link) -> RepoResult<()> {
        link.group = self.group_for(link.id)?;
        link.tags = self.tags_for(link.id)?;
        Ok(())
    }

    fn group_for(&self, id: LinkId) -> RepoResult<Option<Group>> {
        let groups = Table::<Group>::new(self.conn).fetch_all(
            Some("id in (select category_id from category_link where link_id = ?)"),
            &[uuid_value(id)],
            Some(Ordering::asc("name")),
        )?;
        Ok(groups.into_iter().next())
    }

    fn tags_for(&self, id: LinkId) -> RepoResult<Vec<Tag>> {
        Table::<Tag>::new(self.conn).fetch_all(
            Some("id in (select tag_id from tag_link where link_id = ?)"),
            &[uuid_value(id)],
            Some(Ordering::asc("name")),
        )
    }

    fn insert_relationships(&self, link: &Link) -> RepoResult<()> {
        let tag_ids = link.tags.iter().map(|tag| tag.id).collect::<BTreeSet<_>>();
        if !tag_ids.is_empty() {
            let mut stmt = self
                .conn
                .prepare_cached(&builder::insert(TAG_JUNCTION, TAG_JUNCTION_COLUMNS))?;
            for tag_id in tag_ids {
                stmt.execute([link.id.to_string(), tag_id.to_string()])?;
            }
        }

        if let Some(group) = link.group.as_ref() {
            self.conn
                .prepare_cached(&builder::insert(GROUP_JUNCTION, GROUP_JUNCTION_COLUMNS))?
                .execute([link.id.to_string(), group.id.to_string()])?;
        }
        Ok(())
    }

    fn delete_relationships(&self, id: LinkId) -> RepoResult<()> {
        for junction in [TAG_JUNCTION, GROUP_JUNCTION] {
            self.conn
                .prepare_cached(&builder::delete(junction, "link_id = ?"))?
                .execute([id.to_string()])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkFilter, LinkOrder, LinkTable};
    use crate::db::schema::create_schema;
    use crate::model::{Link, Tag};
    use crate::repo::label_repo::TagTable;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn order_parses_from_option_names() {
        assert_eq!("lastUpdated".parse::<LinkOrder>().unwrap(), LinkOrder::LastUpdated);
        assert_eq!("name".parse::<LinkOrder>().unwrap(), LinkOrder::Name);
        assert!("random".parse::<LinkOrder>().is_err());
        assert_eq!(LinkOrder::Oldest.to_string(), "oldest");
    }

    #[test]
    fn duplicate_tags_on_entity_are_written_once() {
        let conn = conn();
        let tag = Tag::new("rust", "#FF0000");
        TagTable::new(&conn).insert(&tag).unwrap();

        let mut link = Link::new("https://example.com");
        link.tags = vec![tag.clone(), tag.clone()];
        LinkTable::new(&conn).insert(&link).unwrap();

        let loaded = LinkTable::new(&conn).fetch_by_id(link.id).unwrap().unwrap();
        assert_eq!(loaded.tags, vec![tag]);
    }

    #[test]
    fn filters_select_matching_links() {
        let conn = conn();
        let table = LinkTable::new(&conn);
        let mut starred = Link::new("https://starred.example");
        starred.starred = true;
        starred.unread = false;
        let plain = Link::new("https://plain.example");
        table.insert(&starred).unwrap();
        table.insert(&plain).unwrap();

        assert_eq!(
            table.fetch_ids(LinkOrder::Newest, LinkFilter::Starred).unwrap(),
            vec![starred.id]
        );
        assert_eq!(
            table.fetch_ids(LinkOrder::Newest, LinkFilter::Unread).unwrap(),
            vec![plain.id]
        );
        assert!(table
            .fetch_ids(LinkOrder::Newest, LinkFilter::Archived)
            .unwrap()
            .is_empty());
    }
}
