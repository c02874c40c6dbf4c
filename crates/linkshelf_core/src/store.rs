//! Library facade.
//!
//! # Responsibility
//! - Own the single serialized queue for one database file.
//! - Create the schema and apply migrations before handing out access.
//! - Expose link/tag/group operations, search and statistics.
//!
//! # Invariants
//! - Every operation runs as one unit of work on the queue.
//! - Multi-statement writes run in one transaction; a failure rolls back the
//!   whole write.
//! - A link read and its group/tag attachment reads share one unit of work
//!   but not one transaction.

use crate::config::StoreConfig;
use crate::db::migrations::{MigrationReport, MigrationRunner, MigrationSet};
use crate::db::schema::create_schema;
use crate::db::{ConnectionTarget, DbError, DbResult, Pending, SerialQueue};
use crate::model::{now_epoch_seconds, Group, GroupId, Link, LinkId, Tag, TagId};
use crate::repo::label_repo::{GroupTable, TagTable};
use crate::repo::link_repo::{DailyCount, LinkFilter, LinkOrder, LinkStats, LinkTable};
use crate::repo::migration_repo::MigrationTable;
use crate::repo::{RepoError, RepoResult};
use crate::search::fts::{search_links, SearchError, SearchResult};
use log::info;
use std::time::Instant;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_MAX_DAYS: u32 = 10;

/// Entry point owning one database connection.
pub struct LinkStore {
    queue: SerialQueue,
    migration_report: MigrationReport,
}

impl LinkStore {
    /// Opens `config.db_path`, creating it when missing, and applies the
    /// built-in migrations.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        Self::open_with_migrations(config, MigrationSet::builtin())
    }

    /// Opens with a caller-provided migration set.
    pub fn open_with_migrations(config: &StoreConfig, migrations: MigrationSet) -> DbResult<Self> {
        let target = ConnectionTarget::File(config.db_path.clone());
        Self::bootstrap(&target, config, migrations)
    }

    /// Opens a private in-memory database with the built-in migrations.
    pub fn open_in_memory() -> DbResult<Self> {
        let config = StoreConfig::new(":memory:");
        Self::bootstrap(&ConnectionTarget::Memory, &config, MigrationSet::builtin())
    }

    fn bootstrap(
        target: &ConnectionTarget,
        config: &StoreConfig,
        migrations: MigrationSet,
    ) -> DbResult<Self> {
        let started_at = Instant::now();
        let queue = SerialQueue::open(target, config)?;
        queue.run_sync(|conn| create_schema(conn).map_err(DbError::from))?;
        let migration_report = MigrationRunner::new(migrations).run(&queue)?;
        info!(
            "event=store_open module=store status=ok schema_version={} duration_ms={}",
            migration_report.to_version,
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            queue,
            migration_report,
        })
    }

    /// Migrations applied while opening this store.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration_report
    }

    pub fn schema_version(&self) -> DbResult<i64> {
        self.queue
            .run_sync(|conn| MigrationTable::new(conn).max_version())
    }

    pub fn suspend(&self) {
        self.queue.suspend();
    }

    pub fn resume(&self) {
        self.queue.resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.queue.is_suspended()
    }

    // Links

    /// Inserts a link with its junction rows. Does not check for duplicates;
    /// call [`link_exists`](Self::link_exists) first when that matters.
    pub fn insert_link(&self, link: &Link) -> RepoResult<()> {
        let link = link.clone();
        self.queue
            .run_sync_in_transaction(move |conn| LinkTable::new(conn).insert(&link))
    }

    /// Bumps `updated_at`, then persists scalars and replaces membership.
    pub fn update_link(&self, link: &mut Link) -> RepoResult<()> {
        link.touch();
        let snapshot = link.clone();
        self.queue
            .run_sync_in_transaction(move |conn| LinkTable::new(conn).update(&snapshot))
    }

    /// Returns whether a row was deleted.
    pub fn delete_link(&self, id: LinkId) -> RepoResult<bool> {
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).delete(id))
    }

    pub fn fetch_link(&self, id: LinkId) -> RepoResult<Option<Link>> {
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).fetch_by_id(id))
    }

    pub fn fetch_link_ids(&self, order: LinkOrder, filter: LinkFilter) -> RepoResult<Vec<LinkId>> {
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).fetch_ids(order, filter))
    }

    pub fn fetch_links(&self, order: LinkOrder, filter: LinkFilter) -> RepoResult<Vec<Link>> {
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).fetch_all(order, filter))
    }

    pub fn link_exists(&self, url: &str) -> RepoResult<bool> {
        let url = url.to_string();
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).exists(&url))
    }

    pub fn insert_link_async(&self, link: Link) -> Pending<(), RepoError> {
        self.queue
            .submit_in_transaction(move |conn| LinkTable::new(conn).insert(&link))
    }

    pub fn update_link_async(&self, link: &mut Link) -> Pending<(), RepoError> {
        link.touch();
        let snapshot = link.clone();
        self.queue
            .submit_in_transaction(move |conn| LinkTable::new(conn).update(&snapshot))
    }

    pub fn delete_link_async(&self, id: LinkId) -> Pending<bool, RepoError> {
        self.queue
            .submit(move |conn| LinkTable::new(conn).delete(id))
    }

    pub fn fetch_links_async(
        &self,
        order: LinkOrder,
        filter: LinkFilter,
    ) -> Pending<Vec<Link>, RepoError> {
        self.queue
            .submit(move |conn| LinkTable::new(conn).fetch_all(order, filter))
    }

    // Tags

    pub fn insert_tag(&self, tag: &Tag) -> RepoResult<()> {
        let tag = tag.clone();
        self.queue
            .run_sync(move |conn| TagTable::new(conn).insert(&tag))
    }

    pub fn update_tag(&self, tag: &Tag) -> RepoResult<()> {
        let tag = tag.clone();
        self.queue
            .run_sync(move |conn| TagTable::new(conn).update(&tag))
    }

    /// Deletes the tag; links that carried it keep existing.
    pub fn delete_tag(&self, id: TagId) -> RepoResult<bool> {
        self.queue
            .run_sync(move |conn| TagTable::new(conn).delete(id))
    }

    pub fn fetch_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        self.queue
            .run_sync(move |conn| TagTable::new(conn).fetch_by_id(id))
    }

    pub fn fetch_tags(&self) -> RepoResult<Vec<Tag>> {
        self.queue
            .run_sync(|conn| TagTable::new(conn).fetch_all_by_name())
    }

    pub fn tag_exists(&self, name: &str) -> RepoResult<bool> {
        let name = name.to_string();
        self.queue
            .run_sync(move |conn| TagTable::new(conn).exists(&name))
    }

    pub fn tag_links_count(&self, id: TagId) -> RepoResult<i64> {
        self.queue
            .run_sync(move |conn| TagTable::new(conn).links_count(id))
    }

    // Groups

    pub fn insert_group(&self, group: &Group) -> RepoResult<()> {
        let group = group.clone();
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).insert(&group))
    }

    pub fn update_group(&self, group: &Group) -> RepoResult<()> {
        let group = group.clone();
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).update(&group))
    }

    /// Deletes the group; its links stay and lose their group.
    pub fn delete_group(&self, id: GroupId) -> RepoResult<bool> {
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).delete(id))
    }

    pub fn fetch_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).fetch_by_id(id))
    }

    pub fn fetch_groups(&self) -> RepoResult<Vec<Group>> {
        self.queue
            .run_sync(|conn| GroupTable::new(conn).fetch_all_by_name())
    }

    pub fn group_exists(&self, name: &str) -> RepoResult<bool> {
        let name = name.to_string();
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).exists(&name))
    }

    pub fn group_links_count(&self, id: GroupId) -> RepoResult<i64> {
        self.queue
            .run_sync(move |conn| GroupTable::new(conn).links_count(id))
    }

    // Search and statistics

    /// Returns ids of links whose url, title or description match `term`.
    pub fn search(&self, term: &str) -> SearchResult<Vec<LinkId>> {
        let term = term.to_string();
        self.queue.run_sync(move |conn| search_links(conn, &term))
    }

    pub fn search_async(&self, term: impl Into<String>) -> Pending<Vec<LinkId>, SearchError> {
        let term = term.into();
        self.queue.submit(move |conn| search_links(conn, &term))
    }

    pub fn stats(&self) -> RepoResult<LinkStats> {
        self.queue.run_sync(|conn| LinkTable::new(conn).stats())
    }

    /// Per-day counts of links created during the last seven days.
    pub fn links_added_in_last_seven_days(&self) -> RepoResult<Vec<DailyCount>> {
        self.links_added_in_week_before(now_epoch_seconds())
    }

    /// Same as [`links_added_in_last_seven_days`](Self::links_added_in_last_seven_days)
    /// measured from `now` (seconds since the epoch).
    pub fn links_added_in_week_before(&self, now: i64) -> RepoResult<Vec<DailyCount>> {
        let since = now.saturating_sub(RECENT_WINDOW_DAYS * SECONDS_PER_DAY);
        self.queue
            .run_sync(move |conn| LinkTable::new(conn).added_per_day(since, RECENT_MAX_DAYS))
    }
}
