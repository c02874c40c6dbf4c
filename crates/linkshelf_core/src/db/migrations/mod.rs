//! Versioned migration registry and runner.
//!
//! # Responsibility
//! - Hold migration scripts in strictly increasing version order.
//! - Apply every script newer than the recorded schema version through the
//!   serialized queue, one statement per unit of work.
//!
//! # Invariants
//! - A script's last statement records its own version in `migrations`.
//! - Statements already applied by a failing script are not rolled back; the
//!   script stays unrecorded and is retried on next open, so scripts must be
//!   safe to re-run.
//! - With nothing pending, the runner executes no statement beyond the
//!   version lookup.

mod builtin;

use crate::db::{DbError, DbResult, SerialQueue};
use crate::repo::migration_repo::MigrationTable;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::time::Instant;

/// One versioned migration script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    version: i64,
    statements: Vec<String>,
}

impl Migration {
    /// Creates a script from ordered statements.
    ///
    /// # Panics
    /// Panics when the script is empty or its last statement does not insert
    /// `version` into `migrations`.
    pub fn new<I, S>(version: i64, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let statements = statements.into_iter().map(Into::into).collect::<Vec<_>>();
        assert!(
            statements
                .last()
                .is_some_and(|last| records_version(last, version)),
            "migration {version} must end with an insert of its version into `migrations`"
        );
        Self {
            version,
            statements,
        }
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

fn records_version(statement: &str, version: i64) -> bool {
    let normalized = statement
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    normalized.starts_with("insert")
        && normalized.contains("into migrations")
        && normalized.contains(&version.to_string())
}

/// Ordered collection of migration scripts keyed by version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSet {
    scripts: BTreeMap<i64, Migration>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts shipped with this build.
    pub fn builtin() -> Self {
        builtin::migrations()
            .into_iter()
            .fold(Self::new(), |set, migration| set.with(migration))
    }

    /// Adds a script.
    ///
    /// # Panics
    /// Panics when a script with the same version is already registered.
    pub fn with(mut self, migration: Migration) -> Self {
        let version = migration.version;
        let previous = self.scripts.insert(version, migration);
        assert!(previous.is_none(), "duplicate migration version {version}");
        self
    }

    /// Returns the newest version known to this set, or 0 when empty.
    pub fn latest_version(&self) -> i64 {
        self.scripts.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Scripts strictly newer than `version`, ascending.
    pub fn pending_after(&self, version: i64) -> impl Iterator<Item = &Migration> {
        self.scripts
            .range((std::ops::Bound::Excluded(version), std::ops::Bound::Unbounded))
            .map(|(_, migration)| migration)
    }
}

/// Outcome of one runner pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Recorded version before the pass (0 when none).
    pub from_version: i64,
    /// Recorded version after the pass.
    pub to_version: i64,
    /// Versions applied during this pass, ascending.
    pub applied: Vec<i64>,
    /// Script statements executed; excludes the version lookup.
    pub statements_executed: usize,
}

/// Applies pending scripts from a [`MigrationSet`].
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    set: MigrationSet,
}

impl MigrationRunner {
    pub fn new(set: MigrationSet) -> Self {
        Self { set }
    }

    /// Brings the database up to the newest script in the set.
    ///
    /// # Errors
    /// Returns the classified error of the first failing statement. Scripts
    /// applied before it stay recorded.
    pub fn run(&self, queue: &SerialQueue) -> DbResult<MigrationReport> {
        let started_at = Instant::now();
        let from_version =
            queue.run_sync(|conn| MigrationTable::new(conn).max_version())?;
        let latest = self.set.latest_version();

        if from_version > latest {
            warn!(
                "event=migration_run module=migrations status=skipped db_version={from_version} latest_known={latest}"
            );
        }

        let mut report = MigrationReport {
            from_version,
            to_version: from_version,
            ..MigrationReport::default()
        };

        for migration in self.set.pending_after(from_version) {
            let version = migration.version;
            for statement in migration.statements() {
                let statement = statement.clone();
                let result: DbResult<()> = queue.run_sync(move |conn| {
                    conn.execute_batch(&statement).map_err(DbError::from)
                });
                if let Err(err) = result {
                    error!(
                        "event=migration_apply module=migrations status=error version={version} statements_executed={} error={err}",
                        report.statements_executed
                    );
                    return Err(err);
                }
                report.statements_executed += 1;
            }
            info!("event=migration_apply module=migrations status=ok version={version}");
            report.applied.push(version);
            report.to_version = version;
        }

        info!(
            "event=migration_run module=migrations status=ok from_version={} to_version={} applied={} duration_ms={}",
            report.from_version,
            report.to_version,
            report.applied.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}
