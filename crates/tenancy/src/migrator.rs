//! Migration runner
//!
//! Orchestrates the structural-migration engine (sqlx's embedded migrator)
//! against a partition-scoped connection. Supports forward apply plus the
//! two operator repair operations:
//!
//! - baseline-mark: record a migration as applied without executing it,
//!   for partitions that already contain the tables (restored from backup)
//!   but carry no history;
//! - rollback-mark: record a migration as not applied so it re-runs
//!   cleanly, for migrations left half-applied by a crash.
//!
//! Repairs are operator-triggered only. Apply failures are classified by
//! engine signature so diagnostics point at the matching repair, but
//! nothing here ever invokes a repair automatically.

use crate::identifier::PartitionId;
use sea_orm::DatabaseConnection;
use sqlx::migrate::{MigrateError, Migration, Migrator};
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use tradeforge_common::errors::{AppError, Result};

/// The tenant-schema migration manifest, embedded at compile time.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLSTATE codes meaning "object already exists": the signature of a
/// migration attempted against a non-empty, history-less partition.
const DUPLICATE_OBJECT_CODES: &[&str] = &["42P07", "42710", "42701", "42P06"];

/// Runs the structural-migration engine against partition-scoped handles.
#[derive(Clone, Default)]
pub struct MigrationRunner;

impl MigrationRunner {
    pub fn new() -> Self {
        Self
    }

    /// The embedded migration manifest, in apply order.
    pub fn manifest(&self) -> impl Iterator<Item = &'static Migration> {
        MIGRATOR.iter()
    }

    /// Apply every migration not yet recorded for this partition, in
    /// fixed version order. Callers own any timeout policy; large
    /// partitions can take a while.
    #[instrument(skip(self, handle), fields(partition = %partition))]
    pub async fn apply_pending(
        &self,
        handle: &DatabaseConnection,
        partition: &PartitionId,
    ) -> Result<()> {
        let pool = handle.get_postgres_connection_pool();

        MIGRATOR
            .run(pool)
            .await
            .map_err(|e| classify_apply_error(partition, e))?;

        info!("Partition is at the current structural version");
        Ok(())
    }

    /// Mark one migration as already applied without executing it.
    ///
    /// With no explicit name, the baseline point is the earliest
    /// unapplied migration in the manifest. Must be followed by
    /// `apply_pending` to pick up everything after the baseline.
    /// Returns the version that was marked.
    #[instrument(skip(self, handle), fields(partition = %partition))]
    pub async fn mark_baseline(
        &self,
        handle: &DatabaseConnection,
        partition: &PartitionId,
        name: Option<&str>,
    ) -> Result<i64> {
        let pool = handle.get_postgres_connection_pool();

        ensure_history_table(pool).await?;
        let applied = applied_versions(pool).await?;

        let migration = match name {
            Some(name) => resolve_migration(name)?,
            None => earliest_unapplied(&applied).ok_or_else(|| AppError::Internal {
                message: "every migration in the manifest is already recorded".into(),
            })?,
        };

        if applied.contains(&migration.version) {
            warn!(version = migration.version, "Migration already recorded; baseline is a no-op");
            return Ok(migration.version);
        }

        sqlx::query(
            r#"
            INSERT INTO _sqlx_migrations
                (version, description, installed_on, success, checksum, execution_time)
            VALUES ($1, $2, NOW(), TRUE, $3, 0)
            ON CONFLICT (version) DO NOTHING
            "#,
        )
        .bind(migration.version)
        .bind(migration.description.as_ref())
        .bind(migration.checksum.as_ref())
        .execute(pool)
        .await?;

        info!(version = migration.version, "Baseline recorded");
        Ok(migration.version)
    }

    /// Mark one migration as not applied so it can re-run cleanly.
    /// Must be followed by `apply_pending`. Returns the version cleared.
    #[instrument(skip(self, handle), fields(partition = %partition))]
    pub async fn mark_rolled_back(
        &self,
        handle: &DatabaseConnection,
        partition: &PartitionId,
        name: &str,
    ) -> Result<i64> {
        let pool = handle.get_postgres_connection_pool();
        let migration = resolve_migration(name)?;

        ensure_history_table(pool).await?;

        let result = sqlx::query("DELETE FROM _sqlx_migrations WHERE version = $1")
            .bind(migration.version)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(version = migration.version, "No history row to clear; rollback-mark is a no-op");
        } else {
            info!(version = migration.version, "Migration marked rolled back");
        }

        Ok(migration.version)
    }
}

/// Map an engine failure onto the error taxonomy by signature.
fn classify_apply_error(partition: &PartitionId, err: MigrateError) -> AppError {
    match err {
        // Recorded as started but never finished: the stuck-migration
        // signature. Repair: rollback-mark, then apply.
        MigrateError::Dirty(version) => AppError::MigrationStuck {
            partition: partition.to_string(),
            version,
        },

        // Objects already present with no matching history: the
        // missing-baseline signature. Repair: baseline, then apply.
        MigrateError::ExecuteMigration(ref source, version)
            if is_duplicate_object(source) =>
        {
            AppError::BaselineRequired {
                partition: partition.to_string(),
                version,
            }
        }

        // Everything else surfaces with the full engine diagnostic.
        other => AppError::MigrationApplyFailure {
            partition: partition.to_string(),
            detail: other.to_string(),
        },
    }
}

fn is_duplicate_object(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| DUPLICATE_OBJECT_CODES.contains(&code.as_ref()))
        .unwrap_or(false)
}

/// Resolve an operator-supplied migration name against the manifest.
/// Accepts the numeric version, the full file stem, or the description
/// (underscores and spaces are equivalent).
fn resolve_migration(name: &str) -> Result<&'static Migration> {
    let wanted = normalize_name(name);

    MIGRATOR
        .iter()
        .find(|m| {
            m.version.to_string() == wanted
                || normalize_name(&m.description) == wanted
                || format!("{} {}", m.version, normalize_name(&m.description)) == wanted
        })
        .ok_or_else(|| AppError::MigrationNotFound {
            name: name.to_string(),
        })
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

/// Earliest manifest entry with no applied record. The manifest is kept
/// in version order by the engine.
fn earliest_unapplied(applied: &HashSet<i64>) -> Option<&'static Migration> {
    MIGRATOR.iter().find(|m| !applied.contains(&m.version))
}

/// Create the engine's own history table when repairing a partition that
/// has never seen a successful apply. Mirrors the engine's DDL exactly.
async fn ensure_history_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _sqlx_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            installed_on TIMESTAMPTZ NOT NULL DEFAULT now(),
            success BOOLEAN NOT NULL,
            checksum BYTEA NOT NULL,
            execution_time BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn applied_versions(pool: &PgPool) -> Result<HashSet<i64>> {
    let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = TRUE")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get::<i64, _>("version")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_is_ordered_and_nonempty() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_resolve_by_version() {
        let first = MIGRATOR.iter().next().unwrap();
        let found = resolve_migration(&first.version.to_string()).unwrap();
        assert_eq!(found.version, first.version);
    }

    #[test]
    fn test_resolve_by_description() {
        let first = MIGRATOR.iter().next().unwrap();
        let found = resolve_migration(first.description.as_ref()).unwrap();
        assert_eq!(found.version, first.version);

        // Underscores and spaces are interchangeable
        let underscored = first.description.replace(' ', "_");
        let found = resolve_migration(&underscored).unwrap();
        assert_eq!(found.version, first.version);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = resolve_migration("no_such_migration").unwrap_err();
        assert!(matches!(err, AppError::MigrationNotFound { .. }));
    }

    #[test]
    fn test_earliest_unapplied_walks_the_manifest() {
        let all: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        let none_applied = HashSet::new();
        assert_eq!(earliest_unapplied(&none_applied).unwrap().version, all[0]);

        let first_applied: HashSet<i64> = all.iter().take(1).copied().collect();
        assert_eq!(earliest_unapplied(&first_applied).unwrap().version, all[1]);

        let everything: HashSet<i64> = all.iter().copied().collect();
        assert!(earliest_unapplied(&everything).is_none());
    }

    #[test]
    fn test_classify_dirty_as_stuck() {
        let partition = PartitionId::parse("acme").unwrap();
        let err = classify_apply_error(&partition, MigrateError::Dirty(42));
        match err {
            AppError::MigrationStuck { version, .. } => assert_eq!(version, 42),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_classify_unknown_as_apply_failure() {
        let partition = PartitionId::parse("acme").unwrap();
        let err = classify_apply_error(&partition, MigrateError::VersionMissing(7));
        match err {
            AppError::MigrationApplyFailure { detail, .. } => {
                assert!(detail.contains('7'), "diagnostic should carry the version: {detail}")
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
