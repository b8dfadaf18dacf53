//! Fleet-wide migration and destructive admin operations
//!
//! `migrate_all` rolls a new structural version out to every registered
//! tenant, tolerating per-tenant failure: one broken partition never
//! blocks the rest of the fleet. `drop_partition` is the destructive
//! super-admin path; business-facing code never calls it.

use crate::connection::PgConnectionRouter;
use crate::identifier::PartitionId;
use crate::migrator::MigrationRunner;
use crate::registry::{Registry, Tenant};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tradeforge_common::errors::Result;
use tradeforge_common::{metrics, SharedDb};
use uuid::Uuid;

/// Per-tenant outcome of a fleet migration run
#[derive(Debug, Clone, Serialize)]
pub struct TenantMigrationReport {
    pub tenant_id: Uuid,
    pub partition_id: String,
    /// Engine diagnostic when the tenant's migration failed
    pub error: Option<String>,
}

impl TenantMigrationReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Count (succeeded, failed) across a run's reports
pub fn summarize(reports: &[TenantMigrationReport]) -> (usize, usize) {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    (succeeded, reports.len() - succeeded)
}

/// Applies pending structural changes across the whole fleet and owns
/// the destructive partition-drop path.
pub struct FleetMigrator {
    shared: SharedDb,
    registry: Registry,
    router: Arc<PgConnectionRouter>,
    runner: MigrationRunner,
}

impl FleetMigrator {
    pub fn new(
        shared: SharedDb,
        registry: Registry,
        router: Arc<PgConnectionRouter>,
        runner: MigrationRunner,
    ) -> Self {
        Self {
            shared,
            registry,
            router,
            runner,
        }
    }

    /// Apply pending migrations for every registered tenant.
    ///
    /// Always returns one report per tenant; failures are logged and
    /// recorded, never propagated out of the loop.
    #[instrument(skip(self))]
    pub async fn migrate_all(&self) -> Result<Vec<TenantMigrationReport>> {
        let tenants = self.registry.list().await?;

        let reports = run_fleet(tenants, |partition_id| async move {
            let partition = PartitionId::parse(&partition_id)?;
            let handle = self.router.get(&partition).await?;
            self.runner.apply_pending(&handle, &partition).await
        })
        .await;

        let (succeeded, failed) = summarize(&reports);
        info!(succeeded, failed, "Fleet migration run complete");

        Ok(reports)
    }

    /// Drop a partition and everything in it. Destructive; super-admin
    /// tooling only. Evicts the cached handle first so no live
    /// connection outlives its schema.
    #[instrument(skip(self), fields(partition = %partition))]
    pub async fn drop_partition(&self, partition: &PartitionId) -> Result<()> {
        self.router.evict(partition).await?;

        self.shared
            .conn()
            .execute_unprepared(&format!(r#"DROP SCHEMA IF EXISTS "{partition}" CASCADE"#))
            .await?;

        let removed = self.registry.delete_by_partition(partition).await?;
        if !removed {
            warn!("No registry row for dropped partition");
        }

        info!("Partition dropped");
        Ok(())
    }
}

/// Drive one migration attempt per tenant, in registry order.
///
/// A failing tenant is reported and logged, never propagated; the loop
/// always produces as many reports as it was given tenants.
async fn run_fleet<F, Fut>(tenants: Vec<Tenant>, apply: F) -> Vec<TenantMigrationReport>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut reports = Vec::with_capacity(tenants.len());

    for tenant in tenants {
        let outcome = apply(tenant.partition_id.clone()).await;

        metrics::record_fleet_migration(&tenant.partition_id, outcome.is_ok());

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    partition = %tenant.partition_id,
                    error = %e,
                    hint = e.repair_hint().unwrap_or("none"),
                    "Tenant migration failed; continuing with the rest of the fleet"
                );
                Some(e.to_string())
            }
        };

        reports.push(TenantMigrationReport {
            tenant_id: tenant.id,
            partition_id: tenant.partition_id,
            error,
        });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TenantStatus;
    use tradeforge_common::AppError;

    fn tenant(partition: &str) -> Tenant {
        let now = chrono::Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            display_name: partition.to_string(),
            partition_id: partition.to_string(),
            status: TenantStatus::Active,
            country: None,
            locale: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn report(partition: &str, error: Option<&str>) -> TenantMigrationReport {
        TenantMigrationReport {
            tenant_id: Uuid::new_v4(),
            partition_id: partition.to_string(),
            error: error.map(Into::into),
        }
    }

    #[test]
    fn test_summarize_counts_both_outcomes() {
        let reports = vec![
            report("acme", None),
            report("globex", Some("migration 2 is stuck")),
            report("initech", None),
        ];

        assert_eq!(summarize(&reports), (2, 1));
        assert_eq!(reports.len(), 3);
    }

    #[test]
    fn test_report_success_flag() {
        assert!(report("acme", None).is_success());
        assert!(!report("acme", Some("boom")).is_success());
    }

    #[tokio::test]
    async fn test_run_fleet_continues_past_a_failing_tenant() {
        let tenants = vec![tenant("acme"), tenant("globex"), tenant("initech")];
        let ids: Vec<Uuid> = tenants.iter().map(|t| t.id).collect();

        let reports = run_fleet(tenants, |partition_id| async move {
            if partition_id == "globex" {
                Err(AppError::MigrationStuck {
                    partition: partition_id,
                    version: 2,
                })
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(summarize(&reports), (2, 1));

        // Reports keep registry order and carry the tenant identity
        let report_ids: Vec<Uuid> = reports.iter().map(|r| r.tenant_id).collect();
        assert_eq!(report_ids, ids);

        let failed: Vec<_> = reports.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].partition_id, "globex");
        assert!(failed[0].error.as_deref().unwrap_or("").contains("stuck"));
    }

    #[tokio::test]
    async fn test_run_fleet_with_no_tenants_is_empty() {
        let reports = run_fleet(Vec::new(), |_| async move { Ok(()) }).await;
        assert!(reports.is_empty());
    }
}
