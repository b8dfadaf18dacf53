//! Partition provisioning
//!
//! Orchestrates tenant signup: normalize the display name, claim the
//! identifier in the registry, create the physical schema, bring it to
//! the current structural version, seed reference data. Each step gates
//! the next; the registry insert is the serialization point between
//! concurrent signups for the same name.
//!
//! A failure after registration leaves the partition in a recoverable
//! but unusable intermediate state. It is deliberately not rolled back:
//! dropping a partition is destructive and stays a human decision.
//! Recovery goes through the migration runner's repair operations.

use crate::connection::PgConnectionRouter;
use crate::identifier::PartitionId;
use crate::migrator::MigrationRunner;
use crate::registry::Registry;
use crate::seed;
use sea_orm::ConnectionTrait;
use std::sync::Arc;
use tracing::{error, info, instrument};
use tradeforge_common::errors::Result;
use tradeforge_common::{metrics, SharedDb};
use uuid::Uuid;

/// Outcome of a successful provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionedTenant {
    pub tenant_id: Uuid,
    pub partition_id: PartitionId,
}

/// Provisions isolated partitions for new tenants.
pub struct TenantProvisioner {
    shared: SharedDb,
    registry: Registry,
    router: Arc<PgConnectionRouter>,
    runner: MigrationRunner,
}

impl TenantProvisioner {
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

    /// Provision a partition for a new tenant, end to end.
    pub async fn provision(&self, display_name: &str) -> Result<ProvisionedTenant> {
        let result = self.provision_inner(display_name).await;
        metrics::record_provision(result.is_ok());
        result
    }

    #[instrument(skip(self))]
    async fn provision_inner(&self, display_name: &str) -> Result<ProvisionedTenant> {
        // Step 1: normalize and claim the identifier. The registry's
        // uniqueness constraint decides the winner between concurrent
        // signups; a loser gets DuplicatePartition and no partition.
        let partition = PartitionId::normalize(display_name)?;
        let tenant = self.registry.register(display_name, &partition).await?;

        info!(partition = %partition, tenant_id = %tenant.id, "Tenant registered");

        // Step 2: create the empty schema. Idempotent, so a re-run after
        // a downstream failure picks up where it left off.
        self.create_partition(&partition).await?;

        // Steps 3 and 4: migrate, then seed, through the same cached
        // handle every later business request will use.
        let handle = self.router.get(&partition).await?;

        self.runner
            .apply_pending(&handle, &partition)
            .await
            .inspect_err(|e| {
                if let Some(hint) = e.repair_hint() {
                    error!(partition = %partition, error = %e, hint, "Provisioning halted mid-migration");
                }
            })?;

        seed::seed_reference_data(&handle).await?;

        info!(partition = %partition, "Partition provisioned");

        Ok(ProvisionedTenant {
            tenant_id: tenant.id,
            partition_id: partition,
        })
    }

    /// Create the named schema if it does not already exist.
    ///
    /// The identifier is interpolated into DDL; `PartitionId`'s grammar
    /// is the injection defense, enforced by construction before any
    /// value can reach this point.
    async fn create_partition(&self, partition: &PartitionId) -> Result<()> {
        self.shared
            .conn()
            .execute_unprepared(&format!(r#"CREATE SCHEMA IF NOT EXISTS "{partition}""#))
            .await?;

        info!(partition = %partition, "Schema created");
        Ok(())
    }
}
