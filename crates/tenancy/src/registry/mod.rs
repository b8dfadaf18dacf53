//! Tenant registry
//!
//! One row per tenant in the shared/public schema; the source of truth for
//! which partitions exist. Uniqueness of the partition identifier is
//! enforced by the database constraint, not by an application-level check,
//! so two concurrent signups for the same name always yield exactly one
//! winner.

pub mod tenant;

use crate::identifier::PartitionId;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ConnectionTrait, QueryOrder, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tradeforge_common::errors::{AppError, Result};
use tradeforge_common::SharedDb;
use uuid::Uuid;

pub use tenant::Model as Tenant;

/// Tenant lifecycle status. Mutated by subscription/billing logic; the
/// tenancy subsystem only reads it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[sea_orm(string_value = "trial")]
    Trial,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "blocked")]
    Blocked,
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenantStatus::Trial => "trial",
            TenantStatus::Active => "active",
            TenantStatus::Expired => "expired",
            TenantStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

impl FromStr for TenantStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trial" => Ok(TenantStatus::Trial),
            "active" => Ok(TenantStatus::Active),
            "expired" => Ok(TenantStatus::Expired),
            "blocked" => Ok(TenantStatus::Blocked),
            other => Err(AppError::Configuration {
                message: format!("unknown tenant status: {other}"),
            }),
        }
    }
}

/// Registry service over the shared connection
#[derive(Clone)]
pub struct Registry {
    db: SharedDb,
}

impl Registry {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Create the registry table if it does not exist. Runs once at
    /// startup against the shared connection.
    pub async fn ensure_registry(&self) -> Result<()> {
        self.db
            .conn()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS public.tenants (
                    id           UUID PRIMARY KEY,
                    display_name TEXT NOT NULL,
                    partition_id TEXT NOT NULL UNIQUE,
                    status       TEXT NOT NULL DEFAULT 'trial'
                                 CHECK (status IN ('trial', 'active', 'expired', 'blocked')),
                    country      TEXT,
                    locale       TEXT,
                    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .await?;

        Ok(())
    }

    /// Register a new tenant.
    ///
    /// Fails with `DuplicatePartition` when the normalized identifier is
    /// already taken, as reported by the uniqueness constraint. This is
    /// the serialization point between concurrent signups.
    pub async fn register(
        &self,
        display_name: &str,
        partition: &PartitionId,
    ) -> Result<Tenant> {
        let now = chrono::Utc::now();

        let row = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            display_name: Set(display_name.trim().to_string()),
            partition_id: Set(partition.as_str().to_string()),
            status: Set(TenantStatus::Trial),
            country: Set(None),
            locale: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        row.insert(self.db.conn()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::DuplicatePartition {
                    partition: partition.to_string(),
                }
            } else {
                AppError::Database(e)
            }
        })
    }

    /// List all registered tenants
    pub async fn list(&self) -> Result<Vec<Tenant>> {
        tenant::Entity::find()
            .order_by_asc(tenant::Column::CreatedAt)
            .all(self.db.conn())
            .await
            .map_err(Into::into)
    }

    /// Find a tenant by partition identifier
    pub async fn find_by_partition(&self, partition: &PartitionId) -> Result<Option<Tenant>> {
        tenant::Entity::find()
            .filter(tenant::Column::PartitionId.eq(partition.as_str()))
            .one(self.db.conn())
            .await
            .map_err(Into::into)
    }

    /// Update a tenant's lifecycle status
    pub async fn update_status(&self, tenant_id: Uuid, status: TenantStatus) -> Result<Tenant> {
        let mut row: tenant::ActiveModel = tenant::Entity::find_by_id(tenant_id)
            .one(self.db.conn())
            .await?
            .ok_or_else(|| AppError::TenantNotFound {
                partition: tenant_id.to_string(),
            })?
            .into();

        row.status = Set(status);
        row.updated_at = Set(chrono::Utc::now().into());

        row.update(self.db.conn()).await.map_err(Into::into)
    }

    /// Delete a tenant record. Destructive; only called from the
    /// drop-partition path, which also drops the physical schema.
    pub async fn delete_by_partition(&self, partition: &PartitionId) -> Result<bool> {
        let result = tenant::Entity::delete_many()
            .filter(tenant::Column::PartitionId.eq(partition.as_str()))
            .exec(self.db.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TenantStatus::Trial,
            TenantStatus::Active,
            TenantStatus::Expired,
            TenantStatus::Blocked,
        ] {
            let parsed: TenantStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert!("suspended".parse::<TenantStatus>().is_err());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(serde_json::to_string(&TenantStatus::Trial).unwrap(), "\"trial\"");
        let back: TenantStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(back, TenantStatus::Blocked);
    }
}
