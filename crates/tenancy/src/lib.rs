//! TradeForge Tenancy Library
//!
//! The tenant partitioning and connection-routing subsystem:
//! - Identifier normalization (display name -> partition identifier)
//! - Tenant registry in the shared/public schema
//! - Partition provisioning (create, migrate, seed)
//! - Migration runner with operator repair operations
//! - Process-wide partition connection router/cache
//! - Fleet-wide bulk migration and destructive admin operations
//!
//! Business services never see more than one partition: every data access
//! goes through a connection handle resolved by the router for exactly one
//! partition identifier.

pub mod connection;
pub mod fleet;
pub mod identifier;
pub mod migrator;
pub mod provisioner;
pub mod registry;
pub mod seed;

// Re-export the subsystem surface
pub use connection::{ConnectionRouter, PartitionConnector, PgConnectionRouter, PgPartitionConnector};
pub use fleet::{FleetMigrator, TenantMigrationReport};
pub use identifier::PartitionId;
pub use migrator::MigrationRunner;
pub use provisioner::{ProvisionedTenant, TenantProvisioner};
pub use registry::{Registry, TenantStatus};
