//! TradeForge Admin CLI
//!
//! Operator tooling for the tenant partitioning subsystem:
//! - Tenant signup (provision)
//! - Fleet-wide structural rollout (migrate-all)
//! - Migration repair (apply / baseline / rollback-mark)
//! - Destructive partition drop (super-admin only)

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tradeforge_common::{config::AppConfig, metrics, AppError, SharedDb, VERSION};
use tradeforge_tenancy::{
    fleet, FleetMigrator, MigrationRunner, PartitionId, PgConnectionRouter, Registry,
    TenantProvisioner, TenantStatus,
};

#[derive(Parser)]
#[command(name = "tradeforge-admin", version, about = "TradeForge tenant partition administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision a partition for a new tenant
    Provision {
        /// Organization display name, e.g. "Sirhame Shop"
        display_name: String,
    },

    /// List all registered tenants
    List,

    /// Update a tenant's lifecycle status
    SetStatus {
        /// Partition identifier
        partition: String,
        /// One of: trial, active, expired, blocked
        status: String,
    },

    /// Apply pending migrations to one partition
    Apply {
        /// Partition identifier
        partition: String,
    },

    /// Mark a migration as applied without executing it (repair)
    Baseline {
        /// Partition identifier
        partition: String,
        /// Migration version or name; defaults to the earliest unapplied
        #[arg(long)]
        migration: Option<String>,
    },

    /// Mark a migration as not applied so it re-runs (repair)
    RollbackMark {
        /// Partition identifier
        partition: String,
        /// Migration version or name
        migration: String,
    },

    /// Apply pending migrations to every registered tenant
    MigrateAll,

    /// Drop a partition and all its data (DESTRUCTIVE)
    DropPartition {
        /// Partition identifier
        partition: String,
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Services wired once at startup
struct Services {
    shared: SharedDb,
    registry: Registry,
    router: Arc<PgConnectionRouter>,
    runner: MigrationRunner,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting TradeForge Admin v{}", VERSION);

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize metrics
    metrics::register_metrics();

    // Initialize the shared connection and registry
    let shared = SharedDb::connect(&config.database).await?;

    let registry = Registry::new(shared.clone());
    registry.ensure_registry().await?;

    let services = Services {
        shared: shared.clone(),
        registry,
        router: Arc::new(PgConnectionRouter::from_config(config.database.clone())),
        runner: MigrationRunner::new(),
    };

    // Run the command, but tear down connections on interrupt too.
    let outcome = tokio::select! {
        result = run_command(cli.command, &services) => result,
        _ = shutdown_signal() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    // Release every partition handle and the shared connection before exit.
    services.router.teardown_all().await;
    shared.close().await?;

    outcome
}

async fn run_command(command: Command, services: &Services) -> anyhow::Result<()> {
    match command {
        Command::Provision { display_name } => {
            let provisioner = TenantProvisioner::new(
                services.shared.clone(),
                services.registry.clone(),
                services.router.clone(),
                services.runner.clone(),
            );

            match provisioner.provision(&display_name).await {
                Ok(tenant) => {
                    println!(
                        "Provisioned partition {} for tenant {}",
                        tenant.partition_id, tenant.tenant_id
                    );
                }
                Err(e) => {
                    if let Some(hint) = e.repair_hint() {
                        eprintln!("Repair hint: {hint}");
                    }
                    return Err(e.into());
                }
            }
        }

        Command::List => {
            let tenants = services.registry.list().await?;
            println!("{}", serde_json::to_string_pretty(&tenants)?);
        }

        Command::SetStatus { partition, status } => {
            let partition = PartitionId::parse(&partition)?;
            let status: TenantStatus = status.parse()?;

            let tenant = services
                .registry
                .find_by_partition(&partition)
                .await?
                .ok_or_else(|| AppError::TenantNotFound {
                    partition: partition.to_string(),
                })?;

            services.registry.update_status(tenant.id, status).await?;
            println!("Tenant {} is now {status}", partition);
        }

        Command::Apply { partition } => {
            let partition = PartitionId::parse(&partition)?;
            let handle = services.router.get(&partition).await?;

            if let Err(e) = services.runner.apply_pending(&handle, &partition).await {
                if let Some(hint) = e.repair_hint() {
                    eprintln!("Repair hint: {hint}");
                }
                return Err(e.into());
            }

            println!("Partition {partition} is up to date");
        }

        Command::Baseline { partition, migration } => {
            let partition = PartitionId::parse(&partition)?;
            let handle = services.router.get(&partition).await?;

            let version = services
                .runner
                .mark_baseline(&handle, &partition, migration.as_deref())
                .await?;

            println!("Baseline recorded at {version}; now run `apply {partition}`");
        }

        Command::RollbackMark { partition, migration } => {
            let partition = PartitionId::parse(&partition)?;
            let handle = services.router.get(&partition).await?;

            let version = services
                .runner
                .mark_rolled_back(&handle, &partition, &migration)
                .await?;

            println!("Cleared migration {version}; now run `apply {partition}`");
        }

        Command::MigrateAll => {
            let migrator = FleetMigrator::new(
                services.shared.clone(),
                services.registry.clone(),
                services.router.clone(),
                services.runner.clone(),
            );

            let reports = migrator.migrate_all().await?;
            let (succeeded, failed) = fleet::summarize(&reports);

            println!("{}", serde_json::to_string_pretty(&reports)?);
            println!("{succeeded} succeeded, {failed} failed");

            if failed > 0 {
                bail!("{failed} tenant(s) failed to migrate");
            }
        }

        Command::DropPartition { partition, yes } => {
            if !yes {
                bail!("refusing to drop a partition without --yes");
            }

            let partition = PartitionId::parse(&partition)?;
            let migrator = FleetMigrator::new(
                services.shared.clone(),
                services.registry.clone(),
                services.router.clone(),
                services.runner.clone(),
            );

            migrator.drop_partition(&partition).await?;
            println!("Dropped partition {partition}");
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
