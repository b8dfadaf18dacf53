//! Metrics and observability utilities
//!
//! Provides metric registration and recording helpers with
//! standardized naming conventions.

use metrics::{counter, describe_counter, Unit};

/// Metrics prefix for all TradeForge metrics
pub const METRICS_PREFIX: &str = "tradeforge";

/// Register all metric descriptions
pub fn register_metrics() {
    // Provisioning metrics
    describe_counter!(
        format!("{}_tenants_provisioned_total", METRICS_PREFIX),
        Unit::Count,
        "Total tenant partitions provisioned"
    );

    describe_counter!(
        format!("{}_provision_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total provisioning attempts that failed"
    );

    // Fleet migration metrics
    describe_counter!(
        format!("{}_fleet_migrations_total", METRICS_PREFIX),
        Unit::Count,
        "Per-tenant outcomes of fleet-wide migration runs"
    );

    // Connection router metrics
    describe_counter!(
        format!("{}_router_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Partition connection cache hits"
    );

    describe_counter!(
        format!("{}_router_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Partition connection cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Record a provisioning outcome
pub fn record_provision(success: bool) {
    if success {
        counter!(format!("{}_tenants_provisioned_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_provision_failures_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record one per-tenant outcome of a fleet migration run
pub fn record_fleet_migration(partition: &str, success: bool) {
    let status = if success { "success" } else { "failure" };

    counter!(
        format!("{}_fleet_migrations_total", METRICS_PREFIX),
        "partition" => partition.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a router cache lookup
pub fn record_cache(hit: bool) {
    if hit {
        counter!(format!("{}_router_cache_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_router_cache_misses_total", METRICS_PREFIX)).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_helpers_run() {
        // No recorder installed in tests; helpers must still be safe to call.
        record_provision(true);
        record_provision(false);
        record_fleet_migration("acme", true);
        record_cache(true);
        record_cache(false);
    }
}
