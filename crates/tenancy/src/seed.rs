//! Baseline reference data for a freshly provisioned partition
//!
//! A fixed catalog of department and job-position names, inserted right
//! after structural migration so the business UI is usable immediately.
//! No tenant-specific business data is seeded here.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use tracing::info;
use tradeforge_common::errors::Result;
use uuid::Uuid;

/// The fixed department catalog.
pub const DEPARTMENTS: [&str; 18] = [
    "Management",
    "Administration",
    "Finance",
    "Accounting",
    "Human Resources",
    "Sales",
    "Marketing",
    "Purchasing",
    "Warehouse",
    "Logistics",
    "Production",
    "Quality Assurance",
    "Maintenance",
    "Information Technology",
    "Customer Service",
    "Legal",
    "Research and Development",
    "Security",
];

/// The fixed job-position catalog.
pub const POSITIONS: [&str; 15] = [
    "Director",
    "General Manager",
    "Department Head",
    "Supervisor",
    "Team Lead",
    "Senior Staff",
    "Staff",
    "Junior Staff",
    "Intern",
    "Accountant",
    "Cashier",
    "Sales Associate",
    "Storekeeper",
    "Technician",
    "Driver",
];

/// Insert the reference catalog through a partition-scoped handle.
/// Idempotent: reruns after a partial provisioning failure are safe.
pub async fn seed_reference_data(handle: &DatabaseConnection) -> Result<()> {
    for name in DEPARTMENTS {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO departments (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
            vec![Uuid::new_v4().into(), name.into()],
        );
        handle.execute(stmt).await?;
    }

    for title in POSITIONS {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO positions (id, title) VALUES ($1, $2) ON CONFLICT (title) DO NOTHING",
            vec![Uuid::new_v4().into(), title.into()],
        );
        handle.execute(stmt).await?;
    }

    info!(
        departments = DEPARTMENTS.len(),
        positions = POSITIONS.len(),
        "Reference data seeded"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_department_catalog_has_18_entries() {
        assert_eq!(DEPARTMENTS.len(), 18);
    }

    #[test]
    fn test_catalogs_have_no_duplicates() {
        let departments: HashSet<_> = DEPARTMENTS.iter().collect();
        assert_eq!(departments.len(), DEPARTMENTS.len());

        let positions: HashSet<_> = POSITIONS.iter().collect();
        assert_eq!(positions.len(), POSITIONS.len());
    }

    #[test]
    fn test_catalog_entries_are_nonempty() {
        assert!(DEPARTMENTS.iter().all(|d| !d.trim().is_empty()));
        assert!(POSITIONS.iter().all(|p| !p.trim().is_empty()));
    }
}
