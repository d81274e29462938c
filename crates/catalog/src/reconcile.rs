use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CatalogError;
use crate::model::SystemId;

/// Outcome of cross-checking the catalog against the reference index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// In the metrics table, the systems table and the reference index.
    pub trusted_ids: BTreeSet<SystemId>,
    /// Fully described by the catalog but unknown to the reference index.
    pub orphan_ids: BTreeSet<SystemId>,
}

/// Cross-check catalog identity sets against the reference index.
///
/// A system with metrics but no systems row (or the reverse) is too
/// incomplete to use and is neither trusted nor an orphan. Orphans must be
/// exactly `expected_orphans`; anything else means the ID universe is
/// inconsistent and the run stops.
pub fn reconcile(
    reference_ids: &BTreeSet<SystemId>,
    catalog_metrics_ids: &BTreeSet<SystemId>,
    catalog_systems_ids: &BTreeSet<SystemId>,
    expected_orphans: &BTreeSet<SystemId>,
) -> Result<Reconciliation, CatalogError> {
    let catalog_full: BTreeSet<SystemId> = catalog_metrics_ids
        .intersection(catalog_systems_ids)
        .copied()
        .collect();

    let orphan_ids: BTreeSet<SystemId> = catalog_full.difference(reference_ids).copied().collect();
    if &orphan_ids != expected_orphans {
        return Err(CatalogError::IdentityMismatch {
            expected: expected_orphans.clone(),
            actual: orphan_ids,
        });
    }

    let trusted_ids = catalog_full.intersection(reference_ids).copied().collect();

    Ok(Reconciliation {
        trusted_ids,
        orphan_ids,
    })
}
