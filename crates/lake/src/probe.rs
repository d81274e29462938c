use pvcat_catalog::{ExistenceProbe, ProbeError, SystemId};
use tracing::trace;

use crate::client::ObjectStore;
use crate::layout::pvdata_year_prefix;

/// Existence probe backed by a one-key listing of the time-series partition.
pub struct LakeProbe<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> LakeProbe<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        LakeProbe { store }
    }
}

impl ExistenceProbe for LakeProbe<'_> {
    fn has_data(&self, system_id: SystemId, year: i32) -> Result<bool, ProbeError> {
        let prefix = pvdata_year_prefix(system_id, year);
        let found = self
            .store
            .list(&prefix, Some(1))
            .map(|objects| !objects.is_empty())
            .map_err(|e| ProbeError(e.to_string()))?;
        trace!(system_id, year, found, "probe");
        Ok(found)
    }
}
