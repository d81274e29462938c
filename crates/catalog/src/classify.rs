use std::collections::BTreeMap;

use tracing::trace;

use crate::matcher::{match_descriptor, FragmentHit};
use crate::model::{Capability, CapabilityFlags, Evidence, MetricDescriptor, SourceKind, SystemId, SystemRecord};

/// Every capability each channel matches, in channel order.
pub fn channel_matches(descriptors: &[MetricDescriptor]) -> Vec<(Capability, FragmentHit)> {
    let mut matches = Vec::new();
    for descriptor in descriptors {
        for cap in Capability::ALL {
            if let Some(hit) = match_descriptor(descriptor, cap.fragment()) {
                trace!(
                    system_id = descriptor.system_id,
                    capability = %cap,
                    label = ?hit.label,
                    form = ?hit.form,
                    "channel matched"
                );
                matches.push((cap, hit));
            }
        }
    }
    matches
}

/// Capabilities evidenced by a set of channels: a capability is present if
/// any channel matches its fragment.
pub fn capabilities_of(descriptors: &[MetricDescriptor]) -> CapabilityFlags {
    let mut flags = CapabilityFlags::default();
    for (cap, _) in channel_matches(descriptors) {
        flags.set(cap);
    }
    flags
}

/// Evidence one source provides for one system.
///
/// `channels` is `None` when the source has no channel listing for the
/// system (a metadata document without `Metrics`).
///
/// - Prize systems always report irradiance.
/// - A metadata document without `Metrics` describes the standard output
///   schema, which is power only.
pub fn derive_evidence(source: SourceKind, channels: Option<&[MetricDescriptor]>) -> Evidence {
    let mut evidence = Evidence::default();
    evidence.sources.set(source);

    match channels {
        Some(descriptors) => evidence.capabilities = capabilities_of(descriptors),
        None if source != SourceKind::LakeParquet => evidence.capabilities.set(Capability::Power),
        None => {}
    }

    if source == SourceKind::Prize {
        evidence.capabilities.set(Capability::Irradiance);
    }

    evidence
}

/// Classify one system against one source, returning the updated record.
pub fn classify(
    record: &SystemRecord,
    channels: Option<&[MetricDescriptor]>,
    source: SourceKind,
) -> SystemRecord {
    record.merge(&derive_evidence(source, channels))
}

/// Group catalog rows by system.
pub fn group_by_system(rows: &[MetricDescriptor]) -> BTreeMap<SystemId, Vec<MetricDescriptor>> {
    let mut grouped: BTreeMap<SystemId, Vec<MetricDescriptor>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.system_id).or_default().push(row.clone());
    }
    grouped
}
