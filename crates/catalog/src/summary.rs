use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classify::channel_matches;
use crate::first_year::{Resolution, ResolutionStatus};
use crate::matcher::HitForm;
use crate::model::{Capability, MetricDescriptor, RecordSet, SourceKind, SystemId};

/// Per-stage observations collected while the driver runs.
#[derive(Debug, Clone, Default)]
pub struct StageNotes {
    pub trusted_catalog_systems: usize,
    pub orphans: BTreeSet<SystemId>,
    /// Systems a source lists that the reference index does not know.
    pub unknown_ids: BTreeMap<SourceKind, BTreeSet<SystemId>>,
    /// Documents without `Metrics` that fell back to power only.
    pub power_fallbacks: BTreeSet<SystemId>,
    /// Documents whose first timestamp could not be used.
    pub bad_timestamps: BTreeSet<SystemId>,
    pub resolutions: Vec<Resolution>,
    pub channel_hits: BTreeMap<Capability, HitCounts>,
}

impl StageNotes {
    /// Count how each channel of a classified listing matched.
    pub fn count_matches(&mut self, descriptors: &[MetricDescriptor]) {
        for (cap, hit) in channel_matches(descriptors) {
            self.channel_hits.entry(cap).or_default().add(hit.form);
        }
    }
}

/// Channel matches per capability, split by how the fragment occurred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitCounts {
    /// `_<fragment>` inside the label, e.g. `inv1_power`.
    pub suffix: usize,
    pub substring: usize,
}

impl HitCounts {
    fn add(&mut self, form: HitForm) {
        match form {
            HitForm::Suffix => self.suffix += 1,
            HitForm::Substring => self.substring += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_systems: usize,
    pub flag_counts: BTreeMap<String, usize>,
    pub trusted_catalog_systems: usize,
    pub orphans: Vec<SystemId>,
    pub unknown_ids: BTreeMap<String, Vec<SystemId>>,
    pub power_fallbacks: Vec<SystemId>,
    pub bad_timestamps: Vec<SystemId>,
    /// Keyed by capability column.
    pub channel_hits: BTreeMap<String, HitCounts>,
    pub first_year: FirstYearSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirstYearSummary {
    pub probed: usize,
    pub confirmed: usize,
    pub corrected: usize,
    pub exhausted: Vec<SystemId>,
    pub probe_failed: Vec<SystemId>,
}

/// Compute summary statistics from the final records and stage notes.
pub fn compute_summary(records: &RecordSet, notes: &StageNotes) -> RunSummary {
    let mut flag_counts: BTreeMap<String, usize> = BTreeMap::new();
    for source in SourceKind::ALL {
        flag_counts.insert(source.column().to_string(), 0);
    }
    for cap in Capability::ALL {
        flag_counts.insert(cap.column().to_string(), 0);
    }

    for r in records.values() {
        for source in SourceKind::ALL {
            if r.sources.get(source) {
                *flag_counts.entry(source.column().to_string()).or_insert(0) += 1;
            }
        }
        for cap in Capability::ALL {
            if r.capabilities.get(cap) {
                *flag_counts.entry(cap.column().to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut first_year = FirstYearSummary {
        probed: notes.resolutions.len(),
        ..FirstYearSummary::default()
    };
    for res in &notes.resolutions {
        match res.status {
            ResolutionStatus::Confirmed => {
                first_year.confirmed += 1;
                if res.year != res.hinted_year {
                    first_year.corrected += 1;
                }
            }
            ResolutionStatus::Exhausted => first_year.exhausted.push(res.system_id),
            ResolutionStatus::ProbeFailed => first_year.probe_failed.push(res.system_id),
        }
    }

    RunSummary {
        total_systems: records.len(),
        flag_counts,
        trusted_catalog_systems: notes.trusted_catalog_systems,
        orphans: notes.orphans.iter().copied().collect(),
        unknown_ids: notes
            .unknown_ids
            .iter()
            .map(|(source, ids)| (source.to_string(), ids.iter().copied().collect()))
            .collect(),
        power_fallbacks: notes.power_fallbacks.iter().copied().collect(),
        bad_timestamps: notes.bad_timestamps.iter().copied().collect(),
        channel_hits: Capability::ALL
            .iter()
            .map(|cap| {
                let counts = notes.channel_hits.get(cap).copied().unwrap_or_default();
                (cap.column().to_string(), counts)
            })
            .collect(),
        first_year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SystemRecord;

    fn resolution(system_id: SystemId, hinted_year: i32, year: i32, status: ResolutionStatus) -> Resolution {
        Resolution {
            system_id,
            hinted_year,
            year,
            status,
            probes: 1,
        }
    }

    #[test]
    fn summary_counts() {
        let mut records = RecordSet::new();
        let mut a = SystemRecord::new(1, None);
        a.sources.set(SourceKind::Prize);
        a.capabilities.set(Capability::Irradiance);
        let mut b = SystemRecord::new(2, None);
        b.capabilities.set(Capability::Irradiance);
        b.capabilities.set(Capability::Power);
        records.insert(1, a);
        records.insert(2, b);
        records.insert(3, SystemRecord::new(3, None));

        let notes = StageNotes {
            resolutions: vec![
                resolution(1, 2010, 2010, ResolutionStatus::Confirmed),
                resolution(2, 2010, 2012, ResolutionStatus::Confirmed),
                resolution(3, 2020, 2023, ResolutionStatus::Exhausted),
            ],
            ..StageNotes::default()
        };

        let summary = compute_summary(&records, &notes);
        assert_eq!(summary.total_systems, 3);
        assert_eq!(summary.flag_counts["has_irrad_data"], 2);
        assert_eq!(summary.flag_counts["has_power_data"], 1);
        assert_eq!(summary.flag_counts["is_prize_data"], 1);
        assert_eq!(summary.flag_counts["has_some_temp_data"], 0);
        assert_eq!(summary.first_year.probed, 3);
        assert_eq!(summary.first_year.confirmed, 2);
        assert_eq!(summary.first_year.corrected, 1);
        assert_eq!(summary.first_year.exhausted, vec![3]);
        assert_eq!(summary.channel_hits["has_power_data"], HitCounts::default());
    }

    #[test]
    fn channel_hits_split_by_form() {
        let channel = |sensor: &str, common: &str| MetricDescriptor {
            system_id: 1,
            key: None,
            sensor_name: Some(sensor.into()),
            common_name: Some(common.into()),
        };
        let mut notes = StageNotes::default();
        notes.count_matches(&[channel("inv1_power", "AC Power"), channel("ghi", "GHI Irradiance")]);
        notes.count_matches(&[channel("acpower", "Power")]);

        let summary = compute_summary(&RecordSet::new(), &notes);
        assert_eq!(summary.channel_hits["has_power_data"], HitCounts { suffix: 1, substring: 1 });
        assert_eq!(summary.channel_hits["has_irrad_data"], HitCounts { suffix: 0, substring: 1 });
        assert_eq!(summary.channel_hits.len(), 4);
    }
}
