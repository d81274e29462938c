use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::classify::{derive_evidence, group_by_system};
use crate::config::{CatalogConfig, ProbeScope};
use crate::error::CatalogError;
use crate::first_year::{resolve_first_year, ExistenceProbe, ResolutionStatus};
use crate::metadata::MetadataDocument;
use crate::model::{
    CatalogInput, CatalogMeta, CatalogResult, CatalogTables, Evidence, RecordSet, SourceKind, SystemId,
};
use crate::reconcile::reconcile;
use crate::summary::{compute_summary, StageNotes};

/// Evidence gathered by one stage, keyed by system.
pub type StageEvidence = BTreeMap<SystemId, Evidence>;

/// Run every stage over the loaded sources. Returns enriched records + summary.
///
/// Stages run prize → catalog → CSV metadata. Each produces evidence that is
/// merged into a fresh record set; no stage clears what an earlier one set.
/// Without a probe, first years are not corrected.
pub fn run(
    config: &CatalogConfig,
    input: &CatalogInput,
    probe: Option<&dyn ExistenceProbe>,
) -> Result<CatalogResult, CatalogError> {
    let mut notes = StageNotes::default();

    let prize = prize_stage(config, &input.reference, &input.prize, &mut notes);
    let records = apply(&input.reference, &prize);
    info!(systems = prize.len(), "prize stage done");

    let catalog = catalog_stage(config, &records, &input.catalog, probe, &mut notes)?;
    let records = apply(&records, &catalog);
    info!(
        systems = catalog.len(),
        probed = notes.resolutions.len(),
        "catalog stage done"
    );

    let csv = document_stage(SourceKind::LakeCsv, &records, &input.csv, &mut notes);
    let records = apply(&records, &csv);
    info!(systems = csv.len(), "csv metadata stage done");

    let summary = compute_summary(&records, &notes);

    Ok(CatalogResult {
        meta: CatalogMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            horizon: config.first_year.horizon,
        },
        summary,
        records,
    })
}

/// Merge a stage's evidence into a new record set. Evidence for systems
/// outside the record set is ignored.
pub fn apply(records: &RecordSet, evidence: &StageEvidence) -> RecordSet {
    records
        .iter()
        .map(|(id, record)| {
            let updated = match evidence.get(id) {
                Some(ev) => record.merge(ev),
                None => record.clone(),
            };
            (*id, updated)
        })
        .collect()
}

/// Every configured prize system is prize data and reports irradiance, with
/// or without a metadata document.
pub fn prize_stage(
    config: &CatalogConfig,
    records: &RecordSet,
    documents: &BTreeMap<SystemId, MetadataDocument>,
    notes: &mut StageNotes,
) -> StageEvidence {
    let mut evidence = StageEvidence::new();

    for system_id in config.prize.ids() {
        if !records.contains_key(&system_id) {
            warn!(system_id, "prize system not in reference index, skipping");
            notes
                .unknown_ids
                .entry(SourceKind::Prize)
                .or_default()
                .insert(system_id);
            continue;
        }
        let ev = match documents.get(&system_id) {
            Some(doc) => document_evidence(SourceKind::Prize, system_id, doc, notes),
            None => {
                warn!(system_id, "no prize metadata document, flagging from config only");
                derive_evidence(SourceKind::Prize, Some(&[]))
            }
        };
        evidence.insert(system_id, ev);
    }

    for system_id in documents.keys() {
        if !config.prize.systems.iter().any(|s| s.id == *system_id) {
            debug!(system_id, "prize document for unlisted system ignored");
        }
    }

    evidence
}

/// Cross-check the catalog, flag trusted systems, and correct first years
/// through the probe.
pub fn catalog_stage(
    config: &CatalogConfig,
    records: &RecordSet,
    catalog: &CatalogTables,
    probe: Option<&dyn ExistenceProbe>,
    notes: &mut StageNotes,
) -> Result<StageEvidence, CatalogError> {
    let reference_ids: BTreeSet<SystemId> = records.keys().copied().collect();
    let reconciliation = reconcile(
        &reference_ids,
        &catalog.metric_system_ids(),
        &catalog.system_ids,
        &config.reconcile.known_orphans,
    )?;
    notes.trusted_catalog_systems = reconciliation.trusted_ids.len();
    notes.orphans = reconciliation.orphan_ids.clone();

    let channels = group_by_system(&catalog.metrics);
    let mut evidence = StageEvidence::new();

    for system_id in &reconciliation.trusted_ids {
        let rows = channels.get(system_id).map(Vec::as_slice).unwrap_or(&[]);
        notes.count_matches(rows);
        let mut ev = derive_evidence(SourceKind::LakeParquet, Some(rows));

        let in_scope = match config.first_year.scope {
            ProbeScope::Irradiance => ev.capabilities.irradiance,
            ProbeScope::All => true,
            ProbeScope::None => false,
        };
        if let (true, Some(probe)) = (in_scope, probe) {
            match records.get(system_id).and_then(|r| r.first_year) {
                Some(hint) => {
                    let resolution =
                        resolve_first_year(*system_id, hint, config.first_year.horizon, probe);
                    if resolution.status != ResolutionStatus::ProbeFailed {
                        ev.first_year = Some(resolution.year);
                    }
                    notes.resolutions.push(resolution);
                }
                None => warn!(system_id, "no nominal first year to start probing from"),
            }
        }

        evidence.insert(*system_id, ev);
    }

    Ok(evidence)
}

/// Flag every system that has a metadata document from `source`.
pub fn document_stage(
    source: SourceKind,
    records: &RecordSet,
    documents: &BTreeMap<SystemId, MetadataDocument>,
    notes: &mut StageNotes,
) -> StageEvidence {
    let mut evidence = StageEvidence::new();
    for (system_id, doc) in documents {
        if !records.contains_key(system_id) {
            warn!(system_id, %source, "metadata document for unknown system, skipping");
            notes.unknown_ids.entry(source).or_default().insert(*system_id);
            continue;
        }
        evidence.insert(*system_id, document_evidence(source, *system_id, doc, notes));
    }
    evidence
}

fn document_evidence(
    source: SourceKind,
    system_id: SystemId,
    doc: &MetadataDocument,
    notes: &mut StageNotes,
) -> Evidence {
    let channels = doc.descriptors(system_id);
    match &channels {
        Some(rows) => notes.count_matches(rows),
        None => {
            debug!(system_id, %source, "no Metrics section, assuming power only");
            notes.power_fallbacks.insert(system_id);
        }
    }
    let mut ev = derive_evidence(source, channels.as_deref());

    match doc.first_year(system_id, source) {
        Ok(year) => ev.first_year = year,
        Err(e) => {
            warn!(system_id, %source, error = %e, "ignoring first timestamp");
            notes.bad_timestamps.insert(system_id);
        }
    }
    ev
}
