//! `pvcat classify`: run the catalog build over a synced data directory.

use std::path::PathBuf;

use pvcat_catalog::{run, ExistenceProbe};
use pvcat_io::{load_input, save_records};
use pvcat_lake::LakeProbe;
use serde::Serialize;

use crate::{CliError, Context};

/// `--json` output: run metadata, summary and where the records went.
#[derive(Serialize)]
struct ClassifyOutput<'a> {
    meta: &'a pvcat_catalog::model::CatalogMeta,
    summary: &'a pvcat_catalog::summary::RunSummary,
    records_path: String,
    probed: bool,
}

pub fn cmd_classify(
    ctx: &Context,
    no_probe: bool,
    json_output: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let input = load_input(&ctx.layout)?;

    let client = if no_probe { None } else { Some(ctx.client()?) };
    let lake_probe = client.as_ref().map(|c| LakeProbe::new(c));
    let probe: Option<&dyn ExistenceProbe> = lake_probe.as_ref().map(|p| p as &dyn ExistenceProbe);

    let result = run(&ctx.config.catalog, &input, probe)?;

    let records_path = output.unwrap_or_else(|| ctx.layout.cleaned_records());
    save_records(&records_path, &result.records)?;

    if json_output {
        let out = ClassifyOutput {
            meta: &result.meta,
            summary: &result.summary,
            records_path: records_path.display().to_string(),
            probed: probe.is_some(),
        };
        let json = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    // Human summary to stderr
    let s = &result.summary;
    let count = |column: &str| s.flag_counts.get(column).copied().unwrap_or(0);
    eprintln!(
        "{} systems: {} prize, {} lake parquet, {} lake csv",
        s.total_systems,
        count("is_prize_data"),
        count("is_lake_parquet_data"),
        count("is_lake_csv_data"),
    );
    eprintln!(
        "capabilities: {} irradiance, {} power, {} ambient temp, {} some temp",
        count("has_irrad_data"),
        count("has_power_data"),
        count("has_ambient_temp_data"),
        count("has_some_temp_data"),
    );
    let (suffix, substring) = s
        .channel_hits
        .values()
        .fold((0, 0), |(a, b), h| (a + h.suffix, b + h.substring));
    eprintln!("channel matches: {suffix} on `_<fragment>`, {substring} elsewhere in the label");
    if probe.is_some() {
        let fy = &s.first_year;
        eprintln!(
            "first year: {} probed, {} corrected, {} exhausted, {} probe failures",
            fy.probed,
            fy.corrected,
            fy.exhausted.len(),
            fy.probe_failed.len(),
        );
    }
    eprintln!("wrote {}", records_path.display());
    Ok(())
}
