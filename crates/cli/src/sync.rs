//! `pvcat sync` and `pvcat fetch`.

use pvcat_io::layout::dir_string;
use pvcat_lake::layout::{
    prize_metadata_prefix, CSV_METADATA_PREFIX, PARQUET_METRICS_PREFIX, PARQUET_SITES_PREFIX,
    PARQUET_SYSTEMS_PREFIX, REFERENCE_INDEX_KEY,
};
use pvcat_lake::{fetch, FetchOutcome, ObjectStore};
use tracing::info;

use crate::{CliError, Context};

/// One remote prefix mirrored into one local directory.
struct SyncStep {
    local_dir: String,
    prefix: String,
    suffix: Option<&'static str>,
    description: &'static str,
    warn_empty: bool,
}

fn plan(ctx: &Context, with_pdf: bool) -> Vec<SyncStep> {
    let layout = &ctx.layout;
    let mut steps = vec![SyncStep {
        local_dir: dir_string(&layout.raw_dir()),
        prefix: REFERENCE_INDEX_KEY.to_string(),
        suffix: None,
        description: "PVDAQ reference index of all systems",
        warn_empty: true,
    }];

    // Prize metadata lives under the system ID, and for renamed datasets
    // (7333_5_min) also under the dataset name.
    for system in &ctx.config.catalog.prize.systems {
        let mut datasets = vec![system.id.to_string()];
        if system.name != datasets[0] {
            datasets.push(system.name.clone());
        }
        for dataset in datasets {
            steps.push(SyncStep {
                local_dir: dir_string(&layout.prize_metadata_dir()),
                prefix: prize_metadata_prefix(&dataset),
                suffix: None,
                description: "2023 solar data prize system metadata",
                warn_empty: true,
            });
        }
    }

    for (dir, prefix, description) in [
        (layout.parquet_metrics_dir(), PARQUET_METRICS_PREFIX, "catalog metrics table"),
        (layout.parquet_sites_dir(), PARQUET_SITES_PREFIX, "catalog sites table"),
        (layout.parquet_systems_dir(), PARQUET_SYSTEMS_PREFIX, "catalog systems table"),
    ] {
        steps.push(SyncStep {
            local_dir: dir_string(&dir),
            prefix: prefix.to_string(),
            suffix: None,
            description,
            warn_empty: false,
        });
    }

    steps.push(SyncStep {
        local_dir: dir_string(&layout.csv_metadata_dir()),
        prefix: CSV_METADATA_PREFIX.to_string(),
        suffix: if with_pdf { None } else { Some(".json") },
        description: "CSV collection system metadata",
        warn_empty: false,
    });
    steps
}

fn run_step(ctx: &Context, store: &dyn ObjectStore, step: &SyncStep) -> Result<FetchOutcome, CliError> {
    let mut options = ctx.fetch_options().description(step.description);
    if let Some(suffix) = step.suffix {
        options = options.suffix(suffix);
    }
    if step.warn_empty {
        options = options.warn_empty();
    }
    Ok(fetch(store, &step.local_dir, &step.prefix, &options)?)
}

pub fn cmd_sync(ctx: &Context, with_pdf: bool) -> Result<(), CliError> {
    let client = ctx.client()?;
    let steps = plan(ctx, with_pdf);

    let mut downloaded = 0;
    let mut existing = 0;
    for step in &steps {
        let outcome = run_step(ctx, &client, step)?;
        downloaded += outcome.downloaded.len();
        existing += outcome.skipped_existing;
    }

    info!(steps = steps.len(), downloaded, existing, "sync done");
    eprintln!(
        "synced {} into {}: {} downloaded, {} already present",
        steps.len(),
        ctx.layout.root().display(),
        downloaded,
        existing,
    );
    Ok(())
}

pub fn cmd_fetch(
    ctx: &Context,
    local_dir: &str,
    prefix: &str,
    suffix: Option<String>,
    description: Option<String>,
) -> Result<(), CliError> {
    let client = ctx.client()?;
    let mut options = ctx.fetch_options().warn_empty();
    if let Some(suffix) = suffix {
        options = options.suffix(suffix);
    }
    if let Some(description) = description {
        options = options.description(description);
    }

    let outcome = fetch(&client, local_dir, prefix, &options)?;
    for d in &outcome.downloaded {
        println!("{}", d.filename.display());
    }
    if !outcome.matched {
        eprintln!("no objects under {prefix}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PvcatConfig;
    use pvcat_io::DataLayout;

    fn ctx() -> Context {
        Context {
            config: PvcatConfig::default(),
            layout: DataLayout::new("/d"),
        }
    }

    #[test]
    fn plan_covers_every_source() {
        let steps = plan(&ctx(), false);
        let prefixes: Vec<&str> = steps.iter().map(|s| s.prefix.as_str()).collect();

        assert_eq!(prefixes[0], REFERENCE_INDEX_KEY);
        assert!(prefixes.contains(&"pvdaq/2023-solar-data-prize/2105_OEDI/metadata/"));
        assert!(prefixes.contains(&"pvdaq/2023-solar-data-prize/7333_OEDI/metadata/"));
        assert!(prefixes.contains(&"pvdaq/2023-solar-data-prize/7333_5_min_OEDI/metadata/"));
        assert!(prefixes.contains(&PARQUET_SYSTEMS_PREFIX));
        // 1 reference + 6 prize metadata + 3 tables + csv metadata
        assert_eq!(steps.len(), 11);

        let csv = steps.last().unwrap();
        assert_eq!(csv.suffix, Some(".json"));
        assert!(csv.local_dir.ends_with('/') || csv.local_dir.ends_with('\\'));
    }

    #[test]
    fn with_pdf_fetches_everything() {
        let steps = plan(&ctx(), true);
        assert_eq!(steps.last().unwrap().suffix, None);
    }
}
