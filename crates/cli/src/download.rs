//! `pvcat download`: bulk time-series downloads.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Subcommand;
use pvcat_catalog::model::{Capability, SourceKind};
use pvcat_catalog::{RecordSet, SystemId};
use pvcat_io::layout::dir_string;
use pvcat_io::load_records;
use pvcat_lake::layout::{prize_data_prefix, pvdata_prefix, PrizeGroup};
use pvcat_lake::fetch;
use tracing::info;

use crate::{CliError, Context};

#[derive(Subcommand)]
pub enum DownloadCommands {
    /// Environment and irradiance series of every configured prize system
    #[command(after_help = "\
Examples:
  pvcat download prize")]
    Prize,

    /// Parquet series of irradiance-reporting lake systems, by position in
    /// the selection (system_id order, both ends inclusive)
    #[command(after_help = "\
Examples:
  pvcat download parquet --start 1 --end 9
  pvcat download parquet --start 10 --end 19 --pause-secs 60")]
    Parquet {
        /// First position to download
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Last position to download (default: last)
        #[arg(long)]
        end: Option<usize>,

        /// Record set to select from (default: <data_dir>/core/systems_cleaned.csv)
        #[arg(long)]
        records: Option<PathBuf>,

        /// Pause between systems to space out calls to the public bucket
        #[arg(long, default_value_t = 120)]
        pause_secs: u64,
    },
}

pub fn cmd_download(ctx: &Context, cmd: DownloadCommands) -> Result<(), CliError> {
    match cmd {
        DownloadCommands::Prize => cmd_download_prize(ctx),
        DownloadCommands::Parquet {
            start,
            end,
            records,
            pause_secs,
        } => cmd_download_parquet(ctx, start, end, records, pause_secs),
    }
}

fn cmd_download_prize(ctx: &Context) -> Result<(), CliError> {
    let client = ctx.client()?;
    let options = ctx.fetch_options().warn_empty();

    for system in &ctx.config.catalog.prize.systems {
        let local_dir = dir_string(&ctx.layout.prize_series_dir(system.id));
        for group in PrizeGroup::ALL {
            let prefix = prize_data_prefix(&system.name, group);
            let outcome = fetch(&client, &local_dir, &prefix, &options)?;
            info!(
                system_id = system.id,
                %group,
                downloaded = outcome.downloaded.len(),
                "prize group fetched"
            );
        }
    }
    Ok(())
}

/// Systems with lake parquet data that report irradiance, in ID order.
pub fn parquet_selection(records: &RecordSet) -> Vec<SystemId> {
    records
        .values()
        .filter(|r| r.sources.get(SourceKind::LakeParquet) && r.capabilities.get(Capability::Irradiance))
        .map(|r| r.system_id)
        .collect()
}

fn cmd_download_parquet(
    ctx: &Context,
    start: usize,
    end: Option<usize>,
    records_path: Option<PathBuf>,
    pause_secs: u64,
) -> Result<(), CliError> {
    let records_path = records_path.unwrap_or_else(|| ctx.layout.cleaned_records());
    let records = load_records(&records_path)
        .map_err(CliError::from)
        .map_err(|e| e.with_hint("run `pvcat classify` to build the record set first"))?;
    let selection = parquet_selection(&records);

    if selection.is_empty() {
        return Err(CliError::usage(format!(
            "{} has no irradiance-reporting lake parquet systems",
            records_path.display()
        )));
    }
    let last = selection.len() - 1;
    let end = end.unwrap_or(last);
    if start > end || end > last {
        return Err(CliError::usage(format!(
            "positions {start}..={end} outside the selection 0..={last}"
        )));
    }

    let client = ctx.client()?;
    let options = ctx.fetch_options().warn_empty();
    for (position, system_id) in selection.iter().enumerate().take(end + 1).skip(start) {
        let started = Instant::now();
        let local_dir = dir_string(&ctx.layout.parquet_series_dir(*system_id));
        let outcome = fetch(&client, &local_dir, &pvdata_prefix(*system_id), &options)?;
        info!(
            position,
            system_id,
            downloaded = outcome.downloaded.len(),
            minutes = started.elapsed().as_secs_f64() / 60.0,
            "system fetched"
        );
        if position < end && pause_secs > 0 {
            thread::sleep(Duration::from_secs(pause_secs));
        }
    }
    Ok(())
}
