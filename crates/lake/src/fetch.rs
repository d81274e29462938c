//! Fetch everything under a remote prefix into a local directory.
//!
//! Files already present locally are never downloaded again. Every download
//! is appended to the access log as `filename,source,access_time`, where
//! `access_time` is Unix seconds. With a description, `filename,description`
//! is also appended to the data inventory.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::ObjectStore;
use crate::error::LakeError;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Warn when nothing matches the prefix.
    pub warn_empty: bool,
    /// Only download keys ending with this suffix (e.g. `.json`).
    pub suffix: Option<String>,
    pub access_log: PathBuf,
    pub inventory: PathBuf,
    /// Written next to each downloaded file name in the inventory.
    pub description: Option<String>,
}

impl FetchOptions {
    pub fn new(access_log: impl Into<PathBuf>, inventory: impl Into<PathBuf>) -> Self {
        FetchOptions {
            warn_empty: false,
            suffix: None,
            access_log: access_log.into(),
            inventory: inventory.into(),
            description: None,
        }
    }

    pub fn warn_empty(mut self) -> Self {
        self.warn_empty = true;
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: PathBuf,
    pub source: String,
    pub bytes: u64,
    pub access_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// At least one object matched the prefix.
    pub matched: bool,
    pub downloaded: Vec<Download>,
    pub skipped_existing: usize,
    pub skipped_filtered: usize,
    pub skipped_dirs: usize,
}

/// Download every object under `remote_prefix` into `local_dir`.
///
/// `local_dir` must end in `/` or `\`. It is created when missing.
pub fn fetch(
    store: &dyn ObjectStore,
    local_dir: &str,
    remote_prefix: &str,
    options: &FetchOptions,
) -> Result<FetchOutcome, LakeError> {
    if !local_dir.ends_with('/') && !local_dir.ends_with('\\') {
        return Err(LakeError::LocalPathNotDirectory(local_dir.to_string()));
    }
    let dir = Path::new(local_dir);
    std::fs::create_dir_all(dir).map_err(|e| LakeError::io(dir, e))?;

    let objects = store.list(remote_prefix, None)?;
    let mut outcome = FetchOutcome {
        matched: !objects.is_empty(),
        ..FetchOutcome::default()
    };
    if objects.is_empty() {
        if options.warn_empty {
            warn!(prefix = remote_prefix, "no objects under prefix");
        }
        return Ok(outcome);
    }

    // A failure stops the listing, but whatever was already downloaded is
    // still logged before the error is returned.
    let mut failure = None;
    for obj in &objects {
        let name = obj.file_name();
        if obj.is_dir_marker() || name.is_empty() {
            outcome.skipped_dirs += 1;
            continue;
        }
        let target = dir.join(name);
        if target.is_dir() {
            failure = Some(LakeError::UnexpectedDirectory(target));
            break;
        }
        if target.is_file() {
            debug!(file = %target.display(), "already present");
            outcome.skipped_existing += 1;
            continue;
        }
        if let Some(suffix) = &options.suffix {
            if !obj.key.ends_with(suffix.as_str()) {
                outcome.skipped_filtered += 1;
                continue;
            }
        }

        let access_time = Utc::now().timestamp_millis() as f64 / 1000.0;
        match store.download(&obj.key, &target) {
            Ok(bytes) => outcome.downloaded.push(Download {
                filename: target,
                source: obj.key.clone(),
                bytes,
                access_time,
            }),
            Err(e) => {
                warn!(key = %obj.key, error = %e, "download failed");
                failure = Some(e);
                break;
            }
        }
    }

    if !outcome.downloaded.is_empty() {
        append_access_log(&options.access_log, &outcome.downloaded)?;
        if let Some(description) = &options.description {
            append_inventory(&options.inventory, &outcome.downloaded, description)?;
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    info!(
        prefix = remote_prefix,
        downloaded = outcome.downloaded.len(),
        existing = outcome.skipped_existing,
        filtered = outcome.skipped_filtered,
        "fetch done"
    );
    Ok(outcome)
}

fn appender(path: &Path) -> Result<csv::Writer<std::fs::File>, LakeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LakeError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LakeError::io(path, e))?;
    Ok(csv::WriterBuilder::new().has_headers(false).from_writer(file))
}

fn append_access_log(path: &Path, downloads: &[Download]) -> Result<(), LakeError> {
    let mut wtr = appender(path)?;
    for d in downloads {
        let filename = d.filename.to_string_lossy();
        let access_time = format!("{:.3}", d.access_time);
        wtr.write_record([&*filename, d.source.as_str(), access_time.as_str()])?;
    }
    wtr.flush().map_err(|e| LakeError::io(path, e))
}

fn append_inventory(path: &Path, downloads: &[Download], description: &str) -> Result<(), LakeError> {
    let mut wtr = appender(path)?;
    for d in downloads {
        let filename = d.filename.to_string_lossy();
        wtr.write_record([&*filename, description])?;
    }
    wtr.flush().map_err(|e| LakeError::io(path, e))
}
