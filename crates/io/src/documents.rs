//! Metadata document directories.

use std::collections::BTreeMap;
use std::path::Path;

use pvcat_catalog::metadata::system_id_from_filename;
use pvcat_catalog::{MetadataDocument, SystemId};
use tracing::{debug, warn};

use crate::error::IoError;

/// Load every `<id>_system_metadata.json` in `dir`, keyed by system ID.
///
/// Other files (the PDF data sheets that share the directory) are skipped.
/// A missing directory yields an empty map.
pub fn load_documents(dir: &Path) -> Result<BTreeMap<SystemId, MetadataDocument>, IoError> {
    let mut docs = BTreeMap::new();
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "metadata directory missing, no documents loaded");
        return Ok(docs);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IoError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| IoError::io(dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(system_id) = system_id_from_filename(name) else {
            debug!(file = name, "not a metadata document, skipping");
            continue;
        };
        let text = std::fs::read_to_string(&path).map_err(|e| IoError::io(&path, e))?;
        let doc = MetadataDocument::from_json(system_id, &text).map_err(|e| IoError::catalog(&path, e))?;
        docs.insert(system_id, doc);
    }

    debug!(dir = %dir.display(), documents = docs.len(), "metadata documents loaded");
    Ok(docs)
}
