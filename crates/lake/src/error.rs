use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LakeError {
    /// Fetch destination given without a trailing separator.
    #[error("local path '{0}' does not end in '/' or '\\', and hence is not a possible directory")]
    LocalPathNotDirectory(String),
    /// A listed key resolves to an existing directory other than the destination.
    #[error("listing returned a directory: {}", .0.display())]
    UnexpectedDirectory(PathBuf),
    /// Transport failure (DNS, TLS, timeout) after all retries.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// Non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// S3 error document (`<Error><Code>..</Code>`).
    #[error("object store error {code}: {message}")]
    Remote { code: String, message: String },
    /// Listing body is not a well-formed `ListBucketResult`.
    #[error("cannot parse listing: {0}")]
    Listing(String),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("log write failed: {0}")]
    Csv(#[from] csv::Error),
}

impl LakeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LakeError::Io {
            path: path.into(),
            source,
        }
    }
}
