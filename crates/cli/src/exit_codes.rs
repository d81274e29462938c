//! CLI Exit Code Registry
//!
//! Single source of truth for `pvcat` exit codes. Scripts that drive the
//! catalog build rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, fetch path without separator) |
//! | 3    | Configuration file unreadable or invalid                  |
//! | 4    | Catalog identity mismatch (unexpected orphan systems)     |
//! | 5    | Local I/O or unreadable input data                        |
//! | 6    | Data lake unreachable or returned an error                |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// `pvcat.toml` cannot be read, parsed or validated.
pub const EXIT_CONFIG: u8 = 3;

/// The catalog's orphan set differs from `reconcile.known_orphans`.
/// The record set is not written.
pub const EXIT_IDENTITY_MISMATCH: u8 = 4;

/// Filesystem error, or a local input file with unusable contents.
pub const EXIT_IO: u8 = 5;

/// Listing or download failed after retries.
pub const EXIT_REMOTE: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_IDENTITY_MISMATCH,
            EXIT_IO,
            EXIT_REMOTE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
