use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::SystemId;

/// Transport-level failure of an existence check.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProbeError(pub String);

/// Answers "does the archive hold any data for this system in this year?".
///
/// Implementations may be slow (one remote listing per call).
pub trait ExistenceProbe {
    fn has_data(&self, system_id: SystemId, year: i32) -> Result<bool, ProbeError>;
}

impl<F> ExistenceProbe for F
where
    F: Fn(SystemId, i32) -> Result<bool, ProbeError>,
{
    fn has_data(&self, system_id: SystemId, year: i32) -> Result<bool, ProbeError> {
        self(system_id, year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// The probe found data for `year`.
    Confirmed,
    /// No data up to the horizon; `year` is the last year probed.
    Exhausted,
    /// The probe itself failed; `year` is the hint.
    ProbeFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub system_id: SystemId,
    pub hinted_year: i32,
    pub year: i32,
    pub status: ResolutionStatus,
    pub probes: u32,
}

/// Search forward from `hinted_year` for the first year with archived data.
///
/// Probes are issued one at a time, each year at most once, and stop at the
/// first hit. Candidates run up to `horizon` (exclusive); a hint at or past
/// the horizon is probed once. Exhaustion and probe failures are reported in
/// the returned status, never as errors.
pub fn resolve_first_year(
    system_id: SystemId,
    hinted_year: i32,
    horizon: i32,
    probe: &dyn ExistenceProbe,
) -> Resolution {
    let mut year = hinted_year;
    let mut probes = 0;

    loop {
        probes += 1;
        match probe.has_data(system_id, year) {
            Ok(true) => {
                if year != hinted_year {
                    debug!(system_id, hinted_year, year, "first year corrected");
                }
                return Resolution {
                    system_id,
                    hinted_year,
                    year,
                    status: ResolutionStatus::Confirmed,
                    probes,
                };
            }
            Ok(false) => {}
            Err(e) => {
                warn!(system_id, year, error = %e, "existence probe failed, keeping hinted year");
                return Resolution {
                    system_id,
                    hinted_year,
                    year: hinted_year,
                    status: ResolutionStatus::ProbeFailed,
                    probes,
                };
            }
        }

        if year + 1 >= horizon {
            warn!(
                system_id,
                hinted_year,
                last_tried = year,
                horizon,
                "no archived data before horizon, first year left unresolved"
            );
            return Resolution {
                system_id,
                hinted_year,
                year,
                status: ResolutionStatus::Exhausted,
                probes,
            };
        }
        year += 1;
    }
}
