use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::model::SystemId;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub prize: PrizeConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub first_year: FirstYearConfig,
}

impl CatalogConfig {
    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig =
            toml::from_str(s).map_err(|e| CatalogError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for system in &self.prize.systems {
            if !seen.insert(system.id) {
                return Err(CatalogError::ConfigValidation(format!(
                    "prize system {} listed twice",
                    system.id
                )));
            }
            if system.name.trim().is_empty() {
                return Err(CatalogError::ConfigValidation(format!(
                    "prize system {} has an empty folder name",
                    system.id
                )));
            }
        }
        if !(1900..=2100).contains(&self.first_year.horizon) {
            return Err(CatalogError::ConfigValidation(format!(
                "first_year.horizon {} is not a plausible year",
                self.first_year.horizon
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prize
// ---------------------------------------------------------------------------

/// The prize collection is small and curated by hand, so its membership is
/// configured rather than discovered.
#[derive(Debug, Clone, Deserialize)]
pub struct PrizeConfig {
    #[serde(default = "default_prize_systems")]
    pub systems: Vec<PrizeSystem>,
}

impl Default for PrizeConfig {
    fn default() -> Self {
        Self {
            systems: default_prize_systems(),
        }
    }
}

impl PrizeConfig {
    pub fn ids(&self) -> BTreeSet<SystemId> {
        self.systems.iter().map(|s| s.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrizeSystem {
    pub id: SystemId,
    /// Folder name in the prize collection. Usually the ID, but 7333 is
    /// published downsampled under `7333_5_min`.
    pub name: String,
}

fn default_prize_systems() -> Vec<PrizeSystem> {
    [(2105, "2105"), (2107, "2107"), (7333, "7333_5_min"), (9068, "9068"), (9069, "9069")]
        .into_iter()
        .map(|(id, name)| PrizeSystem {
            id,
            name: name.into(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Catalog systems known to be absent from the reference index.
    /// 2045 is an irradiance instrument with no installation attached.
    #[serde(default = "default_known_orphans")]
    pub known_orphans: BTreeSet<SystemId>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            known_orphans: default_known_orphans(),
        }
    }
}

fn default_known_orphans() -> BTreeSet<SystemId> {
    BTreeSet::from([2045])
}

// ---------------------------------------------------------------------------
// First year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FirstYearConfig {
    /// One past the archive's most recent possible year.
    #[serde(default = "default_horizon")]
    pub horizon: i32,
    #[serde(default)]
    pub scope: ProbeScope,
}

impl Default for FirstYearConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            scope: ProbeScope::default(),
        }
    }
}

fn default_horizon() -> i32 {
    2024
}

/// Which trusted catalog systems get their first year probed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeScope {
    /// Systems whose catalog channels report irradiance.
    #[default]
    Irradiance,
    All,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CatalogConfig::from_toml("").unwrap();
        assert_eq!(config.prize.ids(), BTreeSet::from([2105, 2107, 7333, 9068, 9069]));
        assert_eq!(config.reconcile.known_orphans, BTreeSet::from([2045]));
        assert_eq!(config.first_year.horizon, 2024);
        assert_eq!(config.first_year.scope, ProbeScope::Irradiance);
    }

    #[test]
    fn overrides() {
        let config = CatalogConfig::from_toml(
            r#"
[prize]
systems = [{ id = 10, name = "10" }]

[reconcile]
known_orphans = []

[first_year]
horizon = 2026
scope = "all"
"#,
        )
        .unwrap();
        assert_eq!(config.prize.systems, vec![PrizeSystem { id: 10, name: "10".into() }]);
        assert!(config.reconcile.known_orphans.is_empty());
        assert_eq!(config.first_year.horizon, 2026);
        assert_eq!(config.first_year.scope, ProbeScope::All);
    }

    #[test]
    fn duplicate_prize_system_rejected() {
        let err = CatalogConfig::from_toml(
            r#"
[prize]
systems = [{ id = 10, name = "10" }, { id = 10, name = "10b" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::ConfigValidation(_)));
    }

    #[test]
    fn implausible_horizon_rejected() {
        let err = CatalogConfig::from_toml("[first_year]\nhorizon = 24\n").unwrap_err();
        assert!(err.to_string().contains("horizon"));
    }

    #[test]
    fn unknown_scope_is_a_parse_error() {
        let err = CatalogConfig::from_toml("[first_year]\nscope = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::ConfigParse(_)));
    }
}
