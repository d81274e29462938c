//! Fragment matching over channel labels.
//!
//! Matching is case-insensitive substring containment. It over-matches on
//! purpose: `"Powerline"` contains `"pow"`. Missing a real power channel is
//! worse than flagging a system that turns out not to have one.

use serde::Serialize;

use crate::model::{Label, MetricDescriptor};

/// How a label contained the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitForm {
    /// The label contains `_<fragment>`, e.g. `temp_ambient` for `ambient`.
    Suffix,
    /// Any other containment.
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FragmentHit {
    pub label: Label,
    pub form: HitForm,
}

/// True if `fragment` occurs in `text`, ignoring case.
pub fn matches(text: &str, fragment: &str) -> bool {
    match_text(text, fragment).is_some()
}

/// Classify how `text` contains `fragment`, if it does.
pub fn match_text(text: &str, fragment: &str) -> Option<HitForm> {
    let text = text.to_lowercase();
    let fragment = fragment.to_lowercase();
    if fragment.is_empty() || !text.contains(&fragment) {
        return None;
    }
    let suffixed = format!("_{fragment}");
    if text.contains(&suffixed) {
        Some(HitForm::Suffix)
    } else {
        Some(HitForm::Substring)
    }
}

/// Test every label of a descriptor. A hit on any label is a match; a
/// suffix-style hit is preferred over a plain substring hit.
pub fn match_descriptor(descriptor: &MetricDescriptor, fragment: &str) -> Option<FragmentHit> {
    let mut best: Option<FragmentHit> = None;
    for (label, text) in descriptor.labels() {
        match match_text(text, fragment) {
            Some(HitForm::Suffix) => {
                return Some(FragmentHit {
                    label,
                    form: HitForm::Suffix,
                })
            }
            Some(form) if best.is_none() => best = Some(FragmentHit { label, form }),
            _ => {}
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sensor: Option<&str>, common: Option<&str>) -> MetricDescriptor {
        MetricDescriptor {
            system_id: 1,
            key: None,
            sensor_name: sensor.map(Into::into),
            common_name: common.map(Into::into),
        }
    }

    #[test]
    fn canonical_examples() {
        assert!(matches("Irrad_1", "rrad"));
        assert!(matches("irradiance_w_m2", "rrad"));
        assert!(matches("outdoor_temp", "temp"));
        assert!(matches("power_kw", "pow"));
        assert!(!matches("voltage", "pow"));
    }

    #[test]
    fn case_insensitive_both_sides() {
        assert!(matches("AC_POWER", "pow"));
        assert!(matches("Ambient Temperature", "MBIENT"));
        assert!(matches("POA Irradiance", "rrad"));
    }

    #[test]
    fn known_over_match() {
        assert!(matches("Powerline noise", "pow"));
    }

    #[test]
    fn empty_fragment_never_matches() {
        assert!(!matches("anything", ""));
    }

    #[test]
    fn suffix_form_detected() {
        assert_eq!(match_text("temp_ambient", "ambient"), Some(HitForm::Suffix));
        assert_eq!(match_text("Ambient Temp", "ambient"), Some(HitForm::Substring));
        assert_eq!(match_text("inv1_Power", "pow"), Some(HitForm::Suffix));
    }

    #[test]
    fn descriptor_checks_every_label() {
        let d = MetricDescriptor {
            system_id: 1,
            key: Some("channel_7".into()),
            sensor_name: Some("sensor_x".into()),
            common_name: Some("POA Irradiance".into()),
        };
        let hit = match_descriptor(&d, "rrad").unwrap();
        assert_eq!(hit.label, Label::CommonName);
        assert_eq!(hit.form, HitForm::Substring);

        let keyed = MetricDescriptor {
            key: Some("ambient_temp".into()),
            ..MetricDescriptor::default()
        };
        assert_eq!(match_descriptor(&keyed, "mbient").unwrap().label, Label::Key);
    }

    #[test]
    fn descriptor_prefers_suffix_hit() {
        let d = row(Some("Ambient sensor"), Some("module_ambient"));
        let hit = match_descriptor(&d, "ambient").unwrap();
        assert_eq!(hit.label, Label::CommonName);
        assert_eq!(hit.form, HitForm::Suffix);
    }

    #[test]
    fn descriptor_without_labels_does_not_match() {
        assert!(match_descriptor(&row(None, None), "pow").is_none());
        assert!(match_descriptor(&row(Some("dc_voltage"), Some("DC Voltage")), "pow").is_none());
    }
}
