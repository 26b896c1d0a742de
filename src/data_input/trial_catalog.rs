// src/data_input/trial_catalog.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::data_analysis::uncertainty::summarize;
use crate::data_input::signal_data::TimeSeries;
use crate::error::{PendulumError, Result};

/// A physical quantity with its absolute uncertainty.
///
/// In a catalog file it is written either directly (`{ value, uncertainty }`)
/// or as a list of repeated readings (`{ measurements = [...] }`), in which case
/// the value is their mean and the uncertainty their standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuantityEntry")]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub const fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }

    /// Relative uncertainty, `None` for a zero value.
    pub fn relative_uncertainty(&self) -> Option<f64> {
        if self.value == 0.0 {
            None
        } else {
            Some(self.uncertainty / self.value.abs())
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± {}", self.value, self.uncertainty)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuantityEntry {
    Direct {
        value: f64,
        #[serde(default)]
        uncertainty: f64,
    },
    Repeated {
        measurements: Vec<f64>,
    },
}

impl TryFrom<QuantityEntry> for Measurement {
    type Error = String;

    fn try_from(entry: QuantityEntry) -> std::result::Result<Self, Self::Error> {
        match entry {
            QuantityEntry::Direct { value, uncertainty } => {
                if !value.is_finite() || !uncertainty.is_finite() || uncertainty < 0.0 {
                    return Err(format!("invalid measurement {value} ± {uncertainty}"));
                }
                Ok(Measurement::new(value, uncertainty))
            }
            QuantityEntry::Repeated { measurements } => summarize(&measurements)
                .map(|s| Measurement::new(s.mean, s.std_dev))
                .map_err(|e| e.to_string()),
        }
    }
}

/// Release amplitude class encoded in the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmplitudeBucket {
    Mini,
    Small,
    Medium,
    Large,
}

impl AmplitudeBucket {
    /// Accepts the lab's Spanish labels as well as English ones.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "mini" => Some(AmplitudeBucket::Mini),
            "chico" | "small" => Some(AmplitudeBucket::Small),
            "mediano" | "medium" => Some(AmplitudeBucket::Medium),
            "grande" | "large" => Some(AmplitudeBucket::Large),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmplitudeBucket::Mini => "mini",
            AmplitudeBucket::Small => "small",
            AmplitudeBucket::Medium => "medium",
            AmplitudeBucket::Large => "large",
        }
    }
}

impl fmt::Display for AmplitudeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata identifying one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialInfo {
    pub label: String, // File stem, e.g. "exp1_plat_L1_chico".
    pub experiment_set: u32,
    pub mass_label: String,
    pub mass_g: Measurement,
    pub length_label: String,
    pub length_m: Measurement,
    pub amplitude: AmplitudeBucket,
}

/// A trial's metadata together with its cleaned recording.
#[derive(Debug, Clone)]
pub struct Trial {
    pub info: TrialInfo,
    pub series: TimeSeries,
}

/// Label → physical value lookup for lengths (m) and masses (g).
///
/// Passed explicitly into the pipeline so tests can run with synthetic catalogs.
/// A catalog read from TOML holds exactly what the file lists; missing tables
/// stay empty and labels outside them fail to resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialCatalog {
    #[serde(default)]
    pub lengths: BTreeMap<String, Measurement>,
    #[serde(default)]
    pub masses: BTreeMap<String, Measurement>,
    /// Mass used for file names without a mass token (`exp2_L3_chico`).
    #[serde(default)]
    pub default_mass: Option<String>,
}

impl TrialCatalog {
    /// Lengths measured in the lab and the bob used for the length series.
    pub fn lab() -> Self {
        Self::default()
            .with_length("L1", 0.305, 0.001)
            .with_length("L2", 0.215, 0.001)
            .with_length("L3", 0.27, 0.001)
            .with_length("L4", 0.205, 0.001)
            .with_length("L5", 0.115, 0.001)
            .with_mass("bola4", 22.06, 0.015)
            .with_default_mass("bola4")
    }

    pub fn with_length(mut self, label: &str, value_m: f64, uncertainty_m: f64) -> Self {
        self.lengths
            .insert(label.to_string(), Measurement::new(value_m, uncertainty_m));
        self
    }

    pub fn with_mass(mut self, label: &str, value_g: f64, uncertainty_g: f64) -> Self {
        self.masses
            .insert(label.to_string(), Measurement::new(value_g, uncertainty_g));
        self
    }

    pub fn with_default_mass(mut self, label: &str) -> Self {
        self.default_mass = Some(label.to_string());
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PendulumError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn length(&self, label: &str) -> Result<Measurement> {
        self.lengths
            .get(label)
            .copied()
            .ok_or_else(|| PendulumError::UnknownLabel {
                kind: "length",
                label: label.to_string(),
            })
    }

    pub fn mass(&self, label: &str) -> Result<Measurement> {
        self.masses
            .get(label)
            .copied()
            .ok_or_else(|| PendulumError::UnknownLabel {
                kind: "mass",
                label: label.to_string(),
            })
    }

    /// Derives trial metadata from a file name.
    ///
    /// Accepted stems: `exp{set}_{mass}_{length}_{amplitude}` and
    /// `exp{set}_{length}_{amplitude}` (mass from `default_mass`).
    pub fn resolve(&self, path: &Path) -> Result<TrialInfo> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let invalid = |reason: &str| PendulumError::InvalidTrialName {
            name: stem.clone(),
            reason: reason.to_string(),
        };

        let tokens: Vec<&str> = stem.split('_').collect();
        let experiment_set = tokens
            .first()
            .and_then(|t| t.strip_prefix("exp"))
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| invalid("expected an 'exp<number>' prefix"))?;

        let (mass_label, length_label, amplitude_label) = match tokens.as_slice() {
            [_, mass, length, amplitude] => (mass.to_string(), *length, *amplitude),
            [_, length, amplitude] => {
                let mass = self
                    .default_mass
                    .clone()
                    .ok_or_else(|| invalid("no mass token and the catalog has no default mass"))?;
                (mass, *length, *amplitude)
            }
            _ => return Err(invalid("expected exp<set>_[<mass>_]<length>_<amplitude>")),
        };

        let amplitude = AmplitudeBucket::from_label(amplitude_label)
            .ok_or_else(|| invalid(&format!("unknown amplitude label '{amplitude_label}'")))?;
        let length_m = self.length(length_label)?;
        let mass_g = self.mass(&mass_label)?;

        Ok(TrialInfo {
            label: stem.clone(),
            experiment_set,
            mass_label,
            mass_g,
            length_label: length_label.to_string(),
            length_m,
            amplitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab_catalog() -> TrialCatalog {
        TrialCatalog::lab().with_mass("plat", 72.48, 0.06)
    }

    #[test]
    fn test_resolve_full_name() {
        let info = lab_catalog()
            .resolve(Path::new("data/exp1_plat_L1_chico.txt"))
            .unwrap();
        assert_eq!(info.label, "exp1_plat_L1_chico");
        assert_eq!(info.experiment_set, 1);
        assert_eq!(info.mass_label, "plat");
        assert_eq!(info.length_m.value, 0.305);
        assert_eq!(info.amplitude, AmplitudeBucket::Small);
    }

    #[test]
    fn test_resolve_uses_default_mass() {
        let info = lab_catalog().resolve(Path::new("exp2_L5_grande.txt")).unwrap();
        assert_eq!(info.mass_label, "bola4");
        assert_eq!(info.mass_g.value, 22.06);
        assert_eq!(info.length_m.value, 0.115);
        assert_eq!(info.amplitude, AmplitudeBucket::Large);
    }

    #[test]
    fn test_unknown_labels_are_hard_errors() {
        let catalog = lab_catalog();
        assert!(matches!(
            catalog.resolve(Path::new("exp1_plat_L9_chico.txt")),
            Err(PendulumError::UnknownLabel { kind: "length", .. })
        ));
        assert!(matches!(
            catalog.resolve(Path::new("exp1_oro_L1_chico.txt")),
            Err(PendulumError::UnknownLabel { kind: "mass", .. })
        ));
        assert!(matches!(
            catalog.resolve(Path::new("exp1_plat_L1_enorme.txt")),
            Err(PendulumError::InvalidTrialName { .. })
        ));
        assert!(matches!(
            catalog.resolve(Path::new("trial_L1_chico.txt")),
            Err(PendulumError::InvalidTrialName { .. })
        ));
    }

    #[test]
    fn test_missing_default_mass() {
        let catalog = TrialCatalog::default().with_length("L3", 0.27, 0.001);
        assert!(matches!(
            catalog.resolve(Path::new("exp2_L3_chico.txt")),
            Err(PendulumError::InvalidTrialName { .. })
        ));
    }

    #[test]
    fn test_catalog_from_toml_with_repeated_measurements() {
        let text = r#"
            default_mass = "bola4"

            [lengths.L1]
            value = 0.305
            uncertainty = 0.001

            [masses.bola4]
            measurements = [22.06, 22.03, 22.08, 22.05, 22.08, 22.08, 22.07, 22.07, 22.05, 22.06]
        "#;
        let catalog = TrialCatalog::from_toml_str(text).unwrap();
        let mass = catalog.mass("bola4").unwrap();
        assert!((mass.value - 22.063).abs() < 1e-9);
        assert!(mass.uncertainty > 0.0);
        assert_eq!(catalog.length("L1").unwrap(), Measurement::new(0.305, 0.001));
    }

    #[test]
    fn test_catalog_from_toml_holds_only_listed_labels() {
        let text = r#"
            [masses.bola4]
            value = 22.0
        "#;
        let catalog = TrialCatalog::from_toml_str(text).unwrap();
        assert!(catalog.lengths.is_empty());
        assert_eq!(catalog.default_mass, None);
        assert!(matches!(
            catalog.resolve(Path::new("exp1_bola4_L1_chico.txt")),
            Err(PendulumError::UnknownLabel { kind: "length", .. })
        ));
    }

    #[test]
    fn test_relative_uncertainty() {
        let length = Measurement::new(0.25, 0.001);
        assert!((length.relative_uncertainty().unwrap() - 0.004).abs() < 1e-12);
        assert_eq!(Measurement::new(0.0, 0.1).relative_uncertainty(), None);
    }

    #[test]
    fn test_catalog_rejects_bad_quantities() {
        let text = r#"
            [masses.empty]
            measurements = []
        "#;
        assert!(matches!(
            TrialCatalog::from_toml_str(text),
            Err(PendulumError::Config(_))
        ));
    }

    #[test]
    fn test_amplitude_labels() {
        assert_eq!(AmplitudeBucket::from_label("Mediano"), Some(AmplitudeBucket::Medium));
        assert_eq!(AmplitudeBucket::from_label("mini"), Some(AmplitudeBucket::Mini));
        assert_eq!(AmplitudeBucket::from_label("huge"), None);
        assert!(AmplitudeBucket::Small < AmplitudeBucket::Large);
    }
}

// src/data_input/trial_catalog.rs
