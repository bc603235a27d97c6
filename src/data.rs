use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// One nameable quantity that can be spawned as a ball.
#[derive(Clone, Debug, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub title: Option<String>,
    pub entries: Vec<DatasetEntry>,
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file {}", path.display()))?;
    parse_dataset(&raw).with_context(|| format!("invalid dataset file {}", path.display()))
}

/// Parses a dataset, dropping entries whose value cannot size a ball. Only
/// positive finite values survive; each rejection is logged, and a dataset
/// with no survivors is an error.
pub fn parse_dataset(raw: &str) -> Result<Dataset> {
    let mut dataset: Dataset = serde_json::from_str(raw).context("invalid dataset JSON")?;

    dataset.entries.retain(|entry| {
        let ok = entry.value.is_finite() && entry.value > 0.0;
        if !ok {
            log::warn!(
                "dropping dataset entry {:?}: value {} is not a positive finite number",
                entry.name,
                entry.value
            );
        }
        ok
    });

    if dataset.entries.is_empty() {
        return Err(anyhow!("dataset contains no usable entries"));
    }
    Ok(dataset)
}

/// Dataset shown when no file is given: planetary diameters, a familiar set
/// with a wide magnitude spread.
pub fn builtin_dataset() -> Dataset {
    let planets = [
        ("Mercury", 4_879.4),
        ("Venus", 12_104.0),
        ("Earth", 12_742.0),
        ("Moon", 3_474.8),
        ("Mars", 6_779.0),
        ("Jupiter", 139_820.0),
        ("Saturn", 116_460.0),
        ("Uranus", 50_724.0),
        ("Neptune", 49_244.0),
        ("Pluto", 2_376.6),
    ];

    Dataset {
        title: Some("Solar system diameters".to_owned()),
        entries: planets
            .into_iter()
            .map(|(name, value)| DatasetEntry {
                name: name.to_owned(),
                value,
                units: Some("km".to_owned()),
                source: Some("built-in".to_owned()),
            })
            .collect(),
    }
}
