use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CoreConfig;
use crate::synth::SyntheticDataset;

/// Leser konfig fra disk (JSON).
/// Hvis filen ikke finnes, returneres default-konfig.
pub fn load_config(path: &str) -> Result<CoreConfig> {
    if Path::new(path).exists() {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let cfg = CoreConfig::from_json(&contents).with_context(|| format!("parsing config {path}"))?;
        info!("config loaded from {} (catalog {})", path, cfg.catalog.version());
        Ok(cfg)
    } else {
        warn!("config not found at {}, using defaults", path);
        Ok(CoreConfig::default())
    }
}

/// Leser en vilkårlig JSON-fil (baseline, rapport, ...).
pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let de = &mut serde_json::Deserializer::from_str(&contents);
    let value = serde_path_to_error::deserialize(de).with_context(|| format!("parsing {path}"))?;
    Ok(value)
}

/// Lagrer som JSON (pretty-print).
pub fn save_json<T: Serialize>(value: &T, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {path}"))?;
    info!("saved {}", path);
    Ok(())
}

/// Lagrer datasettet som flate JSON-rader.
pub fn save_dataset(dataset: &SyntheticDataset, path: &str) -> Result<()> {
    save_json(&dataset.rows(), path)
}
