use log::info;
use serde::{Deserialize, Serialize};

use crate::aggregate::{build_baseline, BaselineProfile};
use crate::archetype::{match_all, MatchReport};
use crate::config::CoreConfig;
use crate::error::Result;
use crate::scoring::{score_form, FormScore};
use crate::synth::{SyntheticDataset, Synthesizer};
use crate::types::ActivityRecord;

/// Samlet resultat for én kjøring: aggregat → score → match → syntese.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub baseline: BaselineProfile,
    pub form: FormScore,
    pub archetypes: MatchReport,
    pub dataset: Option<SyntheticDataset>,
}

/// Kjører alle tre stegene. Konfigurasjonen valideres før noe beregnes.
pub fn analyze(records: &[ActivityRecord], config: &CoreConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let synthesizer = Synthesizer::new(&config.catalog, &config.synthesis)?;

    let baseline = build_baseline(records)?;
    let form = score_form(&baseline, &config.benchmarks, &config.scoring)?;
    let archetypes = match_all(&baseline, &config.catalog, &config.matching)?;
    let dataset = if config.generate_dataset {
        Some(synthesizer.generate_all(&baseline)?)
    } else {
        None
    };

    info!(
        "analysis done: score {:.1}, best fit {}, {} synthetic runs",
        form.overall_score,
        archetypes.best.name,
        dataset.as_ref().map_or(0, |d| d.len())
    );
    Ok(AnalysisReport { baseline, form, archetypes, dataset })
}

/// JSON inn/ut-variant. `records_json` er en liste av aktiviteter,
/// `config_json` er valgfri (default-tabeller brukes ellers).
pub fn analyze_json(records_json: &str, config_json: Option<&str>) -> Result<String> {
    let de = &mut serde_json::Deserializer::from_str(records_json);
    let records: Vec<ActivityRecord> = serde_path_to_error::deserialize(de)?;

    let config = match config_json {
        Some(s) => CoreConfig::from_json(s)?,
        None => CoreConfig::default(),
    };

    let report = analyze(&records, &config)?;
    Ok(serde_json::to_string(&report)?)
}
