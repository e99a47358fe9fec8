use serde::{Deserialize, Serialize};

use crate::archetype::{ArchetypeCatalog, MatchConfig};
use crate::benchmark::BenchmarkTable;
use crate::error::Result;
use crate::scoring::ScoringConfig;
use crate::synth::SynthesisConfig;

/// All konfigurasjon kjernen leser (men aldri beregner). Alle felt har
/// default, så `{}` er en gyldig konfig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub benchmarks: BenchmarkTable,
    pub catalog: ArchetypeCatalog,
    pub scoring: ScoringConfig,
    pub matching: MatchConfig,
    pub synthesis: SynthesisConfig,
    /// Slå av for kun scoring + matching
    pub generate_dataset: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            benchmarks: BenchmarkTable::default(),
            catalog: ArchetypeCatalog::default(),
            scoring: ScoringConfig::default(),
            matching: MatchConfig::default(),
            synthesis: SynthesisConfig::default(),
            generate_dataset: true,
        }
    }
}

impl CoreConfig {
    /// Parser og validerer. Tabellfeil (hull/overlapp/inverterte intervall)
    /// oppdages her, ikke ved scoring.
    pub fn from_json(s: &str) -> Result<Self> {
        let de = &mut serde_json::Deserializer::from_str(s);
        let cfg: CoreConfig = serde_path_to_error::deserialize(de)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.matching.validate()?;
        self.synthesis.validate()?;
        Ok(())
    }
}
