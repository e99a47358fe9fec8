//! StrideGraph core: løpsform-scoring mot benchmarks, arketype-matching og
//! syntetisk progresjonsdata for modelltrening.
//!
//! Dataflyt: aggregat → scorer (rapport) og aggregat + matcher → syntese.
//! Alle steg er rene funksjoner over immutable input; I/O ligger utenfor
//! (se `storage` for tynne hjelpere).

pub mod aggregate;
pub mod analyze;
pub mod archetype;
pub mod benchmark;
pub mod config;
pub mod counters;
pub mod error;
pub mod scoring;
pub mod statements;
pub mod storage;
pub mod synth;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use aggregate::{baseline_from_samples, build_baseline, BaselineProfile, MetricStats};
pub use analyze::{analyze, analyze_json, AnalysisReport};
pub use archetype::{
    match_all, match_archetype, Archetype, ArchetypeCatalog, ArchetypeMatch, FitClass,
    MatchConfig, MatchReport, MetricDelta,
};
pub use benchmark::{Band, BandLabel, BenchmarkTable, Direction, MetricBenchmark};
pub use config::CoreConfig;
pub use error::{CoreError, Result};
pub use scoring::{score_form, FormRating, FormScore, ScoringConfig, StrengthPolicy};
pub use storage::{load_config, save_json};
pub use synth::{
    ideal_trajectory, Envelope, Horizon, ImprovementPhase, NoiseConfig, SynthesisConfig, SyntheticDataset,
    SyntheticRow, SyntheticRun, Synthesizer,
};
pub use types::{ActivityRecord, Metric, MetricSample, Range, RoundTo};
