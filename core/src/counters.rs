use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Prosess-globale tellere for kjernen. Kalleren eksporterer `registry`
/// selv; kjernen gjør ingen I/O.
pub struct Counters {
    pub registry: Registry,
    pub baselines_built: IntCounter,
    pub form_scores: IntCounter,
    pub archetype_matches: IntCounter,
    pub synthetic_runs: IntCounterVec,
}

impl Counters {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("stridegraph".into()), None)?;

        let baselines_built = IntCounter::new("baselines_built_total", "Baselines aggregated")?;
        let form_scores = IntCounter::new("form_scores_total", "Form scores computed")?;
        let archetype_matches =
            IntCounter::new("archetype_matches_total", "Archetype match runs")?;
        let synthetic_runs = IntCounterVec::new(
            Opts::new("synthetic_runs_total", "Synthetic runs generated"),
            &["archetype"],
        )?;

        registry.register(Box::new(baselines_built.clone()))?;
        registry.register(Box::new(form_scores.clone()))?;
        registry.register(Box::new(archetype_matches.clone()))?;
        registry.register(Box::new(synthetic_runs.clone()))?;

        Ok(Self { registry, baselines_built, form_scores, archetype_matches, synthetic_runs })
    }
}

static COUNTERS: Lazy<Counters> = Lazy::new(|| {
    // statiske navn, feiler kun ved duplikat
    Counters::new().unwrap_or_else(|e| panic!("counter registry init failed: {e}"))
});

pub fn get() -> &'static Counters {
    &COUNTERS
}
