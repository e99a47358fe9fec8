use std::collections::BTreeMap;

use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::aggregate::BaselineProfile;
use crate::benchmark::{BandLabel, BenchmarkTable, Direction};
use crate::counters;
use crate::error::{CoreError, Result};
use crate::statements::{Adjustment, StatementCatalog, StatementKey, StatementKind};
use crate::types::Metric;

/// Regler for styrke-uttrekk: senk terskelen i faste steg til minst
/// `min_count` kvalifiserer eller gulvet er nådd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthPolicy {
    pub threshold: f64,
    pub step: f64,
    pub floor: f64,
    pub min_count: usize,
    pub max_count: usize,
}

impl Default for StrengthPolicy {
    fn default() -> Self {
        Self { threshold: 85.0, step: 5.0, floor: 60.0, min_count: 1, max_count: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Vekter per metrikk; metrikker uten oppføring får 1.0 (lik vekt).
    pub weights: BTreeMap<Metric, f64>,
    /// Antall fokusområder (topp-K gap)
    pub top_k: usize,
    pub strength: StrengthPolicy,
    pub statements: StatementCatalog,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            top_k: 3,
            strength: StrengthPolicy::default(),
            statements: StatementCatalog::default(),
        }
    }
}

impl ScoringConfig {
    pub fn weight(&self, metric: Metric) -> f64 {
        self.weights.get(&metric).copied().unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (m, w) in &self.weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(CoreError::config(*m, format!("scoring weight must be >= 0, got {w}")));
            }
        }
        let p = &self.strength;
        if !(p.step.is_finite() && p.step > 0.0) {
            return Err(CoreError::table(format!("strength step must be > 0, got {}", p.step)));
        }
        if !(p.floor.is_finite() && p.threshold.is_finite()) || p.floor > p.threshold {
            return Err(CoreError::table(format!(
                "strength floor {} must not exceed threshold {}",
                p.floor, p.threshold
            )));
        }
        Ok(())
    }
}

/// Samlet vurdering av overall-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormRating {
    Excellent,
    Good,
    Developing,
    NeedsWork,
}

impl FormRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            FormRating::Excellent
        } else if score >= 75.0 {
            FormRating::Good
        } else if score >= 60.0 {
            FormRating::Developing
        } else {
            FormRating::NeedsWork
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub metric: Metric,
    pub value: f64,
    pub score: f64,
    pub band: BandLabel,
    /// Normalisert vekt brukt i overall-snittet
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapEntry {
    pub metric: Metric,
    pub current: f64,
    /// Midtpunkt i target-båndet
    pub target: f64,
    pub gap: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthEntry {
    pub metric: Option<Metric>,
    pub score: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormScore {
    pub overall_score: f64,
    pub rating: FormRating,
    pub activity_count: usize,
    pub metrics: Vec<MetricScore>,
    /// Alle gap, sortert synkende (tie: deklarasjonsrekkefølge)
    pub gaps: Vec<GapEntry>,
    /// Topp-K av `gaps` med gap > 0
    pub focus_areas: Vec<GapEntry>,
    pub strengths: Vec<StrengthEntry>,
    /// Terskelen styrkene faktisk ble hentet ut med
    pub strength_threshold: f64,
    /// Metrikker i tabellen som mangler i baseline
    pub unscored: Vec<Metric>,
}

impl FormScore {
    pub fn metric(&self, metric: Metric) -> Option<&MetricScore> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

/// Scorer baseline mot benchmark-tabellen.
///
/// Tabellen er allerede validert (`BenchmarkTable::new`); her sjekkes bare
/// at det finnes minst én metrikk å score og at konfigurasjonen er gyldig.
pub fn score_form(
    baseline: &BaselineProfile,
    table: &BenchmarkTable,
    config: &ScoringConfig,
) -> Result<FormScore> {
    config.validate()?;

    let present: Vec<_> = table
        .metrics()
        .iter()
        .filter_map(|mb| baseline.mean(mb.metric).map(|v| (mb, v)))
        .collect();
    let unscored: Vec<Metric> = table
        .metrics()
        .iter()
        .map(|mb| mb.metric)
        .filter(|m| baseline.mean(*m).is_none())
        .collect();

    if present.is_empty() {
        return Err(CoreError::InsufficientData(
            "baseline has none of the benchmarked metrics".into(),
        ));
    }
    if !unscored.is_empty() {
        warn!("metrics missing from baseline, not scored: {:?}", unscored);
    }

    // Vekter: re-normaliser over metrikkene som faktisk scores; 0-sum => lik vekt
    let raw: Vec<f64> = present.iter().map(|(mb, _)| config.weight(mb.metric)).collect();
    let sum: f64 = raw.iter().sum();
    let weights: Vec<f64> = if sum > 0.0 {
        raw.iter().map(|w| w / sum).collect()
    } else {
        vec![1.0 / present.len() as f64; present.len()]
    };

    let mut metrics = Vec::with_capacity(present.len());
    let mut gaps = Vec::with_capacity(present.len());
    for ((mb, value), w) in present.iter().zip(weights.iter()) {
        let hit = mb.locate(*value);
        debug!("{}: value={:.2} band={} score={:.1}", mb.metric, value, hit.label, hit.score);
        metrics.push(MetricScore {
            metric: mb.metric,
            value: *value,
            score: hit.score,
            band: hit.label,
            weight: *w,
        });

        if let Some((gap, target)) = mb.target_gap(*value) {
            let adjustment = if gap <= 0.0 {
                Adjustment::Hold
            } else {
                match mb.direction {
                    Direction::HigherIsBetter => Adjustment::Raise,
                    Direction::LowerIsBetter => Adjustment::Lower,
                }
            };
            let message = config.statements.render(&StatementKey {
                kind: StatementKind::Focus,
                metric: mb.metric,
                band: hit.label,
                adjustment,
                value: *value,
                target: Some(target),
            });
            gaps.push(GapEntry { metric: mb.metric, current: *value, target, gap, message });
        }
    }

    let overall_score = metrics.iter().map(|m| m.score * m.weight).sum::<f64>().clamp(0.0, 100.0);

    // Stabil sortering => like gap beholder tabellrekkefølgen
    gaps.sort_by_key(|g| std::cmp::Reverse(OrderedFloat(g.gap)));
    let focus_areas: Vec<GapEntry> = gaps
        .iter()
        .filter(|g| g.gap > 0.0)
        .take(config.top_k)
        .cloned()
        .collect();

    let (strengths, strength_threshold) = extract_strengths(&metrics, config);

    info!(
        "form score {:.1} ({} metrics, {} focus areas, {} strengths)",
        overall_score,
        metrics.len(),
        focus_areas.len(),
        strengths.len()
    );
    counters::get().form_scores.inc();

    Ok(FormScore {
        overall_score,
        rating: FormRating::from_score(overall_score),
        activity_count: baseline.activity_count,
        metrics,
        gaps,
        focus_areas,
        strengths,
        strength_threshold,
        unscored,
    })
}

/// Kaster aldri: returnerer alltid minst én oppføring.
fn extract_strengths(metrics: &[MetricScore], config: &ScoringConfig) -> (Vec<StrengthEntry>, f64) {
    let policy = &config.strength;
    let mut threshold = policy.threshold;

    let mut ranked: Vec<&MetricScore> = metrics.iter().collect();
    ranked.sort_by_key(|m| std::cmp::Reverse(OrderedFloat(m.score)));

    let mut qualifying: Vec<&MetricScore>;
    loop {
        qualifying = ranked.iter().copied().filter(|m| m.score >= threshold).collect();
        if qualifying.len() >= policy.min_count || threshold <= policy.floor {
            break;
        }
        threshold = (threshold - policy.step).max(policy.floor);
    }

    let mut out: Vec<StrengthEntry> = qualifying
        .into_iter()
        .take(policy.max_count)
        .map(|m| StrengthEntry {
            metric: Some(m.metric),
            score: Some(m.score),
            message: config.statements.render(&StatementKey {
                kind: StatementKind::Strength,
                metric: m.metric,
                band: m.band,
                adjustment: Adjustment::Hold,
                value: m.value,
                target: None,
            }),
        })
        .collect();

    if out.is_empty() {
        out.push(StrengthEntry {
            metric: None,
            score: None,
            message: config.statements.no_strengths.clone(),
        });
    }
    (out, threshold)
}
