use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::counters;
use crate::error::{CoreError, Result};
use crate::types::{ActivityRecord, Metric, MetricSample};

/// Statistikk for én metrikk over alle aktiviteter der den finnes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    /// Populasjons-std (0 ved én observasjon)
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Baseline for én løper: bygges på nytt hver kjøring, aldri inkrementelt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineProfile {
    pub activity_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub metrics: BTreeMap<Metric, MetricStats>,
}

impl BaselineProfile {
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).map(|s| s.mean)
    }

    pub fn stats(&self, metric: Metric) -> Option<&MetricStats> {
        self.metrics.get(&metric)
    }

    /// Baseline med kun snittverdier (std=0, count=1). Praktisk for kallere
    /// som allerede har et sammendrag og for tester.
    pub fn from_means<I>(means: I) -> Self
    where
        I: IntoIterator<Item = (Metric, f64)>,
    {
        let metrics = means
            .into_iter()
            .map(|(m, v)| (m, MetricStats { mean: v, std: 0.0, min: v, max: v, count: 1 }))
            .collect();
        Self { activity_count: 1, first_date: None, last_date: None, metrics }
    }
}

/// Reduserer aktiviteter til én baseline.
///
/// Manglende verdier ekskluderes fra snittet for den metrikken (ikke 0).
/// Tom input gir `InsufficientData`.
pub fn build_baseline(records: &[ActivityRecord]) -> Result<BaselineProfile> {
    if records.is_empty() {
        return Err(CoreError::InsufficientData(
            "no activities supplied to the aggregator".into(),
        ));
    }
    let samples: Vec<MetricSample> = records.iter().map(ActivityRecord::to_sample).collect();
    baseline_from_samples(&samples)
}

/// Samme som `build_baseline`, men for allerede normaliserte samples.
pub fn baseline_from_samples(samples: &[MetricSample]) -> Result<BaselineProfile> {
    if samples.is_empty() {
        return Err(CoreError::InsufficientData(
            "no activities supplied to the aggregator".into(),
        ));
    }

    let mut columns: BTreeMap<Metric, Vec<f64>> = BTreeMap::new();
    for s in samples {
        for (m, v) in &s.values {
            if v.is_finite() {
                columns.entry(*m).or_default().push(*v);
            }
        }
    }

    let metrics: BTreeMap<Metric, MetricStats> = columns
        .into_iter()
        .map(|(m, xs)| (m, stats_of(&xs)))
        .collect();

    let first_date = samples.iter().filter_map(|s| s.date).min();
    let last_date = samples.iter().filter_map(|s| s.date).max();

    for (m, st) in &metrics {
        debug!(
            "baseline {}: mean={:.2} std={:.2} n={} [{:.2}, {:.2}]",
            m, st.mean, st.std, st.count, st.min, st.max
        );
    }
    info!(
        "baseline built from {} activities ({} metrics)",
        samples.len(),
        metrics.len()
    );
    counters::get().baselines_built.inc();

    Ok(BaselineProfile {
        activity_count: samples.len(),
        first_date,
        last_date,
        metrics,
    })
}

fn stats_of(xs: &[f64]) -> MetricStats {
    let n = xs.len();
    let mean = xs.iter().sum::<f64>() / n as f64;
    let std = if n < 2 {
        0.0
    } else {
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        var.sqrt()
    };
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricStats { mean, std, min, max, count: n }
}
