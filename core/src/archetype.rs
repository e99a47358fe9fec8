use std::collections::BTreeMap;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::aggregate::BaselineProfile;
use crate::counters;
use crate::error::{CoreError, Result};
use crate::types::{Metric, Range};

/// Et navngitt målprofil: ideelt intervall per metrikk + beskrivende metadata
/// som bare sendes videre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Fokusområde, f.eks. "Marathon-focused, injury-preventive approach"
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub training_focus: Vec<String>,
    #[serde(default)]
    pub target_pace_min_km: Option<f64>,
    #[serde(default)]
    pub target_max_hr: Option<f64>,
    pub ranges: BTreeMap<Metric, Range>,
}

impl Archetype {
    pub fn range(&self, metric: Metric) -> Option<Range> {
        self.ranges.get(&metric).copied()
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default = "default_version")]
    version: String,
    archetypes: Vec<Archetype>,
}

fn default_version() -> String {
    "v1".to_string()
}

/// Fast, versjonert sett av arketyper. Endres aldri under kjøring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct ArchetypeCatalog {
    version: String,
    archetypes: Vec<Archetype>,
}

impl TryFrom<RawCatalog> for ArchetypeCatalog {
    type Error = CoreError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        ArchetypeCatalog::new(raw.version, raw.archetypes)
    }
}

impl ArchetypeCatalog {
    pub fn new(version: impl Into<String>, archetypes: Vec<Archetype>) -> Result<Self> {
        if archetypes.is_empty() {
            return Err(CoreError::table("archetype catalog is empty"));
        }
        for (i, a) in archetypes.iter().enumerate() {
            if archetypes[..i].iter().any(|o| o.key == a.key) {
                return Err(CoreError::table(format!("duplicate archetype key `{}`", a.key)));
            }
            if a.ranges.is_empty() {
                return Err(CoreError::table(format!("archetype `{}` defines no ranges", a.key)));
            }
            for (m, r) in &a.ranges {
                if !(r.low.is_finite() && r.high.is_finite()) {
                    return Err(CoreError::config(
                        *m,
                        format!("archetype `{}` has non-finite range [{}, {}]", a.key, r.low, r.high),
                    ));
                }
                if r.low > r.high {
                    return Err(CoreError::config(
                        *m,
                        format!("archetype `{}` has inverted range [{}, {}]", a.key, r.low, r.high),
                    ));
                }
            }
        }
        Ok(Self { version: version.into(), archetypes })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// I deklarasjonsrekkefølge.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn get(&self, key: &str) -> Option<&Archetype> {
        self.archetypes.iter().find(|a| a.key == key)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

impl Default for ArchetypeCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

/// Kvalitativ klassifisering av avstand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitClass {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Vekt per metrikk i avstandssummen (mangler => 1.0)
    pub weights: BTreeMap<Metric, f64>,
    pub good_fit_below: f64,
    pub fair_fit_below: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { weights: BTreeMap::new(), good_fit_below: 0.5, fair_fit_below: 1.5 }
    }
}

impl MatchConfig {
    pub fn classify(&self, distance: f64) -> FitClass {
        if distance < self.good_fit_below {
            FitClass::Good
        } else if distance < self.fair_fit_below {
            FitClass::Fair
        } else {
            FitClass::Poor
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (m, w) in &self.weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(CoreError::config(*m, format!("match weight must be >= 0, got {w}")));
            }
        }
        if !(self.good_fit_below <= self.fair_fit_below) {
            return Err(CoreError::table(format!(
                "fit cutoffs out of order: good<{} fair<{}",
                self.good_fit_below, self.fair_fit_below
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub current: f64,
    pub low: f64,
    pub high: f64,
    /// Midtpunkt hvis utenfor intervallet, ellers nåverdien (ingen kunstig gap)
    pub target: f64,
    pub delta: f64,
    pub normalized_overshoot: f64,
    pub within_range: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeMatch {
    pub key: String,
    pub name: String,
    pub distance: f64,
    pub fit: FitClass,
    pub deltas: Vec<MetricDelta>,
    pub unscored: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub catalog_version: String,
    /// Alle arketyper i katalogrekkefølge
    pub matches: Vec<ArchetypeMatch>,
    pub best: ArchetypeMatch,
}

/// Normalisert overskridelse: avstand forbi nærmeste grense / intervallbredde.
/// Intervall med bredde 0 normaliseres med 1 enhet.
pub fn normalized_overshoot(value: f64, range: &Range) -> f64 {
    let over = range.overshoot(value);
    if over == 0.0 {
        return 0.0;
    }
    let width = range.width();
    if width > 0.0 { over / width } else { over }
}

/// Asymmetrisk avstand: kun uoppfylte gap teller, oppfylte metrikker gir 0.
pub fn match_archetype(
    baseline: &BaselineProfile,
    archetype: &Archetype,
    config: &MatchConfig,
) -> ArchetypeMatch {
    let mut distance = 0.0;
    let mut deltas = Vec::with_capacity(archetype.ranges.len());
    let mut unscored = Vec::new();

    for (metric, range) in &archetype.ranges {
        let Some(current) = baseline.mean(*metric) else {
            unscored.push(*metric);
            continue;
        };
        let within = range.contains(current);
        let norm = normalized_overshoot(current, range);
        let w = config.weights.get(metric).copied().unwrap_or(1.0);
        distance += w * norm;

        let target = if within { current } else { range.midpoint() };
        deltas.push(MetricDelta {
            metric: *metric,
            current,
            low: range.low,
            high: range.high,
            target,
            delta: target - current,
            normalized_overshoot: norm,
            within_range: within,
        });
    }

    debug!("archetype {}: distance={:.4}", archetype.key, distance);
    ArchetypeMatch {
        key: archetype.key.clone(),
        name: archetype.name.clone(),
        distance,
        fit: config.classify(distance),
        deltas,
        unscored,
    }
}

/// Matcher baseline mot alle arketyper og velger minste avstand
/// (ved likhet vinner den som er deklarert først).
pub fn match_all(
    baseline: &BaselineProfile,
    catalog: &ArchetypeCatalog,
    config: &MatchConfig,
) -> Result<MatchReport> {
    config.validate()?;
    for a in catalog.archetypes() {
        if !a.ranges.keys().any(|m| baseline.mean(*m).is_some()) {
            return Err(CoreError::InsufficientData(format!(
                "baseline shares no metric with archetype `{}`",
                a.key
            )));
        }
    }

    let matches: Vec<ArchetypeMatch> = catalog
        .archetypes()
        .iter()
        .map(|a| match_archetype(baseline, a, config))
        .collect();

    // Avstander er kun sammenlignbare når baseline mangler de samme metrikkene overalt
    if let Some(odd) = matches.iter().find(|m| m.unscored != matches[0].unscored) {
        return Err(CoreError::InsufficientData(format!(
            "baseline misses {:?} for archetype `{}` but {:?} for `{}`; distances not comparable",
            odd.unscored, odd.key, matches[0].unscored, matches[0].key
        )));
    }

    let mut best_idx = 0;
    for (i, m) in matches.iter().enumerate().skip(1) {
        if m.distance < matches[best_idx].distance {
            best_idx = i;
        }
    }
    let best = matches[best_idx].clone();

    info!("best archetype: {} (distance {:.3}, {:?})", best.name, best.distance, best.fit);
    counters::get().archetype_matches.inc();

    Ok(MatchReport {
        catalog_version: catalog.version().to_string(),
        matches,
        best,
    })
}

fn ranges(items: &[(Metric, f64, f64)]) -> BTreeMap<Metric, Range> {
    items.iter().map(|(m, lo, hi)| (*m, Range::new(*lo, *hi))).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static DEFAULT_CATALOG: Lazy<ArchetypeCatalog> = Lazy::new(|| {
    use Metric::*;
    ArchetypeCatalog {
        version: default_version(),
        archetypes: vec![
            Archetype {
                key: "steady_runner".into(),
                name: "Steady Runner".into(),
                description: "Conservative, focus on endurance and consistency".into(),
                focus: "Marathon-focused, injury-preventive approach".into(),
                training_focus: strings(&[
                    "Long, steady runs (60-90 min)",
                    "Easy recovery runs",
                    "Occasional tempo runs (20-30 min)",
                    "Strength: 1x/week (maintenance)",
                ]),
                target_pace_min_km: Some(5.45),
                target_max_hr: Some(170.0),
                ranges: ranges(&[
                    (CadenceSpm, 155.0, 165.0),
                    (VerticalOscillationCm, 7.0, 8.0),
                    (GroundContactTimeMs, 250.0, 260.0),
                    (StepSpeedLossPct, 5.0, 6.0),
                    (HrEfficiency, 75.0, 85.0),
                ]),
            },
            Archetype {
                key: "efficient_runner".into(),
                name: "Efficient Runner".into(),
                description: "Optimized form, focus on running economy".into(),
                focus: "Speed-focused, biomechanically efficient".into(),
                training_focus: strings(&[
                    "Tempo runs (30-40 min)",
                    "Interval training (6-8 x 3-5min)",
                    "Speed work (fartlek, strides)",
                    "Strength: 2x/week (explosive)",
                ]),
                target_pace_min_km: Some(5.15),
                target_max_hr: Some(172.0),
                ranges: ranges(&[
                    (CadenceSpm, 170.0, 180.0),
                    (VerticalOscillationCm, 7.0, 7.5),
                    (GroundContactTimeMs, 240.0, 250.0),
                    (StepSpeedLossPct, 4.0, 5.0),
                    (HrEfficiency, 78.0, 88.0),
                ]),
            },
            Archetype {
                key: "balanced_runner".into(),
                name: "Balanced Runner".into(),
                description: "Mix of speed and endurance, versatile training".into(),
                focus: "All-around, adaptable to different race distances".into(),
                training_focus: strings(&[
                    "Mix of easy and tempo runs",
                    "Occasional speed work (8-10 x 2-3min)",
                    "Medium-long runs (45-75 min)",
                    "Strength: 2x/week (balanced)",
                ]),
                target_pace_min_km: Some(5.30),
                target_max_hr: Some(171.0),
                ranges: ranges(&[
                    (CadenceSpm, 165.0, 175.0),
                    (VerticalOscillationCm, 7.5, 8.5),
                    (GroundContactTimeMs, 250.0, 270.0),
                    (StepSpeedLossPct, 5.0, 7.0),
                    (HrEfficiency, 76.0, 86.0),
                ]),
            },
        ],
    }
});
