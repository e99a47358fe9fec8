use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Metric, Range};

const EPS: f64 = 1e-9;

/// Båndetiketter, fra best til svakest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandLabel {
    Elite,
    Good,
    Target,
    Developing,
}

impl fmt::Display for BandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BandLabel::Elite => "elite",
            BandLabel::Good => "good",
            BandLabel::Target => "target",
            BandLabel::Developing => "developing",
        })
    }
}

/// Hvilken retning som er "bra" for en metrikk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Ett bånd: verdiintervall + scoregulv/-tak. Scoren interpoleres lineært
/// innenfor båndet i metrikkens gode retning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: BandLabel,
    pub low: f64,
    pub high: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Band {
    pub fn range(&self) -> Range {
        Range::new(self.low, self.high)
    }

    fn interpolate(&self, v: f64, direction: Direction) -> f64 {
        let width = self.high - self.low;
        let pos = ((v - self.low) / width).clamp(0.0, 1.0);
        let span = self.ceiling - self.floor;
        match direction {
            Direction::HigherIsBetter => self.floor + span * pos,
            Direction::LowerIsBetter => self.ceiling - span * pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBenchmark {
    pub metric: Metric,
    pub direction: Direction,
    /// Bånd sortert stigende på verdi; dekker domenet uten hull/overlapp.
    pub bands: Vec<Band>,
    #[serde(default)]
    pub description: String,
}

/// Resultat av oppslag for én verdi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandHit {
    pub index: usize,
    pub label: BandLabel,
    pub score: f64,
}

impl MetricBenchmark {
    /// Plausibelt domene = [første.low, siste.high].
    pub fn domain(&self) -> Range {
        let first = self.bands.first().map(|b| b.low).unwrap_or(0.0);
        let last = self.bands.last().map(|b| b.high).unwrap_or(0.0);
        Range::new(first, last)
    }

    pub fn target_band(&self) -> Option<&Band> {
        self.bands.iter().find(|b| b.label == BandLabel::Target)
    }

    /// Finn båndet som inneholder verdien. Halvåpne bånd [low, high), siste
    /// bånd lukket; verdier utenfor domenet klemmes til nærmeste kant.
    /// Første bånd med `v < high` vinner, så en verdi i et toleransehull
    /// mellom to bånd havner i det øvre nabobåndet (ved dets gulv).
    pub fn locate(&self, value: f64) -> BandHit {
        let dom = self.domain();
        let v = value.clamp(dom.low, dom.high);
        let last = self.bands.len() - 1;
        let index = self.bands.iter().position(|b| v < b.high).unwrap_or(last);
        let band = &self.bands[index];
        BandHit {
            index,
            label: band.label,
            score: band.interpolate(v, self.direction).clamp(0.0, 100.0),
        }
    }

    /// Normalisert gap til target-båndet. Kun underskudd teller: verdier i
    /// target-båndet eller på den gode siden av det gir 0.
    pub fn target_gap(&self, value: f64) -> Option<(f64, f64)> {
        let t = self.target_band()?;
        let width = t.high - t.low;
        let shortfall = match self.direction {
            Direction::HigherIsBetter if value < t.low => t.low - value,
            Direction::LowerIsBetter if value > t.high => value - t.high,
            _ => 0.0,
        };
        Some((shortfall / width, 0.5 * (t.low + t.high)))
    }

    fn validate(&self) -> Result<()> {
        let m = self.metric;
        if self.bands.is_empty() {
            return Err(CoreError::config(m, "benchmark has no bands"));
        }
        for b in &self.bands {
            if !(b.low.is_finite() && b.high.is_finite()) || b.low >= b.high {
                return Err(CoreError::config(
                    m,
                    format!("band `{}` has invalid range [{}, {}]", b.label, b.low, b.high),
                ));
            }
            if !(0.0..=100.0).contains(&b.floor)
                || !(0.0..=100.0).contains(&b.ceiling)
                || b.floor > b.ceiling
            {
                return Err(CoreError::config(
                    m,
                    format!(
                        "band `{}` has invalid scores floor={} ceiling={}",
                        b.label, b.floor, b.ceiling
                    ),
                ));
            }
        }
        for pair in self.bands.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.low > a.high + EPS {
                return Err(CoreError::config(
                    m,
                    format!("gap between `{}` (..{}) and `{}` ({}..)", a.label, a.high, b.label, b.low),
                ));
            }
            if b.low < a.high - EPS {
                return Err(CoreError::config(
                    m,
                    format!("overlap between `{}` (..{}) and `{}` ({}..)", a.label, a.high, b.label, b.low),
                ));
            }
            let monotone = match self.direction {
                Direction::HigherIsBetter => a.ceiling <= b.floor + EPS,
                Direction::LowerIsBetter => a.floor + EPS >= b.ceiling,
            };
            if !monotone {
                return Err(CoreError::config(
                    m,
                    format!("scores of `{}` and `{}` are not monotonic", a.label, b.label),
                ));
            }
        }
        let mut labels: Vec<BandLabel> = self.bands.iter().map(|b| b.label).collect();
        labels.sort();
        labels.dedup();
        if labels.len() != self.bands.len() {
            return Err(CoreError::config(m, "duplicate band labels"));
        }
        if self.target_band().is_none() {
            return Err(CoreError::config(m, "no `target` band defined"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawBenchmarkTable {
    metrics: Vec<MetricBenchmark>,
}

/// Validert benchmark-tabell. Kan kun konstrueres via `new` (eller serde,
/// som går gjennom samme validering), så scoreren får aldri en ugyldig tabell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBenchmarkTable")]
pub struct BenchmarkTable {
    metrics: Vec<MetricBenchmark>,
}

impl TryFrom<RawBenchmarkTable> for BenchmarkTable {
    type Error = CoreError;

    fn try_from(raw: RawBenchmarkTable) -> Result<Self> {
        BenchmarkTable::new(raw.metrics)
    }
}

impl BenchmarkTable {
    pub fn new(metrics: Vec<MetricBenchmark>) -> Result<Self> {
        if metrics.is_empty() {
            return Err(CoreError::table("benchmark table is empty"));
        }
        for (i, mb) in metrics.iter().enumerate() {
            if metrics[..i].iter().any(|o| o.metric == mb.metric) {
                return Err(CoreError::config(mb.metric, "metric listed twice in benchmark table"));
            }
            mb.validate()?;
        }
        Ok(Self { metrics })
    }

    /// Metrikker i deklarasjonsrekkefølge.
    pub fn metrics(&self) -> &[MetricBenchmark] {
        &self.metrics
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricBenchmark> {
        self.metrics.iter().find(|mb| mb.metric == metric)
    }
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        DEFAULT_BENCHMARKS.clone()
    }
}

fn band(label: BandLabel, low: f64, high: f64, floor: f64, ceiling: f64) -> Band {
    Band { label, low, high, floor, ceiling }
}

fn default_metrics() -> Vec<MetricBenchmark> {
    use BandLabel::*;
    use Direction::*;
    vec![
        MetricBenchmark {
            metric: Metric::CadenceSpm,
            direction: HigherIsBetter,
            bands: vec![
                band(Developing, 140.0, 160.0, 30.0, 60.0),
                band(Target, 160.0, 170.0, 60.0, 75.0),
                band(Good, 170.0, 180.0, 75.0, 90.0),
                band(Elite, 180.0, 200.0, 90.0, 100.0),
            ],
            description: "Steps per minute".into(),
        },
        MetricBenchmark {
            metric: Metric::VerticalOscillationCm,
            direction: LowerIsBetter,
            bands: vec![
                band(Elite, 5.0, 7.0, 90.0, 100.0),
                band(Good, 7.0, 8.0, 75.0, 90.0),
                band(Target, 8.0, 9.0, 60.0, 75.0),
                band(Developing, 9.0, 12.0, 30.0, 60.0),
            ],
            description: "Vertical bounce (cm), lower is better".into(),
        },
        MetricBenchmark {
            metric: Metric::GroundContactTimeMs,
            direction: LowerIsBetter,
            bands: vec![
                band(Elite, 180.0, 240.0, 90.0, 100.0),
                band(Good, 240.0, 260.0, 75.0, 90.0),
                band(Target, 260.0, 280.0, 60.0, 75.0),
                band(Developing, 280.0, 340.0, 30.0, 60.0),
            ],
            description: "Ground contact time (ms), shorter is better".into(),
        },
        MetricBenchmark {
            metric: Metric::StepSpeedLossPct,
            direction: LowerIsBetter,
            bands: vec![
                band(Elite, 0.0, 4.0, 90.0, 100.0),
                band(Good, 4.0, 6.0, 75.0, 90.0),
                band(Target, 6.0, 8.0, 60.0, 75.0),
                band(Developing, 8.0, 15.0, 30.0, 60.0),
            ],
            description: "Step speed loss (%), lower is better".into(),
        },
        MetricBenchmark {
            metric: Metric::HrEfficiency,
            direction: HigherIsBetter,
            bands: vec![
                band(Developing, 50.0, 70.0, 30.0, 60.0),
                band(Target, 70.0, 78.0, 60.0, 75.0),
                band(Good, 78.0, 85.0, 75.0, 90.0),
                band(Elite, 85.0, 100.0, 90.0, 100.0),
            ],
            description: "Avg HR as % of max".into(),
        },
    ]
}

static DEFAULT_BENCHMARKS: Lazy<BenchmarkTable> = Lazy::new(|| BenchmarkTable {
    // Statisk tabell; dekkes av `default_table_is_valid`-testen.
    metrics: default_metrics(),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert!(BenchmarkTable::new(default_metrics()).is_ok());
    }

    #[test]
    fn interpolates_inside_band() {
        let t = BenchmarkTable::default();
        let cad = t.get(Metric::CadenceSpm).unwrap();
        let hit = cad.locate(165.0);
        assert_eq!(hit.label, BandLabel::Target);
        assert!((hit.score - 67.5).abs() < 1e-9);

        let vo = t.get(Metric::VerticalOscillationCm).unwrap();
        let hit = vo.locate(7.5);
        assert_eq!(hit.label, BandLabel::Good);
        assert!((hit.score - 82.5).abs() < 1e-9);
    }

    #[test]
    fn band_edges_are_continuous() {
        let t = BenchmarkTable::default();
        let cad = t.get(Metric::CadenceSpm).unwrap();
        let below = cad.locate(170.0 - 1e-9).score;
        let at = cad.locate(170.0).score;
        assert!((below - at).abs() < 1e-6);
    }

    #[test]
    fn clamps_outside_domain() {
        let t = BenchmarkTable::default();
        let gct = t.get(Metric::GroundContactTimeMs).unwrap();
        assert_eq!(gct.locate(100.0).score, 100.0);
        assert_eq!(gct.locate(500.0).score, 30.0);
        assert_eq!(gct.locate(500.0).label, BandLabel::Developing);
    }
}
