use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fast metrikksett. Rekkefølgen her er "deklarasjonsrekkefølgen" som brukes
/// til tie-breaks i gap-rangering og ved generering av støy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[serde(alias = "cadence")]
    CadenceSpm,
    #[serde(alias = "vertical_oscillation")]
    VerticalOscillationCm,
    #[serde(alias = "ground_contact_time")]
    GroundContactTimeMs,
    #[serde(alias = "step_speed_loss_percent", alias = "step_speed_loss")]
    StepSpeedLossPct,
    HrEfficiency,
    #[serde(alias = "heart_rate", alias = "avg_hr")]
    HeartRateBpm,
    PaceMinKm,
    PowerWatts,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::CadenceSpm,
        Metric::VerticalOscillationCm,
        Metric::GroundContactTimeMs,
        Metric::StepSpeedLossPct,
        Metric::HrEfficiency,
        Metric::HeartRateBpm,
        Metric::PaceMinKm,
        Metric::PowerWatts,
    ];

    /// Nøkkel slik den står i JSON/CSV.
    pub fn key(self) -> &'static str {
        match self {
            Metric::CadenceSpm => "cadence_spm",
            Metric::VerticalOscillationCm => "vertical_oscillation_cm",
            Metric::GroundContactTimeMs => "ground_contact_time_ms",
            Metric::StepSpeedLossPct => "step_speed_loss_pct",
            Metric::HrEfficiency => "hr_efficiency",
            Metric::HeartRateBpm => "heart_rate_bpm",
            Metric::PaceMinKm => "pace_min_km",
            Metric::PowerWatts => "power_watts",
        }
    }

    /// Lesbart navn til meldinger.
    pub fn label(self) -> &'static str {
        match self {
            Metric::CadenceSpm => "Cadence",
            Metric::VerticalOscillationCm => "Vertical oscillation",
            Metric::GroundContactTimeMs => "Ground contact time",
            Metric::StepSpeedLossPct => "Step speed loss",
            Metric::HrEfficiency => "HR efficiency",
            Metric::HeartRateBpm => "Heart rate",
            Metric::PaceMinKm => "Pace",
            Metric::PowerWatts => "Power",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::CadenceSpm => "spm",
            Metric::VerticalOscillationCm => "cm",
            Metric::GroundContactTimeMs => "ms",
            Metric::StepSpeedLossPct | Metric::HrEfficiency => "%",
            Metric::HeartRateBpm => "bpm",
            Metric::PaceMinKm => "min/km",
            Metric::PowerWatts => "W",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Én aktivitet slik ingest-laget leverer den (flat, null per metrikk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub metrics: BTreeMap<Metric, Option<f64>>,
    /// Brukes til å avlede hr_efficiency (avg/max × 100)
    #[serde(default)]
    pub max_hr: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub duration_min: Option<f64>,
}

impl ActivityRecord {
    pub fn new(activity_id: impl Into<String>) -> Self {
        Self { activity_id: activity_id.into(), ..Default::default() }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, Some(value));
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Normaliserer til en MetricSample: dropper null/ikke-finite verdier og
    /// avleder hr_efficiency og pace når de mangler men kan regnes ut.
    pub fn to_sample(&self) -> MetricSample {
        let mut values: BTreeMap<Metric, f64> = self
            .metrics
            .iter()
            .filter_map(|(m, v)| v.filter(|x| x.is_finite()).map(|x| (*m, x)))
            .collect();

        if !values.contains_key(&Metric::HrEfficiency) {
            if let (Some(hr), Some(max)) = (values.get(&Metric::HeartRateBpm), self.max_hr) {
                if max.is_finite() && max > 0.0 {
                    values.insert(Metric::HrEfficiency, hr / max * 100.0);
                }
            }
        }

        if !values.contains_key(&Metric::PaceMinKm) {
            if let (Some(dist), Some(dur)) = (self.distance_km, self.duration_min) {
                if dist.is_finite() && dur.is_finite() && dist > 0.0 {
                    values.insert(Metric::PaceMinKm, dur / dist);
                }
            }
        }

        MetricSample {
            id: self.activity_id.clone(),
            date: self.date,
            week: None,
            day: None,
            values,
        }
    }
}

/// Én observasjon (målt eller syntetisk). Opprettes ferdig og endres ikke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub values: BTreeMap<Metric, f64>,
}

impl MetricSample {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// Lukket intervall [low, high].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.low + self.high)
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        self.low <= v && v <= self.high
    }

    /// Avstand forbi nærmeste grense (0 innenfor).
    #[inline]
    pub fn overshoot(&self, v: f64) -> f64 {
        if v < self.low {
            self.low - v
        } else if v > self.high {
            v - self.high
        } else {
            0.0
        }
    }
}

// --- RoundTo trait (brukes til 2-desimalers utdata) ---
pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if dp == 0 { return self.round(); }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round() / factor
    }
}
