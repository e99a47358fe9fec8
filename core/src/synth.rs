use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::BaselineProfile;
use crate::archetype::{Archetype, ArchetypeCatalog};
use crate::counters;
use crate::error::{CoreError, Result};
use crate::types::{Metric, MetricSample, Range, RoundTo};

/// Gyllent snitt-konstant for seed-avledning per arketype.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Horizon {
    pub weeks: u32,
    pub runs_per_week: u32,
}

impl Default for Horizon {
    fn default() -> Self {
        Self { weeks: 16, runs_per_week: 3 }
    }
}

impl Horizon {
    pub fn total_runs(&self) -> usize {
        self.weeks as usize * self.runs_per_week as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.weeks < 2 {
            return Err(CoreError::InvalidHorizon(format!(
                "weeks must be >= 2 for interpolation, got {}",
                self.weeks
            )));
        }
        if self.runs_per_week == 0 {
            return Err(CoreError::InvalidHorizon("runs_per_week must be >= 1, got 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Std for støy = fraction × arketypens intervallbredde
    pub fraction: f64,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { fraction: 0.08, seed: 42 }
    }
}

/// Treningsvolum per syntetisk økt (uniformt trukket).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub distance_km: Range,
    pub duration_min: Range,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            distance_km: Range::new(4.0, 12.0),
            duration_min: Range::new(30.0, 80.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub horizon: Horizon,
    pub noise: NoiseConfig,
    pub volume: VolumeConfig,
    /// Konvolutten utvides med margin × bredden av unionen på hver side
    pub envelope_margin: f64,
    pub start_date: Option<NaiveDate>,
    pub id_offset: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::default(),
            noise: NoiseConfig::default(),
            volume: VolumeConfig::default(),
            envelope_margin: 0.5,
            start_date: None,
            id_offset: 1000,
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<()> {
        self.horizon.validate()?;
        let f = self.noise.fraction;
        if !f.is_finite() || f < 0.0 {
            return Err(CoreError::InvalidHorizon(format!("noise fraction must be >= 0, got {f}")));
        }
        let m = self.envelope_margin;
        if !m.is_finite() || m < 0.0 {
            return Err(CoreError::InvalidHorizon(format!("envelope margin must be >= 0, got {m}")));
        }
        for (name, r) in [("distance_km", self.volume.distance_km), ("duration_min", self.volume.duration_min)] {
            if !(r.low.is_finite() && r.high.is_finite()) || r.low <= 0.0 || r.low > r.high {
                return Err(CoreError::InvalidHorizon(format!(
                    "volume {name} must be a positive range, got [{}, {}]",
                    r.low, r.high
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementPhase {
    Early,
    Mid,
    Advanced,
}

impl ImprovementPhase {
    /// Tredjedeler av t/W. Ren funksjon av posisjon, aldri av støyverdien.
    pub fn at(week_index: u32, weeks: u32) -> Self {
        let (t, w) = (week_index as u64 * 3, weeks as u64);
        if t < w {
            ImprovementPhase::Early
        } else if t < 2 * w {
            ImprovementPhase::Mid
        } else {
            ImprovementPhase::Advanced
        }
    }
}

/// Fysiologisk konvolutt: unionen av alle arketypeintervaller (strukket til
/// å dekke baseline-snittet), utvidet med margin × unionens bredde på hver side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ranges: BTreeMap<Metric, Range>,
}

impl Envelope {
    pub fn new(catalog: &ArchetypeCatalog, margin: f64, baseline: Option<&BaselineProfile>) -> Self {
        let mut union: BTreeMap<Metric, Range> = BTreeMap::new();
        for a in catalog.archetypes() {
            for (m, r) in &a.ranges {
                union
                    .entry(*m)
                    .and_modify(|u| {
                        u.low = u.low.min(r.low);
                        u.high = u.high.max(r.high);
                    })
                    .or_insert(*r);
            }
        }
        let ranges = union
            .into_iter()
            .map(|(m, u)| {
                let pad = margin * u.width();
                let (mut low, mut high) = (u.low, u.high);
                if let Some(b) = baseline.and_then(|b| b.mean(m)) {
                    low = low.min(b);
                    high = high.max(b);
                }
                (m, Range::new(low - pad, high + pad))
            })
            .collect();
        Self { ranges }
    }

    pub fn clamp(&self, metric: Metric, value: f64) -> f64 {
        match self.ranges.get(&metric) {
            Some(r) => value.clamp(r.low, r.high),
            None => value,
        }
    }
}

/// Én generert økt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRun {
    pub archetype_key: String,
    pub archetype_name: String,
    pub week_index: u32,
    pub day_index: u32,
    pub phase: ImprovementPhase,
    pub distance_km: f64,
    pub duration_min: f64,
    pub aerobic_te: Option<f64>,
    pub sample: MetricSample,
}

/// Flat rad for CSV/JSON-eksport, ingen nøstede strukturer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRow {
    pub activity_id: String,
    pub target_profile: String,
    pub week: u32,
    pub day: u32,
    pub improvement_phase: ImprovementPhase,
    pub date: Option<NaiveDate>,
    pub distance_km: f64,
    pub duration_min: f64,
    pub cadence_spm: Option<f64>,
    pub vertical_oscillation_cm: Option<f64>,
    pub ground_contact_time_ms: Option<f64>,
    pub step_speed_loss_pct: Option<f64>,
    pub hr_efficiency: Option<f64>,
    pub heart_rate_bpm: Option<f64>,
    pub pace_min_km: Option<f64>,
    pub power_watts: Option<f64>,
    pub aerobic_te: Option<f64>,
}

impl From<&SyntheticRun> for SyntheticRow {
    fn from(r: &SyntheticRun) -> Self {
        let v = |m: Metric| r.sample.get(m);
        SyntheticRow {
            activity_id: r.sample.id.clone(),
            target_profile: r.archetype_name.clone(),
            week: r.week_index,
            day: r.day_index,
            improvement_phase: r.phase,
            date: r.sample.date,
            distance_km: r.distance_km,
            duration_min: r.duration_min,
            cadence_spm: v(Metric::CadenceSpm),
            vertical_oscillation_cm: v(Metric::VerticalOscillationCm),
            ground_contact_time_ms: v(Metric::GroundContactTimeMs),
            step_speed_loss_pct: v(Metric::StepSpeedLossPct),
            hr_efficiency: v(Metric::HrEfficiency),
            heart_rate_bpm: v(Metric::HeartRateBpm),
            pace_min_km: v(Metric::PaceMinKm),
            power_watts: v(Metric::PowerWatts),
            aerobic_te: r.aerobic_te,
        }
    }
}

/// Hele datasettet: per-arketype blokker etter hverandre.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyntheticDataset {
    pub runs: Vec<SyntheticRun>,
}

impl SyntheticDataset {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn for_archetype<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SyntheticRun> + 'a {
        self.runs.iter().filter(move |r| r.archetype_key == key)
    }

    pub fn rows(&self) -> Vec<SyntheticRow> {
        self.runs.iter().map(SyntheticRow::from).collect()
    }
}

/// Seed for arketype nr. `index`. Avhenger kun av (seed, index), så å legge
/// til/fjerne arketyper bakerst endrer ikke tidligere arketypers data.
pub fn derive_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(SEED_MIX)
}

/// Støyfri verdi for uke `t`: lineær fra baseline (t=0) til målets midtpunkt
/// (t=W-1). Metrikker som allerede er innenfor intervallet holdes konstant.
/// Forutsetter `weeks >= 2` (sjekket av `Horizon::validate`).
fn ideal_value(baseline: f64, range: &Range, week_index: u32, weeks: u32) -> f64 {
    if range.contains(baseline) {
        return baseline;
    }
    let progress = week_index as f64 / (weeks - 1) as f64;
    baseline + (range.midpoint() - baseline) * progress
}

/// Ideell (støyfri) bane per uke for alle metrikker baseline og arketype deler.
pub fn ideal_trajectory(
    baseline: &BaselineProfile,
    archetype: &Archetype,
    horizon: &Horizon,
) -> Result<Vec<BTreeMap<Metric, f64>>> {
    horizon.validate()?;
    Ok((0..horizon.weeks)
        .map(|t| {
            archetype
                .ranges
                .iter()
                .filter_map(|(m, r)| {
                    baseline.mean(*m).map(|b| (*m, ideal_value(b, r, t, horizon.weeks)))
                })
                .collect()
        })
        .collect())
}

/// Avledet effekt fra kadens og puls.
pub fn estimate_power(cadence_spm: f64, heart_rate_bpm: f64) -> f64 {
    200.0 + (cadence_spm - 160.0) * 2.0 + (heart_rate_bpm - 140.0) * 0.5
}

/// Aerob treningseffekt fra puls, klemt til [1, 5].
pub fn estimate_aerobic_te(heart_rate_bpm: f64) -> f64 {
    (1.5 + (heart_rate_bpm - 140.0) * 0.05).clamp(1.0, 5.0)
}

enum Plan {
    /// Interpoleres mot arketypen, med valgfri støy
    Progress { range: Range, noise: Option<Normal<f64>> },
    /// Finnes kun i baseline: føres videre uten støy
    Carry,
}

/// Progresjonsgenerator. Validerer horisont og støy ved konstruksjon slik at
/// ingen generering starter med ugyldige parametre.
pub struct Synthesizer<'a> {
    catalog: &'a ArchetypeCatalog,
    config: &'a SynthesisConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(catalog: &'a ArchetypeCatalog, config: &'a SynthesisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn envelope(&self, baseline: &BaselineProfile) -> Envelope {
        Envelope::new(self.catalog, self.config.envelope_margin, Some(baseline))
    }

    /// W×R økter for arketype nr. `index` i katalogen.
    pub fn generate(&self, baseline: &BaselineProfile, index: usize) -> Result<Vec<SyntheticRun>> {
        let archetype = self.catalog.archetypes().get(index).ok_or_else(|| {
            CoreError::table(format!(
                "archetype index {index} out of range ({} archetypes)",
                self.catalog.len()
            ))
        })?;
        let envelope = self.envelope(baseline);
        self.generate_with(baseline, archetype, index, &envelope)
    }

    fn plans(&self, baseline: &BaselineProfile, archetype: &Archetype) -> Result<BTreeMap<Metric, (f64, Plan)>> {
        let fraction = self.config.noise.fraction;
        let mut plans = BTreeMap::new();
        for (metric, stats) in &baseline.metrics {
            let plan = match archetype.range(*metric) {
                Some(range) => {
                    let sd = fraction * range.width();
                    // Bredde 0 => deterministisk mål, ingen støy
                    let noise = if sd > 0.0 {
                        Some(Normal::new(0.0, sd).map_err(|e| {
                            CoreError::InvalidHorizon(format!("noise for {metric}: {e}"))
                        })?)
                    } else {
                        None
                    };
                    Plan::Progress { range, noise }
                }
                None => Plan::Carry,
            };
            plans.insert(*metric, (stats.mean, plan));
        }
        for m in archetype.ranges.keys().filter(|m| !baseline.metrics.contains_key(*m)) {
            debug!("{}: {} missing from baseline, not synthesized", archetype.key, m);
        }
        Ok(plans)
    }

    fn generate_with(
        &self,
        baseline: &BaselineProfile,
        archetype: &Archetype,
        index: usize,
        envelope: &Envelope,
    ) -> Result<Vec<SyntheticRun>> {
        let cfg = self.config;
        let Horizon { weeks, runs_per_week } = cfg.horizon;
        let plans = self.plans(baseline, archetype)?;
        let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(cfg.noise.seed, index));
        let day_spacing = (7 / runs_per_week).max(1) as i64;

        let mut runs = Vec::with_capacity(cfg.horizon.total_runs());
        for week in 0..weeks {
            let phase = ImprovementPhase::at(week, weeks);
            for day in 0..runs_per_week {
                let mut values = BTreeMap::new();
                for (metric, (base, plan)) in &plans {
                    let v = match plan {
                        Plan::Progress { range, noise } => {
                            let ideal = ideal_value(*base, range, week, weeks);
                            let eps = noise.as_ref().map_or(0.0, |n| n.sample(&mut rng));
                            envelope.clamp(*metric, (ideal + eps).round_to(2))
                        }
                        Plan::Carry => base.round_to(2),
                    };
                    values.insert(*metric, v);
                }

                let vol = &cfg.volume;
                let distance_km = rng.gen_range(vol.distance_km.low..=vol.distance_km.high).round_to(2);
                let duration_min = rng.gen_range(vol.duration_min.low..=vol.duration_min.high).round_to(1);
                values.insert(Metric::PaceMinKm, (duration_min / distance_km).round_to(2));

                let hr = values.get(&Metric::HeartRateBpm).copied();
                if let (Some(cad), Some(hr)) = (values.get(&Metric::CadenceSpm).copied(), hr) {
                    values.insert(Metric::PowerWatts, estimate_power(cad, hr).round_to(0));
                }
                let aerobic_te = hr.map(|h| estimate_aerobic_te(h).round_to(1));

                let n = runs.len() as u32;
                let date = cfg.start_date.map(|d| {
                    d + Duration::days(7 * week as i64 + day as i64 * day_spacing)
                });
                runs.push(SyntheticRun {
                    archetype_key: archetype.key.clone(),
                    archetype_name: archetype.name.clone(),
                    week_index: week,
                    day_index: day,
                    phase,
                    distance_km,
                    duration_min,
                    aerobic_te,
                    sample: MetricSample {
                        id: format!("synthetic_{}_{}", archetype.key, cfg.id_offset + n + 1),
                        date,
                        week: Some(week),
                        day: Some(day),
                        values,
                    },
                });
            }
        }

        counters::get()
            .synthetic_runs
            .with_label_values(&[archetype.key.as_str()])
            .inc_by(runs.len() as u64);
        debug!("{}: generated {} runs (seed {})", archetype.key, runs.len(), derive_seed(cfg.noise.seed, index));
        Ok(runs)
    }

    /// Alle arketyper, sekvensielt, i katalogrekkefølge.
    pub fn generate_all(&self, baseline: &BaselineProfile) -> Result<SyntheticDataset> {
        let envelope = self.envelope(baseline);
        let mut runs = Vec::with_capacity(self.catalog.len() * self.config.horizon.total_runs());
        for (i, a) in self.catalog.archetypes().iter().enumerate() {
            runs.extend(self.generate_with(baseline, a, i, &envelope)?);
        }
        info!("synthetic dataset: {} runs over {} archetypes", runs.len(), self.catalog.len());
        Ok(SyntheticDataset { runs })
    }

    /// Samme resultat som `generate_all`, men arketypene genereres parallelt.
    /// Rekkefølgen bevares siden hver arketype har sin egen seed.
    pub fn generate_all_parallel(&self, baseline: &BaselineProfile) -> Result<SyntheticDataset> {
        let envelope = self.envelope(baseline);
        let parts = self
            .catalog
            .archetypes()
            .par_iter()
            .enumerate()
            .map(|(i, a)| self.generate_with(baseline, a, i, &envelope))
            .collect::<Result<Vec<_>>>()?;

        let runs: Vec<SyntheticRun> = parts.into_iter().flatten().collect();
        info!("synthetic dataset (parallel): {} runs", runs.len());
        Ok(SyntheticDataset { runs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_thirds_for_sixteen_weeks() {
        assert_eq!(ImprovementPhase::at(0, 16), ImprovementPhase::Early);
        assert_eq!(ImprovementPhase::at(5, 16), ImprovementPhase::Early);
        assert_eq!(ImprovementPhase::at(6, 16), ImprovementPhase::Mid);
        assert_eq!(ImprovementPhase::at(10, 16), ImprovementPhase::Mid);
        assert_eq!(ImprovementPhase::at(11, 16), ImprovementPhase::Advanced);
        assert_eq!(ImprovementPhase::at(15, 16), ImprovementPhase::Advanced);
    }

    #[test]
    fn ideal_holds_when_inside_range() {
        let r = Range::new(165.0, 175.0);
        for t in 0..16 {
            assert_eq!(ideal_value(168.0, &r, t, 16), 168.0);
        }
    }

    #[test]
    fn ideal_reaches_midpoint_at_last_week() {
        let r = Range::new(250.0, 270.0);
        assert_eq!(ideal_value(290.0, &r, 0, 16), 290.0);
        assert!((ideal_value(290.0, &r, 15, 16) - 260.0).abs() < 1e-12);
    }

    #[test]
    fn seed_index_zero_is_identity() {
        assert_eq!(derive_seed(42, 0), 42);
        assert_ne!(derive_seed(42, 1), derive_seed(42, 2));
    }
}
