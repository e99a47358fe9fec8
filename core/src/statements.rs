use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::benchmark::BandLabel;
use crate::types::{Metric, RoundTo};

/// Hva en melding gjelder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Strength,
    Focus,
}

/// Hvilken vei verdien må flyttes for å nå målet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Raise,
    Lower,
    Hold,
}

/// Én mal. `None` i et nøkkelfelt betyr "matcher alt"; mest spesifikke
/// mal vinner, ved likhet den første.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTemplate {
    pub kind: StatementKind,
    #[serde(default)]
    pub metric: Option<Metric>,
    #[serde(default)]
    pub band: Option<BandLabel>,
    #[serde(default)]
    pub adjustment: Option<Adjustment>,
    /// Plassholdere: {metric} {value} {target} {band} {unit}
    pub template: String,
}

impl StatementTemplate {
    fn matches(&self, kind: StatementKind, metric: Metric, band: BandLabel, adj: Adjustment) -> bool {
        self.kind == kind
            && self.metric.map_or(true, |m| m == metric)
            && self.band.map_or(true, |b| b == band)
            && self.adjustment.map_or(true, |a| a == adj)
    }

    fn specificity(&self) -> u8 {
        // metrikk veier tyngst, deretter bånd, så retning
        (self.metric.is_some() as u8) * 4 + (self.band.is_some() as u8) * 2 + self.adjustment.is_some() as u8
    }
}

/// Nøkkel for oppslag i katalogen.
#[derive(Debug, Clone, Copy)]
pub struct StatementKey {
    pub kind: StatementKind,
    pub metric: Metric,
    pub band: BandLabel,
    pub adjustment: Adjustment,
    pub value: f64,
    pub target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementCatalog {
    pub templates: Vec<StatementTemplate>,
    /// Brukes når ingen styrker kvalifiserer selv ved gulvet.
    #[serde(default = "default_no_strengths")]
    pub no_strengths: String,
}

fn default_no_strengths() -> String {
    "No standout strengths yet".to_string()
}

impl StatementCatalog {
    pub fn render(&self, key: &StatementKey) -> String {
        let mut best: Option<&StatementTemplate> = None;
        for t in &self.templates {
            if !t.matches(key.kind, key.metric, key.band, key.adjustment) {
                continue;
            }
            if best.map_or(true, |b| t.specificity() > b.specificity()) {
                best = Some(t);
            }
        }
        match best {
            Some(t) => fill(&t.template, key),
            None => format!("{}: {}", key.metric.label(), key.value.round_to(2)),
        }
    }
}

fn fill(template: &str, key: &StatementKey) -> String {
    let target = key
        .target
        .map(|t| t.round_to(2).to_string())
        .unwrap_or_else(|| "-".to_string());
    template
        .replace("{metric}", key.metric.label())
        .replace("{value}", &key.value.round_to(2).to_string())
        .replace("{target}", &target)
        .replace("{band}", &key.band.to_string())
        .replace("{unit}", key.metric.unit())
}

impl Default for StatementCatalog {
    fn default() -> Self {
        DEFAULT_STATEMENTS.clone()
    }
}

fn tpl(
    kind: StatementKind,
    metric: Option<Metric>,
    band: Option<BandLabel>,
    adjustment: Option<Adjustment>,
    template: &str,
) -> StatementTemplate {
    StatementTemplate { kind, metric, band, adjustment, template: template.to_string() }
}

static DEFAULT_STATEMENTS: Lazy<StatementCatalog> = Lazy::new(|| {
    use Adjustment::*;
    use BandLabel::*;
    use Metric::*;
    use StatementKind::*;
    StatementCatalog {
        templates: vec![
            // Generelle fallbacks
            tpl(Strength, None, None, None, "{metric} is a strength ({value} {unit}, {band})"),
            tpl(Strength, None, Some(Elite), None, "{metric} is at elite level ({value} {unit})"),
            tpl(Focus, None, None, Some(Raise), "Raise {metric} from {value} toward {target} {unit}"),
            tpl(Focus, None, None, Some(Lower), "Bring {metric} down from {value} toward {target} {unit}"),
            tpl(Focus, None, None, Some(Hold), "Keep {metric} steady around {value} {unit}"),
            // Metrikkspesifikke råd
            tpl(Focus, Some(CadenceSpm), None, Some(Raise),
                "Increase cadence from {value} to {target}+ spm using metronome drills"),
            tpl(Focus, Some(StepSpeedLossPct), None, Some(Lower),
                "Reduce step speed loss ({value}%) with hill repeats and lower-body strength training"),
            tpl(Focus, Some(VerticalOscillationCm), None, Some(Lower),
                "Improve vertical oscillation ({value} cm) with lighter footstrike drills and calf strengthening"),
            tpl(Focus, Some(GroundContactTimeMs), None, Some(Lower),
                "Shorten ground contact ({value} ms) with plyometrics and explosive leg work"),
            tpl(Focus, Some(HrEfficiency), None, Some(Raise),
                "Build aerobic base to lift HR efficiency from {value}% toward {target}%"),
            tpl(Strength, Some(CadenceSpm), None, None, "Quick turnover: cadence {value} spm ({band})"),
            tpl(Strength, Some(GroundContactTimeMs), None, None, "Reactive stride: {value} ms ground contact ({band})"),
        ],
        no_strengths: default_no_strengths(),
    }
});
