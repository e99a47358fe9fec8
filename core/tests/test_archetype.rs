// core/tests/test_archetype.rs
use std::collections::BTreeMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use stridegraph_core::{
    match_all, match_archetype, Archetype, ArchetypeCatalog, BaselineProfile, CoreConfig,
    CoreError, FitClass, MatchConfig, Metric, Range,
};

fn archetype(key: &str, ranges: &[(Metric, f64, f64)]) -> Archetype {
    Archetype {
        key: key.to_string(),
        name: key.replace('_', " "),
        description: String::new(),
        focus: String::new(),
        training_focus: Vec::new(),
        target_pace_min_km: None,
        target_max_hr: None,
        ranges: ranges.iter().map(|(m, lo, hi)| (*m, Range::new(*lo, *hi))).collect(),
    }
}

fn scenario_baseline() -> BaselineProfile {
    BaselineProfile::from_means([
        (Metric::CadenceSpm, 165.7),
        (Metric::VerticalOscillationCm, 8.63),
        (Metric::GroundContactTimeMs, 271.0),
        (Metric::StepSpeedLossPct, 7.32),
        (Metric::HrEfficiency, 81.4),
    ])
}

fn scenario_balanced() -> Archetype {
    archetype(
        "balanced_runner",
        &[
            (Metric::CadenceSpm, 165.0, 175.0),
            (Metric::VerticalOscillationCm, 7.5, 8.5),
            (Metric::GroundContactTimeMs, 250.0, 270.0),
            (Metric::StepSpeedLossPct, 5.0, 7.0),
            (Metric::HrEfficiency, 78.0, 82.0),
        ],
    )
}

#[test]
fn scenario_distance_and_deltas() {
    let m = match_archetype(&scenario_baseline(), &scenario_balanced(), &MatchConfig::default());

    // 0.13/1 + 1/20 + 0.32/2
    assert!((m.distance - 0.34).abs() < 1e-9, "distance {}", m.distance);
    assert_eq!(m.fit, FitClass::Good);

    let by_metric: BTreeMap<Metric, _> = m.deltas.iter().map(|d| (d.metric, d)).collect();
    let cad = by_metric[&Metric::CadenceSpm];
    assert!(cad.within_range);
    assert_eq!(cad.delta, 0.0);
    assert_eq!(cad.target, 165.7);

    let vo = by_metric[&Metric::VerticalOscillationCm];
    assert!(!vo.within_range);
    assert!((vo.normalized_overshoot - 0.13).abs() < 1e-9);
    assert!((vo.target - 8.0).abs() < 1e-12);
    assert!((vo.delta + 0.63).abs() < 1e-9);

    let gct = by_metric[&Metric::GroundContactTimeMs];
    assert!((gct.normalized_overshoot - 0.05).abs() < 1e-12);
    assert_eq!(gct.target, 260.0);
    assert_eq!(gct.delta, -11.0);

    let ssl = by_metric[&Metric::StepSpeedLossPct];
    assert!((ssl.delta + 1.32).abs() < 1e-9);

    assert_eq!(by_metric[&Metric::HrEfficiency].delta, 0.0);
    assert!(m.unscored.is_empty());
}

#[test]
fn distance_is_zero_iff_every_metric_within_range() {
    let a = scenario_balanced();
    let cfg = MatchConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    for _ in 0..1_000 {
        let means: Vec<(Metric, f64)> = a
            .ranges
            .iter()
            .map(|(m, r)| {
                let pad = r.width();
                (*m, rng.gen_range(r.low - pad..=r.high + pad))
            })
            .collect();
        let all_within = means.iter().all(|(m, v)| a.ranges[m].contains(*v));
        let matched = match_archetype(&BaselineProfile::from_means(means), &a, &cfg);
        assert_eq!(matched.distance == 0.0, all_within, "distance {}", matched.distance);
        assert!(matched.distance >= 0.0);
    }
}

#[test]
fn exceeding_a_range_on_the_good_side_still_counts_as_outside() {
    // asymmetri gjelder retning mot målet, ikke "bedre enn målet"
    let a = archetype("steady", &[(Metric::CadenceSpm, 155.0, 165.0)]);
    let b = BaselineProfile::from_means([(Metric::CadenceSpm, 175.0)]);
    let m = match_archetype(&b, &a, &MatchConfig::default());
    assert!((m.distance - 1.0).abs() < 1e-12);
    assert_eq!(m.fit, FitClass::Fair);
}

#[test]
fn zero_width_range_normalizes_by_one_unit() {
    let a = archetype("pinned", &[(Metric::CadenceSpm, 170.0, 170.0)]);
    let b = BaselineProfile::from_means([(Metric::CadenceSpm, 167.5)]);
    let m = match_archetype(&b, &a, &MatchConfig::default());
    assert!((m.distance - 2.5).abs() < 1e-12);
    assert_eq!(m.fit, FitClass::Poor);
}

#[test]
fn tie_goes_to_first_declared() {
    let ranges = [(Metric::CadenceSpm, 170.0, 180.0)];
    let catalog = ArchetypeCatalog::new(
        "test",
        vec![archetype("first", &ranges), archetype("second", &ranges)],
    )
    .unwrap();
    let b = BaselineProfile::from_means([(Metric::CadenceSpm, 160.0)]);
    let report = match_all(&b, &catalog, &MatchConfig::default()).unwrap();
    assert_eq!(report.best.key, "first");
    assert_eq!(report.matches.len(), 2);
    assert_eq!(report.matches[0].distance, report.matches[1].distance);
    assert_eq!(report.catalog_version, "test");
}

#[test]
fn default_catalog_picks_balanced_for_scenario() {
    let report = match_all(&scenario_baseline(), &ArchetypeCatalog::default(), &MatchConfig::default()).unwrap();
    let keys: Vec<&str> = report.matches.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["steady_runner", "efficient_runner", "balanced_runner"]);
    assert_eq!(report.best.key, "balanced_runner");
    let min = report.matches.iter().map(|m| m.distance).fold(f64::INFINITY, f64::min);
    assert_eq!(report.best.distance, min);
}

#[test]
fn metric_missing_from_baseline_is_listed_not_scored() {
    let b = BaselineProfile::from_means([(Metric::CadenceSpm, 160.0)]);
    let m = match_archetype(&b, &scenario_balanced(), &MatchConfig::default());
    assert_eq!(m.deltas.len(), 1);
    assert_eq!(m.unscored.len(), 4);
    assert!((m.distance - 0.5).abs() < 1e-12);
}

#[test]
fn no_shared_metric_is_insufficient_data() {
    let b = BaselineProfile::from_means([(Metric::PowerWatts, 240.0)]);
    let err = match_all(&b, &ArchetypeCatalog::default(), &MatchConfig::default()).unwrap_err();
    assert!(matches!(err, CoreError::InsufficientData(_)), "{err:?}");
}

#[test]
fn inverted_range_is_rejected_at_construction() {
    let bad = archetype("upside_down", &[(Metric::GroundContactTimeMs, 270.0, 250.0)]);
    let err = ArchetypeCatalog::new("v1", vec![bad]).unwrap_err();
    match err {
        CoreError::Configuration { metric, detail } => {
            assert_eq!(metric, Some(Metric::GroundContactTimeMs));
            assert!(detail.contains("inverted"), "{detail}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn duplicate_keys_and_empty_catalog_are_rejected() {
    let a = archetype("twin", &[(Metric::CadenceSpm, 160.0, 170.0)]);
    assert!(ArchetypeCatalog::new("v1", vec![a.clone(), a]).is_err());
    assert!(ArchetypeCatalog::new("v1", vec![]).is_err());
}

#[test]
fn weights_scale_each_overshoot() {
    let mut cfg = MatchConfig::default();
    cfg.weights.insert(Metric::StepSpeedLossPct, 2.0);
    let m = match_archetype(&scenario_baseline(), &scenario_balanced(), &cfg);
    assert!((m.distance - 0.50).abs() < 1e-9, "distance {}", m.distance);
}

#[test]
fn catalog_loads_from_config_json() {
    let json = r#"{
        "catalog": {
            "version": "cohort-40plus",
            "archetypes": [{
                "key": "trail_runner",
                "name": "Trail Runner",
                "ranges": {
                    "cadence_spm": {"low": 160, "high": 170},
                    "ground_contact_time_ms": {"low": 260, "high": 280}
                }
            }]
        }
    }"#;
    let cfg = CoreConfig::from_json(json).unwrap();
    assert_eq!(cfg.catalog.version(), "cohort-40plus");
    assert_eq!(cfg.catalog.len(), 1);
    let a = cfg.catalog.get("trail_runner").unwrap();
    assert_eq!(a.range(Metric::CadenceSpm), Some(Range::new(160.0, 170.0)));
}

#[test]
fn uneven_baseline_coverage_is_insufficient_data() {
    let catalog = ArchetypeCatalog::new(
        "test",
        vec![
            archetype("full", &[(Metric::CadenceSpm, 170.0, 180.0), (Metric::GroundContactTimeMs, 240.0, 250.0)]),
            archetype("cadence_only", &[(Metric::CadenceSpm, 170.0, 180.0)]),
        ],
    )
    .unwrap();

    // kun kadens målt: "full" ville sluppet unna GCT-straffen
    let partial = BaselineProfile::from_means([(Metric::CadenceSpm, 160.0)]);
    let err = match_all(&partial, &catalog, &MatchConfig::default()).unwrap_err();
    match err {
        CoreError::InsufficientData(msg) => assert!(msg.contains("full"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }

    // begge dekket fullt ut => sammenlignbart, selv med ulike metrikksett
    let complete = BaselineProfile::from_means([
        (Metric::CadenceSpm, 160.0),
        (Metric::GroundContactTimeMs, 270.0),
    ]);
    let report = match_all(&complete, &catalog, &MatchConfig::default()).unwrap();
    assert_eq!(report.best.key, "cadence_only");
}
