// core/tests/test_synth.rs
use stridegraph_core::{
    ideal_trajectory, Archetype, ArchetypeCatalog, BaselineProfile, CoreError, Horizon,
    ImprovementPhase, Metric, Range, RoundTo, SynthesisConfig, Synthesizer,
};

fn baseline() -> BaselineProfile {
    BaselineProfile::from_means([
        (Metric::CadenceSpm, 165.7),
        (Metric::VerticalOscillationCm, 8.63),
        (Metric::GroundContactTimeMs, 271.0),
        (Metric::StepSpeedLossPct, 7.32),
        (Metric::HrEfficiency, 81.4),
        (Metric::HeartRateBpm, 152.0),
    ])
}

fn archetype(key: &str, ranges: &[(Metric, f64, f64)]) -> Archetype {
    Archetype {
        key: key.to_string(),
        name: key.to_string(),
        description: String::new(),
        focus: String::new(),
        training_focus: Vec::new(),
        target_pace_min_km: None,
        target_max_hr: None,
        ranges: ranges.iter().map(|(m, lo, hi)| (*m, Range::new(*lo, *hi))).collect(),
    }
}

fn balanced_only() -> ArchetypeCatalog {
    let a = ArchetypeCatalog::default().get("balanced_runner").cloned().unwrap();
    ArchetypeCatalog::new("balanced", vec![a]).unwrap()
}

fn with_seed(seed: u64) -> SynthesisConfig {
    let mut cfg = SynthesisConfig::default();
    cfg.noise.seed = seed;
    cfg
}

#[test]
fn default_horizon_yields_48_rows_per_archetype() {
    let catalog = ArchetypeCatalog::default();
    let cfg = SynthesisConfig::default();
    let ds = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&baseline()).unwrap();

    assert_eq!(ds.len(), 144);
    assert_eq!(ds.rows().len(), 144);
    for a in catalog.archetypes() {
        assert_eq!(ds.for_archetype(&a.key).count(), 48, "{}", a.key);
    }

    for run in &ds.runs {
        assert_eq!(run.phase, ImprovementPhase::at(run.week_index, 16));
        let expected = if run.week_index * 3 < 16 {
            ImprovementPhase::Early
        } else if run.week_index * 3 < 32 {
            ImprovementPhase::Mid
        } else {
            ImprovementPhase::Advanced
        };
        assert_eq!(run.phase, expected);
        assert_eq!(run.sample.week, Some(run.week_index));
    }

    let first = &ds.rows()[0];
    assert_eq!(first.activity_id, "synthetic_steady_runner_1001");
    assert_eq!(first.target_profile, "Steady Runner");
    assert!(first.power_watts.is_some() && first.aerobic_te.is_some());
}

#[test]
fn same_seed_gives_byte_identical_output() {
    let catalog = ArchetypeCatalog::default();
    let cfg = with_seed(7);
    let a = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&baseline()).unwrap();
    let b = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&baseline()).unwrap();
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn different_seeds_differ_in_noise_only() {
    let catalog = ArchetypeCatalog::default();
    let (c1, c2) = (with_seed(1), with_seed(2));
    let a = Synthesizer::new(&catalog, &c1).unwrap().generate_all(&baseline()).unwrap();
    let b = Synthesizer::new(&catalog, &c2).unwrap().generate_all(&baseline()).unwrap();
    assert_ne!(a, b);

    // uten støy er banen lik ideal(t) for begge seeds
    let (mut q1, mut q2) = (with_seed(1), with_seed(2));
    q1.noise.fraction = 0.0;
    q2.noise.fraction = 0.0;
    let base = baseline();
    let a = Synthesizer::new(&catalog, &q1).unwrap().generate_all(&base).unwrap();
    let b = Synthesizer::new(&catalog, &q2).unwrap().generate_all(&base).unwrap();

    for arch in catalog.archetypes() {
        let ideal = ideal_trajectory(&base, arch, &q1.horizon).unwrap();
        for (ra, rb) in a.for_archetype(&arch.key).zip(b.for_archetype(&arch.key)) {
            for m in arch.ranges.keys() {
                let want = ideal[ra.week_index as usize][m].round_to(2);
                assert_eq!(ra.sample.get(*m), Some(want), "{} {m} week {}", arch.key, ra.week_index);
                assert_eq!(rb.sample.get(*m), Some(want));
            }
        }
    }
}

#[test]
fn two_week_horizon_hits_baseline_then_midpoint() {
    let catalog = balanced_only();
    let mut cfg = SynthesisConfig::default();
    cfg.horizon = Horizon { weeks: 2, runs_per_week: 4_000 };
    let base = baseline();
    let runs = Synthesizer::new(&catalog, &cfg).unwrap().generate(&base, 0).unwrap();
    assert_eq!(runs.len(), 8_000);

    let arch = &catalog.archetypes()[0];
    for (metric, range) in &arch.ranges {
        let b = base.mean(*metric).unwrap();
        let sd = cfg.noise.fraction * range.width();
        let tol = 5.0 * sd / (4_000f64).sqrt() + 0.01;
        let mean_of = |week: u32| {
            let xs: Vec<f64> = runs
                .iter()
                .filter(|r| r.week_index == week)
                .filter_map(|r| r.sample.get(*metric))
                .collect();
            xs.iter().sum::<f64>() / xs.len() as f64
        };
        let end = if range.contains(b) { b } else { range.midpoint() };
        assert!((mean_of(0) - b).abs() < tol, "{metric} week 0: {} vs {b}", mean_of(0));
        assert!((mean_of(1) - end).abs() < tol, "{metric} week 1: {} vs {end}", mean_of(1));
    }
}

#[test]
fn degenerate_horizons_are_rejected() {
    let catalog = ArchetypeCatalog::default();
    for horizon in [Horizon { weeks: 1, runs_per_week: 3 }, Horizon { weeks: 16, runs_per_week: 0 }] {
        let cfg = SynthesisConfig { horizon, ..SynthesisConfig::default() };
        let err = Synthesizer::new(&catalog, &cfg).err().unwrap();
        assert!(matches!(err, CoreError::InvalidHorizon(_)), "{err:?}");
    }

    let mut cfg = SynthesisConfig::default();
    cfg.noise.fraction = -0.1;
    assert!(matches!(Synthesizer::new(&catalog, &cfg).err(), Some(CoreError::InvalidHorizon(_))));
}

#[test]
fn zero_width_range_produces_exact_targets() {
    let pinned = archetype(
        "pinned",
        &[(Metric::CadenceSpm, 170.0, 170.0), (Metric::GroundContactTimeMs, 240.0, 260.0)],
    );
    let catalog = ArchetypeCatalog::new("v1", vec![pinned]).unwrap();
    let cfg = SynthesisConfig::default();
    let base = baseline();
    let runs = Synthesizer::new(&catalog, &cfg).unwrap().generate(&base, 0).unwrap();

    for r in &runs {
        let t = r.week_index as f64 / 15.0;
        let want = (165.7 + (170.0 - 165.7) * t).round_to(2);
        assert_eq!(r.sample.get(Metric::CadenceSpm), Some(want));
    }
    let last = runs.last().unwrap();
    assert_eq!(last.sample.get(Metric::CadenceSpm), Some(170.0));
}

#[test]
fn baseline_only_metrics_are_carried_without_noise() {
    let catalog = ArchetypeCatalog::default();
    let cfg = SynthesisConfig::default();
    let ds = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&baseline()).unwrap();
    assert!(ds.runs.iter().all(|r| r.sample.get(Metric::HeartRateBpm) == Some(152.0)));
}

#[test]
fn values_stay_inside_envelope_under_heavy_noise() {
    let catalog = ArchetypeCatalog::default();
    let mut cfg = SynthesisConfig::default();
    cfg.noise.fraction = 5.0;
    let base = baseline();
    let synth = Synthesizer::new(&catalog, &cfg).unwrap();
    let env = synth.envelope(&base);
    let ds = synth.generate_all(&base).unwrap();

    let mut clamped = 0;
    for r in &ds.runs {
        for (m, range) in &env.ranges {
            let v = r.sample.get(*m).unwrap();
            assert!(range.contains(v), "{m}={v} outside [{}, {}]", range.low, range.high);
            if v == range.low || v == range.high {
                clamped += 1;
            }
        }
    }
    assert!(clamped > 0, "fraction 5.0 should hit the envelope at least once");
}

#[test]
fn appending_an_archetype_leaves_earlier_rows_untouched() {
    let base = baseline();
    let cfg = SynthesisConfig::default();

    let catalog = ArchetypeCatalog::default();
    let before = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&base).unwrap();

    let mut archetypes = catalog.archetypes().to_vec();
    archetypes.push(archetype(
        "recovery_runner",
        &[
            (Metric::CadenceSpm, 160.0, 170.0),
            (Metric::VerticalOscillationCm, 7.2, 7.8),
            (Metric::GroundContactTimeMs, 250.0, 260.0),
            (Metric::StepSpeedLossPct, 5.0, 6.0),
            (Metric::HrEfficiency, 78.0, 84.0),
        ],
    ));
    let extended = ArchetypeCatalog::new(catalog.version(), archetypes).unwrap();
    let after = Synthesizer::new(&extended, &cfg).unwrap().generate_all(&base).unwrap();

    assert_eq!(after.len(), before.len() + 48);
    assert_eq!(&after.runs[..before.len()], &before.runs[..]);
}

#[test]
fn parallel_generation_matches_sequential() {
    let catalog = ArchetypeCatalog::default();
    let cfg = with_seed(1234);
    let synth = Synthesizer::new(&catalog, &cfg).unwrap();
    let seq = synth.generate_all(&baseline()).unwrap();
    let par = synth.generate_all_parallel(&baseline()).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn dates_follow_week_and_day_spacing() {
    let catalog = balanced_only();
    let mut cfg = SynthesisConfig::default();
    cfg.start_date = chrono::NaiveDate::from_ymd_opt(2025, 1, 6);
    let runs = Synthesizer::new(&catalog, &cfg).unwrap().generate(&baseline(), 0).unwrap();
    let start = cfg.start_date.unwrap();
    // R=3 => økter hver 2. dag
    assert_eq!(runs[0].sample.date, Some(start));
    assert_eq!(runs[2].sample.date, Some(start + chrono::Duration::days(4)));
    assert_eq!(runs[3].sample.date, Some(start + chrono::Duration::days(7)));
}

#[test]
fn volume_and_derived_fields_are_consistent() {
    let catalog = ArchetypeCatalog::default();
    let cfg = SynthesisConfig::default();
    let ds = Synthesizer::new(&catalog, &cfg).unwrap().generate_all(&baseline()).unwrap();
    for r in &ds.runs {
        assert!((4.0..=12.0).contains(&r.distance_km));
        assert!((30.0..=80.0).contains(&r.duration_min));
        let pace = r.sample.get(Metric::PaceMinKm).unwrap();
        assert_eq!(pace, (r.duration_min / r.distance_km).round_to(2));
        let te = r.aerobic_te.unwrap();
        assert!((1.0..=5.0).contains(&te));
    }
}

#[test]
fn ideal_trajectory_rejects_single_week_horizons() {
    let arch = ArchetypeCatalog::default().archetypes()[0].clone();
    for weeks in [0, 1] {
        let horizon = Horizon { weeks, runs_per_week: 3 };
        let err = ideal_trajectory(&baseline(), &arch, &horizon).unwrap_err();
        assert!(matches!(err, CoreError::InvalidHorizon(_)), "weeks={weeks}: {err:?}");
    }

    let ok = ideal_trajectory(&baseline(), &arch, &Horizon { weeks: 2, runs_per_week: 1 }).unwrap();
    assert_eq!(ok.len(), 2);
    assert!(ok.iter().flat_map(|w| w.values()).all(|v| v.is_finite()));
}
