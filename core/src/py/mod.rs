// Python-bindinger: tynne JSON inn/ut-wrappere rundt kjernen.
// Bygges kun med `--features python` (maturin).
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use serde::de::DeserializeOwned;
use serde_path_to_error as spte;

use crate::aggregate::BaselineProfile;
use crate::config::CoreConfig;
use crate::error::CoreError;

fn to_py(err: CoreError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse<T: DeserializeOwned>(s: &str) -> PyResult<T> {
    let de = &mut serde_json::Deserializer::from_str(s);
    spte::deserialize(de).map_err(|e| to_py(e.into()))
}

fn config_or_default(cfg_json: Option<&str>) -> PyResult<CoreConfig> {
    match cfg_json {
        Some(s) => CoreConfig::from_json(s).map_err(to_py),
        None => Ok(CoreConfig::default()),
    }
}

fn dump<T: serde::Serialize>(v: &T) -> PyResult<String> {
    serde_json::to_string(v).map_err(|e| to_py(e.into()))
}

/// Hele pipelinen: aktiviteter (JSON-liste) → rapport (JSON).
#[pyfunction]
#[pyo3(signature = (records_json, cfg_json=None))]
fn analyze_json(records_json: &str, cfg_json: Option<&str>) -> PyResult<String> {
    crate::analyze::analyze_json(records_json, cfg_json).map_err(to_py)
}

#[pyfunction]
fn build_baseline_json(records_json: &str) -> PyResult<String> {
    let records: Vec<crate::types::ActivityRecord> = parse(records_json)?;
    let baseline = crate::aggregate::build_baseline(&records).map_err(to_py)?;
    dump(&baseline)
}

#[pyfunction]
#[pyo3(signature = (baseline_json, cfg_json=None))]
fn score_form_json(baseline_json: &str, cfg_json: Option<&str>) -> PyResult<String> {
    let baseline: BaselineProfile = parse(baseline_json)?;
    let cfg = config_or_default(cfg_json)?;
    let score = crate::scoring::score_form(&baseline, &cfg.benchmarks, &cfg.scoring).map_err(to_py)?;
    dump(&score)
}

#[pyfunction]
#[pyo3(signature = (baseline_json, cfg_json=None))]
fn match_archetypes_json(baseline_json: &str, cfg_json: Option<&str>) -> PyResult<String> {
    let baseline: BaselineProfile = parse(baseline_json)?;
    let cfg = config_or_default(cfg_json)?;
    let report = crate::archetype::match_all(&baseline, &cfg.catalog, &cfg.matching).map_err(to_py)?;
    dump(&report)
}

/// Returnerer flate rader (én per syntetisk økt), klare for pandas.
#[pyfunction]
#[pyo3(signature = (baseline_json, cfg_json=None))]
fn synthesize_json(baseline_json: &str, cfg_json: Option<&str>) -> PyResult<String> {
    let baseline: BaselineProfile = parse(baseline_json)?;
    let cfg = config_or_default(cfg_json)?;
    let synth = crate::synth::Synthesizer::new(&cfg.catalog, &cfg.synthesis).map_err(to_py)?;
    let dataset = synth.generate_all(&baseline).map_err(to_py)?;
    dump(&dataset.rows())
}

#[pymodule]
fn stridegraph_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(analyze_json, m)?)?;
    m.add_function(wrap_pyfunction!(build_baseline_json, m)?)?;
    m.add_function(wrap_pyfunction!(score_form_json, m)?)?;
    m.add_function(wrap_pyfunction!(match_archetypes_json, m)?)?;
    m.add_function(wrap_pyfunction!(synthesize_json, m)?)?;
    Ok(())
}
