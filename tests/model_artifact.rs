use std::fs;

use phc_risk::config::Settings;
use phc_risk::core::data::Feature;
use phc_risk::core::model::ModelArtifact;
use phc_risk::models::{EstimatorMode, IntakeRecord, Sex, VitalsSnapshot, VulnerabilityFlags};
use phc_risk::{EngineError, EnsembleAggregator};

fn artifact_json() -> serde_json::Value {
    let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
    let mut weights = vec![0.0; names.len()];
    let mut reference = vec![0.0; names.len()];
    weights[Feature::Spo2.index()] = -0.25;
    reference[Feature::Spo2.index()] = 97.0;
    weights[Feature::RespiratoryRate.index()] = 0.1;
    reference[Feature::RespiratoryRate.index()] = 16.0;
    serde_json::json!({
        "name": "phc-logreg",
        "version": "3",
        "feature_names": names,
        "weights": weights,
        "intercept": -2.2,
        "reference": reference,
    })
}

fn intake() -> IntakeRecord {
    IntakeRecord {
        age: 60,
        sex: Sex::Male,
        vulnerability_flags: VulnerabilityFlags::default(),
        vitals: VitalsSnapshot {
            spo2: 91.0,
            respiratory_rate: 22,
            ..Default::default()
        },
        medications: vec![],
        symptoms: vec![],
        chief_complaint: "shortness of breath".into(),
    }
}

#[tokio::test]
async fn engine_uses_configured_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, artifact_json().to_string()).unwrap();

    let mut settings = Settings::default();
    settings.estimator.model_path = Some(path);
    settings.estimator.model_timeout_ms = 5_000;
    let engine = EnsembleAggregator::from_settings(&settings).unwrap();
    assert_eq!(engine.estimator().mode(), EstimatorMode::Model);

    let assessment = engine.assess(&intake()).await.unwrap();
    let ml = &assessment.ml;
    assert_eq!(ml.mode, EstimatorMode::Model);
    assert_eq!(ml.model_version, "phc-logreg-3");
    assert_eq!(ml.confidence, 0.90);

    // spo2: -0.25 * (91 - 97) = 1.5, rr: 0.1 * (22 - 16) = 0.6
    assert!((ml.attribution[Feature::Spo2.index()] - 1.5).abs() < 1e-9);
    assert!((ml.attribution[Feature::RespiratoryRate.index()] - 0.6).abs() < 1e-9);
    let logit = ml.base_value + ml.attribution.iter().sum::<f64>();
    assert!((logit - (ml.probability / (1.0 - ml.probability)).ln()).abs() < 1e-9);
    assert_eq!(ml.top_features[0].feature, Feature::Spo2);
}

#[tokio::test]
async fn corrupt_artifact_falls_back_to_heuristic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, "{ not json").unwrap();

    let mut settings = Settings::default();
    settings.estimator.model_path = Some(path);
    let engine = EnsembleAggregator::from_settings(&settings).unwrap();
    assert_eq!(engine.estimator().mode(), EstimatorMode::Heuristic);

    let assessment = engine.assess(&intake()).await.unwrap();
    assert_eq!(assessment.ml.mode, EstimatorMode::Heuristic);
    assert_eq!(assessment.ml.model_version, "heuristic-v2");
}

#[test]
fn artifact_with_wrong_feature_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let mut json = artifact_json();
    json["weights"] = serde_json::json!([0.1, 0.2]);
    fs::write(&path, json.to_string()).unwrap();

    let err = ModelArtifact::load(&path).unwrap_err();
    assert!(matches!(err, EngineError::ModelArtifact(_)));
}
