//! Probabilistic risk estimator with per-feature attribution.
//!
//! Two strategies sit behind [`RiskModel`]: a trained [`ModelArtifact`]
//! dispatched to the worker pool, and an analytic heuristic that runs inline.
//! Either way the returned attribution vector is exactly the set of log-odds
//! terms summed into the logit.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::EstimatorSettings;
use crate::core::data::{Feature, FeatureVector, FEATURE_COUNT};
use crate::core::model::{ModelArtifact, Prediction};
use crate::core::pool::WorkerPool;
use crate::error::{EngineError, Result};
use crate::models::{AttributionEntry, EstimatorMode, FeatureImportance, MlEvaluation, RiskLevel};
use crate::utils::clamp_unit;

pub const HEURISTIC_BASE_LOGIT: f64 = -2.5;
pub const HEURISTIC_CONFIDENCE: f64 = 0.72;
pub const MODEL_CONFIDENCE: f64 = 0.90;
pub const HEURISTIC_VERSION: &str = "heuristic-v2";
const TOP_FEATURES: usize = 5;

/// A strategy that turns a feature vector into a prediction.
pub trait RiskModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;
    fn confidence(&self) -> f64;
    fn mode(&self) -> EstimatorMode;
    fn version(&self) -> String;
}

impl RiskModel for ModelArtifact {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        ModelArtifact::predict(self, features)
    }

    fn confidence(&self) -> f64 {
        MODEL_CONFIDENCE
    }

    fn mode(&self) -> EstimatorMode {
        EstimatorMode::Model
    }

    fn version(&self) -> String {
        self.label()
    }
}

/// Hand-calibrated logistic reconstruction used when no artifact is usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicModel;

impl HeuristicModel {
    /// Log-odds impact of a single feature value.
    pub fn impact(feature: Feature, x: f64) -> f64 {
        match feature {
            Feature::Spo2 => {
                if x < 96.0 {
                    ((96.0 - x) * 0.15).max(0.0)
                } else {
                    0.0
                }
            }
            Feature::SystolicBp => {
                if x < 90.0 {
                    (90.0 - x) * 0.05
                } else {
                    ((x - 140.0) * 0.03).max(0.0)
                }
            }
            Feature::HeartRate => {
                if x > 80.0 {
                    (x - 80.0) * 0.02
                } else {
                    0.0
                }
            }
            Feature::RespiratoryRate => ((x - 18.0) * 0.08).max(0.0),
            Feature::Temperature => {
                if x > 37.0 {
                    (x - 37.0) * 0.3
                } else if x < 36.0 {
                    (36.0 - x) * 0.3
                } else {
                    0.0
                }
            }
            Feature::BloodGlucose => {
                if x > 140.0 {
                    ((x - 140.0) * 0.005).max(0.0)
                } else {
                    ((70.0 - x) * 0.02).max(0.0)
                }
            }
            Feature::AgeYears => (x - 40.0) * 0.015,
            Feature::IsPregnant => x * 0.5,
            Feature::IsDiabetic => x * 0.4,
            Feature::HasHeartDisease => x * 0.6,
            Feature::IsImmunocompromised => x * 0.8,
            Feature::ShockIndex => {
                if x > 0.7 {
                    (x - 0.7) * 2.0
                } else {
                    0.0
                }
            }
            Feature::HasChestPain => x * 1.5,
            Feature::HasAlteredConsciousness => x * 2.0,
            Feature::HasBreathingDifficulty => x * 1.2,
            Feature::HasSevereHeadache => x * 0.5,
            Feature::HasBleeding => x * 1.0,
            Feature::RedFlagCount => x * 0.5,
            Feature::DiastolicBp | Feature::SexEncoded | Feature::BmiProxy | Feature::PulsePressure => 0.0,
        }
    }

    pub fn contributions(features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (feature, value) in features.labeled() {
            out[feature.index()] = Self::impact(feature, value);
        }
        out
    }
}

impl RiskModel for HeuristicModel {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        Ok(Prediction::from_contributions(
            HEURISTIC_BASE_LOGIT,
            Self::contributions(features),
        ))
    }

    fn confidence(&self) -> f64 {
        HEURISTIC_CONFIDENCE
    }

    fn mode(&self) -> EstimatorMode {
        EstimatorMode::Heuristic
    }

    fn version(&self) -> String {
        HEURISTIC_VERSION.to_string()
    }
}

pub struct RiskEstimator {
    model: Option<Arc<dyn RiskModel>>,
    pool: WorkerPool,
    timeout: Duration,
    degraded: AtomicBool,
}

impl RiskEstimator {
    pub fn heuristic(pool: WorkerPool) -> Self {
        Self {
            model: None,
            pool,
            timeout: Duration::from_millis(EstimatorSettings::default().model_timeout_ms),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn with_model(model: Arc<dyn RiskModel>, pool: WorkerPool, timeout: Duration) -> Self {
        Self {
            model: Some(model),
            pool,
            timeout,
            degraded: AtomicBool::new(false),
        }
    }

    /// Load the configured artifact once. A missing or invalid artifact puts
    /// the estimator in heuristic mode for the lifetime of the process.
    pub fn from_settings(settings: &EstimatorSettings, pool: WorkerPool) -> Self {
        let timeout = Duration::from_millis(settings.model_timeout_ms);
        let Some(path) = settings.model_path.as_deref() else {
            info!("no model artifact configured, running in heuristic mode");
            return Self {
                timeout,
                ..Self::heuristic(pool)
            };
        };
        match ModelArtifact::load(path) {
            Ok(artifact) => Self::with_model(Arc::new(artifact), pool, timeout),
            Err(e) => {
                warn!(error = %e, "model artifact unavailable, running in heuristic mode");
                Self {
                    timeout,
                    ..Self::heuristic(pool)
                }
            }
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn mode(&self) -> EstimatorMode {
        self.model
            .as_ref()
            .map_or(EstimatorMode::Heuristic, |m| m.mode())
    }

    /// Never fails: any model-path problem degrades to the heuristic.
    pub async fn estimate(&self, features: FeatureVector) -> MlEvaluation {
        if let Some(model) = &self.model {
            match self.run_model(Arc::clone(model), features).await {
                Ok(prediction) => {
                    if self.degraded.swap(false, Ordering::Relaxed) {
                        info!(model = %model.version(), "model path recovered");
                    }
                    return build_evaluation(
                        &features,
                        &prediction,
                        model.confidence(),
                        model.mode(),
                        model.version(),
                    );
                }
                Err(e) => {
                    if !self.degraded.swap(true, Ordering::Relaxed) {
                        warn!(model = %model.version(), error = %e, "model path failed, using heuristic");
                    } else {
                        debug!(error = %e, "model path still degraded");
                    }
                }
            }
        }

        let heuristic = HeuristicModel;
        let prediction = Prediction::from_contributions(
            HEURISTIC_BASE_LOGIT,
            HeuristicModel::contributions(&features),
        );
        build_evaluation(
            &features,
            &prediction,
            heuristic.confidence(),
            heuristic.mode(),
            heuristic.version(),
        )
    }

    async fn run_model(&self, model: Arc<dyn RiskModel>, features: FeatureVector) -> Result<Prediction> {
        let job = self.pool.run("risk_model", move || model.predict(&features));
        match tokio::time::timeout(self.timeout, job).await {
            Ok(joined) => joined?,
            Err(_) => Err(EngineError::Inference(format!(
                "model exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Shared post-processing for both strategies.
pub fn build_evaluation(
    features: &FeatureVector,
    prediction: &Prediction,
    confidence: f64,
    mode: EstimatorMode,
    model_version: String,
) -> MlEvaluation {
    let probability = clamp_unit("ml.probability", prediction.probability);
    let confidence = clamp_unit("ml.confidence", confidence);
    let risk_level = RiskLevel::from_score(probability);
    let attribution = prediction.attribution;

    let mut ranked: Vec<usize> = (0..FEATURE_COUNT).collect();
    ranked.sort_by(|&a, &b| by_magnitude(attribution[a], attribution[b]));

    let top_features: Vec<AttributionEntry> = ranked
        .iter()
        .take(TOP_FEATURES)
        .map(|&i| {
            let feature = Feature::ALL[i];
            let value = features.get(feature);
            let contribution = attribution[i];
            AttributionEntry {
                feature,
                value,
                contribution,
                label: attribution_label(feature, value, contribution),
            }
        })
        .collect();

    let feature_importance = ranked
        .iter()
        .map(|&i| {
            let feature = Feature::ALL[i];
            FeatureImportance {
                feature,
                label: feature.label().to_string(),
                value: features.get(feature),
                importance: attribution[i].abs(),
            }
        })
        .collect();

    let narrative = narrative(&top_features, risk_level);
    info!(
        probability,
        level = %risk_level,
        confidence,
        mode = ?mode,
        "risk estimate"
    );

    MlEvaluation {
        probability,
        risk_level,
        confidence,
        top_features,
        narrative,
        base_value: prediction.base_value,
        attribution: attribution.to_vec(),
        feature_importance,
        mode,
        model_version,
    }
}

/// Descending by absolute value; the sort is stable so ties keep index order.
fn by_magnitude(a: f64, b: f64) -> CmpOrdering {
    b.abs().partial_cmp(&a.abs()).unwrap_or(CmpOrdering::Equal)
}

fn attribution_label(feature: Feature, value: f64, contribution: f64) -> String {
    let arrow = if contribution > 0.0 { '↑' } else { '↓' };
    format!(
        "{} = {:.1} (impact: {}{:.3})",
        feature.label(),
        value,
        arrow,
        contribution.abs()
    )
}

fn interpret(entry: &AttributionEntry) -> String {
    let text = match entry.feature {
        Feature::SystolicBp if entry.value < 100.0 => "low blood pressure",
        Feature::SystolicBp => "elevated blood pressure",
        Feature::AgeYears if entry.value < 40.0 => "younger age",
        Feature::AgeYears => "older age",
        Feature::Spo2 => "oxygen desaturation",
        Feature::ShockIndex => "shock indicators (elevated HR relative to BP)",
        Feature::RespiratoryRate => "rapid breathing",
        Feature::HeartRate => "rapid heart rate",
        Feature::HasAlteredConsciousness => "altered level of consciousness",
        Feature::HasChestPain => "chest pain",
        Feature::IsImmunocompromised => "immunocompromised state",
        Feature::IsPregnant => "pregnancy-related risk",
        Feature::Temperature => "abnormal temperature",
        other => return other.name().replace('_', " "),
    };
    text.to_string()
}

fn closing_phrase(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "suggest critical deterioration requiring immediate intervention",
        RiskLevel::High => "indicate high risk, escalation strongly recommended",
        RiskLevel::Moderate => "suggest moderate risk, close monitoring required",
        RiskLevel::Low => "suggest lower risk, standard care appropriate",
    }
}

pub fn narrative(top: &[AttributionEntry], level: RiskLevel) -> String {
    let Some(first) = top.first() else {
        return "Insufficient data to generate clinical interpretation.".to_string();
    };
    let mut text = format!("Primary driver: {}", interpret(first));
    if let Some(second) = top.get(1) {
        text.push_str(" combined with ");
        text.push_str(&interpret(second));
    }
    format!("{} {}.", text, closing_phrase(level))
}
