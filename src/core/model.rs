//! Trained logistic model artifact with exact linear attribution.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::data::{Feature, FeatureVector, FEATURE_COUNT};
use crate::error::{EngineError, Result};

pub fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Output of either estimator strategy, in log-odds space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub base_value: f64,
    /// Per-feature log-odds contributions in extractor order.
    pub attribution: [f64; FEATURE_COUNT],
}

impl Prediction {
    pub fn from_contributions(base_value: f64, attribution: [f64; FEATURE_COUNT]) -> Self {
        let logit = base_value + attribution.iter().sum::<f64>();
        Self {
            probability: sigmoid(logit),
            base_value,
            attribution,
        }
    }

    pub fn logit(&self) -> f64 {
        self.base_value + self.attribution.iter().sum::<f64>()
    }

    pub fn is_finite(&self) -> bool {
        self.probability.is_finite()
            && self.base_value.is_finite()
            && self.attribution.iter().all(|a| a.is_finite())
    }
}

/// Serialized logistic classifier.
///
/// `reference` is the background point the attribution is measured against,
/// typically the training-set mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub reference: Vec<f64>,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::ModelArtifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&raw).map_err(|e| {
            EngineError::ModelArtifact(format!("cannot parse {}: {}", path.display(), e))
        })?;
        artifact.validate()?;
        info!(
            name = %artifact.name,
            version = %artifact.version,
            path = %path.display(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        let expected: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        if self.feature_names != expected {
            return Err(EngineError::ModelArtifact(format!(
                "feature order mismatch: expected {:?}, got {:?}",
                expected, self.feature_names
            )));
        }
        if self.weights.len() != FEATURE_COUNT || self.reference.len() != FEATURE_COUNT {
            return Err(EngineError::ModelArtifact(format!(
                "expected {} weights and reference values, got {} and {}",
                FEATURE_COUNT,
                self.weights.len(),
                self.reference.len()
            )));
        }
        let all_finite = self.intercept.is_finite()
            && self.weights.iter().chain(&self.reference).all(|v| v.is_finite());
        if !all_finite {
            return Err(EngineError::ModelArtifact("non-finite coefficient".into()));
        }
        Ok(())
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Log-odds at the reference point.
    pub fn base_value(&self) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(&self.reference)
                .map(|(w, r)| w * r)
                .sum::<f64>()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let mut attribution = [0.0; FEATURE_COUNT];
        for (i, slot) in attribution.iter_mut().enumerate() {
            *slot = self.weights[i] * (features.values()[i] - self.reference[i]);
        }
        let prediction = Prediction::from_contributions(self.base_value(), attribution);
        if !prediction.is_finite() {
            return Err(EngineError::Inference(format!(
                "non-finite logit {} from model {}",
                prediction.logit(),
                self.label()
            )));
        }
        Ok(prediction)
    }
}
