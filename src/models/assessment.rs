use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::data::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Probability/score banding shared by the estimator and the ensemble blend.
    /// Never yields `Critical`; only overrides do.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.70 {
            RiskLevel::High
        } else if score >= 0.30 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn is_escalating(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the deterministic guardrail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub triggered: bool,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub triggered_rules: Vec<String>,
    #[serde(rename = "override")]
    pub hard_override: bool,
    pub confidence: f64,
    pub severity_score: f64,
}

impl RuleEvaluation {
    pub fn top_reason(&self) -> Option<&str> {
        self.reasons.first().map(String::as_str)
    }

    pub fn fired(&self, rule_id: &str) -> bool {
        self.triggered_rules.iter().any(|id| id == rule_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorMode {
    Model,
    Heuristic,
}

/// One feature's signed share of the estimator's log-odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionEntry {
    pub feature: Feature,
    pub value: f64,
    pub contribution: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    pub label: String,
    pub value: f64,
    pub importance: f64,
}

/// Outcome of the probabilistic estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlEvaluation {
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    /// Five strongest drivers by absolute contribution.
    pub top_features: Vec<AttributionEntry>,
    pub narrative: String,
    /// Log-odds before any feature contributes.
    pub base_value: f64,
    /// Per-feature contributions in extractor order.
    pub attribution: Vec<f64>,
    pub feature_importance: Vec<FeatureImportance>,
    pub mode: EstimatorMode,
    pub model_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    Ddi,
    DrugCondition,
    DrugSymptom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Mild,
    Moderate,
    Severe,
    Contraindicated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationWarning {
    pub drugs: Vec<String>,
    pub category: WarningCategory,
    pub severity: WarningSeverity,
    pub message: String,
    pub action_required: bool,
    pub override_triggered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationEvaluation {
    pub warnings: Vec<MedicationWarning>,
    #[serde(rename = "override")]
    pub escalation_override: bool,
}

impl MedicationEvaluation {
    pub fn from_warnings(warnings: Vec<MedicationWarning>) -> Self {
        let escalation_override = warnings.iter().any(|w| w.override_triggered);
        Self {
            warnings,
            escalation_override,
        }
    }

    /// The most severe warning at `severe` or above; the earliest wins a tie.
    pub fn most_severe(&self) -> Option<&MedicationWarning> {
        let mut worst: Option<&MedicationWarning> = None;
        for warning in &self.warnings {
            if warning.severity < WarningSeverity::Severe {
                continue;
            }
            if worst.map_or(true, |w| warning.severity > w.severity) {
                worst = Some(warning);
            }
        }
        worst
    }
}

/// The single verdict handed to persistence and notification collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAssessment {
    pub assessment_id: Uuid,
    pub risk_level: RiskLevel,
    pub score: f64,
    pub confidence: f64,
    pub escalation_suggested: bool,
    pub recommendation: String,
    pub rule: RuleEvaluation,
    pub ml: MlEvaluation,
    pub medication: MedicationEvaluation,
    pub assessed_at: DateTime<Utc>,
}

/// Payload the notification collaborator broadcasts to specialists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationNotice {
    pub case_id: String,
    pub assessment_id: Uuid,
    pub risk_level: RiskLevel,
    pub score: f64,
    pub headline: String,
    pub issued_at: DateTime<Utc>,
}

impl FinalAssessment {
    pub fn escalation_notice(&self, case_id: &str) -> Option<EscalationNotice> {
        if !self.escalation_suggested {
            return None;
        }
        let headline = self
            .rule
            .top_reason()
            .map(str::to_owned)
            .or_else(|| self.medication.most_severe().map(|w| w.message.clone()))
            .unwrap_or_else(|| self.ml.narrative.clone());

        Some(EscalationNotice {
            case_id: case_id.to_owned(),
            assessment_id: self.assessment_id,
            risk_level: self.risk_level,
            score: self.score,
            headline,
            issued_at: self.assessed_at,
        })
    }
}
