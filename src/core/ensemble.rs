//! Fan-out, fan-in and the final verdict.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{field, info, instrument, warn, Span};
use uuid::Uuid;

use crate::config::{EnsembleWeights, Settings};
use crate::core::ai::RiskEstimator;
use crate::core::data::FeatureExtractor;
use crate::core::medication::MedicationSafetyEngine;
use crate::core::pool::WorkerPool;
use crate::core::rules::RuleGuardrail;
use crate::error::Result;
use crate::models::{
    FinalAssessment, IntakeRecord, MedicationEvaluation, MlEvaluation, RiskLevel, RuleEvaluation,
    VulnerabilityFlags,
};
use crate::utils::{clamp_unit, round3};

const RULE_OVERRIDE_FLOOR: f64 = 0.90;
const MEDICATION_OVERRIDE_SCORE: f64 = 0.90;
const MEDICATION_OVERRIDE_CONFIDENCE: f64 = 0.88;

/// Which precedence step decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    RuleOverride,
    MedicationOverride,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub risk_level: RiskLevel,
    pub score: f64,
    pub confidence: f64,
    pub decided_by: Precedence,
}

/// An evaluator whose failure fails the whole assessment.
pub trait SafetyEvaluator<T>: Send + Sync {
    fn evaluate_intake(&self, intake: &IntakeRecord) -> T;
}

impl SafetyEvaluator<RuleEvaluation> for RuleGuardrail {
    fn evaluate_intake(&self, intake: &IntakeRecord) -> RuleEvaluation {
        self.evaluate(&intake.vitals, &intake.vulnerability_flags, &intake.symptoms)
    }
}

impl SafetyEvaluator<MedicationEvaluation> for MedicationSafetyEngine {
    fn evaluate_intake(&self, intake: &IntakeRecord) -> MedicationEvaluation {
        self.evaluate(&intake.medications, &intake.symptoms, &intake.vulnerability_flags)
    }
}

pub struct EnsembleAggregator {
    guardrail: Arc<dyn SafetyEvaluator<RuleEvaluation>>,
    estimator: Arc<RiskEstimator>,
    medication: Arc<dyn SafetyEvaluator<MedicationEvaluation>>,
    weights: EnsembleWeights,
    pool: WorkerPool,
}

impl EnsembleAggregator {
    pub fn new(
        guardrail: RuleGuardrail,
        estimator: RiskEstimator,
        weights: EnsembleWeights,
        pool: WorkerPool,
    ) -> Result<Self> {
        Self::with_evaluators(
            Arc::new(guardrail),
            Arc::new(MedicationSafetyEngine::new()),
            estimator,
            weights,
            pool,
        )
    }

    /// `pool` runs the two safety evaluators; the estimator brings its own.
    pub fn with_evaluators(
        guardrail: Arc<dyn SafetyEvaluator<RuleEvaluation>>,
        medication: Arc<dyn SafetyEvaluator<MedicationEvaluation>>,
        estimator: RiskEstimator,
        weights: EnsembleWeights,
        pool: WorkerPool,
    ) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            guardrail,
            estimator: Arc::new(estimator),
            medication,
            weights,
            pool,
        })
    }

    /// Build the engine from validated settings. The model artifact, if any,
    /// is loaded here and shared read-only by every request.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let pool = WorkerPool::new(settings.pool.max_workers);
        let estimator = RiskEstimator::from_settings(
            &settings.estimator,
            WorkerPool::new(settings.pool.model_workers),
        );
        info!(
            workers = pool.size(),
            model_workers = estimator.pool().size(),
            mode = ?estimator.mode(),
            timeout = ?Duration::from_millis(settings.estimator.model_timeout_ms),
            "risk engine ready"
        );
        Self::new(
            RuleGuardrail::new(settings.thresholds.clone()),
            estimator,
            settings.ensemble,
            pool,
        )
    }

    pub fn estimator(&self) -> &RiskEstimator {
        &self.estimator
    }

    /// Run all three evaluators concurrently and combine them. Fails only
    /// when the guardrail or the medication engine could not complete.
    #[instrument(skip_all, fields(assessment_id = field::Empty))]
    pub async fn assess(&self, intake: &IntakeRecord) -> Result<FinalAssessment> {
        let assessment_id = Uuid::new_v4();
        Span::current().record("assessment_id", field::display(assessment_id));

        let intake = Arc::new(intake.clone());
        let features = FeatureExtractor::from_intake(&intake);

        let rule_job = {
            let guardrail = Arc::clone(&self.guardrail);
            let intake = Arc::clone(&intake);
            self.pool
                .run("rule_guardrail", move || guardrail.evaluate_intake(&intake))
        };
        let medication_job = {
            let engine = Arc::clone(&self.medication);
            let intake = Arc::clone(&intake);
            self.pool
                .run("medication_safety", move || engine.evaluate_intake(&intake))
        };
        let ml_job = self.estimator.estimate(features);

        let (rule, ml, medication) = futures::join!(rule_job, ml_job, medication_job);
        let rule = rule?;
        let medication = medication?;

        Ok(self.finalize(assessment_id, &intake.vulnerability_flags, rule, ml, medication))
    }

    /// Assemble the final assessment from the three sub-evaluations.
    pub fn finalize(
        &self,
        assessment_id: Uuid,
        flags: &VulnerabilityFlags,
        rule: RuleEvaluation,
        ml: MlEvaluation,
        medication: MedicationEvaluation,
    ) -> FinalAssessment {
        let verdict = self.verdict(&rule, &ml, &medication);
        let escalation_suggested = verdict.risk_level.is_escalating() || medication.escalation_override;
        let recommendation = recommendation(verdict.risk_level, &rule, &ml, &medication, flags);

        if escalation_suggested {
            warn!(
                level = %verdict.risk_level,
                score = verdict.score,
                decided_by = ?verdict.decided_by,
                "escalation suggested"
            );
        }
        info!(
            level = %verdict.risk_level,
            score = verdict.score,
            confidence = verdict.confidence,
            rule_severity = rule.severity_score,
            ml_probability = ml.probability,
            medication_warnings = medication.warnings.len(),
            "assessment complete"
        );

        FinalAssessment {
            assessment_id,
            risk_level: verdict.risk_level,
            score: verdict.score,
            confidence: verdict.confidence,
            escalation_suggested,
            recommendation,
            rule,
            ml,
            medication,
            assessed_at: Utc::now(),
        }
    }

    /// Override precedence; the first matching step wins.
    pub fn verdict(
        &self,
        rule: &RuleEvaluation,
        ml: &MlEvaluation,
        medication: &MedicationEvaluation,
    ) -> Verdict {
        let (risk_level, score, confidence, decided_by) = if rule.hard_override {
            (
                rule.risk_level,
                rule.severity_score.max(RULE_OVERRIDE_FLOOR),
                rule.confidence,
                Precedence::RuleOverride,
            )
        } else if medication.escalation_override {
            (
                RiskLevel::Critical,
                MEDICATION_OVERRIDE_SCORE,
                MEDICATION_OVERRIDE_CONFIDENCE,
                Precedence::MedicationOverride,
            )
        } else {
            let score =
                self.weights.rule_weight * rule.severity_score + self.weights.ml_weight * ml.probability;
            let confidence =
                self.weights.rule_weight * rule.confidence + self.weights.ml_weight * ml.confidence;
            (RiskLevel::from_score(score), score, confidence, Precedence::Blend)
        };

        Verdict {
            risk_level,
            score: round3(clamp_unit("final.score", score)),
            confidence: round3(clamp_unit("final.confidence", confidence)),
            decided_by,
        }
    }
}

/// Clinician-facing recommendation text.
pub fn recommendation(
    level: RiskLevel,
    rule: &RuleEvaluation,
    ml: &MlEvaluation,
    medication: &MedicationEvaluation,
    flags: &VulnerabilityFlags,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(
        match level {
            RiskLevel::Critical => "IMMEDIATE ESCALATION REQUIRED.",
            RiskLevel::High => "URGENT: Escalation to specialist strongly recommended.",
            RiskLevel::Moderate => "CAUTION: Close monitoring required. Consider specialist consultation.",
            RiskLevel::Low => "LOW RISK: Can be managed at PHC level with standard protocols.",
        }
        .to_string(),
    );

    if let Some(reason) = rule.top_reason() {
        let prefix = if level == RiskLevel::Critical {
            "Critical finding"
        } else {
            "Key finding"
        };
        lines.push(format!("{}: {}", prefix, reason));
    }

    if !ml.narrative.is_empty() {
        lines.push(format!("AI interpretation: {}", ml.narrative));
    }

    if let Some(warning) = medication.most_severe() {
        lines.push(format!("Medication alert: {}", warning.message));
    }

    if flags.pregnant && level.is_escalating() {
        lines.push("Maternal emergency protocol: ensure IV access, monitor fetal heart rate.".to_string());
    }

    lines.join(" ")
}
