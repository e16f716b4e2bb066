//! Data contracts consumed and produced by the decision engine.

pub mod assessment;
pub mod patient;

pub use assessment::{
    AttributionEntry, EscalationNotice, EstimatorMode, FeatureImportance, FinalAssessment,
    MedicationEvaluation, MedicationWarning, MlEvaluation, RiskLevel, RuleEvaluation,
    WarningCategory, WarningSeverity,
};
pub use patient::{
    IntakeRecord, MedicationRecord, Sex, SymptomRecord, SymptomSeverity, VitalsSnapshot,
    VulnerabilityFlags,
};
