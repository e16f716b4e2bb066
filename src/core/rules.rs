//! NEWS2-style weighted clinical guardrail.
//!
//! Rules are declarative descriptors evaluated by one tier interpreter.
//! Only genuinely life-threatening findings (hard-critical tier, obstetric
//! danger signs) override outright; everything else adds its weight to a
//! running total that is mapped to a risk level at the end. Overlapping rules
//! are summed without deduplication.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Thresholds;
use crate::core::data::{mentions_any, normalized_symptoms};
use crate::models::{RiskLevel, RuleEvaluation, SymptomRecord, VitalsSnapshot, VulnerabilityFlags};

const HARD_CRITICAL_CONFIDENCE: f64 = 0.98;
const OBSTETRIC_CONFIDENCE: f64 = 0.95;
const OBSTETRIC_SIGN_WEIGHT: f64 = 0.40;
const PREECLAMPSIA_SBP: u16 = 140;
const PREECLAMPSIA_DBP: u16 = 90;
const IMMUNOCOMPROMISED_FEVER_C: f64 = 38.0;
const IMMUNOCOMPROMISED_FEVER_WEIGHT: f64 = 0.20;
const MODERATE_SEVERITY: f64 = 0.25;

/// A single predicate could not be evaluated.
#[derive(Debug, Error, PartialEq)]
pub enum PredicateError {
    #[error("{field} is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },
}

fn finite(field: &'static str, value: f64) -> Result<f64, PredicateError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredicateError::NonFinite { field, value })
    }
}

pub type Predicate = fn(&VitalsSnapshot, &Thresholds) -> Result<bool, PredicateError>;
pub type ReasonTemplate = fn(&VitalsSnapshot, &Thresholds) -> String;

/// Declarative vital-sign rule.
pub struct VitalRule {
    pub id: &'static str,
    pub weight: f64,
    pub predicate: Predicate,
    pub reason: ReasonTemplate,
}

/// Life-threatening findings; any match overrides and stops evaluation.
pub static HARD_CRITICAL_TIER: &[VitalRule] = &[
    VitalRule {
        id: "GCS_CRITICAL",
        weight: 1.0,
        predicate: |v, t| Ok(v.gcs_score.map_or(false, |gcs| gcs <= t.gcs_critical)),
        reason: |v, _| {
            format!(
                "Severely altered consciousness: GCS = {}",
                v.gcs_score.unwrap_or_default()
            )
        },
    },
    VitalRule {
        id: "TEMP_HYPOTHERMIA",
        weight: 1.0,
        predicate: |v, t| Ok(finite("temperature", v.temperature)? < t.temp_hypothermia),
        reason: |v, _| format!("Hypothermia: Temp = {}°C", v.temperature),
    },
    VitalRule {
        id: "HTN_CRISIS",
        weight: 1.0,
        predicate: |v, t| Ok(f64::from(v.systolic_bp) >= t.sbp_hypertensive_crisis),
        reason: |v, _| {
            format!(
                "Hypertensive crisis: BP = {}/{} mmHg",
                v.systolic_bp, v.diastolic_bp
            )
        },
    },
];

/// Serious findings that are scored, not overridden.
pub static WEIGHTED_CRITICAL_TIER: &[VitalRule] = &[
    VitalRule {
        id: "SPO2_CRITICAL",
        weight: 0.35,
        predicate: |v, t| Ok(finite("spo2", v.spo2)? < t.spo2_critical),
        reason: |v, t| {
            format!(
                "Severe oxygen desaturation: SpO2 = {}% (threshold < {}%)",
                v.spo2, t.spo2_critical
            )
        },
    },
    VitalRule {
        id: "SBP_CRITICAL",
        weight: 0.30,
        predicate: |v, t| Ok(f64::from(v.systolic_bp) < t.sbp_critical),
        reason: |v, t| {
            format!(
                "Severe hypotension/shock risk: SBP = {} mmHg (threshold < {} mmHg)",
                v.systolic_bp, t.sbp_critical
            )
        },
    },
    VitalRule {
        id: "RR_CRITICAL",
        weight: 0.25,
        predicate: |v, t| Ok(f64::from(v.respiratory_rate) > t.rr_critical),
        reason: |v, t| {
            format!(
                "Severe respiratory distress: RR = {}/min (threshold > {}/min)",
                v.respiratory_rate, t.rr_critical
            )
        },
    },
    VitalRule {
        id: "TEMP_CRITICAL",
        weight: 0.20,
        predicate: |v, t| Ok(finite("temperature", v.temperature)? > t.temp_critical),
        reason: |v, t| {
            format!(
                "Hyperpyrexia: Temp = {}°C (threshold > {}°C)",
                v.temperature, t.temp_critical
            )
        },
    },
    VitalRule {
        id: "HYPOGLYCEMIA_SEVERE",
        weight: 0.25,
        predicate: |v, t| {
            Ok(v
                .blood_glucose_mgdl
                .map_or(false, |bg| f64::from(bg) < t.bg_severe_hypo))
        },
        reason: |v, _| {
            format!(
                "Severe hypoglycaemia: BG = {} mg/dL",
                v.blood_glucose_mgdl.unwrap_or_default()
            )
        },
    },
];

pub static HIGH_TIER: &[VitalRule] = &[
    VitalRule {
        id: "SPO2_HIGH",
        weight: 0.15,
        predicate: |v, t| {
            let spo2 = finite("spo2", v.spo2)?;
            Ok(t.spo2_critical <= spo2 && spo2 < t.spo2_high)
        },
        reason: |v, _| format!("Low oxygen saturation: SpO2 = {}%", v.spo2),
    },
    VitalRule {
        id: "SBP_HIGH",
        weight: 0.12,
        predicate: |v, t| {
            let sbp = f64::from(v.systolic_bp);
            Ok(t.sbp_critical <= sbp && sbp < t.sbp_high)
        },
        reason: |v, _| format!("Low systolic BP: {} mmHg", v.systolic_bp),
    },
    VitalRule {
        id: "HR_TACHY",
        weight: 0.12,
        predicate: |v, t| Ok(f64::from(v.heart_rate) > t.hr_high_tachy),
        reason: |v, _| format!("Significant tachycardia: HR = {} bpm", v.heart_rate),
    },
    VitalRule {
        id: "HR_BRADY",
        weight: 0.10,
        predicate: |v, t| Ok(f64::from(v.heart_rate) < t.hr_high_brady),
        reason: |v, _| format!("Significant bradycardia: HR = {} bpm", v.heart_rate),
    },
    VitalRule {
        id: "RR_HIGH",
        weight: 0.10,
        predicate: |v, t| Ok(f64::from(v.respiratory_rate) > t.rr_high),
        reason: |v, _| format!("Tachypnoea: RR = {}/min", v.respiratory_rate),
    },
    VitalRule {
        id: "TEMP_FEVER",
        weight: 0.08,
        predicate: |v, t| Ok(finite("temperature", v.temperature)? >= t.temp_high_fever),
        reason: |v, _| format!("High fever: Temp = {}°C", v.temperature),
    },
    VitalRule {
        id: "HYPERGLYCEMIA",
        weight: 0.10,
        predicate: |v, t| {
            Ok(v
                .blood_glucose_mgdl
                .map_or(false, |bg| f64::from(bg) > t.bg_severe_hyper))
        },
        reason: |v, _| {
            format!(
                "Severe hyperglycaemia: BG = {} mg/dL",
                v.blood_glucose_mgdl.unwrap_or_default()
            )
        },
    },
    VitalRule {
        id: "SHOCK_INDEX",
        weight: 0.15,
        predicate: |v, _| Ok(v.shock_index() > 1.0),
        reason: |v, _| format!("Elevated shock index: {:.2} (HR/SBP)", v.shock_index()),
    },
];

/// Symptom keyword → weight, in declaration order.
pub static CRITICAL_SYMPTOM_KEYWORDS: &[(&str, f64)] = &[
    ("cardiac arrest", 0.50),
    ("stopped breathing", 0.50),
    ("unconscious", 0.30),
    ("seizure", 0.25),
    ("convulsion", 0.25),
    ("stroke", 0.30),
    ("paralysis", 0.25),
    ("sudden vision loss", 0.20),
    ("coughing blood", 0.20),
    ("vomiting blood", 0.20),
    ("chest pain", 0.18),
    ("severe abdominal pain", 0.15),
    ("stiff neck", 0.15),
];

pub static OBSTETRIC_DANGER_KEYWORDS: &[&str] = &[
    "bleeding",
    "vaginal bleeding",
    "antepartum hemorrhage",
    "severe headache",
    "visual disturbance",
    "blurred vision",
    "epigastric pain",
    "fits",
    "convulsion",
    "eclampsia",
    "reduced fetal movement",
    "leaking",
    "cord prolapse",
];

/// Look up a vital rule by identifier across all tiers.
pub fn vital_rule(id: &str) -> Option<&'static VitalRule> {
    HARD_CRITICAL_TIER
        .iter()
        .chain(WEIGHTED_CRITICAL_TIER)
        .chain(HIGH_TIER)
        .find(|rule| rule.id == id)
}

fn keyword_rule_id(prefix: &str, keyword: &str) -> String {
    format!("{}_{}", prefix, keyword.to_uppercase().replace(' ', "_"))
}

#[derive(Default)]
struct Tally {
    triggered: bool,
    reasons: Vec<String>,
    rule_ids: Vec<String>,
    total_weight: f64,
}

impl Tally {
    fn record(&mut self, id: String, reason: String, weight: f64) {
        self.triggered = true;
        self.reasons.push(reason);
        self.rule_ids.push(id);
        self.total_weight += weight;
    }

    fn severity(&self) -> f64 {
        self.total_weight.min(1.0)
    }

    fn finish(self, risk_level: RiskLevel, hard_override: bool, confidence: f64) -> RuleEvaluation {
        let severity_score = self.severity();
        RuleEvaluation {
            triggered: self.triggered,
            risk_level,
            reasons: self.reasons,
            triggered_rules: self.rule_ids,
            hard_override,
            confidence,
            severity_score,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleGuardrail {
    thresholds: Thresholds,
}

impl RuleGuardrail {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(
        &self,
        vitals: &VitalsSnapshot,
        flags: &VulnerabilityFlags,
        symptoms: &[SymptomRecord],
    ) -> RuleEvaluation {
        let mut tally = Tally::default();

        self.apply_tier("hard_critical", HARD_CRITICAL_TIER, vitals, &mut tally);
        if tally.triggered {
            warn!(rules = ?tally.rule_ids, "hard critical override");
            return tally.finish(RiskLevel::Critical, true, HARD_CRITICAL_CONFIDENCE);
        }

        self.apply_tier("weighted_critical", WEIGHTED_CRITICAL_TIER, vitals, &mut tally);
        self.apply_tier("high", HIGH_TIER, vitals, &mut tally);

        let names = normalized_symptoms(symptoms);
        for (keyword, weight) in CRITICAL_SYMPTOM_KEYWORDS {
            if mentions_any(&names, &[*keyword]) {
                info!(keyword, weight, "symptom rule triggered");
                tally.record(
                    keyword_rule_id("SYMPTOM", keyword),
                    format!("Critical symptom reported: '{}'", keyword),
                    *weight,
                );
            }
        }

        if flags.immunocompromised {
            match finite("temperature", vitals.temperature) {
                Ok(temp) if temp >= IMMUNOCOMPROMISED_FEVER_C => {
                    info!(temp, "immunocompromised fever rule triggered");
                    tally.record(
                        "IMMUNOCOMP_FEVER".into(),
                        format!(
                            "Immunocompromised patient with fever: {}°C, sepsis must be excluded",
                            temp
                        ),
                        IMMUNOCOMPROMISED_FEVER_WEIGHT,
                    );
                }
                Ok(_) => {}
                Err(e) => error!(rule = "IMMUNOCOMP_FEVER", error = %e, "rule predicate failed, skipping"),
            }
        }

        if flags.pregnant && self.apply_obstetric(vitals, &names, &mut tally) {
            warn!(rules = ?tally.rule_ids, "obstetric override");
            return tally.finish(RiskLevel::Critical, true, OBSTETRIC_CONFIDENCE);
        }

        self.map_severity(tally)
    }

    fn apply_tier(
        &self,
        tier: &'static str,
        rules: &[VitalRule],
        vitals: &VitalsSnapshot,
        tally: &mut Tally,
    ) {
        for rule in rules {
            match (rule.predicate)(vitals, &self.thresholds) {
                Ok(true) => {
                    info!(tier, rule = rule.id, weight = rule.weight, "vital rule triggered");
                    tally.record(
                        rule.id.to_string(),
                        (rule.reason)(vitals, &self.thresholds),
                        rule.weight,
                    );
                }
                Ok(false) => {}
                Err(e) => error!(tier, rule = rule.id, error = %e, "rule predicate failed, skipping"),
            }
        }
    }

    /// Returns true when any obstetric danger sign fired.
    fn apply_obstetric(&self, vitals: &VitalsSnapshot, symptoms: &[String], tally: &mut Tally) -> bool {
        let mut fired = false;
        for keyword in OBSTETRIC_DANGER_KEYWORDS {
            if mentions_any(symptoms, &[*keyword]) {
                fired = true;
                tally.record(
                    keyword_rule_id("OBSTETRIC", keyword),
                    format!("Obstetric danger sign: '{}'", keyword),
                    OBSTETRIC_SIGN_WEIGHT,
                );
            }
        }
        if vitals.systolic_bp >= PREECLAMPSIA_SBP || vitals.diastolic_bp >= PREECLAMPSIA_DBP {
            fired = true;
            tally.record(
                "OBSTETRIC_PREECLAMPSIA".into(),
                format!(
                    "Pregnancy hypertension (possible preeclampsia): BP {}/{} mmHg",
                    vitals.systolic_bp, vitals.diastolic_bp
                ),
                OBSTETRIC_SIGN_WEIGHT,
            );
        }
        fired
    }

    fn map_severity(&self, tally: Tally) -> RuleEvaluation {
        if !tally.triggered {
            debug!("no guardrail rule triggered");
            return tally.finish(RiskLevel::Low, false, 0.50);
        }

        let severity = tally.severity();
        let (level, hard_override, confidence) = if severity >= self.thresholds.critical_override {
            (RiskLevel::Critical, true, 0.90)
        } else if severity >= self.thresholds.high_override {
            (RiskLevel::High, false, 0.82)
        } else if severity >= MODERATE_SEVERITY {
            (RiskLevel::Moderate, false, 0.70)
        } else {
            (RiskLevel::Low, false, 0.60)
        };

        let result = tally.finish(level, hard_override, confidence);
        info!(
            severity = result.severity_score,
            level = %result.risk_level,
            rules = result.triggered_rules.len(),
            confidence = result.confidence,
            "guardrail evaluated"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn evaluate(vitals: VitalsSnapshot, flags: VulnerabilityFlags, symptoms: &[SymptomRecord]) -> RuleEvaluation {
        RuleGuardrail::default().evaluate(&vitals, &flags, symptoms)
    }

    fn vitals() -> VitalsSnapshot {
        VitalsSnapshot::default()
    }

    fn pregnant() -> VulnerabilityFlags {
        VulnerabilityFlags {
            pregnant: true,
            ..Default::default()
        }
    }

    #[test]
    fn normal_vitals_are_neutral() {
        let result = evaluate(vitals(), VulnerabilityFlags::default(), &[]);
        assert!(!result.triggered);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.severity_score, 0.0);
        assert_eq!(result.confidence, 0.50);
        assert!(!result.hard_override);
        assert!(result.reasons.is_empty());
    }

    #[test_case(VitalsSnapshot { gcs_score: Some(6), ..Default::default() }, "GCS_CRITICAL" ; "gcs")]
    #[test_case(VitalsSnapshot { temperature: 34.0, ..Default::default() }, "TEMP_HYPOTHERMIA" ; "hypothermia")]
    #[test_case(VitalsSnapshot { systolic_bp: 200, diastolic_bp: 110, ..Default::default() }, "HTN_CRISIS" ; "hypertensive crisis")]
    fn hard_critical_overrides(vitals: VitalsSnapshot, rule: &str) {
        let result = evaluate(vitals, VulnerabilityFlags::default(), &[]);
        assert!(result.triggered);
        assert!(result.hard_override);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.confidence, 0.98);
        assert_eq!(result.severity_score, 1.0);
        assert!(result.fired(rule));
    }

    #[test]
    fn hard_critical_skips_lower_tiers() {
        let symptoms = [SymptomRecord::new("cardiac arrest")];
        let v = VitalsSnapshot {
            gcs_score: Some(5),
            spo2: 80.0,
            ..Default::default()
        };
        let result = evaluate(v, VulnerabilityFlags::default(), &symptoms);
        assert_eq!(result.triggered_rules, vec!["GCS_CRITICAL".to_string()]);
    }

    #[test]
    fn gcs_above_threshold_does_not_override() {
        let v = VitalsSnapshot {
            gcs_score: Some(9),
            ..Default::default()
        };
        assert!(!evaluate(v, VulnerabilityFlags::default(), &[]).triggered);
    }

    #[test_case(85.0, false ; "at threshold")]
    #[test_case(84.9, true ; "just below")]
    fn spo2_critical_threshold_is_exclusive(spo2: f64, fires: bool) {
        let v = VitalsSnapshot { spo2, ..Default::default() };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert_eq!(result.fired("SPO2_CRITICAL"), fires);
    }

    #[test]
    fn single_weighted_critical_rule_stays_moderate() {
        let v = VitalsSnapshot { spo2: 83.0, ..Default::default() };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert!(result.triggered);
        assert!((result.severity_score - 0.35).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.confidence, 0.70);
        assert!(!result.hard_override);
    }

    #[test]
    fn overlapping_rules_are_summed() {
        // SPO2_CRITICAL 0.35 + SBP_CRITICAL 0.30 + RR_CRITICAL 0.25 + RR_HIGH 0.10
        let v = VitalsSnapshot {
            spo2: 83.0,
            systolic_bp: 75,
            diastolic_bp: 50,
            respiratory_rate: 40,
            ..Default::default()
        };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert_eq!(
            result.triggered_rules,
            vec!["SPO2_CRITICAL", "SBP_CRITICAL", "RR_CRITICAL", "RR_HIGH"]
        );
        assert_eq!(result.severity_score, 1.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.hard_override);
        assert_eq!(result.confidence, 0.90);
    }

    #[test]
    fn high_band() {
        // SPO2_CRITICAL 0.35 + TEMP_CRITICAL 0.20 + TEMP_FEVER 0.08 = 0.63
        let v = VitalsSnapshot {
            spo2: 84.0,
            temperature: 41.5,
            ..Default::default()
        };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert!((result.severity_score - 0.63).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.confidence, 0.82);
        assert!(!result.hard_override);
    }

    #[test]
    fn tachycardia_with_low_systolic_adds_shock_index() {
        let v = VitalsSnapshot { heart_rate: 130, ..Default::default() };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert_eq!(result.triggered_rules, vec!["HR_TACHY", "SHOCK_INDEX"]);
        assert!((result.severity_score - 0.27).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }

    #[test]
    fn single_high_rule_is_low() {
        let v = VitalsSnapshot {
            heart_rate: 130,
            systolic_bp: 140,
            ..Default::default()
        };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert!(result.triggered);
        assert_eq!(result.triggered_rules, vec!["HR_TACHY"]);
        assert!((result.severity_score - 0.12).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.confidence, 0.60);
    }

    #[test]
    fn reasons_follow_declaration_order() {
        let v = VitalsSnapshot {
            heart_rate: 130,
            systolic_bp: 140,
            respiratory_rate: 28,
            ..Default::default()
        };
        let symptoms = [SymptomRecord::new("Stiff neck"), SymptomRecord::new("chest pain")];
        let result = evaluate(v, VulnerabilityFlags::default(), &symptoms);
        assert_eq!(
            result.reasons,
            vec![
                "Significant tachycardia: HR = 130 bpm".to_string(),
                "Tachypnoea: RR = 28/min".to_string(),
                "Critical symptom reported: 'chest pain'".to_string(),
                "Critical symptom reported: 'stiff neck'".to_string(),
            ]
        );
        assert!(result.fired("SYMPTOM_CHEST_PAIN"));
    }

    #[test]
    fn cardiac_arrest_symptom_weighs_half() {
        let symptoms = [SymptomRecord::new("cardiac arrest").red_flag()];
        let result = evaluate(vitals(), VulnerabilityFlags::default(), &symptoms);
        assert!(result.triggered);
        assert!(result.severity_score >= 0.50);
    }

    #[test]
    fn mild_symptom_has_low_weight() {
        let symptoms = [SymptomRecord::new("stiff neck")];
        let result = evaluate(vitals(), VulnerabilityFlags::default(), &symptoms);
        assert!(result.triggered);
        assert!(result.severity_score < 0.50);
    }

    #[test_case(145, 95 ; "both raised")]
    #[test_case(140, 80 ; "systolic at cut-off")]
    #[test_case(130, 90 ; "diastolic at cut-off")]
    fn pregnancy_hypertension_overrides(sbp: u16, dbp: u16) {
        let v = VitalsSnapshot {
            systolic_bp: sbp,
            diastolic_bp: dbp,
            ..Default::default()
        };
        let result = evaluate(v, pregnant(), &[]);
        assert!(result.hard_override);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.confidence, 0.95);
        assert!(result.fired("OBSTETRIC_PREECLAMPSIA"));
    }

    #[test]
    fn pregnancy_bleeding_overrides() {
        let symptoms = [SymptomRecord::new("vaginal bleeding").red_flag()];
        let result = evaluate(vitals(), pregnant(), &symptoms);
        assert!(result.hard_override);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        // "bleeding" and "vaginal bleeding" both match
        assert!(result.fired("OBSTETRIC_BLEEDING"));
        assert!(result.fired("OBSTETRIC_VAGINAL_BLEEDING"));
        assert!((result.severity_score - 0.80).abs() < 1e-9);
    }

    #[test]
    fn bleeding_without_pregnancy_is_not_obstetric() {
        let symptoms = [SymptomRecord::new("vaginal bleeding").red_flag()];
        let result = evaluate(vitals(), VulnerabilityFlags::default(), &symptoms);
        assert!(!result.triggered_rules.iter().any(|id| id.starts_with("OBSTETRIC")));
        assert!(!result.hard_override);
    }

    #[test]
    fn immunocompromised_fever() {
        let v = VitalsSnapshot { temperature: 38.5, ..Default::default() };
        let flags = VulnerabilityFlags {
            immunocompromised: true,
            ..Default::default()
        };
        let result = evaluate(v, flags, &[]);
        assert!(result.fired("IMMUNOCOMP_FEVER"));
        assert!(result.severity_score >= 0.20);
    }

    #[test]
    fn non_finite_vital_skips_only_its_rules() {
        let v = VitalsSnapshot {
            spo2: f64::NAN,
            heart_rate: 130,
            systolic_bp: 140,
            ..Default::default()
        };
        let result = evaluate(v, VulnerabilityFlags::default(), &[]);
        assert_eq!(result.triggered_rules, vec!["HR_TACHY".to_string()]);
    }

    #[test]
    fn predicate_reports_non_finite_input() {
        let rule = vital_rule("SPO2_CRITICAL").unwrap();
        let v = VitalsSnapshot { spo2: f64::NAN, ..Default::default() };
        let err = (rule.predicate)(&v, &Thresholds::default()).unwrap_err();
        assert!(matches!(err, PredicateError::NonFinite { field: "spo2", .. }));
    }

    #[test]
    fn thresholds_are_configurable() {
        let guardrail = RuleGuardrail::new(Thresholds {
            spo2_critical: 90.0,
            spo2_high: 94.0,
            ..Default::default()
        });
        let v = VitalsSnapshot { spo2: 89.0, ..Default::default() };
        let result = guardrail.evaluate(&v, &VulnerabilityFlags::default(), &[]);
        assert!(result.fired("SPO2_CRITICAL"));
    }

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<_> = HARD_CRITICAL_TIER
            .iter()
            .chain(WEIGHTED_CRITICAL_TIER)
            .chain(HIGH_TIER)
            .map(|r| r.id)
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
