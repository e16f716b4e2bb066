//! Medication safety correlator.
//!
//! Three independent checks over unordered medication and symptom lists:
//! drug-drug interactions, drug-condition conflicts and drug-symptom danger
//! patterns, plus the immunocompromised fever case which ignores medications.
//! Warnings come out in table order, so the result does not depend on the
//! order in which drugs or symptoms were entered.

use tracing::{debug, warn};

use crate::core::data::{mentions_any, normalized_symptoms};
use crate::models::{
    MedicationEvaluation, MedicationRecord, MedicationWarning, SymptomRecord, VulnerabilityFlags,
    WarningCategory, WarningSeverity,
};

/// Unordered pair of exact (case-normalized) drug names.
struct InteractionRule {
    pair: [&'static str; 2],
    severity: WarningSeverity,
    message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    SuspectedAsthma,
    HeartDisease,
    RenalImpairment,
}

struct ConditionRule {
    drug_keywords: &'static [&'static str],
    condition: Condition,
    message: &'static str,
}

struct DangerPattern {
    drug_keywords: &'static [&'static str],
    symptom_keywords: &'static [&'static str],
    severity: WarningSeverity,
    message: &'static str,
    override_escalation: bool,
}

static INTERACTIONS: &[InteractionRule] = &[
    InteractionRule {
        pair: ["warfarin", "aspirin"],
        severity: WarningSeverity::Severe,
        message: "Warfarin + Aspirin: Additive bleeding risk. Monitor INR closely.",
    },
    InteractionRule {
        pair: ["warfarin", "ibuprofen"],
        severity: WarningSeverity::Severe,
        message: "Warfarin + Ibuprofen: Significantly increased bleeding. Avoid NSAIDs.",
    },
    InteractionRule {
        pair: ["warfarin", "cotrimoxazole"],
        severity: WarningSeverity::Severe,
        message: "Warfarin + Cotrimoxazole: Potentiates anticoagulation. Reduce warfarin dose.",
    },
    InteractionRule {
        pair: ["metformin", "contrast_dye"],
        severity: WarningSeverity::Severe,
        message: "Metformin + Contrast: Hold metformin 48h before/after contrast. Lactic acidosis risk.",
    },
    InteractionRule {
        pair: ["glibenclamide", "fluconazole"],
        severity: WarningSeverity::Severe,
        message: "Glibenclamide + Fluconazole: Severe hypoglycaemia risk. Reduce glibenclamide dose.",
    },
    InteractionRule {
        pair: ["metronidazole", "alcohol"],
        severity: WarningSeverity::Severe,
        message: "Metronidazole + Alcohol: Disulfiram-like reaction. Counsel patient strictly.",
    },
    InteractionRule {
        pair: ["clarithromycin", "carbamazepine"],
        severity: WarningSeverity::Severe,
        message: "Clarithromycin + Carbamazepine: Toxic carbamazepine levels. Use azithromycin instead.",
    },
    InteractionRule {
        pair: ["diazepam", "morphine"],
        severity: WarningSeverity::Severe,
        message: "Benzodiazepine + Opioid: Respiratory depression risk. Avoid combination.",
    },
    InteractionRule {
        pair: ["misoprostol", "oxytocin"],
        severity: WarningSeverity::Contraindicated,
        message: "Misoprostol + Oxytocin: ABSOLUTELY CONTRAINDICATED. Risk of uterine rupture.",
    },
    InteractionRule {
        pair: ["lisinopril", "potassium"],
        severity: WarningSeverity::Moderate,
        message: "ACE inhibitor + Potassium supplement: Hyperkalemia risk. Monitor electrolytes.",
    },
    InteractionRule {
        pair: ["amlodipine", "simvastatin"],
        severity: WarningSeverity::Moderate,
        message: "Amlodipine + Simvastatin: Elevated statin levels. Limit simvastatin to 20mg.",
    },
];

const BETA_BLOCKERS: &[&str] = &["atenolol", "metoprolol", "propranolol", "bisoprolol"];
const NSAIDS: &[&str] = &["ibuprofen", "diclofenac", "naproxen", "indomethacin"];

const ASTHMA_SYMPTOMS: &[&str] = &["asthma", "wheez", "copd"];
const RENAL_SYMPTOMS: &[&str] = &["kidney", "renal", "reduced urine"];
const FEVER_SYMPTOMS: &[&str] = &["fever", "temperature"];

static CONDITION_CONFLICTS: &[ConditionRule] = &[
    ConditionRule {
        drug_keywords: BETA_BLOCKERS,
        condition: Condition::SuspectedAsthma,
        message: "Beta-blocker in possible asthma/COPD patient: May precipitate bronchospasm. Review necessity.",
    },
    ConditionRule {
        drug_keywords: NSAIDS,
        condition: Condition::HeartDisease,
        message: "NSAID + cardiovascular disease: Increased MI/HF risk. Use paracetamol instead.",
    },
    ConditionRule {
        drug_keywords: &["metformin"],
        condition: Condition::RenalImpairment,
        message: "Metformin + renal impairment: Lactic acidosis risk. Check eGFR.",
    },
];

static DANGER_PATTERNS: &[DangerPattern] = &[
    DangerPattern {
        drug_keywords: &["warfarin", "heparin", "apixaban", "rivaroxaban", "clopidogrel"],
        symptom_keywords: &["head injury", "head trauma", "fall", "bleeding", "blood"],
        severity: WarningSeverity::Severe,
        message: "Anticoagulant/antiplatelet + head injury/bleeding: HIGH risk of intracranial hemorrhage. IMMEDIATE escalation required.",
        override_escalation: true,
    },
    DangerPattern {
        drug_keywords: &["atenolol", "metoprolol", "propranolol", "bisoprolol", "carvedilol"],
        symptom_keywords: &["bradycardia", "slow heart", "dizziness", "syncope", "fainted"],
        severity: WarningSeverity::Moderate,
        message: "Beta-blocker + bradycardia symptoms: Monitor heart rate. Consider dose reduction.",
        override_escalation: false,
    },
    DangerPattern {
        drug_keywords: &["insulin", "glibenclamide", "glipizide", "gliclazide"],
        symptom_keywords: &["unconscious", "confusion", "seizure", "sweating", "shaking"],
        severity: WarningSeverity::Severe,
        message: "Insulin/sulfonylurea + altered consciousness: Severe hypoglycaemia likely. Give IV dextrose immediately.",
        override_escalation: true,
    },
    DangerPattern {
        drug_keywords: &[
            "prednisolone",
            "dexamethasone",
            "methylprednisolone",
            "tacrolimus",
            "cyclosporine",
            "azathioprine",
        ],
        symptom_keywords: &["fever", "infection", "sepsis"],
        severity: WarningSeverity::Severe,
        message: "Immunosuppressant + fever: Serious infection / sepsis must be excluded urgently.",
        override_escalation: true,
    },
    DangerPattern {
        drug_keywords: &["lithium"],
        symptom_keywords: &["tremor", "confusion", "diarrhea", "vomiting"],
        severity: WarningSeverity::Severe,
        message: "Lithium + GI symptoms/neurological: Possible lithium toxicity. Check serum levels urgently.",
        override_escalation: true,
    },
    DangerPattern {
        drug_keywords: &["methotrexate"],
        symptom_keywords: &["mouth ulcer", "stomatitis", "breathlessness", "cough"],
        severity: WarningSeverity::Severe,
        message: "Methotrexate + respiratory/oral symptoms: Possible methotrexate pneumonitis or toxicity.",
        override_escalation: true,
    },
];

const IMMUNOCOMPROMISED_FEVER_MESSAGE: &str =
    "Immunocompromised patient with fever: Sepsis must be excluded. Urgent blood cultures and antibiotics.";

impl Condition {
    fn present(self, flags: &VulnerabilityFlags, symptoms: &[String]) -> bool {
        match self {
            Condition::HeartDisease => flags.heart_disease,
            Condition::SuspectedAsthma => mentions_any(symptoms, ASTHMA_SYMPTOMS),
            Condition::RenalImpairment => mentions_any(symptoms, RENAL_SYMPTOMS),
        }
    }
}

fn requires_action(severity: WarningSeverity) -> bool {
    severity >= WarningSeverity::Severe
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MedicationSafetyEngine;

impl MedicationSafetyEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        medications: &[MedicationRecord],
        symptoms: &[SymptomRecord],
        flags: &VulnerabilityFlags,
    ) -> MedicationEvaluation {
        let drugs: Vec<String> = medications.iter().map(MedicationRecord::normalized_name).collect();
        let symptom_names = normalized_symptoms(symptoms);

        let mut warnings = self.interactions(medications, &drugs);
        warnings.extend(self.condition_conflicts(medications, &drugs, &symptom_names, flags));
        warnings.extend(self.danger_patterns(medications, &drugs, &symptom_names));

        if flags.immunocompromised && mentions_any(&symptom_names, FEVER_SYMPTOMS) {
            warn!("escalation override: immunocompromised patient with fever");
            warnings.push(MedicationWarning {
                drugs: vec!["Immunosuppressant therapy".to_string()],
                category: WarningCategory::DrugCondition,
                severity: WarningSeverity::Severe,
                message: IMMUNOCOMPROMISED_FEVER_MESSAGE.to_string(),
                action_required: true,
                override_triggered: true,
            });
        }

        let evaluation = MedicationEvaluation::from_warnings(warnings);
        debug!(
            warnings = evaluation.warnings.len(),
            escalation_override = evaluation.escalation_override,
            "medication safety evaluated"
        );
        evaluation
    }

    /// One warning per administered pair, so a repeated entry warns again.
    fn interactions(&self, medications: &[MedicationRecord], drugs: &[String]) -> Vec<MedicationWarning> {
        let mut warnings = Vec::new();
        for rule in INTERACTIONS {
            for i in positions(drugs, rule.pair[0]) {
                for j in positions(drugs, rule.pair[1]) {
                    let override_triggered = rule.severity == WarningSeverity::Contraindicated;
                    if override_triggered {
                        warn!(pair = ?rule.pair, "escalation override: contraindicated combination");
                    } else {
                        warn!(pair = ?rule.pair, severity = ?rule.severity, "drug interaction");
                    }
                    warnings.push(MedicationWarning {
                        drugs: vec![
                            medications[i].name.trim().to_string(),
                            medications[j].name.trim().to_string(),
                        ],
                        category: WarningCategory::Ddi,
                        severity: rule.severity,
                        message: rule.message.to_string(),
                        action_required: requires_action(rule.severity),
                        override_triggered,
                    });
                }
            }
        }
        warnings
    }

    fn condition_conflicts(
        &self,
        medications: &[MedicationRecord],
        drugs: &[String],
        symptoms: &[String],
        flags: &VulnerabilityFlags,
    ) -> Vec<MedicationWarning> {
        CONDITION_CONFLICTS
            .iter()
            .filter(|rule| rule.condition.present(flags, symptoms))
            .filter_map(|rule| {
                let matched = matching_drugs(medications, drugs, rule.drug_keywords);
                if matched.is_empty() {
                    return None;
                }
                debug!(condition = ?rule.condition, drugs = ?matched, "drug-condition conflict");
                Some(MedicationWarning {
                    drugs: matched,
                    category: WarningCategory::DrugCondition,
                    severity: WarningSeverity::Severe,
                    message: rule.message.to_string(),
                    action_required: true,
                    override_triggered: false,
                })
            })
            .collect()
    }

    fn danger_patterns(
        &self,
        medications: &[MedicationRecord],
        drugs: &[String],
        symptoms: &[String],
    ) -> Vec<MedicationWarning> {
        let mut warnings = Vec::new();
        for rule in DANGER_PATTERNS {
            let matched = matching_drugs(medications, drugs, rule.drug_keywords);
            if matched.is_empty() || !mentions_any(symptoms, rule.symptom_keywords) {
                continue;
            }
            if rule.override_escalation {
                warn!(drugs = ?matched, "escalation override: drug-symptom danger pattern");
            }
            warnings.push(MedicationWarning {
                drugs: matched,
                category: WarningCategory::DrugSymptom,
                severity: rule.severity,
                message: rule.message.to_string(),
                action_required: true,
                override_triggered: rule.override_escalation,
            });
        }
        warnings
    }
}

/// Patient-spelled names of every medication containing any keyword.
fn positions<'a>(drugs: &'a [String], name: &'a str) -> impl Iterator<Item = usize> + 'a {
    drugs
        .iter()
        .enumerate()
        .filter(move |(_, d)| d.as_str() == name)
        .map(|(i, _)| i)
}

fn matching_drugs(medications: &[MedicationRecord], drugs: &[String], keywords: &[&str]) -> Vec<String> {
    drugs
        .iter()
        .zip(medications)
        .filter(|(normalized, _)| keywords.iter().any(|kw| normalized.contains(kw)))
        .map(|(_, med)| med.name.trim().to_string())
        .collect()
}
