//! Feature extraction for the risk estimator.
//!
//! The order of [`Feature::ALL`] is part of the model contract: trained
//! artifacts, attribution labels and tests all address features by index.

use serde::{Deserialize, Serialize};

use crate::models::{IntakeRecord, Sex, SymptomRecord, VitalsSnapshot, VulnerabilityFlags};

pub const FEATURE_COUNT: usize = 22;

/// Defaults applied to optional vitals before feature computation.
pub const DEFAULT_BLOOD_GLUCOSE: f64 = 100.0;
pub const DEFAULT_WEIGHT_KG: f64 = 60.0;

const CHEST_PAIN_KEYWORDS: &[&str] = &["chest pain", "chest tightness"];
const ALTERED_CONSCIOUSNESS_KEYWORDS: &[&str] = &["unconscious", "confused", "confusion", "altered"];
const BREATHING_KEYWORDS: &[&str] = &["breathing", "breathless", "dyspnoea"];
const HEADACHE_KEYWORDS: &[&str] = &["headache", "severe headache"];
const BLEEDING_KEYWORDS: &[&str] = &["bleeding", "hemorrhage", "blood"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Spo2,
    SystolicBp,
    DiastolicBp,
    HeartRate,
    RespiratoryRate,
    Temperature,
    BloodGlucose,
    AgeYears,
    SexEncoded,
    IsPregnant,
    IsDiabetic,
    HasHeartDisease,
    IsImmunocompromised,
    BmiProxy,
    ShockIndex,
    PulsePressure,
    HasChestPain,
    HasAlteredConsciousness,
    HasBreathingDifficulty,
    HasSevereHeadache,
    HasBleeding,
    RedFlagCount,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Spo2,
        Feature::SystolicBp,
        Feature::DiastolicBp,
        Feature::HeartRate,
        Feature::RespiratoryRate,
        Feature::Temperature,
        Feature::BloodGlucose,
        Feature::AgeYears,
        Feature::SexEncoded,
        Feature::IsPregnant,
        Feature::IsDiabetic,
        Feature::HasHeartDisease,
        Feature::IsImmunocompromised,
        Feature::BmiProxy,
        Feature::ShockIndex,
        Feature::PulsePressure,
        Feature::HasChestPain,
        Feature::HasAlteredConsciousness,
        Feature::HasBreathingDifficulty,
        Feature::HasSevereHeadache,
        Feature::HasBleeding,
        Feature::RedFlagCount,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::Spo2 => "spo2",
            Feature::SystolicBp => "systolic_bp",
            Feature::DiastolicBp => "diastolic_bp",
            Feature::HeartRate => "heart_rate",
            Feature::RespiratoryRate => "respiratory_rate",
            Feature::Temperature => "temperature",
            Feature::BloodGlucose => "blood_glucose",
            Feature::AgeYears => "age_years",
            Feature::SexEncoded => "sex_encoded",
            Feature::IsPregnant => "is_pregnant",
            Feature::IsDiabetic => "is_diabetic",
            Feature::HasHeartDisease => "has_heart_disease",
            Feature::IsImmunocompromised => "is_immunocompromised",
            Feature::BmiProxy => "bmi_proxy",
            Feature::ShockIndex => "shock_index",
            Feature::PulsePressure => "pulse_pressure",
            Feature::HasChestPain => "has_chest_pain",
            Feature::HasAlteredConsciousness => "has_altered_consciousness",
            Feature::HasBreathingDifficulty => "has_breathing_difficulty",
            Feature::HasSevereHeadache => "has_severe_headache",
            Feature::HasBleeding => "has_bleeding",
            Feature::RedFlagCount => "red_flag_count",
        }
    }

    /// Clinician-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Feature::Spo2 => "Oxygen Saturation (SpO2)",
            Feature::SystolicBp => "Systolic Blood Pressure",
            Feature::DiastolicBp => "Diastolic Blood Pressure",
            Feature::HeartRate => "Heart Rate",
            Feature::RespiratoryRate => "Respiratory Rate",
            Feature::Temperature => "Temperature",
            Feature::BloodGlucose => "Blood Glucose",
            Feature::AgeYears => "Patient Age",
            Feature::SexEncoded => "Sex",
            Feature::IsPregnant => "Pregnancy",
            Feature::IsDiabetic => "Diabetes",
            Feature::HasHeartDisease => "Heart Disease",
            Feature::IsImmunocompromised => "Immunocompromised",
            Feature::BmiProxy => "Weight Category",
            Feature::ShockIndex => "Shock Index (HR/SBP)",
            Feature::PulsePressure => "Pulse Pressure",
            Feature::HasChestPain => "Chest Pain Symptom",
            Feature::HasAlteredConsciousness => "Altered Consciousness",
            Feature::HasBreathingDifficulty => "Breathing Difficulty",
            Feature::HasSevereHeadache => "Severe Headache",
            Feature::HasBleeding => "Bleeding Symptom",
            Feature::RedFlagCount => "Number of Red Flag Symptoms",
        }
    }
}

/// Fixed-order numeric input to the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn labeled(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

/// Lower-cased, trimmed symptom names for keyword matching.
pub fn normalized_symptoms(symptoms: &[SymptomRecord]) -> Vec<String> {
    symptoms.iter().map(SymptomRecord::normalized_name).collect()
}

/// True if any symptom contains any keyword as a substring.
pub fn mentions_any(symptoms: &[String], keywords: &[&str]) -> bool {
    symptoms
        .iter()
        .any(|s| keywords.iter().any(|kw| s.contains(kw)))
}

pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn from_intake(intake: &IntakeRecord) -> FeatureVector {
        Self::extract(
            &intake.vitals,
            intake.age,
            intake.sex,
            &intake.vulnerability_flags,
            &intake.symptoms,
        )
    }

    pub fn extract(
        vitals: &VitalsSnapshot,
        age: u8,
        sex: Sex,
        flags: &VulnerabilityFlags,
        symptoms: &[SymptomRecord],
    ) -> FeatureVector {
        let names = normalized_symptoms(symptoms);
        let has = |keywords: &[&str]| indicator(mentions_any(&names, keywords));
        let red_flag_count = symptoms.iter().filter(|s| s.red_flag).count() as f64;

        let glucose = vitals
            .blood_glucose_mgdl
            .map(f64::from)
            .unwrap_or(DEFAULT_BLOOD_GLUCOSE);
        let weight = vitals.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG);

        FeatureVector([
            vitals.spo2,
            f64::from(vitals.systolic_bp),
            f64::from(vitals.diastolic_bp),
            f64::from(vitals.heart_rate),
            f64::from(vitals.respiratory_rate),
            vitals.temperature,
            glucose,
            f64::from(age),
            if sex == Sex::Male { 0.0 } else { 1.0 },
            indicator(flags.pregnant),
            indicator(flags.diabetic),
            indicator(flags.heart_disease),
            indicator(flags.immunocompromised),
            weight / DEFAULT_WEIGHT_KG,
            vitals.shock_index(),
            f64::from(vitals.pulse_pressure()),
            has(CHEST_PAIN_KEYWORDS),
            has(ALTERED_CONSCIOUSNESS_KEYWORDS),
            has(BREATHING_KEYWORDS),
            has(HEADACHE_KEYWORDS),
            has(BLEEDING_KEYWORDS),
            red_flag_count,
        ])
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
