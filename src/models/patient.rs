use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// One set of bedside vitals as recorded at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "diastolic_below_systolic"))]
pub struct VitalsSnapshot {
    #[validate(range(min = 40, max = 350))]
    pub systolic_bp: u16,
    #[validate(range(min = 20, max = 250))]
    pub diastolic_bp: u16,
    #[validate(range(min = 20, max = 350))]
    pub heart_rate: u16,
    #[validate(range(min = 4, max = 80))]
    pub respiratory_rate: u16,
    #[validate(range(min = 50.0, max = 100.0))]
    pub spo2: f64,
    #[validate(range(min = 30.0, max = 45.0))]
    pub temperature: f64,
    #[serde(default)]
    #[validate(range(min = 20, max = 1000))]
    pub blood_glucose_mgdl: Option<u16>,
    #[serde(default)]
    #[validate(range(min = 1.0, max = 300.0))]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 3, max = 15))]
    pub gcs_score: Option<u8>,
}

impl VitalsSnapshot {
    pub fn shock_index(&self) -> f64 {
        f64::from(self.heart_rate) / f64::from(self.systolic_bp.max(1))
    }

    pub fn pulse_pressure(&self) -> i32 {
        i32::from(self.systolic_bp) - i32::from(self.diastolic_bp)
    }
}

/// Resting adult reference vitals.
impl Default for VitalsSnapshot {
    fn default() -> Self {
        Self {
            systolic_bp: 120,
            diastolic_bp: 80,
            heart_rate: 75,
            respiratory_rate: 16,
            spo2: 98.0,
            temperature: 37.0,
            blood_glucose_mgdl: None,
            weight_kg: None,
            gcs_score: None,
        }
    }
}

fn diastolic_below_systolic(vitals: &VitalsSnapshot) -> std::result::Result<(), ValidationError> {
    if vitals.diastolic_bp >= vitals.systolic_bp {
        return Err(ValidationError::new("diastolic_not_below_systolic"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityFlags {
    pub pregnant: bool,
    pub diabetic: bool,
    pub elderly: bool,
    pub heart_disease: bool,
    pub immunocompromised: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomSeverity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SymptomRecord {
    #[validate(length(min = 2))]
    pub name: String,
    #[serde(default)]
    pub red_flag: bool,
    #[serde(default)]
    pub severity: Option<SymptomSeverity>,
    #[serde(default)]
    pub duration_hours: Option<u32>,
}

impl SymptomRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            red_flag: false,
            severity: None,
            duration_hours: None,
        }
    }

    pub fn red_flag(mut self) -> Self {
        self.red_flag = true;
        self
    }

    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MedicationRecord {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
}

impl MedicationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            dose: None,
            frequency: None,
            route: None,
        }
    }

    /// Case-insensitive lookup key.
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Everything the health worker submits for one patient encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "pregnancy_matches_sex"))]
pub struct IntakeRecord {
    #[validate(range(max = 120))]
    pub age: u8,
    pub sex: Sex,
    #[serde(default)]
    pub vulnerability_flags: VulnerabilityFlags,
    #[validate]
    pub vitals: VitalsSnapshot,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub medications: Vec<MedicationRecord>,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub symptoms: Vec<SymptomRecord>,
    #[validate(length(min = 5, max = 1000))]
    pub chief_complaint: String,
}

impl IntakeRecord {
    /// Range-check the record, including every medication and symptom entry.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        for medication in &self.medications {
            medication.validate()?;
        }
        for symptom in &self.symptoms {
            symptom.validate()?;
        }
        Ok(())
    }
}

fn pregnancy_matches_sex(intake: &IntakeRecord) -> std::result::Result<(), ValidationError> {
    if intake.vulnerability_flags.pregnant && intake.sex == Sex::Male {
        return Err(ValidationError::new("pregnancy_flag_on_male_patient"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> IntakeRecord {
        IntakeRecord {
            age: 34,
            sex: Sex::Female,
            vulnerability_flags: VulnerabilityFlags::default(),
            vitals: VitalsSnapshot::default(),
            medications: vec![MedicationRecord::new("Paracetamol")],
            symptoms: vec![SymptomRecord::new("headache")],
            chief_complaint: "Headache since morning".into(),
        }
    }

    #[test]
    fn derived_vitals() {
        let vitals = VitalsSnapshot {
            systolic_bp: 100,
            diastolic_bp: 60,
            heart_rate: 120,
            ..Default::default()
        };
        assert!((vitals.shock_index() - 1.2).abs() < 1e-12);
        assert_eq!(vitals.pulse_pressure(), 40);
    }

    #[test]
    fn valid_intake_passes() {
        assert!(intake().check().is_ok());
    }

    #[test]
    fn out_of_range_spo2_is_rejected() {
        let mut record = intake();
        record.vitals.spo2 = 40.0;
        assert!(record.check().is_err());
    }

    #[test]
    fn diastolic_must_be_below_systolic() {
        let mut record = intake();
        record.vitals.diastolic_bp = 120;
        assert!(record.check().is_err());
    }

    #[test]
    fn pregnant_male_is_rejected() {
        let mut record = intake();
        record.sex = Sex::Male;
        record.vulnerability_flags.pregnant = true;
        assert!(record.check().is_err());
    }

    #[test]
    fn short_medication_name_is_rejected() {
        let mut record = intake();
        record.medications.push(MedicationRecord::new("x"));
        assert!(record.check().is_err());
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let json = r#"{
            "age": 60,
            "sex": "male",
            "vitals": {
                "systolic_bp": 130, "diastolic_bp": 85, "heart_rate": 88,
                "respiratory_rate": 18, "spo2": 95.5, "temperature": 37.4
            },
            "chief_complaint": "Cough for a week"
        }"#;
        let record: IntakeRecord = serde_json::from_str(json).unwrap();
        assert!(record.medications.is_empty());
        assert_eq!(record.vitals.gcs_score, None);
        assert!(!record.vulnerability_flags.pregnant);
        assert!(record.check().is_ok());
    }
}
