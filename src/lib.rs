//! PHC risk decision engine core library
//!
//! Classifies a patient's deterioration risk from intake vitals, symptoms,
//! medications and vulnerability flags. Three evaluators run concurrently
//! and are combined under strict override precedence:
//!
//! - [`core::rules`]: deterministic clinical guardrail
//! - [`core::ai`]: probabilistic estimator with per-feature attribution
//! - [`core::medication`]: medication safety correlator
//! - [`core::ensemble`]: fan-out, fan-in and final verdict

pub mod core;
pub mod error;
pub mod models;
pub mod utils;

pub use crate::core::ensemble::{EnsembleAggregator, SafetyEvaluator};
pub use crate::error::{EngineError, Result};

/// Application configuration
pub mod config {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use crate::error::{EngineError, Result};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Settings {
        pub thresholds: Thresholds,
        pub ensemble: EnsembleWeights,
        pub estimator: EstimatorSettings,
        pub pool: PoolSettings,
        pub logging: LoggingSettings,
    }

    /// Clinical cut-offs used by the rule guardrail (NEWS2-aligned).
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Thresholds {
        pub spo2_critical: f64,
        pub sbp_critical: f64,
        pub rr_critical: f64,
        pub temp_critical: f64,
        pub temp_hypothermia: f64,
        pub sbp_hypertensive_crisis: f64,
        pub gcs_critical: u8,
        pub bg_severe_hypo: f64,
        pub bg_severe_hyper: f64,
        pub spo2_high: f64,
        pub sbp_high: f64,
        pub hr_high_tachy: f64,
        pub hr_high_brady: f64,
        pub rr_high: f64,
        pub temp_high_fever: f64,
        /// Severity at or above which the weighted tiers map to critical.
        pub critical_override: f64,
        /// Severity at or above which the weighted tiers map to high.
        pub high_override: f64,
    }

    impl Default for Thresholds {
        fn default() -> Self {
            Self {
                spo2_critical: 85.0,
                sbp_critical: 80.0,
                rr_critical: 35.0,
                temp_critical: 41.0,
                temp_hypothermia: 35.0,
                sbp_hypertensive_crisis: 180.0,
                gcs_critical: 8,
                bg_severe_hypo: 54.0,
                bg_severe_hyper: 400.0,
                spo2_high: 92.0,
                sbp_high: 100.0,
                hr_high_tachy: 120.0,
                hr_high_brady: 45.0,
                rr_high: 24.0,
                temp_high_fever: 39.0,
                critical_override: 0.85,
                high_override: 0.55,
            }
        }
    }

    impl Thresholds {
        pub fn validate(&self) -> Result<()> {
            let values = [
                ("spo2_critical", self.spo2_critical),
                ("sbp_critical", self.sbp_critical),
                ("rr_critical", self.rr_critical),
                ("temp_critical", self.temp_critical),
                ("temp_hypothermia", self.temp_hypothermia),
                ("sbp_hypertensive_crisis", self.sbp_hypertensive_crisis),
                ("bg_severe_hypo", self.bg_severe_hypo),
                ("bg_severe_hyper", self.bg_severe_hyper),
                ("spo2_high", self.spo2_high),
                ("sbp_high", self.sbp_high),
                ("hr_high_tachy", self.hr_high_tachy),
                ("hr_high_brady", self.hr_high_brady),
                ("rr_high", self.rr_high),
                ("temp_high_fever", self.temp_high_fever),
                ("critical_override", self.critical_override),
                ("high_override", self.high_override),
            ];
            if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
                return Err(EngineError::InvalidConfig(format!("threshold {name} is not finite")));
            }
            if self.spo2_critical > self.spo2_high || self.sbp_critical > self.sbp_high {
                return Err(EngineError::InvalidConfig(
                    "critical vital thresholds must not exceed their high-tier counterparts".into(),
                ));
            }
            if !(0.0..=1.0).contains(&self.high_override)
                || !(0.0..=1.0).contains(&self.critical_override)
                || self.high_override > self.critical_override
            {
                return Err(EngineError::InvalidConfig(
                    "severity thresholds must satisfy 0 <= high <= critical <= 1".into(),
                ));
            }
            Ok(())
        }
    }

    /// Blend weights for the no-override path.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct EnsembleWeights {
        pub rule_weight: f64,
        pub ml_weight: f64,
    }

    impl Default for EnsembleWeights {
        fn default() -> Self {
            Self {
                rule_weight: 0.6,
                ml_weight: 0.4,
            }
        }
    }

    impl EnsembleWeights {
        pub fn validate(&self) -> Result<()> {
            let finite = self.rule_weight.is_finite() && self.ml_weight.is_finite();
            if !finite || self.rule_weight < 0.0 || self.ml_weight < 0.0 {
                return Err(EngineError::InvalidConfig(
                    "ensemble weights must be finite and non-negative".into(),
                ));
            }
            if (self.rule_weight + self.ml_weight - 1.0).abs() > 1e-6 {
                return Err(EngineError::InvalidConfig(format!(
                    "ensemble weights must sum to 1.0 (got {} + {})",
                    self.rule_weight, self.ml_weight
                )));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct EstimatorSettings {
        /// Trained artifact; the heuristic estimator is used when absent.
        pub model_path: Option<PathBuf>,
        pub model_timeout_ms: u64,
    }

    impl Default for EstimatorSettings {
        fn default() -> Self {
            Self {
                model_path: None,
                model_timeout_ms: 250,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PoolSettings {
        /// Guardrail and medication jobs.
        pub max_workers: usize,
        /// Model inference jobs; a separate pool from `max_workers`.
        pub model_workers: usize,
    }

    impl Default for PoolSettings {
        fn default() -> Self {
            Self {
                max_workers: 4,
                model_workers: 2,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LoggingSettings {
        pub level: String,
        pub json: bool,
    }

    impl Default for LoggingSettings {
        fn default() -> Self {
            Self {
                level: "info".into(),
                json: false,
            }
        }
    }

    impl Settings {
        pub fn validate(&self) -> Result<()> {
            self.thresholds.validate()?;
            self.ensemble.validate()?;
            if self.pool.max_workers == 0 {
                return Err(EngineError::InvalidConfig("pool.max_workers must be at least 1".into()));
            }
            if self.pool.model_workers == 0 {
                return Err(EngineError::InvalidConfig("pool.model_workers must be at least 1".into()));
            }
            Ok(())
        }
    }

    /// Load configuration from the default search path
    pub fn load_settings() -> Result<Settings> {
        load_settings_from(None)
    }

    /// Load configuration, layering an explicit file over `config/default`
    /// and `config/{PHC_ENV}`; `PHC__`-style environment variables win.
    pub fn load_settings_from(file: Option<&Path>) -> Result<Settings> {
        let env = std::env::var("PHC_ENV").unwrap_or_else(|_| "development".into());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let settings: Settings = builder
            .add_source(config::Environment::with_prefix("PHC").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_are_valid() {
            assert!(Settings::default().validate().is_ok());
        }

        #[test]
        fn weights_must_sum_to_one() {
            let weights = EnsembleWeights {
                rule_weight: 0.7,
                ml_weight: 0.4,
            };
            assert!(matches!(weights.validate(), Err(EngineError::InvalidConfig(_))));
        }

        #[test]
        fn negative_weight_is_rejected() {
            let weights = EnsembleWeights {
                rule_weight: 1.2,
                ml_weight: -0.2,
            };
            assert!(weights.validate().is_err());
        }

        #[test]
        fn inverted_severity_thresholds_are_rejected() {
            let thresholds = Thresholds {
                high_override: 0.9,
                critical_override: 0.8,
                ..Default::default()
            };
            assert!(thresholds.validate().is_err());
        }

        #[test]
        fn zero_workers_is_rejected() {
            let settings = Settings {
                pool: PoolSettings {
                    max_workers: 0,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(settings.validate().is_err());
        }

        #[test]
        fn file_overrides_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("engine.toml");
            std::fs::write(
                &path,
                "[ensemble]\nrule_weight = 0.5\nml_weight = 0.5\n\n[thresholds]\nspo2_critical = 88.0\n",
            )
            .unwrap();

            let settings = load_settings_from(Some(&path)).unwrap();
            assert_eq!(settings.ensemble.rule_weight, 0.5);
            assert_eq!(settings.thresholds.spo2_critical, 88.0);
            assert_eq!(settings.thresholds.sbp_critical, 80.0);
        }
    }
}
