use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{SmootherError, SmootherResult};

/// Noise parameters for the constant-velocity smoother.
///
/// Each value scales an identity block: `process_noise` the whole 4×4 Q,
/// `observation_noise` the 2×2 R, and the two initial variances the position
/// and velocity blocks of the starting covariance. Units are squared degrees
/// (per step for velocity).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Q: deviation allowed from the constant-velocity prediction per step
    pub process_noise: f64,

    /// R: GPS measurement variance
    pub observation_noise: f64,

    /// Prior variance of the first position
    pub initial_position_variance: f64,

    /// Prior variance of the initial (zero) velocity
    pub initial_velocity_variance: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-8,
            observation_noise: 1e-3,
            initial_position_variance: 1.0,
            initial_velocity_variance: 1.0,
        }
    }
}

impl SmootherConfig {
    /// Load from a JSON file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SmootherConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_process_noise(mut self, value: f64) -> Self {
        self.process_noise = value;
        self
    }

    pub fn with_observation_noise(mut self, value: f64) -> Self {
        self.observation_noise = value;
        self
    }

    pub fn with_initial_position_variance(mut self, value: f64) -> Self {
        self.initial_position_variance = value;
        self
    }

    pub fn with_initial_velocity_variance(mut self, value: f64) -> Self {
        self.initial_velocity_variance = value;
        self
    }

    /// All four variances must be finite and strictly positive.
    pub fn validate(&self) -> SmootherResult<()> {
        let fields = [
            ("process_noise", self.process_noise),
            ("observation_noise", self.observation_noise),
            ("initial_position_variance", self.initial_position_variance),
            ("initial_velocity_variance", self.initial_velocity_variance),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(SmootherError::InvalidConfig(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
