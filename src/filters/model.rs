//! Constant-velocity state-space model
//!
//! State Vector (4D):
//! [0-1]: Position (lat, lng) in degrees
//! [2-3]: Velocity (dlat, dlng) in degrees per step
//!
//! Observation (2D): position only, velocity is never measured.

use crate::config::SmootherConfig;
use crate::types::{symmetrize, ObsMat, ObsVec, ObservationMatrix, StateMat, StateVec};

/// Mean and covariance of the state at one time step
#[derive(Clone, Debug, PartialEq)]
pub struct StateEstimate {
    pub mean: StateVec,
    pub covariance: StateMat,
}

impl StateEstimate {
    /// (lat, lng)
    pub fn position(&self) -> (f64, f64) {
        (self.mean[0], self.mean[1])
    }

    /// (dlat, dlng) per step
    pub fn velocity(&self) -> (f64, f64) {
        (self.mean[2], self.mean[3])
    }

    pub fn is_finite(&self) -> bool {
        self.mean.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }
}

/// Fixed model matrices for one smoothing run
#[derive(Clone, Debug, PartialEq)]
pub struct StateSpaceModel {
    /// F: position += velocity, velocity persists
    pub transition: StateMat,

    /// H: selects position
    pub observation: ObservationMatrix,

    /// Q
    pub process_noise: StateMat,

    /// R
    pub observation_noise: ObsMat,

    /// P0
    pub initial_covariance: StateMat,
}

impl StateSpaceModel {
    pub fn new(config: &SmootherConfig) -> Self {
        let transition = StateMat::from_row_slice(&[
            1.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let observation = ObservationMatrix::from_row_slice(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        ]);

        let pos_var = config.initial_position_variance;
        let vel_var = config.initial_velocity_variance;
        let initial_covariance =
            StateMat::from_diagonal(&StateVec::new(pos_var, pos_var, vel_var, vel_var));

        Self {
            transition,
            observation,
            process_noise: StateMat::identity() * config.process_noise,
            observation_noise: ObsMat::identity() * config.observation_noise,
            initial_covariance,
        }
    }

    /// Prior for the first step: first fix, zero velocity.
    pub fn initial_state(&self, first: &ObsVec) -> StateEstimate {
        StateEstimate {
            mean: StateVec::new(first[0], first[1], 0.0, 0.0),
            covariance: self.initial_covariance,
        }
    }

    /// One-step prediction: x' = F x, P' = F P Fᵀ + Q
    pub fn predict(&self, state: &StateEstimate) -> StateEstimate {
        let f = &self.transition;
        StateEstimate {
            mean: f * state.mean,
            covariance: symmetrize(&(f * state.covariance * f.transpose() + self.process_noise)),
        }
    }
}

impl Default for StateSpaceModel {
    fn default() -> Self {
        Self::new(&SmootherConfig::default())
    }
}
