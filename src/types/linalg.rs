//! Linear algebra type system for the trajectory smoother
//!
//! Provides compile-time dimension checking and clean type aliases
//! for the constant-velocity Kalman filter and RTS smoother.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 4; // (x, y, vx, vy)

// ===== Measurement Dimensions =====
pub const OBS_DIM: usize = 2; // (lat, lng)

// ===== State Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

// ===== Observation Types =====
pub type ObsVec = SVector<f64, OBS_DIM>;
pub type ObsMat = SMatrix<f64, OBS_DIM, OBS_DIM>;

// Observation matrix H
pub type ObservationMatrix = SMatrix<f64, OBS_DIM, STATE_DIM>; // 2×4

// Kalman gain
pub type KalmanGain = SMatrix<f64, STATE_DIM, OBS_DIM>; // 4×2

/// Average a covariance with its transpose to remove floating-point skew.
pub fn symmetrize(m: &StateMat) -> StateMat {
    (m + m.transpose()) * 0.5
}
