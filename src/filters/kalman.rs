//! Forward Kalman filter over a complete observation sequence.

use super::model::{StateEstimate, StateSpaceModel};
use crate::error::{SmootherError, SmootherResult, Stage};
use crate::types::{symmetrize, KalmanGain, ObsMat, ObsVec, StateMat};

/// Relative determinant floor for the innovation covariance.
const SINGULAR_EPS: f64 = 1e-12;

/// Closed-form inverse of a 2×2 innovation covariance.
///
/// Returns `None` when the determinant is non-finite or negligible relative
/// to the squared magnitude of the entries.
pub fn invert_innovation(s: &ObsMat) -> Option<ObsMat> {
    let (a, b, c, d) = (s[(0, 0)], s[(0, 1)], s[(1, 0)], s[(1, 1)]);
    let det = a * d - b * c;
    let scale = s.amax();
    if !det.is_finite() || det.abs() <= SINGULAR_EPS * scale * scale {
        return None;
    }
    let inv = ObsMat::new(d, -b, -c, a) / det;
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

/// Measurement update of `prior` against one observation.
pub fn update(
    model: &StateSpaceModel,
    prior: &StateEstimate,
    observation: &ObsVec,
    step: usize,
) -> SmootherResult<StateEstimate> {
    let h = &model.observation;
    let h_t = h.transpose();

    // S = H P Hᵀ + R
    let innovation = observation - h * prior.mean;
    let s = h * prior.covariance * h_t + model.observation_noise;
    let s_inv = invert_innovation(&s).ok_or(SmootherError::NumericalInstability {
        stage: Stage::Filter,
        step,
    })?;

    // K = P Hᵀ S⁻¹
    let gain: KalmanGain = prior.covariance * h_t * s_inv;

    let mean = prior.mean + gain * innovation;
    let covariance = symmetrize(&((StateMat::identity() - gain * h) * prior.covariance));

    let posterior = StateEstimate { mean, covariance };
    if !posterior.is_finite() {
        return Err(SmootherError::NumericalInstability {
            stage: Stage::Filter,
            step,
        });
    }
    Ok(posterior)
}

/// Filtered estimates for every step, each conditioned on observations `0..=t`.
///
/// The first estimate is the update of the initial state against the first
/// observation; no prediction is applied before it.
pub fn forward_pass(
    model: &StateSpaceModel,
    observations: &[ObsVec],
) -> SmootherResult<Vec<StateEstimate>> {
    let first = observations.first().ok_or(SmootherError::EmptyInput)?;

    let mut filtered = Vec::with_capacity(observations.len());
    let mut current = update(model, &model.initial_state(first), first, 0)?;
    filtered.push(current.clone());

    for (step, observation) in observations.iter().enumerate().skip(1) {
        let predicted = model.predict(&current);
        current = update(model, &predicted, observation, step)?;
        filtered.push(current.clone());
    }

    log::debug!("Forward pass complete: {} steps", filtered.len());
    Ok(filtered)
}
