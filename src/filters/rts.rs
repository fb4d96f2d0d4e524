//! Rauch-Tung-Striebel fixed-interval smoother (backward pass).

use super::model::{StateEstimate, StateSpaceModel};
use crate::error::{SmootherError, SmootherResult, Stage};
use crate::types::{symmetrize, StateMat};

/// Smoother gain G = P_f Fᵀ P_pred⁻¹.
///
/// Computed as (P_pred⁻¹ F P_f)ᵀ through a Cholesky solve, which also rejects
/// a predicted covariance that is not positive definite.
fn smoother_gain(
    model: &StateSpaceModel,
    filtered: &StateEstimate,
    predicted: &StateEstimate,
) -> Option<StateMat> {
    let chol = predicted.covariance.cholesky()?;
    let gain_t = chol.solve(&(model.transition * filtered.covariance));
    gain_t.iter().all(|v| v.is_finite()).then(|| gain_t.transpose())
}

/// Smoothed estimates for every step, each conditioned on the whole sequence.
///
/// The last smoothed estimate is the last filtered estimate; the pass then
/// walks strictly backward to step 0.
pub fn backward_pass(
    model: &StateSpaceModel,
    filtered: &[StateEstimate],
) -> SmootherResult<Vec<StateEstimate>> {
    let last = filtered.last().ok_or(SmootherError::EmptyInput)?;

    let mut smoothed = vec![last.clone(); filtered.len()];
    for step in (0..filtered.len() - 1).rev() {
        let current = &filtered[step];
        let predicted = model.predict(current);
        let unstable = SmootherError::NumericalInstability {
            stage: Stage::Smoother,
            step,
        };

        let gain = smoother_gain(model, current, &predicted).ok_or_else(|| unstable.clone())?;
        let next = &smoothed[step + 1];

        let mean = current.mean + gain * (next.mean - predicted.mean);
        let covariance = symmetrize(
            &(current.covariance + gain * (next.covariance - predicted.covariance) * gain.transpose()),
        );

        let estimate = StateEstimate { mean, covariance };
        if !estimate.is_finite() {
            return Err(unstable);
        }
        smoothed[step] = estimate;
    }

    log::debug!("Backward pass complete: {} steps", smoothed.len());
    Ok(smoothed)
}
