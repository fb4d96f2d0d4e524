use crate::config::SmootherConfig;
use crate::error::{SmootherError, SmootherResult};
use crate::filters::{backward_pass, forward_pass, StateEstimate, StateSpaceModel};
use crate::types::{GpsRecord, ObsVec};

/// Output of one smoothing run
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedTrajectory {
    /// Forward-pass estimates, step t conditioned on observations 0..=t
    pub filtered: Vec<StateEstimate>,
    /// Backward-pass estimates, every step conditioned on the whole sequence
    pub smoothed: Vec<StateEstimate>,
}

impl SmoothedTrajectory {
    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }

    /// Smoothed (lat, lng) per step
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.smoothed.iter().map(StateEstimate::position).collect()
    }
}

/// Batch Kalman filter + RTS smoother over a complete GPS track.
///
/// Both passes need the full sequence in memory; there is no incremental
/// mode. Independent tracks may be smoothed on separate threads with the
/// same smoother, which holds no per-run state.
#[derive(Clone, Debug)]
pub struct TrajectorySmoother {
    config: SmootherConfig,
    model: StateSpaceModel,
}

impl TrajectorySmoother {
    pub fn new(config: SmootherConfig) -> SmootherResult<Self> {
        config.validate()?;
        let model = StateSpaceModel::new(&config);
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    pub fn model(&self) -> &StateSpaceModel {
        &self.model
    }

    /// Forward pass only.
    pub fn filter(&self, observations: &[ObsVec]) -> SmootherResult<Vec<StateEstimate>> {
        forward_pass(&self.model, observations)
    }

    /// Forward pass followed by the backward pass.
    pub fn smooth(&self, observations: &[ObsVec]) -> SmootherResult<SmoothedTrajectory> {
        let filtered = self.filter(observations)?;
        let smoothed = backward_pass(&self.model, &filtered)?;
        Ok(SmoothedTrajectory { filtered, smoothed })
    }

    /// Smooth the coordinates of `records`, returning new records.
    pub fn smooth_records(&self, records: &[GpsRecord]) -> SmootherResult<Vec<GpsRecord>> {
        let observations: Vec<ObsVec> = records.iter().map(GpsRecord::observation).collect();
        let trajectory = self.smooth(&observations)?;
        log::info!("Smoothed {} GPS fixes", trajectory.len());
        reattach(records, &trajectory.positions())
    }
}

impl Default for TrajectorySmoother {
    fn default() -> Self {
        let config = SmootherConfig::default();
        let model = StateSpaceModel::new(&config);
        Self { config, model }
    }
}

/// Copies of `records` with `lat`/`lng` replaced by `positions`, pairwise.
///
/// A length difference is a caller bug and is never truncated or padded.
pub fn reattach(records: &[GpsRecord], positions: &[(f64, f64)]) -> SmootherResult<Vec<GpsRecord>> {
    if records.len() != positions.len() {
        return Err(SmootherError::LengthMismatch {
            expected: records.len(),
            actual: positions.len(),
        });
    }
    Ok(records
        .iter()
        .zip(positions)
        .map(|(record, &(lat, lng))| record.with_position(lat, lng))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn line(n: usize) -> Vec<ObsVec> {
        (0..n)
            .map(|i| ObsVec::new(37.5665 + 1e-4 * i as f64, 126.9780 + 1.5e-4 * i as f64))
            .collect()
    }

    fn mean_sq_error(estimates: &[(f64, f64)], truth: &[ObsVec]) -> f64 {
        let sum: f64 = estimates
            .iter()
            .zip(truth)
            .map(|(&(lat, lng), t)| (lat - t[0]).powi(2) + (lng - t[1]).powi(2))
            .sum();
        sum / truth.len() as f64
    }

    #[test]
    fn test_deterministic() {
        let smoother = TrajectorySmoother::default();
        let obs = line(25);
        let a = smoother.smooth(&obs).unwrap();
        let b = smoother.smooth(&obs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_preserved() {
        let smoother = TrajectorySmoother::default();
        for n in [1, 2, 3, 17, 100] {
            let trajectory = smoother.smooth(&line(n)).unwrap();
            assert_eq!(trajectory.filtered.len(), n);
            assert_eq!(trajectory.smoothed.len(), n);
            assert_eq!(trajectory.positions().len(), n);
        }
    }

    #[test]
    fn test_final_step_matches_filtered() {
        let smoother = TrajectorySmoother::default();
        let trajectory = smoother.smooth(&line(9)).unwrap();
        assert_eq!(trajectory.smoothed.last(), trajectory.filtered.last());
    }

    #[test]
    fn test_single_point() {
        let smoother = TrajectorySmoother::default();
        let trajectory = smoother.smooth(&[ObsVec::new(37.5, 127.0)]).unwrap();

        assert_eq!(trajectory.smoothed, trajectory.filtered);
        assert_eq!(trajectory.positions(), vec![(37.5, 127.0)]);
        assert_eq!(trajectory.smoothed[0].velocity(), (0.0, 0.0));
    }

    #[test]
    fn test_straight_line_reproduced() {
        let smoother = TrajectorySmoother::default();
        let obs = line(60);
        let trajectory = smoother.smooth(&obs).unwrap();

        for ((lat, lng), truth) in trajectory.positions().into_iter().zip(&obs) {
            assert_abs_diff_eq!(lat, truth[0], epsilon = 1e-6);
            assert_abs_diff_eq!(lng, truth[1], epsilon = 1e-6);
        }
        let (vlat, vlng) = trajectory.smoothed[30].velocity();
        assert_abs_diff_eq!(vlat, 1e-4, epsilon = 1e-7);
        assert_abs_diff_eq!(vlng, 1.5e-4, epsilon = 1e-7);
    }

    #[test]
    fn test_noisy_track_closer_to_truth() {
        let smoother = TrajectorySmoother::default();
        let truth = line(200);
        let noise = Normal::new(0.0, smoother.config().observation_noise.sqrt()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let noisy: Vec<ObsVec> = truth
            .iter()
            .map(|t| ObsVec::new(t[0] + noise.sample(&mut rng), t[1] + noise.sample(&mut rng)))
            .collect();
        let raw: Vec<(f64, f64)> = noisy.iter().map(|o| (o[0], o[1])).collect();

        let smoothed = smoother.smooth(&noisy).unwrap().positions();
        let raw_mse = mean_sq_error(&raw, &truth);
        let smoothed_mse = mean_sq_error(&smoothed, &truth);
        assert!(
            smoothed_mse < raw_mse,
            "smoothed {} vs raw {}",
            smoothed_mse,
            raw_mse
        );
    }

    #[test]
    fn test_interior_uncertainty_not_larger() {
        let smoother = TrajectorySmoother::default();
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.01).unwrap();
        let obs: Vec<ObsVec> = line(50)
            .into_iter()
            .map(|o| o + ObsVec::new(noise.sample(&mut rng), noise.sample(&mut rng)))
            .collect();

        let trajectory = smoother.smooth(&obs).unwrap();
        for (f, s) in trajectory.filtered.iter().zip(&trajectory.smoothed) {
            assert!(s.covariance.trace() <= f.covariance.trace() * (1.0 + 1e-9));
        }
    }

    #[test]
    fn test_empty_input() {
        let smoother = TrajectorySmoother::default();
        assert_eq!(smoother.smooth(&[]), Err(SmootherError::EmptyInput));
        assert_eq!(smoother.smooth_records(&[]), Err(SmootherError::EmptyInput));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SmootherConfig::default().with_process_noise(-1.0);
        assert!(matches!(
            TrajectorySmoother::new(config),
            Err(SmootherError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_changes_result() {
        let obs: Vec<ObsVec> = line(20)
            .into_iter()
            .enumerate()
            .map(|(i, o)| o + ObsVec::new(if i % 2 == 0 { 0.002 } else { -0.002 }, 0.0))
            .collect();
        let stiff = TrajectorySmoother::default().smooth(&obs).unwrap();
        let loose = TrajectorySmoother::new(SmootherConfig::default().with_process_noise(1.0))
            .unwrap()
            .smooth(&obs)
            .unwrap();

        // With large Q the smoother follows the measurements more closely
        let dev = |t: &SmoothedTrajectory| (t.positions()[10].0 - obs[10][0]).abs();
        assert!(dev(&loose) < dev(&stiff));
    }

    #[test]
    fn test_smooth_records_passes_fields_through() {
        let smoother = TrajectorySmoother::default();
        let records: Vec<GpsRecord> = line(5)
            .iter()
            .enumerate()
            .map(|(i, o)| {
                GpsRecord::new(o[0], o[1])
                    .with_field("timeStamp", format!("2025-05-01T07:00:0{}Z", i))
                    .with_field("bpm", 140 + i as u64)
            })
            .collect();

        let smoothed = smoother.smooth_records(&records).unwrap();
        assert_eq!(smoothed.len(), records.len());
        for (before, after) in records.iter().zip(&smoothed) {
            assert_eq!(before.timestamp(), after.timestamp());
            assert_eq!(before.get("bpm"), after.get("bpm"));
            assert_eq!(
                before.fields().keys().collect::<Vec<_>>(),
                after.fields().keys().collect::<Vec<_>>()
            );
        }
        // inputs untouched
        assert_eq!(records[0].position(), (37.5665, 126.9780));
    }

    #[test]
    fn test_reattach_length_mismatch() {
        let records = vec![GpsRecord::new(1.0, 2.0), GpsRecord::new(1.1, 2.1)];
        let err = reattach(&records, &[(1.0, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            SmootherError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert!(reattach(&records, &[(0.0, 0.0); 3]).is_err());
    }

    #[test]
    fn test_reattach_replaces_coordinates() {
        let records = vec![GpsRecord::new(1.0, 2.0).with_field("pace", 5.5)];
        let out = reattach(&records, &[(1.5, 2.5)]).unwrap();
        assert_eq!(out[0].position(), (1.5, 2.5));
        assert_eq!(out[0].get("pace"), records[0].get("pace"));
    }

    #[test]
    fn test_independent_tracks_on_threads() {
        let smoother = TrajectorySmoother::default();
        let expected = smoother.smooth(&line(30)).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| smoother.smooth(&line(30)).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
