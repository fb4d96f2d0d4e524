//! GPS track denoising: constant-velocity Kalman filter + RTS smoother,
//! with newline-delimited JSON I/O, OSRM map-match requests and GeoJSON
//! export around it.

pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod map_match;
pub mod smoothing;
pub mod storage;
pub mod types;

pub use config::SmootherConfig;
pub use error::{SmootherError, SmootherResult, Stage};
pub use filters::{StateEstimate, StateSpaceModel};
pub use smoothing::{reattach, SmoothedTrajectory, TrajectorySmoother};
pub use types::GpsRecord;
