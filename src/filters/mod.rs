pub mod kalman;
pub mod model;
pub mod rts;

pub use kalman::{forward_pass, invert_innovation};
pub use model::{StateEstimate, StateSpaceModel};
pub use rts::backward_pass;
