pub mod error;
pub use error::*;

pub mod engine;
pub mod fleet;
pub mod provider;
pub mod record;
pub mod store;
pub mod tracker;
pub mod zone;

mod wrapper;

pub use engine::{Engine, Pacing, SweepMode, SweepReport};
