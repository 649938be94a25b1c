//! Core data models for replay ranking.

mod ids;
mod metadata;
mod player;
mod rank;
mod replay;
mod stats;

pub use ids::*;
pub use metadata::*;
pub use player::*;
pub use rank::*;
pub use replay::*;
pub use stats::*;
