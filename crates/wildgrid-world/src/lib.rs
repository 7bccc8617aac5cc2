//! Concurrent grid-world simulation engine.
//!
//! A fixed 2D grid of sites is shared by animal and hunter tasks that move
//! independently, all site-membership mutation funneled through one lock.

pub mod animal;
pub mod coordinator;
pub mod grid;
pub mod hunter;
pub mod world;

pub use coordinator::{Coordinator, RunSummary};
pub use grid::{Grid, Site};
pub use world::{GridSnapshot, MoveOutcome, Strike, World};
