//! Error types for the simulation.

use crate::types::{AnimalId, HunterId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown animal: {0}")]
    UnknownAnimal(AnimalId),

    #[error("Unknown hunter: {0}")]
    UnknownHunter(HunterId),

    #[error("Task error: {0}")]
    Task(String),
}
