//! Agent lifecycle: placement, task spawning, join and cancellation.

use crate::world::{GridSnapshot, World};
use crate::{animal, hunter};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wildgrid_core::{
    AnimalId, AnimalStatus, Error, HunterId, Location, Result, SimConfig, Species,
};

/// Final state of one animal after the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalFate {
    pub id: AnimalId,
    pub species: Species,
    pub status: AnimalStatus,
    pub location: Location,
}

/// Final score of one hunter after cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HunterScore {
    pub id: HunterId,
    pub points: u32,
    pub location: Location,
}

/// What the run left behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub animals: Vec<AnimalFate>,
    pub hunters: Vec<HunterScore>,
    pub snapshot: GridSnapshot,
}

/// Owns the world and the agent task lifecycle: every agent is inserted into
/// its starting site before its task is spawned, animal tasks are joined
/// first, then hunters are cancelled and joined.
pub struct Coordinator {
    config: SimConfig,
}

impl Coordinator {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub async fn run(self) -> Result<RunSummary> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let world = Arc::new(World::new(self.config.clone(), &mut rng));

        // Placement happens-before any task starts, so no task can observe
        // an empty starting site for itself.
        let mut animal_ids = Vec::new();
        for species in Species::all() {
            let id = world.spawn_animal(species, &mut rng);
            info!(animal = %id, ?species, "animal placed");
            animal_ids.push(id);
        }
        let mut hunter_ids = Vec::new();
        for _ in 0..self.config.hunters {
            let id = world.spawn_hunter(&mut rng);
            info!(hunter = %id, "hunter placed");
            hunter_ids.push(id);
        }

        info!("initial grid:\n{}", world.snapshot());

        let mut animal_tasks: Vec<JoinHandle<Result<()>>> = Vec::new();
        for id in &animal_ids {
            let task_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            animal_tasks.push(tokio::spawn(animal::run(world.clone(), *id, task_rng)));
        }

        let token = CancellationToken::new();
        let mut hunter_tasks: Vec<JoinHandle<Result<()>>> = Vec::new();
        for id in &hunter_ids {
            let task_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            hunter_tasks.push(tokio::spawn(hunter::run(
                world.clone(),
                *id,
                task_rng,
                token.clone(),
            )));
        }

        for task in animal_tasks {
            task.await.map_err(|e| Error::Task(e.to_string()))??;
        }
        info!("all animals dead, cancelling hunters");

        token.cancel();
        for task in hunter_tasks {
            task.await.map_err(|e| Error::Task(e.to_string()))??;
        }

        let animals = animal_ids
            .iter()
            .map(|id| {
                world.animal(*id).map(|record| AnimalFate {
                    id: *id,
                    species: record.species,
                    status: record.status,
                    location: record.location,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let hunters = hunter_ids
            .iter()
            .map(|id| {
                world.hunter(*id).map(|record| HunterScore {
                    id: *id,
                    points: record.points,
                    location: record.location,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RunSummary {
            animals,
            hunters,
            snapshot: world.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_invalid_config() {
        let config = SimConfig {
            width: 0,
            ..Default::default()
        };
        assert!(Coordinator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_full_run_terminates() {
        // All-wintering terrain so every animal dies quickly
        let config = SimConfig {
            width: 5,
            height: 5,
            hunters: 2,
            seed: 42,
            think_min_ms: 1,
            think_max_ms: 3,
            wintering_cut: 1.0,
            feeding_cut: 1.0,
            ..Default::default()
        };

        let coordinator = Coordinator::new(config).unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(30), coordinator.run())
            .await
            .expect("run did not terminate")
            .unwrap();

        assert_eq!(summary.animals.len(), 3);
        assert!(summary
            .animals
            .iter()
            .all(|fate| fate.status == AnimalStatus::Dead));
        assert_eq!(summary.hunters.len(), 2);
    }

    #[tokio::test]
    async fn test_run_without_hunters() {
        let config = SimConfig {
            width: 3,
            height: 3,
            hunters: 0,
            seed: 7,
            think_min_ms: 1,
            think_max_ms: 2,
            wintering_cut: 1.0,
            feeding_cut: 1.0,
            ..Default::default()
        };

        let summary = tokio::time::timeout(
            Duration::from_secs(30),
            Coordinator::new(config).unwrap().run(),
        )
        .await
        .expect("run did not terminate")
        .unwrap();

        assert!(summary.hunters.is_empty());
        assert_eq!(summary.animals.len(), 3);
    }
}
