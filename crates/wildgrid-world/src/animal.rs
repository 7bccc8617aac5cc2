//! The per-animal task loop.

use crate::world::{MoveOutcome, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::info;
use wildgrid_core::{AnimalId, AnimalStatus, Result, Terrain};

/// Drive one animal until it dies.
///
/// The sleep is the only suspension point and never overlaps the world lock.
/// Out-of-bounds candidates abandon the iteration; landing on a feeding or
/// nesting site can trigger a second, must-succeed relocation in the same
/// iteration.
pub async fn run(world: Arc<World>, id: AnimalId, mut rng: ChaCha8Rng) -> Result<()> {
    loop {
        // A hunter may have killed us while we slept
        let record = world.animal(id)?;
        if record.status == AnimalStatus::Dead {
            info!(animal = %id, x = record.location.x, y = record.location.y, "animal died");
            return Ok(());
        }

        let think = world.config().think_time(&mut rng);
        tokio::time::sleep(think).await;

        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        let (to, terrain) = match world.step_animal(id, dx, dy)? {
            // Death is reported at the top of the loop
            MoveOutcome::Dead => continue,
            MoveOutcome::OutOfBounds => continue,
            MoveOutcome::Moved { to, terrain } => (to, terrain),
        };
        info!(animal = %id, x = to.x, y = to.y, "animal moved");

        match terrain {
            Terrain::Wintering => {
                if rng.gen::<f64>() < world.config().winter_death_prob {
                    let location = world.kill_animal(id)?;
                    info!(animal = %id, x = location.x, y = location.y, "animal died");
                    return Ok(());
                }
            }
            Terrain::Feeding => {
                if rng.gen::<f64>() >= world.config().feeding_wander_threshold {
                    wander(&world, id, &mut rng)?;
                }
            }
            Terrain::Nesting => {
                wander(&world, id, &mut rng)?;
            }
        }
    }
}

fn wander(world: &World, id: AnimalId, rng: &mut ChaCha8Rng) -> Result<()> {
    if let Some((to, _)) = world.wander_animal(id, rng)? {
        info!(animal = %id, x = to.x, y = to.y, "animal moved");
    }
    Ok(())
}
