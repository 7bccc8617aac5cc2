//! The per-hunter task loop.

use crate::world::World;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wildgrid_core::{HunterId, Result};

/// Drive one hunter until cancelled.
///
/// Hunters never self-terminate; cancellation is observed only at the sleep,
/// so the task can never exit while holding the world lock. Each committed
/// move sweeps every animal on the destination site.
pub async fn run(
    world: Arc<World>,
    id: HunterId,
    mut rng: ChaCha8Rng,
    token: CancellationToken,
) -> Result<()> {
    loop {
        let think = world.config().think_time(&mut rng);
        tokio::select! {
            _ = token.cancelled() => {
                info!(hunter = %id, "hunter cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(think) => {}
        }

        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        if let Some(strike) = world.strike(id, dx, dy)? {
            info!(
                hunter = %id,
                x = strike.to.x,
                y = strike.to.y,
                killed = strike.killed,
                points = strike.points,
                "hunter moved"
            );
        }
    }
}
