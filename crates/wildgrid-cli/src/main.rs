//! Command-line entry point for the wildgrid simulation.

mod telemetry;

use anyhow::{bail, Context, Result};
use rand::Rng;
use tracing::info;
use wildgrid_core::SimConfig;
use wildgrid_world::Coordinator;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let hunters: u32 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid hunter count: {arg}"))?,
        None => bail!("usage: wildgrid <hunters>"),
    };

    let config = SimConfig {
        hunters,
        seed: rand::thread_rng().gen(),
        ..Default::default()
    };
    info!(
        width = config.width,
        height = config.height,
        hunters = config.hunters,
        seed = config.seed,
        "starting simulation"
    );

    let summary = Coordinator::new(config)?.run().await?;

    info!("final grid:\n{}", summary.snapshot);
    for fate in &summary.animals {
        info!(animal = %fate.id, species = ?fate.species, x = fate.location.x, y = fate.location.y, "animal fate");
    }
    for score in &summary.hunters {
        info!(hunter = %score.id, points = score.points, x = score.location.x, y = score.location.y, "hunter score");
    }

    Ok(())
}
