use clap::Parser;
use entity_bvh::bvh::SplitMethod;
use entity_bvh::sim::World;
use entity_bvh::{point3f, vec3f, BvhConfig, Float, Ray};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Headless crowd-picking loop: rebuild the BVH every tick and report which entity the camera
/// ray is hovering.
#[derive(Parser, Debug)]
struct Args {
    #[clap(long, default_value = "1000")]
    entities: usize,

    #[clap(long, default_value = "600")]
    ticks: usize,

    /// Radius of every entity's bounding sphere
    #[clap(long, default_value = "1.0")]
    radius: Float,

    /// Nodes per arena block
    #[clap(long, default_value = "256")]
    block_capacity: usize,

    /// `middle` or `equal-counts`
    #[clap(long, default_value = "middle")]
    split: SplitMethod,

    #[clap(long, default_value = "50.0")]
    half_extent: Float,

    #[clap(long, default_value = "5.0")]
    max_speed: Float,

    #[clap(long, default_value = "0")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.half_extent > 0.0, "--half-extent must be > 0, got {}", args.half_extent);

    let config = BvhConfig {
        entity_radius: args.radius,
        block_capacity: args.block_capacity,
        split_method: args.split,
    };
    let mut world = World::new(config, args.half_extent)?;
    world.spawn_random(args.entities, args.max_speed, args.seed);

    // camera sits on the +z wall looking at the middle of the box
    let pick_ray = Ray::new(point3f!(0, 0, args.half_extent * 2.0), vec3f!(0, 0, -1));
    let dt = 1.0 / 60.0;

    let start = Instant::now();
    let mut n_hits = 0u64;
    for tick in 0..args.ticks {
        let hit = world.tick(dt, &pick_ray);
        if hit.is_some() {
            n_hits += 1;
        }
        if tick % 60 == 0 {
            let stats = world.bvh().tree().stats();
            tracing::info!(
                tick = tick,
                hovered = ?world.hovered(),
                t = ?hit.map(|h| h.t),
                nodes = stats.node_count,
                depth = stats.max_depth,
                "tick"
            );
        }
    }

    let elapsed = start.elapsed();
    tracing::info!(
        ticks = args.ticks,
        n_hits = n_hits,
        avg_tick_us = elapsed.as_micros() as u64 / args.ticks.max(1) as u64,
        "done"
    );
    Ok(())
}
