//! The per-tick loop the BVH exists for: move a crowd of spheres around, rebuild the tree, and
//! mark whichever sphere sits under a picking ray as hovered.

use crate::bvh::{Bvh, Hit};
use crate::config::{BvhConfig, ConfigError};
use crate::entity::Entity;
use crate::geometry::Ray;
use crate::{Float, Point3f, Vec3f};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

pub struct World {
    pub entities: Vec<Entity>,
    /// Entities bounce around inside the cube `[-half_extent, half_extent]^3`.
    pub half_extent: Float,
    bvh: Bvh,
    hovered: Option<usize>,
}

impl World {
    pub fn new(config: BvhConfig, half_extent: Float) -> Result<Self, ConfigError> {
        Ok(Self {
            entities: Vec::new(),
            half_extent,
            bvh: Bvh::new(config)?,
            hovered: None,
        })
    }

    /// Adds `n` entities at uniformly random positions inside the world bounds, each moving with a
    /// random velocity of at most `max_speed` per axis. The same seed always gives the same crowd.
    pub fn spawn_random(&mut self, n: usize, max_speed: Float, seed: u64) {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let e = self.half_extent;
        self.entities.reserve(n);
        for _ in 0..n {
            let position = Point3f::new(rng.gen_range(-e, e), rng.gen_range(-e, e), rng.gen_range(-e, e));
            let velocity = if max_speed > 0.0 {
                Vec3f::new(
                    rng.gen_range(-max_speed, max_speed),
                    rng.gen_range(-max_speed, max_speed),
                    rng.gen_range(-max_speed, max_speed)
                )
            } else {
                Vec3f::new(0.0, 0.0, 0.0)
            };
            self.entities.push(Entity::new(position, velocity));
        }
        tracing::debug!(n = n, total = self.entities.len(), "spawned entities");
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Runs one tick: integrate, rebuild, pick.
    pub fn tick(&mut self, dt: Float, pick_ray: &Ray) -> Option<Hit> {
        self.integrate(dt);

        let hit = self.bvh.build(&self.entities).query_closest_hit(pick_ray);

        for entity in &mut self.entities {
            entity.hovered = false;
        }
        if let Some(hit) = hit {
            self.entities[hit.prim_id].hovered = true;
        }

        if self.hovered != hit.map(|h| h.prim_id) {
            tracing::trace!(from = ?self.hovered, to = ?hit.map(|h| h.prim_id), "hover changed");
        }
        self.hovered = hit.map(|h| h.prim_id);
        hit
    }

    fn integrate(&mut self, dt: Float) {
        let e = self.half_extent;
        for entity in &mut self.entities {
            entity.position += entity.velocity * dt;
            for i in 0..3 {
                if entity.position[i] < -e {
                    entity.position[i] = -e;
                    entity.velocity[i] = entity.velocity[i].abs();
                } else if entity.position[i] > e {
                    entity.position[i] = e;
                    entity.velocity[i] = -entity.velocity[i].abs();
                }
            }
        }
    }
}
