#[macro_use] pub mod macros; // must stay at the top
pub mod aabb;
pub mod arena;
pub mod bvh;
pub mod config;
pub mod entity;
pub mod geometry;
pub mod sim;

pub use geometry::Ray;
pub use aabb::{Aabb, Axis};
pub use bvh::{Bvh, BvhTree, Hit};
pub use config::{BvhConfig, ConfigError};
pub use entity::{Entity, Positioned};

use cgmath::{Point3, Vector3};

pub type Float = f32;

pub type Point3f = Point3<Float>;
pub type Vec3f = Vector3<Float>;
