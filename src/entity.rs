use crate::{Point3f, Vec3f};
use cgmath::Zero;

/// Anything the BVH can be built over. Each item is bounded by a sphere of the configured radius
/// around its position.
pub trait Positioned {
    fn position(&self) -> Point3f;
}

impl Positioned for Point3f {
    fn position(&self) -> Point3f {
        *self
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Entity {
    pub position: Point3f,
    pub velocity: Vec3f,
    pub hovered: bool,
}

impl Entity {
    pub fn new(position: Point3f, velocity: Vec3f) -> Self {
        Entity { position, velocity, hovered: false }
    }

    pub fn fixed(position: Point3f) -> Self {
        Entity { position, velocity: Vec3f::zero(), hovered: false }
    }
}

impl Positioned for Entity {
    fn position(&self) -> Point3f {
        self.position
    }
}
