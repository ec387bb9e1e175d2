use crate::{Float, Point3f, Vec3f, Ray};
use std::f32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f
}

fn point_min(a: &Point3f, b: &Point3f) -> Point3f {
    Point3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

fn point_max(a: &Point3f, b: &Point3f) -> Point3f {
    Point3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}

impl Aabb {
    pub fn with_bounds(min: Point3f, max: Point3f) -> Self {
        Self {min, max}
    }

    /// The identity of `join`: min at +inf, max at -inf on every axis.
    pub fn empty() -> Self {
        Self::with_bounds(
            Point3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            Point3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY)
        )
    }

    pub fn from_point(p: Point3f) -> Self {
        Self::with_bounds(p, p)
    }

    /// Tight box around a sphere.
    pub fn around_sphere(center: Point3f, radius: Float) -> Self {
        let r = Vec3f::new(radius, radius, radius);
        Self::with_bounds(center - r, center + r)
    }

    pub fn join(&self, other: &Aabb) -> Self {
        Self::with_bounds(
            point_min(&self.min, &other.min),
            point_max(&self.max, &other.max)
        )
    }

    pub fn join_point(&self, p: &Point3f) -> Self {
        Self::with_bounds(
            point_min(&self.min, p),
            point_max(&self.max, p)
        )
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True when the box has collapsed to a single point, i.e. zero extent on all axes.
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn size(&self) -> Vec3f {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point3f {
        self.min + (self.size() / 2.0)
    }

    /// Axis with the largest extent. Ties go to the lower axis, so a cube reports `X`.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.size();
        if d.x >= d.y && d.x >= d.z {
            Axis::X
        } else if d.y >= d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        other.is_empty() || (
            self.min.x <= other.min.x && self.min.y <= other.min.y && self.min.z <= other.min.z &&
            self.max.x >= other.max.x && self.max.y >= other.max.y && self.max.z >= other.max.z
        )
    }

    pub fn contains_point(&self, p: &Point3f) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Slab test. Returns the parametric `(t_entry, t_exit)` interval of the ray inside the box,
    /// clipped to `[0, ray.t_max]`. A ray starting inside the box gets `t_entry == 0`.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(Float, Float)> {
        if self.is_empty() {
            return None;
        }

        let mut t0 = 0.0;
        let mut t1 = ray.t_max;
        for i in 0..3 {
            let inv_dir = 1.0 / ray.dir[i];
            let mut t_near = (self.min[i] - ray.origin[i]) * inv_dir;
            let mut t_far = (self.max[i] - ray.origin[i]) * inv_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            // NaN (origin on a slab plane with a zero direction component) leaves the interval alone
            if t_near > t0 { t0 = t_near; }
            if t_far < t1 { t1 = t_far; }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
