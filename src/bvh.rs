use crate::aabb::{Aabb, Axis};
use crate::arena::{Arena, Id};
use crate::config::{BvhConfig, ConfigError};
use crate::entity::Positioned;
use crate::geometry::Ray;
use crate::{Float, Point3f};
use partition::partition;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::str::FromStr;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitMethod {
    /// Partition around the midpoint of the centroid bounds along the longest axis.
    Middle,
    /// Split at the median centroid along the longest axis.
    EqualCounts,
}

impl FromStr for SplitMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "middle" => Ok(SplitMethod::Middle),
            "equal-counts" => Ok(SplitMethod::EqualCounts),
            other => Err(format!("unknown split method '{}', expected 'middle' or 'equal-counts'", other)),
        }
    }
}

pub type NodeId = Id<BvhNode>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimInfo {
    /// Index into the slice the BVH was built from.
    pub id: usize,
    pub bounds: Aabb,
    pub centroid: Point3f
}

impl PrimInfo {
    fn new(id: usize, bounds: Aabb) -> Self {
        Self { id, bounds, centroid: bounds.centroid() }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BvhNode {
    Leaf {
        bounds: Aabb,
        first_prim_offset: usize,
        prim_count: usize,
    },

    Interior {
        bounds: Aabb,
        children: [NodeId; 2],
        split_axis: Axis
    }
}

impl BvhNode {
    fn new_leaf(first_prim_offset: usize, prim_count: usize, bounds: Aabb) -> Self {
        BvhNode::Leaf {
            first_prim_offset, prim_count, bounds
        }
    }

    fn new_interior(children: [NodeId; 2], bounds: Aabb, split_axis: Axis) -> Self {
        BvhNode::Interior {
            children,
            bounds,
            split_axis
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            BvhNode::Leaf {bounds, ..} => *bounds,
            BvhNode::Interior {bounds, ..} => *bounds
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf {..})
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Id of the primitive, i.e. its index in the slice passed to `Bvh::build`.
    pub prim_id: usize,
    /// Ray parameter where the ray enters the primitive's bounds.
    pub t: Float,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
}

/// Bounding volume hierarchy over spheres of a fixed radius, rebuilt from scratch on every `build`.
///
/// Nodes live in an [`Arena`] owned by the `Bvh` and refer to each other by id. The tree can only
/// be inspected or queried through a [`BvhTree`], which borrows the `Bvh`, so no node id can be
/// used across a `reset` or a rebuild.
pub struct Bvh {
    config: BvhConfig,
    arena: Arena<BvhNode>,
    prims: Vec<PrimInfo>,
    root: Option<NodeId>,
}

impl Bvh {
    pub fn new(config: BvhConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let arena = Arena::new(config.block_capacity)?;
        Ok(Self {
            config,
            arena,
            prims: Vec::new(),
            root: None,
        })
    }

    pub fn reset(&mut self) {
        self.prims.clear();
        self.root = None;
        self.arena.reset();
    }

    /// Rebuilds the tree over `entities` from scratch, reusing the arena's blocks.
    ///
    /// # Panics
    ///
    /// With `SplitMethod::Middle`, panics if a midpoint split puts every primitive on one side.
    /// This happens when two centroids are one ulp apart along the split axis, so their midpoint
    /// rounds onto the lower one. `SplitMethod::EqualCounts` always splits such ranges.
    pub fn build<E: Positioned>(&mut self, entities: &[E]) -> BvhTree<'_> {
        let span = tracing::debug_span!("bvh_build", n_prims = entities.len());
        let _enter = span.enter();
        let start = Instant::now();

        self.reset();

        let radius = self.config.entity_radius;
        self.prims.extend(entities.iter().enumerate().map(|(i, e)| {
            PrimInfo::new(i, Aabb::around_sphere(e.position(), radius))
        }));

        if !self.prims.is_empty() {
            let n_prims = self.prims.len();
            let root = Self::recursive_build(
                &mut self.arena,
                &mut self.prims,
                0,
                n_prims,
                0,
                self.config.split_method
            );
            self.root = Some(root);
        }

        tracing::debug!(
            n_nodes = self.arena.len(),
            n_blocks = self.arena.block_count(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "built bvh"
        );
        self.tree()
    }

    pub fn tree(&self) -> BvhTree<'_> {
        BvhTree {
            nodes: &self.arena,
            prims: &self.prims,
            root: self.root
        }
    }

    fn recursive_build(
        arena: &mut Arena<BvhNode>,
        prims: &mut [PrimInfo],
        first: usize,
        count: usize,
        depth: usize,
        split_method: SplitMethod
    ) -> NodeId {
        assert!(count > 0, "empty prim range at offset {} (depth {})", first, depth);
        let range = first..first + count;

        if count == 1 {
            return arena.alloc(BvhNode::new_leaf(first, 1, prims[first].bounds));
        }

        let centroid_bounds = prims[range.clone()].iter()
            .fold(Aabb::empty(), |bb, prim| bb.join_point(&prim.centroid));

        // If all the centroids lie on the same point they can't be partitioned, so the whole
        // range becomes one leaf.
        if centroid_bounds.is_empty() || centroid_bounds.is_point() {
            let bounds = prims[range.clone()].iter()
                .fold(Aabb::empty(), |bb, prim| bb.join(&prim.bounds));
            return arena.alloc(BvhNode::new_leaf(first, count, bounds));
        }

        let axis = centroid_bounds.maximum_extent();
        let ax = axis as usize;

        let n_left = match split_method {
            SplitMethod::Middle => {
                let midpoint = (centroid_bounds.min[ax] + centroid_bounds.max[ax]) / 2.0;
                let (left, _right) = partition(&mut prims[range.clone()], |prim| {
                    prim.centroid[ax] < midpoint
                });
                left.len()
            },
            SplitMethod::EqualCounts => {
                let half = count / 2;
                prims[range.clone()].select_nth_unstable_by(half, |a, b| {
                    a.centroid[ax].partial_cmp(&b.centroid[ax]).unwrap_or(Ordering::Equal)
                });
                half
            }
        };

        let mid = first + n_left;
        assert!(
            mid != first && mid != range.end,
            "degenerate partition of prims {:?} at depth {} along {:?}: split offset {}",
            range, depth, axis, mid
        );

        let left = Self::recursive_build(arena, prims, first, mid - first, depth + 1, split_method);
        let right = Self::recursive_build(arena, prims, mid, range.end - mid, depth + 1, split_method);

        let bounds = arena[left].bounds().join(&arena[right].bounds());
        arena.alloc(BvhNode::new_interior([left, right], bounds, axis))
    }
}

/// Read-only view of a built tree. Borrows the [`Bvh`] it came from.
#[derive(Copy, Clone)]
pub struct BvhTree<'a> {
    nodes: &'a Arena<BvhNode>,
    prims: &'a [PrimInfo],
    root: Option<NodeId>,
}

impl<'a> BvhTree<'a> {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &'a BvhNode {
        self.nodes.get(id)
    }

    /// Primitives in tree order. Leaf ranges index into this slice.
    pub fn prims(&self) -> &'a [PrimInfo] {
        self.prims
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn bounds(&self) -> Aabb {
        self.root.map_or(Aabb::empty(), |root| self.node(root).bounds())
    }

    /// Primitives covered by a leaf. Empty for interior nodes.
    pub fn leaf_prims(&self, node: &BvhNode) -> &'a [PrimInfo] {
        match *node {
            BvhNode::Leaf { first_prim_offset, prim_count, .. } => {
                &self.prims[first_prim_offset..first_prim_offset + prim_count]
            }
            BvhNode::Interior { .. } => &[],
        }
    }

    /// All leaves, left to right.
    pub fn leaves(&self) -> Vec<&'a BvhNode> {
        let mut leaves = Vec::new();
        self.visit(|node, _depth| {
            if node.is_leaf() {
                leaves.push(node);
            }
        });
        leaves
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.visit(|node, depth| {
            stats.node_count += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if let BvhNode::Leaf { prim_count, .. } = *node {
                stats.leaf_count += 1;
                stats.max_leaf_size = stats.max_leaf_size.max(prim_count);
            }
        });
        stats
    }

    /// Depth-first, left before right, root at depth 0.
    fn visit(&self, mut f: impl FnMut(&'a BvhNode, usize)) {
        let mut stack: SmallVec<[(NodeId, usize); 64]> = SmallVec::new();
        if let Some(root) = self.root {
            stack.push((root, 0));
        }
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            f(node, depth);
            if let BvhNode::Interior { children, .. } = *node {
                stack.push((children[1], depth + 1));
                stack.push((children[0], depth + 1));
            }
        }
    }

    /// Finds the primitive whose bounds the ray enters first.
    ///
    /// Subtrees whose bounds the ray misses are skipped. Both children of a hit interior node are
    /// visited, left first, and a primitive only replaces the current best on a strictly smaller
    /// `t`, so ties go to the primitive tested first.
    pub fn query_closest_hit(&self, ray: &Ray) -> Option<Hit> {
        let mut closest: Option<Hit> = None;
        let mut stack: SmallVec<[NodeId; 64]> = SmallVec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }

        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.bounds().intersect_ray(ray).is_none() {
                continue;
            }

            match *node {
                BvhNode::Leaf { .. } => {
                    for prim in self.leaf_prims(node) {
                        if let Some((t_entry, _)) = prim.bounds.intersect_ray(ray) {
                            if closest.map_or(true, |hit| t_entry < hit.t) {
                                closest = Some(Hit { prim_id: prim.id, t: t_entry });
                            }
                        }
                    }
                },
                BvhNode::Interior { children, .. } => {
                    stack.push(children[1]);
                    stack.push(children[0]);
                }
            }
        }

        closest
    }
}
