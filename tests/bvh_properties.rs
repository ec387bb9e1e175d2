/*!
Integration tests for the BVH: every build is checked for leaf coverage, leaf range tiling and
bounds soundness, and closest-hit queries are cross-checked against a brute force scan.
*/

use entity_bvh::bvh::{BvhNode, NodeId, SplitMethod};
use entity_bvh::{point3f, vec3f, Aabb, Bvh, BvhConfig, BvhTree, Entity, Float, Point3f, Ray, Vec3f};
use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use rand::distributions::{Distribution, UnitSphereSurface};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use cgmath::InnerSpace;

const RADIUS: Float = 0.75;

fn random_entities(n: usize, half_extent: Float, seed: u64) -> Vec<Entity> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Entity::fixed(Point3f::new(
                rng.gen_range(-half_extent, half_extent),
                rng.gen_range(-half_extent, half_extent),
                rng.gen_range(-half_extent, half_extent),
            ))
        })
        .collect()
}

fn config(split_method: SplitMethod) -> BvhConfig {
    BvhConfig { entity_radius: RADIUS, block_capacity: 64, split_method }
}

fn check_tree(tree: &BvhTree, entities: &[Entity], radius: Float) {
    let n = entities.len();
    assert_eq!(tree.prims().len(), n);

    // every id shows up in exactly one leaf
    let mut ids: Vec<usize> = tree.leaves().iter()
        .flat_map(|leaf| tree.leaf_prims(leaf).iter().map(|p| p.id))
        .collect();
    ids.sort();
    assert_eq!(ids, (0..n).collect::<Vec<_>>());

    // leaf ranges tile [0, n)
    let mut ranges: Vec<(usize, usize)> = tree.leaves().iter()
        .map(|leaf| match **leaf {
            BvhNode::Leaf { first_prim_offset, prim_count, .. } => {
                assert!(prim_count >= 1);
                (first_prim_offset, prim_count)
            }
            BvhNode::Interior { .. } => panic!("leaves() returned an interior node"),
        })
        .collect();
    ranges.sort();
    let mut next = 0;
    for (offset, count) in ranges {
        assert_eq!(offset, next);
        next += count;
    }
    assert_eq!(next, n);

    if let Some(root) = tree.root() {
        check_bounds(tree, root, entities, radius);
    }
}

fn check_bounds(tree: &BvhTree, id: NodeId, entities: &[Entity], radius: Float) -> Aabb {
    let node = tree.node(id);
    match *node {
        BvhNode::Interior { bounds, children, .. } => {
            let left = check_bounds(tree, children[0], entities, radius);
            let right = check_bounds(tree, children[1], entities, radius);
            assert_eq!(bounds, left.join(&right));
        }
        BvhNode::Leaf { bounds, .. } => {
            for prim in tree.leaf_prims(node) {
                let true_bounds = Aabb::around_sphere(entities[prim.id].position, radius);
                assert_eq!(prim.bounds, true_bounds);
                assert!(bounds.contains(&true_bounds), "{:?} does not contain {:?}", bounds, true_bounds);
            }
        }
    }
    node.bounds()
}

fn brute_force_closest(entities: &[Entity], radius: Float, ray: &Ray) -> Option<(usize, Float)> {
    entities.iter()
        .enumerate()
        .filter_map(|(i, e)| {
            Aabb::around_sphere(e.position, radius).intersect_ray(ray).map(|(t, _)| (i, t))
        })
        .fold(None, |best: Option<(usize, Float)>, (i, t)| match best {
            Some((_, best_t)) if best_t <= t => best,
            _ => Some((i, t)),
        })
}

fn random_ray(rng: &mut Xoshiro256Plus, distance: Float) -> Ray {
    let [x, y, z] = UnitSphereSurface::new().sample(rng);
    let origin = Point3f::new(x as Float * distance, y as Float * distance, z as Float * distance);
    let target = Point3f::new(
        rng.gen_range(-5.0, 5.0),
        rng.gen_range(-5.0, 5.0),
        rng.gen_range(-5.0, 5.0),
    );
    Ray::new(origin, (target - origin).normalize())
}

#[test]
fn test_random_builds_are_well_formed() -> anyhow::Result<()> {
    for &split_method in &[SplitMethod::Middle, SplitMethod::EqualCounts] {
        let mut bvh = Bvh::new(config(split_method))?;
        for (seed, &n) in [1, 2, 3, 17, 64, 500, 2000].iter().enumerate() {
            let entities = random_entities(n, 20.0, seed as u64);
            let tree = bvh.build(&entities);
            check_tree(&tree, &entities, RADIUS);
        }
    }

    Ok(())
}

#[test]
fn test_build_is_deterministic() -> anyhow::Result<()> {
    let entities = random_entities(300, 10.0, 42);

    let mut a = Bvh::new(config(SplitMethod::Middle))?;
    let mut b = Bvh::new(config(SplitMethod::Middle))?;
    let tree_a = a.build(&entities);
    let tree_b = b.build(&entities);

    let leaves_a: Vec<BvhNode> = tree_a.leaves().into_iter().copied().collect();
    let leaves_b: Vec<BvhNode> = tree_b.leaves().into_iter().copied().collect();
    assert_eq!(leaves_a.len(), leaves_b.len());
    for (la, lb) in leaves_a.iter().zip(leaves_b.iter()) {
        assert_eq!(la.bounds(), lb.bounds());
        assert_eq!(tree_a.leaf_prims(la), tree_b.leaf_prims(lb));
    }
    assert_eq!(tree_a.stats(), tree_b.stats());

    Ok(())
}

#[test]
fn test_query_matches_brute_force() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(1234);
    for &split_method in &[SplitMethod::Middle, SplitMethod::EqualCounts] {
        let entities = random_entities(750, 15.0, 99);
        let mut bvh = Bvh::new(config(split_method))?;
        let tree = bvh.build(&entities);

        let mut n_hits = 0;
        for _ in 0..500 {
            let ray = random_ray(&mut rng, 60.0);
            let expected = brute_force_closest(&entities, RADIUS, &ray);
            let actual = tree.query_closest_hit(&ray);

            match (expected, actual) {
                (None, None) => {},
                (Some((expected_id, expected_t)), Some(hit)) => {
                    n_hits += 1;
                    assert_abs_diff_eq!(hit.t, expected_t, epsilon = 1e-5);
                    if hit.prim_id != expected_id {
                        // only acceptable when both boxes are entered at the same t
                        let (t, _) = Aabb::around_sphere(entities[hit.prim_id].position, RADIUS)
                            .intersect_ray(&ray)
                            .unwrap();
                        assert_abs_diff_eq!(t, expected_t, epsilon = 1e-5);
                    }
                },
                (expected, actual) => panic!("brute force gave {:?}, bvh gave {:?}", expected, actual),
            }
        }
        assert!(n_hits > 0, "no ray hit anything, test scene is broken");
    }

    Ok(())
}

#[test]
fn test_query_empty_tree() -> anyhow::Result<()> {
    let mut bvh = Bvh::new(BvhConfig::default())?;
    let tree = bvh.build::<Entity>(&[]);
    assert!(tree.is_empty());
    assert!(tree.query_closest_hit(&Ray::new(point3f!(0, 0, 0), vec3f!(0, 1, 0))).is_none());

    Ok(())
}

#[test]
fn test_reset_then_rebuild() -> anyhow::Result<()> {
    let mut bvh = Bvh::new(config(SplitMethod::Middle))?;

    let big = random_entities(400, 25.0, 5);
    bvh.build(&big);

    bvh.reset();
    assert!(bvh.tree().is_empty());
    assert!(bvh.tree().prims().is_empty());

    let small = random_entities(37, 4.0, 6);
    let tree = bvh.build(&small);
    check_tree(&tree, &small, RADIUS);
    assert!(tree.prims().iter().all(|p| p.id < small.len()));

    // build resets implicitly
    let tree = bvh.build(&big);
    check_tree(&tree, &big, RADIUS);

    Ok(())
}

#[test]
fn test_coincident_cluster() -> anyhow::Result<()> {
    let mut entities = vec![Entity::fixed(point3f!(3, 3, 3)); 12];
    entities.extend(random_entities(20, 10.0, 8));
    let mut bvh = Bvh::new(config(SplitMethod::Middle))?;
    let tree = bvh.build(&entities);
    check_tree(&tree, &entities, RADIUS);
    assert!(tree.stats().max_leaf_size >= 12);

    Ok(())
}

#[test]
fn test_cube_corners() -> anyhow::Result<()> {
    let radius = 1.0;
    let mut entities = Vec::new();
    for &x in &[-1.0, 1.0] {
        for &y in &[-1.0, 1.0] {
            for &z in &[-1.0, 1.0] {
                entities.push(Entity::fixed(point3f!(x, y, z)));
            }
        }
    }

    let mut bvh = Bvh::new(BvhConfig::with_radius(radius))?;
    let tree = bvh.build(&entities);
    check_tree(&tree, &entities, radius);

    let root = tree.node(tree.root().ok_or_else(|| anyhow::anyhow!("cube tree has no root"))?);
    match *root {
        BvhNode::Interior { children, split_axis, .. } => {
            assert_eq!(split_axis, entity_bvh::Axis::X);
            for (child, side) in children.iter().zip(&[-1.0, 1.0]) {
                let prims = tree.node(*child);
                let ids: Vec<usize> = tree.leaves().iter()
                    .filter(|leaf| prims.bounds().contains(&leaf.bounds()))
                    .flat_map(|leaf| tree.leaf_prims(leaf).iter().map(|p| p.id))
                    .collect();
                assert_eq!(ids.len(), 4);
                assert!(ids.iter().all(|&id| entities[id].position.x == *side));
            }
        }
        BvhNode::Leaf { .. } => panic!("expected the root to split"),
    }

    let dir: Vec3f = vec3f!(1, 1, 1).normalize();
    let ray = Ray::new(point3f!(-5, -5, -5), dir);
    let hit = tree.query_closest_hit(&ray).ok_or_else(|| anyhow::anyhow!("ray missed the cube"))?;
    assert_eq!(entities[hit.prim_id].position, point3f!(-1, -1, -1));

    let (brute_id, brute_t) = brute_force_closest(&entities, radius, &ray)
        .ok_or_else(|| anyhow::anyhow!("brute force missed the cube"))?;
    assert_eq!(hit.prim_id, brute_id);
    assert_abs_diff_eq!(hit.t, brute_t, epsilon = 1e-5);
    assert_abs_diff_eq!(hit.t, 3.0 * (3.0 as Float).sqrt(), epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_tie_goes_to_leftmost_leaf() -> anyhow::Result<()> {
    // overlapping boxes split into separate leaves, both entered at t = 4
    let entities = vec![
        Entity::fixed(point3f!(0, 0.5, 0)),
        Entity::fixed(point3f!(0, 0, 0)),
    ];
    let mut bvh = Bvh::new(BvhConfig::with_radius(1.0))?;
    let tree = bvh.build(&entities);
    assert_eq!(tree.stats().leaf_count, 2);

    let ray = Ray::new(point3f!(-5, 0.25, 0), vec3f!(1, 0, 0));
    for (i, e) in entities.iter().enumerate() {
        let (t, _) = Aabb::around_sphere(e.position, 1.0).intersect_ray(&ray)
            .ok_or_else(|| anyhow::anyhow!("ray misses entity {}", i))?;
        assert_abs_diff_eq!(t, 4.0);
    }

    let hit = tree.query_closest_hit(&ray).ok_or_else(|| anyhow::anyhow!("ray missed"))?;
    assert_eq!(hit.prim_id, tree.prims()[0].id);
    assert_eq!(hit.prim_id, 1);
    assert_abs_diff_eq!(hit.t, 4.0);
    Ok(())
}

#[test]
fn test_tie_within_leaf_goes_to_first_prim() -> anyhow::Result<()> {
    let entities = vec![Entity::fixed(point3f!(2, 0, 0)); 3];
    let mut bvh = Bvh::new(BvhConfig::with_radius(1.0))?;
    let tree = bvh.build(&entities);
    assert_eq!(tree.stats().node_count, 1);

    let ray = Ray::new(point3f!(-5, 0, 0), vec3f!(1, 0, 0));
    let hit = tree.query_closest_hit(&ray).ok_or_else(|| anyhow::anyhow!("ray missed"))?;
    assert_eq!(hit.prim_id, tree.prims()[0].id);
    assert_eq!(hit.prim_id, 0);
    assert_abs_diff_eq!(hit.t, 6.0);
    Ok(())
}
