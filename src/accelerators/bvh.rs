//! Binary bounding volume hierarchy.

use crate::core::arena::Arena;
use crate::core::geometry::*;
use crate::core::interaction::Interaction;
use crate::core::pbrt::*;
use crate::core::primitive::Primitive;
use std::sync::Arc;

/// Number of SAH buckets per split candidate evaluation.
const N_BUCKETS: usize = 12;

/// Relative cost of a traversal step against one primitive intersection;
/// leaf cost is the primitive count, in the same units.
const TRAVERSAL_COST: Float = 0.125;

/// Traversal stacks are fixed size; SAH trees over sane scenes stay well
/// under this depth.
pub(crate) const STACK_SIZE: usize = 64;

#[derive(Copy, Clone, Default)]
struct PrimInfo {
    index: usize,
    bounds: Bounds3f,
    center: Vector3f,
}

/// Arena-allocated node of the build tree. Leaves have `n_prims > 0` and
/// reference a contiguous range of the ordered primitive list.
pub(crate) struct BvhBuildNode<'a> {
    pub bounds: Bounds3f,
    pub children: [Option<&'a BvhBuildNode<'a>>; 2],
    pub axis: usize,
    pub first_prim: usize,
    pub n_prims: usize,
}

impl<'a> BvhBuildNode<'a> {
    fn leaf(first_prim: usize, n_prims: usize, bounds: Bounds3f) -> Self {
        Self {
            bounds,
            children: [None, None],
            axis: 0,
            first_prim,
            n_prims,
        }
    }

    fn interior(axis: usize, c0: &'a BvhBuildNode<'a>, c1: &'a BvhBuildNode<'a>) -> Self {
        Self {
            bounds: c0.bounds.union(&c1.bounds),
            children: [Some(c0), Some(c1)],
            axis,
            first_prim: 0,
            n_prims: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.n_prims > 0
    }
}

pub(crate) struct BuildResult<'a> {
    pub root: &'a BvhBuildNode<'a>,
    pub node_count: usize,
    /// Primitives reordered so every leaf references a contiguous range.
    pub ordered: Vec<Arc<Primitive>>,
}

/// Builds the tree for `prims`, allocating nodes and primitive info from
/// `arena`. Single threaded; never fails, a degenerate range just becomes
/// a leaf.
pub(crate) fn build<'a>(arena: &'a Arena, prims: &[Arc<Primitive>]) -> BuildResult<'a> {
    let info = arena.alloc_slice::<PrimInfo>(prims.len());
    for (i, p) in prims.iter().enumerate() {
        let bounds = p.bounds();
        info[i] = PrimInfo {
            index: i,
            bounds,
            center: bounds.center(),
        };
    }

    let mut node_count = 0;
    let mut ordered = Vec::with_capacity(prims.len());
    let root = build_node(arena, prims, info, &mut node_count, &mut ordered);

    BuildResult {
        root,
        node_count,
        ordered,
    }
}

fn bucket_of(center_bounds: &Bounds3f, center: Vector3f, axis: usize) -> usize {
    let ix = (N_BUCKETS as Float * center_bounds.offset(center)[axis]).floor() as usize;
    ix.min(N_BUCKETS - 1)
}

/// Emits a leaf covering `info`, appending its primitives to the ordered
/// list so traversal can use contiguous indices.
fn make_leaf<'a>(
    arena: &'a Arena,
    prims: &[Arc<Primitive>],
    info: &[PrimInfo],
    bounds: Bounds3f,
    ordered: &mut Vec<Arc<Primitive>>,
) -> &'a BvhBuildNode<'a> {
    let first = ordered.len();
    for i in info.iter() {
        ordered.push(Arc::clone(&prims[i.index]));
    }
    arena.alloc(BvhBuildNode::leaf(first, info.len(), bounds))
}

fn build_node<'a>(
    arena: &'a Arena,
    prims: &[Arc<Primitive>],
    info: &mut [PrimInfo],
    node_count: &mut usize,
    ordered: &mut Vec<Arc<Primitive>>,
) -> &'a BvhBuildNode<'a> {
    *node_count += 1;

    let mut bounds = Bounds3f::default();
    for i in info.iter() {
        bounds = bounds.union(&i.bounds);
    }

    let n = info.len();
    if n <= 1 {
        return make_leaf(arena, prims, info, bounds, ordered);
    }

    let mut center_bounds = Bounds3f::default();
    for i in info.iter() {
        center_bounds = center_bounds.union_point(i.center);
    }
    let axis = center_bounds.max_axis();

    let mid = if n <= 4 {
        n / 2
    } else {
        // Bucketed surface area heuristic.
        #[derive(Copy, Clone, Default)]
        struct Bucket {
            count: usize,
            bounds: Bounds3f,
        }
        let mut buckets = [Bucket::default(); N_BUCKETS];

        for i in info.iter() {
            let b = &mut buckets[bucket_of(&center_bounds, i.center, axis)];
            b.count += 1;
            b.bounds = b.bounds.union(&i.bounds);
        }

        let mut costs = [0.0 as Float; N_BUCKETS - 1];
        for (i, cost) in costs.iter_mut().enumerate() {
            let mut b0 = Bounds3f::default();
            let mut b1 = Bounds3f::default();
            let mut c0 = 0;
            let mut c1 = 0;

            for b in buckets.iter().take(i + 1) {
                b0 = b0.union(&b.bounds);
                c0 += b.count;
            }
            for b in buckets.iter().skip(i + 1) {
                b1 = b1.union(&b.bounds);
                c1 += b.count;
            }
            // An empty side contributes nothing; its bounds are inverted
            // infinities and must not touch the arithmetic.
            let a0 = if c0 > 0 { c0 as Float * b0.area() } else { 0.0 };
            let a1 = if c1 > 0 { c1 as Float * b1.area() } else { 0.0 };
            *cost = TRAVERSAL_COST + (a0 + a1) / bounds.area();
        }

        let (min_bucket, &min_cost) = costs
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();

        let leaf_cost = n as Float;
        if min_cost >= leaf_cost {
            return make_leaf(arena, prims, info, bounds, ordered);
        }

        partition(info, |p| {
            bucket_of(&center_bounds, p.center, axis) <= min_bucket
        })
    };

    let (lo, hi) = info.split_at_mut(mid);
    let c0 = build_node(arena, prims, lo, node_count, ordered);
    let c1 = build_node(arena, prims, hi, node_count, ordered);
    arena.alloc(BvhBuildNode::interior(axis, c0, c1))
}

/// In-place partition; returns the index of the first element for which
/// the predicate is false.
fn partition<T, F: Fn(&T) -> bool>(v: &mut [T], pred: F) -> usize {
    let mut first = 0;
    for i in 0..v.len() {
        if pred(&v[i]) {
            v.swap(i, first);
            first += 1;
        }
    }
    first
}

/// Packed traversal node, 32 bytes.
#[derive(Copy, Clone, Default)]
struct LinearBvhNode {
    bounds: Bounds3f,
    /// Primitive offset for leaves, second child offset for interiors.
    offset: u32,
    /// Zero for interior nodes.
    n_prims: u16,
    /// Partition axis, for front-to-back child ordering.
    axis: u8,
    _pad: u8,
}

/// Slab test against the node bounds. Inclusive comparison on the final
/// test keeps flat boxes from being rejected.
fn box_hit(b: &Bounds3f, r: &Ray, t_max: Float) -> bool {
    let mut t_min = 0.0;
    let mut t_max = t_max;

    for i in 0..3 {
        let inv = 1.0 / r.d[i];
        let mut t0 = (b.lo[i] - r.o[i]) * inv;
        let mut t1 = (b.hi[i] - r.o[i]) * inv;
        if inv < 0.0 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = if t0 > t_min { t0 } else { t_min };
        t_max = if t1 < t_max { t1 } else { t_max };
        if t_max < t_min {
            return false;
        }
    }
    true
}

/// Binary BVH accelerator: SAH build, then the tree flattened into a
/// preorder array where each interior node's first child is the next
/// array entry and the second child offset is stored explicitly.
pub struct BvhAccel {
    primitives: Vec<Arc<Primitive>>,
    bounds: Bounds3f,
    nodes: Vec<LinearBvhNode>,
}

impl BvhAccel {
    pub fn new(primitives: Vec<Arc<Primitive>>) -> Self {
        if primitives.is_empty() {
            warn!("Building a BVH over an empty primitive list");
            return Self {
                primitives,
                bounds: Bounds3f::default(),
                nodes: Vec::new(),
            };
        }

        let arena = Arena::new();
        let result = build(&arena, &primitives);

        let mut nodes = Vec::with_capacity(result.node_count);
        flatten(&mut nodes, result.root);
        debug_assert_eq!(nodes.len(), result.node_count);

        info!(
            "Created BVH with {} nodes from {} primitives",
            nodes.len(),
            result.ordered.len()
        );

        Self {
            bounds: result.root.bounds,
            primitives: result.ordered,
            nodes,
        }
    }

    pub fn primitives(&self) -> &[Arc<Primitive>] {
        &self.primitives
    }

    pub fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    pub fn intersect(&self, r: &Ray) -> Option<Interaction> {
        if self.nodes.is_empty() {
            return None;
        }

        let dir_is_neg = [r.d.x < 0.0, r.d.y < 0.0, r.d.z < 0.0];
        let mut t_max = r.t_max;
        let mut hit = None;

        let mut index = 0usize;
        let mut stack = [0usize; STACK_SIZE];
        let mut sp = 0;

        loop {
            let node = &self.nodes[index];
            if box_hit(&node.bounds, r, t_max) {
                if node.n_prims > 0 {
                    let first = node.offset as usize;
                    for p in &self.primitives[first..first + node.n_prims as usize] {
                        if let Some(isect) = Primitive::intersect(p, &r.clamped(t_max)) {
                            t_max = isect.t;
                            hit = Some(isect);
                        }
                    }
                    if sp == 0 {
                        break;
                    }
                    sp -= 1;
                    index = stack[sp];
                } else {
                    // Visit the near child first, given the ray direction
                    // along the partition axis.
                    if dir_is_neg[node.axis as usize] {
                        stack[sp] = index + 1;
                        index = node.offset as usize;
                    } else {
                        stack[sp] = node.offset as usize;
                        index += 1;
                    }
                    sp += 1;
                    debug_assert!(sp < STACK_SIZE);
                }
            } else {
                if sp == 0 {
                    break;
                }
                sp -= 1;
                index = stack[sp];
            }
        }
        hit
    }

    /// Shadow query: returns on the first hit and skips the front-to-back
    /// child ordering.
    pub fn q_intersect(&self, r: &Ray) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let mut index = 0usize;
        let mut stack = [0usize; STACK_SIZE];
        let mut sp = 0;

        loop {
            let node = &self.nodes[index];
            if box_hit(&node.bounds, r, r.t_max) {
                if node.n_prims > 0 {
                    let first = node.offset as usize;
                    for p in &self.primitives[first..first + node.n_prims as usize] {
                        if p.q_intersect(r) {
                            return true;
                        }
                    }
                    if sp == 0 {
                        break;
                    }
                    sp -= 1;
                    index = stack[sp];
                } else {
                    stack[sp] = node.offset as usize;
                    sp += 1;
                    debug_assert!(sp < STACK_SIZE);
                    index += 1;
                }
            } else {
                if sp == 0 {
                    break;
                }
                sp -= 1;
                index = stack[sp];
            }
        }
        false
    }
}

fn flatten(nodes: &mut Vec<LinearBvhNode>, node: &BvhBuildNode) -> u32 {
    let my_offset = nodes.len() as u32;
    nodes.push(LinearBvhNode::default());

    if node.is_leaf() {
        nodes[my_offset as usize] = LinearBvhNode {
            bounds: node.bounds,
            offset: node.first_prim as u32,
            n_prims: node.n_prims as u16,
            axis: 0,
            _pad: 0,
        };
    } else {
        let c0 = node.children[0].expect("Interior BVH node missing first child");
        let c1 = node.children[1].expect("Interior BVH node missing second child");
        flatten(nodes, c0);
        let second = flatten(nodes, c1);
        nodes[my_offset as usize] = LinearBvhNode {
            bounds: node.bounds,
            offset: second,
            n_prims: 0,
            axis: node.axis as u8,
            _pad: 0,
        };
    }
    my_offset
}
