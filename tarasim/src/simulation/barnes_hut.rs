//! # Barnes–Hut Octree
//!
//! A **3D Barnes–Hut octree** used to approximate the gravitational
//! acceleration on every body in better than `O(N²)` time.
//!
//! ## Layout
//!
//! The tree lives in an index-addressed arena (`Octree::nodes`). Each node
//! covers a cube given by its `center` and `half_size`, split by the center
//! into 8 equal octants. Every octant is a [`Slot`]:
//!
//! - `Empty`: nothing in that octant
//! - `Leaf(i)`: exactly one body, index `i` into the body slice
//! - `Merged(g)`: several bodies that could not be separated (see below)
//! - `Internal(n)`: an owned child node, index `n` into the arena
//!
//! The octant of a point is a 3-bit code, one bit per axis: bit 2 for x,
//! bit 1 for y, bit 0 for z, set when the coordinate is strictly greater
//! than the node center.
//!
//! ## Lifecycle
//!
//! The tree is rebuilt from scratch for every force evaluation:
//! [`Octree::build`] resets the arena (keeping its allocation), inserts all
//! bodies, then runs the post-order aggregate pass so every node carries its
//! total mass and center of mass. Only after that pass does the tree answer
//! [`Octree::acceleration_on`] queries, which take `&self` and can therefore
//! run for many bodies at once.
//!
//! ## Coincident bodies
//!
//! Two bodies at the same position always route to the same octant, so
//! naive subdivision never terminates. Insertion detects identical positions
//! and also stops subdividing at [`MAX_DEPTH`]; what happens then is
//! decided by [`CoincidentPolicy`]: the bodies are merged into one composite
//! leaf, or a `DegenerateGeometry` error is raised.

// =======================================================================================================
// References:
// octant code and child-center offsets follow Piet Hut & Jun Makino's Ruby treecode
// from the Maya distribution http://www.artcompsci.org
// another online reference https://arborjs.org/docs/barnes-hut
// =======================================================================================================

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::simulation::forces::pairwise_acc;
use crate::simulation::states::{Body, NVec3};

/// Deepest level a node may be created at. Bodies still sharing an octant
/// at this depth are treated as coincident.
pub const MAX_DEPTH: usize = 64;

/// What insertion does with bodies it cannot separate.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoincidentPolicy {
    /// Store them together as one composite mass.
    #[default]
    #[serde(rename = "merge")]
    Merge,
    /// Abort the build with `SimError::DegenerateGeometry`.
    #[serde(rename = "error")]
    Error,
}

/// Contents of one octant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Leaf(usize),     // index into the body slice
    Merged(usize),   // index into Octree::groups
    Internal(usize), // index into Octree::nodes
}

/// A single cubic cell of the octree.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub center: NVec3,
    pub half_size: f64,
    pub slots: [Slot; 8],
    pub mass: f64, // aggregate mass of the subtree
    pub com: NVec3, // center of mass of the subtree
}

impl OctreeNode {
    fn new(center: NVec3, half_size: f64) -> Self {
        Self {
            center,
            half_size,
            slots: [Slot::Empty; 8],
            mass: 0.0,
            com: NVec3::zeros(),
        }
    }

    /// Whether `p` lies inside (or on the boundary of) this node's cube.
    pub fn contains(&self, p: &NVec3) -> bool {
        (p - self.center).amax() <= self.half_size
    }
}

/// Arena-backed Barnes–Hut octree, reusable across steps.
#[derive(Debug, Clone, Default)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    groups: Vec<Vec<usize>>, // composite leaves, reused between builds
    groups_used: usize,
    policy: CoincidentPolicy,
}

impl Octree {
    pub fn new(policy: CoincidentPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Rebuild the tree over the current body positions.
    ///
    /// 1. Resets the arena, keeping allocated capacity.
    /// 2. Creates a root centered at the origin whose half-size is the
    ///    smallest power of two bounding every absolute coordinate.
    /// 3. Inserts every body.
    /// 4. Computes mass and center of mass of every node, bottom-up.
    ///
    /// Fails with `NonFinite` on non-finite positions and with
    /// `DegenerateGeometry` for coincident bodies under `CoincidentPolicy::Error`.
    pub fn build(&mut self, bodies: &[Body]) -> Result<()> {
        self.nodes.clear();
        self.groups_used = 0;

        let mut extent: f64 = 0.0;
        for b in bodies {
            if !b.x.iter().all(|c| c.is_finite()) {
                return Err(SimError::NonFinite { step: None, id: b.id });
            }
            extent = extent.max(b.x.amax());
        }
        let mut root_size = 1.0;
        while extent > root_size {
            root_size *= 2.0;
        }

        self.nodes.push(OctreeNode::new(NVec3::zeros(), root_size));

        for i in 0..bodies.len() {
            self.insert(0, i, bodies, 0)?;
        }

        self.compute_aggregates(0, bodies);

        debug!(
            "octree built: {} bodies, {} nodes, depth {}, root half-size {}",
            bodies.len(),
            self.nodes.len(),
            self.depth(),
            root_size
        );
        Ok(())
    }

    /// Barnes–Hut acceleration on body `target` (index into `bodies`).
    ///
    /// Starting at the root, each visited node is either accepted as a single
    /// point mass at its center of mass when `2 * half_size / d < theta`, or
    /// opened and its slots visited in turn. Leaves contribute the exact
    /// pairwise term, and the target never contributes to itself. A node whose
    /// cube contains the target is always opened.
    ///
    /// `bodies` must be the slice the tree was last built from. Returns `None`
    /// when `target` is out of range.
    pub fn acceleration_on(&self, target: usize, bodies: &[Body], eps2: f64, theta: f64) -> Option<NVec3> {
        let pos = bodies.get(target)?.x;
        let mut acc = NVec3::zeros();
        if !self.nodes.is_empty() {
            self.visit_node(0, target, &pos, bodies, eps2, theta, &mut acc);
        }
        Some(acc)
    }

    pub fn root(&self) -> Option<&OctreeNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of node levels below the root (0 for a root-only tree).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((n, d)) = stack.pop() {
            deepest = deepest.max(d);
            for slot in &self.nodes[n].slots {
                if let Slot::Internal(c) = slot {
                    stack.push((*c, d + 1));
                }
            }
        }
        deepest
    }

    /// Every body index stored in the subtree rooted at `node`, depth first.
    pub fn subtree_bodies(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_bodies(node, &mut out);
        out
    }

    /// Every body index stored in the tree.
    pub fn bodies(&self) -> Vec<usize> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        self.subtree_bodies(0)
    }

    /// Octant indices leading from the root to the slot holding `body`.
    pub fn path_to(&self, body: usize) -> Option<Vec<usize>> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut path = Vec::new();
        if self.find_path(0, body, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    // helpers ==============================================================================

    /// Insert body `body` into the subtree of `node` (at level `depth`).
    ///
    /// - Empty octant: the body becomes a leaf there.
    /// - Octant holding a child node: descend into it.
    /// - Octant holding a leaf or composite: if the occupant sits at the same
    ///   position, or a new child would exceed [`MAX_DEPTH`], apply the
    ///   coincident policy. Otherwise replace the occupant with a new child
    ///   node of half the size, move the occupant into it, and descend.
    fn insert(&mut self, node: usize, body: usize, bodies: &[Body], depth: usize) -> Result<()> {
        let pos = bodies[body].x;
        let oct = octant(&pos, &self.nodes[node].center);

        match self.nodes[node].slots[oct] {
            Slot::Empty => {
                self.nodes[node].slots[oct] = Slot::Leaf(body);
                Ok(())
            }
            Slot::Internal(child) => self.insert(child, body, bodies, depth + 1),
            Slot::Leaf(prev) => self.settle_beside(node, oct, prev, None, body, bodies, depth),
            Slot::Merged(g) => {
                let anchor = self.groups[g][0];
                self.settle_beside(node, oct, anchor, Some(g), body, bodies, depth)
            }
        }
    }

    /// `body` lands in an octant already holding a leaf (`group == None`) or
    /// the composite `group`, routed by its `anchor` body. Split the octant
    /// into a child node, or merge when the two cannot be separated.
    fn settle_beside(
        &mut self,
        node: usize,
        oct: usize,
        anchor: usize,
        group: Option<usize>,
        body: usize,
        bodies: &[Body],
        depth: usize,
    ) -> Result<()> {
        if bodies[anchor].x == bodies[body].x || depth + 1 >= MAX_DEPTH {
            return self.merge_coincident(node, oct, anchor, group, body, bodies, depth);
        }

        let occupant = group.map_or(Slot::Leaf(anchor), Slot::Merged);
        let half = self.nodes[node].half_size * 0.5;
        let center = self.nodes[node].center + octant_offset(oct) * half;
        let child = self.nodes.len();
        self.nodes.push(OctreeNode::new(center, half));
        self.nodes[node].slots[oct] = Slot::Internal(child);

        // the fresh child is empty, so the occupant drops straight in
        let anchor_oct = octant(&bodies[anchor].x, &center);
        self.nodes[child].slots[anchor_oct] = occupant;

        self.insert(child, body, bodies, depth + 1)
    }

    fn merge_coincident(
        &mut self,
        node: usize,
        oct: usize,
        anchor: usize,
        group: Option<usize>,
        body: usize,
        bodies: &[Body],
        depth: usize,
    ) -> Result<()> {
        if self.policy == CoincidentPolicy::Error {
            return Err(SimError::DegenerateGeometry {
                step: None,
                first: bodies[anchor].id,
                second: bodies[body].id,
                depth,
            });
        }

        warn!(
            "bodies {} and {} coincide at {:?}; merging into a composite leaf",
            bodies[anchor].id, bodies[body].id, bodies[body].x
        );
        let group = match group {
            Some(g) => g,
            None => {
                let g = self.new_group();
                self.groups[g].push(anchor);
                g
            }
        };
        self.groups[group].push(body);
        self.nodes[node].slots[oct] = Slot::Merged(group);
        Ok(())
    }

    /// Hand out a cleared group, reusing one from a previous build when possible.
    fn new_group(&mut self) -> usize {
        let g = self.groups_used;
        if g == self.groups.len() {
            self.groups.push(Vec::new());
        } else {
            self.groups[g].clear();
        }
        self.groups_used += 1;
        g
    }

    /// Post-order pass: children first, then this node's mass and COM from
    /// the contributions of its slots.
    fn compute_aggregates(&mut self, node: usize, bodies: &[Body]) {
        let slots = self.nodes[node].slots; // [Slot; 8] is Copy
        let mut mass = 0.0;
        let mut weighted = NVec3::zeros();

        for slot in slots {
            match slot {
                Slot::Empty => {}
                Slot::Leaf(i) => {
                    mass += bodies[i].m;
                    weighted += bodies[i].x * bodies[i].m;
                }
                Slot::Merged(g) => {
                    for &i in &self.groups[g] {
                        mass += bodies[i].m;
                        weighted += bodies[i].x * bodies[i].m;
                    }
                }
                Slot::Internal(child) => {
                    self.compute_aggregates(child, bodies);
                    let cn = &self.nodes[child];
                    mass += cn.mass;
                    weighted += cn.com * cn.mass;
                }
            }
        }

        let n = &mut self.nodes[node];
        n.mass = mass;
        n.com = if mass > 0.0 { weighted / mass } else { n.center };
    }

    /// Opening test for one node: accept it whole or visit its slots.
    fn visit_node(&self, node: usize, target: usize, pos: &NVec3, bodies: &[Body], eps2: f64, theta: f64, acc: &mut NVec3) {
        let n = &self.nodes[node];
        if n.mass == 0.0 {
            return;
        }

        let d = (n.com - pos).norm();
        if !n.contains(pos) && d > 0.0 && 2.0 * n.half_size / d < theta {
            *acc += pairwise_acc(pos, &n.com, n.mass, eps2);
            return;
        }

        for slot in &n.slots {
            match *slot {
                Slot::Empty => {}
                Slot::Leaf(j) => {
                    if j != target {
                        *acc += pairwise_acc(pos, &bodies[j].x, bodies[j].m, eps2);
                    }
                }
                Slot::Merged(g) => {
                    for &j in &self.groups[g] {
                        if j != target {
                            *acc += pairwise_acc(pos, &bodies[j].x, bodies[j].m, eps2);
                        }
                    }
                }
                Slot::Internal(child) => self.visit_node(child, target, pos, bodies, eps2, theta, acc),
            }
        }
    }

    fn collect_bodies(&self, node: usize, out: &mut Vec<usize>) {
        for slot in &self.nodes[node].slots {
            match *slot {
                Slot::Empty => {}
                Slot::Leaf(i) => out.push(i),
                Slot::Merged(g) => out.extend_from_slice(&self.groups[g]),
                Slot::Internal(child) => self.collect_bodies(child, out),
            }
        }
    }

    fn find_path(&self, node: usize, body: usize, path: &mut Vec<usize>) -> bool {
        for (oct, slot) in self.nodes[node].slots.iter().enumerate() {
            path.push(oct);
            let found = match *slot {
                Slot::Empty => false,
                Slot::Leaf(i) => i == body,
                Slot::Merged(g) => self.groups[g].contains(&body),
                Slot::Internal(child) => self.find_path(child, body, path),
            };
            if found {
                return true;
            }
            path.pop();
        }
        false
    }
}

// helpers ===========================================================================

/// Octant code of `p` relative to `center`.
///
/// - Bit 2 (value 4): x > center.x
/// - Bit 1 (value 2): y > center.y
/// - Bit 0 (value 1): z > center.z
pub fn octant(p: &NVec3, center: &NVec3) -> usize {
    let mut idx = 0;
    for axis in 0..3 {
        idx <<= 1;
        if p[axis] > center[axis] {
            idx |= 1;
        }
    }
    idx
}

/// Unit offset (each component ±1) from a node center toward the center of
/// child octant `oct`, using the same bit layout as [`octant`].
pub fn octant_offset(oct: usize) -> NVec3 {
    let sign = |bit: usize| if oct & bit != 0 { 1.0 } else { -1.0 };
    NVec3::new(sign(4), sign(2), sign(1))
}
