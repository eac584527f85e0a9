//! Force / acceleration models for the n-body engine
//!
//! Two interchangeable strategies behind [`ForceModel`]: direct pairwise
//! summation and a Barnes–Hut octree approximation. Both use the same
//! softened Newtonian kernel with the gravitational constant normalized to 1.

use crate::error::{Result, SimError};
use crate::simulation::barnes_hut::{CoincidentPolicy, Octree};
use crate::simulation::engine::Engine;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, NVec3};

/// Source of gravitational accelerations for a whole body list
/// Implementations overwrite `out[i]` with the acceleration of `bodies[i]`
pub trait ForceModel {
    fn accelerations(&mut self, bodies: &[Body], out: &mut [NVec3]) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Acceleration at `xi` due to a point mass `mj` at `xj`:
///
///   a = mj * (xj - xi) / (|xj - xi|^2 + eps2)^1.5
///
/// Returns zero when the softened distance vanishes (coincident points, no softening).
pub fn pairwise_acc(xi: &NVec3, xj: &NVec3, mj: f64, eps2: f64) -> NVec3 {
    let r = xj - xi;
    let d2 = r.norm_squared() + eps2;
    if d2 == 0.0 {
        return NVec3::zeros();
    }
    let inv_r = d2.sqrt().recip();
    r * (mj * inv_r * inv_r * inv_r)
}

/// Direct O(N^2) gravity with Plummer softening
pub struct DirectGravity {
    pub eps2: f64, // softening squared
}

impl ForceModel for DirectGravity {
    fn accelerations(&mut self, bodies: &[Body], out: &mut [NVec3]) -> Result<()> {
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }

        let n = bodies.len();
        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let bi = &bodies[i];
            for j in (i + 1)..n {
                let bj = &bodies[j];

                // r points from i to j: i is pulled along +r, j along -r
                let r = bj.x - bi.x;
                let d2 = r.norm_squared() + self.eps2;
                if d2 == 0.0 {
                    continue;
                }

                // coef = 1 / |r_soft|^3
                let inv_r = d2.sqrt().recip();
                let coef = inv_r * inv_r * inv_r;

                // equal and opposite, each scaled by the other body's mass
                out[i] += r * (coef * bj.m);
                out[j] -= r * (coef * bi.m);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Gravity evaluated through a Barnes–Hut octree rebuilt on every call.
/// The octree arena is owned here so consecutive steps reuse its allocation.
pub struct BarnesHutGravity {
    pub eps2: f64,
    pub theta: f64, // opening tolerance
    tree: Octree,
}

impl BarnesHutGravity {
    pub fn new(eps2: f64, theta: f64, policy: CoincidentPolicy) -> Self {
        Self {
            eps2,
            theta,
            tree: Octree::new(policy),
        }
    }
}

impl ForceModel for BarnesHutGravity {
    fn accelerations(&mut self, bodies: &[Body], out: &mut [NVec3]) -> Result<()> {
        // the whole tree, aggregates included, is complete before any query
        self.tree.build(bodies)?;
        let out_len = out.len();
        for (i, a) in out.iter_mut().enumerate() {
            *a = self
                .tree
                .acceleration_on(i, bodies, self.eps2, self.theta)
                .ok_or_else(|| {
                    SimError::InvalidParameter(format!(
                        "acceleration buffer holds {} entries for {} bodies",
                        out_len, bodies.len()
                    ))
                })?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "barnes-hut"
    }
}

/// Pick the force model the engine settings ask for.
pub fn force_model_for(engine: &Engine, params: &Parameters) -> Box<dyn ForceModel + Send> {
    if engine.barnes_hut {
        Box::new(BarnesHutGravity::new(params.eps2(), engine.theta, engine.coincident))
    } else {
        Box::new(DirectGravity { eps2: params.eps2() })
    }
}
