//! High-level runtime engine settings
//!
//! Selects integrator, direct vs Barnes-Hut forces, the opening tolerance
//! and how the octree treats coincident bodies

use crate::error::{Result, SimError};
use crate::simulation::barnes_hut::CoincidentPolicy;
use crate::simulation::integrator::IntegratorKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub integrator: IntegratorKind, // leapfrog or position verlet
    pub barnes_hut: bool, // false = direct, true = barnes-hut
    pub theta: f64, // opening tolerance
    pub coincident: CoincidentPolicy, // merge or error on coincident bodies
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::Leapfrog,
            barnes_hut: true,
            theta: 0.5,
            coincident: CoincidentPolicy::Merge,
        }
    }
}

impl Engine {
    pub fn validate(&self) -> Result<()> {
        if !(self.theta.is_finite() && self.theta >= 0.0) {
            return Err(SimError::InvalidParameter(format!(
                "opening tolerance must be non-negative, got {}",
                self.theta
            )));
        }
        Ok(())
    }
}
