//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the flattened body list at `t_start`
//!
//! Callers may adjust engine and parameters (e.g. from command-line flags)
//! before turning the bundle into a [`Simulation`].

use crate::configuration::config::ScenarioConfig;
use crate::error::Result;
use crate::simulation::driver::Simulation;
use crate::simulation::engine::Engine;
use crate::simulation::params::Parameters;
use crate::simulation::states::Body;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub bodies: Vec<Body>,
}

impl Scenario {
    pub fn build_scenario(cfg: &ScenarioConfig) -> Result<Self> {
        Ok(Self {
            engine: cfg.engine.to_engine(),
            parameters: cfg.parameters.to_parameters(),
            bodies: cfg.bodies()?,
        })
    }

    /// Validate and hand the bundle to the driver.
    pub fn into_simulation<'h>(self) -> Result<Simulation<'h>> {
        Simulation::new(self.bodies, self.parameters, self.engine)
    }
}
