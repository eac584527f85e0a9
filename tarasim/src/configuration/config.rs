//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – integrator, Barnes–Hut switch, opening tolerance, coincident policy
//! - [`ParametersConfig`] – time range, step size, output cadence, softening
//! - [`SpaceEntry`]       – the contents of free space: bodies and (nested) groups
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   integrator: leapfrog    # or position_verlet
//!   barnes_hut: true        # false -> direct N^2 summation
//!   theta: 0.5              # opening tolerance
//!   coincident: merge       # or error
//!
//! parameters:
//!   dt: 0.01
//!   t_start: 0.0
//!   t_end: 10.0
//!   output_interval: 0.1
//!   eps: 0.0                # softening length
//!
//! space:
//!   - id: 0
//!     mass: 1.0
//!     pos: [0.0, 0.0, 0.0]
//!     vel: [0.0, 0.0, 0.0]
//!   - group: binary
//!     members:
//!       - id: 1
//!         mass: 0.5
//!         pos: [ 1.0, 0.0, 0.0]
//!         vel: [ 0.0, 0.7, 0.0]
//!         type: planet
//! ```
//!
//! Every section except `space` may be omitted; missing values take the
//! defaults of the command-line tool (dt 0.01, t_end 10, theta 0.5, ...).
//! Bodies are flattened in document order, each remembering the groups that
//! enclose it, nearest first.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::simulation::barnes_hut::CoincidentPolicy;
use crate::simulation::engine::Engine;
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, NVec3};

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub integrator: IntegratorKind, // time integrator used for advancing the system state
    pub barnes_hut: bool, // `true` - forces approximated with the octree, `false` - direct N^2 summation
    pub theta: Option<f64>, // opening tolerance; smaller is more accurate and slower
    pub coincident: CoincidentPolicy, // merge coincident bodies or fail
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::Leapfrog,
            barnes_hut: true,
            theta: None,
            coincident: CoincidentPolicy::Merge,
        }
    }
}

impl EngineConfig {
    pub fn to_engine(&self) -> Engine {
        Engine {
            integrator: self.integrator,
            barnes_hut: self.barnes_hut,
            theta: self.theta.unwrap_or(0.5),
            coincident: self.coincident,
        }
    }
}

/// Global numerical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ParametersConfig {
    pub dt: f64, // time step size
    pub t_start: f64, // time of the first step
    pub t_end: f64, // time end
    pub output_interval: f64, // time between position writes
    pub eps: f64, // softening - prevent singular forces at very small separations
}

impl Default for ParametersConfig {
    fn default() -> Self {
        let p = Parameters::default();
        Self {
            dt: p.dt,
            t_start: p.t_start,
            t_end: p.t_end,
            output_interval: p.output_interval,
            eps: p.eps,
        }
    }
}

impl ParametersConfig {
    pub fn to_parameters(&self) -> Parameters {
        Parameters {
            dt: self.dt,
            t_start: self.t_start,
            t_end: self.t_end,
            output_interval: self.output_interval,
            eps: self.eps,
        }
    }
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub id: u64, // identifier, unique within the scenario
    pub mass: f64, // mass of the body
    pub pos: Vec<f64>, // initial position, three components
    pub vel: Vec<f64>, // initial velocity, three components
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String, // type tag, informational
}

fn default_kind() -> String {
    String::from("star")
}

/// A named group of bodies and sub-groups
#[derive(Deserialize, Debug, Clone)]
pub struct GroupConfig {
    pub group: String,
    #[serde(default)]
    pub members: Vec<SpaceEntry>,
}

/// One item of `space` or of a group's `members`
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SpaceEntry {
    Body(BodyConfig),
    Group(GroupConfig),
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub parameters: ParametersConfig,
    pub space: Vec<SpaceEntry>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Flatten `space` into the ordered body list, depth first.
    pub fn bodies(&self) -> Result<Vec<Body>> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();
        flatten(&self.space, &mut ancestors, &mut out)?;
        Ok(out)
    }
}

fn flatten(entries: &[SpaceEntry], ancestors: &mut Vec<String>, out: &mut Vec<Body>) -> Result<()> {
    for entry in entries {
        match entry {
            SpaceEntry::Body(bc) => {
                let x = vec3(bc.id, "pos", &bc.pos)?;
                let v = vec3(bc.id, "vel", &bc.vel)?;
                // ancestors run outermost first; membership is nearest first
                let membership = ancestors.iter().rev().cloned().collect();
                out.push(
                    Body::new(bc.id, bc.mass, x, v)
                        .with_kind(bc.kind.clone())
                        .with_membership(membership),
                );
            }
            SpaceEntry::Group(gc) => {
                ancestors.push(gc.group.clone());
                flatten(&gc.members, ancestors, out)?;
                ancestors.pop();
            }
        }
    }
    Ok(())
}

fn vec3(id: u64, field: &str, values: &[f64]) -> Result<NVec3> {
    match values {
        [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
        _ => Err(SimError::Config(format!(
            "body {id}: `{field}` needs 3 components, got {}",
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NESTED: &str = r#"
engine:
  integrator: position_verlet
  barnes_hut: false
  theta: 0.3
  coincident: error
parameters:
  dt: 0.001
  t_end: 2.0
  eps: 0.05
space:
  - id: 7
    mass: 1.0
    pos: [0.0, 0.0, 0.0]
    vel: [0.0, 0.0, 0.0]
  - group: solar_system
    members:
      - id: 1
        mass: 1.0
        pos: [0.0, 0.0, 0.0]
        vel: [0.0, 0.0, 0.0]
      - group: earth_moon
        members:
          - id: 2
            mass: 0.001
            pos: [1.0, 0.0, 0.0]
            vel: [0.0, 1.0, 0.0]
            type: planet
          - id: 3
            mass: 0.00001
            pos: [1.01, 0.0, 0.0]
            vel: [0.0, 1.1, 0.0]
            type: moon
      - id: 4
        mass: 0.0003
        pos: [5.2, 0.0, 0.0]
        vel: [0.0, 0.44, 0.0]
        type: planet
"#;

    #[test]
    fn flattens_groups_in_document_order() {
        let cfg = ScenarioConfig::from_yaml_str(NESTED).unwrap();
        let bodies = cfg.bodies().unwrap();
        let ids: Vec<u64> = bodies.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![7, 1, 2, 3, 4]);

        assert!(bodies[0].membership.is_empty());
        assert_eq!(bodies[1].membership, vec!["solar_system"]);
        assert_eq!(bodies[3].membership, vec!["earth_moon", "solar_system"]);
        assert_eq!(bodies[4].membership, vec!["solar_system"]);
        assert_eq!(bodies[3].kind, "moon");
        assert_eq!(bodies[1].kind, "star");
        assert_eq!(bodies[2].v, NVec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn reads_engine_and_parameters() {
        let cfg = ScenarioConfig::from_yaml_str(NESTED).unwrap();
        let engine = cfg.engine.to_engine();
        assert_eq!(engine.integrator, IntegratorKind::PositionVerlet);
        assert!(!engine.barnes_hut);
        assert_eq!(engine.theta, 0.3);
        assert_eq!(engine.coincident, CoincidentPolicy::Error);

        let p = cfg.parameters.to_parameters();
        assert_eq!(p.dt, 0.001);
        assert_eq!(p.t_end, 2.0);
        assert_eq!(p.t_start, 0.0);
        assert_eq!(p.output_interval, 0.1);
        assert_eq!(p.eps, 0.05);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg = ScenarioConfig::from_yaml_str(
            "space:\n  - {id: 0, mass: 1.0, pos: [0, 0, 0], vel: [0, 0, 0]}\n",
        )
        .unwrap();
        let engine = cfg.engine.to_engine();
        assert_eq!(engine, Engine::default());
        assert_eq!(cfg.parameters.to_parameters(), Parameters::default());
    }

    #[test]
    fn rejects_short_vectors() {
        let cfg = ScenarioConfig::from_yaml_str(
            "space:\n  - {id: 5, mass: 1.0, pos: [0, 0], vel: [0, 0, 0]}\n",
        )
        .unwrap();
        match cfg.bodies() {
            Err(SimError::Config(msg)) => assert!(msg.contains("body 5")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NESTED.as_bytes()).unwrap();
        let cfg = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(cfg.bodies().unwrap().len(), 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            ScenarioConfig::load("/definitely/not/here.yaml"),
            Err(SimError::Io(_))
        ));
    }
}
