//! Fixed-step time integrators for the N-body system
//!
//! Provides the kick-drift-kick leapfrog used by default and a
//! drift-kick-drift position Verlet, both behind [`Integrator`] so the
//! driver can select one by name

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::forces::ForceModel;
use super::states::{Body, NVec3};
use crate::error::{Result, SimError};

/// Which integrator the engine uses
/// `integrator: "leapfrog"` or `integrator: "position_verlet"`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorKind {
    #[default]
    #[serde(rename = "leapfrog")] // kick-drift-kick, symplectic, one force evaluation per step
    Leapfrog,

    #[serde(rename = "position_verlet")] // drift-kick-drift, symplectic, one force evaluation per step
    PositionVerlet,
}

impl IntegratorKind {
    pub fn build(self) -> Box<dyn Integrator + Send> {
        match self {
            IntegratorKind::Leapfrog => Box::new(Leapfrog::default()),
            IntegratorKind::PositionVerlet => Box::new(PositionVerlet::default()),
        }
    }
}

impl FromStr for IntegratorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "leapfrog" => Ok(IntegratorKind::Leapfrog),
            "position_verlet" => Ok(IntegratorKind::PositionVerlet),
            other => Err(SimError::Config(format!(
                "unknown integrator '{other}' (expected leapfrog or position_verlet)"
            ))),
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegratorKind::Leapfrog => f.write_str("leapfrog"),
            IntegratorKind::PositionVerlet => f.write_str("position_verlet"),
        }
    }
}

/// One fixed-size step over the whole body list
pub trait Integrator {
    fn step(&mut self, bodies: &mut [Body], forces: &mut dyn ForceModel, dt: f64) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Evaluate `forces` on the current positions and store the result in each
/// body's acceleration. Every acceleration is computed before any is written.
pub fn refresh_accelerations(bodies: &mut [Body], forces: &mut dyn ForceModel, scratch: &mut Vec<NVec3>) -> Result<()> {
    scratch.clear();
    scratch.resize(bodies.len(), NVec3::zeros());
    forces.accelerations(bodies, scratch)?;
    for (b, a) in bodies.iter_mut().zip(scratch.iter()) {
        b.a = *a;
    }
    Ok(())
}

/// Kick-drift-kick leapfrog.
///
/// Expects `body.a` to hold the acceleration at the current positions on
/// entry (the driver initialises it once before the first step) and leaves
/// the acceleration at the new positions on exit.
#[derive(Debug, Default)]
pub struct Leapfrog {
    scratch: Vec<NVec3>,
}

impl Integrator for Leapfrog {
    fn step(&mut self, bodies: &mut [Body], forces: &mut dyn ForceModel, dt: f64) -> Result<()> {
        // Kick: v_n+1/2 = v_n + (dt/2) * a_n
        for b in bodies.iter_mut() {
            b.kick(dt);
        }

        // Drift: x_n+1 = x_n + dt * v_n+1/2
        for b in bodies.iter_mut() {
            b.drift(dt);
        }

        // a_n+1 from x_n+1
        refresh_accelerations(bodies, forces, &mut self.scratch)?;

        // Second kick: v_n+1 = v_n+1/2 + (dt/2) * a_n+1
        for b in bodies.iter_mut() {
            b.kick(dt);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "leapfrog"
    }
}

/// Drift-kick-drift leapfrog. Does not read the incoming accelerations;
/// on exit `body.a` holds the acceleration at the half-step positions.
#[derive(Debug, Default)]
pub struct PositionVerlet {
    scratch: Vec<NVec3>,
}

impl Integrator for PositionVerlet {
    fn step(&mut self, bodies: &mut [Body], forces: &mut dyn ForceModel, dt: f64) -> Result<()> {
        let half_dt = 0.5 * dt;

        // Drift: x_n+1/2 = x_n + (dt/2) * v_n
        for b in bodies.iter_mut() {
            b.drift(half_dt);
        }

        refresh_accelerations(bodies, forces, &mut self.scratch)?;

        // Kick: v_n+1 = v_n + dt * a_n+1/2
        for b in bodies.iter_mut() {
            b.v += b.a * dt;
        }

        // Second drift: x_n+1 = x_n+1/2 + (dt/2) * v_n+1
        for b in bodies.iter_mut() {
            b.drift(half_dt);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "position_verlet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::forces::DirectGravity;
    use approx::assert_relative_eq;

    /// Records the positions it was evaluated at and returns a constant field.
    struct Uniform {
        g: NVec3,
        seen: Vec<Vec<NVec3>>,
    }

    impl ForceModel for Uniform {
        fn accelerations(&mut self, bodies: &[Body], out: &mut [NVec3]) -> Result<()> {
            self.seen.push(bodies.iter().map(|b| b.x).collect());
            for a in out.iter_mut() {
                *a = self.g;
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "uniform"
        }
    }

    #[test]
    fn leapfrog_is_exact_in_uniform_field() {
        let g = NVec3::new(0.0, 0.0, -9.8);
        let mut forces = Uniform { g, seen: Vec::new() };
        let mut bodies = vec![Body::new(0, 1.0, NVec3::zeros(), NVec3::new(1.0, 0.0, 0.0))];
        bodies[0].a = g;

        let mut lf = Leapfrog::default();
        let dt = 0.1;
        for _ in 0..10 {
            lf.step(&mut bodies, &mut forces, dt).unwrap();
        }
        // x = v0 t + g t^2 / 2 at t = 1
        assert_relative_eq!(bodies[0].x, NVec3::new(1.0, 0.0, -4.9), epsilon = 1e-12);
        assert_relative_eq!(bodies[0].v, NVec3::new(1.0, 0.0, -9.8), epsilon = 1e-12);
        assert_eq!(forces.seen.len(), 10);
    }

    #[test]
    fn leapfrog_evaluates_forces_after_drift() {
        let mut forces = Uniform { g: NVec3::zeros(), seen: Vec::new() };
        let mut bodies = vec![Body::new(0, 1.0, NVec3::zeros(), NVec3::new(2.0, 0.0, 0.0))];
        Leapfrog::default().step(&mut bodies, &mut forces, 0.5).unwrap();
        assert_eq!(forces.seen[0][0], NVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn position_verlet_evaluates_at_half_step() {
        let mut forces = Uniform { g: NVec3::zeros(), seen: Vec::new() };
        let mut bodies = vec![Body::new(0, 1.0, NVec3::zeros(), NVec3::new(2.0, 0.0, 0.0))];
        PositionVerlet::default().step(&mut bodies, &mut forces, 0.5).unwrap();
        assert_eq!(forces.seen[0][0], NVec3::new(0.5, 0.0, 0.0));
        assert_eq!(bodies[0].x, NVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn leapfrog_is_time_reversible() {
        let mut bodies = vec![
            Body::new(0, 1.0, NVec3::new(-0.5, 0.0, 0.0), NVec3::new(0.0, -0.5, 0.1)),
            Body::new(1, 1.0, NVec3::new(0.5, 0.0, 0.0), NVec3::new(0.0, 0.5, 0.0)),
            Body::new(2, 0.1, NVec3::new(0.0, 2.0, 0.0), NVec3::new(0.3, 0.0, 0.0)),
        ];
        let start: Vec<NVec3> = bodies.iter().map(|b| b.x).collect();
        let mut forces = DirectGravity { eps2: 0.01 };
        let mut lf = Leapfrog::default();
        let mut scratch = Vec::new();
        refresh_accelerations(&mut bodies, &mut forces, &mut scratch).unwrap();

        for _ in 0..200 {
            lf.step(&mut bodies, &mut forces, 0.01).unwrap();
        }
        for b in bodies.iter_mut() {
            b.v = -b.v;
        }
        for _ in 0..200 {
            lf.step(&mut bodies, &mut forces, 0.01).unwrap();
        }
        for (b, x0) in bodies.iter().zip(start.iter()) {
            assert_relative_eq!(b.x, *x0, epsilon = 1e-9);
        }
    }

    #[test]
    fn parses_integrator_names() {
        assert_eq!("leapfrog".parse::<IntegratorKind>().unwrap(), IntegratorKind::Leapfrog);
        assert_eq!("position_verlet".parse::<IntegratorKind>().unwrap(), IntegratorKind::PositionVerlet);
        assert!(matches!("rk4".parse::<IntegratorKind>(), Err(SimError::Config(_))));
        assert_eq!(IntegratorKind::PositionVerlet.build().name(), "position_verlet");
    }
}
