//! Simulation driver
//!
//! `Simulation` owns the body list and the clock. Each step runs the
//! selected integrator (which rebuilds the octree or runs direct summation
//! when it needs accelerations), advances time by `dt`, and optionally emits
//! positions. Energy is measured before and after a run as a sanity check.

use std::collections::HashSet;

use log::{debug, info};

use crate::error::{Result, SimError};
use crate::simulation::energy::{center_of_mass, EnergyReport};
use crate::simulation::engine::Engine;
use crate::simulation::forces::{force_model_for, ForceModel};
use crate::simulation::history::HistoryLog;
use crate::simulation::integrator::{refresh_accelerations, Integrator};
use crate::simulation::output::PositionSink;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, NVec3};

/// What a completed run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub emitted: usize, // number of position emissions
    pub final_time: f64,
    pub start: EnergyReport,
    pub end: EnergyReport,
}

impl RunSummary {
    pub fn energy_drift(&self) -> f64 {
        self.end.relative_drift(&self.start)
    }
}

pub struct Simulation<'h> {
    pub bodies: Vec<Body>,
    pub time: f64,
    parameters: Parameters,
    engine: Engine,
    step_index: usize, // steps taken since construction
    forces: Box<dyn ForceModel + Send>,
    integrator: Box<dyn Integrator + Send>,
    history: Option<&'h mut dyn HistoryLog>,
    scratch: Vec<NVec3>,
    accelerations_ready: bool,
}

impl<'h> Simulation<'h> {
    /// Validate the inputs and set the clock to `t_start`.
    pub fn new(bodies: Vec<Body>, parameters: Parameters, engine: Engine) -> Result<Self> {
        parameters.validate()?;
        engine.validate()?;
        validate_bodies(&bodies)?;

        let forces = force_model_for(&engine, &parameters);
        let integrator = engine.integrator.build();
        Ok(Self {
            bodies,
            time: parameters.t_start,
            parameters,
            engine,
            step_index: 0,
            forces,
            integrator,
            history: None,
            scratch: Vec::new(),
            accelerations_ready: false,
        })
    }

    pub fn attach_history(&mut self, log: &'h mut dyn HistoryLog) {
        self.history = Some(log);
    }

    /// Give the log handle back; later appends fail until one is attached again.
    pub fn detach_history(&mut self) -> Option<&'h mut dyn HistoryLog> {
        self.history.take()
    }

    /// Append a status line to the attached history log.
    pub fn add_to_history(&mut self, entry: &str) -> Result<()> {
        match self.history.as_deref_mut() {
            Some(log) => {
                log.append(entry);
                Ok(())
            }
            None => Err(SimError::MissingContext(format!(
                "no history log attached (entry '{entry}')"
            ))),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn force_model(&self) -> &'static str {
        self.forces.name()
    }

    pub fn integrator(&self) -> &'static str {
        self.integrator.name()
    }

    /// Compute accelerations for the current positions so the first half
    /// kick has a valid value.
    pub fn init_accelerations(&mut self) -> Result<()> {
        refresh_accelerations(&mut self.bodies, self.forces.as_mut(), &mut self.scratch)
            .map_err(|e| e.at_step(self.step_index))?;
        self.accelerations_ready = true;
        Ok(())
    }

    /// Advance the whole system by one `dt`.
    pub fn step(&mut self) -> Result<()> {
        if !self.accelerations_ready {
            self.init_accelerations()?;
        }
        let dt = self.parameters.dt;
        self.integrator
            .step(&mut self.bodies, self.forces.as_mut(), dt)
            .map_err(|e| e.at_step(self.step_index))?;
        if let Some(b) = self
            .bodies
            .iter()
            .find(|b| !b.x.iter().chain(b.v.iter()).all(|c| c.is_finite()))
        {
            return Err(SimError::NonFinite { step: Some(self.step_index), id: b.id });
        }
        self.time += dt;
        self.step_index += 1;
        debug!("step {} done, t = {}", self.step_index, self.time);
        Ok(())
    }

    /// Step while the step's start time is at most `t_end`.
    ///
    /// Positions go to `sink` whenever the clock reaches the next output
    /// time (`output_interval` apart; 0 means every step). Any error aborts
    /// the run.
    pub fn run(&mut self, mut sink: Option<&mut dyn PositionSink>) -> Result<RunSummary> {
        let dt = self.parameters.dt;
        let t_end = self.parameters.t_end;
        let interval = self.parameters.output_interval;
        let tol = 1e-9 * dt;

        let start = self.report();
        info!(
            "integrating {} bodies from t = {} to t = {} over {} steps (dt = {}, {} forces, {} integrator)",
            self.bodies.len(),
            self.time,
            t_end,
            self.parameters.step_count(),
            dt,
            self.forces.name(),
            self.integrator.name()
        );
        info!("START energy: {}", start.total());
        debug!("center of mass at start: {:?}", center_of_mass(&self.bodies));
        if let Some(log) = self.history.as_deref_mut() {
            log.append(&format!(
                "run started at t = {} with {} bodies ({} forces, {} integrator)",
                self.time,
                self.bodies.len(),
                self.forces.name(),
                self.integrator.name()
            ));
        }

        self.init_accelerations()?;

        let t0 = self.time;
        let mut next_output = t0 + interval;
        let mut steps = 0;
        let mut emitted = 0;

        while t0 + steps as f64 * dt <= t_end + tol {
            self.step()?;
            steps += 1;
            // recompute from the start to keep rounding from accumulating
            self.time = t0 + steps as f64 * dt;

            if let Some(sink) = sink.as_deref_mut() {
                if self.time + tol >= next_output {
                    sink.emit(self.step_index, self.time, &self.bodies)
                        .map_err(|e| e.at_step(self.step_index))?;
                    emitted += 1;
                    if interval > 0.0 {
                        while next_output <= self.time + tol {
                            next_output += interval;
                        }
                    }
                }
            }
        }

        let end = self.report();
        let summary = RunSummary {
            steps,
            emitted,
            final_time: self.time,
            start,
            end,
        };
        info!("END energy: {} (relative drift {:e})", end.total(), summary.energy_drift());
        Ok(summary)
    }

    pub fn report(&self) -> EnergyReport {
        EnergyReport::measure(&self.bodies, self.parameters.eps2())
    }

    pub fn energy(&self) -> f64 {
        self.report().total()
    }

    /// Current positions, in input order.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.bodies.iter().map(|b| [b.x.x, b.x.y, b.x.z]).collect()
    }
}

fn validate_bodies(bodies: &[Body]) -> Result<()> {
    let mut ids = HashSet::with_capacity(bodies.len());
    for b in bodies {
        if !(b.m.is_finite() && b.m > 0.0) {
            return Err(SimError::InvalidParameter(format!(
                "body {} has non-positive mass {}",
                b.id, b.m
            )));
        }
        if !b.x.iter().chain(b.v.iter()).all(|c| c.is_finite()) {
            return Err(SimError::InvalidParameter(format!(
                "body {} has a non-finite position or velocity",
                b.id
            )));
        }
        if !ids.insert(b.id) {
            return Err(SimError::InvalidParameter(format!("duplicate body id {}", b.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::history::MemoryHistory;
    use crate::simulation::output::Trajectory;

    fn pair() -> Vec<Body> {
        vec![
            Body::new(1, 1.0, NVec3::new(-0.5, 0.0, 0.0), NVec3::new(0.0, -0.5, 0.0)),
            Body::new(2, 1.0, NVec3::new(0.5, 0.0, 0.0), NVec3::new(0.0, 0.5, 0.0)),
        ]
    }

    fn params(dt: f64, t_end: f64, output_interval: f64) -> Parameters {
        Parameters {
            dt,
            t_start: 0.0,
            t_end,
            output_interval,
            eps: 0.0,
        }
    }

    #[test]
    fn rejects_non_positive_mass() {
        let mut bodies = pair();
        bodies[1].m = 0.0;
        let err = Simulation::new(bodies, Parameters::default(), Engine::default()).err();
        match err {
            Some(SimError::InvalidParameter(msg)) => assert!(msg.contains("body 2")),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut bodies = pair();
        bodies[1].id = 1;
        assert!(matches!(
            Simulation::new(bodies, Parameters::default(), Engine::default()),
            Err(SimError::InvalidParameter(_))
        ));
    }

    #[test]
    fn run_covers_inclusive_time_range() {
        let mut sim = Simulation::new(pair(), params(0.1, 1.0, 0.0), Engine::default()).unwrap();
        let summary = sim.run(None).unwrap();
        assert_eq!(summary.steps, 11);
        assert_eq!(sim.step_index(), 11);
        assert!((summary.final_time - 1.1).abs() < 1e-12);
    }

    #[test]
    fn zero_interval_emits_every_step() {
        let mut sim = Simulation::new(pair(), params(0.1, 0.5, 0.0), Engine::default()).unwrap();
        let mut traj = Trajectory::default();
        let summary = sim.run(Some(&mut traj)).unwrap();
        assert_eq!(summary.emitted, summary.steps);
        assert_eq!(traj.frames.len(), 6);
        assert_eq!(traj.frames[0].positions.len(), 2);
        assert_eq!(traj.frames.last().unwrap().positions, sim.positions());
    }

    #[test]
    fn output_interval_thins_emissions() {
        let mut sim = Simulation::new(pair(), params(0.01, 0.99, 0.1), Engine::default()).unwrap();
        let mut traj = Trajectory::default();
        let summary = sim.run(Some(&mut traj)).unwrap();
        assert_eq!(summary.steps, 100);
        assert_eq!(traj.frames.len(), 10);
        for (k, frame) in traj.frames.iter().enumerate() {
            assert!((frame.time - 0.1 * (k + 1) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn history_requires_attached_log() {
        let mut sim = Simulation::new(pair(), Parameters::default(), Engine::default()).unwrap();
        assert!(matches!(
            sim.add_to_history("simulation accessed"),
            Err(SimError::MissingContext(_))
        ));
    }

    #[test]
    fn history_appends_to_caller_log() {
        let mut log = MemoryHistory::new();
        {
            let mut sim = Simulation::new(pair(), params(0.1, 0.2, 0.0), Engine::default()).unwrap();
            sim.attach_history(&mut log);
            sim.add_to_history("simulation accessed").unwrap();
            sim.run(None).unwrap();
            assert!(sim.detach_history().is_some());
            assert!(sim.add_to_history("late").is_err());
        }
        assert_eq!(log.entries()[0], "simulation accessed");
        assert!(log.entries()[1].starts_with("run started"));
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn degenerate_error_carries_step_and_ids() {
        let bodies = vec![
            Body::new(4, 1.0, NVec3::new(0.2, 0.2, 0.2), NVec3::zeros()),
            Body::new(9, 1.0, NVec3::new(0.2, 0.2, 0.2), NVec3::zeros()),
        ];
        let engine = Engine {
            coincident: crate::simulation::barnes_hut::CoincidentPolicy::Error,
            ..Engine::default()
        };
        let mut sim = Simulation::new(bodies, params(0.1, 1.0, 0.0), engine).unwrap();
        match sim.run(None) {
            Err(SimError::DegenerateGeometry { step, first, second, .. }) => {
                assert_eq!(step, Some(0));
                assert_eq!((first, second), (4, 9));
            }
            other => panic!("expected DegenerateGeometry, got {:?}", other),
        }
    }

    #[test]
    fn overflowing_state_stops_run_in_both_force_modes() {
        for barnes_hut in [true, false] {
            let bodies = vec![
                Body::new(1, 1.0, NVec3::zeros(), NVec3::new(1e308, 0.0, 0.0)),
                Body::new(2, 1.0, NVec3::new(1.0, 0.0, 0.0), NVec3::zeros()),
            ];
            let engine = Engine { barnes_hut, ..Engine::default() };
            let mut sim = Simulation::new(bodies, params(10.0, 30.0, 0.0), engine).unwrap();
            match sim.run(None) {
                Err(SimError::NonFinite { step, id }) => {
                    assert_eq!(step, Some(0), "barnes_hut = {barnes_hut}");
                    assert_eq!(id, 1, "barnes_hut = {barnes_hut}");
                }
                other => panic!("barnes_hut = {barnes_hut}: expected NonFinite, got {:?}", other),
            }
            assert_eq!(sim.step_index(), 0);
        }
    }

    #[test]
    fn reports_selected_models() {
        let engine = Engine { barnes_hut: false, ..Engine::default() };
        let sim = Simulation::new(pair(), params(0.1, 1.0, 0.0), engine).unwrap();
        assert_eq!(sim.force_model(), "direct");
        assert_eq!(sim.integrator(), "leapfrog");
        assert_eq!(sim.parameters().step_count(), 11);
    }

    #[test]
    fn non_finite_error_names_step() {
        let err = SimError::NonFinite { step: None, id: 7 }.at_step(3);
        assert!(err.to_string().contains("at step 3"));
        assert!(err.to_string().contains("body 7"));
    }
}
