pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::{Result, SimError};

pub use simulation::states::{Body, NVec3};
pub use simulation::params::Parameters;
pub use simulation::engine::Engine;
pub use simulation::barnes_hut::{CoincidentPolicy, Octree, OctreeNode, Slot, MAX_DEPTH};
pub use simulation::forces::{pairwise_acc, BarnesHutGravity, DirectGravity, ForceModel};
pub use simulation::integrator::{Integrator, IntegratorKind, Leapfrog, PositionVerlet};
pub use simulation::energy::{kinetic_energy, potential_energy, total_energy, total_momentum, EnergyReport};
pub use simulation::history::{HistoryLog, MemoryHistory};
pub use simulation::output::{Frame, PositionSink, StreamSink, Trajectory};
pub use simulation::driver::{RunSummary, Simulation};
pub use simulation::scenario::Scenario;

pub use configuration::config::{BodyConfig, EngineConfig, GroupConfig, ParametersConfig, ScenarioConfig, SpaceEntry};

pub use benchmark::benchmark::{bench_forces, bench_steps};
