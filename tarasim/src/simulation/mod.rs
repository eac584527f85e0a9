pub mod states;
pub mod params;
pub mod engine;
pub mod forces;
pub mod integrator;
pub mod scenario;
pub mod barnes_hut;
pub mod energy;
pub mod history;
pub mod output;
pub mod driver;
