//! Numerical parameters for the simulation
//!
//! `Parameters` holds the time range, step size, output cadence and the
//! softening length. Gravitational constant is normalized to 1.

use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub dt: f64, // step size
    pub t_start: f64, // time at the first step
    pub t_end: f64, // time end (inclusive)
    pub output_interval: f64, // time between position emissions
    pub eps: f64, // softening length
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: 0.01,
            t_start: 0.0,
            t_end: 10.0,
            output_interval: 0.1,
            eps: 0.0,
        }
    }
}

impl Parameters {
    /// Squared softening, the quantity the force kernels add to r^2
    pub fn eps2(&self) -> f64 {
        self.eps * self.eps
    }

    /// Number of steps the driver will take: one per time level in [t_start, t_end].
    pub fn step_count(&self) -> usize {
        ((self.t_end - self.t_start) / self.dt + 1e-9).floor() as usize + 1
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidParameter(format!("dt must be positive, got {}", self.dt)));
        }
        if !self.t_start.is_finite() || !self.t_end.is_finite() {
            return Err(SimError::InvalidParameter(format!(
                "time range must be finite, got [{}, {}]",
                self.t_start, self.t_end
            )));
        }
        if self.t_end < self.t_start {
            return Err(SimError::InvalidParameter(format!(
                "t_end ({}) is before t_start ({})",
                self.t_end, self.t_start
            )));
        }
        if !(self.output_interval >= 0.0) {
            return Err(SimError::InvalidParameter(format!(
                "output_interval must be non-negative, got {}",
                self.output_interval
            )));
        }
        if !(self.eps.is_finite() && self.eps >= 0.0) {
            return Err(SimError::InvalidParameter(format!("softening must be non-negative, got {}", self.eps)));
        }
        Ok(())
    }
}
