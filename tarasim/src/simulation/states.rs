//! Core state types for the N-body simulation.
//!
//! A `Body` is a point mass carrying its own position, velocity and the
//! acceleration from the most recent force evaluation. Bodies are created
//! once from the parsed scenario and mutated in place every step.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: u64, // identifier from the input
    pub m: f64, // mass
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub a: NVec3, // acceleration
    pub kind: String, // type tag ("star", "planet", ...)
    pub membership: Vec<String>, // enclosing groups, nearest first
}

impl Body {
    /// Body at rest in free space with zero acceleration.
    pub fn new(id: u64, m: f64, x: NVec3, v: NVec3) -> Self {
        Self {
            id,
            m,
            x,
            v,
            a: NVec3::zeros(),
            kind: String::from("star"),
            membership: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_membership(mut self, membership: Vec<String>) -> Self {
        self.membership = membership;
        self
    }

    /// Half kick: v += a * dt/2
    pub fn kick(&mut self, dt: f64) {
        self.v += self.a * (0.5 * dt);
    }

    /// Drift: x += v * dt
    pub fn drift(&mut self, dt: f64) {
        self.x += self.v * dt;
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.m * self.v.norm_squared()
    }

    pub fn momentum(&self) -> NVec3 {
        self.v * self.m
    }
}
