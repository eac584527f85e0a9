//! Position output emitted by the driver after selected steps.

use std::io::Write;

use crate::error::Result;
use crate::simulation::states::Body;

/// Receives the positions of every body, in input order, after a step.
pub trait PositionSink {
    fn emit(&mut self, step: usize, time: f64, bodies: &[Body]) -> Result<()>;
}

/// Writes one `x y z` line per body per emission.
pub struct StreamSink<W: Write> {
    out: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PositionSink for StreamSink<W> {
    fn emit(&mut self, _step: usize, _time: f64, bodies: &[Body]) -> Result<()> {
        for b in bodies {
            writeln!(self.out, "{} {} {}", b.x.x, b.x.y, b.x.z)?;
        }
        Ok(())
    }
}

/// One recorded emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: usize,
    pub time: f64,
    pub positions: Vec<[f64; 3]>,
}

/// Keeps every emission in memory.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub frames: Vec<Frame>,
}

impl PositionSink for Trajectory {
    fn emit(&mut self, step: usize, time: f64, bodies: &[Body]) -> Result<()> {
        self.frames.push(Frame {
            step,
            time,
            positions: bodies.iter().map(|b| [b.x.x, b.x.y, b.x.z]).collect(),
        });
        Ok(())
    }
}
