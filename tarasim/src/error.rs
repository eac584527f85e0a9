//! Error types for tarasim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Simulation context (e.g. the history log) used before it was attached.
    #[error("missing context: {0}")]
    MissingContext(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two bodies could not be separated by octree subdivision.
    #[error(
        "degenerate geometry{}: bodies {first} and {second} coincide (octree depth {depth})",
        .step.map(|s| format!(" at step {s}")).unwrap_or_default()
    )]
    DegenerateGeometry {
        step: Option<usize>,
        first: u64,
        second: u64,
        depth: usize,
    },

    /// A body's position or velocity overflowed or became NaN.
    #[error(
        "non-finite state{}: body {id} has a non-finite position or velocity",
        .step.map(|s| format!(" at step {s}")).unwrap_or_default()
    )]
    NonFinite { step: Option<usize>, id: u64 },

    #[error("invalid scenario: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Attach the step index to a runtime error raised below the driver.
    pub fn at_step(self, step: usize) -> Self {
        match self {
            SimError::DegenerateGeometry { first, second, depth, .. } => {
                SimError::DegenerateGeometry { step: Some(step), first, second, depth }
            }
            SimError::NonFinite { id, .. } => SimError::NonFinite { step: Some(step), id },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
