use crate::model::{FlowId, StageId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("flow graph contains a cycle through stage {stage}")]
    CycleDetected { stage: StageId },

    #[error("unknown stage id {0}")]
    UnknownStage(StageId),

    #[error("unknown flow id {0}")]
    UnknownFlow(FlowId),

    #[error("snapshot exceeds cap: {0}")]
    CapsExceeded(String),

    #[error("value out of bounds: {0}")]
    OutOfBounds(String),

    #[error("invalid snapshot structure: {0}")]
    InvalidStructure(String),

    #[error("snapshot parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Stable short code for binding layers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::CycleDetected { .. } => "cycle_detected",
            Error::UnknownStage(_) | Error::UnknownFlow(_) => "invalid_id",
            Error::CapsExceeded(_) => "caps_exceeded",
            Error::OutOfBounds(_) => "out_of_bounds",
            Error::InvalidStructure(_) => "invalid_structure",
            Error::Parse(_) => "parse",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
