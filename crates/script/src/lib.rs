//! Round-tripping translation between a project and the restricted
//! Python program it executes as: deterministic emission of a program
//! from a cached project, and strict ingestion of such a program back
//! into a new project.

mod action_points;
mod emit;
mod parse;

pub use action_points::action_points_src;
pub use emit::program_src;
pub use parse::parse_script;

/// Failures of program emission and ingestion.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("logic has no START edge to emit from")]
    UnfinishedLogic,
    #[error("action {0} has no outputs")]
    NoOutputs(String),
    #[error("action {0} mixes conditional and unconditional outputs")]
    MixedOutputs(String),
    #[error("flow of action {action} has no output with index {index}")]
    MissingOutput { action: String, index: usize },
    #[error("variable {0} is used before the action producing it")]
    UnresolvedVariable(String),
    #[error("branches starting at action {0} do not converge")]
    DivergentBranches(String),
    #[error("object type {0} is not present in the scene's type metadata")]
    UnknownObjectType(String),
    #[error("project parameter {0} does not carry a JSON primitive")]
    InvalidParameterValue(String),
    #[error("invalid condition value: {0}")]
    InvalidConditionValue(String),

    /// The source deviates from the expected program shape.
    #[error("line {line}: {detail}")]
    PyShape { line: usize, detail: String },

    #[error(transparent)]
    Params(#[from] params::Error),
    #[error(transparent)]
    Validation(#[from] validation::Error),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error(transparent)]
    Model(#[from] models::Error),
}

impl Error {
    pub(crate) fn shape(line: usize, detail: impl Into<String>) -> Self {
        Error::PyShape {
            line,
            detail: detail.into(),
        }
    }
}
