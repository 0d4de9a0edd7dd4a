mod geometry;
mod id;
mod identifiers;
mod object_type;
mod project;
mod scene;

pub use geometry::{Joint, Orientation, Pose, Position};
pub use id::uid;
pub use identifiers::{is_valid_identifier, IDENTIFIER_RE};
pub use object_type::{ObjectAction, ObjectType, ParameterMeta, TypesMap};
pub use project::{
    Action, ActionParameter, Flow, FlowKind, FunctionReturns, LinkToOutput, LogicItem,
    NamedOrientation, ParameterKind, Project, ProjectActionPoint, ProjectFunction, ProjectLogicIf,
    ProjectParameter, ProjectRobotJoints, END, START,
};
pub use scene::{Parameter, Scene, SceneObject};

/// Errors arising while interpreting model fields which carry
/// structured string encodings (action types, links, flow kinds).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("action {0} has invalid type: '{1}'")]
    InvalidActionType(String, String),
    #[error("invalid link value: '{0}'")]
    InvalidLink(String),
    #[error("unknown flow kind: '{0}'")]
    UnknownFlowKind(String),
    #[error("flow '{0}' not found")]
    FlowNotFound(String),
    #[error("parameter '{0}' not found")]
    ParameterNotFound(String),
    #[error("flow outputs have to be unique")]
    DuplicateOutputs,
}
