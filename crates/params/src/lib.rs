//! Parameter-type plugins: one value codec per action-parameter type,
//! providing semantic value extraction, usage queries and rendering of
//! the parameter as an expression in a generated program.

mod builtin;
mod registry;
mod resolver;

pub use builtin::enums::EnumExtra;
pub use registry::{registry, Registry};
pub use resolver::{find_object_action, resolve, Resolved};

use cache::{CachedProject, CachedScene};
use models::{Pose, Position, ProjectRobotJoints, TypesMap};

/// The runtime type a plugin decodes to. The registry can be queried by
/// kind as well as by type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Integer,
    Double,
    String,
    IntegerEnum,
    StringEnum,
    Pose,
    Position,
    Joints,
    RelativePose,
    Image,
    List(Box<ValueKind>),
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Pose(Pose),
    Position(Position),
    Joints(ProjectRobotJoints),
    RelativePose(Pose),
    List(Vec<ParamValue>),
}

/// The contract of one parameter type. Plugins are pure and stateless;
/// registration is process-wide and happens before first use.
pub trait ParameterPlugin: Send + Sync {
    /// Parameter type name as used in project JSON, e.g. `"integer"`.
    fn type_name(&self) -> &'static str;

    fn kind(&self) -> ValueKind;

    /// Whether values of this type can guard a branching condition.
    fn countable(&self) -> bool {
        false
    }

    /// Extracts the semantic value of the parameter: literal plugins
    /// decode the JSON payload, reference plugins follow the stored id
    /// into the project cache. Enum plugins consult the object-type
    /// metadata for the set of allowed members.
    fn parameter_value(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error>;

    fn uses_orientation(
        &self,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
        orientation_id: &str,
    ) -> Result<bool, Error> {
        let _ = (project, action_id, parameter_name, orientation_id);
        Ok(false)
    }

    fn uses_robot_joints(
        &self,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
        joints_id: &str,
    ) -> Result<bool, Error> {
        let _ = (project, action_id, parameter_name, joints_id);
        Ok(false)
    }

    /// Renders the parameter as an expression of the generated program:
    /// a literal for primitives, an `aps.<ap>...` attribute path for
    /// action-point references, `<EnumClass>.<MEMBER>` for enums.
    fn emit_expr(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<pyast::Expr, Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown parameter type: {0}")]
    UnknownPlugin(String),
    #[error("parameter {action}/{parameter} has invalid value: {detail}")]
    WrongValueShape {
        action: String,
        parameter: String,
        detail: String,
    },
    #[error("parameter {action}/{parameter} value {value} is out of range [{minimum}, {maximum}]")]
    ValueOutOfRange {
        action: String,
        parameter: String,
        value: String,
        minimum: f64,
        maximum: f64,
    },
    #[error("{0}")]
    NotImplemented(&'static str),
    #[error("parameter {parameter} references unknown project parameter {id}")]
    DanglingProjectParameter { parameter: String, id: String },
    #[error("parameter {parameter} type {expected} does not match project parameter type {actual}")]
    ProjectParameterTypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },
    #[error("parameter {parameter} has dangling link: {link}")]
    DanglingLink { parameter: String, link: String },
    #[error("parameter {parameter} type {expected} does not match linked output type {actual}")]
    LinkTypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },
    #[error("action {0} can't use its own result as a parameter")]
    OwnResult(String),
    #[error("joints {joints} belong to robot {robot}, not to the addressed one")]
    JointsRobotMismatch { joints: String, robot: String },
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),
    #[error("object type {object_type} has no action {action}")]
    UnknownAction {
        object_type: String,
        action: String,
    },
    #[error("action {0} is disabled")]
    ActionDisabled(String),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error(transparent)]
    Model(#[from] models::Error),
}

impl Error {
    pub(crate) fn wrong_shape(
        action: &str,
        parameter: &str,
        detail: impl Into<String>,
    ) -> Self {
        Error::WrongValueShape {
            action: action.to_string(),
            parameter: parameter.to_string(),
            detail: detail.into(),
        }
    }
}
