use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Error, Joint, Orientation, Position};

/// Sentinel endpoint of the logic graph where execution enters.
pub const START: &str = "START";
/// Sentinel endpoint of the logic graph where execution leaves.
pub const END: &str = "END";

/// A labelled output channel of an action. Only the default flow is
/// produced by current projects.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    #[default]
    Default,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Default => "default",
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlowKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(FlowKind::Default),
            other => Err(Error::UnknownFlowKind(other.to_string())),
        }
    }
}

/// A reference to the k-th output of another action's flow,
/// encoded as `<action_id>/<flow>/<output_index>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkToOutput {
    pub action_id: String,
    pub flow: FlowKind,
    pub output_index: usize,
}

impl LinkToOutput {
    pub fn new(action_id: impl Into<String>, flow: FlowKind, output_index: usize) -> Self {
        Self {
            action_id: action_id.into(),
            flow,
            output_index,
        }
    }
}

impl std::str::FromStr for LinkToOutput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidLink(s.to_string());

        match s.split('/').collect::<Vec<_>>().as_slice() {
            [action_id, flow, index] => Ok(LinkToOutput {
                action_id: (*action_id).to_string(),
                flow: flow.parse().map_err(|_| invalid())?,
                output_index: index.parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for LinkToOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.action_id, self.flow, self.output_index)
    }
}

/// Reserved action-parameter kinds. Any other `type` names a registered
/// parameter plugin instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    ProjectParameter,
    Link,
}

impl ParameterKind {
    pub const PROJECT_PARAMETER: &'static str = "project_parameter";
    pub const LINK: &'static str = "link";

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::ProjectParameter => Self::PROJECT_PARAMETER,
            ParameterKind::Link => Self::LINK,
        }
    }

    pub fn from_type(type_: &str) -> Option<ParameterKind> {
        match type_ {
            Self::PROJECT_PARAMETER => Some(ParameterKind::ProjectParameter),
            Self::LINK => Some(ParameterKind::Link),
            _ => None,
        }
    }
}

/// One argument of an action. `value` is always a JSON-encoded string;
/// its decoded shape depends on `type`.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, type_: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
            value: value.into(),
        }
    }

    /// A literal or plugin-typed parameter, as opposed to one of the
    /// reserved reference kinds.
    pub fn is_value(&self) -> bool {
        ParameterKind::from_type(&self.type_).is_none()
    }

    /// Decodes the JSON-quoted string payload carried by the reference
    /// kinds (a project-parameter id, or a link path).
    pub fn str_from_value(&self) -> Result<String, Error> {
        serde_json::from_str::<String>(&self.value)
            .map_err(|_| Error::InvalidLink(self.value.clone()))
    }

    pub fn parse_link(&self) -> Result<LinkToOutput, Error> {
        debug_assert_eq!(self.type_, ParameterKind::LINK);
        self.str_from_value()?.parse()
    }
}

/// A labelled output channel: the kind plus the ordered identifiers its
/// outputs are bound to in a generated program.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Flow {
    #[serde(rename = "type", default)]
    pub type_: FlowKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl Flow {
    pub fn with_outputs(outputs: Vec<String>) -> Self {
        Self {
            type_: FlowKind::Default,
            outputs,
        }
    }

    /// Outputs are identifiers and may not repeat within a flow.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = std::collections::BTreeSet::new();
        for output in &self.outputs {
            if !seen.insert(output.as_str()) {
                return Err(Error::DuplicateOutputs);
            }
        }
        Ok(())
    }
}

/// An invocation of an object-type method, as configured in a project.
/// `type` is `"<object_id>/<method_name>"`.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Flow>,
}

impl Action {
    pub fn new(id: impl Into<String>, name: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_: type_.into(),
            parameters: Vec::new(),
            flows: Vec::new(),
        }
    }

    /// Splits `type` into the addressed object id and method name.
    pub fn parse_type(&self) -> Result<(&str, &str), Error> {
        match self.type_.split('/').collect::<Vec<_>>().as_slice() {
            [obj_id, method] if !obj_id.is_empty() && !method.is_empty() => Ok((obj_id, method)),
            _ => Err(Error::InvalidActionType(
                self.id.clone(),
                self.type_.clone(),
            )),
        }
    }

    pub fn parameter(&self, name: &str) -> Result<&ActionParameter, Error> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ParameterNotFound(name.to_string()))
    }

    pub fn flow(&self, kind: FlowKind) -> Result<&Flow, Error> {
        self.flows
            .iter()
            .find(|f| f.type_ == kind)
            .ok_or_else(|| Error::FlowNotFound(kind.to_string()))
    }

    /// The action without its parameters and flows.
    pub fn bare(&self) -> Action {
        Action::new(self.id.clone(), self.name.clone(), self.type_.clone())
    }
}

/// A reusable, named orientation owned by an action point.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NamedOrientation {
    pub id: String,
    pub name: String,
    pub orientation: Orientation,
}

impl NamedOrientation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            orientation,
        }
    }
}

/// A stored arm configuration owned by an action point.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectRobotJoints {
    pub id: String,
    pub name: String,
    pub robot_id: String,
    pub joints: Vec<Joint>,
    /// # Whether the stored configuration still reaches the action point.
    #[serde(default)]
    pub is_valid: bool,
}

impl ProjectRobotJoints {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        robot_id: impl Into<String>,
        joints: Vec<Joint>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            robot_id: robot_id.into(),
            joints,
            is_valid: false,
        }
    }
}

/// A named frame in the workcell, optionally anchored to a posed scene
/// object or to another action point.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectActionPoint {
    pub id: String,
    pub name: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orientations: Vec<NamedOrientation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub robot_joints: Vec<ProjectRobotJoints>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl ProjectActionPoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            parent: None,
            orientations: Vec::new(),
            robot_joints: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// The action point without its owned entities.
    pub fn bare(&self) -> ProjectActionPoint {
        ProjectActionPoint {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position,
            parent: self.parent.clone(),
            orientations: Vec::new(),
            robot_joints: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn invalidate_joints(&mut self) {
        for joints in &mut self.robot_joints {
            joints.is_valid = false;
        }
    }
}

/// A named project-scoped constant, referenced from action parameters
/// by id. `value` is a JSON-encoded primitive.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectParameter {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

impl ProjectParameter {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        type_: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_: type_.into(),
            value: value.into(),
        }
    }
}

/// A guard on a logic edge: take the edge when the referenced flow
/// output equals `value` (a JSON-encoded primitive).
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectLogicIf {
    /// # Reference `<action_id>/<flow>/<output_index>` to a prior output.
    pub what: String,
    pub value: String,
}

impl ProjectLogicIf {
    pub fn new(what: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            value: value.into(),
        }
    }

    /// Accepts both the two-segment (`<action_id>/<flow>`, output 0
    /// implied) and the canonical three-segment form.
    pub fn parse_what(&self) -> Result<LinkToOutput, Error> {
        let invalid = || Error::InvalidLink(self.what.clone());

        match self.what.split('/').collect::<Vec<_>>().as_slice() {
            [action_id, flow] => Ok(LinkToOutput {
                action_id: (*action_id).to_string(),
                flow: flow.parse().map_err(|_| invalid())?,
                output_index: 0,
            }),
            _ => self.what.parse(),
        }
    }
}

/// A directed edge of the project's control-flow graph.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LogicItem {
    pub id: String,
    /// # `START`, or `<action_id>` with an optional `/<flow>` suffix.
    pub start: String,
    /// # `END` or `<action_id>`.
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ProjectLogicIf>,
}

impl LogicItem {
    pub fn new(id: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: end.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: ProjectLogicIf) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Splits `start` into the action id and flow kind; a bare action id
    /// implies the default flow.
    pub fn parse_start(&self) -> Result<(&str, FlowKind), Error> {
        match self.start.split_once('/') {
            Some((action_id, flow)) => Ok((action_id, flow.parse()?)),
            None => Ok((self.start.as_str(), FlowKind::Default)),
        }
    }
}

/// A declared return value of a project function.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FunctionReturns {
    #[serde(rename = "type")]
    pub type_: String,
    pub link: String,
}

/// A reusable sub-program: its own actions and logic, parameterized.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectFunction {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logic: Vec<LogicItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<FunctionReturns>,
}

impl ProjectFunction {
    pub fn action(&self, action_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == action_id)
    }
}

/// A program over a scene: action points with their actions, the logic
/// graph connecting them, and project-scoped parameters.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub scene_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_true")]
    pub has_logic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ProjectParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_points: Vec<ProjectActionPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logic: Vec<LogicItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<ProjectFunction>,
}

fn default_true() -> bool {
    true
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scene_id: scene_id.into(),
            description: String::new(),
            has_logic: true,
            modified: None,
            int_modified: None,
            parameters: Vec::new(),
            action_points: Vec::new(),
            logic: Vec::new(),
            functions: Vec::new(),
        }
    }
}
