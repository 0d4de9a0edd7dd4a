use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Pose;

/// A typed key/value setting. The value is a JSON-encoded string whose
/// decoded shape is given by `type`.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
            value: value.into(),
        }
    }
}

/// An object placed in the workcell: a robot, a camera, a conveyor.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SceneObject {
    pub id: String,
    pub name: String,
    /// # Object type which declares the actions this object offers.
    #[serde(rename = "type")]
    pub type_: String,
    /// # Pose of the object in the scene frame, absent for poseless services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// # Ids of objects mounted on this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl SceneObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_: type_.into(),
            pose: None,
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }
}

/// A workcell: the set of objects a project's actions may address.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// # When the scene was last persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// # When the scene was last changed in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}
