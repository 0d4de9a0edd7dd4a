use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared metadata of one parameter of an object-type action.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ParameterMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    /// # Extra constraints, as a JSON object (e.g. `minimum`/`maximum`
    /// bounds harvested from the method's documentation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl ParameterMeta {
    pub fn new(name: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
            extra: None,
        }
    }
}

/// Declared metadata of one callable action of an object type.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ObjectAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterMeta>,
    /// # Parameter type names of the action's return values, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl ObjectAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: Vec::new(),
            disabled: false,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterMeta>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_returns(mut self, returns: Vec<String>) -> Self {
        self.returns = returns;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterMeta> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// An object type: the class of a scene object, carrying the signatures
/// of the actions its instances offer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ObjectType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ObjectAction>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<ObjectAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn action(&self, name: &str) -> Option<&ObjectAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// Object types keyed by type name.
pub type TypesMap = BTreeMap<String, ObjectType>;
