use std::collections::BTreeMap;

use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;
use serde::{Deserialize, Serialize};

use super::action_and_parameter;
use crate::resolver::find_object_action;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// Enum metadata carried in `ParameterMeta::extra`: the class name the
/// generated program references, and member name to value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnumExtra {
    pub class_name: String,
    pub members: BTreeMap<String, serde_json::Value>,
}

fn enum_extra(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<EnumExtra, Error> {
    let (action, _parameter) = action_and_parameter(project, action_id, parameter_name)?;
    let meta = find_object_action(types, scene, action)?;

    let extra = meta
        .parameter(parameter_name)
        .and_then(|p| p.extra.as_deref())
        .ok_or_else(|| {
            Error::wrong_shape(&action.name, parameter_name, "missing enum metadata")
        })?;

    serde_json::from_str(extra)
        .map_err(|_| Error::wrong_shape(&action.name, parameter_name, "malformed enum metadata"))
}

fn enum_value(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<(EnumExtra, serde_json::Value), Error> {
    let extra = enum_extra(types, scene, project, action_id, parameter_name)?;
    let (action, parameter) = action_and_parameter(project, action_id, parameter_name)?;

    let value: serde_json::Value = serde_json::from_str(&parameter.value).map_err(|_| {
        Error::wrong_shape(&action.name, parameter_name, format!("'{}'", parameter.value))
    })?;

    if !extra.members.values().any(|member| member == &value) {
        return Err(Error::wrong_shape(
            &action.name,
            parameter_name,
            format!("{value} is not a member of {}", extra.class_name),
        ));
    }
    Ok((extra, value))
}

fn emit_member(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<Expr, Error> {
    let (extra, value) = enum_value(types, scene, project, action_id, parameter_name)?;

    let member = extra
        .members
        .iter()
        .find(|(_, member)| *member == &value)
        .map(|(name, _)| name.clone())
        .unwrap();

    Ok(Expr::attribute(Expr::name(extra.class_name), member))
}

pub struct IntegerEnumPlugin;

impl ParameterPlugin for IntegerEnumPlugin {
    fn type_name(&self) -> &'static str {
        "integer_enum"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::IntegerEnum
    }

    fn countable(&self) -> bool {
        true
    }

    fn parameter_value(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let (_, value) = enum_value(types, scene, project, action_id, parameter_name)?;
        let action = project.action(action_id)?;
        value
            .as_i64()
            .map(ParamValue::Integer)
            .ok_or_else(|| Error::wrong_shape(&action.name, parameter_name, "integer expected"))
    }

    fn emit_expr(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        emit_member(types, scene, project, action_id, parameter_name)
    }
}

pub struct StringEnumPlugin;

impl ParameterPlugin for StringEnumPlugin {
    fn type_name(&self) -> &'static str {
        "string_enum"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::StringEnum
    }

    fn parameter_value(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let (_, value) = enum_value(types, scene, project, action_id, parameter_name)?;
        let action = project.action(action_id)?;
        value
            .as_str()
            .map(|s| ParamValue::String(s.to_string()))
            .ok_or_else(|| Error::wrong_shape(&action.name, parameter_name, "string expected"))
    }

    fn emit_expr(
        &self,
        types: &TypesMap,
        scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        emit_member(types, scene, project, action_id, parameter_name)
    }
}
