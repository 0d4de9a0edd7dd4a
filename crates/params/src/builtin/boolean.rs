use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::decode;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

pub struct BooleanPlugin;

impl ParameterPlugin for BooleanPlugin {
    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn countable(&self) -> bool {
        true
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        Ok(ParamValue::Boolean(decode(project, action_id, parameter_name)?))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        Ok(Expr::Bool(decode(project, action_id, parameter_name)?))
    }
}

pub struct BooleanListPlugin;

impl ParameterPlugin for BooleanListPlugin {
    fn type_name(&self) -> &'static str {
        "boolean_array"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(ValueKind::Boolean))
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let values: Vec<bool> = decode(project, action_id, parameter_name)?;
        Ok(ParamValue::List(
            values.into_iter().map(ParamValue::Boolean).collect(),
        ))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let values: Vec<bool> = decode(project, action_id, parameter_name)?;
        Ok(Expr::List(values.into_iter().map(Expr::Bool).collect()))
    }
}
