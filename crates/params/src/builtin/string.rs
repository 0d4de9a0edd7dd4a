use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::decode;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

pub struct StringPlugin;

impl ParameterPlugin for StringPlugin {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        Ok(ParamValue::String(decode(project, action_id, parameter_name)?))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        Ok(Expr::Str(decode(project, action_id, parameter_name)?))
    }
}

pub struct StringListPlugin;

impl ParameterPlugin for StringListPlugin {
    fn type_name(&self) -> &'static str {
        "string_array"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(ValueKind::String))
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let values: Vec<String> = decode(project, action_id, parameter_name)?;
        Ok(ParamValue::List(
            values.into_iter().map(ParamValue::String).collect(),
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
        let values: Vec<String> = decode(project, action_id, parameter_name)?;
        Ok(Expr::List(values.into_iter().map(Expr::Str).collect()))
    }
}
