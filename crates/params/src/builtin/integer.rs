use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::decode;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

pub struct IntegerPlugin;

impl ParameterPlugin for IntegerPlugin {
    fn type_name(&self) -> &'static str {
        "integer"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Integer
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        Ok(ParamValue::Integer(decode(project, action_id, parameter_name)?))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        Ok(Expr::Int(decode(project, action_id, parameter_name)?))
    }
}

pub struct IntegerListPlugin;

impl ParameterPlugin for IntegerListPlugin {
    fn type_name(&self) -> &'static str {
        "integer_array"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(ValueKind::Integer))
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let values: Vec<i64> = decode(project, action_id, parameter_name)?;
        Ok(ParamValue::List(
            values.into_iter().map(ParamValue::Integer).collect(),
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
        let values: Vec<i64> = decode(project, action_id, parameter_name)?;
        Ok(Expr::List(values.into_iter().map(Expr::Int).collect()))
    }
}
