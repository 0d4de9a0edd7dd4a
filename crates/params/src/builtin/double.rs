use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::decode;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

pub struct DoublePlugin;

impl ParameterPlugin for DoublePlugin {
    fn type_name(&self) -> &'static str {
        "double"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Double
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        Ok(ParamValue::Double(decode(project, action_id, parameter_name)?))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        Ok(Expr::Float(decode(project, action_id, parameter_name)?))
    }
}

pub struct DoubleListPlugin;

impl ParameterPlugin for DoubleListPlugin {
    fn type_name(&self) -> &'static str {
        "double_array"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(ValueKind::Double))
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let values: Vec<f64> = decode(project, action_id, parameter_name)?;
        Ok(ParamValue::List(
            values.into_iter().map(ParamValue::Double).collect(),
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
        let values: Vec<f64> = decode(project, action_id, parameter_name)?;
        Ok(Expr::List(values.into_iter().map(Expr::Float).collect()))
    }
}
