use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::action_and_parameter;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// Image payloads are opaque to the logic core: the raw encoded string
/// is passed through, and rendering one as a program literal is refused.
pub struct ImagePlugin;

impl ParameterPlugin for ImagePlugin {
    fn type_name(&self) -> &'static str {
        "image"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Image
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let (_action, parameter) = action_and_parameter(project, action_id, parameter_name)?;
        Ok(ParamValue::String(parameter.value.clone()))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        _project: &CachedProject,
        _action_id: &str,
        _parameter_name: &str,
    ) -> Result<Expr, Error> {
        Err(Error::NotImplemented(
            "it does not make much sense to have an image as a literal",
        ))
    }
}
