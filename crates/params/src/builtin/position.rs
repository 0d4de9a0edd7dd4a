use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::id_from_value;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// References an action point by id; the semantic value is its position.
pub struct PositionPlugin;

impl ParameterPlugin for PositionPlugin {
    fn type_name(&self) -> &'static str {
        "position"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Position
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let ap_id = id_from_value(project, action_id, parameter_name)?;
        Ok(ParamValue::Position(project.action_point(&ap_id)?.position))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let ap_id = id_from_value(project, action_id, parameter_name)?;
        let ap = project.action_point(&ap_id)?;
        Ok(Expr::attribute(
            Expr::attribute(Expr::name("aps"), ap.name.clone()),
            "position",
        ))
    }
}
