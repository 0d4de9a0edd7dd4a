use cache::{CachedProject, CachedScene};
use models::{Pose, TypesMap};
use pyast::Expr;

use super::decode;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// A literal pose relative to the addressed object, carried inline in
/// the parameter value rather than referencing an action point.
pub struct RelativePosePlugin;

impl ParameterPlugin for RelativePosePlugin {
    fn type_name(&self) -> &'static str {
        "relative_pose"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::RelativePose
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let pose: Pose = decode(project, action_id, parameter_name)?;
        Ok(ParamValue::RelativePose(pose))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let pose: Pose = decode(project, action_id, parameter_name)?;
        Ok(Expr::call(
            Expr::name("RelativePose"),
            vec![
                Expr::call(
                    Expr::name("Position"),
                    vec![
                        Expr::Float(pose.position.x),
                        Expr::Float(pose.position.y),
                        Expr::Float(pose.position.z),
                    ],
                    vec![],
                ),
                Expr::call(
                    Expr::name("Orientation"),
                    vec![
                        Expr::Float(pose.orientation.x),
                        Expr::Float(pose.orientation.y),
                        Expr::Float(pose.orientation.z),
                        Expr::Float(pose.orientation.w),
                    ],
                    vec![],
                ),
            ],
            vec![],
        ))
    }
}
