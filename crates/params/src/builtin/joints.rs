use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::id_from_value;
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// References a stored arm configuration by id. The configuration must
/// belong to the robot the action addresses.
pub struct JointsPlugin;

impl ParameterPlugin for JointsPlugin {
    fn type_name(&self) -> &'static str {
        "joints"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Joints
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let joints_id = id_from_value(project, action_id, parameter_name)?;
        let joints = project.joints(&joints_id)?;

        let action = project.action(action_id)?;
        let (robot_id, _method) = action.parse_type()?;
        if joints.robot_id != robot_id {
            return Err(Error::JointsRobotMismatch {
                joints: joints.id.clone(),
                robot: joints.robot_id.clone(),
            });
        }

        Ok(ParamValue::Joints(joints.clone()))
    }

    fn uses_robot_joints(
        &self,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
        joints_id: &str,
    ) -> Result<bool, Error> {
        Ok(id_from_value(project, action_id, parameter_name)? == joints_id)
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let joints_id = id_from_value(project, action_id, parameter_name)?;
        let (ap, joints) = project.ap_and_joints(&joints_id)?;
        Ok(Expr::attribute(
            Expr::attribute(Expr::attribute(Expr::name("aps"), ap.name.clone()), "joints"),
            joints.name.clone(),
        ))
    }
}
