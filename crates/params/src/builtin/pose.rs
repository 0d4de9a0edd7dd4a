use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use super::{decode, id_from_value};
use crate::{Error, ParamValue, ParameterPlugin, ValueKind};

/// Attribute path `aps.<ap>.poses.<orientation>` for an orientation id.
fn pose_attribute(project: &CachedProject, orientation_id: &str) -> Result<Expr, Error> {
    let (ap, ori) = project.ap_and_orientation(orientation_id)?;
    Ok(Expr::attribute(
        Expr::attribute(Expr::attribute(Expr::name("aps"), ap.name.clone()), "poses"),
        ori.name.clone(),
    ))
}

/// References a named orientation; the semantic value is the owning
/// action point's position with that orientation.
pub struct PosePlugin;

impl PosePlugin {
    fn orientation_id(
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<String, Error> {
        id_from_value(project, action_id, parameter_name)
    }
}

impl ParameterPlugin for PosePlugin {
    fn type_name(&self) -> &'static str {
        "pose"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Pose
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let orientation_id = Self::orientation_id(project, action_id, parameter_name)?;
        Ok(ParamValue::Pose(project.pose(&orientation_id)?))
    }

    fn uses_orientation(
        &self,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
        orientation_id: &str,
    ) -> Result<bool, Error> {
        Ok(Self::orientation_id(project, action_id, parameter_name)? == orientation_id)
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let orientation_id = Self::orientation_id(project, action_id, parameter_name)?;
        pose_attribute(project, &orientation_id)
    }
}

/// References a list of named orientations.
pub struct PoseListPlugin;

impl ParameterPlugin for PoseListPlugin {
    fn type_name(&self) -> &'static str {
        "pose_array"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(ValueKind::Pose))
    }

    fn parameter_value(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<ParamValue, Error> {
        let orientation_ids: Vec<String> = decode(project, action_id, parameter_name)?;
        let mut poses = Vec::with_capacity(orientation_ids.len());
        for orientation_id in &orientation_ids {
            poses.push(ParamValue::Pose(project.pose(orientation_id)?));
        }
        Ok(ParamValue::List(poses))
    }

    fn uses_orientation(
        &self,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
        orientation_id: &str,
    ) -> Result<bool, Error> {
        let orientation_ids: Vec<String> = decode(project, action_id, parameter_name)?;
        Ok(orientation_ids.iter().any(|id| id == orientation_id))
    }

    fn emit_expr(
        &self,
        _types: &TypesMap,
        _scene: &CachedScene,
        project: &CachedProject,
        action_id: &str,
        parameter_name: &str,
    ) -> Result<Expr, Error> {
        let orientation_ids: Vec<String> = decode(project, action_id, parameter_name)?;
        let mut items = Vec::with_capacity(orientation_ids.len());
        for orientation_id in &orientation_ids {
            items.push(pose_attribute(project, orientation_id)?);
        }
        Ok(Expr::List(items))
    }
}
