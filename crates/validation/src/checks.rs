use cache::{CachedProject, CachedScene};
use models::{is_valid_identifier, Action, FlowKind, ObjectAction, ProjectParameter, TypesMap};
use params::{find_object_action, resolve};

use crate::{Error, LogicContainer};

/// Checks an action's default flow: either no outputs at all, or one
/// output per declared return value, each a fresh, valid identifier.
pub fn check_flows(
    container: &dyn LogicContainer,
    action: &Action,
    meta: &ObjectAction,
) -> Result<(), Error> {
    let flow = action.flow(FlowKind::Default)?;

    // It is fine not to bind any output; the returned values are simply
    // not stored in variables.
    if flow.outputs.is_empty() {
        return Ok(());
    }

    if flow.outputs.len() != meta.returns.len() {
        return Err(Error::OutputCountMismatch(action.name.clone()));
    }

    for output in &flow.outputs {
        if !is_valid_identifier(output) {
            return Err(Error::InvalidOutputIdentifier(output.clone()));
        }

        let taken = container
            .iter_actions()
            .filter(|other| other.id != action.id)
            .flat_map(|other| other.flows.iter())
            .flat_map(|f| f.outputs.iter())
            .any(|existing| existing == output);
        if taken {
            return Err(Error::DuplicateOutput(output.clone()));
        }
    }

    Ok(())
}

/// Checks an action's parameters against the declared signature,
/// resolving every parameter to verify the values and references.
pub fn check_action_params(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
    action: &Action,
    meta: &ObjectAction,
) -> Result<(), Error> {
    if meta.parameters.len() != action.parameters.len() {
        return Err(Error::ParameterCountMismatch(action.name.clone()));
    }

    for declared in &meta.parameters {
        let parameter = action.parameter(&declared.name)?;
        resolve(types, scene, project, &action.id, parameter)?;
    }

    Ok(())
}

/// An action point's parent must be a posed scene object or another
/// action point.
pub fn check_ap_parent(
    scene: &CachedScene,
    project: &CachedProject,
    ap_id: &str,
    parent: Option<&str>,
) -> Result<(), Error> {
    let Some(parent) = parent else {
        return Ok(());
    };

    if let Ok(obj) = scene.object(parent) {
        if obj.pose.is_none() {
            return Err(Error::InvalidApParent {
                ap: ap_id.to_string(),
                detail: format!("object {parent} has no pose"),
            });
        }
        return Ok(());
    }

    if project.action_point(parent).is_err() {
        return Err(Error::InvalidApParent {
            ap: ap_id.to_string(),
            detail: format!("{parent} is neither an object nor an action point"),
        });
    }
    Ok(())
}

pub fn check_project_parameter(
    project: &CachedProject,
    parameter: &ProjectParameter,
) -> Result<(), Error> {
    if !is_valid_identifier(&parameter.name) {
        return Err(Error::InvalidParameterName(parameter.name.clone()));
    }

    for existing in project.parameters() {
        if existing.id == parameter.id {
            continue;
        }
        if existing.name == parameter.name {
            return Err(Error::DuplicateParameterName(parameter.name.clone()));
        }
    }

    match serde_json::from_str::<serde_json::Value>(&parameter.value) {
        Ok(
            serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_),
        ) => Ok(()),
        _ => Err(Error::NonPrimitiveParameter(parameter.name.clone())),
    }
}

/// Audits a scene against the known object types. Returns descriptions
/// of every problem found instead of failing on the first.
pub fn scene_problems(types: &TypesMap, scene: &CachedScene) -> Vec<String> {
    let mut problems = Vec::new();

    for obj in scene.objects() {
        if !types.contains_key(&obj.type_) {
            problems.push(format!("Object {} has unknown type {}.", obj.name, obj.type_));
        }
    }

    problems
}

/// Audits a project against its scene and the known object types.
pub fn project_problems(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
) -> Vec<String> {
    if project.scene_id != scene.id {
        return vec!["Project/scene mismatch.".to_string()];
    }

    let mut problems = scene_problems(types, scene);

    for parameter in project.parameters() {
        if let Err(err) = check_project_parameter(project, parameter) {
            problems.push(err.to_string());
        }
    }

    for ap in project.action_points() {
        if let Err(err) = check_ap_parent(scene, project, &ap.id, ap.parent.as_deref()) {
            problems.push(err.to_string());
        }

        for joints in project.ap_joints(&ap.id) {
            if scene.object(&joints.robot_id).is_err() {
                problems.push(format!(
                    "Action point {} has joints ({}) for an unknown robot: {}.",
                    ap.name, joints.name, joints.robot_id
                ));
            }
        }
    }

    for action in project.actions() {
        let meta = match find_object_action(types, scene, action) {
            Ok(meta) => meta,
            Err(err) => {
                problems.push(format!("Action {}: {err}.", action.name));
                continue;
            }
        };

        if let Err(err) = check_action_params(types, scene, project, action, meta) {
            problems.push(err.to_string());
        }
        if let Err(err) = check_flows(project, action, meta) {
            problems.push(err.to_string());
        }
    }

    tracing::debug!(project = %project.id, problems = problems.len(), "project audited");
    problems
}
