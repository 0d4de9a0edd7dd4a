use cache::{CachedProject, CachedScene};
use models::{Action, ActionParameter, LinkToOutput, ObjectAction, ParameterKind, TypesMap};
use serde::Deserialize;

use crate::{registry, Error, ParamValue};

/// Looks up the declared signature of the method an action invokes.
pub fn find_object_action<'t>(
    types: &'t TypesMap,
    scene: &CachedScene,
    action: &Action,
) -> Result<&'t ObjectAction, Error> {
    let (obj_id, method) = action.parse_type()?;
    let obj = scene.object(obj_id)?;

    let object_type = types
        .get(&obj.type_)
        .ok_or_else(|| Error::UnknownObjectType(obj.type_.clone()))?;

    let meta = object_type
        .action(method)
        .ok_or_else(|| Error::UnknownAction {
            object_type: obj.type_.clone(),
            action: method.to_string(),
        })?;

    if meta.disabled {
        return Err(Error::ActionDisabled(meta.name.clone()));
    }
    Ok(meta)
}

/// The runtime meaning of an action parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A plugin-typed value, decoded.
    Literal {
        plugin: &'static str,
        value: ParamValue,
    },
    /// A reference to a project parameter.
    ProjectParameterRef { id: String },
    /// The k-th output of a prior action's flow.
    LinkToOutput(LinkToOutput),
}

/// Numeric bounds harvested into `ParameterMeta::extra`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeExtra {
    minimum: Option<f64>,
    maximum: Option<f64>,
}

/// Resolves an action parameter to its runtime meaning, verifying that
/// whatever it references exists and agrees with the declared types.
pub fn resolve(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
    action_id: &str,
    parameter: &ActionParameter,
) -> Result<Resolved, Error> {
    let action = project.action(action_id)?;
    let meta = find_object_action(types, scene, action)?;

    match ParameterKind::from_type(&parameter.type_) {
        Some(ParameterKind::ProjectParameter) => {
            let id = parameter.str_from_value()?;

            let project_parameter =
                project
                    .parameter(&id)
                    .map_err(|_| Error::DanglingProjectParameter {
                        parameter: parameter.name.clone(),
                        id: id.clone(),
                    })?;

            let declared = meta.parameter(&parameter.name).ok_or_else(|| {
                Error::wrong_shape(&action.name, &parameter.name, "not declared by the action")
            })?;
            if declared.type_ != project_parameter.type_ {
                return Err(Error::ProjectParameterTypeMismatch {
                    parameter: parameter.name.clone(),
                    expected: declared.type_.clone(),
                    actual: project_parameter.type_.clone(),
                });
            }

            Ok(Resolved::ProjectParameterRef { id })
        }

        Some(ParameterKind::Link) => {
            let link = parameter.parse_link().map_err(|_| Error::DanglingLink {
                parameter: parameter.name.clone(),
                link: parameter.value.clone(),
            })?;

            if link.action_id == action_id {
                return Err(Error::OwnResult(action.name.clone()));
            }

            let producer = project
                .action(&link.action_id)
                .map_err(|_| Error::DanglingLink {
                    parameter: parameter.name.clone(),
                    link: link.to_string(),
                })?;
            let producer_meta = find_object_action(types, scene, producer)?;
            let flow = producer.flow(link.flow)?;

            // Outputs are all-or-nothing: a producer whose values are
            // consumed must bind every return value to an output.
            if flow.outputs.len() != producer_meta.returns.len() {
                return Err(Error::LinkTypeMismatch {
                    parameter: parameter.name.clone(),
                    expected: format!("{} outputs", producer_meta.returns.len()),
                    actual: format!("{} outputs", flow.outputs.len()),
                });
            }
            if flow.outputs.get(link.output_index).is_none() {
                return Err(Error::DanglingLink {
                    parameter: parameter.name.clone(),
                    link: link.to_string(),
                });
            }

            let declared = meta.parameter(&parameter.name).ok_or_else(|| {
                Error::wrong_shape(&action.name, &parameter.name, "not declared by the action")
            })?;
            let produced = &producer_meta.returns[link.output_index];
            if &declared.type_ != produced {
                return Err(Error::LinkTypeMismatch {
                    parameter: parameter.name.clone(),
                    expected: declared.type_.clone(),
                    actual: produced.clone(),
                });
            }

            Ok(Resolved::LinkToOutput(link))
        }

        None => {
            let plugin = registry().by_name(&parameter.type_)?;
            let value =
                plugin.parameter_value(types, scene, project, action_id, &parameter.name)?;

            check_range(&action.name, &parameter.name, meta, &value)?;

            Ok(Resolved::Literal {
                plugin: plugin.type_name(),
                value,
            })
        }
    }
}

/// Enforces harvested numeric bounds, when the metadata declares any.
fn check_range(
    action_name: &str,
    parameter_name: &str,
    meta: &ObjectAction,
    value: &ParamValue,
) -> Result<(), Error> {
    let numeric = match value {
        ParamValue::Integer(i) => *i as f64,
        ParamValue::Double(d) => *d,
        _ => return Ok(()),
    };

    let extra = meta
        .parameter(parameter_name)
        .and_then(|p| p.extra.as_deref())
        .and_then(|extra| serde_json::from_str::<RangeExtra>(extra).ok());

    if let Some(RangeExtra {
        minimum: Some(minimum),
        maximum: Some(maximum),
    }) = extra
    {
        if numeric < minimum || numeric > maximum {
            return Err(Error::ValueOutOfRange {
                action: action_name.to_string(),
                parameter: parameter_name.to_string(),
                value: numeric.to_string(),
                minimum,
                maximum,
            });
        }
    }
    Ok(())
}
