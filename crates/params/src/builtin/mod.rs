//! The builtin plugin set. One module per parameter family, mirroring
//! the one-plugin-one-concern layout of the registry.

pub mod boolean;
pub mod double;
pub mod enums;
pub mod image;
pub mod integer;
pub mod joints;
pub mod pose;
pub mod position;
pub mod relative_pose;
pub mod string;

use cache::CachedProject;
use models::{Action, ActionParameter};
use serde::de::DeserializeOwned;

use crate::Error;

/// Looks up the action and the named parameter on it.
pub(crate) fn action_and_parameter<'p>(
    project: &'p CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<(&'p Action, &'p ActionParameter), Error> {
    let action = project.action(action_id)?;
    let parameter = action.parameter(parameter_name)?;
    Ok((action, parameter))
}

/// Decodes the parameter's JSON payload into the expected shape.
pub(crate) fn decode<T: DeserializeOwned>(
    project: &CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<T, Error> {
    let (action, parameter) = action_and_parameter(project, action_id, parameter_name)?;
    serde_json::from_str(&parameter.value).map_err(|_| {
        Error::wrong_shape(
            &action.name,
            parameter_name,
            format!("'{}'", parameter.value),
        )
    })
}

/// Reference plugins store a JSON-quoted entity id.
pub(crate) fn id_from_value(
    project: &CachedProject,
    action_id: &str,
    parameter_name: &str,
) -> Result<String, Error> {
    decode::<String>(project, action_id, parameter_name)
}
