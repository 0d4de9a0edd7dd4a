//! Shared fixtures: a one-object scene, its action metadata, and
//! structural equivalence of projects whose entity ids differ.

use std::collections::BTreeMap;

use cache::CachedScene;
use models::{
    Action, LogicItem, ObjectAction, ObjectType, ParameterKind, ParameterMeta, Pose, Project,
    Scene, SceneObject, TypesMap, END, START,
};

pub fn scene() -> CachedScene {
    let mut scene = Scene::new("scn_1", "s1");
    scene
        .objects
        .push(SceneObject::new("obj_1", "test_name", "Test").with_pose(Pose::default()));
    CachedScene::new(scene).unwrap()
}

pub fn types() -> TypesMap {
    let enum_extra = r#"{"className": "TestEnum", "members": {"CLASS1": "1", "CLASS2": "2"}}"#;

    let mut types = TypesMap::new();
    types.insert(
        "Test".to_string(),
        ObjectType::new("Test").with_actions(vec![
            ObjectAction::new("get_int").with_returns(vec!["integer".into()]),
            ObjectAction::new("test").with_returns(vec!["boolean".into()]),
            ObjectAction::new("test_par")
                .with_parameters(vec![ParameterMeta::new("param", "integer")]),
            ObjectAction::new("test_pose").with_parameters(vec![ParameterMeta::new("param", "pose")]),
            ObjectAction::new("test_joints")
                .with_parameters(vec![ParameterMeta::new("param", "joints")]),
            ObjectAction::new("test_position")
                .with_parameters(vec![ParameterMeta::new("param", "position")]),
            ObjectAction::new("tests_class_value").with_parameters(vec![{
                let mut meta = ParameterMeta::new("param", "string_enum");
                meta.extra = Some(enum_extra.to_string());
                meta
            }]),
        ]),
    );
    types
}

fn action_name<'p>(project: &'p Project, action_id: &'p str) -> &'p str {
    if action_id == START || action_id == END {
        return action_id;
    }
    project
        .action_points
        .iter()
        .flat_map(|ap| ap.actions.iter())
        .find(|action| action.id == action_id)
        .map(|action| action.name.as_str())
        .unwrap_or_else(|| panic!("no action with id {action_id}"))
}

fn action_by_name<'p>(project: &'p Project, name: &str) -> &'p Action {
    project
        .action_points
        .iter()
        .flat_map(|ap| ap.actions.iter())
        .find(|action| action.name == name)
        .unwrap_or_else(|| panic!("no action named {name}"))
}

/// The logic graph with ids replaced by action names: edges as
/// `(start, end, condition-producer, condition-value)`.
fn logic_shape(project: &Project) -> Vec<(String, String, String, String)> {
    let mut edges: Vec<(String, String, String, String)> = project
        .logic
        .iter()
        .map(|item: &LogicItem| {
            let (start_id, _flow) = item.parse_start().unwrap();
            let start = action_name(project, start_id).to_string();
            let end = action_name(project, &item.end).to_string();
            let (cond_action, cond_value) = match &item.condition {
                Some(condition) => {
                    let what = condition.parse_what().unwrap();
                    (
                        action_name(project, &what.action_id).to_string(),
                        condition.value.clone(),
                    )
                }
                None => (String::new(), String::new()),
            };
            (start, end, cond_action, cond_value)
        })
        .collect();
    edges.sort();
    edges
}

/// Asserts that two projects are logically equivalent: same action
/// names, types and flows, same parameter semantics, and the same logic
/// topology including conditions. Entity ids are allowed to differ.
pub fn assert_equivalent(expected: &Project, actual: &Project) {
    let expected_names: Vec<&str> = {
        let mut names: Vec<&str> = expected
            .action_points
            .iter()
            .flat_map(|ap| ap.actions.iter())
            .map(|action| action.name.as_str())
            .collect();
        names.sort();
        names
    };

    for name in &expected_names {
        let a = action_by_name(expected, name);
        let b = action_by_name(actual, name);

        assert_eq!(a.type_, b.type_, "type of action {name}");
        assert_eq!(a.flows, b.flows, "flows of action {name}");
        assert_eq!(
            a.parameters.len(),
            b.parameters.len(),
            "parameter count of action {name}"
        );

        let parameter_names: BTreeMap<&str, &str> = expected
            .parameters
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();
        let actual_parameter_names: BTreeMap<&str, &str> = actual
            .parameters
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        for (pa, pb) in a.parameters.iter().zip(b.parameters.iter()) {
            assert_eq!(pa.name, pb.name, "parameter name on {name}");
            assert_eq!(pa.type_, pb.type_, "parameter type on {name}");

            match ParameterKind::from_type(&pa.type_) {
                Some(ParameterKind::Link) => {
                    let la = pa.parse_link().unwrap();
                    let lb = pb.parse_link().unwrap();
                    assert_eq!(
                        action_name(expected, &la.action_id),
                        action_name(actual, &lb.action_id),
                        "link target on {name}"
                    );
                    assert_eq!(la.output_index, lb.output_index, "link index on {name}");
                }
                Some(ParameterKind::ProjectParameter) => {
                    let ia: String = serde_json::from_str(&pa.value).unwrap();
                    let ib: String = serde_json::from_str(&pb.value).unwrap();
                    assert_eq!(
                        parameter_names.get(ia.as_str()),
                        actual_parameter_names.get(ib.as_str()),
                        "project parameter on {name}"
                    );
                }
                None => assert_eq!(pa.value, pb.value, "value of parameter on {name}"),
            }
        }
    }

    let actual_names: Vec<&str> = {
        let mut names: Vec<&str> = actual
            .action_points
            .iter()
            .flat_map(|ap| ap.actions.iter())
            .map(|action| action.name.as_str())
            .collect();
        names.sort();
        names
    };
    assert_eq!(expected_names, actual_names, "action names");

    assert_eq!(logic_shape(expected), logic_shape(actual), "logic topology");
}
