use cache::{CachedProject, CachedScene};
use models::{
    Action, Flow, LogicItem, ObjectAction, ObjectType, ParameterMeta, Pose, Position, Project,
    ProjectActionPoint, ProjectLogicIf, ProjectParameter, Scene, SceneObject, TypesMap, END, START,
};
use validation::{
    check_ap_parent, check_flows, check_for_loops, check_logic_item, check_project_parameter,
    project_problems, Error,
};

fn scene() -> CachedScene {
    let mut scene = Scene::new("scn_1", "s1");
    scene
        .objects
        .push(SceneObject::new("obj_1", "test_name", "Test").with_pose(Pose::default()));
    scene.objects.push(SceneObject::new("obj_2", "poseless", "Test"));
    CachedScene::new(scene).unwrap()
}

fn types() -> TypesMap {
    let mut types = TypesMap::new();
    types.insert(
        "Test".to_string(),
        ObjectType::new("Test").with_actions(vec![
            ObjectAction::new("test").with_returns(vec!["boolean".into()]),
            ObjectAction::new("get_int").with_returns(vec!["integer".into()]),
            ObjectAction::new("test_par")
                .with_parameters(vec![ParameterMeta::new("param", "integer")]),
        ]),
    );
    types
}

/// Actions ac1..acN of type Test/test on a single action point; ac1
/// binds its boolean output.
fn project_with_actions(count: usize) -> Project {
    let mut project = Project::new("pro_1", "p1", "scn_1");
    let mut ap = ProjectActionPoint::new("acp_1", "ap1", Position::default());

    for index in 1..=count {
        let mut action = Action::new(format!("ac{index}"), format!("ac{index}"), "obj_1/test");
        if index == 1 {
            action.flows.push(Flow::with_outputs(vec!["bool_res".into()]));
        } else {
            action.flows.push(Flow::default());
        }
        ap.actions.push(action);
    }

    project.action_points.push(ap);
    project
}

fn linear_project() -> CachedProject {
    let mut project = project_with_actions(2);
    project.logic.push(LogicItem::new("l1", START, "ac1"));
    project.logic.push(LogicItem::new("l2", "ac1", "ac2"));
    project.logic.push(LogicItem::new("l3", "ac2", END));
    CachedProject::new(project).unwrap()
}

#[test]
fn test_linear_logic_passes() {
    let project = linear_project();
    check_for_loops(&project, None).unwrap();
}

#[test]
fn test_back_edge_is_a_loop() {
    let mut project = project_with_actions(2);
    project.logic.push(LogicItem::new("l1", START, "ac1"));
    project.logic.push(LogicItem::new("l2", "ac1", "ac2"));
    project.logic.push(LogicItem::new("l3", "ac2", "ac1"));
    let project = CachedProject::new(project).unwrap();

    let err = check_for_loops(&project, None).unwrap_err();
    assert!(matches!(err, Error::LoopDetected(_)));
}

#[test]
fn test_diamond_is_not_a_loop() {
    // ac1 branches to ac2/ac3 which both rejoin at ac4.
    let mut project = project_with_actions(4);
    project.logic.push(LogicItem::new("l1", START, "ac1"));
    project.logic.push(
        LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "true")),
    );
    project.logic.push(
        LogicItem::new("l3", "ac1", "ac3")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "false")),
    );
    project.logic.push(LogicItem::new("l4", "ac2", "ac4"));
    project.logic.push(LogicItem::new("l5", "ac3", "ac4"));
    project.logic.push(LogicItem::new("l6", "ac4", END));
    let project = CachedProject::new(project).unwrap();

    check_for_loops(&project, None).unwrap();
}

#[test]
fn test_unfinished_logic() {
    let mut project = project_with_actions(2);
    project.logic.push(LogicItem::new("l2", "ac1", "ac2"));
    let project = CachedProject::new(project).unwrap();

    let err = check_for_loops(&project, None).unwrap_err();
    assert!(matches!(err, Error::UnfinishedLogic));

    // An explicit starting action works without a START edge.
    check_for_loops(&project, Some("ac1")).unwrap();
}

#[test]
fn test_start_to_end_is_senseless() {
    let project = linear_project();
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", START, END),
    )
    .unwrap_err();
    assert!(matches!(err, Error::SenselessItem(_)));
}

#[test]
fn test_start_equals_end() {
    let project = linear_project();
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac1"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::StartEqualsEnd(_)));
}

#[test]
fn test_unknown_endpoints() {
    let project = linear_project();

    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac9", END),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownStart { .. }));

    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac9"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownEnd { .. }));
}

#[test]
fn test_unsupported_flow() {
    let project = linear_project();
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1/fancy", "ac2"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFlow(_)));
}

#[test]
fn test_condition_rules() {
    let mut project = project_with_actions(3);
    project.logic.push(LogicItem::new("l1", START, "ac1"));
    let project = CachedProject::new(project).unwrap();

    // A valid boolean condition, three-segment form.
    check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "true")),
    )
    .unwrap();

    // The legacy two-segment form is tolerated and means output zero.
    check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default", "true")),
    )
    .unwrap();

    // Unknown producing action.
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac9/default/0", "true")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownConditionAction { .. }));

    // Output index out of bounds.
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/1", "true")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingOutput { .. }));

    // Condition value must be a boolean.
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "42")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConditionValue(_)));
}

#[test]
fn test_condition_on_integer_output() {
    // get_int returns an integer, which can't be branched on.
    let mut project = Project::new("pro_1", "p1", "scn_1");
    let mut ap = ProjectActionPoint::new("acp_1", "ap1", Position::default());
    let mut ac1 = Action::new("ac1", "ac1", "obj_1/get_int");
    ac1.flows.push(Flow::with_outputs(vec!["res".into()]));
    ap.actions.push(ac1);
    let mut ac2 = Action::new("ac2", "ac2", "obj_1/test");
    ac2.flows.push(Flow::default());
    ap.actions.push(ac2);
    project.action_points.push(ap);
    let project = CachedProject::new(project).unwrap();

    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "true")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UncountableOutput(_)));
}

#[test]
fn test_duplicate_start_edge() {
    let project = linear_project();
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", START, "ac2"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateStart));
}

#[test]
fn test_conflicting_edges() {
    let mut project = project_with_actions(3);
    project.logic.push(LogicItem::new("l1", START, "ac1"));
    project.logic.push(
        LogicItem::new("l2", "ac1", "ac2")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "true")),
    );
    let project = CachedProject::new(project).unwrap();

    // Same start, same condition value.
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac3")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "true")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConflictingEdges(..)));

    // Same start, no condition on the new edge.
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac3"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConflictingEdges(..)));

    // A distinct value on the same output is fine.
    check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac3")
            .with_condition(ProjectLogicIf::new("ac1/default/0", "false")),
    )
    .unwrap();
}

#[test]
fn test_duplicate_edge() {
    let project = linear_project();
    let err = check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l9", "ac1", "ac2"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::ConflictingEdges(..) | Error::DuplicateEdge(..)
    ));
}

#[test]
fn test_updating_existing_item_is_allowed() {
    let project = linear_project();
    // Same id as the existing edge: an update, not a conflict.
    check_logic_item(
        &types(),
        &scene(),
        &project,
        &LogicItem::new("l2", "ac1", "ac2"),
    )
    .unwrap();
}

#[test]
fn test_check_flows() {
    let project = linear_project();
    let meta = ObjectAction::new("test").with_returns(vec!["boolean".into()]);

    let mut ok = Action::new("ac9", "ac9", "obj_1/test");
    ok.flows.push(Flow::with_outputs(vec!["fresh".into()]));
    check_flows(&project, &ok, &meta).unwrap();

    // No outputs at all is fine.
    let mut bare = Action::new("ac9", "ac9", "obj_1/test");
    bare.flows.push(Flow::default());
    check_flows(&project, &bare, &meta).unwrap();

    // Arity mismatch.
    let mut two = Action::new("ac9", "ac9", "obj_1/test");
    two.flows
        .push(Flow::with_outputs(vec!["a".into(), "b".into()]));
    assert!(matches!(
        check_flows(&project, &two, &meta),
        Err(Error::OutputCountMismatch(_))
    ));

    // Output name collides with ac1's output.
    let mut taken = Action::new("ac9", "ac9", "obj_1/test");
    taken.flows.push(Flow::with_outputs(vec!["bool_res".into()]));
    assert!(matches!(
        check_flows(&project, &taken, &meta),
        Err(Error::DuplicateOutput(_))
    ));

    // Output names must be identifiers.
    let mut invalid = Action::new("ac9", "ac9", "obj_1/test");
    invalid.flows.push(Flow::with_outputs(vec!["not valid".into()]));
    assert!(matches!(
        check_flows(&project, &invalid, &meta),
        Err(Error::InvalidOutputIdentifier(_))
    ));
}

#[test]
fn test_check_ap_parent() {
    let scene = scene();
    let project = linear_project();

    check_ap_parent(&scene, &project, "acp_9", None).unwrap();
    check_ap_parent(&scene, &project, "acp_9", Some("obj_1")).unwrap();
    check_ap_parent(&scene, &project, "acp_9", Some("acp_1")).unwrap();

    let err = check_ap_parent(&scene, &project, "acp_9", Some("obj_2")).unwrap_err();
    assert!(matches!(err, Error::InvalidApParent { .. }));

    let err = check_ap_parent(&scene, &project, "acp_9", Some("nope")).unwrap_err();
    assert!(matches!(err, Error::InvalidApParent { .. }));
}

#[test]
fn test_check_project_parameter() {
    let project = linear_project();

    check_project_parameter(
        &project,
        &ProjectParameter::new("pps_1", "int_const", "integer", "1234"),
    )
    .unwrap();

    let err = check_project_parameter(
        &project,
        &ProjectParameter::new("pps_1", "not valid", "integer", "1234"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameterName(_)));

    let err = check_project_parameter(
        &project,
        &ProjectParameter::new("pps_1", "int_const", "pose", "[1]"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NonPrimitiveParameter(_)));
}

#[test]
fn test_function_as_logic_container() {
    // Functions carry their own actions and logic.
    let mut function = models::ProjectFunction {
        id: "fun_1".into(),
        name: "pick_and_place".into(),
        actions: Vec::new(),
        logic: Vec::new(),
        parameters: Vec::new(),
        returns: Vec::new(),
    };

    for index in 1..=2 {
        let mut action = Action::new(format!("ac{index}"), format!("ac{index}"), "obj_1/test");
        action.flows.push(Flow::default());
        function.actions.push(action);
    }
    function.logic.push(LogicItem::new("l1", START, "ac1"));
    function.logic.push(LogicItem::new("l2", "ac1", "ac2"));
    function.logic.push(LogicItem::new("l3", "ac2", END));

    check_for_loops(&function, None).unwrap();

    function.logic.push(LogicItem::new("l4", "ac2", "ac1"));
    let err = check_for_loops(&function, None).unwrap_err();
    assert!(matches!(err, Error::LoopDetected(_)));
}

#[test]
fn test_project_problems() {
    let project = linear_project();
    assert!(project_problems(&types(), &scene(), &project).is_empty());

    // A project naming the wrong scene is reported immediately.
    let mut other = project_with_actions(1);
    other.scene_id = "scn_other".into();
    other.logic.push(LogicItem::new("l1", START, "ac1"));
    other.logic.push(LogicItem::new("l2", "ac1", END));
    let other = CachedProject::new(other).unwrap();
    assert_eq!(
        project_problems(&types(), &scene(), &other),
        vec!["Project/scene mismatch.".to_string()]
    );

    // Unknown robots behind joints are reported.
    let mut p = project_with_actions(1);
    p.logic.push(LogicItem::new("l1", START, "ac1"));
    p.logic.push(LogicItem::new("l2", "ac1", END));
    p.action_points[0].robot_joints.push(
        models::ProjectRobotJoints::new("joi_1", "home", "obj_missing", vec![]),
    );
    let p = CachedProject::new(p).unwrap();
    let problems = project_problems(&types(), &scene(), &p);
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("unknown robot"));
}
