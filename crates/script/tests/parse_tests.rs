mod common;

use cache::CachedProject;
use common::{assert_equivalent, scene, types};
use models::{
    Action, ActionParameter, Flow, Joint, LogicItem, NamedOrientation, Orientation, ParameterKind,
    Position, Project, ProjectActionPoint, ProjectLogicIf, ProjectParameter, ProjectRobotJoints,
    END, START,
};
use script::{parse_script, program_src, Error};

const HEAD: &str = "\
#!/usr/bin/env python3
# -*- coding: utf-8 -*-

from object_types.test import Test
from action_points import ActionPoints
from arcor2_runtime.resources import Resources
from arcor2_runtime.exceptions import print_exception";

const MAIN: &str = "\
def main(res: Resources) -> None:
    aps = ActionPoints(res)
    test_name: Test = res.objects['obj_1']";

const TAIL: &str = "\
if __name__ == '__main__':
    try:
        with Resources() as res:
            main(res)
    except Exception as e:
        print_exception(e)";

fn script(body: &str) -> String {
    format!("{HEAD}\n\n\n{MAIN}\n{body}\n\n\n{TAIL}\n")
}

fn base_project() -> Project {
    let mut project = Project::new("pro_1", "p1", "scn_1");
    let mut ap = ProjectActionPoint::new("acp_1", "ap1", Position::new(1.1, 0.0, -1.1));
    ap.orientations.push(NamedOrientation::new(
        "ori_1",
        "grasp",
        Orientation::default(),
    ));
    ap.robot_joints.push(ProjectRobotJoints::new(
        "joi_1",
        "home",
        "obj_1",
        vec![Joint::new("joint_1", 0.5)],
    ));
    project.action_points.push(ap);
    project
}

#[test]
fn test_parse_continue_only() {
    let mut expected = base_project();
    expected.logic.push(LogicItem::new("l1", START, END));

    let source = script("    while True:\n        continue");
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    assert_equivalent(&expected, &parsed);
    CachedProject::new(parsed).unwrap();
}

#[test]
fn test_parse_linear_calls() {
    let mut expected = base_project();
    let mut ac1 = Action::new("ac1", "ac1", "obj_1/test");
    ac1.flows.push(Flow::default());
    expected.action_points[0].actions.push(ac1);
    let mut ac2 = Action::new("ac2", "ac2", "obj_1/test");
    ac2.flows.push(Flow::default());
    expected.action_points[0].actions.push(ac2);
    expected.logic.push(LogicItem::new("l1", START, "ac1"));
    expected.logic.push(LogicItem::new("l2", "ac1", "ac2"));
    expected.logic.push(LogicItem::new("l3", "ac2", END));

    let source = script(
        "    while True:\n        test_name.test(an='ac1')\n        test_name.test(an='ac2')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    assert_equivalent(&expected, &parsed);
}

#[test]
fn test_parse_statements_after_continue_are_dead() {
    let source = script(
        "    while True:\n        test_name.test(an='ac1')\n        continue\n        test_name.test(an='ac2')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    let actions: usize = parsed
        .action_points
        .iter()
        .map(|ap| ap.actions.len())
        .sum();
    assert_eq!(actions, 1);
    assert_eq!(parsed.logic.len(), 2);
}

#[test]
fn test_parse_project_parameter() {
    let mut expected = base_project();
    expected
        .parameters
        .push(ProjectParameter::new("pps_1", "int_const", "integer", "1234"));
    let mut ac1 = Action::new("ac1", "ac1", "obj_1/test_par");
    ac1.parameters.push(ActionParameter::new(
        "param",
        ParameterKind::PROJECT_PARAMETER,
        "\"pps_1\"",
    ));
    ac1.flows.push(Flow::default());
    expected.action_points[0].actions.push(ac1);
    expected.logic.push(LogicItem::new("l1", START, "ac1"));
    expected.logic.push(LogicItem::new("l2", "ac1", END));

    let source = script(
        "    int_const = 1234\n    while True:\n        test_name.test_par(int_const, an='ac1')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    assert_eq!(parsed.parameters.len(), 1);
    assert_eq!(parsed.parameters[0].name, "int_const");
    assert_eq!(parsed.parameters[0].type_, "integer");
    assert_eq!(parsed.parameters[0].value, "1234");
    assert_equivalent(&expected, &parsed);
}

#[test]
fn test_parse_literal_argument() {
    let source = script("    while True:\n        test_name.test_par(5, an='ac1')");
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    let action = &parsed.action_points[0].actions[0];
    assert_eq!(action.parameters[0].type_, "integer");
    assert_eq!(action.parameters[0].value, "5");
}

#[test]
fn test_parse_previous_result() {
    let source = script(
        "    while True:\n        res = test_name.get_int(an='ac1')\n        test_name.test_par(res, an='ac2')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    let ac1 = &parsed.action_points[0].actions[0];
    assert_eq!(ac1.flows[0].outputs, vec!["res".to_string()]);

    let ac2 = &parsed.action_points[0].actions[1];
    assert_eq!(ac2.parameters[0].type_, ParameterKind::LINK);
    let link = ac2.parameters[0].parse_link().unwrap();
    assert_eq!(link.action_id, ac1.id);
    assert_eq!(link.output_index, 0);
}

#[test]
fn test_parse_action_point_references() {
    let source = script(
        "    while True:\n        test_name.test_pose(aps.ap1.poses.grasp, an='ac1')\n        test_name.test_joints(aps.ap1.joints.home, an='ac2')\n        test_name.test_position(aps.ap1.position, an='ac3')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    let actions = &parsed.action_points[0].actions;
    assert_eq!(actions[0].parameters[0].type_, "pose");
    assert_eq!(actions[0].parameters[0].value, "\"ori_1\"");
    assert_eq!(actions[1].parameters[0].type_, "joints");
    assert_eq!(actions[1].parameters[0].value, "\"joi_1\"");
    assert_eq!(actions[2].parameters[0].type_, "position");
    assert_eq!(actions[2].parameters[0].value, "\"acp_1\"");
}

#[test]
fn test_parse_enum_member() {
    let source =
        script("    while True:\n        test_name.tests_class_value(TestEnum.CLASS1, an='ac1')");
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    let action = &parsed.action_points[0].actions[0];
    assert_eq!(action.parameters[0].type_, "string_enum");
    assert_eq!(action.parameters[0].value, "\"1\"");
}

#[test]
fn test_parse_branches() {
    let source = script(
        "    while True:
        bool_res = test_name.test(an='ac1')
        if bool_res == True:
            test_name.test(an='ac2')
        elif bool_res == False:
            test_name.test(an='ac3')
        test_name.test(an='ac4')",
    );
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    assert_eq!(parsed.logic.len(), 6);
    let conditional: Vec<&LogicItem> = parsed
        .logic
        .iter()
        .filter(|item| item.condition.is_some())
        .collect();
    assert_eq!(conditional.len(), 2);

    let ac1_id = parsed.action_points[0].actions[0].id.clone();
    for item in conditional {
        let condition = item.condition.as_ref().unwrap();
        assert_eq!(condition.what, format!("{ac1_id}/default/0"));
        let (start_id, _) = item.parse_start().unwrap();
        assert_eq!(start_id, ac1_id);
    }

    // Both branch targets converge on ac4, which then exits.
    CachedProject::new(parsed).unwrap();
}

#[test]
fn test_parse_rejects_unknown_variable() {
    let source = script("    while True:\n        test_name.test_par(mystery, an='ac1')");
    let err = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap_err();
    assert!(matches!(err, Error::PyShape { .. }));
}

#[test]
fn test_parse_rejects_malformed_shapes() {
    // A bare expression that is not a call.
    let source = script("    while True:\n        1 + 1");
    assert!(matches!(
        parse_script(&base_project(), &scene(), &types(), &source, None),
        Err(Error::PyShape { .. })
    ));

    // A condition with more than one comparison operand.
    let source = script(
        "    while True:\n        bool_res = test_name.test(an='ac1')\n        if bool_res == True == False:\n            continue",
    );
    assert!(matches!(
        parse_script(&base_project(), &scene(), &types(), &source, None),
        Err(Error::PyShape { .. })
    ));

    // A branch on something that is not an action output.
    let source = script(
        "    while True:\n        test_name.test(an='ac1')\n        if mystery == True:\n            continue",
    );
    assert!(matches!(
        parse_script(&base_project(), &scene(), &types(), &source, None),
        Err(Error::PyShape { .. })
    ));

    // A call without the an= keyword.
    let source = script("    while True:\n        test_name.test()");
    assert!(matches!(
        parse_script(&base_project(), &scene(), &types(), &source, None),
        Err(Error::PyShape { .. })
    ));

    // No while loop at all.
    let source = script("    test_name.test(an='ac1')");
    assert!(matches!(
        parse_script(&base_project(), &scene(), &types(), &source, None),
        Err(Error::PyShape { .. })
    ));
}

/// Emitted programs parse back into logically equivalent projects.
#[test]
fn test_round_trip() {
    let mut project = base_project();
    project
        .parameters
        .push(ProjectParameter::new("pps_1", "int_const", "integer", "1234"));

    let mut ac1 = Action::new("ac1", "ac1", "obj_1/test");
    ac1.flows.push(Flow::with_outputs(vec!["bool_res".into()]));
    project.action_points[0].actions.push(ac1);

    let mut ac2 = Action::new("ac2", "ac2", "obj_1/test_par");
    ac2.parameters.push(ActionParameter::new(
        "param",
        ParameterKind::PROJECT_PARAMETER,
        "\"pps_1\"",
    ));
    ac2.flows.push(Flow::default());
    project.action_points[0].actions.push(ac2);

    let mut ac3 = Action::new("ac3", "ac3", "obj_1/test_pose");
    ac3.parameters
        .push(ActionParameter::new("param", "pose", "\"ori_1\""));
    ac3.flows.push(Flow::default());
    project.action_points[0].actions.push(ac3);

    let mut ac4 = Action::new("ac4", "ac4", "obj_1/get_int");
    ac4.flows.push(Flow::with_outputs(vec!["res".into()]));
    project.action_points[0].actions.push(ac4);

    let mut ac5 = Action::new("ac5", "ac5", "obj_1/test_par");
    ac5.parameters.push(ActionParameter::new(
        "param",
        ParameterKind::LINK,
        "\"ac4/default/0\"",
    ));
    ac5.flows.push(Flow::default());
    project.action_points[0].actions.push(ac5);

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
    project.logic.push(LogicItem::new("l6", "ac4", "ac5"));
    project.logic.push(LogicItem::new("l7", "ac5", END));

    let cached = CachedProject::new(project.clone()).unwrap();
    let source = program_src(&types(), &scene(), &cached).unwrap();
    let parsed = parse_script(&base_project(), &scene(), &types(), &source, None).unwrap();

    assert_equivalent(&project, &parsed);

    // The parsed project is valid and emits the very same program.
    let reparsed = CachedProject::new(parsed).unwrap();
    validation::check_for_loops(&reparsed, None).unwrap();
    assert_eq!(program_src(&types(), &scene(), &reparsed).unwrap(), source);
}
