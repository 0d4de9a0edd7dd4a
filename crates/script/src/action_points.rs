use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use cache::{CachedProject, CachedScene};
use models::TypesMap;
use pyast::Expr;

use crate::emit::emit_with_references;
use crate::Error;

/// Action points referenced from an emitted program body, keyed by
/// action-point name.
#[derive(Debug, Default)]
pub(crate) struct ApReferences {
    by_ap: BTreeMap<String, ApReference>,
}

#[derive(Debug, Default)]
struct ApReference {
    poses: BTreeSet<String>,
    joints: BTreeSet<String>,
}

impl ApReferences {
    /// Records every `aps.<ap>...` attribute path found in an argument
    /// expression.
    pub fn record(&mut self, expr: &Expr) {
        match expr {
            Expr::Attribute { .. } => {
                if let Some((ap, kind, name)) = match_aps_chain(expr) {
                    let entry = self.by_ap.entry(ap.to_string()).or_default();
                    match (kind, name) {
                        ("position", None) => {}
                        ("poses", Some(name)) => {
                            entry.poses.insert(name.to_string());
                        }
                        ("joints", Some(name)) => {
                            entry.joints.insert(name.to_string());
                        }
                        _ => {}
                    }
                }
            }
            Expr::List(items) => {
                for item in items {
                    self.record(item);
                }
            }
            Expr::Call { args, keywords, .. } => {
                for arg in args {
                    self.record(arg);
                }
                for (_, value) in keywords {
                    self.record(value);
                }
            }
            _ => {}
        }
    }

    fn is_empty(&self) -> bool {
        self.by_ap.is_empty()
    }
}

/// Matches `aps.<ap>.position`, `aps.<ap>.poses.<name>` and
/// `aps.<ap>.joints.<name>` chains.
fn match_aps_chain(expr: &Expr) -> Option<(&str, &str, Option<&str>)> {
    let Expr::Attribute { value, attr } = expr else {
        return None;
    };

    match value.as_ref() {
        // aps.<ap>.position
        Expr::Attribute {
            value: root,
            attr: ap,
        } if attr.as_str() == "position"
            && matches!(root.as_ref(), Expr::Name(name) if name.as_str() == "aps") =>
        {
            Some((ap, "position", None))
        }
        // aps.<ap>.<poses|joints>.<name>
        Expr::Attribute {
            value: inner,
            attr: kind,
        } if kind.as_str() == "poses" || kind.as_str() == "joints" => match inner.as_ref() {
            Expr::Attribute {
                value: root,
                attr: ap,
            } if matches!(root.as_ref(), Expr::Name(name) if name.as_str() == "aps") => {
                Some((ap, kind.as_str(), Some(attr)))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Emits the companion `action_points.py`: one class per action point
/// the program body references, each property returning a deep copy of
/// the underlying value from the resource bundle.
pub fn action_points_src(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
) -> Result<String, Error> {
    let (_script, references) = emit_with_references(types, scene, project)?;

    let any_poses = references.by_ap.values().any(|r| !r.poses.is_empty());
    let any_joints = references.by_ap.values().any(|r| !r.joints.is_empty());

    let mut out = String::new();
    out.push_str("#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\n");

    let mut data_imports = vec!["Position"];
    if any_poses {
        data_imports.insert(0, "Pose");
    }
    if any_joints {
        data_imports.push("ProjectRobotJoints");
    }
    writeln!(out, "from arcor2.data.common import {}", data_imports.join(", ")).unwrap();
    out.push_str("from copy import deepcopy\n");
    out.push_str("from arcor2_runtime.resources import Resources\n");

    for (ap_name, reference) in &references.by_ap {
        let ap = project
            .action_points()
            .find(|ap| &ap.name == ap_name)
            .ok_or_else(|| Error::UnresolvedVariable(ap_name.clone()))?;

        if !reference.poses.is_empty() {
            render_member_class(
                &mut out,
                &format!("{ap_name}_poses"),
                "Pose",
                reference.poses.iter().map(|name| {
                    let id = project
                        .ap_orientations(&ap.id)
                        .find(|ori| &ori.name == name)
                        .map(|ori| ori.id.clone())
                        .unwrap_or_default();
                    (name.clone(), format!("res.project.pose('{id}')"))
                }),
            );
        }

        if !reference.joints.is_empty() {
            render_member_class(
                &mut out,
                &format!("{ap_name}_joints"),
                "ProjectRobotJoints",
                reference.joints.iter().map(|name| {
                    let id = project
                        .ap_joints(&ap.id)
                        .find(|joints| &joints.name == name)
                        .map(|joints| joints.id.clone())
                        .unwrap_or_default();
                    (name.clone(), format!("res.project.joints('{id}')"))
                }),
            );
        }

        out.push_str("\n\n");
        writeln!(out, "class {ap_name}:").unwrap();
        out.push('\n');
        out.push_str("    def __init__(self, res: Resources):\n");
        writeln!(
            out,
            "        self._position = res.project.bare_action_point('{}').position",
            ap.id
        )
        .unwrap();
        if !reference.poses.is_empty() {
            writeln!(out, "        self.poses = {ap_name}_poses(res)").unwrap();
        }
        if !reference.joints.is_empty() {
            writeln!(out, "        self.joints = {ap_name}_joints(res)").unwrap();
        }
        out.push('\n');
        out.push_str("    @property\n");
        out.push_str("    def position(self) -> Position:\n");
        out.push_str("        return deepcopy(self._position)\n");
    }

    out.push_str("\n\n");
    out.push_str("class ActionPoints:\n\n");
    out.push_str("    def __init__(self, res: Resources):\n");
    if references.is_empty() {
        out.push_str("        pass\n");
    } else {
        for ap_name in references.by_ap.keys() {
            writeln!(out, "        self.{ap_name} = {ap_name}(res)").unwrap();
        }
    }

    Ok(out)
}

/// A `<ap>_poses` / `<ap>_joints` helper class: one deep-copy property
/// per referenced member.
fn render_member_class(
    out: &mut String,
    class_name: &str,
    annotation: &str,
    members: impl Iterator<Item = (String, String)>,
) {
    out.push_str("\n\n");
    writeln!(out, "class {class_name}:").unwrap();
    out.push('\n');
    out.push_str("    def __init__(self, res: Resources):\n");

    let members: Vec<(String, String)> = members.collect();
    for (name, init) in &members {
        writeln!(out, "        self._{name} = {init}").unwrap();
    }
    for (name, _) in &members {
        out.push('\n');
        out.push_str("    @property\n");
        writeln!(out, "    def {name}(self) -> {annotation}:").unwrap();
        writeln!(out, "        return deepcopy(self._{name})").unwrap();
    }
}
