use std::collections::{BTreeMap, BTreeSet};

use cache::{CachedProject, CachedScene};
use models::{Action, FlowKind, LogicItem, ParameterKind, TypesMap, END, START};
use params::find_object_action;
use pyast::{render_stmts, Expr, Stmt};

use crate::action_points::ApReferences;
use crate::Error;

/// Emits the deterministic Python program executing a project: equal
/// projects produce byte-identical output.
pub fn program_src(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
) -> Result<String, Error> {
    Ok(Emitter::new(types, scene, project).emit()?.0)
}

/// Emission result: the program text plus the action points its body
/// references, which drive the companion `action_points.py`.
pub(crate) fn emit_with_references(
    types: &TypesMap,
    scene: &CachedScene,
    project: &CachedProject,
) -> Result<(String, ApReferences), Error> {
    Emitter::new(types, scene, project).emit()
}

pub(crate) struct Emitter<'a> {
    types: &'a TypesMap,
    scene: &'a CachedScene,
    project: &'a CachedProject,
    outgoing: BTreeMap<&'a str, Vec<&'a LogicItem>>,
    in_degree: BTreeMap<&'a str, usize>,
    start_edge: Option<&'a LogicItem>,
    /// Variables bound so far: object names, parameter names, outputs.
    declared: BTreeSet<String>,
    references: ApReferences,
}

impl<'a> Emitter<'a> {
    fn new(types: &'a TypesMap, scene: &'a CachedScene, project: &'a CachedProject) -> Self {
        let mut outgoing: BTreeMap<&str, Vec<&LogicItem>> = BTreeMap::new();
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut start_edge = None;

        for item in project.logic() {
            if item.start == START {
                start_edge = Some(item);
                continue;
            }
            if let Ok((start_action, _flow)) = item.parse_start() {
                outgoing.entry(start_action).or_default().push(item);
            }
            if item.end != END {
                *in_degree.entry(item.end.as_str()).or_default() += 1;
            }
        }

        Emitter {
            types,
            scene,
            project,
            outgoing,
            in_degree,
            start_edge,
            declared: BTreeSet::new(),
            references: ApReferences::default(),
        }
    }

    fn emit(mut self) -> Result<(String, ApReferences), Error> {
        let imports = self.import_stmts()?;
        let mut main_body = self.header_stmts()?;

        let mut while_body = self.loop_body()?;
        while_body.push(Stmt::Continue);

        main_body.push(Stmt::While {
            test: Expr::Bool(true),
            body: while_body,
        });

        let mut out = String::new();
        out.push_str("#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\n");
        out.push_str(&render_stmts(&imports, 0));
        out.push_str("\n\n");
        out.push_str(&render_stmts(
            &[Stmt::FunctionDef {
                name: "main".into(),
                args: vec![("res".into(), Some("Resources".into()))],
                returns: Some("None".into()),
                body: main_body,
            }],
            0,
        ));
        out.push_str("\n\n");
        out.push_str(&render_stmts(&[main_harness()], 0));

        tracing::debug!(project = %self.project.id, bytes = out.len(), "program emitted");
        Ok((out, self.references))
    }

    /// One import per object type used in the scene, then the runtime
    /// scaffolding imports.
    fn import_stmts(&self) -> Result<Vec<Stmt>, Error> {
        let mut stmts = Vec::new();
        let mut seen = BTreeSet::new();

        for obj in self.scene.objects() {
            if !self.types.contains_key(&obj.type_) {
                return Err(Error::UnknownObjectType(obj.type_.clone()));
            }
            if seen.insert(obj.type_.clone()) {
                stmts.push(Stmt::ImportFrom {
                    module: format!("object_types.{}", to_snake_case(&obj.type_)),
                    names: vec![obj.type_.clone()],
                });
            }
        }

        stmts.push(Stmt::ImportFrom {
            module: "action_points".into(),
            names: vec!["ActionPoints".into()],
        });
        stmts.push(Stmt::ImportFrom {
            module: "arcor2_runtime.resources".into(),
            names: vec!["Resources".into()],
        });
        stmts.push(Stmt::ImportFrom {
            module: "arcor2_runtime.exceptions".into(),
            names: vec!["print_exception".into()],
        });
        Ok(stmts)
    }

    /// `aps`, object and project-parameter bindings at the top of main.
    fn header_stmts(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut stmts = vec![Stmt::Assign {
            targets: vec!["aps".into()],
            value: Expr::call(Expr::name("ActionPoints"), vec![Expr::name("res")], vec![]),
        }];

        for obj in self.scene.objects() {
            stmts.push(Stmt::AnnAssign {
                target: obj.name.clone(),
                annotation: obj.type_.clone(),
                value: Expr::Subscript {
                    value: Box::new(Expr::attribute(Expr::name("res"), "objects")),
                    index: Box::new(Expr::Str(obj.id.clone())),
                },
            });
            self.declared.insert(obj.name.clone());
        }

        for parameter in self.project.parameters() {
            let value = serde_json::from_str::<serde_json::Value>(&parameter.value)
                .ok()
                .as_ref()
                .and_then(Expr::from_json)
                .ok_or_else(|| Error::InvalidParameterValue(parameter.name.clone()))?;
            stmts.push(Stmt::Assign {
                targets: vec![parameter.name.clone()],
                value,
            });
            self.declared.insert(parameter.name.clone());
        }

        Ok(stmts)
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, Error> {
        let Some(start_edge) = self.start_edge else {
            if self.project.logic().next().is_some() {
                return Err(Error::UnfinishedLogic);
            }
            return Ok(Vec::new());
        };

        if start_edge.end == END {
            return Ok(Vec::new());
        }

        // The walk below assumes an acyclic graph.
        validation::check_for_loops(self.project, None)?;

        let first = self.project.action(&start_edge.end)?.id.clone();
        let (stmts, pending) = self.walk(&first)?;

        if let Some(join) = pending.keys().next() {
            return Err(Error::DivergentBranches(join.to_string()));
        }
        Ok(stmts)
    }

    fn in_degree(&self, action_id: &str) -> usize {
        self.in_degree.get(action_id).copied().unwrap_or(0)
    }

    fn outgoing(&self, action_id: &str) -> Vec<&'a LogicItem> {
        self.outgoing.get(action_id).cloned().unwrap_or_default()
    }

    /// Walks a chain of vertices, emitting each action once. A vertex
    /// with several incoming edges (a join) is not entered until every
    /// edge into it has been seen within one subtree; partially-seen
    /// joins bubble up through `pending` until some level owns them all.
    fn walk(
        &mut self,
        start: &str,
    ) -> Result<(Vec<Stmt>, BTreeMap<String, usize>), Error> {
        let mut stmts = Vec::new();
        let mut pending: BTreeMap<String, usize> = BTreeMap::new();
        let mut cursor: Option<String> = Some(start.to_string());

        loop {
            let vertex = match cursor.take() {
                Some(vertex) => vertex,
                None => {
                    let full: Vec<String> = pending
                        .iter()
                        .filter(|(id, count)| **count >= self.in_degree(id))
                        .map(|(id, _)| id.clone())
                        .collect();
                    match full.as_slice() {
                        [] => break,
                        [join] => {
                            let join = join.clone();
                            pending.remove(&join);
                            join
                        }
                        _ => return Err(Error::DivergentBranches(full[0].clone())),
                    }
                }
            };

            let action = self.project.action(&vertex)?.clone();
            stmts.push(self.call_stmt(&action)?);

            let edges = self.outgoing(&vertex);
            if edges.is_empty() {
                return Err(Error::NoOutputs(action.name.clone()));
            }

            if edges.len() == 1 && edges[0].condition.is_none() {
                let end = edges[0].end.as_str();
                if end == END {
                    // The loop tail re-enters the program.
                } else if self.in_degree(end) <= 1 {
                    cursor = Some(end.to_string());
                } else {
                    *pending.entry(end.to_string()).or_default() += 1;
                }
                continue;
            }

            if edges.iter().any(|edge| edge.condition.is_none()) {
                return Err(Error::MixedOutputs(action.name.clone()));
            }

            // Branch bodies in descending condition-value order, so that
            // equal projects render identically.
            let mut edges = edges;
            edges.sort_by(|a, b| {
                let (a, b) = (a.condition.as_ref().unwrap(), b.condition.as_ref().unwrap());
                b.value.cmp(&a.value)
            });

            let mut arms = Vec::new();
            for edge in edges {
                let condition = edge.condition.as_ref().unwrap();
                let what = condition.parse_what()?;

                let producer = self.project.action(&what.action_id)?;
                let variable = producer
                    .flow(what.flow)
                    .ok()
                    .and_then(|flow| flow.outputs.get(what.output_index))
                    .ok_or_else(|| Error::MissingOutput {
                        action: producer.name.clone(),
                        index: what.output_index,
                    })?
                    .clone();
                if !self.declared.contains(&variable) {
                    return Err(Error::UnresolvedVariable(variable));
                }

                let value = serde_json::from_str::<serde_json::Value>(&condition.value)
                    .ok()
                    .as_ref()
                    .and_then(Expr::from_json)
                    .ok_or_else(|| Error::InvalidConditionValue(condition.value.clone()))?;
                let test = Expr::Compare {
                    left: Box::new(Expr::name(variable)),
                    right: Box::new(value),
                };

                let body = if edge.end == END {
                    vec![Stmt::Continue]
                } else if self.in_degree(&edge.end) > 1 {
                    *pending.entry(edge.end.clone()).or_default() += 1;
                    Vec::new()
                } else {
                    let (body, sub_pending) = self.walk(&edge.end)?;
                    for (join, count) in sub_pending {
                        *pending.entry(join).or_default() += count;
                    }
                    body
                };

                arms.push((test, body));
            }
            stmts.push(Stmt::If { arms });
        }

        Ok((stmts, pending))
    }

    /// The call for one action, as an expression statement or an output
    /// assignment. Arguments follow the declared parameter order.
    fn call_stmt(&mut self, action: &Action) -> Result<Stmt, Error> {
        let meta = find_object_action(self.types, self.scene, action)?;
        let (obj_id, method) = action.parse_type()?;
        let obj_name = self.scene.object(obj_id)?.name.clone();

        let mut args = Vec::new();
        for declared in &meta.parameters {
            let parameter = action.parameter(&declared.name)?;

            let expr = match ParameterKind::from_type(&parameter.type_) {
                Some(ParameterKind::ProjectParameter) => {
                    let id = parameter.str_from_value()?;
                    Expr::name(self.project.parameter(&id)?.name.clone())
                }
                Some(ParameterKind::Link) => {
                    let link = parameter.parse_link()?;
                    let producer = self.project.action(&link.action_id)?;
                    let variable = producer
                        .flow(link.flow)
                        .ok()
                        .and_then(|flow| flow.outputs.get(link.output_index))
                        .ok_or_else(|| Error::MissingOutput {
                            action: producer.name.clone(),
                            index: link.output_index,
                        })?;
                    if !self.declared.contains(variable) {
                        return Err(Error::UnresolvedVariable(variable.clone()));
                    }
                    Expr::name(variable.clone())
                }
                None => {
                    let plugin = params::registry().by_name(&parameter.type_)?;
                    let expr = plugin.emit_expr(
                        self.types,
                        self.scene,
                        self.project,
                        &action.id,
                        &parameter.name,
                    )?;
                    self.references.record(&expr);
                    expr
                }
            };
            args.push(expr);
        }

        let call = Expr::call(
            Expr::attribute(Expr::name(obj_name), method),
            args,
            vec![("an".into(), Expr::Str(action.name.clone()))],
        );

        let outputs = action
            .flow(FlowKind::Default)
            .map(|flow| flow.outputs.clone())
            .unwrap_or_default();

        if outputs.is_empty() {
            Ok(Stmt::Expr(call))
        } else {
            for output in &outputs {
                self.declared.insert(output.clone());
            }
            Ok(Stmt::Assign {
                targets: outputs,
                value: call,
            })
        }
    }
}

/// The `if __name__ == '__main__':` harness closing every program.
fn main_harness() -> Stmt {
    Stmt::If {
        arms: vec![(
            Expr::Compare {
                left: Box::new(Expr::name("__name__")),
                right: Box::new(Expr::Str("__main__".into())),
            },
            vec![Stmt::Try {
                body: vec![Stmt::With {
                    item: Expr::call(Expr::name("Resources"), vec![], vec![]),
                    bind: "res".into(),
                    body: vec![Stmt::Expr(Expr::call(
                        Expr::name("main"),
                        vec![Expr::name("res")],
                        vec![],
                    ))],
                }],
                exception: "Exception".into(),
                bind: "e".into(),
                handler: vec![Stmt::Expr(Expr::call(
                    Expr::name("print_exception"),
                    vec![Expr::name("e")],
                    vec![],
                ))],
            }],
        )],
    }
}

/// `PascalCase` type names become `snake_case` module names.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let chars: Vec<char> = name.chars().collect();

    for (index, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = index > 0 && chars[index - 1].is_lowercase();
            let next_lower = index + 1 < chars.len() && chars[index + 1].is_lowercase();
            if index > 0 && (prev_lower || (chars[index - 1].is_uppercase() && next_lower)) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(*ch);
        }
    }
    out
}
