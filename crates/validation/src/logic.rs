use std::collections::{BTreeMap, BTreeSet};

use cache::{CachedProject, CachedScene};
use models::{Action, FlowKind, LogicItem, ProjectFunction, TypesMap, END, START};
use params::{find_object_action, registry, ValueKind};

use crate::Error;

/// Anything holding actions connected by logic items: a whole project,
/// or one of its functions.
pub trait LogicContainer {
    fn find_action(&self, action_id: &str) -> Option<&Action>;
    fn iter_actions(&self) -> Box<dyn Iterator<Item = &Action> + '_>;
    fn iter_logic(&self) -> Box<dyn Iterator<Item = &LogicItem> + '_>;
}

impl LogicContainer for CachedProject {
    fn find_action(&self, action_id: &str) -> Option<&Action> {
        self.action(action_id).ok()
    }
    fn iter_actions(&self) -> Box<dyn Iterator<Item = &Action> + '_> {
        Box::new(self.actions())
    }
    fn iter_logic(&self) -> Box<dyn Iterator<Item = &LogicItem> + '_> {
        Box::new(self.logic())
    }
}

impl LogicContainer for ProjectFunction {
    fn find_action(&self, action_id: &str) -> Option<&Action> {
        self.action(action_id)
    }
    fn iter_actions(&self) -> Box<dyn Iterator<Item = &Action> + '_> {
        Box::new(self.actions.iter())
    }
    fn iter_logic(&self) -> Box<dyn Iterator<Item = &LogicItem> + '_> {
        Box::new(self.logic.iter())
    }
}

/// The logic items of a container indexed as a graph over action ids.
pub struct FlowGraph<'c> {
    actions: BTreeMap<&'c str, &'c Action>,
    outgoing: BTreeMap<&'c str, Vec<&'c LogicItem>>,
    /// The unique edge leaving START, when present.
    pub first: Option<&'c LogicItem>,
}

impl<'c> FlowGraph<'c> {
    pub fn new(container: &'c dyn LogicContainer) -> Result<Self, Error> {
        let mut actions: BTreeMap<&str, &Action> = BTreeMap::new();
        for action in container.iter_actions() {
            actions.insert(&action.id, action);
        }

        let mut outgoing: BTreeMap<&str, Vec<&LogicItem>> = BTreeMap::new();
        let mut first = None;

        for item in container.iter_logic() {
            if item.start == START {
                if first.is_some() {
                    return Err(Error::DuplicateStart);
                }
                first = Some(item);
                continue;
            }

            let (start_action, flow) = parse_start(item)?;
            if flow != FlowKind::Default {
                return Err(Error::UnsupportedFlow(flow.to_string()));
            }
            if !actions.contains_key(start_action) {
                return Err(Error::UnknownStart {
                    item: item.id.clone(),
                    action: start_action.to_string(),
                });
            }
            if item.end != END && !actions.contains_key(item.end.as_str()) {
                return Err(Error::UnknownEnd {
                    item: item.id.clone(),
                    action: item.end.clone(),
                });
            }

            outgoing.entry(start_action).or_default().push(item);
        }

        Ok(FlowGraph {
            actions,
            outgoing,
            first,
        })
    }

    pub fn action(&self, action_id: &str) -> Option<&'c Action> {
        self.actions.get(action_id).copied()
    }

    pub fn outgoing(&self, action_id: &str) -> &[&'c LogicItem] {
        self.outgoing
            .get(action_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn parse_start(item: &LogicItem) -> Result<(&str, FlowKind), Error> {
    match item.parse_start() {
        Ok(parsed) => Ok(parsed),
        Err(models::Error::UnknownFlowKind(flow)) => Err(Error::UnsupportedFlow(flow)),
        Err(err) => Err(err.into()),
    }
}

/// Checks a new or updated logic item against the container's existing
/// logic: endpoint validity, condition typing, and the pairwise
/// branching rules.
pub fn check_logic_item(
    types: &TypesMap,
    scene: &CachedScene,
    container: &dyn LogicContainer,
    item: &LogicItem,
) -> Result<(), Error> {
    if item.start == START && item.end == END {
        return Err(Error::SenselessItem(item.id.clone()));
    }

    if item.start != START {
        let (start_action, flow) = parse_start(item)?;

        if start_action == item.end {
            return Err(Error::StartEqualsEnd(item.id.clone()));
        }
        if container.find_action(start_action).is_none() {
            return Err(Error::UnknownStart {
                item: item.id.clone(),
                action: start_action.to_string(),
            });
        }
        if flow != FlowKind::Default {
            return Err(Error::UnsupportedFlow(flow.to_string()));
        }
    }

    if item.end != END && container.find_action(&item.end).is_none() {
        return Err(Error::UnknownEnd {
            item: item.id.clone(),
            action: item.end.clone(),
        });
    }

    if let Some(condition) = &item.condition {
        let what = condition.parse_what()?;

        // The producing action and output the condition reads.
        let action = container.find_action(&what.action_id).ok_or_else(|| {
            Error::UnknownConditionAction {
                item: item.id.clone(),
                action: what.action_id.clone(),
            }
        })?;
        let flow = action
            .flow(what.flow)
            .map_err(|_| Error::MissingOutput {
                action: action.name.clone(),
                flow: what.flow.to_string(),
                index: what.output_index,
            })?;
        if flow.outputs.get(what.output_index).is_none() {
            return Err(Error::MissingOutput {
                action: action.name.clone(),
                flow: what.flow.to_string(),
                index: what.output_index,
            });
        }

        let meta = find_object_action(types, scene, action)?;
        let return_type = meta.returns.get(what.output_index).ok_or_else(|| {
            Error::MissingOutput {
                action: action.name.clone(),
                flow: what.flow.to_string(),
                index: what.output_index,
            }
        })?;

        let plugin = registry().by_name(return_type)?;
        if !plugin.countable() {
            return Err(Error::UncountableOutput(return_type.clone()));
        }
        // Only boolean conditions are supported so far.
        if plugin.kind() != ValueKind::Boolean {
            return Err(Error::UnsupportedConditionType(return_type.clone()));
        }

        if !matches!(
            serde_json::from_str::<serde_json::Value>(&condition.value),
            Ok(serde_json::Value::Bool(_))
        ) {
            return Err(Error::InvalidConditionValue(condition.value.clone()));
        }
    }

    for existing in container.iter_logic() {
        if existing.id == item.id {
            // The item is being updated.
            continue;
        }

        if item.start == START && existing.start == START {
            return Err(Error::DuplicateStart);
        }

        if item.start == existing.start {
            match (&item.condition, &existing.condition) {
                (Some(condition), Some(other)) => {
                    // Branches from one start must read the same output
                    // and differ in the value compared against.
                    let same_output = condition.parse_what()? == other.parse_what()?;
                    if !same_output || condition.value == other.value {
                        return Err(Error::ConflictingEdges(
                            item.id.clone(),
                            existing.id.clone(),
                        ));
                    }
                }
                _ => {
                    return Err(Error::ConflictingEdges(
                        item.id.clone(),
                        existing.id.clone(),
                    ));
                }
            }
        }

        if item.start == existing.start && item.end == existing.end {
            return Err(Error::DuplicateEdge(item.id.clone(), existing.id.clone()));
        }
    }

    Ok(())
}

/// Checks the container's logic graph for directed cycles, walking
/// depth-first from `first_action_id`, or from the unique START edge
/// when no starting point is given.
pub fn check_for_loops(
    container: &dyn LogicContainer,
    first_action_id: Option<&str>,
) -> Result<(), Error> {
    let graph = FlowGraph::new(container)?;

    let first = match first_action_id {
        Some(id) => graph.action(id).ok_or(Error::UnfinishedLogic)?,
        None => {
            let first = graph.first.ok_or(Error::UnfinishedLogic)?;
            graph.action(&first.end).ok_or(Error::UnfinishedLogic)?
        }
    };

    let mut done: BTreeSet<&str> = BTreeSet::new();
    let mut path: BTreeSet<&str> = BTreeSet::new();
    visit(&graph, &first.id, &mut done, &mut path)
}

fn visit<'c>(
    graph: &FlowGraph<'c>,
    action_id: &'c str,
    done: &mut BTreeSet<&'c str>,
    path: &mut BTreeSet<&'c str>,
) -> Result<(), Error> {
    if path.contains(action_id) {
        return Err(Error::LoopDetected(action_id.to_string()));
    }
    if done.contains(action_id) {
        // Joined an already-explored branch; not a cycle.
        return Ok(());
    }

    path.insert(action_id);
    for item in graph.outgoing(action_id) {
        if item.end == END {
            continue;
        }
        let end = graph
            .action(&item.end)
            .map(|action| action.id.as_str())
            .ok_or_else(|| Error::UnknownEnd {
                item: item.id.clone(),
                action: item.end.clone(),
            })?;
        visit(graph, end, done, path)?;
    }
    path.remove(action_id);
    done.insert(action_id);
    Ok(())
}
