use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use models::{
    is_valid_identifier, uid, Action, LogicItem, NamedOrientation, Pose, Position, Project,
    ProjectActionPoint, ProjectFunction, ProjectParameter, ProjectRobotJoints, END, START,
};

use crate::{CachedScene, Error};

/// Entities owned by action points, flattened out of the per-AP lists:
/// the value map is the single source of truth, the parent map remembers
/// the owning action point id.
#[derive(Debug, Clone)]
struct Owned<T> {
    data: IndexMap<String, T>,
    parent: IndexMap<String, String>,
}

impl<T> Default for Owned<T> {
    fn default() -> Self {
        Self {
            data: IndexMap::new(),
            parent: IndexMap::new(),
        }
    }
}

impl<T> Owned<T> {
    fn insert(&mut self, ap_id: &str, id: String, value: T) {
        self.data.insert(id.clone(), value);
        self.parent.insert(id, ap_id.to_string());
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let value = self.data.shift_remove(id)?;
        self.parent.shift_remove(id);
        Some(value)
    }

    fn get(&self, id: &str) -> Option<(&str, &T)> {
        Some((self.parent.get(id)?.as_str(), self.data.get(id)?))
    }

    fn owned_by<'s>(&'s self, ap_id: &'s str) -> impl Iterator<Item = &'s T> + 's {
        self.parent
            .iter()
            .filter(move |(_, parent)| parent.as_str() == ap_id)
            .filter_map(|(id, _)| self.data.get(id))
    }

    fn ids_owned_by(&self, ap_id: &str) -> Vec<String> {
        self.parent
            .iter()
            .filter(|(_, parent)| parent.as_str() == ap_id)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// An indexed, mutation-aware view over a [`Project`]. Construction
/// consumes the project, flattens per-AP entity lists into id-keyed
/// indices and rejects any state violating the project invariants.
/// Every mutator validates first and applies second, so a failed call
/// leaves the cache unchanged.
#[derive(Debug, Clone)]
pub struct CachedProject {
    pub id: String,
    pub name: String,
    pub scene_id: String,
    pub description: String,
    pub has_logic: bool,
    pub modified: Option<DateTime<Utc>>,
    int_modified: Option<DateTime<Utc>>,

    action_points: IndexMap<String, ProjectActionPoint>,
    actions: Owned<Action>,
    orientations: Owned<NamedOrientation>,
    joints: Owned<ProjectRobotJoints>,
    parameters: IndexMap<String, ProjectParameter>,
    logic_items: IndexMap<String, LogicItem>,
    functions: IndexMap<String, ProjectFunction>,
}

impl CachedProject {
    pub fn new(project: Project) -> Result<Self, Error> {
        let Project {
            id,
            name,
            scene_id,
            description,
            has_logic,
            modified,
            int_modified,
            parameters,
            action_points,
            logic,
            functions,
        } = project;

        let mut cached = CachedProject {
            id,
            name,
            scene_id,
            description,
            has_logic,
            modified,
            int_modified,
            action_points: IndexMap::new(),
            actions: Owned::default(),
            orientations: Owned::default(),
            joints: Owned::default(),
            parameters: IndexMap::new(),
            logic_items: IndexMap::new(),
            functions: IndexMap::new(),
        };

        for mut ap in action_points {
            if cached.action_points.contains_key(&ap.id) {
                return Err(Error::duplicate_id("action point", &ap.id));
            }
            if !is_valid_identifier(&ap.name) {
                return Err(Error::InvalidIdentifier {
                    kind: "action point",
                    name: ap.name,
                });
            }
            if cached.action_points.values().any(|o| o.name == ap.name) {
                return Err(Error::duplicate_name("action point", &ap.name));
            }

            for action in ap.actions.drain(..) {
                cached.check_new_action(&action)?;
                cached.actions.insert(&ap.id, action.id.clone(), action);
            }
            for ori in ap.orientations.drain(..) {
                if cached.orientations.data.contains_key(&ori.id) {
                    return Err(Error::duplicate_id("orientation", &ori.id));
                }
                cached.orientations.insert(&ap.id, ori.id.clone(), ori);
            }
            for joints in ap.robot_joints.drain(..) {
                if cached.joints.data.contains_key(&joints.id) {
                    return Err(Error::duplicate_id("joints", &joints.id));
                }
                cached.joints.insert(&ap.id, joints.id.clone(), joints);
            }

            cached.action_points.insert(ap.id.clone(), ap);
        }

        // Parent chains among action points must be acyclic.
        for ap_id in cached.action_points.keys() {
            cached.check_parent_chain(ap_id, cached.action_points[ap_id].parent.as_deref())?;
        }

        for parameter in parameters {
            cached.check_parameter(&parameter)?;
            cached.parameters.insert(parameter.id.clone(), parameter);
        }

        for item in logic {
            if cached.logic_items.contains_key(&item.id) {
                return Err(Error::duplicate_id("logic item", &item.id));
            }
            cached.check_logic_references(&item)?;
            cached.logic_items.insert(item.id.clone(), item);
        }

        for function in functions {
            if cached.functions.contains_key(&function.id) {
                return Err(Error::duplicate_id("function", &function.id));
            }
            cached.functions.insert(function.id.clone(), function);
        }

        Ok(cached)
    }

    /// New actions must carry a fresh id, a fresh identifier-valid name,
    /// at most one flow per kind, and container-unique flow outputs.
    fn check_new_action(&self, action: &Action) -> Result<(), Error> {
        if self.actions.data.contains_key(&action.id) {
            return Err(Error::duplicate_id("action", &action.id));
        }
        if !is_valid_identifier(&action.name) {
            return Err(Error::InvalidIdentifier {
                kind: "action",
                name: action.name.clone(),
            });
        }
        if self.actions.data.values().any(|a| a.name == action.name) {
            return Err(Error::duplicate_name("action", &action.name));
        }
        self.check_action_flows(action)
    }

    fn check_action_flows(&self, action: &Action) -> Result<(), Error> {
        let mut kinds = Vec::new();
        for flow in &action.flows {
            if kinds.contains(&flow.type_) {
                return Err(Error::duplicate_name("flow", flow.type_.as_str()));
            }
            kinds.push(flow.type_);
            flow.validate()?;

            for output in &flow.outputs {
                let taken = self
                    .actions
                    .data
                    .values()
                    .filter(|a| a.id != action.id)
                    .flat_map(|a| a.flows.iter())
                    .flat_map(|f| f.outputs.iter())
                    .any(|o| o == output);
                if taken {
                    return Err(Error::duplicate_name("flow output", output));
                }
            }
        }
        Ok(())
    }

    fn check_parameter(&self, parameter: &ProjectParameter) -> Result<(), Error> {
        if !is_valid_identifier(&parameter.name) {
            return Err(Error::InvalidIdentifier {
                kind: "project parameter",
                name: parameter.name.clone(),
            });
        }
        for existing in self.parameters.values() {
            if existing.id == parameter.id {
                continue;
            }
            if existing.name == parameter.name {
                return Err(Error::duplicate_name("project parameter", &parameter.name));
            }
        }

        match serde_json::from_str::<serde_json::Value>(&parameter.value) {
            Ok(
                serde_json::Value::Bool(_)
                | serde_json::Value::Number(_)
                | serde_json::Value::String(_),
            ) => Ok(()),
            _ => Err(Error::InvalidValue {
                name: parameter.name.clone(),
                value: parameter.value.clone(),
            }),
        }
    }

    /// Invariant: action ids referenced by a logic item's endpoints and
    /// condition exist in the project.
    fn check_logic_references(&self, item: &LogicItem) -> Result<(), Error> {
        if item.start != START {
            let (action_id, _flow) = item.parse_start()?;
            if !self.actions.data.contains_key(action_id) {
                return Err(Error::InvalidReference {
                    item: format!("logic item {}", item.id),
                    kind: "start action",
                    id: action_id.to_string(),
                });
            }
        }
        if item.end != END && !self.actions.data.contains_key(&item.end) {
            return Err(Error::InvalidReference {
                item: format!("logic item {}", item.id),
                kind: "end action",
                id: item.end.clone(),
            });
        }
        if let Some(condition) = &item.condition {
            let what = condition.parse_what()?;
            if !self.actions.data.contains_key(&what.action_id) {
                return Err(Error::InvalidReference {
                    item: format!("logic item {}", item.id),
                    kind: "condition action",
                    id: what.action_id,
                });
            }
        }
        Ok(())
    }

    /// Walks the parent chain starting at `parent`, failing if it loops
    /// back to `ap_id`. Object-typed parents terminate the chain.
    fn check_parent_chain(&self, ap_id: &str, parent: Option<&str>) -> Result<(), Error> {
        let mut cursor = parent;
        let mut hops = self.action_points.len() + 1;

        while let Some(current) = cursor {
            if current == ap_id {
                return Err(Error::ParentLoop {
                    ap: ap_id.to_string(),
                });
            }
            if hops == 0 {
                // A cycle not involving ap_id itself.
                return Err(Error::ParentLoop {
                    ap: current.to_string(),
                });
            }
            hops -= 1;
            cursor = self
                .action_points
                .get(current)
                .and_then(|ap| ap.parent.as_deref());
        }
        Ok(())
    }

    // ---- accessors ----

    pub fn action(&self, action_id: &str) -> Result<&Action, Error> {
        self.actions
            .data
            .get(action_id)
            .ok_or_else(|| Error::not_found("action", action_id))
    }

    pub fn action_point(&self, ap_id: &str) -> Result<&ProjectActionPoint, Error> {
        self.action_points
            .get(ap_id)
            .ok_or_else(|| Error::not_found("action point", ap_id))
    }

    pub fn action_point_and_action(
        &self,
        action_id: &str,
    ) -> Result<(&ProjectActionPoint, &Action), Error> {
        let (ap_id, action) = self
            .actions
            .get(action_id)
            .ok_or_else(|| Error::not_found("action", action_id))?;
        Ok((&self.action_points[ap_id], action))
    }

    pub fn orientation(&self, orientation_id: &str) -> Result<&NamedOrientation, Error> {
        self.orientations
            .data
            .get(orientation_id)
            .ok_or_else(|| Error::not_found("orientation", orientation_id))
    }

    pub fn ap_and_orientation(
        &self,
        orientation_id: &str,
    ) -> Result<(&ProjectActionPoint, &NamedOrientation), Error> {
        let (ap_id, ori) = self
            .orientations
            .get(orientation_id)
            .ok_or_else(|| Error::not_found("orientation", orientation_id))?;
        Ok((&self.action_points[ap_id], ori))
    }

    /// The absolute pose a named orientation denotes: the owning action
    /// point's position with the orientation.
    pub fn pose(&self, orientation_id: &str) -> Result<Pose, Error> {
        let (ap, ori) = self.ap_and_orientation(orientation_id)?;
        Ok(Pose::new(ap.position, ori.orientation))
    }

    pub fn joints(&self, joints_id: &str) -> Result<&ProjectRobotJoints, Error> {
        self.joints
            .data
            .get(joints_id)
            .ok_or_else(|| Error::not_found("joints", joints_id))
    }

    pub fn ap_and_joints(
        &self,
        joints_id: &str,
    ) -> Result<(&ProjectActionPoint, &ProjectRobotJoints), Error> {
        let (ap_id, joints) = self
            .joints
            .get(joints_id)
            .ok_or_else(|| Error::not_found("joints", joints_id))?;
        Ok((&self.action_points[ap_id], joints))
    }

    pub fn logic_item(&self, logic_item_id: &str) -> Result<&LogicItem, Error> {
        self.logic_items
            .get(logic_item_id)
            .ok_or_else(|| Error::not_found("logic item", logic_item_id))
    }

    pub fn parameter(&self, parameter_id: &str) -> Result<&ProjectParameter, Error> {
        self.parameters
            .get(parameter_id)
            .ok_or_else(|| Error::not_found("project parameter", parameter_id))
    }

    pub fn function(&self, function_id: &str) -> Result<&ProjectFunction, Error> {
        self.functions
            .get(function_id)
            .ok_or_else(|| Error::not_found("function", function_id))
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.data.values()
    }

    pub fn action_ids(&self) -> impl Iterator<Item = &str> {
        self.actions.data.keys().map(String::as_str)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.data.values().map(|a| a.name.as_str())
    }

    pub fn action_points(&self) -> impl Iterator<Item = &ProjectActionPoint> {
        self.action_points.values()
    }

    pub fn action_points_with_parent(&self) -> impl Iterator<Item = &ProjectActionPoint> {
        self.action_points.values().filter(|ap| ap.parent.is_some())
    }

    pub fn action_point_ids(&self) -> impl Iterator<Item = &str> {
        self.action_points.keys().map(String::as_str)
    }

    pub fn action_point_names(&self) -> impl Iterator<Item = &str> {
        self.action_points.values().map(|ap| ap.name.as_str())
    }

    pub fn ap_actions<'s>(&'s self, ap_id: &'s str) -> impl Iterator<Item = &'s Action> + 's {
        self.actions.owned_by(ap_id)
    }

    pub fn ap_orientations<'s>(
        &'s self,
        ap_id: &'s str,
    ) -> impl Iterator<Item = &'s NamedOrientation> + 's {
        self.orientations.owned_by(ap_id)
    }

    pub fn ap_joints<'s>(
        &'s self,
        ap_id: &'s str,
    ) -> impl Iterator<Item = &'s ProjectRobotJoints> + 's {
        self.joints.owned_by(ap_id)
    }

    pub fn logic(&self) -> impl Iterator<Item = &LogicItem> {
        self.logic_items.values()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &ProjectParameter> {
        self.parameters.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &ProjectFunction> {
        self.functions.values()
    }

    /// Ids of every scene object addressed by some action's type.
    pub fn used_object_ids(&self) -> std::collections::BTreeSet<String> {
        self.actions
            .data
            .values()
            .filter_map(|a| a.parse_type().ok())
            .map(|(obj_id, _)| obj_id.to_string())
            .collect()
    }

    /// The project without its owned collections.
    pub fn bare(&self) -> Project {
        let mut project = Project::new(self.id.clone(), self.name.clone(), self.scene_id.clone());
        project.description = self.description.clone();
        project.has_logic = self.has_logic;
        project
    }

    /// A fresh `Project` reflecting the current state. Owned entities
    /// are re-nested under their action points in insertion order.
    pub fn snapshot(&self) -> Project {
        let mut project = self.bare();
        project.modified = self.modified;
        project.int_modified = self.int_modified;

        project.action_points = self.action_points.values().map(|ap| ap.bare()).collect();

        for ap in &mut project.action_points {
            ap.actions = self.actions.owned_by(&ap.id).cloned().collect();
            ap.orientations = self.orientations.owned_by(&ap.id).cloned().collect();
            ap.robot_joints = self.joints.owned_by(&ap.id).cloned().collect();
        }

        project.parameters = self.parameters.values().cloned().collect();
        project.logic = self.logic_items.values().cloned().collect();
        project.functions = self.functions.values().cloned().collect();
        project
    }

    pub fn internal_modified(&self) -> Option<DateTime<Utc>> {
        self.int_modified
    }

    /// Whether in-memory changes are newer than the persisted state.
    pub fn has_changes(&self) -> bool {
        match (self.int_modified, self.modified) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(int), Some(modified)) => int > modified,
        }
    }

    fn update_modified(&mut self) {
        // Strictly monotonic, even when mutations land within the clock
        // resolution.
        let now = Utc::now();
        self.int_modified = Some(match self.int_modified {
            Some(prev) if prev >= now => prev + chrono::Duration::microseconds(1),
            _ => now,
        });
    }

    // ---- mutators ----

    pub fn upsert_action(&mut self, ap_id: &str, action: Action) -> Result<(), Error> {
        self.action_point(ap_id)?;

        match self.actions.get(&action.id) {
            Some((parent, _)) => {
                if parent != ap_id {
                    return Err(Error::InvalidReference {
                        item: format!("action {}", action.id),
                        kind: "owning action point",
                        id: ap_id.to_string(),
                    });
                }
                if self
                    .actions
                    .data
                    .values()
                    .any(|a| a.name == action.name && a.id != action.id)
                {
                    return Err(Error::duplicate_name("action", &action.name));
                }
                self.check_action_flows(&action)?;
            }
            None => self.check_new_action(&action)?,
        }

        tracing::debug!(action = %action.id, ap = %ap_id, "upsert action");
        self.actions.insert(ap_id, action.id.clone(), action);
        self.update_modified();
        Ok(())
    }

    /// Removes an action. Callers are responsible for first checking
    /// that no logic item still references it.
    pub fn remove_action(&mut self, action_id: &str) -> Result<Action, Error> {
        let action = self
            .actions
            .remove(action_id)
            .ok_or_else(|| Error::not_found("action", action_id))?;
        self.update_modified();
        Ok(action)
    }

    pub fn upsert_orientation(
        &mut self,
        ap_id: &str,
        orientation: NamedOrientation,
    ) -> Result<(), Error> {
        self.action_point(ap_id)?;
        self.check_owned_name(
            ap_id,
            &orientation.id,
            &orientation.name,
            "orientation",
            &self.orientations,
        )?;
        self.orientations
            .insert(ap_id, orientation.id.clone(), orientation);
        self.update_modified();
        Ok(())
    }

    /// Removes an orientation. Callers are responsible for first checking
    /// that no action parameter still uses it.
    pub fn remove_orientation(&mut self, orientation_id: &str) -> Result<NamedOrientation, Error> {
        let ori = self
            .orientations
            .remove(orientation_id)
            .ok_or_else(|| Error::not_found("orientation", orientation_id))?;
        self.update_modified();
        Ok(ori)
    }

    pub fn upsert_joints(&mut self, ap_id: &str, joints: ProjectRobotJoints) -> Result<(), Error> {
        self.action_point(ap_id)?;
        self.check_owned_name(ap_id, &joints.id, &joints.name, "joints", &self.joints)?;
        self.joints.insert(ap_id, joints.id.clone(), joints);
        self.update_modified();
        Ok(())
    }

    pub fn remove_joints(&mut self, joints_id: &str) -> Result<ProjectRobotJoints, Error> {
        let joints = self
            .joints
            .remove(joints_id)
            .ok_or_else(|| Error::not_found("joints", joints_id))?;
        self.update_modified();
        Ok(joints)
    }

    /// Shared upsert validation of AP-owned, named entities: an existing
    /// id must stay under its action point, names are identifiers and
    /// unique within the action point.
    fn check_owned_name<T>(
        &self,
        ap_id: &str,
        id: &str,
        name: &str,
        kind: &'static str,
        owned: &Owned<T>,
    ) -> Result<(), Error>
    where
        T: HasName,
    {
        if let Some((parent, _)) = owned.get(id) {
            if parent != ap_id {
                return Err(Error::InvalidReference {
                    item: format!("{kind} {id}"),
                    kind: "owning action point",
                    id: ap_id.to_string(),
                });
            }
        }
        if !is_valid_identifier(name) {
            return Err(Error::InvalidIdentifier {
                kind,
                name: name.to_string(),
            });
        }
        let collision = owned
            .parent
            .iter()
            .filter(|(other_id, parent)| parent.as_str() == ap_id && other_id.as_str() != id)
            .any(|(other_id, _)| owned.data[other_id].name() == name);
        if collision {
            return Err(Error::duplicate_name(kind, name));
        }
        Ok(())
    }

    pub fn upsert_action_point(
        &mut self,
        scene: &CachedScene,
        ap_id: Option<String>,
        name: &str,
        position: Position,
        parent: Option<String>,
    ) -> Result<String, Error> {
        let ap_id = ap_id.unwrap_or_else(|| uid("acp"));

        if !is_valid_identifier(name) {
            return Err(Error::InvalidIdentifier {
                kind: "action point",
                name: name.to_string(),
            });
        }
        if self
            .action_points
            .values()
            .any(|ap| ap.name == name && ap.id != ap_id)
        {
            return Err(Error::duplicate_name("action point", name));
        }

        if let Some(parent_id) = parent.as_deref() {
            if parent_id == ap_id {
                return Err(Error::ParentLoop { ap: ap_id });
            }
            if self.action_points.contains_key(parent_id) {
                self.check_parent_chain(&ap_id, Some(parent_id))?;
            } else {
                // Not an action point: must be a posed scene object.
                let obj = scene.object(parent_id).map_err(|_| Error::InvalidParent {
                    ap: ap_id.clone(),
                    detail: format!("{parent_id} is neither an object nor an action point"),
                })?;
                if obj.pose.is_none() {
                    return Err(Error::InvalidParent {
                        ap: ap_id,
                        detail: format!("object {parent_id} has no pose"),
                    });
                }
            }
        }

        match self.action_points.get_mut(&ap_id) {
            Some(ap) => {
                ap.name = name.to_string();
                ap.position = position;
                ap.parent = parent;
            }
            None => {
                let mut ap = ProjectActionPoint::new(ap_id.clone(), name, position);
                ap.parent = parent;
                self.action_points.insert(ap_id.clone(), ap);
            }
        }
        self.update_modified();
        Ok(ap_id)
    }

    /// Removes an action point together with the actions, orientations
    /// and joints it owns. Fails while other action points still name it
    /// as their parent.
    pub fn remove_action_point(&mut self, ap_id: &str) -> Result<ProjectActionPoint, Error> {
        self.action_point(ap_id)?;

        if let Some(child) = self
            .action_points
            .values()
            .find(|ap| ap.parent.as_deref() == Some(ap_id))
        {
            return Err(Error::InvalidReference {
                item: format!("action point {}", child.id),
                kind: "parent action point",
                id: ap_id.to_string(),
            });
        }

        let mut removed = match self.action_points.shift_remove(ap_id) {
            Some(ap) => ap,
            None => return Err(Error::not_found("action point", ap_id)),
        };

        for id in self.actions.ids_owned_by(ap_id) {
            removed.actions.extend(self.actions.remove(&id));
        }
        for id in self.orientations.ids_owned_by(ap_id) {
            removed.orientations.extend(self.orientations.remove(&id));
        }
        for id in self.joints.ids_owned_by(ap_id) {
            removed.robot_joints.extend(self.joints.remove(&id));
        }

        tracing::debug!(ap = %ap_id, "removed action point and owned entities");
        self.update_modified();
        Ok(removed)
    }

    /// Inserts or replaces a logic item. Referenced endpoint and
    /// condition actions must exist; the semantic branching rules are
    /// the logic validator's concern and are expected to have passed.
    pub fn upsert_logic_item(&mut self, item: LogicItem) -> Result<(), Error> {
        self.check_logic_references(&item)?;
        self.logic_items.insert(item.id.clone(), item);
        self.update_modified();
        Ok(())
    }

    pub fn remove_logic_item(&mut self, logic_item_id: &str) -> Result<LogicItem, Error> {
        let item = self
            .logic_items
            .shift_remove(logic_item_id)
            .ok_or_else(|| Error::not_found("logic item", logic_item_id))?;
        self.update_modified();
        Ok(item)
    }

    pub fn clear_logic(&mut self) {
        self.logic_items.clear();
        self.update_modified();
    }

    pub fn upsert_parameter(&mut self, parameter: ProjectParameter) -> Result<(), Error> {
        self.check_parameter(&parameter)?;
        self.parameters.insert(parameter.id.clone(), parameter);
        self.update_modified();
        Ok(())
    }

    pub fn remove_parameter(&mut self, parameter_id: &str) -> Result<ProjectParameter, Error> {
        let parameter = self
            .parameters
            .shift_remove(parameter_id)
            .ok_or_else(|| Error::not_found("project parameter", parameter_id))?;
        self.update_modified();
        Ok(parameter)
    }
}

/// Name access shared by AP-owned entity types.
trait HasName {
    fn name(&self) -> &str;
}

impl HasName for NamedOrientation {
    fn name(&self) -> &str {
        &self.name
    }
}

impl HasName for ProjectRobotJoints {
    fn name(&self) -> &str {
        &self.name
    }
}
