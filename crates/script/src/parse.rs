use std::collections::{BTreeMap, BTreeSet};

use cache::CachedScene;
use models::{
    is_valid_identifier, uid, Action, ActionParameter, Flow, LogicItem, ParameterKind,
    ParameterMeta, Project, ProjectLogicIf, ProjectParameter, TypesMap, END, START,
};

use crate::Error;

/// Ingests a program produced by the emitter (or shaped exactly like
/// one) into a new project. Action points, orientations and joints are
/// taken from `base`; actions, parameters and logic come from the
/// source. Actions which never mention an action point attach to
/// `default_ap`, or to the base project's first action point.
pub fn parse_script(
    base: &Project,
    scene: &CachedScene,
    types: &TypesMap,
    source: &str,
    default_ap: Option<&str>,
) -> Result<Project, Error> {
    let lines = scan_lines(source)?;

    let default_ap = match default_ap {
        Some(id) => Some(id.to_string()),
        None => base.action_points.first().map(|ap| ap.id.clone()),
    };

    let mut parser = Parser {
        base,
        scene,
        types,
        lines,
        pos: 0,
        objects: BTreeMap::new(),
        parameters: Vec::new(),
        outputs: BTreeMap::new(),
        actions: Vec::new(),
        action_names: BTreeSet::new(),
        logic: Vec::new(),
        current_ap: default_ap,
    };

    parser.parse_main()?;
    parser.into_project()
}

/// A significant source line: 1-based number, leading-space count and
/// trimmed text. Blank and comment lines are dropped up front, the way
/// an AST-level walk never sees them.
#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

fn scan_lines(source: &str) -> Result<Vec<Line>, Error> {
    let mut lines = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        if raw.contains('\t') {
            return Err(Error::shape(number, "tab indentation is not supported"));
        }

        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        lines.push(Line {
            number,
            indent: raw.len() - raw.trim_start_matches(' ').len(),
            text: text.to_string(),
        });
    }

    Ok(lines)
}

/// An endpoint still waiting for its continuation: `START` or an action
/// id, with the branching condition that edge will carry.
type OpenEnd = (String, Option<ProjectLogicIf>);

struct Parser<'a> {
    base: &'a Project,
    scene: &'a CachedScene,
    types: &'a TypesMap,
    lines: Vec<Line>,
    pos: usize,

    /// Script variable name to scene object id.
    objects: BTreeMap<String, String>,
    parameters: Vec<ProjectParameter>,
    /// Output variable to (producing action id, output index).
    outputs: BTreeMap<String, (String, usize)>,
    /// Parsed actions with the action point each one attaches to.
    actions: Vec<(String, Action)>,
    action_names: BTreeSet<String>,
    logic: Vec<LogicItem>,
    /// The rolling "current" action point.
    current_ap: Option<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn next(&mut self) -> Option<Line> {
        let line = self.lines.get(self.pos).cloned();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn parse_main(&mut self) -> Result<(), Error> {
        // Imports, then `def main(res: Resources) -> None:`.
        let def_line = loop {
            let Some(line) = self.next() else {
                return Err(Error::shape(0, "no main function found"));
            };
            if line.text.starts_with("from ") || line.text.starts_with("import ") {
                continue;
            }
            if line.text.starts_with("def main(") {
                break line;
            }
            return Err(Error::shape(
                line.number,
                format!("unexpected top-level statement: {}", line.text),
            ));
        };

        if def_line.text != "def main(res: Resources) -> None:" {
            return Err(Error::shape(
                def_line.number,
                "main must be declared as 'def main(res: Resources) -> None:'",
            ));
        }

        let body_indent = match self.peek() {
            Some(line) if line.indent > def_line.indent => line.indent,
            _ => return Err(Error::shape(def_line.number, "main has an empty body")),
        };

        // Header statements of main, up to the program loop.
        loop {
            let Some(line) = self.peek().cloned() else {
                return Err(Error::shape(def_line.number, "main has no 'while True:' loop"));
            };
            if line.indent < body_indent {
                return Err(Error::shape(line.number, "main has no 'while True:' loop"));
            }
            if line.indent > body_indent {
                return Err(Error::shape(line.number, "unexpected indentation"));
            }
            self.pos += 1;

            if line.text == "while True:" {
                break;
            }
            self.parse_header_statement(&line)?;
        }

        let loop_indent = match self.peek() {
            Some(line) if line.indent > body_indent => line.indent,
            _ => return Err(Error::shape(def_line.number, "program loop has an empty body")),
        };

        let open = vec![(START.to_string(), None)];
        let open = self.parse_block(loop_indent, open)?;
        for (endpoint, condition) in open {
            self.push_logic(endpoint, END.to_string(), condition);
        }

        // Nothing may follow the loop inside main.
        if let Some(line) = self.peek() {
            if line.indent >= body_indent {
                return Err(Error::shape(
                    line.number,
                    "statements after the program loop are not allowed",
                ));
            }
        }

        // The `if __name__ == '__main__':` harness is not interpreted.
        Ok(())
    }

    /// `aps = ActionPoints(res)`, an object binding, or a
    /// project-parameter binding.
    fn parse_header_statement(&mut self, line: &Line) -> Result<(), Error> {
        if line.text == "aps = ActionPoints(res)" {
            return Ok(());
        }

        // <name>: <Class> = res.objects['<id>']
        if let Some((target, rest)) = split_once_top_level(&line.text, " = ") {
            if let Some(obj_id) = rest
                .strip_prefix("res.objects['")
                .and_then(|rest| rest.strip_suffix("']"))
            {
                let Some((name, class)) = target.split_once(": ") else {
                    return Err(Error::shape(line.number, "object binding must be annotated"));
                };

                let obj = self
                    .scene
                    .object(obj_id)
                    .map_err(|_| Error::shape(line.number, format!("unknown object: {obj_id}")))?;
                if obj.type_ != class {
                    return Err(Error::shape(
                        line.number,
                        format!("object {obj_id} is a {}, not a {class}", obj.type_),
                    ));
                }
                self.objects.insert(name.to_string(), obj_id.to_string());
                return Ok(());
            }

            // <name> = <literal> declares a project parameter.
            let Some(value) = parse_literal(rest) else {
                return Err(Error::shape(
                    line.number,
                    format!("expected a literal, got: {rest}"),
                ));
            };
            if !is_valid_identifier(target) {
                return Err(Error::shape(
                    line.number,
                    format!("'{target}' is not a valid parameter name"),
                ));
            }

            let type_ = match &value {
                serde_json::Value::Bool(_) => "boolean",
                serde_json::Value::Number(number) if number.is_i64() => "integer",
                serde_json::Value::Number(_) => "double",
                serde_json::Value::String(_) => "string",
                _ => return Err(Error::shape(line.number, "unsupported parameter literal")),
            };

            // Keep the id stable when the base project already carries
            // a parameter of this name.
            let id = self
                .base
                .parameters
                .iter()
                .find(|p| p.name == target)
                .map(|p| p.id.clone())
                .unwrap_or_else(|| uid("pps"));

            self.parameters.push(ProjectParameter::new(
                id,
                target,
                type_,
                value.to_string(),
            ));
            return Ok(());
        }

        Err(Error::shape(
            line.number,
            format!("unexpected statement before the program loop: {}", line.text),
        ))
    }

    /// Parses one indented block; returns the open ends falling out of
    /// its last statement.
    fn parse_block(&mut self, indent: usize, mut open: Vec<OpenEnd>) -> Result<Vec<OpenEnd>, Error> {
        loop {
            let Some(line) = self.peek().cloned() else {
                return Ok(open);
            };
            if line.indent < indent {
                return Ok(open);
            }
            if line.indent > indent {
                return Err(Error::shape(line.number, "unexpected indentation"));
            }

            if line.text == "continue" {
                self.pos += 1;
                for (endpoint, condition) in open.drain(..) {
                    self.push_logic(endpoint, END.to_string(), condition);
                }
                // Anything after an unconditional jump is unreachable.
                self.skip_block(indent);
                return Ok(Vec::new());
            }

            if line.text == "pass" {
                self.pos += 1;
                continue;
            }

            if line.text.starts_with("if ") {
                open = self.parse_branches(indent, open)?;
                continue;
            }
            if line.text.starts_with("elif ") || line.text.starts_with("else") {
                return Err(Error::shape(line.number, "branch without a preceding 'if'"));
            }

            self.pos += 1;
            let action_id = self.parse_call_statement(&line)?;
            for (endpoint, condition) in open.drain(..) {
                self.push_logic(endpoint, action_id.clone(), condition);
            }
            open = vec![(action_id, None)];
        }
    }

    /// Consumes the remaining statements of a block without
    /// interpreting them.
    fn skip_block(&mut self, indent: usize) {
        while let Some(line) = self.peek() {
            if line.indent < indent {
                return;
            }
            self.pos += 1;
        }
    }

    /// An `if`/`elif` chain branching on a prior action's output.
    fn parse_branches(&mut self, indent: usize, open: Vec<OpenEnd>) -> Result<Vec<OpenEnd>, Error> {
        let source = match open.as_slice() {
            [(endpoint, None)] if endpoint.as_str() != START => endpoint.clone(),
            _ => {
                let number = self.peek().map(|line| line.number).unwrap_or(0);
                return Err(Error::shape(
                    number,
                    "branching requires a single preceding action",
                ));
            }
        };

        let mut merged = Vec::new();
        let mut first = true;

        loop {
            let Some(line) = self.peek().cloned() else {
                break;
            };
            if line.indent != indent {
                break;
            }

            let keyword = if first { "if " } else { "elif " };
            let Some(rest) = line.text.strip_prefix(keyword) else {
                break;
            };
            first = false;
            self.pos += 1;

            let Some(test) = rest.strip_suffix(':') else {
                return Err(Error::shape(line.number, "malformed branch header"));
            };
            let Some((variable, literal)) = split_once_top_level(test, " == ") else {
                return Err(Error::shape(
                    line.number,
                    "conditions must compare a variable with '=='",
                ));
            };

            let Some((producer, index)) = self.outputs.get(variable).cloned() else {
                return Err(Error::shape(
                    line.number,
                    format!("'{variable}' is not a known action output"),
                ));
            };
            let Some(value) = parse_literal(literal) else {
                return Err(Error::shape(
                    line.number,
                    format!("expected a literal, got: {literal}"),
                ));
            };

            let condition = ProjectLogicIf::new(
                format!("{producer}/default/{index}"),
                value.to_string(),
            );

            let arm_indent = match self.peek() {
                Some(next) if next.indent > indent => next.indent,
                _ => return Err(Error::shape(line.number, "branch has an empty body")),
            };

            let arm_open = vec![(source.clone(), Some(condition))];
            merged.extend(self.parse_block(arm_indent, arm_open)?);
        }

        Ok(merged)
    }

    /// `obj.method(...)`, optionally with assignment targets binding the
    /// action's flow outputs. Returns the new action's id.
    fn parse_call_statement(&mut self, line: &Line) -> Result<String, Error> {
        let (targets, call) = match split_once_top_level(&line.text, " = ") {
            Some((targets, call)) => {
                let targets: Vec<String> =
                    targets.split(", ").map(|t| t.trim().to_string()).collect();
                for target in &targets {
                    if !is_valid_identifier(target) {
                        return Err(Error::shape(
                            line.number,
                            format!("'{target}' is not a valid output name"),
                        ));
                    }
                }
                (targets, call)
            }
            None => (Vec::new(), line.text.as_str()),
        };

        // <receiver>.<method>(<args>)
        let Some(call) = call.strip_suffix(')') else {
            return Err(Error::shape(line.number, format!("expected a call: {call}")));
        };
        let Some((callee, args)) = call.split_once('(') else {
            return Err(Error::shape(line.number, format!("expected a call: {call}")));
        };
        let Some((receiver, method)) = callee.rsplit_once('.') else {
            return Err(Error::shape(
                line.number,
                format!("expected an object method call: {callee}"),
            ));
        };

        let Some(obj_id) = self.objects.get(receiver).cloned() else {
            return Err(Error::shape(
                line.number,
                format!("'{receiver}' is not a bound object"),
            ));
        };
        let obj_type = &self.scene.object(&obj_id)?.type_;
        let meta = self
            .types
            .get(obj_type)
            .and_then(|object_type| object_type.action(method))
            .ok_or_else(|| {
                Error::shape(
                    line.number,
                    format!("object type {obj_type} has no action {method}"),
                )
            })?;

        let mut args = split_top_level(args, ',');

        // The trailing an= keyword names the action.
        let action_name = match args.pop().and_then(|last| {
            last.trim()
                .strip_prefix("an='")
                .and_then(|rest| rest.strip_suffix('\''))
                .map(str::to_string)
        }) {
            Some(name) => name,
            None => {
                return Err(Error::shape(
                    line.number,
                    "calls must carry a trailing an='<name>' keyword",
                ))
            }
        };
        if !is_valid_identifier(&action_name) || !self.action_names.insert(action_name.clone()) {
            return Err(Error::shape(
                line.number,
                format!("'{action_name}' is not a fresh action name"),
            ));
        }

        if args.len() != meta.parameters.len() {
            return Err(Error::shape(
                line.number,
                format!(
                    "action {method} takes {} arguments, got {}",
                    meta.parameters.len(),
                    args.len()
                ),
            ));
        }

        let action_id = uid("act");
        let mut parameters = Vec::new();
        let mut referenced_ap = None;

        for (arg, declared) in args.iter().zip(&meta.parameters) {
            let (parameter, ap) = self.parse_argument(line.number, arg.trim(), declared)?;
            parameters.push(parameter);
            if let Some(ap) = ap {
                // The most recently referenced action point wins.
                referenced_ap = Some(ap);
            }
        }

        if !targets.is_empty() && targets.len() != meta.returns.len() {
            return Err(Error::shape(
                line.number,
                format!(
                    "action {method} returns {} values, got {} targets",
                    meta.returns.len(),
                    targets.len()
                ),
            ));
        }
        for (index, target) in targets.iter().enumerate() {
            if self.outputs.contains_key(target) {
                return Err(Error::shape(
                    line.number,
                    format!("output '{target}' is not unique"),
                ));
            }
            self.outputs
                .insert(target.clone(), (action_id.clone(), index));
        }

        let ap_id = match referenced_ap.or_else(|| self.current_ap.clone()) {
            Some(ap_id) => ap_id,
            None => {
                return Err(Error::shape(
                    line.number,
                    "no action point to attach the action to",
                ))
            }
        };
        self.current_ap = Some(ap_id.clone());

        let mut action = Action::new(action_id.clone(), action_name, format!("{obj_id}/{method}"));
        action.parameters = parameters;
        action.flows = vec![Flow::with_outputs(targets)];

        self.actions.push((ap_id, action));
        Ok(action_id)
    }

    /// Classifies one call argument. Returns the parameter plus the id
    /// of the action point it references, if any.
    fn parse_argument(
        &self,
        number: usize,
        arg: &str,
        declared: &ParameterMeta,
    ) -> Result<(ActionParameter, Option<String>), Error> {
        let name = &declared.name;
        let declared_type = declared.type_.as_str();
        // aps.<ap>... reference.
        if let Some(rest) = arg.strip_prefix("aps.") {
            let segments: Vec<&str> = rest.split('.').collect();
            let (ap_name, reference) = match segments.as_slice() {
                [ap, "position"] => (*ap, None),
                [ap, kind @ ("poses" | "joints"), member] => (*ap, Some((*kind, *member))),
                _ => {
                    return Err(Error::shape(
                        number,
                        format!("unsupported action point reference: {arg}"),
                    ))
                }
            };

            let ap = self
                .base
                .action_points
                .iter()
                .find(|ap| ap.name == ap_name)
                .ok_or_else(|| {
                    Error::shape(number, format!("unknown action point: {ap_name}"))
                })?;

            let (type_, id) = match reference {
                None => ("position", ap.id.clone()),
                Some(("poses", member)) => (
                    "pose",
                    ap.orientations
                        .iter()
                        .find(|ori| ori.name == member)
                        .map(|ori| ori.id.clone())
                        .ok_or_else(|| {
                            Error::shape(
                                number,
                                format!("action point {ap_name} has no orientation {member}"),
                            )
                        })?,
                ),
                Some(("joints", member)) => (
                    "joints",
                    ap.robot_joints
                        .iter()
                        .find(|joints| joints.name == member)
                        .map(|joints| joints.id.clone())
                        .ok_or_else(|| {
                            Error::shape(
                                number,
                                format!("action point {ap_name} has no joints {member}"),
                            )
                        })?,
                ),
                Some(_) => unreachable!(),
            };

            let value = serde_json::Value::String(id).to_string();
            return Ok((
                ActionParameter::new(name, type_, value),
                Some(ap.id.clone()),
            ));
        }

        // Literal.
        if let Some(value) = parse_literal(arg) {
            let value = match (&value, declared_type) {
                // An integer literal bound to a double parameter keeps
                // its float encoding.
                (serde_json::Value::Number(n), "double") if n.is_i64() => {
                    serde_json::json!(n.as_i64().unwrap() as f64).to_string()
                }
                _ => value.to_string(),
            };
            return Ok((ActionParameter::new(name, declared_type, value), None));
        }

        // Bare identifier: a project parameter or a prior output.
        if is_valid_identifier(arg) {
            if let Some(parameter) = self.parameters.iter().find(|p| p.name == arg) {
                let value = serde_json::Value::String(parameter.id.clone()).to_string();
                return Ok((
                    ActionParameter::new(name, ParameterKind::PROJECT_PARAMETER, value),
                    None,
                ));
            }
            if let Some((producer, index)) = self.outputs.get(arg) {
                let value =
                    serde_json::Value::String(format!("{producer}/default/{index}")).to_string();
                return Ok((
                    ActionParameter::new(name, ParameterKind::LINK, value),
                    None,
                ));
            }
            return Err(Error::shape(
                number,
                format!("'{arg}' is neither a parameter nor a prior output"),
            ));
        }

        // <EnumClass>.<MEMBER>.
        if let Some((class, member)) = arg.split_once('.') {
            if is_valid_identifier(class) && is_valid_identifier(member) {
                let extra = declared.extra.as_deref().ok_or_else(|| {
                    Error::shape(number, format!("parameter {name} carries no enum metadata"))
                })?;
                let extra: params::EnumExtra = serde_json::from_str(extra).map_err(|_| {
                    Error::shape(number, format!("parameter {name} has malformed enum metadata"))
                })?;

                if extra.class_name != class {
                    return Err(Error::shape(
                        number,
                        format!("expected {} member, got {class}.{member}", extra.class_name),
                    ));
                }
                let value = extra.members.get(member).ok_or_else(|| {
                    Error::shape(number, format!("{class} has no member {member}"))
                })?;
                return Ok((
                    ActionParameter::new(name, declared_type, value.to_string()),
                    None,
                ));
            }
        }

        Err(Error::shape(number, format!("unsupported argument: {arg}")))
    }

    fn push_logic(&mut self, start: String, end: String, condition: Option<ProjectLogicIf>) {
        let mut item = LogicItem::new(uid("lit"), start, end);
        item.condition = condition;
        self.logic.push(item);
    }

    fn into_project(self) -> Result<Project, Error> {
        let mut project = self.base.clone();

        for ap in &mut project.action_points {
            ap.actions.clear();
        }
        project.parameters = self.parameters;
        project.logic = self.logic;

        for (ap_id, action) in self.actions {
            let ap = project
                .action_points
                .iter_mut()
                .find(|ap| ap.id == ap_id)
                .ok_or_else(|| Error::shape(0, format!("unknown action point: {ap_id}")))?;
            ap.actions.push(action);
        }

        tracing::debug!(
            project = %project.id,
            actions = project.action_points.iter().map(|ap| ap.actions.len()).sum::<usize>(),
            logic = project.logic.len(),
            "program ingested"
        );
        Ok(project)
    }
}

/// Splits on `separator` wherever it occurs outside quotes, parentheses
/// and brackets.
fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' | '[' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                c if c == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }

    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Finds the first top-level occurrence of `separator` and splits
/// around it.
fn split_once_top_level<'s>(input: &'s str, separator: &str) -> Option<(&'s str, &'s str)> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut index = 0;

    while index < bytes.len() {
        let ch = bytes[index];
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                b'\'' | b'"' => quote = Some(ch),
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ => {
                    if depth == 0 && input[index..].starts_with(separator) {
                        return Some((&input[..index], &input[index + separator.len()..]));
                    }
                }
            },
        }
        index += 1;
    }
    None
}

/// `True`/`False`, integers, floats and single- or double-quoted
/// strings.
fn parse_literal(input: &str) -> Option<serde_json::Value> {
    let input = input.trim();

    match input {
        "True" => return Some(serde_json::Value::Bool(true)),
        "False" => return Some(serde_json::Value::Bool(false)),
        _ => {}
    }

    if (input.starts_with('\'') && input.ends_with('\'') && input.len() >= 2)
        || (input.starts_with('"') && input.ends_with('"') && input.len() >= 2)
    {
        let inner = &input[1..input.len() - 1];
        return Some(serde_json::Value::String(
            inner.replace("\\'", "'").replace("\\\\", "\\"),
        ));
    }

    if let Ok(int) = input.parse::<i64>() {
        return Some(serde_json::json!(int));
    }
    if input.contains('.') {
        if let Ok(float) = input.parse::<f64>() {
            return Some(serde_json::json!(float));
        }
    }
    None
}
