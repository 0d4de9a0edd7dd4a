//! The restricted Python surface that generated programs are written
//! in: expressions and statements sufficient for action calls, output
//! assignments, `if`/`elif` branching and the program scaffolding.
//! Rendering is deterministic, with four-space indentation.

use std::fmt::Write;

/// An expression of the generated program.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
    /// Equality comparison, the only operator branching conditions use.
    Compare {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    List(Vec<Expr>),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Expr {
        Expr::Name(name.into())
    }

    /// Builds `aps.<a>.<b>...` style attribute chains.
    pub fn attribute(value: Expr, attr: impl Into<String>) -> Expr {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>, keywords: Vec<(String, Expr)>) -> Expr {
        Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        }
    }

    /// Renders a JSON primitive as the equivalent Python literal.
    pub fn from_json(value: &serde_json::Value) -> Option<Expr> {
        match value {
            serde_json::Value::Bool(b) => Some(Expr::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Expr::Int(i))
                } else {
                    n.as_f64().map(Expr::Float)
                }
            }
            serde_json::Value::String(s) => Some(Expr::Str(s.clone())),
            _ => None,
        }
    }

    pub fn render(&self, w: &mut String) {
        match self {
            Expr::Name(name) => w.push_str(name),
            Expr::Str(s) => {
                w.push('\'');
                w.push_str(&s.replace('\\', "\\\\").replace('\'', "\\'"));
                w.push('\'');
            }
            Expr::Int(i) => {
                write!(w, "{i}").unwrap();
            }
            Expr::Float(f) => {
                // A float literal keeps its decimal point, so the parsed
                // value stays a float.
                if f.fract() == 0.0 && f.is_finite() {
                    write!(w, "{f:.1}").unwrap();
                } else {
                    write!(w, "{f}").unwrap();
                }
            }
            Expr::Bool(b) => w.push_str(if *b { "True" } else { "False" }),
            Expr::Attribute { value, attr } => {
                value.render(w);
                w.push('.');
                w.push_str(attr);
            }
            Expr::Subscript { value, index } => {
                value.render(w);
                w.push('[');
                index.render(w);
                w.push(']');
            }
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                func.render(w);
                w.push('(');
                let mut first = true;
                for arg in args {
                    if !first {
                        w.push_str(", ");
                    }
                    first = false;
                    arg.render(w);
                }
                for (key, value) in keywords {
                    if !first {
                        w.push_str(", ");
                    }
                    first = false;
                    w.push_str(key);
                    w.push('=');
                    value.render(w);
                }
                w.push(')');
            }
            Expr::Compare { left, right } => {
                left.render(w);
                w.push_str(" == ");
                right.render(w);
            }
            Expr::List(items) => {
                w.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    item.render(w);
                }
                w.push(']');
            }
        }
    }

    pub fn to_string(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// A statement of the generated program.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `a = value`, or `a, b = value` for multi-output assignments.
    Assign {
        targets: Vec<String>,
        value: Expr,
    },
    /// `name: annotation = value`.
    AnnAssign {
        target: String,
        annotation: String,
        value: Expr,
    },
    /// `if`/`elif` arms; no `else` is ever generated.
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    Continue,
    Pass,
    ImportFrom {
        module: String,
        names: Vec<String>,
    },
    FunctionDef {
        name: String,
        args: Vec<(String, Option<String>)>,
        returns: Option<String>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        exception: String,
        bind: String,
        handler: Vec<Stmt>,
    },
    With {
        item: Expr,
        bind: String,
        body: Vec<Stmt>,
    },
}

/// Rendering state: the output buffer and the current indent depth.
pub struct Context<'a> {
    pub into: &'a mut String,
    pub indent: usize,
}

impl<'a> Context<'a> {
    pub fn new(into: &'a mut String) -> Self {
        Self { into, indent: 0 }
    }

    fn push_indent(&mut self) {
        self.into
            .extend(std::iter::repeat(' ').take(self.indent * 4));
    }

    fn push_line(&mut self, line: &str) {
        self.push_indent();
        self.into.push_str(line);
        self.into.push('\n');
    }
}

impl Stmt {
    pub fn render(&self, ctx: &mut Context) {
        match self {
            Stmt::Expr(expr) => {
                ctx.push_line(&expr.to_string());
            }
            Stmt::Assign { targets, value } => {
                let mut line = targets.join(", ");
                line.push_str(" = ");
                value.render(&mut line);
                ctx.push_line(&line);
            }
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let mut line = format!("{target}: {annotation} = ");
                value.render(&mut line);
                ctx.push_line(&line);
            }
            Stmt::If { arms } => {
                for (index, (test, body)) in arms.iter().enumerate() {
                    let keyword = if index == 0 { "if" } else { "elif" };
                    ctx.push_line(&format!("{keyword} {}:", test.to_string()));
                    ctx.indent += 1;
                    render_body(body, ctx);
                    ctx.indent -= 1;
                }
            }
            Stmt::While { test, body } => {
                ctx.push_line(&format!("while {}:", test.to_string()));
                ctx.indent += 1;
                render_body(body, ctx);
                ctx.indent -= 1;
            }
            Stmt::Continue => ctx.push_line("continue"),
            Stmt::Pass => ctx.push_line("pass"),
            Stmt::ImportFrom { module, names } => {
                ctx.push_line(&format!("from {module} import {}", names.join(", ")));
            }
            Stmt::FunctionDef {
                name,
                args,
                returns,
                body,
            } => {
                let args = args
                    .iter()
                    .map(|(arg, annotation)| match annotation {
                        Some(annotation) => format!("{arg}: {annotation}"),
                        None => arg.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let returns = match returns {
                    Some(returns) => format!(" -> {returns}"),
                    None => String::new(),
                };
                ctx.push_line(&format!("def {name}({args}){returns}:"));
                ctx.indent += 1;
                render_body(body, ctx);
                ctx.indent -= 1;
            }
            Stmt::Try {
                body,
                exception,
                bind,
                handler,
            } => {
                ctx.push_line("try:");
                ctx.indent += 1;
                render_body(body, ctx);
                ctx.indent -= 1;
                ctx.push_line(&format!("except {exception} as {bind}:"));
                ctx.indent += 1;
                render_body(handler, ctx);
                ctx.indent -= 1;
            }
            Stmt::With { item, bind, body } => {
                ctx.push_line(&format!("with {} as {bind}:", item.to_string()));
                ctx.indent += 1;
                render_body(body, ctx);
                ctx.indent -= 1;
            }
        }
    }
}

fn render_body(body: &[Stmt], ctx: &mut Context) {
    if body.is_empty() {
        ctx.push_line("pass");
        return;
    }
    for stmt in body {
        stmt.render(ctx);
    }
}

/// Renders statements at the given indent depth.
pub fn render_stmts(stmts: &[Stmt], indent: usize) -> String {
    let mut out = String::new();
    let mut ctx = Context::new(&mut out);
    ctx.indent = indent;
    for stmt in stmts {
        stmt.render(&mut ctx);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_expr_rendering() {
        for (expr, expect) in [
            (Expr::Int(5), "5"),
            (Expr::Float(1.0), "1.0"),
            (Expr::Float(-1.1), "-1.1"),
            (Expr::Bool(true), "True"),
            (Expr::Str("ac1".into()), "'ac1'"),
            (Expr::Str("it's".into()), "'it\\'s'"),
            (
                Expr::attribute(
                    Expr::attribute(Expr::attribute(Expr::name("aps"), "ap1"), "poses"),
                    "default",
                ),
                "aps.ap1.poses.default",
            ),
        ] {
            assert_eq!(expr.to_string(), expect);
        }
    }

    #[test]
    fn test_call_rendering() {
        let call = Expr::call(
            Expr::attribute(Expr::name("test_name"), "test_par"),
            vec![Expr::name("int_const")],
            vec![("an".into(), Expr::Str("ac1".into()))],
        );
        assert_eq!(call.to_string(), "test_name.test_par(int_const, an='ac1')");

        let bare = Expr::call(
            Expr::attribute(Expr::name("test_name"), "test"),
            vec![],
            vec![("an".into(), Expr::Str("ac1".into()))],
        );
        assert_eq!(bare.to_string(), "test_name.test(an='ac1')");
    }

    #[test]
    fn test_if_rendering() {
        let stmt = Stmt::If {
            arms: vec![
                (
                    Expr::Compare {
                        left: Box::new(Expr::name("bool_res")),
                        right: Box::new(Expr::Bool(true)),
                    },
                    vec![Stmt::Continue],
                ),
                (
                    Expr::Compare {
                        left: Box::new(Expr::name("bool_res")),
                        right: Box::new(Expr::Bool(false)),
                    },
                    vec![Stmt::Pass],
                ),
            ],
        };
        assert_eq!(
            render_stmts(&[stmt], 1),
            "    if bool_res == True:\n        continue\n    elif bool_res == False:\n        pass\n"
        );
    }

    #[test]
    fn test_function_rendering() {
        let stmt = Stmt::FunctionDef {
            name: "main".into(),
            args: vec![("res".into(), Some("Resources".into()))],
            returns: Some("None".into()),
            body: vec![Stmt::Assign {
                targets: vec!["aps".into()],
                value: Expr::call(Expr::name("ActionPoints"), vec![Expr::name("res")], vec![]),
            }],
        };
        assert_eq!(
            render_stmts(&[stmt], 0),
            "def main(res: Resources) -> None:\n    aps = ActionPoints(res)\n"
        );
    }
}
