// SPDX-License-Identifier: GPL-3.0-or-later

//! PAP (flowchart) backend.
//!
//! Instead of linear text this backend redraws each routine as a
//! PapDesigner node/edge graph. Three passes over a mirror tree:
//! `measure` (bottom-up raster extents), `place` (top-down coordinates,
//! assigned once and never revised), `emit` (figures and connections with
//! per-diagram monotonically increasing ids). The result is serialized to
//! PAP-XML the same way metadata files are elsewhere in this crate.

use anyhow::Result;
use quick_xml::se::{QuoteLevel, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::{
    backends::{session::Session, Backend},
    ir::{Element, Program, Root, Subqueue},
    lexer::{concat, tokenize, unify_operators, Token},
};

// The GUID is a constant prescribed by the PapDesigner file format.
const FRAME_GUID: &str = "2FB25471-B62C-4EE6-BD43-F819C095ACF8";
const APP_VERSION: &str = "2.2.0.8";

pub struct Pap;

impl Backend for Pap {
    fn generate(&self, program: &Program, session: &mut Session) -> Result<String> {
        let mut diagrams = Vec::new();
        for (no, root) in std::iter::once(&program.main)
            .chain(program.routines.iter())
            .enumerate()
        {
            diagrams.push(diagram(no as u32, root, session));
        }
        debug!("Laid out {} diagram(s)", diagrams.len());
        let frame = Frame {
            guid: FRAME_GUID,
            format: "0000",
            app_version: APP_VERSION,
            checksum: "UNSIGNED",
            project: Project {
                format: "1.00",
                name: program.main.name.to_uppercase(),
                author: program.main.author.clone().unwrap_or_default(),
                created: program.main.created.clone().unwrap_or_default(),
                diagrams: Diagrams { diagrams },
            },
        };
        let mut out = String::new();
        let mut ser = Serializer::with_root(&mut out, Some("FRAME"))?;
        ser.set_quote_level(QuoteLevel::Full);
        ser.indent(' ', 2);
        frame.serialize(ser)?;
        out.push('\n');
        Ok(out)
    }
}

fn diagram(no: u32, root: &Root, session: &Session) -> Diagram {
    let mut node = Node::routine(root, session);
    let columns = node.width();
    let rows = node.height;
    // the axis column is the body's left extent mirrored to zero
    node.place(0, -node.left);
    let mut out = Output::default();
    node.emit(&mut out);
    Diagram {
        format: "1.00",
        id: no,
        name: header_text(root),
        created: root.created.clone().unwrap_or_default(),
        layout: Layout {
            format: "1.00",
            columns,
            rows,
            entries: Entries {
                entries: out.entries,
            },
        },
        connections: Connections {
            connections: out.connections,
        },
    }
}

/// Pascal-style routine header recognized by PapDesigner's call mapping.
fn header_text(root: &Root) -> String {
    if root.parameters.is_empty() && root.result_type.is_none() {
        return root.name.clone();
    }
    let params: Vec<String> = root
        .parameters
        .iter()
        .map(|p| match &p.type_name {
            Some(t) => format!("{}:{}", p.name, t),
            None => p.name.clone(),
        })
        .collect();
    let mut header = format!("{}({})", root.name, params.join(", "));
    if let Some(result) = &root.result_type {
        header.push_str(": ");
        header.push_str(result);
    }
    header
}

/// Statement text in the Pascal-like spelling PapDesigner displays.
fn transform(line: &str) -> String {
    let mut tokens = tokenize(line);
    unify_operators(&mut tokens, false);
    for t in tokens.iter_mut() {
        if let Token::Op(op) = t {
            if op == "<-" {
                *op = ":=".to_string();
            }
        }
    }
    concat(&tokens).trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FigureKind {
    Title,
    Start,
    End,
    Connector,
    Activity,
    Input,
    Output,
    Module,
    Condition,
    LoopStart,
    LoopEnd,
}

impl FigureKind {
    fn subtype(self) -> &'static str {
        match self {
            FigureKind::Title => "PapTitle",
            FigureKind::Start => "PapStart",
            FigureKind::End => "PapEnd",
            FigureKind::Connector => "PapConnector",
            FigureKind::Activity => "PapActivity",
            FigureKind::Input => "PapInput",
            FigureKind::Output => "PapOutput",
            FigureKind::Module => "PapModule",
            FigureKind::Condition => "PapCondition",
            FigureKind::LoopStart => "PapLoopStart",
            FigureKind::LoopEnd => "PapLoopEnd",
        }
    }
}

/// Figure/connection sink with the per-diagram id counter.
#[derive(Default)]
struct Output {
    entries: Vec<Entry>,
    connections: Vec<Connection>,
    next_id: u64,
}

impl Output {
    fn figure(&mut self, row: i32, col: i32, kind: FigureKind, text: &str) -> u64 {
        self.figure_associated(row, col, kind, text, None)
    }

    fn figure_associated(
        &mut self,
        row: i32,
        col: i32,
        kind: FigureKind,
        text: &str,
        associate: Option<u64>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            column: col,
            row,
            anchor: if kind == FigureKind::Title {
                Some("True".to_string())
            } else {
                None
            },
            figure: Figure {
                subtype: kind.subtype(),
                format: "1.00",
                id,
                associate,
                text: Text {
                    value: text.to_string(),
                },
            },
        });
        id
    }

    fn connect(&mut self, from: u64, to: u64, text: &str) {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.push(Connection {
            format: "1.00",
            id,
            from,
            to,
            text: text.to_string(),
        });
    }
}

/// One figure row: kind plus display text.
type Row = (FigureKind, String);

/// A labeled branch hanging off a condition or fork node.
struct Arm {
    label: String,
    offset: i32,
    node: Node,
}

enum Shape {
    /// A vertical chain of figures (instruction lines, calls, jumps).
    Rows(Vec<Row>),
    Sequence(Vec<Node>),
    /// Condition or fork figure with side-by-side branches and a joining
    /// connector row underneath.
    Branch { head: Row, arms: Vec<Arm> },
    /// DIN 66001 loop bracket: a start and an associated end figure
    /// around the body. Post-condition loops carry their text on the end
    /// figure instead of the start figure.
    Loop {
        text: String,
        post: bool,
        body: Box<Node>,
    },
}

/// Mirror-tree node. `left`/`right`/`height` are raster extents relative
/// to the node's vertical axis, computed bottom-up before any placement;
/// `row`/`col` are absolute and assigned exactly once.
struct Node {
    shape: Shape,
    left: i32,
    right: i32,
    height: i32,
    row: i32,
    col: i32,
}

impl Node {
    fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    // ------------------------------------------------------ measure pass

    fn rows(rows: Vec<Row>) -> Self {
        let height = rows.len() as i32;
        Node {
            shape: Shape::Rows(rows),
            left: 0,
            right: 0,
            height,
            row: 0,
            col: 0,
        }
    }

    fn sequence(nodes: Vec<Node>) -> Self {
        let height = nodes.iter().map(|n| n.height).sum();
        let left = nodes.iter().map(|n| n.left).min().unwrap_or(0);
        let right = nodes.iter().map(|n| n.right).max().unwrap_or(0);
        Node {
            shape: Shape::Sequence(nodes),
            left,
            right,
            height,
            row: 0,
            col: 0,
        }
    }

    /// Arms are laid out symmetrically around the head's axis, each one
    /// shifted far enough that sibling extents cannot overlap.
    fn branch(head: Row, arms: Vec<(String, Node)>) -> Self {
        let mut placed = Vec::with_capacity(arms.len());
        let total: i32 = arms.iter().map(|(_, n)| n.width()).sum();
        let mut cursor = -(total / 2);
        let mut left = 0;
        let mut right = 0;
        let mut arm_height = 0;
        for (label, node) in arms {
            let offset = cursor - node.left;
            left = left.min(offset + node.left);
            right = right.max(offset + node.right);
            arm_height = arm_height.max(node.height);
            cursor += node.width();
            placed.push(Arm {
                label,
                offset,
                node,
            });
        }
        Node {
            shape: Shape::Branch { head, arms: placed },
            left,
            right,
            // head row + branches + joining connector
            height: 1 + arm_height + 1,
            row: 0,
            col: 0,
        }
    }

    fn bracket_loop(text: String, post: bool, body: Node) -> Self {
        let left = body.left;
        let right = body.right;
        let height = body.height + 2;
        Node {
            shape: Shape::Loop {
                text,
                post,
                body: Box::new(body),
            },
            left,
            right,
            height,
            row: 0,
            col: 0,
        }
    }

    fn routine(root: &Root, session: &Session) -> Self {
        let body = Node::subqueue(&root.body, session);
        let mut nodes = vec![
            Node::rows(vec![(FigureKind::Title, header_text(root))]),
            Node::rows(vec![(FigureKind::Start, "Start".to_string())]),
        ];
        nodes.push(body);
        nodes.push(Node::rows(vec![(FigureKind::End, "End".to_string())]));
        Node::sequence(nodes)
    }

    fn subqueue(squeue: &Subqueue, session: &Session) -> Self {
        let nodes = squeue
            .iter()
            .filter(|e| !e.disabled())
            .map(|e| Node::element(e, session))
            .collect();
        Node::sequence(nodes)
    }

    fn element(elem: &Element, session: &Session) -> Self {
        let keywords = &session.keywords;
        match elem {
            Element::Instruction(ins) => {
                let rows = ins
                    .lines
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .map(|line| {
                        use crate::ir::keywords::KeywordTable;
                        if let Some(rest) = KeywordTable::match_keyword(line, &keywords.input) {
                            (FigureKind::Input, transform(rest))
                        } else if let Some(rest) =
                            KeywordTable::match_keyword(line, &keywords.output)
                        {
                            (FigureKind::Output, transform(rest))
                        } else {
                            (FigureKind::Activity, transform(line))
                        }
                    })
                    .collect();
                Node::rows(rows)
            }
            Element::Call(call) => {
                let rows = call
                    .lines
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .map(|line| (FigureKind::Module, transform(line)))
                    .collect();
                Node::rows(rows)
            }
            Element::Jump(jump) => Node::rows(vec![(
                FigureKind::Activity,
                if jump.text.trim().is_empty() {
                    "leave".to_string()
                } else {
                    transform(&jump.text)
                },
            )]),
            Element::Alternative(alt) => Node::branch(
                (FigureKind::Condition, transform(&alt.condition)),
                vec![
                    ("true".to_string(), Node::subqueue(&alt.q_true, session)),
                    ("false".to_string(), Node::subqueue(&alt.q_false, session)),
                ],
            ),
            Element::Case(case) => {
                let mut arms: Vec<(String, Node)> = case
                    .selector_branches()
                    .iter()
                    .map(|b| (b.selectors.clone(), Node::subqueue(&b.body, session)))
                    .collect();
                if let Some(default) = case.default_branch() {
                    arms.push(("else".to_string(), Node::subqueue(default, session)));
                }
                Node::branch(
                    (FigureKind::Condition, transform(&case.discriminant)),
                    arms,
                )
            }
            Element::Parallel(par) => {
                let arms = par
                    .branches
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (format!("branch {}", i + 1), Node::subqueue(b, session)))
                    .collect();
                Node::branch((FigureKind::Connector, "parallel".to_string()), arms)
            }
            Element::For(f) => Node::bracket_loop(
                transform(&f.text),
                false,
                Node::subqueue(&f.body, session),
            ),
            Element::While(w) => Node::bracket_loop(
                transform(&w.condition),
                false,
                Node::subqueue(&w.body, session),
            ),
            Element::Repeat(r) => Node::bracket_loop(
                transform(&r.condition),
                true,
                Node::subqueue(&r.body, session),
            ),
            Element::Forever(f) => {
                Node::bracket_loop(String::new(), false, Node::subqueue(&f.body, session))
            }
            Element::Try(t) => {
                let mut nodes = vec![
                    Node::rows(vec![(FigureKind::Connector, "try".to_string())]),
                    Node::subqueue(&t.body, session),
                    Node::rows(vec![(
                        FigureKind::Connector,
                        match &t.catch_var {
                            Some(var) => format!("catch ({})", var),
                            None => "catch".to_string(),
                        },
                    )]),
                    Node::subqueue(&t.catch, session),
                ];
                if !t.finally.is_empty() {
                    nodes.push(Node::rows(vec![(
                        FigureKind::Connector,
                        "finally".to_string(),
                    )]));
                    nodes.push(Node::subqueue(&t.finally, session));
                }
                Node::sequence(nodes)
            }
        }
    }

    // -------------------------------------------------------- place pass

    /// Assign absolute coordinates; `col` is the node's axis column.
    /// Extents are final at this point, nothing is ever re-measured.
    fn place(&mut self, row: i32, col: i32) {
        self.row = row;
        self.col = col;
        match &mut self.shape {
            Shape::Rows(_) => (),
            Shape::Sequence(nodes) => {
                let mut r = row;
                for node in nodes {
                    let h = node.height;
                    node.place(r, col);
                    r += h;
                }
            }
            Shape::Branch { arms, .. } => {
                for arm in arms {
                    let offset = arm.offset;
                    arm.node.place(row + 1, col + offset);
                }
            }
            Shape::Loop { body, .. } => {
                body.place(row + 1, col);
            }
        }
    }

    // --------------------------------------------------------- emit pass

    /// Returns the ids of the node's entry and exit figures, or None for
    /// an empty node so the caller can wire straight through it.
    fn emit(&self, out: &mut Output) -> Option<(u64, u64)> {
        match &self.shape {
            Shape::Rows(rows) => {
                let mut first = None;
                let mut prev: Option<u64> = None;
                for (i, (kind, text)) in rows.iter().enumerate() {
                    let id = out.figure(self.row + i as i32, self.col, *kind, text);
                    if let Some(prev) = prev {
                        out.connect(prev, id, "");
                    }
                    first.get_or_insert(id);
                    prev = Some(id);
                }
                first.map(|f| (f, prev.unwrap_or(f)))
            }
            Shape::Sequence(nodes) => {
                let mut first = None;
                let mut prev: Option<u64> = None;
                for node in nodes {
                    if let Some((f, l)) = node.emit(out) {
                        if let Some(prev) = prev {
                            out.connect(prev, f, "");
                        }
                        first.get_or_insert(f);
                        prev = Some(l);
                    }
                }
                first.map(|f| (f, prev.unwrap_or(f)))
            }
            Shape::Branch { head, arms } => {
                let head_id = out.figure(self.row, self.col, head.0, &head.1);
                let join_row = self.row + self.height - 1;
                let join_id = out.figure(join_row, self.col, FigureKind::Connector, "");
                for arm in arms {
                    match arm.node.emit(out) {
                        Some((f, l)) => {
                            out.connect(head_id, f, &arm.label);
                            out.connect(l, join_id, "");
                        }
                        None => out.connect(head_id, join_id, &arm.label),
                    }
                }
                Some((head_id, join_id))
            }
            Shape::Loop { text, post, body } => {
                let (start_text, end_text) = if *post {
                    ("", text.as_str())
                } else {
                    (text.as_str(), "")
                };
                let start_id = out.figure(self.row, self.col, FigureKind::LoopStart, start_text);
                let end_row = self.row + self.height - 1;
                let end_id = out.figure_associated(
                    end_row,
                    self.col,
                    FigureKind::LoopEnd,
                    end_text,
                    Some(start_id),
                );
                match body.emit(out) {
                    Some((f, l)) => {
                        out.connect(start_id, f, "");
                        out.connect(l, end_id, "");
                    }
                    None => out.connect(start_id, end_id, ""),
                }
                Some((start_id, end_id))
            }
        }
    }
}

// ------------------------------------------------------- XML data model

#[derive(Debug, Serialize)]
struct Frame {
    #[serde(rename = "@GUID")]
    guid: &'static str,
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@APP_VERSION")]
    app_version: &'static str,
    #[serde(rename = "@CHECKSUM")]
    checksum: &'static str,
    #[serde(rename = "PROJECT")]
    project: Project,
}

#[derive(Debug, Serialize)]
struct Project {
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@NAME")]
    name: String,
    #[serde(rename = "@AUTHOR")]
    author: String,
    #[serde(rename = "@CREATED")]
    created: String,
    #[serde(rename = "DIAGRAMS")]
    diagrams: Diagrams,
}

#[derive(Debug, Serialize)]
struct Diagrams {
    #[serde(rename = "DIAGRAM")]
    diagrams: Vec<Diagram>,
}

#[derive(Debug, Serialize)]
struct Diagram {
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@ID")]
    id: u32,
    #[serde(rename = "@NAME")]
    name: String,
    #[serde(rename = "@CREATED")]
    created: String,
    #[serde(rename = "LAYOUT")]
    layout: Layout,
    #[serde(rename = "CONNECTIONS")]
    connections: Connections,
}

#[derive(Debug, Serialize)]
struct Layout {
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@COLUMNS")]
    columns: i32,
    #[serde(rename = "@ROWS")]
    rows: i32,
    #[serde(rename = "ENTRIES")]
    entries: Entries,
}

#[derive(Debug, Serialize)]
struct Entries {
    #[serde(rename = "ENTRY")]
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
struct Entry {
    #[serde(rename = "@COLUMN")]
    column: i32,
    #[serde(rename = "@ROW")]
    row: i32,
    #[serde(rename = "@ANCHOR", skip_serializing_if = "Option::is_none")]
    anchor: Option<String>,
    #[serde(rename = "FIGURE")]
    figure: Figure,
}

#[derive(Debug, Serialize)]
struct Figure {
    #[serde(rename = "@SUBTYPE")]
    subtype: &'static str,
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@ID")]
    id: u64,
    #[serde(rename = "@ASSOCIATE", skip_serializing_if = "Option::is_none")]
    associate: Option<u64>,
    #[serde(rename = "TEXT")]
    text: Text,
}

#[derive(Debug, Serialize)]
struct Text {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Serialize)]
struct Connections {
    #[serde(rename = "CONNECTION")]
    connections: Vec<Connection>,
}

#[derive(Debug, Serialize)]
struct Connection {
    #[serde(rename = "@FORMAT")]
    format: &'static str,
    #[serde(rename = "@ID")]
    id: u64,
    #[serde(rename = "@FROM")]
    from: u64,
    #[serde(rename = "@TO")]
    to: u64,
    #[serde(rename = "@TEXT")]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Program;
    use pretty_assertions::assert_eq;

    fn sample() -> Program {
        let root: Root = serde_yaml::from_str(
            r#"
name: triple
body:
  - kind: instruction
    lines: ["x <- 3"]
  - kind: alternative
    condition: "x > 0"
    q_true:
      - kind: instruction
        lines: ["OUTPUT x"]
    q_false: []
"#,
        )
        .unwrap();
        Program::from(root)
    }

    #[test]
    fn it_measures_before_placing() {
        let session = Session::default();
        let program = sample();
        let node = Node::routine(&program.main, &session);
        // title + start + instruction + (condition/branch/join) + end
        assert_eq!(node.height, 2 + 1 + 3 + 1);
        assert!(node.width() >= 1);
    }

    #[test]
    fn it_is_deterministic() {
        let program = sample();
        let a = Pap
            .generate(&program, &mut Session::default())
            .unwrap();
        let b = Pap
            .generate(&program, &mut Session::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn it_resets_ids_per_diagram() {
        let session = Session::default();
        let program = sample();
        let first = diagram(0, &program.main, &session);
        let second = diagram(1, &program.main, &session);
        assert_eq!(
            first.layout.entries.entries[0].figure.id,
            second.layout.entries.entries[0].figure.id
        );
    }

    #[test]
    fn it_wires_empty_branches_straight_to_the_join() {
        let session = Session::default();
        let program = sample();
        let mut node = Node::routine(&program.main, &session);
        node.place(0, -node.left);
        let mut out = Output::default();
        node.emit(&mut out);
        // the empty false branch produces a labeled direct connection
        assert!(out
            .connections
            .iter()
            .any(|c| c.text == "false"));
    }
}
