// SPDX-License-Identifier: GPL-3.0-or-later

//! The element tree: a closed set of structured-programming constructs.

use std::{fmt, str::FromStr};

use anyhow::{bail, Error};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::ir::types::TypeMap;

/// Stable identity of one element within a tree.
///
/// Generators key their side tables (jump labels, geometry ids) on it, so
/// the tree itself stays read-only. Auto-generated when the source omits it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Id {
    inner: String,
}

impl Default for Id {
    fn default() -> Self {
        Id {
            inner: Uuid::new_v4().to_string(),
        }
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = crate::regex!(r"^[a-zA-Z0-9_-]+$");
        if valid.is_match(s) {
            Ok(Id {
                inner: s.to_string(),
            })
        } else {
            bail!("Invalid id: {}", s)
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// An ordered sequence of sibling elements; the universal child container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subqueue {
    pub elements: Vec<Element>,
}

impl Subqueue {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(|e| e.disabled())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
    Instruction(Instruction),
    Alternative(Alternative),
    Case(Case),
    For(For),
    While(While),
    Repeat(Repeat),
    Forever(Forever),
    Call(Call),
    Jump(Jump),
    Parallel(Parallel),
    Try(Try),
}

impl Element {
    pub fn id(&self) -> &Id {
        match self {
            Element::Instruction(e) => &e.id,
            Element::Alternative(e) => &e.id,
            Element::Case(e) => &e.id,
            Element::For(e) => &e.id,
            Element::While(e) => &e.id,
            Element::Repeat(e) => &e.id,
            Element::Forever(e) => &e.id,
            Element::Call(e) => &e.id,
            Element::Jump(e) => &e.id,
            Element::Parallel(e) => &e.id,
            Element::Try(e) => &e.id,
        }
    }

    pub fn disabled(&self) -> bool {
        match self {
            Element::Instruction(e) => e.disabled,
            Element::Alternative(e) => e.disabled,
            Element::Case(e) => e.disabled,
            Element::For(e) => e.disabled,
            Element::While(e) => e.disabled,
            Element::Repeat(e) => e.disabled,
            Element::Forever(e) => e.disabled,
            Element::Call(e) => e.disabled,
            Element::Jump(e) => e.disabled,
            Element::Parallel(e) => e.disabled,
            Element::Try(e) => e.disabled,
        }
    }

    pub fn comment(&self) -> &[String] {
        match self {
            Element::Instruction(e) => &e.comment,
            Element::Alternative(e) => &e.comment,
            Element::Case(e) => &e.comment,
            Element::For(e) => &e.comment,
            Element::While(e) => &e.comment,
            Element::Repeat(e) => &e.comment,
            Element::Forever(e) => &e.comment,
            Element::Call(e) => &e.comment,
            Element::Jump(e) => &e.comment,
            Element::Parallel(e) => &e.comment,
            Element::Try(e) => &e.comment,
        }
    }

    /// The raw text lines of this element, for diagnostics and for the
    /// commented-out rendering of disabled elements.
    pub fn text_lines(&self) -> Vec<String> {
        match self {
            Element::Instruction(e) => e.lines.clone(),
            Element::Alternative(e) => vec![e.condition.clone()],
            Element::Case(e) => vec![e.discriminant.clone()],
            Element::For(e) => vec![e.text.clone()],
            Element::While(e) => vec![e.condition.clone()],
            Element::Repeat(e) => vec![e.condition.clone()],
            Element::Forever(_) => vec![],
            Element::Call(e) => e.lines.clone(),
            Element::Jump(e) => vec![e.text.clone()],
            Element::Parallel(_) => vec![],
            Element::Try(_) => vec![],
        }
    }

    /// Every child sequence this element owns, in source order.
    pub fn subqueues(&self) -> Vec<&Subqueue> {
        match self {
            Element::Instruction(_) | Element::Call(_) | Element::Jump(_) => vec![],
            Element::Alternative(e) => vec![&e.q_true, &e.q_false],
            Element::Case(e) => e.branches.iter().map(|b| &b.body).collect(),
            Element::For(e) => vec![&e.body],
            Element::While(e) => vec![&e.body],
            Element::Repeat(e) => vec![&e.body],
            Element::Forever(e) => vec![&e.body],
            Element::Parallel(e) => e.branches.iter().collect(),
            Element::Try(e) => vec![&e.body, &e.catch, &e.finally],
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Element::For(_) | Element::While(_) | Element::Repeat(_) | Element::Forever(_)
        )
    }
}

/// A list of simple statements: assignments, declarations, input, output.
/// The kinds are distinguished lexically, not structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(default)]
    pub id: Id,
    pub lines: Vec<String>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub id: Id,
    pub condition: String,
    #[serde(default)]
    pub q_true: Subqueue,
    #[serde(default)]
    pub q_false: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// The reserved selector marking the final Case branch as "no default".
pub const NO_DEFAULT: &str = "%";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default)]
    pub id: Id,
    pub discriminant: String,
    /// All but the last branch carry comma-separated literal selectors.
    /// The last branch is the default branch, unless its selector is the
    /// [`NO_DEFAULT`] sentinel.
    pub branches: Vec<CaseBranch>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBranch {
    pub selectors: String,
    #[serde(default)]
    pub body: Subqueue,
}

impl Case {
    pub fn has_default(&self) -> bool {
        self.branches
            .last()
            .map(|b| b.selectors.trim() != NO_DEFAULT)
            .unwrap_or(false)
    }

    /// Branches with explicit selector lists (all but the final one).
    pub fn selector_branches(&self) -> &[CaseBranch] {
        if self.branches.is_empty() {
            &[]
        } else {
            &self.branches[..self.branches.len() - 1]
        }
    }

    pub fn default_branch(&self) -> Option<&Subqueue> {
        if self.has_default() {
            self.branches.last().map(|b| &b.body)
        } else {
            None
        }
    }
}

/// Counting, for-each or free-text loop; the shape is recovered from `text`
/// against the keyword table when the loop is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct For {
    #[serde(default)]
    pub id: Id,
    pub text: String,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct While {
    #[serde(default)]
    pub id: Id,
    pub condition: String,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Post-condition loop; the body repeats until `condition` becomes true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    #[serde(default)]
    pub id: Id,
    pub condition: String,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forever {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Calls of other routines, one per line, optionally assigning a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default)]
    pub id: Id,
    pub lines: Vec<String>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// A control exit: leave-N-levels, return, exit or throw.
/// Empty text means "leave the innermost enclosing loop".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// Independently scheduled branches; no shared-state protection is modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
    #[serde(default)]
    pub id: Id,
    pub branches: Vec<Subqueue>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Try {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub catch_var: Option<String>,
    #[serde(default)]
    pub catch: Subqueue,
    #[serde(default)]
    pub finally: Subqueue,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    #[default]
    Program,
    Subroutine,
    Includable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: String,
}

/// One complete diagram: a program, subroutine or includable fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub kind: RoutineKind,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub body: Subqueue,
    #[serde(default)]
    pub types: TypeMap,
    #[serde(default)]
    pub constants: Vec<Constant>,
}

impl Root {
    /// Routines returning a value compose a result slot; programs don't.
    pub fn is_function(&self) -> bool {
        self.result_type.is_some()
    }

    /// Scope key for the declaration dedup tracker.
    pub fn signature(&self) -> String {
        format!("{}#{}", self.name, self.parameters.len())
    }
}

/// One export unit: the top-level diagram plus the routines it may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub main: Root,
    #[serde(default)]
    pub routines: Vec<Root>,
}

impl From<Root> for Program {
    fn from(main: Root) -> Self {
        Program {
            main,
            routines: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_rejects_invalid_ids() {
        assert!(Id::from_str("a-b_3").is_ok());
        assert!(Id::from_str("").is_err());
        assert!(Id::from_str("a b").is_err());
    }

    #[test]
    fn it_detects_the_no_default_sentinel() {
        let case = Case {
            id: Id::default(),
            discriminant: "x".to_string(),
            branches: vec![
                CaseBranch {
                    selectors: "1, 2".to_string(),
                    body: Subqueue::default(),
                },
                CaseBranch {
                    selectors: "%".to_string(),
                    body: Subqueue::default(),
                },
            ],
            comment: vec![],
            disabled: false,
        };
        assert!(!case.has_default());
        assert_eq!(case.selector_branches().len(), 1);
        assert!(case.default_branch().is_none());
    }

    #[test]
    fn it_parses_a_yaml_tree() {
        let yaml = r#"
name: demo
kind: program
body:
  - kind: instruction
    lines: ["x <- 3 + 4"]
  - kind: alternative
    condition: "x > 0"
    q_true:
      - kind: jump
        text: "return x"
"#;
        let root: Root = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(root.name, "demo");
        assert_eq!(root.body.elements.len(), 2);
        match &root.body.elements[1] {
            Element::Alternative(alt) => {
                assert_eq!(alt.condition, "x > 0");
                assert_eq!(alt.q_true.elements.len(), 1);
                assert!(alt.q_false.is_empty());
            }
            other => panic!("unexpected element: {:?}", other),
        }
    }
}
