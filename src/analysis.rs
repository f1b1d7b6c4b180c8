// SPDX-License-Identifier: GPL-3.0-or-later

//! Jump and reachability analysis.
//!
//! A recursive pre-pass over the element tree that resolves every jump-like
//! exit statement to its lexical target loop (assigning label ids for back
//! ends that need goto/label pairs), and decides whether a sequence is
//! guaranteed to return a value on every path (so a synthetic trailing
//! return can be skipped).

use std::collections::HashMap;

use tracing::warn;

use crate::ir::{
    element::{Id, Jump},
    keywords::KeywordTable,
    Element, Subqueue,
};

/// Lexical classification of a jump statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpKind {
    /// `return` with an optional value expression.
    Return(Option<String>),
    /// `exit` with an optional exit code expression.
    Exit(Option<String>),
    /// `throw` with an optional value/type expression.
    Throw(Option<String>),
    /// `leave N`; empty jump text means `leave 1`.
    Leave(u32),
}

/// Classify a jump by its leading keyword, case-insensitively.
pub fn classify_jump(text: &str, keywords: &KeywordTable) -> JumpKind {
    let text = text.trim();
    if text.is_empty() {
        return JumpKind::Leave(1);
    }
    let arg = |rest: &str| {
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    };
    if let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_return) {
        return JumpKind::Return(arg(rest));
    }
    if let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_exit) {
        return JumpKind::Exit(arg(rest));
    }
    if let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_throw) {
        return JumpKind::Throw(arg(rest));
    }
    if let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_leave) {
        if rest.is_empty() {
            return JumpKind::Leave(1);
        }
        return match rest.parse::<u32>() {
            Ok(n) if n > 0 => JumpKind::Leave(n),
            _ => {
                warn!("Unsuited leave argument in jump \"{}\"", text);
                JumpKind::Leave(1)
            }
        };
    }
    // Unprefixed text: treated like an empty jump
    JumpKind::Leave(1)
}

/// Resolution state of one analyzed jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    /// Target loop found; `levels` counts every break-consuming construct
    /// between the jump and its target: the loops themselves, plus crossed
    /// Case constructs when the back end's switch consumes a break.
    Label { id: i32, levels: u32 },
    /// No enclosing loop matches the requested exit level.
    Unresolved,
}

impl JumpTarget {
    /// The synthetic label id, `-1` for unresolvable jumps.
    pub fn label_id(&self) -> i32 {
        match self {
            JumpTarget::Label { id, .. } => *id,
            JumpTarget::Unresolved => -1,
        }
    }
}

enum Ancestor<'a> {
    Loop(&'a Id),
    Case,
    Parallel,
}

/// Result of one analysis run over a routine body.
#[derive(Debug, Default)]
pub struct JumpAnalysis {
    /// Jump element id to resolved target.
    pub jump_targets: HashMap<Id, JumpTarget>,
    /// Loop element id to the label id jumps leave it through.
    pub loop_labels: HashMap<Id, i32>,
    /// An explicit value-returning `return` occurs somewhere reachable.
    pub returns: bool,
    /// Every execution path returns a value (or definitely exits).
    pub always_returns: bool,
    label_count: i32,
}

impl JumpAnalysis {
    pub fn target_of(&self, jump: &Jump) -> Option<JumpTarget> {
        self.jump_targets.get(&jump.id).copied()
    }

    pub fn label_of_loop(&self, id: &Id) -> Option<i32> {
        self.loop_labels.get(id).copied()
    }

    /// Number of loop labels the analysis assigned.
    pub fn label_count(&self) -> i32 {
        self.label_count
    }
}

/// Analyze a routine body.
///
/// `break_matches_case` is the back end's capability flag: whether its
/// native single-level break also leaves a Case construct (C-family
/// `switch` consumes the break, so a jump crossing a Case needs a label).
pub fn analyze(
    body: &Subqueue,
    keywords: &KeywordTable,
    break_matches_case: bool,
) -> JumpAnalysis {
    let mut analysis = JumpAnalysis::default();
    let mut ancestors = Vec::new();
    analysis.always_returns =
        analysis.map_jumps(body, &mut ancestors, keywords, break_matches_case);
    analysis
}

impl JumpAnalysis {
    fn map_jumps<'a>(
        &mut self,
        squeue: &'a Subqueue,
        ancestors: &mut Vec<Ancestor<'a>>,
        keywords: &KeywordTable,
        break_matches_case: bool,
    ) -> bool {
        let mut surely_returns = false;
        for elem in squeue.iter() {
            if surely_returns {
                // dead code past an unconditional return is not examined
                break;
            }
            if elem.disabled() {
                continue;
            }
            match elem {
                Element::Jump(jump) => match classify_jump(&jump.text, keywords) {
                    JumpKind::Return(expr) => {
                        let has_result = expr.is_some();
                        if has_result {
                            self.returns = true;
                        }
                        return has_result;
                    }
                    JumpKind::Exit(_) | JumpKind::Throw(_) => {
                        // No regular result, but no path past it either, so
                        // a synthetic trailing return stays unnecessary.
                        return true;
                    }
                    JumpKind::Leave(requested) => {
                        let mut levels = requested;
                        let mut simple_break = levels == 1;
                        // what a level-counting `break n` enumerates on the way out
                        let mut crossed = 0u32;
                        for ancestor in ancestors.iter().rev() {
                            if levels == 0 {
                                break;
                            }
                            match ancestor {
                                // Leaving a parallel branch is illegal
                                Ancestor::Parallel => break,
                                Ancestor::Case => {
                                    if break_matches_case {
                                        simple_break = false;
                                        crossed += 1;
                                    }
                                }
                                Ancestor::Loop(loop_id) => {
                                    levels -= 1;
                                    crossed += 1;
                                    if levels == 0 && !simple_break {
                                        let label = match self.loop_labels.get(*loop_id) {
                                            Some(l) => *l,
                                            None => {
                                                let l = self.label_count;
                                                self.label_count += 1;
                                                self.loop_labels.insert((*loop_id).clone(), l);
                                                l
                                            }
                                        };
                                        self.jump_targets.insert(
                                            jump.id.clone(),
                                            JumpTarget::Label {
                                                id: label,
                                                levels: crossed,
                                            },
                                        );
                                    }
                                }
                            }
                        }
                        if levels > 0 {
                            // Back ends surface this as a diagnostic, never drop it
                            self.jump_targets
                                .insert(jump.id.clone(), JumpTarget::Unresolved);
                        } else {
                            // the remaining instructions are unreachable
                            return surely_returns;
                        }
                    }
                },
                Element::Instruction(ins) => {
                    for line in &ins.lines {
                        if let Some(rest) =
                            KeywordTable::match_keyword(line, &keywords.pre_return)
                        {
                            if !rest.is_empty() {
                                self.returns = true;
                                surely_returns = true;
                            }
                        }
                    }
                }
                Element::Alternative(alt) => {
                    let returns_true =
                        self.map_jumps(&alt.q_true, ancestors, keywords, break_matches_case);
                    let returns_false =
                        self.map_jumps(&alt.q_false, ancestors, keywords, break_matches_case);
                    surely_returns = returns_true && returns_false;
                }
                Element::Case(case) => {
                    let has_default = case.has_default();
                    let mut all_return = !case.branches.is_empty();
                    ancestors.push(Ancestor::Case);
                    for (i, branch) in case.branches.iter().enumerate() {
                        if !has_default && i + 1 == case.branches.len() {
                            // sentinel branch, no body to analyze
                            continue;
                        }
                        let branch_returns = self.map_jumps(
                            &branch.body,
                            ancestors,
                            keywords,
                            break_matches_case,
                        );
                        all_return = all_return && branch_returns;
                    }
                    ancestors.pop();
                    // Without a default branch some selector value may fall
                    // through, so the guarantee needs every branch AND a default.
                    if all_return && has_default {
                        surely_returns = true;
                    }
                }
                Element::For(_) | Element::While(_) | Element::Repeat(_) | Element::Forever(_) => {
                    ancestors.push(Ancestor::Loop(elem.id()));
                    let body = elem.subqueues()[0];
                    // loop bodies may run zero times: no guarantee propagates
                    let _ = self.map_jumps(body, ancestors, keywords, break_matches_case);
                    ancestors.pop();
                }
                Element::Parallel(par) => {
                    ancestors.push(Ancestor::Parallel);
                    for branch in &par.branches {
                        let _ = self.map_jumps(branch, ancestors, keywords, break_matches_case);
                    }
                    ancestors.pop();
                }
                Element::Try(try_el) => {
                    for sq in [&try_el.body, &try_el.catch, &try_el.finally] {
                        let _ = self.map_jumps(sq, ancestors, keywords, break_matches_case);
                    }
                }
                Element::Call(_) => (),
            }
        }
        surely_returns
    }
}

/// The assigned variable of a left-hand side: the last identifier before
/// any index or component access ("int x" -> x, "x[i]" -> x, "p.x" -> p).
pub fn lhs_variable(lhs: &str) -> Option<String> {
    use crate::lexer::{tokenize, Token};
    let mut last = None;
    for t in tokenize(lhs) {
        match t {
            Token::Punct(p) if p == "[" || p == "." => break,
            Token::Ident(name) => last = Some(name),
            _ => (),
        }
    }
    last
}

/// Collect every variable name assigned anywhere in a routine body, in
/// first-assignment order. Computed once per export and immutable after.
pub fn collect_var_names(body: &Subqueue, keywords: &KeywordTable) -> Vec<String> {
    let mut names = Vec::new();
    collect_into(body, keywords, &mut names);
    names
}

fn record(names: &mut Vec<String>, name: Option<String>) {
    if let Some(n) = name {
        if !n.is_empty() && !names.contains(&n) {
            names.push(n);
        }
    }
}

fn collect_into(squeue: &Subqueue, keywords: &KeywordTable, names: &mut Vec<String>) {
    use crate::lexer::{split_assignment, split_once_keyword};
    for elem in squeue.iter() {
        if elem.disabled() {
            continue;
        }
        match elem {
            Element::Instruction(ins) => {
                for line in &ins.lines {
                    if let Some(rest) = KeywordTable::match_keyword(line, &keywords.input) {
                        // strip an optional prompt literal
                        let var = rest.rsplit(',').next().unwrap_or(rest).trim();
                        if !var.starts_with('"') {
                            record(names, lhs_variable(var));
                        }
                    } else if let Some((lhs, _)) = split_assignment(line) {
                        record(names, lhs_variable(&lhs));
                    }
                }
            }
            Element::Call(call) => {
                for line in &call.lines {
                    if let Some((lhs, _)) = split_assignment(line) {
                        record(names, lhs_variable(&lhs));
                    }
                }
            }
            Element::For(f) => {
                let header = KeywordTable::match_keyword(&f.text, &keywords.pre_for)
                    .or_else(|| KeywordTable::match_keyword(&f.text, &keywords.pre_for_in))
                    .unwrap_or(&f.text);
                if let Some((lhs, _)) = split_assignment(header) {
                    record(names, lhs_variable(&lhs));
                } else if let Some((var, _)) =
                    split_once_keyword(header, &keywords.post_for_in)
                {
                    record(names, lhs_variable(&var));
                }
            }
            _ => (),
        }
        for sq in elem.subqueues() {
            collect_into(sq, keywords, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::element::*;
    use pretty_assertions::assert_eq;

    fn jump(text: &str) -> Jump {
        Jump {
            id: Id::default(),
            text: text.to_string(),
            comment: vec![],
            disabled: false,
        }
    }

    fn while_loop(body: Vec<Element>) -> While {
        While {
            id: Id::default(),
            condition: "x > 0".to_string(),
            body: Subqueue::new(body),
            comment: vec![],
            disabled: false,
        }
    }

    fn analyze_default(body: &Subqueue) -> JumpAnalysis {
        analyze(body, &KeywordTable::default(), true)
    }

    #[test]
    fn it_classifies_jumps() {
        let kw = KeywordTable::default();
        assert_eq!(classify_jump("", &kw), JumpKind::Leave(1));
        assert_eq!(classify_jump("leave", &kw), JumpKind::Leave(1));
        assert_eq!(classify_jump("leave 2", &kw), JumpKind::Leave(2));
        assert_eq!(
            classify_jump("return x + 1", &kw),
            JumpKind::Return(Some("x + 1".to_string()))
        );
        assert_eq!(classify_jump("RETURN", &kw), JumpKind::Return(None));
        assert_eq!(
            classify_jump("exit 1", &kw),
            JumpKind::Exit(Some("1".to_string()))
        );
        assert_eq!(
            classify_jump("throw err", &kw),
            JumpKind::Throw(Some("err".to_string()))
        );
    }

    #[test]
    fn it_gives_a_simple_break_no_label() {
        let j = jump("");
        let jump_id = j.id.clone();
        let w = while_loop(vec![Element::Jump(j)]);
        let body = Subqueue::new(vec![Element::While(w)]);
        let analysis = analyze_default(&body);
        // native break suffices, nothing enters the table
        assert!(analysis.jump_targets.get(&jump_id).is_none());
        assert!(analysis.loop_labels.is_empty());
        assert!(!analysis.returns);
        assert!(!analysis.always_returns);
    }

    #[test]
    fn it_labels_the_jump_and_its_loop_alike() {
        let j = jump("leave 2");
        let jump_id = j.id.clone();
        let inner = while_loop(vec![Element::Jump(j)]);
        let outer = while_loop(vec![Element::While(inner)]);
        let outer_id = outer.id.clone();
        let body = Subqueue::new(vec![Element::While(outer)]);
        let analysis = analyze_default(&body);
        let target = analysis.jump_targets.get(&jump_id).unwrap();
        assert_eq!(target.label_id(), analysis.loop_labels[&outer_id]);
        assert_eq!(analysis.loop_labels.len(), 1);
    }

    #[test]
    fn it_marks_overdeep_leaves_unresolvable() {
        let j = jump("leave 3");
        let jump_id = j.id.clone();
        let w = while_loop(vec![Element::Jump(j)]);
        let body = Subqueue::new(vec![Element::While(w)]);
        let analysis = analyze_default(&body);
        assert_eq!(
            analysis.jump_targets.get(&jump_id),
            Some(&JumpTarget::Unresolved)
        );
        assert_eq!(analysis.jump_targets[&jump_id].label_id(), -1);
        // not silently mapped onto the only available loop
        assert!(analysis.loop_labels.is_empty());
    }

    #[test]
    fn it_downgrades_breaks_crossing_a_case() {
        let j = jump("");
        let jump_id = j.id.clone();
        let case = Case {
            id: Id::default(),
            discriminant: "x".to_string(),
            branches: vec![
                CaseBranch {
                    selectors: "1".to_string(),
                    body: Subqueue::new(vec![Element::Jump(j)]),
                },
                CaseBranch {
                    selectors: "%".to_string(),
                    body: Subqueue::default(),
                },
            ],
            comment: vec![],
            disabled: false,
        };
        let w = while_loop(vec![Element::Case(case)]);
        let loop_id = w.id.clone();
        let body = Subqueue::new(vec![Element::While(w)]);
        let analysis = analyze_default(&body);
        // a plain break would only leave the switch, so a label is needed
        let target = analysis.jump_targets.get(&jump_id).unwrap();
        assert_eq!(target.label_id(), analysis.loop_labels[&loop_id]);
    }

    #[test]
    fn it_counts_crossed_case_constructs_into_the_exit_level() {
        let build = || {
            let j = jump("");
            let jump_id = j.id.clone();
            let case = Case {
                id: Id::default(),
                discriminant: "x".to_string(),
                branches: vec![
                    CaseBranch {
                        selectors: "1".to_string(),
                        body: Subqueue::new(vec![Element::Jump(j)]),
                    },
                    CaseBranch {
                        selectors: "%".to_string(),
                        body: Subqueue::default(),
                    },
                ],
                comment: vec![],
                disabled: false,
            };
            let w = while_loop(vec![Element::Case(case)]);
            (jump_id, Subqueue::new(vec![Element::While(w)]))
        };
        // leaving one loop from inside a switch takes two break levels
        let (jump_id, body) = build();
        let analysis = analyze(&body, &KeywordTable::default(), true);
        assert_eq!(
            analysis.jump_targets[&jump_id],
            JumpTarget::Label { id: 0, levels: 2 }
        );
        // a break that ignores Case stays a plain single-level break
        let (jump_id, body) = build();
        let analysis = analyze(&body, &KeywordTable::default(), false);
        assert!(analysis.jump_targets.get(&jump_id).is_none());
    }

    #[test]
    fn it_composes_alternative_return_guarantees() {
        let returning = Element::Jump(jump("return x"));
        let alt = |q_true: Vec<Element>, q_false: Vec<Element>| {
            Subqueue::new(vec![Element::Alternative(Alternative {
                id: Id::default(),
                condition: "x > 0".to_string(),
                q_true: Subqueue::new(q_true),
                q_false: Subqueue::new(q_false),
                comment: vec![],
                disabled: false,
            })])
        };
        let one_sided = analyze_default(&alt(vec![returning.clone()], vec![]));
        assert!(one_sided.returns);
        assert!(!one_sided.always_returns);

        let both = analyze_default(&alt(vec![returning.clone()], vec![returning]));
        assert!(both.always_returns);
    }

    #[test]
    fn it_requires_a_default_branch_for_case_guarantees() {
        let branch = |selectors: &str| CaseBranch {
            selectors: selectors.to_string(),
            body: Subqueue::new(vec![Element::Jump(jump("return 1"))]),
        };
        let case = |last: CaseBranch| {
            Subqueue::new(vec![Element::Case(Case {
                id: Id::default(),
                discriminant: "x".to_string(),
                branches: vec![branch("1"), branch("2"), last],
                comment: vec![],
                disabled: false,
            })])
        };
        let with_default = analyze_default(&case(branch("default")));
        assert!(with_default.always_returns);

        let without_default = analyze_default(&case(CaseBranch {
            selectors: "%".to_string(),
            body: Subqueue::default(),
        }));
        assert!(!without_default.always_returns);
    }

    #[test]
    fn it_ignores_disabled_elements() {
        let mut j = jump("return x");
        j.disabled = true;
        let body = Subqueue::new(vec![Element::Jump(j)]);
        let analysis = analyze_default(&body);
        assert!(!analysis.returns);
        assert!(!analysis.always_returns);
        assert!(analysis.jump_targets.is_empty());
    }

    #[test]
    fn it_short_circuits_after_an_unconditional_return() {
        let body = Subqueue::new(vec![
            Element::Jump(jump("return 1")),
            Element::Jump(jump("leave 5")),
        ]);
        let analysis = analyze_default(&body);
        assert!(analysis.always_returns);
        // the dead jump was never classified
        assert_eq!(analysis.jump_targets.len(), 0);
    }
}
