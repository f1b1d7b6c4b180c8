// SPDX-License-Identifier: GPL-3.0-or-later

//! Python target. The main program becomes module-level code and
//! subroutine definitions are hoisted above it; Case maps to an
//! if/elif chain; multi-level loop exits have no direct equivalent and
//! degrade in the engine.

use crate::{
    backends::{
        session::ExportOptions,
        text::{Dialect, RoutineCtx},
    },
    ir::{element::RoutineKind, types::TypeDescriptor, types::InferredType, Program},
    lexer::Token,
};

pub struct Python;

impl Dialect for Python {
    fn comment_line(&self, text: &str) -> String {
        format!("# {}", text)
    }

    fn transform_tokens(&self, tokens: &mut Vec<Token>) {
        for t in tokens.iter_mut() {
            match t {
                Token::Op(op) => {
                    let replaced = match op.as_str() {
                        "<-" => Some("="),
                        "&&" => Some("and"),
                        "||" => Some("or"),
                        "!" => Some("not"),
                        _ => None,
                    };
                    if let Some(r) = replaced {
                        *op = r.to_string();
                    }
                }
                Token::Ident(word) => {
                    let replaced = match word.to_ascii_lowercase().as_str() {
                        "div" => Some("//".to_string()),
                        "true" => Some("True".to_string()),
                        "false" => Some("False".to_string()),
                        _ => None,
                    };
                    if let Some(r) = replaced {
                        if r == "//" {
                            *t = Token::Op(r);
                        } else {
                            *word = r;
                        }
                    }
                }
                _ => (),
            }
        }
    }

    fn type_name(&self, canonical: &str) -> String {
        canonical.to_string()
    }

    fn statement(&self, body: &str) -> String {
        body.to_string()
    }

    fn parenthesize_conditions(&self) -> bool {
        false
    }

    fn break_matches_case(&self) -> bool {
        // Case becomes an if/elif chain, a break passes straight through it
        false
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String> {
        match prompt {
            Some(prompt) => vec![format!("{} = input({})", var, prompt)],
            None => vec![format!("{} = input()", var)],
        }
    }

    fn output_statement(&self, args: &[String]) -> String {
        format!("print({})", args.join(", "))
    }

    fn empty_body(&self) -> Option<String> {
        Some("pass".to_string())
    }

    fn declaration(
        &self,
        _name: &str,
        _descriptor: Option<&TypeDescriptor>,
        _options: &ExportOptions,
    ) -> Option<String> {
        None
    }

    fn constant(&self, name: &str, value: &str) -> Option<String> {
        Some(format!("{} = {}", name.to_uppercase(), value))
    }

    fn file_prologue(&self, _program: &Program, _options: &ExportOptions) -> Vec<String> {
        vec![
            "#!/usr/bin/env python3".to_string(),
            "import sys".to_string(),
            String::new(),
        ]
    }

    fn body_indent(&self, ctx: &RoutineCtx) -> usize {
        if ctx.root.kind == RoutineKind::Program {
            0
        } else {
            1
        }
    }

    fn subroutines_first(&self) -> bool {
        true
    }

    fn routine_header(&self, ctx: &RoutineCtx, _options: &ExportOptions) -> Vec<String> {
        let root = ctx.root;
        if root.kind == RoutineKind::Program {
            return vec![];
        }
        let params: Vec<&str> = root.parameters.iter().map(|p| p.name.as_str()).collect();
        vec![format!("def {}({}):", root.name, params.join(", "))]
    }

    fn routine_footer(&self, _ctx: &RoutineCtx) -> Vec<String> {
        vec![]
    }

    fn return_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("return {}", expr),
            None => "return".to_string(),
        }
    }

    fn exit_statement(&self, code: Option<&str>) -> String {
        format!("sys.exit({})", code.unwrap_or("0"))
    }

    fn throw_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("raise Exception({})", expr),
            None => "raise".to_string(),
        }
    }

    fn break_statement(&self) -> String {
        "break".to_string()
    }

    fn multi_leave(&self, _label: i32, _levels: u32) -> Option<String> {
        None
    }

    fn needs_loop_labels(&self) -> bool {
        false
    }

    fn alt_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("if {}:", cond)]
    }

    fn alt_else(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["else:".to_string()]
    }

    fn alt_end(&self) -> Vec<String> {
        vec![]
    }

    fn case_open(&self, _discr: &str, _branches: usize, _options: &ExportOptions) -> Vec<String> {
        vec![]
    }

    fn case_branch(&self, discr: &str, selectors: &[String], first: bool) -> Vec<String> {
        let test = selectors
            .iter()
            .map(|s| format!("{} == {}", discr, s))
            .collect::<Vec<_>>()
            .join(" or ");
        if first {
            vec![format!("if {}:", test)]
        } else {
            vec![format!("elif {}:", test)]
        }
    }

    fn case_default(&self, _discr: &str) -> Vec<String> {
        vec!["else:".to_string()]
    }

    fn case_end(&self) -> Vec<String> {
        vec![]
    }

    fn case_depths(&self) -> (usize, usize) {
        // the if/elif chain sits at the element's own level
        (0, 1)
    }

    fn while_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("while {}:", cond)]
    }

    fn forever_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["while True:".to_string()]
    }

    fn for_count_open(
        &self,
        var: &str,
        start: &str,
        end: &str,
        step: i64,
        _options: &ExportOptions,
    ) -> Vec<String> {
        let head = match step {
            1 => format!("for {} in range({}, {} + 1):", var, start, end),
            s if s > 0 => format!("for {} in range({}, {} + 1, {}):", var, start, end, s),
            s => format!("for {} in range({}, {} - 1, {}):", var, start, end, s),
        };
        vec![head]
    }

    fn for_in_open(
        &self,
        var: &str,
        seq: &str,
        _item_type: &InferredType,
        _options: &ExportOptions,
    ) -> Vec<String> {
        vec![format!("for {} in {}:", var, seq)]
    }

    fn array_literal(&self, items: &[String], _item_type: &InferredType) -> String {
        format!("[{}]", items.join(", "))
    }

    fn loop_end(&self) -> Vec<String> {
        vec![]
    }

    fn repeat_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["while True:".to_string()]
    }

    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)> {
        vec![
            (1, format!("if {}:", cond)),
            (2, "break".to_string()),
        ]
    }

    fn try_open(&self, _options: &ExportOptions) -> Option<Vec<String>> {
        Some(vec!["try:".to_string()])
    }

    fn try_catch(&self, var: Option<&str>, _options: &ExportOptions) -> Vec<String> {
        match var {
            Some(var) => vec![format!("except Exception as {}:", var)],
            None => vec!["except Exception:".to_string()],
        }
    }

    fn try_finally(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["finally:".to_string()]
    }

    fn try_end(&self) -> Vec<String> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::lexer::{concat, tokenize, unify_operators};

    fn transform(line: &str) -> String {
        let mut tokens = tokenize(line);
        unify_operators(&mut tokens, false);
        Python.transform_tokens(&mut tokens);
        concat(&tokens)
    }

    #[test]
    fn it_translates_boolean_operators_to_words() {
        assert_eq!(transform("ok <- a and not b"), "ok = a and not b");
        assert_eq!(transform("x <- a && b || c"), "x = a and b or c");
        assert_eq!(transform("q <- n div 2"), "q = n // 2");
    }

    #[test]
    fn it_builds_inclusive_ranges() {
        let options = ExportOptions::default();
        assert_eq!(
            Python.for_count_open("i", "1", "10", 1, &options),
            vec!["for i in range(1, 10 + 1):".to_string()]
        );
        assert_eq!(
            Python.for_count_open("i", "10", "1", -2, &options),
            vec!["for i in range(10, 1 - 1, -2):".to_string()]
        );
    }

    #[test]
    fn it_chains_selectors_in_case_branches() {
        let lines = Python.case_branch(
            "color",
            &["1".to_string(), "2".to_string()],
            false,
        );
        assert_eq!(lines, vec!["elif color == 1 or color == 2:".to_string()]);
    }
}
