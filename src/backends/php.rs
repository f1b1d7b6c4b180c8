// SPDX-License-Identifier: GPL-3.0-or-later

//! PHP target. Identifiers that are not call names get the `$` sigil
//! during token translation; multi-level loop exits use PHP's native
//! `break n;` so no labels are needed.

use crate::{
    backends::{
        session::ExportOptions,
        text::{Dialect, RoutineCtx},
    },
    ir::{element::RoutineKind, types::InferredType, types::TypeDescriptor, Program},
    lexer::Token,
};

pub struct Php;

/// Words that must never get a `$` sigil.
fn is_bareword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "true" | "false" | "null" | "array" | "new" | "and" | "or" | "not"
    )
}

impl Dialect for Php {
    fn comment_line(&self, text: &str) -> String {
        format!("// {}", text)
    }

    fn transform_tokens(&self, tokens: &mut Vec<Token>) {
        // first pass: operators
        for t in tokens.iter_mut() {
            match t {
                Token::Op(op) if op == "<-" => *op = "=".to_string(),
                Token::Ident(word) if word.eq_ignore_ascii_case("div") => {
                    // PHP has no integer division operator
                    *t = Token::Op("/".to_string());
                }
                _ => (),
            }
        }
        // second pass: sigils, skipping call names (ident directly or
        // blank-separated before an opening parenthesis)
        let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
        for (i, t) in tokens.iter().enumerate() {
            if let Token::Ident(word) = t {
                let next_text = tokens[i + 1..]
                    .iter()
                    .find(|n| !n.is_space())
                    .map(|n| n.text());
                let is_call = next_text == Some("(");
                if !is_call && !is_bareword(word) {
                    out.push(Token::Ident(format!("${}", word)));
                    continue;
                }
            }
            out.push(t.clone());
        }
        *tokens = out;
    }

    fn type_name(&self, canonical: &str) -> String {
        canonical.to_string()
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(prompt) = prompt {
            lines.push(format!("echo {};", prompt));
        }
        lines.push(format!("{} = trim(fgets(STDIN));", var));
        lines
    }

    fn output_statement(&self, args: &[String]) -> String {
        if args.is_empty() {
            "echo PHP_EOL;".to_string()
        } else {
            format!("echo {}, PHP_EOL;", args.join(" . \" \" . "))
        }
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
        Some(format!("define(\"{}\", {});", name, value))
    }

    fn file_prologue(&self, _program: &Program, _options: &ExportOptions) -> Vec<String> {
        vec!["<?php".to_string(), String::new()]
    }

    fn body_indent(&self, ctx: &RoutineCtx) -> usize {
        if ctx.root.kind == RoutineKind::Program {
            0
        } else {
            1
        }
    }

    fn routine_header(&self, ctx: &RoutineCtx, _options: &ExportOptions) -> Vec<String> {
        let root = ctx.root;
        if root.kind == RoutineKind::Program {
            return vec![];
        }
        let params: Vec<String> = root
            .parameters
            .iter()
            .map(|p| format!("${}", p.name))
            .collect();
        vec![format!("function {}({}) {{", root.name, params.join(", "))]
    }

    fn routine_footer(&self, ctx: &RoutineCtx) -> Vec<String> {
        if ctx.root.kind == RoutineKind::Program {
            vec![]
        } else {
            vec!["}".to_string()]
        }
    }

    fn return_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("return {};", expr),
            None => "return;".to_string(),
        }
    }

    fn exit_statement(&self, code: Option<&str>) -> String {
        format!("exit({});", code.unwrap_or("0"))
    }

    fn throw_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("throw new Exception({});", expr),
            None => "throw new Exception();".to_string(),
        }
    }

    fn break_statement(&self) -> String {
        "break;".to_string()
    }

    fn multi_leave(&self, _label: i32, levels: u32) -> Option<String> {
        Some(format!("break {};", levels))
    }

    fn needs_loop_labels(&self) -> bool {
        false
    }

    fn alt_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("if {} {{", cond)]
    }

    fn alt_else(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["} else {".to_string()]
    }

    fn alt_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn case_open(&self, discr: &str, _branches: usize, _options: &ExportOptions) -> Vec<String> {
        vec![format!("switch ({}) {{", discr)]
    }

    fn case_branch(&self, _discr: &str, selectors: &[String], _first: bool) -> Vec<String> {
        selectors.iter().map(|s| format!("case {}:", s)).collect()
    }

    fn case_branch_end(&self) -> Vec<String> {
        vec!["break;".to_string()]
    }

    fn case_default(&self, _discr: &str) -> Vec<String> {
        vec!["default:".to_string()]
    }

    fn case_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn while_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("while {} {{", cond)]
    }

    fn forever_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["while (true) {".to_string()]
    }

    fn for_count_open(
        &self,
        var: &str,
        start: &str,
        end: &str,
        step: i64,
        _options: &ExportOptions,
    ) -> Vec<String> {
        let head = if step >= 0 {
            format!(
                "for ({0} = {1}; {0} <= {2}; {0} += {3}) {{",
                var, start, end, step
            )
        } else {
            format!(
                "for ({0} = {1}; {0} >= {2}; {0} -= {3}) {{",
                var, start, end, -step
            )
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
        vec![format!("foreach ({} as {}) {{", seq, var)]
    }

    fn array_literal(&self, items: &[String], _item_type: &InferredType) -> String {
        format!("array({})", items.join(", "))
    }

    fn loop_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn repeat_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["do {".to_string()]
    }

    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)> {
        vec![(0, format!("}} while (!{});", cond))]
    }

    fn record_access(&self, base: &str, component: &str) -> String {
        format!("{}[\"{}\"]", base, component)
    }

    fn try_open(&self, _options: &ExportOptions) -> Option<Vec<String>> {
        Some(vec!["try {".to_string()])
    }

    fn try_catch(&self, var: Option<&str>, _options: &ExportOptions) -> Vec<String> {
        let var = var.unwrap_or("ex");
        vec![format!("}} catch (Exception ${}) {{", var)]
    }

    fn try_finally(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["} finally {".to_string()]
    }

    fn try_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }
}
