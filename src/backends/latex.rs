// SPDX-License-Identifier: GPL-3.0-or-later

//! StrukTeX target: a LaTeX document that redraws the diagram with the
//! struktex macro package instead of translating it into a programming
//! language. Both branches of an alternative must always be present in
//! the picture, even when one is empty.

use crate::{
    backends::{
        session::ExportOptions,
        text::{Dialect, RoutineCtx},
    },
    ir::{types::InferredType, types::TypeDescriptor, Program},
    lexer::Token,
};

pub struct Latex;

/// Escape characters LaTeX treats specially in text.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\backslash "),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\~{}"),
            _ => out.push(c),
        }
    }
    out
}

fn boxed(macro_name: &str, content: &str) -> String {
    format!("\\{}{{\\({}\\)}}", macro_name, content)
}

impl Dialect for Latex {
    fn comment_line(&self, text: &str) -> String {
        format!("% {}", text)
    }

    fn transform_tokens(&self, tokens: &mut Vec<Token>) {
        for t in tokens.iter_mut() {
            match t {
                Token::Op(op) => {
                    let replaced = match op.as_str() {
                        "<-" => Some("\\gets"),
                        "==" => Some("="),
                        "!=" => Some("\\neq"),
                        "<=" => Some("\\leq"),
                        ">=" => Some("\\geq"),
                        "&&" => Some("\\wedge"),
                        "||" => Some("\\vee"),
                        "!" => Some("\\neg"),
                        "%" => Some("\\bmod"),
                        _ => None,
                    };
                    if let Some(r) = replaced {
                        *op = r.to_string();
                    }
                }
                Token::StrLit(s) | Token::CharLit(s) => {
                    *s = format!("\\text{{{}}}", escape(s));
                }
                Token::Ident(word) => {
                    *word = escape(word);
                }
                _ => (),
            }
        }
    }

    fn type_name(&self, canonical: &str) -> String {
        canonical.to_string()
    }

    fn statement(&self, body: &str) -> String {
        boxed("assign", body)
    }

    fn parenthesize_conditions(&self) -> bool {
        false
    }

    fn break_matches_case(&self) -> bool {
        false
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String> {
        let content = match prompt {
            Some(prompt) => format!("\\text{{read }} {} \\text{{ prompting }} {}", var, prompt),
            None => format!("\\text{{read }} {}", var),
        };
        vec![boxed("assign", &content)]
    }

    fn output_statement(&self, args: &[String]) -> String {
        boxed(
            "assign",
            &format!("\\text{{print }} {}", args.join(", ")),
        )
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
        Some(boxed(
            "assign",
            &format!("\\text{{const }} {} \\gets {}", escape(name), value),
        ))
    }

    fn file_prologue(&self, _program: &Program, _options: &ExportOptions) -> Vec<String> {
        vec![
            "\\documentclass[a4paper,10pt]{article}".to_string(),
            String::new(),
            "\\usepackage{struktex}".to_string(),
            "\\usepackage{ngerman}".to_string(),
            String::new(),
            "\\begin{document}".to_string(),
        ]
    }

    fn file_epilogue(&self, _program: &Program) -> Vec<String> {
        vec!["\\end{document}".to_string()]
    }

    fn routine_header(&self, ctx: &RoutineCtx, _options: &ExportOptions) -> Vec<String> {
        vec![format!(
            "\\begin{{struktogramm}}(120,120)[{}]",
            escape(&ctx.root.name)
        )]
    }

    fn routine_footer(&self, _ctx: &RoutineCtx) -> Vec<String> {
        vec!["\\end{struktogramm}".to_string()]
    }

    fn return_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => boxed("exit", &format!("\\text{{return }} {}", expr)),
            None => boxed("exit", "\\text{return}"),
        }
    }

    fn exit_statement(&self, code: Option<&str>) -> String {
        match code {
            Some(code) => boxed("exit", &format!("\\text{{exit }} {}", code)),
            None => boxed("exit", "\\text{exit}"),
        }
    }

    fn throw_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => boxed("exit", &format!("\\text{{throw }} {}", expr)),
            None => boxed("exit", "\\text{throw}"),
        }
    }

    fn break_statement(&self) -> String {
        boxed("exit", "\\text{leave}")
    }

    fn multi_leave(&self, _label: i32, levels: u32) -> Option<String> {
        Some(boxed("exit", &format!("\\text{{leave }} {}", levels)))
    }

    fn needs_loop_labels(&self) -> bool {
        false
    }

    fn alt_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!(
            "\\ifthenelse{{1}}{{1}}{{\\({}\\)}}{{\\sTrue}}{{\\sFalse}}",
            cond
        )]
    }

    fn alt_else(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["\\change".to_string()]
    }

    fn alt_else_required(&self) -> bool {
        true
    }

    fn alt_end(&self) -> Vec<String> {
        vec!["\\ifend".to_string()]
    }

    fn case_open(&self, discr: &str, branches: usize, _options: &ExportOptions) -> Vec<String> {
        vec![format!(
            "\\case{{1}}{{{}}}{{\\({}\\)}}",
            branches, discr
        )]
    }

    fn case_branch(&self, _discr: &str, selectors: &[String], _first: bool) -> Vec<String> {
        vec![format!("\\switch{{\\({}\\)}}", selectors.join(", "))]
    }

    fn case_default(&self, _discr: &str) -> Vec<String> {
        vec!["\\switch[r]{\\text{default}}".to_string()]
    }

    fn case_end(&self) -> Vec<String> {
        vec!["\\caseend".to_string()]
    }

    fn while_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("\\while{{\\({}\\)}}", cond)]
    }

    fn forever_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["\\forever".to_string()]
    }

    fn for_count_open(
        &self,
        var: &str,
        start: &str,
        end: &str,
        step: i64,
        _options: &ExportOptions,
    ) -> Vec<String> {
        let head = if step == 1 {
            format!("\\while{{\\({} \\gets {}, \\dots, {}\\)}}", var, start, end)
        } else {
            format!(
                "\\while{{\\({} \\gets {} ({:+}) {}\\)}}",
                var, start, step, end
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
        vec![format!("\\while{{\\({} \\in {}\\)}}", var, seq)]
    }

    fn array_literal(&self, items: &[String], _item_type: &InferredType) -> String {
        format!("\\{{{}\\}}", items.join(", "))
    }

    /// The notation has no assignable list literal; initializers spread
    /// over one assign box per element instead.
    fn supports_array_literal(&self) -> bool {
        false
    }

    fn loop_end(&self) -> Vec<String> {
        vec!["\\whileend".to_string()]
    }

    fn repeat_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["\\repeat".to_string()]
    }

    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)> {
        vec![(0, format!("\\until{{\\({}\\)}}", cond))]
    }

    fn forever_end(&self) -> Vec<String> {
        vec!["\\foreverend".to_string()]
    }

    fn parallel_open(&self, branches: usize) -> Option<Vec<String>> {
        Some(vec![format!("\\inparallel{{{}}}", branches)])
    }

    fn parallel_branch_open(&self, index: usize) -> Vec<String> {
        if index == 0 {
            vec![]
        } else {
            vec!["\\task".to_string()]
        }
    }

    fn parallel_close(&self, _branches: usize) -> Vec<String> {
        vec!["\\inparallelend".to_string()]
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
        Latex.transform_tokens(&mut tokens);
        concat(&tokens)
    }

    #[test]
    fn it_sets_operators_in_math_notation() {
        assert_eq!(transform("x <- a"), "x \\gets a");
        assert_eq!(transform("a <> b"), "a \\neq b");
        assert_eq!(transform("p and q"), "p \\wedge q");
    }

    #[test]
    fn it_escapes_special_characters() {
        assert_eq!(escape("a_b & c%"), "a\\_b \\& c\\%");
    }

    #[test]
    fn it_always_draws_both_alternative_branches() {
        assert!(Latex.alt_else_required());
    }
}
