// SPDX-License-Identifier: GPL-3.0-or-later

//! C# target. Close cousin of the Java back end, but multi-level loop
//! exits compile to `goto` targets placed after the loop, and parallel
//! sections run as tasks.

use crate::{
    backends::{
        session::ExportOptions,
        text::{Dialect, RoutineCtx},
    },
    ir::{
        element::RoutineKind,
        types::{InferredType, TypeDescriptor},
        Program,
    },
    lexer::Token,
};

pub struct CSharp;

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Program".to_string(),
    }
}

impl CSharp {
    fn descriptor_name(&self, descriptor: &TypeDescriptor) -> String {
        match descriptor {
            TypeDescriptor::Scalar(name) => self.type_name(name),
            TypeDescriptor::Array { element, .. } => {
                let inner = match element {
                    Some(e) => self.descriptor_name(e),
                    None => "object".to_string(),
                };
                format!("{}[]", inner)
            }
            TypeDescriptor::Record { .. } => "object".to_string(),
            TypeDescriptor::Enum { .. } => "int".to_string(),
        }
    }

    fn item_type_name(&self, item_type: &InferredType) -> String {
        match item_type {
            InferredType::Integer => "int".to_string(),
            InferredType::Real => "double".to_string(),
            InferredType::Text => "string".to_string(),
            InferredType::Common(name) => self.type_name(name),
            InferredType::Generic => "object".to_string(),
        }
    }
}

impl Dialect for CSharp {
    fn comment_line(&self, text: &str) -> String {
        format!("// {}", text)
    }

    fn transform_tokens(&self, tokens: &mut Vec<Token>) {
        for t in tokens.iter_mut() {
            match t {
                Token::Op(op) if op == "<-" => *op = "=".to_string(),
                Token::Ident(word) if word.eq_ignore_ascii_case("div") => {
                    *t = Token::Op("/".to_string());
                }
                _ => (),
            }
        }
    }

    fn type_name(&self, canonical: &str) -> String {
        match canonical.to_ascii_lowercase().as_str() {
            "int" | "integer" => "int".to_string(),
            "long" | "longint" => "long".to_string(),
            "real" | "double" | "float" => "double".to_string(),
            "string" | "text" => "string".to_string(),
            "bool" | "boolean" => "bool".to_string(),
            "char" | "character" => "char".to_string(),
            _ => canonical.to_string(),
        }
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(prompt) = prompt {
            lines.push(format!("Console.Write({});", prompt));
        }
        lines.push(format!("{} = Console.ReadLine();", var));
        lines
    }

    fn output_statement(&self, args: &[String]) -> String {
        if args.is_empty() {
            "Console.WriteLine();".to_string()
        } else {
            format!("Console.WriteLine({});", args.join(" + \" \" + "))
        }
    }

    fn declaration(
        &self,
        name: &str,
        descriptor: Option<&TypeDescriptor>,
        options: &ExportOptions,
    ) -> Option<String> {
        match descriptor {
            Some(TypeDescriptor::Array {
                element,
                dimensions,
            }) => {
                let inner = match element {
                    Some(e) => self.descriptor_name(e),
                    None => "object".to_string(),
                };
                let size = dimensions
                    .first()
                    .and_then(|d| d.size())
                    .unwrap_or(options.default_array_size as i64);
                Some(format!("{0}[] {1} = new {0}[{2}];", inner, name, size))
            }
            Some(d) => Some(format!("{} {};", self.descriptor_name(d), name)),
            None => Some(format!("object {};", name)),
        }
    }

    fn constant(&self, name: &str, value: &str) -> Option<String> {
        // `const` needs an explicit type, which the diagram rarely supplies
        Some(format!("var {} = {};", name, value))
    }

    fn file_prologue(&self, program: &Program, _options: &ExportOptions) -> Vec<String> {
        vec![
            "using System;".to_string(),
            "using System.Threading.Tasks;".to_string(),
            String::new(),
            format!("public class {}", capitalize(&program.main.name)),
            "{".to_string(),
        ]
    }

    fn file_epilogue(&self, _program: &Program) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn routine_indent(&self, _top_level: bool) -> usize {
        1
    }

    fn routine_header(&self, ctx: &RoutineCtx, _options: &ExportOptions) -> Vec<String> {
        let root = ctx.root;
        let head = if root.kind == RoutineKind::Program {
            "public static void Main(string[] args)".to_string()
        } else {
            let result = match &root.result_type {
                Some(t) => self.type_name(t),
                None => "void".to_string(),
            };
            let params: Vec<String> = root
                .parameters
                .iter()
                .map(|p| {
                    let type_name = match &p.type_name {
                        Some(t) => self.type_name(t),
                        None => "object".to_string(),
                    };
                    format!("{} {}", type_name, p.name)
                })
                .collect();
            format!(
                "public static {} {}({})",
                result,
                root.name,
                params.join(", ")
            )
        };
        // the conventional C# style puts the brace on its own line
        vec![head, "{".to_string()]
    }

    fn routine_footer(&self, _ctx: &RoutineCtx) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn return_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("return {};", expr),
            None => "return;".to_string(),
        }
    }

    fn exit_statement(&self, code: Option<&str>) -> String {
        format!("Environment.Exit({});", code.unwrap_or("0"))
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

    fn multi_leave(&self, label: i32, _levels: u32) -> Option<String> {
        Some(format!("goto exit{};", label))
    }

    fn loop_label_suffix(&self, label: i32) -> Option<String> {
        Some(format!("exit{}: ;", label))
    }

    fn alt_open(&self, cond: &str, _options: &ExportOptions) -> Vec<String> {
        vec![format!("if {}", cond), "{".to_string()]
    }

    fn alt_else(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["}".to_string(), "else".to_string(), "{".to_string()]
    }

    fn alt_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn case_open(&self, discr: &str, _branches: usize, _options: &ExportOptions) -> Vec<String> {
        vec![format!("switch ({})", discr), "{".to_string()]
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
        vec![format!("while {}", cond), "{".to_string()]
    }

    fn forever_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["while (true)".to_string(), "{".to_string()]
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
                "for (int {0} = {1}; {0} <= {2}; {0} += {3})",
                var, start, end, step
            )
        } else {
            format!(
                "for (int {0} = {1}; {0} >= {2}; {0} -= {3})",
                var, start, end, -step
            )
        };
        vec![head, "{".to_string()]
    }

    fn for_in_open(
        &self,
        var: &str,
        seq: &str,
        item_type: &InferredType,
        _options: &ExportOptions,
    ) -> Vec<String> {
        vec![
            format!(
                "foreach ({} {} in {})",
                self.item_type_name(item_type),
                var,
                seq
            ),
            "{".to_string(),
        ]
    }

    fn array_literal(&self, items: &[String], item_type: &InferredType) -> String {
        format!(
            "new {}[]{{{}}}",
            self.item_type_name(item_type),
            items.join(", ")
        )
    }

    fn loop_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn repeat_open(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["do".to_string(), "{".to_string()]
    }

    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)> {
        vec![(0, format!("}} while (!{});", cond))]
    }

    fn try_open(&self, _options: &ExportOptions) -> Option<Vec<String>> {
        Some(vec!["try".to_string(), "{".to_string()])
    }

    fn try_catch(&self, var: Option<&str>, _options: &ExportOptions) -> Vec<String> {
        let var = var.unwrap_or("ex");
        vec![
            "}".to_string(),
            format!("catch (Exception {})", var),
            "{".to_string(),
        ]
    }

    fn try_finally(&self, _options: &ExportOptions) -> Vec<String> {
        vec!["}".to_string(), "finally".to_string(), "{".to_string()]
    }

    fn try_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn parallel_open(&self, _branches: usize) -> Option<Vec<String>> {
        Some(vec!["{".to_string()])
    }

    fn parallel_branch_open(&self, index: usize) -> Vec<String> {
        vec![format!("Task worker{} = Task.Run(() =>", index), "{".to_string()]
    }

    fn parallel_branch_close(&self, _index: usize) -> Vec<String> {
        vec!["});".to_string()]
    }

    fn parallel_close(&self, branches: usize) -> Vec<String> {
        let workers: Vec<String> = (0..branches).map(|i| format!("worker{}", i)).collect();
        vec![
            format!("Task.WaitAll({});", workers.join(", ")),
            "}".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_places_goto_targets_after_the_loop() {
        assert_eq!(CSharp.multi_leave(2, 2), Some("goto exit2;".to_string()));
        assert_eq!(CSharp.loop_label_suffix(2), Some("exit2: ;".to_string()));
        assert_eq!(CSharp.loop_label_prefix(2), None);
    }

    #[test]
    fn it_maps_scalar_types() {
        assert_eq!(CSharp.type_name("string"), "string");
        assert_eq!(CSharp.type_name("boolean"), "bool");
        assert_eq!(CSharp.type_name("longint"), "long");
    }
}
