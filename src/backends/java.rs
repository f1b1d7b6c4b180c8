// SPDX-License-Identifier: GPL-3.0-or-later

//! Java target. Routines become static methods of one class named after
//! the program; multi-level loop exits use labeled `break`.

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

pub struct Java;

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Program".to_string(),
    }
}

/// `{` on the same line or pushed to the next, per options.
fn open_brace(head: String, options: &ExportOptions) -> Vec<String> {
    if options.brace_next_line {
        vec![head, "{".to_string()]
    } else {
        vec![format!("{} {{", head)]
    }
}

impl Java {
    fn descriptor_name(&self, descriptor: &TypeDescriptor, options: &ExportOptions) -> String {
        match descriptor {
            TypeDescriptor::Scalar(name) => self.type_name(name),
            TypeDescriptor::Array { element, .. } => {
                let inner = match element {
                    Some(e) => self.descriptor_name(e, options),
                    None => "Object".to_string(),
                };
                format!("{}[]", inner)
            }
            TypeDescriptor::Record { .. } => "Object".to_string(),
            TypeDescriptor::Enum { .. } => "int".to_string(),
        }
    }

    fn item_type_name(&self, item_type: &InferredType) -> String {
        match item_type {
            InferredType::Integer => "int".to_string(),
            InferredType::Real => "double".to_string(),
            InferredType::Text => "String".to_string(),
            InferredType::Common(name) => self.type_name(name),
            InferredType::Generic => "Object".to_string(),
        }
    }
}

impl Dialect for Java {
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
            "int" | "integer" | "long" | "longint" => "int".to_string(),
            "real" | "double" | "float" => "double".to_string(),
            "string" | "text" => "String".to_string(),
            "bool" | "boolean" => "boolean".to_string(),
            "char" | "character" => "char".to_string(),
            _ => canonical.to_string(),
        }
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(prompt) = prompt {
            lines.push(format!("System.out.print({});", prompt));
        }
        lines.push(format!("{} = (new Scanner(System.in)).nextLine();", var));
        lines
    }

    fn output_statement(&self, args: &[String]) -> String {
        if args.is_empty() {
            "System.out.println();".to_string()
        } else {
            format!("System.out.println({});", args.join(" + \" \" + "))
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
                    Some(e) => self.descriptor_name(e, options),
                    None => "Object".to_string(),
                };
                let size = dimensions
                    .first()
                    .and_then(|d| d.size())
                    .unwrap_or(options.default_array_size as i64);
                Some(format!("{0}[] {1} = new {0}[{2}];", inner, name, size))
            }
            Some(d) => Some(format!("{} {};", self.descriptor_name(d, options), name)),
            None => Some(format!("Object {};", name)),
        }
    }

    fn constant(&self, name: &str, value: &str) -> Option<String> {
        Some(format!("final var {} = {};", name, value))
    }

    fn file_prologue(&self, program: &Program, options: &ExportOptions) -> Vec<String> {
        let mut lines = vec!["import java.util.Scanner;".to_string(), String::new()];
        lines.extend(open_brace(
            format!("public class {}", capitalize(&program.main.name)),
            options,
        ));
        lines
    }

    fn file_epilogue(&self, _program: &Program) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn routine_indent(&self, _top_level: bool) -> usize {
        1
    }

    fn routine_header(&self, ctx: &RoutineCtx, options: &ExportOptions) -> Vec<String> {
        let root = ctx.root;
        if root.kind == RoutineKind::Program {
            return open_brace("public static void main(String[] args)".to_string(), options);
        }
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
                    None => "Object".to_string(),
                };
                format!("{} {}", type_name, p.name)
            })
            .collect();
        open_brace(
            format!(
                "public static {} {}({})",
                result,
                root.name,
                params.join(", ")
            ),
            options,
        )
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
        format!("System.exit({});", code.unwrap_or("0"))
    }

    fn throw_statement(&self, expr: Option<&str>) -> String {
        match expr {
            Some(expr) => format!("throw new RuntimeException({});", expr),
            None => "throw new RuntimeException();".to_string(),
        }
    }

    fn break_statement(&self) -> String {
        "break;".to_string()
    }

    fn multi_leave(&self, label: i32, _levels: u32) -> Option<String> {
        Some(format!("break loop{};", label))
    }

    fn loop_label_prefix(&self, label: i32) -> Option<String> {
        Some(format!("loop{}:", label))
    }

    fn alt_open(&self, cond: &str, options: &ExportOptions) -> Vec<String> {
        open_brace(format!("if {}", cond), options)
    }

    fn alt_else(&self, options: &ExportOptions) -> Vec<String> {
        if options.brace_next_line {
            vec!["}".to_string(), "else".to_string(), "{".to_string()]
        } else {
            vec!["} else {".to_string()]
        }
    }

    fn alt_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn case_open(&self, discr: &str, _branches: usize, options: &ExportOptions) -> Vec<String> {
        open_brace(format!("switch ({})", discr), options)
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

    fn while_open(&self, cond: &str, options: &ExportOptions) -> Vec<String> {
        open_brace(format!("while {}", cond), options)
    }

    fn forever_open(&self, options: &ExportOptions) -> Vec<String> {
        open_brace("while (true)".to_string(), options)
    }

    fn for_count_open(
        &self,
        var: &str,
        start: &str,
        end: &str,
        step: i64,
        options: &ExportOptions,
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
        open_brace(head, options)
    }

    fn for_in_open(
        &self,
        var: &str,
        seq: &str,
        item_type: &InferredType,
        options: &ExportOptions,
    ) -> Vec<String> {
        open_brace(
            format!("for ({} {} : {})", self.item_type_name(item_type), var, seq),
            options,
        )
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

    fn repeat_open(&self, options: &ExportOptions) -> Vec<String> {
        open_brace("do".to_string(), options)
    }

    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)> {
        vec![(0, format!("}} while (!{});", cond))]
    }

    fn try_open(&self, options: &ExportOptions) -> Option<Vec<String>> {
        Some(open_brace("try".to_string(), options))
    }

    fn try_catch(&self, var: Option<&str>, options: &ExportOptions) -> Vec<String> {
        let var = var.unwrap_or("ex");
        let mut lines = vec!["}".to_string()];
        lines.extend(open_brace(format!("catch (Exception {})", var), options));
        lines
    }

    fn try_finally(&self, options: &ExportOptions) -> Vec<String> {
        let mut lines = vec!["}".to_string()];
        lines.extend(open_brace("finally".to_string(), options));
        lines
    }

    fn try_end(&self) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn parallel_open(&self, _branches: usize) -> Option<Vec<String>> {
        Some(vec!["{".to_string()])
    }

    fn parallel_branch_open(&self, index: usize) -> Vec<String> {
        vec![format!("Thread worker{} = new Thread(() -> {{", index)]
    }

    fn parallel_branch_close(&self, _index: usize) -> Vec<String> {
        vec!["});".to_string()]
    }

    fn parallel_close(&self, branches: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for i in 0..branches {
            lines.push(format!("worker{}.start();", i));
        }
        lines.push("try {".to_string());
        for i in 0..branches {
            lines.push(format!("    worker{}.join();", i));
        }
        lines.push("} catch (InterruptedException ex) {".to_string());
        lines.push("    ex.printStackTrace();".to_string());
        lines.push("}".to_string());
        lines.push("}".to_string());
        lines
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
        Java.transform_tokens(&mut tokens);
        concat(&tokens)
    }

    #[test]
    fn it_translates_canonical_operators() {
        assert_eq!(transform("x <- a div 2"), "x = a / 2");
        assert_eq!(transform("ok <- a <> b and not c"), "ok = a != b && ! c");
    }

    #[test]
    fn it_maps_scalar_types() {
        assert_eq!(Java.type_name("integer"), "int");
        assert_eq!(Java.type_name("string"), "String");
        assert_eq!(Java.type_name("Matrix"), "Matrix");
    }

    #[test]
    fn it_reverses_the_comparison_for_negative_steps() {
        let options = ExportOptions::default();
        assert_eq!(
            Java.for_count_open("i", "10", "1", -2, &options),
            vec!["for (int i = 10; i >= 1; i -= 2) {".to_string()]
        );
    }
}
