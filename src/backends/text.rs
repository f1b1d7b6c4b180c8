// SPDX-License-Identifier: GPL-3.0-or-later

//! Generic linear-text emission engine.
//!
//! One engine owns the traversal and the per-routine driver protocol; a
//! concrete back end is a [`Dialect`] value supplying templates and hooks
//! (indentation, comment shape, token translation, statement shapes). No
//! dialect inherits from another.
//!
//! Expected generation gaps (unresolvable jumps, missing types, unsupported
//! constructs) never abort an export: the engine emits a best-effort
//! fallback plus an inline diagnostic comment and keeps going.

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::{
    analysis::{self, classify_jump, JumpAnalysis, JumpKind, JumpTarget},
    backends::{
        buffer::CodeBuffer,
        dedup::GLOBAL_SCOPE,
        session::{ExportOptions, Session},
        Backend,
    },
    ir::{
        element::{
            Alternative, Call, Case, For, Forever, Instruction, Jump, Parallel, Repeat, Root,
            Try, While,
        },
        keywords::KeywordTable,
        types::{infer_item_type, InferredType, TypeDescriptor},
        Element, Program, Subqueue,
    },
    lexer::{
        concat, is_fully_parenthesized, split_assignment, split_expression_list,
        split_once_keyword, tokenize, unify_operators, Token,
    },
};

/// Per-routine facts gathered before emission starts.
pub struct RoutineCtx<'a> {
    pub root: &'a Root,
    pub var_names: &'a [String],
    /// Non-top-level routines of a multi-routine export.
    pub top_level: bool,
}

/// The parsed shape of a For header.
#[derive(Debug, Clone, PartialEq)]
pub enum ForShape {
    Count {
        var: String,
        start: String,
        end: String,
        step: i64,
    },
    In {
        var: String,
        source: ForInSource,
    },
    Freetext(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInSource {
    List(Vec<String>),
    Expr(String),
}

/// Parse a For header against the keyword table, degrading to free text.
pub fn parse_for(text: &str, keywords: &KeywordTable) -> ForShape {
    // for-each: "foreach x in {1, 2, 3}" / "foreach x in items"
    if let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_for_in) {
        if let Some((var, seq)) = split_once_keyword(rest, &keywords.post_for_in) {
            return ForShape::In {
                var,
                source: parse_for_in_source(&seq),
            };
        }
        return ForShape::Freetext(text.to_string());
    }
    let Some(rest) = KeywordTable::match_keyword(text, &keywords.pre_for) else {
        return ForShape::Freetext(text.to_string());
    };
    // "for x in ..." with the counting keyword
    if split_assignment(rest).is_none() {
        if let Some((var, seq)) = split_once_keyword(rest, &keywords.post_for_in) {
            return ForShape::In {
                var,
                source: parse_for_in_source(&seq),
            };
        }
        return ForShape::Freetext(text.to_string());
    }
    // counting: "for i <- start to end by step"
    let Some((var, bounds)) = split_assignment(rest) else {
        return ForShape::Freetext(text.to_string());
    };
    let Some((start, end_part)) = split_once_keyword(&bounds, &keywords.post_for) else {
        return ForShape::Freetext(text.to_string());
    };
    let (end, step) = match split_once_keyword(&end_part, &keywords.step_for) {
        Some((end, step_text)) => match step_text.parse::<i64>() {
            Ok(step) if step != 0 => (end, step),
            _ => return ForShape::Freetext(text.to_string()),
        },
        None => (end_part, 1),
    };
    ForShape::Count {
        var,
        start,
        end,
        step,
    }
}

fn parse_for_in_source(seq: &str) -> ForInSource {
    let seq = seq.trim();
    if seq.starts_with('{') && seq.ends_with('}') && seq.len() >= 2 {
        return ForInSource::List(split_expression_list(&seq[1..seq.len() - 1], ","));
    }
    let parts = split_expression_list(seq, ",");
    if parts.len() > 1 {
        ForInSource::List(parts)
    } else {
        ForInSource::Expr(seq.to_string())
    }
}

/// Templates and hooks one linear-text target supplies.
///
/// Defaults exist only where the distilled contract allows them: Parallel
/// flattens to annotated sequential branches and Try flattens to annotated
/// sequences unless the dialect overrides the structured hooks.
pub trait Dialect {
    fn indent_unit(&self) -> &'static str {
        "    "
    }
    fn comment_line(&self, text: &str) -> String;
    /// Translate canonical tokens ("<-", "==", "&&", "div", ...) into the
    /// target spelling. Runs after operator unification.
    fn transform_tokens(&self, tokens: &mut Vec<Token>);
    /// Target spelling of a canonical scalar type name.
    fn type_name(&self, canonical: &str) -> String;
    fn statement(&self, body: &str) -> String {
        format!("{};", body)
    }
    fn parenthesize_conditions(&self) -> bool {
        true
    }
    /// Whether the native single-level break also leaves a Case construct.
    fn break_matches_case(&self) -> bool {
        true
    }

    fn input_statement(&self, var: &str, prompt: Option<&str>) -> Vec<String>;
    fn output_statement(&self, args: &[String]) -> String;
    /// Filler for a structurally required but empty block body.
    fn empty_body(&self) -> Option<String> {
        None
    }

    /// A variable declaration, or None if the target declares nothing.
    fn declaration(
        &self,
        name: &str,
        descriptor: Option<&TypeDescriptor>,
        options: &ExportOptions,
    ) -> Option<String>;
    fn constant(&self, name: &str, value: &str) -> Option<String>;

    fn file_prologue(&self, program: &Program, options: &ExportOptions) -> Vec<String> {
        let _ = (program, options);
        vec![]
    }
    fn file_epilogue(&self, program: &Program) -> Vec<String> {
        let _ = program;
        vec![]
    }
    /// Base indent of a routine (e.g. 1 for methods inside a class shell).
    fn routine_indent(&self, top_level: bool) -> usize {
        let _ = top_level;
        0
    }
    /// Indent of the routine body relative to the routine base. Scripted
    /// targets return 0 for module-level program code.
    fn body_indent(&self, ctx: &RoutineCtx) -> usize {
        let _ = ctx;
        1
    }
    /// Subroutine bodies go before the top-level routine (scripted targets).
    fn subroutines_first(&self) -> bool {
        false
    }
    fn routine_header(&self, ctx: &RoutineCtx, options: &ExportOptions) -> Vec<String>;
    fn routine_footer(&self, ctx: &RoutineCtx) -> Vec<String>;
    fn return_statement(&self, expr: Option<&str>) -> String;
    fn exit_statement(&self, code: Option<&str>) -> String;
    fn throw_statement(&self, expr: Option<&str>) -> String;
    fn break_statement(&self) -> String;
    /// Multi-level or labeled escape; None means unsupported and the engine
    /// degrades to a diagnostic comment.
    fn multi_leave(&self, label: i32, levels: u32) -> Option<String>;
    /// Whether multi-level escapes address loops by label. Level-counting
    /// targets (`break n;`) return false and get no label placement.
    fn needs_loop_labels(&self) -> bool {
        true
    }
    /// Label line placed before a labeled loop (labeled-break targets).
    fn loop_label_prefix(&self, label: i32) -> Option<String> {
        let _ = label;
        None
    }
    /// Label line placed after a labeled loop (goto targets).
    fn loop_label_suffix(&self, label: i32) -> Option<String> {
        let _ = label;
        None
    }

    fn alt_open(&self, cond: &str, options: &ExportOptions) -> Vec<String>;
    fn alt_else(&self, options: &ExportOptions) -> Vec<String>;
    /// The notation cannot omit the false branch even when it is empty.
    fn alt_else_required(&self) -> bool {
        false
    }
    fn alt_end(&self) -> Vec<String>;

    /// `branches` counts all emitted branches, default included.
    fn case_open(&self, discr: &str, branches: usize, options: &ExportOptions) -> Vec<String>;
    fn case_branch(&self, discr: &str, selectors: &[String], first: bool) -> Vec<String>;
    fn case_branch_end(&self) -> Vec<String> {
        vec![]
    }
    fn case_default(&self, discr: &str) -> Vec<String>;
    fn case_end(&self) -> Vec<String>;
    /// (selector-label indent, branch-body indent) below the case header.
    fn case_depths(&self) -> (usize, usize) {
        (1, 2)
    }

    fn while_open(&self, cond: &str, options: &ExportOptions) -> Vec<String>;
    fn forever_open(&self, options: &ExportOptions) -> Vec<String>;
    fn for_count_open(
        &self,
        var: &str,
        start: &str,
        end: &str,
        step: i64,
        options: &ExportOptions,
    ) -> Vec<String>;
    fn for_in_open(
        &self,
        var: &str,
        seq: &str,
        item_type: &InferredType,
        options: &ExportOptions,
    ) -> Vec<String>;
    /// Target rendering of an explicit value list.
    fn array_literal(&self, items: &[String], item_type: &InferredType) -> String;
    /// Shared close for while/for loops.
    fn loop_end(&self) -> Vec<String>;
    fn forever_end(&self) -> Vec<String> {
        self.loop_end()
    }
    fn repeat_open(&self, options: &ExportOptions) -> Vec<String>;
    /// Close of a post-condition loop; each line carries its indent
    /// relative to the loop header (Python puts the test inside the body).
    fn repeat_close(&self, cond: &str) -> Vec<(usize, String)>;

    /// Record component access, for initializer decomposition. Works on
    /// source-level names; the composed assignment still runs through
    /// token translation.
    fn record_access(&self, base: &str, component: &str) -> String {
        format!("{}.{}", base, component)
    }
    fn index_access(&self, base: &str, index: &str) -> String {
        format!("{}[{}]", base, index)
    }
    /// Whether an explicit value list may be assigned as one literal.
    fn supports_array_literal(&self) -> bool {
        true
    }

    fn try_open(&self, options: &ExportOptions) -> Option<Vec<String>> {
        let _ = options;
        None
    }
    fn try_catch(&self, var: Option<&str>, options: &ExportOptions) -> Vec<String> {
        let _ = (var, options);
        vec![]
    }
    fn try_finally(&self, options: &ExportOptions) -> Vec<String> {
        let _ = options;
        vec![]
    }
    fn try_end(&self) -> Vec<String> {
        vec![]
    }

    fn parallel_open(&self, branches: usize) -> Option<Vec<String>> {
        let _ = branches;
        None
    }
    fn parallel_branch_open(&self, index: usize) -> Vec<String> {
        let _ = index;
        vec![]
    }
    fn parallel_branch_close(&self, index: usize) -> Vec<String> {
        let _ = index;
        vec![]
    }
    fn parallel_close(&self, branches: usize) -> Vec<String> {
        let _ = branches;
        vec![]
    }
}

/// Plugs a [`Dialect`] value into the shared engine.
pub struct TextBackend<D: Dialect>(pub D);

impl<D: Dialect> Backend for TextBackend<D> {
    fn generate(&self, program: &Program, session: &mut Session) -> Result<String> {
        let mut engine = Engine {
            dialect: &self.0,
            session,
            buf: CodeBuffer::new(),
        };
        engine.generate_program(program)
    }
}

struct Engine<'a, D: Dialect> {
    dialect: &'a D,
    session: &'a mut Session,
    buf: CodeBuffer,
}

/// Everything the element dispatcher needs about the current routine.
struct RoutineState<'a> {
    root: &'a Root,
    analysis: JumpAnalysis,
}

impl<'a, D: Dialect> Engine<'a, D> {
    fn put(&mut self, indent: usize, line: &str) {
        if line.is_empty() {
            self.buf.blank();
        } else {
            self.buf
                .add(format!("{}{}", self.dialect.indent_unit().repeat(indent), line));
        }
    }

    fn put_all(&mut self, indent: usize, lines: &[String]) {
        for line in lines {
            self.put(indent, line);
        }
    }

    fn comment(&mut self, indent: usize, text: &str) {
        let line = self.dialect.comment_line(text);
        self.put(indent, &line);
    }

    /// Element comments, honoring the insertion toggle.
    fn element_comments(&mut self, indent: usize, comment: &[String]) {
        if self.session.options.include_comments {
            for line in comment {
                self.comment(indent, line);
            }
        }
    }

    /// Tokenize, unify and translate one statement into the target dialect.
    fn transform(&self, line: &str) -> String {
        let mut tokens = tokenize(line);
        unify_operators(&mut tokens, false);
        self.dialect.transform_tokens(&mut tokens);
        concat(&tokens).trim().to_string()
    }

    fn transform_condition(&self, text: &str) -> String {
        let transformed = self.transform(text);
        if self.dialect.parenthesize_conditions() && !is_fully_parenthesized(&transformed) {
            format!("({})", transformed)
        } else {
            transformed
        }
    }

    fn generate_program(&mut self, program: &Program) -> Result<String> {
        debug!("Generating {} routine(s)", 1 + program.routines.len());
        let prologue = self.dialect.file_prologue(program, &self.session.options);
        self.put_all(0, &prologue);
        if self.session.options.banner && self.session.options.include_comments {
            for line in &program.main.comment {
                self.comment(self.dialect.routine_indent(true), line);
            }
        }

        let sub_mark = self.buf.mark();
        self.generate_routine(&program.main, true)?;

        if !program.routines.is_empty() {
            if self.dialect.subroutines_first() {
                // scripted targets want definitions before the main code;
                // the mark recorded before the main routine receives them
                let mut side = Engine {
                    dialect: self.dialect,
                    session: &mut *self.session,
                    buf: CodeBuffer::new(),
                };
                for routine in program.routines.clone() {
                    side.generate_routine(&routine, false)?;
                    side.buf.blank_once();
                }
                let text = side.buf.finish();
                self.buf
                    .insert_all_at(sub_mark, text.lines().map(|l| l.to_string()));
            } else {
                for routine in &program.routines {
                    self.buf.blank_once();
                    self.generate_routine(routine, false)?;
                }
            }
        }

        let epilogue = self.dialect.file_epilogue(program);
        self.put_all(0, &epilogue);
        Ok(std::mem::take(&mut self.buf).finish())
    }

    /// The fixed per-routine driver: header, preamble, body, result, footer.
    fn generate_routine(&mut self, root: &Root, top_level: bool) -> Result<()> {
        let base = self.dialect.routine_indent(top_level);

        // pre-pass: names and jump analysis
        let mut var_names = analysis::collect_var_names(&root.body, &self.session.keywords);
        var_names.retain(|v| !root.parameters.iter().any(|p| &p.name == v));
        let jump_analysis = analysis::analyze(
            &root.body,
            &self.session.keywords,
            self.dialect.break_matches_case(),
        );
        trace!(
            "Routine {}: {} vars, returns={}, always_returns={}",
            root.name,
            var_names.len(),
            jump_analysis.returns,
            jump_analysis.always_returns
        );

        if !top_level && self.session.options.include_comments {
            for line in &root.comment {
                self.comment(base, line);
            }
        }

        let ctx = RoutineCtx {
            root,
            var_names: &var_names,
            top_level,
        };
        let body_indent = base + self.dialect.body_indent(&ctx);
        let header = self.dialect.routine_header(&ctx, &self.session.options);
        self.put_all(base, &header);

        self.generate_preamble(root, &var_names, body_indent);

        let state = RoutineState {
            root,
            analysis: jump_analysis,
        };
        self.emit_subqueue(&root.body, body_indent, &state);

        self.generate_result(root, &var_names, &state, body_indent);

        let footer = self.dialect.routine_footer(&ctx);
        self.put_all(base, &footer);
        Ok(())
    }

    /// Constants first, then declarations for collected variables that are
    /// neither parameters nor already handled in scope.
    fn generate_preamble(&mut self, root: &Root, var_names: &[String], indent: usize) {
        let scope = root.signature();
        for p in &root.parameters {
            // a parameter shadowing a global must not be re-declared
            self.session.declared.mark_handled(&scope, &p.name);
        }
        for constant in &root.constants {
            if !self.session.declared.first_time(GLOBAL_SCOPE, &constant.name) {
                continue;
            }
            let value = self.transform(&constant.value);
            if let Some(line) = self.dialect.constant(&constant.name, &value) {
                self.put(indent, &line);
            }
        }
        let mut any = false;
        for name in var_names {
            if !self.session.declared.first_time(&scope, name) {
                continue;
            }
            let descriptor = root.types.lookup(name);
            if descriptor.is_none() {
                trace!("No type information for variable {}", name);
            }
            if let Some(line) = self.dialect.declaration(name, descriptor, &self.session.options) {
                if descriptor.is_none() && self.session.options.include_comments {
                    self.comment(indent, &format!("TODO: check the type of {}", name));
                }
                self.put(indent, &line);
                any = true;
            }
        }
        if any {
            self.buf.blank_once();
        }
    }

    /// Synthesized trailing result return, skipped when every path already
    /// returns.
    fn generate_result(
        &mut self,
        root: &Root,
        var_names: &[String],
        state: &RoutineState,
        indent: usize,
    ) {
        if !root.is_function() || state.analysis.always_returns {
            return;
        }
        let result_var = var_names
            .iter()
            .find(|v| v.eq_ignore_ascii_case("result"))
            .cloned();
        let fn_name_set = var_names.iter().any(|v| *v == root.name);
        let expr = match (result_var, fn_name_set) {
            (Some(var), _) => var,
            (None, true) => root.name.clone(),
            (None, false) => {
                if state.analysis.returns {
                    // explicit returns exist on some path, nothing to compose
                    return;
                }
                if self.session.options.include_comments {
                    self.comment(indent, "TODO: compose and return the function result");
                }
                return;
            }
        };
        let expr = self.transform(&expr);
        let line = self.dialect.return_statement(Some(&expr));
        self.put(indent, &line);
    }

    fn emit_subqueue(&mut self, squeue: &Subqueue, indent: usize, st: &RoutineState) {
        for elem in squeue.iter() {
            self.emit_element(elem, indent, st);
        }
        if squeue.is_empty() {
            if let Some(filler) = self.dialect.empty_body() {
                self.put(indent, &filler);
            }
        }
    }

    fn emit_element(&mut self, elem: &Element, indent: usize, st: &RoutineState) {
        if elem.disabled() {
            if self.session.options.include_comments {
                self.comment(indent, "disabled element:");
                for line in elem.text_lines() {
                    self.comment(indent, &line);
                }
            }
            return;
        }
        self.element_comments(indent, elem.comment());
        match elem {
            Element::Instruction(ins) => self.emit_instruction(ins, indent, st),
            Element::Alternative(alt) => self.emit_alternative(alt, indent, st),
            Element::Case(case) => self.emit_case(case, indent, st),
            Element::For(f) => self.emit_for(f, indent, st),
            Element::While(w) => self.emit_while(w, indent, st),
            Element::Repeat(r) => self.emit_repeat(r, indent, st),
            Element::Forever(f) => self.emit_forever(f, indent, st),
            Element::Call(call) => self.emit_call(call, indent),
            Element::Jump(jump) => self.emit_jump(jump, indent, st),
            Element::Parallel(par) => self.emit_parallel(par, indent, st),
            Element::Try(t) => self.emit_try(t, indent, st),
        }
    }

    fn emit_instruction(&mut self, ins: &Instruction, indent: usize, st: &RoutineState) {
        let keywords = self.session.keywords.clone();
        for line in &ins.lines {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(rest) = KeywordTable::match_keyword(line, &keywords.input) {
                let (prompt, var) = parse_input(rest);
                let var = self.transform(&var);
                let stmt = self.dialect.input_statement(&var, prompt.as_deref());
                self.put_all(indent, &stmt);
            } else if let Some(rest) = KeywordTable::match_keyword(line, &keywords.output) {
                let args: Vec<String> = split_expression_list(rest, ",")
                    .iter()
                    .map(|a| self.transform(a))
                    .collect();
                let stmt = self.dialect.output_statement(&args);
                self.put(indent, &stmt);
            } else if let Some(rest) = KeywordTable::match_keyword(line, &keywords.pre_return) {
                let expr = if rest.is_empty() {
                    None
                } else {
                    Some(self.transform(rest))
                };
                let stmt = self.dialect.return_statement(expr.as_deref());
                self.put(indent, &stmt);
            } else if let Some((lhs, rhs)) = split_assignment(line) {
                self.emit_assignment(&lhs, &rhs, indent, st);
            } else {
                let stmt = self.dialect.statement(&self.transform(line));
                self.put(indent, &stmt);
            }
        }
    }

    fn emit_assignment(&mut self, lhs: &str, rhs: &str, indent: usize, st: &RoutineState) {
        let rhs_trimmed = rhs.trim();
        if rhs_trimmed.starts_with('{') && rhs_trimmed.ends_with('}') {
            let target = analysis::lhs_variable(lhs);
            let descriptor = target
                .as_deref()
                .and_then(|name| st.root.types.lookup(name));
            self.emit_structured_initializer(lhs, rhs_trimmed, descriptor, &st.root.types, indent);
            return;
        }
        let stmt = self
            .dialect
            .statement(&self.transform(&format!("{} <- {}", lhs, rhs)));
        self.put(indent, &stmt);
    }

    /// Decompose record/array initializers for targets without literal
    /// syntax for them; unknown shapes degrade to a marked placeholder.
    fn emit_structured_initializer(
        &mut self,
        lhs: &str,
        initializer: &str,
        descriptor: Option<&TypeDescriptor>,
        types: &crate::ir::TypeMap,
        indent: usize,
    ) {
        let inner = &initializer[1..initializer.len() - 1];
        let items = split_expression_list(inner, ",");
        match descriptor {
            Some(TypeDescriptor::Record { components }) => {
                // named pairs win; positional falls back to component order
                for (i, item) in items.iter().enumerate() {
                    let (component, value) = match item.split_once(':') {
                        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
                        None => match components.get(i) {
                            Some(c) => (c.name.clone(), item.clone()),
                            None => {
                                self.comment(
                                    indent,
                                    &format!("NOT IMPLEMENTED: extra initializer value {}", item),
                                );
                                continue;
                            }
                        },
                    };
                    let access = self.dialect.record_access(lhs, &component);
                    let stmt = self
                        .dialect
                        .statement(&self.transform(&format!("{} <- {}", access, value)));
                    self.put(indent, &stmt);
                }
            }
            Some(TypeDescriptor::Array { dimensions, .. }) => {
                let item_type = infer_item_type(&items, types);
                if self.dialect.supports_array_literal() {
                    let transformed: Vec<String> =
                        items.iter().map(|i| self.transform(i)).collect();
                    let literal = self.dialect.array_literal(&transformed, &item_type);
                    let lhs_t = self.transform(lhs);
                    let stmt = self.dialect.statement(&format!("{} = {}", lhs_t, literal));
                    self.put(indent, &stmt);
                } else {
                    let base = dimensions
                        .first()
                        .and_then(|d| d.min)
                        .unwrap_or(0);
                    for (i, item) in items.iter().enumerate() {
                        let access = self
                            .dialect
                            .index_access(lhs, &(base + i as i64).to_string());
                        let stmt = self
                            .dialect
                            .statement(&self.transform(&format!("{} <- {}", access, item)));
                        self.put(indent, &stmt);
                    }
                }
            }
            _ => {
                self.comment(
                    indent,
                    "NOT IMPLEMENTED: structured initializer for a value of unknown shape",
                );
                self.comment(indent, &format!("{} <- {}", lhs, initializer));
            }
        }
    }

    fn emit_call(&mut self, call: &Call, indent: usize) {
        for line in &call.lines {
            if line.trim().is_empty() {
                continue;
            }
            let call_expr = match split_assignment(line) {
                Some((_, rhs)) => rhs,
                None => line.clone(),
            };
            if let Some((name, arity)) = parse_call(&call_expr) {
                if self.session.routines.lookup(&name, arity).is_none()
                    && !self.session.routines.is_empty()
                {
                    warn!("Call of unknown routine '{}'", name);
                    if self.session.options.include_comments {
                        let suggestions = self.session.routines.suggest(&name);
                        let hint = match suggestions.last() {
                            Some(best) => format!(" (did you mean '{}'?)", best),
                            None => String::new(),
                        };
                        self.comment(
                            indent,
                            &format!("FIXME: unknown routine '{}'{}", name, hint),
                        );
                    }
                }
            }
            let stmt = self.dialect.statement(&self.transform(line));
            self.put(indent, &stmt);
        }
    }

    fn emit_jump(&mut self, jump: &Jump, indent: usize, st: &RoutineState) {
        let keywords = self.session.keywords.clone();
        match classify_jump(&jump.text, &keywords) {
            JumpKind::Return(expr) => {
                let expr = expr.map(|e| self.transform(&e));
                let stmt = self.dialect.return_statement(expr.as_deref());
                self.put(indent, &stmt);
            }
            JumpKind::Exit(code) => {
                let code = code.map(|e| self.transform(&e));
                let stmt = self.dialect.exit_statement(code.as_deref());
                self.put(indent, &stmt);
            }
            JumpKind::Throw(expr) => {
                let expr = expr.map(|e| self.transform(&e));
                let stmt = self.dialect.throw_statement(expr.as_deref());
                self.put(indent, &stmt);
            }
            JumpKind::Leave(_) => match st.analysis.target_of(jump) {
                None => {
                    let stmt = self.dialect.break_statement();
                    self.put(indent, &stmt);
                }
                Some(JumpTarget::Label { id, levels }) => {
                    match self.dialect.multi_leave(id, levels) {
                        Some(stmt) => self.put(indent, &stmt),
                        None => {
                            self.comment(
                                indent,
                                "FIXME: multi-level loop exit is not expressible here",
                            );
                            self.comment(indent, &jump.text);
                            let stmt = self.dialect.break_statement();
                            self.put(indent, &stmt);
                        }
                    }
                }
                Some(JumpTarget::Unresolved) => {
                    // never silently dropped
                    self.comment(indent, "FIXME: jump target could not be determined!");
                    self.comment(indent, &jump.text);
                }
            },
        }
    }

    fn emit_alternative(&mut self, alt: &Alternative, indent: usize, st: &RoutineState) {
        let cond = self.transform_condition(&alt.condition);
        let open = self.dialect.alt_open(&cond, &self.session.options);
        self.put_all(indent, &open);
        self.emit_subqueue(&alt.q_true, indent + 1, st);
        if !alt.q_false.is_empty() || self.dialect.alt_else_required() {
            let else_lines = self.dialect.alt_else(&self.session.options);
            self.put_all(indent, &else_lines);
            self.emit_subqueue(&alt.q_false, indent + 1, st);
        }
        let end = self.dialect.alt_end();
        self.put_all(indent, &end);
    }

    fn emit_case(&mut self, case: &Case, indent: usize, st: &RoutineState) {
        let discr = self.transform(&case.discriminant);
        let (label_depth, body_depth) = self.dialect.case_depths();
        let branch_count = case.selector_branches().len() + usize::from(case.has_default());
        let open = self
            .dialect
            .case_open(&discr, branch_count, &self.session.options);
        self.put_all(indent, &open);
        for (i, branch) in case.selector_branches().iter().enumerate() {
            let selectors: Vec<String> = split_expression_list(&branch.selectors, ",")
                .iter()
                .map(|s| self.transform(s))
                .collect();
            let label = self.dialect.case_branch(&discr, &selectors, i == 0);
            self.put_all(indent + label_depth, &label);
            self.emit_subqueue(&branch.body, indent + body_depth, st);
            if !ends_in_jump(&branch.body) {
                let branch_end = self.dialect.case_branch_end();
                self.put_all(indent + body_depth, &branch_end);
            }
        }
        if let Some(default_body) = case.default_branch() {
            let label = self.dialect.case_default(&discr);
            self.put_all(indent + label_depth, &label);
            self.emit_subqueue(default_body, indent + body_depth, st);
            if !ends_in_jump(default_body) {
                let branch_end = self.dialect.case_branch_end();
                self.put_all(indent + body_depth, &branch_end);
            }
        }
        let end = self.dialect.case_end();
        self.put_all(indent, &end);
    }

    fn loop_prefix(&mut self, label: Option<i32>, indent: usize) {
        if let Some(label) = label.filter(|_| self.dialect.needs_loop_labels()) {
            if let Some(line) = self.dialect.loop_label_prefix(label) {
                self.put(indent, &line);
            }
        }
    }

    fn loop_suffix(&mut self, label: Option<i32>, indent: usize) {
        if let Some(label) = label.filter(|_| self.dialect.needs_loop_labels()) {
            if self.dialect.loop_label_prefix(label).is_none() {
                match self.dialect.loop_label_suffix(label) {
                    Some(line) => self.put(indent, &line),
                    None => {
                        self.comment(
                            indent,
                            &format!("FIXME: label {} cannot be placed in this language", label),
                        );
                    }
                }
            }
        }
    }

    fn emit_for(&mut self, f: &For, indent: usize, st: &RoutineState) {
        let label = st.analysis.label_of_loop(&f.id);
        self.loop_prefix(label, indent);
        let keywords = self.session.keywords.clone();
        match parse_for(&f.text, &keywords) {
            ForShape::Count {
                var,
                start,
                end,
                step,
            } => {
                let var = self.transform(&var);
                let start = self.transform(&start);
                let end = self.transform(&end);
                let open =
                    self.dialect
                        .for_count_open(&var, &start, &end, step, &self.session.options);
                self.put_all(indent, &open);
            }
            ForShape::In { var, source } => {
                let var = self.transform(&var);
                let item_type;
                let seq = match &source {
                    ForInSource::List(items) => {
                        let items: Vec<String> =
                            items.iter().map(|i| self.transform(i)).collect();
                        item_type = infer_item_type(&items, &st.root.types);
                        if item_type.is_generic() && self.session.options.include_comments {
                            self.comment(
                                indent,
                                "TODO: no uniform item type could be inferred for this list",
                            );
                        }
                        self.dialect.array_literal(&items, &item_type)
                    }
                    ForInSource::Expr(expr) => {
                        item_type = InferredType::Generic;
                        self.transform(expr)
                    }
                };
                let open = self
                    .dialect
                    .for_in_open(&var, &seq, &item_type, &self.session.options);
                self.put_all(indent, &open);
            }
            ForShape::Freetext(text) => {
                warn!("Unparsable FOR header \"{}\"", text);
                if self.session.options.include_comments {
                    self.comment(indent, "TODO: the loop header could not be parsed:");
                    self.comment(indent, &text);
                }
                let cond = self.transform_condition(&text);
                let open = self.dialect.while_open(&cond, &self.session.options);
                self.put_all(indent, &open);
            }
        }
        self.emit_subqueue(&f.body, indent + 1, st);
        let end = self.dialect.loop_end();
        self.put_all(indent, &end);
        self.loop_suffix(label, indent);
    }

    fn emit_while(&mut self, w: &While, indent: usize, st: &RoutineState) {
        let label = st.analysis.label_of_loop(&w.id);
        self.loop_prefix(label, indent);
        let cond = self.transform_condition(&w.condition);
        let open = self.dialect.while_open(&cond, &self.session.options);
        self.put_all(indent, &open);
        self.emit_subqueue(&w.body, indent + 1, st);
        let end = self.dialect.loop_end();
        self.put_all(indent, &end);
        self.loop_suffix(label, indent);
    }

    fn emit_repeat(&mut self, r: &Repeat, indent: usize, st: &RoutineState) {
        let label = st.analysis.label_of_loop(&r.id);
        self.loop_prefix(label, indent);
        let open = self.dialect.repeat_open(&self.session.options);
        self.put_all(indent, &open);
        self.emit_subqueue(&r.body, indent + 1, st);
        let cond = self.transform_condition(&r.condition);
        for (extra, line) in self.dialect.repeat_close(&cond) {
            self.put(indent + extra, &line);
        }
        self.loop_suffix(label, indent);
    }

    fn emit_forever(&mut self, f: &Forever, indent: usize, st: &RoutineState) {
        let label = st.analysis.label_of_loop(&f.id);
        self.loop_prefix(label, indent);
        let open = self.dialect.forever_open(&self.session.options);
        self.put_all(indent, &open);
        self.emit_subqueue(&f.body, indent + 1, st);
        let end = self.dialect.forever_end();
        self.put_all(indent, &end);
        self.loop_suffix(label, indent);
    }

    fn emit_parallel(&mut self, par: &Parallel, indent: usize, st: &RoutineState) {
        match self.dialect.parallel_open(par.branches.len()) {
            Some(open) => {
                self.put_all(indent, &open);
                for (i, branch) in par.branches.iter().enumerate() {
                    let branch_open = self.dialect.parallel_branch_open(i);
                    self.put_all(indent, &branch_open);
                    self.emit_subqueue(branch, indent + 1, st);
                    let branch_close = self.dialect.parallel_branch_close(i);
                    self.put_all(indent, &branch_close);
                }
                let close = self.dialect.parallel_close(par.branches.len());
                self.put_all(indent, &close);
            }
            None => {
                // legal default: flatten to annotated sequential execution
                self.comment(indent, "========= START PARALLEL SECTION =========");
                self.comment(indent, "TODO: run these branches concurrently");
                for (i, branch) in par.branches.iter().enumerate() {
                    self.comment(indent, &format!("----- branch {} -----", i + 1));
                    self.emit_subqueue(branch, indent, st);
                }
                self.comment(indent, "========== END PARALLEL SECTION ==========");
            }
        }
    }

    fn emit_try(&mut self, t: &Try, indent: usize, st: &RoutineState) {
        match self.dialect.try_open(&self.session.options) {
            Some(open) => {
                self.put_all(indent, &open);
                self.emit_subqueue(&t.body, indent + 1, st);
                let catch = self
                    .dialect
                    .try_catch(t.catch_var.as_deref(), &self.session.options);
                self.put_all(indent, &catch);
                self.emit_subqueue(&t.catch, indent + 1, st);
                if !t.finally.is_empty() {
                    let finally = self.dialect.try_finally(&self.session.options);
                    self.put_all(indent, &finally);
                    self.emit_subqueue(&t.finally, indent + 1, st);
                }
                let end = self.dialect.try_end();
                self.put_all(indent, &end);
            }
            None => {
                self.comment(indent, "try (protected block)");
                self.emit_subqueue(&t.body, indent, st);
                match &t.catch_var {
                    Some(var) => self.comment(indent, &format!("catch ({})", var)),
                    None => self.comment(indent, "catch"),
                }
                self.emit_subqueue(&t.catch, indent, st);
                if !t.finally.is_empty() {
                    self.comment(indent, "finally");
                    self.emit_subqueue(&t.finally, indent, st);
                }
            }
        }
    }
}

/// A trailing Jump already transfers control, so a branch terminator
/// placed after it would be unreachable.
fn ends_in_jump(squeue: &Subqueue) -> bool {
    squeue
        .elements
        .iter()
        .rev()
        .find(|e| !e.disabled())
        .is_some_and(|e| matches!(e, Element::Jump(_)))
}

/// Split an input statement remainder into optional prompt and variable.
fn parse_input(rest: &str) -> (Option<String>, String) {
    let tokens = tokenize(rest);
    if let Some(Token::StrLit(prompt)) = tokens.first() {
        let after: String = tokens[1..]
            .iter()
            .map(|t| t.text())
            .collect::<String>();
        let var = after.trim_start().trim_start_matches(',').trim().to_string();
        return (Some(prompt.clone()), var);
    }
    (None, rest.trim().to_string())
}

/// Extract the routine name and argument count of a call expression.
fn parse_call(expr: &str) -> Option<(String, usize)> {
    let expr = expr.trim();
    let open = expr.find('(')?;
    if !expr.ends_with(')') {
        return None;
    }
    let name = expr[..open].trim().to_string();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let args = &expr[open + 1..expr.len() - 1];
    let arity = if args.trim().is_empty() {
        0
    } else {
        split_expression_list(args, ",").len()
    };
    Some((name, arity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_counting_for_headers() {
        let kw = KeywordTable::default();
        assert_eq!(
            parse_for("for i <- 1 to 10", &kw),
            ForShape::Count {
                var: "i".to_string(),
                start: "1".to_string(),
                end: "10".to_string(),
                step: 1
            }
        );
        assert_eq!(
            parse_for("for i <- 10 to 1 by -2", &kw),
            ForShape::Count {
                var: "i".to_string(),
                start: "10".to_string(),
                end: "1".to_string(),
                step: -2
            }
        );
    }

    #[test]
    fn it_parses_for_in_headers() {
        let kw = KeywordTable::default();
        assert_eq!(
            parse_for("foreach x in {1, 2, 3}", &kw),
            ForShape::In {
                var: "x".to_string(),
                source: ForInSource::List(vec![
                    "1".to_string(),
                    "2".to_string(),
                    "3".to_string()
                ])
            }
        );
        assert_eq!(
            parse_for("for item in values", &kw),
            ForShape::In {
                var: "item".to_string(),
                source: ForInSource::Expr("values".to_string())
            }
        );
    }

    #[test]
    fn it_degrades_unparsable_for_headers() {
        let kw = KeywordTable::default();
        assert_eq!(
            parse_for("over all entries", &kw),
            ForShape::Freetext("over all entries".to_string())
        );
        assert_eq!(
            parse_for("for i <- 1 to 10 by x", &kw),
            ForShape::Freetext("for i <- 1 to 10 by x".to_string())
        );
    }

    #[test]
    fn it_parses_calls() {
        assert_eq!(parse_call("max(a, b)"), Some(("max".to_string(), 2)));
        assert_eq!(parse_call("init()"), Some(("init".to_string(), 0)));
        assert_eq!(parse_call("a + b"), None);
        assert_eq!(
            parse_call("nested(f(x), y)"),
            Some(("nested".to_string(), 2))
        );
    }

    #[test]
    fn it_parses_input_prompts() {
        assert_eq!(parse_input("x"), (None, "x".to_string()));
        assert_eq!(
            parse_input("\"enter:\", x"),
            (Some("\"enter:\"".to_string()), "x".to_string())
        );
    }
}
