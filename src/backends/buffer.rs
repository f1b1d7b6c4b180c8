// SPDX-License-Identifier: GPL-3.0-or-later

//! Append-only output buffer with deferred insertion marks.
//!
//! Some back ends must place code at a position decided before later text
//! was appended (forward-declared subroutine bodies, late global
//! definitions). Instead of splicing a growing line array and shifting
//! indices, a mark records the position and all insertions resolve in one
//! pass when the buffer is finished.

use std::collections::BTreeMap;

/// A recorded insertion point. Lines inserted at a mark land *before* the
/// line that was appended right after the mark was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug, Default)]
pub struct CodeBuffer {
    lines: Vec<String>,
    pending: BTreeMap<usize, Vec<String>>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn add_all(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Avoid stacking blank separator lines.
    pub fn blank_once(&mut self) {
        if !matches!(self.lines.last(), Some(l) if l.is_empty()) && !self.lines.is_empty() {
            self.lines.push(String::new());
        }
    }

    pub fn mark(&self) -> Mark {
        Mark(self.lines.len())
    }

    /// Queue a line for insertion at `mark`. Multiple insertions at the same
    /// mark keep their call order.
    pub fn insert_at(&mut self, mark: Mark, line: impl Into<String>) {
        self.pending.entry(mark.0).or_default().push(line.into());
    }

    pub fn insert_all_at(&mut self, mark: Mark, lines: impl IntoIterator<Item = String>) {
        self.pending
            .entry(mark.0)
            .or_default()
            .extend(lines);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.pending.is_empty()
    }

    /// Resolve all pending insertions and produce the final text,
    /// newline-terminated.
    pub fn finish(self) -> String {
        let mut out = Vec::with_capacity(
            self.lines.len() + self.pending.values().map(Vec::len).sum::<usize>(),
        );
        let mut pending = self.pending;
        for (i, line) in self.lines.into_iter().enumerate() {
            if let Some(inserted) = pending.remove(&i) {
                out.extend(inserted);
            }
            out.push(line);
        }
        // marks taken at the very end
        for (_, inserted) in pending {
            out.extend(inserted);
        }
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_inserts_at_recorded_positions() {
        let mut buf = CodeBuffer::new();
        buf.add("header");
        let mark = buf.mark();
        buf.add("body 1");
        buf.add("body 2");
        buf.insert_at(mark, "declaration a");
        buf.insert_at(mark, "declaration b");
        buf.add("footer");
        assert_eq!(
            buf.finish(),
            "header\ndeclaration a\ndeclaration b\nbody 1\nbody 2\nfooter\n"
        );
    }

    #[test]
    fn it_resolves_marks_taken_at_the_end() {
        let mut buf = CodeBuffer::new();
        buf.add("only line");
        let mark = buf.mark();
        buf.insert_at(mark, "appendix");
        assert_eq!(buf.finish(), "only line\nappendix\n");
    }

    #[test]
    fn it_collapses_blank_runs() {
        let mut buf = CodeBuffer::new();
        buf.add("a");
        buf.blank_once();
        buf.blank_once();
        buf.add("b");
        assert_eq!(buf.finish(), "a\n\nb\n");
    }
}
