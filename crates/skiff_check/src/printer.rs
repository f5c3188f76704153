//! Line-oriented output that remembers where each line came from.

use crate::span::{LineIndex, Span};

/// Generated text with, per line, the 0-based source line it maps to.
#[derive(Debug, Default)]
pub struct Output {
    lines: Vec<(String, Option<u32>)>,
    indent: usize,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>, source_line: Option<u32>) {
        let text = format!("{}{}", "    ".repeat(self.indent), text.as_ref());
        self.lines.push((text, source_line));
    }

    /// Appends a line mapped to the start of `span`.
    pub fn mapped(&mut self, text: impl AsRef<str>, span: Span, index: &LineIndex) {
        self.line(text, Some(index.line(span.start)));
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Appends every line of `other`.
    pub fn append(&mut self, other: Output) {
        self.lines.extend(other.lines);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Source line of every generated line.
    pub fn source_lines(&self) -> Vec<Option<u32>> {
        self.lines.iter().map(|(_, line)| *line).collect()
    }

    /// The text, each line terminated by a newline.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (line, _) in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_and_mapping() {
        let index = LineIndex::new("a\nb\n");
        let mut out = Output::new();
        out.line("{", None);
        out.indent();
        out.mapped("b;", Span::new(2, 3), &index);
        out.dedent();
        out.line("}", None);
        assert_eq!(out.text(), "{\n    b;\n}\n");
        assert_eq!(out.source_lines(), [None, Some(1), None]);
    }
}
