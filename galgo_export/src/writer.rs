use std::fs;
use std::io;
use std::path::Path;

const INDENT: &str = "    ";

/// Indentation-aware text accumulator for generated source. Statements are
/// appended line by line; block helpers keep the indent depth balanced.
#[derive(Debug, Default)]
pub struct CodeWriter {
    buffer: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Append one line at the current indent depth.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    pub fn comment(&mut self, text: &str) {
        self.line(&format!("// {text}"));
    }

    /// `header {` + indent.
    pub fn begin_block(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.indent();
    }

    pub fn end_block(&mut self) {
        self.dedent();
        self.line("}");
    }

    /// Append another writer's content verbatim, re-indenting each non-empty
    /// line to this writer's current depth.
    pub fn append(&mut self, other: &CodeWriter) {
        for line in other.buffer.lines() {
            if line.is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn flush_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_follow_indent_depth() {
        let mut writer = CodeWriter::new();
        writer.begin_block("pub fn demo()");
        writer.line("let a = 1;");
        writer.begin_block("if a == 1");
        writer.line("noop();");
        writer.end_block();
        writer.end_block();

        let text = writer.into_string();
        assert_eq!(
            text,
            "pub fn demo() {\n    let a = 1;\n    if a == 1 {\n        noop();\n    }\n}\n"
        );
    }

    #[test]
    fn dedent_never_underflows() {
        let mut writer = CodeWriter::new();
        writer.dedent();
        writer.line("x");
        assert_eq!(writer.into_string(), "x\n");
    }

    #[test]
    fn append_reindents_nested_content() {
        let mut inner = CodeWriter::new();
        inner.line("let x = 1;");
        inner.begin_block("if x == 1");
        inner.line("noop();");
        inner.end_block();

        let mut outer = CodeWriter::new();
        outer.begin_block("fn outer()");
        outer.append(&inner);
        outer.end_block();

        let text = outer.into_string();
        assert!(text.contains("    let x = 1;"));
        assert!(text.contains("        noop();"));
    }
}
