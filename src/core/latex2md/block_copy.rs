//! Verbatim buffering of environments we cannot translate.
//!
//! Everything between `\begin{x}` and its matching `\end` is kept as written.
//! A small nested scanner watches for `\begin`/`\end` so that inner
//! environments do not close the block early. Names are not matched: the block
//! closes when the begin/end count returns to zero.

use crate::utils::loss::MANUAL_CONVERSION_MARKER;

use super::commands::is_separator;

/// State of the nested command scanner inside a copied block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NestedScan {
    #[default]
    Raw,
    Name,
    Argument { depth: usize },
    AfterArgument,
}

/// Result of feeding one character to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEvent {
    Pending,
    /// The outer environment closed. A non-whitespace character that ended the
    /// final `\end` belongs to the surrounding text and is handed back.
    Closed { redispatch: Option<char> },
}

#[derive(Debug, Clone)]
pub struct BlockCopyBuffer {
    block_type: String,
    depth: usize,
    buffer: String,
    scan: NestedScan,
    name: String,
}

impl BlockCopyBuffer {
    pub fn open(block_type: impl Into<String>) -> Self {
        BlockCopyBuffer {
            block_type: block_type.into(),
            depth: 1,
            buffer: String::new(),
            scan: NestedScan::Raw,
            name: String::new(),
        }
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn is_equation(&self) -> bool {
        self.block_type == "equation"
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Markdown fence opening a copied block.
    pub fn open_marker(&self) -> String {
        format!("```latex\n\\begin{{{}}}\n", self.block_type)
    }

    pub fn push(&mut self, c: char) -> BlockEvent {
        match self.scan {
            NestedScan::Raw => {
                self.buffer.push(c);
                if c == '\\' {
                    self.name.clear();
                    self.scan = NestedScan::Name;
                }
                BlockEvent::Pending
            }
            NestedScan::Name => match c {
                '{' | '[' => {
                    self.buffer.push(c);
                    self.scan = NestedScan::Argument { depth: 1 };
                    BlockEvent::Pending
                }
                '\\' if self.name.is_empty() => {
                    self.buffer.push(c);
                    self.name.push(c);
                    BlockEvent::Pending
                }
                c if c == '\\' || is_separator(c) => self.complete_nested(Some(c)),
                _ => {
                    self.buffer.push(c);
                    self.name.push(c);
                    BlockEvent::Pending
                }
            },
            NestedScan::Argument { depth } => {
                self.buffer.push(c);
                let depth = match c {
                    '{' | '[' => depth + 1,
                    '}' | ']' => depth - 1,
                    _ => depth,
                };
                self.scan = if depth == 0 {
                    NestedScan::AfterArgument
                } else {
                    NestedScan::Argument { depth }
                };
                BlockEvent::Pending
            }
            NestedScan::AfterArgument => match c {
                '{' | '[' => {
                    self.buffer.push(c);
                    self.scan = NestedScan::Argument { depth: 1 };
                    BlockEvent::Pending
                }
                _ => self.complete_nested(Some(c)),
            },
        }
    }

    /// Input ended: a nested command still being scanned is complete.
    pub fn finish(&mut self) -> BlockEvent {
        match self.scan {
            NestedScan::Name | NestedScan::AfterArgument => self.complete_nested(None),
            NestedScan::Raw | NestedScan::Argument { .. } => BlockEvent::Pending,
        }
    }

    fn complete_nested(&mut self, delimiter: Option<char>) -> BlockEvent {
        match self.name.as_str() {
            "begin" => self.depth += 1,
            "end" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.name.clear();
        self.scan = NestedScan::Raw;

        if self.depth == 0 {
            return match delimiter {
                Some(c) if is_separator(c) => {
                    self.buffer.push(c);
                    BlockEvent::Closed { redispatch: None }
                }
                other => BlockEvent::Closed { redispatch: other },
            };
        }

        match delimiter {
            Some(c) => self.push(c),
            None => BlockEvent::Pending,
        }
    }

    /// Raw contents closed by a fence and the manual-conversion marker.
    pub fn into_literal(self) -> String {
        let mut out = self.buffer;
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
        out.push_str(MANUAL_CONVERSION_MARKER);
        out.push('\n');
        out
    }

    /// Equation body without its closing `\end{equation}`, on a single line.
    pub fn into_equation_body(self) -> String {
        let body = self.buffer.trim_end();
        let body = body.strip_suffix("\\end{equation}").unwrap_or(body);
        body.replace('\n', " ").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(buffer: &mut BlockCopyBuffer, input: &str) -> Option<(usize, BlockEvent)> {
        for (i, c) in input.chars().enumerate() {
            let event = buffer.push(c);
            if event != BlockEvent::Pending {
                return Some((i, event));
            }
        }
        None
    }

    #[test]
    fn test_closes_on_end() {
        let mut buffer = BlockCopyBuffer::open("tikzpicture");
        let (_, event) = feed(&mut buffer, "\\draw (0,0) -- (1,1);\n\\end{tikzpicture}\n").unwrap();
        assert_eq!(event, BlockEvent::Closed { redispatch: None });
        assert_eq!(buffer.contents(), "\\draw (0,0) -- (1,1);\n\\end{tikzpicture}\n");
    }

    #[test]
    fn test_nested_pairs_keep_block_open() {
        let mut buffer = BlockCopyBuffer::open("foo");
        assert_eq!(feed(&mut buffer, "\\begin{foo}X\\end{foo}"), None);
        // the inner \end is only counted once its delimiter arrives
        assert_eq!(buffer.depth(), 2);
        assert_eq!(feed(&mut buffer, "\\end{foo}"), None);
        assert_eq!(buffer.finish(), BlockEvent::Closed { redispatch: None });
        assert_eq!(buffer.contents(), "\\begin{foo}X\\end{foo}\\end{foo}");
    }

    #[test]
    fn test_mismatched_names_still_close() {
        let mut buffer = BlockCopyBuffer::open("figure");
        let (_, event) = feed(&mut buffer, "x\\end{table} tail").unwrap();
        assert_eq!(event, BlockEvent::Closed { redispatch: None });
    }

    #[test]
    fn test_non_whitespace_delimiter_handed_back() {
        let mut buffer = BlockCopyBuffer::open("foo");
        let (_, event) = feed(&mut buffer, "a\\end{foo}.").unwrap();
        assert_eq!(event, BlockEvent::Closed { redispatch: Some('.') });
        assert_eq!(buffer.contents(), "a\\end{foo}");
    }

    #[test]
    fn test_braces_inside_arguments() {
        let mut buffer = BlockCopyBuffer::open("foo");
        assert_eq!(feed(&mut buffer, "\\node{\\textbf{\\end}} "), None);
        assert_eq!(buffer.depth(), 1);
    }

    #[test]
    fn test_line_break_command() {
        let mut buffer = BlockCopyBuffer::open("tabular");
        assert_eq!(feed(&mut buffer, "a & b \\\\\\hline\n"), None);
        let (_, event) = feed(&mut buffer, "\\end{tabular}\n").unwrap();
        assert_eq!(event, BlockEvent::Closed { redispatch: None });
    }

    #[test]
    fn test_literal_output() {
        let mut buffer = BlockCopyBuffer::open("foo");
        feed(&mut buffer, "body\\end{foo}");
        buffer.finish();
        assert_eq!(buffer.open_marker(), "```latex\n\\begin{foo}\n");
        assert_eq!(
            buffer.into_literal(),
            "body\\end{foo}\n```\n<!-- TODO manual conversion needed -->\n"
        );
    }

    #[test]
    fn test_equation_body() {
        let mut buffer = BlockCopyBuffer::open("equation");
        feed(&mut buffer, "  a + b\n  = c\n\\end{equation}\n");
        assert!(buffer.is_equation());
        assert_eq!(buffer.into_equation_body(), "a + b   = c");
    }

    #[test]
    fn test_equation_body_closed_by_space() {
        let mut buffer = BlockCopyBuffer::open("equation");
        let (_, event) = feed(&mut buffer, "\nx^2\n\\end{equation} after").unwrap();
        assert_eq!(event, BlockEvent::Closed { redispatch: None });
        assert_eq!(buffer.into_equation_body(), "x^2");
    }

    #[test]
    fn test_tab_does_not_end_nested_name() {
        let mut buffer = BlockCopyBuffer::open("foo");
        assert_eq!(feed(&mut buffer, "\\end\tx\n"), None);
        assert_eq!(buffer.depth(), 1);
    }
}
