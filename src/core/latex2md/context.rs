//! Core state and structures for LaTeX to Markdown conversion
//!
//! This module contains the options, the parser states and the character
//! driven converter that owns them.

use std::fmt;

use tracing::{debug, warn};

use crate::bibliography::{BibliographyStore, CitationRegistry};
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::loss::{LossKind, LossReport};
use crate::utils::render::{
    equation_asset_path, is_unsupported_equation, EquationRenderer, RenderRequest,
};

use super::block_copy::{BlockCopyBuffer, BlockEvent};
use super::commands::{
    is_list_environment, is_separator, BlockContext, Command, CommandEvaluator,
};

// =============================================================================
// LaTeX → Markdown Conversion Options
// =============================================================================

/// What to do when `\cite` names a key the bibliography does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCitationPolicy {
    /// Abort the conversion with [`ConversionError::MissingCitation`].
    #[default]
    Fail,
    /// Keep the command literally and record a loss.
    Literal,
}

/// Options for LaTeX to Markdown conversion
#[derive(Debug, Clone)]
pub struct L2MOptions {
    /// Footnote ids start at `citation_start + 1`
    /// Default: 0
    pub citation_start: usize,

    /// Handling of citation keys missing from the bibliography
    /// Default: Fail
    pub missing_citation: MissingCitationPolicy,

    /// Strict mode: unterminated input and missing arguments are errors
    /// Default: false
    pub strict: bool,

    /// Directory equation assets are referenced from
    /// Default: "assets"
    pub asset_dir: String,
}

impl Default for L2MOptions {
    fn default() -> Self {
        Self {
            citation_start: 0,
            missing_citation: MissingCitationPolicy::Fail,
            strict: false,
            asset_dir: "assets".to_string(),
        }
    }
}

impl L2MOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict mode options (errors on unterminated input)
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_citation_start(mut self, start: usize) -> Self {
        self.citation_start = start;
        self
    }

    pub fn with_missing_citation(mut self, policy: MissingCitationPolicy) -> Self {
        self.missing_citation = policy;
        self
    }
}

// =============================================================================
// Parser State
// =============================================================================

/// Parser state. Block-copy sub-states live in [`BlockCopyBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Normal,
    Comment,
    CommandName,
    /// Reading an argument opened by `{` or `[`; only the same bracket kind nests.
    CommandArgument { closer: char, depth: usize },
    BetweenArguments,
    BlockCopy,
    Finished,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserState::CommandArgument { .. } => write!(f, "CommandArgument"),
            other => write!(f, "{:?}", other),
        }
    }
}

fn closer_for(opener: char) -> char {
    if opener == '[' {
        ']'
    } else {
        '}'
    }
}

// =============================================================================
// Converter
// =============================================================================

/// Single-pass, character driven LaTeX → Markdown converter.
///
/// One converter handles one document. Feed every character to
/// [`process`](Self::process) in order, then call [`finish`](Self::finish)
/// once for the pending tail and the footnote footer.
pub struct LatexConverter<'a> {
    options: L2MOptions,
    state: ParserState,
    command: Command,
    argument: String,
    block: BlockContext,
    copy: Option<BlockCopyBuffer>,
    equation_counter: usize,
    evaluator: CommandEvaluator<'a>,
    renderer: &'a mut dyn EquationRenderer,
    losses: LossReport,
}

impl<'a> LatexConverter<'a> {
    pub fn new(
        bibliography: &'a BibliographyStore,
        options: L2MOptions,
        renderer: &'a mut dyn EquationRenderer,
    ) -> Self {
        let evaluator = CommandEvaluator::new(
            bibliography,
            options.citation_start,
            options.missing_citation,
            options.strict,
        );
        LatexConverter {
            options,
            state: ParserState::Normal,
            command: Command::default(),
            argument: String::new(),
            block: BlockContext::default(),
            copy: None,
            equation_counter: 0,
            evaluator,
            renderer,
            losses: LossReport::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn equation_counter(&self) -> usize {
        self.equation_counter
    }

    pub fn citations(&self) -> &CitationRegistry {
        self.evaluator.citations()
    }

    pub fn losses(&self) -> &LossReport {
        &self.losses
    }

    pub fn into_losses(self) -> LossReport {
        self.losses
    }

    /// Convert a whole document: every character in order, then the footer.
    pub fn convert_document(&mut self, input: &str) -> ConversionResult<String> {
        let mut output = String::with_capacity(input.len());
        for c in input.chars() {
            output.push_str(&self.process(c)?);
        }
        output.push_str(&self.finish()?);
        Ok(output)
    }

    /// Consume one character and return the text it produces.
    pub fn process(&mut self, c: char) -> ConversionResult<String> {
        let mut output = String::new();
        match self.state {
            ParserState::Normal => match c {
                '#' => self.state = ParserState::Comment,
                '\\' => {
                    self.command = Command::default();
                    self.argument.clear();
                    self.state = ParserState::CommandName;
                }
                _ => output.push(c),
            },
            ParserState::Comment => {
                if c == '\n' {
                    output.push('\n');
                    self.state = ParserState::Normal;
                }
            }
            ParserState::CommandName => match c {
                '{' | '[' => {
                    self.state = ParserState::CommandArgument {
                        closer: closer_for(c),
                        depth: 1,
                    }
                }
                '\\' if self.command.name.is_empty() => self.command.name.push(c),
                c if c == '\\' || is_separator(c) => output = self.complete_command(Some(c))?,
                _ => self.command.name.push(c),
            },
            ParserState::CommandArgument { closer, depth } => {
                let opener = if closer == ']' { '[' } else { '{' };
                if c == closer && depth == 1 {
                    self.command
                        .arguments
                        .push(std::mem::take(&mut self.argument));
                    self.state = ParserState::BetweenArguments;
                } else {
                    let depth = if c == opener {
                        depth + 1
                    } else if c == closer {
                        depth - 1
                    } else {
                        depth
                    };
                    self.argument.push(c);
                    self.state = ParserState::CommandArgument { closer, depth };
                }
            }
            ParserState::BetweenArguments => match c {
                '{' | '[' => {
                    self.state = ParserState::CommandArgument {
                        closer: closer_for(c),
                        depth: 1,
                    }
                }
                _ => output = self.complete_command(Some(c))?,
            },
            ParserState::BlockCopy => {
                let Some(copy) = self.copy.as_mut() else {
                    return Err(self.structural(Some(c)));
                };
                if let BlockEvent::Closed { redispatch } = copy.push(c) {
                    output = self.close_block()?;
                    if let Some(c) = redispatch {
                        output.push_str(&self.process(c)?);
                    }
                }
            }
            ParserState::Finished => return Err(self.structural(Some(c))),
        }
        Ok(output)
    }

    /// Flush whatever the input left open and append the footnote footer.
    pub fn finish(&mut self) -> ConversionResult<String> {
        let mut output = String::new();
        match self.state {
            ParserState::Normal | ParserState::Comment => {}
            ParserState::CommandName | ParserState::BetweenArguments => {
                output = self.complete_command(None)?;
            }
            ParserState::CommandArgument { .. } => {
                output = self.flush_open_argument()?;
            }
            ParserState::BlockCopy => {
                let Some(copy) = self.copy.as_mut() else {
                    return Err(self.structural(None));
                };
                output = match copy.finish() {
                    BlockEvent::Closed { .. } => self.close_block()?,
                    BlockEvent::Pending => self.flush_open_block()?,
                };
            }
            ParserState::Finished => return Err(self.structural(None)),
        }
        output.push_str(&self.evaluator.citations().render_footer());
        self.state = ParserState::Finished;
        Ok(output)
    }

    fn structural(&self, c: Option<char>) -> ConversionError {
        ConversionError::Structural {
            state: self.state.to_string(),
            found: c.map_or_else(|| "end of input".to_string(), |c| format!("{:?}", c)),
        }
    }

    /// Run completion logic for the pending command. `delimiter` is the
    /// character that ended it, or `None` at end of input.
    fn complete_command(&mut self, delimiter: Option<char>) -> ConversionResult<String> {
        let command = std::mem::take(&mut self.command);
        self.argument.clear();
        self.state = ParserState::Normal;

        if command.name == "begin" {
            if let Some(block_type) = command.arguments.first() {
                if !is_list_environment(block_type) {
                    let mut output = self.open_block(block_type);
                    if let Some(c) = delimiter.filter(|c| !is_separator(*c)) {
                        output.push_str(&self.process(c)?);
                    }
                    return Ok(output);
                }
            }
        }

        let mut output = self
            .evaluator
            .evaluate(&command, &mut self.block, &mut self.losses)?;
        match delimiter {
            // `\` opens the next command and `#` a comment
            Some(c @ ('\\' | '#')) => output.push_str(&self.process(c)?),
            Some(c) if is_separator(c) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push(c);
                }
            }
            Some(c) => {
                if !output.ends_with('\n') {
                    output.push(c);
                }
            }
            None => {}
        }
        Ok(output)
    }

    fn open_block(&mut self, block_type: &str) -> String {
        debug!(block = block_type, "entering block copy");
        let copy = BlockCopyBuffer::open(block_type);
        let output = if copy.is_equation() {
            let path = equation_asset_path(&self.options.asset_dir, self.equation_counter);
            format!(
                "\n<img src=\"{}\" style=\"width: 50%;height: auto;padding: 10px;\"/>\n",
                path
            )
        } else {
            copy.open_marker()
        };
        self.copy = Some(copy);
        self.state = ParserState::BlockCopy;
        output
    }

    fn close_block(&mut self) -> ConversionResult<String> {
        self.state = ParserState::Normal;
        let Some(copy) = self.copy.take() else {
            return Err(self.structural(None));
        };
        debug!(block = copy.block_type(), "leaving block copy");

        if !copy.is_equation() {
            warn!(block = copy.block_type(), "environment copied verbatim");
            self.losses.record(
                LossKind::UnknownEnvironment,
                Some(copy.block_type()),
                "environment copied verbatim, needs manual conversion",
            );
            return Ok(copy.into_literal());
        }

        let latex = copy.into_equation_body();
        self.emit_equation(latex);
        Ok("\n".to_string())
    }

    /// Hand one equation to the renderer. Always advances the counter.
    fn emit_equation(&mut self, latex: String) {
        let asset_path = equation_asset_path(&self.options.asset_dir, self.equation_counter);
        self.equation_counter += 1;

        let result = if is_unsupported_equation(&latex) {
            self.losses.record(
                LossKind::UnsupportedEquation,
                Some(asset_path.as_str()),
                "equation contains a nested environment or a tab, left for manual conversion",
            );
            self.renderer.write_sentinel(&asset_path)
        } else {
            self.renderer.render(&RenderRequest {
                latex,
                asset_path: asset_path.clone(),
            })
        };

        if let Err(err) = result {
            warn!(path = %asset_path, error = %err, "equation rendering failed");
            self.losses
                .record(LossKind::RenderFailure, Some(asset_path.as_str()), err.to_string());
        }
    }

    fn flush_open_argument(&mut self) -> ConversionResult<String> {
        let name = self.command.name.clone();
        if self.options.strict {
            return Err(ConversionError::Unterminated {
                what: format!("an argument of \\{}", name),
            });
        }
        warn!(command = %name, "input ended inside a command argument");
        self.losses.record(
            LossKind::UnterminatedInput,
            Some(name.as_str()),
            "input ended inside a command argument, kept literally",
        );
        let mut command = std::mem::take(&mut self.command);
        command.arguments.push(std::mem::take(&mut self.argument));
        self.state = ParserState::Normal;
        Ok(format!("`{}`", command.literal()))
    }

    fn flush_open_block(&mut self) -> ConversionResult<String> {
        let block_type = self
            .copy
            .as_ref()
            .map(|copy| copy.block_type().to_string())
            .unwrap_or_default();
        if self.options.strict {
            return Err(ConversionError::Unterminated {
                what: format!("environment '{}'", block_type),
            });
        }
        warn!(block = %block_type, "input ended inside an environment");
        self.losses.record(
            LossKind::UnterminatedInput,
            Some(block_type.as_str()),
            "input ended inside an environment, contents flushed",
        );

        self.state = ParserState::Normal;
        let Some(copy) = self.copy.take() else {
            return Ok(String::new());
        };
        if copy.is_equation() {
            let asset_path = equation_asset_path(&self.options.asset_dir, self.equation_counter);
            self.equation_counter += 1;
            if let Err(err) = self.renderer.write_sentinel(&asset_path) {
                warn!(path = %asset_path, error = %err, "failed to write sentinel");
            }
            return Ok("\n".to_string());
        }
        Ok(copy.into_literal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::render::RecordingRenderer;

    fn run(input: &str) -> (String, RecordingRenderer) {
        let bib = BibliographyStore::empty();
        let mut renderer = RecordingRenderer::new();
        let output = {
            let mut converter = LatexConverter::new(&bib, L2MOptions::default(), &mut renderer);
            converter.convert_document(input).unwrap()
        };
        (output, renderer)
    }

    #[test]
    fn test_states_follow_input() {
        let bib = BibliographyStore::empty();
        let mut renderer = RecordingRenderer::new();
        let mut converter = LatexConverter::new(&bib, L2MOptions::default(), &mut renderer);
        assert_eq!(converter.process('a').unwrap(), "a");
        assert_eq!(converter.state(), ParserState::Normal);
        converter.process('\\').unwrap();
        assert_eq!(converter.state(), ParserState::CommandName);
        converter.process('x').unwrap();
        converter.process('{').unwrap();
        assert!(matches!(
            converter.state(),
            ParserState::CommandArgument { closer: '}', depth: 1 }
        ));
        converter.process('y').unwrap();
        converter.process('}').unwrap();
        assert_eq!(converter.state(), ParserState::BetweenArguments);
        assert_eq!(converter.process(' ').unwrap(), "`\\x[y]` ");
        assert_eq!(converter.state(), ParserState::Normal);
    }

    #[test]
    fn test_comment_keeps_newline() {
        assert_eq!(run("# ignored\nKept").0, "\nKept\n\n");
    }

    #[test]
    fn test_process_after_finish_is_structural() {
        let bib = BibliographyStore::empty();
        let mut renderer = RecordingRenderer::new();
        let mut converter = LatexConverter::new(&bib, L2MOptions::default(), &mut renderer);
        converter.finish().unwrap();
        let err = converter.process('x').unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_nested_braces_in_argument() {
        assert_eq!(run("\\section{A {b} c}\n").0, "## A {b} c\n\n\n");
    }

    #[test]
    fn test_backslash_ends_command() {
        assert_eq!(run("\\label{a}\\par\n").0, "\n\n\n\n");
    }

    #[test]
    fn test_punctuation_after_heading_dropped() {
        assert_eq!(run("\\section{A}.").0, "## A\n\n\n");
    }

    #[test]
    fn test_punctuation_after_inline_kept() {
        assert_eq!(run("\\emph{a}.").0, "`\\emph[a]`.\n\n");
    }

    #[test]
    fn test_hash_after_heading_starts_comment() {
        assert_eq!(run("\\section{A}# note\nB").0, "## A\n\nB\n\n");
    }

    #[test]
    fn test_tab_is_part_of_name() {
        assert_eq!(run("\\par\tx ").0, "`\\par\tx` \n\n");
    }

    #[test]
    fn test_other_bracket_kind_stays_in_argument() {
        assert_eq!(run("\\section{A]b} ").0, "## A]b\n\n\n");
        assert_eq!(run("\\textbf[x}y] ").0, "`\\textbf[x}y]` \n\n");
    }

    #[test]
    fn test_line_break() {
        assert_eq!(run("a\\\\ b").0, "a\n\nb\n\n");
    }

    #[test]
    fn test_equation_counter_and_requests() {
        let (output, renderer) = run(
            "\\begin{equation}\nE = mc^2\n\\end{equation}\n\\begin{equation}\nx\n\\end{equation}\n",
        );
        assert!(output.contains("assets/equation_0.svg"));
        assert!(output.contains("assets/equation_1.svg"));
        assert_eq!(
            renderer.requests,
            vec![
                RenderRequest {
                    latex: "E = mc^2".into(),
                    asset_path: "assets/equation_0.svg".into(),
                },
                RenderRequest {
                    latex: "x".into(),
                    asset_path: "assets/equation_1.svg".into(),
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_block_strict() {
        let bib = BibliographyStore::empty();
        let mut renderer = RecordingRenderer::new();
        let mut converter = LatexConverter::new(&bib, L2MOptions::strict(), &mut renderer);
        let err = converter.convert_document("\\begin{foo}\nbody").unwrap_err();
        assert!(matches!(err, ConversionError::Unterminated { .. }));
    }

    #[test]
    fn test_unterminated_block_flushed() {
        let (output, _) = run("\\begin{foo}\nbody");
        assert!(output.starts_with("```latex\n\\begin{foo}\nbody\n```\n"));
    }

    #[test]
    fn test_unterminated_argument_flushed() {
        let (output, _) = run("x \\textbf{bo");
        assert!(output.starts_with("x `\\textbf[bo]`"));
    }
}
