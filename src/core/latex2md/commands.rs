//! Command evaluation
//!
//! Maps a completed command and the current list context to a Markdown
//! fragment. The only side effect is citation registration.

use phf::{phf_map, phf_set};
use tracing::{debug, warn};

use crate::bibliography::{footnote_marker, BibliographyStore, CitationRegistry};
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::loss::{LossKind, LossReport};

use super::context::MissingCitationPolicy;

/// Environments translated structurally instead of being copied verbatim.
pub static LIST_ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "itemize",
    "enumerate",
};

/// Sectioning commands and their heading prefix.
static HEADING_LEVELS: phf::Map<&'static str, &'static str> = phf_map! {
    "chapter" => "#",
    "section" => "##",
    "subsection" => "###",
    "subsubsection" => "####",
};

pub fn is_list_environment(name: &str) -> bool {
    LIST_ENVIRONMENTS.contains(name)
}

/// Space and newline end a command name. Tabs do not.
pub fn is_separator(c: char) -> bool {
    c == ' ' || c == '\n'
}

/// A command name with its arguments in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub arguments: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Command {
            name: name.into(),
            arguments,
        }
    }

    /// `\name[arg1][arg2]...`
    pub fn literal(&self) -> String {
        let mut out = format!("\\{}", self.name);
        for arg in &self.arguments {
            out.push('[');
            out.push_str(arg);
            out.push(']');
        }
        out
    }

    fn first_argument(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }
}

/// List block opened by `\begin{itemize}` or `\begin{enumerate}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub block_type: Option<String>,
    pub enumerate_counter: usize,
}

impl BlockContext {
    pub fn is_open(&self) -> bool {
        self.block_type.is_some()
    }

    fn is(&self, name: &str) -> bool {
        self.block_type.as_deref() == Some(name)
    }
}

pub struct CommandEvaluator<'a> {
    bibliography: &'a BibliographyStore,
    citations: CitationRegistry,
    missing_citation: MissingCitationPolicy,
    strict: bool,
}

impl<'a> CommandEvaluator<'a> {
    pub fn new(
        bibliography: &'a BibliographyStore,
        citation_start: usize,
        missing_citation: MissingCitationPolicy,
        strict: bool,
    ) -> Self {
        CommandEvaluator {
            bibliography,
            citations: CitationRegistry::new(citation_start),
            missing_citation,
            strict,
        }
    }

    pub fn citations(&self) -> &CitationRegistry {
        &self.citations
    }

    pub fn evaluate(
        &mut self,
        command: &Command,
        block: &mut BlockContext,
        losses: &mut LossReport,
    ) -> ConversionResult<String> {
        let name = command.name.as_str();

        if let Some(prefix) = HEADING_LEVELS.get(name) {
            return match command.first_argument() {
                Some(title) => Ok(format!("{} {}\n", prefix, title)),
                None => self.missing_argument(command, block, losses),
            };
        }

        match name {
            "\\" | "par" => Ok("\n\n".to_string()),
            "label" => Ok(String::new()),
            "cite" if self.bibliography.is_configured() => self.cite(command, block, losses),
            "begin" => {
                let Some(requested) = command.first_argument() else {
                    return self.missing_argument(command, block, losses);
                };
                if let Some(open) = &block.block_type {
                    return Err(ConversionError::NestedBlock {
                        open: open.clone(),
                        requested: requested.to_string(),
                    });
                }
                debug!(block = requested, "opened list block");
                block.block_type = Some(requested.to_string());
                block.enumerate_counter = 0;
                Ok("\n".to_string())
            }
            "item" if block.is("itemize") => Ok("*".to_string()),
            "item" if block.is("enumerate") => {
                block.enumerate_counter += 1;
                Ok(format!("{}.", block.enumerate_counter))
            }
            "end" => {
                block.block_type = None;
                block.enumerate_counter = 0;
                Ok("\n".to_string())
            }
            _ => Ok(self.unknown(command, block, losses)),
        }
    }

    fn cite(
        &mut self,
        command: &Command,
        block: &BlockContext,
        losses: &mut LossReport,
    ) -> ConversionResult<String> {
        let Some(key) = command.arguments.last() else {
            return self.missing_argument(command, block, losses);
        };

        if let Some(id) = self.citations.id_of(key) {
            return Ok(footnote_marker(id));
        }

        match self.bibliography.get(key) {
            Some(entry) => Ok(footnote_marker(self.citations.intern(key, entry))),
            None => match self.missing_citation {
                MissingCitationPolicy::Fail => {
                    Err(ConversionError::MissingCitation { key: key.clone() })
                }
                MissingCitationPolicy::Literal => {
                    warn!(key = %key, "citation key not in bibliography");
                    losses.record(
                        LossKind::MissingCitation,
                        Some(key.as_str()),
                        "citation key not found, command kept literally",
                    );
                    Ok(render_literal(command, block))
                }
            },
        }
    }

    fn missing_argument(
        &self,
        command: &Command,
        block: &BlockContext,
        losses: &mut LossReport,
    ) -> ConversionResult<String> {
        if self.strict {
            return Err(ConversionError::MissingArgument {
                command: command.name.clone(),
            });
        }
        losses.record(
            LossKind::UnknownCommand,
            Some(command.name.as_str()),
            "command is missing its argument, kept literally",
        );
        Ok(render_literal(command, block))
    }

    fn unknown(&self, command: &Command, block: &BlockContext, losses: &mut LossReport) -> String {
        debug!(command = %command.name, "unknown command kept literally");
        losses.record(
            LossKind::UnknownCommand,
            Some(command.name.as_str()),
            "unknown command kept literally",
        );
        render_literal(command, block)
    }
}

/// Inside a block the literal stands alone, outside it is set as inline code.
fn render_literal(command: &Command, block: &BlockContext) -> String {
    if block.is_open() {
        command.literal()
    } else {
        format!("`{}`", command.literal())
    }
}
