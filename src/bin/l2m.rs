//! latex2md CLI - Convert a LaTeX file to Markdown

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use tracing::info;
#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "cli")]
use latex2md::{
    convert_with_renderer, strip_list_indentation,
    utils::render::{asset_base_dir, CommandRenderer, RenderConfig},
    BibliographyStore, ConversionError, L2MOptions, MissingCitationPolicy,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "l2m")]
#[command(version)]
#[command(about = "Convert a LaTeX file to a Markdown file", long_about = None)]
struct Cli {
    /// The LaTeX file to convert
    filename: PathBuf,

    /// Output file path (defaults to the input with a .md extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The file path to the BibTeX bibliography file
    #[arg(short, long, alias = "bibliographie")]
    bibliography: Option<PathBuf>,

    /// The start count for citations
    #[arg(long = "citation-count", alias = "citation_count", default_value_t = 0)]
    citation_count: usize,

    /// Fail on unterminated commands and environments instead of flushing them
    #[arg(long)]
    strict: bool,

    /// Keep citations of unknown keys literally instead of failing
    #[arg(long)]
    literal_missing_citations: bool,

    /// Shell command rendering an equation (JSON request on stdin, SVG on stdout)
    #[arg(long)]
    render_cmd: Option<String>,

    /// Write a loss report JSON to this path
    #[arg(long)]
    loss_log: Option<PathBuf>,

    /// Keep tab-indented list items as produced
    #[arg(long)]
    no_postprocess: bool,
}

#[cfg(feature = "cli")]
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("md")
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), ConversionError> {
    let input = fs::read_to_string(&cli.filename)?;

    let bib_source = match cli.bibliography.as_ref() {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };
    let bibliography = BibliographyStore::parse(bib_source.as_deref())?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.filename));

    let options = L2MOptions {
        citation_start: cli.citation_count,
        missing_citation: if cli.literal_missing_citations {
            MissingCitationPolicy::Literal
        } else {
            MissingCitationPolicy::Fail
        },
        strict: cli.strict,
        ..Default::default()
    };

    let render_config = RenderConfig::from_env().with_render_cmd(cli.render_cmd.clone());
    let mut renderer = CommandRenderer::new(asset_base_dir(&output_path), render_config);

    let (mut content, report, counter) =
        convert_with_renderer(&input, &bibliography, options, &mut renderer)?;
    if !cli.no_postprocess {
        content = strip_list_indentation(&content);
    }
    fs::write(&output_path, content)?;

    if let Some(path) = cli.loss_log.as_ref() {
        let serialized = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        fs::write(path, serialized)?;
    }

    info!(
        output = %output_path.display(),
        losses = report.losses.len(),
        last_citation = counter,
        "conversion finished"
    );
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "latex2md=info,l2m=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install latex2md --features cli");
    eprintln!("  l2m [OPTIONS] <FILENAME>");
}
