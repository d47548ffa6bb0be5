//! Equation rendering collaborator.
//!
//! The converter never draws images itself. For every `equation` environment it
//! hands a [`RenderRequest`] to an [`EquationRenderer`], or asks it to leave a
//! sentinel when the body cannot be rendered.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::loss::MANUAL_CONVERSION_MARKER;

/// Environment variable holding the default render command.
pub const RENDER_CMD_ENV: &str = "LATEX2MD_RENDER_CMD";

/// A request to render one equation body to `asset_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub latex: String,
    pub asset_path: String,
}

/// Asset path for the equation with the given zero-based counter.
pub fn equation_asset_path(asset_dir: &str, counter: usize) -> String {
    format!("{}/equation_{}.svg", asset_dir, counter)
}

/// Bodies with nested environments or tab characters are not renderable.
pub fn is_unsupported_equation(latex: &str) -> bool {
    latex.contains("\\begin") || latex.contains('\t')
}

pub trait EquationRenderer {
    /// Produce a vector image for `request.latex` at `request.asset_path`.
    fn render(&mut self, request: &RenderRequest) -> ConversionResult<()>;

    /// Leave the manual-conversion sentinel at `asset_path`.
    fn write_sentinel(&mut self, asset_path: &str) -> ConversionResult<()>;
}

/// Keeps requests in memory. Used by the library entry points and tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub requests: Vec<RenderRequest>,
    pub sentinels: Vec<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EquationRenderer for RecordingRenderer {
    fn render(&mut self, request: &RenderRequest) -> ConversionResult<()> {
        self.requests.push(request.clone());
        Ok(())
    }

    fn write_sentinel(&mut self, asset_path: &str) -> ConversionResult<()> {
        self.sentinels.push(asset_path.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub render_cmd: Option<String>,
}

impl RenderConfig {
    pub fn from_env() -> Self {
        Self {
            render_cmd: std::env::var(RENDER_CMD_ENV).ok(),
        }
    }

    /// Prefer an explicitly given command over the environment.
    pub fn with_render_cmd(mut self, cmd: Option<String>) -> Self {
        if cmd.is_some() {
            self.render_cmd = cmd;
        }
        self
    }
}

/// Writes assets below `base_dir`, delegating the drawing to a shell command.
///
/// The command receives the request as JSON on stdin and must print the SVG
/// document on stdout. Without a command every equation gets the sentinel.
pub struct CommandRenderer {
    base_dir: PathBuf,
    config: RenderConfig,
}

impl CommandRenderer {
    pub fn new(base_dir: impl Into<PathBuf>, config: RenderConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
        }
    }

    fn target(&self, asset_path: &str) -> io::Result<PathBuf> {
        let target = self.base_dir.join(asset_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(target)
    }
}

impl EquationRenderer for CommandRenderer {
    fn render(&mut self, request: &RenderRequest) -> ConversionResult<()> {
        let Some(cmd) = self.config.render_cmd.clone() else {
            warn!(path = %request.asset_path, "no render command configured, writing sentinel");
            return self.write_sentinel(&request.asset_path);
        };

        let target = self.target(&request.asset_path)?;
        let svg = run_render_command(&cmd, request).map_err(|e| ConversionError::Render {
            path: request.asset_path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&target, svg)?;
        debug!(path = %target.display(), "rendered equation");
        Ok(())
    }

    fn write_sentinel(&mut self, asset_path: &str) -> ConversionResult<()> {
        let target = self.target(asset_path)?;
        fs::write(target, format!("{}\n", MANUAL_CONVERSION_MARKER))?;
        Ok(())
    }
}

fn run_render_command(cmd: &str, request: &RenderRequest) -> io::Result<Vec<u8>> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let serialized = serde_json::to_string(request)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        stdin.write_all(serialized.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "render command failed",
        ));
    }
    if output.stdout.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "render command produced no output",
        ));
    }

    Ok(output.stdout)
}

/// Resolve the directory assets are written to for a given output file.
pub fn asset_base_dir(output_path: &Path) -> PathBuf {
    output_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_path_pattern() {
        assert_eq!(equation_asset_path("assets", 0), "assets/equation_0.svg");
        assert_eq!(equation_asset_path("assets", 12), "assets/equation_12.svg");
    }

    #[test]
    fn test_unsupported_equation() {
        assert!(is_unsupported_equation(r"\begin{aligned} a \end{aligned}"));
        assert!(is_unsupported_equation("a\t= b"));
        assert!(!is_unsupported_equation(r"E = mc^2"));
    }

    #[test]
    fn test_recording_renderer() {
        let mut renderer = RecordingRenderer::new();
        renderer
            .render(&RenderRequest {
                latex: "x".into(),
                asset_path: "assets/equation_0.svg".into(),
            })
            .unwrap();
        renderer.write_sentinel("assets/equation_1.svg").unwrap();
        assert_eq!(renderer.requests.len(), 1);
        assert_eq!(renderer.sentinels, vec!["assets/equation_1.svg".to_string()]);
    }

    #[test]
    fn test_explicit_render_cmd_wins() {
        let config = RenderConfig::from_env().with_render_cmd(Some("cat".into()));
        assert_eq!(config.render_cmd.as_deref(), Some("cat"));

        let config = RenderConfig::default().with_render_cmd(None);
        assert_eq!(config.render_cmd, None);
    }

    #[test]
    fn test_asset_base_dir() {
        assert_eq!(
            asset_base_dir(Path::new("docs/paper.md")),
            PathBuf::from("docs")
        );
    }
}
