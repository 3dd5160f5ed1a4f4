// Configuration for boxpeek: defaults, env lookups and the optional TOML file
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{BoxpeekError, Result};

// Rasterization
pub const PDF_POINTS_PER_INCH: f32 = 72.0;
pub const DEFAULT_DPI: u32 = 150;

// Rendering
pub const DEFAULT_LINE_WIDTH: u32 = 2;
// Largest canvas we allocate, in pixels (1 GiB of RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

// Output
pub const DEFAULT_OUTPUT_DIR: &str = "boxpeek-output";
pub const DEFAULT_NCOLS: usize = 3;
pub const REPORT_FILE: &str = "report.html";
pub const SUMMARY_FILE: &str = "summary.json";

// Config file names, checked in order
pub const LOCAL_CONFIG_FILE: &str = "boxpeek.toml";
pub const USER_CONFIG_FILE: &str = "config.toml";

// Get pdftoppm location from environment or rely on PATH
pub fn pdftoppm_program() -> PathBuf {
    env::var("BOXPEEK_PDFTOPPM")
        .unwrap_or_else(|_| "pdftoppm".to_string())
        .into()
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Scale factor from PDF points to pixels at `dpi`
pub fn dpi_to_scale(dpi: u32) -> f32 {
    dpi as f32 / PDF_POINTS_PER_INCH
}

/// Which layers are drawn and how
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub show_background_image: bool,
    #[serde(default = "default_true")]
    pub show_cluster_boxes: bool,
    #[serde(default)]
    pub show_text_cell_boxes: bool,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    /// Fill each box with the translucent color of its label
    #[serde(default)]
    pub fill_boxes: bool,
    /// Outline the page edge in black
    #[serde(default)]
    pub page_frame: bool,
}

fn default_true() -> bool { true }
fn default_line_width() -> u32 { DEFAULT_LINE_WIDTH }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_background_image: true,
            show_cluster_boxes: true,
            show_text_cell_boxes: false,
            line_width: DEFAULT_LINE_WIDTH,
            fill_boxes: false,
            page_frame: false,
        }
    }
}

/// Settings read from `boxpeek.toml`. Every field is optional so the
/// command line can override any of them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub render: Option<RenderConfig>,
    pub dpi: Option<u32>,
    pub jobs: Option<usize>,
    pub ncols: Option<usize>,
    pub output: Option<PathBuf>,
    pub results: Option<PathBuf>,
    #[serde(default)]
    pub converter: Option<ConverterConfig>,
}

/// External converter invocation; `{input}` and `{output}` in `args` are
/// substituted before running.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConverterConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| BoxpeekError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `boxpeek.toml` from the working directory, falling back to the
    /// per-user config directory. Missing files yield the empty config.
    pub fn discover() -> Result<Self> {
        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("boxpeek").join(USER_CONFIG_FILE));
        }

        for path in candidates {
            if path.is_file() {
                log::debug!("loading config from {}", path.display());
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults_match_notebook() {
        let cfg = RenderConfig::default();
        assert!(cfg.show_background_image);
        assert!(cfg.show_cluster_boxes);
        assert!(!cfg.show_text_cell_boxes);
        assert_eq!(cfg.line_width, 2);
    }

    #[test]
    fn test_partial_toml() {
        let cfg: FileConfig = toml::from_str(
            r#"
            dpi = 300
            [render]
            show_text_cell_boxes = true
            [converter]
            program = "docling"
            args = ["{input}", "--output", "{output}"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.dpi, Some(300));
        let render = cfg.render.unwrap();
        assert!(render.show_text_cell_boxes);
        assert!(render.show_cluster_boxes);
        assert_eq!(cfg.converter.unwrap().args.len(), 3);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxpeek.toml");
        fs::write(&path, "dpi = \"high\"").unwrap();
        assert!(matches!(FileConfig::load(&path), Err(BoxpeekError::Config(_))));
    }

    #[test]
    fn test_dpi_scale() {
        assert_eq!(dpi_to_scale(72), 1.0);
        assert_eq!(dpi_to_scale(144), 2.0);
    }
}
