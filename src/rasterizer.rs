// Page rasterization through poppler's pdftoppm
use image::DynamicImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::config;
use crate::types::{BoxpeekError, Result};

/// Turns one PDF page into an image
pub trait PageRasterizer: Send + Sync {
    /// `page_index` is 0-based
    fn rasterize(&self, pdf_path: &Path, page_index: usize) -> Result<DynamicImage>;

    /// Pixels per PDF point in the images this rasterizer produces
    fn scale(&self) -> f32;
}

#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { program: config::pdftoppm_program(), dpi }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, page_index: usize) -> Result<DynamicImage> {
        // pdftoppm numbers pages from 1
        let page = (page_index + 1).to_string();
        let dpi = self.dpi.to_string();
        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");

        log::debug!("pdftoppm: page {} of {} at {} dpi", page, pdf_path.display(), self.dpi);
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", page.as_str(), "-l", page.as_str()])
            .arg("-cropbox")
            .args(["-r", dpi.as_str()])
            .arg(pdf_path)
            .arg(&output_prefix)
            .output()
            .map_err(|e| {
                let hint = if e.kind() == ErrorKind::NotFound {
                    " (install poppler-utils or set BOXPEEK_PDFTOPPM)"
                } else {
                    ""
                };
                BoxpeekError::tool(self.tool_name(), format!("could not start: {}{}", e, hint))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BoxpeekError::tool(
                self.tool_name(),
                format!(
                    "page {} of {} exited with {}: {}",
                    page_index,
                    pdf_path.display(),
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        // -singlefile writes <prefix>.png without a page suffix
        let png = output_prefix.with_extension("png");
        if !png.exists() {
            return Err(BoxpeekError::tool(
                self.tool_name(),
                format!("page {} of {}: no output at {}", page_index, pdf_path.display(), png.display()),
            ));
        }

        let image = image::open(&png)?;
        log::debug!("pdftoppm: page {} rendered at {}x{}", page_index, image.width(), image.height());
        Ok(image)
    }

    fn scale(&self) -> f32 {
        config::dpi_to_scale(self.dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_from_dpi() {
        assert_eq!(PdftoppmRasterizer::new(144).scale(), 2.0);
        assert_eq!(PdftoppmRasterizer::new(72).dpi(), 72);
    }

    #[test]
    fn test_missing_program() {
        let rasterizer = PdftoppmRasterizer::new(72).with_program("/nonexistent/pdftoppm");
        match rasterizer.rasterize(Path::new("x.pdf"), 0) {
            Err(BoxpeekError::ExternalToolFailure { message, .. }) => assert!(message.contains("could not start")),
            other => panic!("unexpected: {:?}", other.map(|i| i.width())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_page() {
        let rasterizer = PdftoppmRasterizer::new(72).with_program("false");
        match rasterizer.rasterize(Path::new("doc.pdf"), 4) {
            Err(BoxpeekError::ExternalToolFailure { message, .. }) => {
                assert!(message.contains("page 4"));
                assert!(message.contains("doc.pdf"));
            }
            other => panic!("unexpected: {:?}", other.map(|i| i.width())),
        }
    }
}
