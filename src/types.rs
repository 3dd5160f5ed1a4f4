// Core types for boxpeek: pages, boxes, converted documents and errors
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::MAX_CANVAS_PIXELS;

/// Which detection layer a box came from
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxCategory {
    /// Layout grouping (paragraph, table, figure, ...)
    Cluster,
    /// Raw text cell from the PDF
    TextCell,
}

impl BoxCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxCategory::Cluster => "cluster",
            BoxCategory::TextCell => "text-cell",
        }
    }
}

/// Axis-aligned box in document units, origin at the top-left of the page.
///
/// Constructed through [`BoundingBox::new`], which normalizes swapped edges so
/// that `left <= right` and `top <= bottom` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    category: BoxCategory,
    label: Option<String>,
}

impl BoundingBox {
    pub fn new(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        category: BoxCategory,
        label: Option<String>,
    ) -> Result<Self> {
        if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
            return Err(BoxpeekError::InvalidBoundingBox(format!(
                "non-finite coordinates ({}, {}, {}, {})",
                left, top, right, bottom
            )));
        }

        // Inverted edges are swapped rather than rejected
        Ok(Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
            category,
            label,
        })
    }

    /// Build from PDF-style coordinates where y grows upwards from the page bottom.
    pub fn from_bottom_left(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        page_height: f32,
        category: BoxCategory,
        label: Option<String>,
    ) -> Result<Self> {
        Self::new(x0, page_height - y1, x1, page_height - y0, category, label)
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn category(&self) -> BoxCategory {
        self.category
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Pixel corners after scaling: `(x0, y0, x1, y1)`, inclusive.
    pub fn to_pixels(&self, scale: f32) -> (i64, i64, i64, i64) {
        (
            (self.left * scale).round() as i64,
            (self.top * scale).round() as i64,
            (self.right * scale).round() as i64,
            (self.bottom * scale).round() as i64,
        )
    }
}

/// Page geometry as reported by the conversion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Pixels per document unit once rasterized; `None` means 1.0
    #[serde(default)]
    pub scale: Option<f32>,
}

impl Page {
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self { index, width, height, scale: None }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale.unwrap_or(1.0)
    }

    /// Check dimensions and scale are positive and finite
    pub fn validate(&self) -> Result<()> {
        let scale = self.scale_factor();
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(BoxpeekError::InvalidGeometry {
                page: self.index,
                reason: format!("page size {}x{} must be positive", self.width, self.height),
            });
        }
        if !ok(scale) {
            return Err(BoxpeekError::InvalidGeometry {
                page: self.index,
                reason: format!("scale factor {} must be positive", scale),
            });
        }
        Ok(())
    }

    /// Canvas size in pixels: `ceil(size * scale)`
    pub fn pixel_size(&self) -> Result<(u32, u32)> {
        self.validate()?;
        let scale = self.scale_factor();
        let w = (self.width * scale).ceil();
        let h = (self.height * scale).ceil();
        if w > u32::MAX as f32 || h > u32::MAX as f32 || (w as u64) * (h as u64) > MAX_CANVAS_PIXELS {
            return Err(BoxpeekError::InvalidGeometry {
                page: self.index,
                reason: format!("canvas {}x{} is too large", w, h),
            });
        }
        Ok((w as u32, h as u32))
    }
}

/// One page of a converted document together with its detected boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub page: Page,
    pub clusters: Vec<BoundingBox>,
    pub cells: Vec<BoundingBox>,
}

impl DocumentPage {
    pub fn new(page: Page) -> Self {
        Self { page, clusters: Vec::new(), cells: Vec::new() }
    }

    /// Clusters first, then cells; the renderer draws in this order.
    pub fn all_boxes(&self) -> Vec<BoundingBox> {
        self.clusters.iter().chain(self.cells.iter()).cloned().collect()
    }
}

/// Converted document: pages ordered by index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub pages: Vec<DocumentPage>,
}

impl Document {
    pub fn page(&self, index: usize) -> Option<&DocumentPage> {
        self.pages.iter().find(|p| p.page.index == index)
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum BoxpeekError {
    #[error("Invalid geometry on page {page}: {reason}")]
    InvalidGeometry { page: usize, reason: String },

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("{tool} failed: {message}")]
    ExternalToolFailure { tool: String, message: String },

    #[error("Input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("No converted document for {name} in {}", dir.display())]
    DocumentNotFound { name: String, dir: PathBuf },

    #[error("Malformed conversion output: {0}")]
    Format(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl BoxpeekError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        BoxpeekError::ExternalToolFailure { tool: tool.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, BoxpeekError>;
