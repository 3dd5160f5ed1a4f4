// boxpeek - draw converted-document layout boxes over PDF pages
pub mod config;
pub mod conversion;
pub mod overlay;
pub mod pdf_info;
pub mod pipeline;
pub mod rasterizer;
pub mod report;
pub mod theme;
pub mod types;

pub use config::RenderConfig;
pub use conversion::{CommandSource, DocumentSource, ResultsDirSource};
pub use overlay::{render, BaseImage};
pub use rasterizer::{PageRasterizer, PdftoppmRasterizer};
pub use types::{BoundingBox, BoxCategory, BoxpeekError, Document, DocumentPage, Page, Result};
