// Document conversion: turning a PDF into pages of detected boxes
pub mod command;
pub mod deepsearch;
pub mod results;

use std::path::Path;

use crate::types::{Document, Result};

pub use command::CommandSource;
pub use deepsearch::parse_document;
pub use results::ResultsDirSource;

/// Anything that can produce a converted [`Document`] for a PDF
pub trait DocumentSource: Send + Sync {
    fn convert(&self, pdf_path: &Path) -> Result<Document>;
}
