// Lightweight PDF inspection with lopdf
use lopdf::Document;
use std::path::Path;

use crate::types::{BoxpeekError, Result};

/// Number of pages in the PDF
pub fn page_count(pdf_path: &Path) -> Result<usize> {
    let document = Document::load(pdf_path)
        .map_err(|e| BoxpeekError::Pdf(format!("{}: {}", pdf_path.display(), e)))?;
    Ok(document.get_pages().len())
}

/// 0-based indices from `indices` that do not exist in a PDF with `count` pages
pub fn out_of_range(indices: impl IntoIterator<Item = usize>, count: usize) -> Vec<usize> {
    indices.into_iter().filter(|&i| i >= count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range() {
        assert_eq!(out_of_range([0, 1, 2, 5], 3), vec![5]);
        assert!(out_of_range(Vec::new(), 0).is_empty());
    }

    #[test]
    fn test_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(page_count(&path), Err(BoxpeekError::Pdf(_))));
    }
}
