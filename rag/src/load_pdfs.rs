use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RagError, Result};

/// Text of one PDF page, tagged with the file name and zero-based page index.
#[derive(Clone, Debug, PartialEq)]
pub struct PageText {
    pub source: String,
    pub page: u32,
    pub text: String,
}

/// Lists the `.pdf` files (any case) directly inside `dir`, sorted by name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RagError::Configuration(format!(
            "data directory '{}' not found; create it and place PDFs inside",
            dir.display()
        )));
    }

    let pdfs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    if pdfs.is_empty() {
        return Err(RagError::NoDocuments(dir.to_path_buf()));
    }
    Ok(pdfs)
}

pub fn load_pdf(path: &Path) -> Result<Vec<PageText>> {
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let doc = Document::load(path).map_err(|e| RagError::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut pages = Vec::new();
    // lopdf numbers pages from 1; citations use zero-based indices.
    for page_number in doc.get_pages().keys().copied() {
        let text = doc
            .extract_text(&[page_number])
            .map_err(|e| RagError::Document {
                path: path.to_path_buf(),
                message: format!("page {}: {}", page_number, e),
            })?;
        debug!(source = %source, page = page_number - 1, chars = text.len(), "loaded page");
        pages.push(PageText {
            source: source.clone(),
            page: page_number - 1,
            text,
        });
    }
    Ok(pages)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_pdfs_case_insensitively_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.PDF"), b"x").unwrap();
        fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = discover_pdfs(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn corrupt_pdf_reports_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"definitely not a pdf").unwrap();

        let err = load_pdf(&path).expect_err("garbage should not parse");
        assert!(matches!(err, RagError::Document { .. }));
    }
}
