//! PDF discovery and page-text extraction.

use crate::types::PageText;
use docchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find PDF files under `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn discover_pdfs(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        tracing::warn!("PDF directory does not exist: {:?}", dir);
        return Vec::new();
    }

    let mut pdfs: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
        .map(|e| e.into_path())
        .collect();

    pdfs.sort();
    pdfs
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Read every page of a PDF, skipping pages without text.
pub fn load_pdf_pages(path: &Path) -> AppResult<Vec<PageText>> {
    let document = lopdf::Document::load(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open PDF {:?}: {}", path, e)))?;

    let mut pages = Vec::new();

    for page_number in document.get_pages().into_keys() {
        let raw = document.extract_text(&[page_number]).map_err(|e| {
            AppError::Knowledge(format!(
                "Failed to extract text from {:?} page {}: {}",
                path, page_number, e
            ))
        })?;

        let text = normalize_page_text(&raw);
        if text.is_empty() {
            tracing::debug!("Skipping empty page {} of {:?}", page_number, path);
            continue;
        }

        pages.push(PageText {
            source: path.to_path_buf(),
            page: page_number,
            text,
        });
    }

    tracing::debug!("Read {} non-empty pages from {:?}", pages.len(), path);
    Ok(pages)
}

/// Collapse runs of spaces and blank lines left over from text extraction.
fn normalize_page_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;

    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        blank_run = 0;
    }

    out
}
