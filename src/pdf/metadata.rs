//! Loading source PDFs and reading back what a pack contains

use std::path::Path;
use lopdf::{Document, Object, ObjectId};
use tracing::warn;
use crate::error::{Error, Result};
use crate::pdf::merge::Bookmark;

/// Load a PDF that must exist and have at least one page
pub fn load_pdf(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(path.display().to_string()));
    }

    Ok(doc)
}

/// Load a PDF from memory with the same checks as [`load_pdf`]
pub fn load_pdf_bytes(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf("in-memory document".to_string()));
    }
    Ok(doc)
}

/// What a built pack contains
#[derive(Debug, Clone)]
pub struct PackMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Top-level outline entries in order
    pub bookmarks: Vec<Bookmark>,
}

/// Read page count, title and bookmarks from a document
pub fn extract_metadata(doc: &Document) -> Result<PackMetadata> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut title = None;
    if let Ok(Object::Reference(info_id)) = doc.trailer.get(b"Info") {
        if let Ok(Object::Dictionary(info_dict)) = doc.get_object(*info_id) {
            if let Ok(Object::String(bytes, _)) = info_dict.get(b"Title") {
                title = Some(decode_text_string(bytes));
            }
        }
    }

    Ok(PackMetadata {
        page_count: pages.len(),
        title,
        bookmarks: read_bookmarks(doc, &pages)?,
    })
}

/// Read the top level of the document outline
fn read_bookmarks(doc: &Document, pages: &[ObjectId]) -> Result<Vec<Bookmark>> {
    let catalog = doc.catalog()?;
    let outlines = match catalog.get(b"Outlines") {
        Ok(Object::Reference(id)) => doc.get_object(*id)?.as_dict()?,
        _ => return Ok(Vec::new()),
    };

    let mut bookmarks = Vec::new();
    let mut next = outlines.get(b"First").and_then(Object::as_reference).ok();

    while let Some(item_id) = next {
        // Guard against cyclic Next chains
        if bookmarks.len() > pages.len() + 1024 {
            break;
        }

        let item = doc.get_object(item_id)?.as_dict()?;
        let title = match item.get(b"Title") {
            Ok(Object::String(bytes, _)) => decode_text_string(bytes),
            _ => String::new(),
        };
        let target = match item.get(b"Dest") {
            Ok(Object::Array(dest)) => dest.first().and_then(|o| o.as_reference().ok()),
            _ => None,
        };
        match target.and_then(|id| pages.iter().position(|p| *p == id)) {
            Some(page_index) => bookmarks.push(Bookmark { title, page_index }),
            None => warn!(%title, "skipping bookmark without a page destination"),
        }

        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }

    Ok(bookmarks)
}

/// Decode a PDF text string (UTF-16BE with BOM, or single-byte)
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}
