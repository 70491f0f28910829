//! Concatenating stamped documents into one pack with a flat outline

use std::collections::BTreeMap;

use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::page::flatten_inherited_attributes;

/// Object types that belong to a source document's structure rather than its pages
const STRUCTURAL_TYPES: [&[u8]; 5] = [b"Catalog", b"Pages", b"Outlines", b"XRef", b"ObjStm"];

/// A bookmark pointing at the first page of an appended document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// Zero-based index of the page in the merged pack
    pub page_index: usize,
}

/// Accumulates documents in order and writes them out as one PDF
///
/// Object ids of each appended document are renumbered past everything
/// already collected.
#[derive(Debug)]
pub struct PackWriter {
    objects: BTreeMap<ObjectId, Object>,
    pages: Vec<ObjectId>,
    bookmarks: Vec<(String, ObjectId)>,
    next_id: u32,
    title: Option<String>,
}

impl Default for PackWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PackWriter {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            pages: Vec::new(),
            bookmarks: Vec::new(),
            next_id: 1,
            title: None,
        }
    }

    /// Set the document title written to the Info dictionary
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Total pages appended so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bookmarks recorded so far, in document order
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks
            .iter()
            .filter_map(|(title, page_id)| {
                let page_index = self.pages.iter().position(|id| id == page_id)?;
                Some(Bookmark {
                    title: title.clone(),
                    page_index,
                })
            })
            .collect()
    }

    /// Append all pages of a document, optionally bookmarking its first page
    ///
    /// Returns the number of pages appended.
    pub fn append(&mut self, mut doc: Document, bookmark: Option<&str>) -> Result<usize> {
        let source_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if source_pages.is_empty() {
            return Err(Error::EmptyPdf(bookmark.unwrap_or("appended document").to_string()));
        }

        for page_id in &source_pages {
            flatten_inherited_attributes(&mut doc, *page_id)?;
        }

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        if let Some(title) = bookmark {
            self.bookmarks.push((title.to_string(), page_ids[0]));
        }

        self.objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_structural(object)),
        );
        self.pages.extend(page_ids.iter().copied());

        debug!(pages = page_ids.len(), total = self.pages.len(), "appended document");
        Ok(page_ids.len())
    }

    /// Build the page tree, outline and catalog, and serialise the pack
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(Error::EmptyPdf("meeting pack".to_string()));
        }

        let mut merged = Document::with_version("1.5");
        merged.objects.extend(self.objects);
        merged.max_id = self.next_id - 1;

        let pages_id = merged.new_object_id();

        // Update parent references for all pages
        for &page_id in &self.pages {
            if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let kids: Vec<Object> = self.pages.iter().map(|&id| Object::Reference(id)).collect();
        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.pages.len() as i64));
        pages_object.set("Kids", Object::Array(kids));
        merged.objects.insert(pages_id, Object::Dictionary(pages_object));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        if let Some(outlines_id) = build_outline(&mut merged, &self.bookmarks) {
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        }
        let catalog_id = merged.add_object(Object::Dictionary(catalog));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        let info_id = merged.add_object(Object::Dictionary(info_dictionary(self.title.as_deref())));
        merged.trailer.set("Info", Object::Reference(info_id));

        merged.compress();
        let mut bytes = Vec::new();
        merged.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn is_structural(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return false,
    };
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => STRUCTURAL_TYPES.contains(&name.as_slice()),
        _ => false,
    }
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with a BOM otherwise
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Write a flat outline with one entry per bookmark
fn build_outline(doc: &mut Document, bookmarks: &[(String, ObjectId)]) -> Option<ObjectId> {
    if bookmarks.is_empty() {
        return None;
    }

    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = bookmarks.iter().map(|_| doc.new_object_id()).collect();

    for (i, ((title, page_id), item_id)) in bookmarks.iter().zip(&item_ids).enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", text_string(title));
        item.set("Parent", Object::Reference(outlines_id));
        item.set(
            "Dest",
            Object::Array(vec![Object::Reference(*page_id), Object::Name(b"Fit".to_vec())]),
        );
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if let Some(next_id) = item_ids.get(i + 1) {
            item.set("Next", Object::Reference(*next_id));
        }
        doc.objects.insert(*item_id, Object::Dictionary(item));
    }

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name(b"Outlines".to_vec()));
    outlines.set("First", Object::Reference(item_ids[0]));
    outlines.set("Last", Object::Reference(item_ids[item_ids.len() - 1]));
    outlines.set("Count", Object::Integer(item_ids.len() as i64));
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    Some(outlines_id)
}

fn info_dictionary(title: Option<&str>) -> Dictionary {
    let mut info = Dictionary::new();
    if let Some(title) = title {
        info.set("Title", text_string(title));
    }
    info.set("Producer", text_string(concat!("meeting-pack ", env!("CARGO_PKG_VERSION"))));
    let created = Local::now().format("D:%Y%m%d%H%M%S").to_string();
    info.set("CreationDate", Object::String(created.into_bytes(), StringFormat::Literal));
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_string_encoding() {
        assert_eq!(
            text_string("Agenda"),
            Object::String(b"Agenda".to_vec(), StringFormat::Literal)
        );
        match text_string("Caf\u{e9}") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(bytes.len(), 2 + 4 * 2);
            }
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn test_structural_objects_are_recognised() {
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        assert!(is_structural(&Object::Dictionary(catalog)));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        assert!(!is_structural(&Object::Dictionary(page)));
        assert!(!is_structural(&Object::Integer(3)));
    }

    #[test]
    fn test_empty_writer_cannot_finish() {
        let result = PackWriter::new().finish();
        assert!(matches!(result, Err(Error::EmptyPdf(_))));
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let mut writer = PackWriter::new();
        let result = writer.append(Document::with_version("1.5"), Some("Agenda"));
        assert!(result.is_err());
        assert_eq!(writer.page_count(), 0);
        assert!(writer.bookmarks().is_empty());
    }
}
