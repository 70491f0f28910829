//! Page-level helpers shared by stamping and merging

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};

/// Page attributes that a page may inherit from its ancestors in the page tree
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Page geometry in points, taken from a page's MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Lower-left x of the MediaBox
    pub x0: f32,
    /// Lower-left y of the MediaBox
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// A4 portrait (595 × 842 pt)
    pub fn a4() -> Self {
        Self::new(595.0, 842.0)
    }

    /// US Letter portrait (612 × 792 pt)
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn new(width: f32, height: f32) -> Self {
        Self { x0: 0.0, y0: 0.0, width, height }
    }

    /// The page rectangle as a PDF array
    pub fn to_rect(&self) -> Vec<Object> {
        vec![
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x0 + self.width),
            Object::Real(self.y0 + self.height),
        ]
    }
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Follow a reference to the object it points at
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the page tree if the page lacks it
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut node_id = page_id;

    // Depth guard against cyclic Parent chains in damaged files
    for _ in 0..64 {
        let node = doc.get_object(node_id)?.as_dict()?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(resolve(doc, value)?.clone()));
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Read the MediaBox of a page
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<PageSize> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?.ok_or(Error::MissingMediaBox)?;
    let corners: Vec<f32> = match media_box {
        Object::Array(values) => values
            .iter()
            .map(|v| resolve(doc, v).ok().and_then(as_number))
            .collect::<Option<Vec<f32>>>()
            .ok_or(Error::MissingMediaBox)?,
        _ => return Err(Error::MissingMediaBox),
    };

    match corners.as_slice() {
        [llx, lly, urx, ury] => {
            let (x0, x1) = (llx.min(*urx), llx.max(*urx));
            let (y0, y1) = (lly.min(*ury), lly.max(*ury));
            Ok(PageSize { x0, y0, width: x1 - x0, height: y1 - y0 })
        }
        _ => Err(Error::MissingMediaBox),
    }
}

/// Copy inherited attributes onto the page itself
///
/// A page keeps its geometry and resources when it is moved under a new
/// parent in the merged page tree.
pub fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = doc.get_object(page_id)?.as_dict()?;
        for key in INHERITABLE_ATTRIBUTES {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, page_id, key)? {
                    inherited.push((key.to_vec(), value));
                }
            }
        }
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

/// Content stream references of a page
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            // Contents may point at an array of streams rather than a stream
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };
    Ok(refs)
}

fn set_contents(doc: &mut Document, page_id: ObjectId, contents: Vec<Object>) -> Result<()> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Wrap the page's existing content in q/Q
///
/// Any transformation left active by the original content is undone before
/// content appended afterwards is drawn.
pub fn isolate_page_content(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let existing = content_refs(doc, page_id)?;
    if existing.is_empty() {
        return Ok(());
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    set_contents(doc, page_id, contents)
}

/// Append a content stream to a page's Contents
///
/// Appended content is drawn on top of the original page.
pub fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = content_refs(doc, page_id)?;
    contents.push(Object::Reference(new_content_id));
    set_contents(doc, page_id, contents)
}

/// Register a Form XObject in the page's own Resources dictionary
///
/// Inherited or indirect Resources are copied onto the page first so that
/// sibling pages sharing them are left alone.
pub fn add_xobject_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<()> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(xobject) => match resolve(doc, xobject)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };

    xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Two pages sharing a MediaBox and Resources on their parent node
    fn inherited_doc() -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });

        let mut page_ids = Vec::new();
        for _ in 0..2 {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            }));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => 2,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        (doc, page_ids)
    }

    #[test]
    fn test_page_size_inherited() {
        let (doc, pages) = inherited_doc();
        let size = page_size(&doc, pages[0]).unwrap();
        assert_eq!(size, PageSize::a4());
    }

    #[test]
    fn test_flatten_copies_parent_attributes() {
        let (mut doc, pages) = inherited_doc();
        flatten_inherited_attributes(&mut doc, pages[1]).unwrap();

        let page = doc.get_object(pages[1]).unwrap().as_dict().unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(!page.has(b"Rotate"));
    }

    #[test]
    fn test_xobject_keeps_inherited_fonts() {
        let (mut doc, pages) = inherited_doc();
        let xobject_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        add_xobject_to_page_resources(&mut doc, pages[0], "Stamp1", xobject_id).unwrap();

        let page = doc.get_object(pages[0]).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
        assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"Stamp1"));

        // The sibling page still only inherits
        let sibling = doc.get_object(pages[1]).unwrap().as_dict().unwrap();
        assert!(!sibling.has(b"Resources"));
    }

    #[test]
    fn test_isolate_then_append() {
        let (mut doc, pages) = inherited_doc();
        isolate_page_content(&mut doc, pages[0]).unwrap();
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), b"/Stamp1 Do".to_vec()));
        append_content_to_page(&mut doc, pages[0], stamp_id).unwrap();

        let contents = content_refs(&doc, pages[0]).unwrap();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[3], Object::Reference(stamp_id));

        let content = doc.get_page_content(pages[0]).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.starts_with("q"));
        assert!(text.trim_end().ends_with("/Stamp1 Do"));
    }

    #[test]
    fn test_missing_media_box() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert!(matches!(page_size(&doc, page_id), Err(Error::MissingMediaBox)));
    }
}
