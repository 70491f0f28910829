//! Stamp overlays: page numbers and item reference marks
//!
//! A stamp is drawn as a transparent text overlay sized to the first page of
//! the document being stamped. The overlay has one or more pages, and a
//! [`StampMode`] decides which overlay page lands on which target page.
//! Each stamped page gets the overlay as a Form XObject drawn on top of its
//! original content.

use std::fmt;
use std::str::FromStr;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pdf::page::{
    add_xobject_to_page_resources, append_content_to_page, isolate_page_content, page_size, PageSize,
};
use crate::pdf::text::{add_helvetica_font, encode_win_ansi, escape_pdf_string, text_width, Align, Color, STAMP_FONT};

/// Page correspondence policy between overlay pages and target pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampMode {
    /// Overlay page 0 onto target page 0 only
    First,
    /// Overlay page 0 onto every target page
    Repeat,
    /// Overlay page i onto target page i; page counts must be equal
    Match,
}

impl StampMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StampMode::First => "first",
            StampMode::Repeat => "repeat",
            StampMode::Match => "match",
        }
    }

    /// Pair target pages with overlay pages as `(target, overlay)` indices
    ///
    /// Fails before anything is merged if the pairing cannot be completed.
    pub fn correspondence(self, overlay_pages: usize, target_pages: usize) -> Result<Vec<(usize, usize)>> {
        let mismatch = || Error::PageCountMismatch {
            mode: self,
            overlay: overlay_pages,
            target: target_pages,
        };

        match self {
            StampMode::First | StampMode::Repeat if overlay_pages == 0 => Err(mismatch()),
            StampMode::First => Ok(if target_pages > 0 { vec![(0, 0)] } else { Vec::new() }),
            StampMode::Repeat => Ok((0..target_pages).map(|i| (i, 0)).collect()),
            StampMode::Match if overlay_pages != target_pages => Err(mismatch()),
            StampMode::Match => Ok((0..target_pages).map(|i| (i, i)).collect()),
        }
    }
}

impl fmt::Display for StampMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StampMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(StampMode::First),
            "repeat" => Ok(StampMode::Repeat),
            "match" => Ok(StampMode::Match),
            _ => Err(Error::InvalidStampMode(s.to_string())),
        }
    }
}

/// Where a stamp is drawn, in points
///
/// Positive coordinates are measured from the bottom-left corner of the page,
/// negative ones from the top-right corner, so one anchor works for any page
/// size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Absolute position on a page of the given size
    pub fn resolve(&self, size: &PageSize) -> (f32, f32) {
        let x = if self.x < 0.0 { size.width + self.x } else { self.x };
        let y = if self.y < 0.0 { size.height + self.y } else { self.y };
        (size.x0 + x, size.y0 + y)
    }
}

/// Font and placement shared by all stampers
#[derive(Debug, Clone, PartialEq)]
pub struct StampStyle {
    pub font_size: f32,
    pub color: Color,
    pub anchor: Anchor,
    pub align: Align,
    pub mode: StampMode,
}

/// One line of text placed on an overlay page
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Anchor point; the text is aligned relative to it
    pub x: f32,
    pub y: f32,
    pub align: Align,
    pub font_size: f32,
    pub color: Color,
}

impl TextRun {
    fn start_x(&self) -> f32 {
        let width = text_width(&self.text, self.font_size);
        match self.align {
            Align::Left => self.x,
            Align::Center => self.x - width / 2.0,
            Align::Right => self.x - width,
        }
    }

    fn write_operators(&self, content: &mut Vec<u8>) {
        let Color { r, g, b } = self.color;
        content.extend_from_slice(format!("{} {} {} rg\n", r, g, b).as_bytes());
        content.extend_from_slice(b"BT\n");
        content.extend_from_slice(format!("/{} {} Tf\n", STAMP_FONT, self.font_size).as_bytes());
        content.extend_from_slice(format!("1 0 0 1 {} {} Tm\n", self.start_x(), self.y).as_bytes());
        content.push(b'(');
        content.extend(escape_pdf_string(&encode_win_ansi(&self.text)));
        content.extend_from_slice(b") Tj\n");
        content.extend_from_slice(b"ET\n");
    }
}

/// One page of a stamp overlay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPage {
    pub runs: Vec<TextRun>,
}

impl OverlayPage {
    /// PDF content stream operators drawing this page's text
    pub fn content(&self) -> Vec<u8> {
        let mut content = Vec::new();
        for run in &self.runs {
            run.write_operators(&mut content);
        }
        content
    }
}

/// A transparent text layer sized to the target's first page
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub size: PageSize,
    pub pages: Vec<OverlayPage>,
}

/// Something that knows what to draw on a document's pages
pub trait Stamper {
    fn style(&self) -> &StampStyle;

    /// Draw the overlay pages for a target of `page_count` pages
    fn draw(&self, size: &PageSize, page_count: usize) -> Vec<OverlayPage>;

    /// Build the overlay for a target document
    fn overlay(&self, target: &Document) -> Result<Overlay> {
        let pages = target.get_pages();
        let first_page = pages
            .values()
            .next()
            .ok_or_else(|| Error::EmptyPdf("stamp target".to_string()))?;
        let size = page_size(target, *first_page)?;
        Ok(Overlay {
            size,
            pages: self.draw(&size, pages.len()),
        })
    }

    /// Stamp a copy of the target document; the target is left untouched
    fn stamp(&self, target: &Document) -> Result<Document> {
        let overlay = self.overlay(target)?;
        apply_overlay(target, &overlay, self.style().mode)
    }
}

/// Running page numbers, continuing from a caller-supplied start
#[derive(Debug, Clone)]
pub struct PageNumberStamper {
    pub start: u32,
    pub style: StampStyle,
}

impl PageNumberStamper {
    pub fn new(start: u32) -> Self {
        Self {
            start,
            style: StampStyle {
                font_size: 9.0,
                color: Color::RED,
                anchor: Anchor::new(292.0, 40.0),
                align: Align::Center,
                mode: StampMode::Match,
            },
        }
    }
}

impl Stamper for PageNumberStamper {
    fn style(&self) -> &StampStyle {
        &self.style
    }

    fn draw(&self, size: &PageSize, page_count: usize) -> Vec<OverlayPage> {
        let (x, y) = self.style.anchor.resolve(size);
        (0..page_count)
            .map(|i| OverlayPage {
                runs: vec![TextRun {
                    text: (self.start as usize + i).to_string(),
                    x,
                    y,
                    align: self.style.align,
                    font_size: self.style.font_size,
                    color: self.style.color,
                }],
            })
            .collect()
    }
}

/// Agenda item number marked near the top-right of a cover's first page
#[derive(Debug, Clone)]
pub struct ItemReferenceStamper {
    pub reference: String,
    pub style: StampStyle,
}

impl ItemReferenceStamper {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            style: StampStyle {
                font_size: 9.0,
                color: Color::BLACK,
                anchor: Anchor::new(297.5, -90.5),
                align: Align::Right,
                mode: StampMode::First,
            },
        }
    }
}

impl Stamper for ItemReferenceStamper {
    fn style(&self) -> &StampStyle {
        &self.style
    }

    fn draw(&self, size: &PageSize, _page_count: usize) -> Vec<OverlayPage> {
        let (x, y) = self.style.anchor.resolve(size);
        vec![OverlayPage {
            runs: vec![TextRun {
                text: self.reference.clone(),
                x,
                y,
                align: self.style.align,
                font_size: self.style.font_size,
                color: self.style.color,
            }],
        }]
    }
}

/// Merge overlay pages onto a copy of the target according to `mode`
///
/// The page pairing is validated before any page is modified, so a failed
/// call never yields a partially stamped document.
pub fn apply_overlay(target: &Document, overlay: &Overlay, mode: StampMode) -> Result<Document> {
    let page_ids: Vec<ObjectId> = target.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::EmptyPdf("stamp target".to_string()));
    }

    let pairs = mode.correspondence(overlay.pages.len(), page_ids.len())?;

    let mut doc = target.clone();
    let font_id = add_helvetica_font(&mut doc);

    for (target_index, overlay_index) in pairs {
        let page_id = page_ids[target_index];
        debug!(page = target_index, overlay = overlay_index, %mode, "stamping page");

        let content = overlay.pages[overlay_index].content();
        let xobject_id = create_form_xobject(&mut doc, content, font_id, &overlay.size);

        // Unique per XObject, so stamps from earlier passes stay registered
        let name = format!("PackStamp{}", xobject_id.0);

        isolate_page_content(&mut doc, page_id)?;
        add_xobject_to_page_resources(&mut doc, page_id, &name, xobject_id)?;

        let invoke_content = format!("q\n/{} Do\nQ\n", name);
        let content_stream_id = doc.add_object(Stream::new(Dictionary::new(), invoke_content.into_bytes()));
        append_content_to_page(&mut doc, page_id, content_stream_id)?;
    }

    Ok(doc)
}

/// Create a Form XObject holding one overlay page
fn create_form_xobject(doc: &mut Document, content: Vec<u8>, font_id: ObjectId, size: &PageSize) -> ObjectId {
    let mut fonts = Dictionary::new();
    fonts.set(STAMP_FONT, Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set("BBox", Object::Array(size.to_rect()));
    xobject_dict.set("Resources", Object::Dictionary(resources));

    doc.add_object(Stream::new(xobject_dict, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("first".parse::<StampMode>().unwrap(), StampMode::First);
        assert_eq!("Repeat".parse::<StampMode>().unwrap(), StampMode::Repeat);
        assert_eq!(" match ".parse::<StampMode>().unwrap(), StampMode::Match);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = "every".parse::<StampMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidStampMode(ref m) if m == "every"));
        assert_eq!(err.to_string(), "Unknown stamping mode 'every'");
    }

    #[test]
    fn test_correspondence_first() {
        assert_eq!(StampMode::First.correspondence(1, 4).unwrap(), vec![(0, 0)]);
        assert_eq!(StampMode::First.correspondence(3, 4).unwrap(), vec![(0, 0)]);
        assert!(StampMode::First.correspondence(0, 4).is_err());
    }

    #[test]
    fn test_correspondence_repeat() {
        assert_eq!(
            StampMode::Repeat.correspondence(1, 3).unwrap(),
            vec![(0, 0), (1, 0), (2, 0)]
        );
    }

    #[test]
    fn test_correspondence_match() {
        assert_eq!(
            StampMode::Match.correspondence(3, 3).unwrap(),
            vec![(0, 0), (1, 1), (2, 2)]
        );
    }

    #[test]
    fn test_correspondence_match_rejects_any_mismatch() {
        for (overlay, target) in [(2, 3), (4, 3)] {
            let err = StampMode::Match.correspondence(overlay, target).unwrap_err();
            assert!(matches!(
                err,
                Error::PageCountMismatch { mode: StampMode::Match, overlay: o, target: t }
                    if o == overlay && t == target
            ));
        }
    }

    #[test]
    fn test_anchor_resolution() {
        let a4 = PageSize::a4();
        assert_eq!(Anchor::new(292.0, 40.0).resolve(&a4), (292.0, 40.0));
        assert_eq!(Anchor::new(297.5, -90.5).resolve(&a4), (297.5, 751.5));
        assert_eq!(Anchor::new(-50.0, -50.0).resolve(&PageSize::letter()), (562.0, 742.0));

        let shifted = PageSize { x0: 10.0, y0: 20.0, width: 100.0, height: 200.0 };
        assert_eq!(Anchor::new(-10.0, 5.0).resolve(&shifted), (100.0, 25.0));
    }

    #[test]
    fn test_page_number_overlay() {
        let stamper = PageNumberStamper::new(7);
        let pages = stamper.draw(&PageSize::a4(), 3);
        let labels: Vec<&str> = pages.iter().map(|p| p.runs[0].text.as_str()).collect();
        assert_eq!(labels, vec!["7", "8", "9"]);
        assert_eq!(pages[0].runs[0].align, Align::Center);
        assert_eq!(stamper.style().mode, StampMode::Match);
    }

    #[test]
    fn test_item_reference_overlay() {
        let stamper = ItemReferenceStamper::new("2.1");
        let pages = stamper.draw(&PageSize::a4(), 5);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].runs[0].text, "2.1");
        assert_eq!((pages[0].runs[0].x, pages[0].runs[0].y), (297.5, 751.5));
        assert_eq!(stamper.style().mode, StampMode::First);
    }

    #[test]
    fn test_text_run_alignment() {
        let run = TextRun {
            text: "10".to_string(),
            x: 100.0,
            y: 40.0,
            align: Align::Center,
            font_size: 10.0,
            color: Color::RED,
        };
        // "10" is 11.12pt wide at 10pt
        assert!((run.start_x() - 94.44).abs() < 0.001);

        let right = TextRun { align: Align::Right, ..run.clone() };
        assert!((right.start_x() - 88.88).abs() < 0.001);
    }

    #[test]
    fn test_overlay_content_operators() {
        let page = OverlayPage {
            runs: vec![TextRun {
                text: "(3)".to_string(),
                x: 50.0,
                y: 40.0,
                align: Align::Left,
                font_size: 9.0,
                color: Color::RED,
            }],
        };
        let content = String::from_utf8(page.content()).unwrap();
        assert!(content.contains("1 0 0 rg"));
        assert!(content.contains("/F1 9 Tf"));
        assert!(content.contains("1 0 0 1 50 40 Tm"));
        assert!(content.contains("(\\(3\\)) Tj"));
    }
}
