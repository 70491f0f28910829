//! Meeting pack assembly
//!
//! The pack is the agenda PDF followed by every enclosure in agenda order.
//! Each cover is marked with its item number, every page gets a running page
//! number, and the agenda plus each cover get a bookmark.

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::agenda::Agenda;
use crate::config::FileLocator;
use crate::error::{Error, Result, Step};
use crate::pdf::merge::{Bookmark, PackWriter};
use crate::pdf::metadata::load_pdf;
use crate::pdf::stamp::{ItemReferenceStamper, PageNumberStamper, Stamper};

/// Bookmark title of the agenda document
pub const AGENDA_BOOKMARK: &str = "Agenda";

/// Builds one meeting pack; consumed by [`PackAssembler::build`]
#[derive(Debug)]
pub struct PackAssembler<'a> {
    agenda: &'a Agenda,
    agenda_pdf: PathBuf,
    locator: FileLocator,
    agenda_bookmark: String,
    next_page: u32,
    writer: PackWriter,
}

/// A fully assembled pack, ready to be saved
#[derive(Debug, Clone)]
pub struct MeetingPack {
    bytes: Vec<u8>,
    page_count: usize,
    bookmarks: Vec<Bookmark>,
}

impl<'a> PackAssembler<'a> {
    /// Prepare a pack for `agenda`, whose listing has been rendered to `agenda_pdf`
    ///
    /// `agenda_pdf` and every attachment path are resolved through `locator`.
    pub fn new(agenda: &'a Agenda, agenda_pdf: impl Into<PathBuf>, locator: FileLocator) -> Self {
        let mut writer = PackWriter::new();
        if let Some(title) = agenda.metadata.get("title") {
            writer = writer.with_title(title.clone());
        }

        Self {
            agenda,
            agenda_pdf: agenda_pdf.into(),
            locator,
            agenda_bookmark: AGENDA_BOOKMARK.to_string(),
            next_page: 1,
            writer,
        }
    }

    /// Use a different bookmark title for the agenda document
    pub fn with_agenda_bookmark(mut self, title: impl Into<String>) -> Self {
        self.agenda_bookmark = title.into();
        self
    }

    /// Stamp and merge every document, in agenda order
    ///
    /// The first failing document aborts the build; nothing is returned
    /// for a partially assembled pack.
    pub fn build(mut self) -> Result<MeetingPack> {
        let agenda = self.agenda;

        let agenda_path = self.locator.find(&self.agenda_pdf);
        let bookmark = self.agenda_bookmark.clone();
        self.append_numbered(&agenda_path, Step::Agenda, Some(bookmark.as_str()), |doc| Ok(doc))?;

        for enclosure in agenda.enclosures() {
            info!(item = %enclosure.number, title = %enclosure.title, "adding enclosure");

            let cover_path = self.locator.find(enclosure.cover);
            let reference = ItemReferenceStamper::new(enclosure.number.as_str());
            self.append_numbered(&cover_path, Step::Cover, Some(enclosure.title.as_str()), |doc| {
                reference.stamp(&doc)
            })?;

            for extra in enclosure.extras {
                let extra_path = self.locator.find(extra);
                self.append_numbered(&extra_path, Step::Attachment, None, |doc| Ok(doc))?;
            }
        }

        debug_assert_eq!(self.next_page as usize - 1, self.writer.page_count());

        let page_count = self.writer.page_count();
        let bookmarks = self.writer.bookmarks();
        let bytes = self.writer.finish()?;

        info!(pages = page_count, bookmarks = bookmarks.len(), "meeting pack assembled");

        Ok(MeetingPack {
            bytes,
            page_count,
            bookmarks,
        })
    }

    /// Load one source, apply `prepare`, number its pages and merge it
    fn append_numbered<F>(&mut self, path: &Path, step: Step, bookmark: Option<&str>, prepare: F) -> Result<()>
    where
        F: FnOnce(Document) -> Result<Document>,
    {
        let pages = self
            .number_and_merge(path, bookmark, prepare)
            .map_err(|e| e.at(step, path))?;

        info!(
            file = %path.display(),
            bookmark = bookmark.unwrap_or("-"),
            first_page = self.next_page,
            pages,
            "merged file"
        );

        self.next_page += pages as u32;
        Ok(())
    }

    fn number_and_merge<F>(&mut self, path: &Path, bookmark: Option<&str>, prepare: F) -> Result<usize>
    where
        F: FnOnce(Document) -> Result<Document>,
    {
        let source = prepare(load_pdf(path)?)?;
        debug!(file = %path.display(), start = self.next_page, "numbering pages");
        let numbered = PageNumberStamper::new(self.next_page).stamp(&source)?;
        self.writer.append(numbered, bookmark)
    }
}

impl MeetingPack {
    /// The finished PDF
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Write the pack to `path`
    ///
    /// The bytes go to a temporary file next to `path` that is renamed into
    /// place once complete, so `path` never holds a partial pack.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let write = || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(&self.bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        };
        write().map_err(|e| e.at(Step::Save, path))?;

        info!(path = %path.display(), "saved meeting pack");
        Ok(())
    }
}
