//! Agenda model: hierarchical item numbers, headings and items
//!
//! The agenda is an ordered list of entries. Headings open a new section and
//! items are numbered within the current section. Numbers are recomputed over
//! the whole list every time the list changes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default separator between the parts of an item number
pub const DEFAULT_SEPARATOR: &str = ".";

/// Default action label for agenda items
pub const DEFAULT_ACTION: &str = "Note";

/// Hierarchical item number such as `3`, `3.1` or `3.1.2`
///
/// A missing or zero part hides every less significant part, so a number
/// never renders as `3..2` or `3.0.2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNumber {
    pub a: u32,
    pub b: Option<u32>,
    pub c: Option<u32>,
    separator: String,
}

impl ItemNumber {
    /// Create a single-part number
    pub fn new(a: u32) -> Self {
        Self::with_parts(a, None, None)
    }

    /// Create a number from all three parts
    pub fn with_parts(a: u32, b: Option<u32>, c: Option<u32>) -> Self {
        Self {
            a,
            b,
            c,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Use a different separator when rendering
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Parse a rendered number such as `"2.1"` back into its parts
    pub fn parse(text: &str, separator: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() || separator.is_empty() {
            return Err(Error::InvalidItemNumber(text.to_string()));
        }

        let parts = text
            .split(separator)
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<u32>, _>>()
            .map_err(|_| Error::InvalidItemNumber(text.to_string()))?;

        let number = match parts.as_slice() {
            [a] => Self::with_parts(*a, None, None),
            [a, b] => Self::with_parts(*a, Some(*b), None),
            [a, b, c] => Self::with_parts(*a, Some(*b), Some(*c)),
            _ => return Err(Error::InvalidItemNumber(text.to_string())),
        };

        Ok(number.with_separator(separator))
    }
}

impl Default for ItemNumber {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for ItemNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = &self.separator;
        match (self.b.filter(|&b| b != 0), self.c.filter(|&c| c != 0)) {
            (None, _) => write!(f, "{}", self.a),
            (Some(b), None) => write!(f, "{}{}{}", self.a, sep, b),
            (Some(b), Some(c)) => write!(f, "{}{}{}{}{}", self.a, sep, b, sep, c),
        }
    }
}

/// Variant-specific part of an agenda entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Section heading; opens a new section
    Heading,
    /// Agenda item within the current section
    Item {
        /// Person responsible for the item
        who: String,
        /// Highlighted in the agenda listing
        starred: bool,
        /// What the meeting is asked to do (e.g. "Note", "Approve")
        action: String,
    },
}

/// One line of the agenda
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaEntry {
    pub title: String,
    /// Cover document; only entries with a cover become enclosures
    pub cover: Option<PathBuf>,
    /// Extra attachment files following the cover in the pack
    pub pages: Vec<PathBuf>,
    pub kind: EntryKind,
    number: ItemNumber,
}

impl AgendaEntry {
    /// Create a section heading
    pub fn heading(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cover: None,
            pages: Vec::new(),
            kind: EntryKind::Heading,
            number: ItemNumber::default(),
        }
    }

    /// Create an agenda item with the default action and nobody responsible
    pub fn item(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cover: None,
            pages: Vec::new(),
            kind: EntryKind::Item {
                who: String::new(),
                starred: false,
                action: DEFAULT_ACTION.to_string(),
            },
            number: ItemNumber::default(),
        }
    }

    pub fn with_cover(mut self, cover: impl Into<PathBuf>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_pages<I, P>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.pages = pages.into_iter().map(Into::into).collect();
        self
    }

    /// Set the responsible party (items only; ignored for headings)
    pub fn with_who(mut self, name: impl Into<String>) -> Self {
        if let EntryKind::Item { ref mut who, .. } = self.kind {
            *who = name.into();
        }
        self
    }

    /// Set the action label (items only; ignored for headings)
    pub fn with_action(mut self, label: impl Into<String>) -> Self {
        if let EntryKind::Item { ref mut action, .. } = self.kind {
            *action = label.into();
        }
        self
    }

    /// Mark the item as starred (items only; ignored for headings)
    pub fn with_starred(mut self, flag: bool) -> Self {
        if let EntryKind::Item { ref mut starred, .. } = self.kind {
            *starred = flag;
        }
        self
    }

    pub fn number(&self) -> &ItemNumber {
        &self.number
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, EntryKind::Heading)
    }

    pub fn who(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Item { who, .. } => Some(who),
            EntryKind::Heading => None,
        }
    }

    pub fn starred(&self) -> bool {
        matches!(self.kind, EntryKind::Item { starred: true, .. })
    }

    pub fn action(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Item { action, .. } => Some(action),
            EntryKind::Heading => None,
        }
    }
}

/// An entry's attachment set, in the order it goes into the pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure<'a> {
    /// Rendered item number, e.g. `"2.1"`
    pub number: String,
    /// Bookmark title: number followed by the entry title
    pub title: String,
    pub cover: &'a Path,
    pub extras: &'a [PathBuf],
}

/// Ordered list of agenda entries plus free-form metadata
#[derive(Debug, Clone, Default)]
pub struct Agenda {
    entries: Vec<AgendaEntry>,
    pub metadata: BTreeMap<String, String>,
}

impl Agenda {
    pub fn new(entries: Vec<AgendaEntry>) -> Self {
        let mut agenda = Self {
            entries,
            metadata: BTreeMap::new(),
        };
        agenda.number_entries();
        agenda
    }

    pub fn entries(&self) -> &[AgendaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: AgendaEntry) {
        self.entries.push(entry);
        self.number_entries();
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = AgendaEntry>) {
        self.entries.extend(entries);
        self.number_entries();
    }

    /// Renumber every entry from scratch
    fn number_entries(&mut self) {
        let mut section = 0;
        let mut subsection = 0;

        for entry in &mut self.entries {
            match entry.kind {
                EntryKind::Heading => {
                    section += 1;
                    subsection = 0;
                }
                EntryKind::Item { .. } => subsection += 1,
            }
            entry.number.a = section;
            entry.number.b = Some(subsection);
            entry.number.c = None;
        }
    }

    /// Entries that carry a cover document, in agenda order
    ///
    /// Each call starts a new pass over the entry list.
    pub fn enclosures(&self) -> impl Iterator<Item = Enclosure<'_>> + '_ {
        self.entries.iter().filter_map(|entry| {
            let cover = entry.cover.as_deref()?;
            let number = entry.number.to_string();
            Some(Enclosure {
                title: format!("{} {}", number, entry.title),
                number,
                cover,
                extras: &entry.pages,
            })
        })
    }
}

impl fmt::Display for Agenda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Agenda")?;
        writeln!(f)?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{:>5}: {:<50} [{}]",
                entry.number.to_string(),
                entry.title,
                entry.who().unwrap_or_default()
            )?;
        }
        Ok(())
    }
}
