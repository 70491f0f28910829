//! Meeting configuration loading and path resolution
//!
//! A meeting file is a YAML sequence. Each element is one of:
//!
//! ```yaml
//! - metadata:
//!     agenda_final: agenda-final.pdf
//!     meeting_pack: meeting-pack.pdf
//! - heading: Business
//! - item: Consultation report
//!   who: ABC
//!   cover: consultation-cover.pdf
//!   pages:
//!     - consultation report.pdf
//!   starred: true
//!   action: Approve
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::agenda::{Agenda, AgendaEntry, DEFAULT_ACTION};
use crate::error::{Error, Result};

/// Metadata key naming the finished agenda PDF
pub const AGENDA_FINAL_KEY: &str = "agenda_final";
/// Metadata key naming the output pack
pub const MEETING_PACK_KEY: &str = "meeting_pack";

#[derive(Debug, Deserialize)]
struct ItemPart {
    item: String,
    who: Option<String>,
    cover: Option<PathBuf>,
    pages: Option<Vec<PathBuf>>,
    #[serde(default)]
    starred: bool,
    action: Option<String>,
}

/// Resolves paths relative to the directory holding the meeting file
#[derive(Debug, Clone)]
pub struct FileLocator {
    base: PathBuf,
}

impl FileLocator {
    pub fn new(config_path: &Path) -> Self {
        Self {
            base: config_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    /// Locator for paths that are already relative to the working directory
    pub fn current_dir() -> Self {
        Self { base: PathBuf::new() }
    }

    pub fn find(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

/// Load a meeting file from disk
pub fn load(path: &Path) -> Result<Agenda> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parse the YAML text of a meeting file
pub fn parse(text: &str) -> Result<Agenda> {
    let parts: Vec<Value> = serde_yaml::from_str(text)?;

    let mut entries = Vec::new();
    let mut metadata = BTreeMap::new();

    for part in parts {
        if let Some(title) = part.get("heading") {
            entries.push(AgendaEntry::heading(scalar_to_string(title)?));
        } else if part.get("item").is_some() {
            let item: ItemPart = serde_yaml::from_value(part)?;
            if item.cover.is_none() && item.pages.as_ref().is_some_and(|pages| !pages.is_empty()) {
                warn!(item = %item.item, "item has pages but no cover; its pages are left out of the pack");
            }
            let mut entry = AgendaEntry::item(item.item)
                .with_who(item.who.unwrap_or_default())
                .with_pages(item.pages.unwrap_or_default())
                .with_starred(item.starred)
                .with_action(item.action.unwrap_or_else(|| DEFAULT_ACTION.to_string()));
            if let Some(cover) = item.cover {
                entry = entry.with_cover(cover);
            }
            entries.push(entry);
        } else if let Some(values) = part.get("metadata") {
            let values: BTreeMap<String, Value> = serde_yaml::from_value(values.clone())?;
            for (key, value) in values {
                metadata.insert(key, scalar_to_string(&value)?);
            }
        } else {
            let shown = serde_yaml::to_string(&part).unwrap_or_default();
            return Err(Error::Config(format!(
                "Don't know how to understand this part: {}",
                shown.trim()
            )));
        }
    }

    debug!(entries = entries.len(), metadata = metadata.len(), "loaded meeting configuration");

    let mut agenda = Agenda::new(entries);
    agenda.metadata = metadata;
    Ok(agenda)
}

/// Look up a required metadata value
pub fn require<'a>(agenda: &'a Agenda, key: &str) -> Result<&'a str> {
    agenda
        .metadata
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::MissingMetadata(key.to_string()))
}

fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(Error::Config(format!("Expected a plain value, found {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::EntryKind;

    const MEETING: &str = r#"
- metadata:
    agenda_template: agenda-template.docx
    agenda_draft: agenda-draft.docx
    agenda_final: agenda-final.pdf
    meeting_pack: meeting-pack.pdf
    location: Null Island
    year: 2026
- heading: Procedural matters
- item: Apologies
- item: Minutes of the previous meeting
  action: Approve
- heading: Reports
- item: Chair's report
  who: Chair
- heading: Business
- item: Consultation report on design
  who: ABC
  cover: consultation-cover.pdf
  pages:
    - consultation report.pdf
    - consultation report appendices.pdf
- item: Future consultation
  cover: consultation-future-cover.pdf
  starred: true
- item: Business without notice
  pages: ~
"#;

    #[test]
    fn test_parse_meeting() {
        let agenda = parse(MEETING).unwrap();
        let entries = agenda.entries();
        assert_eq!(entries.len(), 9);

        assert!(entries[0].is_heading());
        assert_eq!(entries[0].title, "Procedural matters");
        assert_eq!(entries[4].title, "Chair's report");
        assert_eq!(entries[4].who(), Some("Chair"));
        assert_eq!(entries[2].action(), Some("Approve"));
        assert_eq!(entries[1].action(), Some(DEFAULT_ACTION));
        assert!(entries[7].starred());
        assert!(matches!(entries[8].kind, EntryKind::Item { .. }));
        assert!(entries[8].pages.is_empty());

        assert_eq!(agenda.metadata["location"], "Null Island");
        assert_eq!(agenda.metadata["year"], "2026");
    }

    #[test]
    fn test_parse_enclosures() {
        let agenda = parse(MEETING).unwrap();
        let mut enclosures = agenda.enclosures();

        let first = enclosures.next().unwrap();
        assert_eq!(first.number, "3.1");
        assert_eq!(first.title, "3.1 Consultation report on design");
        assert_eq!(first.cover, Path::new("consultation-cover.pdf"));
        assert_eq!(first.extras.len(), 2);
        assert_eq!(first.extras[0], PathBuf::from("consultation report.pdf"));

        let second = enclosures.next().unwrap();
        assert_eq!(second.number, "3.2");
        assert_eq!(second.cover, Path::new("consultation-future-cover.pdf"));
        assert!(second.extras.is_empty());

        assert!(enclosures.next().is_none());
    }

    #[test]
    fn test_unknown_part_is_rejected() {
        let err = parse("- heading: Business\n- break: 10 minutes\n").unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains("break")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_require_metadata() {
        let agenda = parse(MEETING).unwrap();
        assert_eq!(require(&agenda, AGENDA_FINAL_KEY).unwrap(), "agenda-final.pdf");
        assert!(matches!(
            require(&agenda, "missing"),
            Err(Error::MissingMetadata(ref key)) if key == "missing"
        ));
    }

    #[test]
    fn test_not_a_sequence() {
        assert!(matches!(parse("heading: Business"), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_locator_resolves_relative_to_config() {
        let locator = FileLocator::new(Path::new("/meetings/2026/meeting.yaml"));
        assert_eq!(locator.find("cover.pdf"), PathBuf::from("/meetings/2026/cover.pdf"));
        assert_eq!(locator.find("/tmp/cover.pdf"), PathBuf::from("/tmp/cover.pdf"));

        let bare = FileLocator::new(Path::new("meeting.yaml"));
        assert_eq!(bare.find("cover.pdf"), PathBuf::from("cover.pdf"));
    }
}
