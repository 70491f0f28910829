//! Meeting Pack Library
//!
//! Builds a printable meeting pack from an agenda and its enclosures.
//! This library provides functionality to:
//! - Number agenda headings and items hierarchically (`2`, `2.1`, ...)
//! - Load a meeting description from YAML
//! - Stamp item reference marks and running page numbers onto PDFs
//! - Merge the agenda and every enclosure into one bookmarked PDF
//!
//! # Example
//!
//! ```no_run
//! use meeting_pack::config::{self, FileLocator};
//! use meeting_pack::pack::PackAssembler;
//! use std::path::Path;
//!
//! let config_path = Path::new("meeting.yaml");
//! let agenda = config::load(config_path).expect("Failed to load meeting");
//! let locator = FileLocator::new(config_path);
//!
//! let pack = PackAssembler::new(&agenda, "agenda-final.pdf", locator.clone())
//!     .build()
//!     .expect("Failed to build pack");
//! pack.save(&locator.find("meeting-pack.pdf")).expect("Failed to save pack");
//! ```

pub mod agenda;
pub mod config;
pub mod error;
pub mod pack;
pub mod pdf;

// Re-export commonly used items
pub use agenda::{Agenda, AgendaEntry, Enclosure, EntryKind, ItemNumber};
pub use error::{Error, Result, Step};
pub use pack::{MeetingPack, PackAssembler};
