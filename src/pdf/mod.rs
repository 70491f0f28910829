//! PDF manipulation module

pub mod merge;
pub mod metadata;
pub mod page;
pub mod stamp;
pub mod text;

// Re-export commonly used items
pub use merge::{Bookmark, PackWriter};
pub use metadata::{extract_metadata, load_pdf, load_pdf_bytes, PackMetadata};
pub use page::PageSize;
pub use stamp::{apply_overlay, ItemReferenceStamper, Overlay, PageNumberStamper, StampMode, Stamper};
