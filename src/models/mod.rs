//! Data models for the parity pipeline.

mod content;
mod diff;
mod fix;
mod url_entry;

pub use content::ExtractedContent;
pub use diff::{
    ChangeKind, ChangeNote, DiffInputs, DiffReport, DiffSummary, InputDigest, TypeCounts,
    REPORT_SCHEMA_VERSION,
};
pub use fix::{
    FixAction, FixActionKind, FixCounts, FixReport, FixRule, RedirectMapping, RedirectStatus,
};
pub use url_entry::{ContentType, UrlEntry};
