//! Diff report models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentType, UrlEntry};

/// Schema version written into every machine-readable artifact.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Snapshot of one diff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub inputs: DiffInputs,
    pub summary: DiffSummary,
    /// Production literals with no local literal and no matching local template.
    pub missing: Vec<UrlEntry>,
    /// Local literals with no production counterpart.
    pub extra: Vec<UrlEntry>,
    pub changed: Vec<ChangeNote>,
    pub by_type: BTreeMap<ContentType, TypeCounts>,
}

impl DiffReport {
    /// Check the count invariants: summary counts equal list lengths, per-type
    /// tallies sum to the totals and every production entry lands in one bucket.
    pub fn is_consistent(&self) -> bool {
        let s = &self.summary;
        let by_type_missing: usize = self.by_type.values().map(|c| c.missing).sum();
        let by_type_extra: usize = self.by_type.values().map(|c| c.extra).sum();

        s.missing_count == self.missing.len()
            && s.extra_count == self.extra.len()
            && s.changed_count == self.changed.len()
            && by_type_missing == s.missing_count
            && by_type_extra == s.extra_count
            && s.missing_count + s.matched_literal_count + s.matched_template_count
                == s.production_total
    }
}

/// Provenance of the inventories a report was computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<InputDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<InputDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigest {
    pub path: String,
    pub sha256: String,
    pub entries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Distinct production literals considered.
    pub production_total: usize,
    /// Distinct local literals plus declared templates.
    pub local_total: usize,
    pub missing_count: usize,
    pub extra_count: usize,
    pub changed_count: usize,
    pub matched_literal_count: usize,
    pub matched_template_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub missing: usize,
    pub extra: usize,
}

/// Kind of heuristic mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Production has entries of a watched type, local has no literal of it.
    ZeroLocalCoverage,
}

/// A count-based warning; never a per-URL rename guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNote {
    pub kind: ChangeKind,
    pub content_type: ContentType,
    pub production_count: usize,
    pub local_count: usize,
    /// Local templates declared for the type (they may still cover the URLs).
    pub local_templates: usize,
    pub message: String,
}

impl ChangeNote {
    pub fn zero_local_coverage(
        content_type: ContentType,
        production_count: usize,
        local_templates: usize,
    ) -> Self {
        let message = format!(
            "production has {} {} URLs, local has 0 literal {} URLs",
            production_count, content_type, content_type
        );
        Self {
            kind: ChangeKind::ZeroLocalCoverage,
            content_type,
            production_count,
            local_count: 0,
            local_templates,
            message,
        }
    }
}
