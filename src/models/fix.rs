//! Remediation models: actions, fix reports and redirect mappings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UrlEntry;

/// What to do about a URL missing from the local deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixActionKind {
    Recreate,
    Redirect,
    Noindex,
    Skip,
}

impl FixActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recreate => "recreate",
            Self::Redirect => "redirect",
            Self::Noindex => "noindex",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for FixActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision-table rule that produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixRule {
    IndexedContent,
    ObsoleteRedirect,
    ImportantPage,
    StaticDefault,
    DataBacked,
    Noindex,
    Unclassified,
}

impl FixRule {
    pub fn action(&self) -> FixActionKind {
        match self {
            Self::IndexedContent
            | Self::ImportantPage
            | Self::StaticDefault
            | Self::DataBacked => FixActionKind::Recreate,
            Self::ObsoleteRedirect => FixActionKind::Redirect,
            Self::Noindex => FixActionKind::Noindex,
            Self::Unclassified => FixActionKind::Skip,
        }
    }

    /// Fixed rationale recorded in the fix report.
    pub fn rationale(&self) -> &'static str {
        match self {
            Self::IndexedContent => {
                "indexed editorial content; recreate to keep externally accrued ranking signal"
            }
            Self::ObsoleteRedirect => "deprecated page collapsed into its replacement",
            Self::ImportantPage => "required page for site completeness",
            Self::StaticDefault => "static page; recreation preferred over loss",
            Self::DataBacked => "data-backed page missing; flagged for data-migration review",
            Self::Noindex => "low-value URL; de-index instead of recreating",
            Self::Unclassified => {
                "content type not covered by any rule; requires manual classification"
            }
        }
    }
}

/// One decision per missing URL.
///
/// `target` is present exactly when the action is a redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAction {
    pub url: UrlEntry,
    pub action: FixActionKind,
    pub rule: FixRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_imported: Option<bool>,
}

impl FixAction {
    /// Build the action a rule prescribes. A target is only kept for redirects.
    pub fn from_rule(url: UrlEntry, rule: FixRule, target: Option<String>) -> Self {
        let action = rule.action();
        let target = if action == FixActionKind::Redirect {
            target
        } else {
            None
        };
        Self {
            url,
            action,
            rule,
            target,
            reason: rule.rationale().to_string(),
            content_imported: None,
        }
    }

    /// Record a successful content extraction.
    pub fn mark_imported(&mut self) {
        self.content_imported = Some(true);
    }

    /// Record a failed content extraction, keeping the failure in the reason.
    pub fn mark_import_failed(&mut self, error: &str) {
        self.content_imported = Some(false);
        self.reason = format!(
            "{}; content extraction failed: {}",
            self.rule.rationale(),
            error
        );
    }

    /// Record that extraction was postponed by the per-run request ceiling.
    pub fn mark_import_deferred(&mut self) {
        self.content_imported = None;
        self.reason = format!(
            "{}; content extraction deferred to a later run",
            self.rule.rationale()
        );
    }

    /// Whether the action satisfies the target invariant.
    pub fn is_well_formed(&self) -> bool {
        match self.action {
            FixActionKind::Redirect => self.target.is_some(),
            _ => self.target.is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixCounts {
    pub recreated: usize,
    pub redirected: usize,
    pub noindexed: usize,
    pub skipped: usize,
    pub content_imported: usize,
    pub content_failed: usize,
}

impl FixCounts {
    pub fn tally(actions: &[FixAction]) -> Self {
        let mut counts = Self::default();
        for action in actions {
            match action.action {
                FixActionKind::Recreate => counts.recreated += 1,
                FixActionKind::Redirect => counts.redirected += 1,
                FixActionKind::Noindex => counts.noindexed += 1,
                FixActionKind::Skip => counts.skipped += 1,
            }
            match action.content_imported {
                Some(true) => counts.content_imported += 1,
                Some(false) => counts.content_failed += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.recreated + self.redirected + self.noindexed + self.skipped
    }
}

/// Audit trail of one fix run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the diff report this run was derived from.
    pub diff_report_sha256: String,
    pub counts: FixCounts,
    pub actions: Vec<FixAction>,
}

impl FixReport {
    pub fn new(
        generated_at: DateTime<Utc>,
        diff_report_sha256: String,
        actions: Vec<FixAction>,
    ) -> Self {
        Self {
            schema_version: super::REPORT_SCHEMA_VERSION,
            generated_at,
            diff_report_sha256,
            counts: FixCounts::tally(&actions),
            actions,
        }
    }
}

/// HTTP status used by a redirect rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RedirectStatus {
    #[default]
    Permanent,
    Temporary,
}

impl RedirectStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Permanent => 301,
            Self::Temporary => 302,
        }
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            301 => Ok(Self::Permanent),
            302 => Ok(Self::Temporary),
            other => Err(format!("unsupported redirect status {} (expected 301 or 302)", other)),
        }
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> Self {
        status.code()
    }
}

/// One from→to rule for the redirect-serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectMapping {
    pub from: String,
    pub to: String,
    pub status: RedirectStatus,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn entry() -> UrlEntry {
        UrlEntry::new("/eski-kampanya", ContentType::Static)
    }

    #[test]
    fn test_target_dropped_for_non_redirect() {
        let action = FixAction::from_rule(
            entry(),
            FixRule::StaticDefault,
            Some("/kampanya".to_string()),
        );
        assert_eq!(action.action, FixActionKind::Recreate);
        assert!(action.target.is_none());
        assert!(action.is_well_formed());
    }

    #[test]
    fn test_redirect_keeps_target() {
        let action = FixAction::from_rule(
            entry(),
            FixRule::ObsoleteRedirect,
            Some("/kampanya".to_string()),
        );
        assert_eq!(action.action, FixActionKind::Redirect);
        assert_eq!(action.target.as_deref(), Some("/kampanya"));
        assert!(action.is_well_formed());
    }

    #[test]
    fn test_import_failure_reason() {
        let mut action = FixAction::from_rule(
            UrlEntry::new("/blog/a", ContentType::Blog),
            FixRule::IndexedContent,
            None,
        );
        action.mark_import_failed("HTTP 404");
        assert_eq!(action.content_imported, Some(false));
        assert!(action.reason.starts_with(FixRule::IndexedContent.rationale()));
        assert!(action.reason.ends_with("content extraction failed: HTTP 404"));
    }

    #[test]
    fn test_counts() {
        let mut imported = FixAction::from_rule(
            UrlEntry::new("/blog/a", ContentType::Blog),
            FixRule::IndexedContent,
            None,
        );
        imported.mark_imported();
        let actions = vec![
            imported,
            FixAction::from_rule(entry(), FixRule::ObsoleteRedirect, Some("/k".into())),
            FixAction::from_rule(entry(), FixRule::Noindex, None),
            FixAction::from_rule(entry(), FixRule::Unclassified, None),
        ];
        let counts = FixCounts::tally(&actions);
        assert_eq!(counts.recreated, 1);
        assert_eq!(counts.redirected, 1);
        assert_eq!(counts.noindexed, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.content_imported, 1);
        assert_eq!(counts.content_failed, 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_redirect_status_wire_format() {
        assert_eq!(serde_json::to_string(&RedirectStatus::Temporary).unwrap(), "302");
        let status: RedirectStatus = serde_json::from_str("301").unwrap();
        assert_eq!(status, RedirectStatus::Permanent);
        assert!(serde_json::from_str::<RedirectStatus>("307").is_err());
    }
}
