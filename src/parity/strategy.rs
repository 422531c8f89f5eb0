//! Remediation strategy: one decision per missing URL.
//!
//! The decision table is fixed; the data it consults (obsolete-page patterns, the
//! important-pages allow-list, the semantic redirect map and noindex patterns) comes
//! from [`RuleConfig`] so it can change without touching this module.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::normalize;
use super::pattern::{RouteTemplate, TemplateSet};
use crate::models::{
    ContentType, FixAction, FixActionKind, FixRule, RedirectMapping, RedirectStatus, UrlEntry,
};

/// Errors raised while compiling rule tables.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid {table} pattern {pattern:?}: {source}")]
    InvalidPattern {
        table: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Redirect destination, either a bare path or a path with an explicit status.
///
/// Examples:
/// - `"/eski-kampanya" = "/kampanya"`
/// - `"/yaz-firsati" = { to = "/kampanya", status = 302 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedirectTarget {
    Path(String),
    Detailed {
        to: String,
        #[serde(default)]
        status: RedirectStatus,
    },
}

impl RedirectTarget {
    pub fn to(&self) -> &str {
        match self {
            RedirectTarget::Path(to) => to,
            RedirectTarget::Detailed { to, .. } => to,
        }
    }

    pub fn status(&self) -> RedirectStatus {
        match self {
            RedirectTarget::Path(_) => RedirectStatus::default(),
            RedirectTarget::Detailed { status, .. } => *status,
        }
    }
}

/// Rule tables as configuration data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Regexes (case-insensitive) marking deprecated static pages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub obsolete_patterns: Vec<String>,
    /// Static pages that must always be recreated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub important_pages: Vec<String>,
    /// Regexes (case-insensitive) for URLs to de-index when no other rule applies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub noindex_patterns: Vec<String>,
    /// Deprecated key → replacement.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub semantic_redirects: BTreeMap<String, RedirectTarget>,
}

/// Compiled rule tables.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    obsolete: Vec<Regex>,
    important: HashSet<String>,
    noindex: Vec<Regex>,
    redirects: HashMap<String, (String, RedirectStatus)>,
}

fn compile_patterns(table: &'static str, patterns: &[String]) -> Result<Vec<Regex>, RuleError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RuleError::InvalidPattern {
                    table,
                    pattern: pattern.clone(),
                    source,
                })
        })
        .collect()
}

impl RuleSet {
    pub fn compile(config: &RuleConfig) -> Result<Self, RuleError> {
        let redirects = config
            .semantic_redirects
            .iter()
            .map(|(from, target)| (normalize(from), (normalize(target.to()), target.status())))
            .collect();

        Ok(Self {
            obsolete: compile_patterns("obsolete", &config.obsolete_patterns)?,
            important: config.important_pages.iter().map(|p| normalize(p)).collect(),
            noindex: compile_patterns("noindex", &config.noindex_patterns)?,
            redirects,
        })
    }

    fn is_obsolete(&self, key: &str) -> bool {
        self.obsolete.iter().any(|re| re.is_match(key))
    }

    fn is_important(&self, key: &str) -> bool {
        self.important.contains(key)
    }

    fn is_noindex(&self, key: &str) -> bool {
        self.noindex.iter().any(|re| re.is_match(key))
    }

    fn redirect_for(&self, key: &str) -> Option<&(String, RedirectStatus)> {
        self.redirects.get(key)
    }
}

/// Keys the local deployment is known to serve, used to validate redirect targets.
#[derive(Debug, Clone, Default)]
pub struct LocalTargets {
    literals: HashSet<String>,
    templates: TemplateSet,
}

impl LocalTargets {
    pub fn from_entries(entries: &[UrlEntry]) -> Self {
        let mut targets = Self::default();
        for entry in entries {
            match entry.route_template() {
                Some(template) => {
                    if let Ok(compiled) = RouteTemplate::compile(template) {
                        targets.templates.push(compiled, entry.content_type.clone());
                    }
                }
                None => {
                    targets.literals.insert(entry.normalized_key().to_string());
                }
            }
        }
        targets
    }

    /// A literal key, a declared template, or a URL some template serves.
    pub fn contains(&self, key: &str) -> bool {
        self.literals.contains(key)
            || self.templates.declares(key)
            || self.templates.find(key).is_some()
    }
}

/// Applies the decision table to missing entries.
#[derive(Debug, Clone, Default)]
pub struct StrategyEngine {
    rules: RuleSet,
    targets: Option<LocalTargets>,
}

impl StrategyEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            targets: None,
        }
    }

    /// Only accept redirect targets the local deployment serves.
    pub fn with_local_targets(mut self, targets: LocalTargets) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Decide one entry. Total over every content type.
    pub fn decide(&self, entry: &UrlEntry) -> FixAction {
        let (rule, target) = self.select_rule(entry);
        debug!("{} -> {:?}", entry.normalized_key(), rule);
        FixAction::from_rule(entry.clone(), rule, target)
    }

    pub fn decide_all(&self, entries: &[UrlEntry]) -> Vec<FixAction> {
        entries.iter().map(|e| self.decide(e)).collect()
    }

    /// Redirect rule for a redirect action; `None` for every other action.
    pub fn redirect_mapping(&self, action: &FixAction) -> Option<RedirectMapping> {
        if action.action != FixActionKind::Redirect {
            return None;
        }
        let to = action.target.clone()?;
        let from = action.url.normalized_key().to_string();
        let status = self
            .rules
            .redirect_for(&from)
            .map(|(_, status)| *status)
            .unwrap_or_default();

        Some(RedirectMapping {
            from,
            to,
            status,
            reason: action.rule.rationale().to_string(),
        })
    }

    fn select_rule(&self, entry: &UrlEntry) -> (FixRule, Option<String>) {
        let key = entry.normalized_key();

        match entry.content_type {
            ContentType::Blog | ContentType::News => return (FixRule::IndexedContent, None),
            ContentType::Static => {
                if self.rules.is_obsolete(key) {
                    if let Some(target) = self.resolve_redirect(key) {
                        return (FixRule::ObsoleteRedirect, Some(target));
                    }
                }
                if self.rules.is_important(key) {
                    return (FixRule::ImportantPage, None);
                }
                return (FixRule::StaticDefault, None);
            }
            ContentType::Listing | ContentType::Neighborhood | ContentType::PropertyType => {
                return (FixRule::DataBacked, None)
            }
            ContentType::Unknown | ContentType::Other(_) => {}
        }

        if self.rules.is_noindex(key) {
            (FixRule::Noindex, None)
        } else {
            (FixRule::Unclassified, None)
        }
    }

    fn resolve_redirect(&self, key: &str) -> Option<String> {
        let (target, _) = self.rules.redirect_for(key)?;
        if target == key {
            return None;
        }
        match &self.targets {
            Some(targets) if !targets.contains(target) => {
                debug!("Redirect target {} for {} is not served locally", target, key);
                None
            }
            _ => Some(target.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleConfig {
        let mut semantic_redirects = BTreeMap::new();
        semantic_redirects.insert(
            "/eski-kampanya".to_string(),
            RedirectTarget::Path("/kampanya".to_string()),
        );
        semantic_redirects.insert(
            "/Eski-Iletisim/".to_string(),
            RedirectTarget::Detailed {
                to: "/iletisim".to_string(),
                status: RedirectStatus::Temporary,
            },
        );
        RuleConfig {
            obsolete_patterns: vec!["^/eski-".to_string()],
            important_pages: vec!["/Hakkimizda/".to_string(), "/eski-sss".to_string()],
            noindex_patterns: vec!["^/arama".to_string()],
            semantic_redirects,
        }
    }

    fn engine() -> StrategyEngine {
        StrategyEngine::new(RuleSet::compile(&rules()).unwrap())
    }

    fn decide(url: &str, ct: ContentType) -> FixAction {
        engine().decide(&UrlEntry::new(url, ct))
    }

    #[test]
    fn test_editorial_content_recreated() {
        for ct in [ContentType::Blog, ContentType::News] {
            let action = decide("/eski-yazi", ct);
            assert_eq!(action.action, FixActionKind::Recreate);
            assert_eq!(action.rule, FixRule::IndexedContent);
        }
    }

    #[test]
    fn test_obsolete_static_redirected() {
        let action = decide("https://site.com/eski-kampanya/", ContentType::Static);
        assert_eq!(action.action, FixActionKind::Redirect);
        assert_eq!(action.target.as_deref(), Some("/kampanya"));
        assert_eq!(action.reason, FixRule::ObsoleteRedirect.rationale());
    }

    #[test]
    fn test_obsolete_without_mapping_recreated() {
        let action = decide("/eski-duyuru", ContentType::Static);
        assert_eq!(action.action, FixActionKind::Recreate);
        assert_eq!(action.rule, FixRule::StaticDefault);
        assert!(action.target.is_none());
    }

    #[test]
    fn test_important_page_recreated() {
        assert_eq!(decide("/hakkimizda", ContentType::Static).rule, FixRule::ImportantPage);
        // Obsolete pattern matches but there is no mapping, so the allow-list applies.
        assert_eq!(decide("/eski-sss", ContentType::Static).rule, FixRule::ImportantPage);
    }

    #[test]
    fn test_data_backed_types_recreated() {
        for ct in [
            ContentType::Listing,
            ContentType::Neighborhood,
            ContentType::PropertyType,
        ] {
            let action = decide("/ilan/1", ct);
            assert_eq!(action.action, FixActionKind::Recreate);
            assert_eq!(action.rule, FixRule::DataBacked);
        }
    }

    #[test]
    fn test_unknown_and_future_types_skipped() {
        assert_eq!(decide("/x", ContentType::Unknown).action, FixActionKind::Skip);
        let action = decide("/x", ContentType::Other("video".to_string()));
        assert_eq!(action.action, FixActionKind::Skip);
        assert_eq!(action.rule, FixRule::Unclassified);
    }

    #[test]
    fn test_noindex_before_skip() {
        let action = decide("/arama?q=villa", ContentType::Unknown);
        assert_eq!(action.action, FixActionKind::Noindex);
        // Typed entries never reach the noindex rule.
        assert_eq!(
            decide("/arama", ContentType::Static).action,
            FixActionKind::Recreate
        );
    }

    #[test]
    fn test_redirect_requires_locally_served_target() {
        let local = vec![UrlEntry::new("/iletisim", ContentType::Static)];
        let engine = engine().with_local_targets(LocalTargets::from_entries(&local));

        let action = engine.decide(&UrlEntry::new("/eski-kampanya", ContentType::Static));
        assert_eq!(action.action, FixActionKind::Recreate);

        let action = engine.decide(&UrlEntry::new("/eski-iletisim", ContentType::Static));
        assert_eq!(action.action, FixActionKind::Redirect);
        let mapping = engine.redirect_mapping(&action).unwrap();
        assert_eq!(mapping.from, "/eski-iletisim");
        assert_eq!(mapping.to, "/iletisim");
        assert_eq!(mapping.status, RedirectStatus::Temporary);
    }

    #[test]
    fn test_template_served_target_accepted() {
        let local = vec![UrlEntry::template("/kampanya/:slug", ContentType::Static)];
        let mut config = rules();
        config.semantic_redirects.insert(
            "/eski-yaz".to_string(),
            RedirectTarget::Path("/kampanya/yaz".to_string()),
        );
        let engine = StrategyEngine::new(RuleSet::compile(&config).unwrap())
            .with_local_targets(LocalTargets::from_entries(&local));
        let action = engine.decide(&UrlEntry::new("/eski-yaz", ContentType::Static));
        assert_eq!(action.target.as_deref(), Some("/kampanya/yaz"));
    }

    #[test]
    fn test_no_mapping_for_non_redirect() {
        let action = decide("/blog/a", ContentType::Blog);
        assert!(engine().redirect_mapping(&action).is_none());
    }

    #[test]
    fn test_empty_rules_are_total() {
        let engine = StrategyEngine::default();
        for ct in [
            ContentType::Blog,
            ContentType::Static,
            ContentType::Listing,
            ContentType::Unknown,
        ] {
            let action = engine.decide(&UrlEntry::new("/eski-x", ct));
            assert!(action.is_well_formed());
        }
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = RuleConfig {
            obsolete_patterns: vec!["(".to_string()],
            ..RuleConfig::default()
        };
        let err = RuleSet::compile(&config).unwrap_err();
        assert!(err.to_string().contains("obsolete"));
    }

    #[test]
    fn test_rule_config_from_toml() {
        let config: RuleConfig = toml::from_str(
            r#"
            obsolete_patterns = ["^/eski-"]
            important_pages = ["/iletisim"]

            [semantic_redirects]
            "/eski-kampanya" = "/kampanya"
            "/yaz" = { to = "/kampanya", status = 302 }
            "#,
        )
        .unwrap();
        assert_eq!(config.semantic_redirects["/eski-kampanya"].to(), "/kampanya");
        assert_eq!(
            config.semantic_redirects["/yaz"].status(),
            RedirectStatus::Temporary
        );
        assert!(config.noindex_patterns.is_empty());
    }
}
