//! Structural diff between a production and a local inventory.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::pattern::{RouteTemplate, TemplateSet};
use crate::models::{
    ChangeNote, ContentType, DiffInputs, DiffReport, DiffSummary, TypeCounts, UrlEntry,
    REPORT_SCHEMA_VERSION,
};

/// Options controlling a diff run.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Types that get a change note when production has them and local has no literal.
    pub watch_types: Vec<ContentType>,
    /// Timestamp stamped on the report; `None` uses the current time.
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            watch_types: vec![ContentType::Blog, ContentType::News],
            generated_at: None,
        }
    }
}

/// Computes [`DiffReport`]s. Pure apart from logging.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

/// Local inventory split into its literal index and compiled templates.
struct LocalIndex<'a> {
    literals: Vec<&'a UrlEntry>,
    by_key: HashMap<&'a str, &'a UrlEntry>,
    templates: TemplateSet,
}

impl<'a> LocalIndex<'a> {
    fn build(local: &'a [UrlEntry]) -> Self {
        let mut literals = Vec::new();
        let mut by_key = HashMap::new();
        let mut templates = TemplateSet::new();

        for entry in local {
            if let Some(template) = entry.route_template() {
                match RouteTemplate::compile(template) {
                    Ok(compiled) => templates.push(compiled, entry.content_type.clone()),
                    Err(e) => warn!("Skipping local template: {}", e),
                }
                continue;
            }

            match by_key.entry(entry.normalized_key()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                    literals.push(entry);
                }
                Entry::Occupied(_) => {
                    debug!("Duplicate local URL {} collapsed", entry.normalized_key());
                }
            }
        }

        Self {
            literals,
            by_key,
            templates,
        }
    }
}

/// Distinct production literals in input order.
fn production_literals(production: &[UrlEntry]) -> (Vec<&UrlEntry>, HashSet<&str>) {
    let mut literals = Vec::new();
    let mut keys = HashSet::new();

    for entry in production {
        if entry.is_template() {
            warn!(
                "Ignoring route template {} in production inventory",
                entry.raw_url()
            );
            continue;
        }
        if keys.insert(entry.normalized_key()) {
            literals.push(entry);
        } else {
            debug!("Duplicate production URL {} collapsed", entry.normalized_key());
        }
    }

    (literals, keys)
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Stamp reports with a fixed timestamp.
    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.options.generated_at = Some(generated_at);
        self
    }

    pub fn diff(&self, production: &[UrlEntry], local: &[UrlEntry]) -> DiffReport {
        let local_index = LocalIndex::build(local);
        let (production, production_keys) = production_literals(production);

        let mut missing = Vec::new();
        let mut matched_literal = 0usize;
        let mut matched_template = 0usize;

        for entry in &production {
            let key = entry.normalized_key();
            if local_index.by_key.contains_key(key) {
                matched_literal += 1;
            } else if let Some(template) = local_index.templates.find(key) {
                debug!("{} covered by template {}", key, template.as_str());
                matched_template += 1;
            } else {
                missing.push((*entry).clone());
            }
        }

        let extra: Vec<UrlEntry> = local_index
            .literals
            .iter()
            .filter(|e| !production_keys.contains(e.normalized_key()))
            .map(|e| (*e).clone())
            .collect();

        let changed = self.change_notes(&production, &local_index);

        missing.sort_by(|a, b| {
            b.sort_priority()
                .total_cmp(&a.sort_priority())
                .then_with(|| a.content_type.cmp(&b.content_type))
        });

        let mut by_type: BTreeMap<ContentType, TypeCounts> = BTreeMap::new();
        for entry in &missing {
            by_type.entry(entry.content_type.clone()).or_default().missing += 1;
        }
        for entry in &extra {
            by_type.entry(entry.content_type.clone()).or_default().extra += 1;
        }

        let summary = DiffSummary {
            production_total: production.len(),
            local_total: local_index.literals.len() + local_index.templates.len(),
            missing_count: missing.len(),
            extra_count: extra.len(),
            changed_count: changed.len(),
            matched_literal_count: matched_literal,
            matched_template_count: matched_template,
        };

        info!(
            "Diff: {} production, {} local, {} missing, {} extra, {} change notes",
            summary.production_total,
            summary.local_total,
            summary.missing_count,
            summary.extra_count,
            summary.changed_count
        );

        DiffReport {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: self.options.generated_at.unwrap_or_else(Utc::now),
            inputs: DiffInputs::default(),
            summary,
            missing,
            extra,
            changed,
            by_type,
        }
    }

    fn change_notes(&self, production: &[&UrlEntry], local: &LocalIndex<'_>) -> Vec<ChangeNote> {
        let mut seen = HashSet::new();
        let mut notes = Vec::new();

        for content_type in &self.options.watch_types {
            if !seen.insert(content_type) {
                continue;
            }
            let production_count = production
                .iter()
                .filter(|e| &e.content_type == content_type)
                .count();
            let local_count = local
                .literals
                .iter()
                .filter(|e| &e.content_type == content_type)
                .count();

            if production_count > 0 && local_count == 0 {
                notes.push(ChangeNote::zero_local_coverage(
                    content_type.clone(),
                    production_count,
                    local.templates.count_for(content_type),
                ));
            }
        }

        notes
    }
}

/// Diff with default options.
pub fn diff(production: &[UrlEntry], local: &[UrlEntry]) -> DiffReport {
    DiffEngine::default().diff(production, local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn literal(url: &str, ct: ContentType) -> UrlEntry {
        UrlEntry::new(url, ct)
    }

    fn keys(entries: &[UrlEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.normalized_key()).collect()
    }

    fn engine() -> DiffEngine {
        DiffEngine::default().at(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_template_covers_production_url() {
        let production = vec![
            literal("https://site.com/blog/a", ContentType::Blog),
            literal("https://site.com/eski-kampanya", ContentType::Static),
        ];
        let local = vec![
            UrlEntry::template("/blog/:slug", ContentType::Blog),
            literal("/kampanya", ContentType::Static),
        ];

        let report = engine().diff(&production, &local);
        assert_eq!(keys(&report.missing), vec!["/eski-kampanya"]);
        assert_eq!(keys(&report.extra), vec!["/kampanya"]);
        assert_eq!(report.summary.matched_template_count, 1);
        assert_eq!(report.summary.matched_literal_count, 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_templates_never_reported_extra() {
        let local = vec![UrlEntry::template("/blog/:slug", ContentType::Blog)];
        let report = engine().diff(&[], &local);
        assert!(report.extra.is_empty());
        assert_eq!(report.summary.local_total, 1);
    }

    #[test]
    fn test_zero_local_news_emits_change_note() {
        let production: Vec<UrlEntry> = (0..12)
            .map(|i| literal(&format!("/haber/{}", i), ContentType::News))
            .collect();
        let local = vec![literal("/", ContentType::Static)];

        let report = engine().diff(&production, &local);
        assert_eq!(report.missing.len(), 12);
        assert_eq!(report.by_type[&ContentType::News].missing, 12);
        assert_eq!(report.changed.len(), 1);
        let note = &report.changed[0];
        assert_eq!(note.content_type, ContentType::News);
        assert_eq!(note.production_count, 12);
        assert_eq!(note.local_count, 0);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_no_change_note_when_local_has_literal() {
        let production = vec![literal("/blog/a", ContentType::Blog)];
        let local = vec![literal("/blog/b", ContentType::Blog)];
        let report = engine().diff(&production, &local);
        assert!(report.changed.is_empty());
        // Renames surface as an independent missing/extra pair.
        assert_eq!(keys(&report.missing), vec!["/blog/a"]);
        assert_eq!(keys(&report.extra), vec!["/blog/b"]);
    }

    #[test]
    fn test_missing_sorted_by_priority_then_type() {
        let production = vec![
            literal("/s1", ContentType::Static).with_priority(0.5),
            literal("/n1", ContentType::News),
            literal("/b1", ContentType::Blog).with_priority(0.5),
            literal("/l1", ContentType::Listing).with_priority(0.9),
        ];
        let report = engine().diff(&production, &[]);
        assert_eq!(keys(&report.missing), vec!["/l1", "/b1", "/s1", "/n1"]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let production = vec![
            literal("https://a.com/x/", ContentType::Static),
            literal("http://b.com/X", ContentType::Static),
        ];
        let local = vec![
            literal("/y", ContentType::Static),
            literal("/Y/", ContentType::Static),
        ];
        let report = engine().diff(&production, &local);
        assert_eq!(report.summary.production_total, 1);
        assert_eq!(report.summary.local_total, 1);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.extra.len(), 1);
    }

    #[test]
    fn test_production_templates_ignored() {
        let production = vec![
            UrlEntry::template("/blog/:slug", ContentType::Blog),
            literal("/a", ContentType::Static),
        ];
        let report = engine().diff(&production, &[]);
        assert_eq!(report.summary.production_total, 1);
        assert_eq!(keys(&report.missing), vec!["/a"]);
    }

    #[test]
    fn test_invalid_local_template_skipped() {
        let production = vec![literal("/blog/a", ContentType::Blog)];
        let local = vec![UrlEntry::template("/blog/:", ContentType::Blog)];
        let report = engine().diff(&production, &local);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.summary.local_total, 0);
    }

    #[test]
    fn test_every_production_entry_in_one_bucket() {
        let production = vec![
            literal("/a", ContentType::Static),
            literal("/blog/x", ContentType::Blog),
            literal("/gone", ContentType::Unknown),
            literal("/b", ContentType::Static),
        ];
        let local = vec![
            literal("/a", ContentType::Static),
            literal("/b/", ContentType::Static),
            UrlEntry::template("/blog/[slug]", ContentType::Blog),
        ];
        let report = engine().diff(&production, &local);
        let s = &report.summary;
        assert_eq!(s.matched_literal_count, 2);
        assert_eq!(s.matched_template_count, 1);
        assert_eq!(s.missing_count, 1);
        assert_eq!(
            s.missing_count + s.matched_literal_count + s.matched_template_count,
            s.production_total
        );
    }

    #[test]
    fn test_swapping_inputs_swaps_missing_and_extra() {
        let a = vec![
            literal("/a", ContentType::Static),
            literal("/b", ContentType::Blog),
            literal("/c", ContentType::News),
        ];
        let b = vec![
            literal("/b", ContentType::Blog),
            literal("/d", ContentType::Static),
        ];
        let forward = engine().diff(&a, &b);
        let backward = engine().diff(&b, &a);

        let mut forward_missing = keys(&forward.missing);
        let mut backward_extra = keys(&backward.extra);
        forward_missing.sort();
        backward_extra.sort();
        assert_eq!(forward_missing, backward_extra);

        let mut forward_extra = keys(&forward.extra);
        let mut backward_missing = keys(&backward.missing);
        forward_extra.sort();
        backward_missing.sort();
        assert_eq!(forward_extra, backward_missing);
    }

    #[test]
    fn test_watch_types_configurable() {
        let production = vec![literal("/ilan/1", ContentType::Listing)];
        let engine = DiffEngine::new(DiffOptions {
            watch_types: vec![ContentType::Listing, ContentType::Listing],
            generated_at: None,
        });
        let report = engine.diff(&production, &[]);
        assert_eq!(report.changed.len(), 1);
        assert_eq!(report.changed[0].content_type, ContentType::Listing);
    }
}
