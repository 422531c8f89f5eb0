//! Human-readable Markdown summaries of the JSON reports.

use std::fmt::Write;

use crate::models::{DiffReport, FixActionKind, FixReport, UrlEntry};

/// Preview rows shown per list before collapsing into "… and N more".
pub const DEFAULT_PREVIEW_LIMIT: usize = 50;

fn preview_urls<'a>(out: &mut String, urls: impl Iterator<Item = &'a UrlEntry>, total: usize, limit: usize) {
    for entry in urls.take(limit) {
        let _ = writeln!(out, "- `{}`", entry.normalized_key());
    }
    if total > limit {
        let _ = writeln!(out, "- … and {} more", total - limit);
    }
}

/// Render the diff summary: count table, per-type missing previews, extras and notes.
pub fn render_diff_summary(report: &DiffReport, preview_limit: usize) -> String {
    let s = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "# URL parity diff\n");
    let _ = writeln!(out, "Generated at {}\n", report.generated_at.to_rfc3339());

    let _ = writeln!(out, "| Metric | Count |");
    let _ = writeln!(out, "|---|---:|");
    let _ = writeln!(out, "| Production URLs | {} |", s.production_total);
    let _ = writeln!(out, "| Local URLs | {} |", s.local_total);
    let _ = writeln!(out, "| Matched (literal) | {} |", s.matched_literal_count);
    let _ = writeln!(out, "| Matched (template) | {} |", s.matched_template_count);
    let _ = writeln!(out, "| Missing | {} |", s.missing_count);
    let _ = writeln!(out, "| Extra | {} |", s.extra_count);
    let _ = writeln!(out, "| Change notes | {} |", s.changed_count);

    if !report.by_type.is_empty() {
        let _ = writeln!(out, "\n## By content type\n");
        let _ = writeln!(out, "| Type | Missing | Extra |");
        let _ = writeln!(out, "|---|---:|---:|");
        for (content_type, counts) in &report.by_type {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                content_type, counts.missing, counts.extra
            );
        }
    }

    if !report.changed.is_empty() {
        let _ = writeln!(out, "\n## Change notes\n");
        for note in &report.changed {
            let _ = write!(out, "- **{}**: {}", note.content_type, note.message);
            if note.local_templates > 0 {
                let _ = write!(
                    out,
                    " ({} local template(s) declared)",
                    note.local_templates
                );
            }
            out.push('\n');
        }
    }

    if !report.missing.is_empty() {
        let _ = writeln!(out, "\n## Missing\n");
        for (content_type, counts) in &report.by_type {
            if counts.missing == 0 {
                continue;
            }
            let _ = writeln!(out, "### {} ({})\n", content_type, counts.missing);
            let of_type = report
                .missing
                .iter()
                .filter(|e| &e.content_type == content_type);
            preview_urls(&mut out, of_type, counts.missing, preview_limit);
            out.push('\n');
        }
    }

    if !report.extra.is_empty() {
        let _ = writeln!(out, "\n## Extra\n");
        preview_urls(&mut out, report.extra.iter(), report.extra.len(), preview_limit);
    }

    out
}

/// Render the fix summary: action counts and a preview per action kind.
pub fn render_fix_summary(report: &FixReport, preview_limit: usize) -> String {
    let c = &report.counts;
    let mut out = String::new();

    let _ = writeln!(out, "# URL parity fix\n");
    let _ = writeln!(out, "Generated at {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "Diff report sha256 `{}`\n", report.diff_report_sha256);

    let _ = writeln!(out, "| Action | Count |");
    let _ = writeln!(out, "|---|---:|");
    let _ = writeln!(out, "| Recreate | {} |", c.recreated);
    let _ = writeln!(out, "| Redirect | {} |", c.redirected);
    let _ = writeln!(out, "| Noindex | {} |", c.noindexed);
    let _ = writeln!(out, "| Skip | {} |", c.skipped);
    let _ = writeln!(out, "| Content imported | {} |", c.content_imported);
    let _ = writeln!(out, "| Content failed | {} |", c.content_failed);

    for kind in [
        FixActionKind::Recreate,
        FixActionKind::Redirect,
        FixActionKind::Noindex,
        FixActionKind::Skip,
    ] {
        let actions: Vec<_> = report.actions.iter().filter(|a| a.action == kind).collect();
        if actions.is_empty() {
            continue;
        }

        let _ = writeln!(out, "\n## {} ({})\n", kind, actions.len());
        for action in actions.iter().take(preview_limit) {
            let key = action.url.normalized_key();
            match (&action.target, action.content_imported) {
                (Some(target), _) => {
                    let _ = writeln!(out, "- `{}` → `{}`", key, target);
                }
                (None, Some(false)) => {
                    let _ = writeln!(out, "- `{}`: {}", key, action.reason);
                }
                (None, Some(true)) => {
                    let _ = writeln!(out, "- `{}` (content imported)", key);
                }
                (None, None) => {
                    let _ = writeln!(out, "- `{}`", key);
                }
            }
        }
        if actions.len() > preview_limit {
            let _ = writeln!(out, "- … and {} more", actions.len() - preview_limit);
        }
    }

    out
}
