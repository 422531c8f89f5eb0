//! Stage orchestration: diff and fix.
//!
//! Stages only talk through artifacts. `run_diff` reads both inventories before it
//! writes anything; `run_fix` reads the diff artifact and writes every fix artifact
//! once extraction has finished.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::config::{load_rules_file, ConfigError, Settings};
use crate::extract::{
    resolve_fetch_url, ContentExtractor, ExtractionEvent, ExtractionJob, ExtractionOutcome,
    ExtractionService, PageFetcher,
};
use crate::inventory::{load_inventory, InventoryError};
use crate::models::{
    DiffInputs, DiffReport, ExtractedContent, FixActionKind, FixReport, RedirectMapping,
    REPORT_SCHEMA_VERSION,
};
use crate::parity::{DiffEngine, LocalTargets, RuleError, RuleSet, StrategyEngine};
use crate::report::{
    merge_redirects, parse_json, read_bytes, read_json_if_exists, render_diff_summary,
    render_fix_summary, sha256_hex, write_atomic, write_json, ArtifactPaths, Checkpoint,
    ReportError,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("diff report {} not found; run `parity diff` first", .0.display())]
    MissingDiffReport(PathBuf),

    #[error(
        "diff report {} has schema version {found}, expected {}",
        .path.display(),
        REPORT_SCHEMA_VERSION
    )]
    UnsupportedReport { path: PathBuf, found: u32 },

    #[error("diff report {} has inconsistent counts", .0.display())]
    InconsistentReport(PathBuf),

    #[error("run cancelled")]
    Cancelled,
}

fn check_cancelled(cancel: &CancelFlag) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Latest of two optional timestamps.
fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Result of a diff run.
#[derive(Debug)]
pub struct DiffOutcome {
    pub report: DiffReport,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

/// Load both inventories, diff them and write the diff artifacts.
pub fn run_diff(
    settings: &Settings,
    production_path: &Path,
    local_path: &Path,
) -> Result<DiffOutcome, PipelineError> {
    let production = load_inventory(production_path)?;
    let local = load_inventory(local_path)?;

    let generated_at = latest(
        production.inventory.collected_at,
        local.inventory.collected_at,
    )
    .unwrap_or_else(|| {
        warn!("Neither inventory carries collected_at; stamping report with current time");
        Utc::now()
    });

    let mut report = DiffEngine::new(settings.diff_options())
        .at(generated_at)
        .diff(&production.inventory.entries, &local.inventory.entries);
    report.inputs = DiffInputs {
        production: Some(production.digest),
        local: Some(local.digest),
    };

    let artifacts = ArtifactPaths::new(&settings.paths.output_dir);
    artifacts.ensure_dir()?;

    let json_path = artifacts.diff_json();
    write_json(&json_path, &report)?;

    let markdown_path = artifacts.diff_markdown();
    let markdown = render_diff_summary(&report, settings.diff.preview_limit);
    write_atomic(&markdown_path, markdown.as_bytes())?;

    info!("Wrote {} and {}", json_path.display(), markdown_path.display());

    Ok(DiffOutcome {
        report,
        json_path,
        markdown_path,
    })
}

/// Knobs for a fix run that override configuration.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Standalone rules file, replacing the configured rules.
    pub rules_path: Option<PathBuf>,
    /// Local inventory used to validate redirect targets. When unset the configured
    /// path is used if that file exists.
    pub local_inventory: Option<PathBuf>,
    pub skip_extraction: bool,
    pub workers: Option<usize>,
    /// Replace the redirect map instead of appending to it.
    pub regenerate_redirects: bool,
}

/// Result of a fix run.
#[derive(Debug)]
pub struct FixOutcome {
    pub report: FixReport,
    pub redirects_added: usize,
    pub redirects_total: usize,
    /// Extractions reused from a checkpoint or a previous run.
    pub content_reused: usize,
    /// Extractions postponed by the per-run request ceiling.
    pub content_deferred: usize,
}

fn load_rules(settings: &Settings, options: &FixOptions) -> Result<RuleSet, PipelineError> {
    let rules_path = options
        .rules_path
        .as_ref()
        .or(settings.paths.rules_file.as_ref());

    let config = match rules_path {
        Some(path) => {
            info!("Loading rules from {}", path.display());
            load_rules_file(path)?
        }
        None => settings.rules.clone(),
    };

    Ok(RuleSet::compile(&config)?)
}

fn load_local_targets(
    settings: &Settings,
    options: &FixOptions,
) -> Result<Option<LocalTargets>, PipelineError> {
    let path = match options.local_inventory {
        Some(ref path) => path.clone(),
        None if settings.paths.local_inventory.exists() => settings.paths.local_inventory.clone(),
        None => {
            info!("No local inventory; redirect targets are not validated against it");
            return Ok(None);
        }
    };

    let loaded = load_inventory(&path)?;
    Ok(Some(LocalTargets::from_entries(&loaded.inventory.entries)))
}

/// Read and validate the diff artifact. Returns the report and its SHA-256.
pub fn read_diff_report(path: &Path) -> Result<(DiffReport, String), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingDiffReport(path.to_path_buf()));
    }
    let bytes = read_bytes(path)?;
    let report: DiffReport = parse_json(&bytes, path)?;

    if report.schema_version != REPORT_SCHEMA_VERSION {
        return Err(PipelineError::UnsupportedReport {
            path: path.to_path_buf(),
            found: report.schema_version,
        });
    }
    if !report.is_consistent() {
        return Err(PipelineError::InconsistentReport(path.to_path_buf()));
    }

    Ok((report, sha256_hex(&bytes)))
}

/// Failure reason for a job whose extraction worker died before reporting.
pub const WORKER_ABORTED: &str = "extraction worker aborted";

/// Content already recovered by an earlier run or an interrupted one.
fn previous_content(
    artifacts: &ArtifactPaths,
    checkpoint: &Checkpoint,
) -> Result<HashMap<String, ExtractedContent>, PipelineError> {
    let mut content: HashMap<String, ExtractedContent> =
        read_json_if_exists::<Vec<ExtractedContent>>(&artifacts.extracted_content())?
            .unwrap_or_default()
            .into_iter()
            .map(|c| (c.key.clone(), c))
            .collect();
    content.extend(checkpoint.load()?);
    Ok(content)
}

/// Decide an action per missing URL, recover content and write the fix artifacts.
///
/// Extraction failures are recorded on their actions and never fail the run.
pub async fn run_fix(
    settings: &Settings,
    options: &FixOptions,
    fetcher: Arc<dyn PageFetcher>,
    cancel: &CancelFlag,
    event_tx: Option<mpsc::Sender<ExtractionEvent>>,
) -> Result<FixOutcome, PipelineError> {
    let artifacts = ArtifactPaths::new(&settings.paths.output_dir);
    let (diff_report, diff_sha256) = read_diff_report(&artifacts.diff_json())?;

    let mut engine = StrategyEngine::new(load_rules(settings, options)?);
    if let Some(targets) = load_local_targets(settings, options)? {
        engine = engine.with_local_targets(targets);
    }

    let mut actions = engine.decide_all(&diff_report.missing);
    info!(
        "Decided {} actions for {} missing URLs",
        actions.len(),
        diff_report.missing.len()
    );
    check_cancelled(cancel)?;

    let checkpoint = Arc::new(Checkpoint::new(artifacts.checkpoint()));
    let mut recovered: BTreeMap<String, ExtractedContent> = BTreeMap::new();
    let mut content_reused = 0;
    let mut content_deferred = 0;

    if options.skip_extraction {
        info!("Content extraction disabled");
    } else {
        artifacts.ensure_dir()?;
        let origin = settings.extract.origin()?;
        let mut previous = previous_content(&artifacts, &checkpoint)?;
        let ceiling = settings.extract.max_requests_per_run;

        let mut jobs = Vec::new();
        // Action index per job key.
        let mut pending: HashMap<String, usize> = HashMap::new();

        for (idx, action) in actions.iter_mut().enumerate() {
            if action.action != FixActionKind::Recreate || !action.url.content_type.is_recoverable()
            {
                continue;
            }
            let key = action.url.normalized_key().to_string();

            if let Some(content) = previous.remove(&key) {
                action.mark_imported();
                recovered.insert(key, content);
                content_reused += 1;
                continue;
            }

            if ceiling > 0 && jobs.len() >= ceiling {
                action.mark_import_deferred();
                content_deferred += 1;
                continue;
            }

            match resolve_fetch_url(action.url.raw_url(), &key, origin.as_ref()) {
                Ok(url) => {
                    pending.insert(key.clone(), idx);
                    jobs.push(ExtractionJob { key, url });
                }
                Err(e) => action.mark_import_failed(&e.to_string()),
            }
        }

        if content_deferred > 0 {
            warn!(
                "Request ceiling of {} reached; {} extractions deferred",
                ceiling, content_deferred
            );
        }

        if !jobs.is_empty() {
            info!("Extracting content for {} pages", jobs.len());
            let mut pool = settings.extract.pool();
            if let Some(workers) = options.workers {
                pool.workers = workers.max(1);
            }

            let extractor = ContentExtractor::new(
                fetcher,
                settings.extract.limits(),
                settings.extract.request_timeout(),
            );
            let service =
                ExtractionService::new(extractor, pool).with_checkpoint(checkpoint.clone());

            let event_tx = match event_tx {
                Some(tx) => tx,
                None => mpsc::channel(1).0,
            };
            let outcomes = service.run(jobs, event_tx, cancel).await;
            check_cancelled(cancel)?;

            for (key, outcome) in outcomes {
                let Some(idx) = pending.remove(&key) else {
                    continue;
                };
                match outcome {
                    ExtractionOutcome::Extracted(content) => {
                        actions[idx].mark_imported();
                        recovered.insert(key, content);
                    }
                    ExtractionOutcome::Failed(error) => actions[idx].mark_import_failed(&error),
                }
            }

            // Jobs left without an outcome in an uncancelled run lost their worker.
            for (key, idx) in pending {
                warn!("No extraction outcome for {}", key);
                actions[idx].mark_import_failed(WORKER_ABORTED);
            }
        }
    }

    check_cancelled(cancel)?;

    let new_redirects: Vec<RedirectMapping> = actions
        .iter()
        .filter_map(|a| engine.redirect_mapping(a))
        .collect();
    let existing = if options.regenerate_redirects {
        Vec::new()
    } else {
        read_json_if_exists::<Vec<RedirectMapping>>(&artifacts.redirect_map())?.unwrap_or_default()
    };
    let merged = merge_redirects(existing, new_redirects);
    if merged.kept_existing > 0 {
        info!(
            "{} redirects already mapped; existing rules kept",
            merged.kept_existing
        );
    }

    let report = FixReport::new(diff_report.generated_at, diff_sha256, actions);

    artifacts.ensure_dir()?;
    write_json(&artifacts.fix_json(), &report)?;
    let markdown = render_fix_summary(&report, settings.diff.preview_limit);
    write_atomic(&artifacts.fix_markdown(), markdown.as_bytes())?;
    write_json(&artifacts.redirect_map(), &merged.mappings)?;
    if !options.skip_extraction {
        let content: Vec<&ExtractedContent> = recovered.values().collect();
        write_json(&artifacts.extracted_content(), &content)?;
        checkpoint.clear()?;
    }

    info!(
        "Fix: {} recreate, {} redirect, {} noindex, {} skip",
        report.counts.recreated,
        report.counts.redirected,
        report.counts.noindexed,
        report.counts.skipped
    );

    Ok(FixOutcome {
        redirects_added: merged.added,
        redirects_total: merged.mappings.len(),
        content_reused,
        content_deferred,
        report,
    })
}
