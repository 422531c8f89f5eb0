//! `parity fix`.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::cancel::CancelFlag;
use crate::cli::icons::{dim_arrow, error, info, success, warn};
use crate::cli::progress::ExtractionProgress;
use crate::config::Settings;
use crate::extract::{ExtractionEvent, HttpFetcher};
use crate::pipeline::{run_fix, FixOptions, PipelineError};
use crate::report::ArtifactPaths;

pub async fn cmd_fix(settings: &Settings, options: FixOptions) -> anyhow::Result<()> {
    let artifacts = ArtifactPaths::new(&settings.paths.output_dir);
    println!(
        "{} Deciding remediation from {}",
        info(),
        artifacts.diff_json().display()
    );

    let fetcher = HttpFetcher::new(
        settings.extract.request_timeout(),
        settings.extract.user_agent.as_deref(),
    )
    .context("cannot create HTTP client")?;

    let cancel = CancelFlag::new();
    cancel.cancel_on_ctrl_c();

    let workers = options.workers.unwrap_or(settings.extract.workers).max(1);
    let (event_tx, mut event_rx) = mpsc::channel::<ExtractionEvent>(100);

    // The job count is only known inside the pipeline, so the bar grows as jobs start.
    let event_handler = tokio::spawn(async move {
        let mut display: Option<ExtractionProgress> = None;
        let mut started = 0u64;
        let mut extracted = 0usize;
        let mut failed = 0usize;

        while let Some(event) = event_rx.recv().await {
            let progress = display.get_or_insert_with(|| ExtractionProgress::new(workers, 0));
            match event {
                ExtractionEvent::Started { worker_id, url } => {
                    started += 1;
                    progress.set_length(started);
                    progress.start(worker_id, &url);
                }
                ExtractionEvent::Completed { worker_id, .. } => {
                    extracted += 1;
                    progress.finish_one(worker_id, extracted, failed);
                }
                ExtractionEvent::Failed {
                    worker_id,
                    url,
                    error: message,
                } => {
                    failed += 1;
                    progress.println(&format!("{} {}: {}", error(), url, message));
                    progress.finish_one(worker_id, extracted, failed);
                }
            }
        }

        if let Some(progress) = display {
            progress.finish();
        }
    });

    let result = run_fix(
        settings,
        &options,
        Arc::new(fetcher),
        &cancel,
        Some(event_tx),
    )
    .await;
    let _ = event_handler.await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(PipelineError::Cancelled) => {
            anyhow::bail!(
                "fix cancelled; rerun to resume from {}",
                artifacts.checkpoint().display()
            )
        }
        Err(e) => return Err(e).context("fix failed"),
    };

    let c = &outcome.report.counts;
    println!(
        "{} {} actions: {} recreate, {} redirect, {} noindex, {} skip",
        success(),
        c.total(),
        c.recreated,
        c.redirected,
        c.noindexed,
        c.skipped
    );
    if !options.skip_extraction {
        println!(
            "  {} Content: {} imported ({} reused), {} failed",
            dim_arrow(),
            c.content_imported,
            outcome.content_reused,
            c.content_failed
        );
    }
    if outcome.content_deferred > 0 {
        println!(
            "{} {} extractions deferred by the request ceiling; rerun to continue",
            warn(),
            outcome.content_deferred
        );
    }
    if c.skipped > 0 {
        println!(
            "{} {} URLs need manual classification",
            warn(),
            c.skipped
        );
    }
    println!(
        "  {} Redirect map: {} rules ({} new)",
        dim_arrow(),
        outcome.redirects_total,
        outcome.redirects_added
    );
    println!(
        "  {} Reports: {}, {}",
        dim_arrow(),
        artifacts.fix_json().display(),
        artifacts.fix_markdown().display()
    );

    Ok(())
}
