//! Multi-progress display for concurrent page extraction.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or(fallback)
}

/// A summary bar plus one status line per worker.
pub struct ExtractionProgress {
    multi: MultiProgress,
    summary_bar: ProgressBar,
    workers: Vec<ProgressBar>,
}

impl ExtractionProgress {
    pub fn new(num_workers: usize, total: u64) -> Self {
        let multi = MultiProgress::new();

        let summary_bar = multi.add(ProgressBar::new(total));
        summary_bar.set_style(
            style(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
                ProgressStyle::default_bar(),
            )
            .progress_chars("#>-"),
        );
        summary_bar.set_message("Extracting");

        let workers = (0..num_workers)
            .map(|_| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style(
                    "  {spinner:.dim} {wide_msg}",
                    ProgressStyle::default_spinner(),
                ));
                bar.set_message("idle");
                bar
            })
            .collect();

        Self {
            multi,
            summary_bar,
            workers,
        }
    }

    pub fn set_length(&self, total: u64) {
        self.summary_bar.set_length(total);
    }

    pub fn start(&self, worker_id: usize, url: &str) {
        if let Some(bar) = self.workers.get(worker_id) {
            bar.set_message(truncate_url(url, 60));
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
        }
    }

    pub fn finish_one(&self, worker_id: usize, extracted: usize, failed: usize) {
        if let Some(bar) = self.workers.get(worker_id) {
            bar.disable_steady_tick();
            bar.set_message("idle");
        }
        self.summary_bar.inc(1);
        self.summary_bar
            .set_message(format!("Extracted: {} | Failed: {}", extracted, failed));
    }

    /// Print above the bars without corrupting them.
    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }

    pub fn finish(&self) {
        for bar in &self.workers {
            bar.finish_and_clear();
        }
        self.summary_bar.finish_and_clear();
    }
}

/// Keep the tail of long URLs, which carries the distinguishing slug.
fn truncate_url(url: &str, max_chars: usize) -> String {
    let count = url.chars().count();
    if count <= max_chars {
        return url.to_string();
    }
    let tail: String = url.chars().skip(count - (max_chars - 1)).collect();
    format!("…{}", tail)
}
