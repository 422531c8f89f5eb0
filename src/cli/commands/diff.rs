//! `parity diff`.

use std::path::Path;

use anyhow::Context;

use crate::cli::icons::{dim_arrow, info, success, warn};
use crate::config::Settings;
use crate::pipeline::run_diff;

pub fn cmd_diff(
    settings: &Settings,
    production: Option<&Path>,
    local: Option<&Path>,
) -> anyhow::Result<()> {
    let production = production.unwrap_or(&settings.paths.production_inventory);
    let local = local.unwrap_or(&settings.paths.local_inventory);

    println!(
        "{} Diffing {} against {}",
        info(),
        production.display(),
        local.display()
    );

    let outcome = run_diff(settings, production, local).context("diff failed")?;
    let s = &outcome.report.summary;

    println!(
        "{} {} production URLs, {} local ({} matched literally, {} by template)",
        success(),
        s.production_total,
        s.local_total,
        s.matched_literal_count,
        s.matched_template_count
    );
    println!("  {} Missing: {}", dim_arrow(), s.missing_count);
    println!("  {} Extra: {}", dim_arrow(), s.extra_count);

    for note in &outcome.report.changed {
        println!("{} {}", warn(), note.message);
    }

    println!(
        "  {} Reports: {}, {}",
        dim_arrow(),
        outcome.json_path.display(),
        outcome.markdown_path.display()
    );

    Ok(())
}
