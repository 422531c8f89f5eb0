//! `parity config`.

use crate::cli::icons::dim_arrow;
use crate::config::Settings;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(settings: &Settings) -> anyhow::Result<()> {
    match settings.source_path {
        Some(ref path) => eprintln!("{} Loaded from {}", dim_arrow(), path.display()),
        None => eprintln!("{} No config file found; showing defaults", dim_arrow()),
    }
    print!("{}", settings.to_toml()?);
    Ok(())
}
