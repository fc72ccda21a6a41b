//! Write a default settings file.

use std::path::PathBuf;

use pursuit_common::config::{config_file_path, Settings};

pub fn run(output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = output.clone().unwrap_or_else(config_file_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let settings = Settings::default();
    match output {
        Some(path) => settings.save_to(&path),
        None => settings.save(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to write settings: {e}"))?;

    println!("Settings written to {}", path.display());
    println!("Edit the \"tracking\" section to tune gains, dead zone, and speed limit.");

    Ok(())
}
