//! Validate settings and show what the pipeline would run with.

use std::path::Path;

use pursuit_common::config::{config_file_path, Settings};
use pursuit_control::CoordinateMapper;

pub fn run(settings: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    println!("Pursuit Settings Check");
    println!("{}", "=".repeat(50));

    match path {
        Some(path) => println!("[OK] Loaded: {}", path.display()),
        None => {
            let default_path = config_file_path();
            if default_path.exists() {
                println!("[OK] Loaded: {}", default_path.display());
            } else {
                println!("[WARN] No file at {}; using defaults", default_path.display());
            }
        }
    }

    // Loading already validated; defaults go through the same check.
    settings.tracking.validate()?;
    println!("[OK] Tracking configuration valid");

    let tracking = &settings.tracking;
    let mapper = CoordinateMapper::from_config(tracking);
    let (sx, sy) = mapper.scale_factors();
    println!(
        "     Region {}x{} at ({}, {})",
        tracking.region.width, tracking.region.height, tracking.region.left, tracking.region.top
    );
    println!(
        "     Frame {}x{} (scale {:.3} x {:.3})",
        tracking.frame_width, tracking.frame_height, sx, sy
    );
    println!(
        "     Gains kp={} kd={} alpha={}",
        tracking.kp, tracking.kd, tracking.alpha
    );
    println!(
        "     Dead zone {} px, max speed {} px/tick",
        tracking.dead_zone, tracking.max_speed
    );

    println!();
    println!("{}", serde_json::to_string_pretty(settings)?);

    Ok(())
}
