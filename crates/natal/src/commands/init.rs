use natal_core::Config;
use natal_telemetry::{atomic_write, Paths};

pub fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    if write_default_config(&paths, force)? {
        println!("✓ Wrote default configuration to {}", paths.config_file().display());
    } else {
        println!(
            "Configuration already exists at {} (use --force to overwrite)",
            paths.config_file().display()
        );
    }
    Ok(())
}

/// Returns `false` when a config exists and `force` is off
fn write_default_config(paths: &Paths, force: bool) -> anyhow::Result<bool> {
    let config_path = paths.config_file();
    if config_path.exists() && !force {
        return Ok(false);
    }

    std::fs::create_dir_all(&paths.data_dir)?;
    let json = serde_json::to_string_pretty(&Config::default())?;
    atomic_write(&config_path, json.as_bytes())?;
    Ok(true)
}
