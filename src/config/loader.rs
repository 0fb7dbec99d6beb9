use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::{debug, info};

use super::HarnessConfig;

pub const ENV_PREFIX: &str = "DAOS_TEST";

pub fn get_default_config() -> &'static str {
    include_str!("../../config/harness.toml")
}

/// Loads the harness configuration from `path`, layering `DAOS_TEST_*`
/// environment variables on top.
///
/// A missing file is created from the embedded default first. Nested keys use
/// `__` in variable names, e.g. `DAOS_TEST_LAUNCHER__PROGRAM`.
pub fn load_configuration(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        write_config_to(path, get_default_config()).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    let cfg = Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
        .build()
        .context("Could not build harness config")?;

    let harness: HarnessConfig = cfg.try_deserialize().context("Invalid harness configuration")?;
    debug!(
        path:% = path.display(),
        log_dir_base:% = harness.log_dir_base.display(),
        launcher = harness.launcher.program.as_str();
        "Loaded harness configuration"
    );
    Ok(harness)
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}
