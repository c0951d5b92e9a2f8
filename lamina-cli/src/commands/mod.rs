pub mod describe;
pub mod simulate;

use anyhow::{bail, Context, Result};
use lamina_core::config::LaminaConfig;
use lamina_core::logging::init_logging;
use std::path::Path;

/// Load and validate a configuration file, then install the logger it describes
fn load_config(path: &Path) -> Result<LaminaConfig> {
    if !path.exists() {
        bail!("config file {} does not exist", path.display());
    }
    let config = LaminaConfig::load_from(path)?;
    config.validate().with_context(|| format!("invalid config {}", path.display()))?;
    init_logging(&config.logging)?;
    Ok(config)
}
