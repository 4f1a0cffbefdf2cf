pub mod agents;
pub mod chat;
pub mod discover;

use hostagent_config::AppConfig;
use std::path::Path;

/// Load the config from `path`, or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}
