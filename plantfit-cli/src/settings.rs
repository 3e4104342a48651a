//! Layered settings for the command line.
//!
//! Sources, lowest priority first: an optional TOML file, then environment
//! variables prefixed `PLANTFIT_` (`PLANTFIT_API_KEY`, `PLANTFIT_MAX_RETRIES`, ...).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use plantfit_llm::{ClientSettings, FitContext};

pub const ENV_PREFIX: &str = "PLANTFIT";

/// Load settings from `path` (if given) and the process environment.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings> {
    load_settings_with_env(path, None)
}

/// Like [`load_settings`], but reads variables from `env` instead of the
/// process environment when it is `Some`.
pub fn load_settings_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<ClientSettings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(env),
    );

    builder
        .build()
        .context("failed to load configuration")?
        .try_deserialize::<ClientSettings>()
        .context("invalid configuration")
}

/// Read a fit context from a JSON file.
pub fn load_fit_context(path: &Path) -> Result<FitContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid fit context in {}", path.display()))
}
