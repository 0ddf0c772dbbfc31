//! # parkwiz-cli — Command-Line Host
//!
//! A thin host around the engine. It renders nothing itself: every command
//! builds engine objects, feeds them input, and prints what they report.
//!
//! ## Subcommands
//!
//! - `parkwiz score <password>` — strength level and the criteria met.
//! - `parkwiz flows` — the pages the engine knows, with steps and fields.
//! - `parkwiz replay <script.yaml>` — run a scripted session against the
//!   in-memory backend and print one snapshot per intent.
//!
//! ```bash
//! parkwiz score 'Abcdefg1!' --json
//! parkwiz -v replay demos/password_reset.yaml
//! ```

pub mod flows;
pub mod replay;
pub mod score;

use std::path::Path;

use anyhow::{Context, Result};

use parkwiz_core::EngineConfig;

/// Load configuration from `path` if given, otherwise from `PARKWIZ_*`
/// environment variables.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EngineConfig::from_env().context("reading PARKWIZ_* environment variables")?,
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}
