use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::{EUC_JP, Encoding, UTF_8};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_ENCODING: &str = "EUC-JP";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConvertConfig {
    #[serde(default)]
    pub convert: ConvertSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConvertSection {
    pub source_encoding: Option<String>,
    pub preserve_raw_copy_mtime: Option<bool>,
}

/// Resolved settings handed to every transcoder.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub encoding: &'static Encoding,
    pub preserve_raw_copy_mtime: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            encoding: EUC_JP,
            preserve_raw_copy_mtime: true,
        }
    }
}

impl ConvertConfig {
    /// Resolve labels and defaults into [`ConvertOptions`].
    pub fn resolve(&self) -> Result<ConvertOptions> {
        let label = self
            .convert
            .source_encoding
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(DEFAULT_SOURCE_ENCODING);
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| anyhow::anyhow!("unknown source encoding `{label}`"))?;
        if encoding == UTF_8 {
            bail!("source encoding `{label}` is already UTF-8; nothing to convert");
        }
        Ok(ConvertOptions {
            encoding,
            preserve_raw_copy_mtime: self.convert.preserve_raw_copy_mtime.unwrap_or(true),
        })
    }
}

/// Load and parse a ConvertConfig from a TOML file.
pub fn load_config(config_path: &Path) -> Result<ConvertConfig> {
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ConvertConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Options for an optional config path; defaults when none was given.
pub fn resolve_options(config_path: Option<&Path>) -> Result<ConvertOptions> {
    match config_path {
        Some(path) => load_config(path)?.resolve(),
        None => ConvertConfig::default().resolve(),
    }
}
