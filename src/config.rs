//! Engine configuration.
//!
//! Settings come from three places, later ones overriding earlier ones:
//! built-in defaults, a JSON config file, and a LaTeX preamble. The CLI
//! applies its own flags last.

use crate::conversion::{CitationMode, UnresolvedPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static USEPACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\usepackage\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}").expect("valid usepackage regex")
});

static RENEW_CITE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\renewcommand\s*\{?\\cite(left|right)\}?\s*\{([^}]*)\}")
        .expect("valid renewcommand regex")
});

/// Errors that can occur when loading a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Settings for one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Text placed before the citation numbers.
    pub cite_left: String,
    /// Text placed after the citation numbers.
    pub cite_right: String,
    pub mode: CitationMode,
    pub on_unresolved: UnresolvedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cite_left: "[".to_string(),
            cite_right: "]".to_string(),
            mode: CitationMode::Native,
            on_unresolved: UnresolvedPolicy::Abort,
        }
    }
}

impl EngineConfig {
    /// Updates the settings from a LaTeX preamble.
    ///
    /// - `\usepackage{cite}` (with or without options) switches a native
    ///   configuration to compact mode
    /// - `\renewcommand\citeleft{(}` and `\renewcommand\citeright{)}` set the delimiters
    ///
    /// Lines starting with `%` are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use auxcite::{CitationMode, EngineConfig};
    ///
    /// let mut config = EngineConfig::default();
    /// config.apply_preamble("\\documentclass{article}\n\\usepackage{cite}\n\\renewcommand\\citeleft{(}\n");
    /// assert_eq!(config.mode, CitationMode::compact());
    /// assert_eq!(config.cite_left, "(");
    /// ```
    pub fn apply_preamble(&mut self, preamble: &str) {
        for line in preamble.lines() {
            let line = line.trim();
            if line.starts_with('%') {
                continue;
            }

            for cap in USEPACKAGE.captures_iter(line) {
                let uses_cite = cap[1].split(',').any(|pkg| pkg.trim() == "cite");
                if uses_cite && self.mode == CitationMode::Native {
                    debug!("preamble loads the cite package, using compact mode");
                    self.mode = CitationMode::compact();
                }
            }

            for cap in RENEW_CITE_DELIMITER.captures_iter(line) {
                let value = cap[2].to_string();
                match &cap[1] {
                    "left" => self.cite_left = value,
                    _ => self.cite_right = value,
                }
            }
        }
    }
}

/// Loads an [`EngineConfig`] from a JSON file. Missing fields keep their defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses an [`EngineConfig`] from JSON text.
pub fn parse_config(json: &str) -> Result<EngineConfig, ConfigError> {
    Ok(serde_json::from_str(json)?)
}
