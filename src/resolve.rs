//! One compile cycle, from `.aux`/`.bbl` text to document replacements.
//!
//! This module orchestrates the parser, the conversion table, the
//! replacement rules and the bibliography normalizer. Every call starts
//! from scratch; nothing is carried over between cycles.

use crate::auxfile::{parse_aux, AuxData, AuxError, CitationGroup};
use crate::bbl::{normalize_bibliography, BblError, Bibliography};
use crate::config::EngineConfig;
use crate::conversion::{
    build_conversion_table, extract_citation_groups, ConversionError, ConversionTable,
};
use crate::replace::{apply_rules, build_replacement_rules, ReplacementRule};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while resolving citations.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Aux(#[from] AuxError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Bibliography(#[from] BblError),

    #[error("Invalid replacement pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Everything derived from one compile.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Parsed `.aux` records.
    pub aux: AuxData,
    /// `\cite{...}` groups found in the document text, in order.
    pub context_groups: Vec<CitationGroup>,
    pub table: ConversionTable,
    pub rules: Vec<ReplacementRule>,
    /// Cleaned bibliography, when a `.bbl` was given.
    pub bibliography: Option<Bibliography>,
}

impl Resolution {
    /// Rewrites a plain-text document: citation commands become numbers and
    /// the `\thebibliography` placeholder becomes the bibliography.
    pub fn apply(&self, document: &str) -> Result<String, ResolveError> {
        let bib_text = self.bibliography.as_ref().map(Bibliography::text);
        Ok(apply_rules(document, &self.rules, bib_text.as_deref())?)
    }
}

/// Resolves the citations of one compile.
///
/// # Arguments
///
/// * `aux_text` - Contents of the `.aux` file
/// * `context` - Document text whose `\cite{...}` commands are resolved too
/// * `bbl_text` - Contents of the `.bbl` file, if the bibliography is wanted
/// * `config` - Rendering settings
///
/// # Examples
///
/// ```
/// use auxcite::{resolve, EngineConfig};
///
/// let aux = "\\citation{a,b}\n\\bibcite{a}{1}\n\\bibcite{b}{2}\n";
/// let resolution = resolve(aux, Some("See \\cite{b,a}."), None, &EngineConfig::default()).unwrap();
/// assert_eq!(resolution.apply("See \\cite{b,a}.").unwrap(), "See [2,1].");
/// ```
pub fn resolve(
    aux_text: &str,
    context: Option<&str>,
    bbl_text: Option<&str>,
    config: &EngineConfig,
) -> Result<Resolution, ResolveError> {
    let aux = parse_aux(aux_text)?;
    let context_groups = context.map(extract_citation_groups).unwrap_or_default();

    let table = build_conversion_table(
        aux.citations.iter().chain(&context_groups),
        &aux.bibcite,
        &config.mode,
        config.on_unresolved,
    )?;
    let rules = build_replacement_rules(&table, &config.cite_left, &config.cite_right);

    let bibliography = bbl_text
        .map(|bbl| normalize_bibliography(bbl, &aux.bibcite))
        .transpose()?;

    info!(
        groups = table.len(),
        rules = rules.len(),
        references = bibliography.as_ref().map_or(0, |b| b.entries().len()),
        "resolved citations"
    );

    Ok(Resolution {
        aux,
        context_groups,
        table,
        rules,
        bibliography,
    })
}
