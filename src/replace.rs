//! Replacement rules for the document.
//!
//! Every entry of the conversion table becomes a rule matching exactly one
//! `\cite{...}` command. The `\thebibliography` marker is not a rule: the
//! whole bibliography block replaces it in one go.

use crate::conversion::ConversionTable;
use regex::{NoExpand, Regex};
use serde::Serialize;
use std::borrow::Cow;

/// Literal substring identifying the bibliography placeholder.
pub const BIBLIOGRAPHY_MARKER: &str = "thebibliography";

/// A search pattern and the text that replaces each match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementRule {
    /// Escaped regular expression matching one citation command, e.g. `\\cite\{a,b\}`.
    pub pattern: String,
    /// Delimited citation numbers, e.g. `[1,2]`.
    pub replacement: String,
}

impl ReplacementRule {
    /// Applies this rule to `text`. The replacement is inserted literally.
    pub fn apply<'t>(&self, text: &'t str) -> Result<Cow<'t, str>, regex::Error> {
        let re = Regex::new(&self.pattern)?;
        Ok(re.replace_all(text, NoExpand(&self.replacement)))
    }
}

/// Builds one rule per conversion table entry.
///
/// # Examples
///
/// ```
/// use auxcite::{build_conversion_table, build_replacement_rules, CitationGroup, CitationMode, UnresolvedPolicy};
/// use std::collections::HashMap;
///
/// let bibcite: HashMap<String, u32> = [("a".to_string(), 1)].into();
/// let groups = vec![CitationGroup::new("a")];
/// let table = build_conversion_table(&groups, &bibcite, &CitationMode::Native, UnresolvedPolicy::Abort).unwrap();
///
/// let rules = build_replacement_rules(&table, "[", "]");
/// assert_eq!(rules[0].pattern, r"\\cite\{a\}");
/// assert_eq!(rules[0].replacement, "[1]");
/// ```
pub fn build_replacement_rules(
    table: &ConversionTable,
    left: &str,
    right: &str,
) -> Vec<ReplacementRule> {
    table
        .iter()
        .filter(|(group, _)| !group.contains(BIBLIOGRAPHY_MARKER))
        .map(|(group, rendered)| ReplacementRule {
            pattern: regex::escape(&format!("\\cite{{{}}}", group)),
            replacement: format!("{}{}{}", left, rendered, right),
        })
        .collect()
}

/// Applies every rule to a plain-text document, then substitutes the
/// `\thebibliography` placeholder with the bibliography text when given.
///
/// # Returns
///
/// The rewritten document.
pub fn apply_rules(
    document: &str,
    rules: &[ReplacementRule],
    bibliography: Option<&str>,
) -> Result<String, regex::Error> {
    let mut result = document.to_string();

    for rule in rules {
        result = rule.apply(&result)?.into_owned();
    }

    if let Some(bib) = bibliography {
        let placeholder = format!("\\{}", BIBLIOGRAPHY_MARKER);
        // A placeholder alone on its line takes the line break with it;
        // the bibliography text already ends with one.
        result = result
            .replace(&format!("{}\n", placeholder), bib)
            .replace(&placeholder, bib);
    }

    Ok(result)
}
