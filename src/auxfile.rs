//! `.aux` record parsing.
//!
//! LaTeX writes one record per line into the auxiliary file. Four of them
//! matter for citation resolution:
//!
//! - `\citation{key1,key2}`: one citation command and its key list
//! - `\bibstyle{ieeetr}`: the bibliography style
//! - `\bibdata{library}`: the bibliography database(s)
//! - `\bibcite{key}{3}`: the number BibTeX assigned to a key
//!
//! Everything else (`\relax`, `\gdef`, ...) is ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const CITATION_PREFIX: &str = "\\citation{";
const BIBSTYLE_PREFIX: &str = "\\bibstyle{";
const BIBDATA_PREFIX: &str = "\\bibdata{";
const BIBCITE_PREFIX: &str = "\\bibcite{";

/// Errors that can occur when reading an `.aux` file.
#[derive(Error, Debug)]
pub enum AuxError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {reason}: {content}")]
    MalformedRecord {
        line: usize,
        reason: &'static str,
        content: String,
    },
}

/// Mapping from a single citation key to its compiler-assigned number.
pub type KeyNumberMap = HashMap<String, u32>;

/// The key list of one citation command, kept as written (e.g. `"a,b,c"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CitationGroup(String);

impl CitationGroup {
    pub fn new(text: impl Into<String>) -> Self {
        CitationGroup(text.into())
    }

    /// The literal key list.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual keys, trimmed, in written order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.split(',').map(str::trim)
    }
}

impl std::fmt::Display for CitationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything extracted from one `.aux` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxData {
    /// One entry per `\citation` record, in file order, duplicates kept.
    pub citations: Vec<CitationGroup>,
    /// Last `\bibstyle` seen.
    pub bibstyle: Option<String>,
    /// Last `\bibdata` seen.
    pub bibdata: Option<String>,
    /// Key to number assignments from `\bibcite`; the last record for a key wins.
    pub bibcite: KeyNumberMap,
}

/// Loads and parses an `.aux` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains a malformed record.
pub fn load_aux(path: &Path) -> Result<AuxData, AuxError> {
    let content = fs::read_to_string(path)?;
    parse_aux(&content)
}

/// Parses the full text of an `.aux` file in a single pass.
///
/// # Examples
///
/// ```
/// use auxcite::parse_aux;
///
/// let aux = parse_aux("\\relax \n\\citation{a,b}\n\\bibcite{a}{1}\n\\bibcite{b}{2}\n").unwrap();
/// assert_eq!(aux.citations[0].as_str(), "a,b");
/// assert_eq!(aux.bibcite["b"], 2);
/// ```
pub fn parse_aux(content: &str) -> Result<AuxData, AuxError> {
    let mut data = AuxData::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_end();
        let line_num = index + 1;

        if let Some(rest) = line.strip_prefix(CITATION_PREFIX) {
            let keys = closing_brace(rest, line_num, line)?;
            data.citations.push(CitationGroup::new(keys));
        } else if let Some(rest) = line.strip_prefix(BIBSTYLE_PREFIX) {
            data.bibstyle = Some(closing_brace(rest, line_num, line)?.to_string());
        } else if let Some(rest) = line.strip_prefix(BIBDATA_PREFIX) {
            data.bibdata = Some(closing_brace(rest, line_num, line)?.to_string());
        } else if let Some(rest) = line.strip_prefix(BIBCITE_PREFIX) {
            let (key, number) = parse_bibcite(rest, line_num, line)?;
            data.bibcite.insert(key, number);
        }
    }

    debug!(
        citations = data.citations.len(),
        bibcite = data.bibcite.len(),
        "parsed aux records"
    );

    Ok(data)
}

/// Strips the final `}` of a single-argument record.
fn closing_brace<'a>(rest: &'a str, line: usize, content: &str) -> Result<&'a str, AuxError> {
    rest.strip_suffix('}')
        .ok_or_else(|| malformed(line, "missing closing brace", content))
}

/// Splits `key}{number}` into its parts.
fn parse_bibcite(rest: &str, line: usize, content: &str) -> Result<(String, u32), AuxError> {
    let payload = closing_brace(rest, line, content)?;
    let (key, number) = payload
        .split_once("}{")
        .ok_or_else(|| malformed(line, "missing '}{' separator", content))?;

    if key.is_empty() {
        return Err(malformed(line, "empty citation key", content));
    }

    let number: u32 = number
        .trim()
        .parse()
        .map_err(|_| malformed(line, "citation number is not an integer", content))?;
    if number == 0 {
        return Err(malformed(line, "citation number must be positive", content));
    }

    Ok((key.to_string(), number))
}

fn malformed(line: usize, reason: &'static str, content: &str) -> AuxError {
    AuxError::MalformedRecord {
        line,
        reason,
        content: content.to_string(),
    }
}
