//! Conversion from citation key groups to rendered citation numbers.
//!
//! A group such as `b,a,c` is resolved through the `\bibcite` numbers and
//! rendered according to the configured [`CitationMode`]:
//!
//! - `Native` mimics plain LaTeX: `[2,1,3]`, original order, no ranges
//! - `Compact` mimics the `cite` package: `[1–3]`, sorted and compressed

use crate::auxfile::{CitationGroup, KeyNumberMap};
use crate::range::{compress, RunThreshold, EN_DASH};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static CITE_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\cite\{([^{}]*)\}").expect("valid cite regex"));

/// Errors that can occur while building the conversion table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Citation key '{key}' in \\cite{{{group}}} has no \\bibcite number")]
    UnresolvedCitationKey { key: String, group: String },
}

/// How a group of citation numbers is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CitationMode {
    /// Numbers in the order the keys were written, comma-joined.
    #[default]
    Native,
    /// Numbers sorted ascending, consecutive runs collapsed into ranges.
    Compact {
        #[serde(default)]
        min_run: RunThreshold,
        #[serde(default = "default_dash")]
        dash: char,
    },
}

fn default_dash() -> char {
    EN_DASH
}

impl CitationMode {
    /// Compact mode with the `cite` package defaults (runs of three, en dash).
    pub fn compact() -> Self {
        CitationMode::Compact {
            min_run: RunThreshold::Three,
            dash: EN_DASH,
        }
    }
}

/// What to do with a group whose keys are not all in the `\bibcite` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedPolicy {
    /// Fail the whole table with [`ConversionError::UnresolvedCitationKey`].
    #[default]
    Abort,
    /// Leave the group out of the table and record it in [`ConversionTable::skipped`].
    SkipGroup,
}

/// Rendered citation numbers keyed by the literal group text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionTable {
    entries: BTreeMap<String, String>,
    skipped: Vec<CitationGroup>,
}

impl ConversionTable {
    /// Rendered numbers for a group text, e.g. `get("a,b,c") == Some("1–3")`.
    pub fn get(&self, group: &str) -> Option<&str> {
        self.entries.get(group).map(String::as_str)
    }

    /// `(group text, rendered numbers)` pairs in group text order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups left out under [`UnresolvedPolicy::SkipGroup`], first occurrence only.
    pub fn skipped(&self) -> &[CitationGroup] {
        &self.skipped
    }
}

/// Resolves a single group to its rendered numbers.
///
/// # Examples
///
/// ```
/// use auxcite::{render_group, CitationGroup, CitationMode};
/// use std::collections::HashMap;
///
/// let bibcite: HashMap<String, u32> =
///     [("a", 1), ("b", 2), ("c", 3)].map(|(k, v)| (k.to_string(), v)).into();
/// let group = CitationGroup::new("c,a,b");
///
/// assert_eq!(render_group(&group, &bibcite, &CitationMode::Native).unwrap(), "3,1,2");
/// assert_eq!(render_group(&group, &bibcite, &CitationMode::compact()).unwrap(), "1\u{2013}3");
/// ```
pub fn render_group(
    group: &CitationGroup,
    bibcite: &KeyNumberMap,
    mode: &CitationMode,
) -> Result<String, ConversionError> {
    let mut nums = group
        .keys()
        .map(|key| {
            bibcite
                .get(key)
                .copied()
                .ok_or_else(|| ConversionError::UnresolvedCitationKey {
                    key: key.to_string(),
                    group: group.to_string(),
                })
        })
        .collect::<Result<Vec<u32>, _>>()?;

    let rendered = match *mode {
        CitationMode::Native => nums
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(","),
        CitationMode::Compact { min_run, dash } => {
            nums.sort_unstable();
            compress(&nums, min_run, dash)
        }
    };

    Ok(rendered)
}

/// Builds the conversion table for every group, one entry per unique group text.
pub fn build_conversion_table<'a, I>(
    groups: I,
    bibcite: &KeyNumberMap,
    mode: &CitationMode,
    policy: UnresolvedPolicy,
) -> Result<ConversionTable, ConversionError>
where
    I: IntoIterator<Item = &'a CitationGroup>,
{
    let mut table = ConversionTable::default();

    for group in groups {
        if table.entries.contains_key(group.as_str()) || table.skipped.contains(group) {
            continue;
        }

        match render_group(group, bibcite, mode) {
            Ok(rendered) => {
                table.entries.insert(group.as_str().to_string(), rendered);
            }
            Err(e) if policy == UnresolvedPolicy::SkipGroup => {
                warn!("skipping citation group: {}", e);
                table.skipped.push(group.clone());
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        entries = table.entries.len(),
        skipped = table.skipped.len(),
        "built conversion table"
    );

    Ok(table)
}

/// Finds every `\cite{...}` command in document text.
///
/// # Examples
///
/// ```
/// use auxcite::extract_citation_groups;
///
/// let groups = extract_citation_groups("Some citation \\cite{key}. Another \\cite{key1,key2}");
/// let texts: Vec<&str> = groups.iter().map(|g| g.as_str()).collect();
/// assert_eq!(texts, vec!["key", "key1,key2"]);
/// ```
pub fn extract_citation_groups(text: &str) -> Vec<CitationGroup> {
    CITE_COMMAND
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| CitationGroup::new(m.as_str()))
        .collect()
}
