//! `.bbl` bibliography extraction and cleanup.
//!
//! BibTeX writes the formatted reference list as LaTeX markup:
//!
//! ```text
//! \begin{thebibliography}{1}
//!
//! \bibitem{enArticle1}
//! I.~Yamada, ``Title1,'' {\em Japanese
//!   Journal}, vol.~15, pp.~20--30, 2019.
//!
//! \end{thebibliography}
//! ```
//!
//! This module turns that block into plain text suitable for a word
//! processor: `[1]\tI. Yamada, “Title1,” Japanese Journal, vol. 15, pp. 20—30, 2019.`

use crate::auxfile::KeyNumberMap;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

const BEGIN_MARKER: &str = "\\bibitem";
const END_MARKER: &str = "\\end{thebibliography}";

/// Argument text allowing two levels of nested `{...}`, as in
/// `{\em Proc. {IEEE} Conf.}`.
const BRACED: &str = r"((?:[^{}]|\{(?:[^{}]|\{[^{}]*\})*\})*)";

/// Cleanup substitutions, applied in this order. Later rules rely on
/// earlier ones: `{\em ...}` only matches once soft-wrapped lines are joined.
///
/// The rules run on entry text only, never on `\bibitem{key}` markers, so
/// keys such as `smith--2020` still find their number.
static CLEANUP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // BibTeX soft-wraps long lines with a two-space indent
        (r"\n  ".to_string(), " "),
        (format!(r"\{{\\em {}\}}", BRACED), "$1"),
        (format!(r"\\emph\{{{}\}}", BRACED), "$1"),
        (format!(r"\\BIBforeignlanguage\{{{}\}}\{{{}\}}", BRACED, BRACED), "$2"),
        (r"~".to_string(), " "),
        (r"--".to_string(), "\u{2014}"),
        (r"``".to_string(), "\u{201C}"),
        (r"''".to_string(), "\u{201D}"),
        (r"\n{2,}".to_string(), "\n"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(&pattern).expect("valid cleanup regex"),
            replacement,
        )
    })
    .collect()
});

static BIBITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\bibitem(?:\[[^\]]*\])?\{([^{}]*)\}[ \t]*\n?").expect("valid bibitem regex")
});

/// Errors that can occur when reading a `.bbl` file.
#[derive(Error, Debug)]
pub enum BblError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No \\bibitem found: the .bbl file contains no bibliography entries")]
    BibliographyBlockNotFound,
}

/// One reference of the formatted bibliography.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographyEntry {
    /// Citation key from `\bibitem{key}`.
    pub key: String,
    /// Number assigned by `\bibcite`, `None` when the key was not in the aux file.
    pub number: Option<u32>,
    /// Cleaned reference text, ending with a single newline.
    pub text: String,
}

impl BibliographyEntry {
    fn render(&self) -> String {
        match self.number {
            Some(n) => format!("[{}]\t{}", n, self.text),
            None => format!("{}{{{}}}\n{}", BEGIN_MARKER, self.key, self.text),
        }
    }
}

/// The cleaned bibliography, numbered entries first in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bibliography {
    entries: Vec<BibliographyEntry>,
}

impl Bibliography {
    pub fn entries(&self) -> &[BibliographyEntry] {
        &self.entries
    }

    /// Plain text of the whole block: `[n]\t<text>\n` per entry.
    pub fn text(&self) -> String {
        self.entries.iter().map(BibliographyEntry::render).collect()
    }
}

/// Loads a `.bbl` file and normalizes its bibliography block.
pub fn load_bbl(path: &Path, bibcite: &KeyNumberMap) -> Result<Bibliography, BblError> {
    let content = fs::read_to_string(path)?;
    normalize_bibliography(&content, bibcite)
}

/// Returns the raw block from the first `\bibitem` line up to, not including,
/// the `\end{thebibliography}` line. Without an end line the block runs to
/// the end of the input.
pub fn extract_block(bbl: &str) -> Result<String, BblError> {
    let lines: Vec<&str> = bbl.split_inclusive('\n').collect();

    let begin = lines
        .iter()
        .position(|line| line.starts_with(BEGIN_MARKER))
        .ok_or(BblError::BibliographyBlockNotFound)?;
    let end = lines[begin..]
        .iter()
        .position(|line| line.starts_with(END_MARKER))
        .map_or(lines.len(), |offset| begin + offset);

    Ok(lines[begin..end].concat().replace("\r\n", "\n"))
}

/// Applies the cleanup rules to raw bibliography text.
///
/// # Examples
///
/// ```
/// use auxcite::bbl::cleanup;
///
/// assert_eq!(cleanup("pp.~20--30, {\\em Nature}"), "pp. 20\u{2014}30, Nature");
/// ```
pub fn cleanup(text: &str) -> String {
    CLEANUP_RULES
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

/// Extracts, cleans, and numbers the bibliography block of a `.bbl` file.
///
/// Each `\bibitem{key}` whose key is in `bibcite` becomes `[n]\t`. Keys of
/// `bibcite` with no `\bibitem` are skipped.
pub fn normalize_bibliography(
    bbl: &str,
    bibcite: &KeyNumberMap,
) -> Result<Bibliography, BblError> {
    let text = extract_block(bbl)?;

    // Markers are found on the raw block; only entry bodies are cleaned.
    let markers: Vec<(String, usize, usize)> = BIBITEM
        .captures_iter(&text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let key = cap.get(1)?;
            Some((key.as_str().to_string(), whole.start(), whole.end()))
        })
        .collect();

    let mut numbered = Vec::new();
    let mut unnumbered = Vec::new();

    for (i, (key, _, body_start)) in markers.iter().enumerate() {
        let body_end = markers
            .get(i + 1)
            .map_or(text.len(), |(_, next_start, _)| *next_start);
        let body = cleanup(&text[*body_start..body_end]);
        let body = body.trim_start_matches(&[' ', '\t'][..]).trim_end_matches('\n');

        let entry = BibliographyEntry {
            key: key.clone(),
            number: bibcite.get(key).copied(),
            text: format!("{}\n", body),
        };

        if entry.number.is_some() {
            numbered.push(entry);
        } else {
            warn!("\\bibitem{{{}}} has no \\bibcite number; left unnumbered", key);
            unnumbered.push(entry);
        }
    }

    numbered.sort_by_key(|entry| entry.number);
    debug!(
        numbered = numbered.len(),
        unnumbered = unnumbered.len(),
        "normalized bibliography"
    );

    numbered.extend(unnumbered);
    Ok(Bibliography { entries: numbered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn bibcite(pairs: &[(&str, u32)]) -> KeyNumberMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    // Output of bibtex with the ieeetr style for one article
    const SINGLE_BBL: &str = "\\begin{thebibliography}{1}\n\
\n\
\\bibitem{enArticle1}\n\
I.~Yamada, J.~Yamada, S.~Yamada, and S.~Yamada, ``Title1,'' {\\em Japanese\n  \
Journal}, vol.~15, pp.~20--30, march 2019.\n\
\n\
\\end{thebibliography}\n";

    const MULTI_BBL: &str = "\\begin{thebibliography}{3}\n\
\n\
\\bibitem{enArticle1}\n\
I.~Yamada, ``Title1,'' {\\em Japanese Journal}, 2019.\n\
\n\
\\bibitem{enArticle3}\n\
S.~Suzuki, ``Title3,'' \\emph{Journal of\n  \
Tests}, pp.~1--10, 2021.\n\
\n\
\\bibitem{jaBook2}\n\
\\BIBforeignlanguage{japanese}{Taro Sato}, {\\em Book}, 2020.\n\
\n\
\\end{thebibliography}\n";

    // ===========================================
    // Tests for extract_block
    // ===========================================

    #[test]
    fn test_extract_block_bounds() {
        let block = extract_block(SINGLE_BBL).unwrap();
        assert!(block.starts_with("\\bibitem{enArticle1}\n"));
        assert!(!block.contains("thebibliography"));
        assert!(block.ends_with("march 2019.\n\n"));
    }

    #[test]
    fn test_extract_block_missing_end_runs_to_eof() {
        let block = extract_block("\\bibitem{a}\nText.\n").unwrap();
        assert_eq!(block, "\\bibitem{a}\nText.\n");
    }

    #[test]
    fn test_extract_block_not_found() {
        // Given: a bbl with an empty thebibliography environment
        let bbl = "\\begin{thebibliography}{1}\n\n\\end{thebibliography}\n";

        // When: we extract the block
        let result = extract_block(bbl);

        // Then: BibliographyBlockNotFound
        assert!(matches!(result, Err(BblError::BibliographyBlockNotFound)));
    }

    // ===========================================
    // Tests for cleanup
    // ===========================================

    #[test]
    fn test_cleanup_soft_wrap() {
        assert_eq!(cleanup("Japanese\n  Journal"), "Japanese Journal");
    }

    #[test]
    fn test_cleanup_emphasis_across_wrap() {
        // Rule order matters: the wrap is joined before {\em ...} is stripped
        assert_eq!(cleanup("{\\em Japanese\n  Journal}"), "Japanese Journal");
    }

    #[test]
    fn test_cleanup_two_emphases_on_one_line() {
        assert_eq!(cleanup("{\\em A}, and {\\em B}"), "A, and B");
    }

    #[test]
    fn test_cleanup_emph_command() {
        assert_eq!(cleanup("\\emph{Title}, 2020"), "Title, 2020");
    }

    #[test]
    fn test_cleanup_foreign_language_keeps_second_argument() {
        assert_eq!(
            cleanup("\\BIBforeignlanguage{english}{Some Title}."),
            "Some Title."
        );
    }

    #[test]
    fn test_cleanup_emphasis_with_protected_braces() {
        // Given: case-protection braces inside the emphasized title
        let text = "A. Author, {\\em Proc. {IEEE} Conf.}, 2020.";

        // When: we clean it
        // Then: the inner braces stay where they were
        assert_eq!(cleanup(text), "A. Author, Proc. {IEEE} Conf., 2020.");
    }

    #[test]
    fn test_cleanup_emph_with_protected_braces() {
        assert_eq!(
            cleanup("\\emph{On {B}ayesian {N}ets}, 2019"),
            "On {B}ayesian {N}ets, 2019"
        );
        assert_eq!(cleanup("\\emph{The {{LaTeX}} book}"), "The {{LaTeX}} book");
    }

    #[test]
    fn test_cleanup_foreign_language_with_protected_braces() {
        assert_eq!(
            cleanup("\\BIBforeignlanguage{english}{Title of {IEEE} paper}."),
            "Title of {IEEE} paper."
        );
    }

    #[test]
    fn test_cleanup_ties_dashes_quotes() {
        assert_eq!(
            cleanup("vol.~15, pp.~20--30, ``Title,''"),
            "vol. 15, pp. 20\u{2014}30, \u{201C}Title,\u{201D}"
        );
    }

    #[test]
    fn test_cleanup_blank_lines() {
        assert_eq!(cleanup("a\n\nb\n\n\nc\n"), "a\nb\nc\n");
    }

    // ===========================================
    // Tests for normalize_bibliography
    // ===========================================

    #[test]
    fn test_normalize_single_entry() {
        // Given: the bbl of a single cited article
        let map = bibcite(&[("enArticle1", 1)]);

        // When: we normalize it
        let bib = normalize_bibliography(SINGLE_BBL, &map).unwrap();

        // Then: the text is plain and numbered
        assert_eq!(
            bib.text(),
            "[1]\tI. Yamada, J. Yamada, S. Yamada, and S. Yamada, \u{201C}Title1,\u{201D} \
             Japanese Journal, vol. 15, pp. 20\u{2014}30, march 2019.\n"
        );
    }

    #[test]
    fn test_normalize_multiple_entries() {
        let map = bibcite(&[("enArticle1", 1), ("enArticle3", 2), ("jaBook2", 3)]);

        let bib = normalize_bibliography(MULTI_BBL, &map).unwrap();

        assert_eq!(
            bib.text(),
            "[1]\tI. Yamada, \u{201C}Title1,\u{201D} Japanese Journal, 2019.\n\
             [2]\tS. Suzuki, \u{201C}Title3,\u{201D} Journal of Tests, pp. 1\u{2014}10, 2021.\n\
             [3]\tTaro Sato, Book, 2020.\n"
        );
        let keys: Vec<&str> = bib.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["enArticle1", "enArticle3", "jaBook2"]);
    }

    #[test]
    fn test_normalize_orders_by_number() {
        // Given: bibitems written in an order different from their numbers
        let map = bibcite(&[("enArticle1", 3), ("enArticle3", 1), ("jaBook2", 2)]);

        // When: we normalize
        let bib = normalize_bibliography(MULTI_BBL, &map).unwrap();

        // Then: entries come out by ascending number
        let numbers: Vec<Option<u32>> = bib.entries().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
        assert!(bib.text().starts_with("[1]\tS. Suzuki"));
    }

    #[test]
    fn test_normalize_distinct_markers_for_every_key() {
        let map = bibcite(&[("enArticle1", 1), ("enArticle3", 2), ("jaBook2", 3)]);

        let text = normalize_bibliography(MULTI_BBL, &map).unwrap().text();

        let markers: HashSet<String> = map.values().map(|n| format!("[{}]\t", n)).collect();
        assert_eq!(markers.len(), map.len());
        for marker in &markers {
            assert_eq!(text.matches(marker.as_str()).count(), 1, "marker {}", marker);
        }
        assert!(!text.contains("\\bibitem"));
    }

    #[test]
    fn test_normalize_skips_keys_without_bibitem() {
        let map = bibcite(&[("enArticle1", 1), ("uncited", 7)]);
        let bib = normalize_bibliography(SINGLE_BBL, &map).unwrap();
        assert_eq!(bib.entries().len(), 1);
        assert!(!bib.text().contains("[7]"));
    }

    #[test]
    fn test_normalize_keeps_unknown_bibitem_unnumbered_at_end() {
        let map = bibcite(&[("enArticle3", 1)]);

        let bib = normalize_bibliography(MULTI_BBL, &map).unwrap();

        let entries = bib.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, "enArticle3");
        assert_eq!(entries[1].number, None);
        assert!(bib.text().contains("\\bibitem{enArticle1}\nI. Yamada"));
    }

    #[test]
    fn test_normalize_key_with_cleanup_characters() {
        // Given: keys that contain characters the cleanup rules rewrite
        let bbl = "\\bibitem{smith--2020}\nJ.~Smith, Paper.\n\n\\bibitem{o''brien~a}\nP. O'Brien, Book.\n\\end{thebibliography}\n";
        let map = bibcite(&[("smith--2020", 1), ("o''brien~a", 2)]);

        // When: we normalize
        let bib = normalize_bibliography(bbl, &map).unwrap();

        // Then: both keys keep their numbers; only the bodies are cleaned
        assert_eq!(bib.text(), "[1]\tJ. Smith, Paper.\n[2]\tP. O'Brien, Book.\n");
        assert_eq!(bib.entries()[0].key, "smith--2020");
    }

    #[test]
    fn test_normalize_nested_braces_in_entry() {
        let bbl = "\\bibitem{a}\nA. Author, {\\em Proc. {IEEE} Conf.}, 2020.\n\\end{thebibliography}\n";
        let bib = normalize_bibliography(bbl, &bibcite(&[("a", 1)])).unwrap();
        assert_eq!(bib.text(), "[1]\tA. Author, Proc. {IEEE} Conf., 2020.\n");
    }

    #[test]
    fn test_normalize_bibitem_with_label() {
        let bbl = "\\bibitem[Doe(2020)]{doe}\nJ. Doe, Paper.\n\\end{thebibliography}\n";
        let bib = normalize_bibliography(bbl, &bibcite(&[("doe", 4)])).unwrap();
        assert_eq!(bib.text(), "[4]\tJ. Doe, Paper.\n");
    }

    #[test]
    fn test_normalize_crlf_input() {
        let bbl = "\\bibitem{a}\r\nA. Author, Title.\r\n\r\n\\end{thebibliography}\r\n";
        let bib = normalize_bibliography(bbl, &bibcite(&[("a", 1)])).unwrap();
        assert_eq!(bib.text(), "[1]\tA. Author, Title.\n");
    }

    #[test]
    fn test_normalize_block_not_found() {
        let result = normalize_bibliography("", &KeyNumberMap::new());
        assert!(matches!(result, Err(BblError::BibliographyBlockNotFound)));
    }

    #[test]
    fn test_load_bbl_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SINGLE_BBL.as_bytes()).unwrap();
        file.flush().unwrap();

        let bib = load_bbl(file.path(), &bibcite(&[("enArticle1", 1)])).unwrap();
        assert_eq!(bib.entries().len(), 1);
    }

    #[test]
    fn test_load_bbl_file_not_found() {
        let result = load_bbl(Path::new("/nonexistent/wdbib.bbl"), &KeyNumberMap::new());
        assert!(matches!(result, Err(BblError::IoError(_))));
    }
}
