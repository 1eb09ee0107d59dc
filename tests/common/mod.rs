//! Shared test constants and helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

/// `.aux` file written by latex + bibtex + latex + latex for a document with
/// three `\cite` commands, one of them grouping two keys.
pub const SAMPLE_AUX: &str = "\\relax \n\
\\bibstyle{ieeetr}\n\
\\citation{enArticle1}\n\
\\citation{enArticle2}\n\
\\citation{enArticle1,enArticle3}\n\
\\bibdata{library}\n\
\\bibcite{enArticle1}{1}\n\
\\bibcite{enArticle2}{2}\n\
\\bibcite{enArticle3}{3}\n\
\\gdef \\@abspage@last{1}\n";

/// Matching `.bbl` file in the ieeetr style, with a soft-wrapped line.
pub const SAMPLE_BBL: &str = "\\begin{thebibliography}{1}\n\
\n\
\\bibitem{enArticle1}\n\
I.~Yamada, J.~Yamada, S.~Yamada, and S.~Yamada, ``Title1,'' {\\em Japanese\n  \
Journal}, vol.~15, pp.~20--30, march 2019.\n\
\n\
\\bibitem{enArticle2}\n\
J.~Suzuki, ``Title2,'' {\\em Journal}, vol.~2, 2020.\n\
\n\
\\bibitem{enArticle3}\n\
\\BIBforeignlanguage{english}{K.~Sato}, ``Title3,'' 2021.\n\
\n\
\\end{thebibliography}\n";

/// Plain text expected from [`SAMPLE_BBL`].
pub const SAMPLE_BIBLIOGRAPHY: &str = "[1]\tI. Yamada, J. Yamada, S. Yamada, and S. Yamada, \
\u{201C}Title1,\u{201D} Japanese Journal, vol. 15, pp. 20\u{2014}30, march 2019.\n\
[2]\tJ. Suzuki, \u{201C}Title2,\u{201D} Journal, vol. 2, 2020.\n\
[3]\tK. Sato, \u{201C}Title3,\u{201D} 2021.\n";

/// Build an `.aux` file assigning numbers 1..=n to the given keys, in order.
pub fn build_aux(keys: &[&str]) -> String {
    keys.iter()
        .enumerate()
        .map(|(i, key)| format!("\\bibcite{{{}}}{{{}}}\n", key, i + 1))
        .collect()
}

/// Key to number map from `(key, number)` pairs.
pub fn key_numbers(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
