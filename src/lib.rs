//! auxcite: resolve BibTeX citations for word-processor documents.
//!
//! This library provides functionality to:
//! - Parse `\citation`, `\bibstyle`, `\bibdata` and `\bibcite` records from `.aux` files
//! - Render citation groups as numbers, plain (`[3,1,2]`) or compressed (`[1–3]`)
//! - Turn the `.bbl` bibliography block into plain numbered text
//! - Build exact-match replacement rules for `\cite{...}` commands

pub mod auxfile;
pub mod bbl;
pub mod config;
pub mod conversion;
pub mod range;
pub mod replace;
pub mod resolve;
pub mod resources;

pub use auxfile::{load_aux, parse_aux, AuxData, CitationGroup, KeyNumberMap};
pub use bbl::{load_bbl, normalize_bibliography, Bibliography, BibliographyEntry};
pub use config::{load_config, EngineConfig};
pub use conversion::{
    build_conversion_table, extract_citation_groups, render_group, CitationMode,
    ConversionTable, UnresolvedPolicy,
};
pub use range::{compress, RunThreshold};
pub use replace::{apply_rules, build_replacement_rules, ReplacementRule};
pub use resolve::{resolve, Resolution};
pub use resources::{discover_data, discover_style};
