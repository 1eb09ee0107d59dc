//! CLI for auxcite - Resolve BibTeX citations from LaTeX .aux/.bbl output.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auxcite::{
    bbl::BblError, config::ConfigError, conversion::ConversionError, discover_data,
    discover_style, load_config, normalize_bibliography, parse_aux, range::EN_DASH, resolve,
    resolve::ResolveError, resources::ResourceError, CitationMode, EngineConfig, ReplacementRule,
    RunThreshold, UnresolvedPolicy,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Resolve BibTeX citation numbers and bibliography text for documents
#[derive(Parser)]
#[command(name = "auxcite")]
#[command(version)]
#[command(after_help = "\
Examples:
  auxcite resolve .tmp/wdbib.aux --context paper.txt
  auxcite bibliography .tmp/wdbib.aux .tmp/wdbib.bbl
  auxcite apply paper.txt --aux .tmp/wdbib.aux --bbl .tmp/wdbib.bbl -o paper_bib.txt
  auxcite discover")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the replacement rule for every citation group
    #[command(after_help = "\
Examples:
  auxcite resolve wdbib.aux
  auxcite resolve wdbib.aux --context paper.txt --compact
  auxcite resolve wdbib.aux --bbl wdbib.bbl --json")]
    Resolve {
        /// LaTeX .aux file
        aux: PathBuf,

        /// Document text whose \cite{...} commands are resolved as well
        #[arg(long)]
        context: Option<PathBuf>,

        /// BibTeX .bbl file (included in --json output)
        #[arg(long)]
        bbl: Option<PathBuf>,

        /// Print a JSON report instead of tab-separated rules
        #[arg(long)]
        json: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print the bibliography as plain numbered text
    Bibliography {
        /// LaTeX .aux file
        aux: PathBuf,

        /// BibTeX .bbl file
        bbl: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace citations and the \thebibliography placeholder in a text document
    Apply {
        /// Input document (use '-' for stdin)
        input: PathBuf,

        /// LaTeX .aux file
        #[arg(long)]
        aux: PathBuf,

        /// BibTeX .bbl file; without it \thebibliography is left in place
        #[arg(long)]
        bbl: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Find the default .bst style and .bib databases in a directory
    Discover {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },
}

/// Options controlling how citation numbers are rendered.
#[derive(Args)]
struct RenderArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// LaTeX preamble to read \usepackage{cite} and \citeleft/\citeright from
    #[arg(long)]
    preamble: Option<PathBuf>,

    /// Sort and compress citation numbers like the cite package
    #[arg(long)]
    compact: bool,

    /// Shortest run of numbers written as a range (implies --compact)
    #[arg(long, value_parser = clap::value_parser!(u8).range(2..=3))]
    dash_starts: Option<u8>,

    /// Range separator (implies --compact)
    #[arg(long)]
    dash: Option<char>,

    /// Left citation delimiter
    #[arg(long)]
    left: Option<String>,

    /// Right citation delimiter
    #[arg(long)]
    right: Option<String>,

    /// Leave citation groups with unknown keys untouched instead of failing
    #[arg(long)]
    skip_unresolved: bool,
}

// ---------------------------------------------------------------------------
// AppError - semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 - input file not found / unreadable
    InputFile(String),
    /// Exit 11 - malformed .aux record
    Aux(String),
    /// Exit 12 - citation key without a \bibcite number
    UnresolvedKey(String),
    /// Exit 13 - no bibliography block in the .bbl file
    Bibliography(String),
    /// Exit 14 - default style/database missing or ambiguous
    Resources(String),
    /// Exit 15 - cannot write output file
    OutputFile(String),
    /// Exit 16 - invalid config file
    Config(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::Aux(_) => 11,
            AppError::UnresolvedKey(_) => 12,
            AppError::Bibliography(_) => 13,
            AppError::Resources(_) => 14,
            AppError::OutputFile(_) => 15,
            AppError::Config(_) => 16,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(f, "{}\n  hint: verify the file path is correct", msg)
            }
            AppError::Aux(msg) => {
                write!(
                    f,
                    "{}\n  hint: rerun latex and bibtex; the .aux file may be truncated",
                    msg
                )
            }
            AppError::UnresolvedKey(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that this key exists in your .bib file and rerun bibtex and latex, or pass --skip-unresolved",
                    msg
                )
            }
            AppError::Bibliography(msg) => {
                write!(
                    f,
                    "{}\n  hint: bibtex writes \\bibitem entries only for cited keys; check the .blg log",
                    msg
                )
            }
            AppError::Resources(msg) => {
                write!(
                    f,
                    "{}\n  hint: keep exactly one .bst file in the project directory",
                    msg
                )
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
            AppError::Config(msg) => {
                write!(f, "{}", msg)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Resolve {
            aux,
            context,
            bbl,
            json,
            output,
            render,
        } => resolve_command(
            &aux,
            context.as_deref(),
            bbl.as_deref(),
            json,
            output.as_deref(),
            &render,
        ),
        Commands::Bibliography { aux, bbl, output } => {
            bibliography_command(&aux, &bbl, output.as_deref())
        }
        Commands::Apply {
            input,
            aux,
            bbl,
            output,
            render,
        } => apply_command(&input, &aux, bbl.as_deref(), output.as_deref(), &render),
        Commands::Discover { dir } => discover_command(dir.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// JSON shape of `resolve --json`.
#[derive(Serialize)]
struct ResolveReport<'a> {
    bibstyle: Option<&'a str>,
    bibdata: Option<&'a str>,
    rules: &'a [ReplacementRule],
    skipped: Vec<&'a str>,
    bibliography: Option<String>,
}

/// Print the replacement rules for an .aux file.
fn resolve_command(
    aux: &Path,
    context: Option<&Path>,
    bbl: Option<&Path>,
    json: bool,
    output: Option<&Path>,
    render: &RenderArgs,
) -> Result<(), AppError> {
    let config = build_config(render)?;
    let aux_text = read_input(aux)?;
    let context_text = context.map(read_input).transpose()?;
    let bbl_text = bbl.map(read_input).transpose()?;

    let resolution = resolve(
        &aux_text,
        context_text.as_deref(),
        bbl_text.as_deref(),
        &config,
    )
    .map_err(map_resolve_error)?;

    let result = if json {
        let report = ResolveReport {
            bibstyle: resolution.aux.bibstyle.as_deref(),
            bibdata: resolution.aux.bibdata.as_deref(),
            rules: &resolution.rules,
            skipped: resolution.table.skipped().iter().map(|g| g.as_str()).collect(),
            bibliography: resolution.bibliography.as_ref().map(|b| b.text()),
        };
        let mut text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::OutputFile(format!("failed to serialize report: {}", e)))?;
        text.push('\n');
        text
    } else {
        resolution
            .rules
            .iter()
            .map(|rule| format!("{}\t{}\n", rule.pattern, rule.replacement))
            .collect()
    };

    write_output(output, &result, resolution.rules.len())
}

/// Print the cleaned, numbered bibliography.
fn bibliography_command(aux: &Path, bbl: &Path, output: Option<&Path>) -> Result<(), AppError> {
    let aux_text = read_input(aux)?;
    let bbl_text = read_input(bbl)?;

    // Only the \bibcite numbers matter here; \citation records are not resolved.
    let aux_data = parse_aux(&aux_text).map_err(|e| map_resolve_error(e.into()))?;
    let bibliography = normalize_bibliography(&bbl_text, &aux_data.bibcite)
        .map_err(|e| map_resolve_error(e.into()))?;

    write_output(output, &bibliography.text(), bibliography.entries().len())
}

/// Rewrite a plain-text document.
fn apply_command(
    input: &Path,
    aux: &Path,
    bbl: Option<&Path>,
    output: Option<&Path>,
    render: &RenderArgs,
) -> Result<(), AppError> {
    let config = build_config(render)?;
    let document = read_input(input)?;
    let aux_text = read_input(aux)?;
    let bbl_text = bbl.map(read_input).transpose()?;

    let resolution = resolve(&aux_text, Some(&document), bbl_text.as_deref(), &config)
        .map_err(map_resolve_error)?;
    let result = resolution.apply(&document).map_err(map_resolve_error)?;

    write_output(output, &result, resolution.context_groups.len())
}

/// Print the default style and databases of a project directory.
fn discover_command(dir: Option<&Path>) -> Result<(), AppError> {
    let dir = dir.unwrap_or_else(|| Path::new("."));

    let style = discover_style(dir).map_err(map_resource_error)?;
    let data = discover_data(dir).map_err(map_resource_error)?;

    println!("bibstyle\t{}", style);
    println!("bibdata\t{}", data);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Defaults, then the config file, then the preamble, then flags.
fn build_config(render: &RenderArgs) -> Result<EngineConfig, AppError> {
    let mut config = match &render.config {
        Some(path) => load_config(path).map_err(|e| match e {
            ConfigError::IoError(_) => {
                AppError::InputFile(format!("'{}': {}", path.display(), e))
            }
            ConfigError::Invalid(_) => AppError::Config(format!("'{}': {}", path.display(), e)),
        })?,
        None => EngineConfig::default(),
    };

    if let Some(path) = &render.preamble {
        config.apply_preamble(&read_input(path)?);
    }

    if render.compact || render.dash_starts.is_some() || render.dash.is_some() {
        let (mut min_run, mut dash) = match config.mode {
            CitationMode::Compact { min_run, dash } => (min_run, dash),
            CitationMode::Native => (RunThreshold::Three, EN_DASH),
        };
        if let Some(n) = render.dash_starts {
            min_run = RunThreshold::try_from(n).map_err(|e| AppError::Config(e.to_string()))?;
        }
        if let Some(c) = render.dash {
            dash = c;
        }
        config.mode = CitationMode::Compact { min_run, dash };
    }
    if let Some(left) = &render.left {
        config.cite_left = left.clone();
    }
    if let Some(right) = &render.right {
        config.cite_right = right.clone();
    }
    if render.skip_unresolved {
        config.on_unresolved = UnresolvedPolicy::SkipGroup;
    }

    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

/// Reads a file, or stdin for '-'.
fn read_input(path: &Path) -> Result<String, AppError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InputFile(format!("failed to read from stdin: {}", e)))?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
            .map_err(|e| AppError::InputFile(format!("'{}': {}", path.display(), e)))
    }
}

/// Writes to a file with a confirmation on stderr, or to stdout.
fn write_output(output: Option<&Path>, content: &str, count: usize) -> Result<(), AppError> {
    if let Some(output_path) = output {
        fs::write(output_path, content).map_err(|e| {
            AppError::OutputFile(format!("'{}': {}", output_path.display(), e))
        })?;
        eprintln!(
            "processed {} item(s), wrote {}",
            count,
            output_path.display()
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{}", content)
            .map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))?;
    }
    Ok(())
}

/// Maps a ResolveError to an AppError using type-safe matching.
fn map_resolve_error(e: ResolveError) -> AppError {
    match e {
        ResolveError::Aux(_) => AppError::Aux(e.to_string()),
        ResolveError::Conversion(ConversionError::UnresolvedCitationKey { .. }) => {
            AppError::UnresolvedKey(e.to_string())
        }
        ResolveError::Bibliography(BblError::BibliographyBlockNotFound) => {
            AppError::Bibliography(e.to_string())
        }
        ResolveError::Bibliography(BblError::IoError(_)) => AppError::InputFile(e.to_string()),
        ResolveError::Pattern(_) => AppError::Config(e.to_string()),
    }
}

fn map_resource_error(e: ResourceError) -> AppError {
    match e {
        ResourceError::IoError(_) => AppError::InputFile(e.to_string()),
        _ => AppError::Resources(e.to_string()),
    }
}
