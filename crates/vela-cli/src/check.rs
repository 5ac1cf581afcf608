//! `check` subcommand handler

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use vela_core::ast::Program;
use vela_core::config::{CheckerOptions, ConfigError};
use vela_core::diagnostics::Diagnostic;
use vela_core::elements::ElementTable;
use vela_core::pipeline::Pipeline;
use walkdir::WalkDir;

use crate::OutputFormat;
use crate::utils::{plural, read_source, write_json, write_text};

/// A resolved program as written by a front end: the element table, the
/// tree, and optionally the source text of each unit for snippets.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgramBundle {
    pub elements: ElementTable,
    pub program: Program,
    #[serde(default)]
    pub sources: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("'{path}' is not a valid program bundle: {source}")]
    Bundle {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("no program bundles found under '{0}'")]
    NoBundles(String),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

pub struct CheckArgs {
    pub path: String,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub strict: bool,
}

/// Run `check` and return the process exit code: 0 when clean, 1 when an
/// error-severity diagnostic was produced, 2 when checking could not run.
pub fn handle_check(args: &CheckArgs) -> i32 {
    let stdout = io::stdout();
    match run_check(args, &mut stdout.lock()) {
        Ok(false) => 0,
        Ok(true) => 1,
        Err(err) => {
            eprintln!("Error: {err}");
            2
        }
    }
}

/// Check every bundle named by `args.path`, writing diagnostics to `out`.
/// Returns whether any error was reported.
pub fn run_check(args: &CheckArgs, out: &mut dyn Write) -> Result<bool, CheckError> {
    let options = match &args.config {
        Some(path) => CheckerOptions::load(path)?,
        None => CheckerOptions::default(),
    };
    let options = if args.strict { options.strict(true) } else { options };
    let pipeline = Pipeline::new(options);

    let bundles = collect_bundles(&args.path)?;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut sources = HashMap::new();
    let mut has_errors = false;
    for path in &bundles {
        let bundle = load_bundle(path)?;
        let report = pipeline.check(&bundle.elements, &bundle.program);
        debug!(bundle = %path, diagnostics = report.diagnostics.len(), "checked bundle");
        has_errors |= report.has_errors();
        diagnostics.extend(report.diagnostics);
        sources.extend(bundle.sources);
    }

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    info!(bundles = bundles.len(), errors, warnings, "check finished");

    let written = match args.format {
        OutputFormat::Json => write_json(out, &diagnostics),
        OutputFormat::Text => write_text(out, &diagnostics, &sources).and_then(|()| {
            writeln!(
                out,
                "checked {}: {}, {}",
                plural(bundles.len(), "bundle"),
                plural(errors, "error"),
                plural(warnings, "warning")
            )
        }),
    };
    written.map_err(CheckError::Output)?;

    Ok(has_errors)
}

/// Bundle files named by `path`: the file itself, or every `.ron` file
/// below a directory in a stable order.
pub fn collect_bundles(path: &str) -> Result<Vec<String>, CheckError> {
    if path == "-" || !Path::new(path).is_dir() {
        return Ok(vec![path.to_string()]);
    }
    let mut bundles = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "ron") {
            bundles.push(entry.path().to_string_lossy().into_owned());
        }
    }
    if bundles.is_empty() {
        return Err(CheckError::NoBundles(path.to_string()));
    }
    Ok(bundles)
}

/// Read and decode one bundle; node ids are assigned here since the
/// serialized tree carries none.
pub fn load_bundle(path: &str) -> Result<ProgramBundle, CheckError> {
    let text = read_source(path).map_err(|source| CheckError::Io {
        path: path.to_string(),
        source,
    })?;
    let mut bundle: ProgramBundle = ron::from_str(&text).map_err(|source| CheckError::Bundle {
        path: path.to_string(),
        source,
    })?;
    bundle.program.assign_node_ids();
    Ok(bundle)
}
