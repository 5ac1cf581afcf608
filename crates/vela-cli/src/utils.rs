//! Shared CLI utilities for reading input and printing diagnostics

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};

use vela_core::diagnostics::Diagnostic;

/// Read a file, or stdin when `file` is "-".
pub fn read_source(file: &str) -> io::Result<String> {
    if file == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(file)
    }
}

/// Print diagnostics, with a source snippet when the source of the
/// reported file is known.
pub fn write_text(
    out: &mut dyn Write,
    diagnostics: &[Diagnostic],
    sources: &HashMap<String, String>,
) -> io::Result<()> {
    for diagnostic in diagnostics {
        match sources.get(&diagnostic.filename) {
            Some(source) => write!(out, "{}", diagnostic.format(source))?,
            None => writeln!(out, "{diagnostic}")?,
        }
    }
    Ok(())
}

pub fn write_json(out: &mut dyn Write, diagnostics: &[Diagnostic]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, diagnostics)?;
    writeln!(out)
}

pub fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
