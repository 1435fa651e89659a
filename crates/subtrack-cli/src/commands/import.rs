//! Export and import command implementations

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use subtrack_core::{export, Database, ImportMode, ImportOutcome};
use tempfile::NamedTempFile;

/// Write the export document to `output`, or to stdout when absent
///
/// File output goes through a temporary file in the same directory and is
/// renamed into place, so an interrupted export never leaves a partial file.
pub fn cmd_export(db: &Database, user: &str, output: Option<&Path>) -> Result<()> {
    let doc = export::export_subscriptions(db, user, Utc::now())?;
    let json = serde_json::to_string_pretty(&doc)?;

    let Some(path) = output else {
        println!("{}", json);
        return Ok(());
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    println!(
        "✅ Exported {} subscriptions to {}",
        doc.subscriptions.len(),
        path.display()
    );
    println!("   Version: {}", doc.version);

    Ok(())
}

/// Import an export document; per-record failures are reported, not fatal
pub fn cmd_import(db: &Database, user: &str, file: &Path, replace: bool) -> Result<ImportOutcome> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;

    let mode = if replace {
        ImportMode::Replace
    } else {
        ImportMode::Merge
    };

    println!("📥 Importing from {} ({:?})...", file.display(), mode);

    let outcome = export::import_json(db, user, &text, mode)
        .with_context(|| format!("Could not import {}", file.display()))?;

    println!("✅ Imported {} subscriptions", outcome.imported);
    if !outcome.errors.is_empty() {
        println!("   ⚠️  {} records skipped:", outcome.errors.len());
        for error in &outcome.errors {
            println!("      {}", error);
        }
    }

    Ok(outcome)
}
