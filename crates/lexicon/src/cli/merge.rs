//! `merge` command: merge one lexicon file into another

use std::path::{Path, PathBuf};

use lexicon_core::config::LexiconConfig;
use lexicon_core::entry::Lexicon;
use lexicon_core::error::LexiconError;
use lexicon_core::merge::{ConflictType, MergeConflict, MergeEngine, MergeOutcome, Resolution};

use crate::cli::util::{CliError, read_lexicon, write_lexicon};

fn parse_resolution(value: &str) -> Result<Resolution, CliError> {
    value.parse().map_err(|_| {
        CliError::Usage(format!(
            "Unknown resolution '{}' (expected master, merge or both)",
            value
        ))
    })
}

fn parse_conflict_type(value: &str) -> Result<ConflictType, CliError> {
    value.parse().map_err(|_| {
        CliError::Usage(format!(
            "Unknown conflict type '{}' (expected additional_alias or conflict)",
            value
        ))
    })
}

fn describe(entry: &lexicon_core::entry::LexiconEntry) -> String {
    let mut parts = vec![entry.graphemes.join(", ")];
    if entry.has_alias() {
        parts.push(format!("alias \"{}\"", entry.alias));
    }
    if entry.has_phoneme() {
        parts.push(format!("/{}/", entry.phoneme));
    }
    parts.join(" ")
}

fn print_conflicts(conflicts: &[MergeConflict]) {
    for (i, conflict) in conflicts.iter().enumerate() {
        let kind = match conflict.conflict_type {
            ConflictType::AdditionalAlias => "additional alias",
            ConflictType::Conflict => "conflict",
        };
        let status = if conflict.is_resolved() { "" } else { " (unresolved)" };
        println!("  [{}] {}{}", i + 1, kind, status);
        println!("      master:   {}", describe(&conflict.master));
        println!("      incoming: {}", describe(&conflict.incoming));
    }
}

/// Run the merge. Returns false when conflicts remain unresolved or anything fails.
pub fn handle_merge(
    config: &LexiconConfig,
    master: &Path,
    incoming: &Path,
    resolve: Option<String>,
    only: Option<String>,
    output: Option<PathBuf>,
) -> bool {
    match run_merge(config, master, incoming, resolve, only, output) {
        Ok(merged) => merged,
        Err(CliError::Lexicon(LexiconError::MergeBlocked { errors })) => {
            eprintln!("✗ Merge blocked by invalid entries in {}:", incoming.display());
            for error in errors {
                if error.grapheme.is_empty() {
                    eprintln!("  #{}: {}", error.index + 1, error.message);
                } else {
                    eprintln!("  #{} '{}': {}", error.index + 1, error.grapheme, error.message);
                }
            }
            false
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

fn run_merge(
    config: &LexiconConfig,
    master_path: &Path,
    incoming_path: &Path,
    resolve: Option<String>,
    only: Option<String>,
    output: Option<PathBuf>,
) -> Result<bool, CliError> {
    let resolution = resolve.as_deref().map(parse_resolution).transpose()?;
    let only = only.as_deref().map(parse_conflict_type).transpose()?;

    let master = read_lexicon(master_path, &config.default_language)?;
    let incoming = read_lexicon(incoming_path, &master.language)?;

    let result = match MergeEngine::begin(
        &master.language,
        &master.entries,
        &incoming.language,
        &incoming.entries,
    )? {
        MergeOutcome::Completed(result) => result,
        MergeOutcome::NeedsResolution(mut pending) => {
            if let Some(resolution) = resolution {
                let count = match only {
                    Some(conflict_type) => pending.resolve_all_of_type(conflict_type, resolution),
                    None => pending.resolve_all(resolution),
                };
                log::info!("Applied {:?} to {} conflict(s)", resolution, count);
            }

            if !pending.is_fully_resolved() {
                println!(
                    "{} conflict(s), {} unresolved:",
                    pending.conflicts().len(),
                    pending.unresolved_count()
                );
                print_conflicts(pending.conflicts());
                eprintln!("✗ Nothing written; rerun with --resolve");
                return Ok(false);
            }
            pending.finalize()?
        }
    };

    let output = output.unwrap_or_else(|| master_path.to_path_buf());
    let mut merged = Lexicon::new(master.language, result.entries);
    for entry in &mut merged.entries {
        entry.is_new = false;
    }
    write_lexicon(&output, &merged)?;

    let summary = result.summary;
    println!("✓ Merged {} into {}", incoming_path.display(), output.display());
    println!("  New entries:         {}", summary.new_entries);
    println!("  Conflicts resolved:  {}", summary.conflicts_resolved);
    println!("  Identical (skipped): {}", summary.identical_skipped);
    if summary.duplicates_skipped > 0 {
        println!("  Duplicates (skipped): {}", summary.duplicates_skipped);
    }
    println!("  Processed:           {}", summary.total_processed);
    if summary.errors_found > 0 {
        println!("  With warnings:       {}", summary.errors_found);
    }
    Ok(true)
}
