//! `validate` and `convert` commands

use std::path::Path;

use lexicon_core::config::LexiconConfig;
use lexicon_core::validate::{structural_errors, validate};

use crate::cli::util::{read_lexicon, write_lexicon};

/// Print every violation in a file. Returns true when the file is clean.
pub fn handle_validate(config: &LexiconConfig, file: &Path) -> bool {
    let lexicon = match read_lexicon(file, &config.default_language) {
        Ok(lexicon) => lexicon,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let mut clean = true;
    for (index, entry) in lexicon.entries.iter().enumerate() {
        let violations = validate(entry);
        if violations.is_empty() {
            continue;
        }
        clean = false;
        let label = match entry.first_grapheme() {
            "" => format!("#{}", index + 1),
            grapheme => format!("#{} '{}'", index + 1, grapheme),
        };
        for violation in violations {
            eprintln!("✗ {}: {}", label, violation);
        }
    }

    let blocking = structural_errors(&lexicon.entries);
    if !blocking.is_empty() {
        eprintln!(
            "  {} entr{} would also block a merge",
            blocking.len(),
            if blocking.len() == 1 { "y" } else { "ies" }
        );
    }

    if clean {
        println!(
            "✓ {} ({}): {} entries valid",
            file.display(),
            lexicon.language,
            lexicon.entries.len()
        );
    }
    clean
}

/// Convert between formats, choosing the output format from its extension.
pub fn handle_convert(
    config: &LexiconConfig,
    input: &Path,
    output: &Path,
    language: Option<String>,
) -> bool {
    let language = language.unwrap_or_else(|| config.default_language.clone());
    let result = read_lexicon(input, &language).and_then(|mut lexicon| {
        lexicon.entries.retain(|e| !e.is_placeholder());
        let format = write_lexicon(output, &lexicon)?;
        Ok((lexicon.entries.len(), format))
    });

    match result {
        Ok((count, format)) => {
            println!(
                "✓ Wrote {} entries as {} to {}",
                count,
                format,
                output.display()
            );
            true
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_csv_to_xml_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("terms.csv");
        let output = dir.path().join("terms.xml");
        std::fs::write(
            &input,
            "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\nGIF,,,dʒɪf,\nJIF,,,dʒɪf,\n",
        )
        .unwrap();

        let config = LexiconConfig::new(dir.path().to_path_buf());
        assert!(handle_convert(&config, &input, &output, Some("en-GB".to_string())));

        let xml = std::fs::read_to_string(&output).unwrap();
        assert!(xml.contains("xml:lang=\"en-GB\""));
        assert!(xml.contains("<grapheme>JIF</grapheme>"));
        assert!(handle_validate(&config, &output));
    }

    #[test]
    fn test_validate_reports_bad_phoneme() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.tsv");
        std::fs::write(
            &input,
            "grapheme\talias\talias_say_as\tphoneme\tphoneme_say_as\nhello\t\t\tHELLO\t\n",
        )
        .unwrap();
        let config = LexiconConfig::new(dir.path().to_path_buf());
        assert!(!handle_validate(&config, &input));
    }
}
