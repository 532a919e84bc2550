//! CSV and TSV codecs.
//!
//! Both formats share one layout: a fixed header row followed by one row per
//! grapheme. An entry with three graphemes becomes three rows with identical
//! alias/phoneme columns, and decoding groups rows back into entries by the
//! key `alias|alias_say_as|phoneme|phoneme_say_as`.
//!
//! CSV fields are quoted RFC 4180 style. TSV has no quoting, so tabs and line
//! breaks inside a value are written as spaces.

use indexmap::IndexMap;

use crate::codec::{strip_bom, Format};
use crate::entry::{LexiconEntry, SayAs};
use crate::error::{LexiconError, Result};

/// Column names, in the order they are written.
pub const HEADERS: [&str; 5] = [
    "grapheme",
    "alias",
    "alias_say_as",
    "phoneme",
    "phoneme_say_as",
];

fn separator(format: Format) -> &'static str {
    match format {
        Format::Tsv => "\t",
        _ => ",",
    }
}

/// Split CSV text into records, honouring quoted fields that contain
/// separators, doubled quotes and line breaks.
pub fn parse_csv_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    let mut line = 1usize;
    let mut quote_opened_at = 0usize;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quote_opened_at = line;
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(LexiconError::parse(
            Format::Csv,
            format!("Unterminated quoted field starting on line {}", quote_opened_at),
        ));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

fn parse_tsv_records(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| {
            line.trim_end_matches('\r')
                .split('\t')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn is_comment(record: &[String]) -> bool {
    record
        .first()
        .is_some_and(|f| f.trim_start().starts_with('#'))
}

/// Decode CSV or TSV text into entries.
pub fn decode(format: Format, text: &str) -> Result<Vec<LexiconEntry>> {
    let text = strip_bom(text);
    let records = match format {
        Format::Tsv => parse_tsv_records(text),
        _ => parse_csv_records(text)?,
    };

    let mut rows = records.into_iter().filter(|r| !is_blank(r));
    let header = rows
        .by_ref()
        .find(|r| !is_comment(r))
        .ok_or_else(|| LexiconError::parse(format, "File is empty"))?;

    let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut columns = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, name) in columns.iter_mut().zip(HEADERS) {
        match header.iter().position(|h| h == name) {
            Some(i) => *slot = i,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(LexiconError::parse(
            format,
            format!("Missing required column(s): {}", missing.join(", ")),
        ));
    }

    let mut entries: Vec<LexiconEntry> = Vec::new();
    let mut by_key: IndexMap<String, usize> = IndexMap::new();
    let mut data_rows = 0usize;

    for row in rows {
        data_rows += 1;
        let cell = |column: usize| {
            row.get(columns[column])
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let grapheme = cell(0);
        let alias = cell(1);
        let alias_say_as = SayAs::parse_lenient(&cell(2));
        let mut phoneme = cell(3);
        let mut phoneme_say_as_cell = cell(4);
        // Rows shifted one column right in hand-edited sheets put the
        // pronunciation under phoneme_say_as.
        if phoneme.is_empty() && phoneme_say_as_cell.parse::<SayAs>().is_err() {
            phoneme = std::mem::take(&mut phoneme_say_as_cell);
        }
        let phoneme_say_as = SayAs::parse_lenient(&phoneme_say_as_cell);

        if grapheme.is_empty() {
            if alias.is_empty() && phoneme.is_empty() {
                log::warn!(
                    "Skipping {} data row {}: no grapheme, alias or phoneme",
                    format,
                    data_rows
                );
                continue;
            }
            log::warn!("{} data row {} has no grapheme", format, data_rows);
            entries.push(LexiconEntry {
                alias,
                alias_say_as,
                phoneme,
                phoneme_say_as,
                ..Default::default()
            });
            continue;
        }

        let key = format!(
            "{}|{}|{}|{}",
            alias,
            alias_say_as.map(SayAs::as_str).unwrap_or(""),
            phoneme,
            phoneme_say_as.map(SayAs::as_str).unwrap_or("")
        );

        let index = *by_key.entry(key).or_insert_with(|| {
            entries.push(LexiconEntry {
                alias,
                alias_say_as,
                phoneme,
                phoneme_say_as,
                ..Default::default()
            });
            entries.len() - 1
        });

        entries[index].graphemes.push(grapheme);
    }

    if entries.is_empty() {
        return Err(LexiconError::parse(
            format,
            "File must contain a header row and at least one data row",
        ));
    }

    log::debug!(
        "Decoded {} rows into {} {} entries",
        data_rows,
        entries.len(),
        format
    );
    Ok(entries)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// Encode entries as CSV or TSV, one row per grapheme.
pub fn encode(format: Format, entries: &[LexiconEntry]) -> String {
    let sep = separator(format);
    let field = |value: &str| match format {
        Format::Tsv => tsv_field(value),
        _ => csv_field(value),
    };

    let mut out = HEADERS.join(sep);
    out.push('\n');

    for entry in entries {
        let alias = entry.alias.trim();
        let phoneme = entry.phoneme.trim();
        let alias_say_as = entry
            .effective_alias_say_as()
            .map(SayAs::as_str)
            .unwrap_or("");
        let phoneme_say_as = entry
            .effective_phoneme_say_as()
            .map(SayAs::as_str)
            .unwrap_or("");

        for grapheme in entry.graphemes.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
            let row = [grapheme, alias, alias_say_as, phoneme, phoneme_say_as]
                .map(|value| field(value))
                .join(sep);
            out.push_str(&row);
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_grouped_by_shared_key() {
        let csv = "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\ndog,,,dɒg,\ndoggie,,,dɒg,";
        let entries = decode(Format::Csv, csv).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].graphemes, vec!["dog", "doggie"]);
        assert_eq!(entries[0].phoneme, "dɒg");
        assert_eq!(entries[0].alias, "");
    }

    #[test]
    fn test_rows_without_grapheme_are_not_folded() {
        let csv = "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\n\
                   dog,,,dɒg,\n\
                   ,,,,\n\
                   ,,name,,\n\
                   ,,,dɒg,\n";
        let entries = decode(Format::Csv, csv).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].graphemes, vec!["dog"]);
        // Kept on its own so validation points at it.
        assert!(entries[1].graphemes.is_empty());
        assert_eq!(entries[1].phoneme, "dɒg");
    }

    #[test]
    fn test_pronunciation_in_say_as_column_is_the_phoneme() {
        let csv = "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\ndog,,,,dɒg\ndoggie,,,,dɒg";
        let entries = decode(Format::Csv, csv).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].graphemes, vec!["dog", "doggie"]);
        assert_eq!(entries[0].phoneme, "dɒg");
        assert_eq!(entries[0].phoneme_say_as, None);
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\r\n\
                   \"Smith, John\",\"John \"\"JJ\"\" Smith\",name,,\r\n\
                   \"multi\nline\",x,,,\r\n";
        let entries = decode(Format::Csv, csv).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].graphemes, vec!["Smith, John"]);
        assert_eq!(entries[0].alias, "John \"JJ\" Smith");
        assert_eq!(entries[0].alias_say_as, Some(SayAs::Name));
        assert_eq!(entries[1].graphemes, vec!["multi\nline"]);
    }

    #[test]
    fn test_bom_comments_and_column_order() {
        let tsv = "\u{feff}# exported by vendor\n\nPhoneme\tGrapheme\tAlias\tAlias_Say_As\tPhoneme_Say_As\textra\n\
                   kæt\tcat\t\t\t\tignored\n";
        let entries = decode(Format::Tsv, tsv).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].graphemes, vec!["cat"]);
        assert_eq!(entries[0].phoneme, "kæt");
    }

    #[test]
    fn test_missing_headers_and_rows() {
        let err = decode(Format::Csv, "grapheme,phoneme\ncat,kæt\n").unwrap_err();
        assert!(err.to_string().contains("alias, alias_say_as, phoneme_say_as"));

        let err = decode(Format::Tsv, "grapheme\talias\talias_say_as\tphoneme\tphoneme_say_as\n").unwrap_err();
        assert!(err.to_string().contains("at least one data row"));

        let err = decode(Format::Csv, "\n# nothing here\n").unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = decode(Format::Csv, "grapheme,alias\n\"open,x\n").unwrap_err();
        assert!(err.to_string().contains("Unterminated"));
    }

    #[test]
    fn test_encode_one_row_per_grapheme() {
        let entries = vec![LexiconEntry {
            graphemes: vec!["colour".to_string(), "color".to_string()],
            phoneme: "ˈkʌlə".to_string(),
            phoneme_say_as: Some(SayAs::Name),
            ..Default::default()
        }];
        let csv = encode(Format::Csv, &entries);
        assert_eq!(
            csv,
            "grapheme,alias,alias_say_as,phoneme,phoneme_say_as\n\
             colour,,,ˈkʌlə,name\n\
             color,,,ˈkʌlə,name\n"
        );

        let tsv = encode(Format::Tsv, &entries);
        assert!(tsv.starts_with("grapheme\talias\talias_say_as\tphoneme\tphoneme_say_as\n"));
        assert_eq!(tsv.lines().count(), 3);
    }

    #[test]
    fn test_csv_quoting_on_encode() {
        let entries = vec![LexiconEntry::with_alias(["a,b"], "say \"ab\"")];
        let csv = encode(Format::Csv, &entries);
        assert!(csv.contains("\"a,b\",\"say \"\"ab\"\"\",,,"));
        assert_eq!(decode(Format::Csv, &csv).unwrap(), entries);
    }

    #[test]
    fn test_round_trip_both_formats() {
        let entries = vec![
            LexiconEntry::with_phoneme(["cat", "cats"], "kæt"),
            LexiconEntry {
                graphemes: vec!["1st".to_string()],
                alias: "first".to_string(),
                alias_say_as: Some(SayAs::Ordinal),
                ..Default::default()
            },
        ];
        for format in [Format::Csv, Format::Tsv] {
            let text = encode(format, &entries);
            assert_eq!(decode(format, &text).unwrap(), entries);
        }
    }
}
