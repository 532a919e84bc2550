//! Conversion between entry lists and their serialized forms.
//!
//! - [`xml`]: the canonical W3C PLS document
//! - [`delimited`]: CSV and TSV spreadsheets, one row per grapheme
//!
//! Decoding never panics on bad input; structural problems come back as
//! [`LexiconError::Parse`](crate::error::LexiconError::Parse).

/// CSV and TSV codec.
pub mod delimited;
/// PLS XML codec.
pub mod xml;

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entry::Lexicon;
use crate::error::Result;

/// UTF-8 byte-order mark.
pub const BOM: char = '\u{feff}';

/// A supported serialized representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Format {
    /// W3C PLS document
    Xml,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
}

impl Format {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Csv => "csv",
            Format::Tsv => "tsv",
        }
    }

    /// MIME type used when storing or downloading.
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Xml => "application/pls+xml",
            Format::Csv => "text/csv",
            Format::Tsv => "text/tab-separated-values",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Xml => "XML",
            Format::Csv => "CSV",
            Format::Tsv => "TSV",
        })
    }
}

/// Guess the format of an uploaded file from its name, then its first line.
pub fn detect_format(file_name: &str, contents: &str) -> Format {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".csv") {
        return Format::Csv;
    }
    if lower.ends_with(".tsv") || lower.ends_with(".txt") {
        return Format::Tsv;
    }

    let first_line = strip_bom(contents).lines().next().unwrap_or("");
    if first_line.contains("grapheme") {
        if first_line.contains('\t') {
            return Format::Tsv;
        }
        if first_line.contains(',') {
            return Format::Csv;
        }
    }
    Format::Xml
}

/// Decode `text` in the given format.
///
/// CSV and TSV carry no language; `fallback_language` is used for them and for
/// PLS documents without `xml:lang`.
pub fn decode(format: Format, text: &str, fallback_language: &str) -> Result<Lexicon> {
    log::debug!("Decoding {} lexicon ({} bytes)", format, text.len());
    match format {
        Format::Xml => xml::decode(text, fallback_language),
        Format::Csv | Format::Tsv => {
            let entries = delimited::decode(format, text)?;
            Ok(Lexicon::new(fallback_language, entries))
        }
    }
}

/// Detect the format of an uploaded file and decode it.
pub fn decode_file(file_name: &str, text: &str, fallback_language: &str) -> Result<Lexicon> {
    decode(detect_format(file_name, text), text, fallback_language)
}

/// Encode a lexicon in the given format.
pub fn encode(format: Format, lexicon: &Lexicon) -> String {
    match format {
        Format::Xml => xml::encode(&lexicon.language, &lexicon.entries),
        Format::Csv | Format::Tsv => delimited::encode(format, &lexicon.entries),
    }
}

/// Encode for download. CSV gets a BOM so spreadsheet tools detect UTF-8.
pub fn export_bytes(format: Format, lexicon: &Lexicon) -> Vec<u8> {
    let mut text = String::new();
    if format == Format::Csv {
        text.push(BOM);
    }
    text.push_str(&encode(format, lexicon));
    text.into_bytes()
}

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}
