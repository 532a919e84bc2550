//! Entry validation.
//!
//! Two levels of checking live here:
//!
//! - [`validate`] applies the content rules that gate Save. Violations are
//!   non-fatal: the entry stays editable, but the lexicon cannot be persisted
//!   until every entry is clean.
//! - [`structural_errors`] applies the parse-level rules that gate a merge.
//!   An incoming file with any structurally broken entry is rejected as a whole.
//!
//! Character filtering is done with plain per-character predicates
//! ([`is_phoneme_char`], [`is_ssml_safe_char`], [`is_xml_representable_char`])
//! so that there is no hidden matcher state between calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entry::{LexiconEntry, NEW_ENTRY_PLACEHOLDER};
use crate::error::InvalidEntry;

/// IPA letters outside basic Latin, plus suprasegmentals and modifier letters.
const IPA_SYMBOLS: &str = "ɐɑɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃʦʣʨʥɚɝ\
ˈˌːˑ̆ʼʴʰʱʲʷˠˤ˞ⁿˡ˥˦˧˨˩↗↘‿|‖.";

/// A rule an entry breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum Violation {
    /// No grapheme with real text.
    MissingGrapheme,
    /// Neither alias nor phoneme is set.
    MissingContent,
    /// The phoneme contains characters outside the IPA class.
    InvalidPhonemeCharacters {
        /// The offending characters, de-duplicated, in order of appearance
        invalid: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingGrapheme => write!(f, "At least one grapheme is required"),
            Violation::MissingContent => write!(f, "Alias or phoneme is required"),
            Violation::InvalidPhonemeCharacters { invalid } => {
                write!(f, "Phoneme contains invalid characters: {}", invalid)
            }
        }
    }
}

/// Whether `c` may appear in a phoneme.
pub fn is_phoneme_char(c: char) -> bool {
    c.is_ascii_lowercase()
        || c == ' '
        || c == '<'
        || c == '>'
        // combining diacritics and tie bars
        || ('\u{0300}'..='\u{036F}').contains(&c)
        || IPA_SYMBOLS.contains(c)
}

/// Whether `c` can be placed in SSML text without breaking the document.
pub fn is_ssml_safe_char(c: char) -> bool {
    match c {
        '<' | '>' | '&' | '"' => false,
        '\t' | '\n' | '\r' => true,
        c => !c.is_control(),
    }
}

/// Keeps only phoneme characters. Applied to keystrokes and pasted text.
pub fn filter_phoneme_input(text: &str) -> String {
    text.chars().filter(|c| is_phoneme_char(*c)).collect()
}

/// Whether `c` can be written into a PLS document at all. Markup characters
/// pass because the encoder escapes them.
pub fn is_xml_representable_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        c => !c.is_control(),
    }
}

/// Removes characters that would break the SSML document. Applied to grapheme
/// and alias input.
pub fn filter_ssml_text(text: &str) -> String {
    text.chars().filter(|c| is_ssml_safe_char(*c)).collect()
}

/// An entry field that takes typed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum InputField {
    /// Written form
    Grapheme,
    /// Substitute text
    Alias,
    /// IPA pronunciation
    Phoneme,
}

/// Apply the character filter for `field`.
pub fn filter_input(field: InputField, text: &str) -> String {
    match field {
        InputField::Phoneme => filter_phoneme_input(text),
        InputField::Grapheme | InputField::Alias => filter_ssml_text(text),
    }
}

/// Checks an entry against the save rules. Pure; every failing rule is reported.
pub fn validate(entry: &LexiconEntry) -> Vec<Violation> {
    let mut violations = Vec::new();

    if entry.real_graphemes().next().is_none() {
        violations.push(Violation::MissingGrapheme);
    }

    if !entry.has_content() {
        violations.push(Violation::MissingContent);
    }

    if entry.has_phoneme() {
        let mut invalid = String::new();
        for c in entry.phoneme.chars().filter(|c| !is_phoneme_char(*c)) {
            if !invalid.contains(c) {
                invalid.push(c);
            }
        }
        if !invalid.is_empty() {
            violations.push(Violation::InvalidPhonemeCharacters { invalid });
        }
    }

    violations
}

/// Violations for a whole entry list, keyed by entry position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Only entries with at least one violation are present
    pub violations: BTreeMap<usize, Vec<Violation>>,
}

impl ValidationReport {
    /// Validate every entry of `entries`.
    pub fn for_entries(entries: &[LexiconEntry]) -> Self {
        let violations = entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let found = validate(entry);
                (!found.is_empty()).then_some((i, found))
            })
            .collect();
        Self { violations }
    }

    /// True when no entry has a violation.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Index of the first entry with a violation.
    pub fn first_invalid(&self) -> Option<usize> {
        self.violations.keys().next().copied()
    }

    /// Violations of the entry at `index`.
    pub fn for_index(&self, index: usize) -> &[Violation] {
        self.violations
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every offending entry, ready for an error message.
    pub fn invalid_entries(&self, entries: &[LexiconEntry]) -> Vec<InvalidEntry> {
        self.violations
            .iter()
            .map(|(&index, found)| InvalidEntry {
                index,
                grapheme: entries
                    .get(index)
                    .map(|e| e.first_grapheme().to_string())
                    .unwrap_or_default(),
                messages: found.iter().map(ToString::to_string).collect(),
            })
            .collect()
    }
}

/// A parse-level defect in an incoming entry that blocks a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BlockingError {
    /// Position in the incoming file
    pub index: usize,
    /// First grapheme (may be empty)
    pub grapheme: String,
    /// What is wrong
    pub message: String,
}

/// Structural checks run on a merge source before classification.
///
/// Unlike [`validate`], the phoneme alphabet is not checked here.
pub fn structural_errors(entries: &[LexiconEntry]) -> Vec<BlockingError> {
    let mut errors = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let grapheme = entry.first_grapheme().to_string();
        let mut push = |message: String| {
            errors.push(BlockingError {
                index,
                grapheme: grapheme.clone(),
                message,
            })
        };

        if entry.graphemes.is_empty() || entry.graphemes.iter().any(|g| g.trim().is_empty()) {
            push("Empty grapheme".to_string());
        } else if entry.graphemes.iter().any(|g| g == NEW_ENTRY_PLACEHOLDER) {
            push("Placeholder grapheme".to_string());
        }

        for text in entry.graphemes.iter().chain(std::iter::once(&entry.alias)) {
            if let Some(bad) = text.chars().find(|c| !is_xml_representable_char(*c)) {
                push(format!("'{}' contains the character {:?}", text, bad));
            }
        }

        if !entry.has_content() {
            push("Alias or phoneme is required".to_string());
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SayAs;

    #[test]
    fn test_valid_entries() {
        assert!(validate(&LexiconEntry::with_phoneme(["cat"], "kæt")).is_empty());
        assert!(validate(&LexiconEntry::with_phoneme(["thing"], "θɪŋ")).is_empty());
        assert!(validate(&LexiconEntry::with_alias(["WHO"], "World Health Organization")).is_empty());
        assert!(validate(&LexiconEntry::with_phoneme(["tomato"], "təˈmɑːtoʊ")).is_empty());
    }

    #[test]
    fn test_placeholder_breaks_both_rules() {
        let found = validate(&LexiconEntry::placeholder());
        assert_eq!(
            found,
            vec![Violation::MissingGrapheme, Violation::MissingContent]
        );
    }

    #[test]
    fn test_blank_graphemes_do_not_count() {
        let entry = LexiconEntry::with_phoneme(["  ", ""], "kæt");
        assert_eq!(validate(&entry), vec![Violation::MissingGrapheme]);
    }

    #[test]
    fn test_whitespace_content_is_missing() {
        let entry = LexiconEntry {
            graphemes: vec!["cat".to_string()],
            alias: "   ".to_string(),
            alias_say_as: Some(SayAs::Name),
            ..Default::default()
        };
        assert_eq!(validate(&entry), vec![Violation::MissingContent]);
    }

    #[test]
    fn test_invalid_phoneme_characters_reported_once() {
        let entry = LexiconEntry::with_phoneme(["cat"], "KAT1K");
        assert_eq!(
            validate(&entry),
            vec![Violation::InvalidPhonemeCharacters {
                invalid: "KAT1".to_string()
            }]
        );
        assert_eq!(
            validate(&entry)[0].to_string(),
            "Phoneme contains invalid characters: KAT1"
        );
    }

    #[test]
    fn test_filters_are_stateless() {
        // Repeated calls give the same answer regardless of earlier input.
        for _ in 0..3 {
            assert_eq!(filter_phoneme_input("k&æ9t"), "kæt");
            assert_eq!(filter_ssml_text("R&D <b>"), "RD b");
        }
        assert_eq!(filter_input(InputField::Phoneme, "Xkæt"), "kæt");
        assert_eq!(filter_input(InputField::Alias, "A&B"), "AB");
        assert!(is_phoneme_char('<'));
        assert!(is_phoneme_char('\u{0303}'));
        assert!(!is_phoneme_char('K'));
    }

    #[test]
    fn test_xml_representable_chars() {
        for c in ['&', '<', '>', '"', '\'', '\t', '\n', 'é', 'ə'] {
            assert!(is_xml_representable_char(c), "{:?}", c);
        }
        for c in ['\u{0}', '\u{1}', '\u{1B}', '\u{7F}', '\u{FFFE}'] {
            assert!(!is_xml_representable_char(c), "{:?}", c);
        }
    }

    #[test]
    fn test_report_keys_by_index() {
        let entries = vec![
            LexiconEntry::with_phoneme(["a"], "ə"),
            LexiconEntry::placeholder(),
            LexiconEntry::with_phoneme(["b"], "B"),
        ];
        let report = ValidationReport::for_entries(&entries);
        assert!(!report.is_clean());
        assert_eq!(report.first_invalid(), Some(1));
        assert!(report.for_index(0).is_empty());
        assert_eq!(report.for_index(2).len(), 1);

        let invalid = report.invalid_entries(&entries);
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid[1].grapheme, "b");
    }

    #[test]
    fn test_structural_errors() {
        let entries = vec![
            LexiconEntry::with_phoneme(["ok"], "oʊkeɪ"),
            LexiconEntry::with_phoneme([""], "ə"),
            LexiconEntry::with_alias(["R\u{1}D"], "research"),
            LexiconEntry::with_alias(["AT&T", "<R&D>"], "a \"quoted\" name"),
            LexiconEntry::with_phoneme(["bad"], "NOT IPA"),
            LexiconEntry {
                graphemes: vec!["nothing".to_string()],
                ..Default::default()
            },
        ];
        let errors = structural_errors(&entries);
        let indexes: Vec<usize> = errors.iter().map(|e| e.index).collect();
        // Markup characters are escaped on encode and the phoneme alphabet is
        // not a structural rule.
        assert_eq!(indexes, vec![1, 2, 5]);
    }
}
