//! Lexicon entry model.
//!
//! A [`LexiconEntry`] maps one or more written forms (graphemes) to a spoken
//! form: an alias (substitute text), an IPA phoneme string, or both. Each of
//! the two spoken forms may carry an SSML `interpret-as` hint ([`SayAs`]).
//!
//! Empty strings stand for "absent" so that the model lines up one-to-one with
//! the editor's form fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Grapheme text of the sentinel entry that seeds a brand-new lexicon.
pub const NEW_ENTRY_PLACEHOLDER: &str = "*** NEW ENTRY ***";

/// Language used when neither the file nor the caller supplies one.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// SSML `interpret-as` categories accepted on an alias or phoneme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum SayAs {
    /// Postal address
    Address,
    /// Cardinal number
    Cardinal,
    /// Letter by letter
    Characters,
    /// Amount of money
    Currency,
    /// Calendar date
    Date,
    /// Digit by digit
    Digits,
    /// Length of time
    Duration,
    /// Fraction
    Fraction,
    /// Proper name
    Name,
    /// Number
    Number,
    /// Ordinal number
    Ordinal,
    /// Spelled out
    SpellOut,
    /// Telephone number
    Telephone,
    /// Time of day
    Time,
}

impl SayAs {
    /// Every member of the vocabulary, in display order.
    pub const ALL: [SayAs; 14] = [
        SayAs::Address,
        SayAs::Cardinal,
        SayAs::Characters,
        SayAs::Currency,
        SayAs::Date,
        SayAs::Digits,
        SayAs::Duration,
        SayAs::Fraction,
        SayAs::Name,
        SayAs::Number,
        SayAs::Ordinal,
        SayAs::SpellOut,
        SayAs::Telephone,
        SayAs::Time,
    ];

    /// The attribute value written to `interpret-as`.
    pub fn as_str(self) -> &'static str {
        match self {
            SayAs::Address => "address",
            SayAs::Cardinal => "cardinal",
            SayAs::Characters => "characters",
            SayAs::Currency => "currency",
            SayAs::Date => "date",
            SayAs::Digits => "digits",
            SayAs::Duration => "duration",
            SayAs::Fraction => "fraction",
            SayAs::Name => "name",
            SayAs::Number => "number",
            SayAs::Ordinal => "ordinal",
            SayAs::SpellOut => "spell-out",
            SayAs::Telephone => "telephone",
            SayAs::Time => "time",
        }
    }

    /// Lenient parse used by the codecs: blank or unknown values are `None`.
    pub fn parse_lenient(value: &str) -> Option<SayAs> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.parse() {
            Ok(say_as) => Some(say_as),
            Err(_) => {
                log::warn!("Dropping unknown interpret-as value '{}'", value);
                None
            }
        }
    }
}

impl FromStr for SayAs {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SayAs::ALL
            .into_iter()
            .find(|say_as| say_as.as_str() == wanted)
            .ok_or(())
    }
}

impl fmt::Display for SayAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pronunciation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LexiconEntry {
    /// Spellings that share this pronunciation, in display order
    pub graphemes: Vec<String>,
    /// Substitute text spoken instead of the grapheme
    #[serde(default)]
    pub alias: String,
    /// Interpretation hint for the alias
    #[serde(default)]
    pub alias_say_as: Option<SayAs>,
    /// IPA pronunciation
    #[serde(default)]
    pub phoneme: String,
    /// Interpretation hint for the phoneme
    #[serde(default)]
    pub phoneme_say_as: Option<SayAs>,
    /// Created or altered in this session and not yet saved. Never written by the codecs.
    #[serde(default)]
    pub is_new: bool,
}

impl LexiconEntry {
    /// Entry with graphemes and a phoneme.
    pub fn with_phoneme<I, S>(graphemes: I, phoneme: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            graphemes: graphemes.into_iter().map(Into::into).collect(),
            phoneme: phoneme.into(),
            ..Default::default()
        }
    }

    /// Entry with graphemes and an alias.
    pub fn with_alias<I, S>(graphemes: I, alias: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            graphemes: graphemes.into_iter().map(Into::into).collect(),
            alias: alias.into(),
            ..Default::default()
        }
    }

    /// The sentinel entry used to seed an empty lexicon.
    pub fn placeholder() -> Self {
        Self {
            graphemes: vec![NEW_ENTRY_PLACEHOLDER.to_string()],
            is_new: true,
            ..Default::default()
        }
    }

    /// True for the sentinel: only the placeholder grapheme, no alias, no phoneme.
    pub fn is_placeholder(&self) -> bool {
        !self.has_content()
            && self
                .graphemes
                .iter()
                .all(|g| g.trim().is_empty() || g == NEW_ENTRY_PLACEHOLDER)
    }

    /// Non-empty alias or phoneme.
    pub fn has_content(&self) -> bool {
        self.has_alias() || self.has_phoneme()
    }

    /// Alias holds non-whitespace text.
    pub fn has_alias(&self) -> bool {
        !self.alias.trim().is_empty()
    }

    /// Phoneme holds non-whitespace text.
    pub fn has_phoneme(&self) -> bool {
        !self.phoneme.trim().is_empty()
    }

    /// First grapheme, or `""` for an entry without any.
    pub fn first_grapheme(&self) -> &str {
        self.graphemes.first().map(String::as_str).unwrap_or("")
    }

    /// Case-insensitive key the list is ordered by.
    pub fn sort_key(&self) -> String {
        self.first_grapheme().to_lowercase()
    }

    /// Graphemes that hold real text (trimmed, non-placeholder).
    pub fn real_graphemes(&self) -> impl Iterator<Item = &str> {
        self.graphemes
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty() && *g != NEW_ENTRY_PLACEHOLDER)
    }

    /// Say-as hint that applies to the alias, only when there is an alias.
    pub fn effective_alias_say_as(&self) -> Option<SayAs> {
        self.alias_say_as.filter(|_| self.has_alias())
    }

    /// Say-as hint that applies to the phoneme, only when there is a phoneme.
    pub fn effective_phoneme_say_as(&self) -> Option<SayAs> {
        self.phoneme_say_as.filter(|_| self.has_phoneme())
    }
}

/// An ordered entry list together with its language and file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Lexicon {
    /// BCP-47 style language tag (`xml:lang`)
    pub language: String,
    /// Blob name, `None` until first saved
    pub filename: Option<String>,
    /// Entries, sorted case-insensitively by first grapheme
    pub entries: Vec<LexiconEntry>,
}

impl Lexicon {
    /// Unsaved lexicon with the given entries.
    pub fn new(language: impl Into<String>, entries: Vec<LexiconEntry>) -> Self {
        Self {
            language: language.into(),
            filename: None,
            entries,
        }
    }

    /// A brand-new lexicon holding only the sentinel entry.
    pub fn empty(language: impl Into<String>) -> Self {
        Self::new(language, vec![LexiconEntry::placeholder()])
    }

    /// True when the only entry is the unmodified sentinel.
    pub fn is_sentinel_only(&self) -> bool {
        is_sentinel_only(&self.entries)
    }
}

/// True when `entries` holds nothing but the sentinel (or nothing at all).
pub fn is_sentinel_only(entries: &[LexiconEntry]) -> bool {
    entries.iter().all(LexiconEntry::is_placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_as_from_str() {
        assert_eq!("digits".parse::<SayAs>(), Ok(SayAs::Digits));
        assert_eq!(" Spell-Out ".parse::<SayAs>(), Ok(SayAs::SpellOut));
        assert!("shouting".parse::<SayAs>().is_err());
        assert_eq!(SayAs::parse_lenient(""), None);
        assert_eq!(SayAs::parse_lenient("bogus"), None);
        assert_eq!(SayAs::parse_lenient("date"), Some(SayAs::Date));
    }

    #[test]
    fn test_say_as_serde_names() {
        let json = serde_json::to_string(&SayAs::SpellOut).unwrap();
        assert_eq!(json, "\"spell-out\"");
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(LexiconEntry::placeholder().is_placeholder());

        let mut edited = LexiconEntry::placeholder();
        edited.phoneme = "kæt".to_string();
        assert!(!edited.is_placeholder());

        assert!(Lexicon::empty("en-US").is_sentinel_only());
        assert!(!is_sentinel_only(&[LexiconEntry::with_phoneme(["cat"], "kæt")]));
    }

    #[test]
    fn test_effective_say_as_requires_value() {
        let entry = LexiconEntry {
            graphemes: vec!["2024".to_string()],
            alias_say_as: Some(SayAs::Date),
            phoneme: "tu".to_string(),
            phoneme_say_as: Some(SayAs::Cardinal),
            ..Default::default()
        };
        assert_eq!(entry.effective_alias_say_as(), None);
        assert_eq!(entry.effective_phoneme_say_as(), Some(SayAs::Cardinal));
    }

    #[test]
    fn test_entry_json_uses_camel_case() {
        let entry = LexiconEntry::with_alias(["WHO"], "World Health Organization");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["alias"], "World Health Organization");
        assert_eq!(json["isNew"], false);
        assert!(json.get("aliasSayAs").is_some());
    }
}
