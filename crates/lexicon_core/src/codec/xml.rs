//! PLS (Pronunciation Lexicon Specification) XML codec.
//!
//! Canonical output:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <lexicon version="1.0" xml:lang="en-US" alphabet="ipa" xmlns="http://www.w3.org/2005/01/pronunciation-lexicon">
//!   <lexeme>
//!     <grapheme>WHO</grapheme>
//!     <alias interpret-as="characters">W H O</alias>
//!   </lexeme>
//! </lexicon>
//! ```
//!
//! Decoding also accepts the legacy `<entry>` element in place of `<lexeme>`,
//! and namespace-prefixed element names.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::codec::{strip_bom, Format};
use crate::entry::{Lexicon, LexiconEntry, SayAs};
use crate::error::{LexiconError, Result};

/// Namespace of PLS 1.0 documents.
pub const PLS_NAMESPACE: &str = "http://www.w3.org/2005/01/pronunciation-lexicon";

#[derive(Clone, Copy)]
enum Field {
    Grapheme,
    Alias,
    Phoneme,
}

fn parse_error(message: impl Into<String>) -> LexiconError {
    LexiconError::parse(Format::Xml, message)
}

/// Value of an attribute matched by its full (possibly prefixed) name.
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| parse_error(format!("Bad attribute: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| parse_error(format!("Bad attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a PLS document.
pub fn decode(text: &str, fallback_language: &str) -> Result<Lexicon> {
    let mut reader = Reader::from_str(strip_bom(text));

    let mut saw_root = false;
    let mut language: Option<String> = None;
    let mut entries = Vec::new();
    let mut current: Option<LexiconEntry> = None;
    let mut field: Option<Field> = None;
    let mut say_as: Option<SayAs> = None;
    let mut buffer = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            parse_error(format!(
                "Malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();
                let name = name.as_ref();

                if !saw_root {
                    if name != b"lexicon" {
                        return Err(parse_error(format!(
                            "Root element is <{}>, expected <lexicon>",
                            String::from_utf8_lossy(name)
                        )));
                    }
                    saw_root = true;
                    language = attribute(e, b"xml:lang")?;
                    continue;
                }

                match name {
                    b"lexeme" | b"entry" => {
                        if is_empty {
                            entries.push(LexiconEntry::default());
                        } else {
                            current = Some(LexiconEntry::default());
                        }
                    }
                    b"grapheme" | b"alias" | b"phoneme" if current.is_some() && !is_empty => {
                        field = Some(match name {
                            b"grapheme" => Field::Grapheme,
                            b"alias" => Field::Alias,
                            _ => Field::Phoneme,
                        });
                        say_as = attribute(e, b"interpret-as")?
                            .as_deref()
                            .and_then(SayAs::parse_lenient);
                        buffer.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if field.is_some() {
                    let text = e
                        .unescape()
                        .map_err(|e| parse_error(format!("Bad text content: {}", e)))?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    buffer.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(ref e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"grapheme" | b"alias" | b"phoneme" => {
                        if let (Some(entry), Some(f)) = (current.as_mut(), field.take()) {
                            let value = buffer.trim().to_string();
                            match f {
                                Field::Grapheme => {
                                    if !value.is_empty() {
                                        entry.graphemes.push(value);
                                    }
                                }
                                Field::Alias => {
                                    entry.alias = value;
                                    entry.alias_say_as = say_as.take();
                                }
                                Field::Phoneme => {
                                    entry.phoneme = value;
                                    entry.phoneme_say_as = say_as.take();
                                }
                            }
                        }
                    }
                    b"lexeme" | b"entry" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(parse_error("No <lexicon> root element found"));
    }
    if current.is_some() {
        return Err(parse_error("Unclosed <lexeme> element"));
    }
    if entries.is_empty() {
        return Err(parse_error("No <lexeme> or <entry> elements found"));
    }

    let language = language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| fallback_language.to_string());

    log::debug!(
        "Decoded PLS document: {} entries, language {}",
        entries.len(),
        language
    );
    Ok(Lexicon::new(language, entries))
}

fn push_element(out: &mut String, name: &str, say_as: Option<SayAs>, value: &str) {
    out.push_str("    <");
    out.push_str(name);
    if let Some(say_as) = say_as {
        out.push_str(" interpret-as=\"");
        out.push_str(say_as.as_str());
        out.push('"');
    }
    out.push('>');
    out.push_str(&escape(value));
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

/// Serialize entries as a PLS document.
pub fn encode(language: &str, entries: &[LexiconEntry]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<lexicon version=\"1.0\" xml:lang=\"{}\" alphabet=\"ipa\" xmlns=\"{}\">\n",
        escape(language.trim()),
        PLS_NAMESPACE
    ));

    for entry in entries {
        out.push_str("  <lexeme>\n");
        for grapheme in entry.graphemes.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
            push_element(&mut out, "grapheme", None, grapheme);
        }
        if entry.has_alias() {
            push_element(&mut out, "alias", entry.effective_alias_say_as(), entry.alias.trim());
        }
        if entry.has_phoneme() {
            push_element(
                &mut out,
                "phoneme",
                entry.effective_phoneme_say_as(),
                entry.phoneme.trim(),
            );
        }
        out.push_str("  </lexeme>\n");
    }

    out.push_str("</lexicon>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<lexicon version="1.0" xmlns="http://www.w3.org/2005/01/pronunciation-lexicon"
         alphabet="ipa" xml:lang="en-GB">
  <lexeme>
    <grapheme>WHO</grapheme>
    <alias interpret-as="characters">W H O</alias>
  </lexeme>
  <entry>
    <grapheme>tomato</grapheme>
    <grapheme>tomatoes</grapheme>
    <phoneme interpret-as="whispered">təˈmɑːtəʊ</phoneme>
  </entry>
  <lexeme>
    <grapheme><![CDATA[R&D]]></grapheme>
    <alias>research &amp; development</alias>
  </lexeme>
</lexicon>"#;

    #[test]
    fn test_decode_lexeme_and_legacy_entry() {
        let lexicon = decode(SAMPLE, "en-US").unwrap();
        assert_eq!(lexicon.language, "en-GB");
        assert_eq!(lexicon.entries.len(), 3);

        let who = &lexicon.entries[0];
        assert_eq!(who.graphemes, vec!["WHO"]);
        assert_eq!(who.alias, "W H O");
        assert_eq!(who.alias_say_as, Some(SayAs::Characters));

        let tomato = &lexicon.entries[1];
        assert_eq!(tomato.graphemes, vec!["tomato", "tomatoes"]);
        assert_eq!(tomato.phoneme, "təˈmɑːtəʊ");
        // unknown interpret-as values are dropped
        assert_eq!(tomato.phoneme_say_as, None);

        let rd = &lexicon.entries[2];
        assert_eq!(rd.graphemes, vec!["R&D"]);
        assert_eq!(rd.alias, "research & development");
    }

    #[test]
    fn test_decode_prefixed_elements_and_default_language() {
        let text = r#"<pls:lexicon xmlns:pls="http://www.w3.org/2005/01/pronunciation-lexicon">
            <pls:lexeme><pls:grapheme>cat</pls:grapheme><pls:phoneme>kæt</pls:phoneme></pls:lexeme>
        </pls:lexicon>"#;
        let lexicon = decode(text, "en-AU").unwrap();
        assert_eq!(lexicon.language, "en-AU");
        assert_eq!(lexicon.entries[0].phoneme, "kæt");
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode("<lexicon><lexeme>", "en-US"),
            Err(LexiconError::Parse { format: Format::Xml, .. })
        ));
        let err = decode("<dictionary><lexeme/></dictionary>", "en-US").unwrap_err();
        assert!(err.to_string().contains("expected <lexicon>"));
        let err = decode("<lexicon version=\"1.0\"></lexicon>", "en-US").unwrap_err();
        assert!(err.to_string().contains("No <lexeme>"));
        let err = decode("", "en-US").unwrap_err();
        assert!(err.to_string().contains("root element"));
    }

    #[test]
    fn test_encode_layout() {
        let entries = vec![LexiconEntry {
            graphemes: vec!["Dr.".to_string()],
            alias: "Doctor".to_string(),
            alias_say_as: Some(SayAs::Name),
            phoneme_say_as: Some(SayAs::Digits),
            ..Default::default()
        }];
        let xml = encode("en-US", &entries);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<lexicon version=\"1.0\" xml:lang=\"en-US\" alphabet=\"ipa\""));
        assert!(xml.contains("    <alias interpret-as=\"name\">Doctor</alias>\n"));
        // say-as without a phoneme is not written
        assert!(!xml.contains("<phoneme"));
        assert!(!xml.contains("digits"));
    }

    #[test]
    fn test_round_trip() {
        let lexicon = decode(SAMPLE, "en-US").unwrap();
        let encoded = encode(&lexicon.language, &lexicon.entries);
        let again = decode(&encoded, "en-US").unwrap();
        assert_eq!(again, lexicon);
        assert_eq!(encode(&again.language, &again.entries), encoded);
    }
}
