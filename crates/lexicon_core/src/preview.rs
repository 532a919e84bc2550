//! Requests for the external TTS preview service.
//!
//! The core only builds the request; playing the audio is up to the host.

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entry::{LexiconEntry, SayAs};

const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

/// What to speak and with which lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PreviewRequest {
    /// Voice language, the lexicon's `xml:lang`
    pub language: String,
    /// Text to synthesize, normally the entry's first grapheme
    pub script: String,
    /// Say-as hint of the entry's alias or phoneme
    pub interpret_as: Option<SayAs>,
    /// Blob name of the lexicon to apply, when it has been saved
    pub lexicon_name: Option<String>,
}

impl PreviewRequest {
    /// Preview of `entry`'s first real grapheme. `None` when there is nothing to say.
    ///
    /// The phoneme's say-as hint wins over the alias's.
    pub fn for_entry(
        entry: &LexiconEntry,
        language: &str,
        lexicon_name: Option<&str>,
    ) -> Option<Self> {
        let script = entry.real_graphemes().next()?.to_string();
        Some(Self {
            language: language.to_string(),
            script,
            interpret_as: entry
                .effective_phoneme_say_as()
                .or_else(|| entry.effective_alias_say_as()),
            lexicon_name: lexicon_name.map(str::to_string),
        })
    }

    /// SSML document for the request. `lexicon_url` adds a `<lexicon>` reference.
    pub fn to_ssml(&self, lexicon_url: Option<&str>) -> String {
        let mut out = format!(
            "<speak version=\"1.1\" xmlns=\"{}\" xml:lang=\"{}\">",
            SSML_NAMESPACE,
            escape(&self.language)
        );
        if let Some(url) = lexicon_url {
            out.push_str(&format!("<lexicon uri=\"{}\"/>", escape(url)));
        }
        match self.interpret_as {
            Some(say_as) => out.push_str(&format!(
                "<say-as interpret-as=\"{}\">{}</say-as>",
                say_as,
                escape(&self.script)
            )),
            None => out.push_str(&escape(&self.script)),
        }
        out.push_str("</speak>");
        out
    }

    /// `endpoint` with the request as percent-encoded query parameters.
    pub fn to_url(&self, endpoint: &str) -> String {
        let mut params = vec![
            ("language", self.language.as_str()),
            ("script", self.script.as_str()),
        ];
        if let Some(say_as) = self.interpret_as {
            params.push(("interpretAs", say_as.as_str()));
        }
        if let Some(name) = &self.lexicon_name {
            params.push(("lexiconName", name.as_str()));
        }

        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", endpoint, separator, query)
    }

    /// Resolve the request against a preview endpoint.
    pub fn link(self, endpoint: &str, lexicon_url: Option<&str>) -> PreviewLink {
        PreviewLink {
            url: self.to_url(endpoint),
            ssml: self.to_ssml(lexicon_url),
            request: self,
        }
    }
}

/// A request ready to hand to the preview service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PreviewLink {
    /// The request this link was built from
    pub request: PreviewRequest,
    /// GET URL on the configured endpoint
    pub url: String,
    /// SSML body for services that accept it
    pub ssml: String,
}
