//! Store commands: `list`, `publish`, `unpublish`, `delete`, `preview`

use lexicon_core::config::LexiconConfig;
use lexicon_core::error::{LexiconError, Result};
use lexicon_core::preview::PreviewLink;
use lexicon_core::store::{SettingsDocument, SettingsStore};
use serde::Serialize;

use crate::cli::util::{CliSession, block_on, open_session};

#[derive(Debug, Serialize)]
struct ListedLexicon {
    name: String,
    published: bool,
}

fn list(session: &mut CliSession) -> Result<Vec<ListedLexicon>> {
    let names = block_on(session.load_lexicon_names())?.to_vec();
    let text = block_on(session.settings().get_document())?;
    let document = SettingsDocument::parse(&text)
        .map_err(|e| LexiconError::Settings(e.to_string()))?;
    Ok(names
        .into_iter()
        .map(|name| ListedLexicon {
            published: document.references_name(&name),
            name,
        })
        .collect())
}

pub fn handle_list(config: LexiconConfig, json: bool) -> bool {
    let store_dir = config.store_dir.clone();
    let mut session = open_session(config, false);
    let lexicons = match list(&mut session) {
        Ok(lexicons) => lexicons,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    if json {
        match serde_json::to_string_pretty(&lexicons) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("✗ {}", e);
                return false;
            }
        }
        return true;
    }

    if lexicons.is_empty() {
        println!("No lexicons in {}", store_dir.display());
        return true;
    }
    for lexicon in &lexicons {
        let marker = if lexicon.published { " (published)" } else { "" };
        println!("{}{}", lexicon.name, marker);
    }
    true
}

pub fn handle_publish(
    mut config: LexiconConfig,
    name: &str,
    url: Option<String>,
    no_check: bool,
) -> bool {
    if url.is_some() {
        config.lexicon_base_url = url;
    }
    let mut session = open_session(config, !no_check);
    let result = block_on(async {
        session.open(name).await?;
        session.publish().await
    });

    match result {
        Ok(url) => {
            println!("✓ Published {}", name);
            println!("  URL: {}", url);
            true
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

pub fn handle_unpublish(config: LexiconConfig, name: &str) -> bool {
    let mut session = open_session(config, false);
    let result = block_on(async {
        session.open(name).await?;
        session.unpublish().await
    });

    match result {
        Ok(()) => {
            println!("✓ Unpublished {}", name);
            true
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

pub fn handle_delete(config: LexiconConfig, name: &str) -> bool {
    let mut session = open_session(config, false);
    match block_on(session.delete(name)) {
        Ok(()) => {
            println!("✓ Moved {} to deleted/", name);
            true
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

fn preview(session: &mut CliSession, name: &str, grapheme: &str) -> Result<Option<PreviewLink>> {
    block_on(session.open(name))?;
    let wanted = grapheme.trim().to_lowercase();
    let index = session
        .entries()
        .iter()
        .position(|entry| entry.real_graphemes().any(|g| g.to_lowercase() == wanted));
    match index {
        Some(index) => session.preview(index),
        None => Ok(None),
    }
}

pub fn handle_preview(
    mut config: LexiconConfig,
    name: &str,
    grapheme: &str,
    url: Option<String>,
) -> bool {
    if url.is_some() {
        config.preview_url = url;
    }
    let mut session = open_session(config, false);
    match preview(&mut session, name, grapheme) {
        Ok(Some(link)) => {
            println!("{}", link.url);
            println!("{}", link.ssml);
            true
        }
        Ok(None) => {
            eprintln!("✗ No entry for '{}' in {}", grapheme, name);
            false
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
    use lexicon_core::codec::{self, Format};
    use lexicon_core::entry::{Lexicon, LexiconEntry};

    fn store_with_lexicon() -> (tempfile::TempDir, LexiconConfig) {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = Lexicon::new("en-US", vec![LexiconEntry::with_alias(["SQL"], "sequel")]);
        std::fs::write(dir.path().join("terms.xml"), codec::encode(Format::Xml, &lexicon)).unwrap();
        let mut config = LexiconConfig::new(dir.path().to_path_buf());
        config.lexicon_base_url = Some("https://cdn.example.com/lexicons".to_string());
        (dir, config)
    }

    #[test]
    fn test_publish_list_unpublish_delete() {
        let (dir, config) = store_with_lexicon();

        assert!(handle_publish(config.clone(), "terms.xml", None, true));
        let mut session = open_session(config.clone(), false);
        let listed = list(&mut session).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].published);

        assert!(!handle_delete(config.clone(), "terms.xml"));
        assert!(handle_unpublish(config.clone(), "terms.xml"));
        assert!(handle_delete(config.clone(), "terms.xml"));
        assert!(dir.path().join("deleted").join("terms.xml").exists());
        assert!(handle_list(config, true));
    }

    #[test]
    fn test_preview_entry_by_grapheme() {
        let (_dir, config) = store_with_lexicon();
        let mut session = open_session(config.clone(), false);
        assert!(matches!(
            preview(&mut session, "terms.xml", "sql"),
            Err(LexiconError::NoPreviewUrl)
        ));

        let mut with_url = config.clone();
        with_url.preview_url = Some("https://tts.example.com/preview".to_string());
        let mut session = open_session(with_url, false);
        let link = preview(&mut session, "terms.xml", "sql").unwrap().unwrap();
        assert!(link.url.starts_with("https://tts.example.com/preview?language=en-US&script=SQL"));
        assert!(link.ssml.contains("https://cdn.example.com/lexicons/terms.xml"));
        assert!(preview(&mut session, "terms.xml", "nosql").unwrap().is_none());

        assert!(handle_preview(
            config,
            "terms.xml",
            "SQL",
            Some("https://tts.example.com/preview".to_string())
        ));
    }

    #[test]
    fn test_publish_without_url_fails() {
        let (_dir, mut config) = store_with_lexicon();
        config.lexicon_base_url = None;
        assert!(!handle_publish(config, "terms.xml", None, true));
    }
}
