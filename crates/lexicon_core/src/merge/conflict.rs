//! Conflict records produced while merging an incoming lexicon.
//!
//! A conflict pairs one master entry with one incoming entry that share at
//! least one grapheme but are not identical. The caller picks a
//! [`Resolution`] for each before the merge can be finalized.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entry::LexiconEntry;

/// Why two entries were reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ConflictType {
    /// Same graphemes (ignoring case) and the same phoneme: the entries differ
    /// only in letter casing or alias.
    AdditionalAlias,
    /// The pronunciation itself differs.
    Conflict,
}

impl FromStr for ConflictType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "additional_alias" | "additional-alias" | "alias" => Ok(ConflictType::AdditionalAlias),
            "conflict" => Ok(ConflictType::Conflict),
            _ => Err(()),
        }
    }
}

/// How to resolve a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Resolution {
    /// Keep the master entry unchanged.
    Master,
    /// Replace the master entry with the incoming one.
    Merge,
    /// Union the graphemes; incoming alias/phoneme win where present.
    Both,
}

impl FromStr for Resolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "master" | "keep-master" | "keep_master" => Ok(Resolution::Master),
            "merge" | "incoming" | "keep-incoming" | "keep_incoming" => Ok(Resolution::Merge),
            "both" | "combine" => Ok(Resolution::Both),
            _ => Err(()),
        }
    }
}

/// One master/incoming pair awaiting (or carrying) a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MergeConflict {
    /// Position of the master entry in the master list
    pub master_index: usize,
    /// Copy of the master entry at classification time
    pub master: LexiconEntry,
    /// Position of the incoming entry in the incoming list
    pub incoming_index: usize,
    /// Copy of the incoming entry
    pub incoming: LexiconEntry,
    /// Lowercased graphemes both entries contain, in master order
    pub shared_graphemes: Vec<String>,
    /// Full or partial grapheme overlap
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    /// Chosen resolution, `None` while open
    pub resolution: Option<Resolution>,
}

impl MergeConflict {
    /// A resolution has been chosen.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Graphemes of `entry`, lowercased, as a set.
pub(crate) fn grapheme_set(entry: &LexiconEntry) -> HashSet<String> {
    entry.graphemes.iter().map(|g| g.trim().to_lowercase()).collect()
}

/// Same exact grapheme set (order-independent), same alias ignoring case,
/// same phoneme.
pub fn identical(a: &LexiconEntry, b: &LexiconEntry) -> bool {
    let exact = |e: &LexiconEntry| -> HashSet<String> {
        e.graphemes.iter().map(|g| g.trim().to_string()).collect()
    };
    exact(a) == exact(b)
        && a.alias.trim().to_lowercase() == b.alias.trim().to_lowercase()
        && a.phoneme.trim() == b.phoneme.trim()
}

/// Same grapheme set ignoring case and the same phoneme; alias ignored.
pub fn phonetically_identical(a: &LexiconEntry, b: &LexiconEntry) -> bool {
    grapheme_set(a) == grapheme_set(b) && a.phoneme.trim() == b.phoneme.trim()
}

/// Lowercased graphemes present in both entries, in `master` order.
pub fn shared_graphemes(master: &LexiconEntry, incoming: &LexiconEntry) -> Vec<String> {
    let incoming = grapheme_set(incoming);
    let mut seen = HashSet::new();
    master
        .graphemes
        .iter()
        .map(|g| g.trim().to_lowercase())
        .filter(|g| incoming.contains(g) && seen.insert(g.clone()))
        .collect()
}
