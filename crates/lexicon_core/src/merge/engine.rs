use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::conflict::{
    ConflictType, MergeConflict, Resolution, grapheme_set, identical, phonetically_identical,
    shared_graphemes,
};
use crate::entry::LexiconEntry;
use crate::error::{LexiconError, Result};
use crate::ordering::sort_entries;
use crate::validate::{structural_errors, validate};

/// Counts reported when a merge completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MergeSummary {
    /// Incoming entries added because no master entry shared a grapheme
    pub new_entries: usize,
    /// Conflicts that carried a resolution at finalize time
    pub conflicts_resolved: usize,
    /// Incoming entries identical to every master entry they matched
    pub identical_skipped: usize,
    /// Unmatched incoming entries dropped because an earlier added or resolved
    /// entry already holds one of their graphemes (compared ignoring case)
    pub duplicates_skipped: usize,
    /// Number of incoming entries examined
    pub total_processed: usize,
    /// Incoming entries with non-blocking validation problems (e.g. phoneme alphabet)
    pub errors_found: usize,
}

/// The merged entry list and what happened to produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MergeResult {
    /// Merged entries, sorted by first grapheme
    pub entries: Vec<LexiconEntry>,
    /// Counts of what happened to each incoming entry
    pub summary: MergeSummary,
}

/// Result of starting a merge.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// No conflicts: the merge finished immediately.
    Completed(MergeResult),
    /// At least one conflict needs a resolution before [`PendingMerge::finalize`].
    NeedsResolution(PendingMerge),
}

/// A classified merge waiting for conflict resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMerge {
    master: Vec<LexiconEntry>,
    new_entries: Vec<(usize, LexiconEntry)>,
    conflicts: Vec<MergeConflict>,
    identical_skipped: usize,
    total_incoming: usize,
    errors_found: usize,
}

/// Classifies an incoming entry list against the master list.
pub struct MergeEngine;

impl MergeEngine {
    /// Run the language and structural gates, then classify every incoming entry.
    ///
    /// Languages are compared ignoring ASCII case. Any structurally invalid
    /// incoming entry blocks the whole merge.
    pub fn begin(
        master_language: &str,
        master: &[LexiconEntry],
        incoming_language: &str,
        incoming: &[LexiconEntry],
    ) -> Result<MergeOutcome> {
        if !master_language
            .trim()
            .eq_ignore_ascii_case(incoming_language.trim())
        {
            return Err(LexiconError::LanguageMismatch {
                master: master_language.to_string(),
                incoming: incoming_language.to_string(),
            });
        }

        let errors = structural_errors(incoming);
        if !errors.is_empty() {
            log::warn!("Merge blocked: {} invalid incoming entries", errors.len());
            return Err(LexiconError::MergeBlocked { errors });
        }

        let pending = Self::classify(master, incoming);
        if pending.conflicts.is_empty() {
            log::info!(
                "Merge completed without conflicts: {} new, {} identical",
                pending.new_entries.len(),
                pending.identical_skipped
            );
            Ok(MergeOutcome::Completed(pending.finalize()?))
        } else {
            log::info!(
                "Merge paused with {} conflict(s) to resolve",
                pending.conflicts.len()
            );
            Ok(MergeOutcome::NeedsResolution(pending))
        }
    }

    /// Classify without the gates. Every master entry that shares a grapheme
    /// with an incoming entry is compared independently.
    pub fn classify(master: &[LexiconEntry], incoming: &[LexiconEntry]) -> PendingMerge {
        let master_sets: Vec<HashSet<String>> = master.iter().map(grapheme_set).collect();

        let mut new_entries = Vec::new();
        let mut conflicts = Vec::new();
        let mut identical_skipped = 0;
        let mut errors_found = 0;

        for (incoming_index, entry) in incoming.iter().enumerate() {
            if !validate(entry).is_empty() {
                errors_found += 1;
            }

            let set = grapheme_set(entry);
            let matches: Vec<usize> = master_sets
                .iter()
                .enumerate()
                .filter(|(_, master_set)| !master_set.is_disjoint(&set))
                .map(|(i, _)| i)
                .collect();

            if matches.is_empty() {
                log::debug!("New entry '{}'", entry.first_grapheme());
                new_entries.push((incoming_index, entry.clone()));
                continue;
            }

            let mut conflicted = false;
            for master_index in matches {
                let existing = &master[master_index];
                if identical(existing, entry) {
                    continue;
                }
                let conflict_type = if phonetically_identical(existing, entry) {
                    ConflictType::AdditionalAlias
                } else {
                    ConflictType::Conflict
                };
                log::debug!(
                    "Conflict ({:?}) between master #{} '{}' and incoming #{} '{}'",
                    conflict_type,
                    master_index,
                    existing.first_grapheme(),
                    incoming_index,
                    entry.first_grapheme()
                );
                conflicts.push(MergeConflict {
                    master_index,
                    master: existing.clone(),
                    incoming_index,
                    incoming: entry.clone(),
                    shared_graphemes: shared_graphemes(existing, entry),
                    conflict_type,
                    resolution: None,
                });
                conflicted = true;
            }

            if !conflicted {
                identical_skipped += 1;
            }
        }

        PendingMerge {
            master: master.to_vec(),
            new_entries,
            conflicts,
            identical_skipped,
            total_incoming: incoming.len(),
            errors_found,
        }
    }
}

/// Graphemes of `master` first, then incoming graphemes not already present
/// (compared ignoring case).
fn union_graphemes(master: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = master.iter().map(|g| g.trim().to_lowercase()).collect();
    let mut graphemes = master.to_vec();
    for grapheme in incoming {
        if seen.insert(grapheme.trim().to_lowercase()) {
            graphemes.push(grapheme.clone());
        }
    }
    graphemes
}

fn combine(master: &LexiconEntry, incoming: &LexiconEntry) -> LexiconEntry {
    let mut combined = master.clone();
    combined.graphemes = union_graphemes(&master.graphemes, &incoming.graphemes);
    if incoming.has_alias() {
        combined.alias = incoming.alias.clone();
        combined.alias_say_as = incoming.alias_say_as;
    }
    if incoming.has_phoneme() {
        combined.phoneme = incoming.phoneme.clone();
        combined.phoneme_say_as = incoming.phoneme_say_as;
    }
    combined.is_new = true;
    combined
}

impl PendingMerge {
    /// Conflicts in incoming order.
    pub fn conflicts(&self) -> &[MergeConflict] {
        &self.conflicts
    }

    /// Incoming entries that matched nothing in the master list.
    pub fn new_entries(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.new_entries.iter().map(|(_, entry)| entry)
    }

    /// Incoming entries equal to a master entry.
    pub fn identical_skipped(&self) -> usize {
        self.identical_skipped
    }

    /// Entries in the incoming file.
    pub fn total_incoming(&self) -> usize {
        self.total_incoming
    }

    /// Set the resolution of one conflict.
    pub fn resolve(&mut self, index: usize, resolution: Resolution) -> Result<()> {
        let conflict = self
            .conflicts
            .get_mut(index)
            .ok_or(LexiconError::ConflictIndexOutOfRange(index))?;
        conflict.resolution = Some(resolution);
        Ok(())
    }

    /// Apply one resolution to every conflict. Returns how many were set.
    pub fn resolve_all(&mut self, resolution: Resolution) -> usize {
        for conflict in &mut self.conflicts {
            conflict.resolution = Some(resolution);
        }
        self.conflicts.len()
    }

    /// Apply one resolution to every conflict of the given type. Returns how many were set.
    pub fn resolve_all_of_type(&mut self, conflict_type: ConflictType, resolution: Resolution) -> usize {
        let mut count = 0;
        for conflict in self
            .conflicts
            .iter_mut()
            .filter(|c| c.conflict_type == conflict_type)
        {
            conflict.resolution = Some(resolution);
            count += 1;
        }
        count
    }

    /// Conflicts still without a resolution.
    pub fn unresolved_count(&self) -> usize {
        self.conflicts.iter().filter(|c| !c.is_resolved()).count()
    }

    /// Ready to finalize.
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved_count() == 0
    }

    /// Apply every resolution, add unmatched incoming entries and sort.
    ///
    /// Fails without touching `self` while any conflict is unresolved.
    pub fn finalize(&self) -> Result<MergeResult> {
        let unresolved = self.unresolved_count();
        if unresolved > 0 {
            return Err(LexiconError::UnresolvedConflicts(unresolved));
        }

        let mut entries = self.master.clone();
        for conflict in &self.conflicts {
            let Some(slot) = entries.get_mut(conflict.master_index) else {
                continue;
            };
            match conflict.resolution {
                Some(Resolution::Master) | None => {}
                Some(Resolution::Merge) => {
                    let mut replacement = conflict.incoming.clone();
                    replacement.is_new = true;
                    *slot = replacement;
                }
                Some(Resolution::Both) => {
                    *slot = combine(slot, &conflict.incoming);
                }
            }
        }

        let in_conflicts: HashSet<usize> =
            self.conflicts.iter().map(|c| c.incoming_index).collect();
        let mut known: HashSet<String> = entries.iter().flat_map(grapheme_set).collect();

        let mut added = 0;
        let mut duplicates_skipped = 0;
        for (incoming_index, entry) in &self.new_entries {
            if in_conflicts.contains(incoming_index) {
                continue;
            }
            let set = grapheme_set(entry);
            if !known.is_disjoint(&set) {
                log::warn!(
                    "Skipping incoming #{} '{}': grapheme already present",
                    incoming_index,
                    entry.first_grapheme()
                );
                duplicates_skipped += 1;
                continue;
            }
            known.extend(set);

            let mut entry = entry.clone();
            entry.is_new = true;
            entries.push(entry);
            added += 1;
        }

        sort_entries(&mut entries);

        Ok(MergeResult {
            entries,
            summary: MergeSummary {
                new_entries: added,
                conflicts_resolved: self.conflicts.len(),
                identical_skipped: self.identical_skipped,
                duplicates_skipped,
                total_processed: self.total_incoming,
                errors_found: self.errors_found,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SayAs;

    fn begin(master: &[LexiconEntry], incoming: &[LexiconEntry]) -> MergeOutcome {
        MergeEngine::begin("en-US", master, "en-US", incoming).unwrap()
    }

    fn pending(outcome: MergeOutcome) -> PendingMerge {
        match outcome {
            MergeOutcome::NeedsResolution(p) => p,
            MergeOutcome::Completed(r) => panic!("expected conflicts, got {:?}", r.summary),
        }
    }

    fn completed(outcome: MergeOutcome) -> MergeResult {
        match outcome {
            MergeOutcome::Completed(r) => r,
            MergeOutcome::NeedsResolution(p) => {
                panic!("expected completion, got {} conflicts", p.conflicts().len())
            }
        }
    }

    #[test]
    fn test_identical_entry_is_skipped() {
        let master = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let incoming = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let result = completed(begin(&master, &incoming));
        assert_eq!(result.entries, master);
        assert_eq!(
            result.summary,
            MergeSummary {
                new_entries: 0,
                conflicts_resolved: 0,
                identical_skipped: 1,
                duplicates_skipped: 0,
                total_processed: 1,
                errors_found: 0,
            }
        );
    }

    #[test]
    fn test_case_only_difference_is_additional_alias() {
        let master = vec![LexiconEntry::with_phoneme(["Cat"], "kæt")];
        let incoming = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let merge = pending(begin(&master, &incoming));
        assert_eq!(merge.conflicts().len(), 1);
        assert_eq!(merge.conflicts()[0].conflict_type, ConflictType::AdditionalAlias);
        assert_eq!(merge.conflicts()[0].shared_graphemes, vec!["cat"]);
    }

    #[test]
    fn test_phoneme_difference_resolved_with_both() {
        let master = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let incoming = vec![LexiconEntry::with_phoneme(["cat"], "kat")];
        let mut merge = pending(begin(&master, &incoming));
        assert_eq!(merge.conflicts()[0].conflict_type, ConflictType::Conflict);

        merge.resolve(0, Resolution::Both).unwrap();
        let result = merge.finalize().unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].graphemes, vec!["cat"]);
        assert_eq!(result.entries[0].phoneme, "kat");
        assert!(result.entries[0].is_new);
        assert_eq!(result.summary.conflicts_resolved, 1);
    }

    #[test]
    fn test_finalize_requires_every_resolution() {
        let master = vec![
            LexiconEntry::with_phoneme(["cat"], "kæt"),
            LexiconEntry::with_phoneme(["dog"], "dɒg"),
        ];
        let incoming = vec![
            LexiconEntry::with_phoneme(["cat"], "kat"),
            LexiconEntry::with_phoneme(["dog"], "dog"),
        ];
        let mut merge = pending(begin(&master, &incoming));
        merge.resolve(0, Resolution::Merge).unwrap();
        let before = merge.clone();

        assert!(matches!(
            merge.finalize(),
            Err(LexiconError::UnresolvedConflicts(1))
        ));
        assert_eq!(merge, before);

        merge.resolve(1, Resolution::Master).unwrap();
        let result = merge.finalize().unwrap();
        assert_eq!(result.entries[0].phoneme, "kat");
        assert_eq!(result.entries[1].phoneme, "dɒg");
        assert!(!result.entries[1].is_new);
    }

    #[test]
    fn test_merge_resolution_replaces_master() {
        let master = vec![LexiconEntry {
            graphemes: vec!["Dr".to_string()],
            alias: "doctor".to_string(),
            ..Default::default()
        }];
        let incoming = vec![LexiconEntry {
            graphemes: vec!["Dr".to_string(), "Dr.".to_string()],
            alias: "drive".to_string(),
            alias_say_as: Some(SayAs::Address),
            ..Default::default()
        }];
        let mut merge = pending(begin(&master, &incoming));
        merge.resolve_all(Resolution::Merge);
        let result = merge.finalize().unwrap();
        assert_eq!(result.entries[0].graphemes, vec!["Dr", "Dr."]);
        assert_eq!(result.entries[0].alias, "drive");
        assert_eq!(result.entries[0].alias_say_as, Some(SayAs::Address));
    }

    #[test]
    fn test_both_keeps_master_values_incoming_lacks() {
        let master = vec![LexiconEntry {
            graphemes: vec!["IEEE".to_string()],
            alias: "I triple E".to_string(),
            phoneme: "aɪ".to_string(),
            ..Default::default()
        }];
        let incoming = vec![LexiconEntry::with_phoneme(["ieee", "I.E.E.E."], "aɪ trɪpəl iː")];
        let mut merge = pending(begin(&master, &incoming));
        merge.resolve(0, Resolution::Both).unwrap();
        let entry = &merge.finalize().unwrap().entries[0];
        assert_eq!(entry.graphemes, vec!["IEEE", "I.E.E.E."]);
        assert_eq!(entry.alias, "I triple E");
        assert_eq!(entry.phoneme, "aɪ trɪpəl iː");
    }

    #[test]
    fn test_incoming_matching_two_master_entries() {
        let master = vec![
            LexiconEntry::with_phoneme(["lead"], "liːd"),
            LexiconEntry::with_phoneme(["led"], "lɛd"),
        ];
        let incoming = vec![LexiconEntry::with_phoneme(["lead", "led"], "lɛd")];
        let merge = pending(begin(&master, &incoming));
        assert_eq!(merge.conflicts().len(), 2);
        let indexes: Vec<usize> = merge.conflicts().iter().map(|c| c.master_index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(merge.identical_skipped(), 0);
    }

    #[test]
    fn test_new_entries_added_sorted_and_deduplicated() {
        let master = vec![LexiconEntry::with_phoneme(["mango"], "ˈmæŋɡoʊ")];
        let incoming = vec![
            LexiconEntry::with_phoneme(["zucchini"], "zuːˈkiːni"),
            LexiconEntry::with_phoneme(["Apple"], "ˈæpəl"),
            LexiconEntry::with_phoneme(["apple"], "ˈæpl"),
        ];
        let result = completed(begin(&master, &incoming));
        let firsts: Vec<&str> = result.entries.iter().map(|e| e.first_grapheme()).collect();
        assert_eq!(firsts, vec!["Apple", "mango", "zucchini"]);
        assert_eq!(result.summary.new_entries, 2);
        assert!(result.entries[0].is_new);
        assert!(!result.entries[1].is_new);
    }

    #[test]
    fn test_every_incoming_entry_is_accounted_for() {
        let master = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let incoming = vec![
            LexiconEntry::with_phoneme(["Apple"], "æpəl"),
            LexiconEntry::with_phoneme(["apple"], "ɑpəl"),
            LexiconEntry::with_phoneme(["cat"], "kæt"),
        ];
        let summary = completed(begin(&master, &incoming)).summary;
        assert_eq!(summary.new_entries, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(summary.identical_skipped, 1);
        assert_eq!(
            summary.new_entries
                + summary.duplicates_skipped
                + summary.identical_skipped
                + summary.conflicts_resolved,
            summary.total_processed
        );
    }

    #[test]
    fn test_new_entry_shadowed_by_resolved_conflict_is_counted() {
        let master = vec![LexiconEntry::with_phoneme(["Dr"], "dɒktə")];
        let incoming = vec![
            LexiconEntry::with_phoneme(["Dr", "Dr."], "draɪv"),
            LexiconEntry::with_phoneme(["dr."], "dɒktə"),
        ];
        let mut merge = pending(begin(&master, &incoming));
        merge.resolve_all(Resolution::Both);
        let result = merge.finalize().unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.summary.new_entries, 0);
        assert_eq!(result.summary.duplicates_skipped, 1);
        assert_eq!(result.summary.conflicts_resolved, 1);
    }

    #[test]
    fn test_bulk_resolution_by_type() {
        let master = vec![
            LexiconEntry::with_phoneme(["Cat"], "kæt"),
            LexiconEntry::with_phoneme(["dog"], "dɒg"),
        ];
        let incoming = vec![
            LexiconEntry::with_phoneme(["cat"], "kæt"),
            LexiconEntry::with_phoneme(["dog"], "dɔg"),
        ];
        let mut merge = pending(begin(&master, &incoming));
        assert_eq!(
            merge.resolve_all_of_type(ConflictType::AdditionalAlias, Resolution::Both),
            1
        );
        assert_eq!(merge.unresolved_count(), 1);
        assert!(merge.resolve(5, Resolution::Master).is_err());
        assert_eq!(
            merge.resolve_all_of_type(ConflictType::Conflict, Resolution::Master),
            1
        );
        assert!(merge.is_fully_resolved());

        let result = merge.finalize().unwrap();
        assert_eq!(result.entries[0].graphemes, vec!["Cat"]);
        assert_eq!(result.entries[1].phoneme, "dɒg");
    }

    #[test]
    fn test_language_gate() {
        let err = MergeEngine::begin("en-US", &[], "de-DE", &[]).unwrap_err();
        assert!(matches!(err, LexiconError::LanguageMismatch { .. }));
        assert!(MergeEngine::begin("en-US", &[], "EN-us", &[]).is_ok());
    }

    #[test]
    fn test_structural_gate_blocks_everything() {
        let master = vec![LexiconEntry::with_phoneme(["cat"], "kæt")];
        let incoming = vec![
            LexiconEntry::with_phoneme(["dog"], "dɒg"),
            LexiconEntry::with_phoneme([""], "ə"),
        ];
        match MergeEngine::begin("en-US", &master, "en-US", &incoming) {
            Err(LexiconError::MergeBlocked { errors }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].index, 1);
            }
            other => panic!("expected MergeBlocked, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_blocking_problems_are_counted() {
        let incoming = vec![LexiconEntry::with_phoneme(["cat"], "KAT")];
        let result = completed(begin(&[], &incoming));
        assert_eq!(result.summary.errors_found, 1);
        assert_eq!(result.summary.new_entries, 1);
    }

    #[test]
    fn test_merging_master_into_itself_is_a_no_op() {
        let master = vec![
            LexiconEntry::with_alias(["ASAP"], "as soon as possible"),
            LexiconEntry::with_phoneme(["cat", "cats"], "kæt"),
            LexiconEntry::with_phoneme(["dog"], "dɒg"),
        ];
        let result = completed(begin(&master, &master));
        assert_eq!(result.entries, master);
        assert_eq!(result.summary.new_entries, 0);
        assert_eq!(result.summary.identical_skipped, master.len());
    }

    #[test]
    fn test_saved_xml_merges_back_into_itself() {
        let master = vec![
            LexiconEntry::with_alias(["<R&D>"], "research \"and\" development"),
            LexiconEntry::with_alias(["AT&T"], "A T and T"),
            LexiconEntry::with_phoneme(["cat"], "kæt"),
        ];
        let saved = crate::codec::xml::encode("en-US", &master);
        let incoming = crate::codec::xml::decode(&saved, "en-US").unwrap();
        assert_eq!(incoming.entries[1].graphemes, vec!["AT&T"]);

        let result = completed(
            MergeEngine::begin("en-US", &master, &incoming.language, &incoming.entries).unwrap(),
        );
        assert_eq!(result.entries, master);
        assert_eq!(result.summary.new_entries, 0);
        assert_eq!(result.summary.identical_skipped, incoming.entries.len());
    }
}
