//! Alphabetical ordering of the entry list.
//!
//! Entries are kept sorted case-insensitively by their first grapheme. Sorting
//! is stable, so entries with equal keys keep their relative order.

use crate::entry::{LexiconEntry, NEW_ENTRY_PLACEHOLDER};

/// First index whose key is `>=` the key of `entry`, or `entries.len()`.
pub fn find_insertion_index(entries: &[LexiconEntry], entry: &LexiconEntry) -> usize {
    let key = entry.sort_key();
    entries
        .iter()
        .position(|existing| existing.sort_key() >= key)
        .unwrap_or(entries.len())
}

/// Insert `entry` at its sorted position and return that position.
pub fn insert_sorted(entries: &mut Vec<LexiconEntry>, entry: LexiconEntry) -> usize {
    let index = find_insertion_index(entries, &entry);
    entries.insert(index, entry);
    index
}

/// Move the entry at `index` to its sorted position among the others and
/// return its new index, so a selection can follow it.
///
/// Entries whose first grapheme is still empty or the placeholder stay put.
pub fn reposition(entries: &mut Vec<LexiconEntry>, index: usize) -> usize {
    let Some(entry) = entries.get(index) else {
        return index;
    };
    let first = entry.first_grapheme().trim();
    if first.is_empty() || first == NEW_ENTRY_PLACEHOLDER {
        return index;
    }

    let entry = entries.remove(index);
    insert_sorted(entries, entry)
}

/// Stable sort of the whole list.
pub fn sort_entries(entries: &mut [LexiconEntry]) {
    entries.sort_by_cached_key(LexiconEntry::sort_key);
}

/// True when keys are non-decreasing.
pub fn is_sorted(entries: &[LexiconEntry]) -> bool {
    entries
        .windows(2)
        .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(words: &[&str]) -> Vec<LexiconEntry> {
        words
            .iter()
            .map(|w| LexiconEntry::with_phoneme([*w], "ə"))
            .collect()
    }

    fn firsts(entries: &[LexiconEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.first_grapheme()).collect()
    }

    #[test]
    fn test_find_insertion_index_is_case_insensitive() {
        let list = entries(&["apple", "Banana", "cherry"]);
        assert_eq!(find_insertion_index(&list, &entries(&["BANANA"])[0]), 1);
        assert_eq!(find_insertion_index(&list, &entries(&["b"])[0]), 1);
        assert_eq!(find_insertion_index(&list, &entries(&["Zebra"])[0]), 3);
        assert_eq!(find_insertion_index(&list, &entries(&["Aardvark"])[0]), 0);
    }

    #[test]
    fn test_reposition_follows_rename() {
        let mut list = entries(&["apple", "banana", "cherry", "date"]);
        list[0].graphemes[0] = "Cucumber".to_string();
        let new_index = reposition(&mut list, 0);
        assert_eq!(new_index, 2);
        assert_eq!(firsts(&list), vec!["banana", "cherry", "Cucumber", "date"]);
        assert!(is_sorted(&list));
    }

    #[test]
    fn test_reposition_ignores_placeholder() {
        let mut list = entries(&["apple", "banana"]);
        list.insert(0, LexiconEntry::placeholder());
        assert_eq!(reposition(&mut list, 0), 0);
        assert_eq!(list[0].first_grapheme(), NEW_ENTRY_PLACEHOLDER);
        assert_eq!(reposition(&mut list, 9), 9);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut list = vec![
            LexiconEntry::with_phoneme(["b"], "1"),
            LexiconEntry::with_phoneme(["A"], "2"),
            LexiconEntry::with_phoneme(["a"], "3"),
        ];
        sort_entries(&mut list);
        let phonemes: Vec<&str> = list.iter().map(|e| e.phoneme.as_str()).collect();
        assert_eq!(phonemes, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_sorted_after_many_inserts() {
        let mut list = Vec::new();
        for word in ["delta", "Alpha", "charlie", "Bravo", "echo", "alpha"] {
            insert_sorted(&mut list, LexiconEntry::with_phoneme([word], "ə"));
            assert!(is_sorted(&list));
        }
        assert_eq!(list.len(), 6);
    }
}
