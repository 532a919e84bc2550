//! Merging a vendor lexicon into the open (master) lexicon.
//!
//! Every incoming entry is classified against the master list:
//!
//! | Situation                                    | Outcome                         |
//! |----------------------------------------------|---------------------------------|
//! | shares no grapheme with any master entry     | new entry, added on finalize    |
//! | identical to a master entry it matches       | skipped                         |
//! | same graphemes (any case) and same phoneme   | `additional_alias` conflict     |
//! | anything else                                | `conflict`                      |
//!
//! Each matching master entry produces its own conflict record. With no
//! conflicts the merge completes at once; otherwise a [`PendingMerge`] is
//! returned and every conflict must get a [`Resolution`] before
//! [`PendingMerge::finalize`] succeeds.
//!
//! ```ignore
//! use lexicon_core::merge::{MergeEngine, MergeOutcome, Resolution};
//!
//! match MergeEngine::begin("en-US", &master, "en-US", &incoming)? {
//!     MergeOutcome::Completed(result) => println!("{:?}", result.summary),
//!     MergeOutcome::NeedsResolution(mut pending) => {
//!         pending.resolve_all(Resolution::Both);
//!         let result = pending.finalize()?;
//!     }
//! }
//! ```

mod conflict;
mod engine;

pub use conflict::{
    ConflictType, MergeConflict, Resolution, identical, phonetically_identical, shared_graphemes,
};
pub use engine::{MergeEngine, MergeOutcome, MergeResult, MergeSummary, PendingMerge};
