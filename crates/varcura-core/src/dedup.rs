//! Duplicate detection for curated alterations
//!
//! Two alterations are duplicates iff their base names are equal
//! case-insensitively and their exclusion sets are equal as sets. Set
//! equality is checked by lower-casing and sorting both sides, so
//! `V600E {excluding V600K; V600Q}` duplicates `v600e {excluding v600q;
//! V600K}` while plain `V600E` does not.

use crate::parser::ParsedAlterationFragment;
use crate::session::AlterationState;

/// Lower-cased, lexicographically sorted copy of an exclusion name list.
fn normalized_exclusions<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut normalized: Vec<String> = names.into_iter().map(str::to_lowercase).collect();
    normalized.sort();
    normalized
}

/// Does any accepted state already hold `alteration` with exactly this
/// exclusion set? Both sides compared case-insensitively, exclusion order
/// ignored.
pub fn exclusion_set_exists(
    alteration: &str,
    excluding: &[String],
    states: &[AlterationState],
) -> bool {
    let base = alteration.to_lowercase();
    let excluding = normalized_exclusions(excluding.iter().map(String::as_str));
    states.iter().any(|state| {
        state.alteration.to_lowercase() == base
            && normalized_exclusions(state.excluding.iter().map(|ex| ex.alteration.as_str()))
                == excluding
    })
}

/// Is `candidate` an exact duplicate of an accepted state? `ignore_index`
/// excludes one position from the comparison, used when re-validating the
/// field being edited against the rest of the list.
pub fn is_duplicate(
    candidate: &ParsedAlterationFragment,
    states: &[AlterationState],
    ignore_index: Option<usize>,
) -> bool {
    let base = candidate.alteration.to_lowercase();
    let excluding = normalized_exclusions(candidate.excluding.iter().map(String::as_str));
    states.iter().enumerate().any(|(index, state)| {
        if ignore_index == Some(index) {
            return false;
        }
        state.alteration.to_lowercase() == base
            && normalized_exclusions(state.excluding.iter().map(|ex| ex.alteration.as_str()))
                == excluding
    })
}

/// Drop candidates that duplicate an accepted state. Returns the survivors
/// and how many were dropped; the caller surfaces exactly one notification
/// per batch when the count is non-zero.
pub fn filter_duplicates(
    candidates: Vec<ParsedAlterationFragment>,
    states: &[AlterationState],
    ignore_index: Option<usize>,
) -> (Vec<ParsedAlterationFragment>, usize) {
    let before = candidates.len();
    let survivors: Vec<ParsedAlterationFragment> = candidates
        .into_iter()
        .filter(|candidate| !is_duplicate(candidate, states, ignore_index))
        .collect();
    let dropped = before - survivors.len();
    (survivors, dropped)
}
