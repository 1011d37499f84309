//! Candidate resolution: before sending a breakpoint to the adapter,
//! ask it (via `breakpointLocations`) which exact positions on the
//! requested line are valid, and pick one (spec §4.4 "Candidate
//! resolution protocol").

use crate::entity::Location;
use crate::transport::types::BreakpointLocation;

/// Chooses among the candidate locations the adapter reports for a
/// requested line. Implementations may be swapped in by a host that
/// wants editor-driven disambiguation (spec §6 "Editor callbacks");
/// the default policy needs no input beyond the candidates themselves.
pub trait Disambiguator: Send + Sync {
    fn choose<'a>(
        &self,
        requested: &Location,
        candidates: &'a [BreakpointLocation],
    ) -> Option<&'a BreakpointLocation>;
}

/// Picks the candidate with the smallest column that is still
/// `>= requested.column` (or the first candidate if the user gave no
/// column), falling back to the first candidate on the line.
pub struct SmallestColumnAtOrAfter;

impl Disambiguator for SmallestColumnAtOrAfter {
    fn choose<'a>(
        &self,
        requested: &Location,
        candidates: &'a [BreakpointLocation],
    ) -> Option<&'a BreakpointLocation> {
        if candidates.is_empty() {
            return None;
        }
        let Some(requested_column) = requested.column else {
            return candidates.first();
        };
        candidates
            .iter()
            .filter(|c| c.column.unwrap_or(0) >= requested_column)
            .min_by_key(|c| c.column.unwrap_or(0))
            .or_else(|| candidates.first())
    }
}

/// Resolves `requested` to a `SourceBreakpoint`-ready `(line, column)`
/// pair using `candidates` as returned by `Session::breakpoint_locations`.
pub fn resolve(
    requested: &Location,
    candidates: &[BreakpointLocation],
    disambiguator: &dyn Disambiguator,
) -> (i64, Option<i64>) {
    match disambiguator.choose(requested, candidates) {
        Some(chosen) => (chosen.line, chosen.column),
        None => (requested.line, requested.column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(line: i64, column: Option<i64>) -> BreakpointLocation {
        BreakpointLocation {
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    #[test]
    fn picks_smallest_column_at_or_after_request() {
        let requested = Location::new("/a.rs", 10, Some(5));
        let candidates = vec![candidate(10, Some(2)), candidate(10, Some(8)), candidate(10, Some(6))];
        let (line, column) = resolve(&requested, &candidates, &SmallestColumnAtOrAfter);
        assert_eq!(line, 10);
        assert_eq!(column, Some(6));
    }

    #[test]
    fn no_column_requested_takes_first_candidate() {
        let requested = Location::new("/a.rs", 10, None);
        let candidates = vec![candidate(10, Some(3)), candidate(11, Some(1))];
        let (line, _) = resolve(&requested, &candidates, &SmallestColumnAtOrAfter);
        assert_eq!(line, 10);
    }

    #[test]
    fn empty_candidates_falls_back_to_requested() {
        let requested = Location::new("/a.rs", 10, Some(5));
        let (line, column) = resolve(&requested, &[], &SmallestColumnAtOrAfter);
        assert_eq!((line, column), (10, Some(5)));
    }
}
