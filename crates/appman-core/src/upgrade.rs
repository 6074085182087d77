//! Upgrade decision between a baseline summary and a candidate.

use appman_schema::Summary;

/// Whether `candidate` requires refreshing data derived from `baseline`.
///
/// Always true in debug mode or when either side is missing. Otherwise true
/// iff the version strings differ; the comparison is exact and case-sensitive.
pub fn is_upgrade(baseline: Option<&Summary>, candidate: Option<&Summary>, debug: bool) -> bool {
    if debug {
        return true;
    }
    match (baseline, candidate) {
        (Some(before), Some(after)) => before.version() != after.version(),
        _ => true,
    }
}
