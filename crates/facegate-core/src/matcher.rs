//! Distance-based matching of a candidate descriptor against known descriptors.

use crate::types::{ComparisonResult, Descriptor};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("known encoding {index} has {actual} values, expected {expected}")]
    DimensionMismatch { index: usize, expected: usize, actual: usize },
}

/// Closest known descriptor and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    /// Index of the closest known descriptor, if it is within tolerance.
    pub index: Option<usize>,
    /// Distance to the closest known descriptor, reported even when it is out of tolerance.
    pub distance: f64,
}

impl MatchOutcome {
    /// "No match, maximal distance".
    pub const NONE: MatchOutcome = MatchOutcome { index: None, distance: 1.0 };

    pub fn is_match(&self) -> bool {
        self.index.is_some()
    }
}

impl From<MatchOutcome> for ComparisonResult {
    fn from(outcome: MatchOutcome) -> Self {
        ComparisonResult {
            match_index: outcome.index.map_or(-1, |i| i as i64),
            distance: outcome.distance,
            is_match: outcome.is_match(),
        }
    }
}

/// Strategy for comparing a candidate descriptor against known descriptors.
pub trait Matcher {
    fn compare(
        &self,
        known: &[Descriptor],
        candidate: Option<&Descriptor>,
        tolerance: f64,
    ) -> Result<MatchOutcome, MatchError>;
}

/// Euclidean matcher: the nearest known descriptor wins if it lies within tolerance.
///
/// Ties resolve to the lowest index.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(
        &self,
        known: &[Descriptor],
        candidate: Option<&Descriptor>,
        tolerance: f64,
    ) -> Result<MatchOutcome, MatchError> {
        let candidate = match candidate {
            Some(c) if !c.is_empty() => c,
            _ => return Ok(MatchOutcome::NONE),
        };
        if known.is_empty() {
            return Ok(MatchOutcome::NONE);
        }

        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;

        for (i, descriptor) in known.iter().enumerate() {
            if descriptor.len() != candidate.len() {
                return Err(MatchError::DimensionMismatch {
                    index: i,
                    expected: candidate.len(),
                    actual: descriptor.len(),
                });
            }
            let dist = descriptor.distance(candidate);
            // strict comparison keeps the first of equal minima
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }

        tracing::debug!(best_idx, best_dist, tolerance, known = known.len(), "compared descriptors");

        Ok(MatchOutcome {
            index: (best_dist <= tolerance).then_some(best_idx),
            distance: best_dist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(values: &[f64]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_closest_within_tolerance() {
        let known = vec![d(&[0.5, 0.0]), d(&[0.1, 0.0]), d(&[0.4, 0.0])];
        let candidate = d(&[0.0, 0.0]);
        let outcome = EuclideanMatcher.compare(&known, Some(&candidate), 0.3).unwrap();
        assert_eq!(outcome.index, Some(1));
        assert!((outcome.distance - 0.1).abs() < 1e-12);

        let result = ComparisonResult::from(outcome);
        assert_eq!(result.match_index, 1);
        assert!(result.is_match);
    }

    #[test]
    fn test_empty_known() {
        let candidate = d(&[0.1, 0.2]);
        let outcome = EuclideanMatcher.compare(&[], Some(&candidate), 0.3).unwrap();
        assert_eq!(outcome, MatchOutcome::NONE);
        assert_eq!(ComparisonResult::from(outcome), ComparisonResult::no_match());
    }

    #[test]
    fn test_absent_or_empty_candidate() {
        let known = vec![d(&[0.1, 0.2])];
        assert_eq!(EuclideanMatcher.compare(&known, None, 0.3).unwrap(), MatchOutcome::NONE);
        assert_eq!(
            EuclideanMatcher.compare(&known, Some(&d(&[])), 0.3).unwrap(),
            MatchOutcome::NONE
        );
    }

    #[test]
    fn test_out_of_tolerance_still_reports_distance() {
        let known = vec![d(&[0.31]), d(&[0.9])];
        let outcome = EuclideanMatcher.compare(&known, Some(&d(&[0.0])), 0.3).unwrap();
        assert_eq!(outcome.index, None);
        assert!((outcome.distance - 0.31).abs() < 1e-12);

        let result = ComparisonResult::from(outcome);
        assert_eq!(result.match_index, -1);
        assert!(!result.is_match);
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let known = vec![d(&[0.25])];
        let outcome = EuclideanMatcher.compare(&known, Some(&d(&[0.0])), 0.25).unwrap();
        assert_eq!(outcome.index, Some(0));
    }

    #[test]
    fn test_ties_resolve_to_first() {
        let known = vec![d(&[1.0, 0.0]), d(&[0.0, 0.2]), d(&[0.2, 0.0]), d(&[0.0, -0.2])];
        let outcome = EuclideanMatcher.compare(&known, Some(&d(&[0.0, 0.0])), 0.3).unwrap();
        assert_eq!(outcome.index, Some(1));
    }

    #[test]
    fn test_dimension_mismatch() {
        let known = vec![d(&[0.1, 0.2]), d(&[0.1, 0.2, 0.3])];
        let err = EuclideanMatcher.compare(&known, Some(&d(&[0.0, 0.0])), 0.3).unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { index: 1, expected: 2, actual: 3 });
    }
}
