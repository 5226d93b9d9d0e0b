//! Correctness oracle for collected allocation results.

use ordino_tonic_core::types::{MAX_SEQUENCE_VALUE, SequenceValue};

/// Outcome of one driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// `threads * block_size * iterations`.
    pub expected: usize,
    /// Values actually collected; skipped iterations shrink this.
    pub collected: usize,
    /// First forbidden descending pair, if any.
    pub violation: Option<(SequenceValue, SequenceValue)>,
}

impl Report {
    /// Soft signal: a shortfall means iterations were dropped, which is
    /// acceptable; values were lost, not duplicated.
    pub fn count_matches(&self) -> bool {
        self.collected == self.expected
    }

    /// Hard signal: any forbidden descending pair is a fatal correctness
    /// violation.
    pub fn is_ordered(&self) -> bool {
        self.violation.is_none()
    }
}

/// Sorts the collected values ascending, then scans adjacent pairs.
pub fn verify(values: &mut Vec<SequenceValue>, expected: usize) -> Report {
    values.sort_unstable();
    Report {
        expected,
        collected: values.len(),
        violation: first_disorder(values),
    }
}

/// Scans adjacent pairs for a forbidden descending transition.
///
/// A descending pair is permitted only when it is exactly the wrap
/// transition `(MAX_SEQUENCE_VALUE, 0)`; any other descending pair is
/// returned as a violation.
pub fn first_disorder(values: &[SequenceValue]) -> Option<(SequenceValue, SequenceValue)> {
    values.windows(2).find_map(|pair| {
        let (previous, current) = (pair[0], pair[1]);
        if previous > current && !(previous == MAX_SEQUENCE_VALUE && current == 0) {
            Some((previous, current))
        } else {
            None
        }
    })
}
