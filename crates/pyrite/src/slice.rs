//! Slice canonicalization and single-index wraparound shared by every sequence.

use crate::exception::{ExcType, RunResult};

/// A Python slice `start:stop:step`, each part optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// Concrete in-range bounds produced by [`SliceSpec::indices`].
///
/// For a positive step positions are `start, start+step, ...` while `< stop`;
/// for a negative step while `> stop` (where `stop` may be `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndices {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
    /// Number of positions selected.
    pub len: usize,
}

impl SliceSpec {
    #[must_use]
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// `[start:stop]` with the default step.
    #[must_use]
    pub fn range(start: Option<i64>, stop: Option<i64>) -> Self {
        Self::new(start, stop, None)
    }

    /// `[::step]`
    #[must_use]
    pub fn stepped(step: i64) -> Self {
        Self::new(None, None, Some(step))
    }

    /// Canonicalizes this slice against a sequence of `len` items, like `slice.indices()`.
    ///
    /// Missing bounds default to the whole sequence in the direction of the step,
    /// negative bounds count from the end, then bounds are clamped to
    /// `[0, len]` (or `[-1, len - 1]` when stepping backwards).
    /// A zero step raises `ValueError: slice step cannot be zero`.
    pub fn indices(&self, len: usize) -> RunResult<SliceIndices> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ExcType::value_error_slice_step_zero());
        }
        let len_i = i64::try_from(len).map_err(|_| ExcType::overflow_error_index())?;
        let (lower, upper) = if step < 0 { (-1, len_i - 1) } else { (0, len_i) };

        let clamp = |bound: i64| {
            if bound < 0 {
                (bound + len_i).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = self.start.map_or(if step < 0 { upper } else { lower }, clamp);
        let stop = self.stop.map_or(if step < 0 { lower } else { upper }, clamp);

        let span = if step < 0 {
            if stop < start { (start - stop - 1) / -step + 1 } else { 0 }
        } else if start < stop {
            (stop - start - 1) / step + 1
        } else {
            0
        };

        Ok(SliceIndices {
            start,
            stop,
            step,
            len: usize::try_from(span).unwrap_or(0),
        })
    }
}

impl SliceIndices {
    /// Iterates the selected positions in slice order.
    pub fn positions(self) -> impl Iterator<Item = usize> {
        (0..self.len).map(move |i| {
            let offset = i64::try_from(i).unwrap_or(i64::MAX);
            usize::try_from(self.start + offset * self.step).unwrap_or(0)
        })
    }

    /// True for a plain contiguous `[a:b]` slice.
    #[must_use]
    pub fn is_contiguous(self) -> bool {
        self.step == 1
    }

    /// The half-open range covered by a step 1 slice (empty when `stop <= start`).
    #[must_use]
    pub fn contiguous_range(self) -> std::ops::Range<usize> {
        let start = usize::try_from(self.start).unwrap_or(0);
        start..start + self.len
    }
}

/// Wraps a possibly negative index into `[0, len)`.
///
/// A negative index has `len` added once; `None` means it is still out of range
/// and the caller raises its type-specific IndexError.
#[must_use]
pub fn wrap_index(index: i64, len: usize) -> Option<usize> {
    let len_i = i64::try_from(len).ok()?;
    let wrapped = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&wrapped) {
        usize::try_from(wrapped).ok()
    } else {
        None
    }
}

/// Clamps an insertion position the way `list.insert` does: never fails.
#[must_use]
pub fn clamp_insert_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let wrapped = if index < 0 { (index + len_i).max(0) } else { index.min(len_i) };
    usize::try_from(wrapped).unwrap_or(0)
}

/// Adjusts an optional `start`/`end` search window the way `str.find` does.
///
/// `end` is clamped into `[0, len]`; `start` only has negative values wrapped and
/// floored at zero, so it may exceed `len` (searches then find nothing).
#[must_use]
pub fn adjust_window(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let end = match end {
        None => len_i,
        Some(end) if end > len_i => len_i,
        Some(end) if end < 0 => (end + len_i).max(0),
        Some(end) => end,
    };
    let start = match start {
        None => 0,
        Some(start) if start < 0 => (start + len_i).max(0),
        Some(start) => start,
    };
    (
        usize::try_from(start).unwrap_or(usize::MAX),
        usize::try_from(end).unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(spec: SliceSpec, len: usize) -> Vec<usize> {
        spec.indices(len).unwrap().positions().collect()
    }

    #[test]
    fn defaults_follow_step_direction() {
        assert_eq!(positions(SliceSpec::default(), 3), vec![0, 1, 2]);
        assert_eq!(positions(SliceSpec::stepped(-1), 3), vec![2, 1, 0]);
        assert_eq!(positions(SliceSpec::stepped(2), 5), vec![0, 2, 4]);
    }

    #[test]
    fn negative_bounds_wrap_then_clamp() {
        assert_eq!(positions(SliceSpec::range(Some(1), Some(-1)), 5), vec![1, 2, 3]);
        assert_eq!(positions(SliceSpec::range(Some(-100), Some(100)), 3), vec![0, 1, 2]);
        assert_eq!(positions(SliceSpec::new(Some(-1), Some(-100), Some(-1)), 3), vec![2, 1, 0]);
        assert!(positions(SliceSpec::range(Some(3), Some(1)), 5).is_empty());
    }

    #[test]
    fn reverse_indices_match_python() {
        // slice(None, None, -1).indices(5) == (4, -1, -1)
        let idx = SliceSpec::stepped(-1).indices(5).unwrap();
        assert_eq!((idx.start, idx.stop, idx.step, idx.len), (4, -1, -1, 5));
        // slice(10, 0, -3).indices(5) == (4, 0, -3)
        let idx = SliceSpec::new(Some(10), Some(0), Some(-3)).indices(5).unwrap();
        assert_eq!((idx.start, idx.stop, idx.len), (4, 0, 2));
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = SliceSpec::stepped(0).indices(3).unwrap_err();
        assert!(err.is_exception_type(ExcType::ValueError));
        assert_eq!(err.to_string(), "ValueError: slice step cannot be zero");
    }

    #[test]
    fn wrap_index_adds_len_once() {
        assert_eq!(wrap_index(-1, 3), Some(2));
        assert_eq!(wrap_index(-3, 3), Some(0));
        assert_eq!(wrap_index(-4, 3), None);
        assert_eq!(wrap_index(3, 3), None);
        assert_eq!(wrap_index(0, 0), None);
    }

    #[test]
    fn insert_index_clamps() {
        assert_eq!(clamp_insert_index(-10, 3), 0);
        assert_eq!(clamp_insert_index(10, 3), 3);
        assert_eq!(clamp_insert_index(-1, 3), 2);
    }

    #[test]
    fn window_keeps_start_past_end() {
        assert_eq!(adjust_window(None, None, 3), (0, 3));
        assert_eq!(adjust_window(Some(-2), Some(10), 3), (1, 3));
        assert_eq!(adjust_window(Some(5), None, 3), (5, 3));
    }
}
