use std::cmp::Ordering;

use crate::{
    exception::{ExcType, RunResult},
    heap::Heap,
    object::PyObject,
    py_hash::hash_tuple,
    resource::ResourceTracker,
    sequence::{Sequence, sequence_for_in},
    slice::{SliceSpec, wrap_index},
};

/// Python `range(start, stop, step)`: a lazy arithmetic progression of ints.
///
/// Ranges are plain values. Lengths and positions are computed in `i128` so
/// extreme bounds cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Range {
    start: i64,
    stop: i64,
    step: i64,
}

impl Range {
    /// `range(start, stop, step)`, raising `ValueError` for a zero step.
    pub fn new(start: i64, stop: i64, step: i64) -> RunResult<Self> {
        if step == 0 {
            return Err(ExcType::value_error_range_step_zero());
        }
        Ok(Self { start, stop, step })
    }

    /// `range(stop)`
    #[must_use]
    pub fn to(stop: i64) -> Self {
        Self { start: 0, stop, step: 1 }
    }

    /// `range(start, stop)`
    #[must_use]
    pub fn between(start: i64, stop: i64) -> Self {
        Self { start, stop, step: 1 }
    }

    #[must_use]
    pub fn start(self) -> i64 {
        self.start
    }

    #[must_use]
    pub fn stop(self) -> i64 {
        self.stop
    }

    #[must_use]
    pub fn step(self) -> i64 {
        self.step
    }

    #[must_use]
    pub fn len(self) -> usize {
        let (start, stop, step) = (i128::from(self.start), i128::from(self.stop), i128::from(self.step));
        let span = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        usize::try_from(span).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    fn value_at(self, position: i128) -> i64 {
        let value = i128::from(self.start) + position * i128::from(self.step);
        i64::try_from(value).unwrap_or(if self.step > 0 { i64::MAX } else { i64::MIN })
    }

    /// `r[index]`
    pub fn get(self, index: i64) -> RunResult<i64> {
        wrap_index(index, self.len())
            .map(|position| self.value_at(widen(position)))
            .ok_or_else(|| ExcType::index_error(<Self as Sequence>::INDEX_ERROR))
    }

    /// `r[start:stop:step]` is itself a range.
    pub fn get_slice(self, slice: SliceSpec) -> RunResult<Self> {
        let indices = slice.indices(self.len())?;
        let step = self.step.checked_mul(indices.step).ok_or_else(ExcType::overflow_error_index)?;
        Ok(Self {
            start: self.value_at(i128::from(indices.start)),
            stop: self.value_at(i128::from(indices.stop)),
            step,
        })
    }

    /// Position of `value` in the progression, if it is a member.
    fn position_of(self, value: i64) -> Option<usize> {
        let offset = i128::from(value) - i128::from(self.start);
        let step = i128::from(self.step);
        if offset % step != 0 {
            return None;
        }
        let position = usize::try_from(offset / step).ok()?;
        (position < self.len()).then_some(position)
    }

    /// `value in r`, constant time.
    #[must_use]
    pub fn contains(self, value: i64) -> bool {
        self.position_of(value).is_some()
    }

    #[must_use]
    pub fn count(self, value: i64) -> usize {
        usize::from(self.contains(value))
    }

    /// `r.index(value)`, raising `ValueError: N is not in range`.
    pub fn index(self, value: i64) -> RunResult<usize> {
        self.position_of(value)
            .ok_or_else(|| ExcType::value_error(format_args!("{value} is not in range")))
    }
}

fn widen(position: usize) -> i128 {
    i128::try_from(position).unwrap_or(i128::MAX)
}

impl PyObject for Range {
    fn type_name(&self) -> &'static str {
        "range"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(if self.step == 1 {
            format!("range({}, {})", self.start, self.stop)
        } else {
            format!("range({}, {}, {})", self.start, self.stop, self.step)
        })
    }

    /// Hashes like `hash((len, start, step))`, with `start` and `step` replaced by
    /// None where they do not affect the values produced.
    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        let len = self.len();
        let none = Option::<i64>::None.py_hash(heap)?;
        let len_hash = i64::try_from(len).unwrap_or(i64::MAX).py_hash(heap)?;
        let hashes = match len {
            0 => [len_hash, none, none],
            1 => [len_hash, self.start.py_hash(heap)?, none],
            _ => [len_hash, self.start.py_hash(heap)?, self.step.py_hash(heap)?],
        };
        Ok(hash_tuple(hashes.into_iter()))
    }

    /// Ranges are equal when they produce the same values.
    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        let len = self.len();
        Ok(len == other.len() && (len == 0 || (self.start == other.start && (len == 1 || self.step == other.step))))
    }

    fn py_cmp(&self, _other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Err(ExcType::type_error_unorderable("<", "range", "range"))
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!self.is_empty())
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(self.len())
    }
}

impl Sequence for Range {
    type Item = i64;
    const INDEX_ERROR: &'static str = "range object index out of range";

    fn seq_len(&self, _heap: &Heap<impl ResourceTracker>) -> usize {
        self.len()
    }

    fn seq_item(&self, index: usize, _heap: &Heap<impl ResourceTracker>) -> Option<i64> {
        (index < self.len()).then(|| self.value_at(widen(index)))
    }
}

sequence_for_in!([] Range);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{iter::collect_vec, py_hash::as_signed, resource::NoLimitTracker};

    #[test]
    fn stepped_slice_is_a_range() {
        let heap = Heap::new(NoLimitTracker);
        let evens = Range::to(5).get_slice(SliceSpec::stepped(2)).unwrap();
        assert_eq!(collect_vec(&evens, &heap).unwrap(), vec![0, 2, 4]);
        let reversed = Range::to(3).get_slice(SliceSpec::stepped(-1)).unwrap();
        assert_eq!(reversed.py_repr(&heap).unwrap(), "range(2, -1, -1)");
    }

    #[test]
    fn zero_step_raises() {
        let err = Range::new(0, 5, 0).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: range() arg 3 must not be zero");
    }

    #[test]
    fn len_membership_and_index() {
        let range = Range::new(10, 0, -3).unwrap();
        assert_eq!(range.len(), 4);
        assert!(range.contains(4));
        assert!(!range.contains(5));
        assert_eq!(range.index(1).unwrap(), 3);
        assert_eq!(range.get(-1).unwrap(), 1);
        assert_eq!(
            range.get(4).unwrap_err().to_string(),
            "IndexError: range object index out of range"
        );
        assert_eq!(range.index(2).unwrap_err().to_string(), "ValueError: 2 is not in range");
    }

    #[test]
    fn equal_ranges_hash_alike() {
        let heap = Heap::new(NoLimitTracker);
        let a = Range::new(0, 3, 5).unwrap();
        let b = Range::new(0, 1, 7).unwrap();
        assert!(a.py_eq(&b, &heap).unwrap());
        assert_eq!(a.py_hash(&heap).unwrap(), b.py_hash(&heap).unwrap());
        assert_eq!(as_signed(Range::to(3).py_hash(&heap).unwrap()), -8_338_477_496_398_685_190);
    }
}
