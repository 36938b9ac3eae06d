//! The iteration protocol.
//!
//! Two interoperating mechanisms:
//! - the `for_in` triad ([`ForIn`]): `init` produces a cursor, `has_next` reports
//!   whether a following `next` yields a value, `next` advances. Loops over
//!   indexable containers lower to this without allocating an iterator object.
//! - [`PyIter`], the one-shot iterator object with a "last produced value" and an
//!   "exhausted" flag, built on top of the triad.
//!
//! Normal exhaustion is reported as `None` by [`PyIter::get_next`]; StopIteration
//! is only raised by [`PyIter::next`] when called with nothing left.

use crate::{
    exception::{ExcType, RunResult},
    heap::Heap,
    object::PyObject,
    resource::ResourceTracker,
};

/// A source that can be walked by the `for_in` triad.
///
/// `for_in_next` may only be called after `for_in_has_next` returned true for the
/// same cursor. Hash based sources fail from either call with a RuntimeError when
/// the table was structurally modified since `for_in_init`.
pub trait ForIn {
    type Item: PyObject;
    type Cursor;

    fn for_in_init(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<Self::Cursor>;

    fn for_in_has_next(&self, cursor: &Self::Cursor, heap: &Heap<impl ResourceTracker>) -> RunResult<bool>;

    fn for_in_next(&self, cursor: &mut Self::Cursor, heap: &Heap<impl ResourceTracker>) -> RunResult<Self::Item>;
}

/// Python iterator object over any [`ForIn`] source.
///
/// Single pass: once exhausted it stays exhausted. A fresh [`PyIter::new`] over
/// the same source starts a new cursor over the source's current state.
#[derive(Debug)]
pub struct PyIter<S: ForIn> {
    source: S,
    cursor: S::Cursor,
    last: Option<S::Item>,
    exhausted: bool,
}

impl<S: ForIn> PyIter<S> {
    /// `iter(source)`
    pub fn new(source: S, heap: &Heap<impl ResourceTracker>) -> RunResult<Self> {
        let cursor = source.for_in_init(heap)?;
        Ok(Self {
            source,
            cursor,
            last: None,
            exhausted: false,
        })
    }

    /// Non-raising `next`: `None` marks exhaustion and sets the exhausted flag.
    pub fn get_next(&mut self, heap: &Heap<impl ResourceTracker>) -> RunResult<Option<S::Item>> {
        if self.exhausted {
            return Ok(None);
        }
        if !self.source.for_in_has_next(&self.cursor, heap)? {
            self.exhausted = true;
            return Ok(None);
        }
        let item = self.source.for_in_next(&mut self.cursor, heap)?;
        self.last = Some(item.clone());
        Ok(Some(item))
    }

    /// `next(it)`, raising StopIteration when nothing is left.
    pub fn next(&mut self, heap: &Heap<impl ResourceTracker>) -> RunResult<S::Item> {
        self.get_next(heap)?.ok_or_else(ExcType::stop_iteration)
    }

    /// The most recently produced value.
    #[must_use]
    pub fn last(&self) -> Option<&S::Item> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drains the remaining items into a vector.
    pub fn collect_remaining(&mut self, heap: &Heap<impl ResourceTracker>) -> RunResult<Vec<S::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.get_next(heap)? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Membership by equality over any iterable, `value in source`.
pub fn contains<S: ForIn>(source: &S, value: &S::Item, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
    let mut found = false;
    for_each(source, heap, |item| {
        found = item.py_eq(value, heap)?;
        Ok(!found)
    })?;
    Ok(found)
}

/// Drives the triad to completion, calling `f` for every item until it returns `Ok(false)`.
pub fn for_each<S: ForIn, R: ResourceTracker>(
    source: &S,
    heap: &Heap<R>,
    mut f: impl FnMut(S::Item) -> RunResult<bool>,
) -> RunResult<()> {
    let mut cursor = source.for_in_init(heap)?;
    while source.for_in_has_next(&cursor, heap)? {
        let item = source.for_in_next(&mut cursor, heap)?;
        if !f(item)? {
            break;
        }
    }
    Ok(())
}

/// Snapshots every item of `source`.
///
/// Mutating operations that consume another container (`extend`, `update`) collect
/// first, so a container can be extended with itself.
pub fn collect_vec<S: ForIn>(source: &S, heap: &Heap<impl ResourceTracker>) -> RunResult<Vec<S::Item>> {
    let mut items = Vec::new();
    for_each(source, heap, |item| {
        items.push(item);
        Ok(true)
    })?;
    Ok(items)
}

/// Unpacks exactly `N` items, `a, b = source`.
///
/// Raises `ValueError: too many values to unpack (expected N)` or
/// `ValueError: not enough values to unpack (expected N, got M)`.
pub fn unpack_exact<const N: usize, S: ForIn>(source: &S, heap: &Heap<impl ResourceTracker>) -> RunResult<[S::Item; N]> {
    let mut items = Vec::with_capacity(N);
    let mut too_many = false;
    for_each(source, heap, |item| {
        if items.len() == N {
            too_many = true;
            return Ok(false);
        }
        items.push(item);
        Ok(true)
    })?;
    if too_many {
        return Err(ExcType::value_error_too_many_values(N));
    }
    let got = items.len();
    items
        .try_into()
        .map_err(|_: Vec<S::Item>| ExcType::value_error_not_enough_values(N, got))
}

/// Converts StopIteration into exhaustion, leaving every other error untouched.
///
/// Used where a raising `next` meets code that expects the sentinel form.
pub fn stop_to_none<T>(result: RunResult<T>) -> RunResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_stop_iteration() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{resource::NoLimitTracker, types::{List, Range}};

    #[test]
    fn unpack_exact_counts() {
        let heap = Heap::new(NoLimitTracker);
        let [a, b] = unpack_exact::<2, _>(&Range::to(2), &heap).unwrap();
        assert_eq!((a, b), (0, 1));

        let err = unpack_exact::<2, _>(&Range::to(3), &heap).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: too many values to unpack (expected 2)");

        let err = unpack_exact::<3, _>(&Range::to(1), &heap).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: not enough values to unpack (expected 3, got 1)");
    }

    #[test]
    fn next_raises_only_after_exhaustion() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = List::from_vec(vec![7_i64], &mut heap).unwrap();
        let mut iter = PyIter::new(list, &heap).unwrap();
        assert_eq!(iter.next(&heap).unwrap(), 7);
        assert!(!iter.is_exhausted());

        let err = iter.next(&heap).unwrap_err();
        assert!(err.is_stop_iteration());
        assert!(iter.is_exhausted());
        assert_eq!(iter.last(), Some(&7));

        // stays exhausted even if the source grows again
        list.append(8, &mut heap).unwrap();
        assert!(iter.next(&heap).unwrap_err().is_stop_iteration());
    }

    #[test]
    fn stop_to_none_only_swallows_stop_iteration() {
        let heap = Heap::new(NoLimitTracker);
        let mut iter = PyIter::new(Range::to(1), &heap).unwrap();
        assert_eq!(stop_to_none(iter.next(&heap)).unwrap(), Some(0));
        assert_eq!(stop_to_none(iter.next(&heap)).unwrap(), None);

        let err = stop_to_none::<i64>(Err(ExcType::value_error("bad"))).unwrap_err();
        assert!(err.is_exception_type(ExcType::ValueError));
        assert_eq!(err.to_string(), "ValueError: bad");
    }

    #[test]
    fn contains_and_early_stop() {
        let heap = Heap::new(NoLimitTracker);
        assert!(contains(&Range::to(5), &3, &heap).unwrap());
        assert!(!contains(&Range::to(5), &5, &heap).unwrap());

        let mut seen = Vec::new();
        for_each(&Range::to(10), &heap, |item| {
            seen.push(item);
            Ok(item < 2)
        })
        .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
