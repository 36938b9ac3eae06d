//! Index-addressable, length-bearing collections.
//!
//! Implementors supply `seq_len` and `seq_item`; wraparound indexing,
//! lexicographic comparison and linear search come for free. Every sequence
//! also iterates through the `for_in` triad with a plain index cursor, see
//! `sequence_for_in!`.

use std::cmp::Ordering;

use crate::{
    exception::{ExcType, RunResult},
    heap::Heap,
    object::PyObject,
    resource::ResourceTracker,
    slice::{adjust_window, wrap_index},
};

pub trait Sequence {
    type Item: PyObject;

    /// Message of the IndexError raised for an out of range index,
    /// e.g. `list index out of range`.
    const INDEX_ERROR: &'static str;

    fn seq_len(&self, heap: &Heap<impl ResourceTracker>) -> usize;

    /// Returns the item at an already wrapped, in range position.
    fn seq_item(&self, index: usize, heap: &Heap<impl ResourceTracker>) -> Option<Self::Item>;

    /// `s[i]` with negative indices counting from the end.
    fn seq_get(&self, index: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<Self::Item> {
        wrap_index(index, self.seq_len(heap))
            .and_then(|index| self.seq_item(index, heap))
            .ok_or_else(|| ExcType::index_error(Self::INDEX_ERROR))
    }

    /// Element-wise equality; lengths must match.
    fn seq_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        let len = self.seq_len(heap);
        if len != other.seq_len(heap) {
            return Ok(false);
        }
        for index in 0..len {
            let (Some(a), Some(b)) = (self.seq_item(index, heap), other.seq_item(index, heap)) else {
                return Ok(false);
            };
            if !a.py_eq(&b, heap)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Lexicographic comparison: the first unequal pair decides, otherwise the shorter sequence is smaller.
    fn seq_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        let (left_len, right_len) = (self.seq_len(heap), other.seq_len(heap));
        for index in 0..left_len.min(right_len) {
            let (Some(a), Some(b)) = (self.seq_item(index, heap), other.seq_item(index, heap)) else {
                break;
            };
            if !a.py_eq(&b, heap)? {
                return a.py_cmp(&b, heap);
            }
        }
        Ok(left_len.cmp(&right_len))
    }

    fn seq_contains(&self, value: &Self::Item, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.seq_index(value, None, None, heap)?.is_some())
    }

    /// Position of the first item equal to `value` inside the `[start:end]` window.
    fn seq_index(
        &self,
        value: &Self::Item,
        start: Option<i64>,
        end: Option<i64>,
        heap: &Heap<impl ResourceTracker>,
    ) -> RunResult<Option<usize>> {
        let (start, end) = adjust_window(start, end, self.seq_len(heap));
        for index in start..end {
            // the sequence may shrink while comparisons run
            let Some(item) = self.seq_item(index, heap) else {
                break;
            };
            if item.py_eq(value, heap)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn seq_count(&self, value: &Self::Item, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        let mut count = 0;
        for index in 0..self.seq_len(heap) {
            if let Some(item) = self.seq_item(index, heap)
                && item.py_eq(value, heap)?
            {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Implements [`ForIn`](crate::iter::ForIn) for sequence types with an index cursor.
///
/// The cursor is compared against the *current* length on every step, so a list
/// that grows while being iterated yields the new items too.
macro_rules! sequence_for_in {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> $crate::iter::ForIn for $ty {
                type Item = <$ty as $crate::sequence::Sequence>::Item;
                type Cursor = usize;

                fn for_in_init(
                    &self,
                    _heap: &$crate::heap::Heap<impl $crate::resource::ResourceTracker>,
                ) -> $crate::exception::RunResult<usize> {
                    Ok(0)
                }

                fn for_in_has_next(
                    &self,
                    cursor: &usize,
                    heap: &$crate::heap::Heap<impl $crate::resource::ResourceTracker>,
                ) -> $crate::exception::RunResult<bool> {
                    Ok(*cursor < $crate::sequence::Sequence::seq_len(self, heap))
                }

                fn for_in_next(
                    &self,
                    cursor: &mut usize,
                    heap: &$crate::heap::Heap<impl $crate::resource::ResourceTracker>,
                ) -> $crate::exception::RunResult<Self::Item> {
                    let item = $crate::sequence::Sequence::seq_item(self, *cursor, heap)
                        .ok_or_else($crate::exception::ExcType::stop_iteration)?;
                    *cursor += 1;
                    Ok(item)
                }
            }
        )*
    };
}

pub(crate) use sequence_for_in;
