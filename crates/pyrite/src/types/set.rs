use std::{cmp::Ordering, mem};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId, Ref},
    iter::{ForIn, collect_vec},
    object::{DeepCopyMemo, HeapObject, PyObject, set_element_hash},
    resource::ResourceTracker,
    types::table::{Table, TableCursor},
};

/// Python set type, insertion ordered.
///
/// Sets live on the heap and are manipulated through `Ref<Set<T>>`. Binary
/// operations accept any [`ForIn`] source on the right, so `s.union(lst)` works
/// like Python's method forms.
///
/// # Implemented Methods
/// - `add`, `discard`, `remove`, `pop`, `clear`, `copy`
/// - `union`, `intersection`, `difference`, `symmetric_difference` and their `_update` forms
/// - `issubset`, `issuperset`, `isdisjoint`
#[derive(Debug, Clone)]
pub struct Set<T> {
    table: Table<T, ()>,
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Self { table: Table::default() }
    }
}

/// Builds a deduplicated table from `items`, keeping first occurrences.
fn build_table<T: PyObject>(items: Vec<T>, heap: &Heap<impl ResourceTracker>) -> RunResult<Table<T, ()>> {
    let mut table = Table::with_capacity(items.len());
    for item in items {
        let hash = set_element_hash(&item, heap)?;
        if table.find(&item, hash, heap)?.is_none() {
            table.insert_new(item, (), hash);
        }
    }
    Ok(table)
}

fn table_contains<T: PyObject>(table: &Table<T, ()>, item: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
    let hash = set_element_hash(item, heap)?;
    Ok(table.find(item, hash, heap)?.is_some())
}

impl<T: PyObject> Set<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a set from `items`, dropping duplicates.
    pub fn from_vec(items: Vec<T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let table = build_table(items, heap)?;
        heap.allocate(Self { table })
    }

    /// `set(iterable)`
    pub fn from_for_in(source: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let items = collect_vec(source, heap)?;
        Self::from_vec(items, heap)
    }

    fn items(&self) -> Vec<T> {
        self.table.entries().iter().map(|entry| entry.key.clone()).collect()
    }
}

/// True when every element of `this` is in `other`.
fn subset<T: PyObject>(this: Ref<Set<T>>, other: Ref<Set<T>>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
    let (mine, theirs) = (&heap.get(this).table, &heap.get(other).table);
    if mine.len() > theirs.len() {
        return Ok(false);
    }
    for entry in mine.entries() {
        if theirs.find(&entry.key, entry.hash, heap)?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

impl<T: PyObject> HeapObject for Set<T> {
    const TYPE_NAME: &'static str = "set";
    const HASHABLE: bool = false;

    fn trace(&self, out: &mut Vec<HeapId>) {
        self.table.trace_keys(out);
    }

    fn estimate_size(&self) -> usize {
        mem::size_of::<Self>() + self.table.len() * (mem::size_of::<T>() + 16)
    }

    /// `set()` when empty, `{1, 2}` otherwise.
    fn py_repr(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        let entries = heap.get(this).table.entries();
        if entries.is_empty() {
            return Ok("set()".to_owned());
        }
        heap.repr_guarded(this.id(), "set(...)", || {
            let mut out = String::from("{");
            for (index, entry) in entries.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key.py_repr(heap)?);
            }
            out.push('}');
            Ok(out)
        })
    }

    fn py_eq(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        if heap.get(this).table.len() != heap.get(other).table.len() {
            return Ok(false);
        }
        subset(this, other, heap)
    }

    /// Subset ordering; sets where neither contains the other are unorderable.
    fn py_cmp(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        if subset(this, other, heap)? {
            return Ok(if heap.get(this).table.len() == heap.get(other).table.len() {
                Ordering::Equal
            } else {
                Ordering::Less
            });
        }
        if subset(other, this, heap)? {
            return Ok(Ordering::Greater);
        }
        Err(ExcType::type_error_unorderable("<", Self::TYPE_NAME, Self::TYPE_NAME))
    }

    fn py_lt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(heap.get(this).table.len() < heap.get(other).table.len() && subset(this, other, heap)?)
    }

    fn py_le(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        subset(this, other, heap)
    }

    fn py_gt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Self::py_lt(other, this, heap)
    }

    fn py_ge(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        subset(other, this, heap)
    }

    fn py_bool(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!heap.get(this).table.is_empty())
    }

    fn py_len(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(heap.get(this).table.len())
    }

    fn py_copy(this: Ref<Self>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let copy = heap.get(this).clone();
        heap.allocate(copy)
    }

    fn py_deepcopy(
        this: Ref<Self>,
        heap: &mut Heap<impl ResourceTracker>,
        memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        let copy = heap.allocate(Self::new())?;
        memo.insert(this, copy);
        for item in heap.get(this).items() {
            let item = item.py_deepcopy(heap, memo)?;
            copy.add(item, heap)?;
        }
        Ok(copy)
    }
}

impl<T: PyObject> Ref<Set<T>> {
    #[must_use]
    pub fn len(self, heap: &Heap<impl ResourceTracker>) -> usize {
        heap.get(self).table.len()
    }

    #[must_use]
    pub fn is_empty(self, heap: &Heap<impl ResourceTracker>) -> bool {
        heap.get(self).table.is_empty()
    }

    /// Elements in iteration order.
    #[must_use]
    pub fn to_vec(self, heap: &Heap<impl ResourceTracker>) -> Vec<T> {
        heap.get(self).items()
    }

    fn locate(self, item: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<(Option<usize>, u64)> {
        let hash = set_element_hash(item, heap)?;
        Ok((heap.get(self).table.find(item, hash, heap)?, hash))
    }

    /// `s.add(item)`; adding a present element changes nothing.
    pub fn add(self, item: T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let (found, hash) = self.locate(&item, heap)?;
        if found.is_none() {
            heap.note_container_insert()?;
            heap.get_mut(self).table.insert_new(item, (), hash);
        }
        Ok(())
    }

    /// `item in s`
    pub fn contains(self, item: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.locate(item, heap)?.0.is_some())
    }

    /// Removes `item` if present; returns whether it was.
    pub fn discard(self, item: &T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<bool> {
        match self.locate(item, heap)?.0 {
            Some(index) => {
                heap.get_mut(self).table.remove_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// `s.remove(item)`, raising `KeyError(item)` when absent.
    pub fn remove(self, item: &T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        if self.discard(item, heap)? {
            Ok(())
        } else {
            Err(ExcType::key_error(item.py_repr(heap)?))
        }
    }

    /// Removes and returns the most recently added element.
    pub fn pop(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<T> {
        heap.get_mut(self)
            .table
            .pop_last()
            .map(|entry| entry.key)
            .ok_or_else(ExcType::key_error_pop_empty_set)
    }

    pub fn clear(self, heap: &mut Heap<impl ResourceTracker>) {
        heap.get_mut(self).table.clear();
    }

    pub fn copy(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        Set::py_copy(self, heap)
    }

    /// `s | other`, a new set with the elements of both.
    pub fn union(self, other: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let mut items = self.to_vec(heap);
        items.extend(collect_vec(other, heap)?);
        Set::from_vec(items, heap)
    }

    /// `s & other`, keeping this set's order.
    pub fn intersection(self, other: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let items = self.filter_by(other, true, heap)?;
        Set::from_vec(items, heap)
    }

    /// `s - other`
    pub fn difference(self, other: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let items = self.filter_by(other, false, heap)?;
        Set::from_vec(items, heap)
    }

    /// `s ^ other`: this set's elements missing from `other`, then `other`'s missing from this set.
    pub fn symmetric_difference(
        self,
        other: &impl ForIn<Item = T>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<Self> {
        let result = self.copy(heap)?;
        result.symmetric_difference_update(other, heap)?;
        Ok(result)
    }

    /// `s |= other`
    pub fn update(self, other: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        for item in collect_vec(other, heap)? {
            self.add(item, heap)?;
        }
        Ok(())
    }

    /// `s &= other`
    pub fn intersection_update(
        self,
        other: &impl ForIn<Item = T>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<()> {
        let doomed = self.filter_by(other, false, heap)?;
        for item in &doomed {
            self.discard(item, heap)?;
        }
        Ok(())
    }

    /// `s -= other`
    pub fn difference_update(self, other: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        for item in collect_vec(other, heap)? {
            self.discard(&item, heap)?;
        }
        Ok(())
    }

    /// `s ^= other`
    pub fn symmetric_difference_update(
        self,
        other: &impl ForIn<Item = T>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<()> {
        let other = build_table(collect_vec(other, heap)?, heap)?;
        for entry in other.entries() {
            if !self.discard(&entry.key, heap)? {
                self.add(entry.key.clone(), heap)?;
            }
        }
        Ok(())
    }

    /// `s <= other` for any iterable `other`.
    pub fn issubset(self, other: &impl ForIn<Item = T>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.filter_by(other, false, heap)?.is_empty())
    }

    /// `s >= other` for any iterable `other`.
    pub fn issuperset(self, other: &impl ForIn<Item = T>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        for item in collect_vec(other, heap)? {
            if !self.contains(&item, heap)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when no element is shared with `other`.
    pub fn isdisjoint(self, other: &impl ForIn<Item = T>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.filter_by(other, true, heap)?.is_empty())
    }

    /// This set's elements whose membership in `other` equals `keep_members`.
    fn filter_by(
        self,
        other: &impl ForIn<Item = T>,
        keep_members: bool,
        heap: &Heap<impl ResourceTracker>,
    ) -> RunResult<Vec<T>> {
        let other = build_table(collect_vec(other, heap)?, heap)?;
        let mut kept = Vec::new();
        for item in self.to_vec(heap) {
            if table_contains(&other, &item, heap)? == keep_members {
                kept.push(item);
            }
        }
        Ok(kept)
    }
}

impl<T: PyObject> ForIn for Ref<Set<T>> {
    type Item = T;
    type Cursor = TableCursor;

    fn for_in_init(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<TableCursor> {
        Ok(TableCursor::start(&heap.get(*self).table))
    }

    fn for_in_has_next(&self, cursor: &TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        check_cursor(cursor, &heap.get(*self).table)?;
        Ok(cursor.has_next())
    }

    fn for_in_next(&self, cursor: &mut TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<T> {
        let table = &heap.get(*self).table;
        check_cursor(cursor, table)?;
        let position = cursor.advance()?;
        table
            .entry_at(position)
            .map(|entry| entry.key.clone())
            .ok_or_else(ExcType::stop_iteration)
    }
}

/// Sets report every structural change as a size change.
fn check_cursor<T: PyObject>(cursor: &TableCursor, table: &Table<T, ()>) -> RunResult<()> {
    cursor.check(
        table,
        ExcType::runtime_error_set_changed_size,
        ExcType::runtime_error_set_changed_size,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{iter::PyIter, resource::NoLimitTracker, types::List};

    fn set_of(values: &[i64], heap: &mut Heap<NoLimitTracker>) -> Ref<Set<i64>> {
        Set::from_vec(values.to_vec(), heap).unwrap()
    }

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let mut heap = Heap::new(NoLimitTracker);
        let set = set_of(&[3, 1, 3, 2, 1], &mut heap);
        assert_eq!(set.to_vec(&heap), vec![3, 1, 2]);
        assert_eq!(set.py_repr(&heap).unwrap(), "{3, 1, 2}");
        let empty = set_of(&[], &mut heap);
        assert_eq!(empty.py_repr(&heap).unwrap(), "set()");
    }

    #[test]
    fn remove_and_pop_errors() {
        let mut heap = Heap::new(NoLimitTracker);
        let set = set_of(&[1], &mut heap);
        assert_eq!(set.remove(&5, &mut heap).unwrap_err().to_string(), "KeyError: 5");
        assert_eq!(set.pop(&mut heap).unwrap(), 1);
        assert_eq!(
            set.pop(&mut heap).unwrap_err().to_string(),
            "KeyError: 'pop from an empty set'"
        );
    }

    #[test]
    fn algebra_with_any_iterable() {
        let mut heap = Heap::new(NoLimitTracker);
        let set = set_of(&[1, 2, 3], &mut heap);
        let other = List::from_vec(vec![3, 4, 3], &mut heap).unwrap();
        let union = set.union(&other, &mut heap).unwrap();
        assert_eq!(union.to_vec(&heap), vec![1, 2, 3, 4]);
        let both = set.intersection(&other, &mut heap).unwrap();
        assert_eq!(both.to_vec(&heap), vec![3]);
        let only = set.difference(&other, &mut heap).unwrap();
        assert_eq!(only.to_vec(&heap), vec![1, 2]);
        let either = set.symmetric_difference(&other, &mut heap).unwrap();
        assert_eq!(either.to_vec(&heap), vec![1, 2, 4]);
        assert!(only.issubset(&set, &heap).unwrap());
        assert!(set.issuperset(&only, &heap).unwrap());
        assert!(only.isdisjoint(&other, &heap).unwrap());
        assert!(only.py_lt(&set, &heap).unwrap());
    }

    #[test]
    fn in_place_updates() {
        let mut heap = Heap::new(NoLimitTracker);
        let set = set_of(&[1, 2, 3], &mut heap);
        let other = set_of(&[2, 3, 4], &mut heap);
        set.intersection_update(&other, &mut heap).unwrap();
        assert_eq!(set.to_vec(&heap), vec![2, 3]);
        set.symmetric_difference_update(&other, &mut heap).unwrap();
        assert_eq!(set.to_vec(&heap), vec![4]);
    }

    #[test]
    fn add_during_iteration_raises() {
        let mut heap = Heap::new(NoLimitTracker);
        let set = set_of(&[1, 2], &mut heap);
        let mut iter = PyIter::new(set, &heap).unwrap();
        iter.next(&heap).unwrap();
        set.add(9, &mut heap).unwrap();
        let err = iter.get_next(&heap).unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: Set changed size during iteration");
    }
}
