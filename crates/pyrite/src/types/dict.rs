use std::{cmp::Ordering, mem};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId, Ref},
    iter::{ForIn, collect_vec},
    object::{DeepCopyMemo, HeapObject, PyObject, dict_key_hash},
    resource::ResourceTracker,
    types::{
        Pair,
        table::{Table, TableCursor},
    },
};

/// Python dict type preserving insertion order.
///
/// Dicts live on the heap and are manipulated through `Ref<Dict<K, V>>`.
///
/// # Implemented Methods
/// - `get(key)` (KeyError), `get_or(key, default)`, `try_get(key)`
/// - `set`, `setdefault`, `pop`, `pop_or`, `popitem`, `update`, `clear`, `copy`
/// - `keys()`, `values()`, `items()` live views
/// - `fromkeys(iterable, value)`
///
/// # Storage Strategy
/// Entries sit in a shared [`Table`]: a `HashTable<usize>` of indices into a dense,
/// insertion ordered entry vector, with every key's hash stored next to it.
///
/// Ordering compares key sets: `a < b` means every key of `a` is also a key of
/// `b` and `b` has more. Values only matter for equality.
#[derive(Debug, Clone)]
pub struct Dict<K, V> {
    table: Table<K, V>,
}

impl<K, V> Default for Dict<K, V> {
    fn default() -> Self {
        Self { table: Table::default() }
    }
}

impl<K: PyObject, V: PyObject> Dict<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a dict from key/value pairs; later duplicates overwrite earlier ones.
    pub fn from_vec(pairs: Vec<(K, V)>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let dict = heap.allocate(Self {
            table: Table::with_capacity(pairs.len()),
        })?;
        for (key, value) in pairs {
            dict.set(key, value, heap)?;
        }
        Ok(dict)
    }

    /// `dict(iterable_of_pairs)`
    pub fn from_for_in(
        source: &impl ForIn<Item = Pair<K, V>>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<Ref<Self>> {
        let pairs = collect_vec(source, heap)?;
        Self::from_vec(pairs.into_iter().map(Pair::into_parts).collect(), heap)
    }

    /// `dict.fromkeys(iterable, value)`
    pub fn fromkeys(
        source: &impl ForIn<Item = K>,
        value: V,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<Ref<Self>> {
        let keys = collect_vec(source, heap)?;
        Self::from_vec(keys.into_iter().map(|key| (key, value.clone())).collect(), heap)
    }
}

/// True when every key of `this` is also a key of `other`.
fn keys_subset<K: PyObject, V: PyObject>(
    this: Ref<Dict<K, V>>,
    other: Ref<Dict<K, V>>,
    heap: &Heap<impl ResourceTracker>,
) -> RunResult<bool> {
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

/// True when every item of `this` is present in `other` with an equal value.
fn items_subset<K: PyObject, V: PyObject>(
    this: Ref<Dict<K, V>>,
    other: Ref<Dict<K, V>>,
    heap: &Heap<impl ResourceTracker>,
) -> RunResult<bool> {
    let (mine, theirs) = (&heap.get(this).table, &heap.get(other).table);
    if mine.len() > theirs.len() {
        return Ok(false);
    }
    for entry in mine.entries() {
        let Some(index) = theirs.find(&entry.key, entry.hash, heap)? else {
            return Ok(false);
        };
        let Some(found) = theirs.entry_at(index) else {
            return Ok(false);
        };
        if !entry.value.py_eq(&found.value, heap)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl<K: PyObject, V: PyObject> HeapObject for Dict<K, V> {
    const TYPE_NAME: &'static str = "dict";
    const HASHABLE: bool = false;

    fn trace(&self, out: &mut Vec<HeapId>) {
        self.table.trace_keys(out);
        for entry in self.table.entries() {
            entry.value.trace(out);
        }
    }

    fn estimate_size(&self) -> usize {
        mem::size_of::<Self>() + self.table.len() * (mem::size_of::<K>() + mem::size_of::<V>() + 16)
    }

    fn py_repr(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        heap.repr_guarded(this.id(), "{...}", || {
            let mut out = String::from("{");
            for (index, entry) in heap.get(this).table.entries().iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key.py_repr(heap)?);
                out.push_str(": ");
                out.push_str(&entry.value.py_repr(heap)?);
            }
            out.push('}');
            Ok(out)
        })
    }

    /// Same items regardless of insertion order.
    fn py_eq(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        if heap.get(this).table.len() != heap.get(other).table.len() {
            return Ok(false);
        }
        items_subset(this, other, heap)
    }

    /// Key subset ordering; dicts where neither key set contains the other are unorderable.
    fn py_cmp(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        if keys_subset(this, other, heap)? {
            return Ok(if heap.get(this).table.len() == heap.get(other).table.len() {
                Ordering::Equal
            } else {
                Ordering::Less
            });
        }
        if keys_subset(other, this, heap)? {
            return Ok(Ordering::Greater);
        }
        Err(ExcType::type_error_unorderable("<", Self::TYPE_NAME, Self::TYPE_NAME))
    }

    fn py_lt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(heap.get(this).table.len() < heap.get(other).table.len() && keys_subset(this, other, heap)?)
    }

    fn py_le(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        keys_subset(this, other, heap)
    }

    fn py_gt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Self::py_lt(other, this, heap)
    }

    fn py_ge(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        keys_subset(other, this, heap)
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

    /// Keys are re-hashed after copying since copied heap keys get new identities.
    fn py_deepcopy(
        this: Ref<Self>,
        heap: &mut Heap<impl ResourceTracker>,
        memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        let copy = heap.allocate(Self::new())?;
        memo.insert(this, copy);
        let originals: Vec<(K, V)> = heap
            .get(this)
            .table
            .entries()
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect();
        for (key, value) in originals {
            let key = key.py_deepcopy(heap, memo)?;
            let value = value.py_deepcopy(heap, memo)?;
            copy.set(key, value, heap)?;
        }
        Ok(copy)
    }
}

impl<K: PyObject, V: PyObject> Ref<Dict<K, V>> {
    #[must_use]
    pub fn len(self, heap: &Heap<impl ResourceTracker>) -> usize {
        heap.get(self).table.len()
    }

    #[must_use]
    pub fn is_empty(self, heap: &Heap<impl ResourceTracker>) -> bool {
        heap.get(self).table.is_empty()
    }

    /// Index of the entry for `key` plus the key's hash.
    fn locate(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<(Option<usize>, u64)> {
        let hash = dict_key_hash(key, heap)?;
        Ok((heap.get(self).table.find(key, hash, heap)?, hash))
    }

    fn value_at(self, index: usize, heap: &Heap<impl ResourceTracker>) -> RunResult<V> {
        heap.get(self)
            .table
            .entry_at(index)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| crate::exception::RunError::internal("dict index out of range"))
    }

    /// `d[key] = value`; replacing an existing key keeps its position.
    pub fn set(self, key: K, value: V, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let (found, hash) = self.locate(&key, heap)?;
        if let Some(index) = found {
            if let Some(slot) = heap.get_mut(self).table.value_at_mut(index) {
                *slot = value;
            }
            return Ok(());
        }
        heap.note_container_insert()?;
        heap.get_mut(self).table.insert_new(key, value, hash);
        Ok(())
    }

    /// `d[key]`, raising `KeyError(key)` when missing.
    pub fn get(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<V> {
        match self.try_get(key, heap)? {
            Some(value) => Ok(value),
            None => Err(ExcType::key_error(key.py_repr(heap)?)),
        }
    }

    /// `d.get(key, default)`
    pub fn get_or(self, key: &K, default: V, heap: &Heap<impl ResourceTracker>) -> RunResult<V> {
        Ok(self.try_get(key, heap)?.unwrap_or(default))
    }

    /// Lookup without raising for a missing key; unhashable keys still raise.
    pub fn try_get(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<Option<V>> {
        match self.locate(key, heap)? {
            (Some(index), _) => self.value_at(index, heap).map(Some),
            (None, _) => Ok(None),
        }
    }

    /// `key in d`
    pub fn contains(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.locate(key, heap)?.0.is_some())
    }

    /// Python 2 spelling of [`contains`](Self::contains).
    pub fn has_key(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        self.contains(key, heap)
    }

    /// `d.setdefault(key, default)`: the existing value, or `default` after inserting it.
    pub fn setdefault(self, key: K, default: V, heap: &mut Heap<impl ResourceTracker>) -> RunResult<V> {
        let (found, hash) = self.locate(&key, heap)?;
        if let Some(index) = found {
            return self.value_at(index, heap);
        }
        heap.note_container_insert()?;
        heap.get_mut(self).table.insert_new(key, default.clone(), hash);
        Ok(default)
    }

    /// `d.pop(key)`, raising `KeyError(key)` when missing.
    pub fn pop(self, key: &K, heap: &mut Heap<impl ResourceTracker>) -> RunResult<V> {
        match self.locate(key, heap)? {
            (Some(index), _) => Ok(heap.get_mut(self).table.remove_at(index)?.value),
            (None, _) => Err(ExcType::key_error(key.py_repr(heap)?)),
        }
    }

    /// `d.pop(key, default)`
    pub fn pop_or(self, key: &K, default: V, heap: &mut Heap<impl ResourceTracker>) -> RunResult<V> {
        match self.locate(key, heap)? {
            (Some(index), _) => Ok(heap.get_mut(self).table.remove_at(index)?.value),
            (None, _) => Ok(default),
        }
    }

    /// Removes and returns the most recently inserted item.
    pub fn popitem(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Pair<K, V>> {
        heap.get_mut(self)
            .table
            .pop_last()
            .map(|entry| Pair::new(entry.key, entry.value))
            .ok_or_else(ExcType::key_error_popitem_empty_dict)
    }

    /// `d.update(pairs)`; the source is read completely first, so `d.update(d.items())` is safe.
    pub fn update(
        self,
        source: &impl ForIn<Item = Pair<K, V>>,
        heap: &mut Heap<impl ResourceTracker>,
    ) -> RunResult<()> {
        for pair in collect_vec(source, heap)? {
            let (key, value) = pair.into_parts();
            self.set(key, value, heap)?;
        }
        Ok(())
    }

    pub fn clear(self, heap: &mut Heap<impl ResourceTracker>) {
        heap.get_mut(self).table.clear();
    }

    /// `d.copy()`, a shallow copy.
    pub fn copy(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        Dict::py_copy(self, heap)
    }

    #[must_use]
    pub fn keys(self) -> DictKeys<K, V> {
        DictKeys(self)
    }

    #[must_use]
    pub fn values(self) -> DictValues<K, V> {
        DictValues(self)
    }

    #[must_use]
    pub fn items(self) -> DictItems<K, V> {
        DictItems(self)
    }

    /// Cursor step shared by the views and `for k in d`.
    fn view_next<T>(
        self,
        cursor: &mut TableCursor,
        heap: &Heap<impl ResourceTracker>,
        project: impl FnOnce(&K, &V) -> T,
    ) -> RunResult<T> {
        let table = &heap.get(self).table;
        check_cursor(cursor, table)?;
        let position = cursor.advance()?;
        table
            .entry_at(position)
            .map(|entry| project(&entry.key, &entry.value))
            .ok_or_else(ExcType::stop_iteration)
    }
}

fn check_cursor<K: PyObject, V>(cursor: &TableCursor, table: &Table<K, V>) -> RunResult<()> {
    cursor.check(
        table,
        ExcType::runtime_error_dict_changed_size,
        ExcType::runtime_error_dict_keys_changed,
    )
}

/// Implements the `for_in` triad for a dict view yielding `$item` built by `$project`.
macro_rules! dict_view_for_in {
    ($view:ident, $item:ty, $project:expr) => {
        impl<K: PyObject, V: PyObject> ForIn for $view<K, V> {
            type Item = $item;
            type Cursor = TableCursor;

            fn for_in_init(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<TableCursor> {
                Ok(TableCursor::start(&heap.get(self.0).table))
            }

            fn for_in_has_next(&self, cursor: &TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
                check_cursor(cursor, &heap.get(self.0).table)?;
                Ok(cursor.has_next())
            }

            fn for_in_next(&self, cursor: &mut TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<$item> {
                self.0.view_next(cursor, heap, $project)
            }
        }

        impl<K, V> Clone for $view<K, V> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<K, V> Copy for $view<K, V> {}

        impl<K: PyObject, V: PyObject> $view<K, V> {
            /// The viewed dict.
            #[must_use]
            pub fn dict(self) -> Ref<Dict<K, V>> {
                self.0
            }

            #[must_use]
            pub fn len(self, heap: &Heap<impl ResourceTracker>) -> usize {
                self.0.len(heap)
            }

            #[must_use]
            pub fn is_empty(self, heap: &Heap<impl ResourceTracker>) -> bool {
                self.0.is_empty(heap)
            }
        }
    };
}

/// Live view of a dict's keys, `d.keys()`.
#[derive(Debug)]
pub struct DictKeys<K, V>(Ref<Dict<K, V>>);

/// Live view of a dict's values, `d.values()`.
#[derive(Debug)]
pub struct DictValues<K, V>(Ref<Dict<K, V>>);

/// Live view of a dict's items as `(key, value)` pairs, `d.items()`.
#[derive(Debug)]
pub struct DictItems<K, V>(Ref<Dict<K, V>>);

dict_view_for_in!(DictKeys, K, |key: &K, _: &V| key.clone());
dict_view_for_in!(DictValues, V, |_: &K, value: &V| value.clone());
dict_view_for_in!(DictItems, Pair<K, V>, |key: &K, value: &V| Pair::new(key.clone(), value.clone()));

impl<K: PyObject, V: PyObject> DictKeys<K, V> {
    /// `key in d.keys()`, a hash lookup.
    pub fn contains(self, key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        self.0.contains(key, heap)
    }
}

/// `for key in d` iterates the keys.
impl<K: PyObject, V: PyObject> ForIn for Ref<Dict<K, V>> {
    type Item = K;
    type Cursor = TableCursor;

    fn for_in_init(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<TableCursor> {
        self.keys().for_in_init(heap)
    }

    fn for_in_has_next(&self, cursor: &TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        self.keys().for_in_has_next(cursor, heap)
    }

    fn for_in_next(&self, cursor: &mut TableCursor, heap: &Heap<impl ResourceTracker>) -> RunResult<K> {
        self.keys().for_in_next(cursor, heap)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{iter::PyIter, resource::NoLimitTracker, types::Str};

    fn sample(heap: &mut Heap<NoLimitTracker>) -> Ref<Dict<Str, i64>> {
        Dict::from_vec(vec![(Str::from("a"), 1), (Str::from("b"), 2)], heap).unwrap()
    }

    #[test]
    fn get_and_missing_key() {
        let mut heap = Heap::new(NoLimitTracker);
        let dict = sample(&mut heap);
        assert_eq!(dict.get(&Str::from("b"), &heap).unwrap(), 2);
        let err = dict.get(&Str::from("z"), &heap).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'z'");
        assert_eq!(dict.get_or(&Str::from("z"), 9, &heap).unwrap(), 9);
    }

    #[test]
    fn set_existing_key_keeps_position() {
        let mut heap = Heap::new(NoLimitTracker);
        let dict = sample(&mut heap);
        dict.set(Str::from("a"), 10, &mut heap).unwrap();
        assert_eq!(dict.py_repr(&heap).unwrap(), "{'a': 10, 'b': 2}");
    }

    #[test]
    fn popitem_is_lifo_then_raises() {
        let mut heap = Heap::new(NoLimitTracker);
        let dict = sample(&mut heap);
        assert_eq!(dict.popitem(&mut heap).unwrap().into_parts(), (Str::from("b"), 2));
        dict.popitem(&mut heap).unwrap();
        let err = dict.popitem(&mut heap).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'popitem(): dictionary is empty'");
    }

    #[test]
    fn equality_ignores_order_and_ordering_is_subset() {
        let mut heap = Heap::new(NoLimitTracker);
        let ab = sample(&mut heap);
        let ba = Dict::from_vec(vec![(Str::from("b"), 2), (Str::from("a"), 1)], &mut heap).unwrap();
        let a = Dict::from_vec(vec![(Str::from("a"), 1)], &mut heap).unwrap();
        assert!(ab.py_eq(&ba, &heap).unwrap());
        assert!(a.py_lt(&ab, &heap).unwrap());
        assert!(ab.py_ge(&a, &heap).unwrap());
        assert!(!ab.py_lt(&ba, &heap).unwrap());
    }

    #[test]
    fn ordering_uses_keys_not_values() {
        let mut heap = Heap::new(NoLimitTracker);
        let small = Dict::from_vec(vec![(Str::from("a"), 1)], &mut heap).unwrap();
        let large = Dict::from_vec(vec![(Str::from("a"), 2), (Str::from("b"), 3)], &mut heap).unwrap();
        assert!(small.py_lt(&large, &heap).unwrap());
        assert!(small.py_le(&large, &heap).unwrap());
        assert!(large.py_gt(&small, &heap).unwrap());
        assert!(large.py_ge(&small, &heap).unwrap());
        assert_eq!(small.py_cmp(&large, &heap).unwrap(), Ordering::Less);
        assert_eq!(large.py_cmp(&small, &heap).unwrap(), Ordering::Greater);
        assert!(!small.py_eq(&large, &heap).unwrap());

        let other = Dict::from_vec(vec![(Str::from("c"), 1)], &mut heap).unwrap();
        let err = small.py_cmp(&other, &heap).unwrap_err();
        assert!(err.is_exception_type(ExcType::TypeError));
        assert!(!small.py_lt(&other, &heap).unwrap());
    }

    #[test]
    fn mutation_during_iteration_raises() {
        let mut heap = Heap::new(NoLimitTracker);
        let dict = sample(&mut heap);
        let mut iter = PyIter::new(dict.keys(), &heap).unwrap();
        assert_eq!(iter.next(&heap).unwrap(), Str::from("a"));
        dict.set(Str::from("c"), 3, &mut heap).unwrap();
        let err = iter.get_next(&heap).unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: dictionary changed size during iteration");
    }

    #[test]
    fn same_size_key_swap_is_detected() {
        let mut heap = Heap::new(NoLimitTracker);
        let dict = sample(&mut heap);
        let mut iter = PyIter::new(dict.items(), &heap).unwrap();
        iter.next(&heap).unwrap();
        dict.pop(&Str::from("a"), &mut heap).unwrap();
        dict.set(Str::from("z"), 0, &mut heap).unwrap();
        let err = iter.get_next(&heap).unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: dictionary keys changed during iteration");
    }

    #[test]
    fn unhashable_key_message() {
        let mut heap = Heap::new(NoLimitTracker);
        let key = crate::types::List::<i64>::from_vec(vec![], &mut heap).unwrap();
        let dict = Dict::<_, i64>::from_vec(vec![], &mut heap).unwrap();
        let err = dict.set(key, 1, &mut heap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: cannot use 'list' as a dict key (unhashable type: 'list')"
        );
    }
}
