use std::{cmp::Ordering, mem};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId, Ref},
    iter::{ForIn, collect_vec},
    object::{DeepCopyMemo, HeapObject, PyObject},
    resource::ResourceTracker,
    sequence::{Sequence, sequence_for_in},
    slice::{SliceSpec, clamp_insert_index, wrap_index},
};

/// Python list type, a resizable ordered sequence owned by the heap.
///
/// Lists are always used through a `Ref<List<T>>` handle so that aliasing follows
/// Python reference semantics: `b = a` shares the list, `a.copy()` does not.
///
/// # Implemented Methods
/// - `append`, `insert`, `extend`, `pop`, `pop_at`, `remove`, `clear`
/// - `index`, `count`, `reverse`, `sort`, `sort_by_key`, `sort_with`
/// - `copy`, slicing reads/writes/deletes, `+`, `*`, `+=`, `*=`
#[derive(Debug, Clone, Default)]
pub struct List<T> {
    items: Vec<T>,
}

impl<T> List<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: PyObject> List<T> {
    /// Allocates a list holding `items`, the count-and-elements construction form.
    pub fn from_vec(items: Vec<T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        heap.allocate(Self::from(items))
    }

    /// `list(iterable)`
    pub fn from_for_in(source: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let items = collect_vec(source, heap)?;
        Self::from_vec(items, heap)
    }
}

impl<T: PyObject> HeapObject for List<T> {
    const TYPE_NAME: &'static str = "list";
    const HASHABLE: bool = false;

    fn trace(&self, out: &mut Vec<HeapId>) {
        for item in &self.items {
            item.trace(out);
        }
    }

    fn estimate_size(&self) -> usize {
        mem::size_of::<Self>() + self.items.len() * mem::size_of::<T>()
    }

    fn py_repr(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        heap.repr_guarded(this.id(), "[...]", || {
            let mut out = String::from("[");
            for (index, item) in heap.get(this).items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&item.py_repr(heap)?);
            }
            out.push(']');
            Ok(out)
        })
    }

    fn py_eq(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        this.seq_eq(&other, heap)
    }

    fn py_cmp(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        this.seq_cmp(&other, heap)
    }

    fn py_bool(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!heap.get(this).items.is_empty())
    }

    fn py_len(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(heap.get(this).items.len())
    }

    fn py_copy(this: Ref<Self>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let items = heap.get(this).items.clone();
        Self::from_vec(items, heap)
    }

    fn py_deepcopy(
        this: Ref<Self>,
        heap: &mut Heap<impl ResourceTracker>,
        memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        let copy = heap.allocate(Self::new())?;
        memo.insert(this, copy);
        let originals = heap.get(this).items.clone();
        let mut items = Vec::with_capacity(originals.len());
        for item in &originals {
            items.push(item.py_deepcopy(heap, memo)?);
        }
        heap.get_mut(copy).items = items;
        Ok(copy)
    }
}

impl<T: PyObject> Sequence for Ref<List<T>> {
    type Item = T;
    const INDEX_ERROR: &'static str = "list index out of range";

    fn seq_len(&self, heap: &Heap<impl ResourceTracker>) -> usize {
        heap.get(*self).items.len()
    }

    fn seq_item(&self, index: usize, heap: &Heap<impl ResourceTracker>) -> Option<T> {
        heap.get(*self).items.get(index).cloned()
    }
}

sequence_for_in!([T: PyObject] Ref<List<T>>);

const ASSIGNMENT_INDEX_ERROR: &str = "list assignment index out of range";

impl<T: PyObject> Ref<List<T>> {
    #[must_use]
    pub fn len(self, heap: &Heap<impl ResourceTracker>) -> usize {
        heap.get(self).items.len()
    }

    #[must_use]
    pub fn is_empty(self, heap: &Heap<impl ResourceTracker>) -> bool {
        heap.get(self).items.is_empty()
    }

    /// Snapshot of the current items.
    #[must_use]
    pub fn to_vec(self, heap: &Heap<impl ResourceTracker>) -> Vec<T> {
        heap.get(self).items.clone()
    }

    /// `l[index]`
    pub fn get(self, index: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<T> {
        self.seq_get(index, heap)
    }

    /// `l[index] = value`
    pub fn set(self, index: i64, value: T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let items = &mut heap.get_mut(self).items;
        let index = wrap_index(index, items.len()).ok_or_else(|| ExcType::index_error(ASSIGNMENT_INDEX_ERROR))?;
        items[index] = value;
        Ok(())
    }

    /// `del l[index]`
    pub fn delete(self, index: i64, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let items = &mut heap.get_mut(self).items;
        let index = wrap_index(index, items.len()).ok_or_else(|| ExcType::index_error(ASSIGNMENT_INDEX_ERROR))?;
        items.remove(index);
        Ok(())
    }

    pub fn append(self, value: T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        heap.note_container_insert()?;
        heap.get_mut(self).items.push(value);
        Ok(())
    }

    /// `l.insert(index, value)`; the position is clamped, never raising.
    pub fn insert(self, index: i64, value: T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        heap.note_container_insert()?;
        let items = &mut heap.get_mut(self).items;
        let index = clamp_insert_index(index, items.len());
        items.insert(index, value);
        Ok(())
    }

    /// `l.pop()`
    pub fn pop(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<T> {
        heap.get_mut(self)
            .items
            .pop()
            .ok_or_else(|| ExcType::index_error_pop_empty(List::<T>::TYPE_NAME))
    }

    /// `l.pop(index)`
    pub fn pop_at(self, index: i64, heap: &mut Heap<impl ResourceTracker>) -> RunResult<T> {
        let items = &mut heap.get_mut(self).items;
        if items.is_empty() {
            return Err(ExcType::index_error_pop_empty(List::<T>::TYPE_NAME));
        }
        let index = wrap_index(index, items.len()).ok_or_else(ExcType::index_error_pop_index)?;
        Ok(items.remove(index))
    }

    /// Removes the first item equal to `value`.
    pub fn remove(self, value: &T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let index = self
            .seq_index(value, None, None, heap)?
            .ok_or_else(|| ExcType::value_error("list.remove(x): x not in list"))?;
        heap.get_mut(self).items.remove(index);
        Ok(())
    }

    pub fn clear(self, heap: &mut Heap<impl ResourceTracker>) {
        heap.get_mut(self).items.clear();
    }

    pub fn reverse(self, heap: &mut Heap<impl ResourceTracker>) {
        heap.get_mut(self).items.reverse();
    }

    /// `l.index(value, start, end)`
    pub fn index(
        self,
        value: &T,
        start: Option<i64>,
        end: Option<i64>,
        heap: &Heap<impl ResourceTracker>,
    ) -> RunResult<usize> {
        match self.seq_index(value, start, end, heap)? {
            Some(index) => Ok(index),
            None => Err(ExcType::value_error(format_args!("{} is not in list", value.py_repr(heap)?))),
        }
    }

    pub fn count(self, value: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        self.seq_count(value, heap)
    }

    /// `value in l`
    pub fn contains(self, value: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        self.seq_contains(value, heap)
    }

    /// `l.extend(iterable)`; the source is read completely before the list grows,
    /// so `l.extend(l)` doubles the list.
    pub fn extend(self, source: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let items = collect_vec(source, heap)?;
        for _ in 0..items.len() {
            heap.note_container_insert()?;
        }
        heap.get_mut(self).items.extend(items);
        Ok(())
    }

    /// `l + other`, a new list.
    pub fn add(self, other: Self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let mut items = heap.get(self).items.clone();
        items.extend_from_slice(&heap.get(other).items);
        List::from_vec(items, heap)
    }

    /// `l * n`, a new list; `n <= 0` gives an empty list.
    pub fn multiply(self, times: i64, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let items = repeat_items(&heap.get(self).items, times, heap)?;
        List::from_vec(items, heap)
    }

    /// `l += iterable`
    pub fn iadd(self, source: &impl ForIn<Item = T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        self.extend(source, heap)?;
        Ok(self)
    }

    /// `l *= n`
    pub fn imul(self, times: i64, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let items = repeat_items(&heap.get(self).items, times, heap)?;
        heap.get_mut(self).items = items;
        Ok(self)
    }

    /// `l.copy()` / `l[:]`
    pub fn copy(self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        List::py_copy(self, heap)
    }

    /// `l[start:stop:step]`, a new list.
    pub fn get_slice(self, slice: SliceSpec, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        let source = &heap.get(self).items;
        let indices = slice.indices(source.len())?;
        let items: Vec<T> = indices.positions().map(|index| source[index].clone()).collect();
        List::from_vec(items, heap)
    }

    /// `l[start:stop:step] = values`
    ///
    /// A step 1 slice may change the length of the list; an extended slice must be
    /// assigned exactly as many values as it selects.
    pub fn set_slice(self, slice: SliceSpec, values: Vec<T>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let indices = slice.indices(self.len(heap))?;
        if indices.is_contiguous() {
            for _ in indices.len..values.len() {
                heap.note_container_insert()?;
            }
            heap.get_mut(self).items.splice(indices.contiguous_range(), values);
            return Ok(());
        }
        if values.len() != indices.len {
            return Err(ExcType::value_error_extended_slice(values.len(), indices.len));
        }
        let items = &mut heap.get_mut(self).items;
        for (position, value) in indices.positions().zip(values) {
            items[position] = value;
        }
        Ok(())
    }

    /// `del l[start:stop:step]`
    pub fn delete_slice(self, slice: SliceSpec, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let items = &mut heap.get_mut(self).items;
        let indices = slice.indices(items.len())?;
        if indices.is_contiguous() {
            items.drain(indices.contiguous_range());
            return Ok(());
        }
        let mut doomed = vec![false; items.len()];
        for position in indices.positions() {
            doomed[position] = true;
        }
        let mut position = 0;
        items.retain(|_| {
            let keep = !doomed[position];
            position += 1;
            keep
        });
        Ok(())
    }

    /// `l.sort(reverse=...)`, stable, comparing items with `py_cmp`.
    pub fn sort(self, reverse: bool, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        self.sort_with(|a, b, heap| a.py_cmp(b, heap), reverse, heap)
    }

    /// `l.sort(key=key, reverse=...)`: keys are computed once per item, then the
    /// items are ordered by their keys.
    pub fn sort_by_key<R: ResourceTracker, K: PyObject>(
        self,
        mut key: impl FnMut(&T, &Heap<R>) -> RunResult<K>,
        reverse: bool,
        heap: &mut Heap<R>,
    ) -> RunResult<()> {
        let items = mem::take(&mut heap.get_mut(self).items);
        let mut decorated = Vec::with_capacity(items.len());
        let mut failure = None;
        for item in items {
            if failure.is_none() {
                match key(&item, &*heap) {
                    Ok(sort_key) => {
                        decorated.push((Some(sort_key), item));
                        continue;
                    }
                    Err(err) => failure = Some(err),
                }
            }
            decorated.push((None, item));
        }
        if let Some(err) = failure {
            heap.get_mut(self).items = decorated.into_iter().map(|(_, item)| item).collect();
            return Err(err);
        }

        let result = stable_sort(&mut decorated, reverse, heap, |a, b, heap| a.0.py_cmp(&b.0, heap));
        self.put_back_sorted(decorated.into_iter().map(|(_, item)| item).collect(), result, heap)
    }

    /// `l.sort(cmp=compare, reverse=...)` with a custom three-way comparator.
    pub fn sort_with<R: ResourceTracker>(
        self,
        compare: impl FnMut(&T, &T, &Heap<R>) -> RunResult<Ordering>,
        reverse: bool,
        heap: &mut Heap<R>,
    ) -> RunResult<()> {
        let mut items = mem::take(&mut heap.get_mut(self).items);
        let result = stable_sort(&mut items, reverse, heap, compare);
        self.put_back_sorted(items, result, heap)
    }

    /// Restores items taken out for sorting. While the sort runs the list looks
    /// empty; anything appended meanwhile is discarded and reported.
    fn put_back_sorted(self, items: Vec<T>, sorted: RunResult<()>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
        let slot = &mut heap.get_mut(self).items;
        let modified = !slot.is_empty();
        *slot = items;
        sorted?;
        if modified {
            return Err(ExcType::value_error("list modified during sort"));
        }
        Ok(())
    }
}

/// Stable sort with a fallible comparator; the first comparison error stops
/// further comparisons and is returned once sorting finishes.
fn stable_sort<E, R: ResourceTracker>(
    items: &mut [E],
    reverse: bool,
    heap: &Heap<R>,
    mut compare: impl FnMut(&E, &E, &Heap<R>) -> RunResult<Ordering>,
) -> RunResult<()> {
    let mut failure = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match compare(a, b, heap) {
            Ok(ordering) if reverse => ordering.reverse(),
            Ok(ordering) => ordering,
            Err(err) => {
                failure = Some(err);
                Ordering::Equal
            }
        }
    });
    failure.map_or(Ok(()), Err)
}

/// Repeats `items` `times` times, refusing results over the memory limit up front.
fn repeat_items<T: Clone>(items: &[T], times: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<Vec<T>> {
    let Ok(times) = usize::try_from(times) else {
        return Ok(Vec::new());
    };
    let total = items.len().checked_mul(times).ok_or_else(ExcType::overflow_error_index)?;
    heap.check_large_result(total.saturating_mul(mem::size_of::<T>()))?;
    let mut repeated = Vec::with_capacity(total);
    for _ in 0..times {
        repeated.extend_from_slice(items);
    }
    Ok(repeated)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resource::NoLimitTracker;

    fn list_of(values: &[i64], heap: &mut Heap<NoLimitTracker>) -> Ref<List<i64>> {
        List::from_vec(values.to_vec(), heap).unwrap()
    }

    #[test]
    fn negative_index_wraps_once() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[10, 20, 30], &mut heap);
        assert_eq!(list.get(-1, &heap).unwrap(), 30);
        assert_eq!(list.get(-3, &heap).unwrap(), 10);
        let err = list.get(-4, &heap).unwrap_err();
        assert_eq!(err.to_string(), "IndexError: list index out of range");
        let err = list.set(3, 0, &mut heap).unwrap_err();
        assert_eq!(err.to_string(), "IndexError: list assignment index out of range");
    }

    #[test]
    fn pop_errors_match_python() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[1], &mut heap);
        assert_eq!(list.pop_at(-1, &mut heap).unwrap(), 1);
        assert_eq!(list.pop(&mut heap).unwrap_err().to_string(), "IndexError: pop from empty list");
        list.append(5, &mut heap).unwrap();
        assert_eq!(list.pop_at(4, &mut heap).unwrap_err().to_string(), "IndexError: pop index out of range");
    }

    #[test]
    fn remove_and_index_report_missing_values() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[1, 2, 1], &mut heap);
        list.remove(&1, &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![2, 1]);
        let err = list.remove(&7, &mut heap).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: list.remove(x): x not in list");
        assert_eq!(list.index(&1, None, None, &heap).unwrap(), 1);
        let err = list.index(&2, Some(1), None, &heap).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: 2 is not in list");
    }

    #[test]
    fn extend_with_itself_doubles() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[1, 2], &mut heap);
        list.extend(&list, &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![1, 2, 1, 2]);
    }

    #[test]
    fn slice_assignment() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[0, 1, 2, 3, 4], &mut heap);
        list.set_slice(SliceSpec::range(Some(1), Some(3)), vec![9], &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![0, 9, 3, 4]);
        list.set_slice(SliceSpec::stepped(2), vec![7, 8], &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![7, 9, 8, 4]);
        let err = list.set_slice(SliceSpec::stepped(2), vec![1], &mut heap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ValueError: attempt to assign sequence of size 1 to extended slice of size 2"
        );
        list.delete_slice(SliceSpec::stepped(-2), &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![7, 8]);
    }

    #[test]
    fn multiply_non_positive_is_empty() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[1, 2], &mut heap);
        assert!(list.multiply(0, &mut heap).unwrap().is_empty(&heap));
        assert!(list.multiply(-3, &mut heap).unwrap().is_empty(&heap));
        assert_eq!(list.multiply(2, &mut heap).unwrap().to_vec(&heap), vec![1, 2, 1, 2]);
    }

    #[test]
    fn reverse_sort_is_stable() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[3, 1, 2], &mut heap);
        list.sort(true, &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![3, 2, 1]);
        list.sort_by_key(|item, _| Ok(*item % 2), false, &mut heap).unwrap();
        assert_eq!(list.to_vec(&heap), vec![2, 3, 1]);
    }

    #[test]
    fn sort_comparator_error_keeps_items() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = list_of(&[2, 1], &mut heap);
        let err = list
            .sort_with(|_, _, _| Err(ExcType::type_error("boom")), false, &mut heap)
            .unwrap_err();
        assert!(err.is_exception_type(ExcType::TypeError));
        assert_eq!(list.len(&heap), 2);
    }

    #[test]
    fn repr_of_self_containing_list() {
        let mut heap = Heap::new(NoLimitTracker);
        let outer: Ref<List<crate::value::Value>> = List::from_vec(Vec::new(), &mut heap).unwrap();
        outer.append(crate::value::Value::Int(1), &mut heap).unwrap();
        outer.append(crate::value::Value::List(outer), &mut heap).unwrap();
        assert_eq!(outer.py_repr(&heap).unwrap(), "[1, [...]]");
    }
}
