use std::{cmp::Ordering, fmt, rc::Rc};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId},
    iter::{ForIn, collect_vec},
    object::{DeepCopyMemo, PyObject},
    py_hash::hash_tuple,
    resource::ResourceTracker,
    sequence::{Sequence, sequence_for_in},
    slice::SliceSpec,
};

/// Python tuple with homogeneous elements.
///
/// Tuples are immutable values: cloning shares the underlying slice, so there is
/// nothing for the heap to own. Elements that are heap references are still traced.
#[derive(Clone)]
pub struct Tuple<T>(Rc<[T]>);

impl<T: fmt::Debug> fmt::Debug for Tuple<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tuple").field(&&*self.0).finish()
    }
}

impl<T> From<Vec<T>> for Tuple<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items.into())
    }
}

impl<T, const N: usize> From<[T; N]> for Tuple<T> {
    fn from(items: [T; N]) -> Self {
        Self(Rc::from(Vec::from(items)))
    }
}

impl<T: PyObject> Tuple<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self(Rc::from(Vec::new()))
    }

    /// `tuple(iterable)`
    pub fn from_for_in(source: &impl ForIn<Item = T>, heap: &Heap<impl ResourceTracker>) -> RunResult<Self> {
        Ok(collect_vec(source, heap)?.into())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `t[index]`
    pub fn get(&self, index: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<T> {
        self.seq_get(index, heap)
    }

    /// `t[start:stop:step]`
    pub fn get_slice(&self, slice: SliceSpec) -> RunResult<Self> {
        let indices = slice.indices(self.0.len())?;
        if indices.is_contiguous() && indices.len == self.0.len() {
            return Ok(self.clone());
        }
        Ok(indices.positions().map(|index| self.0[index].clone()).collect::<Vec<_>>().into())
    }

    /// `t + other`
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut items = self.0.to_vec();
        items.extend_from_slice(&other.0);
        items.into()
    }

    /// `t * n`; `n <= 0` gives the empty tuple.
    pub fn multiply(&self, times: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<Self> {
        let Ok(times) = usize::try_from(times) else {
            return Ok(Self::empty());
        };
        let total = self.0.len().checked_mul(times).ok_or_else(ExcType::overflow_error_index)?;
        heap.check_large_result(total.saturating_mul(std::mem::size_of::<T>()))?;
        let mut items = Vec::with_capacity(total);
        for _ in 0..times {
            items.extend_from_slice(&self.0);
        }
        Ok(items.into())
    }

    /// `t.index(value, start, end)`
    pub fn index(
        &self,
        value: &T,
        start: Option<i64>,
        end: Option<i64>,
        heap: &Heap<impl ResourceTracker>,
    ) -> RunResult<usize> {
        self.seq_index(value, start, end, heap)?
            .ok_or_else(|| ExcType::value_error("tuple.index(x): x not in tuple"))
    }

    pub fn count(&self, value: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        self.seq_count(value, heap)
    }

    pub fn contains(&self, value: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        self.seq_contains(value, heap)
    }
}

impl<T: PyObject> Sequence for Tuple<T> {
    type Item = T;
    const INDEX_ERROR: &'static str = "tuple index out of range";

    fn seq_len(&self, _heap: &Heap<impl ResourceTracker>) -> usize {
        self.0.len()
    }

    fn seq_item(&self, index: usize, _heap: &Heap<impl ResourceTracker>) -> Option<T> {
        self.0.get(index).cloned()
    }
}

sequence_for_in!([T: PyObject] Tuple<T>);

/// Writes `(a, b)`, with the trailing comma Python uses for one element tuples.
fn repr_items<'a, T: PyObject>(
    items: impl ExactSizeIterator<Item = &'a T>,
    heap: &Heap<impl ResourceTracker>,
) -> RunResult<String> {
    let single = items.len() == 1;
    let mut out = String::from("(");
    for (index, item) in items.enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&item.py_repr(heap)?);
    }
    if single {
        out.push(',');
    }
    out.push(')');
    Ok(out)
}

impl<T: PyObject> PyObject for Tuple<T> {
    fn type_name(&self) -> &'static str {
        "tuple"
    }

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        repr_items(self.0.iter(), heap)
    }

    fn unhashable_type(&self) -> Option<&'static str> {
        self.0.iter().find_map(PyObject::unhashable_type)
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        let hashes = self
            .0
            .iter()
            .map(|item| item.py_hash(heap))
            .collect::<RunResult<Vec<u64>>>()?;
        Ok(hash_tuple(hashes.into_iter()))
    }

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        if Rc::ptr_eq(&self.0, &other.0) {
            return Ok(true);
        }
        self.seq_eq(other, heap)
    }

    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        self.seq_cmp(other, heap)
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!self.0.is_empty())
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(self.0.len())
    }

    /// Copies the elements; immutable elements come back unchanged.
    fn py_deepcopy(&self, heap: &mut Heap<impl ResourceTracker>, memo: &mut DeepCopyMemo) -> RunResult<Self> {
        let mut items = Vec::with_capacity(self.0.len());
        for item in self.0.iter() {
            items.push(item.py_deepcopy(heap, memo)?);
        }
        Ok(items.into())
    }

    fn trace(&self, out: &mut Vec<HeapId>) {
        for item in self.0.iter() {
            item.trace(out);
        }
    }
}

/// Heterogeneous 2-tuple: a plain record without sequence capability.
///
/// Dict item views yield pairs, and translated code uses them wherever a tuple
/// mixes two element types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> Pair<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: PyObject, B: PyObject> PyObject for Pair<A, B> {
    fn type_name(&self) -> &'static str {
        "tuple"
    }

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(format!("({}, {})", self.first.py_repr(heap)?, self.second.py_repr(heap)?))
    }

    fn unhashable_type(&self) -> Option<&'static str> {
        self.first.unhashable_type().or_else(|| self.second.unhashable_type())
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        let hashes = [self.first.py_hash(heap)?, self.second.py_hash(heap)?];
        Ok(hash_tuple(hashes.into_iter()))
    }

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.first.py_eq(&other.first, heap)? && self.second.py_eq(&other.second, heap)?)
    }

    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        if !self.first.py_eq(&other.first, heap)? {
            return self.first.py_cmp(&other.first, heap);
        }
        self.second.py_cmp(&other.second, heap)
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(2)
    }

    fn py_copy(&self, _heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        Ok(self.clone())
    }

    fn py_deepcopy(&self, heap: &mut Heap<impl ResourceTracker>, memo: &mut DeepCopyMemo) -> RunResult<Self> {
        Ok(Self::new(
            self.first.py_deepcopy(heap, memo)?,
            self.second.py_deepcopy(heap, memo)?,
        ))
    }

    fn trace(&self, out: &mut Vec<HeapId>) {
        self.first.trace(out);
        self.second.trace(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{py_hash::as_signed, resource::NoLimitTracker, types::Str};

    #[test]
    fn repr_uses_trailing_comma_for_singletons() {
        let heap = Heap::new(NoLimitTracker);
        assert_eq!(Tuple::<i64>::empty().py_repr(&heap).unwrap(), "()");
        assert_eq!(Tuple::from([1_i64]).py_repr(&heap).unwrap(), "(1,)");
        assert_eq!(Tuple::from([1_i64, 2]).py_repr(&heap).unwrap(), "(1, 2)");
    }

    #[test]
    fn hash_matches_cpython() {
        let heap = Heap::new(NoLimitTracker);
        let tuple = Tuple::from([1_i64, 2]);
        assert_eq!(as_signed(tuple.py_hash(&heap).unwrap()), -3_550_055_125_485_641_917);
        let pair = Pair::new(1_i64, 2_i64);
        assert_eq!(pair.py_hash(&heap).unwrap(), tuple.py_hash(&heap).unwrap());
    }

    #[test]
    fn pair_orders_by_first_then_second() {
        let heap = Heap::new(NoLimitTracker);
        let a = Pair::new(1_i64, Str::from("b"));
        let b = Pair::new(1_i64, Str::from("a"));
        assert!(b.py_lt(&a, &heap).unwrap());
        assert_eq!(a.py_repr(&heap).unwrap(), "(1, 'b')");
    }

    #[test]
    fn index_and_slice() {
        let heap = Heap::new(NoLimitTracker);
        let tuple = Tuple::from([5_i64, 6, 7]);
        assert_eq!(tuple.get(-1, &heap).unwrap(), 7);
        assert_eq!(
            tuple.get(3, &heap).unwrap_err().to_string(),
            "IndexError: tuple index out of range"
        );
        let reversed = tuple.get_slice(SliceSpec::stepped(-1)).unwrap();
        assert_eq!(reversed.as_slice(), &[7, 6, 5]);
        let err = tuple.index(&9, None, None, &heap).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: tuple.index(x): x not in tuple");
    }
}
