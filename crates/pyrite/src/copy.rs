//! `copy.copy` and `copy.deepcopy`.
//!
//! Value types come back unchanged; heap containers are duplicated. A deep copy
//! runs with one [`DeepCopyMemo`] for the whole call tree, so an object reachable
//! along several paths is copied once and cycles terminate.

use crate::{
    exception::RunResult,
    heap::Heap,
    object::{DeepCopyMemo, PyObject},
    resource::ResourceTracker,
};

/// `copy.copy(value)`: a new outer container sharing its elements.
pub fn copy<T: PyObject>(value: &T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<T> {
    value.py_copy(heap)
}

/// `copy.deepcopy(value)` with a fresh memo.
pub fn deepcopy<T: PyObject>(value: &T, heap: &mut Heap<impl ResourceTracker>) -> RunResult<T> {
    let mut memo = DeepCopyMemo::new();
    let copy = value.py_deepcopy(heap, &mut memo)?;
    tracing::trace!(copied = memo.len(), "deepcopy finished");
    Ok(copy)
}

/// `copy.deepcopy(value, memo)`, sharing a memo across several top-level calls.
pub fn deepcopy_with_memo<T: PyObject>(
    value: &T,
    heap: &mut Heap<impl ResourceTracker>,
    memo: &mut DeepCopyMemo,
) -> RunResult<T> {
    value.py_deepcopy(heap, memo)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{resource::NoLimitTracker, types::List, value::Value};

    #[test]
    fn shallow_copy_shares_elements() {
        let mut heap = Heap::new(NoLimitTracker);
        let inner = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
        let outer = List::from_vec(vec![Value::List(inner)], &mut heap).unwrap();
        let copied = copy(&outer, &mut heap).unwrap();
        assert!(!copied.is(outer));
        inner.append(Value::Int(2), &mut heap).unwrap();
        assert_eq!(copied.py_repr(&heap).unwrap(), "[[1, 2]]");
    }

    #[test]
    fn shared_memo_keeps_identity_across_calls() {
        let mut heap = Heap::new(NoLimitTracker);
        let shared = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
        let mut memo = DeepCopyMemo::new();
        let first = deepcopy_with_memo(&shared, &mut heap, &mut memo).unwrap();
        let second = deepcopy_with_memo(&shared, &mut heap, &mut memo).unwrap();
        assert!(first.is(second));
        assert!(!first.is(shared));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn value_types_copy_to_themselves() {
        let mut heap = Heap::new(NoLimitTracker);
        assert_eq!(deepcopy(&42_i64, &mut heap).unwrap(), 42);
        let text = Value::from("x");
        assert!(deepcopy(&text, &mut heap).unwrap().py_eq(&text, &heap).unwrap());
    }
}
