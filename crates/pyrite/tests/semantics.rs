//! Observable builtin semantics, checked through the public API.
//!
//! Each section mirrors one behaviour translated programs rely on: index
//! wraparound, copy independence, dict lookups, sort stability, slicing,
//! string predicates and iterator exhaustion.

use pretty_assertions::assert_eq;
use pyrite::{
    Dict, ExcType, ForIn, Heap, List, NoLimitTracker, Pair, PyIter, PyObject, Range, Set, SliceSpec, Str, Tuple, Value,
    copy, iter::collect_vec,
};

// =============================================================================
// 1. Index wraparound
// =============================================================================

/// `[10, 20, 30][-1]` is 30, `[-3]` is the first item and `[-4]` raises.
#[test]
fn negative_indices_wrap_once() {
    let mut heap = Heap::new(NoLimitTracker);
    let list = List::from_vec(vec![10_i64, 20, 30], &mut heap).unwrap();
    assert_eq!(list.get(-1, &heap).unwrap(), 30);
    assert_eq!(list.get(-3, &heap).unwrap(), 10);
    let err = list.get(-4, &heap).unwrap_err();
    assert!(err.is_exception_type(ExcType::IndexError));
    assert_eq!(err.to_string(), "IndexError: list index out of range");

    let text = Str::from("abc");
    assert_eq!(text.get(-1).unwrap(), "c");
    assert_eq!(text.get(3).unwrap_err().to_string(), "IndexError: string index out of range");
}

// =============================================================================
// 2. Copies are independent
// =============================================================================

/// Mutating a shallow copy leaves the original untouched.
#[test]
fn list_copy_is_independent() {
    let mut heap = Heap::new(NoLimitTracker);
    let original = List::from_vec(vec![1_i64, 2, 3], &mut heap).unwrap();
    let copied = copy::copy(&original, &mut heap).unwrap();
    copied.append(4, &mut heap).unwrap();
    copied.set(0, 99, &mut heap).unwrap();
    assert_eq!(original.to_vec(&heap), vec![1, 2, 3]);
    assert_eq!(copied.to_vec(&heap), vec![99, 2, 3, 4]);
    assert!(original.py_ne(&copied, &heap).unwrap());
}

// =============================================================================
// 3. Dict lookups and hash consistency
// =============================================================================

/// Present keys are found, missing keys raise `KeyError` with the key repr, and
/// keys equal across the numeric tower find the same entry.
#[test]
fn dict_get_and_key_error() {
    let mut heap = Heap::new(NoLimitTracker);
    let dict: pyrite::Ref<Dict<Value, Value>> = Dict::from_vec(
        vec![(Value::from("a"), Value::Int(1)), (Value::Int(2), Value::from("two"))],
        &mut heap,
    )
    .unwrap();
    assert_eq!(dict.get(&Value::from("a"), &heap).unwrap().py_repr(&heap).unwrap(), "1");
    // 2.0 == 2 and hash(2.0) == hash(2)
    let found = dict.get(&Value::Float(2.0), &heap).unwrap();
    assert_eq!(found.py_repr(&heap).unwrap(), "'two'");

    let err = dict.get(&Value::from("z"), &heap).unwrap_err();
    assert!(err.is_exception_type(ExcType::KeyError));
    assert_eq!(err.to_string(), "KeyError: 'z'");

    dict.set(Value::Bool(true), Value::None, &mut heap).unwrap();
    dict.set(Value::Int(1), Value::Int(7), &mut heap).unwrap();
    assert_eq!(dict.len(&heap), 3);
    assert_eq!(dict.py_repr(&heap).unwrap(), "{'a': 1, 2: 'two', True: 7}");
}

/// Unhashable keys are rejected before the table is touched.
#[test]
fn dict_rejects_unhashable_keys() {
    let mut heap = Heap::new(NoLimitTracker);
    let dict = Dict::<Value, Value>::from_vec(Vec::new(), &mut heap).unwrap();
    let key = Value::List(List::from_vec(Vec::new(), &mut heap).unwrap());
    let err = dict.set(key, Value::None, &mut heap).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: cannot use 'list' as a dict key (unhashable type: 'list')"
    );
    assert!(dict.is_empty(&heap));
}

// =============================================================================
// 4. Sort stability
// =============================================================================

/// Sorting `[(1, "b"), (1, "a")]` by the first field keeps input order for ties,
/// while a full comparison orders by the second field.
#[test]
fn sort_is_stable() {
    let mut heap = Heap::new(NoLimitTracker);
    let pairs = vec![Pair::new(1_i64, Str::from("b")), Pair::new(1_i64, Str::from("a"))];
    let list = List::from_vec(pairs, &mut heap).unwrap();

    list.sort_by_key(|pair, _| Ok(pair.first), false, &mut heap).unwrap();
    assert_eq!(list.py_repr(&heap).unwrap(), "[(1, 'b'), (1, 'a')]");

    list.sort_by_key(|pair, _| Ok(pair.first), true, &mut heap).unwrap();
    assert_eq!(list.py_repr(&heap).unwrap(), "[(1, 'b'), (1, 'a')]");

    list.sort(false, &mut heap).unwrap();
    assert_eq!(list.py_repr(&heap).unwrap(), "[(1, 'a'), (1, 'b')]");
}

/// Comparing a str with an int while sorting raises TypeError.
#[test]
fn sort_of_mixed_types_raises() {
    let mut heap = Heap::new(NoLimitTracker);
    let list = List::from_vec(vec![Value::Int(1), Value::from("x")], &mut heap).unwrap();
    let err = list.sort(false, &mut heap).unwrap_err();
    assert!(err.is_exception_type(ExcType::TypeError));
    assert_eq!(list.len(&heap), 2);
}

// =============================================================================
// 5. Slicing
// =============================================================================

#[test]
fn slicing() {
    let mut heap = Heap::new(NoLimitTracker);
    let hello = Str::from("hello");
    assert_eq!(hello.get_slice(SliceSpec::range(Some(1), Some(-1))).unwrap(), "ell");
    assert_eq!(hello.get_slice(SliceSpec::stepped(-1)).unwrap(), "olleh");

    let evens = Range::to(5).get_slice(SliceSpec::stepped(2)).unwrap();
    assert_eq!(collect_vec(&evens, &heap).unwrap(), vec![0, 2, 4]);

    let list = List::from_vec(vec![1_i64, 2, 3, 4], &mut heap).unwrap();
    let tail = list.get_slice(SliceSpec::range(Some(-2), None), &mut heap).unwrap();
    assert_eq!(tail.to_vec(&heap), vec![3, 4]);
    let out_of_range = list.get_slice(SliceSpec::range(Some(10), Some(20)), &mut heap).unwrap();
    assert!(out_of_range.is_empty(&heap));

    let err = hello.get_slice(SliceSpec::stepped(0)).unwrap_err();
    assert_eq!(err.to_string(), "ValueError: slice step cannot be zero");
}

/// `list("abc")`, `set("abca")`, `tuple(range(3))` and `dict(pairs)` build from
/// any iterable source.
#[test]
fn construction_from_iterables() {
    let mut heap = Heap::new(NoLimitTracker);
    let chars = List::from_for_in(&Str::from("abc"), &mut heap).unwrap();
    assert_eq!(chars.py_repr(&heap).unwrap(), "['a', 'b', 'c']");

    let unique = Set::from_for_in(&Str::from("abca"), &mut heap).unwrap();
    assert_eq!(unique.len(&heap), 3);

    let numbers = Tuple::from_for_in(&Range::to(3), &heap).unwrap();
    assert_eq!(numbers.py_repr(&heap).unwrap(), "(0, 1, 2)");

    let pairs = vec![Pair::new(Str::from("a"), 1_i64), Pair::new(Str::from("a"), 2)];
    let pairs = List::from_vec(pairs, &mut heap).unwrap();
    let dict = Dict::from_for_in(&pairs, &mut heap).unwrap();
    assert_eq!(dict.py_repr(&heap).unwrap(), "{'a': 2}");
}

// =============================================================================
// 6. String predicates on empty input
// =============================================================================

#[test]
fn empty_string_predicates() {
    let empty = Str::from("");
    assert!(!empty.isalpha());
    assert!(!empty.isdigit());
    assert!(!empty.isspace());
    assert!(!empty.isupper());
    assert!(!empty.islower());
    assert!(!empty.istitle());
    assert!(!empty.isalnum());
    assert!(empty.isascii());
}

// =============================================================================
// 7. Iteration
// =============================================================================

/// An iterator over `[]` reports exhaustion on the first step and then raises
/// StopIteration only from the explicit `next`.
#[test]
fn empty_list_iterator_exhausts_immediately() {
    let mut heap = Heap::new(NoLimitTracker);
    let list = List::<i64>::from_vec(Vec::new(), &mut heap).unwrap();
    let cursor = list.for_in_init(&heap).unwrap();
    assert!(!list.for_in_has_next(&cursor, &heap).unwrap());

    let mut iter = PyIter::new(list, &heap).unwrap();
    assert_eq!(iter.get_next(&heap).unwrap(), None);
    assert!(iter.is_exhausted());
    assert!(iter.next(&heap).unwrap_err().is_stop_iteration());
}

/// Appending during a list walk is observed, since the cursor checks the
/// current length.
#[test]
fn list_iteration_sees_appends() {
    let mut heap = Heap::new(NoLimitTracker);
    let list = List::from_vec(vec![1_i64], &mut heap).unwrap();
    let mut iter = PyIter::new(list, &heap).unwrap();
    assert_eq!(iter.next(&heap).unwrap(), 1);
    list.append(2, &mut heap).unwrap();
    assert_eq!(iter.next(&heap).unwrap(), 2);
    assert_eq!(iter.last(), Some(&2));
    assert_eq!(iter.get_next(&heap).unwrap(), None);
}

/// Adding a key while walking a dict raises RuntimeError.
#[test]
fn dict_mutation_during_iteration() {
    let mut heap = Heap::new(NoLimitTracker);
    let dict = Dict::from_vec(vec![(1_i64, 1_i64), (2, 2)], &mut heap).unwrap();
    let mut iter = PyIter::new(dict.keys(), &heap).unwrap();
    assert_eq!(iter.next(&heap).unwrap(), 1);
    dict.set(3, 3, &mut heap).unwrap();
    let err = iter.next(&heap).unwrap_err();
    assert_eq!(err.to_string(), "RuntimeError: dictionary changed size during iteration");
}
