//! Heap behaviour: deep copies of shared and cyclic graphs, mark-sweep
//! collection, and resource limits.
//!
//! `Node` stands in for a translated user class: a heap object with one
//! outgoing reference and identity semantics.

use pretty_assertions::assert_eq;
use pyrite::{
    DeepCopyMemo, ExcType, Heap, HeapId, HeapObject, LimitedTracker, List, NoLimitTracker, PyObject, Ref,
    ResourceLimits, ResourceTracker, RunResult, Set, Value, copy,
};

#[derive(Debug)]
struct Node {
    label: i64,
    next: Option<Ref<Node>>,
}

impl HeapObject for Node {
    const TYPE_NAME: &'static str = "Node";

    fn trace(&self, out: &mut Vec<HeapId>) {
        self.next.trace(out);
    }

    fn py_deepcopy(
        this: Ref<Self>,
        heap: &mut Heap<impl ResourceTracker>,
        memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        let label = heap.get(this).label;
        let copy = heap.allocate(Self { label, next: None })?;
        memo.insert(this, copy);
        let next = heap.get(this).next;
        let next_copy = next.py_deepcopy(heap, memo)?;
        heap.get_mut(copy).next = next_copy;
        Ok(copy)
    }
}

fn node(label: i64, heap: &mut Heap<impl ResourceTracker>) -> Ref<Node> {
    heap.allocate(Node { label, next: None }).unwrap()
}

// =============================================================================
// 1. Deep copy
// =============================================================================

/// An inner list referenced twice is copied once, and the copy keeps the sharing.
#[test]
fn deepcopy_preserves_sharing() {
    let mut heap = Heap::new(NoLimitTracker);
    let inner = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
    let outer = List::from_vec(vec![Value::List(inner), Value::List(inner)], &mut heap).unwrap();

    let copied = copy::deepcopy(&outer, &mut heap).unwrap();
    let items = copied.to_vec(&heap);
    let (Value::List(first), Value::List(second)) = (&items[0], &items[1]) else {
        panic!("expected two lists, got {items:?}");
    };
    assert!(first.is(*second));
    assert!(!first.is(inner));

    first.append(Value::Int(2), &mut heap).unwrap();
    assert_eq!(copied.py_repr(&heap).unwrap(), "[[1, 2], [1, 2]]");
    assert_eq!(outer.py_repr(&heap).unwrap(), "[[1], [1]]");
}

/// A two-node cycle copies into a new two-node cycle.
#[test]
fn deepcopy_of_cycle_terminates() {
    let mut heap = Heap::new(NoLimitTracker);
    let a = node(1, &mut heap);
    let b = node(2, &mut heap);
    heap.get_mut(a).next = Some(b);
    heap.get_mut(b).next = Some(a);

    let a_copy = copy::deepcopy(&a, &mut heap).unwrap();
    assert!(!a_copy.is(a));
    let b_copy = heap.get(a_copy).next.unwrap();
    assert!(!b_copy.is(b));
    assert_eq!(heap.get(b_copy).label, 2);
    assert!(heap.get(b_copy).next.unwrap().is(a_copy));
}

/// A list containing itself deep copies to a list containing the copy.
#[test]
fn deepcopy_of_self_containing_list() {
    let mut heap = Heap::new(NoLimitTracker);
    let list = List::from_vec(vec![Value::Int(0)], &mut heap).unwrap();
    list.append(Value::List(list), &mut heap).unwrap();

    let copied = copy::deepcopy(&list, &mut heap).unwrap();
    let Value::List(nested) = copied.get(1, &heap).unwrap() else {
        panic!("expected a list");
    };
    assert!(nested.is(copied));
    assert_eq!(copied.py_repr(&heap).unwrap(), "[0, [...]]");
}

/// Heap objects without a custom deepcopy hand back the same reference.
#[test]
fn default_heap_object_semantics() {
    let mut heap = Heap::new(NoLimitTracker);
    let a = node(1, &mut heap);
    let b = node(1, &mut heap);
    assert_eq!(a.py_repr(&heap).unwrap(), "<Node instance>");
    assert!(a.py_eq(&a, &heap).unwrap());
    assert!(!a.py_eq(&b, &heap).unwrap());
    assert!(a.py_lt(&b, &heap).unwrap());
    assert!(copy::copy(&a, &mut heap).unwrap().is(a));

    let set = Set::from_vec(vec![a, b, a], &mut heap).unwrap();
    assert_eq!(set.len(&heap), 2);
}

// =============================================================================
// 2. Collection
// =============================================================================

/// Unreachable cycles are reclaimed; everything reachable from a root survives.
#[test]
fn collect_garbage_frees_unreachable_cycles() {
    let mut heap = Heap::new(NoLimitTracker);
    let kept = List::from_vec(Vec::new(), &mut heap).unwrap();
    let child = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
    kept.append(Value::List(child), &mut heap).unwrap();

    let a = node(1, &mut heap);
    let b = node(2, &mut heap);
    heap.get_mut(a).next = Some(b);
    heap.get_mut(b).next = Some(a);

    assert_eq!(heap.heap_stats().live_objects, 4);
    let freed = heap.collect_garbage([kept.id()]);
    assert_eq!(freed, 2);
    assert!(heap.is_live(child.id()));
    assert!(!heap.is_live(a.id()));

    let stats = heap.heap_stats();
    assert_eq!(stats.live_objects, 2);
    assert_eq!(stats.free_slots, 2);
    assert_eq!(stats.objects_by_type.get("list"), Some(&2));

    // freed slots are reused before the arena grows
    let reused = node(3, &mut heap);
    assert_eq!(heap.heap_stats().total_slots, 4);
    assert!(heap.is_live(reused.id()));
}

/// `should_gc` follows the tracker's interval and resets after a collection.
#[test]
fn gc_interval_schedules_collection() {
    let limits = ResourceLimits::new().gc_interval(2);
    let mut heap = Heap::new(LimitedTracker::new(limits));
    node(1, &mut heap);
    assert!(!heap.should_gc());
    node(2, &mut heap);
    assert!(heap.should_gc());
    heap.collect_garbage([]);
    assert!(!heap.should_gc());
}

// =============================================================================
// 3. Limits
// =============================================================================

/// Exceeding the allocation budget raises an uncatchable MemoryError.
#[test]
fn allocation_limit_raises_memory_error() {
    let limits = ResourceLimits::new().max_allocations(2);
    let mut heap = Heap::new(LimitedTracker::new(limits));
    let list = List::<i64>::from_vec(Vec::new(), &mut heap).unwrap();
    list.append(1, &mut heap).unwrap();
    let err = list.append(2, &mut heap).unwrap_err();
    let exc = err.exception().unwrap();
    assert_eq!(exc.exc_type(), ExcType::MemoryError);
    assert!(!err.matches(ExcType::Exception));
    assert_eq!(list.len(&heap), 1);
}

/// Limits load from host JSON.
#[test]
fn limits_deserialize_from_json() {
    let limits: ResourceLimits = serde_json::from_str(r#"{"max_memory": 1024, "gc_interval": 10}"#).unwrap();
    assert_eq!(limits.max_memory, Some(1024));
    assert_eq!(limits.max_allocations, None);
    assert_eq!(limits.gc_interval, Some(10));
}

/// Deeply nested data fails with RecursionError instead of overflowing the stack.
#[test]
fn nested_repr_hits_data_depth_limit() {
    let mut heap = Heap::new(NoLimitTracker);
    let mut current = List::from_vec(Vec::new(), &mut heap).unwrap();
    for _ in 0..pyrite::MAX_DATA_RECURSION_DEPTH {
        current = List::from_vec(vec![Value::List(current)], &mut heap).unwrap();
    }
    let err = current.py_repr(&heap).unwrap_err();
    assert!(err.is_exception_type(ExcType::RecursionError));
}

/// A configured recursion limit below the built-in guard takes effect.
#[test]
fn configured_recursion_limit_bounds_nesting() {
    let limits = ResourceLimits::new().max_recursion_depth(Some(10));
    let mut heap = Heap::new(LimitedTracker::new(limits));
    let mut current = List::from_vec(Vec::new(), &mut heap).unwrap();
    for _ in 0..5 {
        current = List::from_vec(vec![Value::List(current)], &mut heap).unwrap();
    }
    assert_eq!(current.py_repr(&heap).unwrap(), "[[[[[[]]]]]]");

    for _ in 0..10 {
        current = List::from_vec(vec![Value::List(current)], &mut heap).unwrap();
    }
    let err = current.py_repr(&heap).unwrap_err();
    assert!(err.is_exception_type(ExcType::RecursionError));
    assert_eq!(err.to_string(), "RecursionError: maximum recursion depth exceeded");

    let copy = copy::deepcopy(&current, &mut heap).unwrap_err();
    assert!(copy.is_exception_type(ExcType::RecursionError));
}
