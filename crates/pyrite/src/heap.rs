use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use ahash::AHashSet;

use crate::{
    exception::{ExcType, RunResult},
    object::HeapObject,
    resource::{MAX_DATA_RECURSION_DEPTH, ResourceTracker},
};

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Typed handle to a collector-owned object of type `D`.
///
/// Copying a `Ref` copies the reference, never the object: two handles with the
/// same id are the same Python object (`a is b`).
pub struct Ref<D> {
    id: HeapId,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Ref<D> {
    #[inline]
    pub(crate) fn from_id(id: HeapId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(self) -> HeapId {
        self.id
    }

    /// Identity comparison, Python's `is`.
    #[inline]
    #[must_use]
    pub fn is(self, other: Self) -> bool {
        self.id == other.id
    }
}

impl<D> Clone for Ref<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Ref<D> {}

impl<D> PartialEq for Ref<D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<D> Eq for Ref<D> {}

impl<D> Hash for Ref<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<D> fmt::Debug for Ref<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.id.0)
    }
}

/// Object-safe view of a heap payload, used by the arena for storage and tracing.
///
/// Implemented for every [`HeapObject`]; nothing else needs to implement it.
pub trait HeapData: Any + fmt::Debug {
    fn type_name(&self) -> &'static str;
    /// Pushes the ids of every heap object directly referenced by this one.
    fn trace_children(&self, out: &mut Vec<HeapId>);
    fn estimate_size(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<D: HeapObject> HeapData for D {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn trace_children(&self, out: &mut Vec<HeapId>) {
        HeapObject::trace(self, out);
    }

    fn estimate_size(&self) -> usize {
        HeapObject::estimate_size(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_type` map uses `BTreeMap` for deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by Python type name.
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Resource tracker allocation count, if the tracker records it.
    pub tracker_allocations: Option<usize>,
    /// Resource tracker memory usage in bytes, if the tracker records it.
    pub tracker_memory_bytes: Option<usize>,
}

/// Arena that owns every collector-managed object.
///
/// Objects are allocated and never freed explicitly; [`Heap::collect_garbage`]
/// reclaims everything unreachable from the supplied roots, cycles included.
/// Freed slots go on a free list and are reused by later allocations.
///
/// Generic over `T: ResourceTracker` to support different resource tracking strategies.
/// When `T = NoLimitTracker` (the default), all resource checks compile away to no-ops.
#[derive(Debug)]
pub struct Heap<T: ResourceTracker> {
    entries: Vec<Option<Box<dyn HeapData>>>,
    /// IDs of freed slots available for reuse. Populated by collection, consumed by `allocate`.
    free_list: Vec<HeapId>,
    /// Resource tracker for enforcing limits and scheduling GC.
    tracker: T,
    /// Number of allocations since the last collection.
    allocations_since_gc: usize,
    /// Remaining depth for data structure operations (repr, eq, hash, deepcopy).
    ///
    /// Uses `Cell` so traversals holding `&Heap` can track depth.
    data_depth_remaining: Cell<u16>,
    /// Containers whose repr is currently being produced, to print `[...]` for cycles.
    repr_active: RefCell<AHashSet<HeapId>>,
}

impl<T: ResourceTracker + Default> Default for Heap<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ResourceTracker> Heap<T> {
    #[must_use]
    pub fn new(tracker: T) -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            tracker,
            allocations_since_gc: 0,
            data_depth_remaining: Cell::new(MAX_DATA_RECURSION_DEPTH),
            repr_active: RefCell::new(AHashSet::new()),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    /// Allocates a new object, returning a typed handle to it.
    ///
    /// Returns an error if allocation would exceed configured limits.
    pub fn allocate<D: HeapObject>(&mut self, data: D) -> RunResult<Ref<D>> {
        self.tracker.on_allocate(|| HeapObject::estimate_size(&data))?;
        self.allocations_since_gc = self.allocations_since_gc.wrapping_add(1);

        let boxed: Box<dyn HeapData> = Box::new(data);
        let id = if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(boxed);
            id
        } else {
            self.entries.push(Some(boxed));
            HeapId(self.entries.len() - 1)
        };
        Ok(Ref::from_id(id))
    }

    /// Returns a reference to the object behind `handle`.
    ///
    /// # Panics
    /// Panics if the object has already been collected, which means the caller
    /// dropped it from the root set while still holding the handle.
    #[must_use]
    pub fn get<D: HeapObject>(&self, handle: Ref<D>) -> &D {
        self.entries
            .get(handle.id.index())
            .expect("Heap::get: slot missing")
            .as_deref()
            .expect("Heap::get: object already freed")
            .as_any()
            .downcast_ref()
            .expect("Heap::get: slot reused by another type")
    }

    /// Returns a mutable reference to the object behind `handle`.
    ///
    /// # Panics
    /// Panics if the object has already been collected.
    pub fn get_mut<D: HeapObject>(&mut self, handle: Ref<D>) -> &mut D {
        self.entries
            .get_mut(handle.id.index())
            .expect("Heap::get_mut: slot missing")
            .as_deref_mut()
            .expect("Heap::get_mut: object already freed")
            .as_any_mut()
            .downcast_mut()
            .expect("Heap::get_mut: slot reused by another type")
    }

    /// Returns true if `id` names a live object.
    #[must_use]
    pub fn is_live(&self, id: HeapId) -> bool {
        matches!(self.entries.get(id.index()), Some(Some(_)))
    }

    /// Returns the Python type name of a live object.
    #[must_use]
    pub fn type_name_of(&self, id: HeapId) -> Option<&'static str> {
        self.entries.get(id.index())?.as_deref().map(|data| data.type_name())
    }

    /// Charges one container insertion against the allocation budget.
    pub fn note_container_insert(&mut self) -> RunResult<()> {
        self.tracker.on_container_insert()?;
        Ok(())
    }

    /// Rejects results that would blow the memory limit before they are built.
    pub fn check_large_result(&self, estimated_bytes: usize) -> RunResult<()> {
        if estimated_bytes > crate::resource::LARGE_RESULT_THRESHOLD {
            self.tracker.check_large_result(estimated_bytes)?;
        }
        Ok(())
    }

    /// Enters one level of nested data traversal (repr, eq, cmp, hash, deepcopy).
    ///
    /// On success the caller must call [`Heap::data_depth_exit`] on every return path.
    /// Fails with RecursionError once `MAX_DATA_RECURSION_DEPTH` levels are active, or
    /// earlier when the tracker's configured recursion limit is lower.
    #[inline]
    pub fn data_depth_enter(&self) -> RunResult<()> {
        let remaining = self.data_depth_remaining.get();
        if remaining == 0 {
            return Err(ExcType::recursion_error());
        }
        self.tracker.check_recursion_depth(usize::from(MAX_DATA_RECURSION_DEPTH - remaining))?;
        self.data_depth_remaining.set(remaining - 1);
        Ok(())
    }

    /// Exits one level of nested data traversal.
    #[inline]
    pub fn data_depth_exit(&self) {
        self.data_depth_remaining.set(self.data_depth_remaining.get() + 1);
    }

    /// Runs `f` to produce the repr of container `id`, or returns `placeholder`
    /// when that container's repr is already in progress further up the stack.
    pub fn repr_guarded(
        &self,
        id: HeapId,
        placeholder: &str,
        f: impl FnOnce() -> RunResult<String>,
    ) -> RunResult<String> {
        if !self.repr_active.borrow_mut().insert(id) {
            return Ok(placeholder.to_owned());
        }
        let result = f();
        self.repr_active.borrow_mut().remove(&id);
        result
    }

    /// Returns whether garbage collection should run.
    #[inline]
    #[must_use]
    pub fn should_gc(&self) -> bool {
        self.allocations_since_gc >= self.tracker.gc_interval()
    }

    /// Runs mark-sweep garbage collection, freeing everything unreachable from `roots`.
    ///
    /// Handles held only in Rust locals are not roots: the caller passes every
    /// object it still intends to use. Returns the number of objects freed.
    pub fn collect_garbage(&mut self, roots: impl IntoIterator<Item = HeapId>) -> usize {
        let mut reachable: Vec<bool> = vec![false; self.entries.len()];
        let mut work_list: Vec<HeapId> = roots.into_iter().collect();

        while let Some(id) = work_list.pop() {
            let idx = id.index();
            if idx >= reachable.len() || reachable[idx] {
                continue;
            }
            reachable[idx] = true;
            if let Some(Some(data)) = self.entries.get(idx) {
                data.trace_children(&mut work_list);
            }
        }

        let mut freed = 0;
        for (idx, slot) in self.entries.iter_mut().enumerate() {
            if reachable[idx] {
                continue;
            }
            if let Some(data) = slot.take() {
                self.tracker.on_free(|| data.estimate_size());
                self.free_list.push(HeapId(idx));
                freed += 1;
            }
        }

        self.allocations_since_gc = 0;
        tracing::debug!(freed, live = self.entries.len() - self.free_list.len(), "heap collection finished");
        freed
    }

    /// Returns a snapshot of the current heap state.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        let mut live_objects = 0;
        let mut objects_by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
        for data in self.entries.iter().flatten() {
            live_objects += 1;
            *objects_by_type.entry(data.type_name()).or_insert(0) += 1;
        }

        HeapStats {
            live_objects,
            free_slots: self.entries.len() - live_objects,
            total_slots: self.entries.len(),
            objects_by_type,
            tracker_allocations: self.tracker.allocation_count(),
            tracker_memory_bytes: self.tracker.current_memory_bytes(),
        }
    }
}
