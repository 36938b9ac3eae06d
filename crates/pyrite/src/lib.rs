//! Builtin object and container runtime for code translated from Python.
//!
//! The translator emits Rust that manipulates values through this crate:
//! `list`, `tuple`, `dict`, `set`, `str`, `bytes`, `bytearray` and `range` with
//! Python's observable semantics, deterministic CPython-compatible hashing,
//! slicing, the `for_in` iteration protocol, copy/deepcopy and the builtin
//! exception hierarchy.
//!
//! Mutable containers live in a [`Heap`] arena and are addressed by typed [`Ref`]
//! handles. Reference cycles are legal; unreachable objects are reclaimed by
//! [`Heap::collect_garbage`] given the caller's roots.
//!
//! ```
//! use pyrite::{Heap, List, NoLimitTracker, PyObject};
//!
//! let mut heap = Heap::new(NoLimitTracker);
//! let list = List::from_vec(vec![3_i64, 1, 2], &mut heap).unwrap();
//! list.sort(false, &mut heap).unwrap();
//! assert_eq!(list.py_repr(&heap).unwrap(), "[1, 2, 3]");
//! assert_eq!(list.get(-1, &heap).unwrap(), 3);
//! ```

mod heap;

pub mod bridge;
pub mod copy;
mod exception;
pub mod iter;
mod object;
pub mod py_hash;
mod resource;
pub mod sequence;
pub mod slice;
pub mod sys;
pub mod types;
mod value;

pub use crate::{
    bridge::{ConversionError, ForeignConvert, Object},
    exception::{ExcArg, ExcType, RunError, RunResult, SimpleException, py_assert},
    heap::{Heap, HeapId, HeapStats, Ref},
    iter::{ForIn, PyIter},
    object::{DeepCopyMemo, HeapObject, PyObject, dict_key_hash, float_repr, set_element_hash},
    resource::{
        DEFAULT_MAX_RECURSION_DEPTH, LimitedTracker, MAX_DATA_RECURSION_DEPTH, NoLimitTracker, ResourceError,
        ResourceLimits, ResourceTracker,
    },
    sequence::Sequence,
    slice::{SliceIndices, SliceSpec},
    sys::RuntimeContext,
    types::{
        ByteArray, ByteSequence, ByteSequenceMut, Bytes, Dict, DictItems, DictKeys, DictValues, List, Pair, Range, Set,
        Str, Tuple,
    },
    value::Value,
};
