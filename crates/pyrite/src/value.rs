//! The closed element type for heterogeneous containers.
//!
//! Statically typed code uses concrete element types (`List<i64>`, `Dict<Str, f64>`);
//! where a container mixes types, its elements are [`Value`]s. `Value` dispatches
//! each operation to the variant and adds the cross-type rules Python defines:
//! `bool`, `int` and `float` compare and hash as one numeric tower, `bytes`
//! compares with `bytearray` by content, and any other pair of types is unequal
//! and unorderable.

use std::cmp::Ordering;

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId, Ref},
    object::{DeepCopyMemo, PyObject},
    resource::ResourceTracker,
    types::{ByteArray, ByteSequence, Bytes, Dict, List, Range, Set, Str, Tuple},
};

/// A runtime value of any builtin type.
///
/// Immutable types are held inline; mutable containers are heap handles, so
/// cloning a `Value` aliases the container exactly as Python assignment does.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Str),
    Bytes(Bytes),
    Range(Range),
    Tuple(Tuple<Value>),
    List(Ref<List<Value>>),
    Dict(Ref<Dict<Value, Value>>),
    Set(Ref<Set<Value>>),
    ByteArray(Ref<ByteArray>),
}

/// A numeric operand after bool promotion.
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Value {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The value as a number, with `True`/`False` promoted to `1`/`0`.
    fn as_number(&self) -> Option<Number> {
        match self {
            Self::Bool(b) => Some(Number::Int(i64::from(*b))),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn byte_content<'a>(&'a self, heap: &'a Heap<impl ResourceTracker>) -> Option<&'a [u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes.as_bytes()),
            Self::ByteArray(array) => Some(heap.get(*array).as_bytes()),
            _ => None,
        }
    }

    /// Numeric comparison, `None` inside when either side is NaN.
    fn numeric_cmp(&self, other: &Self) -> Option<Option<Ordering>> {
        let (a, b) = (self.as_number()?, other.as_number()?);
        Some(match (a, b) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
            (Number::Int(a), Number::Float(b)) => int_float_cmp(a, b),
            (Number::Float(a), Number::Int(b)) => int_float_cmp(b, a).map(Ordering::reverse),
        })
    }

    fn unorderable(&self, other: &Self) -> RunResult<Ordering> {
        Err(ExcType::type_error_unorderable("<", self.type_name(), other.type_name()))
    }
}

/// Exact comparison of an int with a float, without rounding the int.
fn int_float_cmp(int: i64, float: f64) -> Option<Ordering> {
    // 2^63 is exactly representable, i64::MAX is not
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return None;
    }
    if float >= BOUND {
        return Some(Ordering::Less);
    }
    if float < -BOUND {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
    let whole_int = whole as i64;
    Some(int.cmp(&whole_int).then_with(|| {
        let fraction = float - whole;
        0.0_f64.partial_cmp(&fraction).unwrap_or(Ordering::Equal)
    }))
}

impl PyObject for Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(b) => b.type_name(),
            Self::Int(i) => i.type_name(),
            Self::Float(f) => f.type_name(),
            Self::Str(s) => s.type_name(),
            Self::Bytes(b) => b.type_name(),
            Self::Range(r) => r.type_name(),
            Self::Tuple(t) => t.type_name(),
            Self::List(l) => l.type_name(),
            Self::Dict(d) => d.type_name(),
            Self::Set(s) => s.type_name(),
            Self::ByteArray(b) => b.type_name(),
        }
    }

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        match self {
            Self::None => Ok("None".to_owned()),
            Self::Bool(b) => b.py_repr(heap),
            Self::Int(i) => i.py_repr(heap),
            Self::Float(f) => f.py_repr(heap),
            Self::Str(s) => s.py_repr(heap),
            Self::Bytes(b) => b.py_repr(heap),
            Self::Range(r) => r.py_repr(heap),
            Self::Tuple(t) => t.py_repr(heap),
            Self::List(l) => l.py_repr(heap),
            Self::Dict(d) => d.py_repr(heap),
            Self::Set(s) => s.py_repr(heap),
            Self::ByteArray(b) => b.py_repr(heap),
        }
    }

    fn py_str(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        match self {
            Self::Str(s) => s.py_str(heap),
            _ => self.py_repr(heap),
        }
    }

    fn unhashable_type(&self) -> Option<&'static str> {
        match self {
            Self::Tuple(t) => t.unhashable_type(),
            Self::List(l) => l.unhashable_type(),
            Self::Dict(d) => d.unhashable_type(),
            Self::Set(s) => s.unhashable_type(),
            Self::ByteArray(b) => b.unhashable_type(),
            _ => None,
        }
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        match self {
            Self::None => Option::<i64>::None.py_hash(heap),
            Self::Bool(b) => b.py_hash(heap),
            Self::Int(i) => i.py_hash(heap),
            Self::Float(f) => f.py_hash(heap),
            Self::Str(s) => s.py_hash(heap),
            Self::Bytes(b) => b.py_hash(heap),
            Self::Range(r) => r.py_hash(heap),
            Self::Tuple(t) => t.py_hash(heap),
            Self::List(l) => l.py_hash(heap),
            Self::Dict(d) => d.py_hash(heap),
            Self::Set(s) => s.py_hash(heap),
            Self::ByteArray(b) => b.py_hash(heap),
        }
    }

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        if let Some(ordering) = self.numeric_cmp(other) {
            return Ok(ordering == Some(Ordering::Equal));
        }
        if let (Some(a), Some(b)) = (self.byte_content(heap), other.byte_content(heap)) {
            return Ok(a == b);
        }
        match (self, other) {
            (Self::None, Self::None) => Ok(true),
            (Self::Str(a), Self::Str(b)) => a.py_eq(b, heap),
            (Self::Range(a), Self::Range(b)) => a.py_eq(b, heap),
            (Self::Tuple(a), Self::Tuple(b)) => a.py_eq(b, heap),
            (Self::List(a), Self::List(b)) => a.py_eq(b, heap),
            (Self::Dict(a), Self::Dict(b)) => a.py_eq(b, heap),
            (Self::Set(a), Self::Set(b)) => a.py_eq(b, heap),
            _ => Ok(false),
        }
    }

    /// Orders numbers across the tower and same-typed containers; a NaN operand
    /// compares as equal here, the predicates below keep IEEE semantics.
    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        if let Some(ordering) = self.numeric_cmp(other) {
            return Ok(ordering.unwrap_or(Ordering::Equal));
        }
        if let (Some(a), Some(b)) = (self.byte_content(heap), other.byte_content(heap)) {
            return Ok(a.cmp(b));
        }
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a.py_cmp(b, heap),
            (Self::Tuple(a), Self::Tuple(b)) => a.py_cmp(b, heap),
            (Self::List(a), Self::List(b)) => a.py_cmp(b, heap),
            (Self::Dict(a), Self::Dict(b)) => a.py_cmp(b, heap),
            (Self::Set(a), Self::Set(b)) => a.py_cmp(b, heap),
            _ => self.unorderable(other),
        }
    }

    fn py_lt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match (self.numeric_cmp(other), self, other) {
            (Some(ordering), ..) => Ok(ordering.is_some_and(Ordering::is_lt)),
            (None, Self::Dict(a), Self::Dict(b)) => a.py_lt(b, heap),
            (None, Self::Set(a), Self::Set(b)) => a.py_lt(b, heap),
            _ => Ok(self.py_cmp(other, heap)?.is_lt()),
        }
    }

    fn py_le(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match (self.numeric_cmp(other), self, other) {
            (Some(ordering), ..) => Ok(ordering.is_some_and(Ordering::is_le)),
            (None, Self::Dict(a), Self::Dict(b)) => a.py_le(b, heap),
            (None, Self::Set(a), Self::Set(b)) => a.py_le(b, heap),
            _ => Ok(self.py_cmp(other, heap)?.is_le()),
        }
    }

    fn py_gt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match (self.numeric_cmp(other), self, other) {
            (Some(ordering), ..) => Ok(ordering.is_some_and(Ordering::is_gt)),
            (None, Self::Dict(a), Self::Dict(b)) => a.py_gt(b, heap),
            (None, Self::Set(a), Self::Set(b)) => a.py_gt(b, heap),
            _ => Ok(self.py_cmp(other, heap)?.is_gt()),
        }
    }

    fn py_ge(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match (self.numeric_cmp(other), self, other) {
            (Some(ordering), ..) => Ok(ordering.is_some_and(Ordering::is_ge)),
            (None, Self::Dict(a), Self::Dict(b)) => a.py_ge(b, heap),
            (None, Self::Set(a), Self::Set(b)) => a.py_ge(b, heap),
            _ => Ok(self.py_cmp(other, heap)?.is_ge()),
        }
    }

    fn py_bool(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match self {
            Self::None => Ok(false),
            Self::Bool(b) => Ok(*b),
            Self::Int(i) => i.py_bool(heap),
            Self::Float(f) => f.py_bool(heap),
            Self::Str(s) => s.py_bool(heap),
            Self::Bytes(b) => b.py_bool(heap),
            Self::Range(r) => r.py_bool(heap),
            Self::Tuple(t) => t.py_bool(heap),
            Self::List(l) => l.py_bool(heap),
            Self::Dict(d) => d.py_bool(heap),
            Self::Set(s) => s.py_bool(heap),
            Self::ByteArray(b) => b.py_bool(heap),
        }
    }

    fn py_len(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        match self {
            Self::Str(s) => s.py_len(heap),
            Self::Bytes(b) => b.py_len(heap),
            Self::Range(r) => r.py_len(heap),
            Self::Tuple(t) => t.py_len(heap),
            Self::List(l) => l.py_len(heap),
            Self::Dict(d) => d.py_len(heap),
            Self::Set(s) => s.py_len(heap),
            Self::ByteArray(b) => b.py_len(heap),
            _ => Err(ExcType::type_error_no_len(self.type_name())),
        }
    }

    fn py_int(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        match self {
            Self::Bool(b) => b.py_int(heap),
            Self::Int(i) => Ok(*i),
            Self::Float(f) => f.py_int(heap),
            Self::Str(s) => s.py_int(heap),
            _ => Err(ExcType::type_error_int(self.type_name())),
        }
    }

    fn py_index(&self) -> RunResult<i64> {
        match self {
            Self::Bool(b) => b.py_index(),
            Self::Int(i) => Ok(*i),
            _ => Err(ExcType::type_error(format_args!(
                "'{}' object cannot be interpreted as an integer",
                self.type_name()
            ))),
        }
    }

    fn py_copy(&self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        Ok(match self {
            Self::List(l) => Self::List(l.py_copy(heap)?),
            Self::Dict(d) => Self::Dict(d.py_copy(heap)?),
            Self::Set(s) => Self::Set(s.py_copy(heap)?),
            Self::ByteArray(b) => Self::ByteArray(b.py_copy(heap)?),
            _ => self.clone(),
        })
    }

    fn py_deepcopy(&self, heap: &mut Heap<impl ResourceTracker>, memo: &mut DeepCopyMemo) -> RunResult<Self> {
        Ok(match self {
            Self::Tuple(t) => Self::Tuple(t.py_deepcopy(heap, memo)?),
            Self::List(l) => Self::List(l.py_deepcopy(heap, memo)?),
            Self::Dict(d) => Self::Dict(d.py_deepcopy(heap, memo)?),
            Self::Set(s) => Self::Set(s.py_deepcopy(heap, memo)?),
            Self::ByteArray(b) => Self::ByteArray(b.py_deepcopy(heap, memo)?),
            _ => self.clone(),
        })
    }

    fn trace(&self, out: &mut Vec<HeapId>) {
        match self {
            Self::Tuple(t) => t.trace(out),
            Self::List(l) => l.trace(out),
            Self::Dict(d) => d.trace(out),
            Self::Set(s) => s.trace(out),
            Self::ByteArray(b) => b.trace(out),
            _ => {}
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<Str> for Value {
    fn from(value: Str) -> Self {
        Self::Str(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Range> for Value {
    fn from(value: Range) -> Self {
        Self::Range(value)
    }
}

impl From<Tuple<Value>> for Value {
    fn from(value: Tuple<Value>) -> Self {
        Self::Tuple(value)
    }
}

impl From<Ref<List<Value>>> for Value {
    fn from(value: Ref<List<Value>>) -> Self {
        Self::List(value)
    }
}

impl From<Ref<Dict<Value, Value>>> for Value {
    fn from(value: Ref<Dict<Value, Value>>) -> Self {
        Self::Dict(value)
    }
}

impl From<Ref<Set<Value>>> for Value {
    fn from(value: Ref<Set<Value>>) -> Self {
        Self::Set(value)
    }
}

impl From<Ref<ByteArray>> for Value {
    fn from(value: Ref<ByteArray>) -> Self {
        Self::ByteArray(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        object::{dict_key_hash, set_element_hash},
        resource::NoLimitTracker,
    };

    #[test]
    fn numeric_tower_equality_and_hash() {
        let heap = Heap::new(NoLimitTracker);
        let pairs = [
            (Value::Bool(true), Value::Int(1)),
            (Value::Int(2), Value::Float(2.0)),
            (Value::Bool(false), Value::Float(-0.0)),
        ];
        for (a, b) in pairs {
            assert!(a.py_eq(&b, &heap).unwrap(), "{a:?} == {b:?}");
            assert_eq!(a.py_hash(&heap).unwrap(), b.py_hash(&heap).unwrap());
        }
        assert!(!Value::Int(1).py_eq(&Value::Float(1.5), &heap).unwrap());
    }

    #[test]
    fn int_float_ordering_is_exact() {
        let heap = Heap::new(NoLimitTracker);
        let big = Value::Int(i64::MAX);
        // i64::MAX rounds up to 2^63 as a float
        let float = Value::Float(9_223_372_036_854_775_807.0);
        assert!(big.py_lt(&float, &heap).unwrap());
        assert!(Value::Int(-3).py_lt(&Value::Float(-2.5), &heap).unwrap());
        assert!(Value::Float(2.5).py_gt(&Value::Int(2), &heap).unwrap());
        assert!(!Value::Float(f64::NAN).py_ge(&Value::Int(0), &heap).unwrap());
    }

    #[test]
    fn mixed_types_are_unequal_and_unorderable() {
        let heap = Heap::new(NoLimitTracker);
        let one = Value::Int(1);
        let text = Value::from("1");
        assert!(!one.py_eq(&text, &heap).unwrap());
        let err = one.py_lt(&text, &heap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: '<' not supported between instances of 'int' and 'str'"
        );
        assert!(!Value::None.py_eq(&Value::Bool(false), &heap).unwrap());
    }

    #[test]
    fn bytes_compare_with_bytearray() {
        let mut heap = Heap::new(NoLimitTracker);
        let array = ByteArray::allocate(b"ab".to_vec(), &mut heap).unwrap();
        let bytes = Value::Bytes(Bytes::from(b"ab"));
        assert!(bytes.py_eq(&Value::ByteArray(array), &heap).unwrap());
        assert!(Value::Bytes(Bytes::from(b"aa")).py_lt(&Value::ByteArray(array), &heap).unwrap());
    }

    #[test]
    fn containers_are_unhashable() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
        let value = Value::List(list);
        assert!(!value.is_hashable());
        let err = value.py_hash(&heap).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
        let tuple = Value::Tuple(vec![Value::Int(1), value].into());
        assert!(!tuple.is_hashable());
        assert_eq!(tuple.unhashable_type(), Some("list"));
        let err = dict_key_hash(&tuple, &heap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: cannot use 'tuple' as a dict key (unhashable type: 'list')"
        );
        let err = set_element_hash(&tuple, &heap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: cannot use 'tuple' as a set element (unhashable type: 'list')"
        );
    }

    #[test]
    fn str_and_repr_differ_only_for_text() {
        let heap = Heap::new(NoLimitTracker);
        let text = Value::from("hi");
        assert_eq!(text.py_str(&heap).unwrap(), "hi");
        assert_eq!(text.py_repr(&heap).unwrap(), "'hi'");
        assert_eq!(Value::None.py_str(&heap).unwrap(), "None");
        assert_eq!(Value::Float(0.5).py_str(&heap).unwrap(), "0.5");
    }
}
