//! The object root: behaviour shared by every value the runtime stores.
//!
//! [`PyObject`] is the static-dispatch contract every container element satisfies.
//! Value types (`i64`, `f64`, [`Str`](crate::types::Str), tuples) implement it
//! directly; collector-owned objects implement [`HeapObject`] and are used through
//! a [`Ref`] handle, which implements `PyObject` by delegation.

use std::{cmp::Ordering, fmt, mem};

use ahash::AHashMap;

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapId, Ref},
    py_hash::{hash_float, hash_identity, hash_int},
    resource::ResourceTracker,
};

/// Operations every runtime value supports.
///
/// Methods that may need to look inside other objects take the heap; methods that
/// may allocate (copies) take it mutably.
pub trait PyObject: Clone + fmt::Debug + 'static {
    /// Python type name, used in error messages.
    fn type_name(&self) -> &'static str;

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String>;

    fn py_str(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        self.py_repr(heap)
    }

    /// Type name of the first unhashable component, `None` when the value can be hashed.
    ///
    /// A tuple holding a list reports `'list'`, matching CPython's TypeError text.
    fn unhashable_type(&self) -> Option<&'static str> {
        None
    }

    /// Whether the value may be used as a dict key or set element at all.
    fn is_hashable(&self) -> bool {
        self.unhashable_type().is_none()
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64>;

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool>;

    /// Three-way comparison used by sorting and the ordering predicates.
    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering>;

    fn py_ne(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!self.py_eq(other, heap)?)
    }

    fn py_lt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.py_cmp(other, heap)?.is_lt())
    }

    fn py_le(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.py_cmp(other, heap)?.is_le())
    }

    fn py_gt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.py_cmp(other, heap)?.is_gt())
    }

    fn py_ge(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self.py_cmp(other, heap)?.is_ge())
    }

    /// Truthiness, Python's `bool(x)`.
    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(true)
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Err(ExcType::type_error_no_len(self.type_name()))
    }

    fn py_int(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        Err(ExcType::type_error_int(self.type_name()))
    }

    /// Integer coercion for use as an index or repeat count (`__index__`).
    fn py_index(&self) -> RunResult<i64> {
        Err(ExcType::type_error(format_args!(
            "'{}' object cannot be interpreted as an integer",
            self.type_name()
        )))
    }

    /// Shallow copy, `copy.copy(x)`.
    fn py_copy(&self, _heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        Ok(self.clone())
    }

    /// Deep copy, `copy.deepcopy(x, memo)`.
    fn py_deepcopy(&self, _heap: &mut Heap<impl ResourceTracker>, _memo: &mut DeepCopyMemo) -> RunResult<Self> {
        Ok(self.clone())
    }

    /// Pushes the ids of heap objects this value references, for collection.
    fn trace(&self, _out: &mut Vec<HeapId>) {}
}

/// Behaviour of a collector-owned object, reached through a [`Ref`] handle.
///
/// Every method receives the object's own handle so defaults can use identity:
/// repr is `<X instance>`, hash and equality are identity based, ordering
/// follows heap position, copy and deepcopy return the same reference.
/// Containers and generated user classes override what their semantics need.
pub trait HeapObject: fmt::Debug + Sized + 'static {
    const TYPE_NAME: &'static str;

    /// Whether instances may be dict keys or set elements.
    const HASHABLE: bool = true;

    fn trace(&self, _out: &mut Vec<HeapId>) {}

    fn estimate_size(&self) -> usize {
        mem::size_of::<Self>()
    }

    fn py_repr(_this: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(format!("<{} instance>", Self::TYPE_NAME))
    }

    fn py_str(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Self::py_repr(this, heap)
    }

    fn py_hash(this: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(hash_identity(this.id().index()))
    }

    fn py_eq(this: Ref<Self>, other: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(this.is(other))
    }

    fn py_cmp(this: Ref<Self>, other: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(this.id().cmp(&other.id()))
    }

    fn py_lt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(Self::py_cmp(this, other, heap)?.is_lt())
    }

    fn py_le(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(Self::py_cmp(this, other, heap)?.is_le())
    }

    fn py_gt(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(Self::py_cmp(this, other, heap)?.is_gt())
    }

    fn py_ge(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(Self::py_cmp(this, other, heap)?.is_ge())
    }

    fn py_bool(_this: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(true)
    }

    fn py_len(_this: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Err(ExcType::type_error_no_len(Self::TYPE_NAME))
    }

    fn py_int(_this: Ref<Self>, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        Err(ExcType::type_error_int(Self::TYPE_NAME))
    }

    fn py_copy(this: Ref<Self>, _heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        Ok(this)
    }

    /// Deep copy. The memo has already been checked for `this`; implementations that
    /// allocate a copy must register it with [`DeepCopyMemo::insert`] before copying
    /// children so self references resolve to the new object.
    fn py_deepcopy(
        this: Ref<Self>,
        _heap: &mut Heap<impl ResourceTracker>,
        _memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        Ok(this)
    }
}

impl<D: HeapObject> PyObject for Ref<D> {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        heap.data_depth_enter()?;
        let result = D::py_repr(*self, heap);
        heap.data_depth_exit();
        result
    }

    fn py_str(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        heap.data_depth_enter()?;
        let result = D::py_str(*self, heap);
        heap.data_depth_exit();
        result
    }

    fn unhashable_type(&self) -> Option<&'static str> {
        (!D::HASHABLE).then_some(D::TYPE_NAME)
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        if !D::HASHABLE {
            return Err(ExcType::type_error_unhashable(D::TYPE_NAME));
        }
        heap.data_depth_enter()?;
        let result = D::py_hash(*self, heap);
        heap.data_depth_exit();
        result
    }

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        if self.is(*other) {
            return Ok(true);
        }
        heap.data_depth_enter()?;
        let result = D::py_eq(*self, *other, heap);
        heap.data_depth_exit();
        result
    }

    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        heap.data_depth_enter()?;
        let result = D::py_cmp(*self, *other, heap);
        heap.data_depth_exit();
        result
    }

    fn py_lt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        D::py_lt(*self, *other, heap)
    }

    fn py_le(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        D::py_le(*self, *other, heap)
    }

    fn py_gt(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        D::py_gt(*self, *other, heap)
    }

    fn py_ge(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        D::py_ge(*self, *other, heap)
    }

    fn py_bool(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        D::py_bool(*self, heap)
    }

    fn py_len(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        D::py_len(*self, heap)
    }

    fn py_int(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        D::py_int(*self, heap)
    }

    fn py_copy(&self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        D::py_copy(*self, heap)
    }

    fn py_deepcopy(&self, heap: &mut Heap<impl ResourceTracker>, memo: &mut DeepCopyMemo) -> RunResult<Self> {
        if let Some(copy) = memo.get(*self) {
            return Ok(copy);
        }
        heap.data_depth_enter()?;
        let result = D::py_deepcopy(*self, heap, memo);
        heap.data_depth_exit();
        result
    }

    fn trace(&self, out: &mut Vec<HeapId>) {
        out.push(self.id());
    }
}

/// Identity map from original object to its copy, scoped to one `deepcopy` call tree.
///
/// Guarantees shared objects are copied once (sharing is preserved in the copy)
/// and that cyclic graphs terminate.
#[derive(Debug, Default)]
pub struct DeepCopyMemo {
    copies: AHashMap<HeapId, HeapId>,
}

impl DeepCopyMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the copy already made for `original`, if any.
    #[must_use]
    pub fn get<D>(&self, original: Ref<D>) -> Option<Ref<D>> {
        self.copies.get(&original.id()).copied().map(Ref::from_id)
    }

    /// Records `copy` as the deep copy of `original`.
    pub fn insert<D>(&mut self, original: Ref<D>, copy: Ref<D>) {
        self.copies.insert(original.id(), copy.id());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

/// Hashes a value about to be used as a dict key.
///
/// Unhashable keys fail with CPython's dict-key specific TypeError.
pub fn dict_key_hash<K: PyObject>(key: &K, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
    if let Some(unhashable) = key.unhashable_type() {
        return Err(ExcType::type_error_unhashable_dict_key(key.type_name(), unhashable));
    }
    key.py_hash(heap)
}

/// Hashes a value about to be used as a set element.
pub fn set_element_hash<T: PyObject>(value: &T, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
    if let Some(unhashable) = value.unhashable_type() {
        return Err(ExcType::type_error_unhashable_set_element(value.type_name(), unhashable));
    }
    value.py_hash(heap)
}

impl PyObject for i64 {
    fn type_name(&self) -> &'static str {
        "int"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(self.to_string())
    }

    fn py_hash(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(hash_int(*self))
    }

    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self == other)
    }

    fn py_cmp(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(self.cmp(other))
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(*self != 0)
    }

    fn py_int(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        Ok(*self)
    }

    fn py_index(&self) -> RunResult<i64> {
        Ok(*self)
    }
}

impl PyObject for bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(if *self { "True" } else { "False" }.to_owned())
    }

    fn py_hash(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(hash_int(i64::from(*self)))
    }

    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self == other)
    }

    fn py_cmp(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(self.cmp(other))
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(*self)
    }

    fn py_int(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        Ok(i64::from(*self))
    }

    fn py_index(&self) -> RunResult<i64> {
        Ok(i64::from(*self))
    }
}

impl PyObject for f64 {
    fn type_name(&self) -> &'static str {
        "float"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(float_repr(*self))
    }

    fn py_hash(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(hash_float(*self))
    }

    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self == other)
    }

    /// NaN compares equal to everything here; the predicates below use IEEE semantics.
    fn py_cmp(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }

    fn py_lt(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self < other)
    }

    fn py_le(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self <= other)
    }

    fn py_gt(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self > other)
    }

    fn py_ge(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self >= other)
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(*self != 0.0)
    }

    fn py_int(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        float_to_int(*self)
    }
}

/// Hash CPython 3.12+ gives `None`.
const NONE_HASH: u64 = 4_238_894_112;

/// `None` is modelled as `Option::None`; `Some(x)` behaves exactly like `x`.
impl<T: PyObject> PyObject for Option<T> {
    fn type_name(&self) -> &'static str {
        match self {
            Some(value) => value.type_name(),
            None => "NoneType",
        }
    }

    fn py_repr(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        match self {
            Some(value) => value.py_repr(heap),
            None => Ok("None".to_owned()),
        }
    }

    fn py_str(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        match self {
            Some(value) => value.py_str(heap),
            None => Ok("None".to_owned()),
        }
    }

    fn unhashable_type(&self) -> Option<&'static str> {
        self.as_ref().and_then(PyObject::unhashable_type)
    }

    fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        match self {
            Some(value) => value.py_hash(heap),
            None => Ok(NONE_HASH),
        }
    }

    fn py_eq(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match (self, other) {
            (Some(a), Some(b)) => a.py_eq(b, heap),
            (None, None) => Ok(true),
            _ => Ok(false),
        }
    }

    fn py_cmp(&self, other: &Self, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        match (self, other) {
            (Some(a), Some(b)) => a.py_cmp(b, heap),
            _ => Err(ExcType::type_error_unorderable(
                "<",
                self.type_name(),
                other.type_name(),
            )),
        }
    }

    fn py_bool(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        match self {
            Some(value) => value.py_bool(heap),
            None => Ok(false),
        }
    }

    fn py_len(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        match self {
            Some(value) => value.py_len(heap),
            None => Err(ExcType::type_error_no_len("NoneType")),
        }
    }

    fn py_int(&self, heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        match self {
            Some(value) => value.py_int(heap),
            None => Err(ExcType::type_error_int("NoneType")),
        }
    }

    fn py_copy(&self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Self> {
        self.as_ref().map(|value| value.py_copy(heap)).transpose()
    }

    fn py_deepcopy(&self, heap: &mut Heap<impl ResourceTracker>, memo: &mut DeepCopyMemo) -> RunResult<Self> {
        self.as_ref().map(|value| value.py_deepcopy(heap, memo)).transpose()
    }

    fn trace(&self, out: &mut Vec<HeapId>) {
        if let Some(value) = self {
            value.trace(out);
        }
    }
}

/// Converts a float to int the way `int(x)` does, truncating toward zero.
pub(crate) fn float_to_int(value: f64) -> RunResult<i64> {
    if value.is_nan() {
        return Err(ExcType::value_error("cannot convert float NaN to integer"));
    }
    if value.is_infinite() {
        return Err(ExcType::OverflowError.with_msg("cannot convert float infinity to integer"));
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(ExcType::OverflowError.with_msg("int too large to convert to int64"));
    }
    #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
    let int_value = truncated as i64;
    Ok(int_value)
}

/// Returns a string representation of a float matching CPython's `repr()` behavior.
///
/// Uses the `ryu` crate which produces the shortest decimal representation
/// that round-trips through `f64` parsing, then adjusts ryu's exponent
/// spelling (`1e20` becomes `1e+20`) and switches to exponent notation at the
/// same thresholds CPython uses (`1e16` and `1e-4`).
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }

    let mut buffer = ryu::Buffer::new();
    let shortest = buffer.format_finite(f);
    let (negative, unsigned) = match shortest.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, shortest),
    };

    // split ryu output into a digit string and a decimal exponent
    let (mantissa, exp_adjust) = match unsigned.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits: String = format!("{int_part}{frac_part}");
    let mut point = digit_count(int_part.len()) + exp_adjust;
    let leading_zeros = digits.len() - digits.trim_start_matches('0').len();
    if leading_zeros == digits.len() {
        return if negative { "-0.0" } else { "0.0" }.to_owned();
    }
    digits.drain(..leading_zeros);
    point -= digit_count(leading_zeros);
    let digits = digits.trim_end_matches('0');
    // scientific exponent: value = 0.d1d2... * 10^point = d1.d2... * 10^(point - 1)
    let sci_exp = point - 1;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if !(-4..16).contains(&sci_exp) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if sci_exp < 0 { '-' } else { '+' };
        out.push_str(&format!("e{sign}{:02}", sci_exp.unsigned_abs()));
    } else if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', point.unsigned_abs() as usize));
        out.push_str(digits);
    } else {
        let point = point.unsigned_abs() as usize;
        if digits.len() <= point {
            out.push_str(digits);
            out.extend(std::iter::repeat_n('0', point - digits.len()));
            out.push_str(".0");
        } else {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        }
    }
    out
}

fn digit_count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NoLimitTracker;

    #[test]
    fn float_repr_matches_python() {
        let cases = [
            (1.0, "1.0"),
            (0.1, "0.1"),
            (-2.5, "-2.5"),
            (1e16, "1e+16"),
            (1e15, "1000000000000000.0"),
            (0.0001, "0.0001"),
            (0.00001, "1e-05"),
            (1.5e-10, "1.5e-10"),
            (123_456_789.123, "123456789.123"),
            (-0.0, "-0.0"),
            (f64::INFINITY, "inf"),
        ];
        for (value, expected) in cases {
            assert_eq!(float_repr(value), expected, "repr({value})");
        }
    }

    #[test]
    fn none_semantics() {
        let heap = Heap::new(NoLimitTracker);
        let none: Option<i64> = None;
        assert_eq!(none.py_repr(&heap).unwrap(), "None");
        assert!(!none.py_bool(&heap).unwrap());
        assert!(none.py_eq(&None, &heap).unwrap());
        assert!(!none.py_eq(&Some(0), &heap).unwrap());
        let err = none.py_cmp(&Some(1), &heap).unwrap_err();
        assert!(err.is_exception_type(ExcType::TypeError));
    }

    #[test]
    fn nan_predicates_follow_ieee() {
        let heap = Heap::new(NoLimitTracker);
        let nan = f64::NAN;
        assert!(!nan.py_eq(&nan, &heap).unwrap());
        assert!(!nan.py_le(&1.0, &heap).unwrap());
        assert!(!nan.py_ge(&1.0, &heap).unwrap());
    }

    #[test]
    fn float_to_int_truncates() {
        assert_eq!(float_to_int(-2.7).unwrap(), -2);
        assert!(float_to_int(f64::NAN).unwrap_err().is_exception_type(ExcType::ValueError));
        assert!(float_to_int(f64::INFINITY).unwrap_err().is_exception_type(ExcType::OverflowError));
    }
}
