//! Conversion between runtime values and host-side data.
//!
//! [`Object`] owns all of its data and needs no heap, so a host can store,
//! clone or serialize it freely. Each runtime type implements [`ForeignConvert`]
//! to move values across the boundary in both directions.
//!
//! # JSON
//!
//! [`Object::to_json_value`] and [`Object::from_json_value`] use a natural mapping:
//! `None` is `null`, bools, ints, floats and strings map directly, lists are arrays
//! and dicts are objects. Types JSON cannot express are tagged objects:
//! `{"$tuple": [...]}`, `{"$set": [...]}`, `{"$bytes": [...]}`,
//! `{"$bytearray": [...]}` and `{"$range": [start, stop, step]}`.
//! The derived serde impls keep the externally tagged form for other formats,
//! and [`Object::to_binary`] uses it for a compact postcard encoding.

use std::fmt;

use crate::{
    exception::RunError,
    heap::{Heap, Ref},
    iter::collect_vec,
    object::PyObject,
    resource::ResourceTracker,
    types::{ByteArray, ByteSequence, Bytes, Dict, List, Range, Set, Str, Tuple},
    value::Value,
};

/// A host-side value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Object {
    #[serde(alias = "none", alias = "NoneType")]
    None,
    #[serde(alias = "bool")]
    Bool(bool),
    #[serde(alias = "int")]
    Int(i64),
    #[serde(alias = "float")]
    Float(f64),
    #[serde(alias = "str")]
    String(String),
    #[serde(alias = "bytes")]
    Bytes(Vec<u8>),
    #[serde(alias = "bytearray")]
    ByteArray(Vec<u8>),
    #[serde(alias = "range")]
    Range { start: i64, stop: i64, step: i64 },
    #[serde(alias = "list")]
    List(Vec<Self>),
    #[serde(alias = "tuple")]
    Tuple(Vec<Self>),
    /// Insertion-ordered key/value pairs; keys may be any hashable object.
    #[serde(alias = "dict")]
    Dict(Vec<(Self, Self)>),
    #[serde(alias = "set")]
    Set(Vec<Self>),
}

impl Object {
    /// Python type name of the value this object converts to.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::ByteArray(_) => "bytearray",
            Self::Range { .. } => "range",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
        }
    }

    /// Encodes the object with the natural JSON mapping.
    ///
    /// NaN and infinities have no JSON spelling and become `null`. Dict keys that
    /// are not strings are written as their JSON text.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::{Value as JV, json};
        match self {
            Self::None => JV::Null,
            Self::Bool(b) => JV::Bool(*b),
            Self::Int(i) => json!(i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(JV::Null, JV::Number),
            Self::String(s) => JV::String(s.clone()),
            Self::Bytes(b) => json!({"$bytes": b}),
            Self::ByteArray(b) => json!({"$bytearray": b}),
            Self::Range { start, stop, step } => json!({"$range": [start, stop, step]}),
            Self::List(items) => JV::Array(items.iter().map(Self::to_json_value).collect()),
            Self::Tuple(items) => json!({"$tuple": items.iter().map(Self::to_json_value).collect::<Vec<_>>()}),
            Self::Dict(pairs) => {
                let map: serde_json::Map<String, JV> = pairs
                    .iter()
                    .map(|(key, value)| {
                        let key = match key {
                            Self::String(s) => s.clone(),
                            other => other.to_json_value().to_string(),
                        };
                        (key, value.to_json_value())
                    })
                    .collect();
                JV::Object(map)
            }
            Self::Set(items) => json!({"$set": items.iter().map(Self::to_json_value).collect::<Vec<_>>()}),
        }
    }

    /// Decodes the natural JSON mapping produced by [`Object::to_json_value`].
    ///
    /// Integers beyond `i64` decode as floats. An object is a tagged value when it
    /// has exactly one recognised `$` key with a well-formed payload, and a dict
    /// with string keys otherwise.
    #[must_use]
    pub fn from_json_value(value: serde_json::Value) -> Self {
        use serde_json::Value as JV;
        match value {
            JV::Null => Self::None,
            JV::Bool(b) => Self::Bool(b),
            JV::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JV::String(s) => Self::String(s),
            JV::Array(items) => Self::List(items.into_iter().map(Self::from_json_value).collect()),
            JV::Object(map) => {
                if map.len() == 1
                    && let Some((tag, payload)) = map.iter().next()
                    && let Some(tagged) = Self::from_json_tagged(tag, payload)
                {
                    return tagged;
                }
                Self::Dict(
                    map.into_iter()
                        .map(|(key, value)| (Self::String(key), Self::from_json_value(value)))
                        .collect(),
                )
            }
        }
    }

    /// Encodes the object with postcard.
    pub fn to_binary(&self) -> Result<Vec<u8>, ConversionError> {
        postcard::to_allocvec(self).map_err(|err| ConversionError::Binary(err.to_string()))
    }

    /// Decodes an object written by [`Object::to_binary`].
    pub fn from_binary(bytes: &[u8]) -> Result<Self, ConversionError> {
        postcard::from_bytes(bytes).map_err(|err| ConversionError::Binary(err.to_string()))
    }

    fn from_json_tagged(tag: &str, payload: &serde_json::Value) -> Option<Self> {
        let items = payload.as_array()?;
        let objects = || -> Vec<Self> { items.iter().cloned().map(Self::from_json_value).collect() };
        let bytes = || -> Option<Vec<u8>> {
            items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect()
        };
        match tag {
            "$tuple" => Some(Self::Tuple(objects())),
            "$set" => Some(Self::Set(objects())),
            "$bytes" => bytes().map(Self::Bytes),
            "$bytearray" => bytes().map(Self::ByteArray),
            "$range" => match items.as_slice() {
                [start, stop, step] => Some(Self::Range {
                    start: start.as_i64()?,
                    stop: stop.as_i64()?,
                    step: step.as_i64()?,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Error moving a value across the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The object holds a different type than the target.
    Type {
        expected: &'static str,
        actual: &'static str,
    },
    /// Building the runtime value failed, e.g. an unhashable dict key or an
    /// exhausted resource limit.
    Runtime(RunError),
    /// The binary encoding could not be written or read.
    Binary(String),
}

impl ConversionError {
    #[must_use]
    pub fn new(expected: &'static str, actual: &'static str) -> Self {
        Self::Type { expected, actual }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { expected, actual } => write!(f, "expected {expected}, got {actual}"),
            Self::Runtime(err) => write!(f, "{err}"),
            Self::Binary(msg) => write!(f, "invalid binary object: {msg}"),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<RunError> for ConversionError {
    fn from(err: RunError) -> Self {
        Self::Runtime(err)
    }
}

/// Two-way conversion between a runtime type and [`Object`].
pub trait ForeignConvert: Sized {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError>;

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError>;
}

/// Converts a heap container's children under the data recursion guard, so a
/// self-containing container fails with RecursionError instead of overflowing.
fn guarded<R>(
    heap: &Heap<impl ResourceTracker>,
    f: impl FnOnce() -> Result<R, ConversionError>,
) -> Result<R, ConversionError> {
    heap.data_depth_enter()?;
    let result = f();
    heap.data_depth_exit();
    result
}

fn convert_all<T: ForeignConvert>(
    objects: Vec<Object>,
    heap: &mut Heap<impl ResourceTracker>,
) -> Result<Vec<T>, ConversionError> {
    objects.into_iter().map(|object| T::from_foreign(object, heap)).collect()
}

impl ForeignConvert for bool {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::Bool(*self))
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Bool(b) => Ok(b),
            other => Err(ConversionError::new("bool", other.type_name())),
        }
    }
}

impl ForeignConvert for i64 {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::Int(*self))
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Int(i) => Ok(i),
            other => Err(ConversionError::new("int", other.type_name())),
        }
    }
}

/// Ints are accepted where a float is expected, as in Python.
impl ForeignConvert for f64 {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::Float(*self))
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Float(f) => Ok(f),
            Object::Int(i) => Ok(i as Self),
            other => Err(ConversionError::new("float", other.type_name())),
        }
    }
}

impl ForeignConvert for Str {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::String(self.as_str().to_owned()))
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::String(s) => Ok(s.into()),
            other => Err(ConversionError::new("str", other.type_name())),
        }
    }
}

impl ForeignConvert for Bytes {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::Bytes(self.as_bytes().to_vec()))
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Bytes(b) => Ok(b.into()),
            other => Err(ConversionError::new("bytes", other.type_name())),
        }
    }
}

impl ForeignConvert for Range {
    fn to_foreign(&self, _heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::Range {
            start: self.start(),
            stop: self.stop(),
            step: self.step(),
        })
    }

    fn from_foreign(object: Object, _heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Range { start, stop, step } => Ok(Self::new(start, stop, step)?),
            other => Err(ConversionError::new("range", other.type_name())),
        }
    }
}

/// `None` maps to `Object::None`; `Some(x)` converts as `x`.
impl<T: ForeignConvert> ForeignConvert for Option<T> {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        match self {
            Some(value) => value.to_foreign(heap),
            None => Ok(Object::None),
        }
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::None => Ok(None),
            other => T::from_foreign(other, heap).map(Some),
        }
    }
}

impl<T: PyObject + ForeignConvert> ForeignConvert for Tuple<T> {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        let items = self
            .as_slice()
            .iter()
            .map(|item| item.to_foreign(heap))
            .collect::<Result<_, _>>()?;
        Ok(Object::Tuple(items))
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Tuple(items) => Ok(convert_all(items, heap)?.into()),
            other => Err(ConversionError::new("tuple", other.type_name())),
        }
    }
}

impl<T: PyObject + ForeignConvert> ForeignConvert for Ref<List<T>> {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        guarded(heap, || {
            let items = self
                .to_vec(heap)
                .iter()
                .map(|item| item.to_foreign(heap))
                .collect::<Result<_, _>>()?;
            Ok(Object::List(items))
        })
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::List(items) => {
                let items = convert_all(items, heap)?;
                Ok(List::from_vec(items, heap)?)
            }
            other => Err(ConversionError::new("list", other.type_name())),
        }
    }
}

impl<K, V> ForeignConvert for Ref<Dict<K, V>>
where
    K: PyObject + ForeignConvert,
    V: PyObject + ForeignConvert,
{
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        guarded(heap, || {
            let pairs = collect_vec(&self.items(), heap)?
                .iter()
                .map(|pair| Ok((pair.first.to_foreign(heap)?, pair.second.to_foreign(heap)?)))
                .collect::<Result<_, ConversionError>>()?;
            Ok(Object::Dict(pairs))
        })
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Dict(pairs) => {
                let mut converted = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    converted.push((K::from_foreign(key, heap)?, V::from_foreign(value, heap)?));
                }
                Ok(Dict::from_vec(converted, heap)?)
            }
            other => Err(ConversionError::new("dict", other.type_name())),
        }
    }
}

impl<T: PyObject + ForeignConvert> ForeignConvert for Ref<Set<T>> {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        guarded(heap, || {
            let items = self
                .to_vec(heap)
                .iter()
                .map(|item| item.to_foreign(heap))
                .collect::<Result<_, _>>()?;
            Ok(Object::Set(items))
        })
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::Set(items) => {
                let items = convert_all(items, heap)?;
                Ok(Set::from_vec(items, heap)?)
            }
            other => Err(ConversionError::new("set", other.type_name())),
        }
    }
}

impl ForeignConvert for Ref<ByteArray> {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        Ok(Object::ByteArray(heap.get(*self).as_bytes().to_vec()))
    }

    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        match object {
            Object::ByteArray(data) => Ok(ByteArray::allocate(data, heap)?),
            other => Err(ConversionError::new("bytearray", other.type_name())),
        }
    }
}

impl ForeignConvert for Value {
    fn to_foreign(&self, heap: &Heap<impl ResourceTracker>) -> Result<Object, ConversionError> {
        match self {
            Self::None => Ok(Object::None),
            Self::Bool(b) => b.to_foreign(heap),
            Self::Int(i) => i.to_foreign(heap),
            Self::Float(f) => f.to_foreign(heap),
            Self::Str(s) => s.to_foreign(heap),
            Self::Bytes(b) => b.to_foreign(heap),
            Self::Range(r) => r.to_foreign(heap),
            Self::Tuple(t) => t.to_foreign(heap),
            Self::List(l) => l.to_foreign(heap),
            Self::Dict(d) => d.to_foreign(heap),
            Self::Set(s) => s.to_foreign(heap),
            Self::ByteArray(b) => b.to_foreign(heap),
        }
    }

    /// Every object converts; the variant follows the object's type.
    fn from_foreign(object: Object, heap: &mut Heap<impl ResourceTracker>) -> Result<Self, ConversionError> {
        Ok(match object {
            Object::None => Self::None,
            Object::Bool(b) => Self::Bool(b),
            Object::Int(i) => Self::Int(i),
            Object::Float(f) => Self::Float(f),
            Object::String(s) => Self::Str(s.into()),
            Object::Bytes(b) => Self::Bytes(b.into()),
            range @ Object::Range { .. } => Self::Range(Range::from_foreign(range, heap)?),
            tuple @ Object::Tuple(_) => Self::Tuple(Tuple::from_foreign(tuple, heap)?),
            list @ Object::List(_) => Self::List(Ref::<List<Self>>::from_foreign(list, heap)?),
            dict @ Object::Dict(_) => Self::Dict(Ref::<Dict<Self, Self>>::from_foreign(dict, heap)?),
            set @ Object::Set(_) => Self::Set(Ref::<Set<Self>>::from_foreign(set, heap)?),
            array @ Object::ByteArray(_) => Self::ByteArray(Ref::<ByteArray>::from_foreign(array, heap)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{exception::ExcType, resource::NoLimitTracker};

    #[test]
    fn typed_conversion_reports_mismatch() {
        let mut heap = Heap::new(NoLimitTracker);
        let err = i64::from_foreign(Object::String("1".to_owned()), &mut heap).unwrap_err();
        assert_eq!(err.to_string(), "expected int, got str");
        assert_eq!(f64::from_foreign(Object::Int(2), &mut heap).unwrap(), 2.0);
    }

    #[test]
    fn unhashable_dict_key_is_a_runtime_error() {
        let mut heap = Heap::new(NoLimitTracker);
        let object = Object::Dict(vec![(Object::List(vec![]), Object::Int(1))]);
        let err = Value::from_foreign(object, &mut heap).unwrap_err();
        let ConversionError::Runtime(err) = err else {
            panic!("expected a runtime error, got {err:?}");
        };
        assert!(err.is_exception_type(ExcType::TypeError));
    }

    #[test]
    fn self_containing_list_fails_cleanly() {
        let mut heap = Heap::new(NoLimitTracker);
        let list = List::from_vec(vec![Value::Int(1)], &mut heap).unwrap();
        list.append(Value::List(list), &mut heap).unwrap();
        let err = Value::List(list).to_foreign(&heap).unwrap_err();
        let ConversionError::Runtime(err) = err else {
            panic!("expected a runtime error, got {err:?}");
        };
        assert!(err.is_exception_type(ExcType::RecursionError));
    }

    #[test]
    fn json_tags_for_non_json_types() {
        let object = Object::Tuple(vec![Object::Bytes(vec![104, 105]), Object::Float(f64::NAN)]);
        let json = object.to_json_value();
        assert_eq!(json.to_string(), r#"{"$tuple":[{"$bytes":[104,105]},null]}"#);
        let plain = Object::from_json_value(serde_json::json!({"$tuple": 1}));
        assert_eq!(
            plain,
            Object::Dict(vec![(Object::String("$tuple".to_owned()), Object::Int(1))])
        );
    }
}
