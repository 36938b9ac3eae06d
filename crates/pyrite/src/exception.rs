use std::{
    borrow::Cow,
    fmt::{self, Display, Write},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::types::str::string_repr_fmt;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Python exception types raised by the runtime.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    BaseException,
    Exception,
    SystemExit,
    // --- LookupError hierarchy ---
    LookupError,
    IndexError,
    KeyError,
    ValueError,
    StopIteration,
    TypeError,
    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,
    AssertionError,
    // --- RuntimeError hierarchy ---
    RuntimeError,
    NotImplementedError,
    RecursionError,
    SyntaxError,
    // --- OSError hierarchy ---
    OSError,
    FileNotFoundError,
    MemoryError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Implements Python's exception hierarchy for `except` clause matching.
    /// Returns true if `self` would be caught by a handler for `handler_type`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            // BaseException catches all exceptions
            Self::BaseException => true,
            // Exception catches everything except BaseException and SystemExit
            Self::Exception => !matches!(self, Self::BaseException | Self::SystemExit),
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::ZeroDivisionError | Self::OverflowError),
            Self::RuntimeError => matches!(self, Self::RecursionError | Self::NotImplementedError),
            Self::OSError => matches!(self, Self::FileNotFoundError),
            _ => false,
        }
    }

    /// Creates an exception of this type carrying a plain text message.
    #[must_use]
    pub fn with_msg(self, msg: impl Display) -> RunError {
        SimpleException::new_msg(self, msg).into()
    }

    /// Creates a generic TypeError with the given message.
    #[must_use]
    pub fn type_error(msg: impl Display) -> RunError {
        Self::TypeError.with_msg(msg)
    }

    /// Creates a generic ValueError with the given message.
    #[must_use]
    pub fn value_error(msg: impl Display) -> RunError {
        Self::ValueError.with_msg(msg)
    }

    /// Creates an IndexError with a type specific message, e.g. `list index out of range`.
    #[must_use]
    pub fn index_error(msg: &'static str) -> RunError {
        Self::IndexError.with_msg(msg)
    }

    /// Creates an IndexError for `pop()` on an empty container.
    ///
    /// Matches CPython's format: `IndexError: pop from empty list`
    #[must_use]
    pub fn index_error_pop_empty(type_name: &str) -> RunError {
        Self::IndexError.with_msg(format_args!("pop from empty {type_name}"))
    }

    /// Creates an IndexError for `pop(i)` with an out of range index.
    ///
    /// Matches CPython's format: `IndexError: pop index out of range`
    #[must_use]
    pub fn index_error_pop_index() -> RunError {
        Self::IndexError.with_msg("pop index out of range")
    }

    /// Creates a KeyError for a missing key.
    ///
    /// The key is stored as its repr so `str(exc)` shows `'a'` for a string key like CPython.
    #[must_use]
    pub fn key_error(key_repr: String) -> RunError {
        SimpleException::new_repr(Self::KeyError, key_repr).into()
    }

    /// Creates a KeyError for popping from an empty set.
    ///
    /// Matches CPython's error format: `KeyError: 'pop from an empty set'`
    #[must_use]
    pub fn key_error_pop_empty_set() -> RunError {
        Self::KeyError.with_msg("pop from an empty set")
    }

    /// Creates a KeyError for popping from an empty dict.
    ///
    /// Matches CPython's format: `KeyError: 'popitem(): dictionary is empty'`
    #[must_use]
    pub fn key_error_popitem_empty_dict() -> RunError {
        Self::KeyError.with_msg("popitem(): dictionary is empty")
    }

    /// Creates a ValueError for slice step being zero.
    ///
    /// Matches CPython's format: `ValueError: slice step cannot be zero`
    #[must_use]
    pub fn value_error_slice_step_zero() -> RunError {
        Self::ValueError.with_msg("slice step cannot be zero")
    }

    /// Creates a ValueError for `range()` with a zero step.
    #[must_use]
    pub fn value_error_range_step_zero() -> RunError {
        Self::ValueError.with_msg("range() arg 3 must not be zero")
    }

    /// Creates a ValueError for assigning the wrong number of items to an extended slice.
    #[must_use]
    pub fn value_error_extended_slice(seq_len: usize, slice_len: usize) -> RunError {
        Self::ValueError.with_msg(format_args!(
            "attempt to assign sequence of size {seq_len} to extended slice of size {slice_len}"
        ))
    }

    /// Creates a ValueError for byte values outside `0..=255`.
    #[must_use]
    pub fn value_error_byte_range() -> RunError {
        Self::ValueError.with_msg("byte must be in range(0, 256)")
    }

    /// Creates a ValueError for an empty `split()` separator.
    #[must_use]
    pub fn value_error_empty_separator() -> RunError {
        Self::ValueError.with_msg("empty separator")
    }

    /// Creates a ValueError for `int(s, base)` on an unparsable literal.
    ///
    /// Matches CPython's format: `ValueError: invalid literal for int() with base 10: 'x'`
    #[must_use]
    pub fn value_error_invalid_int_literal(base: u32, literal_repr: &str) -> RunError {
        Self::ValueError.with_msg(format_args!("invalid literal for int() with base {base}: {literal_repr}"))
    }

    /// Creates a ValueError for a base outside `2..=36` (or zero).
    #[must_use]
    pub fn value_error_int_base() -> RunError {
        Self::ValueError.with_msg("int() base must be >= 2 and <= 36, or 0")
    }

    /// Creates a ValueError for unpacking more values than targets.
    ///
    /// Matches CPython's format: `ValueError: too many values to unpack (expected 2)`
    #[must_use]
    pub fn value_error_too_many_values(expected: usize) -> RunError {
        Self::ValueError.with_msg(format_args!("too many values to unpack (expected {expected})"))
    }

    /// Creates a ValueError for unpacking fewer values than targets.
    ///
    /// Matches CPython's format: `ValueError: not enough values to unpack (expected 3, got 1)`
    #[must_use]
    pub fn value_error_not_enough_values(expected: usize, got: usize) -> RunError {
        Self::ValueError.with_msg(format_args!(
            "not enough values to unpack (expected {expected}, got {got})"
        ))
    }

    /// Creates a TypeError for `hash()` on an unhashable type.
    ///
    /// This matches Python 3.14's error message: `TypeError: unhashable type: 'list'`
    #[must_use]
    pub fn type_error_unhashable(type_name: &str) -> RunError {
        Self::TypeError.with_msg(format_args!("unhashable type: '{type_name}'"))
    }

    /// Creates a TypeError for unhashable types used as dict keys.
    ///
    /// This matches Python 3.14's error message:
    /// `TypeError: cannot use 'list' as a dict key (unhashable type: 'list')`, naming the
    /// nested offender for containers: `cannot use 'tuple' as a dict key (unhashable type: 'list')`
    #[must_use]
    pub fn type_error_unhashable_dict_key(type_name: &str, unhashable: &str) -> RunError {
        Self::TypeError.with_msg(format_args!(
            "cannot use '{type_name}' as a dict key (unhashable type: '{unhashable}')"
        ))
    }

    /// Creates a TypeError for unhashable types used as set elements.
    ///
    /// This matches Python 3.14's error message:
    /// `TypeError: cannot use 'list' as a set element (unhashable type: 'list')`
    #[must_use]
    pub fn type_error_unhashable_set_element(type_name: &str, unhashable: &str) -> RunError {
        Self::TypeError.with_msg(format_args!(
            "cannot use '{type_name}' as a set element (unhashable type: '{unhashable}')"
        ))
    }

    /// Creates a TypeError for `len()` on an object without a length.
    #[must_use]
    pub fn type_error_no_len(type_name: &str) -> RunError {
        Self::TypeError.with_msg(format_args!("object of type '{type_name}' has no len()"))
    }

    /// Creates a TypeError for `int()` on an object that cannot be converted.
    #[must_use]
    pub fn type_error_int(type_name: &str) -> RunError {
        Self::TypeError.with_msg(format_args!(
            "int() argument must be a string, a bytes-like object or a real number, not '{type_name}'"
        ))
    }

    /// Creates a TypeError for ordering comparisons between incompatible operands.
    ///
    /// Matches CPython's format: `TypeError: '<' not supported between instances of 'int' and 'str'`
    #[must_use]
    pub fn type_error_unorderable(op: &str, left: &str, right: &str) -> RunError {
        Self::TypeError.with_msg(format_args!(
            "'{op}' not supported between instances of '{left}' and '{right}'"
        ))
    }

    /// Creates a RuntimeError for dict mutation during iteration.
    ///
    /// Matches CPython's format: `RuntimeError: dictionary changed size during iteration`
    #[must_use]
    pub fn runtime_error_dict_changed_size() -> RunError {
        Self::RuntimeError.with_msg("dictionary changed size during iteration")
    }

    /// Creates a RuntimeError for dict keys replaced during iteration without a size change.
    #[must_use]
    pub fn runtime_error_dict_keys_changed() -> RunError {
        Self::RuntimeError.with_msg("dictionary keys changed during iteration")
    }

    /// Creates a RuntimeError for set mutation during iteration.
    ///
    /// Matches CPython's format: `RuntimeError: Set changed size during iteration`
    #[must_use]
    pub fn runtime_error_set_changed_size() -> RunError {
        Self::RuntimeError.with_msg("Set changed size during iteration")
    }

    /// Creates the RecursionError raised when nested data exceeds the traversal depth.
    #[must_use]
    pub fn recursion_error() -> RunError {
        Self::RecursionError.with_msg("maximum recursion depth exceeded")
    }

    /// Creates a bare StopIteration.
    #[must_use]
    pub fn stop_iteration() -> RunError {
        SimpleException::new(Self::StopIteration, None).into()
    }

    /// Creates a SystemExit carrying a process exit status.
    #[must_use]
    pub fn system_exit(status: i32) -> RunError {
        SimpleException::new_repr(Self::SystemExit, status.to_string()).into()
    }

    /// Creates an OverflowError for sizes that do not fit the platform index type.
    #[must_use]
    pub fn overflow_error_index() -> RunError {
        Self::OverflowError.with_msg("cannot fit 'int' into an index-sized integer")
    }
}

/// Argument carried by a [`SimpleException`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExcArg {
    /// A text message, shown quoted in `repr()` and raw in `str()`.
    Text(String),
    /// The repr of a non-string argument (a KeyError key, a SystemExit status), shown verbatim.
    Repr(String),
}

/// Simple lightweight representation of an exception.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<ExcArg>,
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.py_repr_fmt(f)
    }
}

impl SimpleException {
    /// Creates a new exception with the given type and optional argument.
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<ExcArg>) -> Self {
        Self { exc_type, arg }
    }

    /// Creates a new exception with a text message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, msg: impl Display) -> Self {
        Self::new(exc_type, Some(ExcArg::Text(msg.to_string())))
    }

    /// Creates a new exception whose argument is an already rendered repr.
    #[must_use]
    pub fn new_repr(exc_type: ExcType, repr: String) -> Self {
        Self::new(exc_type, Some(ExcArg::Repr(repr)))
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&ExcArg> {
        self.arg.as_ref()
    }

    /// str() for an exception
    #[must_use]
    pub fn py_str(&self) -> String {
        match &self.arg {
            // KeyError shows its argument's repr, `str(KeyError('a')) == "'a'"`
            Some(ExcArg::Text(msg)) if self.exc_type == ExcType::KeyError => {
                let mut out = String::with_capacity(msg.len() + 2);
                // writing into a String cannot fail
                let _ = string_repr_fmt(msg, &mut out);
                out
            }
            Some(ExcArg::Text(msg)) => msg.clone(),
            Some(ExcArg::Repr(repr)) => repr.clone(),
            None => String::new(),
        }
    }

    /// Returns the exception formatted as Python would repr it.
    pub fn py_repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        let type_str: &'static str = self.exc_type.into();
        write!(f, "{type_str}(")?;
        match &self.arg {
            Some(ExcArg::Text(msg)) => string_repr_fmt(msg, f)?,
            Some(ExcArg::Repr(repr)) => f.write_str(repr)?,
            None => {}
        }
        f.write_char(')')
    }

    /// Formats the last line of a traceback, e.g. `KeyError: 'a'`.
    #[must_use]
    pub fn traceback_line(&self) -> String {
        let type_str: &'static str = self.exc_type.into();
        match &self.arg {
            None => type_str.to_owned(),
            Some(_) => format!("{type_str}: {}", self.py_str()),
        }
    }
}

/// Runtime error types that can occur during execution.
///
/// - `Internal`: a runtime bug, not a user-level exception
/// - `Exc`: Python exception that can be caught by try/except
/// - `UncatchableExc`: Python exception from resource limits that CANNOT be caught
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunError {
    /// Internal runtime error - indicates a bug in pyrite, not user code.
    Internal(Cow<'static, str>),
    /// Catchable Python exception (e.g., ValueError, TypeError).
    Exc(Box<SimpleException>),
    /// Uncatchable Python exception from resource limits (MemoryError).
    UncatchableExc(Box<SimpleException>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error in pyrite: {msg}"),
            Self::Exc(exc) | Self::UncatchableExc(exc) => f.write_str(&exc.traceback_line()),
        }
    }
}

impl std::error::Error for RunError {}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the exception carried by this error, if any.
    #[must_use]
    pub fn exception(&self) -> Option<&SimpleException> {
        match self {
            Self::Exc(exc) | Self::UncatchableExc(exc) => Some(exc),
            Self::Internal(_) => None,
        }
    }

    /// Returns true if this error is a StopIteration exception.
    #[must_use]
    pub fn is_stop_iteration(&self) -> bool {
        self.is_exception_type(ExcType::StopIteration)
    }

    /// Returns true if this error is a catchable exception of `exc_type`.
    #[must_use]
    pub fn is_exception_type(&self, exc_type: ExcType) -> bool {
        match self {
            Self::Exc(exc) => exc.exc_type() == exc_type,
            _ => false,
        }
    }

    /// Returns true if an `except handler_type:` clause would catch this error.
    #[must_use]
    pub fn matches(&self, handler_type: ExcType) -> bool {
        match self {
            Self::Exc(exc) => exc.exc_type().is_subclass_of(handler_type),
            _ => false,
        }
    }

    /// Returns the process exit status if this error is a `SystemExit`.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        let exc = self.exception()?;
        if exc.exc_type() != ExcType::SystemExit {
            return None;
        }
        match exc.arg() {
            None => Some(0),
            Some(ExcArg::Repr(code)) => Some(code.parse().unwrap_or(1)),
            Some(ExcArg::Text(_)) => Some(1),
        }
    }
}

/// Raises AssertionError when `condition` is false, with an optional message.
pub fn py_assert(condition: bool, msg: Option<&str>) -> RunResult<()> {
    if condition {
        return Ok(());
    }
    Err(match msg {
        Some(msg) => ExcType::AssertionError.with_msg(msg),
        None => SimpleException::new(ExcType::AssertionError, None).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_matches_python() {
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::IndexError.is_subclass_of(ExcType::Exception));
        assert!(ExcType::RecursionError.is_subclass_of(ExcType::RuntimeError));
        assert!(!ExcType::SystemExit.is_subclass_of(ExcType::Exception));
        assert!(ExcType::SystemExit.is_subclass_of(ExcType::BaseException));
        assert!(!ExcType::ValueError.is_subclass_of(ExcType::LookupError));
    }

    #[test]
    fn exc_type_parses_from_name() {
        let parsed: ExcType = "FileNotFoundError".parse().unwrap();
        assert_eq!(parsed, ExcType::FileNotFoundError);
        assert!(parsed.is_subclass_of(ExcType::OSError));
    }

    #[test]
    fn key_error_shows_key_repr() {
        let err = ExcType::key_error("'a'".to_owned());
        let exc = err.exception().unwrap();
        assert_eq!(exc.py_str(), "'a'");
        assert_eq!(exc.to_string(), "KeyError('a')");
        assert_eq!(err.to_string(), "KeyError: 'a'");
    }

    #[test]
    fn text_message_is_quoted_in_repr() {
        let err = ExcType::index_error("list index out of range");
        assert_eq!(
            err.exception().unwrap().to_string(),
            "IndexError('list index out of range')"
        );
    }

    #[test]
    fn system_exit_carries_status() {
        assert_eq!(ExcType::system_exit(3).exit_code(), Some(3));
        assert_eq!(ExcType::value_error("x").exit_code(), None);
        assert_eq!(ExcType::system_exit(0).to_string(), "SystemExit: 0");
    }

    #[test]
    fn assert_raises_assertion_error() {
        assert!(py_assert(true, None).is_ok());
        let err = py_assert(false, Some("boom")).unwrap_err();
        assert!(err.is_exception_type(ExcType::AssertionError));
        assert!(err.matches(ExcType::Exception));
    }
}
