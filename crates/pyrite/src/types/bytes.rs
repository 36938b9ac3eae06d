//! Python `bytes` and `bytearray`.
//!
//! Both share the read-only [`ByteSequence`] capability. Bytes methods only
//! recognize ASCII (0-127) for case transformations and predicates, unlike the
//! Unicode aware str methods. [`Bytes`] is an immutable shared value with a
//! memoized hash; [`ByteArray`] lives on the heap and alone implements
//! [`ByteSequenceMut`].

use std::{
    cell::Cell,
    cmp::Ordering,
    fmt::{self, Write},
    mem,
    rc::Rc,
};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, Ref},
    object::{DeepCopyMemo, HeapObject, PyObject},
    py_hash::hash_bytes,
    resource::ResourceTracker,
    sequence::{Sequence, sequence_for_in},
    slice::{SliceSpec, adjust_window, clamp_insert_index, wrap_index},
};

// =============================================================================
// ASCII byte helper functions
// =============================================================================

/// Returns true if the byte is Python ASCII whitespace.
///
/// Python considers these bytes as whitespace: space, tab, newline, carriage return,
/// vertical tab (0x0b), and form feed (0x0c). Note: Rust's `is_ascii_whitespace()`
/// does not include vertical tab (0x0b).
#[inline]
fn is_py_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Counts non-overlapping occurrences of needle in haystack.
fn count_non_overlapping(haystack: &[u8], needle: &[u8]) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if &haystack[pos..pos + needle.len()] == needle {
            count += 1;
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    count
}

/// Finds the first occurrence of needle in haystack.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Finds the last occurrence of needle in haystack.
fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(haystack.len());
    }
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

/// Splits bytes by a separator sequence, returning at most `limit + 1` parts.
fn splitn_by_seq<'a>(bytes: &'a [u8], sep: &[u8], limit: Option<usize>) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    while limit.is_none_or(|limit| parts.len() < limit) {
        let Some(pos) = find_subsequence(&bytes[start..], sep) else {
            break;
        };
        parts.push(&bytes[start..start + pos]);
        start += pos + sep.len();
    }
    parts.push(&bytes[start..]);
    parts
}

/// Splits bytes by a separator sequence from the right, returning at most `limit + 1` parts.
fn rsplitn_by_seq<'a>(bytes: &'a [u8], sep: &[u8], limit: Option<usize>) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut end = bytes.len();
    while limit.is_none_or(|limit| parts.len() < limit) {
        let Some(pos) = rfind_subsequence(&bytes[..end], sep) else {
            break;
        };
        parts.push(&bytes[pos + sep.len()..end]);
        end = pos;
    }
    parts.push(&bytes[..end]);
    parts.reverse();
    parts
}

/// Splits bytes by ASCII whitespace runs, returning at most `limit + 1` parts.
fn splitn_whitespace(bytes: &[u8], limit: Option<usize>) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut rest = strip_whitespace_start(bytes);
    while !rest.is_empty() {
        if limit.is_some_and(|limit| parts.len() >= limit) {
            parts.push(rest);
            break;
        }
        match rest.iter().position(|&b| is_py_whitespace(b)) {
            Some(end) => {
                parts.push(&rest[..end]);
                rest = strip_whitespace_start(&rest[end..]);
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

/// Splits bytes by ASCII whitespace runs from the right, returning at most `limit + 1` parts.
fn rsplitn_whitespace(bytes: &[u8], limit: Option<usize>) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut rest = strip_whitespace_end(bytes);
    while !rest.is_empty() {
        if limit.is_some_and(|limit| parts.len() >= limit) {
            parts.push(rest);
            break;
        }
        match rest.iter().rposition(|&b| is_py_whitespace(b)) {
            Some(start) => {
                parts.push(&rest[start + 1..]);
                rest = strip_whitespace_end(&rest[..start]);
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts.reverse();
    parts
}

fn strip_whitespace_start(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_py_whitespace(b)).unwrap_or(bytes.len());
    &bytes[start..]
}

fn strip_whitespace_end(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| !is_py_whitespace(b)).map_or(0, |i| i + 1);
    &bytes[..end]
}

fn strip_start<'a>(bytes: &'a [u8], chars: &[u8]) -> &'a [u8] {
    let start = bytes.iter().position(|b| !chars.contains(b)).unwrap_or(bytes.len());
    &bytes[start..]
}

fn strip_end<'a>(bytes: &'a [u8], chars: &[u8]) -> &'a [u8] {
    let end = bytes.iter().rposition(|b| !chars.contains(b)).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Replaces up to `count` occurrences (all when `None`); an empty `old` inserts
/// `new` between every byte and at both ends.
fn replace_bytes(bytes: &[u8], old: &[u8], new: &[u8], count: Option<usize>) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut replaced = 0;
    let under_limit = |replaced: usize| count.is_none_or(|count| replaced < count);
    if old.is_empty() {
        for &b in bytes {
            if under_limit(replaced) {
                out.extend_from_slice(new);
                replaced += 1;
            }
            out.push(b);
        }
        if under_limit(replaced) {
            out.extend_from_slice(new);
        }
        return out;
    }
    let mut start = 0;
    while under_limit(replaced) {
        let Some(pos) = find_subsequence(&bytes[start..], old) else {
            break;
        };
        out.extend_from_slice(&bytes[start..start + pos]);
        out.extend_from_slice(new);
        start += pos + old.len();
        replaced += 1;
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

/// Validates an integer destined for a byte slot.
fn byte_value(value: i64) -> RunResult<u8> {
    u8::try_from(value).map_err(|_| ExcType::value_error_byte_range())
}

/// Writes a CPython compatible bytes repr.
///
/// - Uses single quotes by default
/// - Switches to double quotes if bytes contain `'` but not `"`
/// - Escapes: `\\`, `\t`, `\n`, `\r`, `\xNN` for non-printable bytes
pub fn bytes_repr_fmt(bytes: &[u8], f: &mut impl Write) -> fmt::Result {
    let has_single = bytes.contains(&b'\'');
    let has_double = bytes.contains(&b'"');
    let quote = if has_single && !has_double { '"' } else { '\'' };

    f.write_char('b')?;
    f.write_char(quote)?;

    for &byte in bytes {
        match byte {
            b'\\' => f.write_str("\\\\")?,
            b'\t' => f.write_str("\\t")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\'' if quote == '\'' => f.write_str("\\'")?,
            b'"' if quote == '"' => f.write_str("\\\"")?,
            0x20..=0x7e => f.write_char(char::from(byte))?,
            _ => write!(f, "\\x{byte:02x}")?,
        }
    }

    f.write_char(quote)
}

#[must_use]
pub fn bytes_repr(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() + 3);
    // writing into a String cannot fail
    let _ = bytes_repr_fmt(bytes, &mut result);
    result
}

// =============================================================================
// Read-only capability
// =============================================================================

/// Operations shared by `bytes` and `bytearray`.
///
/// Results that are byte strings come back as `Self::Owned`: `Bytes` for bytes and
/// an unallocated `ByteArray` for bytearray, so `b.upper()` keeps its type.
/// All indices and windows are in bytes.
pub trait ByteSequence {
    type Owned: From<Vec<u8>>;

    fn as_bytes(&self) -> &[u8];

    fn byte_len(&self) -> usize {
        self.as_bytes().len()
    }

    /// `b[start:stop:step]`
    fn slice(&self, slice: SliceSpec) -> RunResult<Self::Owned> {
        let bytes = self.as_bytes();
        let indices = slice.indices(bytes.len())?;
        if indices.is_contiguous() {
            return Ok(bytes[indices.contiguous_range()].to_vec().into());
        }
        Ok(indices.positions().map(|index| bytes[index]).collect::<Vec<u8>>().into())
    }

    /// `sub in b`
    fn contains_subsequence(&self, sub: &[u8]) -> bool {
        find_subsequence(self.as_bytes(), sub).is_some()
    }

    /// `b + other`
    fn concat(&self, other: &[u8]) -> Self::Owned {
        let mut out = self.as_bytes().to_vec();
        out.extend_from_slice(other);
        out.into()
    }

    /// `b * n`; `n <= 0` gives an empty result.
    fn repeat(&self, times: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<Self::Owned> {
        let Ok(times) = usize::try_from(times) else {
            return Ok(Vec::new().into());
        };
        let total = self.byte_len().checked_mul(times).ok_or_else(ExcType::overflow_error_index)?;
        heap.check_large_result(total)?;
        Ok(self.as_bytes().repeat(times).into())
    }

    /// The window `[start:end]` when it is not inverted.
    fn window(&self, start: Option<i64>, end: Option<i64>) -> Option<(usize, &[u8])> {
        let bytes = self.as_bytes();
        let (start, end) = adjust_window(start, end, bytes.len());
        (start <= end).then(|| (start, &bytes[start..end]))
    }

    /// `b.find(sub, start, end)`, `-1` when absent.
    fn find(&self, sub: &[u8], start: Option<i64>, end: Option<i64>) -> i64 {
        self.window(start, end)
            .and_then(|(offset, window)| find_subsequence(window, sub).map(|found| offset + found))
            .map_or(-1, |found| i64::try_from(found).unwrap_or(i64::MAX))
    }

    fn rfind(&self, sub: &[u8], start: Option<i64>, end: Option<i64>) -> i64 {
        self.window(start, end)
            .and_then(|(offset, window)| rfind_subsequence(window, sub).map(|found| offset + found))
            .map_or(-1, |found| i64::try_from(found).unwrap_or(i64::MAX))
    }

    /// Like `find` but raises `ValueError: subsection not found`.
    fn index(&self, sub: &[u8], start: Option<i64>, end: Option<i64>) -> RunResult<usize> {
        usize::try_from(self.find(sub, start, end)).map_err(|_| ExcType::value_error("subsection not found"))
    }

    fn rindex(&self, sub: &[u8], start: Option<i64>, end: Option<i64>) -> RunResult<usize> {
        usize::try_from(self.rfind(sub, start, end)).map_err(|_| ExcType::value_error("subsection not found"))
    }

    fn count(&self, sub: &[u8], start: Option<i64>, end: Option<i64>) -> usize {
        match self.window(start, end) {
            None => 0,
            Some((_, window)) if sub.is_empty() => window.len() + 1,
            Some((_, window)) => count_non_overlapping(window, sub),
        }
    }

    fn startswith(&self, prefix: &[u8], start: Option<i64>, end: Option<i64>) -> bool {
        self.window(start, end).is_some_and(|(_, window)| window.starts_with(prefix))
    }

    fn endswith(&self, suffix: &[u8], start: Option<i64>, end: Option<i64>) -> bool {
        self.window(start, end).is_some_and(|(_, window)| window.ends_with(suffix))
    }

    /// `b.split(sep, maxsplit)`; `None` splits on ASCII whitespace runs.
    fn split(&self, sep: Option<&[u8]>, maxsplit: i64) -> RunResult<Vec<Self::Owned>> {
        let limit = usize::try_from(maxsplit).ok();
        let parts = match sep {
            None => splitn_whitespace(self.as_bytes(), limit),
            Some([]) => return Err(ExcType::value_error_empty_separator()),
            Some(sep) => splitn_by_seq(self.as_bytes(), sep, limit),
        };
        Ok(parts.into_iter().map(|part| part.to_vec().into()).collect())
    }

    fn rsplit(&self, sep: Option<&[u8]>, maxsplit: i64) -> RunResult<Vec<Self::Owned>> {
        let limit = usize::try_from(maxsplit).ok();
        let parts = match sep {
            None => rsplitn_whitespace(self.as_bytes(), limit),
            Some([]) => return Err(ExcType::value_error_empty_separator()),
            Some(sep) => rsplitn_by_seq(self.as_bytes(), sep, limit),
        };
        Ok(parts.into_iter().map(|part| part.to_vec().into()).collect())
    }

    /// `b.partition(sep)` as `(head, sep, tail)`.
    fn partition(&self, sep: &[u8]) -> RunResult<(Self::Owned, Self::Owned, Self::Owned)> {
        if sep.is_empty() {
            return Err(ExcType::value_error_empty_separator());
        }
        let bytes = self.as_bytes();
        Ok(match find_subsequence(bytes, sep) {
            Some(pos) => (
                bytes[..pos].to_vec().into(),
                sep.to_vec().into(),
                bytes[pos + sep.len()..].to_vec().into(),
            ),
            None => (bytes.to_vec().into(), Vec::new().into(), Vec::new().into()),
        })
    }

    fn rpartition(&self, sep: &[u8]) -> RunResult<(Self::Owned, Self::Owned, Self::Owned)> {
        if sep.is_empty() {
            return Err(ExcType::value_error_empty_separator());
        }
        let bytes = self.as_bytes();
        Ok(match rfind_subsequence(bytes, sep) {
            Some(pos) => (
                bytes[..pos].to_vec().into(),
                sep.to_vec().into(),
                bytes[pos + sep.len()..].to_vec().into(),
            ),
            None => (Vec::new().into(), Vec::new().into(), bytes.to_vec().into()),
        })
    }

    /// Splits at `\n`, `\r` and `\r\n` only.
    fn splitlines(&self, keepends: bool) -> Vec<Self::Owned> {
        let bytes = self.as_bytes();
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            let break_len = match (bytes[i], bytes.get(i + 1)) {
                (b'\r', Some(b'\n')) => 2,
                (b'\r' | b'\n', _) => 1,
                _ => {
                    i += 1;
                    continue;
                }
            };
            let line_end = if keepends { i + break_len } else { i };
            lines.push(bytes[line_start..line_end].to_vec().into());
            i += break_len;
            line_start = i;
        }
        if line_start < bytes.len() {
            lines.push(bytes[line_start..].to_vec().into());
        }
        lines
    }

    /// `b.strip(chars)`; `None` strips ASCII whitespace.
    fn strip(&self, chars: Option<&[u8]>) -> Self::Owned {
        let bytes = self.as_bytes();
        let stripped = match chars {
            None => strip_whitespace_end(strip_whitespace_start(bytes)),
            Some(chars) => strip_end(strip_start(bytes, chars), chars),
        };
        stripped.to_vec().into()
    }

    fn lstrip(&self, chars: Option<&[u8]>) -> Self::Owned {
        let bytes = self.as_bytes();
        match chars {
            None => strip_whitespace_start(bytes),
            Some(chars) => strip_start(bytes, chars),
        }
        .to_vec()
        .into()
    }

    fn rstrip(&self, chars: Option<&[u8]>) -> Self::Owned {
        let bytes = self.as_bytes();
        match chars {
            None => strip_whitespace_end(bytes),
            Some(chars) => strip_end(bytes, chars),
        }
        .to_vec()
        .into()
    }

    /// `b.replace(old, new, count)`; a negative count replaces every occurrence.
    fn replace(&self, old: &[u8], new: &[u8], count: i64) -> Self::Owned {
        replace_bytes(self.as_bytes(), old, new, usize::try_from(count).ok()).into()
    }

    /// `b.join(parts)`
    fn join<'a>(&self, parts: impl IntoIterator<Item = &'a [u8]>) -> Self::Owned {
        let mut out = Vec::new();
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                out.extend_from_slice(self.as_bytes());
            }
            out.extend_from_slice(part);
        }
        out.into()
    }

    fn lower(&self) -> Self::Owned {
        self.as_bytes().to_ascii_lowercase().into()
    }

    fn upper(&self) -> Self::Owned {
        self.as_bytes().to_ascii_uppercase().into()
    }

    /// First byte uppercase, rest lowercase.
    fn capitalize(&self) -> Self::Owned {
        let mut out = self.as_bytes().to_ascii_lowercase();
        if let Some(first) = out.first_mut() {
            first.make_ascii_uppercase();
        }
        out.into()
    }

    fn title(&self) -> Self::Owned {
        let mut out = Vec::with_capacity(self.byte_len());
        let mut previous_cased = false;
        for &b in self.as_bytes() {
            out.push(if previous_cased { b.to_ascii_lowercase() } else { b.to_ascii_uppercase() });
            previous_cased = b.is_ascii_alphabetic();
        }
        out.into()
    }

    fn swapcase(&self) -> Self::Owned {
        self.as_bytes()
            .iter()
            .map(|&b| {
                if b.is_ascii_uppercase() {
                    b.to_ascii_lowercase()
                } else {
                    b.to_ascii_uppercase()
                }
            })
            .collect::<Vec<u8>>()
            .into()
    }

    fn isalpha(&self) -> bool {
        let bytes = self.as_bytes();
        !bytes.is_empty() && bytes.iter().all(u8::is_ascii_alphabetic)
    }

    fn isdigit(&self) -> bool {
        let bytes = self.as_bytes();
        !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
    }

    fn isalnum(&self) -> bool {
        let bytes = self.as_bytes();
        !bytes.is_empty() && bytes.iter().all(u8::is_ascii_alphanumeric)
    }

    fn isspace(&self) -> bool {
        let bytes = self.as_bytes();
        !bytes.is_empty() && bytes.iter().all(|&b| is_py_whitespace(b))
    }

    /// Has cased bytes, all lowercase.
    fn islower(&self) -> bool {
        let bytes = self.as_bytes();
        bytes.iter().any(u8::is_ascii_lowercase) && !bytes.iter().any(u8::is_ascii_uppercase)
    }

    /// Has cased bytes, all uppercase.
    fn isupper(&self) -> bool {
        let bytes = self.as_bytes();
        bytes.iter().any(u8::is_ascii_uppercase) && !bytes.iter().any(u8::is_ascii_lowercase)
    }

    fn istitle(&self) -> bool {
        let mut previous_cased = false;
        let mut has_cased = false;
        for &b in self.as_bytes() {
            if b.is_ascii_uppercase() {
                if previous_cased {
                    return false;
                }
                previous_cased = true;
                has_cased = true;
            } else if b.is_ascii_lowercase() {
                if !previous_cased {
                    return false;
                }
                previous_cased = true;
                has_cased = true;
            } else {
                previous_cased = false;
            }
        }
        has_cased
    }

    /// True for empty input, like Python.
    fn isascii(&self) -> bool {
        self.as_bytes().is_ascii()
    }

    /// `b.center(width, fill)`
    fn center(&self, width: i64, fill: u8) -> Self::Owned {
        let len = self.byte_len();
        let Some(margin) = usize::try_from(width).ok().and_then(|w| w.checked_sub(len)) else {
            return self.as_bytes().to_vec().into();
        };
        let width_odd = usize::try_from(width).unwrap_or(0) & 1;
        let left = margin / 2 + (margin & width_odd);
        padded(self.as_bytes(), left, margin - left, fill).into()
    }

    fn ljust(&self, width: i64, fill: u8) -> Self::Owned {
        let margin = usize::try_from(width).unwrap_or(0).saturating_sub(self.byte_len());
        padded(self.as_bytes(), 0, margin, fill).into()
    }

    fn rjust(&self, width: i64, fill: u8) -> Self::Owned {
        let margin = usize::try_from(width).unwrap_or(0).saturating_sub(self.byte_len());
        padded(self.as_bytes(), margin, 0, fill).into()
    }

    /// Left pads with `0`, keeping a leading sign in front.
    fn zfill(&self, width: i64) -> Self::Owned {
        let bytes = self.as_bytes();
        let margin = usize::try_from(width).unwrap_or(0).saturating_sub(bytes.len());
        let (sign, digits) = match bytes.first() {
            Some(&sign @ (b'+' | b'-')) => (Some(sign), &bytes[1..]),
            _ => (None, bytes),
        };
        let mut out = Vec::with_capacity(bytes.len() + margin);
        out.extend(sign);
        out.resize(out.len() + margin, b'0');
        out.extend_from_slice(digits);
        out.into()
    }

    fn expandtabs(&self, tabsize: i64) -> Self::Owned {
        let tabsize = usize::try_from(tabsize).unwrap_or(0);
        let mut out = Vec::with_capacity(self.byte_len());
        let mut column = 0;
        for &b in self.as_bytes() {
            match b {
                b'\t' => {
                    if tabsize > 0 {
                        let spaces = tabsize - column % tabsize;
                        out.resize(out.len() + spaces, b' ');
                        column += spaces;
                    }
                }
                b'\n' | b'\r' => {
                    out.push(b);
                    column = 0;
                }
                _ => {
                    out.push(b);
                    column += 1;
                }
            }
        }
        out.into()
    }

    /// `b.hex(sep)`: two lowercase hex digits per byte, optionally separated.
    fn hex(&self, sep: Option<char>) -> String {
        let mut out = String::with_capacity(self.byte_len() * 3);
        for (index, byte) in self.as_bytes().iter().enumerate() {
            if index > 0
                && let Some(sep) = sep
            {
                out.push(sep);
            }
            // writing into a String cannot fail
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

fn padded(bytes: &[u8], left: usize, right: usize, fill: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + left + right);
    out.resize(left, fill);
    out.extend_from_slice(bytes);
    out.resize(out.len() + right, fill);
    out
}

// =============================================================================
// Mutable capability
// =============================================================================

/// In-place operations of `bytearray`. Integer arguments must be in `0..=255`.
pub trait ByteSequenceMut: ByteSequence {
    fn as_bytes_mut(&mut self) -> &mut Vec<u8>;

    fn append(&mut self, value: i64) -> RunResult<()> {
        let byte = byte_value(value)?;
        self.as_bytes_mut().push(byte);
        Ok(())
    }

    /// Inserts at a clamped position, like `list.insert`.
    fn insert(&mut self, index: i64, value: i64) -> RunResult<()> {
        let byte = byte_value(value)?;
        let bytes = self.as_bytes_mut();
        let index = clamp_insert_index(index, bytes.len());
        bytes.insert(index, byte);
        Ok(())
    }

    /// Removes the first occurrence of `value`.
    fn remove(&mut self, value: i64) -> RunResult<()> {
        let byte = byte_value(value)?;
        let bytes = self.as_bytes_mut();
        let index = bytes
            .iter()
            .position(|&b| b == byte)
            .ok_or_else(|| ExcType::value_error("value not found in bytearray"))?;
        bytes.remove(index);
        Ok(())
    }

    fn pop(&mut self) -> RunResult<i64> {
        self.as_bytes_mut()
            .pop()
            .map(i64::from)
            .ok_or_else(|| ExcType::index_error_pop_empty("bytearray"))
    }

    fn pop_at(&mut self, index: i64) -> RunResult<i64> {
        let bytes = self.as_bytes_mut();
        if bytes.is_empty() {
            return Err(ExcType::index_error_pop_empty("bytearray"));
        }
        let index = wrap_index(index, bytes.len()).ok_or_else(ExcType::index_error_pop_index)?;
        Ok(i64::from(bytes.remove(index)))
    }

    fn extend(&mut self, other: &[u8]) {
        self.as_bytes_mut().extend_from_slice(other);
    }

    /// Extends from integers, validating all of them before changing anything.
    fn extend_ints(&mut self, values: impl IntoIterator<Item = i64>) -> RunResult<()> {
        let bytes = values.into_iter().map(byte_value).collect::<RunResult<Vec<u8>>>()?;
        self.as_bytes_mut().extend(bytes);
        Ok(())
    }

    fn reverse(&mut self) {
        self.as_bytes_mut().reverse();
    }

    fn clear(&mut self) {
        self.as_bytes_mut().clear();
    }

    /// `ba[index] = value`
    fn set_item(&mut self, index: i64, value: i64) -> RunResult<()> {
        let byte = byte_value(value)?;
        let bytes = self.as_bytes_mut();
        let index = wrap_index(index, bytes.len()).ok_or_else(|| ExcType::index_error(BYTEARRAY_INDEX_ERROR))?;
        bytes[index] = byte;
        Ok(())
    }

    /// `ba[start:stop:step] = values`; extended slices require equal lengths.
    fn set_slice(&mut self, slice: SliceSpec, values: &[u8]) -> RunResult<()> {
        let bytes = self.as_bytes_mut();
        let indices = slice.indices(bytes.len())?;
        if indices.is_contiguous() {
            bytes.splice(indices.contiguous_range(), values.iter().copied());
            return Ok(());
        }
        if values.len() != indices.len {
            return Err(ExcType::value_error_extended_slice(values.len(), indices.len));
        }
        for (position, &value) in indices.positions().zip(values) {
            bytes[position] = value;
        }
        Ok(())
    }

    /// `del ba[start:stop:step]`
    fn delete_slice(&mut self, slice: SliceSpec) -> RunResult<()> {
        let bytes = self.as_bytes_mut();
        let indices = slice.indices(bytes.len())?;
        if indices.is_contiguous() {
            bytes.drain(indices.contiguous_range());
            return Ok(());
        }
        let mut doomed = vec![false; bytes.len()];
        for position in indices.positions() {
            doomed[position] = true;
        }
        let mut position = 0;
        bytes.retain(|_| {
            let keep = !doomed[position];
            position += 1;
            keep
        });
        Ok(())
    }
}

const BYTEARRAY_INDEX_ERROR: &str = "bytearray index out of range";

// =============================================================================
// bytes
// =============================================================================

/// Immutable Python `bytes`; clones share the data.
#[derive(Clone)]
pub struct Bytes(Rc<BytesData>);

struct BytesData {
    data: Box<[u8]>,
    hash: Cell<Option<u64>>,
}

impl Bytes {
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self(Rc::new(BytesData {
            data: data.into(),
            hash: Cell::new(None),
        }))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.data.is_empty()
    }

    /// `b[index]` as an int.
    pub fn get(&self, index: i64) -> RunResult<i64> {
        wrap_index(index, self.len())
            .map(|index| i64::from(self.0.data[index]))
            .ok_or_else(|| ExcType::index_error(<Self as Sequence>::INDEX_ERROR))
    }

    #[must_use]
    pub fn cached_hash(&self) -> u64 {
        if let Some(hash) = self.0.hash.get() {
            return hash;
        }
        let hash = hash_bytes(&self.0.data);
        self.0.hash.set(Some(hash));
        hash
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl<const N: usize> From<&[u8; N]> for Bytes {
    fn from(data: &[u8; N]) -> Self {
        Self::new(&data[..])
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", bytes_repr(&self.0.data))
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        self.0.data == other.0.data
    }
}

impl Eq for Bytes {}

impl PartialEq<[u8]> for Bytes {
    fn eq(&self, other: &[u8]) -> bool {
        *self.0.data == *other
    }
}

impl ByteSequence for Bytes {
    type Owned = Self;

    fn as_bytes(&self) -> &[u8] {
        &self.0.data
    }
}

impl PyObject for Bytes {
    fn type_name(&self) -> &'static str {
        "bytes"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(bytes_repr(&self.0.data))
    }

    fn py_hash(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(self.cached_hash())
    }

    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self == other)
    }

    fn py_cmp(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(self.0.data.cmp(&other.0.data))
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!self.is_empty())
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(self.len())
    }
}

impl Sequence for Bytes {
    type Item = i64;
    const INDEX_ERROR: &'static str = "index out of range";

    fn seq_len(&self, _heap: &Heap<impl ResourceTracker>) -> usize {
        self.len()
    }

    fn seq_item(&self, index: usize, _heap: &Heap<impl ResourceTracker>) -> Option<i64> {
        self.0.data.get(index).copied().map(i64::from)
    }
}

// =============================================================================
// bytearray
// =============================================================================

/// Mutable Python `bytearray`, owned by the heap and used through `Ref<ByteArray>`.
///
/// Read and write it with `heap.get(r)` / `heap.get_mut(r)` and the
/// [`ByteSequence`] / [`ByteSequenceMut`] methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteArray {
    data: Vec<u8>,
}

impl ByteArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a bytearray holding `data`.
    pub fn allocate(data: Vec<u8>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        heap.allocate(Self { data })
    }

    /// Snapshot as immutable `bytes`, `bytes(ba)`.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.data.as_slice())
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSequence for ByteArray {
    type Owned = Self;

    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSequenceMut for ByteArray {
    fn as_bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl HeapObject for ByteArray {
    const TYPE_NAME: &'static str = "bytearray";
    const HASHABLE: bool = false;

    fn estimate_size(&self) -> usize {
        mem::size_of::<Self>() + self.data.len()
    }

    fn py_repr(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(format!("bytearray({})", bytes_repr(&heap.get(this).data)))
    }

    fn py_eq(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(heap.get(this).data == heap.get(other).data)
    }

    fn py_cmp(this: Ref<Self>, other: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(heap.get(this).data.cmp(&heap.get(other).data))
    }

    fn py_bool(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!heap.get(this).data.is_empty())
    }

    fn py_len(this: Ref<Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(heap.get(this).data.len())
    }

    fn py_copy(this: Ref<Self>, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Ref<Self>> {
        let data = heap.get(this).data.clone();
        Self::allocate(data, heap)
    }

    fn py_deepcopy(
        this: Ref<Self>,
        heap: &mut Heap<impl ResourceTracker>,
        memo: &mut DeepCopyMemo,
    ) -> RunResult<Ref<Self>> {
        let copy = Self::py_copy(this, heap)?;
        memo.insert(this, copy);
        Ok(copy)
    }
}

impl Sequence for Ref<ByteArray> {
    type Item = i64;
    const INDEX_ERROR: &'static str = BYTEARRAY_INDEX_ERROR;

    fn seq_len(&self, heap: &Heap<impl ResourceTracker>) -> usize {
        heap.get(*self).data.len()
    }

    fn seq_item(&self, index: usize, heap: &Heap<impl ResourceTracker>) -> Option<i64> {
        heap.get(*self).data.get(index).copied().map(i64::from)
    }
}

sequence_for_in!([] Bytes, [] Ref<ByteArray>);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{iter::collect_vec, resource::NoLimitTracker};

    fn owned(parts: Vec<Bytes>) -> Vec<Vec<u8>> {
        parts.iter().map(|part| part.as_bytes().to_vec()).collect()
    }

    #[test]
    fn repr_escapes_and_quotes() {
        assert_eq!(bytes_repr(b"it's\n"), "b\"it's\\n\"");
        assert_eq!(bytes_repr(b"\x00\xffa"), "b'\\x00\\xffa'");
    }

    #[test]
    fn hash_is_memoized_and_matches_cpython() {
        let data = Bytes::from(b"abc");
        assert_eq!(data.cached_hash(), data.cached_hash());
        assert_eq!(data.cached_hash(), crate::py_hash::hash_str("abc"));
    }

    #[test]
    fn search_and_split() {
        let data = Bytes::from(b"a,b,,c");
        assert_eq!(data.find(b",", Some(2), None), 3);
        assert_eq!(data.rfind(b",", None, None), 4);
        assert_eq!(data.count(b",", None, None), 3);
        assert_eq!(data.count(b"", None, None), 7);
        assert_eq!(
            owned(data.split(Some(b",".as_slice()), 2).unwrap()),
            vec![b"a".to_vec(), b"b".to_vec(), b",c".to_vec()]
        );
        assert_eq!(
            owned(data.rsplit(Some(b",".as_slice()), 1).unwrap()),
            vec![b"a,b,".to_vec(), b"c".to_vec()]
        );
        assert_eq!(
            owned(Bytes::from(b" x  y ").split(None, -1).unwrap()),
            vec![b"x".to_vec(), b"y".to_vec()]
        );
        let err = data.index(b"z", None, None).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: subsection not found");
    }

    #[test]
    fn transforms() {
        assert_eq!(Bytes::from(b"hello world").title(), Bytes::from(b"Hello World"));
        assert_eq!(Bytes::from(b"aXb").swapcase(), Bytes::from(b"AxB"));
        assert_eq!(Bytes::from(b"aa").replace(b"", b"-", -1), Bytes::from(b"-a-a-"));
        assert_eq!(Bytes::from(b"-7").zfill(4), Bytes::from(b"-007"));
        assert_eq!(Bytes::from(b"\x01\xab").hex(Some(':')), "01:ab");
        assert!(!Bytes::from(b"").isalpha());
        assert!(Bytes::from(b"").isascii());
    }

    #[test]
    fn bytearray_mutation() {
        let mut heap = Heap::new(NoLimitTracker);
        let array = ByteArray::allocate(b"abc".to_vec(), &mut heap).unwrap();
        heap.get_mut(array).append(100).unwrap();
        let err = heap.get_mut(array).append(256).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: byte must be in range(0, 256)");
        heap.get_mut(array).set_slice(SliceSpec::stepped(2), b"XY").unwrap();
        assert_eq!(heap.get(array).as_bytes(), b"XbYd");
        heap.get_mut(array).delete_slice(SliceSpec::range(Some(1), Some(3))).unwrap();
        assert_eq!(heap.get(array).as_bytes(), b"Xd");
        assert_eq!(collect_vec(&array, &heap).unwrap(), vec![88, 100]);
        assert_eq!(array.py_repr(&heap).unwrap(), "bytearray(b'Xd')");
        assert!(array.py_hash(&heap).is_err());
        assert_eq!(array.seq_get(5, &heap).unwrap_err().to_string(), "IndexError: bytearray index out of range");
    }
}
