//! Python `str`: an immutable, shared, char indexed text value.
//!
//! All index arithmetic is in characters (code points) like Python. ASCII text,
//! the common case, takes byte offset fast paths.

use std::{
    cell::{Cell, OnceCell},
    cmp::Ordering,
    fmt::{self, Write},
    hash::{Hash, Hasher},
    rc::Rc,
};

use ahash::AHashMap;
use unicode_casefold::UnicodeCaseFold;

use crate::{
    exception::{ExcType, RunResult},
    heap::Heap,
    iter::{ForIn, collect_vec},
    object::PyObject,
    py_hash::hash_str,
    resource::ResourceTracker,
    sequence::{Sequence, sequence_for_in},
    slice::{SliceSpec, adjust_window, wrap_index},
    types::Tuple,
};

#[derive(Clone)]
pub struct Str(Rc<StrData>);

struct StrData {
    text: Box<str>,
    char_len: usize,
    /// Memoized `hash(s)`; equal text always produces the same value.
    hash: Cell<Option<u64>>,
    /// Byte offset of every character, built on first index into non-ASCII text.
    char_offsets: OnceCell<Box<[usize]>>,
}

impl Str {
    pub fn new(text: impl Into<Box<str>>) -> Self {
        let text = text.into();
        let char_len = if text.is_ascii() { text.len() } else { text.chars().count() };
        Self(Rc::new(StrData {
            text,
            char_len,
            hash: Cell::new(None),
            char_offsets: OnceCell::new(),
        }))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Length in characters, `len(s)`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.char_len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.char_len == 0
    }

    fn is_ascii(&self) -> bool {
        self.0.text.len() == self.0.char_len
    }

    /// Memoized CPython compatible hash.
    #[must_use]
    pub fn cached_hash(&self) -> u64 {
        if let Some(hash) = self.0.hash.get() {
            return hash;
        }
        let hash = hash_str(&self.0.text);
        self.0.hash.set(Some(hash));
        hash
    }

    fn char_offsets(&self) -> &[usize] {
        self.0
            .char_offsets
            .get_or_init(|| self.0.text.char_indices().map(|(offset, _)| offset).collect())
    }

    /// Byte offset of the character at `char_index`, or the text length past the end.
    fn byte_offset(&self, char_index: usize) -> usize {
        if self.is_ascii() {
            return char_index.min(self.0.text.len());
        }
        self.char_offsets().get(char_index).copied().unwrap_or(self.0.text.len())
    }

    fn char_index_of(&self, byte_offset: usize) -> usize {
        if self.is_ascii() {
            byte_offset
        } else {
            self.char_offsets().partition_point(|&offset| offset < byte_offset)
        }
    }

    fn char_at(&self, index: usize) -> Option<char> {
        if self.is_ascii() {
            self.0.text.as_bytes().get(index).map(|&byte| char::from(byte))
        } else {
            let offset = *self.char_offsets().get(index)?;
            self.0.text[offset..].chars().next()
        }
    }

    /// `s[index]`
    pub fn get(&self, index: i64) -> RunResult<Self> {
        wrap_index(index, self.len())
            .and_then(|index| self.char_at(index))
            .map(Self::from)
            .ok_or_else(|| ExcType::index_error(<Self as Sequence>::INDEX_ERROR))
    }

    /// `s[start:stop:step]`
    pub fn get_slice(&self, slice: SliceSpec) -> RunResult<Self> {
        let indices = slice.indices(self.len())?;
        if indices.is_contiguous() {
            let range = indices.contiguous_range();
            let (lo, hi) = (self.byte_offset(range.start), self.byte_offset(range.end));
            return Ok(Self::from(&self.0.text[lo..hi]));
        }
        let text: String = if self.is_ascii() {
            let bytes = self.0.text.as_bytes();
            indices.positions().map(|index| char::from(bytes[index])).collect()
        } else {
            let chars: Vec<char> = self.0.text.chars().collect();
            indices.positions().map(|index| chars[index]).collect()
        };
        Ok(Self::from(text))
    }

    /// `sub in s`
    #[must_use]
    pub fn contains(&self, sub: &str) -> bool {
        self.0.text.contains(sub)
    }

    /// `s + other`
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut text = String::with_capacity(self.0.text.len() + other.0.text.len());
        text.push_str(&self.0.text);
        text.push_str(&other.0.text);
        Self::from(text)
    }

    /// `s * n`; `n <= 0` gives the empty string.
    pub fn multiply(&self, times: i64, heap: &Heap<impl ResourceTracker>) -> RunResult<Self> {
        let Ok(times) = usize::try_from(times) else {
            return Ok(Self::from(""));
        };
        let total = self.0.text.len().checked_mul(times).ok_or_else(ExcType::overflow_error_index)?;
        heap.check_large_result(total)?;
        Ok(Self::from(self.0.text.repeat(times)))
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Locates `sub` inside the `[start:end]` window, returning a char index.
    ///
    /// A window that starts past its end, or is shorter than `sub`, finds nothing
    /// even for an empty `sub`.
    fn search(&self, sub: &str, start: Option<i64>, end: Option<i64>, from_right: bool) -> Option<usize> {
        let (start, end) = adjust_window(start, end, self.len());
        if start > end || end - start < sub.chars().count() {
            return None;
        }
        let (lo, hi) = (self.byte_offset(start), self.byte_offset(end));
        let haystack = &self.0.text[lo..hi];
        let found = if from_right { haystack.rfind(sub) } else { haystack.find(sub) }?;
        Some(self.char_index_of(lo + found))
    }

    /// `s.find(sub, start, end)`, `-1` when absent.
    #[must_use]
    pub fn find(&self, sub: &str, start: Option<i64>, end: Option<i64>) -> i64 {
        self.search(sub, start, end, false).map_or(-1, index_to_i64)
    }

    #[must_use]
    pub fn rfind(&self, sub: &str, start: Option<i64>, end: Option<i64>) -> i64 {
        self.search(sub, start, end, true).map_or(-1, index_to_i64)
    }

    /// Like [`Str::find`] but raises `ValueError: substring not found`.
    pub fn index(&self, sub: &str, start: Option<i64>, end: Option<i64>) -> RunResult<usize> {
        self.search(sub, start, end, false)
            .ok_or_else(|| ExcType::value_error("substring not found"))
    }

    pub fn rindex(&self, sub: &str, start: Option<i64>, end: Option<i64>) -> RunResult<usize> {
        self.search(sub, start, end, true)
            .ok_or_else(|| ExcType::value_error("substring not found"))
    }

    /// Non-overlapping occurrences of `sub` inside the window.
    #[must_use]
    pub fn count(&self, sub: &str, start: Option<i64>, end: Option<i64>) -> usize {
        let (start, end) = adjust_window(start, end, self.len());
        if start > end {
            return 0;
        }
        if sub.is_empty() {
            return end - start + 1;
        }
        let (lo, hi) = (self.byte_offset(start), self.byte_offset(end));
        self.0.text[lo..hi].matches(sub).count()
    }

    #[must_use]
    pub fn startswith(&self, prefix: &str, start: Option<i64>, end: Option<i64>) -> bool {
        self.window(start, end).is_some_and(|window| window.starts_with(prefix))
    }

    #[must_use]
    pub fn endswith(&self, suffix: &str, start: Option<i64>, end: Option<i64>) -> bool {
        self.window(start, end).is_some_and(|window| window.ends_with(suffix))
    }

    fn window(&self, start: Option<i64>, end: Option<i64>) -> Option<&str> {
        let (start, end) = adjust_window(start, end, self.len());
        if start > end {
            return None;
        }
        Some(&self.0.text[self.byte_offset(start)..self.byte_offset(end)])
    }

    // =========================================================================
    // Split / join
    // =========================================================================

    /// `s.split(sep, maxsplit)`; `sep = None` splits on whitespace runs and drops
    /// empty parts, a negative `maxsplit` means no limit.
    pub fn split(&self, sep: Option<&str>, maxsplit: i64) -> RunResult<Vec<Self>> {
        let limit = usize::try_from(maxsplit).ok();
        let parts: Vec<&str> = match sep {
            None => split_whitespace(&self.0.text, limit),
            Some("") => return Err(ExcType::value_error_empty_separator()),
            Some(sep) => match limit {
                None => self.0.text.split(sep).collect(),
                Some(limit) => self.0.text.splitn(limit + 1, sep).collect(),
            },
        };
        Ok(parts.into_iter().map(Self::from).collect())
    }

    /// `s.rsplit(sep, maxsplit)`, splitting from the right.
    pub fn rsplit(&self, sep: Option<&str>, maxsplit: i64) -> RunResult<Vec<Self>> {
        let limit = usize::try_from(maxsplit).ok();
        let mut parts: Vec<&str> = match sep {
            None => rsplit_whitespace(&self.0.text, limit),
            Some("") => return Err(ExcType::value_error_empty_separator()),
            Some(sep) => match limit {
                None => self.0.text.rsplit(sep).collect(),
                Some(limit) => self.0.text.rsplitn(limit + 1, sep).collect(),
            },
        };
        if sep.is_some() {
            parts.reverse();
        }
        Ok(parts.into_iter().map(Self::from).collect())
    }

    /// `s.partition(sep)`: `(head, sep, tail)`, or `(s, '', '')` when absent.
    pub fn partition(&self, sep: &str) -> RunResult<Tuple<Self>> {
        if sep.is_empty() {
            return Err(ExcType::value_error_empty_separator());
        }
        Ok(match self.0.text.split_once(sep) {
            Some((head, tail)) => Tuple::from([Self::from(head), Self::from(sep), Self::from(tail)]),
            None => Tuple::from([self.clone(), Self::from(""), Self::from("")]),
        })
    }

    /// `s.rpartition(sep)`: `('', '', s)` when absent.
    pub fn rpartition(&self, sep: &str) -> RunResult<Tuple<Self>> {
        if sep.is_empty() {
            return Err(ExcType::value_error_empty_separator());
        }
        Ok(match self.0.text.rsplit_once(sep) {
            Some((head, tail)) => Tuple::from([Self::from(head), Self::from(sep), Self::from(tail)]),
            None => Tuple::from([Self::from(""), Self::from(""), self.clone()]),
        })
    }

    /// `s.splitlines(keepends)`, breaking at every Unicode line boundary.
    #[must_use]
    pub fn splitlines(&self, keepends: bool) -> Vec<Self> {
        let text = &*self.0.text;
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            if !is_line_break(c) {
                continue;
            }
            let mut break_end = offset + c.len_utf8();
            if c == '\r' && chars.peek().is_some_and(|&(_, next)| next == '\n') {
                chars.next();
                break_end += 1;
            }
            let line_end = if keepends { break_end } else { offset };
            lines.push(Self::from(&text[line_start..line_end]));
            line_start = break_end;
        }
        if line_start < text.len() {
            lines.push(Self::from(&text[line_start..]));
        }
        lines
    }

    /// `s.join(iterable)`
    pub fn join(&self, items: &impl ForIn<Item = Self>, heap: &Heap<impl ResourceTracker>) -> RunResult<Self> {
        let items = collect_vec(items, heap)?;
        let parts: Vec<&str> = items.iter().map(Self::as_str).collect();
        Ok(Self::from(parts.join(self.as_str())))
    }

    // =========================================================================
    // Strip / replace / pad
    // =========================================================================

    /// `s.strip(chars)`; `None` strips whitespace.
    #[must_use]
    pub fn strip(&self, chars: Option<&str>) -> Self {
        match chars {
            None => Self::from(self.0.text.trim_matches(is_py_space)),
            Some(set) => Self::from(self.0.text.trim_matches(|c| set.contains(c))),
        }
    }

    #[must_use]
    pub fn lstrip(&self, chars: Option<&str>) -> Self {
        match chars {
            None => Self::from(self.0.text.trim_start_matches(is_py_space)),
            Some(set) => Self::from(self.0.text.trim_start_matches(|c| set.contains(c))),
        }
    }

    #[must_use]
    pub fn rstrip(&self, chars: Option<&str>) -> Self {
        match chars {
            None => Self::from(self.0.text.trim_end_matches(is_py_space)),
            Some(set) => Self::from(self.0.text.trim_end_matches(|c| set.contains(c))),
        }
    }

    /// `s.replace(old, new, count)`; a negative count replaces every occurrence.
    #[must_use]
    pub fn replace(&self, old: &str, new: &str, count: i64) -> Self {
        match usize::try_from(count) {
            Ok(count) => Self::from(self.0.text.replacen(old, new, count)),
            Err(_) => Self::from(self.0.text.replace(old, new)),
        }
    }

    /// `s.center(width, fill)`, extra padding going right like CPython.
    #[must_use]
    pub fn center(&self, width: i64, fill: char) -> Self {
        let Some(margin) = self.margin(width) else {
            return self.clone();
        };
        let width_odd = usize::try_from(width).unwrap_or(0) & 1;
        let left = margin / 2 + (margin & width_odd);
        self.pad(left, margin - left, fill)
    }

    #[must_use]
    pub fn ljust(&self, width: i64, fill: char) -> Self {
        self.margin(width).map_or_else(|| self.clone(), |margin| self.pad(0, margin, fill))
    }

    #[must_use]
    pub fn rjust(&self, width: i64, fill: char) -> Self {
        self.margin(width).map_or_else(|| self.clone(), |margin| self.pad(margin, 0, fill))
    }

    /// `s.zfill(width)`: left pads with zeros, keeping a leading sign in front.
    #[must_use]
    pub fn zfill(&self, width: i64) -> Self {
        let Some(margin) = self.margin(width) else {
            return self.clone();
        };
        let text = &*self.0.text;
        let (sign, digits) = match text.chars().next() {
            Some(sign @ ('+' | '-')) => (Some(sign), &text[1..]),
            _ => (None, text),
        };
        let mut out = String::with_capacity(text.len() + margin);
        out.extend(sign);
        out.extend(std::iter::repeat_n('0', margin));
        out.push_str(digits);
        Self::from(out)
    }

    /// `s.expandtabs(tabsize)`; columns restart after `\n` and `\r`.
    #[must_use]
    pub fn expandtabs(&self, tabsize: i64) -> Self {
        let tabsize = usize::try_from(tabsize).unwrap_or(0);
        let mut out = String::with_capacity(self.0.text.len());
        let mut column = 0;
        for c in self.0.text.chars() {
            match c {
                '\t' => {
                    if tabsize > 0 {
                        let spaces = tabsize - column % tabsize;
                        out.extend(std::iter::repeat_n(' ', spaces));
                        column += spaces;
                    }
                }
                '\n' | '\r' => {
                    out.push(c);
                    column = 0;
                }
                _ => {
                    out.push(c);
                    column += 1;
                }
            }
        }
        Self::from(out)
    }

    fn margin(&self, width: i64) -> Option<usize> {
        let width = usize::try_from(width).ok()?;
        width.checked_sub(self.len()).filter(|&margin| margin > 0)
    }

    fn pad(&self, left: usize, right: usize, fill: char) -> Self {
        let mut out = String::with_capacity(self.0.text.len() + (left + right) * fill.len_utf8());
        out.extend(std::iter::repeat_n(fill, left));
        out.push_str(&self.0.text);
        out.extend(std::iter::repeat_n(fill, right));
        Self::from(out)
    }

    /// `s.translate(table)`: mapped characters are replaced, those mapped to
    /// `None` are deleted, the rest are kept.
    #[must_use]
    pub fn translate(&self, table: &AHashMap<char, Option<String>>) -> Self {
        let mut out = String::with_capacity(self.0.text.len());
        for c in self.0.text.chars() {
            match table.get(&c) {
                None => out.push(c),
                Some(Some(replacement)) => out.push_str(replacement),
                Some(None) => {}
            }
        }
        Self::from(out)
    }

    // =========================================================================
    // Case transforms
    // =========================================================================

    #[must_use]
    pub fn upper(&self) -> Self {
        Self::from(self.0.text.to_uppercase())
    }

    #[must_use]
    pub fn lower(&self) -> Self {
        Self::from(self.0.text.to_lowercase())
    }

    /// Aggressive lowercasing for caseless matching, `'ß'.casefold() == 'ss'`.
    #[must_use]
    pub fn casefold(&self) -> Self {
        Self::from(self.0.text.chars().case_fold().collect::<String>())
    }

    #[must_use]
    pub fn swapcase(&self) -> Self {
        let mut out = String::with_capacity(self.0.text.len());
        for c in self.0.text.chars() {
            if c.is_uppercase() {
                out.extend(c.to_lowercase());
            } else if c.is_lowercase() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
        }
        Self::from(out)
    }

    /// First character uppercased, the rest lowercased.
    #[must_use]
    pub fn capitalize(&self) -> Self {
        let mut chars = self.0.text.chars();
        let Some(first) = chars.next() else {
            return self.clone();
        };
        let mut out: String = first.to_uppercase().collect();
        out.extend(chars.flat_map(char::to_lowercase));
        Self::from(out)
    }

    /// Uppercases the first cased character of every word, lowercasing the rest.
    #[must_use]
    pub fn title(&self) -> Self {
        let mut out = String::with_capacity(self.0.text.len());
        let mut previous_cased = false;
        for c in self.0.text.chars() {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_cased = is_cased(c);
        }
        Self::from(out)
    }

    // =========================================================================
    // Classification predicates: all false for the empty string
    // =========================================================================

    fn all_chars(&self, predicate: impl Fn(char) -> bool) -> bool {
        !self.is_empty() && self.0.text.chars().all(predicate)
    }

    #[must_use]
    pub fn isalpha(&self) -> bool {
        self.all_chars(char::is_alphabetic)
    }

    #[must_use]
    pub fn isdigit(&self) -> bool {
        self.all_chars(|c| is_decimal(c) || is_digit_only(c))
    }

    #[must_use]
    pub fn isdecimal(&self) -> bool {
        self.all_chars(is_decimal)
    }

    #[must_use]
    pub fn isnumeric(&self) -> bool {
        self.all_chars(char::is_numeric)
    }

    #[must_use]
    pub fn isalnum(&self) -> bool {
        self.all_chars(char::is_alphanumeric)
    }

    #[must_use]
    pub fn isspace(&self) -> bool {
        self.all_chars(is_py_space)
    }

    /// At least one cased character and no lowercase ones.
    #[must_use]
    pub fn isupper(&self) -> bool {
        let text = &*self.0.text;
        text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
    }

    #[must_use]
    pub fn islower(&self) -> bool {
        let text = &*self.0.text;
        text.chars().any(char::is_lowercase) && !text.chars().any(char::is_uppercase)
    }

    /// Uppercase characters only follow uncased ones and lowercase characters
    /// only follow cased ones.
    #[must_use]
    pub fn istitle(&self) -> bool {
        let mut previous_cased = false;
        let mut has_cased = false;
        for c in self.0.text.chars() {
            if c.is_uppercase() {
                if previous_cased {
                    return false;
                }
                previous_cased = true;
                has_cased = true;
            } else if c.is_lowercase() {
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

    #[must_use]
    pub fn isidentifier(&self) -> bool {
        let mut chars = self.0.text.chars();
        chars
            .next()
            .is_some_and(|first| first == '_' || first.is_alphabetic())
            && chars.all(|c| c == '_' || c.is_alphanumeric())
    }

    #[must_use]
    pub fn isprintable(&self) -> bool {
        self.all_chars(is_printable)
    }

    /// True for the empty string, like Python.
    #[must_use]
    pub fn isascii(&self) -> bool {
        self.is_ascii()
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// `int(s, base)`, accepting surrounding whitespace, a sign, `_` digit
    /// separators and the `0x`/`0o`/`0b` prefix matching `base` (any of them for base 0).
    pub fn to_int(&self, base: u32) -> RunResult<i64> {
        if base == 1 || base > 36 {
            return Err(ExcType::value_error_int_base());
        }
        parse_int(self.0.text.trim_matches(is_py_space), base)
            .ok_or_else(|| ExcType::value_error_invalid_int_literal(base, &self.repr()))?
    }

    /// Python `repr(s)`.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut out = String::with_capacity(self.0.text.len() + 2);
        // writing into a String cannot fail
        let _ = string_repr_fmt(&self.0.text, &mut out);
        out
    }
}

fn index_to_i64(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Parses the digits of an int literal. `None` means malformed; `Some(Err)` means
/// well formed but too large.
fn parse_int(text: &str, base: u32) -> Option<RunResult<i64>> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let prefix = unsigned.get(..2).map(str::to_ascii_lowercase);
    let prefixed_base = match prefix.as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let (radix, digits, has_prefix) = match (base, prefixed_base) {
        (0, Some(radix)) => (radix, &unsigned[2..], true),
        (0, None) => (10, unsigned, false),
        (base, Some(radix)) if base == radix => (radix, &unsigned[2..], true),
        (base, _) => (base, unsigned, false),
    };

    let mut magnitude: u128 = 0;
    let mut seen_digit = false;
    let mut previous_underscore = false;
    for c in digits.chars() {
        if c == '_' {
            // single separators only, after a digit or directly after the prefix
            if previous_underscore || (!seen_digit && !has_prefix) {
                return None;
            }
            previous_underscore = true;
            continue;
        }
        let digit = c.to_digit(radix)?;
        magnitude = magnitude.saturating_mul(u128::from(radix)).saturating_add(u128::from(digit));
        seen_digit = true;
        previous_underscore = false;
    }
    if !seen_digit || previous_underscore {
        return None;
    }
    // base 0 rejects leading zeros on non-zero decimals, `010`
    if base == 0 && !has_prefix && magnitude != 0 && digits.starts_with('0') {
        return None;
    }

    let limit = if negative { 1_u128 << 63 } else { (1_u128 << 63) - 1 };
    if magnitude > limit {
        return Some(Err(ExcType::OverflowError.with_msg("int too large to convert to int64")));
    }
    let value = i128::try_from(magnitude).unwrap_or(i128::MAX);
    let value = if negative { -value } else { value };
    Some(Ok(i64::try_from(value).unwrap_or(i64::MAX)))
}

fn split_whitespace(text: &str, limit: Option<usize>) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start_matches(is_py_space);
    while !rest.is_empty() {
        if limit.is_some_and(|limit| parts.len() >= limit) {
            parts.push(rest);
            break;
        }
        match rest.find(is_py_space) {
            Some(end) => {
                parts.push(&rest[..end]);
                rest = rest[end..].trim_start_matches(is_py_space);
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

fn rsplit_whitespace(text: &str, limit: Option<usize>) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text.trim_end_matches(is_py_space);
    while !rest.is_empty() {
        if limit.is_some_and(|limit| parts.len() >= limit) {
            parts.push(rest);
            break;
        }
        match rest.char_indices().rev().find(|&(_, c)| is_py_space(c)) {
            Some((start, c)) => {
                parts.push(&rest[start + c.len_utf8()..]);
                rest = rest[..start].trim_end_matches(is_py_space);
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

/// Python's `str.isspace` set: Unicode White_Space plus the ASCII separators 0x1c-0x1f.
#[must_use]
pub fn is_py_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// First code point of every run of ten decimal digits (general category Nd).
const DECIMAL_ZEROS: [u32; 68] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66, 0x0CE6, 0x0D66, 0x0DE6,
    0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946, 0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40,
    0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0, 0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0,
    0x11136, 0x111D0, 0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140, 0x1E2F0,
    0x1E4F0, 0x1E950, 0x1FBF0,
];

fn is_decimal(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_digit();
    }
    let code = u32::from(c);
    let run = DECIMAL_ZEROS.partition_point(|&zero| zero <= code);
    run > 0 && code - DECIMAL_ZEROS[run - 1] < 10
}

/// Digits that are not decimal: superscripts, subscripts, circled and
/// parenthesized digits, and a few script specific digit forms.
fn is_digit_only(c: char) -> bool {
    matches!(
        c,
        '\u{b2}'
            | '\u{b3}'
            | '\u{b9}'
            | '\u{1369}'..='\u{1371}'
            | '\u{19da}'
            | '\u{2070}'
            | '\u{2074}'..='\u{2079}'
            | '\u{2080}'..='\u{2089}'
            | '\u{2460}'..='\u{2468}'
            | '\u{2474}'..='\u{247c}'
            | '\u{2488}'..='\u{2490}'
            | '\u{24ea}'
            | '\u{24f5}'..='\u{24fd}'
            | '\u{24ff}'
            | '\u{2776}'..='\u{277e}'
            | '\u{2780}'..='\u{2788}'
            | '\u{278a}'..='\u{2792}'
            | '\u{10a40}'..='\u{10a43}'
            | '\u{10e60}'..='\u{10e68}'
            | '\u{11052}'..='\u{1105a}'
            | '\u{1f100}'..='\u{1f10a}'
    )
}

fn is_printable(c: char) -> bool {
    if c.is_ascii() {
        return (' '..='~').contains(&c);
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}' | '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2060}'..='\u{2064}' | '\u{feff}' | '\u{e000}'..='\u{f8ff}'
        ))
}

/// Writes `text` the way Python's `repr()` does.
///
/// - Uses single quotes by default
/// - Switches to double quotes if the text contains `'` but not `"`
/// - Escapes `\\`, `\t`, `\n`, `\r`, the active quote, and non-printable
///   characters as `\xNN`, `\uNNNN` or `\UNNNNNNNN`
pub fn string_repr_fmt(text: &str, f: &mut impl Write) -> fmt::Result {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\t' => f.write_str("\\t")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if is_printable(c) => f.write_char(c)?,
            c => match u32::from(c) {
                code @ 0..=0xff => write!(f, "\\x{code:02x}")?,
                code @ 0x100..=0xffff => write!(f, "\\u{code:04x}")?,
                code => write!(f, "\\U{code:08x}")?,
            },
        }
    }
    f.write_char(quote)
}

impl From<&str> for Str {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Str {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<char> for Str {
    fn from(c: char) -> Self {
        Self::new(c.to_string())
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Str({:?})", self.as_str())
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.text == other.0.text
    }
}

impl Eq for Str {}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        &*self.0.text == *other
    }
}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.text.hash(state);
    }
}

impl PartialOrd for Str {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Str {
    /// UTF-8 byte order equals code point order, which is Python's str order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.text.cmp(&other.0.text)
    }
}

impl PyObject for Str {
    fn type_name(&self) -> &'static str {
        "str"
    }

    fn py_repr(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(self.repr())
    }

    fn py_str(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<String> {
        Ok(self.as_str().to_owned())
    }

    fn py_hash(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
        Ok(self.cached_hash())
    }

    fn py_eq(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(self == other)
    }

    fn py_cmp(&self, other: &Self, _heap: &Heap<impl ResourceTracker>) -> RunResult<Ordering> {
        Ok(self.cmp(other))
    }

    fn py_bool(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<bool> {
        Ok(!self.is_empty())
    }

    fn py_len(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<usize> {
        Ok(self.len())
    }

    fn py_int(&self, _heap: &Heap<impl ResourceTracker>) -> RunResult<i64> {
        self.to_int(10)
    }
}

impl Sequence for Str {
    type Item = Self;
    const INDEX_ERROR: &'static str = "string index out of range";

    fn seq_len(&self, _heap: &Heap<impl ResourceTracker>) -> usize {
        self.len()
    }

    fn seq_item(&self, index: usize, _heap: &Heap<impl ResourceTracker>) -> Option<Self> {
        self.char_at(index).map(Self::from)
    }
}

sequence_for_in!([] Str);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strs(parts: &[Str]) -> Vec<&str> {
        parts.iter().map(Str::as_str).collect()
    }

    #[test]
    fn slicing() {
        let hello = Str::from("hello");
        assert_eq!(hello.get_slice(SliceSpec::range(Some(1), Some(-1))).unwrap(), "ell");
        assert_eq!(hello.get_slice(SliceSpec::stepped(-1)).unwrap(), "olleh");
        assert_eq!(Str::from("héllo").get_slice(SliceSpec::stepped(2)).unwrap(), "hlo");
        assert_eq!(hello.get(-1).unwrap(), "o");
        assert_eq!(hello.get(5).unwrap_err().to_string(), "IndexError: string index out of range");
    }

    #[test]
    fn non_ascii_indexing_and_iteration() {
        let text = Str::from("añb日c");
        assert_eq!(text.len(), 5);
        assert_eq!(text.get(1).unwrap(), "ñ");
        assert_eq!(text.get(3).unwrap(), "日");
        assert_eq!(text.get(-1).unwrap(), "c");
        assert!(text.get(5).is_err());
        assert_eq!(text.get_slice(SliceSpec::range(Some(1), Some(4))).unwrap(), "ñb日");
        assert_eq!(text.find("c", None, None), 4);

        let heap = Heap::new(crate::resource::NoLimitTracker);
        let chars = collect_vec(&text, &heap).unwrap();
        assert_eq!(strs(&chars), vec!["a", "ñ", "b", "日", "c"]);
    }

    #[test]
    fn empty_string_predicates_are_false() {
        let empty = Str::from("");
        assert!(!empty.isalpha());
        assert!(!empty.isdigit());
        assert!(!empty.isupper());
        assert!(!empty.islower());
        assert!(!empty.isspace());
        assert!(!empty.isalnum());
        assert!(!empty.istitle());
        assert!(!empty.isidentifier());
        assert!(!empty.isprintable());
    }

    #[test]
    fn predicates() {
        assert!(Str::from("Hello World").istitle());
        assert!(!Str::from("Hello world").istitle());
        assert!(Str::from("ABC1").isupper());
        assert!(Str::from("²").isdigit());
        assert!(!Str::from("²").isdecimal());
        assert!(Str::from("½").isnumeric());
        assert!(!Str::from("½").isdigit());
        assert!(Str::from("_x1").isidentifier());
        assert!(!Str::from("1x").isidentifier());
        assert!(Str::from(" \t\u{1f}").isspace());
    }

    #[test]
    fn unicode_digit_classes() {
        // Arabic-Indic and mathematical double-struck digits are decimal
        assert!(Str::from("\u{661}\u{662}").isdecimal());
        assert!(Str::from("\u{1d7d8}").isdecimal());
        // Ethiopic digits are digits but not decimal
        assert!(Str::from("\u{1369}").isdigit());
        assert!(!Str::from("\u{1369}").isdecimal());
        // letter and other numbers are only numeric
        for text in ["\u{3007}", "\u{f2a}", "\u{2160}"] {
            let text = Str::from(text);
            assert!(text.isnumeric(), "{text:?}");
            assert!(!text.isdigit(), "{text:?}");
            assert!(!text.isdecimal(), "{text:?}");
        }
    }

    #[test]
    fn find_windows() {
        let s = Str::from("abcabc");
        assert_eq!(s.find("bc", None, None), 1);
        assert_eq!(s.rfind("bc", None, None), 4);
        assert_eq!(s.find("bc", Some(2), None), 4);
        assert_eq!(s.find("bc", Some(-2), None), 4);
        assert_eq!(s.find("", Some(6), None), 6);
        assert_eq!(s.find("", Some(7), None), -1);
        assert_eq!(s.count("", None, None), 7);
        assert_eq!(s.count("a", Some(1), None), 1);
        assert!(s.startswith("ca", Some(2), None));
        assert!(s.endswith("ab", None, Some(-1)));
        assert_eq!(s.index("z", None, None).unwrap_err().to_string(), "ValueError: substring not found");
        assert_eq!(Str::from("日本語").find("語", None, None), 2);
    }

    #[test]
    fn split_variants() {
        let s = Str::from("  a b  c ");
        assert_eq!(strs(&s.split(None, -1).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(strs(&s.split(None, 1).unwrap()), vec!["a", "b  c "]);
        assert_eq!(strs(&s.rsplit(None, 1).unwrap()), vec!["  a b", "c"]);
        let csv = Str::from("a,b,,c");
        assert_eq!(strs(&csv.split(Some(","), -1).unwrap()), vec!["a", "b", "", "c"]);
        assert_eq!(strs(&csv.rsplit(Some(","), 1).unwrap()), vec!["a,b,", "c"]);
        assert_eq!(
            csv.split(Some(""), -1).unwrap_err().to_string(),
            "ValueError: empty separator"
        );
        let lines = Str::from("one\r\ntwo\nthree");
        assert_eq!(strs(&lines.splitlines(false)), vec!["one", "two", "three"]);
        assert_eq!(strs(&lines.splitlines(true)), vec!["one\r\n", "two\n", "three"]);
    }

    #[test]
    fn padding_and_case() {
        assert_eq!(Str::from("ab").center(5, '*'), "**ab*");
        assert_eq!(Str::from("abc").center(6, ' '), " abc  ");
        assert_eq!(Str::from("-42").zfill(5), "-0042");
        assert_eq!(Str::from("a\tbc\td").expandtabs(4), "a   bc  d");
        assert_eq!(Str::from("hello wORLD").title(), "Hello World");
        assert_eq!(Str::from("hELLO").capitalize(), "Hello");
        assert_eq!(Str::from("Straße").casefold(), "strasse");
        assert_eq!(Str::from("aaa").replace("a", "b", 2), "bba");
        assert_eq!(Str::from("ab").replace("", "-", -1), "-a-b-");
    }

    #[test]
    fn int_parsing() {
        assert_eq!(Str::from(" -42 ").to_int(10).unwrap(), -42);
        assert_eq!(Str::from("0x1f").to_int(0).unwrap(), 31);
        assert_eq!(Str::from("ff").to_int(16).unwrap(), 255);
        assert_eq!(Str::from("1_000").to_int(10).unwrap(), 1000);
        assert_eq!(
            Str::from("12x").to_int(10).unwrap_err().to_string(),
            "ValueError: invalid literal for int() with base 10: '12x'"
        );
        assert!(Str::from("010").to_int(0).is_err());
        assert!(Str::from("1__0").to_int(10).is_err());
        assert!(Str::from("_1").to_int(10).is_err());
        assert!(Str::from("9").to_int(1).unwrap_err().is_exception_type(ExcType::ValueError));
    }

    #[test]
    fn repr_quoting() {
        assert_eq!(Str::from("it's").repr(), "\"it's\"");
        assert_eq!(Str::from("a'b\"").repr(), "'a\\'b\"'");
        assert_eq!(Str::from("tab\there\u{7f}").repr(), "'tab\\there\\x7f'");
        assert_eq!(Str::from("é").repr(), "'é'");
    }
}
