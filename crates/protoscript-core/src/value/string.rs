//! Immutable, reference-counted UTF-8 strings.
//!
//! Strings in ProtoScript are never mutated in place — every string
//! operation (`concat`, slicing, case conversion) produces a new `PsString`.
//! That matches the original runtime's copy-on-write-free design closely
//! enough that a plain `Rc<str>` captures it directly; there is no separate
//! mutable buffer to guard.

use crate::error::RuntimeError;
use std::rc::Rc;

/// A ProtoScript string: a byte buffer that is guaranteed valid UTF-8 by
/// construction (`str::from_utf8` rejects exactly the inputs the original
/// runtime's hand-rolled validator rejected: overlong encodings, surrogate
/// halves `U+D800..=U+DFFF`, and scalar values past `U+10FFFF`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PsString {
    inner: Rc<str>,
}

impl PsString {
    pub fn new(s: impl Into<Rc<str>>) -> Self {
        PsString { inner: s.into() }
    }

    /// Validates `bytes` as UTF-8 and wraps it, mirroring the original
    /// runtime's `ps_make_string`/UTF-8 decode path.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, std::str::Utf8Error> {
        let s = std::str::from_utf8(bytes)?;
        Ok(PsString::new(s))
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn byte_len(&self) -> usize {
        self.inner.len()
    }

    /// Number of Unicode scalar values ("glyphs" in the runtime's
    /// vocabulary), not UTF-16 code units and not grapheme clusters.
    pub fn glyph_len(&self) -> usize {
        self.inner.chars().count()
    }

    pub fn glyph_at(&self, index: usize) -> Option<char> {
        self.inner.chars().nth(index)
    }

    pub fn concat(&self, other: &PsString) -> PsString {
        let mut joined = String::with_capacity(self.inner.len() + other.inner.len());
        joined.push_str(&self.inner);
        joined.push_str(&other.inner);
        PsString::new(joined)
    }

    /// Resolves a possibly-negative glyph index the way list/bytes indexing
    /// does (negative counts back from the end), bounds-checked against the
    /// glyph length rather than the byte length.
    fn resolve_glyph_index(&self, index: i64, len: usize) -> Result<usize, RuntimeError> {
        let len = len as i64;
        let real = if index < 0 { index + len } else { index };
        if real < 0 || real > len {
            Err(RuntimeError::StringIndexOutOfBounds)
        } else {
            Ok(real as usize)
        }
    }

    /// `substring(start, end)` in glyph units, half-open `[start, end)`.
    pub fn substring(&self, start: i64, end: i64) -> Result<PsString, RuntimeError> {
        let glyph_len = self.glyph_len();
        let start = self.resolve_glyph_index(start, glyph_len)?;
        let end = self.resolve_glyph_index(end, glyph_len)?;
        if end < start {
            return Err(RuntimeError::StringIndexOutOfBounds);
        }
        let s: String = self.inner.chars().skip(start).take(end - start).collect();
        Ok(PsString::new(s))
    }

    /// `indexOf`: first glyph index of `needle`, or `-1`. An empty needle is
    /// always found at glyph index `0`, per spec §4.2.
    pub fn index_of(&self, needle: &str) -> i64 {
        if needle.is_empty() {
            return 0;
        }
        match self.inner.find(needle) {
            Some(byte_idx) => self.inner[..byte_idx].chars().count() as i64,
            None => -1,
        }
    }

    /// `lastIndexOf`: last glyph index of `needle`, or `-1`. An empty needle
    /// matches at the string's glyph length, per spec §4.2.
    pub fn last_index_of(&self, needle: &str) -> i64 {
        if needle.is_empty() {
            return self.glyph_len() as i64;
        }
        match self.inner.rfind(needle) {
            Some(byte_idx) => self.inner[..byte_idx].chars().count() as i64,
            None => -1,
        }
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.inner.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.inner.ends_with(suffix)
    }

    pub fn contains(&self, needle: &str) -> bool {
        needle.is_empty() || self.inner.contains(needle)
    }

    /// Splits on a literal separator; an empty separator splits into
    /// individual glyphs.
    pub fn split(&self, sep: &str) -> Vec<PsString> {
        if sep.is_empty() {
            self.inner.chars().map(|c| PsString::new(c.to_string())).collect()
        } else {
            self.inner.split(sep).map(PsString::new).collect()
        }
    }

    /// `replaceAll`: replaces every non-overlapping occurrence of `from`
    /// with `to`. An empty `from` is invalid (spec §4.2: "replaceAll with
    /// empty pattern fails with invalid-argument").
    pub fn replace_all(&self, from: &str, to: &str) -> Result<PsString, RuntimeError> {
        if from.is_empty() {
            return Err(RuntimeError::TypeError(
                "replaceAll: pattern must not be empty".into(),
            ));
        }
        Ok(PsString::new(self.inner.replace(from, to)))
    }

    pub fn trim(&self) -> PsString {
        PsString::new(self.inner.trim())
    }

    pub fn trim_start(&self) -> PsString {
        PsString::new(self.inner.trim_start())
    }

    pub fn trim_end(&self) -> PsString {
        PsString::new(self.inner.trim_end())
    }

    /// Pads on the left to `target_glyph_len` glyphs using `pad`, repeating
    /// `pad` as needed. Fails if padding is required but `pad` is empty
    /// (spec §4.2).
    pub fn pad_start(&self, target_glyph_len: usize, pad: &str) -> Result<PsString, RuntimeError> {
        self.pad(target_glyph_len, pad, true)
    }

    pub fn pad_end(&self, target_glyph_len: usize, pad: &str) -> Result<PsString, RuntimeError> {
        self.pad(target_glyph_len, pad, false)
    }

    fn pad(&self, target_glyph_len: usize, pad: &str, at_start: bool) -> Result<PsString, RuntimeError> {
        let own_len = self.glyph_len();
        if own_len >= target_glyph_len {
            return Ok(self.clone());
        }
        if pad.is_empty() {
            return Err(RuntimeError::TypeError(
                "pad: padding required but pad string is empty".into(),
            ));
        }
        let needed = target_glyph_len - own_len;
        let pad_glyphs: Vec<char> = pad.chars().collect();
        let filler: String = (0..needed).map(|i| pad_glyphs[i % pad_glyphs.len()]).collect();
        Ok(PsString::new(if at_start {
            format!("{filler}{}", self.inner)
        } else {
            format!("{}{filler}", self.inner)
        }))
    }

    /// Repeats the whole string `count` times (`count == 0` yields "").
    pub fn repeat(&self, count: usize) -> PsString {
        PsString::new(self.inner.repeat(count))
    }

    /// ASCII-only case conversion, per spec §4.2.
    pub fn to_ascii_upper(&self) -> PsString {
        PsString::new(self.inner.to_ascii_uppercase())
    }

    pub fn to_ascii_lower(&self) -> PsString {
        PsString::new(self.inner.to_ascii_lowercase())
    }

    pub fn to_utf8_bytes(&self) -> Vec<u8> {
        self.inner.as_bytes().to_vec()
    }
}

impl From<&str> for PsString {
    fn from(s: &str) -> Self {
        PsString::new(s)
    }
}

impl From<String> for PsString {
    fn from(s: String) -> Self {
        PsString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_surrogate_halves() {
        // 0xED 0xA0 0x80 encodes U+D800, a lone surrogate: invalid in UTF-8.
        let bytes = [0xED, 0xA0, 0x80];
        assert!(PsString::from_utf8(&bytes).is_err());
    }

    #[test]
    fn rejects_overlong_encoding() {
        // Overlong two-byte encoding of NUL.
        let bytes = [0xC0, 0x80];
        assert!(PsString::from_utf8(&bytes).is_err());
    }

    #[test]
    fn glyph_len_counts_scalars_not_bytes() {
        let s = PsString::new("héllo");
        assert_eq!(s.glyph_len(), 5);
        assert!(s.byte_len() > s.glyph_len());
    }

    #[test]
    fn concat_builds_new_string() {
        let a = PsString::new("foo");
        let b = PsString::new("bar");
        assert_eq!(a.concat(&b).as_str(), "foobar");
    }

    #[test]
    fn index_of_empty_needle_is_zero() {
        assert_eq!(PsString::new("abc").index_of(""), 0);
    }

    #[test]
    fn last_index_of_empty_needle_is_glyph_len() {
        assert_eq!(PsString::new("héllo").last_index_of(""), 5);
    }

    #[test]
    fn substring_operates_in_glyph_units() {
        let s = PsString::new("héllo");
        assert_eq!(s.substring(1, 3).unwrap().as_str(), "él");
    }

    #[test]
    fn replace_all_rejects_empty_pattern() {
        assert!(PsString::new("abc").replace_all("", "x").is_err());
    }

    #[test]
    fn pad_start_repeats_pad_string() {
        let padded = PsString::new("7").pad_start(4, "ab").unwrap();
        assert_eq!(padded.as_str(), "aba7");
    }

    #[test]
    fn pad_fails_when_pad_empty_and_required() {
        assert!(PsString::new("7").pad_start(4, "").is_err());
    }

    #[test]
    fn split_on_empty_separator_yields_glyphs() {
        let parts = PsString::new("ab").split("");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_str(), "a");
    }

    #[test]
    fn uppercase_is_ascii_only() {
        assert_eq!(PsString::new("café").to_ascii_upper().as_str(), "CAFé");
    }
}
