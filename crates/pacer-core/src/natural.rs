//! Natural-order string comparison
//!
//! Strings are split into alternating text and digit runs. Text runs compare
//! by code point, digit runs compare as integers of arbitrary length, so
//! `scn2` sorts before `scn10`.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Text(&'a str),
    Number(&'a str),
}

/// Split into `text, number, text, number, ...`, always leading with text
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = false;
    for (idx, ch) in s.char_indices() {
        let digit = ch.is_ascii_digit();
        if digit != in_digits {
            out.push(if in_digits {
                Chunk::Number(&s[start..idx])
            } else {
                Chunk::Text(&s[start..idx])
            });
            start = idx;
            in_digits = digit;
        }
    }
    out.push(if in_digits {
        Chunk::Number(&s[start..])
    } else {
        Chunk::Text(&s[start..])
    });
    out
}

/// Compare two digit runs numerically without overflowing
fn cmp_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        (Chunk::Number(a), Chunk::Number(b)) => cmp_numbers(a, b),
        // Unreachable for well-formed chunk lists, which alternate in lockstep
        (Chunk::Text(_), Chunk::Number(_)) => Ordering::Less,
        (Chunk::Number(_), Chunk::Text(_)) => Ordering::Greater,
    }
}

/// Total natural order over strings
///
/// Returns `Equal` only for identical strings: runs that differ solely in
/// leading zeros (`7` vs `007`) fall back to plain byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ord = cmp_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// Owned string ordered by [`natural_cmp`], usable as a `BTreeMap` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(pub String);

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for NaturalKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
