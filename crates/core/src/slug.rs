// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical slug normalization and read-tolerant variant generation.
//!
//! `normalize` is the *only* function anything in the engine may call to
//! turn a model identifier into the canonical on-disk/lookup key. Variant
//! generation (for tolerant reads against historical directory layouts) is
//! confined to this module per the REDESIGN FLAGS guidance in spec §9 —
//! it must never metastasize into ad hoc pattern matching elsewhere.

/// Canonicalize a model identifier.
///
/// Rules (spec §4.2):
/// - lower-case
/// - `/` → `_`
/// - runs of whitespace → `-`
/// - `.` → `-` only inside version-like fragments: when it sits between two
///   digits, or between a letter and a digit (`3.5` → `3-5`, `v2.0` → `v2-0`)
/// - hyphens already present are preserved
/// - repeated `-`/`_` runs collapse to a single separator character
///
/// `normalize` is idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(input: &str) -> String {
    let lower = input.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut out = String::with_capacity(lower.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '/' => out.push('_'),
            '.' => {
                let prev = if i > 0 { Some(chars[i - 1]) } else { None };
                let next = chars.get(i + 1).copied();
                if is_version_dot(prev, next) {
                    out.push('-');
                } else {
                    out.push('.');
                }
            }
            c if c.is_whitespace() => out.push('-'),
            c => out.push(c),
        }
    }

    collapse_separators(&out)
}

/// `.` is a version separator when it sits between two digits, or between
/// a letter and a digit. Any other neighborhood leaves it as a literal dot.
fn is_version_dot(prev: Option<char>, next: Option<char>) -> bool {
    match (prev, next) {
        (Some(p), Some(n)) => {
            (p.is_ascii_digit() && n.is_ascii_digit())
                || (p.is_ascii_alphabetic() && n.is_ascii_digit())
        }
        _ => false,
    }
}

/// Collapse maximal runs of `-`/`_` (in any mixture) down to their first
/// character. Doing this as a dedicated pass — rather than trying to avoid
/// producing runs in the first place — is what keeps `normalize` idempotent:
/// a second pass over an already-collapsed run is a no-op.
fn collapse_separators(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        result.push(c);
        if c == '-' || c == '_' {
            while matches!(chars.peek(), Some('-') | Some('_')) {
                chars.next();
            }
        }
    }
    result
}

/// Generate a small, ordered list of read-tolerant variants of a canonical
/// slug. Variants are for *lookups only* — never used to decide a write path.
pub fn variants(canonical: &str) -> Vec<String> {
    let mut out = vec![canonical.to_string()];

    // Restore the provider/model boundary: first `_` back to `/`.
    if let Some(idx) = canonical.find('_') {
        let mut restored = String::with_capacity(canonical.len());
        restored.push_str(&canonical[..idx]);
        restored.push('/');
        restored.push_str(&canonical[idx + 1..]);
        if restored != canonical {
            out.push(restored);
        }
    }

    // Collapse `-` to `_` as a looser historical form.
    if canonical.contains('-') {
        let collapsed = canonical.replace('-', "_");
        if !out.contains(&collapsed) {
            out.push(collapsed);
        }
    }

    out
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
