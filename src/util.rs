// SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use core::fmt;
use std::path::Path;

/// Check if a character separates words in a GEOS text field. This is Unicode
/// whitespace plus the ASCII information separators (0x1c - 0x1f).
pub fn is_field_space(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Map each byte to the character with the same value. GEOS text is ASCII, so
/// no validation is done.
pub fn ascii(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Collapse every run of whitespace into a single space and strip leading and
/// trailing whitespace.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for word in text.split(is_field_space).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }

    result
}

/// Strip leading and trailing whitespace only. Interior runs are kept as-is.
pub fn trim_field(text: &str) -> &str {
    text.trim_matches(is_field_space)
}

/// Insert `,` between every group of three digits in the integer part of a
/// formatted number.
pub fn group_digits(number: &str) -> String {
    let (int_part, frac_part) = match number.find('.') {
        Some(i) => number.split_at(i),
        None => (number, ""),
    };

    let mut result = String::with_capacity(number.len() + int_part.len() / 3);

    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.push_str(frac_part);
    result
}

/// Check if a host file name has the conventional `.cvt` extension.
pub fn has_cvt_extension(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("cvt"))
}

/// Format host system path for printing.
pub struct HostPath<P: AsRef<Path>>(pub P);

impl<P: AsRef<Path>> fmt::Debug for HostPath<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Host]{:?}", self.0.as_ref())
    }
}
