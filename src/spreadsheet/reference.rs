//! Conversions between 0-based (row, column) indexes and Excel-style references.
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("Hardcode regex pattern"));

/// Converts a 0-based column index to column letters (0 → "A", 26 → "AA").
pub(crate) fn col_to_letters(col: usize) -> String {
    let mut col = col + 1;
    let mut letters = String::new();
    while col > 0 {
        col -= 1;
        letters.insert(0, char::from(b'A' + (col % 26) as u8));
        col /= 26;
    }
    letters
}

/// Converts column letters to a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, char| {
        let char = char.to_ascii_uppercase();
        char.is_ascii_uppercase()
            .then(|| index * 26 + (char as usize - 'A' as usize + 1))
    }).map(|index| index - 1)
}

/// Converts a 1-based row number string to a 0-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts 0-based indexes to an Excel-style reference ("A1").
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}

/// Converts an Excel-style reference ("B12", "$C$3") to 0-based (row, column) indexes.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE_PATTERN.captures(reference.trim())?;
    let col = captures.get(1).map(|matcher| matcher.as_str()).and_then(col_to_index)?;
    let row = captures.get(2).map(|matcher| matcher.as_str()).and_then(row_to_index)?;
    Some((row, col))
}
