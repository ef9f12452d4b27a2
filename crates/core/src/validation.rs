//! Input validation utilities.
//!
//! This module contains functions for validating configuration and user inputs before they
//! are used to derive filesystem paths.

use crate::{StoreError, StoreResult};

/// Validates that a database name is safe for use as a directory name and a filename prefix.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Restricts characters to ASCII alphanumerics, `.`, `-` and `_`, and rejects names made
///   only of dots
///
/// # Errors
///
/// Returns a `StoreError::InvalidInput` if the name is invalid.
pub fn validate_database_name(name: &str) -> StoreResult<()> {
    const MAX_NAME_LEN: usize = 64;

    if name.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "database name cannot be empty".into(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidInput(format!(
            "database name exceeds maximum length of {} characters",
            MAX_NAME_LEN
        )));
    }

    let ok = name
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(StoreError::InvalidInput(
            "database name contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    if name.bytes().all(|b| b == b'.') {
        return Err(StoreError::InvalidInput(
            "database name cannot consist only of dots".into(),
        ));
    }

    Ok(())
}

/// Turns free text into something usable inside a filename.
///
/// Path separators and characters rejected by common filesystems are replaced with `_`.
/// Blank input falls back to `fallback`.
pub fn filename_fragment(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_database_name() {
        assert!(validate_database_name("PathoReportDB").is_ok());
        assert!(validate_database_name("lab-2.db_test").is_ok());
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for bad in ["", "  ", "..", "a/b", "a\\b", "läb"] {
            assert!(
                validate_database_name(bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(65);
        assert!(validate_database_name(&long).is_err());
    }

    #[test]
    fn filename_fragment_replaces_separators() {
        assert_eq!(filename_fragment("A/B: C", "Patient"), "A_B_ C");
        assert_eq!(filename_fragment("   ", "Patient"), "Patient");
    }
}
