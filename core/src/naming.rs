//! Naming convention for tagged copies of the canonical backup.
//!
//! A copy of `backup.tar.gz` tagged `2024-01-01` is stored as
//! `backup_2024-01-01.tar.gz`: the separator and tag go between the base
//! name and the extension. Everything after the first dot of the file name
//! counts as the extension, so multi-part extensions stay intact. A leading
//! dot (hidden files) belongs to the base name.
//!
//! Tools that split at the last dot name the same copy
//! `backup.tar_2024-01-01.gz`. Such copies are not recognised as copies of a
//! file with a multi-part extension, and are never listed or rotated.

use crate::{Error, Result};

/// Placed between the base name and the copy modifier.
pub const MODIFIER_SEPARATOR: char = '_';

/// Splits a file name into base name and extension (extension keeps its
/// leading dot, and is empty when there is none).
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let search_from = usize::from(file_name.starts_with('.'));
    match file_name[search_from..].find('.') {
        Some(pos) => file_name.split_at(search_from + pos),
        None => (file_name, ""),
    }
}

/// File name of the copy of `file_name` tagged with `modifier`.
pub fn modified_file_name(file_name: &str, modifier: &str) -> String {
    let (base, extension) = split_file_name(file_name);
    format!("{}{}{}{}", base, MODIFIER_SEPARATOR, modifier, extension)
}

/// Extracts the modifier from `candidate` if it is a tagged copy of
/// `file_name`. Returns `None` for unrelated entries and for the canonical
/// file itself.
pub fn extract_modifier<'a>(file_name: &str, candidate: &'a str) -> Option<&'a str> {
    let (base, extension) = split_file_name(file_name);
    let modifier = candidate
        .strip_prefix(base)?
        .strip_prefix(MODIFIER_SEPARATOR)?
        .strip_suffix(extension)?;
    if modifier.is_empty() {
        None
    } else {
        Some(modifier)
    }
}

/// Rejects empty or whitespace-only modifiers.
pub fn validate_modifier(modifier: &str) -> Result<()> {
    if modifier.trim().is_empty() {
        return Err(Error::InvalidModifier(modifier.to_string()));
    }
    Ok(())
}
