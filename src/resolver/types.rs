use std::collections::BTreeSet;

use crate::geometry::UNKNOWN_ISO;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;
pub const LABEL_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// First ancestor zoom consulted by the hierarchical walk.
    pub min_cache_zoom: u8,
}

#[allow(clippy::derivable_impls)]
impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            min_cache_zoom: MIN_ZOOM,
        }
    }
}

/// A label naming one country (or only `"??"`) holds for every descendant tile.
pub fn is_unambiguous(label: &str) -> bool {
    !label.contains(LABEL_SEPARATOR)
}

pub fn join_label<'a>(codes: impl IntoIterator<Item = &'a str>) -> String {
    let codes: BTreeSet<&str> = codes.into_iter().collect();
    if codes.is_empty() {
        return UNKNOWN_ISO.to_string();
    }
    codes.into_iter().collect::<Vec<_>>().join(LABEL_SEPARATOR)
}

pub fn split_label(label: &str) -> impl Iterator<Item = &str> {
    label.split(LABEL_SEPARATOR)
}

/// Well-formed labels are non-empty, strictly sorted codes without
/// whitespace joined by `|`.
pub fn is_valid_label(label: &str) -> bool {
    let codes: Vec<&str> = split_label(label).collect();
    codes
        .iter()
        .all(|code| !code.is_empty() && !code.chars().any(char::is_whitespace))
        && codes.windows(2).all(|pair| pair[0] < pair[1])
}
