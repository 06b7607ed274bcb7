//! City name comparison and slug derivation.
//!
//! Whether "Paris" and "paris" are the same city is a deployment choice, so
//! every lookup, uniqueness check and cache key goes through a
//! [`CityNamePolicy`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityNamePolicy {
    /// Names match byte for byte.
    #[default]
    CaseSensitive,
    /// Names match after Unicode lowercasing.
    CaseInsensitive,
}

impl CityNamePolicy {
    #[must_use]
    pub fn from_case_insensitive(case_insensitive: bool) -> Self {
        if case_insensitive {
            Self::CaseInsensitive
        } else {
            Self::CaseSensitive
        }
    }

    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Self::CaseInsensitive)
    }

    /// Normalized form used as a lookup key.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        match self {
            Self::CaseSensitive => name.to_string(),
            Self::CaseInsensitive => name.to_lowercase(),
        }
    }

    #[must_use]
    pub fn matches(&self, a: &str, b: &str) -> bool {
        match self {
            Self::CaseSensitive => a == b,
            Self::CaseInsensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }

    /// Slug used for cache keys.
    ///
    /// Lowercased only under the case-insensitive policy; otherwise two
    /// distinct cities would share a key.
    #[must_use]
    pub fn slug(&self, name: &str) -> String {
        let slug = slugify(name);
        match self {
            Self::CaseSensitive => slug,
            Self::CaseInsensitive => slug.to_ascii_lowercase(),
        }
    }
}

/// Replaces every run of non ASCII-alphanumeric characters with a single `-`
/// and trims dashes at both ends. Case is preserved.
///
/// Returns `_` when nothing survives so the slug is never empty.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push('_');
    }
    slug
}
