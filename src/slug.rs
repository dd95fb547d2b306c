//! Team slug derivation.
//!
//! A slug is the URL-safe form of a team's `school` name: lowercase, spaces
//! become hyphens, and anything that is not alphanumeric or a hyphen is
//! dropped. Two schools that differ only in punctuation map to the same slug,
//! so [`slug_collisions`] exists to surface that instead of hiding it.

use std::collections::BTreeMap;

/// Convert a school name into its URL slug.
///
/// `team_name_to_slug("Ohio State") == "ohio-state"` and
/// `team_name_to_slug("Texas A&M") == "texas-am"`. Applying it to its own
/// output is a no-op.
pub fn team_name_to_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            // Collapse runs of whitespace into a single hyphen
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if ch == '-' {
            slug.push('-');
        }
    }

    slug
}

/// Group school names that collapse onto the same slug.
///
/// Only slugs shared by two or more distinct names are returned; names within
/// a group are sorted.
pub fn slug_collisions<'a, I>(names: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_slug: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in names {
        let entry = by_slug.entry(team_name_to_slug(name)).or_default();
        if !entry.iter().any(|n| n == name) {
            entry.push(name.to_string());
        }
    }

    by_slug.retain(|_, group| group.len() > 1);
    for group in by_slug.values_mut() {
        group.sort();
    }

    by_slug
}
