/// Base used when a title has no characters that survive slugification.
pub const DEFAULT_SLUG_BASE: &str = "post";

/// slugify
///
/// Maps a title to a URL-safe identifier: lower-cases it, drops everything that is not
/// an ASCII letter, digit, whitespace or hyphen, trims, and collapses each whitespace
/// run into one hyphen. Never returns an empty string.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");

    // A title of only hyphens would otherwise survive as "--".
    if slug.chars().all(|c| c == '-') {
        DEFAULT_SLUG_BASE.to_string()
    } else {
        slug
    }
}

/// The slug tried on attempt `n` for a given base: `base`, `base-1`, `base-2`, ...
pub fn candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}
