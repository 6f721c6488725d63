//! Outgoing caption composition under the platform caption limit.
//!
//! Lengths are counted in characters, not bytes.

/// Maximum caption length accepted by the destination.
pub const CAPTION_LIMIT: usize = 1024;

/// Placed between the item's own caption and the configured suffix.
pub const SUFFIX_SEPARATOR: &str = "\n\n";

/// Budget reserved for the separator when a suffix is present.
const SEPARATOR_RESERVE: usize = 4;

/// Combine an item's caption with the configured suffix.
///
/// Without a suffix the caption is truncated to [`CAPTION_LIMIT`]. With one,
/// the caption is truncated to whatever the suffix and separator leave over,
/// down to nothing. A suffix that alone exceeds the limit is itself cut so the
/// result still fits.
pub fn compose(original: &str, suffix: Option<&str>) -> String {
    let Some(suffix) = suffix.filter(|s| !s.is_empty()) else {
        return truncate_chars(original, CAPTION_LIMIT).to_string();
    };

    let suffix = truncate_chars(suffix, CAPTION_LIMIT - SEPARATOR_RESERVE);
    let budget = CAPTION_LIMIT.saturating_sub(suffix.chars().count() + SEPARATOR_RESERVE);
    let head = truncate_chars(original, budget);

    let mut caption = String::with_capacity(head.len() + SUFFIX_SEPARATOR.len() + suffix.len());
    caption.push_str(head);
    caption.push_str(SUFFIX_SEPARATOR);
    caption.push_str(suffix);
    caption
}

/// Longest prefix of `s` holding at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
