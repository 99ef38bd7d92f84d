/// Cut text to at most `max_chars` characters, with no word-boundary awareness
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => content[..idx].to_string(),
        None => content.to_string(),
    }
}

/// Bound text to `max_bytes` of UTF-8, appending `marker` when anything was dropped.
///
/// The cut lands on a char boundary and the marker counts towards the limit.
pub fn truncate_bytes_with_marker(content: String, max_bytes: usize, marker: &str) -> String {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes.saturating_sub(marker.len());
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    let mut result = content[..end].to_string();
    result.push_str(marker);
    result
}
