// === UTF-8 safe string slicing utilities ===

/// Round a byte index down to the nearest char boundary
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Safe version of String::truncate
pub fn safe_truncate(s: &mut String, max_bytes: usize) {
    if s.len() > max_bytes {
        let boundary = floor_char_boundary(s, max_bytes);
        s.truncate(boundary);
    }
}

/// Split a string into ordered chunks of at most `limit` bytes, cutting only
/// at char boundaries. Concatenating the chunks reproduces the input exactly.
pub fn chunk_str(s: &str, limit: usize) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut remaining = s;
    while remaining.len() > limit {
        let mut end = floor_char_boundary(remaining, limit);
        if end == 0 {
            // single char wider than the limit; emit it whole rather than loop
            end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        let (chunk, rest) = remaining.split_at(end);
        chunks.push(chunk);
        remaining = rest;
    }
    chunks.push(remaining);
    chunks
}
