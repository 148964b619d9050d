pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// `$tag$` opener at `start`; returns the tag and the index of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        if !is_word_byte(bytes[idx]) {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}

/// `%kind` at `idx`: returns the end index and the kind word.
pub(super) fn typed_token(bytes: &[u8], idx: usize) -> Option<(usize, &str)> {
    if bytes.get(idx) != Some(&b'%') {
        return None;
    }
    let start = idx + 1;
    let mut end = start;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    if end == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .map(|word| (end, word))
}

/// `{selector}` at `idx`: returns the end index and the trimmed selector.
pub(super) fn selector_token(bytes: &[u8], idx: usize) -> Option<(usize, &str)> {
    if bytes.get(idx) != Some(&b'{') {
        return None;
    }
    let start = idx + 1;
    let mut end = start;
    while end < bytes.len() && bytes[end] != b'}' {
        if bytes[end] == b'\n' || bytes[end] == b'{' {
            return None;
        }
        end += 1;
    }
    if end >= bytes.len() || end == start {
        return None;
    }
    let selector = std::str::from_utf8(&bytes[start..end]).ok()?.trim();
    if selector.is_empty() {
        None
    } else {
        Some((end + 1, selector))
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_tokens() {
        assert_eq!(typed_token(b"%s AND", 0), Some((2, "s")));
        assert_eq!(typed_token(b"x = %blob)", 4), Some((9, "blob")));
        assert_eq!(typed_token(b"100 % 3", 4), None);
    }

    #[test]
    fn selector_tokens() {
        assert_eq!(selector_token(b"{status} x", 0), Some((8, "status")));
        assert_eq!(selector_token(b"{ 2 }", 0), Some((5, "2")));
        assert_eq!(selector_token(b"{}", 0), None);
        assert_eq!(selector_token(b"{open", 0), None);
    }

    #[test]
    fn dollar_tags() {
        let sql = b"$fn$ body $fn$";
        assert_eq!(try_start_dollar_quote(sql, 0), Some(("fn".to_string(), 3)));
        assert!(matches_tag(sql, 10, "fn"));
        assert!(try_start_dollar_quote(b"$ 1", 0).is_none());
    }
}
