use super::parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Walk `sql`, handing every byte that sits outside literals, quoted identifiers and comments to
/// `visit`.
///
/// `visit` returns `Some(end)` when it consumed `idx..end` as a token; scanning then resumes at
/// `end` in the normal state.
pub(crate) fn walk<E, F>(sql: &str, mut visit: F) -> Result<(), E>
where
    F: FnMut(usize) -> Result<Option<usize>, E>,
{
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' if try_start_dollar_quote(bytes, idx).is_some() => {
                    if let Some((tag, end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = end;
                    }
                }
                _ => {
                    if let Some(end) = visit(idx)? {
                        idx = end;
                        continue;
                    }
                }
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    Ok(())
}

/// `sql` without the whitespace and `--`, `#` or `/* */` comments in front of its first keyword.
///
/// A statement made of nothing but comments comes back empty.
#[must_use]
pub fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if rest.starts_with("--") || rest.starts_with('#') {
            rest = match rest.find('\n') {
                Some(end) => rest[end + 1..].trim_start(),
                None => "",
            };
        } else if rest.starts_with("/*") {
            rest = match block_comment_len(rest.as_bytes()) {
                Some(len) => rest[len..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

/// Length of the (possibly nested) block comment that opens `bytes`.
fn block_comment_len(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0u32;
    let mut idx = 0;
    while idx < bytes.len() {
        if is_block_comment_start(bytes, idx) {
            depth += 1;
            idx += 2;
        } else if is_block_comment_end(bytes, idx) {
            depth = depth.saturating_sub(1);
            idx += 2;
            if depth == 0 {
                return Some(idx);
            }
        } else {
            idx += 1;
        }
    }
    None
}

/// Split a script into statements on `;` outside literals and comments.
///
/// Pieces that hold nothing but whitespace or comments are dropped; each statement is trimmed
/// and returned without its terminator.
#[must_use]
pub fn split_sql_statements(script: &str) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;

    let _ = walk::<(), _>(script, |idx| {
        match bytes[idx] {
            b';' => {
                if has_code {
                    statements.push(script[start..idx].trim().to_string());
                }
                start = idx + 1;
                has_code = false;
            }
            b if !b.is_ascii_whitespace() => has_code = true,
            _ => {}
        }
        Ok(None)
    });

    if has_code {
        statements.push(script[start..].trim().to_string());
    }
    statements
}
