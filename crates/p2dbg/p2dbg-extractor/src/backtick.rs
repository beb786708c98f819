//! The backtick command tokenizer and classifier (classification rule 3).
//!
//! Hand-rolled, index-walking scanner: no regex here because quote-aware
//! tokenization with embedded spaces/commas inside quoted strings isn't a
//! fixed grammar a single regex expresses cleanly. Backtick lines are short
//! and infrequent, so there is no case here for `unsafe`/unchecked indexing —
//! plain bounds-checked slicing is plenty fast.

use p2dbg_core::{MessageKind, WindowId, WindowType};

/// One token and the byte offset (into the original line) where it starts —
/// the offset lets the caller reconstruct the exact original payload text
/// after the window-name prefix, rather than rejoining tokens and losing
/// the source formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    start: usize,
}

/// Splits `line` into whitespace-delimited tokens, treating a
/// double-quoted run as a single token (quotes retain internal spaces and
/// commas; the surrounding quotes are stripped from `text`, not from the
/// byte range used to compute `start` of the *next* token).
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < len {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if bytes[i] == b'"' {
            let start = i;
            let mut j = i + 1;
            while j < len && bytes[j] != b'"' {
                j += 1;
            }
            let close = j.min(len);
            let inner_end = close;
            tokens.push(Token { text: &line[start + 1..inner_end], start });
            i = if close < len { close + 1 } else { close };
            continue;
        }
        let start = i;
        while i < len && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        tokens.push(Token { text: &line[start..i], start });
    }
    tokens
}

fn looks_numeric(tok: &str) -> bool {
    let mut chars = tok.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn was_quoted(line: &str, tok: Token<'_>) -> bool {
    line.as_bytes().get(tok.start) == Some(&b'"')
}

/// A classified backtick command, not yet wrapped in `MessageKind` — kept
/// separate from `MessageKind` so the payload slice can be borrowed from the
/// original line without an intermediate allocation.
pub enum Backtick<'a> {
    Create { window_type: WindowType, name: WindowId },
    Update { names: Vec<WindowId>, payload: &'a str },
}

/// Classifies the body of a backtick command (the text after the leading
/// `` ` `` and before the line terminator). Returns `None` if the line is
/// empty of tokens (degenerate — treated as `UNCLASSIFIED_TEXT` by the
/// caller).
pub fn classify(body: &str) -> Option<Backtick<'_>> {
    let tokens = tokenize(body);
    let t0 = tokens.first()?;

    if let Some(window_type) = WindowType::from_token(t0.text) {
        let name = tokens.get(1).map(|t| t.text).unwrap_or("");
        return Some(Backtick::Create {
            window_type,
            name: WindowId::new(name),
        });
    }

    let mut names = Vec::new();
    let mut payload_start = body.len();
    for tok in &tokens {
        if was_quoted(body, *tok) || looks_numeric(tok.text) {
            payload_start = tok.start;
            break;
        }
        names.push(WindowId::new(tok.text));
        payload_start = tok.start + tok.text.len();
    }

    Some(Backtick::Update {
        names,
        payload: body[payload_start..].trim_start(),
    })
}

impl Backtick<'_> {
    pub fn into_kind(self) -> MessageKind {
        match self {
            Backtick::Create { window_type, name } => MessageKind::BacktickCreate { window_type, name },
            Backtick::Update { names, .. } => MessageKind::BacktickUpdate { names },
        }
    }
}

/// Re-derives an UPDATE command's target window names and dispatch payload
/// from the raw pool slot bytes (`` `ch1 ch2 0,1,2\r\n ``, backtick and line
/// terminator included) — the router's own reparse of the token list for
/// `BACKTICK_UPDATE` dispatch. `MessageKind::BacktickUpdate` already carries
/// the names from classification time; this exists because the kind alone
/// doesn't carry the trimmed payload the router must forward.
pub fn reparse_update(raw_line: &[u8]) -> Option<(Vec<WindowId>, Vec<u8>)> {
    let body = raw_line.strip_prefix(b"`")?;
    let body = body.strip_suffix(b"\n").unwrap_or(body);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    let body = std::str::from_utf8(body).ok()?;
    match classify(body)? {
        Backtick::Update { names, payload } => Some((names, payload.as_bytes().to_vec())),
        Backtick::Create { .. } => None,
    }
}
