//! Classification rule 2: cog-tagged text lines and the `P2_SYSTEM_INIT`
//! golden-sync line. Fixed-shape, so `regex` does the matching here — unlike
//! the backtick tokenizer, there's no quote-aware sub-grammar to hand-roll.

use regex::bytes::Regex;
use std::sync::LazyLock;

/// `Cog([0-9])  ([^\n]*)\r?\n` — note the exact two spaces after the digit;
/// a single space must NOT match (it falls through to `TERMINAL_OUTPUT`).
static COG_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Cog([0-9])  ([^\n]*)\r?\n").unwrap());

/// `INIT \$[0-9A-F_]+ \$[0-9A-F_]+ (load|jump)` — the golden-sync body,
/// checked against a Cog0 line's payload.
static GOLDEN_SYNC_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INIT \$[0-9A-F_]+ \$[0-9A-F_]+ (load|jump)$").unwrap());

pub struct CogLineMatch<'a> {
    pub cog_digit: u8,
    pub body: &'a [u8],
    pub consumed: usize,
}

/// Matches a complete cog-tagged line at the start of `window`. Returns
/// `None` if `window` doesn't start with the pattern *or* the line
/// terminator hasn't arrived yet (caller decides whether that means "wait
/// for more bytes" or "give up, not this kind of line" based on whether a
/// `\n` exists anywhere in `window`).
pub fn match_cog_line(window: &[u8]) -> Option<CogLineMatch<'_>> {
    let caps = COG_LINE.captures(window)?;
    let whole = caps.get(0).unwrap();
    let digit = caps.get(1).unwrap().as_bytes();
    let body = caps.get(2).unwrap().as_bytes();
    let cog_digit = digit[0] - b'0';
    Some(CogLineMatch {
        cog_digit,
        body,
        consumed: whole.len(),
    })
}

/// Whether a Cog0 line's body is the golden-sync `INIT ...` line.
pub fn is_golden_sync_body(body: &[u8]) -> bool {
    GOLDEN_SYNC_BODY.is_match(body)
}
