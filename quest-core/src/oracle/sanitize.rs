//! Cleanup and parsing of raw oracle replies.
//!
//! Small models in particular like to wrap their JSON in markdown fences,
//! prefix it with a `json` label or leave trailing commas behind. The
//! sanitizer strips that noise and parses what is left; anything it still
//! cannot parse becomes [`OracleResult::fallback`].

use super::OracleResult;
use serde_json::Value;
use tracing::warn;

const FENCE: &str = "```";
const LABEL: &str = "json";

/// Parse a raw reply into a result, falling back on anything unparseable.
pub fn sanitize(raw: &str) -> OracleResult {
    let text = normalize(raw);

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, reply = raw, "Error decoding oracle JSON response");
            return OracleResult::fallback();
        }
    };

    if !value.is_object() {
        warn!(reply = raw, "Oracle response is not a JSON object");
        return OracleResult::fallback();
    }

    match serde_json::from_value(value) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, reply = raw, "Oracle response has the wrong shape");
            OracleResult::fallback()
        }
    }
}

/// Strip fences and labels, trim, and repair trailing commas.
pub fn normalize(raw: &str) -> String {
    let unfenced = strip_fences(raw);

    let mut text = unfenced.trim_start();
    if strip_label(text).len() < text.len() {
        if let Some(brace) = text.find('{') {
            text = &text[brace..];
        }
    }

    remove_trailing_commas(text.trim())
}

/// Remove every fence marker, along with a `json` label right after it.
fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = strip_label(&rest[pos + FENCE.len()..]);
    }
    out.push_str(rest);
    out
}

/// Drop a leading, case-insensitive `json` label.
fn strip_label(text: &str) -> &str {
    match text.get(..LABEL.len()) {
        Some(head) if head.eq_ignore_ascii_case(LABEL) => &text[LABEL.len()..],
        _ => text,
    }
}

/// Remove commas that directly precede `]` or `}` (whitespace allowed in
/// between). Commas inside string literals are left alone.
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
