//! String helpers for log output.

const REDACTED: &str = "[REDACTED]";

/// Markers that introduce a credential.
const SECRET_MARKERS: [&str; 2] = ["sk-", "Bearer "];

/// Shorten `s` to `max_chars` characters, adding "..." when cut.
///
/// Counts characters, not bytes, so CJK text and emoji are never split.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}...", head.trim_end())
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

/// Replace API keys and bearer tokens in `input` with `[REDACTED]`.
///
/// A marker with nothing token-like after it is left alone.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        let next = SECRET_MARKERS
            .iter()
            .filter_map(|m| rest.find(m).map(|at| (at, *m)))
            .min_by_key(|(at, _)| *at);

        let Some((at, marker)) = next else {
            out.push_str(rest);
            break;
        };

        let after = &rest[at + marker.len()..];
        let secret_len = after
            .find(|c: char| !is_secret_char(c))
            .unwrap_or(after.len());

        out.push_str(&rest[..at]);
        out.push_str(if secret_len == 0 { marker } else { REDACTED });
        rest = &after[secret_len..];
    }

    out
}
