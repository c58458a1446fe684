use std::sync::LazyLock;

use regex::Regex;

/// Rendered content longer than this is cut unless `--full` is given.
pub const DEFAULT_CONTENT_MAX_CHARS: usize = 2000;

/// HTML walks stop descending here and flatten deeper elements to text.
pub const MAX_NESTING: usize = 128;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("literal pattern"));

/// Replace every run of whitespace with a single space.
///
/// Leading and trailing whitespace is kept as one space so callers can
/// tell whether two inline pieces were separated.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Final cleanup for rendered output.
///
/// Strips trailing whitespace from every line, collapses three or more
/// consecutive newlines to exactly two and trims the result.
pub fn tidy_output(text: &str) -> String {
    let stripped = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&stripped, "\n\n").trim().to_string()
}

/// Cut `text` to at most `max_chars` characters, appending a notice when
/// anything was removed.
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            format!("{}\n\n... (truncated)", &text[..byte_idx])
        }
        None => text.to_string(),
    }
}

/// Human-readable byte size using binary units (`1.5 KiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = b"KMGTPE"[exp] as char;
    format!("{:.1} {prefix}iB", bytes as f64 / div as f64)
}
