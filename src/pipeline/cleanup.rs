//! Deterministic cleanup of extracted page text.
//!
//! PDF text extraction produces structurally noisy output: Windows line
//! endings, soft hyphens left over from justified text, zero-width characters
//! embedded by authoring tools, and long runs of blank lines where the layout
//! had whitespace. These rules normalise that noise before the text reaches
//! the classification prompt, so the model sees content rather than
//! formatting debris.
//!
//! Each rule is a pure `&str → String` function with no shared state, applied
//! in a fixed order: line endings first so the line-based rules see `\n`
//! only, invisible characters before trailing-whitespace trimming, blank-line
//! collapsing last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of extracted text.
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ──────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}\u{00AD}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").to_string()
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(clean_page_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn invisible_chars_are_stripped() {
        let dirty = "In\u{200B}voice\u{FEFF} #42\u{00AD}";
        assert_eq!(clean_page_text(dirty), "Invoice #42");
    }

    #[test]
    fn trailing_whitespace_is_trimmed_per_line() {
        assert_eq!(clean_page_text("total:   \n  19.99\t"), "total:\n  19.99");
    }

    #[test]
    fn blank_runs_collapse_to_one_blank_line() {
        assert_eq!(clean_page_text("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn already_clean_text_is_untouched() {
        let clean = "Invoice #42\n\nTotal: 19.99";
        assert_eq!(clean_page_text(clean), clean);
    }

    #[test]
    fn whitespace_only_input_becomes_empty() {
        assert_eq!(clean_page_text(" \r\n \u{200B} \n"), "");
    }
}
