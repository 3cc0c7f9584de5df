//! Body minification for `llms-small.txt`.
//!
//! Each pass is a function `&str -> String` applied in sequence. Fenced code
//! is never touched except for trailing whitespace.

use std::sync::LazyLock;

use regex::Regex;

/// Run every minification pass over a document body.
pub fn minify_body(body: &str) -> String {
    let mut result = strip_html_comments(body);
    result = strip_asides(&result);
    result = trim_trailing_whitespace(&result);
    result = collapse_blank_lines(&result);
    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: HTML comments
// ---------------------------------------------------------------------------

fn strip_html_comments(md: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    map_outside_code(md, |chunk| COMMENT_RE.replace_all(chunk, "").into_owned())
}

// ---------------------------------------------------------------------------
// Pass 2: `:::note` style asides
// ---------------------------------------------------------------------------

/// Drop `:::kind ... :::` container blocks, including nested ones.
fn strip_asides(md: &str) -> String {
    static OPEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^:::\s*[A-Za-z]").expect("valid regex"));

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_code = false;

    for line in md.lines() {
        let trimmed = line.trim_start();
        if depth == 0 && trimmed.starts_with("```") {
            in_code = !in_code;
        }
        if in_code {
            out.push(line);
            continue;
        }

        if OPEN_RE.is_match(trimmed) {
            depth += 1;
        } else if depth > 0 && trimmed.trim_end() == ":::" {
            depth -= 1;
        } else if depth == 0 {
            out.push(line);
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: whitespace
// ---------------------------------------------------------------------------

fn trim_trailing_whitespace(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

/// Collapse runs of blank lines outside code fences to a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_code = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        }
        let blank = line.is_empty();
        if !in_code && blank && out.last().is_some_and(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Apply `f` to the text between fenced code blocks.
fn map_outside_code(md: &str, f: impl Fn(&str) -> String) -> String {
    let mut result = String::with_capacity(md.len());
    let mut pending = String::new();
    let mut in_code = false;

    for line in md.split_inclusive('\n') {
        let fence = line.trim_start().starts_with("```");
        if in_code {
            result.push_str(line);
            if fence {
                in_code = false;
            }
        } else if fence {
            result.push_str(&f(&pending));
            pending.clear();
            result.push_str(line);
            in_code = true;
        } else {
            pending.push_str(line);
        }
    }

    result.push_str(&f(&pending));
    result
}
