//! Utility functions for the harness.

use std::fmt::Write as _;

/// Characters that may not appear in a diff artifact's file name.
pub const DISALLOWED_FILENAME_CHARS: &[char] = &['/', '<', '>', ':', '"', '\\', '|', '?', '*'];

/// Renders control characters in `line` as visible escape sequences.
///
/// Tabs, newlines and carriage returns become `\t`, `\n` and `\r`; every other
/// control character becomes `\xNN`. Printable text (including non-ASCII) is
/// left untouched, so regex patterns in expected output keep their meaning.
pub fn escape_nonprintable(line: &str) -> String {
    if !line.chars().any(char::is_control) {
        return line.to_owned();
    }

    let mut escaped = String::with_capacity(line.len() + 8);
    for c in line.chars() {
        match c {
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\x{:02x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }

    escaped
}

/// Turns a block of text into the comparable line form used for transcripts: the
/// text is trimmed, split into lines, and each line is escaped.
pub fn normalize_text(text: &str) -> Vec<String> {
    text.trim().lines().map(escape_nonprintable).collect()
}

/// Splits file contents into lines that keep their terminators, then escapes each
/// one. A missing final newline therefore shows up as a difference.
pub fn normalize_file_contents(contents: &str) -> Vec<String> {
    contents
        .split_inclusive('\n')
        .map(escape_nonprintable)
        .collect()
}

/// Builds the file name of the diff artifact for the test with the given title.
pub fn diff_artifact_name(title: &str) -> String {
    std::format!("difference-{title}.html")
        .chars()
        .filter(|c| !DISALLOWED_FILENAME_CHARS.contains(c))
        .collect()
}

/// Renders a self-contained HTML page showing `expected` and `actual` side by side.
pub fn render_html_diff(title: &str, expected: &[String], actual: &[String]) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    html.push_str(
        "<style>\n\
         table.diff { font-family: monospace; border-collapse: collapse; }\n\
         table.diff td { padding: 0 0.5em; white-space: pre; vertical-align: top; }\n\
         table.diff th { text-align: left; padding: 0 0.5em; }\n\
         td.lineno { color: #888; text-align: right; }\n\
         td.removed { background-color: #ffaaaa; }\n\
         td.added { background-color: #aaffaa; }\n\
         td.changed { background-color: #ffff77; }\n\
         </style>\n</head>\n<body>\n",
    );
    html.push_str("<table class=\"diff\">\n");
    html.push_str(
        "<thead><tr><th></th><th>Expected</th><th></th><th>Program Output</th></tr></thead>\n<tbody>\n",
    );

    let mut expected_lineno = 0;
    let mut actual_lineno = 0;
    for (left, right) in pair_rows(diff::slice(expected, actual)) {
        let class = match (left, right) {
            (Some(l), Some(r)) if l == r => "same",
            (Some(_), Some(_)) => "changed",
            (Some(_), None) => "removed",
            _ => "added",
        };

        html.push_str("<tr>");
        if let Some(l) = left {
            expected_lineno += 1;
            push_cells(&mut html, expected_lineno, l, class);
        } else {
            html.push_str("<td class=\"lineno\"></td><td></td>");
        }
        if let Some(r) = right {
            actual_lineno += 1;
            push_cells(&mut html, actual_lineno, r, class);
        } else {
            html.push_str("<td class=\"lineno\"></td><td></td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// Lines shown on the left (expected) and right (actual) of one diff row.
type DiffRow<'a> = (Option<&'a String>, Option<&'a String>);

/// Pairs each run of removals with the run of additions next to it so that a
/// changed line sits beside its replacement.
fn pair_rows(results: Vec<diff::Result<&String>>) -> Vec<DiffRow<'_>> {
    fn flush<'a>(
        rows: &mut Vec<DiffRow<'a>>,
        removed: &mut Vec<&'a String>,
        added: &mut Vec<&'a String>,
    ) {
        for i in 0..removed.len().max(added.len()) {
            rows.push((removed.get(i).copied(), added.get(i).copied()));
        }
        removed.clear();
        added.clear();
    }

    let mut rows = vec![];
    let mut removed = vec![];
    let mut added = vec![];

    for result in results {
        match result {
            diff::Result::Left(l) => {
                if !added.is_empty() {
                    flush(&mut rows, &mut removed, &mut added);
                }
                removed.push(l);
            }
            diff::Result::Right(r) => added.push(r),
            diff::Result::Both(l, r) => {
                flush(&mut rows, &mut removed, &mut added);
                rows.push((Some(l), Some(r)));
            }
        }
    }
    flush(&mut rows, &mut removed, &mut added);

    rows
}

fn push_cells(html: &mut String, lineno: usize, text: &str, class: &str) {
    let _ = write!(
        html,
        "<td class=\"lineno\">{lineno}</td><td class=\"{class}\">{}</td>",
        escape_html(text)
    );
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
