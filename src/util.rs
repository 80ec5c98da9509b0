#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Escapes the HTML-significant characters of a string for safe display.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inserts `<br />` line breaks before every newline, preserving the
/// newlines themselves.
pub fn nl2br(text: &str) -> String {
    text.replace('\n', "<br />\n")
}
