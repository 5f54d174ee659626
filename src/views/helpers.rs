use chrono::{DateTime, Utc};

use std::fmt::Write;

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Formats `ts` with a strftime `pattern`, falling back to RFC 3339 if the
/// pattern is invalid.
pub fn format_date(ts: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", ts.format(pattern)).is_err() {
        return ts.to_rfc3339();
    }
    out
}

/// Edit link for the note's owner; empty for everyone else.
pub fn edit_icon(note_owner: &str, viewer: &str, note_id: i64, floating: bool) -> String {
    if note_owner != viewer {
        return String::new();
    }

    if floating {
        format!(
            r#"<a href="/notes/edit/{note_id}" class="btn-floating halfway-fab blue"><i class="fas fa-edit fa-small"></i></a>"#
        )
    } else {
        format!(r#"<a href="/notes/edit/{note_id}"><i class="fas fa-edit fa-small"></i></a>"#)
    }
}

/// Marks the option matching `selected` in `options` as selected, either by
/// its `value` attribute or by its text.
pub fn select(selected: &str, options: &str) -> String {
    const MARKER: &str = r#" selected="selected""#;
    let selected = escape(selected);

    let by_value = format!(r#"value="{selected}""#);
    if let Some(pos) = options.find(&by_value) {
        let end = pos + by_value.len();
        return format!("{}{MARKER}{}", &options[..end], &options[end..]);
    }

    let by_text = format!(">{selected}</option>");
    if let Some(pos) = options.find(&by_text) {
        return format!("{}{MARKER}{}", &options[..pos], &options[pos..]);
    }

    options.to_string()
}
