//! Server-rendered pages.

pub mod helpers;

use axum::response::Html;

use std::fmt::Write;

use crate::models::{Note, NoteStatus, NoteWithOwner};

use helpers::{edit_icon, escape, format_date, select};

const STATUS_OPTIONS: &str = r#"<option value="public">Public</option>
<option value="private">Private</option>"#;

fn layout(title: &str, signed_in: bool, body: &str) -> Html<String> {
    let nav = if signed_in {
        r#"<nav><a href="/dashboard">Dashboard</a> <a href="/notes">Public Notes</a> <a href="/notes/add">Add Note</a></nav>"#
    } else {
        ""
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} | Notes</title>
</head>
<body>
{nav}
<main class="container">
{body}
</main>
</body>
</html>
"#,
        escape(title)
    ))
}

fn image_tag(note: &Note) -> String {
    note.image_key
        .as_deref()
        .map(|key| {
            format!(
                r#"<img class="preview" src="/notes/images/{}" alt="{}">"#,
                escape(key),
                escape(&note.title)
            )
        })
        .unwrap_or_default()
}

pub fn login(login_url: &str) -> Html<String> {
    let body = format!(
        r#"<h3>Notes</h3>
<p>Create, share and keep track of your course notes.</p>
<a href="{}" class="btn">Log In</a>"#,
        escape(login_url)
    );

    layout("Login", false, &body)
}

pub fn dashboard(name: &str, notes: &[Note], date_format: &str) -> Html<String> {
    let mut body = format!("<h6>Dashboard</h6>\n<h3>Welcome {}</h3>\n", escape(name));

    if notes.is_empty() {
        body.push_str("<p>You have not created any notes.</p>");
        return layout("Dashboard", true, &body);
    }

    body.push_str(
        "<table class=\"striped\">\n<thead><tr><th>Title</th><th>Date</th><th>Status</th><th></th></tr></thead>\n<tbody>\n",
    );
    for note in notes {
        let _ = write!(
            body,
            r#"<tr><td><a href="/notes/{id}">{title}</a></td><td>{date}</td><td><span class="status">{status}</span></td><td>
<a href="/notes/edit/{id}" class="btn">Edit</a>
<form action="/notes/{id}?_method=DELETE" method="POST" class="inline"><button type="submit" class="btn red">Delete</button></form>
</td></tr>
"#,
            id = note.id,
            title = escape(&note.title),
            date = format_date(&note.created_at, date_format),
            status = note.status,
        );
    }
    body.push_str("</tbody>\n</table>");

    layout("Dashboard", true, &body)
}

pub fn notes_index(notes: &[NoteWithOwner], viewer: &str, date_format: &str) -> Html<String> {
    let mut body = String::from("<h3>Notes</h3>\n<div class=\"row\">\n");

    if notes.is_empty() {
        body.push_str("<p>No notes to display</p>\n");
    }

    for NoteWithOwner { note, owner } in notes {
        let _ = write!(
            body,
            r#"<div class="card">
<div class="card-image">{image}{edit}</div>
<div class="card-content"><h5>{title}</h5><p>{subject}</p><p>{date}</p></div>
<div class="card-action">
<a href="/notes/user/{owner_id}">{owner_name}</a>
<a href="/notes/{id}" class="btn">Read More</a>
</div>
</div>
"#,
            image = image_tag(note),
            edit = edit_icon(&note.user_id, viewer, note.id, true),
            title = escape(&note.title),
            subject = escape(&note.subject_code),
            date = format_date(&note.created_at, date_format),
            owner_id = escape(&owner.id),
            owner_name = escape(&owner.display_name),
            id = note.id,
        );
    }
    body.push_str("</div>");

    layout("Notes", true, &body)
}

pub fn show(entry: &NoteWithOwner, viewer: &str, date_format: &str) -> Html<String> {
    let NoteWithOwner { note, owner } = entry;
    let body = format!(
        r#"<div class="card">
<div class="card-content">
<span class="card-title">{title} <small>{edit}</small></span>
<p class="subject">{subject}</p>
<p class="date">{date}</p>
{image}
<div class="description">{description}</div>
<a href="{link}" rel="noopener noreferrer" target="_blank">{link}</a>
</div>
<div class="card-action">
<a href="/notes/user/{owner_id}">More from {owner_name}</a>
</div>
</div>"#,
        title = escape(&note.title),
        edit = edit_icon(&note.user_id, viewer, note.id, false),
        subject = escape(&note.subject_code),
        date = format_date(&note.created_at, date_format),
        image = image_tag(note),
        description = escape(note.description.as_deref().unwrap_or_default()),
        link = escape(&note.link),
        owner_id = escape(&owner.id),
        owner_name = escape(&owner.display_name),
    );

    layout(&note.title, true, &body)
}

fn note_form(action: &str, heading: &str, note: Option<&Note>) -> String {
    let value = |f: fn(&Note) -> &str| note.map(|n| escape(f(n))).unwrap_or_default();
    let status = note.map_or(NoteStatus::Public, |n| n.status);

    format!(
        r#"<h3>{heading}</h3>
<form action="{action}" method="POST" enctype="multipart/form-data">
<label for="title">Title</label>
<input type="text" id="title" name="title" value="{title}" required>
<label for="status">Status</label>
<select id="status" name="status">
{options}
</select>
<label for="subjectCode">Subject Code</label>
<input type="text" id="subjectCode" name="subjectCode" value="{subject}" required>
<label for="link">Link</label>
<input type="url" id="link" name="link" value="{link}" required>
<label for="description">Description</label>
<textarea id="description" name="description">{description}</textarea>
<label for="preimage">Preview Image</label>
<input type="file" id="preimage" name="preimage" accept="image/*">
<input type="submit" value="Save" class="btn">
<a href="/dashboard" class="btn orange">Cancel</a>
</form>"#,
        title = value(|n| n.title.as_str()),
        options = select(status.as_str(), STATUS_OPTIONS),
        subject = value(|n| n.subject_code.as_str()),
        link = value(|n| n.link.as_str()),
        description = value(|n| n.description.as_deref().unwrap_or_default()),
    )
}

pub fn add_form() -> Html<String> {
    layout("Add Note", true, &note_form("/notes", "Add Note", None))
}

pub fn edit_form(note: &Note) -> Html<String> {
    let action = format!("/notes/{}?_method=PUT", note.id);
    layout("Edit Note", true, &note_form(&action, "Edit Note", Some(note)))
}

pub fn not_found() -> Html<String> {
    layout(
        "Not Found",
        true,
        "<h1>Uh Oh! Page not found</h1>\n<a href=\"/dashboard\">Back to dashboard</a>",
    )
}

pub fn server_error() -> Html<String> {
    layout(
        "Error",
        true,
        "<h1>Something went wrong</h1>\n<a href=\"/dashboard\">Back to dashboard</a>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use crate::models::Owner;

    fn note(id: i64, owner: &str) -> NoteWithOwner {
        NoteWithOwner {
            note: Note {
                id,
                title: "Sets <and> maps".to_string(),
                description: Some("Chapter 3".to_string()),
                status: NoteStatus::Private,
                user_id: owner.to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                link: "https://example.org/ch3".to_string(),
                subject_code: "CS201".to_string(),
                image_key: Some("abc123".to_string()),
            },
            owner: Owner {
                id: owner.to_string(),
                display_name: "Ada".to_string(),
            },
        }
    }

    #[test]
    fn index_shows_edit_icon_to_owner_only() {
        let notes = vec![note(1, "u")];

        let Html(as_owner) = notes_index(&notes, "u", "%Y");
        let Html(as_other) = notes_index(&notes, "v", "%Y");

        assert!(as_owner.contains("/notes/edit/1"));
        assert!(!as_other.contains("/notes/edit/1"));
        assert!(as_other.contains("/notes/images/abc123"));
        assert!(as_other.contains("Sets &lt;and&gt; maps"));
    }

    #[test]
    fn edit_form_preselects_status() {
        let entry = note(7, "u");

        let Html(page) = edit_form(&entry.note);

        assert!(page.contains(r#"action="/notes/7?_method=PUT""#));
        assert!(page.contains(r#"<option value="private" selected="selected">"#));
        assert!(page.contains(r#"value="CS201""#));
    }

    #[test]
    fn dashboard_greets_user_and_lists_delete_controls() {
        let entry = note(9, "u");

        let Html(page) = dashboard("Ada", &[entry.note], "%Y-%m-%d");

        assert!(page.contains("Welcome Ada"));
        assert!(page.contains("2024-01-02"));
        assert!(page.contains(r#"action="/notes/9?_method=DELETE""#));
    }
}
