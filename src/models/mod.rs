use chrono::{DateTime, Utc};

use std::{fmt, str::FromStr};

/// Visibility of a note. Private notes are readable by their owner only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteStatus {
    #[default]
    Public,
    Private,
}

impl NoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown note status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for NoteStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: NoteStatus,
    /// Owning identity, bound at creation and never reassigned
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub link: String,
    pub subject_code: String,
    /// Handle of the preview image in the blob store
    pub image_key: Option<String>,
}

impl Note {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteWithOwner {
    pub note: Note,
    pub owner: Owner,
}

/// The fields a submitted form may set on a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: NoteStatus,
    pub link: String,
    pub subject_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("public".parse::<NoteStatus>(), Ok(NoteStatus::Public));
        assert_eq!("private".parse::<NoteStatus>(), Ok(NoteStatus::Private));
        assert!("PUBLIC".parse::<NoteStatus>().is_err());
        assert_eq!(NoteStatus::default(), NoteStatus::Public);
    }
}
