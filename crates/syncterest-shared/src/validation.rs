//! Form validation schemas.
//!
//! Each form validates as a whole and reports one [`FieldError`] per
//! offending field so callers can surface messages inline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BIO_CHARS, MAX_MESSAGE_CHARS};

/// A validation failure tied to a named field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type ValidationResult = Result<(), Vec<FieldError>>;

fn finish(errors: Vec<FieldError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Profile edit / onboarding form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    pub username: String,
    pub bio: Option<String>,
    pub interests: Vec<String>,
}

impl ProfileForm {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("full_name", "Full name is required"));
        }

        let username = self.username.trim();
        if !(3..=30).contains(&username.len()) {
            errors.push(FieldError::new(
                "username",
                "Username must be between 3 and 30 characters",
            ));
        } else if !username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            errors.push(FieldError::new(
                "username",
                "Username may only contain lowercase letters, digits and underscores",
            ));
        }

        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_CHARS {
                errors.push(FieldError::new(
                    "bio",
                    format!("Bio must be at most {MAX_BIO_CHARS} characters"),
                ));
            }
        }

        if self.interests.is_empty() {
            errors.push(FieldError::new(
                "interests",
                "Pick at least one interest",
            ));
        }

        finish(errors)
    }
}

/// Group creation form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupForm {
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
}

impl GroupForm {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "Group name is required"));
        } else if name.len() > 80 {
            errors.push(FieldError::new(
                "name",
                "Group name must be at most 80 characters",
            ));
        }

        finish(errors)
    }
}

/// Event creation form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventForm {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub location_name: Option<String>,
    pub image_path: Option<String>,
}

impl EventForm {
    pub fn validate(&self, now: DateTime<Utc>) -> ValidationResult {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Event title is required"));
        }
        if self.starts_at <= now {
            errors.push(FieldError::new(
                "starts_at",
                "Event start must be in the future",
            ));
        }

        finish(errors)
    }
}

/// Message compose form. Valid when it has trimmed text or an attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDraft {
    pub body: String,
    pub attachment_path: Option<String>,
}

impl MessageDraft {
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let body = self.body.trim();
        if body.is_empty() && self.attachment_path.is_none() {
            errors.push(FieldError::new("body", "Message cannot be empty"));
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            errors.push(FieldError::new(
                "body",
                format!("Message must be at most {MAX_MESSAGE_CHARS} characters"),
            ));
        }

        finish(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn profile_requires_all_onboarding_fields() {
        let form = ProfileForm::default();
        let errors = form.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"full_name"));
        assert!(fields.contains(&"username"));
        assert!(fields.contains(&"interests"));
    }

    #[test]
    fn profile_rejects_bad_username_chars() {
        let form = ProfileForm {
            full_name: "Ada Lovelace".into(),
            username: "Ada Lovelace".into(),
            bio: None,
            interests: vec!["math".into()],
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn valid_profile_passes() {
        let form = ProfileForm {
            full_name: "Ada Lovelace".into(),
            username: "ada_l".into(),
            bio: Some("analyst".into()),
            interests: vec!["math".into()],
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn draft_with_attachment_and_no_text_is_valid() {
        let draft = MessageDraft {
            body: "   ".into(),
            attachment_path: Some("photo.jpg".into()),
        };
        assert!(draft.validate().is_ok());

        let empty = MessageDraft::default();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn event_must_start_in_future() {
        let now = Utc::now();
        let form = EventForm {
            title: "Launch".into(),
            description: None,
            starts_at: now - Duration::hours(1),
            location_name: None,
            image_path: None,
        };
        let errors = form.validate(now).unwrap_err();
        assert_eq!(errors[0].field, "starts_at");
    }
}
