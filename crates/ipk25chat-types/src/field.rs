//! Field limits shared by both wire encodings.
//!
//! | field        | length  | alphabet              |
//! |--------------|---------|-----------------------|
//! | username     | 1..=20  | `[A-Za-z0-9_-]`       |
//! | channel id   | 1..=20  | `[A-Za-z0-9_-]`       |
//! | secret       | 1..=128 | `[A-Za-z0-9_-]`       |
//! | display name | 1..=20  | printable `0x21-0x7E` |
//! | content      | 1..=1400| printable + space     |

use thiserror::Error;

pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_CHANNEL_ID_LEN: usize = 20;
pub const MAX_SECRET_LEN: usize = 128;
pub const MAX_DISPLAY_NAME_LEN: usize = 20;
pub const MAX_CONTENT_LEN: usize = 1400;

/// A string field that violates its protocol limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {len} characters long, limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} contains disallowed character {ch:?}")]
    BadCharacter { field: &'static str, ch: char },
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_visible_char(c: char) -> bool {
    ('\x21'..='\x7e').contains(&c)
}

fn is_content_char(c: char) -> bool {
    c == ' ' || is_visible_char(c)
}

fn check(
    field: &'static str,
    value: &str,
    max: usize,
    allowed: fn(char) -> bool,
) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::Empty { field });
    }
    if let Some(ch) = value.chars().find(|c| !allowed(*c)) {
        return Err(FieldError::BadCharacter { field, ch });
    }
    // Every allowed character is ASCII, so bytes == characters here.
    if value.len() > max {
        return Err(FieldError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

pub fn validate_username(value: &str) -> Result<(), FieldError> {
    check("username", value, MAX_USERNAME_LEN, is_identifier_char)
}

pub fn validate_channel_id(value: &str) -> Result<(), FieldError> {
    check("channel id", value, MAX_CHANNEL_ID_LEN, is_identifier_char)
}

pub fn validate_secret(value: &str) -> Result<(), FieldError> {
    check("secret", value, MAX_SECRET_LEN, is_identifier_char)
}

pub fn validate_display_name(value: &str) -> Result<(), FieldError> {
    check(
        "display name",
        value,
        MAX_DISPLAY_NAME_LEN,
        is_visible_char,
    )
}

pub fn validate_content(value: &str) -> Result<(), FieldError> {
    check("message content", value, MAX_CONTENT_LEN, is_content_char)
}
