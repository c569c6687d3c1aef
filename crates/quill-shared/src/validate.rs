//! Field validation for user-supplied input.
//!
//! Checks mirror the store constraints: usernames are 3-30 chars of
//! `[A-Za-z0-9_]`, emails must look like `local@domain.tld` with a 2-6
//! letter TLD, image URLs must be http(s), titles cap at 100 chars and
//! comments at 300.

use crate::error::ValidationError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const TITLE_MAX: usize = 100;
pub const COMMENT_MAX: usize = 300;

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(ValidationError::UsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameCharset);
    }
    Ok(())
}

/// Lowercase and trim an email for storage and lookup, so addresses that
/// differ only by case or surrounding whitespace collide.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::EmailFormat);
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::EmailFormat);
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return Err(ValidationError::EmailFormat);
    }

    // The domain needs at least one dot and an alphabetic TLD of 2-6 chars.
    let Some((name, tld)) = domain.rsplit_once('.') else {
        return Err(ValidationError::EmailFormat);
    };
    if name.is_empty()
        || tld.len() < 2
        || tld.len() > 6
        || !tld.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(ValidationError::EmailFormat);
    }

    Ok(())
}

pub fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.contains(' ') && !rest.contains('"') => Ok(()),
        _ => Err(ValidationError::ImageUrl),
    }
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ValidationError::TitleTooLong(TITLE_MAX));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::ContentRequired);
    }
    Ok(())
}

/// Validate and trim comment text.
pub fn validate_comment(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::CommentRequired);
    }
    if trimmed.chars().count() > COMMENT_MAX {
        return Err(ValidationError::CommentTooLong(COMMENT_MAX));
    }
    Ok(trimmed)
}
