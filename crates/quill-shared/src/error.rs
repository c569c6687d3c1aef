use thiserror::Error;

/// Client-fixable input problems. Every variant renders as a human
/// message suitable for the API envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username must be between 3-30 characters")]
    UsernameLength,

    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharset,

    #[error("Invalid email format")]
    EmailFormat,

    #[error("Password requires: {0}")]
    PasswordPolicy(String),

    #[error("Invalid image URL format")]
    ImageUrl,

    #[error("Title is required")]
    TitleRequired,

    #[error("Title cannot exceed {0} characters")]
    TitleTooLong(usize),

    #[error("Content is required")]
    ContentRequired,

    #[error("Comment text cannot be empty")]
    CommentRequired,

    #[error("Comment cannot exceed {0} characters")]
    CommentTooLong(usize),
}

/// Failures verifying a signed token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    /// Structurally valid token presented to the wrong endpoint, e.g. a
    /// password-reset token used for email verification.
    #[error("Token purpose mismatch")]
    Purpose,

    #[error("Token signing failed")]
    Signing,
}
