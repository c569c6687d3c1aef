//! # quill-shared
//!
//! Domain-neutral building blocks shared by the Quill store and server:
//!
//! - the visibility state machine governing soft-delete / restore /
//!   approve / ban flags on users, posts, and comments
//! - password policy enforcement and argon2 hashing
//! - signed, purpose-scoped tokens for sessions, email verification,
//!   and password reset
//! - field validation for usernames, emails, URLs, and content lengths

pub mod moderation;
pub mod password;
pub mod token;
pub mod validate;

mod error;

pub use error::{TokenError, ValidationError};
pub use moderation::{AccountFlags, AccountStanding, LoginDenied, Role, Visibility};
pub use token::TokenSigner;
