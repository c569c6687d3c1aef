//! Route handlers, grouped by API area.

pub mod admin;
pub mod auth;
pub mod posts;
pub mod users;

use serde::Serialize;

/// Success envelope for message-only responses.
#[derive(Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

/// Success envelope carrying a payload, with an optional message.
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data,
        }
    }
}

/// Success envelope for collections, with the item count echoed.
#[derive(Serialize)]
pub struct ListResponse<T> {
    pub status: &'static str,
    pub results: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            status: "success",
            results: data.len(),
            data,
        }
    }
}
