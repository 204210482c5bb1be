use thiserror::Error;

/// Failure reported by a remote collaborator: the document store, the
/// places service or an image host.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - credentials may be missing or expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map a Places API `status` field to an error. Only called for
    /// non-`OK` statuses.
    pub fn from_places_status(status: &str, message: Option<&str>, place_id: &str) -> Self {
        let detail = match message {
            Some(msg) if !msg.is_empty() => format!("{} ({})", place_id, msg),
            _ => place_id.to_string(),
        };
        match status {
            "NOT_FOUND" | "ZERO_RESULTS" | "INVALID_REQUEST" => ApiError::NotFound(detail),
            "OVER_QUERY_LIMIT" => ApiError::RateLimited,
            "REQUEST_DENIED" => ApiError::AccessDenied(detail),
            other => ApiError::InvalidResponse(format!("Places status {}: {}", other, detail)),
        }
    }
}
