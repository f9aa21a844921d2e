use crate::models::Division;

/// Failure taxonomy for everything that talks to the invoice service or
/// prepares payloads for it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 from the backend; the session token is missing or expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 404 for a division/id pair that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response, with the backend's `error` message
    /// when the body carried one.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// No response at all (DNS, refused connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Client-side precondition failed before any request was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Tabular export over zero records; there is no first record to
    /// derive headers from.
    #[error("cannot export an empty record set")]
    EmptyExport,

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

/// One division's fetch failure inside a multi-division merge. Non-fatal:
/// the merge keeps whatever the other divisions returned.
#[derive(Debug)]
pub struct DivisionFailure {
    pub division: Division,
    pub error: ApiError,
}
