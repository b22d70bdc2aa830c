use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid date: {0}")]
    Date(#[from] chrono::ParseError),

    #[error("Invalid number: {0}")]
    Number(#[from] std::num::ParseIntError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected markup at {url}: {reason}")]
    Markup { url: String, reason: String },

    #[error("Unknown bill type: {0}")]
    UnknownBillType(String),

    #[error("Vote counts do not add up at {url}: {yes} yes + {no} no + {other} other != {total}")]
    VoteCountMismatch {
        url: String,
        yes: u32,
        no: u32,
        other: u32,
        total: u32,
    },

    #[error("No subject search code for session {0}")]
    UnknownSession(String),

    #[error("Document conversion failed: {0}")]
    Conversion(String),
}

impl Error {
    pub(crate) fn markup(url: &str, reason: impl Into<String>) -> Self {
        Error::Markup {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
