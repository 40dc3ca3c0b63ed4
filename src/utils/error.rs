use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Too many writes for '{id}', retry in {retry_after_ms}ms")]
    RateLimited { id: String, retry_after_ms: u64 },

    #[error("Store read failed{}: {details}", fmt_status(.status))]
    StoreRead { status: Option<u16>, details: String },

    #[error("Store write failed{}: {details}", fmt_status(.status))]
    StoreWrite { status: Option<u16>, details: String },

    #[error("Write conflict for '{id}': base revision is stale")]
    WriteConflict { id: String },

    #[error("Outbound request failed: {reason}")]
    Outbound { reason: String },

    #[error("Stored record is malformed: {reason}")]
    MalformedRecord { reason: String },

    #[error("Serialized record is {length} units, bitmap holds {capacity}")]
    ImageOverflow { length: usize, capacity: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error '{field}': {message}")]
    Config { field: String, message: String },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl RelayError {
    /// HTTP status the error maps to on the endpoint surface.
    pub fn status(&self) -> u16 {
        match self {
            RelayError::InvalidInput { .. } => 400,
            RelayError::RateLimited { .. } => 429,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
