use thiserror::Error;

/// Why a remote sheet could not be turned into fresh data. The `Display`
/// text is what ends up in the store's error field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Failed to fetch sheet: {status} {reason}")]
    Http { status: u16, reason: String },

    #[error("Failed to reach sheet API: {0}")]
    Transport(String),

    #[error("Malformed sheet payload: {0}")]
    Decode(String),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0} not found")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_includes_status() {
        let err = FetchError::Http {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch sheet: 503 Service Unavailable"
        );
    }

    #[test]
    fn rejected_error_is_server_message() {
        let err = FetchError::Rejected("Sheet not found".to_string());
        assert_eq!(err.to_string(), "Sheet not found");
    }

    #[test]
    fn app_error_wraps_fetch_transparently() {
        let err: AppError = FetchError::Transport("timed out".to_string()).into();
        assert_eq!(err.to_string(), "Failed to reach sheet API: timed out");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = AppError::NotFound("topic 'graphs'".to_string());
        assert_eq!(err.to_string(), "topic 'graphs' not found");
    }
}
