#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum MappingError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Category '{category}' failed at offset {offset} ({retained} mappings retained): {source}"
    )]
    CategoryFailed {
        category: String,
        offset: usize,
        retained: usize,
        #[source]
        source: Box<MappingError>,
    },

    #[error("Could not load mapping table from {location}: {reason}")]
    TableLoad { location: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MappingError {
    /// True for failures worth another attempt at the same page offset.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => is_transient_transport(err),
            Self::HttpMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                is_transient_transport(err)
            }
            Self::HttpMiddleware(_) => false,
            Self::Api { message, .. } => {
                message.starts_with("HTTP 5") || message.starts_with("HTTP 429")
            }
            _ => false,
        }
    }
}

fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::MappingError;

    #[test]
    fn category_failed_display_includes_offset_and_retained_count() {
        let err = MappingError::CategoryFailed {
            category: "gene".to_string(),
            offset: 4200,
            retained: 137,
            source: Box::new(MappingError::Api {
                api: "monarch".to_string(),
                message: "HTTP 502 Bad Gateway: upstream".to_string(),
            }),
        };

        let msg = err.to_string();
        assert!(msg.contains("Category 'gene' failed at offset 4200"));
        assert!(msg.contains("137 mappings retained"));
        assert!(msg.contains("HTTP 502"));
    }

    #[test]
    fn table_load_display_includes_location() {
        let err = MappingError::TableLoad {
            location: "data/monarch-omim.json".to_string(),
            reason: "No such file or directory".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("data/monarch-omim.json"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn api_error_display_includes_api_name() {
        let err = MappingError::Api {
            api: "monarch".to_string(),
            message: "HTTP 500".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("monarch"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn server_errors_are_transient_but_bad_requests_are_not() {
        let server = MappingError::Api {
            api: "monarch".into(),
            message: "HTTP 503 Service Unavailable: busy".into(),
        };
        let client = MappingError::Api {
            api: "monarch".into(),
            message: "HTTP 400 Bad Request: bad category".into(),
        };
        let invalid = MappingError::InvalidArgument("page size".into());

        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(!invalid.is_transient());
    }

    #[test]
    fn middleware_failures_are_not_retried_again() {
        let err = MappingError::HttpMiddleware(reqwest_middleware::Error::Middleware(
            anyhow::anyhow!("retry budget exhausted"),
        ));

        assert!(!err.is_transient());
    }
}
