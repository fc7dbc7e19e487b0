use thiserror::Error;

/// Failure while talking to the marketplace source or reading its answer
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Source answered with a non-success status
    #[error("{operation} returned status {status}")]
    Status { operation: String, status: u16 },

    /// Response body was not the JSON shape we expect
    #[error("Unexpected response for {operation}: {message}")]
    Decode { operation: String, message: String },

    /// A required field was absent on a raw ad
    #[error("Ad is missing required field '{0}'")]
    MissingField(&'static str),

    /// Ad ids are numeric; anything else is refused before a request is built
    #[error("Invalid ad id '{0}'")]
    InvalidAdId(String),
}

impl FetchError {
    pub fn decode(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Failure while delivering records to the message stream
#[derive(Error, Debug)]
pub enum PublishError {
    /// Could not open a client against the bootstrap servers
    #[error("Failed to connect to {bootstrap}: {message}")]
    Connect { bootstrap: String, message: String },

    /// Record could not be encoded as JSON
    #[error("Failed to serialize listing {listing_id}: {source}")]
    Serialize {
        listing_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Broker rejected the record or the ack wait expired
    #[error("Failed to send to {topic}: {message}")]
    Send { topic: String, message: String },

    /// Buffered sends could not be drained
    #[error("Flush failed: {0}")]
    Flush(String),
}

/// Failure while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_operation() {
        let err = FetchError::Status {
            operation: "search".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "search returned status 503");
    }

    #[test]
    fn connect_error_names_bootstrap() {
        let err = PublishError::Connect {
            bootstrap: "localhost:9092".to_string(),
            message: "timed out".to_string(),
        };
        assert!(err.to_string().contains("localhost:9092"));
    }
}
