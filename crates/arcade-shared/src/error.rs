use thiserror::Error;

/// Errors raised while turning raw transport payloads into typed values.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Unrecognized payload shape for {0}")]
    UnknownShape(&'static str),
}
