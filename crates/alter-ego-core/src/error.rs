//! Transport failure taxonomy
//!
//! Validation rejections never get here: they are verdicts, handled locally
//! by the session. A `TransportFault` is what the backend call settles with
//! when it does not produce a reply.

use thiserror::Error;

/// Shown for faults that carry no message of their own.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Used when the server rejects a request without explaining why.
pub const SERVER_ERROR_MESSAGE: &str = "Server error occurred";

/// Used when no response could be obtained at all.
pub const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to server. Please check if the backend is running.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFault {
    /// A response arrived, with a non-success status
    #[error("{message}")]
    Server { status_code: u16, message: String },

    /// No response was obtained (connection failure or timeout)
    #[error("{message}")]
    Unreachable { message: String },

    #[error("An unexpected error occurred")]
    Unknown,
}

impl TransportFault {
    pub fn unreachable() -> Self {
        TransportFault::Unreachable {
            message: UNREACHABLE_MESSAGE.to_string(),
        }
    }

    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            TransportFault::Server { message, .. } | TransportFault::Unreachable { message } => {
                message.clone()
            }
            TransportFault::Unknown => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportFault::Server { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_per_category() {
        let server = TransportFault::Server {
            status_code: 500,
            message: "Failed to process chat message".to_string(),
        };
        assert_eq!(server.user_message(), "Failed to process chat message");
        assert_eq!(server.status_code(), Some(500));

        assert_eq!(TransportFault::unreachable().user_message(), UNREACHABLE_MESSAGE);
        assert_eq!(TransportFault::unreachable().status_code(), None);

        assert_eq!(TransportFault::Unknown.user_message(), "An unexpected error occurred");
    }

    #[test]
    fn test_display_matches_user_message() {
        let fault = TransportFault::unreachable();
        assert_eq!(fault.to_string(), fault.user_message());
        assert_eq!(TransportFault::Unknown.to_string(), UNEXPECTED_ERROR_MESSAGE);
    }
}
