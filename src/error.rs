//! Error taxonomy shared across the robot client.

use thiserror::Error;

use crate::addr::AddrError;

/// Errors raised by the robot API client and the web panel scraper.
#[derive(Debug, Error)]
pub enum RobotError {
    /// Raised when the account configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the structured API answers with a non-success status.
    #[error("robot API request failed with status {status}: {message}")]
    Transport {
        /// HTTP status reported by the provider.
        status: u16,
        /// Provider supplied message, or a placeholder when absent.
        message: String,
    },
    /// Raised when a single resource does not exist on the remote side.
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource, e.g. `ip 1.2.3.4`.
        resource: String,
    },
    /// Raised when an expected field or envelope is missing from a response.
    ///
    /// This is a protocol contract violation and is never retried.
    #[error("malformed '{entity}' document: {message}")]
    MalformedResponse {
        /// Envelope key the document was expected to carry.
        entity: &'static str,
        /// Decoder message naming the offending field.
        message: String,
    },
    /// Raised for invalid input to the address range arithmetic.
    #[error(transparent)]
    Addr(#[from] AddrError),
    /// Raised when an expected structure is missing from a scraped page.
    #[error("web panel scraping failed: {0}")]
    Scraping(String),
    /// Raised when a credential form submission is rejected by the panel.
    #[error("unable to {operation}{}", format_reasons(.reasons))]
    Credential {
        /// Operation that failed, e.g. `create admin account`.
        operation: String,
        /// Validation reasons extracted from the response, possibly empty.
        reasons: Vec<String>,
    },
    /// Raised when a request fails before any HTTP status is available.
    #[error("HTTP request failed: {0}")]
    Http(String),
    /// Raised when an operation needs the server's primary IP but none was
    /// resolved from the server document.
    #[error("server #{server_number} has no resolved primary IP")]
    MissingPrimaryIp {
        /// Numeric identifier of the affected server.
        server_number: u32,
    },
    /// Raised when the askpass helper cannot be materialised on disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Raised when a spawned helper process exits unsuccessfully.
    #[error("{program} exited with status {status:?}")]
    CommandFailure {
        /// Program that was spawned.
        program: String,
        /// Exit code, `None` when terminated by a signal.
        status: Option<i32>,
    },
}

impl RobotError {
    /// Returns `true` when the error denotes an absent remote resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Transport { status: 404, .. }
        )
    }
}

impl From<crate::config::ConfigError> for RobotError {
    fn from(value: crate::config::ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<reqwest::Error> for RobotError {
    fn from(value: reqwest::Error) -> Self {
        value.status().map_or_else(
            || Self::Http(value.to_string()),
            |status| Self::Transport {
                status: status.as_u16(),
                message: value.to_string(),
            },
        )
    }
}

fn format_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(": {}", reasons.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::RobotError;

    #[test]
    fn credential_display_joins_reasons_with_commas() {
        let err = RobotError::Credential {
            operation: String::from("create admin account"),
            reasons: vec![String::from("too short"), String::from("no digits")],
        };
        assert_eq!(
            err.to_string(),
            "unable to create admin account: too short, no digits"
        );
    }

    #[test]
    fn credential_display_without_reasons_stays_generic() {
        let err = RobotError::Credential {
            operation: String::from("delete admin account"),
            reasons: Vec::new(),
        };
        assert_eq!(err.to_string(), "unable to delete admin account");
    }

    #[test]
    fn not_found_predicate_covers_both_variants() {
        let direct = RobotError::NotFound {
            resource: String::from("ip 1.2.3.4"),
        };
        let transport = RobotError::Transport {
            status: 404,
            message: String::from("SERVER_NOT_FOUND"),
        };
        let other = RobotError::Transport {
            status: 500,
            message: String::from("boom"),
        };
        assert!(direct.is_not_found());
        assert!(transport.is_not_found());
        assert!(!other.is_not_found());
    }
}
