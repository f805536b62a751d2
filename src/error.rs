use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Base location of the troubleshooting pages referenced by persistence errors.
pub const HELP_BASE: &str = "http://runphp.taosmi.es/faq";

pub type Result<T> = std::result::Result<T, Error>;

/// Every condition the framework can signal.
///
/// Routing and persistence never recover silently: the condition travels up to
/// the dispatcher (for routing) or to the direct caller (for persistence).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Page not found")]
    RouteNotFound { path: String },

    #[error("Route resolution failed: {reason}")]
    ResolutionFailed { reason: String },

    #[error("No handler registered for `{identifier}`")]
    HandlerNotRegistered { identifier: String },

    #[error("The connection to the persistence has failed.")]
    PersistenceUnavailable { resource: String, message: String },

    #[error("The query to the persistence has failed.")]
    QueryFailed { query: String, message: String },

    #[error("The repository has no source table.")]
    NoSourceTable,

    #[error("Invalid connection string: {0}")]
    InvalidConnectionSpec(String),

    #[error("Items must serialize to a non-empty map of fields: {0}")]
    InvalidItem(String),

    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        operation: &'static str,
        driver: &'static str,
    },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Handler { status: StatusCode, message: String },
}

impl Error {
    /// Convenience constructor for errors raised by application controllers.
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. })
            || matches!(self, Self::Handler { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// HTTP status carried by the condition; 500 unless the condition says otherwise.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Handler { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable diagnostic code for persistence failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::PersistenceUnavailable { .. } => Some("RPDO-01"),
            Self::QueryFailed { .. } => Some("RPDO-02"),
            Self::NoSourceTable => Some("RPDO-03"),
            _ => None,
        }
    }

    pub fn help_link(&self) -> Option<String> {
        self.code()
            .map(|code| format!("{}/{}", HELP_BASE, code.replace('-', "").to_lowercase()))
    }

    /// Diagnostic fields attached to structured error payloads.
    pub fn details(&self) -> Value {
        let mut details = match self {
            Self::RouteNotFound { path } => json!({ "path": path }),
            Self::ResolutionFailed { reason } => json!({ "reason": reason }),
            Self::HandlerNotRegistered { identifier } => json!({ "handler": identifier }),
            Self::PersistenceUnavailable { resource, message } => {
                json!({ "resource": resource, "error": message })
            }
            Self::QueryFailed { query, message } => json!({ "query": query, "error": message }),
            Self::InvalidConnectionSpec(reason) | Self::InvalidItem(reason) => {
                json!({ "error": reason })
            }
            Self::Unsupported { operation, driver } => {
                json!({ "operation": operation, "driver": driver })
            }
            Self::Io(err) => json!({ "error": err.to_string() }),
            Self::Serialization(err) => json!({ "error": err.to_string() }),
            Self::NoSourceTable | Self::Handler { .. } => json!({}),
        };

        if let (Some(code), Some(link), Value::Object(map)) =
            (self.code(), self.help_link(), &mut details)
        {
            map.insert("code".to_string(), json!(code));
            map.insert("helpLink".to_string(), json!(link));
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = Error::RouteNotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.is_not_found());
        assert_eq!(not_found.to_string(), "Page not found");

        assert_eq!(
            Error::NoSourceTable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::handler(StatusCode::CONFLICT, "busy").status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_persistence_details_carry_code_and_help() {
        let err = Error::QueryFailed {
            query: "SELEC 1".to_string(),
            message: "syntax error".to_string(),
        };
        let details = err.details();
        assert_eq!(details["query"], "SELEC 1");
        assert_eq!(details["code"], "RPDO-02");
        assert_eq!(details["helpLink"], format!("{}/rpdo02", HELP_BASE));

        assert!(Error::HandlerNotRegistered {
            identifier: "controllers::x".to_string()
        }
        .details()
        .get("code")
        .is_none());
    }
}
