use thiserror::Error;

use crate::dashboard::DashboardError;
use crate::render::RenderError;

/// Failures raised by the sharing and unfurl flows before they reach an
/// HTTP boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("unhandled event type: {0}")]
    UnhandledEvent(String),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("integration failure: {0}")]
    Integration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested dashboard could not be found.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::MalformedRequest(message)
            | ApplicationError::UnhandledEvent(message) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Dashboard(DashboardError::NotFound(uid)) => {
                Self::NotFound { message: format!("dashboard `{uid}` not found"), correlation_id }
            }
            ApplicationError::Dashboard(error @ DashboardError::Unavailable(_)) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::Render(error) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::Integration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dashboard::DashboardError;
    use crate::errors::{ApplicationError, InterfaceError};
    use crate::render::RenderError;

    #[test]
    fn malformed_request_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::MalformedRequest("expected JSON object".to_owned())
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn dashboard_miss_maps_to_not_found() {
        let interface = ApplicationError::from(DashboardError::NotFound("abc".to_owned()))
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert!(interface.message().contains("abc"));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn dashboard_lookup_outage_maps_to_internal() {
        let interface =
            ApplicationError::from(DashboardError::Unavailable("connection refused".to_owned()))
                .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
    }

    #[test]
    fn render_failure_maps_to_internal() {
        let interface = ApplicationError::from(RenderError::Timeout { timeout_ms: 60_000 })
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn integration_failure_keeps_its_message_as_internal() {
        let interface = ApplicationError::Integration("slack rejected the token".to_owned())
            .into_interface("req-5");

        assert!(matches!(
            interface,
            InterfaceError::Internal { ref message, ref correlation_id }
                if message == "slack rejected the token" && correlation_id == "req-5"
        ));
    }
}
