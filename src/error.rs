// ============================================================================
// File: src/error.rs
// Error taxonomy shared by the pipeline, the agents and startup
// ============================================================================

/// Faults raised by collaborators and startup configuration.
///
/// Only `Configuration` is allowed to stop the process. Everything else is
/// absorbed by the step that produced it and turned into a fallback value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Booking resolution failed: {0}")]
    BookingResolution(String),
    #[error("Configuration fault: {0}")]
    Configuration(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

impl From<reqwest::Error> for PlannerError {
    /// The request URL is dropped: it carries the search API key.
    fn from(err: reqwest::Error) -> Self {
        let decode = err.is_decode();
        let message = err.without_url().to_string();
        if decode {
            PlannerError::MalformedResponse(message)
        } else {
            PlannerError::CollaboratorUnavailable(message)
        }
    }
}

/// Result of a step that degrades instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded { fallback: T, cause: PlannerError },
}

impl<T> Outcome<T> {
    pub fn degraded(fallback: T, cause: PlannerError) -> Self {
        Outcome::Degraded { fallback, cause }
    }

    /// Collapse a fallible call into an outcome, using `fallback` on error.
    pub fn recover(result: PlannerResult<T>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(cause) => Outcome::degraded(fallback(), cause),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(value) => value,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn cause(&self) -> Option<&PlannerError> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded { cause, .. } => Some(cause),
        }
    }

    pub fn into_parts(self) -> (T, Option<PlannerError>) {
        match self {
            Outcome::Ok(value) => (value, None),
            Outcome::Degraded { fallback, cause } => (fallback, Some(cause)),
        }
    }

    pub fn into_value(self) -> T {
        self.into_parts().0
    }
}
