// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

#[derive(Debug)]
/// Represents the reasons a metrics backend can reject an instrument creation request.
///
/// Backends return this from every [`Meter`](crate::Meter) creation method. The registry
/// never propagates it to its own callers; it is wrapped into an [`Error`] and reported.
pub enum BackendError {
    /// An instrument with the same name is already registered with the backend
    DuplicateName {
        /// The metric name that was already taken
        name: String,
    },
    /// The backend rejected the instrument configuration (name, unit or description)
    InvalidConfiguration {
        /// Detailed message describing the rejected configuration
        details: String,
    },
    /// The backend cannot accept registrations right now
    Unavailable {
        /// Additional context about the outage
        details: String,
    },
    /// Any other backend-specific failure
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Wraps an arbitrary backend error.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        BackendError::Other(error.into())
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DuplicateName { name } => {
                write!(f, "instrument '{name}' is already registered")
            }
            BackendError::InvalidConfiguration { details } => {
                write!(f, "invalid instrument configuration: {details}")
            }
            BackendError::Unavailable { details } => {
                write!(f, "metrics backend unavailable: {details}")
            }
            BackendError::Other(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Other(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug)]
/// Represents errors raised while building the instrument registry.
///
/// There is exactly one kind of failure: the backend refused to create an instrument.
/// These errors are reported through the logger (or a custom handler installed with
/// [`ActorMetricsBuilder::on_error`](crate::ActorMetricsBuilder::on_error)) and the
/// affected instrument is left as a no-op handle.
pub enum Error {
    /// Error when the backend fails to create one instrument
    InstrumentCreation {
        /// Registry field name of the instrument, e.g. `DeadLetterCount`
        instrument: &'static str,
        /// Metric name that was requested, e.g. `protoactor_deadletter_count`
        name: &'static str,
        /// The original backend error
        source: BackendError,
    },
}

impl Error {
    /// Returns the registry field name of the instrument that failed.
    pub fn instrument(&self) -> &'static str {
        match self {
            Error::InstrumentCreation { instrument, .. } => instrument,
        }
    }

    /// Returns the metric name that was requested from the backend.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Error::InstrumentCreation { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InstrumentCreation {
                instrument, source, ..
            } => {
                write!(f, "failed to create {instrument} instrument, {source}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InstrumentCreation { source, .. } => Some(source),
        }
    }
}

/// A Result type specialized for metrics backend operations.
///
/// [`Meter`](crate::Meter) implementations return this from their creation methods.
pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_creation_error_names_instrument() {
        let err = Error::InstrumentCreation {
            instrument: "DeadLetterCount",
            name: "protoactor_deadletter_count",
            source: BackendError::DuplicateName {
                name: "protoactor_deadletter_count".to_string(),
            },
        };

        assert_eq!(err.instrument(), "DeadLetterCount");
        assert_eq!(err.metric_name(), "protoactor_deadletter_count");
        assert_eq!(
            err.to_string(),
            "failed to create DeadLetterCount instrument, instrument 'protoactor_deadletter_count' is already registered"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_backend_other_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "pipe closed");
        let err = BackendError::other(io);

        assert_eq!(err.to_string(), "pipe closed");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_backend_display() {
        let err = BackendError::Unavailable {
            details: "exporter shut down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "metrics backend unavailable: exporter shut down"
        );
        assert!(err.source().is_none());
    }
}
