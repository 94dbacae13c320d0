// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;
use std::net::IpAddr;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a network prerequisite check can fail.
///
/// Transport problems (`Connectivity`) are kept apart from answers that
/// arrived but did not correlate with the request (`PathMismatch`,
/// `HostnameMismatch`, ...), so the report can tell "nothing is reachable"
/// from "the wrong thing answered".
#[derive(Debug)]
pub enum ValidationError {
    Connectivity {
        url: String,
        source: reqwest::Error,
    },
    Protocol(String),
    MalformedResponse {
        line: String,
    },
    PathMismatch {
        expected: String,
        observed: String,
    },
    MissingHostname,
    HostnameMismatch {
        expected: String,
        observed: String,
    },
    EnvironmentStartFailure {
        reason: String,
        source: Option<BoxError>,
    },
    NoResolution {
        hostname: String,
    },
    AmbiguousResolution {
        hostname: String,
        addresses: Vec<IpAddr>,
    },
    WrongTarget {
        hostname: String,
        expected: IpAddr,
        observed: IpAddr,
    },
    Resolution {
        hostname: String,
        source: BoxError,
    },
    Discovery {
        what: &'static str,
        source: BoxError,
    },
    PortTestFailed {
        host: String,
        port: u16,
        description: String,
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub fn environment_start(reason: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::EnvironmentStartFailure {
            reason: reason.into(),
            source,
        }
    }

    pub fn discovery(what: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Discovery {
            what,
            source: source.into(),
        }
    }

    /// Strips `PortTestFailed` wrappers and returns the error that actually
    /// ended the run.
    pub fn root(&self) -> &ValidationError {
        match self {
            Self::PortTestFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self.root(), Self::Connectivity { .. })
    }
}

fn join_addresses(addresses: &[IpAddr]) -> String {
    addresses
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity { url, .. } => write!(f, "Unable to reach {}", url),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::MalformedResponse { line } => {
                write!(f, "Invalid echo response line (no colon): {:?}", line)
            }
            Self::PathMismatch { expected, observed } => write!(
                f,
                "Echo server returned nonmatching HTTP path (correct is {:?}): {:?}",
                expected, observed
            ),
            Self::MissingHostname => write!(f, "Echo server did not return a hostname"),
            Self::HostnameMismatch { expected, observed } => write!(
                f,
                "Echo server returned nonmatching hostname (correct is {:?}): {:?}",
                expected, observed
            ),
            Self::EnvironmentStartFailure { reason, .. } => {
                write!(f, "Unable to launch port test stubs: {}", reason)
            }
            Self::NoResolution { hostname } => {
                write!(f, "DNS name {} does not resolve to any IP addresses", hostname)
            }
            Self::AmbiguousResolution {
                hostname,
                addresses,
            } => write!(
                f,
                "DNS name {} resolves to multiple IP addresses: [{}]",
                hostname,
                join_addresses(addresses)
            ),
            Self::WrongTarget {
                hostname,
                expected,
                observed,
            } => write!(
                f,
                "DNS name {} resolves to {}, not {}",
                hostname, observed, expected
            ),
            Self::Resolution { hostname, .. } => write!(f, "Unable to resolve {}", hostname),
            Self::Discovery { what, .. } => write!(f, "Unable to determine {}", what),
            Self::PortTestFailed {
                description,
                ..
            } => write!(f, "{} failed", description),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connectivity { source, .. } => Some(source),
            Self::EnvironmentStartFailure { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn std::error::Error + 'static)),
            Self::Resolution { source, .. } => Some(source.as_ref()),
            Self::Discovery { source, .. } => Some(source.as_ref()),
            Self::PortTestFailed { source, .. } => Some(source.as_ref()),
            Self::Protocol(_)
            | Self::MalformedResponse { .. }
            | Self::PathMismatch { .. }
            | Self::MissingHostname
            | Self::HostnameMismatch { .. }
            | Self::NoResolution { .. }
            | Self::AmbiguousResolution { .. }
            | Self::WrongTarget { .. } => None,
        }
    }
}

/// Pass is `Ok`, Fail is `Err` with the cause chained behind it.
pub type ValidationOutcome<T = ()> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_port_test_failure_chains_cause() {
        let err = ValidationError::PortTestFailed {
            host: "192.168.1.10".to_string(),
            port: 7080,
            description: "Test for hub LAN port 192.168.1.10:7080".to_string(),
            source: Box::new(ValidationError::MissingHostname),
        };

        assert_eq!(
            err.to_string(),
            "Test for hub LAN port 192.168.1.10:7080 failed"
        );
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "Echo server did not return a hostname");
        assert!(matches!(err.root(), ValidationError::MissingHostname));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_ambiguous_resolution_lists_addresses() {
        let err = ValidationError::AmbiguousResolution {
            hostname: "hub.example.com".to_string(),
            addresses: vec!["1.2.3.4".parse().unwrap(), "1.2.3.5".parse().unwrap()],
        };
        assert_eq!(
            err.to_string(),
            "DNS name hub.example.com resolves to multiple IP addresses: [1.2.3.4, 1.2.3.5]"
        );
    }

    #[test]
    fn test_environment_start_failure_without_source() {
        let err = ValidationError::environment_start("port 80 in use", None);
        assert!(err.source().is_none());
        assert!(err.to_string().contains("port 80 in use"));
    }
}
