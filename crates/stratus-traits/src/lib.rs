//! # Stratus Traits
//!
//! This crate provides the contracts between the Stratus waiter core and the
//! generated per-resource client layer. A generated client supplies one
//! [`StateProbe`] per resource type; the waiter consumes nothing else from it.
//!
//! ## Core Traits
//!
//! - [`StateProbe`] - one "get current state" round-trip against the service
//! - [`ResourceSnapshot`] - the probe's view of a resource, exposing its
//!   lifecycle state
//! - [`HasRequestId`] - shared capability for responses that carry an opaque
//!   service request id
//!
//! ## Example
//!
//! ```ignore
//! use stratus_traits::prelude::*;
//!
//! async fn current_state<P: StateProbe>(probe: &P) -> ProbeResult<String> {
//!     let snapshot = probe.fetch().await?;
//!     Ok(format!("{:?}", snapshot.lifecycle_state()))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a single state-probe round-trip.
///
/// Covers the failure modes the generated client layer can surface from one
/// "get current state" call. The waiter retries transient variants a bounded
/// number of times; everything else is surfaced to the caller immediately.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Connection to the service endpoint failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The round-trip exceeded the client's request timeout
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that was exceeded
        seconds: u64,
    },

    /// The service throttled the request
    #[error("rate limited by service")]
    RateLimited {
        /// Server-suggested retry delay, when the response carried one
        retry_after_secs: Option<u64>,
    },

    /// The service answered with an error status
    #[error("service error {status}: {message}")]
    Service {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
        /// Opaque request id for support correlation, when present
        request_id: Option<String>,
    },

    /// The resource does not exist (or is not visible to the caller)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The caller is not authorized to read the resource
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The response body could not be decoded into a snapshot
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ProbeError {
    /// Returns true if retrying the probe may succeed.
    ///
    /// Connection failures, timeouts, throttling, and retryable status codes
    /// are transient. Missing resources, authorization failures, and decode
    /// errors are not: repeating the identical request cannot change them.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Service { status, .. } => Self::is_status_transient(*status),
            Self::NotFound(_) | Self::Unauthorized(_) | Self::Decode(_) => false,
        }
    }

    /// Check if an HTTP status code indicates a transient service failure
    pub fn is_status_transient(status: u16) -> bool {
        matches!(
            status,
            408 | // Request Timeout
            425 | // Too Early
            429 | // Too Many Requests
            500 | // Internal Server Error
            502 | // Bad Gateway
            503 | // Service Unavailable
            504   // Gateway Timeout
        )
    }

    /// Returns the server-suggested retry delay, if the error carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Returns the service request id attached to the error, if any
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Service { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// A point-in-time view of a resource as reported by the service.
///
/// The waiter only ever reads the lifecycle state; the resource id is used
/// for log correlation when the snapshot exposes one.
pub trait ResourceSnapshot: Send {
    /// The lifecycle-state token type for this resource.
    ///
    /// Semantically opaque to the waiter: any comparable, cloneable token
    /// works, whether a resource-specific enum or a plain string.
    type State: Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Returns the lifecycle state the service reported
    fn lifecycle_state(&self) -> &Self::State;

    /// Returns the resource identifier, when the snapshot carries one
    fn resource_id(&self) -> Option<&str> {
        None
    }
}

/// One "get current state" round-trip against the target service.
///
/// Implemented by the generated per-resource client layer, typically by
/// binding a get-request to the client that executes it. Implementations
/// must be safe to call repeatedly: the waiter issues one `fetch` per poll
/// attempt and never holds more than one round-trip in flight.
#[async_trait]
pub trait StateProbe: Send + Sync {
    /// Snapshot type returned by a successful round-trip
    type Snapshot: ResourceSnapshot;

    /// Fetches the current state of the resource
    async fn fetch(&self) -> ProbeResult<Self::Snapshot>;
}

/// Shared capability for values that carry an opaque service request id.
///
/// Generated request and response values attach a per-call request id for
/// support correlation. Rather than a common base class, the capability is
/// composed into each value that has one.
pub trait HasRequestId {
    /// Returns the opaque request id, when present
    fn request_id(&self) -> Option<&str>;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{HasRequestId, ProbeError, ProbeResult, ResourceSnapshot, StateProbe};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::Service {
            status: 503,
            message: "upstream unavailable".to_string(),
            request_id: Some("req-123".to_string()),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProbeError::ConnectionFailed("refused".into()).is_transient());
        assert!(ProbeError::Timeout { seconds: 30 }.is_transient());
        assert!(ProbeError::RateLimited {
            retry_after_secs: None
        }
        .is_transient());

        assert!(!ProbeError::NotFound("ocid.gw.123".into()).is_transient());
        assert!(!ProbeError::Unauthorized("missing policy".into()).is_transient());
        assert!(!ProbeError::Decode("unexpected field".into()).is_transient());
    }

    #[test]
    fn test_status_transience() {
        assert!(ProbeError::is_status_transient(429));
        assert!(ProbeError::is_status_transient(500));
        assert!(ProbeError::is_status_transient(503));

        assert!(!ProbeError::is_status_transient(200));
        assert!(!ProbeError::is_status_transient(400));
        assert!(!ProbeError::is_status_transient(404));
        assert!(!ProbeError::is_status_transient(409));
    }

    #[test]
    fn test_service_status_drives_transience() {
        let retryable = ProbeError::Service {
            status: 502,
            message: "bad gateway".into(),
            request_id: None,
        };
        assert!(retryable.is_transient());

        let terminal = ProbeError::Service {
            status: 400,
            message: "bad request".into(),
            request_id: None,
        };
        assert!(!terminal.is_transient());
    }

    #[test]
    fn test_retry_after_hint() {
        let hinted = ProbeError::RateLimited {
            retry_after_secs: Some(7),
        };
        assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));

        let unhinted = ProbeError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(unhinted.retry_after(), None);

        assert_eq!(ProbeError::Timeout { seconds: 10 }.retry_after(), None);
    }

    #[test]
    fn test_error_request_id() {
        let err = ProbeError::Service {
            status: 500,
            message: "oops".into(),
            request_id: Some("req-42".into()),
        };
        assert_eq!(err.request_id(), Some("req-42"));
        assert_eq!(ProbeError::NotFound("x".into()).request_id(), None);
    }

    struct GatewaySnapshot {
        state: &'static str,
        id: String,
    }

    impl ResourceSnapshot for GatewaySnapshot {
        type State = &'static str;

        fn lifecycle_state(&self) -> &Self::State {
            &self.state
        }

        fn resource_id(&self) -> Option<&str> {
            Some(&self.id)
        }
    }

    impl HasRequestId for GatewaySnapshot {
        fn request_id(&self) -> Option<&str> {
            None
        }
    }

    struct FixedProbe;

    #[async_trait]
    impl StateProbe for FixedProbe {
        type Snapshot = GatewaySnapshot;

        async fn fetch(&self) -> ProbeResult<Self::Snapshot> {
            Ok(GatewaySnapshot {
                state: "Available",
                id: "gw-1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_probe_round_trip() {
        let probe = FixedProbe;
        let snapshot = probe.fetch().await.unwrap();
        assert_eq!(*snapshot.lifecycle_state(), "Available");
        assert_eq!(snapshot.resource_id(), Some("gw-1"));
        assert_eq!(HasRequestId::request_id(&snapshot), None);
    }
}
