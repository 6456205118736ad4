//! Error types for the DigitalOcean volume client.

use thiserror::Error;

use crate::volume::ResizeTargetError;

/// Errors raised by the DigitalOcean volume client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CloudError {
    /// Raised when the HTTP client cannot be built from configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a request cannot be sent or its body cannot be read.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Endpoint that was called.
        url: String,
        /// Message returned by the HTTP client.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("API returned HTTP {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// Raised when a success response is not the JSON shape expected.
    #[error("malformed API response (HTTP {status}): {message}; body: {body}")]
    MalformedResponse {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when no volume carries the requested name in the region.
    #[error("volume '{name}' not found in region {region}")]
    VolumeNotFound {
        /// Requested volume name.
        name: String,
        /// Region searched.
        region: String,
    },
    /// Raised when more than one volume carries the requested name.
    #[error("volume name '{name}' is ambiguous in region {region}: {count} matches")]
    AmbiguousVolume {
        /// Requested volume name.
        name: String,
        /// Region searched.
        region: String,
        /// Number of volumes that matched.
        count: usize,
    },
    /// Raised when the resize target is rejected before any request is sent.
    #[error("invalid resize of volume {volume_id}: {source}")]
    InvalidResize {
        /// Volume that would have been resized.
        volume_id: String,
        /// Reason the target was rejected.
        #[source]
        source: ResizeTargetError,
    },
}
