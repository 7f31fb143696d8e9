// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Error types for the ingestion engine

use thiserror::Error;

/// Main error type for engine operations
///
/// Every variant is confined to the message that triggered it; none of these
/// abort processing of subsequent messages.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Payload did not parse as a number where one was required
    #[error("Malformed payload on '{topic}': {payload:?}")]
    MalformedPayload { topic: String, payload: String },

    /// Channel not in the declared schema
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// Control factor not in the declared schema
    #[error("Unknown control factor: {0}")]
    UnknownFactor(String),

    /// Level not declared for the named factor
    #[error("Unknown level '{level}' for factor '{factor}'")]
    UnknownLevel { factor: String, level: String },

    /// Publish attempted while the transport is disconnected
    #[error("Transport unavailable (not connected)")]
    TransportUnavailable,

    /// Transport accepted the call but reported a failure
    #[error("Publish failed on '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
