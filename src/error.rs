//! Error types for docferry.

use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Service list is empty; at least one download service is required")]
    NoServices,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response: {0}")]
    SendFailed(String),

    #[error("Failed to deliver document: {0}")]
    DeliveryFailed(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a document could not be resolved to PDF bytes.
///
/// This is the classification handed to the caller once the resolver has
/// given up. Per-service faults stay internal; only the overall verdict
/// crosses this boundary.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Input does not reference a downloadable document")]
    InvalidReference,

    #[error("Every download service timed out after {per_call:?} per call")]
    Timeout { per_call: Duration },

    #[error("Document {id} is not retrievable through any configured service")]
    NotRetrievable { id: String },

    #[error("Transport failure before any service answered: {0}")]
    TransportError(String),
}

/// A fault raised by the HTTP transport for a single call.
///
/// Distinguishes a blown time budget from every other connection-level
/// failure so the resolver can classify an exhausted run.
#[derive(Debug, thiserror::Error)]
pub enum TransportFault {
    #[error("Call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Network failure: {0}")]
    Network(String),
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Notice update failed: {0}")]
    Notice(String),

    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
