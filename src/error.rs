//! Error types for Linkpool
//!
//! This module defines the error taxonomy shared by both pool roles.

use std::io;
use std::net::IpAddr;
use thiserror::Error;

/// Main error type for pool operations
///
/// [`PoolError::NotFound`] and [`PoolError::Insufficient`] are the only errors
/// the acquisition API returns. Connection attempt failures are handled
/// inside the manager loops and never reach an acquiring caller.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Raw transport connection could not be opened
    #[error("Dial failed: {0}")]
    Dial(#[source] io::Error),

    /// TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    /// Short or timed-out connection ID exchange
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Availability queue rejected a non-blocking enqueue
    #[error("Pool is full")]
    PoolFull,

    /// Connection ID is already registered
    #[error("Connection ID already in use: {0}")]
    IdCollision(String),

    /// Peer address is not the allow-listed client
    #[error("Unauthorized client address: {0}")]
    Auth(IpAddr),

    /// Acquire-by-ID timed out
    #[error("Pool connection not found: {0}")]
    NotFound(String),

    /// Acquire-any timed out
    #[error("Insufficient pool connections")]
    Insufficient,

    /// Attempt aborted because the lifecycle token was canceled
    #[error("Pool activity canceled")]
    Canceled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PoolError {
    /// Whether this is one of the caller-facing acquisition timeouts
    pub fn is_acquisition_timeout(&self) -> bool {
        matches!(self, PoolError::NotFound(_) | PoolError::Insufficient)
    }
}

/// Result alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;
