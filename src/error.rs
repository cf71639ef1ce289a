//! Error types and handling infrastructure for umlautkb.
//!
//! This module provides a centralized error handling system using `thiserror`
//! for the error conditions the driver can report to its callers. Completion
//! (interrupt) context has no caller to report to; failures there are logged
//! and never surface through these types.

use thiserror::Error;

/// The main error type for umlautkb operations.
///
/// Covers every condition the driver reports from call context: session
/// open, power transitions, and attach/detach. Transfer statuses are not
/// errors (see [`crate::transport::TransferStatus`]).
#[derive(Error, Debug)]
pub enum UmlautKbError {
    /// The interface has no bound device (detached, or never attached).
    #[error("no such device")]
    NoDevice,

    /// The bus power-management layer refused to wake the interface.
    #[error("power management request failed: {message}")]
    PowerManagement { message: String },

    /// An asynchronous read could not be queued on the endpoint.
    #[error("transfer submission failed: {message}")]
    Submit { message: String },

    /// The logical input device could not be registered with the sink.
    #[error("input device registration failed: {message}")]
    Registration { message: String },

    /// A read is already outstanding on the endpoint.
    #[error("a transfer is already pending on this device")]
    TransferPending,

    /// Generic error for cases not covered by specific variants.
    #[error("operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for umlautkb operations.
pub type Result<T> = std::result::Result<T, UmlautKbError>;

impl UmlautKbError {
    /// Create a PowerManagement error with a descriptive message
    pub fn power_management(message: impl Into<String>) -> Self {
        Self::PowerManagement {
            message: message.into(),
        }
    }

    /// Create a Submit error with a descriptive message
    pub fn submit(message: impl Into<String>) -> Self {
        Self::Submit {
            message: message.into(),
        }
    }

    /// Create a Registration error with a descriptive message
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
