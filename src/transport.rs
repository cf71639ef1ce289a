//! Bus transport abstraction.
//!
//! This module defines the contract the driver consumes from the transport
//! layer: queueing recurring interrupt reads against an endpoint, observing
//! their completions, cancelling them with a hard quiescence guarantee, and
//! the power-management hints the session controller issues. The trait keeps
//! the driver testable against a scripted transport and portable across bus
//! backends.

use crate::error::Result;
use async_trait::async_trait;

/// Address of the keypad's interrupt IN endpoint.
pub const INTERRUPT_ENDPOINT: u8 = 0x81;

/// Fixed length of one interrupt report from the device.
pub const REPORT_LEN: usize = 8;

/// Identifier of a claimed bus interface.
///
/// Opaque to the driver; the attach dispatcher hands it over and every later
/// lifecycle call uses it to look the device back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u32);

impl std::fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bus-assigned identity of the device, forwarded verbatim to the input
/// sink when the logical input device is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusDeviceId {
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// Why the host is suspending the device.
///
/// Forwarded by the bus with its suspend notification; the driver only
/// logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// System sleep.
    Suspend,
    /// System hibernation.
    Hibernate,
    /// Bus-initiated runtime idling.
    AutoSuspend,
}

/// Outcome of one interrupt transfer, as reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// The read finished and the buffer holds a fresh report.
    Completed,
    /// The endpoint returned more data than the request could hold.
    Overflow,
    /// The request was unlinked by a bus reset.
    Reset,
    /// The request was cancelled.
    Cancelled,
    /// The host controller is going away.
    Shutdown,
    /// Any other failure, carrying the transport's raw error code.
    Error(i32),
}

impl TransferStatus {
    /// Final/ignorable outcomes: the loop treats these as an intentional
    /// stop and must not re-arm the read.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            TransferStatus::Overflow
                | TransferStatus::Reset
                | TransferStatus::Cancelled
                | TransferStatus::Shutdown
        )
    }
}

/// Core trait for the transport layer moving interrupt reports off the bus.
///
/// All implementations must be thread-safe; the completion side is consumed
/// from a dedicated worker task while the submission and power calls arrive
/// from ordinary call contexts.
#[async_trait]
pub trait UsbTransport: Send + Sync {
    /// Queue one interrupt IN read of [`REPORT_LEN`] bytes on `endpoint`.
    ///
    /// Must not block. An error means the request never reached the bus;
    /// the endpoint is left without an outstanding read.
    fn submit_read(&self, endpoint: u8) -> Result<()>;

    /// Resolve once the oldest queued read on the endpoint has finished,
    /// copying its payload into `buf`.
    ///
    /// Pends indefinitely while the device has nothing to report; a
    /// cancellation resolves it with [`TransferStatus::Cancelled`].
    async fn read_complete(&self, buf: &mut [u8; REPORT_LEN]) -> TransferStatus;

    /// Abort any queued read on `endpoint`.
    ///
    /// When this returns, the transport guarantees every aborted read has
    /// been reported (as [`TransferStatus::Cancelled`]) or discarded, and no
    /// further completion for it can fire.
    async fn cancel_reads(&self, endpoint: u8);

    /// Ask the bus to bring the interface out of any idle/suspended state
    /// and keep it awake until [`UsbTransport::power_release`].
    fn power_acquire(&self) -> Result<()>;

    /// Balance a previous [`UsbTransport::power_acquire`].
    fn power_release(&self);

    /// Stable physical path of the device on the bus, used to derive the
    /// input device identity.
    fn device_path(&self) -> String;

    /// Bus-assigned vendor/product/version triple.
    fn bus_id(&self) -> BusDeviceId;
}
