//! # umlautkb - Driver core for the 4-key umlaut keypad
//!
//! Decodes the proprietary scan-code stream of a 4-key USB accessory
//! (a-umlaut, o-umlaut, u-umlaut, eszett) and synthesizes chorded key
//! events for a host input-event sink.
//!
//! ## Features
//!
//! - **Interrupt transfer pipeline**: a self re-arming asynchronous read on
//!   the device's interrupt endpoint, decoded one 8-byte report at a time
//! - **Lifecycle discipline**: reference-counted device state with an
//!   exactly-once teardown, safe against concurrent open/close, disconnect
//!   and power transitions
//! - **Transparent suspend/resume**: the transfer pauses and resumes across
//!   host power transitions without disturbing open sessions
//! - **Pluggable boundaries**: the bus transport and the input sink are
//!   traits, so the core runs against scripted transports in tests
//!
//! ## Architecture
//!
//! The library is organized into focused modules:
//!
//! - [`error`] - Centralized error types and handling
//! - [`keymap`] - The fixed scan-code table
//! - [`transport`] - The consumed bus transport contract
//! - [`input`] - The consumed input-sink contract
//! - [`device`] - Device state, sessions and the transfer worker
//! - [`driver`] - Attach/detach and power-state coordination
//!
//! The embedding framework constructs a [`KeypadDriver`] over its input
//! registry, calls [`KeypadDriver::attach`] when the dispatcher matches an
//! interface against [`driver::DEVICE_ID_TABLE`], and routes the input
//! subsystem's open/close notifications through [`KeypadDriver::device`].

// Core modules
pub mod error;
pub mod keymap;

// External interface boundaries
pub mod input;
pub mod transport;

// Core components
pub mod device;
pub mod driver;

// Re-export commonly used types for convenience
pub use error::{Result, UmlautKbError};

// Public API surface for external usage
pub use device::KeypadDevice;
pub use driver::{KeypadDriver, DRIVER_NAME};
pub use input::{InputDeviceDesc, InputRegistry, InputSink, KeyCode};
pub use transport::{
    BusDeviceId, InterfaceId, SuspendReason, TransferStatus, UsbTransport, REPORT_LEN,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
