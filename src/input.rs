//! Input-sink abstraction.
//!
//! The driver does not talk to consumers directly; it registers one logical
//! input device with the host's input subsystem and reports key state
//! batches to it. This module defines that boundary: the key-code
//! vocabulary, the registration descriptor, and the sink/registry traits the
//! embedding framework implements.

use crate::error::Result;
use crate::transport::BusDeviceId;

/// Logical keys the keypad can report.
///
/// The four mapped keys are the English-International layout positions that
/// produce the umlaut characters when chorded with [`KeyCode::RightAlt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// a-umlaut position.
    Q,
    /// o-umlaut position.
    P,
    /// u-umlaut position.
    Y,
    /// eszett position.
    S,
    /// Chord modifier reported alongside every mapped key.
    RightAlt,
}

impl KeyCode {
    /// The Linux input-event code for this key, from
    /// `<linux/input-event-codes.h>`.
    pub const fn event_code(self) -> u16 {
        match self {
            KeyCode::Q => 16,
            KeyCode::P => 25,
            KeyCode::Y => 21,
            KeyCode::S => 31,
            KeyCode::RightAlt => 100,
        }
    }
}

/// Everything the input subsystem needs to register the logical device.
#[derive(Debug, Clone)]
pub struct InputDeviceDesc {
    /// Human-readable device name.
    pub name: String,
    /// Stable physical path (bus path plus input suffix).
    pub phys: String,
    /// Bus identity forwarded from the transport.
    pub id: BusDeviceId,
    /// The full key capability set the device may report.
    pub keys: Vec<KeyCode>,
}

/// A registered logical input device accepting key state reports.
///
/// Reports are batched: any number of `report_key` calls followed by one
/// `sync` delivering the batch atomically to consumers. Both calls must be
/// cheap and non-blocking; they are issued from the transfer worker.
pub trait InputSink: Send + Sync {
    /// Record one key transition in the current batch.
    fn report_key(&self, key: KeyCode, pressed: bool);

    /// Flush the current batch to consumers.
    fn sync(&self);
}

/// The host input subsystem's registration surface.
pub trait InputRegistry: Send + Sync {
    /// Register a logical input device and return its event sink.
    fn register(&self, desc: InputDeviceDesc) -> Result<std::sync::Arc<dyn InputSink>>;

    /// Unregister a previously registered device, invalidating its sink.
    fn unregister(&self, sink: std::sync::Arc<dyn InputSink>);
}
