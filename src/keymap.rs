//! Scan-code table for the 4-key keypad.
//!
//! The device reports a single byte of interest per interrupt transfer.
//! Four contiguous values select one of the mapped keys, zero means every
//! key was released, and anything else is silently dropped.

use crate::input::KeyCode;

/// First scan code the keypad emits for a key press.
pub const SCAN_BASE: u8 = 0x1E;

/// Offset of the scan byte inside the 8-byte interrupt report.
pub const SCAN_OFFSET: usize = 2;

/// Keys selected by `SCAN_BASE..SCAN_BASE + 4`, in scan-code order.
pub const MAPPED_KEYS: [KeyCode; 4] = [KeyCode::Q, KeyCode::P, KeyCode::Y, KeyCode::S];

/// Modifier reported alongside every mapped key.
pub const MODIFIER_KEY: KeyCode = KeyCode::RightAlt;

/// Decoded meaning of one scan byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// One mapped key went down, chorded with the modifier.
    Chord(KeyCode),
    /// Every key (mapped and modifier) went up.
    ReleaseAll,
}

/// Decode a raw scan byte.
///
/// Pure function of its argument: in-range codes map through
/// [`MAPPED_KEYS`], zero is the all-released signal, everything else decodes
/// to `None` with no event and no error. Unrecognized codes are deliberately
/// not counted or logged.
pub fn decode(code: u8) -> Option<ScanEvent> {
    if (SCAN_BASE..SCAN_BASE + MAPPED_KEYS.len() as u8).contains(&code) {
        Some(ScanEvent::Chord(MAPPED_KEYS[(code - SCAN_BASE) as usize]))
    } else if code == 0 {
        Some(ScanEvent::ReleaseAll)
    } else {
        None
    }
}

/// The full key capability set declared at input-device registration.
pub fn supported_keys() -> Vec<KeyCode> {
    let mut keys = vec![MODIFIER_KEY];
    keys.extend(MAPPED_KEYS);
    keys
}
