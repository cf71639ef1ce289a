//! Transfer completion pipeline.
//!
//! The worker spawned here stands in for the interrupt context of a bus
//! completion callback: it is pinned to one device, consumes one completion
//! at a time, and must neither block on driver locks nor outlive the
//! device's quiescence guarantee. Each completion is validated, decoded and
//! answered with exactly one re-armed read, unless the status says the loop
//! was stopped on purpose.

use crate::device::KeypadDevice;
use crate::keymap::{self, ScanEvent};
use crate::transport::{TransferStatus, REPORT_LEN};
use log::{debug, error};
use std::sync::Arc;

/// What the handler decided to do with one completion.
enum CompletionOutcome {
    /// Decoded (or skipped) and the next read is armed.
    Rearmed,
    /// Final/ignorable status or a stop request: the loop ends, no re-arm.
    Stopped,
    /// The re-arm itself failed: the loop ends and the device stays without
    /// an active read until the next resume or open.
    Degraded,
}

/// Consume completions for one device until the loop stops.
///
/// The read buffer lives here: the transport fills it before each
/// completion resolves, and only this task ever looks at it.
pub(crate) async fn transfer_loop(dev: Arc<KeypadDevice>) {
    let mut report = [0u8; REPORT_LEN];
    loop {
        let status = dev.bus().read_complete(&mut report).await;
        match handle_completion(&dev, status, &report) {
            CompletionOutcome::Rearmed => continue,
            CompletionOutcome::Stopped | CompletionOutcome::Degraded => return,
        }
    }
}

/// One completion: validate, decode, re-arm.
///
/// Decode strictly precedes the re-arm so the buffer cannot be overwritten
/// by the next transfer while it is being read. The busy guard serializes
/// this sequence against itself and against the stop barrier.
fn handle_completion(
    dev: &KeypadDevice,
    status: TransferStatus,
    report: &[u8; REPORT_LEN],
) -> CompletionOutcome {
    let _busy = dev.busy_guard();

    if status.is_stop() || dev.stop_requested() {
        debug!(
            "interface {}: transfer ignored, status {:?}",
            dev.interface(),
            status
        );
        return CompletionOutcome::Stopped;
    }

    match status {
        TransferStatus::Completed => emit_events(dev, report[keymap::SCAN_OFFSET]),
        // Transient failure: keep the loop alive, skip the decode.
        other => debug!(
            "interface {}: transfer failed, status {:?}",
            dev.interface(),
            other
        ),
    }

    match dev.bus().submit_read(dev.endpoint()) {
        Ok(()) => CompletionOutcome::Rearmed,
        Err(err) => {
            error!(
                "interface {}: could not resubmit transfer: {}",
                dev.interface(),
                err
            );
            CompletionOutcome::Degraded
        }
    }
}

/// Decode the scan byte and push the resulting batch to the sink.
fn emit_events(dev: &KeypadDevice, code: u8) {
    // The sink disappears when teardown has begun; drop the batch then.
    let Some(sink) = dev.sink() else {
        return;
    };

    match keymap::decode(code) {
        Some(ScanEvent::Chord(key)) => {
            sink.report_key(keymap::MODIFIER_KEY, true);
            sink.report_key(key, true);
            sink.sync();
        }
        Some(ScanEvent::ReleaseAll) => {
            for key in keymap::MAPPED_KEYS {
                sink.report_key(key, false);
            }
            sink.report_key(keymap::MODIFIER_KEY, false);
            sink.sync();
        }
        None => {}
    }
}
