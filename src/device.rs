//! Device state and lifecycle management.
//!
//! One [`KeypadDevice`] is the aggregate root for one attached accessory:
//! it owns the registered input sink, the recurring interrupt read, the
//! session/reference bookkeeping and the locks that keep teardown sane.
//! Sessions (open/close) and power transitions only start and stop the
//! transfer worker; the state itself lives from attach to the last release.

pub mod transfer;

use crate::error::{Result, UmlautKbError};
use crate::input::{InputRegistry, InputSink};
use crate::transport::{InterfaceId, SuspendReason, UsbTransport, INTERRUPT_ENDPOINT};
use log::{debug, error};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The one in-flight (or idle) recurring read on the interrupt endpoint.
///
/// `stopping` mirrors the bus's reject-while-killing semantics: while a
/// synchronous cancel is in progress the completion handler must not re-arm
/// the read, otherwise the cancel could miss a submission racing past it.
struct TransferPipe {
    endpoint: u8,
    task: Mutex<Option<JoinHandle<()>>>,
    stopping: AtomicBool,
}

/// Aggregate state for one attached keypad.
pub struct KeypadDevice {
    interface: InterfaceId,
    transport: Arc<dyn UsbTransport>,
    registry: Arc<dyn InputRegistry>,
    sink: Mutex<Option<Arc<dyn InputSink>>>,
    pipe: TransferPipe,
    /// Lifetime references: 1 held by the attach controller plus 1 per open
    /// session. The destructor runs when this reaches zero.
    refs: AtomicUsize,
    /// Open consumers. Kept separate from `refs`: suspend/resume key off
    /// this field, close keys off the reference count.
    open_sessions: AtomicUsize,
    /// Serializes the decode-and-resubmit sequence against itself.
    busy: Mutex<()>,
    /// Serializes detach against open/close/suspend/resume.
    teardown: tokio::sync::Mutex<()>,
    /// Cleared by detach under `teardown`; the authoritative presence flag.
    present: AtomicBool,
}

impl KeypadDevice {
    pub(crate) fn new(
        interface: InterfaceId,
        transport: Arc<dyn UsbTransport>,
        registry: Arc<dyn InputRegistry>,
    ) -> Self {
        Self {
            interface,
            transport,
            registry,
            sink: Mutex::new(None),
            pipe: TransferPipe {
                endpoint: INTERRUPT_ENDPOINT,
                task: Mutex::new(None),
                stopping: AtomicBool::new(false),
            },
            refs: AtomicUsize::new(1),
            open_sessions: AtomicUsize::new(0),
            busy: Mutex::new(()),
            teardown: tokio::sync::Mutex::new(()),
            present: AtomicBool::new(true),
        }
    }

    /// The interface this device is bound to.
    pub fn interface(&self) -> InterfaceId {
        self.interface
    }

    /// Number of currently open sessions.
    pub fn session_count(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Whether the interface association still exists.
    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_present(&self) {
        self.present.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_sink(&self, sink: Arc<dyn InputSink>) {
        *self.sink.lock() = Some(sink);
    }

    pub(crate) fn take_sink(&self) -> Option<Arc<dyn InputSink>> {
        self.sink.lock().take()
    }

    pub(crate) fn sink(&self) -> Option<Arc<dyn InputSink>> {
        self.sink.lock().clone()
    }

    pub(crate) fn bus(&self) -> &Arc<dyn UsbTransport> {
        &self.transport
    }

    pub(crate) fn endpoint(&self) -> u8 {
        self.pipe.endpoint
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.pipe.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn busy_guard(&self) -> MutexGuard<'_, ()> {
        self.busy.lock()
    }

    pub(crate) async fn lock_teardown(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.teardown.lock().await
    }

    /// Take a lifetime reference. One per successful session open.
    pub(crate) fn retain(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    /// Drop a lifetime reference; the last one runs the destructor.
    ///
    /// Safe from any context that does not hold the busy lock.
    pub(crate) async fn release(&self) {
        if self.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.destroy().await;
        }
    }

    /// Destructor: quiesce the read so no completion can touch this state
    /// again, then drop the input device. Memory goes when the `Arc`s do.
    async fn destroy(&self) {
        self.stop_transfer().await;
        if let Some(sink) = self.take_sink() {
            self.registry.unregister(sink);
        }
    }

    /// Arm the recurring read and spawn the worker consuming completions.
    ///
    /// Errors if the transport refuses the submission or a read is already
    /// outstanding; in both cases no worker is left behind.
    pub(crate) fn start_transfer(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.pipe.task.lock();
        if let Some(task) = slot.as_ref() {
            if !task.is_finished() {
                return Err(UmlautKbError::TransferPending);
            }
        }
        self.transport.submit_read(self.pipe.endpoint)?;
        *slot = Some(tokio::spawn(transfer::transfer_loop(Arc::clone(self))));
        Ok(())
    }

    /// Synchronously stop the recurring read.
    ///
    /// Returns only once the transport has quiesced the request and the
    /// worker has exited: afterwards no completion can fire for it.
    pub(crate) async fn stop_transfer(&self) {
        self.pipe.stopping.store(true, Ordering::SeqCst);
        // Barrier: a completion mid-decode finishes (and re-arms, or sees
        // the stop flag) before the cancel below, so no submission can slip
        // in after the cancel and leave the worker waiting forever.
        drop(self.busy.lock());
        self.transport.cancel_reads(self.pipe.endpoint).await;
        let task = self.pipe.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.pipe.stopping.store(false, Ordering::SeqCst);
    }

    /// A consumer started using the logical input device.
    ///
    /// Wakes the bus link, arms the read, and takes a lifetime reference.
    /// Must be paired with exactly one [`KeypadDevice::close`].
    pub async fn open(self: &Arc<Self>) -> Result<()> {
        let _guard = self.teardown.lock().await;
        if !self.is_present() {
            return Err(UmlautKbError::NoDevice);
        }

        self.transport.power_acquire().map_err(|err| {
            error!("interface {}: could not wake the bus link: {}", self.interface, err);
            err
        })?;

        if let Err(err) = self.start_transfer() {
            error!("interface {}: could not submit transfer: {}", self.interface, err);
            self.transport.power_release();
            return Err(err);
        }

        self.retain();
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// The consumer stopped using the logical input device.
    pub async fn close(&self) {
        let _guard = self.teardown.lock().await;
        self.close_locked().await;
    }

    /// Close body, for callers already holding the teardown lock.
    pub(crate) async fn close_locked(&self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        self.stop_transfer().await;
        self.transport.power_release();
        self.release().await;
    }

    /// Pause the transfer for a host power transition.
    ///
    /// Leaves the reference count and the power acquisition untouched; the
    /// session logically stays open across the suspend.
    pub(crate) async fn suspend_transfer(&self, reason: SuspendReason) -> Result<()> {
        let _guard = self.teardown.lock().await;
        if !self.is_present() {
            return Err(UmlautKbError::NoDevice);
        }
        if self.session_count() > 0 {
            debug!("interface {}: suspending ({:?})", self.interface, reason);
            self.stop_transfer().await;
        }
        Ok(())
    }

    /// Restore the transfer after a host power transition.
    ///
    /// Unlike the completion handler's own re-arm, a submission failure here
    /// is propagated to the caller.
    pub(crate) async fn resume_transfer(self: &Arc<Self>) -> Result<()> {
        let _guard = self.teardown.lock().await;
        if !self.is_present() {
            return Err(UmlautKbError::NoDevice);
        }
        if self.session_count() > 0 {
            self.start_transfer()?;
        }
        Ok(())
    }
}
