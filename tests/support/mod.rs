//! Shared mocks for the integration tests: a scripted transport, a
//! recording input registry/sink, and small wait helpers.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use umlautkb::error::UmlautKbError;
use umlautkb::{
    BusDeviceId, InputDeviceDesc, InputRegistry, InputSink, KeyCode, Result, TransferStatus,
    UsbTransport, REPORT_LEN,
};

/// Build an 8-byte report carrying `code` at the scan-byte offset.
pub fn report_with(code: u8) -> [u8; REPORT_LEN] {
    let mut report = [0u8; REPORT_LEN];
    report[2] = code;
    report
}

/// Poll `cond` until it holds, panicking after a generous deadline.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(2000);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

struct PipeState {
    armed: bool,
    cancel_pending: bool,
    script: VecDeque<(TransferStatus, [u8; REPORT_LEN])>,
}

/// Scripted bus transport.
///
/// Completions are delivered strictly in script order, and only while a
/// read is armed; with the script drained the reader pends like an idle
/// device until cancelled. Bookkeeping mirrors what the driver promises the
/// bus: at most one armed read, balanced power holds.
pub struct MockTransport {
    state: Mutex<PipeState>,
    notify: Notify,
    submits: AtomicUsize,
    cancels: AtomicUsize,
    power_held: AtomicIsize,
    fail_power: AtomicBool,
    fail_submit: AtomicBool,
    double_submit: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState {
                armed: false,
                cancel_pending: false,
                script: VecDeque::new(),
            }),
            notify: Notify::new(),
            submits: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            power_held: AtomicIsize::new(0),
            fail_power: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            double_submit: AtomicBool::new(false),
        })
    }

    /// Queue one successful completion carrying `code` at the scan offset.
    pub fn push_report(&self, code: u8) {
        self.push(TransferStatus::Completed, report_with(code));
    }

    /// Queue one completion with an explicit status and a zeroed payload.
    pub fn push_status(&self, status: TransferStatus) {
        self.push(status, [0u8; REPORT_LEN]);
    }

    pub fn push(&self, status: TransferStatus, payload: [u8; REPORT_LEN]) {
        self.state.lock().script.push_back((status, payload));
        self.notify.notify_one();
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn power_held(&self) -> isize {
        self.power_held.load(Ordering::SeqCst)
    }

    /// Whether a read is currently armed on the endpoint.
    pub fn outstanding(&self) -> bool {
        self.state.lock().armed
    }

    pub fn script_len(&self) -> usize {
        self.state.lock().script.len()
    }

    pub fn set_fail_power(&self, fail: bool) {
        self.fail_power.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    /// True if the driver ever armed a second read over an existing one.
    pub fn double_submit_detected(&self) -> bool {
        self.double_submit.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UsbTransport for MockTransport {
    fn submit_read(&self, _endpoint: u8) -> Result<()> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(UmlautKbError::submit("mock transport rejected the request"));
        }
        {
            let mut state = self.state.lock();
            if state.armed {
                self.double_submit.store(true, Ordering::SeqCst);
            }
            state.armed = true;
            state.cancel_pending = false;
        }
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
        Ok(())
    }

    async fn read_complete(&self, buf: &mut [u8; REPORT_LEN]) -> TransferStatus {
        loop {
            {
                let mut state = self.state.lock();
                if state.armed && state.cancel_pending {
                    state.armed = false;
                    state.cancel_pending = false;
                    return TransferStatus::Cancelled;
                }
                if state.armed {
                    if let Some((status, payload)) = state.script.pop_front() {
                        state.armed = false;
                        *buf = payload;
                        return status;
                    }
                }
            }
            self.notify.notified().await;
        }
    }

    async fn cancel_reads(&self, _endpoint: u8) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            if state.armed {
                state.cancel_pending = true;
            }
        }
        self.notify.notify_one();
    }

    fn power_acquire(&self) -> Result<()> {
        if self.fail_power.load(Ordering::SeqCst) {
            return Err(UmlautKbError::power_management(
                "mock bus kept the link idle",
            ));
        }
        self.power_held.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn power_release(&self) {
        self.power_held.fetch_sub(1, Ordering::SeqCst);
    }

    fn device_path(&self) -> String {
        "usb-0000:00:1d.0-1.4".to_string()
    }

    fn bus_id(&self) -> BusDeviceId {
        BusDeviceId {
            vendor: 0x16c0,
            product: 0x27db,
            version: 0x0100,
        }
    }
}

/// One recorded sink call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Key(KeyCode, bool),
    Sync,
}

/// Recording input sink with an optional artificial delay per report,
/// used to widen race windows in the teardown stress tests.
pub struct MockSink {
    events: Mutex<Vec<SinkEvent>>,
    delay: Mutex<Option<Duration>>,
    gone: AtomicBool,
    used_after_unregister: AtomicBool,
}

impl MockSink {
    fn new(delay: Option<Duration>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            delay: Mutex::new(delay),
            gone: AtomicBool::new(false),
            used_after_unregister: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn used_after_unregister(&self) -> bool {
        self.used_after_unregister.load(Ordering::SeqCst)
    }
}

impl InputSink for MockSink {
    fn report_key(&self, key: KeyCode, pressed: bool) {
        if let Some(delay) = *self.delay.lock() {
            std::thread::sleep(delay);
        }
        if self.gone.load(Ordering::SeqCst) {
            self.used_after_unregister.store(true, Ordering::SeqCst);
        }
        self.events.lock().push(SinkEvent::Key(key, pressed));
    }

    fn sync(&self) {
        self.events.lock().push(SinkEvent::Sync);
    }
}

/// Recording registry handing out [`MockSink`]s.
pub struct MockRegistry {
    registered: Mutex<Vec<InputDeviceDesc>>,
    sinks: Mutex<Vec<Arc<MockSink>>>,
    unregistered: AtomicUsize,
    fail_register: AtomicBool,
    sink_delay: Mutex<Option<Duration>>,
}

impl MockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registered: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            unregistered: AtomicUsize::new(0),
            fail_register: AtomicBool::new(false),
            sink_delay: Mutex::new(None),
        })
    }

    pub fn set_fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Delay injected into every `report_key` of sinks registered later.
    pub fn set_sink_delay(&self, delay: Duration) {
        *self.sink_delay.lock() = Some(delay);
    }

    pub fn registered(&self) -> Vec<InputDeviceDesc> {
        self.registered.lock().clone()
    }

    pub fn unregistered_count(&self) -> usize {
        self.unregistered.load(Ordering::SeqCst)
    }

    /// The sink created by the most recent registration.
    pub fn last_sink(&self) -> Arc<MockSink> {
        self.sinks.lock().last().cloned().expect("no sink registered")
    }
}

impl InputRegistry for MockRegistry {
    fn register(&self, desc: InputDeviceDesc) -> Result<Arc<dyn InputSink>> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(UmlautKbError::registration("mock registry is full"));
        }
        self.registered.lock().push(desc);
        let sink = Arc::new(MockSink::new(*self.sink_delay.lock()));
        self.sinks.lock().push(Arc::clone(&sink));
        Ok(sink)
    }

    fn unregister(&self, _sink: Arc<dyn InputSink>) {
        self.unregistered.fetch_add(1, Ordering::SeqCst);
        for sink in self.sinks.lock().iter() {
            sink.gone.store(true, Ordering::SeqCst);
        }
    }
}
