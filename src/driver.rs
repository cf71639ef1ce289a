//! Driver orchestration layer.
//!
//! This module owns the interface-to-device association and bridges the
//! bus-level notifications (attach, detach, suspend, resume) onto the device
//! lifecycle. It holds no per-device state of its own; everything lives in
//! [`KeypadDevice`].

use crate::device::KeypadDevice;
use crate::error::{Result, UmlautKbError};
use crate::input::{InputDeviceDesc, InputRegistry};
use crate::keymap;
use crate::transport::{InterfaceId, SuspendReason, UsbTransport};
use log::{error, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Driver name; also the name of the registered logical input device.
pub const DRIVER_NAME: &str = "umlautkb";

/// The bus may auto-suspend the device while it is attached.
pub const SUPPORTS_AUTOSUSPEND: bool = true;

/// HID interface class.
pub const INTERFACE_CLASS_HID: u8 = 0x03;

/// Boot interface subclass.
pub const INTERFACE_SUBCLASS_BOOT: u8 = 0x01;

/// The keypad's non-standard interface protocol byte.
pub const INTERFACE_PROTOCOL_UMLAUT_KB: u8 = 0xDE;

/// One row of the identity table the attach dispatcher matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
}

impl DeviceId {
    /// Whether this row matches the given interface triple.
    pub fn matches(&self, class: u8, subclass: u8, protocol: u8) -> bool {
        self.interface_class == class
            && self.interface_subclass == subclass
            && self.interface_protocol == protocol
    }
}

/// Interfaces this driver binds to. Consumed by the external attach
/// dispatcher; not part of the driver's own runtime logic.
pub const DEVICE_ID_TABLE: &[DeviceId] = &[DeviceId {
    interface_class: INTERFACE_CLASS_HID,
    interface_subclass: INTERFACE_SUBCLASS_BOOT,
    interface_protocol: INTERFACE_PROTOCOL_UMLAUT_KB,
}];

/// Convenience for dispatchers: does any table row match the triple?
pub fn match_interface(class: u8, subclass: u8, protocol: u8) -> bool {
    DEVICE_ID_TABLE
        .iter()
        .any(|id| id.matches(class, subclass, protocol))
}

/// Driver instance: wires the input registry to per-interface device state.
pub struct KeypadDriver {
    registry: Arc<dyn InputRegistry>,
    devices: Mutex<HashMap<InterfaceId, Arc<KeypadDevice>>>,
}

impl KeypadDriver {
    /// Create a driver delivering events through `registry`.
    pub fn new(registry: Arc<dyn InputRegistry>) -> Self {
        Self {
            registry,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the device bound to `interface`.
    ///
    /// The embedding framework routes the input subsystem's open/close
    /// notifications through the handle returned here.
    pub fn device(&self, interface: InterfaceId) -> Option<Arc<KeypadDevice>> {
        self.devices.lock().get(&interface).cloned()
    }

    /// Hardware attach: build the device state and register its input
    /// device.
    ///
    /// On any failure the partial state is unwound in reverse order of
    /// acquisition and the error reported to the dispatcher.
    pub async fn attach(
        &self,
        interface: InterfaceId,
        transport: Arc<dyn UsbTransport>,
    ) -> Result<()> {
        if self.devices.lock().contains_key(&interface) {
            return Err(UmlautKbError::other(format!(
                "interface {interface} is already bound"
            )));
        }

        let dev = Arc::new(KeypadDevice::new(
            interface,
            Arc::clone(&transport),
            Arc::clone(&self.registry),
        ));

        let mut phys = transport.device_path();
        phys.push_str("/input0");

        let desc = InputDeviceDesc {
            name: DRIVER_NAME.to_string(),
            phys,
            id: transport.bus_id(),
            keys: keymap::supported_keys(),
        };

        match self.registry.register(desc) {
            Ok(sink) => dev.set_sink(sink),
            Err(err) => {
                error!(
                    "interface {}: could not register the input device: {}",
                    interface, err
                );
                // Nothing ever opened; the release path frees the state.
                dev.release().await;
                return Err(err);
            }
        }

        self.devices.lock().insert(interface, dev);
        info!("interface {}: device attached", interface);
        Ok(())
    }

    /// Hardware detach: sever the association and tear the device down.
    ///
    /// Unregistering the input device forces any open session closed, which
    /// is what drives the reference count toward zero; the final free
    /// happens when the last reference goes.
    pub async fn detach(&self, interface: InterfaceId) -> Result<()> {
        let dev = self
            .devices
            .lock()
            .remove(&interface)
            .ok_or(UmlautKbError::NoDevice)?;

        {
            let _guard = dev.lock_teardown().await;
            dev.clear_present();
            while dev.session_count() > 0 {
                dev.close_locked().await;
            }
            if let Some(sink) = dev.take_sink() {
                self.registry.unregister(sink);
            }
            dev.stop_transfer().await;
        }

        // The attach-time reference; dropping it frees the state once no
        // in-flight completion holds it.
        dev.release().await;
        info!("interface {}: device disconnected", interface);
        Ok(())
    }

    /// Host power transition: pause the transfer if a consumer is active.
    pub async fn suspend(&self, interface: InterfaceId, reason: SuspendReason) -> Result<()> {
        let dev = self.device(interface).ok_or(UmlautKbError::NoDevice)?;
        dev.suspend_transfer(reason).await
    }

    /// Host power transition ended: restore the transfer if a consumer is
    /// active. Propagates submission failure.
    pub async fn resume(&self, interface: InterfaceId) -> Result<()> {
        let dev = self.device(interface).ok_or(UmlautKbError::NoDevice)?;
        dev.resume_transfer().await
    }
}
