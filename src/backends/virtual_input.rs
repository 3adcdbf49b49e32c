use crate::binding::DeviceState;
use crate::device::Device;
use crate::error::ConsoleError;
use crate::event::InputSource;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    state: DeviceState,
    disconnected: bool,
}

/// Remote control for a [`VirtualDevice`], usable from any thread.
#[derive(Clone, Default)]
pub struct VirtualHandle(Arc<Mutex<Inner>>);

impl VirtualHandle {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn press_key(&self, key: char) {
        self.lock().state.keys.insert(key);
    }

    pub fn release_key(&self, key: char) {
        self.lock().state.keys.remove(&key);
    }

    pub fn press_button(&self, button: u8) {
        self.lock().state.buttons.insert(button, true);
    }

    pub fn release_button(&self, button: u8) {
        self.lock().state.buttons.insert(button, false);
    }

    pub fn set_axis(&self, axis: u8, value: f32) {
        self.lock().state.axes.insert(axis, value);
    }

    /// Simulates unplugging: polls fail until [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        inner.disconnected = true;
        inner.state = DeviceState::default();
    }

    pub fn connect(&self) {
        self.lock().disconnected = false;
    }
}

/// Scriptable input device.
pub struct VirtualDevice {
    name: String,
    source: InputSource,
    handle: VirtualHandle,
}

impl VirtualDevice {
    pub fn new(name: &str, source: InputSource) -> (Self, VirtualHandle) {
        let handle = VirtualHandle::default();
        let device = Self {
            name: name.to_string(),
            source,
            handle: handle.clone(),
        };
        (device, handle)
    }
}

impl Device for VirtualDevice {
    fn poll(&mut self) -> Result<DeviceState, ConsoleError> {
        let inner = self.handle.lock();
        if inner.disconnected {
            return Err(ConsoleError::unavailable(self.name.clone(), "unplugged"));
        }
        Ok(inner.state.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> InputSource {
        self.source
    }

    fn reconnect(&mut self) -> Result<(), ConsoleError> {
        if self.handle.lock().disconnected {
            Err(ConsoleError::unavailable(self.name.clone(), "unplugged"))
        } else {
            Ok(())
        }
    }
}
