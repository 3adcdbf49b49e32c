use crate::binding::DeviceState;
use crate::error::ConsoleError;
use crate::event::InputSource;

/// A pollable input device.
///
/// `poll` is called from the device's reader thread and must return promptly
/// (bounded timeouts only). An `Err` marks the device as unavailable; the reader
/// then calls [`reconnect`](Device::reconnect) on its retry schedule.
pub trait Device: Send {
    fn poll(&mut self) -> Result<DeviceState, ConsoleError>;
    fn name(&self) -> &str;
    fn source(&self) -> InputSource;

    fn reconnect(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }
}
