//! Linux joystick device (`/dev/input/jsN`).
//!
//! The kernel reports 8-byte `js_event` records:
//!
//! | bytes | field                                  |
//! |-------|----------------------------------------|
//! | 0..4  | timestamp (ms, ignored)                |
//! | 4..6  | value (`i16`, little endian)           |
//! | 6     | type (`0x01` button, `0x02` axis, `0x80` init flag) |
//! | 7     | channel number                         |
//!
//! The file is opened non-blocking so a poll never waits on the device. Axis
//! values are normalized to `[-1.0, 1.0]`. A read error other than "would block"
//! means the pad was unplugged: the file is dropped and the device reports
//! [`ConsoleError::DeviceUnavailable`] until [`Device::reconnect`] succeeds.

use crate::binding::DeviceState;
use crate::device::Device;
use crate::error::ConsoleError;
use crate::event::InputSource;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;
const JS_EVENT_INIT: u8 = 0x80;
const JS_EVENT_SIZE: usize = 8;

pub struct Joystick {
    path: PathBuf,
    name: String,
    file: Option<File>,
    state: DeviceState,
}

impl Joystick {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let mut joystick = Self::detached(path);
        joystick.reconnect()?;
        Ok(joystick)
    }

    /// A joystick that is not (yet) plugged in; polling reports it unavailable.
    pub fn detached(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("gamepad {}", path.display()),
            path,
            file: None,
            state: DeviceState::default(),
        }
    }

    fn disconnect(&mut self, reason: impl ToString) -> ConsoleError {
        self.file = None;
        self.state = DeviceState::default();
        ConsoleError::unavailable(self.name.clone(), reason)
    }
}

/// Applies one raw `js_event` record to `state`.
pub(crate) fn apply_event(state: &mut DeviceState, record: &[u8]) {
    let value = i16::from_le_bytes([record[4], record[5]]);
    let number = record[7];
    match record[6] & !JS_EVENT_INIT {
        JS_EVENT_BUTTON => {
            state.buttons.insert(number, value != 0);
        }
        JS_EVENT_AXIS => {
            let normalized = (value as f32 / i16::MAX as f32).clamp(-1.0, 1.0);
            state.axes.insert(number, normalized);
        }
        other => log::trace!("ignoring js_event type {other:#04x}"),
    }
}

impl Device for Joystick {
    fn poll(&mut self) -> Result<DeviceState, ConsoleError> {
        let Some(file) = self.file.as_mut() else {
            return Err(ConsoleError::unavailable(self.name.clone(), "not connected"));
        };

        let mut buf = [0u8; JS_EVENT_SIZE * 32];
        loop {
            match file.read(&mut buf) {
                Ok(0) => return Err(self.disconnect("end of stream")),
                Ok(n) => {
                    for record in buf[..n].chunks_exact(JS_EVENT_SIZE) {
                        apply_event(&mut self.state, record);
                    }
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.disconnect(e)),
            }
        }
        Ok(self.state.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> InputSource {
        InputSource::Gamepad
    }

    fn reconnect(&mut self) -> Result<(), ConsoleError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| ConsoleError::unavailable(self.name.clone(), e))?;
        self.file = Some(file);
        self.state = DeviceState::default();
        log::info!("{} connected", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: i16, kind: u8, number: u8) -> [u8; 8] {
        let v = value.to_le_bytes();
        [0, 0, 0, 0, v[0], v[1], kind, number]
    }

    #[test]
    fn records_update_buttons_and_axes() {
        let mut state = DeviceState::default();
        apply_event(&mut state, &record(1, JS_EVENT_BUTTON | JS_EVENT_INIT, 7));
        apply_event(&mut state, &record(i16::MIN, JS_EVENT_AXIS, 1));
        apply_event(&mut state, &record(16384, JS_EVENT_AXIS, 0));

        assert!(state.get_button(7));
        assert_eq!(state.get_axis(1), -1.0);
        assert!((state.get_axis(0) - 0.5).abs() < 0.01);

        apply_event(&mut state, &record(0, JS_EVENT_BUTTON, 7));
        assert!(!state.get_button(7));
    }

    #[test]
    fn missing_device_is_unavailable() {
        assert!(matches!(
            Joystick::open("/nonexistent/js9"),
            Err(ConsoleError::DeviceUnavailable { .. })
        ));
        let mut pad = Joystick::detached("/nonexistent/js9");
        assert!(pad.poll().is_err());
    }

    #[test]
    fn idle_device_polls_without_blocking() {
        use std::ffi::CString;
        use std::io::Write;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("js0");
        let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);

        // Opening a FIFO with no writer only returns when non-blocking.
        let mut pad = Joystick::open(&path).unwrap();
        let mut writer = OpenOptions::new().write(true).open(&path).unwrap();

        assert!(!pad.poll().unwrap().get_button(0));
        writer.write_all(&record(1, JS_EVENT_BUTTON, 0)).unwrap();
        assert!(pad.poll().unwrap().get_button(0));
        assert!(pad.poll().unwrap().get_button(0));
    }
}
