//! GPIO character device inputs (`/dev/gpiochipN`, line uAPI v2).
//!
//! sysfs cannot set a line's bias, so inputs go through here instead: each one
//! is requested with the internal pull-up enabled. The keypad rows and the
//! power button are wired to ground and read low when pressed; on the BCM283x
//! GPIO 9-27 otherwise come up pulled down and would read as held forever.

use crate::error::ConsoleError;
use crate::hal::InputPin;
use std::fs::OpenOptions;
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};

const LINES_MAX: usize = 64;
const NAME_SIZE: usize = 32;
const NUM_ATTRS_MAX: usize = 10;

const FLAG_INPUT: u64 = 1 << 2;
const FLAG_BIAS_PULL_UP: u64 = 1 << 8;

const CONSUMER: &[u8] = b"arcadebox";

// Mirrors of the <linux/gpio.h> v2 structs. Most fields are only written.

#[repr(C)]
#[allow(dead_code)]
#[derive(Clone, Copy, Default)]
struct LineAttribute {
    id: u32,
    padding: u32,
    value: u64,
}

#[repr(C)]
#[allow(dead_code)]
#[derive(Clone, Copy, Default)]
struct ConfigAttribute {
    attr: LineAttribute,
    mask: u64,
}

#[repr(C)]
#[allow(dead_code)]
struct LineConfig {
    flags: u64,
    num_attrs: u32,
    padding: [u32; 5],
    attrs: [ConfigAttribute; NUM_ATTRS_MAX],
}

#[repr(C)]
#[allow(dead_code)]
struct LineRequest {
    offsets: [u32; LINES_MAX],
    consumer: [u8; NAME_SIZE],
    config: LineConfig,
    num_lines: u32,
    event_buffer_size: u32,
    padding: [u32; 5],
    fd: i32,
}

#[repr(C)]
#[allow(dead_code)]
#[derive(Default)]
struct LineValues {
    bits: u64,
    mask: u64,
}

/// `_IOWR(0xB4, nr, size)` with the asm-generic encoding used by arm and arm64.
const fn iowr(nr: u64, size: usize) -> u64 {
    (3 << 30) | ((size as u64) << 16) | (0xB4 << 8) | nr
}

const GET_LINE_IOCTL: u64 = iowr(0x07, size_of::<LineRequest>());
const GET_VALUES_IOCTL: u64 = iowr(0x0E, size_of::<LineValues>());

/// True for BCM283x lines whose reset default is a pull-down.
pub fn defaults_to_pull_down(pin: u32) -> bool {
    (9..=27).contains(&pin)
}

/// One input line held with its pull-up enabled. Released on drop.
#[derive(Debug)]
pub struct PulledUpInput {
    label: String,
    line: OwnedFd,
}

impl PulledUpInput {
    pub fn open(chip: impl AsRef<Path>, offset: u32) -> Result<Self, ConsoleError> {
        let chip = chip.as_ref();
        let label = format!("{}:{offset}", chip.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(chip)
            .map_err(|e| ConsoleError::io(PathBuf::from(chip), e))?;

        let mut consumer = [0u8; NAME_SIZE];
        consumer[..CONSUMER.len()].copy_from_slice(CONSUMER);
        let mut offsets = [0u32; LINES_MAX];
        offsets[0] = offset;
        let mut request = LineRequest {
            offsets,
            consumer,
            config: LineConfig {
                flags: FLAG_INPUT | FLAG_BIAS_PULL_UP,
                num_attrs: 0,
                padding: [0; 5],
                attrs: [ConfigAttribute::default(); NUM_ATTRS_MAX],
            },
            num_lines: 1,
            event_buffer_size: 0,
            padding: [0; 5],
            fd: -1,
        };

        // SAFETY: `request` is a live, correctly laid out gpio_v2_line_request.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), GET_LINE_IOCTL as _, &mut request) };
        if rc < 0 || request.fd < 0 {
            return Err(ConsoleError::unavailable(label, io::Error::last_os_error()));
        }
        // SAFETY: the kernel just handed us this descriptor and nothing else owns it.
        let line = unsafe { OwnedFd::from_raw_fd(request.fd) };
        log::debug!("{label}: input with pull-up");
        Ok(Self { label, line })
    }
}

impl InputPin for PulledUpInput {
    fn is_low(&mut self) -> Result<bool, ConsoleError> {
        let mut values = LineValues { bits: 0, mask: 1 };
        // SAFETY: `values` is a live gpio_v2_line_values.
        let rc = unsafe { libc::ioctl(self.line.as_raw_fd(), GET_VALUES_IOCTL as _, &mut values) };
        if rc < 0 {
            return Err(ConsoleError::unavailable(
                self.label.clone(),
                io::Error::last_os_error(),
            ));
        }
        Ok(values.bits & 1 == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout_matches_the_kernel() {
        assert_eq!(size_of::<LineConfig>(), 272);
        assert_eq!(size_of::<LineRequest>(), 592);
        assert_eq!(GET_LINE_IOCTL, 0xC250_B407);
        assert_eq!(GET_VALUES_IOCTL, 0xC010_B40E);
    }

    #[test]
    fn stock_row_pins_need_a_pull_up() {
        let rows = [6, 13, 19, 26];
        let pulled_down: Vec<u32> = rows.into_iter().filter(|&p| defaults_to_pull_down(p)).collect();
        assert_eq!(pulled_down, vec![13, 19, 26]);
        assert!(!defaults_to_pull_down(4));
    }

    #[test]
    fn missing_chip_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PulledUpInput::open(dir.path().join("gpiochip9"), 4).unwrap_err();
        assert!(matches!(err, ConsoleError::Io { .. }));
    }

    #[test]
    fn regular_file_is_not_a_gpio_chip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = PulledUpInput::open(file.path(), 4).unwrap_err();
        assert!(matches!(err, ConsoleError::DeviceUnavailable { .. }));
    }
}
