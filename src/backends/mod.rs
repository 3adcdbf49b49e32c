//! Hardware backends for `arcadebox`.
//!
//! Implementations of [`Device`](crate::device::Device), the pin traits in
//! [`hal`](crate::hal) and the display sinks.
//!
//! # Feature flags
//! - **`linux`** — GPIO (character device for pulled-up inputs, sysfs for
//!   outputs and PWM), `/dev/input/js*` joystick and `/dev/fb*` framebuffer
//!   backends (default).
//!
//! The bring-up helpers below never fail: a peripheral that cannot be opened is
//! logged and replaced by a stand-in, so the console runs degraded instead of
//! refusing to start.

use crate::config::ConsoleConfig;
use crate::device::Device;
#[cfg(feature = "linux")]
use crate::error::ConsoleError;
use crate::display::{NullSink, PrimarySink};
use crate::hal::{Buzzer, Disconnected, Indicator, InputPin, OutputPin};

pub mod keypad;
pub mod virtual_input;

#[cfg(feature = "linux")]
#[cfg_attr(docsrs, doc(cfg(feature = "linux")))]
pub mod framebuffer;
#[cfg(feature = "linux")]
#[cfg_attr(docsrs, doc(cfg(feature = "linux")))]
pub mod gpiochip;
#[cfg(feature = "linux")]
#[cfg_attr(docsrs, doc(cfg(feature = "linux")))]
pub mod joystick;
#[cfg(feature = "linux")]
#[cfg_attr(docsrs, doc(cfg(feature = "linux")))]
pub mod sysfs;

/// Opens the configured input devices.
///
/// The keypad is skipped if any of its lines fails to open. The gamepad is
/// always returned when enabled: if it is not plugged in yet it starts detached
/// and its reader keeps retrying.
pub fn probe_devices(config: &ConsoleConfig) -> Vec<Box<dyn Device>> {
    let mut out: Vec<Box<dyn Device>> = Vec::new();

    #[cfg(feature = "linux")]
    {
        use self::joystick::Joystick;
        use self::keypad::{MatrixKeypad, PinMatrix};
        use self::sysfs::SysfsPin;

        if config.keypad.enabled {
            let matrix = open_matrix(config).and_then(|(rows, cols)| PinMatrix::new(rows, cols));
            match matrix {
                Ok(matrix) => {
                    out.push(Box::new(MatrixKeypad::new(matrix, config.keypad.keymap())));
                }
                Err(e) => log::warn!("keypad disabled: {e}"),
            }
        }

        if config.gamepad.enabled {
            let pad = Joystick::open(&config.gamepad.device).unwrap_or_else(|e| {
                log::warn!("{e}; running keypad-only until it appears");
                Joystick::detached(&config.gamepad.device)
            });
            out.push(Box::new(pad));
        }

        type Lines = (Vec<Box<dyn InputPin>>, Vec<Box<dyn OutputPin>>);
        fn open_matrix(config: &ConsoleConfig) -> Result<Lines, ConsoleError> {
            let mut rows: Vec<Box<dyn InputPin>> = Vec::new();
            for &pin in &config.keypad.rows {
                rows.push(open_input(config, "keypad row", pin)?);
            }
            let mut cols: Vec<Box<dyn OutputPin>> = Vec::new();
            for &pin in &config.keypad.cols {
                cols.push(Box::new(SysfsPin::output(pin)?));
            }
            Ok((rows, cols))
        }
    }

    #[cfg(not(feature = "linux"))]
    let _ = config;

    log::info!("{} input device(s) configured", out.len());
    out
}

/// Opens the three indicator channels; missing channels stay dark.
pub fn open_indicator(config: &ConsoleConfig) -> Indicator {
    let pins = &config.indicator;
    Indicator::new(
        open_output("red light", pins.red),
        open_output("yellow light", pins.yellow),
        open_output("green light", pins.green),
    )
}

/// Opens the buzzer: PWM when configured, otherwise a plain pin.
pub fn open_buzzer(config: &ConsoleConfig) -> Box<dyn Buzzer> {
    #[cfg(feature = "linux")]
    {
        use crate::hal::PinBuzzer;

        if let Some(pwm) = &config.buzzer.pwm {
            match sysfs::SysfsPwm::open(pwm.chip, pwm.channel) {
                Ok(pwm) => return Box::new(pwm),
                Err(e) => log::warn!("pwm buzzer unavailable ({e}); trying plain pin"),
            }
        }
        match sysfs::SysfsPin::output(config.buzzer.pin) {
            Ok(pin) => return Box::new(PinBuzzer::new(pin)),
            Err(e) => log::warn!("buzzer disabled: {e}"),
        }
    }
    #[cfg(not(feature = "linux"))]
    let _ = config;

    Box::new(Disconnected)
}

/// Opens the power button line; a missing line never reads as pressed.
pub fn open_power_button(config: &ConsoleConfig) -> Box<dyn InputPin> {
    #[cfg(feature = "linux")]
    {
        match open_input(config, "power button", config.watchdog.pin) {
            Ok(pin) => return pin,
            Err(e) => log::warn!("power button unavailable: {e}"),
        }
    }
    #[cfg(not(feature = "linux"))]
    let _ = config;

    Box::new(Disconnected)
}

/// Opens the primary screen; falls back to a sink that discards frames.
pub fn open_primary(config: &ConsoleConfig) -> Box<dyn PrimarySink> {
    #[cfg(feature = "linux")]
    {
        match framebuffer::FramebufferSink::open(&config.display.framebuffer) {
            Ok(sink) => return Box::new(sink),
            Err(e) => log::warn!("primary display disabled: {e}"),
        }
    }
    #[cfg(not(feature = "linux"))]
    let _ = config;

    Box::new(NullSink)
}

/// Opens an active-low input with its pull-up enabled.
///
/// Without a usable GPIO character device the line falls back to sysfs, which
/// leaves the bias at its power-on default. That is refused for lines that come
/// up pulled down unless `gpio.external_pullups` says the board has its own.
#[cfg(feature = "linux")]
fn open_input(config: &ConsoleConfig, label: &str, pin: u32) -> Result<Box<dyn InputPin>, ConsoleError> {
    let err = match gpiochip::PulledUpInput::open(&config.gpio.chip, pin) {
        Ok(line) => return Ok(Box::new(line)),
        Err(e) => e,
    };
    sysfs_fallback_allowed(pin, config.gpio.external_pullups)
        .map_err(|reason| ConsoleError::unavailable(label, format!("{err}; {reason}")))?;
    log::warn!("{label}: {err}; using sysfs gpio{pin} without an internal pull-up");
    Ok(Box::new(sysfs::SysfsPin::input(pin)?))
}

#[cfg(feature = "linux")]
fn sysfs_fallback_allowed(pin: u32, external_pullups: bool) -> Result<(), String> {
    if external_pullups || !gpiochip::defaults_to_pull_down(pin) {
        Ok(())
    } else {
        Err(format!(
            "gpio{pin} powers up pulled down and sysfs cannot pull it up; \
             fit external pull-ups and set gpio.external_pullups = true"
        ))
    }
}

fn open_output(label: &str, pin: u32) -> Box<dyn OutputPin> {
    #[cfg(feature = "linux")]
    {
        match sysfs::SysfsPin::output(pin) {
            Ok(pin) => return Box::new(pin),
            Err(e) => log::warn!("{label} unavailable: {e}"),
        }
    }
    #[cfg(not(feature = "linux"))]
    let _ = (label, pin);

    Box::new(Disconnected)
}
