//! Console configuration.
//!
//! Loaded from TOML; every section and field is optional and falls back to the
//! stock wiring of the reference console (BCM pin numbers).
//!
//! ```toml
//! [console]
//! fps = 60
//!
//! [watchdog]
//! pin = 4
//! hold_ms = 3000
//! command = ["sudo", "shutdown", "-h", "now"]
//! ```

use crate::binding::BindingProfile;
use crate::debounce::RepeatPolicy;
use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub console: ConsoleSettings,
    pub input: InputSettings,
    pub keypad: KeypadSettings,
    pub gamepad: GamepadSettings,
    pub indicator: IndicatorSettings,
    pub buzzer: BuzzerSettings,
    pub display: DisplaySettings,
    pub watchdog: WatchdogSettings,
    pub gpio: GpioSettings,
    pub bindings: BindingSettings,
}

impl ConsoleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConsoleError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConsoleError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Target frame rate of the main loop.
    pub fps: u32,
    /// How long the game-over screen stays up without input.
    pub game_over_timeout_ms: u64,
    /// Tick the buzzer when the menu cursor moves.
    pub menu_clicks: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            fps: 60,
            game_over_timeout_ms: 3000,
            menu_clicks: true,
        }
    }
}

impl ConsoleSettings {
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    pub fn game_over_timeout(&self) -> Duration {
        ms(self.game_over_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub debounce_ms: u64,
    /// Hold time before navigation auto-repeats; 0 disables repeat.
    pub repeat_delay_ms: u64,
    pub repeat_interval_ms: u64,
    /// Per-device event queue depth (drop-oldest on overflow).
    pub queue_capacity: usize,
    pub keypad_scan_ms: u64,
    pub gamepad_poll_ms: u64,
    /// Retry period for unplugged devices.
    pub reconnect_ms: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            repeat_delay_ms: 400,
            repeat_interval_ms: 150,
            queue_capacity: 16,
            keypad_scan_ms: 5,
            gamepad_poll_ms: 5,
            reconnect_ms: 1000,
        }
    }
}

impl InputSettings {
    pub fn debounce(&self) -> Duration {
        ms(self.debounce_ms)
    }

    pub fn repeat(&self) -> Option<RepeatPolicy> {
        (self.repeat_delay_ms > 0).then(|| RepeatPolicy {
            delay: ms(self.repeat_delay_ms),
            interval: ms(self.repeat_interval_ms),
        })
    }

    pub fn reconnect_every(&self) -> Duration {
        ms(self.reconnect_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypadSettings {
    pub enabled: bool,
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
    /// One string per row, one character per column.
    pub keymap: Vec<String>,
}

impl Default for KeypadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rows: vec![6, 13, 19, 26],
            cols: vec![12, 16, 20, 21],
            keymap: ["123A", "456B", "789C", "*0#D"].map(String::from).to_vec(),
        }
    }
}

impl KeypadSettings {
    pub fn keymap(&self) -> Vec<Vec<char>> {
        self.keymap.iter().map(|row| row.chars().collect()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSettings {
    pub enabled: bool,
    pub device: PathBuf,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            device: PathBuf::from("/dev/input/js0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            red: 22,
            yellow: 23,
            green: 17,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PwmSettings {
    pub chip: u32,
    pub channel: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuzzerSettings {
    /// Plain on/off buzzer pin, used when no PWM channel is configured.
    pub pin: u32,
    pub pwm: Option<PwmSettings>,
}

impl Default for BuzzerSettings {
    fn default() -> Self {
        Self { pin: 18, pwm: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Candidate font files for the secondary panel, most preferred first.
    pub fonts: Vec<PathBuf>,
    pub framebuffer: PathBuf,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            fonts: [
                "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
                "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
                "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            ]
            .map(PathBuf::from)
            .to_vec(),
            framebuffer: PathBuf::from("/dev/fb0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    pub pin: u32,
    pub hold_ms: u64,
    pub sample_ms: u64,
    /// Program and arguments run to power the board off.
    pub command: Vec<String>,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            pin: 4,
            hold_ms: 3000,
            sample_ms: 50,
            command: ["sudo", "shutdown", "-h", "now"].map(String::from).to_vec(),
        }
    }
}

impl WatchdogSettings {
    pub fn hold(&self) -> Duration {
        ms(self.hold_ms)
    }

    pub fn sample_period(&self) -> Duration {
        ms(self.sample_ms)
    }
}

/// How input lines (keypad rows, power button) are opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioSettings {
    /// Character device used to request inputs with the internal pull-up.
    pub chip: PathBuf,
    /// The board has its own pull-up resistors on every input line, so a plain
    /// sysfs input is acceptable when the character device is unavailable.
    pub external_pullups: bool,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            chip: PathBuf::from("/dev/gpiochip0"),
            external_pullups: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSettings {
    pub keypad: Option<BindingProfile>,
    pub gamepad: Option<BindingProfile>,
}

impl BindingSettings {
    pub fn keypad_profile(&self) -> BindingProfile {
        self.keypad.clone().unwrap_or_else(BindingProfile::keypad_default)
    }

    pub fn gamepad_profile(&self) -> BindingProfile {
        self.gamepad.clone().unwrap_or_else(BindingProfile::gamepad_default)
    }
}
