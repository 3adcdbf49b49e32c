//! Linux sysfs GPIO and PWM.
//!
//! Lines are exported when opened and unexported when the handle drops, so a
//! peripheral that fails halfway through setup never leaves a line reserved.
//! Both types take a sysfs root so they can be pointed at a scratch directory.
//!
//! sysfs has no bias control: an input keeps whatever pull its line powered up
//! with. Inputs that need a pull-up go through [`gpiochip`](super::gpiochip).

use crate::error::ConsoleError;
use crate::hal::{Buzzer, InputPin, OutputPin, Tone};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

pub const GPIO_ROOT: &str = "/sys/class/gpio";
pub const PWM_ROOT: &str = "/sys/class/pwm";

/// udev may take a moment to fix permissions on a freshly exported line.
const EXPORT_SETTLE: Duration = Duration::from_millis(200);

fn write_attr(path: &Path, value: &str) -> Result<(), ConsoleError> {
    fs::write(path, value).map_err(|e| ConsoleError::io(path, e))
}

fn wait_for(path: &Path) -> Result<(), ConsoleError> {
    let deadline = Instant::now() + EXPORT_SETTLE;
    while !path.exists() {
        if Instant::now() >= deadline {
            return Err(ConsoleError::unavailable(
                path.display().to_string(),
                "not present after export",
            ));
        }
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// One exported GPIO line.
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    number: u32,
    value: PathBuf,
}

impl SysfsPin {
    pub fn input(number: u32) -> Result<Self, ConsoleError> {
        Self::open_at(GPIO_ROOT, number, Direction::In)
    }

    pub fn output(number: u32) -> Result<Self, ConsoleError> {
        Self::open_at(GPIO_ROOT, number, Direction::Out)
    }

    pub fn open_at(
        root: impl AsRef<Path>,
        number: u32,
        direction: Direction,
    ) -> Result<Self, ConsoleError> {
        let root = root.as_ref().to_path_buf();
        let line = root.join(format!("gpio{number}"));
        if !line.exists() {
            write_attr(&root.join("export"), &number.to_string())?;
        }
        // From here on `Drop` unexports, including on the error paths below.
        let pin = Self {
            value: line.join("value"),
            root,
            number,
        };
        wait_for(&line)?;
        let dir = match direction {
            Direction::In => "in",
            Direction::Out => "out",
        };
        write_attr(&line.join("direction"), dir)?;
        Ok(pin)
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl InputPin for SysfsPin {
    fn is_low(&mut self) -> Result<bool, ConsoleError> {
        let raw = fs::read_to_string(&self.value).map_err(|e| ConsoleError::io(&self.value, e))?;
        Ok(raw.trim() == "0")
    }
}

impl OutputPin for SysfsPin {
    fn set(&mut self, high: bool) -> Result<(), ConsoleError> {
        write_attr(&self.value, if high { "1" } else { "0" })
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if let Err(e) = write_attr(&self.root.join("unexport"), &self.number.to_string()) {
            log::debug!("gpio{}: unexport failed: {e}", self.number);
        }
    }
}

/// One exported PWM channel driving a passive buzzer.
#[derive(Debug)]
pub struct SysfsPwm {
    chip: PathBuf,
    channel: u32,
    dir: PathBuf,
}

impl SysfsPwm {
    pub fn open(chip: u32, channel: u32) -> Result<Self, ConsoleError> {
        Self::open_at(PWM_ROOT, chip, channel)
    }

    pub fn open_at(root: impl AsRef<Path>, chip: u32, channel: u32) -> Result<Self, ConsoleError> {
        let chip = root.as_ref().join(format!("pwmchip{chip}"));
        let dir = chip.join(format!("pwm{channel}"));
        if !dir.exists() {
            write_attr(&chip.join("export"), &channel.to_string())?;
        }
        let pwm = Self { chip, channel, dir };
        wait_for(&pwm.dir)?;
        pwm.apply(None)?;
        Ok(pwm)
    }

    fn apply(&self, tone: Option<Tone>) -> Result<(), ConsoleError> {
        match tone.filter(|t| t.frequency > 0) {
            Some(tone) => {
                let period = 1_000_000_000 / u64::from(tone.frequency);
                // Lower duty first: the kernel rejects duty > period.
                write_attr(&self.dir.join("duty_cycle"), "0")?;
                write_attr(&self.dir.join("period"), &period.to_string())?;
                write_attr(&self.dir.join("duty_cycle"), &(period / 2).to_string())?;
                write_attr(&self.dir.join("enable"), "1")
            }
            None => write_attr(&self.dir.join("enable"), "0"),
        }
    }
}

impl Buzzer for SysfsPwm {
    fn set_tone(&mut self, tone: Option<Tone>) -> Result<(), ConsoleError> {
        self.apply(tone)
    }
}

impl Drop for SysfsPwm {
    fn drop(&mut self) {
        let _ = self.apply(None);
        let _ = write_attr(&self.chip.join("unexport"), &self.channel.to_string());
    }
}
