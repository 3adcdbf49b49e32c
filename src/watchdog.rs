//! Power-button watchdog.
//!
//! Samples the power line on a fixed period. Once the button has been held for
//! the configured time the watchdog tells the console (best effort, never
//! blocking) and then powers the board off, whether or not anyone listened.
//! It shares nothing with the frame loop except the one-slot notification queue.

use crate::config::WatchdogSettings;
use crate::error::ConsoleError;
use crate::hal::InputPin;
use crate::queue::{DropOldestSender, Push};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sent to the console when a shutdown has been decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownSignal;

/// Tracks how long the button has been held without a release.
#[derive(Debug)]
pub struct HoldDetector {
    hold: Duration,
    pressed_since: Option<Instant>,
}

impl HoldDetector {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            pressed_since: None,
        }
    }

    /// Feeds one sample; true once the press has lasted `hold`.
    pub fn sample(&mut self, pressed: bool, now: Instant) -> bool {
        if !pressed {
            self.pressed_since = None;
            return false;
        }
        let since = *self.pressed_since.get_or_insert(now);
        now.saturating_duration_since(since) >= self.hold
    }
}

/// Whatever actually powers the machine off.
pub trait ShutdownAction: Send {
    fn shutdown(&mut self) -> Result<(), ConsoleError>;
}

/// Runs an OS command, `sudo shutdown -h now` by default.
#[derive(Clone, Debug)]
pub struct SystemShutdown {
    command: Vec<String>,
}

impl SystemShutdown {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl ShutdownAction for SystemShutdown {
    fn shutdown(&mut self) -> Result<(), ConsoleError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ConsoleError::unavailable("shutdown", "no command configured"));
        };
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| ConsoleError::io(program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(ConsoleError::unavailable(program.as_str(), status))
        }
    }
}

pub struct PowerWatchdog {
    line: Box<dyn InputPin>,
    action: Box<dyn ShutdownAction>,
    notify: DropOldestSender<ShutdownSignal>,
    detector: HoldDetector,
    sample: Duration,
}

impl PowerWatchdog {
    pub fn new(
        line: Box<dyn InputPin>,
        action: Box<dyn ShutdownAction>,
        notify: DropOldestSender<ShutdownSignal>,
        settings: &WatchdogSettings,
    ) -> Self {
        Self {
            line,
            action,
            notify,
            detector: HoldDetector::new(settings.hold()),
            sample: settings.sample_period(),
        }
    }

    fn pressed(&mut self) -> bool {
        match self.line.is_low() {
            Ok(pressed) => pressed,
            Err(e) => {
                log::warn!("power button read failed: {e}");
                false
            }
        }
    }

    /// Notifies, then shuts down. Never waits on the console.
    fn fire(&mut self) {
        log::info!("power button held, shutting down");
        if self.notify.push(ShutdownSignal) == Push::Closed {
            log::debug!("console no longer listening for shutdown");
        }
        if let Err(e) = self.action.shutdown() {
            log::error!("shutdown command failed: {e}");
        }
    }

    /// Samples until the button fires or `stop` is raised. Returns true if it fired.
    pub fn run_blocking(&mut self, stop: &AtomicBool) -> bool {
        while !stop.load(Ordering::Relaxed) {
            let pressed = self.pressed();
            if self.detector.sample(pressed, Instant::now()) {
                self.fire();
                return true;
            }
            thread::sleep(self.sample);
        }
        false
    }

    /// Moves the watchdog onto its own thread.
    pub fn spawn(mut self) -> Result<WatchdogHandle, ConsoleError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = stop.clone();
            thread::Builder::new()
                .name("power-watchdog".into())
                .spawn(move || self.run_blocking(&stop))
                .map_err(|e| ConsoleError::unavailable("power-watchdog", e))?
        };
        Ok(WatchdogHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Stops and joins the watchdog thread when dropped.
pub struct WatchdogHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<bool>>,
}

impl WatchdogHandle {
    /// Stops the thread; true if the watchdog had already fired.
    pub fn stop(mut self) -> bool {
        self.join()
    }

    fn join(&mut self) -> bool {
        self.stop.store(true, Ordering::Relaxed);
        self.thread
            .take()
            .map_or(false, |thread| thread.join().unwrap_or(false))
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_resets_the_hold() {
        let mut hold = HoldDetector::new(Duration::from_secs(3));
        let t0 = Instant::now();
        assert!(!hold.sample(true, t0));
        assert!(!hold.sample(true, t0 + Duration::from_millis(2900)));
        assert!(!hold.sample(false, t0 + Duration::from_millis(2950)));
        assert!(!hold.sample(true, t0 + Duration::from_millis(3000)));
        assert!(!hold.sample(true, t0 + Duration::from_millis(5900)));
        assert!(hold.sample(true, t0 + Duration::from_millis(6000)));
    }

    #[test]
    fn empty_command_is_an_error() {
        let mut action = SystemShutdown::new(Vec::new());
        assert!(matches!(
            action.shutdown(),
            Err(ConsoleError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn failing_command_is_reported() {
        let mut action = SystemShutdown::new(vec!["false".into()]);
        assert!(action.shutdown().is_err());
        let mut action = SystemShutdown::new(vec!["true".into()]);
        assert!(action.shutdown().is_ok());
    }
}
