//! Pin-level hardware abstractions.
//!
//! Every handle here is an owned resource: construct it once, hand it to the
//! component that uses it, and let `Drop` put the hardware back in a safe state.

use crate::error::ConsoleError;

/// A digital input line.
pub trait InputPin: Send {
    /// True when the line reads low (pull-up wiring: pressed / selected).
    fn is_low(&mut self) -> Result<bool, ConsoleError>;
}

/// A digital output line.
pub trait OutputPin: Send {
    fn set(&mut self, high: bool) -> Result<(), ConsoleError>;
}

/// One channel of the three-colour indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Light {
    Red,
    Yellow,
    Green,
}

/// Three independent indicator channels. At most one is lit at a time.
///
/// All channels are switched off when the indicator is dropped.
pub struct Indicator {
    red: Box<dyn OutputPin>,
    yellow: Box<dyn OutputPin>,
    green: Box<dyn OutputPin>,
}

impl Indicator {
    pub fn new(
        red: Box<dyn OutputPin>,
        yellow: Box<dyn OutputPin>,
        green: Box<dyn OutputPin>,
    ) -> Self {
        Self { red, yellow, green }
    }

    /// Lights `light` (or nothing) and turns the other channels off.
    ///
    /// Every channel is written even if an earlier write fails; the first error is returned.
    pub fn show(&mut self, light: Option<Light>) -> Result<(), ConsoleError> {
        let results = [
            self.red.set(light == Some(Light::Red)),
            self.yellow.set(light == Some(Light::Yellow)),
            self.green.set(light == Some(Light::Green)),
        ];
        results.into_iter().collect()
    }
}

impl Drop for Indicator {
    fn drop(&mut self) {
        let _ = self.show(None);
    }
}

/// Buzzer pitch. Plain on/off buzzers ignore the frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tone {
    pub frequency: u32,
}

impl Tone {
    pub const fn hz(frequency: u32) -> Self {
        Self { frequency }
    }
}

/// Single-channel tone output.
pub trait Buzzer: Send {
    fn set_tone(&mut self, tone: Option<Tone>) -> Result<(), ConsoleError>;
}

/// Active buzzer on a plain output pin.
pub struct PinBuzzer<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> PinBuzzer<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> Buzzer for PinBuzzer<P> {
    fn set_tone(&mut self, tone: Option<Tone>) -> Result<(), ConsoleError> {
        self.pin.set(tone.is_some())
    }
}

impl<P: OutputPin> Drop for PinBuzzer<P> {
    fn drop(&mut self) {
        let _ = self.pin.set(false);
    }
}

/// Stand-in used when a peripheral failed to initialize.
pub struct Disconnected;

impl OutputPin for Disconnected {
    fn set(&mut self, _high: bool) -> Result<(), ConsoleError> {
        Ok(())
    }
}

impl InputPin for Disconnected {
    fn is_low(&mut self) -> Result<bool, ConsoleError> {
        Ok(false)
    }
}

impl Buzzer for Disconnected {
    fn set_tone(&mut self, _tone: Option<Tone>) -> Result<(), ConsoleError> {
        Ok(())
    }
}
