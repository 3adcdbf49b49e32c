//! Indicator light and buzzer cues.
//!
//! Cues run on a dedicated worker thread so the frame loop never blocks on a
//! melody. The worker owns the [`Indicator`] and the [`Buzzer`]; the console
//! talks to it through a depth-one command slot, so a newer request always
//! replaces an older one that has not been picked up yet.
//!
//! Starting a cue preempts the current one immediately: outputs are switched off
//! and the new cue starts from its first step. When a cue finishes (or is
//! cancelled, or the sequencer is dropped) every output is left off.
//!
//! [`Cue::Click`] is the exception: it only ticks the buzzer, leaves the light
//! as it is, and is ignored while another cue is running.

use crate::hal::{Buzzer, Indicator, Light, Tone};
use crate::queue::{drop_oldest, DropOldestReceiver, DropOldestSender};
use crossbeam_channel::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Named feedback patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Green, yellow, red in turn.
    Boot,
    /// Yellow while the instructions are shown.
    EnterInstructions,
    /// Three lights with a beep each; the last beep is higher.
    Countdown,
    /// Red held, falling four-note melody.
    GameOver,
    /// Everything off.
    ReturnToMenu,
    /// Red with a low buzz.
    LaunchFailed,
    /// Short tick on menu navigation.
    Click,
}

/// How long a step lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hold {
    For(Duration),
    /// Stays until another cue or a cancel arrives.
    UntilPreempted,
}

/// One step of a cue: a light state and an optional tone for part of the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CueStep {
    pub light: Option<Light>,
    pub tone: Option<(Tone, Duration)>,
    pub hold: Hold,
}

const fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

const fn step(light: Option<Light>, tone: Option<(Tone, Duration)>, hold: u64) -> CueStep {
    CueStep {
        light,
        tone,
        hold: Hold::For(ms(hold)),
    }
}

const BOOT: &[CueStep] = &[
    step(Some(Light::Green), None, 300),
    step(Some(Light::Yellow), None, 300),
    step(Some(Light::Red), None, 300),
];

const ENTER_INSTRUCTIONS: &[CueStep] = &[CueStep {
    light: Some(Light::Yellow),
    tone: None,
    hold: Hold::UntilPreempted,
}];

const COUNTDOWN: &[CueStep] = &[
    step(Some(Light::Red), Some((Tone::hz(880), ms(150))), 1000),
    step(Some(Light::Yellow), Some((Tone::hz(880), ms(150))), 1000),
    step(Some(Light::Green), Some((Tone::hz(1320), ms(150))), 1000),
];

const GAME_OVER: &[CueStep] = &[
    step(Some(Light::Red), Some((Tone::hz(330), ms(300))), 300),
    step(Some(Light::Red), Some((Tone::hz(294), ms(300))), 300),
    step(Some(Light::Red), Some((Tone::hz(262), ms(300))), 300),
    step(Some(Light::Red), Some((Tone::hz(196), ms(600))), 600),
    CueStep {
        light: Some(Light::Red),
        tone: None,
        hold: Hold::UntilPreempted,
    },
];

const RETURN_TO_MENU: &[CueStep] = &[step(None, None, 0)];

const LAUNCH_FAILED: &[CueStep] = &[step(Some(Light::Red), Some((Tone::hz(200), ms(400))), 1000)];

const CLICK: &[CueStep] = &[step(None, Some((Tone::hz(1000), ms(30))), 30)];

impl Cue {
    pub fn steps(self) -> &'static [CueStep] {
        match self {
            Cue::Boot => BOOT,
            Cue::EnterInstructions => ENTER_INSTRUCTIONS,
            Cue::Countdown => COUNTDOWN,
            Cue::GameOver => GAME_OVER,
            Cue::ReturnToMenu => RETURN_TO_MENU,
            Cue::LaunchFailed => LAUNCH_FAILED,
            Cue::Click => CLICK,
        }
    }

    /// True for cues that leave the indicator alone.
    pub fn keeps_light(self) -> bool {
        self == Cue::Click
    }

    /// Total timed length; held steps count as zero.
    pub fn duration(self) -> Duration {
        self.steps()
            .iter()
            .map(|s| match s.hold {
                Hold::For(d) => d,
                Hold::UntilPreempted => Duration::ZERO,
            })
            .sum()
    }
}

/// Where the console sends cues. Both calls return immediately.
pub trait CueSink {
    fn play(&mut self, cue: Cue);
    /// Stops whatever is playing and switches all outputs off.
    fn cancel(&mut self);
}

enum Command {
    Play(Cue),
    Cancel,
    Stop,
}

/// Owns the outputs; switches everything off when dropped.
struct Outputs {
    indicator: Indicator,
    buzzer: Box<dyn Buzzer>,
}

impl Outputs {
    fn light(&mut self, light: Option<Light>) {
        if let Err(e) = self.indicator.show(light) {
            log::warn!("indicator write failed: {e}");
        }
    }

    fn tone(&mut self, tone: Option<Tone>) {
        if let Err(e) = self.buzzer.set_tone(tone) {
            log::warn!("buzzer write failed: {e}");
        }
    }

    fn off(&mut self) {
        self.tone(None);
        self.light(None);
    }
}

impl Drop for Outputs {
    fn drop(&mut self) {
        self.off();
    }
}

/// Result of waiting inside a step.
enum Wait {
    Elapsed,
    Interrupted(Command),
}

struct Worker {
    outputs: Outputs,
    rx: DropOldestReceiver<Command>,
}

impl Worker {
    fn wait(&self, until: Option<Instant>) -> Wait {
        loop {
            let received = match until {
                Some(deadline) => match self.rx.recv_deadline(deadline) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => return Wait::Elapsed,
                    Err(RecvTimeoutError::Disconnected) => None,
                },
                None => self.rx.recv().ok(),
            };
            match received {
                Some(Command::Play(Cue::Click)) => continue,
                other => return Wait::Interrupted(other.unwrap_or(Command::Stop)),
            }
        }
    }

    /// Plays `cue`; returns the command that cut it short, if any.
    fn play(&mut self, cue: Cue) -> Option<Command> {
        log::debug!("cue {cue:?}");
        for step in cue.steps() {
            let start = Instant::now();
            if !cue.keeps_light() {
                self.outputs.light(step.light);
            }
            if let Some((tone, length)) = step.tone {
                self.outputs.tone(Some(tone));
                if let Wait::Interrupted(cmd) = self.wait(Some(start + length)) {
                    self.outputs.off();
                    return Some(cmd);
                }
                self.outputs.tone(None);
            }
            let until = match step.hold {
                Hold::For(d) => Some(start + d),
                Hold::UntilPreempted => None,
            };
            if let Wait::Interrupted(cmd) = self.wait(until) {
                self.outputs.off();
                return Some(cmd);
            }
        }
        if cue.keeps_light() {
            self.outputs.tone(None);
        } else {
            self.outputs.off();
        }
        None
    }

    fn run(mut self) {
        let mut next = self.rx.recv().ok();
        loop {
            next = match next {
                Some(Command::Play(cue)) => self.play(cue).or_else(|| self.rx.recv().ok()),
                Some(Command::Cancel) => {
                    self.outputs.off();
                    self.rx.recv().ok()
                }
                Some(Command::Stop) | None => break,
            };
        }
        log::debug!("feedback worker stopped");
    }
}

/// Plays cues on the indicator and buzzer from a background thread.
pub struct FeedbackSequencer {
    tx: DropOldestSender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl FeedbackSequencer {
    pub fn new(indicator: Indicator, buzzer: Box<dyn Buzzer>) -> Self {
        let (tx, rx) = drop_oldest(1);
        let mut outputs = Outputs { indicator, buzzer };
        outputs.off();
        let worker = Worker { outputs, rx };
        let worker = match thread::Builder::new()
            .name("feedback".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("feedback disabled, could not start worker: {e}");
                None
            }
        };
        Self { tx, worker }
    }
}

impl CueSink for FeedbackSequencer {
    fn play(&mut self, cue: Cue) {
        self.tx.push(Command::Play(cue));
    }

    fn cancel(&mut self) {
        self.tx.push(Command::Cancel);
    }
}

impl Drop for FeedbackSequencer {
    fn drop(&mut self) {
        self.tx.push(Command::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
