//! Merges per-device readers into one ordered event stream.
//!
//! Each attached [`Device`] gets its own reader thread polling on the device's
//! schedule. A reader resolves raw state through its [`BindingProfile`], runs the
//! result through a [`Debouncer`], and pushes events into its own bounded
//! drop-oldest queue. Held directions are published separately through an atomic
//! bit set, so "latest directional state wins" without any queueing.
//!
//! The consumer side pulls events across all queues earliest-timestamp first.

use crate::binding::{Action, BindingProfile};
use crate::config::InputSettings;
use crate::debounce::{Debouncer, RepeatPolicy};
use crate::device::Device;
use crate::event::{Directions, InputEvent, InputSource};
use crate::queue::{drop_oldest, DropOldestReceiver, DropOldestSender, Push};
use crossbeam_channel::{Select, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Anything the console loop can pull input from.
pub trait EventSource {
    /// Next pending event, without blocking.
    fn try_next(&mut self) -> Option<InputEvent>;
    /// Directions currently held across all devices.
    fn held(&self) -> Directions;
}

/// Timing for one reader thread.
#[derive(Clone, Copy, Debug)]
pub struct ReaderTiming {
    pub interval: Duration,
    pub debounce: Duration,
    pub repeat: Option<RepeatPolicy>,
    pub reconnect_every: Duration,
}

impl ReaderTiming {
    pub fn for_source(settings: &InputSettings, source: InputSource) -> Self {
        let interval = match source {
            InputSource::Keypad => settings.keypad_scan_ms,
            InputSource::Gamepad => settings.gamepad_poll_ms,
        };
        Self {
            interval: Duration::from_millis(interval.max(1)),
            debounce: settings.debounce(),
            repeat: settings.repeat(),
            reconnect_every: settings.reconnect_every(),
        }
    }
}

/// Device + bindings + debounce; one step per sample.
pub struct Reader {
    device: Box<dyn Device>,
    profile: BindingProfile,
    debouncer: Debouncer,
    timing: ReaderTiming,
    connected: bool,
    last_retry: Option<Instant>,
}

impl Reader {
    pub fn new(device: Box<dyn Device>, profile: BindingProfile, timing: ReaderTiming) -> Self {
        Self {
            device,
            profile,
            debouncer: Debouncer::new(timing.debounce, timing.repeat),
            timing,
            connected: true,
            last_retry: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Samples the device once; returns the held directions and new events.
    ///
    /// Device errors never escape: the reader goes quiet, keeps retrying on its
    /// reconnect schedule and logs each transition once.
    pub fn step(&mut self, now: Instant) -> (Directions, Vec<InputEvent>) {
        let state = match self.device.poll() {
            Ok(state) => state,
            Err(e) => {
                if self.connected {
                    log::warn!("{}: {e}; continuing without it", self.device.name());
                    self.connected = false;
                    self.debouncer.reset();
                }
                self.retry(now);
                return (Directions::empty(), Vec::new());
            }
        };
        if !self.connected {
            log::info!("{} is back", self.device.name());
            self.connected = true;
        }

        let active = self.profile.resolve(&state);
        let held = active
            .iter()
            .fold(Directions::empty(), |acc, a| acc | a.kind().direction());

        let source = self.device.source();
        let events = self
            .debouncer
            .update(&active, now)
            .into_iter()
            .map(|action| match action {
                Action::Input(kind) => InputEvent::new(kind, source, now),
                Action::Select(digit) => InputEvent::select(digit, source, now),
            })
            .collect();
        (held, events)
    }

    fn retry(&mut self, now: Instant) {
        let due = self
            .last_retry
            .map_or(true, |last| now.saturating_duration_since(last) >= self.timing.reconnect_every);
        if !due {
            return;
        }
        self.last_retry = Some(now);
        if let Err(e) = self.device.reconnect() {
            log::trace!("{}: reconnect failed: {e}", self.device.name());
        }
    }

    fn run(mut self, tx: DropOldestSender<InputEvent>, held: Arc<AtomicU8>, stop: Arc<AtomicBool>) {
        log::debug!("reader for {} started", self.device.name());
        while !stop.load(Ordering::Relaxed) {
            let (directions, events) = self.step(Instant::now());
            held.store(directions.bits(), Ordering::Relaxed);
            for event in events {
                log::trace!("{:?} from {}", event.kind, event.source);
                if tx.push(event) == Push::Evicted {
                    log::debug!("{}: input queue full, dropped oldest event", self.device.name());
                }
            }
            if tx.is_closed() {
                break;
            }
            thread::sleep(self.timing.interval);
        }
        log::debug!("reader for {} stopped", self.device.name());
    }
}

struct Lane {
    rx: DropOldestReceiver<InputEvent>,
    lookahead: Option<InputEvent>,
    held: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl Lane {
    fn fill(&mut self) {
        if self.lookahead.is_none() {
            match self.rx.try_recv() {
                Ok(event) => self.lookahead = Some(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }
        }
    }
}

/// The console's single input stream.
pub struct InputMultiplexer {
    settings: InputSettings,
    lanes: Vec<Lane>,
    stop: Arc<AtomicBool>,
}

impl InputMultiplexer {
    pub fn new(settings: InputSettings) -> Self {
        Self {
            settings,
            lanes: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a reader thread for `device`.
    pub fn attach(&mut self, device: Box<dyn Device>, profile: BindingProfile) {
        let timing = ReaderTiming::for_source(&self.settings, device.source());
        let name = device.name().to_string();
        let reader = Reader::new(device, profile, timing);

        let (tx, rx) = drop_oldest(self.settings.queue_capacity);
        let held = Arc::new(AtomicU8::new(0));
        let thread = {
            let held = held.clone();
            let stop = self.stop.clone();
            thread::Builder::new()
                .name(format!("input: {name}"))
                .spawn(move || reader.run(tx, held, stop))
        };
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("could not start reader for {name}: {e}");
                return;
            }
        };
        log::info!("attached {name}");
        self.lanes.push(Lane {
            rx,
            lookahead: None,
            held,
            thread,
        });
    }

    /// Lazily yields events forever, blocking while nothing is pending.
    pub fn poll(&mut self) -> Events<'_> {
        Events { mux: self }
    }

    fn wait_ready(&self, timeout: Duration) {
        let mut select = Select::new();
        for lane in &self.lanes {
            select.recv(&*lane.rx);
        }
        if select.ready_timeout(timeout).is_err() {
            // Nothing attached (or nothing arrived); keep the caller from spinning.
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl EventSource for InputMultiplexer {
    fn try_next(&mut self) -> Option<InputEvent> {
        for lane in self.lanes.iter_mut() {
            lane.fill();
        }
        let lane = self
            .lanes
            .iter_mut()
            .filter(|lane| lane.lookahead.is_some())
            .min_by_key(|lane| lane.lookahead.as_ref().map(|e| e.at))?;
        lane.lookahead.take()
    }

    fn held(&self) -> Directions {
        self.lanes.iter().fold(Directions::empty(), |acc, lane| {
            acc | Directions::from_bits_truncate(lane.held.load(Ordering::Relaxed))
        })
    }
}

impl Drop for InputMultiplexer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for lane in self.lanes.iter_mut() {
            if let Some(thread) = lane.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

/// Infinite event iterator returned by [`InputMultiplexer::poll`].
pub struct Events<'a> {
    mux: &'a mut InputMultiplexer,
}

impl Iterator for Events<'_> {
    type Item = InputEvent;

    fn next(&mut self) -> Option<InputEvent> {
        loop {
            if let Some(event) = self.mux.try_next() {
                return Some(event);
            }
            self.mux.wait_ready(Duration::from_millis(10));
        }
    }
}
