//! Edge detection with debounce and auto-repeat.
//!
//! Readers feed the set of currently active actions on every sample; the
//! debouncer turns level state into discrete presses.
//!
//! - An action must stay active for `debounce` before its first press is emitted.
//! - Navigation actions held longer than `repeat_delay` emit another press every
//!   `repeat_interval`. Other actions are strictly one-shot per hold.
//! - Releasing an action forgets it; the next activation starts a new hold.

use crate::binding::Action;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatPolicy {
    pub delay: Duration,
    pub interval: Duration,
}

#[derive(Debug)]
struct Held {
    action: Action,
    since: Instant,
    last_emit: Option<Instant>,
}

#[derive(Debug)]
pub struct Debouncer {
    debounce: Duration,
    repeat: Option<RepeatPolicy>,
    held: Vec<Held>,
}

impl Debouncer {
    pub fn new(debounce: Duration, repeat: Option<RepeatPolicy>) -> Self {
        Self {
            debounce,
            repeat,
            held: Vec::new(),
        }
    }

    /// Feeds one sample; returns the presses to emit, in `active` order.
    pub fn update(&mut self, active: &[Action], now: Instant) -> Vec<Action> {
        self.held.retain(|h| active.contains(&h.action));

        let mut presses = Vec::new();
        for &action in active {
            let index = match self.held.iter().position(|h| h.action == action) {
                Some(index) => index,
                None => {
                    self.held.push(Held {
                        action,
                        since: now,
                        last_emit: None,
                    });
                    self.held.len() - 1
                }
            };
            let held = &mut self.held[index];
            let stable_for = now.saturating_duration_since(held.since);

            let fire = match held.last_emit {
                None => stable_for >= self.debounce,
                Some(last) => match self.repeat {
                    Some(repeat) if action.kind().is_navigation() => {
                        stable_for >= self.debounce + repeat.delay
                            && now.saturating_duration_since(last) >= repeat.interval
                    }
                    _ => false,
                },
            };

            if fire {
                held.last_emit = Some(now);
                presses.push(action);
            }
        }
        presses
    }

    /// Drops all hold tracking (device went away).
    pub fn reset(&mut self) {
        self.held.clear();
    }
}
