//! Normalized input events.
//!
//! Both input devices (matrix keypad and gamepad) are reduced to the same small
//! vocabulary ([`InputKind`]) before the console sees them. Events are immutable,
//! timestamped at capture, and consumed exactly once.
//!
//! ## Digit selection
//! Keypad digits do not get their own kind: they arrive as [`InputKind::Confirm`]
//! with `selection = Some(n)`. The console decides whether `n` names a valid game;
//! devices never validate it.
//!
//! ## Held directions
//! Discrete events are edges. Movement-heavy games also want to know which
//! directions are *currently* held; that level state is published separately as
//! [`Directions`] and read through
//! [`InputMultiplexer::held`](crate::multiplexer::InputMultiplexer::held).

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Semantic input vocabulary shared by all devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    NavUp,
    NavDown,
    NavLeft,
    NavRight,
    Confirm,
    Back,
    Start,
    Action,
}

impl InputKind {
    /// Directional kinds auto-repeat while held; everything else is one-shot.
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            InputKind::NavUp | InputKind::NavDown | InputKind::NavLeft | InputKind::NavRight
        )
    }

    /// The held-direction bit this kind corresponds to, if any.
    pub fn direction(self) -> Directions {
        match self {
            InputKind::NavUp => Directions::UP,
            InputKind::NavDown => Directions::DOWN,
            InputKind::NavLeft => Directions::LEFT,
            InputKind::NavRight => Directions::RIGHT,
            _ => Directions::empty(),
        }
    }
}

/// Which physical device produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Keypad,
    Gamepad,
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Keypad => f.write_str("keypad"),
            InputSource::Gamepad => f.write_str("gamepad"),
        }
    }
}

/// Timestamped, device-agnostic input event.
#[derive(Clone, Debug, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub source: InputSource,
    /// Capture time (monotonic). Used to merge sources in arrival order.
    pub at: Instant,
    /// Digit carried by a keypad selection (`Confirm` only).
    pub selection: Option<u8>,
}

impl InputEvent {
    pub fn new(kind: InputKind, source: InputSource, at: Instant) -> Self {
        Self {
            kind,
            source,
            at,
            selection: None,
        }
    }

    /// A keypad digit press: `Confirm` with the digit as context.
    pub fn select(digit: u8, source: InputSource, at: Instant) -> Self {
        Self {
            kind: InputKind::Confirm,
            source,
            at,
            selection: Some(digit),
        }
    }
}

bitflags::bitflags! {
    /// Directions currently held, merged across devices.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Directions: u8 {
        const UP    = 0b0001;
        const DOWN  = 0b0010;
        const LEFT  = 0b0100;
        const RIGHT = 0b1000;
    }
}
