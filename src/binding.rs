//! Control → action bindings.
//!
//! Each device reports a raw [`DeviceState`] (keys, buttons, axes). A
//! [`BindingProfile`] resolves that state into the [`Action`]s currently active.
//! Profiles are plain data and can be overridden from the TOML config:
//!
//! ```toml
//! [bindings.keypad]
//! name = "keypad"
//! bindings = [
//!     { control = { key = "A" }, action = { input = "start" } },
//!     { control = { key = "7" }, action = { select = 7 } },
//! ]
//! ```
use crate::event::InputKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Left stick / d-pad deflection needed before an axis counts as a direction.
pub const DEFAULT_AXIS_THRESHOLD: f32 = 0.5;

/// A raw control on a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// A matrix keypad key, by its legend.
    Key(char),
    /// A gamepad button index.
    Button(u8),
    /// One half of a gamepad axis.
    Axis { index: u8, positive: bool },
}

/// What an active control means to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Input(InputKind),
    /// Direct game selection by number (keypad digits).
    Select(u8),
}

impl Action {
    pub fn kind(self) -> InputKind {
        match self {
            Action::Input(kind) => kind,
            Action::Select(_) => InputKind::Confirm,
        }
    }
}

/// Maps a control to an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub control: Control,
    pub action: Action,
    /// Swap the sign of an axis before thresholding.
    #[serde(default)]
    pub invert: bool,
}

impl Binding {
    pub fn new(control: Control, action: Action) -> Self {
        Self {
            control,
            action,
            invert: false,
        }
    }
}

/// Serializable set of bindings for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_threshold")]
    pub axis_threshold: f32,
    pub bindings: Vec<Binding>,
}

fn default_threshold() -> f32 {
    DEFAULT_AXIS_THRESHOLD
}

/// Raw state snapshot reported by a device on each poll.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub keys: HashSet<char>,
    pub buttons: HashMap<u8, bool>,
    pub axes: HashMap<u8, f32>,
}

impl DeviceState {
    /// Value of an axis (0.0 if never reported).
    pub fn get_axis(&self, index: u8) -> f32 {
        self.axes.get(&index).copied().unwrap_or(0.0)
    }

    /// Whether a button is down (false if never reported).
    pub fn get_button(&self, index: u8) -> bool {
        self.buttons.get(&index).copied().unwrap_or(false)
    }

    pub fn is_key_down(&self, key: char) -> bool {
        self.keys.contains(&key)
    }
}

impl BindingProfile {
    /// Default 4×4 keypad layout.
    ///
    /// ```text
    /// 1 2 3 A      digits select a game directly
    /// 4 5 6 B      A = start, B = confirm
    /// 7 8 9 C      C = action, D = back
    /// * 0 # D      * / # = menu up / down
    /// ```
    pub fn keypad_default() -> Self {
        let mut bindings: Vec<Binding> = ('0'..='9')
            .zip(0u8..)
            .map(|(key, digit)| Binding::new(Control::Key(key), Action::Select(digit)))
            .collect();
        bindings.extend([
            Binding::new(Control::Key('A'), Action::Input(InputKind::Start)),
            Binding::new(Control::Key('B'), Action::Input(InputKind::Confirm)),
            Binding::new(Control::Key('C'), Action::Input(InputKind::Action)),
            Binding::new(Control::Key('D'), Action::Input(InputKind::Back)),
            Binding::new(Control::Key('*'), Action::Input(InputKind::NavUp)),
            Binding::new(Control::Key('#'), Action::Input(InputKind::NavDown)),
        ]);
        Self {
            name: "keypad".into(),
            description: Some("4x4 matrix keypad".into()),
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
            bindings,
        }
    }

    /// Default Xbox-style layout as reported by the Linux joystick driver.
    ///
    /// Axes 0/1 are the left stick, 6/7 the d-pad hat; negative Y is up.
    pub fn gamepad_default() -> Self {
        let axis = |index, positive| Control::Axis { index, positive };
        let nav = Action::Input;
        let bindings = vec![
            Binding::new(axis(0, false), nav(InputKind::NavLeft)),
            Binding::new(axis(0, true), nav(InputKind::NavRight)),
            Binding::new(axis(1, false), nav(InputKind::NavUp)),
            Binding::new(axis(1, true), nav(InputKind::NavDown)),
            Binding::new(axis(6, false), nav(InputKind::NavLeft)),
            Binding::new(axis(6, true), nav(InputKind::NavRight)),
            Binding::new(axis(7, false), nav(InputKind::NavUp)),
            Binding::new(axis(7, true), nav(InputKind::NavDown)),
            Binding::new(Control::Button(0), nav(InputKind::Confirm)),
            Binding::new(Control::Button(1), nav(InputKind::Back)),
            Binding::new(Control::Button(3), nav(InputKind::Action)),
            Binding::new(Control::Button(6), nav(InputKind::Back)),
            Binding::new(Control::Button(7), nav(InputKind::Start)),
        ];
        Self {
            name: "gamepad".into(),
            description: Some("Xbox-compatible controller".into()),
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
            bindings,
        }
    }

    /// Resolves the actions active in `state`, in binding order, without duplicates.
    pub fn resolve(&self, state: &DeviceState) -> Vec<Action> {
        let mut active = Vec::new();

        for binding in &self.bindings {
            let on = match binding.control {
                Control::Key(key) => state.is_key_down(key),
                Control::Button(index) => state.get_button(index),
                Control::Axis { index, positive } => {
                    let mut value = state.get_axis(index);
                    if binding.invert {
                        value *= -1.0;
                    }
                    if positive {
                        value > self.axis_threshold
                    } else {
                        value < -self.axis_threshold
                    }
                }
            };
            if on && !active.contains(&binding.action) {
                active.push(binding.action);
            }
        }

        active
    }
}
