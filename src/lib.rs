//! arcadebox — control core for a dual-screen arcade console.
//!
//! Merges a matrix keypad and a USB gamepad into one input stream, runs the
//! menu/game lifecycle, keeps an 800x600 game screen and a 240x320 status panel
//! in step with it, plays light and buzzer cues, and powers the board off on a
//! long press of the power button.
//!
//! Games plug in through [`GameSession`] and a [`Catalog`] of factories;
//! [`runtime::run`] wires everything up from a [`ConsoleConfig`].

pub mod backends;
pub mod binding;
pub mod catalog;
pub mod config;
pub mod console;
pub mod debounce;
pub mod device;
pub mod display;
pub mod error;
pub mod event;
pub mod feedback;
pub mod hal;
pub mod logger;
pub mod multiplexer;
pub mod queue;
pub mod runtime;
pub mod session;
pub mod watchdog;

pub use binding::*;
pub use catalog::{Catalog, GameCatalogEntry, GameFactory, GameId};
pub use config::ConsoleConfig;
pub use console::{Console, ConsoleState, StateKind};
pub use device::*;
pub use display::{DisplayCoordinator, DrawCommand, PrimarySink, Screen, SecondarySink};
pub use error::{ConsoleError, LaunchError};
pub use event::*;
pub use feedback::{Cue, CueSink, FeedbackSequencer};
pub use multiplexer::{EventSource, InputMultiplexer};
pub use session::{Completion, Frame, GameSession, Outcome, Session, Tick};
pub use watchdog::{PowerWatchdog, ShutdownSignal};
