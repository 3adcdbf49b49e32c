//! The console state machine.
//!
//! [`Console`] owns the one live [`ConsoleState`] and is the only thing that
//! changes it. Each frame it
//!
//! 1. checks for a watchdog shutdown signal (this preempts everything),
//! 2. consumes input: a single event while a game is playing, otherwise queued
//!    events in order until the queue is empty or a game resumes,
//! 3. advances timers and ticks the running game,
//! 4. hands the result to the display.
//!
//! Calls only go outward (feedback, display, game session); nothing calls back
//! into the console.

use crate::catalog::{Catalog, GameId};
use crate::config::ConsoleSettings;
use crate::display::Screen;
use crate::event::{Directions, InputEvent, InputKind};
use crate::feedback::{Cue, CueSink};
use crate::multiplexer::EventSource;
use crate::queue::DropOldestReceiver;
use crate::session::{Frame, Session, BLACK};
use crate::watchdog::ShutdownSignal;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Where the console is. `selected` is the menu cursor to come back to.
#[derive(Debug)]
pub enum ConsoleState {
    Booting {
        elapsed: Duration,
    },
    Menu {
        selected: usize,
    },
    Instructions {
        game: GameId,
        selected: usize,
    },
    Countdown {
        game: GameId,
        selected: usize,
        remaining: Duration,
    },
    Playing {
        game: GameId,
        selected: usize,
        session: Session,
        score: u32,
    },
    Paused {
        game: GameId,
        selected: usize,
        session: Session,
        score: u32,
    },
    GameOver {
        game: GameId,
        selected: usize,
        score: u32,
        elapsed: Duration,
    },
    ShuttingDown,
}

/// Field-less mirror of [`ConsoleState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    Booting,
    Menu,
    Instructions,
    Countdown,
    Playing,
    Paused,
    GameOver,
    ShuttingDown,
}

impl ConsoleState {
    pub fn kind(&self) -> StateKind {
        match self {
            ConsoleState::Booting { .. } => StateKind::Booting,
            ConsoleState::Menu { .. } => StateKind::Menu,
            ConsoleState::Instructions { .. } => StateKind::Instructions,
            ConsoleState::Countdown { .. } => StateKind::Countdown,
            ConsoleState::Playing { .. } => StateKind::Playing,
            ConsoleState::Paused { .. } => StateKind::Paused,
            ConsoleState::GameOver { .. } => StateKind::GameOver,
            ConsoleState::ShuttingDown => StateKind::ShuttingDown,
        }
    }

    /// The game this state is about, if any.
    pub fn game(&self) -> Option<GameId> {
        match self {
            ConsoleState::Instructions { game, .. }
            | ConsoleState::Countdown { game, .. }
            | ConsoleState::Playing { game, .. }
            | ConsoleState::Paused { game, .. }
            | ConsoleState::GameOver { game, .. } => Some(*game),
            _ => None,
        }
    }

    /// True while the primary screen shows the game canvas.
    pub fn shows_canvas(&self) -> bool {
        matches!(
            self.kind(),
            StateKind::Countdown | StateKind::Playing | StateKind::Paused
        )
    }
}

pub struct Console {
    catalog: Arc<Catalog>,
    settings: ConsoleSettings,
    state: ConsoleState,
    feedback: Box<dyn CueSink>,
    display: Box<dyn Screen>,
    shutdown: DropOldestReceiver<ShutdownSignal>,
    canvas: Frame,
    /// The event handed to the game on its next tick.
    pending: Option<InputEvent>,
}

impl Console {
    pub fn new(
        catalog: Arc<Catalog>,
        settings: ConsoleSettings,
        feedback: Box<dyn CueSink>,
        display: Box<dyn Screen>,
        shutdown: DropOldestReceiver<ShutdownSignal>,
    ) -> Self {
        Self {
            catalog,
            settings,
            state: ConsoleState::Booting {
                elapsed: Duration::ZERO,
            },
            feedback,
            display,
            shutdown,
            canvas: Frame::primary(),
            pending: None,
        }
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn is_shut_down(&self) -> bool {
        self.kind() == StateKind::ShuttingDown
    }

    /// Plays the boot cue and draws the first screen.
    pub fn start(&mut self) {
        log::info!("console starting with {} games", self.catalog.len());
        self.feedback.play(Cue::Boot);
        self.render();
    }

    /// Runs frames at the configured rate until shutdown.
    pub fn run(&mut self, source: &mut dyn EventSource) {
        self.start();
        let frame_time = self.settings.frame_time();
        let mut last = Instant::now();
        while !self.is_shut_down() {
            let frame_start = Instant::now();
            let dt = frame_start.saturating_duration_since(last);
            last = frame_start;
            self.run_frame(source, dt);
            if let Some(rest) = frame_time.checked_sub(frame_start.elapsed()) {
                thread::sleep(rest);
            }
        }
        log::info!("console stopped");
    }

    /// One frame: shutdown check, input, timers, render.
    pub fn run_frame(&mut self, source: &mut dyn EventSource, dt: Duration) {
        if self.check_shutdown() {
            return;
        }
        let mut playing = self.kind() == StateKind::Playing;
        while let Some(event) = source.try_next() {
            self.handle_event(event);
            // Whatever is left waits for the game's next ticks.
            playing |= self.kind() == StateKind::Playing;
            if playing {
                break;
            }
        }
        self.advance(dt, source.held());
        self.render();
    }

    /// True once shutting down; enters that state if a signal is waiting.
    pub fn check_shutdown(&mut self) -> bool {
        if self.is_shut_down() {
            return true;
        }
        if self.shutdown.try_recv().is_ok() {
            self.enter_shutdown();
            return true;
        }
        false
    }

    fn enter_shutdown(&mut self) {
        let before = self.kind();
        // Dropping the old state tears the session down before the cue stops.
        self.state = ConsoleState::ShuttingDown;
        self.pending = None;
        self.feedback.cancel();
        self.changed(before);
    }

    /// Applies one input event to the current state.
    pub fn handle_event(&mut self, event: InputEvent) {
        log::trace!("{:?} from {} in {:?}", event.kind, event.source, self.kind());
        let before = self.kind();
        let state = self.take_state();
        self.state = self.on_event(state, event);
        self.changed(before);
    }

    fn on_event(&mut self, state: ConsoleState, event: InputEvent) -> ConsoleState {
        use ConsoleState::*;
        let games = self.catalog.len().max(1);

        match (state, event.kind) {
            (Menu { selected }, InputKind::NavUp) => {
                self.click();
                Menu {
                    selected: (selected + games - 1) % games,
                }
            }
            (Menu { selected }, InputKind::NavDown) => {
                self.click();
                Menu {
                    selected: (selected + 1) % games,
                }
            }
            (Menu { selected }, InputKind::Confirm) => {
                let target = match event.selection {
                    Some(digit) => self.catalog.id(digit),
                    None => self.catalog.entry_at(selected).map(|entry| entry.id),
                };
                match target {
                    Some(game) => {
                        self.feedback.play(Cue::EnterInstructions);
                        Instructions { game, selected }
                    }
                    None => {
                        log::debug!("no game for selection {:?}", event.selection);
                        Menu { selected }
                    }
                }
            }

            (Instructions { game, selected }, InputKind::Start) => {
                self.canvas.clear(BLACK);
                self.feedback.play(Cue::Countdown);
                Countdown {
                    game,
                    selected,
                    remaining: Cue::Countdown.duration(),
                }
            }
            (Instructions { selected, .. }, InputKind::Back) => self.back_to_menu(selected),

            (
                Playing {
                    game,
                    selected,
                    session,
                    score,
                },
                InputKind::Start,
            ) => {
                self.pending = None;
                Paused {
                    game,
                    selected,
                    session,
                    score,
                }
            }
            (state @ Playing { .. }, _) => {
                if self.pending.is_none() {
                    self.pending = Some(event);
                }
                state
            }

            (
                Paused {
                    game,
                    selected,
                    session,
                    score,
                },
                InputKind::Start,
            ) => Playing {
                game,
                selected,
                session,
                score,
            },
            (
                Paused {
                    selected,
                    mut session,
                    ..
                },
                InputKind::Back,
            ) => {
                session.teardown();
                drop(session);
                self.back_to_menu(selected)
            }

            (GameOver { selected, .. }, InputKind::Confirm | InputKind::Back) => {
                self.back_to_menu(selected)
            }

            (state, _) => state,
        }
    }

    /// Advances timers and ticks the running game.
    pub fn advance(&mut self, dt: Duration, held: Directions) {
        let before = self.kind();
        let state = self.take_state();
        self.state = self.on_advance(state, dt, held);
        self.changed(before);
    }

    fn on_advance(&mut self, state: ConsoleState, dt: Duration, held: Directions) -> ConsoleState {
        use ConsoleState::*;

        match state {
            Booting { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed >= Cue::Boot.duration() {
                    Menu { selected: 0 }
                } else {
                    Booting { elapsed }
                }
            }

            Countdown {
                game,
                selected,
                remaining,
            } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.launch(game, selected)
                } else {
                    Countdown {
                        game,
                        selected,
                        remaining,
                    }
                }
            }

            Playing {
                game,
                selected,
                mut session,
                ..
            } => {
                let input = self.pending.take();
                let tick = session.tick(input.as_ref(), held, dt, &mut self.canvas);
                match tick.completion {
                    Some(done) => {
                        log::info!("game {game} ended: {:?}, score {}", done.outcome, done.score);
                        session.teardown();
                        drop(session);
                        self.feedback.play(Cue::GameOver);
                        GameOver {
                            game,
                            selected,
                            score: done.score,
                            elapsed: Duration::ZERO,
                        }
                    }
                    None => Playing {
                        game,
                        selected,
                        session,
                        score: tick.score,
                    },
                }
            }

            GameOver {
                game,
                selected,
                score,
                elapsed,
            } => {
                let elapsed = elapsed + dt;
                if elapsed >= self.settings.game_over_timeout() {
                    self.back_to_menu(selected)
                } else {
                    GameOver {
                        game,
                        selected,
                        score,
                        elapsed,
                    }
                }
            }

            state => state,
        }
    }

    fn launch(&mut self, game: GameId, selected: usize) -> ConsoleState {
        let launched = match self.catalog.entry(game) {
            Some(entry) => entry.launch(),
            None => Err(crate::error::LaunchError::new(format!("game {game} is not installed"))),
        };
        match launched {
            Ok(inner) => {
                self.canvas.clear(BLACK);
                self.pending = None;
                ConsoleState::Playing {
                    game,
                    selected,
                    session: Session::new(game, inner),
                    score: 0,
                }
            }
            Err(e) => {
                log::warn!("game {game}: {e}");
                self.feedback.play(Cue::LaunchFailed);
                ConsoleState::Menu { selected }
            }
        }
    }

    fn click(&mut self) {
        if self.settings.menu_clicks {
            self.feedback.play(Cue::Click);
        }
    }

    fn back_to_menu(&mut self, selected: usize) -> ConsoleState {
        self.feedback.play(Cue::ReturnToMenu);
        ConsoleState::Menu { selected }
    }

    fn take_state(&mut self) -> ConsoleState {
        std::mem::replace(&mut self.state, ConsoleState::ShuttingDown)
    }

    fn changed(&mut self, before: StateKind) {
        let after = self.kind();
        if before != after {
            match self.state.game() {
                Some(game) => log::info!("{before:?} -> {after:?} (game {game})"),
                None => log::info!("{before:?} -> {after:?}"),
            }
            self.render();
        }
    }

    fn render(&mut self) {
        let canvas = self.state.shows_canvas().then_some(&self.canvas);
        self.display.render(&self.state, canvas);
    }
}
