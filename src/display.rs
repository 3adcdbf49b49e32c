//! Keeps both screens consistent with the console state.
//!
//! The primary screen shows the game canvas while a game is on, and a blank
//! frame otherwise. The secondary panel shows text layouts (menu, instructions,
//! game over) or a status overlay while a game runs.
//!
//! Rendering goes through a small view model: every call to
//! [`Screen::render`] derives a [`SecondaryView`] from the state and redraws the
//! panel only when that view differs from the last one drawn. The blank primary
//! frame is likewise presented once per change, not every frame.

use crate::catalog::Catalog;
use crate::console::ConsoleState;
use crate::error::ConsoleError;
use crate::session::{Color, Frame, BLACK, WHITE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const SECONDARY_WIDTH: i32 = 240;
pub const SECONDARY_HEIGHT: i32 = 320;

/// Consecutive failed writes before a sink is switched off.
pub const MAX_SINK_FAILURES: u32 = 3;

const ACCENT: Color = 0xFF_C8_00;
const DIM: Color = 0x80_80_80;
const HIGHLIGHT: Color = 0x20_40_A0;

/// A font choice for text commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontFace {
    /// A font file on disk.
    Preferred(PathBuf),
    /// The sink's own fixed-width font.
    BuiltIn,
}

impl FontFace {
    /// First candidate that exists, else [`FontFace::BuiltIn`].
    pub fn resolve<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for path in candidates {
            let path = path.as_ref();
            if path.is_file() {
                log::info!("secondary font: {}", path.display());
                return FontFace::Preferred(path.to_path_buf());
            }
        }
        log::warn!("no configured font found, using the built-in font");
        FontFace::BuiltIn
    }
}

/// Drawing primitive for the secondary panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    Clear(Color),
    Rect {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
        fill: bool,
    },
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        color: Color,
        font: FontFace,
        size: u16,
    },
}

pub trait PrimarySink {
    fn present(&mut self, frame: &Frame) -> Result<(), ConsoleError>;
}

pub trait SecondarySink {
    fn draw(&mut self, commands: &[DrawCommand]) -> Result<(), ConsoleError>;
}

/// Discards everything. Used when a display is missing.
pub struct NullSink;

impl PrimarySink for NullSink {
    fn present(&mut self, _frame: &Frame) -> Result<(), ConsoleError> {
        Ok(())
    }
}

impl SecondarySink for NullSink {
    fn draw(&mut self, _commands: &[DrawCommand]) -> Result<(), ConsoleError> {
        Ok(())
    }
}

/// What the console calls after every transition and once per frame.
pub trait Screen {
    fn render(&mut self, state: &ConsoleState, canvas: Option<&Frame>);
}

/// Everything the secondary panel shows, derived from the console state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecondaryView {
    Splash,
    Menu { selected: usize },
    Instructions { index: usize },
    Status {
        index: usize,
        score: u32,
        paused: bool,
        countdown: Option<u64>,
    },
    GameOver { index: usize, score: u32 },
    ShuttingDown,
}

impl SecondaryView {
    pub fn of(state: &ConsoleState) -> Self {
        match state {
            ConsoleState::Booting { .. } => SecondaryView::Splash,
            ConsoleState::Menu { selected } => SecondaryView::Menu {
                selected: *selected,
            },
            ConsoleState::Instructions { game, .. } => SecondaryView::Instructions {
                index: game.index(),
            },
            ConsoleState::Countdown {
                game, remaining, ..
            } => SecondaryView::Status {
                index: game.index(),
                score: 0,
                paused: false,
                countdown: Some(whole_seconds(*remaining)),
            },
            ConsoleState::Playing { game, score, .. } => SecondaryView::Status {
                index: game.index(),
                score: *score,
                paused: false,
                countdown: None,
            },
            ConsoleState::Paused { game, score, .. } => SecondaryView::Status {
                index: game.index(),
                score: *score,
                paused: true,
                countdown: None,
            },
            ConsoleState::GameOver { game, score, .. } => SecondaryView::GameOver {
                index: game.index(),
                score: *score,
            },
            ConsoleState::ShuttingDown => SecondaryView::ShuttingDown,
        }
    }

    fn shows_game(&self) -> bool {
        matches!(self, SecondaryView::Status { .. })
    }
}

/// Countdown as shown: 3, 2, 1 (rounded up).
fn whole_seconds(remaining: Duration) -> u64 {
    let ms = remaining.as_millis() as u64;
    ms.div_ceil(1000)
}

/// A sink wrapper that switches itself off after repeated failures.
struct Guarded<S: ?Sized> {
    label: &'static str,
    failures: u32,
    sink: Box<S>,
}

impl<S: ?Sized> Guarded<S> {
    fn new(label: &'static str, sink: Box<S>) -> Self {
        Self {
            label,
            failures: 0,
            sink,
        }
    }

    fn enabled(&self) -> bool {
        self.failures < MAX_SINK_FAILURES
    }

    /// Returns true when the write succeeded.
    fn record(&mut self, result: Result<(), ConsoleError>) -> bool {
        match result {
            Ok(()) => {
                self.failures = 0;
                true
            }
            Err(e) => {
                self.failures += 1;
                log::warn!("{} display write failed: {e}", self.label);
                if !self.enabled() {
                    let disabled = ConsoleError::unavailable(self.label, "too many failed writes");
                    log::warn!("{disabled}; display disabled");
                }
                false
            }
        }
    }
}

/// Drives the primary and secondary sinks from console state.
pub struct DisplayCoordinator {
    catalog: Arc<Catalog>,
    primary: Guarded<dyn PrimarySink>,
    secondary: Guarded<dyn SecondarySink>,
    font: FontFace,
    blank: Frame,
    last_view: Option<SecondaryView>,
    primary_blank: bool,
}

impl DisplayCoordinator {
    pub fn new(
        catalog: Arc<Catalog>,
        primary: Box<dyn PrimarySink>,
        secondary: Box<dyn SecondarySink>,
        font: FontFace,
    ) -> Self {
        Self {
            catalog,
            primary: Guarded::new("primary", primary),
            secondary: Guarded::new("secondary", secondary),
            font,
            blank: Frame::primary(),
            last_view: None,
            primary_blank: false,
        }
    }

    fn name(&self, index: usize) -> &str {
        self.catalog
            .entry_at(index)
            .map_or("?", |entry| entry.display_name.as_str())
    }

    fn present_primary(&mut self, view: &SecondaryView, canvas: Option<&Frame>) {
        if !self.primary.enabled() {
            return;
        }
        match canvas.filter(|_| view.shows_game()) {
            Some(frame) => {
                let result = self.primary.sink.present(frame);
                self.primary.record(result);
                self.primary_blank = false;
            }
            None if !self.primary_blank => {
                let result = self.primary.sink.present(&self.blank);
                self.primary_blank = self.primary.record(result);
            }
            None => {}
        }
    }

    fn draw_secondary(&mut self, view: SecondaryView) {
        if self.last_view.as_ref() == Some(&view) || !self.secondary.enabled() {
            return;
        }
        let commands = self.layout(&view);
        let result = self.secondary.sink.draw(&commands);
        if self.secondary.record(result) {
            self.last_view = Some(view);
        }
    }

    /// Builds the command list for `view`.
    pub fn layout(&self, view: &SecondaryView) -> Vec<DrawCommand> {
        let mut panel = Panel::new(self.font.clone());
        match view {
            SecondaryView::Splash => {
                panel.text(60, 140, "ARCADE", WHITE, 32);
                panel.text(70, 190, "starting...", DIM, 16);
            }
            SecondaryView::Menu { selected } => self.menu(&mut panel, *selected),
            SecondaryView::Instructions { index } => {
                panel.header(self.name(*index));
                let instructions = self
                    .catalog
                    .entry_at(*index)
                    .map_or("", |entry| entry.instructions.as_str());
                let mut y = 56;
                for line in wrap(instructions, WRAP_COLUMNS) {
                    panel.text(8, y, &line, WHITE, 16);
                    y += 20;
                }
                panel.hint("START: play   D: back");
            }
            SecondaryView::Status {
                index,
                score,
                paused,
                countdown,
            } => {
                panel.header(self.name(*index));
                panel.text(8, 60, &format!("Score: {score}"), WHITE, 20);
                if let Some(n) = countdown {
                    panel.text(100, 140, &n.to_string(), ACCENT, 48);
                }
                if *paused {
                    panel.text(70, 140, "PAUSED", ACCENT, 24);
                    panel.hint("START: resume   D: quit");
                } else {
                    panel.hint("START: pause");
                }
            }
            SecondaryView::GameOver { index, score } => {
                panel.header(self.name(*index));
                panel.text(40, 120, "GAME OVER", ACCENT, 28);
                panel.text(40, 170, &format!("Score: {score}"), WHITE, 20);
                panel.hint("OK: menu");
            }
            SecondaryView::ShuttingDown => {
                panel.text(30, 150, "Shutting down...", WHITE, 20);
            }
        }
        panel.commands
    }

    fn menu(&self, panel: &mut Panel, selected: usize) {
        panel.header("SELECT GAME");
        let total = self.catalog.len();
        let first = menu_window(selected, total);
        let last = (first + MENU_ROWS).min(total);
        for (row, index) in (first..last).enumerate() {
            let y = MENU_TOP + row as i32 * MENU_ROW_HEIGHT;
            let color = if index == selected {
                panel.fill(0, y - 2, SECONDARY_WIDTH, MENU_ROW_HEIGHT, HIGHLIGHT);
                ACCENT
            } else {
                WHITE
            };
            panel.text(8, y, &format!("{}. {}", index + 1, self.name(index)), color, 18);
        }
        if first > 0 {
            panel.text(SECONDARY_WIDTH - 16, MENU_TOP - 14, "^", DIM, 12);
        }
        if last < total {
            let y = MENU_TOP + MENU_ROWS as i32 * MENU_ROW_HEIGHT - 8;
            panel.text(SECONDARY_WIDTH - 16, y, "v", DIM, 12);
        }
        panel.hint("1-9/OK: choose   */#: move");
    }
}

impl Screen for DisplayCoordinator {
    fn render(&mut self, state: &ConsoleState, canvas: Option<&Frame>) {
        let view = SecondaryView::of(state);
        self.present_primary(&view, canvas);
        self.draw_secondary(view);
    }
}

const MENU_ROWS: usize = 7;
const MENU_TOP: i32 = 52;
const MENU_ROW_HEIGHT: i32 = 32;
const WRAP_COLUMNS: usize = 26;

/// First visible row so that `selected` stays roughly centred.
fn menu_window(selected: usize, total: usize) -> usize {
    if total <= MENU_ROWS {
        return 0;
    }
    selected
        .saturating_sub(MENU_ROWS / 2)
        .min(total - MENU_ROWS)
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

struct Panel {
    font: FontFace,
    commands: Vec<DrawCommand>,
}

impl Panel {
    fn new(font: FontFace) -> Self {
        Self {
            font,
            commands: vec![DrawCommand::Clear(BLACK)],
        }
    }

    fn text(&mut self, x: i32, y: i32, text: &str, color: Color, size: u16) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_string(),
            color,
            font: self.font.clone(),
            size,
        });
    }

    fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            w,
            h,
            color,
            fill: true,
        });
    }

    fn header(&mut self, title: &str) {
        self.text(8, 10, title, ACCENT, 22);
        self.commands.push(DrawCommand::Line {
            x0: 4,
            y0: 40,
            x1: SECONDARY_WIDTH - 4,
            y1: 40,
            color: DIM,
        });
    }

    fn hint(&mut self, hint: &str) {
        self.text(8, SECONDARY_HEIGHT - 24, hint, DIM, 14);
    }
}
