//! The fixed list of installed games.
//!
//! Games are numbered 1..=N (N at most 9, one keypad digit each) and the numbering
//! is contiguous, so "game n" and "menu row n - 1" always agree. The catalog only
//! describes games; starting one goes through the entry's [`GameFactory`].

use crate::error::{ConsoleError, LaunchError};
use crate::session::GameSession;
use std::fmt;

/// Highest game number reachable with a single keypad digit.
pub const MAX_GAMES: usize = 9;

/// A 1-based game number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId(u8);

impl GameId {
    /// `None` outside 1..=9.
    pub fn new(n: u8) -> Option<Self> {
        (1..=MAX_GAMES as u8).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based menu row.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creates a fresh session for a game.
pub type GameFactory = fn(GameId) -> Result<Box<dyn GameSession>, LaunchError>;

#[derive(Clone)]
pub struct GameCatalogEntry {
    pub id: GameId,
    pub display_name: String,
    pub instructions: String,
    pub factory: GameFactory,
}

impl GameCatalogEntry {
    pub fn new(
        id: GameId,
        display_name: impl Into<String>,
        instructions: impl Into<String>,
        factory: GameFactory,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            instructions: instructions.into(),
            factory,
        }
    }

    pub fn launch(&self) -> Result<Box<dyn GameSession>, LaunchError> {
        (self.factory)(self.id)
    }
}

impl fmt::Debug for GameCatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameCatalogEntry")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Names and instructions of the stock lineup, in menu order.
const STANDARD: [(&str, &str); MAX_GAMES] = [
    (
        "Snake",
        "Steer the snake with the stick or the arrow keys. Eat food to grow and score. \
         Hitting a wall or your own tail ends the game. Press A to speed up.",
    ),
    (
        "Brick Breaker",
        "Move the paddle left and right to keep the ball in play. Clear every brick to win. \
         Press A to launch the ball.",
    ),
    (
        "Space Invaders",
        "Move left and right to dodge. Press A to fire. \
         Destroy every invader before they reach the ground.",
    ),
    (
        "Tic-Tac-Toe",
        "Move the cursor with the stick and press A to place your mark. \
         Three in a row wins.",
    ),
    (
        "Memory Match",
        "Move the cursor and press A to flip a card. \
         Match every pair in as few turns as you can.",
    ),
    (
        "Simple Maze",
        "Guide the dot from the entrance to the exit. \
         Finish faster for a higher score.",
    ),
    (
        "Whac-A-Mole",
        "Move the hammer to the mole that pops up and press A to hit it. \
         Score as many hits as you can before time runs out.",
    ),
    (
        "Tetris-like",
        "Left and right move the piece, up rotates, down drops faster. \
         Fill a row to clear it. The game ends when the stack reaches the top.",
    ),
    (
        "Reaction Test",
        "Wait for the screen to change colour, then press A as fast as you can. \
         Pressing early counts as a miss.",
    ),
];

#[derive(Debug)]
pub struct Catalog {
    entries: Vec<GameCatalogEntry>,
}

impl Catalog {
    /// Validates that ids run 1..=N in order, with 1 <= N <= 9.
    pub fn new(entries: Vec<GameCatalogEntry>) -> Result<Self, ConsoleError> {
        if entries.is_empty() {
            return Err(ConsoleError::Catalog("no games installed".into()));
        }
        if entries.len() > MAX_GAMES {
            return Err(ConsoleError::Catalog(format!(
                "{} games installed, at most {MAX_GAMES} fit on the keypad",
                entries.len()
            )));
        }
        for (index, entry) in entries.iter().enumerate() {
            if entry.id.index() != index {
                return Err(ConsoleError::Catalog(format!(
                    "game {} ({}) sits at position {}; ids must be contiguous from 1",
                    entry.id,
                    entry.display_name,
                    index + 1
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The stock nine-game lineup, one factory per game in menu order.
    pub fn standard(factories: [GameFactory; MAX_GAMES]) -> Self {
        let entries = STANDARD
            .iter()
            .zip(factories)
            .zip(1u8..)
            .filter_map(|(((name, help), factory), n)| {
                Some(GameCatalogEntry::new(GameId::new(n)?, *name, *help, factory))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id for digit `n`, if that game is installed.
    pub fn id(&self, n: u8) -> Option<GameId> {
        GameId::new(n).filter(|id| id.index() < self.entries.len())
    }

    pub fn entry(&self, id: GameId) -> Option<&GameCatalogEntry> {
        self.entries.get(id.index())
    }

    pub fn entry_at(&self, index: usize) -> Option<&GameCatalogEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[GameCatalogEntry] {
        &self.entries
    }
}
