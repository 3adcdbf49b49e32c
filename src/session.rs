//! The contract between the console and a running game.
//!
//! A game is a [`GameSession`]: the console calls [`tick`](GameSession::tick) once
//! per frame while the session is playing, handing it at most one event, the
//! currently held directions, the elapsed time and the primary-screen canvas.
//! The session reports its score every tick and signals the end of play by
//! returning a [`Completion`]. It never touches shared console state.
//!
//! [`Session`] wraps a boxed game and guarantees that
//! [`teardown`](GameSession::teardown) runs exactly once, however the session
//! ends (completion, BACK from pause, or shutdown).

use crate::catalog::GameId;
use crate::event::{Directions, InputEvent};
use std::fmt;
use std::time::Duration;

pub const PRIMARY_WIDTH: usize = 800;
pub const PRIMARY_HEIGHT: usize = 600;

/// Packed `0x00RRGGBB`.
pub type Color = u32;

pub const BLACK: Color = 0x00_00_00;
pub const WHITE: Color = 0xFF_FF_FF;

/// The primary-screen canvas, row-major `0x00RRGGBB` pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![BLACK; width * height],
        }
    }

    /// 800x600, the fixed primary resolution.
    pub fn primary() -> Self {
        Self::new(PRIMARY_WIDTH, PRIMARY_HEIGHT)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fills the rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Color) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end].fill(color);
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
    Timeout,
}

/// End of play, with the final score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub outcome: Outcome,
    pub score: u32,
}

/// What one tick reports back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    pub score: u32,
    pub completion: Option<Completion>,
}

impl Tick {
    pub fn running(score: u32) -> Self {
        Self {
            score,
            completion: None,
        }
    }

    pub fn finished(outcome: Outcome, score: u32) -> Self {
        Self {
            score,
            completion: Some(Completion { outcome, score }),
        }
    }
}

/// A running game.
pub trait GameSession: Send {
    /// Advances the game by `dt` and draws into `canvas`.
    ///
    /// `input` is at most one discrete event; `held` is the level state of the
    /// direction inputs. Calls stop after a tick returns a completion.
    fn tick(
        &mut self,
        input: Option<&InputEvent>,
        held: Directions,
        dt: Duration,
        canvas: &mut Frame,
    ) -> Tick;

    /// Releases whatever the game acquired. Called exactly once.
    fn teardown(&mut self) {}
}

/// Owns a running game and guarantees its teardown.
pub struct Session {
    game: GameId,
    inner: Box<dyn GameSession>,
    torn_down: bool,
}

impl Session {
    pub fn new(game: GameId, inner: Box<dyn GameSession>) -> Self {
        Self {
            game,
            inner,
            torn_down: false,
        }
    }

    pub fn game(&self) -> GameId {
        self.game
    }

    pub fn tick(
        &mut self,
        input: Option<&InputEvent>,
        held: Directions,
        dt: Duration,
        canvas: &mut Frame,
    ) -> Tick {
        self.inner.tick(input, held, dt, canvas)
    }

    /// Idempotent; also runs on drop.
    pub fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            log::debug!("tearing down game {}", self.game);
            self.inner.teardown();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("game", &self.game)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl GameSession for Counting {
        fn tick(&mut self, _: Option<&InputEvent>, _: Directions, _: Duration, _: &mut Frame) -> Tick {
            Tick::running(0)
        }

        fn teardown(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn teardown_runs_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let id = GameId::new(1).unwrap();
        let mut session = Session::new(id, Box::new(Counting(count.clone())));
        session.teardown();
        session.teardown();
        drop(session);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(Session::new(id, Box::new(Counting(count.clone()))));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = Frame::new(4, 3);
        frame.fill_rect(2, 1, 10, 10, WHITE);
        assert_eq!(frame.get(1, 1), Some(BLACK));
        assert_eq!(frame.get(3, 2), Some(WHITE));
        assert_eq!(frame.get(4, 2), None);
        frame.fill_rect(9, 9, 2, 2, WHITE);
        frame.clear(BLACK);
        assert!(frame.pixels().iter().all(|&p| p == BLACK));
    }
}
