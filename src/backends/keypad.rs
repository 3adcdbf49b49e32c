//! 4×4 matrix keypad.
//!
//! Columns are driven low one at a time; a row reading low while its column is
//! selected means the key at `(row, col)` is down. Scancodes are translated through
//! a key map. A scancode the key map does not cover is an input glitch: it is
//! logged at debug level and dropped.
//!
//! Rows must idle high. The Linux bring-up opens them through the GPIO
//! character device with the internal pull-up on; a board without that needs
//! external pull-ups on every row.

use crate::binding::DeviceState;
use crate::device::Device;
use crate::error::ConsoleError;
use crate::event::InputSource;
use crate::hal::{InputPin, OutputPin};

/// Legends of the stock 4×4 membrane keypad, row-major.
pub const DEFAULT_KEYMAP: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

/// Electrical side of a key matrix.
pub trait MatrixLines: Send {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    /// Drives (or releases) one column.
    fn select_column(&mut self, col: usize, selected: bool) -> Result<(), ConsoleError>;
    /// Whether `row` is pulled to the selected level.
    fn row_active(&mut self, row: usize) -> Result<bool, ConsoleError>;
}

/// Matrix wired to GPIO: column outputs idle high, row inputs pulled up.
pub struct PinMatrix {
    rows: Vec<Box<dyn InputPin>>,
    cols: Vec<Box<dyn OutputPin>>,
}

impl PinMatrix {
    pub fn new(
        rows: Vec<Box<dyn InputPin>>,
        mut cols: Vec<Box<dyn OutputPin>>,
    ) -> Result<Self, ConsoleError> {
        for col in cols.iter_mut() {
            col.set(true)?;
        }
        Ok(Self { rows, cols })
    }
}

impl MatrixLines for PinMatrix {
    fn rows(&self) -> usize {
        self.rows.len()
    }

    fn cols(&self) -> usize {
        self.cols.len()
    }

    fn select_column(&mut self, col: usize, selected: bool) -> Result<(), ConsoleError> {
        self.cols[col].set(!selected)
    }

    fn row_active(&mut self, row: usize) -> Result<bool, ConsoleError> {
        self.rows[row].is_low()
    }
}

pub struct MatrixKeypad<L: MatrixLines> {
    name: String,
    lines: L,
    keymap: Vec<Vec<char>>,
}

impl<L: MatrixLines> MatrixKeypad<L> {
    pub fn new(lines: L, keymap: Vec<Vec<char>>) -> Self {
        Self {
            name: format!("matrix keypad {}x{}", lines.rows(), lines.cols()),
            lines,
            keymap,
        }
    }

    pub fn with_default_keymap(lines: L) -> Self {
        let keymap = DEFAULT_KEYMAP.iter().map(|row| row.to_vec()).collect();
        Self::new(lines, keymap)
    }

    fn key_at(&self, row: usize, col: usize) -> Result<char, ConsoleError> {
        self.keymap
            .get(row)
            .and_then(|keys| keys.get(col))
            .copied()
            .ok_or_else(|| ConsoleError::InputGlitch(format!("no key at scancode ({row}, {col})")))
    }

    fn scan_column(&mut self, col: usize, state: &mut DeviceState) -> Result<(), ConsoleError> {
        for row in 0..self.lines.rows() {
            if !self.lines.row_active(row)? {
                continue;
            }
            match self.key_at(row, col) {
                Ok(key) => {
                    state.keys.insert(key);
                }
                Err(glitch) => log::debug!("{}: {glitch}", self.name),
            }
        }
        Ok(())
    }
}

impl<L: MatrixLines> Device for MatrixKeypad<L> {
    fn poll(&mut self) -> Result<DeviceState, ConsoleError> {
        let mut state = DeviceState::default();
        for col in 0..self.lines.cols() {
            self.lines.select_column(col, true)?;
            let scanned = self.scan_column(col, &mut state);
            // Always release the column, even when a row read failed.
            let released = self.lines.select_column(col, false);
            scanned?;
            released?;
        }
        Ok(state)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> InputSource {
        InputSource::Keypad
    }
}
