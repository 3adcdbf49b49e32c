//! Linux framebuffer output for the primary screen.
//!
//! Assumes the device is configured for 32 bpp XRGB8888 at the frame's
//! resolution (the usual HDMI console mode on the target board).

use crate::display::PrimarySink;
use crate::error::ConsoleError;
use crate::session::Frame;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct FramebufferSink {
    path: PathBuf,
    file: File,
    scratch: Vec<u8>,
}

impl FramebufferSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| ConsoleError::unavailable(path.display().to_string(), e))?;
        log::info!("primary display on {}", path.display());
        Ok(Self {
            path,
            file,
            scratch: Vec::new(),
        })
    }
}

impl PrimarySink for FramebufferSink {
    fn present(&mut self, frame: &Frame) -> Result<(), ConsoleError> {
        self.scratch.clear();
        self.scratch.reserve(frame.pixels().len() * 4);
        for &pixel in frame.pixels() {
            self.scratch.extend_from_slice(&pixel.to_le_bytes());
        }
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(&self.scratch))
            .map_err(|e| ConsoleError::io(&self.path, e))
    }
}
