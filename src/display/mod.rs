//! CD+G Display State
//!
//! Holds the persistent raster state every drawing command mutates: the
//! 300x216 indexed-color framebuffer, the 16-entry palette, and the fine
//! scroll offsets. [`CdgDisplay::apply`] interprets one decoded command;
//! [`CdgDisplay::render_safe_area`] samples the visible 288x192 region
//! through the palette into an RGB frame.
//!
//! The framebuffer stores 4-bit palette indices, one per byte, so palette
//! loads retroactively recolor everything already drawn; pixels resolve to
//! RGB only at sample time.

use crate::subcode::{CdgCommand, HScroll, ScrollCmd, TILE_HEIGHT, TILE_WIDTH, TileBlock, VScroll};
use image::{Rgb, RgbImage};
use log::debug;

/// Framebuffer width in pixels.
pub const WIDTH: usize = 300;

/// Framebuffer height in pixels.
pub const HEIGHT: usize = 216;

/// Width of the displayed safe area.
pub const SAFE_WIDTH: usize = 288;

/// Height of the displayed safe area.
pub const SAFE_HEIGHT: usize = 192;

/// Width of the left/right border strips (one tile).
pub const BORDER_COLUMNS: usize = 6;

/// Height of the top/bottom border strips (one tile).
pub const BORDER_ROWS: usize = 12;

/// The CD+G raster state machine.
///
/// One instance lives inside a [`crate::CdgPlayer`] and survives for the
/// whole stream; commands accumulate into it packet by packet.
#[derive(Debug, Clone)]
pub struct CdgDisplay {
    pixels: Vec<u8>,
    palette: [Rgb<u8>; 16],
    h_offset: u8,
    v_offset: u8,
    transparent_color: Option<u8>,
    last_was_memory_preset: bool,
    dirty: bool,
}

impl CdgDisplay {
    /// Create a display with a black palette and an all-zero framebuffer.
    pub fn new() -> Self {
        CdgDisplay {
            pixels: vec![0; WIDTH * HEIGHT],
            palette: [Rgb([0, 0, 0]); 16],
            h_offset: 0,
            v_offset: 0,
            transparent_color: None,
            last_was_memory_preset: false,
            dirty: false,
        }
    }

    /// Reset to the initial state (black palette, cleared framebuffer).
    pub fn reset(&mut self) {
        self.pixels.fill(0);
        self.palette = [Rgb([0, 0, 0]); 16];
        self.h_offset = 0;
        self.v_offset = 0;
        self.transparent_color = None;
        self.last_was_memory_preset = false;
        self.dirty = false;
    }

    /// Apply one decoded command to the raster state.
    ///
    /// Reserved instructions and Define Transparent leave the raster
    /// untouched; every CD+G command still refreshes the memory-preset
    /// repeat tracking.
    pub fn apply(&mut self, cmd: &CdgCommand) {
        match cmd {
            CdgCommand::MemoryPreset { color, repeat } => self.memory_preset(*color, *repeat),
            CdgCommand::BorderPreset { color } => self.border_preset(*color),
            CdgCommand::TileNormal(tile) => self.tile_block(tile, false),
            CdgCommand::TileXor(tile) => self.tile_block(tile, true),
            CdgCommand::ScrollPreset(scroll) => self.scroll(scroll, false),
            CdgCommand::ScrollCopy(scroll) => self.scroll(scroll, true),
            CdgCommand::LoadColorsLow(colors) => self.load_colors(colors, 0),
            CdgCommand::LoadColorsHigh(colors) => self.load_colors(colors, 8),
            CdgCommand::DefineTransparent { color } => {
                // Reserved in the format and absent from commercial discs.
                debug!("define transparent color {} received, ignored", color);
                self.transparent_color = Some(*color);
            }
            CdgCommand::Reserved { instruction } => {
                debug!("reserved CDG instruction {} ignored", instruction);
            }
        }
        self.last_was_memory_preset = matches!(cmd, CdgCommand::MemoryPreset { .. });
    }

    /// Whether a command mutated pixels or palette since the last call,
    /// clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Current fine horizontal scroll offset, `0..=5`.
    pub fn h_offset(&self) -> u8 {
        self.h_offset
    }

    /// Current fine vertical scroll offset, `0..=11`.
    pub fn v_offset(&self) -> u8 {
        self.v_offset
    }

    /// The active 16-entry palette.
    pub fn palette(&self) -> &[Rgb<u8>; 16] {
        &self.palette
    }

    /// Palette index requested by the last Define Transparent command, if
    /// any was seen. Diagnostic only; transparency is never honored.
    pub fn transparent_color(&self) -> Option<u8> {
        self.transparent_color
    }

    /// Palette index of the framebuffer pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * WIDTH + x]
    }

    /// Sample the visible safe area into a 288x192 RGB frame.
    ///
    /// Rows `[12 + v_offset, 12 + v_offset + 192)` are copied, each
    /// starting at column `6 + h_offset`, and resolved through the current
    /// palette.
    pub fn render_safe_area(&self) -> RgbImage {
        let mut image = RgbImage::new(SAFE_WIDTH as u32, SAFE_HEIGHT as u32);
        for (x, y, px) in image.enumerate_pixels_mut() {
            let sx = BORDER_COLUMNS + self.h_offset as usize + x as usize;
            let sy = BORDER_ROWS + self.v_offset as usize + y as usize;
            *px = self.palette[(self.pixels[sy * WIDTH + sx] & 0x0F) as usize];
        }
        image
    }

    fn memory_preset(&mut self, color: u8, repeat: u8) {
        // The stream repeats Memory Preset up to 16 times for error
        // correction; only the first copy of a run may take effect.
        if self.last_was_memory_preset && repeat != 0 {
            return;
        }
        self.pixels.fill(color);
        self.dirty = true;
    }

    fn border_preset(&mut self, color: u8) {
        for (y, row) in self.pixels.chunks_exact_mut(WIDTH).enumerate() {
            if y < BORDER_ROWS || y >= HEIGHT - BORDER_ROWS {
                row.fill(color);
            } else {
                row[..BORDER_COLUMNS].fill(color);
                row[WIDTH - BORDER_COLUMNS..].fill(color);
            }
        }
        self.dirty = true;
    }

    fn tile_block(&mut self, tile: &TileBlock, xor: bool) {
        let top = tile.row as usize * TILE_HEIGHT;
        let left = tile.column as usize * TILE_WIDTH;
        if top + TILE_HEIGHT > HEIGHT || left + TILE_WIDTH > WIDTH {
            debug!("tile at row {} column {} escapes the framebuffer, dropped", tile.row, tile.column);
            return;
        }
        for y in 0..TILE_HEIGHT {
            let row = &mut self.pixels[(top + y) * WIDTH + left..][..TILE_WIDTH];
            for (x, px) in row.iter_mut().enumerate() {
                let color = tile.color_at(x, y);
                if xor {
                    *px ^= color;
                } else {
                    *px = color;
                }
            }
        }
        self.dirty = true;
    }

    /// Coarse-shift the framebuffer one tile in the commanded directions.
    ///
    /// A copy scroll wraps the displaced strip to the opposite edge; a
    /// preset scroll fills the vacated strip with the command color. The
    /// fine offsets are taken over afterwards either way.
    fn scroll(&mut self, cmd: &ScrollCmd, copy: bool) {
        match cmd.h_cmd {
            HScroll::Right => {
                for row in self.pixels.chunks_exact_mut(WIDTH) {
                    row.rotate_right(BORDER_COLUMNS);
                    if !copy {
                        row[..BORDER_COLUMNS].fill(cmd.color);
                    }
                }
            }
            HScroll::Left => {
                for row in self.pixels.chunks_exact_mut(WIDTH) {
                    row.rotate_left(BORDER_COLUMNS);
                    if !copy {
                        row[WIDTH - BORDER_COLUMNS..].fill(cmd.color);
                    }
                }
            }
            HScroll::None => {}
        }
        match cmd.v_cmd {
            VScroll::Down => {
                self.pixels.rotate_right(BORDER_ROWS * WIDTH);
                if !copy {
                    self.pixels[..BORDER_ROWS * WIDTH].fill(cmd.color);
                }
            }
            VScroll::Up => {
                self.pixels.rotate_left(BORDER_ROWS * WIDTH);
                if !copy {
                    let tail = self.pixels.len() - BORDER_ROWS * WIDTH;
                    self.pixels[tail..].fill(cmd.color);
                }
            }
            VScroll::None => {}
        }
        self.h_offset = cmd.h_offset.min(BORDER_COLUMNS as u8 - 1);
        self.v_offset = cmd.v_offset.min(BORDER_ROWS as u8 - 1);
        self.dirty = true;
    }

    fn load_colors(&mut self, colors: &[Rgb<u8>; 8], base: usize) {
        for (entry, color) in self.palette[base..base + 8].iter_mut().zip(colors) {
            if entry != color {
                *entry = *color;
                self.dirty = true;
            }
        }
    }
}

impl Default for CdgDisplay {
    fn default() -> Self {
        Self::new()
    }
}
