/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The monochrome display buffer.
//!
//! Sprites are blitted onto the buffer by XOR: a set sprite bit toggles the
//! pixel under it, and toggling a pixel off reports a collision.  The sprite
//! anchor wraps around the screen edges, but the drawing cursor clips; this
//! distinction matters for games that park sprites near the border.

use std::default::Default;

/// The width of the display, in pixels.
pub const WIDTH: usize = 64;
/// The height of the display, in pixels.
pub const HEIGHT: usize = 32;

/// The height of a hex glyph sprite, in bytes.
pub const FONT_HEIGHT: usize = 5;

/// The built-in hex glyph sprites, one per digit `0`-`F`.
pub const FONT_SPRITES: [[u8; FONT_HEIGHT]; 16] = [
    [0xF0, 0x90, 0x90, 0x90, 0xF0],
    [0x20, 0x60, 0x20, 0x20, 0x70],
    [0xF0, 0x10, 0xF0, 0x80, 0xF0],
    [0xF0, 0x10, 0xF0, 0x10, 0xF0],
    [0x90, 0x90, 0xF0, 0x10, 0x10],
    [0xF0, 0x80, 0xF0, 0x10, 0xF0],
    [0xF0, 0x80, 0xF0, 0x90, 0xF0],
    [0xF0, 0x10, 0x20, 0x40, 0x40],
    [0xF0, 0x90, 0xF0, 0x90, 0xF0],
    [0xF0, 0x90, 0xF0, 0x10, 0xF0],
    [0xF0, 0x90, 0xF0, 0x90, 0x90],
    [0xE0, 0x90, 0xE0, 0x90, 0xE0],
    [0xF0, 0x80, 0x80, 0x80, 0xF0],
    [0xE0, 0x90, 0x90, 0x90, 0xE0],
    [0xF0, 0x80, 0xF0, 0x80, 0xF0],
    [0xF0, 0x80, 0xF0, 0x80, 0x80],
];

/// The display buffer.
///
/// Pixel data is stored row-major: `data()[y][x]` is the pixel at column `x`
/// of row `y`.  The redraw flag is set by every mutation and cleared only by
/// the host, once it has consumed a frame.
pub struct Buffer {
    /// The pixel data (`true` means "on").
    data: [[bool; WIDTH]; HEIGHT],
    /// Whether the buffer has changed since the host last consumed it.
    redraw: bool,
}

impl Buffer {
    /// Returns a new display buffer with all pixels clear.
    pub fn new() -> Self {
        Buffer {
            data: [[false; WIDTH]; HEIGHT],
            redraw: true,
        }
    }

    /// Clears the display.
    pub fn clear(&mut self) {
        for row in self.data.iter_mut() {
            for pixel in row.iter_mut() {
                *pixel = false;
            }
        }
        self.redraw = true;
    }

    /// Returns a reference to the underlying pixel data.
    pub fn data(&self) -> &[[bool; WIDTH]; HEIGHT] {
        &self.data
    }

    /// Draws the given sprite with its top-left corner at `(x, y)`.
    ///
    /// The anchor is taken modulo the screen dimensions; rows past the bottom
    /// edge and bits past the right edge are clipped, not wrapped.  Returns
    /// whether any pixel was toggled from on to off.
    pub fn draw_sprite(&mut self, sprite: &[u8], x: usize, y: usize) -> bool {
        let mut collision = false;

        for (row, &bits) in sprite.iter().enumerate() {
            let py = y % HEIGHT + row;
            if py > HEIGHT - 1 {
                break;
            }
            for bit in 0..8 {
                let px = x % WIDTH + bit;
                if px > WIDTH - 1 {
                    break;
                }
                if bits & (0x80 >> bit) != 0 {
                    if self.data[py][px] {
                        collision = true;
                    }
                    self.data[py][px] ^= true;
                }
            }
        }

        // Set unconditionally, even for an all-zero sprite.
        self.redraw = true;
        collision
    }

    /// Returns whether the buffer has changed since the redraw flag was last
    /// cleared.
    pub fn redraw_needed(&self) -> bool {
        self.redraw
    }

    /// Marks the buffer as changed.
    pub fn force_redraw(&mut self) {
        self.redraw = true;
    }

    /// Clears the redraw flag; to be called by the host after it has
    /// consumed a frame.
    pub fn clear_redraw(&mut self) {
        self.redraw = false;
    }

    /// Returns an owned copy of the pixel grid.
    pub fn snapshot(&self) -> [[bool; WIDTH]; HEIGHT] {
        self.data
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}
