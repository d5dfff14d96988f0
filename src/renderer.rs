use tracing::warn;

use crate::{config::Config, error::CoreError, memory::SCREEN_SIZE};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 192;
const BITMAP_SIZE: usize = 6144;
const ATTRIBUTE_SIZE: usize = 768;

/// RGBA palette. 0-7 are the normal colours, 8-15 their BRIGHT variants.
///
///  0 Black     4 Green
///  1 Blue      5 Cyan
///  2 Red       6 Yellow
///  3 Magenta   7 White
pub const PALETTE: [[u8; 4]; 16] = [
    [0, 0, 0, 255],
    [0, 0, 192, 255],
    [192, 0, 0, 255],
    [192, 0, 192, 255],
    [0, 192, 0, 255],
    [0, 192, 192, 255],
    [192, 192, 0, 255],
    [192, 192, 192, 255],
    [0, 0, 0, 255],
    [0, 0, 255, 255],
    [255, 0, 0, 255],
    [255, 0, 255, 255],
    [0, 255, 0, 255],
    [0, 255, 255, 255],
    [255, 255, 0, 255],
    [255, 255, 255, 255],
];

/// Turns the 6912 bytes of screen memory into an RGBA image with a border.
#[derive(Debug, Clone)]
pub struct Renderer {
    x_border: usize,
    y_border: usize,
    pub screen_buffer: Vec<u8>,
}

impl Renderer {
    pub fn new(config: &Config) -> Self {
        let mut renderer = Self {
            x_border: config.x_border,
            y_border: config.y_border,
            screen_buffer: Vec::new(),
        };
        renderer.screen_buffer = vec![255; renderer.width() * renderer.height() * 4];
        renderer
    }

    pub fn width(&self) -> usize {
        SCREEN_WIDTH + 2 * self.x_border
    }

    pub fn height(&self) -> usize {
        SCREEN_HEIGHT + 2 * self.y_border
    }

    /// Redraws `screen_buffer`. A screen of the wrong size leaves the
    /// previous frame in place.
    pub fn draw(&mut self, screen: &[u8], border: u8, flash_inverted: bool) -> Result<(), CoreError> {
        let linear = deinterlace(screen)?;

        let border_color = PALETTE[ink_index(border & 0x07)];
        for pixel in self.screen_buffer.chunks_exact_mut(4) {
            pixel.copy_from_slice(&border_color);
        }

        let width = self.width();
        let mut dst = 4 * (self.y_border * width + self.x_border);
        let line_skip = 4 * 2 * self.x_border;

        let (bitmap, attributes) = linear.split_at(BITMAP_SIZE);
        let mut rows = bitmap.chunks_exact(32);
        for char_row in 0..24 {
            let attrs = &attributes[32 * char_row..32 * (char_row + 1)];
            for _ in 0..8 {
                let Some(line) = rows.next() else { break };
                for (&byte, &attr) in line.iter().zip(attrs) {
                    let (ink, paper) = cell_colors(attr, flash_inverted);
                    for bit in 0..8 {
                        let color = if byte & (0x80 >> bit) != 0 { ink } else { paper };
                        self.screen_buffer[dst..dst + 4].copy_from_slice(color);
                        dst += 4;
                    }
                }
                dst += line_skip;
            }
        }

        Ok(())
    }
}

/// Ink and paper colours of a character cell, swapped while a FLASH cell is
/// in its inverted phase.
fn cell_colors(attr: u8, flash_inverted: bool) -> (&'static [u8; 4], &'static [u8; 4]) {
    let ink = &PALETTE[ink_index(attr)];
    let paper = &PALETTE[paper_index(attr)];
    if flash_inverted && attr & 0x80 != 0 {
        (paper, ink)
    } else {
        (ink, paper)
    }
}

fn bright(attr: u8) -> usize {
    if attr & 0x40 != 0 {
        0x08
    } else {
        0x00
    }
}

pub fn ink_index(attr: u8) -> usize {
    (attr & 0x07) as usize | bright(attr)
}

pub fn paper_index(attr: u8) -> usize {
    ((attr & 0x38) >> 3) as usize | bright(attr)
}

/// Display line that bitmap row `row` (in memory order) ends up on.
///
/// Bitmap memory is split in thirds; inside each third the address bits for
/// pixel line and character row are swapped.
pub fn display_row(row: usize) -> usize {
    ((row & 0x38) >> 3) | ((row & 0x07) << 3) | (row & 0xC0)
}

/// Reorders the bitmap into top-to-bottom scanlines, attributes unchanged.
pub fn deinterlace(screen: &[u8]) -> Result<Vec<u8>, CoreError> {
    if screen.len() != SCREEN_SIZE {
        warn!(
            "Unexpected screen length: expected {}, got {}",
            SCREEN_SIZE,
            screen.len()
        );
        return Err(CoreError::MalformedScreenBuffer {
            expected: SCREEN_SIZE,
            actual: screen.len(),
        });
    }

    let mut linear = vec![0; SCREEN_SIZE];
    for (row, line) in screen[..BITMAP_SIZE].chunks_exact(32).enumerate() {
        let dst = display_row(row) * 32;
        linear[dst..dst + 32].copy_from_slice(line);
    }
    linear[BITMAP_SIZE..].copy_from_slice(&screen[BITMAP_SIZE..BITMAP_SIZE + ATTRIBUTE_SIZE]);

    Ok(linear)
}
