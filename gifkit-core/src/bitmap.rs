//! RGBA and palette-indexed pixel grids.

use crate::color::Color;
use crate::error::{CapacityError, Result};

/// A row-major grid of RGBA colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Bitmap {
    /// Create a bitmap filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let mut bitmap = Self::default();
        bitmap.set_size(width, height);
        bitmap
    }

    /// Create a bitmap filled with a single color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; pixel_count(width, height)],
        }
    }

    /// Wrap existing pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Result<Self> {
        check_count(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from packed `RGBA` bytes.
    pub fn from_rgba(width: u32, height: u32, data: &[u8]) -> Result<Self> {
        if data.len() % 4 != 0 {
            return Err(CapacityError::PixelCountMismatch {
                expected: pixel_count(width, height) * 4,
                actual: data.len(),
            }
            .into());
        }
        let pixels = data
            .chunks_exact(4)
            .map(|p| Color::new(p[0], p[1], p[2], p[3]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width < 1 || self.height < 1
    }

    /// Resize the grid. Pixel data is cleared to transparent black when the size changes.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(pixel_count(width, height), Color::TRANSPARENT);
    }

    /// Pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Set the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index] = color;
    }

    /// Row-major pixel data.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Mutable row-major pixel data.
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Packed `RGBA` bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| c.to_array()).collect()
    }
}

/// A row-major grid of palette indices, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexedBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl IndexedBitmap {
    /// Create an all-zero indexed bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        let mut bitmap = Self::default();
        bitmap.set_size(width, height);
        bitmap
    }

    /// Wrap existing index data.
    pub fn from_indices(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_count(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width < 1 || self.height < 1
    }

    /// Drop all data and return to the empty state.
    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels.clear();
    }

    /// Resize the grid. Index data is zeroed when the size changes.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(pixel_count(width, height), 0);
    }

    /// Row-major index data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable row-major index data.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn check_count(width: u32, height: u32, actual: usize) -> Result<()> {
    let expected = pixel_count(width, height);
    if expected != actual {
        return Err(CapacityError::PixelCountMismatch { expected, actual }.into());
    }
    Ok(())
}
