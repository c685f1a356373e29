//! Color reduction: palette extraction, nearest-color matching and bitmap indexing.
//!
//! Each stage sits behind its own trait so the writer can be configured with a
//! different strategy for any one of them without touching the others.

use std::collections::HashMap;

use gifkit_core::{Bitmap, CapacityError, Color, IndexedBitmap, Palette, Result};

/// Builds a palette that represents a bitmap.
pub trait PaletteExtractor {
    /// Produce at most `max_size` colors for `bitmap`.
    fn extract(&mut self, bitmap: &Bitmap, max_size: usize) -> Palette;

    /// Produce one palette covering every bitmap in `bitmaps`.
    ///
    /// The default stacks bitmaps of equal width into one tall bitmap. Bitmaps
    /// that cannot be stacked are reduced one at a time, each palette merged
    /// with the running result and reduced again.
    fn extract_many(&mut self, bitmaps: &[Bitmap], max_size: usize) -> Palette {
        let Some(first) = bitmaps.first() else {
            return Palette::new();
        };
        let width = first.width();
        let height = bitmaps.iter().try_fold(0u32, |total, b| {
            if b.width() == width {
                total.checked_add(b.height())
            } else {
                None
            }
        });
        if let Some(height) = height {
            let pixels = bitmaps.iter().flat_map(|b| b.pixels()).copied().collect();
            if let Ok(stacked) = Bitmap::from_pixels(width, height, pixels) {
                return self.extract(&stacked, max_size);
            }
        }

        let mut palette = Palette::new();
        for bitmap in bitmaps {
            let mut colors = palette.colors().to_vec();
            colors.extend_from_slice(self.extract(bitmap, max_size).colors());
            let merged = Bitmap::from_pixels(colors.len() as u32, 1, colors);
            if let Ok(merged) = merged {
                palette = self.extract(&merged, max_size);
            }
        }
        palette
    }
}

/// Maps arbitrary colors to the nearest entry of a palette.
pub trait ColorMatcher {
    /// Precompute lookup state for `palette`.
    fn set_palette(&mut self, palette: &Palette);

    /// Index of the palette entry nearest to `color`. Returns 0 for an empty palette.
    fn match_color(&self, color: Color) -> usize;
}

/// Converts a whole bitmap to palette indices.
pub trait BitmapIndexer {
    /// Fill `out` with one index per pixel of `bitmap`.
    fn index(
        &mut self,
        bitmap: &Bitmap,
        matcher: &dyn ColorMatcher,
        out: &mut IndexedBitmap,
    ) -> Result<()>;
}

/// Keeps the most frequent colors.
///
/// Alpha is ignored: every color is counted as opaque. Colors with equal
/// counts are ordered by channel value so the result is deterministic.
#[derive(Debug, Default, Clone)]
pub struct FrequencyPalette {
    counts: HashMap<Color, usize>,
}

impl FrequencyPalette {
    /// Create an extractor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrequencyPalette {
    fn count(&mut self, bitmap: &Bitmap) {
        for &pixel in bitmap.pixels() {
            *self.counts.entry(pixel.opaque()).or_insert(0) += 1;
        }
    }

    fn rank(&mut self, max_size: usize) -> Palette {
        let mut ranked: Vec<(Color, usize)> = self.counts.drain().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(max_size);

        Palette::from_colors(ranked.into_iter().map(|(color, _)| color).collect())
    }
}

impl PaletteExtractor for FrequencyPalette {
    fn extract(&mut self, bitmap: &Bitmap, max_size: usize) -> Palette {
        self.counts.clear();
        self.count(bitmap);
        self.rank(max_size)
    }

    /// Counts every pixel of every bitmap, so frames of any size combine.
    fn extract_many(&mut self, bitmaps: &[Bitmap], max_size: usize) -> Palette {
        self.counts.clear();
        for bitmap in bitmaps {
            self.count(bitmap);
        }
        self.rank(max_size)
    }
}

/// Nearest color by the sum of absolute RGB channel differences.
///
/// Alpha is ignored. The first entry wins ties.
#[derive(Debug, Default, Clone)]
pub struct RgbDistanceMatcher {
    colors: Vec<Color>,
}

impl RgbDistanceMatcher {
    /// Create a matcher with an empty palette.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ColorMatcher for RgbDistanceMatcher {
    fn set_palette(&mut self, palette: &Palette) {
        self.colors.clear();
        self.colors.extend_from_slice(palette.colors());
    }

    fn match_color(&self, color: Color) -> usize {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let distance = u32::from(color.r.abs_diff(entry.r))
                + u32::from(color.g.abs_diff(entry.g))
                + u32::from(color.b.abs_diff(entry.b));
            if distance < best_distance {
                best_distance = distance;
                best = i;
                if distance == 0 {
                    break;
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Hsv {
    h: f64,
    s: f64,
    v: f64,
}

impl Hsv {
    /// Hue in `0.0..1.0` (0 for grays), saturation and value in `0.0..=1.0`.
    fn from_color(c: Color) -> Self {
        let r = f64::from(c.r) / 255.0;
        let g = f64::from(c.g) / 255.0;
        let b = f64::from(c.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        if delta == 0.0 {
            return Self { h: 0.0, s: 0.0, v: max };
        }

        let sector = if r == max {
            (g - b) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };
        let h = (sector / 6.0).rem_euclid(1.0);

        Self {
            h,
            s: delta / max,
            v: max,
        }
    }
}

/// Nearest color by weighted distance in HSV space.
///
/// Hue difference is measured around the color wheel. Default weights favor
/// hue (0.8) over saturation (0.1) and value (0.1).
#[derive(Debug, Clone)]
pub struct HsvDistanceMatcher {
    weights: [f64; 3],
    colors: Vec<Hsv>,
}

impl Default for HsvDistanceMatcher {
    fn default() -> Self {
        Self::with_weights(0.8, 0.1, 0.1)
    }
}

impl HsvDistanceMatcher {
    /// Create a matcher with the default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher with explicit hue, saturation and value weights.
    pub fn with_weights(hue: f64, saturation: f64, value: f64) -> Self {
        Self {
            weights: [hue, saturation, value],
            colors: Vec::new(),
        }
    }

    fn distance(&self, a: Hsv, b: Hsv) -> f64 {
        let dh = (a.h - b.h).abs();
        let dh = dh.min(1.0 - dh);
        let ds = a.s - b.s;
        let dv = a.v - b.v;
        self.weights[0] * dh * dh + self.weights[1] * ds * ds + self.weights[2] * dv * dv
    }
}

impl ColorMatcher for HsvDistanceMatcher {
    fn set_palette(&mut self, palette: &Palette) {
        self.colors.clear();
        self.colors
            .extend(palette.colors().iter().map(|&c| Hsv::from_color(c)));
    }

    fn match_color(&self, color: Color) -> usize {
        let target = Hsv::from_color(color);
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, &entry) in self.colors.iter().enumerate() {
            let distance = self.distance(target, entry);
            if distance < best_distance {
                best_distance = distance;
                best = i;
            }
        }
        best
    }
}

/// Matches every pixel independently.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectIndexer;

impl DirectIndexer {
    /// Create an indexer.
    pub fn new() -> Self {
        Self
    }
}

impl BitmapIndexer for DirectIndexer {
    fn index(
        &mut self,
        bitmap: &Bitmap,
        matcher: &dyn ColorMatcher,
        out: &mut IndexedBitmap,
    ) -> Result<()> {
        out.clear();
        if bitmap.is_empty() {
            return Err(CapacityError::EmptyBitmap.into());
        }

        out.set_size(bitmap.width(), bitmap.height());
        if out.pixels().len() != bitmap.pixels().len() {
            return Err(CapacityError::PixelCountMismatch {
                expected: out.pixels().len(),
                actual: bitmap.pixels().len(),
            }
            .into());
        }

        for (dst, &color) in out.pixels_mut().iter_mut().zip(bitmap.pixels()) {
            let index = matcher.match_color(color);
            *dst = u8::try_from(index)
                .map_err(|_| CapacityError::PaletteIndexOutOfRange { index })?;
        }
        Ok(())
    }
}
