//! Test inputs shared by the gifkit benchmarks.

use gifkit::{Bitmap, Color, GifWriter};

/// Deterministic index stream with values below `1 << code_size`.
///
/// `runs` controls how compressible the data is: each value repeats
/// `runs` times before the generator advances.
pub fn generate_indices(len: usize, code_size: u8, runs: usize) -> Vec<u8> {
    let mask = ((1u16 << code_size) - 1) as u8;
    let runs = runs.max(1);
    let mut state: u32 = 0x9E37_79B9;
    let mut value = 0u8;
    (0..len)
        .map(|i| {
            if i % runs == 0 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                value = (state >> 24) as u8 & mask;
            }
            value
        })
        .collect()
}

/// Gradient frame with `colors` distinct colors, shifted by `phase`.
pub fn generate_bitmap(width: u32, height: u32, colors: u32, phase: u32) -> Bitmap {
    let colors = colors.max(1);
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let band = (x + y + phase) % colors;
            let level = (band * 255 / colors) as u8;
            Color::rgb(level, 255 - level, level / 2)
        })
        .collect();
    Bitmap::from_pixels(width, height, pixels).unwrap_or_default()
}

/// Encoded animation of `frames` gradient frames.
pub fn generate_gif(width: u32, height: u32, frames: u32) -> gifkit::Result<Vec<u8>> {
    let mut writer = GifWriter::for_bitmaps(Vec::new());
    for phase in 0..frames {
        writer.write_frame(&generate_bitmap(width, height, 64, phase))?;
    }
    writer.finish()
}
