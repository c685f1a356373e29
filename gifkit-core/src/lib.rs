//! # gifkit core
//!
//! Core types shared by the gifkit codec crates.
//!
//! This crate provides the building blocks the container reader and writer are
//! assembled from:
//! - Error handling types
//! - LSB-first bit packing used by GIF's LZW code stream
//! - RGBA colors and power-of-two palettes
//! - RGBA and palette-indexed bitmaps

pub mod error;
pub mod bitstream;
pub mod color;
pub mod bitmap;

pub use error::{CapacityError, Error, FormatError, LzwError, Result};
pub use bitstream::{LsbReader, LsbWriter};
pub use color::{Color, Palette, MAX_PALETTE_SIZE};
pub use bitmap::{Bitmap, IndexedBitmap};
