//! # gifkit
//!
//! A GIF87a/89a codec: a reader that composites every image block onto a
//! persistent canvas and hands full frames to a [`FrameSink`], and a writer
//! that reduces RGBA frames to a palette and emits LZW-compressed image blocks.
//!
//! ## Example
//!
//! ```
//! use gifkit::{decode_frames, Bitmap, Color, GifWriter};
//!
//! let mut writer = GifWriter::for_bitmaps(Vec::new());
//! writer.write_frame(&Bitmap::filled(4, 4, Color::rgb(0, 128, 255)))?;
//! let bytes = writer.finish()?;
//!
//! let frames = decode_frames(&bytes)?;
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].bitmap.pixel(3, 3), Some(Color::rgb(0, 128, 255)));
//! # Ok::<(), gifkit::Error>(())
//! ```
//!
//! Color reduction is pluggable: see [`PaletteExtractor`], [`ColorMatcher`]
//! and [`BitmapIndexer`].

#![warn(missing_docs)]

pub mod block;
pub mod gif;
pub mod lzw;
pub mod quantize;
pub mod sink;

pub use gif::{
    decode, decode_frames, decode_with_limit, DisposalMethod, GifInfo, GifReader, GifWriter,
    GraphicControlExtension, TableMode, Version, WriterConfig, DEFAULT_PIXEL_LIMIT,
};
pub use quantize::{
    BitmapIndexer, ColorMatcher, DirectIndexer, FrequencyPalette, HsvDistanceMatcher,
    PaletteExtractor, RgbDistanceMatcher,
};
pub use sink::{Frame, FrameList, FrameSink};

pub use gifkit_core::{
    Bitmap, CapacityError, Color, Error, FormatError, IndexedBitmap, LzwError, Palette, Result,
};
