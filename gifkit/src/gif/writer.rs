//! GIF container writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use byteorder::WriteBytesExt;
use gifkit_core::{
    Bitmap, CapacityError, Error, IndexedBitmap, Palette, Result, MAX_PALETTE_SIZE,
};
use tracing::{debug, warn};

use super::{
    write_color_table, write_loop_extension, GraphicControlExtension, ImageDescriptor,
    LogicalScreenDescriptor, TableMode, GIF89A_HEADER, TRAILER,
};
use crate::block::SubBlockWriter;
use crate::lzw::{min_code_size, LzwEncoder};
use crate::quantize::{
    BitmapIndexer, ColorMatcher, DirectIndexer, FrequencyPalette, PaletteExtractor,
    RgbDistanceMatcher,
};

/// Largest width or height the 16-bit descriptor fields hold.
const MAX_DIMENSION: u32 = u16::MAX as u32;

/// GIF writer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// How color tables are built.
    pub table_mode: TableMode,
    /// Background color index stored in the screen descriptor.
    pub background_color_index: u8,
    /// Delay written in a graphic control extension before every image.
    /// No extension is written when unset.
    pub frame_delay: Option<Duration>,
    /// NETSCAPE2.0 loop count (0 = forever). No extension is written when unset.
    pub loop_count: Option<u16>,
    /// Maximum palette size (2-256).
    pub max_colors: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            table_mode: TableMode::GlobalFromFirst,
            background_color_index: 0,
            frame_delay: None,
            loop_count: None,
            max_colors: MAX_PALETTE_SIZE,
        }
    }
}

impl WriterConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set table mode.
    pub fn table_mode(mut self, mode: TableMode) -> Self {
        self.table_mode = mode;
        self
    }

    /// Set background color index.
    pub fn background_color_index(mut self, index: u8) -> Self {
        self.background_color_index = index;
        self
    }

    /// Set the per-frame delay.
    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    /// Set loop count.
    pub fn loop_count(mut self, count: u16) -> Self {
        self.loop_count = Some(count);
        self
    }

    /// Set maximum colors.
    pub fn max_colors(mut self, colors: usize) -> Self {
        self.max_colors = colors.clamp(2, MAX_PALETTE_SIZE);
        self
    }
}

type ConvertFn<T> = Box<dyn FnMut(&T, &mut Bitmap) -> Result<()>>;

/// Writes frames of any source type `T` as a GIF.
///
/// Each frame is converted to an RGBA [`Bitmap`] by the conversion function,
/// reduced to a palette and written as one full-screen image. The header is
/// written when the first frame arrives, since the screen size is taken from
/// it. Call [`GifWriter::finish`] to write the trailer; a writer dropped
/// without finishing writes the trailer on a best-effort basis.
///
/// ```
/// use gifkit::{Bitmap, Color, GifWriter};
///
/// let mut writer = GifWriter::for_bitmaps(Vec::new());
/// writer.write_frame(&Bitmap::filled(2, 2, Color::rgb(255, 0, 0)))?;
/// let bytes = writer.finish()?;
/// assert_eq!(&bytes[..6], b"GIF89a");
/// # Ok::<(), gifkit::Error>(())
/// ```
pub struct GifWriter<T, W: Write> {
    config: WriterConfig,
    convert: ConvertFn<T>,
    extractor: Box<dyn PaletteExtractor>,
    matcher: Box<dyn ColorMatcher>,
    indexer: Box<dyn BitmapIndexer>,
    output: Option<W>,
    /// Table mode locked in by the first frame.
    mode: Option<TableMode>,
    screen: Option<(u16, u16)>,
    header_written: bool,
    global_palette: Option<Palette>,
    pixels: Bitmap,
    indexed: IndexedBitmap,
    lzw: LzwEncoder,
    block_buffer: Vec<u8>,
    pending: Vec<Bitmap>,
    frames_written: usize,
}

impl<T> GifWriter<T, BufWriter<File>> {
    /// Create `path` and write frames converted by `convert` into it.
    pub fn create<P, F>(path: P, convert: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(&T, &mut Bitmap) -> Result<()> + 'static,
    {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Created GIF output");
        Ok(Self::new(BufWriter::new(file), convert))
    }
}

impl<W: Write> GifWriter<Bitmap, W> {
    /// A writer whose frames are already RGBA bitmaps.
    pub fn for_bitmaps(output: W) -> Self {
        Self::new(output, |src: &Bitmap, dst: &mut Bitmap| {
            dst.clone_from(src);
            Ok(())
        })
    }
}

impl<T, W: Write> GifWriter<T, W> {
    /// Write into `output`, converting each frame with `convert`.
    pub fn new<F>(output: W, convert: F) -> Self
    where
        F: FnMut(&T, &mut Bitmap) -> Result<()> + 'static,
    {
        Self {
            config: WriterConfig::default(),
            convert: Box::new(convert),
            extractor: Box::new(FrequencyPalette::new()),
            matcher: Box::new(RgbDistanceMatcher::new()),
            indexer: Box::new(DirectIndexer::new()),
            output: Some(output),
            mode: None,
            screen: None,
            header_written: false,
            global_palette: None,
            pixels: Bitmap::default(),
            indexed: IndexedBitmap::default(),
            lzw: LzwEncoder::new(),
            block_buffer: Vec::new(),
            pending: Vec::new(),
            frames_written: 0,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Set how color tables are built. Ignored once the first frame is written.
    pub fn set_table_mode(&mut self, mode: TableMode) -> &mut Self {
        self.config.table_mode = mode;
        self
    }

    /// Set the background color index. Ignored once the header is written.
    pub fn set_background_color_index(&mut self, index: u8) -> &mut Self {
        self.config.background_color_index = index;
        self
    }

    /// Replace the palette extraction strategy.
    pub fn set_palette_extractor(
        &mut self,
        extractor: impl PaletteExtractor + 'static,
    ) -> &mut Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the color matching strategy.
    pub fn set_color_matcher(&mut self, matcher: impl ColorMatcher + 'static) -> &mut Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Replace the bitmap indexing strategy.
    pub fn set_bitmap_indexer(&mut self, indexer: impl BitmapIndexer + 'static) -> &mut Self {
        self.indexer = Box::new(indexer);
        self
    }

    /// The global color table, once it has been built.
    pub fn global_palette(&self) -> Option<&Palette> {
        self.global_palette.as_ref()
    }

    /// Number of image blocks written so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Convert and append one frame.
    pub fn write_frame(&mut self, item: &T) -> Result<()> {
        if self.output.is_none() {
            return Err(Error::invalid_param("writer is already finished"));
        }

        (self.convert)(item, &mut self.pixels)?;
        if self.pixels.is_empty() {
            return Err(CapacityError::EmptyBitmap.into());
        }
        self.check_dimensions()?;

        let mode = *self.mode.get_or_insert(self.config.table_mode);
        let pixels = std::mem::take(&mut self.pixels);
        let result = self.write_converted(mode, &pixels);
        self.pixels = pixels;
        result
    }

    fn write_converted(&mut self, mode: TableMode, pixels: &Bitmap) -> Result<()> {
        match mode {
            TableMode::GlobalFromAll => {
                self.pending.push(pixels.clone());
                debug!(pending = self.pending.len(), "Buffered frame for global palette");
                Ok(())
            }
            TableMode::GlobalFromFirst => {
                if !self.header_written {
                    let palette = self.extract_palette(std::slice::from_ref(pixels));
                    self.global_palette = Some(palette);
                    self.write_header()?;
                }
                self.write_image(pixels, None)
            }
            TableMode::Local => {
                if !self.header_written {
                    self.write_header()?;
                }
                let palette = self.extract_palette(std::slice::from_ref(pixels));
                self.write_image(pixels, Some(&palette))
            }
        }
    }

    /// Write any buffered frames and the trailer, returning the output.
    pub fn finish(mut self) -> Result<W> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            let palette = self.extract_palette(&pending);
            self.global_palette = Some(palette);
            self.write_header()?;
            for frame in &pending {
                self.write_image(frame, None)?;
            }
        }

        if !self.header_written {
            return Err(CapacityError::NoFrames.into());
        }

        let mut output = self
            .output
            .take()
            .ok_or_else(|| Error::invalid_param("writer is already finished"))?;
        output.write_u8(TRAILER)?;
        output.flush()?;
        debug!(frames = self.frames_written, "Finished GIF");
        Ok(output)
    }

    fn check_dimensions(&mut self) -> Result<()> {
        let (width, height) = (self.pixels.width(), self.pixels.height());
        match self.screen {
            None => {
                if width > MAX_DIMENSION || height > MAX_DIMENSION {
                    return Err(CapacityError::TooLarge { width, height }.into());
                }
                self.screen = Some((width as u16, height as u16));
            }
            Some((screen_width, screen_height)) => {
                if width != u32::from(screen_width) || height != u32::from(screen_height) {
                    return Err(CapacityError::DimensionMismatch {
                        width,
                        height,
                        screen_width: u32::from(screen_width),
                        screen_height: u32::from(screen_height),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn extract_palette(&mut self, frames: &[Bitmap]) -> Palette {
        let max_colors = self.config.max_colors.clamp(2, MAX_PALETTE_SIZE);
        let mut palette = match frames {
            [single] => self.extractor.extract(single, max_colors),
            _ => self.extractor.extract_many(frames, max_colors),
        };
        palette.clip(max_colors);
        debug!(colors = palette.len(), frames = frames.len(), "Extracted palette");
        palette
    }

    fn write_header(&mut self) -> Result<()> {
        let (width, height) = self.screen.ok_or(CapacityError::NoFrames)?;
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| Error::invalid_param("writer is already finished"))?;

        let global = self.global_palette.as_ref().filter(|p| !p.is_empty());
        let screen = LogicalScreenDescriptor {
            width,
            height,
            has_global_color_table: global.is_some(),
            global_color_table_size: global.map_or(0, Palette::size_field),
            background_color_index: self.config.background_color_index,
            ..Default::default()
        };

        output.write_all(GIF89A_HEADER)?;
        screen.write_to(output)?;
        if let Some(palette) = global {
            write_color_table(output, palette, palette.size_field())?;
        }
        if let Some(count) = self.config.loop_count {
            write_loop_extension(output, count)?;
        }

        self.header_written = true;
        debug!(
            width,
            height,
            global_colors = global.map_or(0, Palette::len),
            "Wrote header"
        );
        Ok(())
    }

    /// Index `bitmap` against `local` or the global table and write one image block.
    fn write_image(&mut self, bitmap: &Bitmap, local: Option<&Palette>) -> Result<()> {
        let empty = Palette::new();
        let palette = local.or(self.global_palette.as_ref()).unwrap_or(&empty);

        self.matcher.set_palette(palette);
        self.indexer
            .index(bitmap, self.matcher.as_ref(), &mut self.indexed)?;

        let pixel_count = bitmap.width() as usize * bitmap.height() as usize;
        if self.indexed.pixels().len() != pixel_count {
            return Err(CapacityError::PixelCountMismatch {
                expected: pixel_count,
                actual: self.indexed.pixels().len(),
            }
            .into());
        }

        let output = self
            .output
            .as_mut()
            .ok_or_else(|| Error::invalid_param("writer is already finished"))?;

        if let Some(delay) = self.config.frame_delay {
            GraphicControlExtension::with_delay(delay).write_to(output)?;
        }

        let descriptor = ImageDescriptor {
            width: bitmap.width() as u16,
            height: bitmap.height() as u16,
            has_local_color_table: local.is_some(),
            local_color_table_size: local.map_or(0, Palette::size_field),
            ..Default::default()
        };
        descriptor.write_to(output)?;
        if let Some(palette) = local {
            write_color_table(output, palette, palette.size_field())?;
        }

        let code_size = min_code_size(palette.len());
        output.write_u8(code_size)?;

        let mut blocks =
            SubBlockWriter::with_buffer(&mut *output, std::mem::take(&mut self.block_buffer));
        self.lzw
            .encode(code_size, self.indexed.pixels(), &mut blocks)?;
        let (_, buffer) = blocks.terminate()?;
        self.block_buffer = buffer;

        self.frames_written += 1;
        debug!(
            frame = self.frames_written,
            colors = palette.len(),
            code_size,
            "Wrote image"
        );
        Ok(())
    }
}

impl<T, W: Write> Drop for GifWriter<T, W> {
    fn drop(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if !self.pending.is_empty() {
            warn!(
                frames = self.pending.len(),
                "GIF writer dropped before finish, buffered frames discarded"
            );
        }
        if self.header_written {
            let result = output.write_u8(TRAILER).and_then(|_| output.flush());
            warn!(ok = result.is_ok(), "GIF writer dropped before finish, wrote trailer");
        }
    }
}

impl<T, W: Write> std::fmt::Debug for GifWriter<T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifWriter")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("screen", &self.screen)
            .field("header_written", &self.header_written)
            .field("frames_written", &self.frames_written)
            .field("pending", &self.pending.len())
            .finish()
    }
}
