//! GIF container reader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use gifkit_core::{Bitmap, CapacityError, Color, Error, FormatError, Palette, Result};
use tracing::{debug, error, warn};

use super::{
    parse_color_table, GifInfo, GraphicControlExtension, ImageDescriptor, LogicalScreenDescriptor,
    Version, APPLICATION_BLOCK_SIZE, APPLICATION_LABEL, COMMENT_LABEL, EXTENSION_INTRODUCER,
    GRAPHIC_CONTROL_LABEL, GRAPHIC_CONTROL_SIZE, IMAGE_SEPARATOR, INTERLACE_PASSES,
    NETSCAPE_APPLICATION, PLAIN_TEXT_LABEL, SIGNATURE, TRAILER,
};
use crate::block::SubBlocks;
use crate::lzw::LzwDecoder;
use crate::sink::{Frame, FrameSink};

/// Reads a GIF file from disk and feeds its frames to a sink.
///
/// ```no_run
/// use gifkit::{Frame, GifReader};
///
/// let mut frames: Vec<Frame> = Vec::new();
/// if GifReader::new("animation.gif").read(&mut frames) {
///     println!("{} frames", frames.len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GifReader {
    path: PathBuf,
    pixel_limit: u64,
}

/// Largest logical screen or image area, in pixels, accepted by default.
///
/// A 65535x65535 screen would need 16 GiB of canvas, so anything past this
/// is rejected with [`CapacityError::TooLarge`] before allocating.
pub const DEFAULT_PIXEL_LIMIT: u64 = 1 << 26;

impl GifReader {
    /// Create a reader for `path`. Nothing is opened until a read.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pixel_limit: DEFAULT_PIXEL_LIMIT,
        }
    }

    /// Accept screens and images of up to `pixels` pixels.
    pub fn with_pixel_limit(mut self, pixels: u64) -> Self {
        self.pixel_limit = pixels;
        self
    }

    /// Path this reader loads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the whole file into `sink`, returning whether it succeeded.
    ///
    /// Failures are logged. Frames delivered before a failure stay with the
    /// sink.
    pub fn read<S: FrameSink>(&self, sink: S) -> bool {
        match self.try_read(sink) {
            Ok(_) => true,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read GIF");
                false
            }
        }
    }

    /// Decode the whole file into `sink`, returning the file summary.
    pub fn try_read<S: FrameSink>(&self, sink: S) -> Result<GifInfo> {
        let data = std::fs::read(&self.path)?;
        decode_with_limit(&data, sink, self.pixel_limit)
    }
}

/// Decode an in-memory GIF into `sink`.
///
/// Each image block is composited onto a canvas that persists across the file
/// and the full canvas is delivered as one frame. The sink is told the read
/// finished only when the trailer is reached.
pub fn decode<S: FrameSink>(data: &[u8], sink: S) -> Result<GifInfo> {
    decode_with_limit(data, sink, DEFAULT_PIXEL_LIMIT)
}

/// [`decode`] with a custom cap on screen and image area, in pixels.
pub fn decode_with_limit<S: FrameSink>(
    data: &[u8],
    mut sink: S,
    max_pixels: u64,
) -> Result<GifInfo> {
    Parser::new(data, max_pixels).run(&mut sink)
}

/// Decode an in-memory GIF into a list of frames.
pub fn decode_frames(data: &[u8]) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    decode(data, &mut frames)?;
    Ok(frames)
}

/// Bounds-checked little-endian reader over the file bytes.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.data.len().saturating_sub(self.pos);
        if available < n {
            return Err(Error::truncated(self.pos, n, available));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }
}

struct Parser<'a> {
    input: ByteReader<'a>,
    canvas: Bitmap,
    global_palette: Option<Palette>,
    gce: Option<GraphicControlExtension>,
    lzw: LzwDecoder,
    indices: Vec<u8>,
    rows: Vec<u32>,
    info: GifInfo,
    max_pixels: u64,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8], max_pixels: u64) -> Self {
        Self {
            input: ByteReader::new(data),
            canvas: Bitmap::default(),
            global_palette: None,
            gce: None,
            lzw: LzwDecoder::new(),
            indices: Vec::new(),
            rows: Vec::new(),
            info: GifInfo::default(),
            max_pixels,
        }
    }

    fn run<S: FrameSink>(mut self, sink: &mut S) -> Result<GifInfo> {
        self.read_header()?;
        self.read_logical_screen()?;

        loop {
            if self.input.is_empty() {
                return Err(FormatError::MissingTrailer.into());
            }
            let offset = self.input.pos;
            match self.input.u8()? {
                EXTENSION_INTRODUCER => self.read_extension()?,
                IMAGE_SEPARATOR => self.read_image(sink)?,
                TRAILER => {
                    debug!(frames = self.info.frame_count, "Reached trailer");
                    sink.on_reader_finished();
                    return Ok(self.info);
                }
                byte => return Err(FormatError::InvalidIntroducer { byte, offset }.into()),
            }
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let signature = self.input.take(SIGNATURE.len())?;
        if signature != SIGNATURE {
            return Err(FormatError::BadSignature {
                found: [signature[0], signature[1], signature[2]],
            }
            .into());
        }
        let version = self
            .input
            .take(3)
            .ok()
            .and_then(Version::from_bytes)
            .ok_or(FormatError::MissingVersion)?;
        debug!(%version, "Read header");
        self.info.version = version;
        Ok(())
    }

    fn read_logical_screen(&mut self) -> Result<()> {
        let width = self.input.u16()?;
        let height = self.input.u16()?;
        let packed = self.input.u8()?;
        let background = self.input.u8()?;
        let aspect = self.input.u8()?;
        let screen =
            LogicalScreenDescriptor::from_packed(width, height, packed, background, aspect);

        self.check_area(width, height)?;
        self.canvas = Bitmap::new(u32::from(width), u32::from(height));
        self.info.width = width;
        self.info.height = height;
        self.info.background_color_index = background;

        if let Some(len) = screen.global_table_len() {
            let palette = parse_color_table(self.input.take(len * 3)?);
            self.info.global_color_table_len = palette.len();
            self.global_palette = Some(palette);
        }
        debug!(
            width,
            height,
            global_colors = self.info.global_color_table_len,
            "Read logical screen"
        );
        Ok(())
    }

    fn read_extension(&mut self) -> Result<()> {
        let offset = self.input.pos;
        match self.input.u8()? {
            GRAPHIC_CONTROL_LABEL => self.read_graphic_control(),
            APPLICATION_LABEL => self.read_application(),
            PLAIN_TEXT_LABEL => Err(Error::unsupported("plain text extension")),
            COMMENT_LABEL => Err(Error::unsupported("comment extension")),
            label => Err(FormatError::InvalidExtension { label, offset }.into()),
        }
    }

    fn read_graphic_control(&mut self) -> Result<()> {
        let size = self.input.u8()?;
        if size != GRAPHIC_CONTROL_SIZE {
            return Err(FormatError::InvalidBlockSize {
                block: "GraphicControlExtension",
                expected: GRAPHIC_CONTROL_SIZE,
                actual: size,
            }
            .into());
        }
        let packed = self.input.u8()?;
        let delay_cs = self.input.u16()?;
        let transparent = self.input.u8()?;
        if self.input.u8()? != 0 {
            return Err(FormatError::MissingTerminator {
                block: "GraphicControlExtension",
            }
            .into());
        }

        let gce = GraphicControlExtension::from_fields(packed, delay_cs, transparent);
        debug!(
            delay_cs,
            transparent = ?gce.transparent_index,
            disposal = ?gce.disposal,
            "Read graphic control extension"
        );
        self.gce = Some(gce);
        Ok(())
    }

    fn read_application(&mut self) -> Result<()> {
        let size = self.input.u8()?;
        if size != APPLICATION_BLOCK_SIZE {
            return Err(FormatError::InvalidBlockSize {
                block: "ApplicationExtension",
                expected: APPLICATION_BLOCK_SIZE,
                actual: size,
            }
            .into());
        }
        let identifier = self.input.take(usize::from(APPLICATION_BLOCK_SIZE))?;
        let is_netscape = identifier == NETSCAPE_APPLICATION;

        let mut blocks = SubBlocks::new(self.input.data, self.input.pos);
        for block in blocks.by_ref() {
            let block = block?;
            if is_netscape && block.len() >= 3 && block[0] == 1 {
                let count = LittleEndian::read_u16(&block[1..3]);
                debug!(loop_count = count, "Read NETSCAPE2.0 loop count");
                self.info.loop_count = Some(count);
            }
        }
        self.input.pos = blocks.position();

        debug!(
            application = %String::from_utf8_lossy(identifier),
            "Skipped application extension"
        );
        Ok(())
    }

    fn read_image<S: FrameSink>(&mut self, sink: &mut S) -> Result<()> {
        let left = self.input.u16()?;
        let top = self.input.u16()?;
        let width = self.input.u16()?;
        let height = self.input.u16()?;
        let packed = self.input.u8()?;
        let desc = ImageDescriptor::from_packed(left, top, width, height, packed);

        let local_palette = match desc.local_table_len() {
            Some(len) => Some(parse_color_table(self.input.take(len * 3)?)),
            None => None,
        };
        let code_size = self.input.u8()?;
        debug!(
            left,
            top,
            width,
            height,
            interlaced = desc.interlaced,
            local_colors = local_palette.as_ref().map(Palette::len),
            code_size,
            "Read image descriptor"
        );

        self.check_area(width, height)?;
        self.decode_indices(code_size, usize::from(width) * usize::from(height))?;

        let gce = self.gce.take();
        let palette = local_palette.as_ref().or(self.global_palette.as_ref());
        if desc.interlaced {
            interlaced_rows(u32::from(height), &mut self.rows);
        } else {
            self.rows.clear();
            self.rows.extend(0..u32::from(height));
        }
        composite(
            &mut self.canvas,
            &desc,
            &self.rows,
            &self.indices,
            palette,
            gce.and_then(|g| g.transparent_index),
        );

        let delay = gce.map(|g| g.delay()).unwrap_or(Duration::ZERO);
        self.info.frame_count += 1;
        self.info.total_delay += delay;
        sink.add_frame(Frame::new(self.canvas.clone(), delay));
        Ok(())
    }

    fn check_area(&self, width: u16, height: u16) -> Result<()> {
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(CapacityError::TooLarge {
                width: u32::from(width),
                height: u32::from(height),
            }
            .into());
        }
        Ok(())
    }

    /// Run the image's sub-blocks through the LZW decoder into `self.indices`,
    /// keeping at most `pixel_count` indices.
    fn decode_indices(&mut self, code_size: u8, pixel_count: usize) -> Result<()> {
        self.lzw.begin(code_size)?;
        self.indices.clear();

        let indices = &mut self.indices;
        let mut blocks = SubBlocks::new(self.input.data, self.input.pos);
        for block in blocks.by_ref() {
            let block = block?;
            if self.lzw.is_finished() || indices.len() >= pixel_count {
                continue;
            }
            self.lzw.decode(block, |chunk| {
                let room = pixel_count - indices.len();
                indices.extend_from_slice(&chunk[..chunk.len().min(room)]);
            })?;
        }
        self.input.pos = blocks.position();

        if !self.lzw.is_finished() && self.indices.len() < pixel_count {
            warn!(
                decoded = self.indices.len(),
                "Image data ended without an end-of-information code"
            );
        }
        Ok(())
    }
}

/// Canvas row for each stored row of an interlaced image.
fn interlaced_rows(height: u32, rows: &mut Vec<u32>) {
    rows.clear();
    for (start, step) in INTERLACE_PASSES {
        rows.extend((start..height).step_by(step as usize));
    }
}

/// Paint decoded indices into the canvas.
///
/// `rows[i]` is the image row that stored row `i` belongs to. Pixels carrying
/// the transparent index are skipped, indices beyond the palette paint
/// transparent black, and anything outside the canvas is clipped. Missing
/// trailing indices leave the canvas untouched.
fn composite(
    canvas: &mut Bitmap,
    desc: &ImageDescriptor,
    rows: &[u32],
    indices: &[u8],
    palette: Option<&Palette>,
    transparent: Option<u8>,
) {
    let width = usize::from(desc.width);
    if width == 0 {
        return;
    }
    let colors = palette.map(Palette::colors).unwrap_or(&[]);

    for (&row, line) in rows.iter().zip(indices.chunks(width)) {
        let y = u32::from(desc.top) + row;
        for (column, &index) in line.iter().enumerate() {
            if Some(index) == transparent {
                continue;
            }
            let x = u32::from(desc.left) + column as u32;
            let color = colors
                .get(usize::from(index))
                .copied()
                .unwrap_or(Color::TRANSPARENT);
            canvas.set_pixel(x, y, color);
        }
    }
}
