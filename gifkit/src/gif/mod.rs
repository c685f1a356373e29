//! GIF container reading and writing.
//!
//! Supports the GIF87a and GIF89a grammar: header, logical screen descriptor,
//! global and local color tables, graphic control and application extensions,
//! table-based images and the trailer.
//!
//! ## Features
//!
//! - Persistent canvas compositing with transparency
//! - Interlaced images
//! - NETSCAPE2.0 loop count
//! - Global-from-first, global-from-all and per-frame local color tables on write

mod reader;
mod writer;

pub use reader::{decode, decode_frames, decode_with_limit, GifReader, DEFAULT_PIXEL_LIMIT};
pub use writer::{GifWriter, WriterConfig};

use std::io::Write;
use std::time::Duration;

use byteorder::{LittleEndian, WriteBytesExt};
use gifkit_core::{Color, Palette, Result, MAX_PALETTE_SIZE};

/// Signature shared by every GIF file.
pub const SIGNATURE: &[u8; 3] = b"GIF";
/// GIF87a file header.
pub const GIF87A_HEADER: &[u8; 6] = b"GIF87a";
/// GIF89a file header.
pub const GIF89A_HEADER: &[u8; 6] = b"GIF89a";

/// Extension introducer byte.
pub const EXTENSION_INTRODUCER: u8 = 0x21;
/// Image separator byte.
pub const IMAGE_SEPARATOR: u8 = 0x2C;
/// File trailer byte.
pub const TRAILER: u8 = 0x3B;

/// Graphic control extension label.
pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
/// Comment extension label.
pub const COMMENT_LABEL: u8 = 0xFE;
/// Application extension label.
pub const APPLICATION_LABEL: u8 = 0xFF;
/// Plain text extension label.
pub const PLAIN_TEXT_LABEL: u8 = 0x01;

/// Application identifier and authentication code of the looping extension.
pub const NETSCAPE_APPLICATION: &[u8; 11] = b"NETSCAPE2.0";

const GRAPHIC_CONTROL_SIZE: u8 = 4;
const APPLICATION_BLOCK_SIZE: u8 = 11;

const COLOR_TABLE_FLAG: u8 = 0x80;
const INTERLACE_FLAG: u8 = 0x40;
const SORT_FLAG_SCREEN: u8 = 0x08;
const SORT_FLAG_IMAGE: u8 = 0x20;

/// Row order of an interlaced image, as `(first row, step)` per pass.
pub const INTERLACE_PASSES: [(u32, u32); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// File format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    /// GIF87a.
    Gif87a,
    /// GIF89a.
    #[default]
    Gif89a,
}

impl Version {
    /// The three version bytes following the signature.
    pub fn as_bytes(self) -> &'static [u8; 3] {
        match self {
            Version::Gif87a => b"87a",
            Version::Gif89a => b"89a",
        }
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"87a" => Some(Version::Gif87a),
            b"89a" => Some(Version::Gif89a),
            _ => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Gif87a => f.write_str("GIF87a"),
            Version::Gif89a => f.write_str("GIF89a"),
        }
    }
}

/// GIF frame disposal method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    /// No disposal specified.
    #[default]
    None,
    /// Do not dispose.
    Keep,
    /// Restore to background color.
    RestoreBackground,
    /// Restore to previous frame.
    RestorePrevious,
}

impl DisposalMethod {
    /// Parse disposal method from a graphic control packed byte.
    pub fn from_byte(byte: u8) -> Self {
        match (byte >> 2) & 0x07 {
            1 => DisposalMethod::Keep,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::None,
        }
    }

    /// Convert to the 3-bit field value.
    pub fn to_byte(self) -> u8 {
        match self {
            DisposalMethod::None => 0,
            DisposalMethod::Keep => 1,
            DisposalMethod::RestoreBackground => 2,
            DisposalMethod::RestorePrevious => 3,
        }
    }
}

/// Per-frame metadata carried by a graphic control extension.
///
/// Applies to the next image block only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicControlExtension {
    /// Canvas treatment after the frame.
    pub disposal: DisposalMethod,
    /// Whether the viewer should wait for user input.
    pub user_input: bool,
    /// Index left unpainted when compositing.
    pub transparent_index: Option<u8>,
    /// Delay in hundredths of a second.
    pub delay_cs: u16,
}

impl GraphicControlExtension {
    /// A control block carrying only a display delay, rounded to hundredths.
    pub fn with_delay(delay: Duration) -> Self {
        let cs = (delay.as_millis() + 5) / 10;
        Self {
            delay_cs: u16::try_from(cs).unwrap_or(u16::MAX),
            ..Self::default()
        }
    }

    /// Display delay.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay_cs) * 10)
    }

    fn from_fields(packed: u8, delay_cs: u16, transparent: u8) -> Self {
        Self {
            disposal: DisposalMethod::from_byte(packed),
            user_input: packed & 0x02 != 0,
            transparent_index: (packed & 0x01 != 0).then_some(transparent),
            delay_cs,
        }
    }

    /// Write the complete extension, introducer to terminator.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut packed = self.disposal.to_byte() << 2;
        if self.user_input {
            packed |= 0x02;
        }
        if self.transparent_index.is_some() {
            packed |= 0x01;
        }
        out.write_all(&[
            EXTENSION_INTRODUCER,
            GRAPHIC_CONTROL_LABEL,
            GRAPHIC_CONTROL_SIZE,
            packed,
        ])?;
        out.write_u16::<LittleEndian>(self.delay_cs)?;
        out.write_all(&[self.transparent_index.unwrap_or(0), 0])?;
        Ok(())
    }
}

/// GIF logical screen descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    /// Canvas width.
    pub width: u16,
    /// Canvas height.
    pub height: u16,
    /// Has global color table.
    pub has_global_color_table: bool,
    /// Color resolution field (bits per primary minus one).
    pub color_resolution: u8,
    /// Global color table is sorted.
    pub sorted: bool,
    /// Size field of the global color table (2^(n+1) entries).
    pub global_color_table_size: u8,
    /// Background color index.
    pub background_color_index: u8,
    /// Pixel aspect ratio.
    pub pixel_aspect_ratio: u8,
}

impl Default for LogicalScreenDescriptor {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            has_global_color_table: false,
            color_resolution: 7,
            sorted: false,
            global_color_table_size: 0,
            background_color_index: 0,
            pixel_aspect_ratio: 0,
        }
    }
}

impl LogicalScreenDescriptor {
    fn from_packed(width: u16, height: u16, packed: u8, background: u8, aspect: u8) -> Self {
        Self {
            width,
            height,
            has_global_color_table: packed & COLOR_TABLE_FLAG != 0,
            color_resolution: (packed >> 4) & 0x07,
            sorted: packed & SORT_FLAG_SCREEN != 0,
            global_color_table_size: packed & 0x07,
            background_color_index: background,
            pixel_aspect_ratio: aspect,
        }
    }

    /// Number of global color table entries, if the table is present.
    pub fn global_table_len(&self) -> Option<usize> {
        self.has_global_color_table
            .then(|| table_len(self.global_color_table_size))
    }

    /// Write the seven descriptor bytes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut packed = (self.color_resolution & 0x07) << 4;
        if self.has_global_color_table {
            packed |= COLOR_TABLE_FLAG | (self.global_color_table_size & 0x07);
        }
        if self.sorted {
            packed |= SORT_FLAG_SCREEN;
        }
        out.write_u16::<LittleEndian>(self.width)?;
        out.write_u16::<LittleEndian>(self.height)?;
        out.write_all(&[packed, self.background_color_index, self.pixel_aspect_ratio])?;
        Ok(())
    }
}

/// Placement and flags of one table-based image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageDescriptor {
    /// Left edge on the canvas.
    pub left: u16,
    /// Top edge on the canvas.
    pub top: u16,
    /// Image width.
    pub width: u16,
    /// Image height.
    pub height: u16,
    /// Has local color table.
    pub has_local_color_table: bool,
    /// Rows are stored in interlaced order.
    pub interlaced: bool,
    /// Local color table is sorted.
    pub sorted: bool,
    /// Size field of the local color table.
    pub local_color_table_size: u8,
}

impl ImageDescriptor {
    fn from_packed(left: u16, top: u16, width: u16, height: u16, packed: u8) -> Self {
        Self {
            left,
            top,
            width,
            height,
            has_local_color_table: packed & COLOR_TABLE_FLAG != 0,
            interlaced: packed & INTERLACE_FLAG != 0,
            sorted: packed & SORT_FLAG_IMAGE != 0,
            local_color_table_size: packed & 0x07,
        }
    }

    /// Number of local color table entries, if the table is present.
    pub fn local_table_len(&self) -> Option<usize> {
        self.has_local_color_table
            .then(|| table_len(self.local_color_table_size))
    }

    /// Write the separator and the nine descriptor bytes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut packed = 0u8;
        if self.has_local_color_table {
            packed |= COLOR_TABLE_FLAG | (self.local_color_table_size & 0x07);
        }
        if self.interlaced {
            packed |= INTERLACE_FLAG;
        }
        if self.sorted {
            packed |= SORT_FLAG_IMAGE;
        }
        out.write_u8(IMAGE_SEPARATOR)?;
        out.write_u16::<LittleEndian>(self.left)?;
        out.write_u16::<LittleEndian>(self.top)?;
        out.write_u16::<LittleEndian>(self.width)?;
        out.write_u16::<LittleEndian>(self.height)?;
        out.write_u8(packed)?;
        Ok(())
    }
}

/// How the writer builds color tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    /// One global table extracted from the first frame.
    #[default]
    GlobalFromFirst,
    /// One global table extracted from every frame; frames are buffered until
    /// the writer is finished.
    GlobalFromAll,
    /// A local table per frame and no global table.
    Local,
}

/// Summary of a decoded file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GifInfo {
    /// Header version.
    pub version: Version,
    /// Logical screen width.
    pub width: u16,
    /// Logical screen height.
    pub height: u16,
    /// Background color index from the screen descriptor.
    pub background_color_index: u8,
    /// Global color table entries, zero if absent.
    pub global_color_table_len: usize,
    /// Number of frames delivered to the sink.
    pub frame_count: usize,
    /// Sum of all frame delays.
    pub total_delay: Duration,
    /// NETSCAPE2.0 loop count, 0 meaning forever.
    pub loop_count: Option<u16>,
}

/// Entry count for a 3-bit table size field.
pub fn table_len(size_field: u8) -> usize {
    1 << ((size_field & 0x07) + 1)
}

/// Parse `3 * n` bytes of RGB triples into an opaque palette.
pub fn parse_color_table(bytes: &[u8]) -> Palette {
    Palette::from_colors(
        bytes
            .chunks_exact(3)
            .map(|c| Color::rgb(c[0], c[1], c[2]))
            .collect(),
    )
}

/// Write `palette` as a table of `table_len(size_field)` RGB triples.
///
/// Missing entries are padded with black; excess entries are dropped.
pub fn write_color_table<W: Write>(out: &mut W, palette: &Palette, size_field: u8) -> Result<()> {
    let len = table_len(size_field).min(MAX_PALETTE_SIZE);
    let mut table = Vec::with_capacity(len * 3);
    for color in palette.colors().iter().take(len) {
        table.extend_from_slice(&[color.r, color.g, color.b]);
    }
    table.resize(len * 3, 0);
    out.write_all(&table)?;
    Ok(())
}

/// Write a NETSCAPE2.0 looping extension. A count of 0 loops forever.
pub fn write_loop_extension<W: Write>(out: &mut W, loop_count: u16) -> Result<()> {
    out.write_all(&[EXTENSION_INTRODUCER, APPLICATION_LABEL, APPLICATION_BLOCK_SIZE])?;
    out.write_all(NETSCAPE_APPLICATION)?;
    out.write_all(&[3, 1])?;
    out.write_u16::<LittleEndian>(loop_count)?;
    out.write_u8(0)?;
    Ok(())
}
