//! Error types for the gifkit library.
//!
//! Errors are grouped the same way failures surface while reading or writing a
//! GIF: container format violations, unsupported features, LZW stream
//! corruption and dimension/capacity violations.

use thiserror::Error;

/// Main error type for the gifkit library.
#[derive(Error, Debug)]
pub enum Error {
    /// The byte stream violates the GIF container grammar.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// The LZW code stream is corrupt or the codec was misconfigured.
    #[error("LZW error: {0}")]
    Lzw(#[from] LzwError),

    /// Dimension or capacity limit violated.
    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// Feature present in the file that has no decode path.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// GIF container grammar violations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The first three bytes are not `GIF`.
    #[error("Header signature is not GIF: {found:?}")]
    BadSignature { found: [u8; 3] },

    /// The version is neither `87a` nor `89a`.
    #[error("Header has no version")]
    MissingVersion,

    /// A block declared a size other than the one the grammar fixes.
    #[error("{block} has illegal block size {actual} (expected {expected})")]
    InvalidBlockSize {
        block: &'static str,
        expected: u8,
        actual: u8,
    },

    /// A fixed-size block was not followed by its zero terminator.
    #[error("{block} missing block terminator")]
    MissingTerminator { block: &'static str },

    /// Unknown block introducer byte.
    #[error("Read block on invalid introducer byte 0x{byte:02x} at offset {offset}")]
    InvalidIntroducer { byte: u8, offset: usize },

    /// Unknown extension label following `0x21`.
    #[error("Read block on invalid extension byte 0x{label:02x} at offset {offset}")]
    InvalidExtension { label: u8, offset: usize },

    /// Data ended before a field or sub-block was complete.
    #[error("Truncated data at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The data ended without a `0x3B` trailer.
    #[error("Missing trailer")]
    MissingTrailer,
}

/// LZW codec errors.
#[derive(Error, Debug)]
pub enum LzwError {
    /// Minimum code size outside 2..=8.
    #[error("Code size invalid: {0}")]
    InvalidCodeSize(u8),

    /// A code above the next free dictionary slot.
    #[error("LZW decompressor on invalid code {code} (next free code {next_free})")]
    InvalidCode { code: u16, next_free: u16 },

    /// The encoder was handed an index that does not fit the literal code size.
    #[error("Input byte {value} too large for code size {code_size}")]
    LiteralOutOfRange { value: u8, code_size: u8 },
}

/// Dimension and capacity violations.
#[derive(Error, Debug)]
pub enum CapacityError {
    /// The image does not fit the 16-bit width/height fields.
    #[error("Image is too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },

    /// A conversion produced an empty bitmap.
    #[error("Conversion produced an empty bitmap")]
    EmptyBitmap,

    /// Pixel storage does not match `width * height`.
    #[error("Pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    /// A color matcher returned an index that does not fit in a byte.
    #[error("Palette index {index} does not fit in 8 bits")]
    PaletteIndexOutOfRange { index: usize },

    /// A frame does not match the logical screen established by the first frame.
    #[error("Frame is {width}x{height} but the screen is {screen_width}x{screen_height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        screen_width: u32,
        screen_height: u32,
    },

    /// The writer was closed before any frame was appended.
    #[error("No frames were written")]
    NoFrames,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create a truncation error.
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        FormatError::Truncated {
            offset,
            needed,
            available,
        }
        .into()
    }

    /// Check if this is a container format violation.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    /// Check if this error names an unsupported feature.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}
