//! Container reader scenarios over hand-assembled GIF byte streams.

use std::time::Duration;

use gifkit::block::write_sub_blocks;
use gifkit::{
    decode, decode_frames, decode_with_limit, lzw, Bitmap, CapacityError, Color, Error,
    FormatError, Frame, FrameList, FrameSink, GifReader, LzwError, Version,
};

const RED: Color = Color::rgb(255, 0, 0);
const GREEN: Color = Color::rgb(0, 255, 0);
const BLUE: Color = Color::rgb(0, 0, 255);
const WHITE: Color = Color::rgb(255, 255, 255);

/// Builds GIF files block by block.
struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    fn new(width: u16, height: u16, global: &[Color]) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        if global.is_empty() {
            bytes.extend_from_slice(&[0x70, 0, 0]);
        } else {
            bytes.extend_from_slice(&[0xF0 | size_field(global.len()), 0, 0]);
            push_table(&mut bytes, global);
        }
        Self { bytes }
    }

    fn gce(mut self, delay_cs: u16, transparent: Option<u8>) -> Self {
        let packed = if transparent.is_some() { 0x05 } else { 0x04 };
        self.bytes.extend_from_slice(&[0x21, 0xF9, 4, packed]);
        self.bytes.extend_from_slice(&delay_cs.to_le_bytes());
        self.bytes.extend_from_slice(&[transparent.unwrap_or(0), 0]);
        self
    }

    fn image(self, left: u16, top: u16, width: u16, height: u16, indices: &[u8]) -> Self {
        self.image_with(left, top, width, height, indices, None, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn image_with(
        mut self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        indices: &[u8],
        local: Option<&[Color]>,
        interlaced: bool,
    ) -> Self {
        self.bytes.push(0x2C);
        for v in [left, top, width, height] {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut packed = if interlaced { 0x40 } else { 0 };
        if let Some(table) = local {
            packed |= 0x80 | size_field(table.len());
        }
        self.bytes.push(packed);
        if let Some(table) = local {
            push_table(&mut self.bytes, table);
        }
        self.bytes.push(2);
        let encoded = lzw::encode(2, indices).unwrap();
        self.bytes = write_sub_blocks(std::mem::take(&mut self.bytes), &encoded).unwrap();
        self
    }

    fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.raw(&[0x3B]).bytes
    }
}

fn size_field(len: usize) -> u8 {
    (len.next_power_of_two().max(2).trailing_zeros() - 1) as u8
}

fn push_table(bytes: &mut Vec<u8>, colors: &[Color]) {
    let len = colors.len().next_power_of_two().max(2);
    for i in 0..len {
        let c = colors.get(i).copied().unwrap_or(Color::BLACK);
        bytes.extend_from_slice(&[c.r, c.g, c.b]);
    }
}

#[derive(Default)]
struct RecordingSink {
    frames: Vec<Frame>,
    finished: bool,
}

impl FrameSink for RecordingSink {
    fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn on_reader_finished(&mut self) {
        self.finished = true;
    }
}

#[test]
fn transparent_index_preserves_previous_frame() {
    let bytes = GifBuilder::new(4, 4, &[RED, GREEN, BLUE, WHITE])
        .image(0, 0, 4, 4, &[0; 16])
        // Second frame: 2x2 at (1,1), left column transparent (index 3)
        .gce(10, Some(3))
        .image(1, 1, 2, 2, &[3, 2, 3, 2])
        .finish();

    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].bitmap, Bitmap::filled(4, 4, RED));

    let second = &frames[1].bitmap;
    assert_eq!(second.pixel(1, 1), Some(RED));
    assert_eq!(second.pixel(1, 2), Some(RED));
    assert_eq!(second.pixel(2, 1), Some(BLUE));
    assert_eq!(second.pixel(2, 2), Some(BLUE));
    assert_eq!(second.pixel(0, 0), Some(RED));
    assert_eq!(second.pixel(3, 3), Some(RED));
    assert_eq!(frames[1].delay, Duration::from_millis(100));
}

#[test]
fn graphic_control_applies_to_next_image_only() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .gce(5, Some(0))
        .image(0, 0, 1, 1, &[1])
        .image(0, 0, 1, 1, &[0])
        .finish();

    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].delay, Duration::from_millis(50));
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some(GREEN));
    // Index 0 is no longer transparent
    assert_eq!(frames[1].delay, Duration::ZERO);
    assert_eq!(frames[1].bitmap.pixel(0, 0), Some(RED));
}

#[test]
fn canvas_starts_transparent() {
    let bytes = GifBuilder::new(3, 1, &[RED, GREEN])
        .image(1, 0, 1, 1, &[1])
        .finish();
    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some(Color::TRANSPARENT));
    assert_eq!(frames[0].bitmap.pixel(1, 0), Some(GREEN));
}

#[test]
fn out_of_range_index_is_transparent_black() {
    // Two-entry table, index 3 has no color
    let bytes = GifBuilder::new(2, 1, &[RED, GREEN])
        .image(0, 0, 2, 1, &[3, 1])
        .finish();
    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some(Color::TRANSPARENT));
    assert_eq!(frames[0].bitmap.pixel(1, 0), Some(GREEN));
}

#[test]
fn local_table_overrides_global_for_one_image() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .image_with(0, 0, 1, 1, &[0], Some(&[BLUE, WHITE]), false)
        .image(0, 0, 1, 1, &[0])
        .finish();
    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some(BLUE));
    assert_eq!(frames[1].bitmap.pixel(0, 0), Some(RED));
}

#[test]
fn interlaced_rows_are_reordered() {
    // Stored row order for height 5 is 0, 4, 2, 1, 3
    let stored = [0, 3, 2, 1, 1];
    let bytes = GifBuilder::new(1, 5, &[RED, GREEN, BLUE, WHITE])
        .image_with(0, 0, 1, 5, &stored, None, true)
        .finish();

    let frames = decode_frames(&bytes).unwrap();
    let column: Vec<Color> = (0..5).map(|y| frames[0].bitmap.pixel(0, y).unwrap()).collect();
    assert_eq!(column, vec![RED, GREEN, BLUE, GREEN, WHITE]);
}

#[test]
fn image_outside_screen_is_clipped() {
    let bytes = GifBuilder::new(2, 2, &[RED, GREEN])
        .image(1, 1, 3, 3, &[1; 9])
        .finish();
    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].bitmap.width(), 2);
    assert_eq!(frames[0].bitmap.pixel(1, 1), Some(GREEN));
    assert_eq!(frames[0].bitmap.pixel(0, 1), Some(Color::TRANSPARENT));
}

#[test]
fn loop_count_and_summary() {
    let mut app = vec![0x21, 0xFF, 11];
    app.extend_from_slice(b"NETSCAPE2.0");
    app.extend_from_slice(&[3, 1, 5, 0, 0]);

    let bytes = GifBuilder::new(2, 1, &[RED, GREEN])
        .raw(&app)
        .gce(3, None)
        .image(0, 0, 2, 1, &[0, 1])
        .gce(4, None)
        .image(0, 0, 2, 1, &[1, 0])
        .finish();

    let mut sink = RecordingSink::default();
    let info = decode(&bytes, &mut sink).unwrap();
    assert!(sink.finished);
    assert_eq!(info.version, Version::Gif89a);
    assert_eq!((info.width, info.height), (2, 1));
    assert_eq!(info.global_color_table_len, 2);
    assert_eq!(info.frame_count, 2);
    assert_eq!(info.total_delay, Duration::from_millis(70));
    assert_eq!(info.loop_count, Some(5));
}

#[test]
fn other_application_extensions_are_skipped() {
    let mut app = vec![0x21, 0xFF, 11];
    app.extend_from_slice(b"XMP DataXMP");
    app.extend_from_slice(&[4, 1, 2, 3, 4, 2, 5, 6, 0]);

    let bytes = GifBuilder::new(1, 1, &[RED, GREEN]).raw(&app).image(0, 0, 1, 1, &[1]).finish();
    let mut frames: Vec<Frame> = Vec::new();
    let info = decode(&bytes, &mut frames).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(info.loop_count, None);
}

#[test]
fn gif87a_without_global_table() {
    let mut bytes = GifBuilder::new(1, 1, &[])
        .image_with(0, 0, 1, 1, &[1], Some(&[RED, GREEN]), false)
        .finish();
    bytes[3..6].copy_from_slice(b"87a");

    let mut sink = RecordingSink::default();
    let info = decode(&bytes, &mut sink).unwrap();
    assert_eq!(info.version, Version::Gif87a);
    assert_eq!(info.global_color_table_len, 0);
    assert_eq!(sink.frames[0].bitmap.pixel(0, 0), Some(GREEN));
}

#[test]
fn bad_signature_fails() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).image(0, 0, 1, 1, &[0]).finish();
    bytes[..3].copy_from_slice(b"PNG");
    let err = decode_frames(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::BadSignature { found }) if &found == b"PNG"
    ));
}

#[test]
fn unknown_version_fails() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).finish();
    bytes[3..6].copy_from_slice(b"90a");
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Format(FormatError::MissingVersion))
    ));
    assert!(matches!(
        decode_frames(b"GIF"),
        Err(Error::Format(FormatError::MissingVersion))
    ));
}

#[test]
fn graphic_control_with_wrong_size_fails() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .raw(&[0x21, 0xF9, 5, 0, 0, 0, 0, 0, 0])
        .image(0, 0, 1, 1, &[0])
        .finish();
    let err = decode_frames(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::InvalidBlockSize { expected: 4, actual: 5, .. })
    ));
}

#[test]
fn graphic_control_without_terminator_fails() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .raw(&[0x21, 0xF9, 4, 0, 0, 0, 0, 7])
        .finish();
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Format(FormatError::MissingTerminator { .. }))
    ));
}

#[test]
fn application_extension_with_wrong_size_fails() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .raw(&[0x21, 0xFF, 10])
        .raw(&[0; 12])
        .finish();
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Format(FormatError::InvalidBlockSize { expected: 11, actual: 10, .. }))
    ));
}

#[test]
fn truncated_final_sub_block_fails() {
    let bytes = GifBuilder::new(2, 2, &[RED, GREEN])
        .image(0, 0, 2, 2, &[0, 1, 1, 0])
        .finish();
    // Drop the trailer, the block terminator and one data byte
    let truncated = &bytes[..bytes.len() - 3];
    let mut frames: Vec<Frame> = Vec::new();
    let err = decode(truncated, &mut frames).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::Truncated { .. })));
    assert!(frames.is_empty());
}

#[test]
fn comment_and_plain_text_are_unsupported() {
    for label in [0xFE, 0x01] {
        let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
            .raw(&[0x21, label, 3, b'a', b'b', b'c', 0])
            .finish();
        let err = decode_frames(&bytes).unwrap_err();
        assert!(err.is_unsupported(), "label {label:#x}: {err}");
    }
}

#[test]
fn unknown_extension_label_fails() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN]).raw(&[0x21, 0x42, 0]).finish();
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Format(FormatError::InvalidExtension { label: 0x42, offset: 20 }))
    ));
}

#[test]
fn unknown_introducer_fails() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN]).raw(&[0x99]).finish();
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Format(FormatError::InvalidIntroducer { byte: 0x99, offset: 19 }))
    ));
}

#[test]
fn missing_trailer_keeps_delivered_frames() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).image(0, 0, 1, 1, &[1]).finish();
    bytes.pop();

    let mut sink = RecordingSink::default();
    let err = decode(&bytes, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::MissingTrailer)));
    assert_eq!(sink.frames.len(), 1);
    assert!(!sink.finished);
}

#[test]
fn invalid_lzw_code_fails() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).finish();
    bytes.pop();
    // clear (4), then code 7 with nothing defined past the end code
    bytes.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0, 2, 1, 0b0011_1100, 0, 0x3B]);
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Lzw(LzwError::InvalidCode { code: 7, .. }))
    ));
}

#[test]
fn invalid_code_size_fails() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).finish();
    bytes.pop();
    bytes.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0, 12, 1, 0, 0, 0x3B]);
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Lzw(LzwError::InvalidCodeSize(12)))
    ));
}

#[test]
fn missing_end_code_is_tolerated() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).finish();
    bytes.pop();
    // clear (4), literal 1, no end code
    bytes.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0, 2, 1, 0b0000_1100, 0, 0x3B]);
    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames[0].bitmap.pixel(0, 0), Some(GREEN));
}

#[test]
fn oversized_screen_is_rejected_before_allocating() {
    let bytes = b"GIF89a\xFF\xFF\xFF\xFF\x00\x00\x00\x3B";
    let mut sink = RecordingSink::default();
    let err = decode(bytes, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        Error::Capacity(CapacityError::TooLarge { width: 65535, height: 65535 })
    ));
    assert!(sink.frames.is_empty());
}

#[test]
fn oversized_image_is_rejected() {
    let mut bytes = GifBuilder::new(1, 1, &[RED, GREEN]).finish();
    bytes.pop();
    bytes.extend_from_slice(&[0x2C, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 2, 1, 0x0C, 0, 0x3B]);
    assert!(matches!(
        decode_frames(&bytes),
        Err(Error::Capacity(CapacityError::TooLarge { .. }))
    ));
}

#[test]
fn pixel_limit_is_configurable() {
    let bytes = GifBuilder::new(4, 4, &[RED, GREEN]).image(0, 0, 4, 4, &[1; 16]).finish();
    assert!(decode_with_limit(&bytes, Vec::<Frame>::new(), 16).is_ok());
    assert!(matches!(
        decode_with_limit(&bytes, Vec::<Frame>::new(), 15),
        Err(Error::Capacity(CapacityError::TooLarge { width: 4, height: 4 }))
    ));

    let path = std::env::temp_dir().join(format!("gifkit-limit-{}.gif", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();
    let mut frames: Vec<Frame> = Vec::new();
    assert!(!GifReader::new(&path).with_pixel_limit(8).read(&mut frames));
    assert!(GifReader::new(&path).read(&mut frames));
    assert_eq!(frames.len(), 1);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn indices_past_the_image_area_are_dropped() {
    // 200k indices for a 2x1 image: only the first two land on the canvas
    let mut indices = vec![1u8, 0];
    indices.extend(std::iter::repeat(1).take(200_000));
    let bytes = GifBuilder::new(2, 1, &[RED, GREEN]).image(0, 0, 2, 1, &indices).finish();

    let frames = decode_frames(&bytes).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].bitmap.pixels(), &[GREEN, RED]);
}

#[test]
fn frame_list_collects_converted_frames() {
    let bytes = GifBuilder::new(1, 1, &[RED, GREEN])
        .image(0, 0, 1, 1, &[0])
        .image(0, 0, 1, 1, &[1])
        .finish();
    let mut list = FrameList::new(|bitmap: &Bitmap| bitmap.to_rgba());
    decode(&bytes, &mut list).unwrap();
    assert!(list.is_finished());
    assert_eq!(list.len(), 2);
    assert_eq!(list.frame(1).map(|(rgba, _)| rgba.clone()), Some(vec![0, 255, 0, 255]));
}

#[test]
fn reader_reports_failure_as_false() {
    let dir = std::env::temp_dir().join(format!("gifkit-reader-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let good = dir.join("good.gif");
    std::fs::write(&good, GifBuilder::new(1, 1, &[RED, GREEN]).image(0, 0, 1, 1, &[1]).finish())
        .unwrap();
    let bad = dir.join("bad.gif");
    std::fs::write(&bad, b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x99").unwrap();

    let mut frames: Vec<Frame> = Vec::new();
    assert!(GifReader::new(&good).read(&mut frames));
    assert_eq!(frames.len(), 1);
    assert!(!GifReader::new(&bad).read(&mut frames));
    assert_eq!(frames.len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}
