#![no_main]

//! Fuzz target for the GIF reader.
//!
//! Arbitrary bytes behind a valid signature must either decode or fail
//! with an error, never panic.

use arbitrary::Arbitrary;
use gifkit::{decode, Frame, FrameList};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct GifInput {
    data: Vec<u8>,
    with_header: bool,
    keep_pixels: bool,
}

fuzz_target!(|input: GifInput| {
    // Limit input size
    if input.data.len() > 1024 * 1024 {
        return;
    }

    let mut bytes = Vec::with_capacity(input.data.len() + 6);
    if input.with_header {
        bytes.extend_from_slice(b"GIF89a");
    }
    bytes.extend_from_slice(&input.data);

    if input.keep_pixels {
        let mut frames: Vec<Frame> = Vec::new();
        if let Ok(info) = decode(&bytes, &mut frames) {
            assert_eq!(info.frame_count, frames.len());
            for frame in &frames {
                assert_eq!(frame.bitmap.width(), u32::from(info.width));
                assert_eq!(frame.bitmap.height(), u32::from(info.height));
            }
        }
    } else {
        let mut frames = FrameList::new(|_| ());
        if decode(&bytes, &mut frames).is_ok() {
            assert!(frames.is_finished());
        }
    }
});
