#![no_main]

//! Fuzz target for the LZW codec.
//!
//! Encoding then decoding must reproduce the input, and decoding arbitrary
//! code streams must not panic.

use arbitrary::Arbitrary;
use gifkit::lzw;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct LzwInput {
    code_size: u8,
    data: Vec<u8>,
}

fuzz_target!(|input: LzwInput| {
    let code_size = 2 + input.code_size % 7;
    let mask = ((1u16 << code_size) - 1) as u8;

    let _ = lzw::decode(code_size, &input.data);

    let indices: Vec<u8> = input.data.iter().map(|b| b & mask).collect();
    let encoded = lzw::encode(code_size, &indices).expect("indices fit the code size");
    let decoded = lzw::decode(code_size, &encoded).expect("encoder output decodes");
    assert_eq!(decoded, indices);
});
