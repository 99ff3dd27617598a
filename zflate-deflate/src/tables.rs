//! Constant tables of the DEFLATE format (RFC 1951 sections 3.2.5-3.2.7).

use crate::huffman::{HuffmanTable, build_table};
use std::sync::OnceLock;

/// End-of-block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Literal/length symbols that may appear in a block (0-285).
pub const LITLEN_SYMBOLS: usize = 286;

/// Literal/length symbols covered by the fixed code (286 and 287 never occur).
pub const FIXED_LITLEN_SYMBOLS: usize = 288;

/// Distance symbols (0-29).
pub const DISTANCE_SYMBOLS: usize = 30;

/// Code-length symbols (0-18).
pub const CODELEN_SYMBOLS: usize = 19;

/// Shortest match length.
pub const MIN_MATCH: usize = 3;

/// Longest match length.
pub const MAX_MATCH: usize = 258;

/// Largest payload of one stored block.
pub const MAX_STORED: usize = 65535;

/// Base match length of length symbols 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

/// Extra bits of length symbols 257-285.
pub const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distance of distance symbols 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits of distance symbols 0-29.
pub const DISTANCE_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length code lengths.
pub const CODE_LENGTH_ORDER: [usize; CODELEN_SYMBOLS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length symbol index (0-28) for every match length 3..=258.
const LENGTH_CODE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut code = 0;
    while code < 28 {
        let mut n = 0;
        while n < (1 << LENGTH_EXTRA[code]) {
            table[LENGTH_BASE[code] as usize - MIN_MATCH + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    // 258 has its own symbol although 227 + 31 would also reach it
    table[255] = 28;
    table
};

/// Distance symbol for distances 1..=256 (index d-1) and, shifted right by
/// 7, for 257..=32768 (index 256 + ((d-1) >> 7)).
const DISTANCE_CODE: [u8; 512] = {
    let mut table = [0u8; 512];
    let mut code = 0;
    while code < 16 {
        let mut n = 0;
        while n < (1 << DISTANCE_EXTRA[code]) {
            table[DISTANCE_BASE[code] as usize - 1 + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    while code < 30 {
        let mut n = 0;
        while n < (1 << (DISTANCE_EXTRA[code] - 7)) {
            table[256 + ((DISTANCE_BASE[code] as usize - 1) >> 7) + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    table
};

/// Length symbol index (0-28, add 257 for the symbol) of a match length.
#[inline]
pub fn length_code(length: usize) -> usize {
    debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
    LENGTH_CODE[length - MIN_MATCH] as usize
}

/// Distance symbol (0-29) of a match distance.
#[inline]
pub fn distance_code(distance: usize) -> usize {
    debug_assert!((1..=32768).contains(&distance));
    let d = distance - 1;
    if d < 256 {
        DISTANCE_CODE[d] as usize
    } else {
        DISTANCE_CODE[256 + (d >> 7)] as usize
    }
}

/// Fixed literal/length code lengths (RFC 1951 section 3.2.6).
pub fn fixed_litlen_lengths() -> [u8; FIXED_LITLEN_SYMBOLS] {
    let mut lengths = [8u8; FIXED_LITLEN_SYMBOLS];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths: all 5 bits.
pub fn fixed_distance_lengths() -> [u8; DISTANCE_SYMBOLS] {
    [5u8; DISTANCE_SYMBOLS]
}

/// Decode table of the fixed literal/length code, built once.
pub fn fixed_litlen_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        build_table(&fixed_litlen_lengths()).expect("fixed literal/length code is valid")
    })
}

/// Decode table of the fixed distance code, built once.
pub fn fixed_distance_table() -> &'static HuffmanTable {
    static TABLE: OnceLock<HuffmanTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        build_table(&fixed_distance_lengths()).expect("fixed distance code is valid")
    })
}
