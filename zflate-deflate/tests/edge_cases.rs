//! Edge case tests for the zlib codec.

use proptest::prelude::*;
use zflate_core::adler32::adler32;
use zflate_deflate::zlib::{
    ZlibHeader, compress, compress_with_adler, decompress, is_zlib_compressed,
    requires_dictionary,
};
use zflate_deflate::{ZflateError, ZlibLevel};

fn mixed_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    while data.len() < size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        if (seed >> 60) < 4 {
            // Random run
            for _ in 0..16 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                data.push((seed >> 33) as u8);
            }
        } else {
            data.extend_from_slice(b"The quick brown fox jumps over the lazy dog. ");
        }
    }
    data.truncate(size);
    data
}

#[test]
fn test_empty_input() {
    let compressed = compress(b"", 6).unwrap();
    assert_eq!(
        compressed,
        [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]
    );
    assert!(decompress(&compressed).unwrap().is_empty());
    assert_eq!(adler32(b""), 1);
}

#[test]
fn test_single_byte() {
    let compressed = compress(b"a", 6).unwrap();
    assert_eq!(
        compressed,
        [0x78, 0x9C, 0x4B, 0x04, 0x00, 0x00, 0x62, 0x00, 0x62]
    );
    assert_eq!(decompress(&compressed).unwrap(), b"a");
}

#[test]
fn test_every_level_roundtrip() {
    let data = mixed_data(200_000);
    let mut sizes = Vec::new();
    for level in -1..=9 {
        let (compressed, adler) = compress_with_adler(&data, level).unwrap();
        assert_eq!(adler, adler32(&data));
        assert!(is_zlib_compressed(&compressed), "level {}", level);
        assert_eq!(decompress(&compressed).unwrap(), data, "level {}", level);
        sizes.push(compressed.len());
    }
    // Stored output is the largest, anything that matches beats it
    let stored = sizes[1];
    assert!(stored > data.len());
    assert!(sizes[2..].iter().all(|&size| size < stored));
}

#[test]
fn test_level_hints_in_header() {
    let data = b"level hint";
    for (level, flg) in [
        (-1, 0x9C),
        (0, 0x01),
        (1, 0x01),
        (2, 0x5E),
        (5, 0x5E),
        (6, 0x9C),
        (7, 0xDA),
        (9, 0xDA),
    ] {
        let compressed = compress(data, level).unwrap();
        assert_eq!(compressed[..2], [0x78, flg], "level {}", level);
        let header = ZlibHeader::parse(&compressed).unwrap();
        assert_eq!(
            header.level,
            ZlibLevel::from_level(if level < 0 { 6 } else { level as u8 })
        );
    }
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 100_000];
    let compressed = compress(&input, 6).unwrap();
    assert!(compressed.len() < input.len() / 100);
    assert_eq!(decompress(&compressed).unwrap(), input);
}

#[test]
fn test_max_match_length() {
    let input = vec![42u8; 258 * 10];
    let compressed = compress(&input, 9).unwrap();
    assert_eq!(decompress(&compressed).unwrap(), input);
}

#[test]
fn test_incompressible_uses_stored_blocks() {
    let mut input = Vec::with_capacity(70_000);
    let mut seed: u32 = 7;
    for _ in 0..70_000 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        input.push(seed as u8);
    }
    let compressed = compress(&input, 9).unwrap();
    // Stored blocks cost five bytes each on top of the data
    assert!(compressed.len() <= input.len() + 6 + 4 + 5 * (input.len() / 16_000 + 2));
    assert_eq!(decompress(&compressed).unwrap(), input);
}

#[test]
fn test_trailer_bit_flips_are_detected() {
    let data = mixed_data(4000);
    let compressed = compress(&data, 6).unwrap();
    let len = compressed.len();
    for index in len - 4..len {
        for bit in 0..8 {
            let mut corrupt = compressed.clone();
            corrupt[index] ^= 1 << bit;
            match decompress(&corrupt) {
                Err(ZflateError::ChecksumMismatch { computed, .. }) => {
                    assert_eq!(computed, adler32(&data));
                }
                other => panic!("byte {} bit {}: {:?}", index, bit, other.map(|v| v.len())),
            }
        }
    }
}

#[test]
fn test_method_nibble_is_checked() {
    let mut compressed = compress(b"method", 6).unwrap();
    for method in (0u8..16).filter(|&m| m != 8) {
        compressed[0] = 0x70 | method;
        match decompress(&compressed) {
            Err(ZflateError::InvalidHeader { message }) => {
                assert_eq!(message, "unknown compression method");
            }
            other => panic!("method {}: {:?}", method, other.map(|v| v.len())),
        }
    }
}

#[test]
fn test_header_check_is_checked() {
    let mut compressed = compress(b"fcheck", 6).unwrap();
    compressed[1] ^= 0x01;
    assert!(matches!(
        decompress(&compressed),
        Err(ZflateError::InvalidHeader { .. })
    ));
}

#[test]
fn test_truncated_everywhere() {
    let data = mixed_data(2000);
    let compressed = compress(&data, 6).unwrap();
    for cut in [0, 1, 2, 10, compressed.len() / 2, compressed.len() - 1] {
        assert!(
            decompress(&compressed[..cut]).is_err(),
            "truncated at {}",
            cut
        );
    }
}

#[test]
fn test_bad_block_type() {
    // Header, then BFINAL=1 BTYPE=11
    let result = decompress(&[0x78, 0x9C, 0x07, 0x00]);
    match result {
        Err(ZflateError::CorruptedData { message, .. }) => {
            assert_eq!(message, "invalid block type");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_trailing_garbage_is_ignored() {
    let mut compressed = compress(b"payload", 6).unwrap();
    compressed.extend_from_slice(b"garbage after the stream");
    assert_eq!(decompress(&compressed).unwrap(), b"payload");
}

#[test]
fn test_header_sniffing() {
    assert!(!is_zlib_compressed(b"\x89PNG\r\n\x1a\n"));
    assert!(!is_zlib_compressed(&[0x1F, 0x8B, 0x08]));
    assert!(!is_zlib_compressed(&[0x78]));

    let compressed = compress(b"sniff", 9).unwrap();
    assert!(is_zlib_compressed(&compressed));
    assert_eq!(requires_dictionary(&compressed), None);

    let with_dict =
        zflate_deflate::zlib::compress_with_dictionary(b"sniff", 6, b"sniffing").unwrap();
    assert!(!is_zlib_compressed(&with_dict));
    assert_eq!(requires_dictionary(&with_dict), Some(adler32(b"sniffing")));
}

proptest! {
    #[test]
    fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096), level in 0i32..=9) {
        let compressed = compress(&data, level).unwrap();
        prop_assert!(is_zlib_compressed(&compressed));
        prop_assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn prop_repetitive_roundtrip(
        seed in proptest::collection::vec(0u8..4, 1..64),
        repeats in 1usize..200,
        level in 1i32..=9,
    ) {
        let data: Vec<u8> = seed.iter().cycle().take(seed.len() * repeats).copied().collect();
        let compressed = compress(&data, level).unwrap();
        prop_assert_eq!(decompress(&compressed).unwrap(), data);
    }
}
