//! Streaming behaviour of the stream context: chunked buffers, flush
//! points, dictionaries and raw framing.

use zflate_core::adler32::adler32;
use zflate_deflate::zlib::{compress, decompress, decompress_with_config};
use zflate_deflate::{Flush, InflateConfig, Status, ZStream};

/// Upper bound on engine calls in the byte-at-a-time drivers.
const CALL_LIMIT: usize = 10_000_000;

fn sample_text(size: usize) -> Vec<u8> {
    let words = [
        "stream ", "window ", "huffman ", "block ", "adler ", "literal ", "match ", "flush ",
    ];
    let mut data = Vec::with_capacity(size);
    let mut seed: u32 = 12345;
    while data.len() < size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.extend_from_slice(words[(seed >> 16) as usize % words.len()].as_bytes());
    }
    data.truncate(size);
    data
}

/// Compress with one input byte and one output byte per call.
fn deflate_bytewise(data: &[u8], level: i32) -> Vec<u8> {
    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(level), Status::Ok);
    let mut out = Vec::new();
    let mut pos = 0;
    for _ in 0..CALL_LIMIT {
        let end = (pos + 1).min(data.len());
        let flush = if pos == data.len() {
            Flush::Finish
        } else {
            Flush::NoFlush
        };
        let mut byte = [0u8; 1];
        let status = stream.deflate(&data[pos..end], &mut byte, flush);
        pos += stream.next_in();
        out.extend_from_slice(&byte[..stream.next_out()]);
        match status {
            Status::StreamEnd => return out,
            Status::Ok | Status::BufError => {}
            other => panic!("deflate failed: {:?} {:?}", other, stream.message()),
        }
    }
    panic!("deflate made no progress");
}

/// Decompress with one input byte and one output byte per call.
fn inflate_bytewise(data: &[u8], window_bits: i32) -> Vec<u8> {
    let mut stream = ZStream::new();
    assert_eq!(stream.inflate_init(window_bits), Status::Ok);
    let mut out = Vec::new();
    let mut pos = 0;
    for _ in 0..CALL_LIMIT {
        let end = (pos + 1).min(data.len());
        let mut byte = [0u8; 1];
        let status = stream.inflate(&data[pos..end], &mut byte, Flush::NoFlush);
        pos += stream.next_in();
        out.extend_from_slice(&byte[..stream.next_out()]);
        match status {
            Status::StreamEnd => return out,
            Status::Ok | Status::BufError => {}
            other => panic!("inflate failed: {:?} {:?}", other, stream.message()),
        }
    }
    panic!("inflate made no progress");
}

/// Run one deflate call to completion of `flush`, appending the output.
fn deflate_step(stream: &mut ZStream, input: &[u8], flush: Flush, out: &mut Vec<u8>) -> Status {
    let mut chunk = [0u8; 256];
    let mut pos = 0;
    loop {
        let status = stream.deflate(&input[pos..], &mut chunk, flush);
        pos += stream.next_in();
        out.extend_from_slice(&chunk[..stream.next_out()]);
        let drained = stream.avail_out() > 0;
        match status {
            Status::StreamEnd => return status,
            Status::Ok if pos == input.len() && drained => return status,
            Status::Ok => {}
            other => panic!("deflate failed: {:?}", other),
        }
    }
}

/// Decode everything `data` allows without requiring the end of the stream.
fn inflate_available(data: &[u8], window_bits: i32) -> (Vec<u8>, Status) {
    let mut stream = ZStream::new();
    assert_eq!(stream.inflate_init(window_bits), Status::Ok);
    let mut out = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut pos = 0;
    loop {
        let status = stream.inflate(&data[pos..], &mut chunk, Flush::NoFlush);
        pos += stream.next_in();
        out.extend_from_slice(&chunk[..stream.next_out()]);
        match status {
            Status::Ok => {}
            other => return (out, other),
        }
    }
}

#[test]
fn test_bytewise_deflate_matches_one_shot_decode() {
    let data = sample_text(3000);
    for level in [0, 1, 6, 9] {
        let compressed = deflate_bytewise(&data, level);
        assert_eq!(decompress(&compressed).unwrap(), data, "level {}", level);
    }
}

#[test]
fn test_bytewise_inflate() {
    let data = sample_text(5000);
    for level in [0, 3, 6] {
        let compressed = compress(&data, level).unwrap();
        assert_eq!(inflate_bytewise(&compressed, 15), data, "level {}", level);
    }
}

#[test]
fn test_bytewise_both_directions() {
    let data = sample_text(1500);
    let compressed = deflate_bytewise(&data, 6);
    assert_eq!(inflate_bytewise(&compressed, 15), data);
}

#[test]
fn test_sync_flush_restart_point() {
    let first = sample_text(700);
    let second = b"second part after the flush point".to_vec();

    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(6), Status::Ok);
    let mut compressed = Vec::new();
    deflate_step(&mut stream, &first, Flush::SyncFlush, &mut compressed);
    assert_eq!(
        &compressed[compressed.len() - 4..],
        &[0x00, 0x00, 0xFF, 0xFF]
    );

    // Everything written before the flush decodes without the rest
    let (partial, status) = inflate_available(&compressed, 15);
    assert_eq!(status, Status::BufError);
    assert_eq!(partial, first);

    let status = deflate_step(&mut stream, &second, Flush::Finish, &mut compressed);
    assert_eq!(status, Status::StreamEnd);

    let mut expected = first.clone();
    expected.extend_from_slice(&second);
    assert_eq!(decompress(&compressed).unwrap(), expected);
}

#[test]
fn test_partial_flush_acts_as_sync() {
    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(6), Status::Ok);
    let mut compressed = Vec::new();
    deflate_step(&mut stream, b"partial flush data", Flush::PartialFlush, &mut compressed);
    assert_eq!(
        &compressed[compressed.len() - 4..],
        &[0x00, 0x00, 0xFF, 0xFF]
    );
    let (partial, _) = inflate_available(&compressed, 15);
    assert_eq!(partial, b"partial flush data");
}

#[test]
fn test_full_flush_forgets_history() {
    let first = sample_text(2000);
    let second = first.clone();

    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init2(6, -15), Status::Ok);
    let mut compressed = Vec::new();
    deflate_step(&mut stream, &first, Flush::FullFlush, &mut compressed);
    let restart = compressed.len();
    deflate_step(&mut stream, &second, Flush::Finish, &mut compressed);

    // A fresh decoder can start at the full flush point
    let tail = decompress_with_config(&compressed[restart..], &InflateConfig::RAW, None).unwrap();
    assert_eq!(tail, second);

    let whole = decompress_with_config(&compressed, &InflateConfig::RAW, None).unwrap();
    assert_eq!(whole.len(), first.len() + second.len());
}

#[test]
fn test_every_flush_mode_decodes() {
    let pieces: Vec<Vec<u8>> = (0..6).map(|i| sample_text(300 + i * 50)).collect();
    let modes = [
        Flush::NoFlush,
        Flush::PartialFlush,
        Flush::SyncFlush,
        Flush::FullFlush,
        Flush::NoFlush,
        Flush::Finish,
    ];

    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(5), Status::Ok);
    let mut compressed = Vec::new();
    for (piece, flush) in pieces.iter().zip(modes) {
        deflate_step(&mut stream, piece, flush, &mut compressed);
    }
    assert_eq!(stream.deflate_end(), Status::Ok);

    let expected: Vec<u8> = pieces.concat();
    assert_eq!(decompress(&compressed).unwrap(), expected);
}

#[test]
fn test_need_dictionary_after_header() {
    let dictionary = b"dictionary words for the preset";
    let data = b"words for the preset dictionary, reversed";
    let compressed =
        zflate_deflate::zlib::compress_with_dictionary(data, 6, dictionary).unwrap();

    let mut stream = ZStream::new();
    assert_eq!(stream.inflate_init(15), Status::Ok);
    let mut out = vec![0u8; 256];
    let status = stream.inflate(&compressed, &mut out, Flush::NoFlush);
    assert_eq!(status, Status::NeedDict);
    assert_eq!(stream.next_in(), 6);
    assert_eq!(stream.next_out(), 0);
    assert_eq!(stream.adler(), adler32(dictionary));

    assert_eq!(stream.inflate_set_dictionary(b"wrong"), Status::DataError);
    assert_eq!(stream.inflate_set_dictionary(dictionary), Status::Ok);
    let status = stream.inflate(&compressed[6..], &mut out, Flush::NoFlush);
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(&out[..stream.next_out()], data);
    assert_eq!(stream.adler(), adler32(data));
}

#[test]
fn test_deflate_dictionary_sets_checksum() {
    let dictionary = b"abcabcabc";
    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(6), Status::Ok);
    assert_eq!(stream.deflate_set_dictionary(dictionary), Status::Ok);
    assert_eq!(stream.adler(), adler32(dictionary));

    let mut out = [0u8; 64];
    let status = stream.deflate(b"abcabc", &mut out, Flush::Finish);
    assert_eq!(status, Status::StreamEnd);
    // FDICT is set and the id follows the two header bytes
    assert_eq!(out[1] & 0x20, 0x20);
    assert_eq!(&out[2..6], &adler32(dictionary).to_be_bytes());
}

#[test]
fn test_raw_roundtrip() {
    let data = sample_text(10_000);
    for level in [0, 1, 9] {
        let mut stream = ZStream::new();
        assert_eq!(stream.deflate_init2(level, -15), Status::Ok);
        let mut compressed = Vec::new();
        deflate_step(&mut stream, &data, Flush::Finish, &mut compressed);
        assert_ne!(compressed[0], 0x78);
        assert_eq!(stream.adler(), 1);
        assert_eq!(inflate_bytewise(&compressed, -15), data);
    }
}

#[test]
fn test_small_windows() {
    let data = sample_text(20_000);
    for bits in [8, 9, 12] {
        let mut stream = ZStream::new();
        assert_eq!(stream.deflate_init2(6, bits), Status::Ok);
        let mut compressed = Vec::new();
        deflate_step(&mut stream, &data, Flush::Finish, &mut compressed);
        assert_eq!(compressed[0] >> 4, (bits - 8) as u8);

        let (decoded, status) = inflate_available(&compressed, bits);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(decoded, data);
    }
}

#[test]
fn test_window_larger_than_configured() {
    let compressed = compress(&sample_text(1000), 6).unwrap();
    let (decoded, status) = inflate_available(&compressed, 10);
    assert_eq!(status, Status::DataError);
    assert!(decoded.is_empty());

    let mut stream = ZStream::new();
    assert_eq!(stream.inflate_init(10), Status::Ok);
    let status = stream.inflate(&compressed, &mut [0u8; 16], Flush::NoFlush);
    assert_eq!(status, Status::DataError);
    assert_eq!(stream.message(), Some("invalid window size"));
}

#[test]
fn test_totals_are_monotonic() {
    let data = sample_text(50_000);
    let mut stream = ZStream::new();
    assert_eq!(stream.deflate_init(6), Status::Ok);
    let mut chunk = [0u8; 100];
    let mut pos = 0;
    let mut last = (0, 0);
    loop {
        let end = (pos + 333).min(data.len());
        let flush = if end == data.len() {
            Flush::Finish
        } else {
            Flush::NoFlush
        };
        let status = stream.deflate(&data[pos..end], &mut chunk, flush);
        pos += stream.next_in();
        let totals = (stream.total_in(), stream.total_out());
        assert!(totals.0 >= last.0 && totals.1 >= last.1);
        last = totals;
        if status == Status::StreamEnd {
            break;
        }
    }
    assert_eq!(last.0, data.len() as u64);
}
