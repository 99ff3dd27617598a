//! Block emission: token buffer costs and stored/fixed/dynamic encodings.

use crate::huffman::{MAX_CODE_BITS, MAX_CODELEN_BITS, build_lengths, canonical_codes};
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_SYMBOLS, DISTANCE_BASE, DISTANCE_EXTRA, DISTANCE_SYMBOLS,
    END_OF_BLOCK, LENGTH_BASE, LENGTH_EXTRA, LITLEN_SYMBOLS, distance_code,
    fixed_distance_lengths, fixed_litlen_lengths, length_code,
};
use zflate_core::bitstream::BitWriter;

/// A literal or a back-reference found by the match finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// A literal byte.
    Literal(u8),
    /// Copy `length` (3-258) bytes from `distance` (1-32767) back.
    Match {
        /// Number of bytes to copy.
        length: u16,
        /// Distance back into the history.
        distance: u16,
    },
}

impl Token {
    /// Uncompressed bytes this token stands for.
    pub(crate) fn span(self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Match { length, .. } => usize::from(length),
        }
    }
}

/// Encoding chosen for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Stored,
    Fixed,
    Dynamic,
}

/// Literal/length and distance code lengths of one block.
struct Codes {
    litlen: Vec<u8>,
    distance: Vec<u8>,
}

/// A dynamic block header, ready to be written.
struct DynamicHeader {
    hlit: usize,
    hdist: usize,
    hclen: usize,
    codelen_lengths: Vec<u8>,
    /// Run-length coded code lengths as (symbol, extra value).
    runs: Vec<(u8, u8)>,
}

impl DynamicHeader {
    fn new(codes: &Codes) -> Self {
        let hlit = last_used(&codes.litlen).max(257);
        let hdist = last_used(&codes.distance).max(1);

        let mut combined = Vec::with_capacity(hlit + hdist);
        combined.extend_from_slice(&codes.litlen[..hlit]);
        combined.extend_from_slice(&codes.distance[..hdist]);
        let runs = encode_lengths(&combined);

        let mut freqs = [0u32; CODELEN_SYMBOLS];
        for &(symbol, _) in &runs {
            freqs[usize::from(symbol)] += 1;
        }
        let codelen_lengths = build_lengths(&freqs, MAX_CODELEN_BITS);
        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&s| codelen_lengths[s] != 0)
            .map_or(4, |i| (i + 1).max(4));

        Self {
            hlit,
            hdist,
            hclen,
            codelen_lengths,
            runs,
        }
    }

    fn cost(&self) -> u64 {
        let mut bits = 5 + 5 + 4 + 3 * self.hclen as u64;
        for &(symbol, _) in &self.runs {
            bits += u64::from(self.codelen_lengths[usize::from(symbol)]);
            bits += u64::from(repeat_extra_bits(symbol));
        }
        bits
    }

    fn write(&self, out: &mut BitWriter) {
        out.write_bits((self.hlit - 257) as u32, 5);
        out.write_bits((self.hdist - 1) as u32, 5);
        out.write_bits((self.hclen - 4) as u32, 4);
        for &symbol in &CODE_LENGTH_ORDER[..self.hclen] {
            out.write_bits(u32::from(self.codelen_lengths[symbol]), 3);
        }
        let codes = canonical_codes(&self.codelen_lengths);
        for &(symbol, extra) in &self.runs {
            let s = usize::from(symbol);
            out.write_bits(u32::from(codes[s]), u32::from(self.codelen_lengths[s]));
            out.write_bits(u32::from(extra), u32::from(repeat_extra_bits(symbol)));
        }
    }
}

fn last_used(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

fn repeat_extra_bits(symbol: u8) -> u8 {
    match symbol {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0,
    }
}

/// Run-length code a code-length sequence with repeat symbols 16, 17 and 18.
fn encode_lengths(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        let mut left = run;
        if len == 0 {
            while left >= 11 {
                let n = left.min(138);
                runs.push((18, (n - 11) as u8));
                left -= n;
            }
            if left >= 3 {
                runs.push((17, (left - 3) as u8));
                left = 0;
            }
            runs.extend(std::iter::repeat_n((0, 0), left));
        } else {
            runs.push((len, 0));
            left -= 1;
            while left >= 3 {
                let n = left.min(6);
                runs.push((16, (n - 3) as u8));
                left -= n;
            }
            runs.extend(std::iter::repeat_n((len, 0), left));
        }
        i += run;
    }
    runs
}

fn symbol_frequencies(tokens: &[Token]) -> ([u32; LITLEN_SYMBOLS], [u32; DISTANCE_SYMBOLS]) {
    let mut litlen = [0u32; LITLEN_SYMBOLS];
    let mut distance = [0u32; DISTANCE_SYMBOLS];
    for token in tokens {
        match *token {
            Token::Literal(byte) => litlen[usize::from(byte)] += 1,
            Token::Match { length, distance: d } => {
                litlen[257 + length_code(usize::from(length))] += 1;
                distance[distance_code(usize::from(d))] += 1;
            }
        }
    }
    litlen[usize::from(END_OF_BLOCK)] += 1;
    (litlen, distance)
}

/// Bits needed to code `tokens` plus the end-of-block symbol.
fn data_cost(tokens: &[Token], codes: &Codes) -> u64 {
    let mut bits = u64::from(codes.litlen[usize::from(END_OF_BLOCK)]);
    for token in tokens {
        bits += match *token {
            Token::Literal(byte) => u64::from(codes.litlen[usize::from(byte)]),
            Token::Match { length, distance } => {
                let lc = length_code(usize::from(length));
                let dc = distance_code(usize::from(distance));
                u64::from(codes.litlen[257 + lc])
                    + u64::from(LENGTH_EXTRA[lc])
                    + u64::from(codes.distance[dc])
                    + u64::from(DISTANCE_EXTRA[dc])
            }
        };
    }
    bits
}

fn write_tokens(out: &mut BitWriter, tokens: &[Token], codes: &Codes) {
    let litlen = canonical_codes(&codes.litlen);
    let distance = canonical_codes(&codes.distance);
    let put = |out: &mut BitWriter, table: &[u16], lengths: &[u8], symbol: usize| {
        out.write_bits(u32::from(table[symbol]), u32::from(lengths[symbol]));
    };

    for token in tokens {
        match *token {
            Token::Literal(byte) => put(out, &litlen, &codes.litlen, usize::from(byte)),
            Token::Match {
                length,
                distance: d,
            } => {
                let lc = length_code(usize::from(length));
                put(out, &litlen, &codes.litlen, 257 + lc);
                out.write_bits(
                    u32::from(length - LENGTH_BASE[lc]),
                    u32::from(LENGTH_EXTRA[lc]),
                );
                let dc = distance_code(usize::from(d));
                put(out, &distance, &codes.distance, dc);
                out.write_bits(
                    u32::from(d - DISTANCE_BASE[dc]),
                    u32::from(DISTANCE_EXTRA[dc]),
                );
            }
        }
    }
    put(out, &litlen, &codes.litlen, usize::from(END_OF_BLOCK));
}

/// Write one stored block header and payload (at most 65535 bytes).
fn write_stored(out: &mut BitWriter, data: &[u8], last: bool) {
    debug_assert!(data.len() <= 0xFFFF);
    out.write_bits(u32::from(last), 3);
    out.align_to_byte();
    let len = data.len() as u16;
    out.write_bytes(&len.to_le_bytes());
    out.write_bytes(&(!len).to_le_bytes());
    out.write_bytes(data);
}

/// Write the empty stored block that byte-aligns a sync or full flush.
pub(crate) fn write_sync_marker(out: &mut BitWriter) {
    write_stored(out, &[], false);
}

/// Encode one block, choosing the cheapest of the three encodings.
///
/// `data` holds the uncompressed bytes the tokens stand for. With
/// `compress` unset the block is always stored.
pub(crate) fn write_block(
    out: &mut BitWriter,
    tokens: &[Token],
    data: &[u8],
    last: bool,
    compress: bool,
) -> BlockKind {
    let pad = u64::from((8 - (out.partial_bits() + 3) % 8) % 8);
    let stored_cost = 3 + pad + 32 + 8 * data.len() as u64;
    if !compress {
        write_stored(out, data, last);
        return BlockKind::Stored;
    }

    let fixed = Codes {
        litlen: fixed_litlen_lengths().to_vec(),
        distance: fixed_distance_lengths().to_vec(),
    };
    let fixed_cost = 3 + data_cost(tokens, &fixed);

    let (litlen_freqs, distance_freqs) = symbol_frequencies(tokens);
    let dynamic = Codes {
        litlen: build_lengths(&litlen_freqs, MAX_CODE_BITS as u8),
        distance: build_lengths(&distance_freqs, MAX_CODE_BITS as u8),
    };
    let header = DynamicHeader::new(&dynamic);
    let dynamic_cost = 3 + header.cost() + data_cost(tokens, &dynamic);

    tracing::trace!(
        tokens = tokens.len(),
        bytes = data.len(),
        stored_cost,
        fixed_cost,
        dynamic_cost,
        "block costs"
    );

    if stored_cost <= fixed_cost.min(dynamic_cost) {
        write_stored(out, data, last);
        BlockKind::Stored
    } else if fixed_cost <= dynamic_cost {
        out.write_bits(u32::from(last) | 0b010, 3);
        write_tokens(out, tokens, &fixed);
        BlockKind::Fixed
    } else {
        out.write_bits(u32::from(last) | 0b100, 3);
        header.write(out);
        write_tokens(out, tokens, &dynamic);
        BlockKind::Dynamic
    }
}
