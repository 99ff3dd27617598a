//! Resumable DEFLATE block decoder.
//!
//! Decodes stored, fixed-Huffman and dynamic-Huffman blocks into the
//! sliding window and drains the window into the caller's output. Every
//! multi-bit field is read atomically: when the input runs dry the decoder
//! returns with its phase and bit accumulator intact, and the next call
//! resumes exactly where this one stopped.

use crate::huffman::{Decoded, HuffmanTable, build_table};
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_SYMBOLS, DISTANCE_BASE, DISTANCE_EXTRA, DISTANCE_SYMBOLS,
    END_OF_BLOCK, LENGTH_BASE, LENGTH_EXTRA, LITLEN_SYMBOLS, fixed_distance_table,
    fixed_litlen_table,
};
use zflate_core::adler32::Adler32;
use zflate_core::bitstream::{BitReader, InputCursor, OutputCursor};
use zflate_core::window::Window;

/// Why a decode call returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockProgress {
    /// All input was consumed mid-stream.
    NeedInput,
    /// The output buffer is full.
    NeedOutput,
    /// The final block was decoded and every byte has been drained.
    Done,
}

/// Diagnostic for corrupt block data.
pub(crate) type BlockResult = Result<BlockProgress, &'static str>;

/// Huffman codes of the block being decoded.
#[derive(Debug)]
enum Codes {
    Fixed,
    Dynamic(Box<(HuffmanTable, HuffmanTable)>),
}

impl Codes {
    fn litlen(&self) -> &HuffmanTable {
        match self {
            Codes::Fixed => fixed_litlen_table(),
            Codes::Dynamic(tables) => &tables.0,
        }
    }

    fn distance(&self) -> &HuffmanTable {
        match self {
            Codes::Fixed => fixed_distance_table(),
            Codes::Dynamic(tables) => &tables.1,
        }
    }
}

#[derive(Debug)]
enum Phase {
    /// 3-bit block header.
    Header,
    /// LEN and NLEN of a stored block.
    StoredLengths,
    /// Raw bytes of a stored block.
    Stored { remaining: usize },
    /// HLIT, HDIST and HCLEN of a dynamic block.
    TableSizes,
    /// 3-bit lengths of the code-length code.
    CodeLengthLengths {
        hlit: usize,
        hdist: usize,
        hclen: usize,
        index: usize,
        lengths: [u8; CODELEN_SYMBOLS],
    },
    /// Run-length coded literal/length and distance code lengths.
    CodeLengths {
        hlit: usize,
        hdist: usize,
        table: HuffmanTable,
        lengths: Vec<u8>,
    },
    /// Next literal/length symbol.
    Codes,
    /// Extra bits of a length symbol.
    LengthExtra { code: usize },
    /// Distance symbol.
    Distance { length: usize },
    /// Extra bits of a distance symbol.
    DistanceExtra { length: usize, code: usize },
    /// Back-reference copy waiting for window space.
    Copy { length: usize, distance: usize },
    /// Final block done; output still buffered in the window.
    Drain,
    /// Everything decoded and drained.
    Finished,
}

/// Resumable decoder for a sequence of DEFLATE blocks.
#[derive(Debug)]
pub(crate) struct BlockDecoder {
    phase: Phase,
    bits: BitReader,
    window: Window,
    codes: Codes,
    last: bool,
    check: Option<Adler32>,
}

/// Peek the next symbol of `table`, pulling input one byte at a time.
///
/// `Ok(None)` means the input ran out; nothing has been consumed.
fn peek_symbol(
    bits: &mut BitReader,
    input: &mut InputCursor<'_>,
    table: &HuffmanTable,
) -> Result<Option<(u16, u32)>, ()> {
    loop {
        match table.decode(bits.hold(), bits.bits_available()) {
            Decoded::Symbol { symbol, length } => return Ok(Some((symbol, length))),
            Decoded::Invalid => return Err(()),
            Decoded::NeedBits => {
                if !bits.pull_byte(input) {
                    return Ok(None);
                }
            }
        }
    }
}

/// Move buffered window bytes into `output`, folding them into `check`.
fn drain_window(window: &mut Window, output: &mut OutputCursor<'_>, check: Option<&mut Adler32>) {
    let out = output.unfilled();
    let n = window.drain(out);
    if let Some(check) = check {
        check.update(&out[..n]);
    }
    output.advance(n);
}

/// Phase following the end of a block.
fn end_of_block(codes: &mut Codes, last: bool) -> Phase {
    tracing::trace!(last, "end of block");
    *codes = Codes::Fixed;
    if last { Phase::Drain } else { Phase::Header }
}

/// Accept complete codes, plus the lone one-bit code RFC 1951 allows.
fn usable(table: &HuffmanTable) -> bool {
    table.is_complete() || table.max_length() <= 1
}

impl BlockDecoder {
    /// Create a decoder with a `2^window_bits` history.
    pub(crate) fn new(window_bits: u8, track_check: bool) -> Self {
        Self {
            phase: Phase::Header,
            bits: BitReader::new(),
            window: Window::with_bits(window_bits),
            codes: Codes::Fixed,
            last: false,
            check: track_check.then(Adler32::new),
        }
    }

    /// Return to the start of a block stream, keeping the window allocation.
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Header;
        self.bits.reset();
        self.window.reset();
        self.codes = Codes::Fixed;
        self.last = false;
        if let Some(check) = self.check.as_mut() {
            check.reset();
        }
    }

    /// Adler-32 of every byte drained so far.
    pub(crate) fn check_value(&self) -> u32 {
        self.check.as_ref().map_or(1, Adler32::value)
    }

    /// True before any block bit has been read.
    pub(crate) fn is_pristine(&self) -> bool {
        matches!(self.phase, Phase::Header)
            && self.bits.bit_position() == 0
            && self.window.total_written() == 0
    }

    /// Load a preset dictionary as back-reference history.
    pub(crate) fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.window.preload(dictionary);
    }

    /// Decode as much as the buffers allow.
    pub(crate) fn decode(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
    ) -> BlockResult {
        let progress = self.run(input, output);
        // Hand over whatever is ready, whichever way the call ends
        drain_window(&mut self.window, output, self.check.as_mut());
        progress
    }

    fn run(&mut self, input: &mut InputCursor<'_>, output: &mut OutputCursor<'_>) -> BlockResult {
        loop {
            let next = match &mut self.phase {
                Phase::Header => {
                    let Some(header) = self.bits.read_bits(input, 3) else {
                        return Ok(BlockProgress::NeedInput);
                    };
                    self.last = header & 1 == 1;
                    match header >> 1 {
                        0 => {
                            tracing::trace!(last = self.last, "stored block");
                            self.bits.align_to_byte();
                            Phase::StoredLengths
                        }
                        1 => {
                            tracing::trace!(last = self.last, "fixed block");
                            self.codes = Codes::Fixed;
                            Phase::Codes
                        }
                        2 => {
                            tracing::trace!(last = self.last, "dynamic block");
                            Phase::TableSizes
                        }
                        _ => return Err("invalid block type"),
                    }
                }

                Phase::StoredLengths => {
                    let Some(lengths) = self.bits.read_bits(input, 32) else {
                        return Ok(BlockProgress::NeedInput);
                    };
                    let len = lengths & 0xFFFF;
                    if len != !(lengths >> 16) & 0xFFFF {
                        return Err("invalid stored block lengths");
                    }
                    debug_assert_eq!(self.bits.bits_available(), 0);
                    if len == 0 {
                        end_of_block(&mut self.codes, self.last)
                    } else {
                        Phase::Stored {
                            remaining: len as usize,
                        }
                    }
                }

                Phase::Stored { remaining } => {
                    while *remaining > 0 {
                        if self.window.free() == 0 {
                            drain_window(&mut self.window, output, self.check.as_mut());
                            if self.window.free() == 0 {
                                return Ok(BlockProgress::NeedOutput);
                            }
                        }
                        let chunk = input.take((*remaining).min(self.window.free()));
                        if chunk.is_empty() {
                            return Ok(BlockProgress::NeedInput);
                        }
                        self.window.write(chunk);
                        *remaining -= chunk.len();
                    }
                    end_of_block(&mut self.codes, self.last)
                }

                Phase::TableSizes => {
                    let Some(sizes) = self.bits.read_bits(input, 14) else {
                        return Ok(BlockProgress::NeedInput);
                    };
                    let hlit = (sizes & 0x1F) as usize + 257;
                    let hdist = ((sizes >> 5) & 0x1F) as usize + 1;
                    let hclen = ((sizes >> 10) & 0xF) as usize + 4;
                    if hlit > LITLEN_SYMBOLS || hdist > DISTANCE_SYMBOLS {
                        return Err("too many length or distance symbols");
                    }
                    Phase::CodeLengthLengths {
                        hlit,
                        hdist,
                        hclen,
                        index: 0,
                        lengths: [0; CODELEN_SYMBOLS],
                    }
                }

                Phase::CodeLengthLengths {
                    hlit,
                    hdist,
                    hclen,
                    index,
                    lengths,
                } => {
                    while *index < *hclen {
                        let Some(len) = self.bits.read_bits(input, 3) else {
                            return Ok(BlockProgress::NeedInput);
                        };
                        lengths[CODE_LENGTH_ORDER[*index]] = len as u8;
                        *index += 1;
                    }
                    let table = match build_table(lengths.as_slice()) {
                        Ok(table) if table.is_complete() => table,
                        _ => return Err("invalid code lengths set"),
                    };
                    Phase::CodeLengths {
                        hlit: *hlit,
                        hdist: *hdist,
                        table,
                        lengths: Vec::with_capacity(*hlit + *hdist),
                    }
                }

                Phase::CodeLengths {
                    hlit,
                    hdist,
                    table,
                    lengths,
                } => {
                    let total = *hlit + *hdist;
                    while lengths.len() < total {
                        let (symbol, len) = match peek_symbol(&mut self.bits, input, table) {
                            Ok(Some(found)) => found,
                            Ok(None) => return Ok(BlockProgress::NeedInput),
                            Err(()) => return Err("invalid code lengths set"),
                        };
                        if symbol < 16 {
                            self.bits.consume(len);
                            lengths.push(symbol as u8);
                            continue;
                        }

                        let (extra, base) = match symbol {
                            16 => (2, 3),
                            17 => (3, 3),
                            _ => (7, 11),
                        };
                        if !self.bits.need(input, len + extra) {
                            return Ok(BlockProgress::NeedInput);
                        }
                        self.bits.consume(len);
                        let count = base + self.bits.peek(extra) as usize;
                        self.bits.consume(extra);

                        let value = if symbol == 16 {
                            match lengths.last() {
                                Some(&previous) => previous,
                                None => return Err("invalid bit length repeat"),
                            }
                        } else {
                            0
                        };
                        if lengths.len() + count > total {
                            return Err("invalid bit length repeat");
                        }
                        lengths.resize(lengths.len() + count, value);
                    }

                    if lengths[END_OF_BLOCK as usize] == 0 {
                        return Err("invalid code -- missing end-of-block");
                    }
                    let litlen = match build_table(&lengths[..*hlit]) {
                        Ok(table) if usable(&table) => table,
                        _ => return Err("invalid literal/lengths set"),
                    };
                    let distance = match build_table(&lengths[*hlit..]) {
                        Ok(table) if usable(&table) => table,
                        _ => return Err("invalid distances set"),
                    };
                    self.codes = Codes::Dynamic(Box::new((litlen, distance)));
                    Phase::Codes
                }

                Phase::Codes => loop {
                    if self.window.free() == 0 {
                        drain_window(&mut self.window, output, self.check.as_mut());
                        if self.window.free() == 0 {
                            return Ok(BlockProgress::NeedOutput);
                        }
                    }
                    let (symbol, len) =
                        match peek_symbol(&mut self.bits, input, self.codes.litlen()) {
                            Ok(Some(found)) => found,
                            Ok(None) => return Ok(BlockProgress::NeedInput),
                            Err(()) => return Err("invalid literal/length code"),
                        };
                    self.bits.consume(len);
                    match symbol {
                        0..=255 => self.window.write_byte(symbol as u8),
                        END_OF_BLOCK => break end_of_block(&mut self.codes, self.last),
                        257..=285 => {
                            break Phase::LengthExtra {
                                code: usize::from(symbol - 257),
                            };
                        }
                        _ => return Err("invalid literal/length code"),
                    }
                },

                Phase::LengthExtra { code } => {
                    let Some(extra) = self.bits.read_bits(input, u32::from(LENGTH_EXTRA[*code]))
                    else {
                        return Ok(BlockProgress::NeedInput);
                    };
                    Phase::Distance {
                        length: LENGTH_BASE[*code] as usize + extra as usize,
                    }
                }

                Phase::Distance { length } => {
                    let (symbol, len) =
                        match peek_symbol(&mut self.bits, input, self.codes.distance()) {
                            Ok(Some(found)) => found,
                            Ok(None) => return Ok(BlockProgress::NeedInput),
                            Err(()) => return Err("invalid distance code"),
                        };
                    if usize::from(symbol) >= DISTANCE_SYMBOLS {
                        return Err("invalid distance code");
                    }
                    self.bits.consume(len);
                    Phase::DistanceExtra {
                        length: *length,
                        code: usize::from(symbol),
                    }
                }

                Phase::DistanceExtra { length, code } => {
                    let Some(extra) =
                        self.bits.read_bits(input, u32::from(DISTANCE_EXTRA[*code]))
                    else {
                        return Ok(BlockProgress::NeedInput);
                    };
                    let distance = DISTANCE_BASE[*code] as usize + extra as usize;
                    if distance > self.window.history_len() {
                        return Err("invalid distance too far back");
                    }
                    Phase::Copy {
                        length: *length,
                        distance,
                    }
                }

                Phase::Copy { length, distance } => {
                    while *length > 0 {
                        if self.window.free() == 0 {
                            drain_window(&mut self.window, output, self.check.as_mut());
                            if self.window.free() == 0 {
                                return Ok(BlockProgress::NeedOutput);
                            }
                        }
                        let copied = self
                            .window
                            .copy_match(*distance, *length)
                            .map_err(|_| "invalid distance too far back")?;
                        *length -= copied;
                    }
                    Phase::Codes
                }

                Phase::Drain => {
                    drain_window(&mut self.window, output, self.check.as_mut());
                    if self.window.unread() > 0 {
                        return Ok(BlockProgress::NeedOutput);
                    }
                    Phase::Finished
                }

                Phase::Finished => return Ok(BlockProgress::Done),
            };
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8]) -> Result<Vec<u8>, &'static str> {
        let mut decoder = BlockDecoder::new(15, false);
        let mut input = InputCursor::new(data);
        let mut out = vec![0u8; 1 << 16];
        let mut output = OutputCursor::new(&mut out);
        match decoder.decode(&mut input, &mut output)? {
            BlockProgress::Done => {}
            other => panic!("unexpected {:?}", other),
        }
        let n = output.position();
        out.truncate(n);
        Ok(out)
    }

    #[test]
    fn test_stored_block() {
        let data = [0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c'];
        assert_eq!(decode_all(&data).unwrap(), b"abc");
    }

    #[test]
    fn test_fixed_block() {
        // "a" as a fixed block, as produced by common encoders
        let data = [0x4B, 0x04, 0x00];
        assert_eq!(decode_all(&data).unwrap(), b"a");
    }

    #[test]
    fn test_fixed_block_with_match() {
        // "abcabcabc": four literals then <length 5, distance 3>
        let data = [0x4B, 0x4C, 0x4A, 0x4E, 0x04, 0x23, 0x00];
        assert_eq!(decode_all(&data).unwrap(), b"abcabcabc");
    }

    #[test]
    fn test_invalid_block_type() {
        assert_eq!(decode_all(&[0x07]), Err("invalid block type"));
    }

    #[test]
    fn test_invalid_stored_lengths() {
        let data = [0x01, 0x03, 0x00, 0x00, 0x00];
        assert_eq!(decode_all(&data), Err("invalid stored block lengths"));
    }

    #[test]
    fn test_distance_too_far_back() {
        // Fixed block starting with a match: length 3, distance 1, before any literal
        let data = [0x03, 0x02];
        assert_eq!(decode_all(&data), Err("invalid distance too far back"));
    }

    #[test]
    fn test_resumes_byte_by_byte() {
        let data = [0x4B, 0x4C, 0x4A, 0x4E, 0x04, 0x23, 0x00];
        let mut decoder = BlockDecoder::new(15, true);
        let mut produced = Vec::new();
        let mut status = BlockProgress::NeedInput;

        for byte in data.iter() {
            let mut input = InputCursor::new(std::slice::from_ref(byte));
            loop {
                let mut out = [0u8; 1];
                let mut output = OutputCursor::new(&mut out);
                status = decoder.decode(&mut input, &mut output).unwrap();
                produced.extend_from_slice(output.written());
                if status != BlockProgress::NeedOutput {
                    break;
                }
            }
        }
        assert_eq!(status, BlockProgress::Done);
        assert_eq!(produced, b"abcabcabc");
        assert_eq!(decoder.check_value(), zflate_core::adler32(b"abcabcabc"));
    }
}
