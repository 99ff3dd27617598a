//! Inflate engine: the zlib decompression automaton.
//!
//! [`InflateState`] walks the RFC 1950 framing one byte at a time
//!
//! ```text
//! Method -> Flag -> (Dict4 -> Dict3 -> Dict2 -> Dict1 -> Dict0 | Blocks)
//!        -> Blocks -> Check4 -> Check3 -> Check2 -> Check1 -> Done
//! ```
//!
//! and hands the DEFLATE payload to the block decoder. Any protocol violation
//! moves to the sticky [`InflateMode::Bad`] state. Raw streams start directly
//! in `Blocks` and end in `Done` without a trailer.

mod blocks;

use blocks::{BlockDecoder, BlockProgress};
use zflate_core::adler32::adler32;
use zflate_core::bitstream::{InputCursor, OutputCursor};
use zflate_core::types::{Flush, Status, WindowBits, Wrapper};

/// Marker value recorded when resynchronization will not be attempted.
pub const MARKER_NO_SYNC: u32 = 5;

/// Preset-dictionary bit of the FLG byte.
pub(crate) const FDICT: u8 = 0x20;

/// States of the inflate automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InflateMode {
    /// Waiting for the CMF byte.
    Method,
    /// Waiting for the FLG byte.
    Flag,
    /// Dictionary id, most significant byte.
    Dict4,
    /// Dictionary id, second byte.
    Dict3,
    /// Dictionary id, third byte.
    Dict2,
    /// Dictionary id, least significant byte.
    Dict1,
    /// Waiting for the caller to supply the preset dictionary.
    Dict0,
    /// Decoding DEFLATE blocks.
    Blocks,
    /// Trailer, most significant byte.
    Check4,
    /// Trailer, second byte.
    Check3,
    /// Trailer, third byte.
    Check2,
    /// Trailer, least significant byte.
    Check1,
    /// Stream complete.
    Done,
    /// Unrecoverable error.
    Bad,
}

/// Decompression state attached to a stream.
#[derive(Debug)]
pub struct InflateState {
    mode: InflateMode,
    window_bits: WindowBits,
    /// CMF byte of the header.
    method: u8,
    /// Dictionary id or trailer being assembled.
    need: u32,
    marker: u32,
    blocks: BlockDecoder,
    message: Option<&'static str>,
}

impl InflateState {
    /// Create an engine for the given window size and framing.
    pub fn new(window_bits: WindowBits) -> Self {
        let wrapped = window_bits.wrapper() == Wrapper::Zlib;
        Self {
            mode: Self::initial_mode(window_bits),
            window_bits,
            method: 0,
            need: 0,
            marker: 0,
            blocks: BlockDecoder::new(window_bits.bits(), wrapped),
            message: None,
        }
    }

    fn initial_mode(window_bits: WindowBits) -> InflateMode {
        match window_bits.wrapper() {
            Wrapper::Zlib => InflateMode::Method,
            Wrapper::Raw => InflateMode::Blocks,
        }
    }

    /// Start over on a new stream with the same parameters.
    pub fn reset(&mut self) {
        self.mode = Self::initial_mode(self.window_bits);
        self.method = 0;
        self.need = 0;
        self.marker = 0;
        self.message = None;
        self.blocks.reset();
    }

    /// Current automaton state.
    pub fn mode(&self) -> InflateMode {
        self.mode
    }

    /// Configured window size and framing.
    pub fn window_bits(&self) -> WindowBits {
        self.window_bits
    }

    /// Resynchronization marker (5 once the stream is known to be unusable).
    pub fn marker(&self) -> u32 {
        self.marker
    }

    /// Diagnostic of the last failure.
    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    /// Checksum to expose on the stream: the expected dictionary id while
    /// waiting for a dictionary, otherwise the Adler-32 of the output so far.
    pub fn check_value(&self) -> u32 {
        match self.mode {
            InflateMode::Dict0 => self.need,
            _ => self.blocks.check_value(),
        }
    }

    fn fail(&mut self, message: &'static str, marker: u32) {
        tracing::warn!(mode = ?self.mode, message, "inflate failed");
        self.mode = InflateMode::Bad;
        self.message = Some(message);
        self.marker = marker;
    }

    /// Supply the preset dictionary announced by the header.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Status {
        match self.mode {
            InflateMode::Dict0 => {
                let id = adler32(dictionary);
                if id != self.need {
                    tracing::warn!(expected = self.need, id, "dictionary id mismatch");
                    self.message = Some("incorrect dictionary");
                    return Status::DataError;
                }
                self.blocks.set_dictionary(dictionary);
                self.mode = InflateMode::Blocks;
                Status::Ok
            }
            InflateMode::Blocks
                if self.window_bits.wrapper() == Wrapper::Raw && self.blocks.is_pristine() =>
            {
                self.blocks.set_dictionary(dictionary);
                Status::Ok
            }
            _ => {
                self.message = Some("dictionary not expected");
                Status::StreamError
            }
        }
    }

    /// Consume from `input` and produce into `output`.
    ///
    /// A call that stops for lack of input or output space returns
    /// [`Status::Ok`], or [`Status::BufError`] if it made no progress at all
    /// or the caller asked to [`Flush::Finish`] an incomplete stream.
    pub fn inflate(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> Status {
        let before = (input.position(), output.position());
        let status = self.run(input, output);
        if status == Status::Ok {
            let stalled = before == (input.position(), output.position());
            if stalled || flush == Flush::Finish {
                return Status::BufError;
            }
        }
        status
    }

    fn next_byte(input: &mut InputCursor<'_>) -> Option<u8> {
        input.next_byte()
    }

    fn run(&mut self, input: &mut InputCursor<'_>, output: &mut OutputCursor<'_>) -> Status {
        loop {
            match self.mode {
                InflateMode::Method => {
                    let Some(cmf) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    self.method = cmf;
                    if cmf & 0x0F != 8 {
                        self.fail("unknown compression method", MARKER_NO_SYNC);
                        continue;
                    }
                    if (cmf >> 4) + 8 > self.window_bits.bits() {
                        self.fail("invalid window size", MARKER_NO_SYNC);
                        continue;
                    }
                    self.mode = InflateMode::Flag;
                }

                InflateMode::Flag => {
                    let Some(flg) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    if ((u32::from(self.method) << 8) + u32::from(flg)) % 31 != 0 {
                        self.fail("incorrect header check", MARKER_NO_SYNC);
                        continue;
                    }
                    tracing::debug!(cmf = self.method, flg, "zlib header");
                    self.mode = if flg & FDICT != 0 {
                        InflateMode::Dict4
                    } else {
                        InflateMode::Blocks
                    };
                }

                InflateMode::Dict4 | InflateMode::Dict3 | InflateMode::Dict2 => {
                    let Some(byte) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    self.need = (self.need << 8) | u32::from(byte);
                    self.mode = match self.mode {
                        InflateMode::Dict4 => InflateMode::Dict3,
                        InflateMode::Dict3 => InflateMode::Dict2,
                        _ => InflateMode::Dict1,
                    };
                }

                InflateMode::Dict1 => {
                    let Some(byte) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    self.need = (self.need << 8) | u32::from(byte);
                    self.mode = InflateMode::Dict0;
                    tracing::debug!(id = self.need, "stream needs a preset dictionary");
                    return Status::NeedDict;
                }

                InflateMode::Dict0 => {
                    self.fail("need dictionary", 0);
                    return Status::StreamError;
                }

                InflateMode::Blocks => match self.blocks.decode(input, output) {
                    Ok(BlockProgress::NeedInput | BlockProgress::NeedOutput) => {
                        return Status::Ok;
                    }
                    Ok(BlockProgress::Done) => {
                        self.need = 0;
                        self.mode = match self.window_bits.wrapper() {
                            Wrapper::Zlib => InflateMode::Check4,
                            Wrapper::Raw => InflateMode::Done,
                        };
                    }
                    Err(message) => {
                        self.fail(message, 0);
                    }
                },

                InflateMode::Check4 | InflateMode::Check3 | InflateMode::Check2 => {
                    let Some(byte) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    self.need = (self.need << 8) | u32::from(byte);
                    self.mode = match self.mode {
                        InflateMode::Check4 => InflateMode::Check3,
                        InflateMode::Check3 => InflateMode::Check2,
                        _ => InflateMode::Check1,
                    };
                }

                InflateMode::Check1 => {
                    let Some(byte) = Self::next_byte(input) else {
                        return Status::Ok;
                    };
                    self.need = (self.need << 8) | u32::from(byte);
                    let computed = self.blocks.check_value();
                    if self.need != computed {
                        tracing::warn!(expected = self.need, computed, "adler-32 mismatch");
                        self.fail("incorrect data check", MARKER_NO_SYNC);
                        continue;
                    }
                    tracing::debug!(check = computed, "stream complete");
                    self.mode = InflateMode::Done;
                }

                InflateMode::Done => return Status::StreamEnd,
                InflateMode::Bad => return Status::DataError,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut InflateState, data: &[u8], flush: Flush) -> (Status, usize, Vec<u8>) {
        let mut input = InputCursor::new(data);
        let mut out = vec![0u8; 1024];
        let mut output = OutputCursor::new(&mut out);
        let status = state.inflate(&mut input, &mut output, flush);
        let produced = output.written().to_vec();
        (status, input.position(), produced)
    }

    fn zlib_state() -> InflateState {
        InflateState::new(WindowBits::default())
    }

    // zlib.compress(b"a")
    const STREAM_A: [u8; 9] = [0x78, 0x9C, 0x4B, 0x04, 0x00, 0x00, 0x62, 0x00, 0x62];

    #[test]
    fn test_complete_stream() {
        let mut state = zlib_state();
        let (status, consumed, out) = feed(&mut state, &STREAM_A, Flush::NoFlush);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(consumed, STREAM_A.len());
        assert_eq!(out, b"a");
        assert_eq!(state.mode(), InflateMode::Done);
        assert_eq!(state.check_value(), 0x0062_0062);

        // Done is terminal and consumes nothing
        let (status, consumed, _) = feed(&mut state, &[1, 2, 3], Flush::NoFlush);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_header_states_are_resumable() {
        let mut state = zlib_state();
        let (status, consumed, _) = feed(&mut state, &STREAM_A[..1], Flush::NoFlush);
        assert_eq!(status, Status::Ok);
        assert_eq!(consumed, 1);
        assert_eq!(state.mode(), InflateMode::Flag);

        let (status, _, _) = feed(&mut state, &[], Flush::NoFlush);
        assert_eq!(status, Status::BufError);
        let (status, _, _) = feed(&mut state, &[], Flush::Finish);
        assert_eq!(status, Status::BufError);
        assert_eq!(state.mode(), InflateMode::Flag);

        let (status, _, out) = feed(&mut state, &STREAM_A[1..], Flush::NoFlush);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(out, b"a");
    }

    #[test]
    fn test_finish_on_incomplete_stream() {
        let mut state = zlib_state();
        let (status, consumed, _) = feed(&mut state, &STREAM_A[..4], Flush::Finish);
        assert_eq!(consumed, 4);
        assert_eq!(status, Status::BufError);

        let (status, _, _) = feed(&mut state, &STREAM_A[4..6], Flush::NoFlush);
        assert_eq!(status, Status::Ok);
    }

    #[test]
    fn test_unknown_method() {
        let mut state = zlib_state();
        let (status, consumed, _) = feed(&mut state, &[0x77, 0x9C, 0x4B], Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(consumed, 1);
        assert_eq!(state.message(), Some("unknown compression method"));
        assert_eq!(state.marker(), MARKER_NO_SYNC);

        // Bad is sticky and does not read input
        let (status, consumed, _) = feed(&mut state, &STREAM_A, Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_invalid_window_size() {
        let mut state = InflateState::new(WindowBits::from_raw(9).unwrap());
        let (status, _, _) = feed(&mut state, &STREAM_A, Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(state.message(), Some("invalid window size"));
    }

    #[test]
    fn test_incorrect_header_check() {
        let mut state = zlib_state();
        let (status, consumed, _) = feed(&mut state, &[0x78, 0x9D], Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(consumed, 2);
        assert_eq!(state.message(), Some("incorrect header check"));
    }

    #[test]
    fn test_incorrect_data_check() {
        let mut stream = STREAM_A;
        stream[8] ^= 0x01;
        let mut state = zlib_state();
        let (status, _, out) = feed(&mut state, &stream, Flush::NoFlush);
        assert_eq!(status, Status::DataError);
        assert_eq!(out, b"a");
        assert_eq!(state.message(), Some("incorrect data check"));
    }

    #[test]
    fn test_need_dictionary_flow() {
        // FDICT set: 0x78 0xBB, then the dictionary id of b"dict"
        let id = adler32(b"dict");
        let mut header = vec![0x78, 0xBB];
        header.extend_from_slice(&id.to_be_bytes());
        header.push(0x03);

        let mut state = zlib_state();
        let (status, consumed, _) = feed(&mut state, &header, Flush::NoFlush);
        assert_eq!(status, Status::NeedDict);
        assert_eq!(consumed, 6);
        assert_eq!(state.mode(), InflateMode::Dict0);
        assert_eq!(state.check_value(), id);

        assert_eq!(state.set_dictionary(b"wrong"), Status::DataError);
        assert_eq!(state.mode(), InflateMode::Dict0);
        assert_eq!(state.set_dictionary(b"dict"), Status::Ok);
        assert_eq!(state.mode(), InflateMode::Blocks);
    }

    #[test]
    fn test_need_dictionary_ignored() {
        let mut header = vec![0x78, 0xBB];
        header.extend_from_slice(&adler32(b"dict").to_be_bytes());

        let mut state = zlib_state();
        assert_eq!(feed(&mut state, &header, Flush::NoFlush).0, Status::NeedDict);
        let (status, _, _) = feed(&mut state, &[0x03, 0x00], Flush::NoFlush);
        assert_eq!(status, Status::StreamError);
        assert_eq!(state.mode(), InflateMode::Bad);
        assert_eq!(state.message(), Some("need dictionary"));
        assert_eq!(feed(&mut state, &[], Flush::NoFlush).0, Status::DataError);
    }

    #[test]
    fn test_raw_mode_and_reset() {
        let mut state = InflateState::new(WindowBits::from_raw(-15).unwrap());
        assert_eq!(state.mode(), InflateMode::Blocks);
        let (status, _, out) = feed(&mut state, &[0x4B, 0x04, 0x00], Flush::Finish);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(out, b"a");

        state.reset();
        assert_eq!(state.mode(), InflateMode::Blocks);
        let (status, _, out) = feed(&mut state, &[0x4B, 0x04, 0x00], Flush::NoFlush);
        assert_eq!(status, Status::StreamEnd);
        assert_eq!(out, b"a");
    }

    #[test]
    fn test_set_dictionary_out_of_place() {
        let mut state = zlib_state();
        assert_eq!(state.set_dictionary(b"dict"), Status::StreamError);
    }
}
