//! Deflate engine: LZ77 parsing over a sliding window plus block coding.
//!
//! [`DeflateState`] copies caller input into a window ring twice the size of
//! the match history, parses it into literal and match tokens, and encodes
//! closed blocks into a pending bit buffer that is drained into the caller's
//! output. Input is only accepted while the pending buffer is empty, so a
//! small output buffer throttles how much input each call consumes.

mod block;
mod matcher;

use block::{Token, write_block, write_sync_marker};
use matcher::{LevelConfig, Matcher, Strategy, TOO_FAR};

use crate::inflate::FDICT;
use crate::tables::{MAX_MATCH, MIN_MATCH};
use crate::zlib::ZlibLevel;
use zflate_core::adler32::{Adler32, adler32};
use zflate_core::bitstream::{BitWriter, InputCursor, OutputCursor};
use zflate_core::types::{CompressionLevel, Flush, Status, WindowBits, Wrapper};
use zflate_core::window::Window;

/// Lookahead needed before matching without a flush: one maximal match plus
/// the three bytes hashed after it.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Tokens buffered per block.
const TOKEN_LIMIT: usize = 16 * 1024;

/// Outcome of one compression pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Input ran out or the output filled up.
    NeedMore,
    /// A sync or full flush closed the current block.
    BlockDone,
    /// The final block is written but not yet fully drained.
    FinishStarted,
    /// The final block is written and drained.
    FinishDone,
}

/// Compression state attached to a stream.
#[derive(Debug)]
pub struct DeflateState {
    level: CompressionLevel,
    window_bits: WindowBits,
    window: Window,
    window_size: usize,
    matcher: Matcher,
    pending: BitWriter,
    tokens: Vec<Token>,
    /// Next position to parse.
    strstart: u64,
    /// First position covered by the open block.
    block_start: u64,
    /// Bytes covered by the buffered tokens.
    block_bytes: usize,
    match_length: usize,
    match_start: u64,
    match_available: bool,
    check: Option<Adler32>,
    dict_id: Option<u32>,
    started: bool,
    finishing: bool,
    trailer_written: bool,
    last_flush: Option<Flush>,
    message: Option<&'static str>,
}

impl DeflateState {
    /// Create an engine for `level` and `window_bits`.
    pub fn new(level: CompressionLevel, window_bits: WindowBits) -> Self {
        let window_size = window_bits.window_size();
        let config = LevelConfig::for_level(level.level());
        Self {
            level,
            window_bits,
            window: Window::new(window_size * 2),
            window_size,
            matcher: Matcher::new(window_size, config),
            pending: BitWriter::new(),
            tokens: Vec::with_capacity(TOKEN_LIMIT),
            strstart: 0,
            block_start: 0,
            block_bytes: 0,
            match_length: MIN_MATCH - 1,
            match_start: 0,
            match_available: false,
            check: (window_bits.wrapper() == Wrapper::Zlib).then(Adler32::new),
            dict_id: None,
            started: false,
            finishing: false,
            trailer_written: false,
            last_flush: None,
            message: None,
        }
    }

    /// Start a new stream with the same parameters.
    pub fn reset(&mut self) {
        self.window.reset();
        self.matcher.reset();
        self.pending.reset();
        self.tokens.clear();
        self.strstart = 0;
        self.block_start = 0;
        self.block_bytes = 0;
        self.match_length = MIN_MATCH - 1;
        self.match_start = 0;
        self.match_available = false;
        if let Some(check) = self.check.as_mut() {
            check.reset();
        }
        self.dict_id = None;
        self.started = false;
        self.finishing = false;
        self.trailer_written = false;
        self.last_flush = None;
        self.message = None;
    }

    /// Configured compression level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Configured window size and framing.
    pub fn window_bits(&self) -> WindowBits {
        self.window_bits
    }

    /// Diagnostic of the last usage error.
    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    /// Adler-32 exposed on the stream: the dictionary id until the header is
    /// written, then the checksum of the input consumed so far.
    pub fn check_value(&self) -> u32 {
        self.check.as_ref().map_or(1, Adler32::value)
    }

    /// True once the final block and trailer have been fully drained.
    pub fn is_finished(&self) -> bool {
        self.finishing && self.pending.is_drained() && self.trailer_done()
    }

    fn trailer_done(&self) -> bool {
        self.trailer_written || self.window_bits.wrapper() == Wrapper::Raw
    }

    /// Bytes in the window not yet parsed.
    fn lookahead(&self) -> usize {
        (self.window.total_written() - self.strstart) as usize
    }

    /// Preload match history; only valid before the first call to
    /// [`DeflateState::deflate`].
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Status {
        if self.started || self.window.total_written() != 0 {
            self.message = Some("dictionary must be set before compressing");
            return Status::StreamError;
        }

        let id = adler32(dictionary);
        let tail = &dictionary[dictionary.len().saturating_sub(self.window_size)..];
        self.window.write(tail);
        for pos in 0..tail.len() as u64 {
            self.matcher.insert(&self.window, pos);
        }
        self.strstart = self.window.total_written();
        self.block_start = self.strstart;

        if let Some(check) = self.check.as_mut() {
            *check = Adler32::from_value(id);
            self.dict_id = Some(id);
        }
        tracing::debug!(len = dictionary.len(), id, "deflate dictionary set");
        Status::Ok
    }

    /// Consume from `input`, emitting compressed bytes into `output`.
    pub fn deflate(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> Status {
        let flush = flush.normalized();
        if self.finishing && flush != Flush::Finish {
            self.message = Some("stream already finished");
            return Status::StreamError;
        }
        if output.remaining() == 0 {
            self.message = Some("no output space");
            return Status::BufError;
        }

        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        if !self.pending.is_drained() {
            self.pending.drain_into(output);
            if output.is_full() {
                // Let the next call repeat the same flush
                self.last_flush = None;
                return Status::Ok;
            }
        } else if input.is_empty()
            && old_flush.is_some_and(|old| flush <= old)
            && flush != Flush::Finish
        {
            return Status::BufError;
        }

        if self.finishing && !input.is_empty() {
            return Status::BufError;
        }

        if !self.started {
            self.started = true;
            if self.window_bits.wrapper() == Wrapper::Zlib {
                self.write_header();
                self.pending.drain_into(output);
                if output.is_full() {
                    self.last_flush = None;
                    return Status::Ok;
                }
            }
        }

        if !input.is_empty() || self.lookahead() != 0 || (flush != Flush::NoFlush && !self.finishing)
        {
            let state = self.compress(input, output, flush);
            if matches!(state, BlockState::FinishStarted | BlockState::FinishDone) {
                self.finishing = true;
            }
            match state {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if output.is_full() {
                        self.last_flush = None;
                    }
                    return Status::Ok;
                }
                BlockState::BlockDone => {
                    write_sync_marker(&mut self.pending);
                    if flush == Flush::FullFlush {
                        self.matcher.forget_before(self.strstart);
                    }
                    tracing::debug!(?flush, position = self.strstart, "flush point");
                    self.pending.drain_into(output);
                    if output.is_full() {
                        self.last_flush = None;
                        return Status::Ok;
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        if flush != Flush::Finish {
            return Status::Ok;
        }
        if self.trailer_done() {
            return Status::StreamEnd;
        }

        self.pending.align_to_byte();
        self.pending.write_bytes(&self.check_value().to_be_bytes());
        self.trailer_written = true;
        tracing::debug!(check = self.check_value(), "zlib trailer written");
        self.pending.drain_into(output);
        if self.pending.is_drained() {
            Status::StreamEnd
        } else {
            Status::Ok
        }
    }

    fn write_header(&mut self) {
        let cmf = ((self.window_bits.bits() - 8) << 4) | 8;
        let mut flg = (ZlibLevel::from_level(self.level.level()) as u8) << 6;
        if self.dict_id.is_some() {
            flg |= FDICT;
        }
        let header = (u16::from(cmf) << 8) | u16::from(flg);
        let header = header + (31 - header % 31);
        self.pending.write_bytes(&header.to_be_bytes());

        if let Some(id) = self.dict_id {
            self.pending.write_bytes(&id.to_be_bytes());
        }
        if let Some(check) = self.check.as_mut() {
            check.reset();
        }
        tracing::debug!(header, "zlib header written");
    }

    /// Move input into the window, keeping `window_size` bytes of history
    /// behind the parse position.
    fn fill_window(&mut self, input: &mut InputCursor<'_>) {
        let keep_from = self.strstart.saturating_sub(self.window_size as u64);
        let release = keep_from.saturating_sub(self.window.read_position());
        self.window.mark_read(release as usize);

        let chunk = input.take(self.window.free());
        self.window.write(chunk);
        if let Some(check) = self.check.as_mut() {
            check.update(chunk);
        }
    }

    /// Record a token; true when the block must be closed.
    fn tally(&mut self, token: Token) -> bool {
        self.block_bytes += token.span();
        self.tokens.push(token);
        self.tokens.len() >= TOKEN_LIMIT || self.block_bytes >= self.window_size - 1
    }

    /// Encode the open block into the pending buffer and drain what fits.
    fn flush_block(&mut self, output: &mut OutputCursor<'_>, last: bool) {
        let data: Vec<u8> = (0..self.block_bytes as u64)
            .map(|i| self.window.get(self.block_start + i))
            .collect();
        let compress = self.matcher.config().strategy != Strategy::Stored;
        let kind = write_block(&mut self.pending, &self.tokens, &data, last, compress);
        tracing::trace!(?kind, last, bytes = self.block_bytes, "block closed");

        self.block_start += self.block_bytes as u64;
        self.block_bytes = 0;
        self.tokens.clear();
        if last {
            self.pending.align_to_byte();
        }
        self.pending.drain_into(output);
    }

    /// Close the stream's last open block after the input is exhausted.
    fn finish_pass(&mut self, output: &mut OutputCursor<'_>, flush: Flush) -> BlockState {
        if flush == Flush::Finish {
            self.flush_block(output, true);
            return if output.is_full() {
                BlockState::FinishStarted
            } else {
                BlockState::FinishDone
            };
        }
        if self.block_bytes > 0 {
            self.flush_block(output, false);
            if output.is_full() {
                return BlockState::NeedMore;
            }
        }
        BlockState::BlockDone
    }

    fn compress(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> BlockState {
        match self.matcher.config().strategy {
            Strategy::Stored => self.compress_stored(input, output, flush),
            Strategy::Greedy => self.compress_greedy(input, output, flush),
            Strategy::Lazy => self.compress_lazy(input, output, flush),
        }
    }

    fn compress_stored(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> BlockState {
        let max_block = self.window_size - 1;
        loop {
            if self.lookahead() == 0 {
                self.fill_window(input);
                if self.lookahead() == 0 {
                    if flush == Flush::NoFlush {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            let take = self.lookahead().min(max_block - self.block_bytes);
            self.strstart += take as u64;
            self.block_bytes += take;
            if self.block_bytes == max_block {
                self.flush_block(output, false);
                if output.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }
        self.finish_pass(output, flush)
    }

    fn compress_greedy(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> BlockState {
        loop {
            if self.lookahead() < MIN_LOOKAHEAD {
                self.fill_window(input);
                if self.lookahead() < MIN_LOOKAHEAD && flush == Flush::NoFlush && input.is_empty()
                {
                    return BlockState::NeedMore;
                }
                if self.lookahead() == 0 {
                    break;
                }
            }

            let found = self
                .matcher
                .insert(&self.window, self.strstart)
                .filter(|&head| self.matcher.in_reach(self.strstart, head))
                .and_then(|head| {
                    self.matcher
                        .longest_match(&self.window, self.strstart, head, 0)
                });

            let full = if let Some((length, start)) = found {
                let full = self.tally(Token::Match {
                    length: length as u16,
                    distance: (self.strstart - start) as u16,
                });
                if length <= self.matcher.config().max_lazy {
                    for pos in self.strstart + 1..self.strstart + length as u64 {
                        self.matcher.insert(&self.window, pos);
                    }
                }
                self.strstart += length as u64;
                full
            } else {
                let byte = self.window.get(self.strstart);
                self.strstart += 1;
                self.tally(Token::Literal(byte))
            };

            if full {
                self.flush_block(output, false);
                if output.is_full() {
                    return BlockState::NeedMore;
                }
            }
        }
        self.finish_pass(output, flush)
    }

    fn compress_lazy(
        &mut self,
        input: &mut InputCursor<'_>,
        output: &mut OutputCursor<'_>,
        flush: Flush,
    ) -> BlockState {
        loop {
            if self.lookahead() < MIN_LOOKAHEAD {
                self.fill_window(input);
                if self.lookahead() < MIN_LOOKAHEAD && flush == Flush::NoFlush && input.is_empty()
                {
                    return BlockState::NeedMore;
                }
                if self.lookahead() == 0 {
                    break;
                }
            }

            let head = self.matcher.insert(&self.window, self.strstart);
            let prev_length = self.match_length;
            let prev_match = self.match_start;
            self.match_length = MIN_MATCH - 1;

            let candidate = head.filter(|&head| {
                prev_length < self.matcher.config().max_lazy
                    && self.matcher.in_reach(self.strstart, head)
            });
            if let Some((length, start)) = candidate.and_then(|head| {
                self.matcher
                    .longest_match(&self.window, self.strstart, head, prev_length)
            }) {
                self.match_length = length;
                self.match_start = start;
                if length == MIN_MATCH && self.strstart - start > TOO_FAR {
                    self.match_length = MIN_MATCH - 1;
                }
            }

            if prev_length >= MIN_MATCH && self.match_length <= prev_length {
                // The match found one byte earlier wins
                let scan = self.strstart - 1;
                let full = self.tally(Token::Match {
                    length: prev_length as u16,
                    distance: (scan - prev_match) as u16,
                });
                for pos in self.strstart + 1..scan + prev_length as u64 {
                    self.matcher.insert(&self.window, pos);
                }
                self.strstart = scan + prev_length as u64;
                self.match_available = false;
                self.match_length = MIN_MATCH - 1;

                if full {
                    self.flush_block(output, false);
                    if output.is_full() {
                        return BlockState::NeedMore;
                    }
                }
            } else if self.match_available {
                let byte = self.window.get(self.strstart - 1);
                let full = self.tally(Token::Literal(byte));
                self.strstart += 1;
                if full {
                    self.flush_block(output, false);
                    if output.is_full() {
                        return BlockState::NeedMore;
                    }
                }
            } else {
                self.match_available = true;
                self.strstart += 1;
            }
        }

        if self.match_available {
            let byte = self.window.get(self.strstart - 1);
            self.tally(Token::Literal(byte));
            self.match_available = false;
        }
        self.finish_pass(output, flush)
    }
}
