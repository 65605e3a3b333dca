// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::min;

use crate::errors::{truncated_error, Result};

mod private {
    pub trait FetchBitsLtr {
        /// Get up-to 72 bits starting at the current position, left-aligned in a 128-bit word.
        /// Bits past the end of the source are zero.
        fn fetch_window(&self) -> u128;

        /// Get the number of bits left in the source.
        fn num_bits_left(&self) -> u64;

        /// Consume `num` bits from the source. `num` must not exceed the number of bits left.
        fn consume_bits(&mut self, num: u64);
    }
}

/// A `FiniteBitStream` is a bit stream that has a known length in bits.
pub trait FiniteBitStream {
    /// Gets the number of bits left unread.
    fn bits_left(&self) -> u64;
}

/// `ReadBitsLtr` reads bits from most-significant to least-significant.
pub trait ReadBitsLtr: private::FetchBitsLtr {
    /// Advances the stream to the next byte boundary. This is a no-op if the stream is already
    /// byte-aligned.
    fn realign(&mut self);

    /// Ignores the specified number of bits from the stream or returns an error. The stream is not
    /// advanced on error.
    #[inline(always)]
    fn ignore_bits(&mut self, num_bits: u32) -> Result<()> {
        self.ignore_bits_u64(u64::from(num_bits))
    }

    /// Ignores a potentially large number of bits from the stream or returns an error. The stream
    /// is not advanced on error.
    #[inline(always)]
    fn ignore_bits_u64(&mut self, num_bits: u64) -> Result<()> {
        if num_bits > self.num_bits_left() {
            return truncated_error();
        }
        self.consume_bits(num_bits);
        Ok(())
    }

    /// Ignores one bit from the stream or returns an error.
    #[inline(always)]
    fn ignore_bit(&mut self) -> Result<()> {
        self.ignore_bits(1)
    }

    /// Read a single bit as a boolean value or returns an error.
    #[inline(always)]
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits_leq32(1)? == 1)
    }

    /// Reads a single bit or returns an error.
    #[inline(always)]
    fn read_bit(&mut self) -> Result<u32> {
        self.read_bits_leq32(1)
    }

    /// Peeks up-to 32 bits without advancing the stream.
    ///
    /// Peeking never fails. If fewer than `bit_width` bits remain, the remaining bits are returned
    /// in the most-significant positions and the missing low bits are zero. It is the caller's
    /// responsibility to only consume the valid portion.
    #[inline(always)]
    fn peek_bits_leq32(&self, bit_width: u32) -> u32 {
        debug_assert!(bit_width <= u32::BITS);
        self.peek_bits_leq64(bit_width) as u32
    }

    /// Peeks up-to 64 bits without advancing the stream. See `peek_bits_leq32` for the behaviour
    /// at the end of the stream.
    #[inline(always)]
    fn peek_bits_leq64(&self, bit_width: u32) -> u64 {
        debug_assert!(bit_width <= u64::BITS);

        // A zero-width shift of a 128-bit word by 128 bits would panic.
        if bit_width == 0 {
            return 0;
        }

        (self.fetch_window() >> (u128::BITS - bit_width)) as u64
    }

    /// Reads up-to 32 bits and returns them as an unsigned integer or returns an error.
    #[inline(always)]
    fn read_bits_leq32(&mut self, bit_width: u32) -> Result<u32> {
        debug_assert!(bit_width <= u32::BITS);
        Ok(self.read_bits_leq64(bit_width)? as u32)
    }

    /// Reads up-to 32 bits and interprets them as a signed two's complement integer or returns an
    /// error.
    #[inline(always)]
    fn read_bits_leq32_signed(&mut self, bit_width: u32) -> Result<i32> {
        let value = self.read_bits_leq32(bit_width)?;

        if bit_width == 0 || bit_width == u32::BITS {
            return Ok(value as i32);
        }

        let shift = u32::BITS - bit_width;
        Ok(((value << shift) as i32) >> shift)
    }

    /// Reads up-to 64 bits and returns them as an unsigned integer or returns an error.
    #[inline(always)]
    fn read_bits_leq64(&mut self, bit_width: u32) -> Result<u64> {
        debug_assert!(bit_width <= u64::BITS);

        if u64::from(bit_width) > self.num_bits_left() {
            return truncated_error();
        }

        let bits = self.peek_bits_leq64(bit_width);
        self.consume_bits(u64::from(bit_width));

        Ok(bits)
    }

    /// Reads and returns a unary ones encoded integer or an error. The terminating zero bit is
    /// consumed.
    #[inline(always)]
    fn read_unary_ones(&mut self) -> Result<u32> {
        let mut num = 0;

        while self.read_bool()? {
            num += 1;
        }

        Ok(num)
    }

    /// Reads and returns a unary ones encoded integer, reading at most `max` one bits, or returns
    /// an error. If `max` one bits are read the terminating zero bit is not read.
    #[inline(always)]
    fn read_unary_ones_capped(&mut self, max: u32) -> Result<u32> {
        let mut num = 0;

        while num < max && self.read_bool()? {
            num += 1;
        }

        Ok(num)
    }
}

/// `BitCursor` reads bits from most-significant to least-significant from any `&[u8]`.
///
/// Stated another way, if N bits are read from a `BitCursor` then bit 0, the first bit read, is
/// the most-significant bit, and bit N-1, the last bit read, is the least-significant.
///
/// A `BitCursor` tracks an absolute bit offset into the buffer. The offset never exceeds the
/// length of the buffer in bits, and peeking never advances it.
#[derive(Clone)]
pub struct BitCursor<'a> {
    buf: &'a [u8],
    pos: u64,
    len: u64,
}

impl<'a> BitCursor<'a> {
    /// Instantiate a new `BitCursor` over the given buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BitCursor { buf, pos: 0, len: 8 * buf.len() as u64 }
    }

    /// Instantiate a new `BitCursor` over the first `len_bytes` bytes of the given buffer. If the
    /// buffer is shorter, the whole buffer is used.
    pub fn with_len(buf: &'a [u8], len_bytes: usize) -> Self {
        Self::new(&buf[..min(len_bytes, buf.len())])
    }

    /// Gets the current bit offset from the start of the buffer.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Gets the length of the buffer in bits.
    pub fn len_bits(&self) -> u64 {
        self.len
    }

    /// Returns true if the cursor is on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.pos & 0x7 == 0
    }

    /// Gets the underlying buffer.
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }
}

impl private::FetchBitsLtr for BitCursor<'_> {
    #[inline(always)]
    fn fetch_window(&self) -> u128 {
        let start = (self.pos >> 3) as usize;
        let end = min(self.buf.len(), start + 9);

        let mut bytes = [0u8; 16];

        if start < end {
            bytes[..end - start].copy_from_slice(&self.buf[start..end]);
        }

        u128::from_be_bytes(bytes) << (self.pos & 0x7)
    }

    #[inline(always)]
    fn num_bits_left(&self) -> u64 {
        self.len - self.pos
    }

    #[inline(always)]
    fn consume_bits(&mut self, num: u64) {
        debug_assert!(num <= self.len - self.pos);
        self.pos += num;
    }
}

impl ReadBitsLtr for BitCursor<'_> {
    #[inline(always)]
    fn realign(&mut self) {
        self.pos = min((self.pos + 7) & !0x7, self.len);
    }
}

impl FiniteBitStream for BitCursor<'_> {
    fn bits_left(&self) -> u64 {
        self.len - self.pos
    }
}

/// `BitWriterLtr` writes bits from most-significant to least-significant into a growable buffer.
///
/// It is the mirror of [`BitCursor`]: bits written with `write_bits_leq64(v, n)` are read back by
/// `read_bits_leq64(n)` as `v`.
#[derive(Default)]
pub struct BitWriterLtr {
    buf: Vec<u8>,
    n_bits: u64,
}

impl BitWriterLtr {
    /// Instantiate a new, empty, `BitWriterLtr`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets the number of bits written.
    pub fn bits_written(&self) -> u64 {
        self.n_bits
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, bit: bool) {
        if self.n_bits & 0x7 == 0 {
            self.buf.push(0);
        }

        if bit {
            if let Some(last) = self.buf.last_mut() {
                *last |= 0x80 >> (self.n_bits & 0x7);
            }
        }

        self.n_bits += 1;
    }

    /// Writes the low `bit_width` bits of `value`, most-significant bit first.
    pub fn write_bits_leq64(&mut self, value: u64, bit_width: u32) {
        debug_assert!(bit_width <= u64::BITS);

        for i in (0..bit_width).rev() {
            self.write_bool((value >> i) & 1 == 1);
        }
    }

    /// Writes the low `bit_width` bits of `value`, most-significant bit first.
    pub fn write_bits_leq32(&mut self, value: u32, bit_width: u32) {
        debug_assert!(bit_width <= u32::BITS);
        self.write_bits_leq64(u64::from(value), bit_width)
    }

    /// Writes a string of `0` and `1` characters. Any other character is ignored.
    pub fn write_bit_str(&mut self, bits: &str) {
        for c in bits.chars() {
            match c {
                '0' => self.write_bool(false),
                '1' => self.write_bool(true),
                _ => (),
            }
        }
    }

    /// Pads the buffer with zero bits up to the next byte boundary.
    pub fn realign(&mut self) {
        while self.n_bits & 0x7 != 0 {
            self.write_bool(false);
        }
    }

    /// Gets the bytes written so far. A partially written final byte is zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
