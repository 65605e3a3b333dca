// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audio Data Transport Stream (ADTS) frame headers.

use mediatag_core::audio::Channels;
use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::{BitCursor, ReadBitsLtr};

use log::debug;

use crate::common::{map_channel_config, M4AType, AAC_SAMPLE_RATES};

/// The fixed and variable ADTS header words.
///
/// `h1` holds the first 16 bits: syncword, ID, layer, and protection_absent. `h2` holds the
/// remaining 40 header bits in its upper bits followed by the 16-bit CRC in its low bits, so every
/// field sits at the same position whether or not a CRC is present.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdtsHeader {
    pub h1: u16,
    pub h2: u64,
}

impl AdtsHeader {
    /// The size of a header without CRC.
    pub const MIN_SIZE: usize = 7;

    /// The size of a header with CRC.
    pub const MAX_SIZE: usize = 9;

    /// Read an ADTS header from the start of a buffer.
    pub fn read(buf: &[u8]) -> Result<AdtsHeader> {
        Self::parse(&mut BitCursor::new(buf))
    }

    /// Parse an ADTS header at the cursor position. On success the cursor is positioned at the
    /// start of the first raw data block.
    pub fn parse(bs: &mut BitCursor<'_>) -> Result<AdtsHeader> {
        let h1 = bs.read_bits_leq32(16)? as u16;

        // Syncword and layer.
        if h1 & 0xfff6 != 0xfff0 {
            return invalid_data_error("adts: invalid frame sync");
        }

        let mut header = AdtsHeader { h1, h2: 0 };

        header.h2 = if header.has_crc() {
            bs.read_bits_leq64(56)?
        }
        else {
            bs.read_bits_leq64(40)? << 16
        };

        if header.total_size() < header.header_size() {
            return invalid_data_error("adts: frame length less than header size");
        }

        debug!(
            "adts: aot={}, sfi={}, channel_config={}, total_size={}, crc={}",
            header.audio_object_id(),
            header.sampling_frequency_index(),
            header.channel_config(),
            header.total_size(),
            header.has_crc()
        );

        Ok(header)
    }

    /// Returns true if the ID bit signals MPEG-4, false for MPEG-2.
    pub fn is_mpeg4(&self) -> bool {
        self.h1 & 0x8 == 0
    }

    /// Returns true if protection_absent is clear.
    pub fn has_crc(&self) -> bool {
        self.h1 & 0x1 == 0
    }

    /// Gets the audio object type, that is, the profile plus 1.
    pub fn audio_object_id(&self) -> u8 {
        ((self.h2 >> 54) & 0x3) as u8 + 1
    }

    pub fn object_type(&self) -> M4AType {
        M4AType::from_object_type(u32::from(self.audio_object_id()))
    }

    pub fn sampling_frequency_index(&self) -> u8 {
        ((self.h2 >> 50) & 0xf) as u8
    }

    /// Gets the sample rate, or 0 if the sampling frequency index is reserved.
    pub fn sample_rate(&self) -> u32 {
        AAC_SAMPLE_RATES[usize::from(self.sampling_frequency_index())]
    }

    pub fn is_private(&self) -> bool {
        (self.h2 >> 49) & 0x1 == 1
    }

    pub fn channel_config(&self) -> u8 {
        ((self.h2 >> 46) & 0x7) as u8
    }

    pub fn channels(&self) -> Option<Channels> {
        map_channel_config(self.channel_config())
    }

    pub fn is_original(&self) -> bool {
        (self.h2 >> 45) & 0x1 == 1
    }

    pub fn is_home(&self) -> bool {
        (self.h2 >> 44) & 0x1 == 1
    }

    /// Gets the frame length including the header.
    pub fn total_size(&self) -> usize {
        ((self.h2 >> 29) & 0x1fff) as usize
    }

    pub fn header_size(&self) -> usize {
        if self.has_crc() {
            Self::MAX_SIZE
        }
        else {
            Self::MIN_SIZE
        }
    }

    /// Gets the size of the raw data blocks following the header.
    pub fn data_size(&self) -> usize {
        self.total_size().saturating_sub(self.header_size())
    }

    /// Gets the buffer fullness. 0x7ff signals a variable bitrate stream.
    pub fn buffer_fullness(&self) -> u16 {
        ((self.h2 >> 18) & 0x7ff) as u16
    }

    /// Gets the number of raw data blocks in the frame.
    pub fn frame_count(&self) -> u8 {
        ((self.h2 >> 16) & 0x3) as u8 + 1
    }

    pub fn crc(&self) -> Option<u16> {
        if self.has_crc() {
            Some(self.h2 as u16)
        }
        else {
            None
        }
    }
}

/// Gets the offset of the first ADTS syncword in `buf`.
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w[0] == 0xff && w[1] & 0xf6 == 0xf0)
}

/// An iterator over the ADTS frames of a contiguous buffer. Yields each header with the frame's
/// payload. Iteration stops at the first frame that does not fit in the buffer, or on the first
/// error.
pub struct AdtsFrames<'a> {
    buf: &'a [u8],
    failed: bool,
}

impl<'a> AdtsFrames<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        AdtsFrames { buf, failed: false }
    }
}

impl<'a> Iterator for AdtsFrames<'a> {
    type Item = Result<(AdtsHeader, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.len() < AdtsHeader::MIN_SIZE {
            return None;
        }

        let header = match AdtsHeader::read(self.buf) {
            Ok(header) => header,
            Err(err) => {
                self.failed = true;
                return Some(Err(err));
            }
        };

        if header.total_size() > self.buf.len() {
            return None;
        }

        let payload = &self.buf[header.header_size()..header.total_size()];
        self.buf = &self.buf[header.total_size()..];

        Some(Ok((header, payload)))
    }
}
