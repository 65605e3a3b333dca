// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::*;
use crate::aac::ics::ltp::{LtpData, Predictor};
use crate::aac::AacSetup;
use crate::common::M4AType;

use log::debug;

/// Individual channel stream information. ISO/IEC 14496-3 section 4.6.2, Table 4.6.
#[derive(Clone, Debug)]
pub struct IcsInfo {
    pub window_sequence: WindowSequence,
    pub prev_window_sequence: WindowSequence,
    pub window_shape: bool,
    pub max_sfb: usize,
    /// The raw 7 bit grouping field of an eight short sequence.
    pub scale_factor_grouping: u8,
    pub predictor_data_present: bool,
    pub predictor: Option<Predictor>,
    pub ltp: Option<LtpData>,
    /// The second channel's long term prediction data of a channel pair with a common window.
    pub ltp2: Option<LtpData>,
    pub window_count: usize,
    pub window_group_count: usize,
    pub window_group_lengths: [usize; MAX_WINDOWS],
    pub swb_count: usize,
    /// Scalefactor band offsets of one window, `swb_count + 1` entries.
    pub swb_offset: &'static [usize],
    /// Number of spectral coefficients in one window.
    pub max_swb_offset: usize,
    /// Scalefactor band offsets of each window group, scaled by the number of windows in the
    /// group. These index the group interleaved spectral coefficients of a group.
    pub section_sfb_offset: [[usize; MAX_SFB + 1]; MAX_WINDOWS],
}

impl Default for IcsInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl IcsInfo {
    pub fn new() -> Self {
        IcsInfo {
            window_sequence: WindowSequence::OnlyLong,
            prev_window_sequence: WindowSequence::OnlyLong,
            window_shape: false,
            max_sfb: 0,
            scale_factor_grouping: 0,
            predictor_data_present: false,
            predictor: None,
            ltp: None,
            ltp2: None,
            window_count: 1,
            window_group_count: 1,
            window_group_lengths: [1, 0, 0, 0, 0, 0, 0, 0],
            swb_count: 0,
            swb_offset: &[],
            max_swb_offset: 0,
            section_sfb_offset: [[0; MAX_SFB + 1]; MAX_WINDOWS],
        }
    }

    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        setup: &AacSetup,
        common_window: bool,
    ) -> Result<()> {
        self.prev_window_sequence = self.window_sequence;

        if bs.read_bool()? {
            return invalid_data_error("aac: ics reserved bit set");
        }

        self.window_sequence = WindowSequence::from_bits(bs.read_bits_leq32(2)?);

        if setup.object_type == M4AType::ER_AAC_LD && self.window_sequence.is_short() {
            return invalid_data_error("aac: eight short sequence in a low delay stream");
        }

        match self.prev_window_sequence {
            WindowSequence::OnlyLong | WindowSequence::LongStop => {
                if !matches!(
                    self.window_sequence,
                    WindowSequence::OnlyLong | WindowSequence::LongStart
                ) {
                    debug!("previous window is invalid");
                }
            }
            WindowSequence::LongStart | WindowSequence::EightShort => {
                if !matches!(
                    self.window_sequence,
                    WindowSequence::EightShort | WindowSequence::LongStop
                ) {
                    debug!("previous window is invalid");
                }
            }
        }

        self.window_shape = bs.read_bool()?;

        self.predictor_data_present = false;
        self.predictor = None;
        self.ltp = None;
        self.ltp2 = None;

        if self.window_sequence.is_short() {
            self.max_sfb = bs.read_bits_leq32(4)? as usize;
            self.scale_factor_grouping = bs.read_bits_leq32(7)? as u8;
        }
        else {
            self.max_sfb = bs.read_bits_leq32(6)? as usize;
            self.scale_factor_grouping = 0;
        }

        self.calculate_window_grouping_info(setup)?;

        if !self.window_sequence.is_short() {
            self.predictor_data_present = bs.read_bool()?;

            if self.predictor_data_present {
                self.read_prediction(bs, setup, common_window)?;
            }
        }

        Ok(())
    }

    fn read_prediction<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        setup: &AacSetup,
        common_window: bool,
    ) -> Result<()> {
        let m4atype = setup.object_type;
        let frame_length = setup.frame_length();

        match m4atype {
            M4AType::Main => {
                self.predictor = Some(Predictor::read(bs, setup.sfi(), self.max_sfb)?);
            }
            M4AType::Ltp => {
                if bs.read_bool()? {
                    self.ltp = Some(self.read_ltp(bs, m4atype, frame_length)?);
                }
                if common_window && bs.read_bool()? {
                    self.ltp2 = Some(self.read_ltp(bs, m4atype, frame_length)?);
                }
            }
            M4AType::ER_AAC_LTP | M4AType::ER_AAC_LD => {
                // With a common window, the channel pair carries the second channel's data.
                if !common_window && bs.read_bool()? {
                    self.ltp = Some(self.read_ltp(bs, m4atype, frame_length)?);
                }
            }
            _ => return invalid_data_error("aac: prediction is not permitted for object type"),
        }

        Ok(())
    }

    pub(crate) fn read_ltp<B: ReadBitsLtr>(
        &self,
        bs: &mut B,
        m4atype: M4AType,
        frame_length: usize,
    ) -> Result<LtpData> {
        LtpData::read(bs, m4atype, frame_length, self.window_sequence, self.max_sfb)
    }

    /// Derive the window groups and scalefactor band layout of the current window sequence.
    /// ISO/IEC 14496-3 section 4.5.2.3.4.
    pub fn calculate_window_grouping_info(&mut self, setup: &AacSetup) -> Result<()> {
        let short = self.window_sequence.is_short();
        let frame_length = setup.frame_length();

        let bands = match band_offsets(frame_length, setup.sfi(), short) {
            Some(bands) => bands,
            None => return invalid_data_error("aac: no band layout for stream configuration"),
        };

        self.swb_count = bands.len() - 1;
        self.swb_offset = bands;
        self.window_group_lengths = [0; MAX_WINDOWS];

        validate!(self.max_sfb <= self.swb_count);

        if !short {
            self.window_count = 1;
            self.window_group_count = 1;
            self.window_group_lengths[0] = 1;
            self.max_swb_offset = frame_length;

            self.section_sfb_offset[0][..bands.len()].copy_from_slice(bands);
        }
        else {
            self.window_count = MAX_WINDOWS;
            self.window_group_count = 1;
            self.window_group_lengths[0] = 1;
            self.max_swb_offset = frame_length / MAX_WINDOWS;

            // A set bit places the next window in the same group as the current window.
            for i in 0..MAX_WINDOWS - 1 {
                if self.scale_factor_grouping & (1 << (6 - i)) != 0 {
                    self.window_group_lengths[self.window_group_count - 1] += 1;
                }
                else {
                    self.window_group_count += 1;
                    self.window_group_lengths[self.window_group_count - 1] = 1;
                }
            }

            for g in 0..self.window_group_count {
                let group_len = self.window_group_lengths[g];
                let offsets = &mut self.section_sfb_offset[g];

                offsets[0] = 0;

                for i in 0..self.swb_count {
                    offsets[i + 1] = offsets[i] + (bands[i + 1] - bands[i]) * group_len;
                }
            }
        }

        Ok(())
    }

    /// Get the index of the first window of window group `g`.
    pub fn group_start(&self, g: usize) -> usize {
        self.window_group_lengths[..g.min(MAX_WINDOWS)].iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    fn lc_setup() -> AacSetup {
        AacSetup::new(M4AType::Lc, 3, 2)
    }

    #[test]
    fn verify_reserved_bit() {
        let buf = [0x80, 0x00, 0x00];
        let mut info = IcsInfo::new();

        let result = info.read(&mut BitCursor::new(&buf), &lc_setup(), false);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_eight_short_grouping() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 10 0");
        bw.write_bits_leq32(14, 4);
        bw.write_bits_leq32(0b1010101, 7);
        let buf = bw.into_inner();

        let mut info = IcsInfo::new();
        info.read(&mut BitCursor::new(&buf), &lc_setup(), false).unwrap();

        assert_eq!(info.window_sequence, WindowSequence::EightShort);
        assert_eq!(info.window_count, 8);
        assert_eq!(info.window_group_count, 4);
        assert_eq!(info.window_group_lengths, [2, 2, 2, 2, 0, 0, 0, 0]);
        assert_eq!(info.group_start(3), 6);
        assert_eq!(info.swb_count, 14);
        assert_eq!(info.max_swb_offset, 128);
        // 48 kHz short band 1 is 4 coefficients wide, 8 over a group of 2 windows.
        assert_eq!(info.section_sfb_offset[1][1], 8);
        assert_eq!(info.section_sfb_offset[3][14], 256);
    }

    #[test]
    fn verify_grouping_all_separate() {
        let mut info = IcsInfo::new();
        info.window_sequence = WindowSequence::EightShort;
        info.scale_factor_grouping = 0;
        info.calculate_window_grouping_info(&lc_setup()).unwrap();

        assert_eq!(info.window_group_count, 8);
        assert_eq!(info.window_group_lengths, [1; 8]);
    }

    #[test]
    fn verify_long_window_band_limit() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 00 0");
        // 48 kHz long windows have 49 bands.
        bw.write_bits_leq32(50, 6);
        bw.write_bits_leq32(0, 8);
        let buf = bw.into_inner();

        let mut info = IcsInfo::new();
        let result = info.read(&mut BitCursor::new(&buf), &lc_setup(), false);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_long_window() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 11 1");
        bw.write_bits_leq32(49, 6);
        bw.write_bool(false);
        let buf = bw.into_inner();

        let mut info = IcsInfo::new();
        info.read(&mut BitCursor::new(&buf), &lc_setup(), false).unwrap();

        assert_eq!(info.window_sequence, WindowSequence::LongStop);
        assert!(info.window_shape);
        assert_eq!(info.max_sfb, 49);
        assert_eq!(info.window_count, 1);
        assert_eq!(info.max_swb_offset, 1024);
        assert_eq!(info.section_sfb_offset[0][49], 1024);
        assert!(!info.predictor_data_present);
    }

    #[test]
    fn verify_prediction_rejected_in_lc() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(10, 6);
        bw.write_bool(true);
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut info = IcsInfo::new();
        let result = info.read(&mut BitCursor::new(&buf), &lc_setup(), false);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_low_delay_rejects_short_windows() {
        let setup = AacSetup::new(M4AType::ER_AAC_LD, 3, 1);
        let buf = [0x40, 0x00, 0x00];

        let mut info = IcsInfo::new();
        let result = info.read(&mut BitCursor::new(&buf), &setup, false);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_ltp_with_common_window() {
        let setup = AacSetup::new(M4AType::Ltp, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(2, 6);
        // Predictor data, then both channels' long term prediction data.
        bw.write_bool(true);
        for lag in [100, 200] {
            bw.write_bool(true);
            bw.write_bits_leq32(lag, 11);
            bw.write_bits_leq32(1, 3);
            bw.write_bit_str("11");
        }
        let buf = bw.into_inner();

        let mut info = IcsInfo::new();
        let mut bs = BitCursor::new(&buf);
        info.read(&mut bs, &setup, true).unwrap();

        assert_eq!(info.ltp.map(|ltp| ltp.lag), Some(100));
        assert_eq!(info.ltp2.map(|ltp| ltp.lag), Some(200));
        assert_eq!(bs.pos(), 10 + 1 + 2 * 17);
    }
}
