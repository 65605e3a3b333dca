// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::diag::Diagnostics;
use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::*;
use crate::aac::ics::Ics;
use crate::aac::AacSetup;

/// A channel pair element. ISO/IEC 14496-3 section 4.6.2, Table 4.5.
#[derive(Clone)]
pub struct ChannelPair {
    pub common_window: bool,
    /// 0 if mid-side coding is never used, 1 if signalled per band, and 2 if always used.
    pub ms_mask_present: u8,
    pub ms_used: [[bool; MAX_SFB]; MAX_WINDOWS],
    pub ics0: Ics,
    pub ics1: Ics,
}

impl Default for ChannelPair {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPair {
    pub fn new() -> Self {
        ChannelPair {
            common_window: false,
            ms_mask_present: 0,
            ms_used: [[false; MAX_SFB]; MAX_WINDOWS],
            ics0: Ics::new(),
            ics1: Ics::new(),
        }
    }

    /// Read the channel pair following the element instance tag.
    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        setup: &AacSetup,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        self.common_window = bs.read_bool()?;

        self.ms_mask_present = 0;
        self.ms_used = [[false; MAX_SFB]; MAX_WINDOWS];

        if self.common_window {
            // Read the common ICS info into the first channel.
            self.ics0.info.read(bs, setup, true)?;

            self.ms_mask_present = bs.read_bits_leq32(2)? as u8;

            let info = &self.ics0.info;

            match self.ms_mask_present {
                0 | 2 => {
                    let is_used = self.ms_mask_present == 2;

                    for g in 0..info.window_group_count {
                        self.ms_used[g][..info.max_sfb].fill(is_used);
                    }
                }
                1 => {
                    for g in 0..info.window_group_count {
                        for sfb in 0..info.max_sfb {
                            self.ms_used[g][sfb] = bs.read_bool()?;
                        }
                    }
                }
                _ => return invalid_data_error("aac: invalid mid-side mask"),
            }

            // Error resilient streams carry the long term prediction data after the mask.
            if setup.object_type.is_error_resilient()
                && self.ics0.info.predictor_data_present
                && bs.read_bool()?
            {
                let ltp = self.ics0.info.read_ltp(bs, setup.object_type, setup.frame_length())?;
                self.ics0.info.ltp = Some(ltp);
            }

            // Copy the common ICS info to the second channel.
            self.ics1.info = self.ics0.info.clone();
        }

        self.ics0.read(bs, setup, self.common_window, diag)?;

        // The second channel's long term prediction data sits between the two streams.
        if self.common_window
            && setup.object_type.is_error_resilient()
            && self.ics0.info.predictor_data_present
            && bs.read_bool()?
        {
            let ltp = self.ics0.info.read_ltp(bs, setup.object_type, setup.frame_length())?;
            self.ics0.info.ltp2 = Some(ltp);
            self.ics1.info.ltp2 = Some(ltp);
        }

        self.ics1.read(bs, setup, self.common_window, diag)?;

        Ok(())
    }

    /// Returns true if band `sfb` of window group `g` is mid-side coded.
    pub fn is_ms_used(&self, g: usize, sfb: usize) -> bool {
        self.ms_used[g][sfb]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::M4AType;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    /// Write a zero channel stream body for a channel pair with a common window: global gain,
    /// one zero section, and no optional data.
    fn write_zero_body(bw: &mut BitWriterLtr, sect_len: u32) {
        bw.write_bits_leq32(100, 8);
        bw.write_bits_leq32(0, 4);
        bw.write_bits_leq32(sect_len, 5);
        bw.write_bit_str("000");
    }

    #[test]
    fn verify_common_window_mask() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(true);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(3, 6);
        bw.write_bool(false);
        // Per-band mask.
        bw.write_bit_str("01 101");
        write_zero_body(&mut bw, 3);
        write_zero_body(&mut bw, 3);
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        let mut bs = BitCursor::new(&buf);
        cpe.read(&mut bs, &setup, &mut Diagnostics::new()).unwrap();

        assert!(cpe.common_window);
        assert_eq!(cpe.ms_mask_present, 1);
        assert_eq!(&cpe.ms_used[0][..4], &[true, false, true, false]);
        assert_eq!(cpe.ics1.info.max_sfb, 3);
        assert_eq!(cpe.ics1.sections_per_group[0], 1);
        assert_eq!(bs.pos(), end);
    }

    #[test]
    fn verify_mask_all_used() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(true);
        bw.write_bit_str("0 10 0");
        bw.write_bits_leq32(2, 4);
        // Two window groups of 4.
        bw.write_bits_leq32(0b1110111, 7);
        bw.write_bit_str("10");
        for _ in 0..2 {
            bw.write_bits_leq32(100, 8);
            for _ in 0..2 {
                bw.write_bits_leq32(0, 4);
                bw.write_bits_leq32(2, 3);
            }
            bw.write_bit_str("000");
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        cpe.read(&mut BitCursor::new(&buf), &setup, &mut Diagnostics::new()).unwrap();

        assert_eq!(cpe.ms_mask_present, 2);
        assert!(cpe.is_ms_used(1, 1));
        assert!(!cpe.is_ms_used(2, 0));
        assert_eq!(cpe.ics1.info.window_group_count, 2);
    }

    #[test]
    fn verify_reserved_mask() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(true);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(3, 6);
        bw.write_bool(false);
        bw.write_bit_str("11");
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        let result = cpe.read(&mut BitCursor::new(&buf), &setup, &mut Diagnostics::new());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_independent_windows() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(false);
        for max_sfb in [2, 5] {
            bw.write_bits_leq32(100, 8);
            bw.write_bit_str("0 00 0");
            bw.write_bits_leq32(max_sfb, 6);
            bw.write_bool(false);
            bw.write_bits_leq32(0, 4);
            bw.write_bits_leq32(max_sfb, 5);
            bw.write_bit_str("000");
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        cpe.read(&mut BitCursor::new(&buf), &setup, &mut Diagnostics::new()).unwrap();

        assert!(!cpe.common_window);
        assert_eq!(cpe.ms_mask_present, 0);
        assert_eq!(cpe.ics0.info.max_sfb, 2);
        assert_eq!(cpe.ics1.info.max_sfb, 5);
    }

    #[test]
    fn verify_error_resilient_ltp() {
        let setup = AacSetup::new(M4AType::ER_AAC_LTP, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(true);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(2, 6);
        // Predictor data present, mid-side off, then the first channel's prediction data.
        bw.write_bool(true);
        bw.write_bit_str("00");
        bw.write_bool(true);
        bw.write_bits_leq32(300, 11);
        bw.write_bits_leq32(2, 3);
        bw.write_bit_str("01");
        write_zero_body(&mut bw, 2);
        // The second channel's prediction data.
        bw.write_bool(true);
        bw.write_bits_leq32(400, 11);
        bw.write_bits_leq32(3, 3);
        bw.write_bit_str("10");
        write_zero_body(&mut bw, 2);
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        let mut bs = BitCursor::new(&buf);
        cpe.read(&mut bs, &setup, &mut Diagnostics::new()).unwrap();

        let ltp = cpe.ics1.info.ltp.unwrap();
        assert_eq!((ltp.lag, ltp.coef), (300, 2));
        assert_eq!(&ltp.long_used[..2], &[false, true]);

        let ltp2 = cpe.ics1.info.ltp2.unwrap();
        assert_eq!((ltp2.lag, ltp2.coef), (400, 3));
        assert_eq!(&ltp2.long_used[..2], &[true, false]);
        assert_eq!(cpe.ics0.info.ltp2, Some(ltp2));

        assert_eq!(cpe.ics1.global_gain, 100);
        assert_eq!(bs.pos(), end);
    }

    #[test]
    fn verify_error_resilient_ltp_absent() {
        let setup = AacSetup::new(M4AType::ER_AAC_LTP, 3, 2);

        let mut bw = BitWriterLtr::new();
        bw.write_bool(true);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(2, 6);
        // Predictor data present, but neither channel carries prediction data.
        bw.write_bool(true);
        bw.write_bit_str("00");
        bw.write_bool(false);
        write_zero_body(&mut bw, 2);
        bw.write_bool(false);
        write_zero_body(&mut bw, 2);
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cpe = ChannelPair::new();
        let mut bs = BitCursor::new(&buf);
        cpe.read(&mut bs, &setup, &mut Diagnostics::new()).unwrap();

        assert!(cpe.ics1.info.ltp.is_none());
        assert!(cpe.ics1.info.ltp2.is_none());
        assert_eq!(cpe.ics0.global_gain, 100);
        assert_eq!(cpe.ics1.global_gain, 100);
        assert_eq!(bs.pos(), end);
    }
}
