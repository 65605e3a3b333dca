// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::*;
use crate::aac::ics::IcsInfo;

const TNS_MAX_ORDER: usize = 20;
const TNS_MAX_FILTERS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TnsFilter {
    /// Length of the filtered region in scalefactor bands.
    pub length: u8,
    pub order: u8,
    /// Set if the filter is applied downwards in frequency.
    pub direction: bool,
    pub coef_compress: bool,
    /// Transmitted coefficients, sign extended from their transmitted width.
    pub coef: [i8; TNS_MAX_ORDER],
}

impl TnsFilter {
    fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        long_win: bool,
        coef_res: bool,
        max_order: usize,
    ) -> Result<()> {
        self.length = bs.read_bits_leq32(if long_win { 6 } else { 4 })? as u8;
        self.order = bs.read_bits_leq32(if long_win { 5 } else { 3 })? as u8;

        validate!(usize::from(self.order) <= max_order);

        if self.order > 0 {
            self.direction = bs.read_bool()?;
            self.coef_compress = bs.read_bool()?;

            // 4.6.9.2
            let coef_bits = (if coef_res { 4 } else { 3 }) - u32::from(self.coef_compress);

            for coef in self.coef[..usize::from(self.order)].iter_mut() {
                *coef = bs.read_bits_leq32_signed(coef_bits)? as i8;
            }
        }

        Ok(())
    }
}

/// Temporal noise shaping data. ISO/IEC 14496-3 section 4.6.9.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tns {
    pub n_filt: [u8; MAX_WINDOWS],
    /// Set if the coefficients of a window were transmitted with 4 bits rather than 3.
    pub coef_res: [bool; MAX_WINDOWS],
    pub filters: [[TnsFilter; TNS_MAX_FILTERS]; MAX_WINDOWS],
}

impl Tns {
    pub fn read<B: ReadBitsLtr>(bs: &mut B, info: &IcsInfo, is_lc: bool) -> Result<Self> {
        let long_win = !info.window_sequence.is_short();

        // Table 4.156
        let max_order = if !long_win {
            7
        }
        else if is_lc {
            12
        }
        else {
            TNS_MAX_ORDER
        };

        let mut tns = Tns {
            n_filt: [0; MAX_WINDOWS],
            coef_res: [false; MAX_WINDOWS],
            filters: [[TnsFilter::default(); TNS_MAX_FILTERS]; MAX_WINDOWS],
        };

        for w in 0..info.window_count {
            tns.n_filt[w] = bs.read_bits_leq32(if long_win { 2 } else { 1 })? as u8;

            if tns.n_filt[w] != 0 {
                tns.coef_res[w] = bs.read_bool()?;
            }

            for filt in tns.filters[w][..usize::from(tns.n_filt[w])].iter_mut() {
                filt.read(bs, long_win, tns.coef_res[w], max_order)?;
            }
        }

        Ok(tns)
    }
}
