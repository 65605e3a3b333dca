// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::*;
use crate::common::M4AType;

/// Long term prediction data. ISO/IEC 14496-3 section 4.4.2.1, Table 4.50.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LtpData {
    /// Set if the lag was transmitted. Always set outside of low delay streams.
    pub lag_update: bool,
    pub lag: u16,
    pub coef: u8,
    pub long_used: [bool; MAX_LTP_SFB],
    pub short_used: [bool; MAX_WINDOWS],
    pub short_lag_present: [bool; MAX_WINDOWS],
    pub short_lag: [u8; MAX_WINDOWS],
}

impl LtpData {
    pub fn read<B: ReadBitsLtr>(
        bs: &mut B,
        m4atype: M4AType,
        frame_length: usize,
        window_sequence: WindowSequence,
        max_sfb: usize,
    ) -> Result<Self> {
        let mut ltp = LtpData {
            lag_update: true,
            lag: 0,
            coef: 0,
            long_used: [false; MAX_LTP_SFB],
            short_used: [false; MAX_WINDOWS],
            short_lag_present: [false; MAX_WINDOWS],
            short_lag: [0; MAX_WINDOWS],
        };

        if m4atype == M4AType::ER_AAC_LD {
            ltp.lag_update = bs.read_bool()?;

            if ltp.lag_update {
                ltp.lag = bs.read_bits_leq32(10)? as u16;
            }
        }
        else {
            ltp.lag = bs.read_bits_leq32(11)? as u16;
        }

        validate!(usize::from(ltp.lag) <= 2 * frame_length);

        ltp.coef = bs.read_bits_leq32(3)? as u8;

        if window_sequence.is_short() {
            for w in 0..MAX_WINDOWS {
                ltp.short_used[w] = bs.read_bool()?;

                if ltp.short_used[w] {
                    ltp.short_lag_present[w] = bs.read_bool()?;

                    if ltp.short_lag_present[w] {
                        ltp.short_lag[w] = bs.read_bits_leq32(4)? as u8;
                    }
                }
            }
        }
        else {
            for used in ltp.long_used[..max_sfb.min(MAX_LTP_SFB)].iter_mut() {
                *used = bs.read_bool()?;
            }
        }

        Ok(ltp)
    }
}

/// MPEG-2 style backward adaptive prediction side information, used by the main profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predictor {
    /// The predictor reset group, if a reset was signalled. Groups are numbered from 1.
    pub reset_group: Option<u8>,
    pub prediction_used: [bool; MAX_SFB],
}

impl Predictor {
    pub fn read<B: ReadBitsLtr>(bs: &mut B, sfi: usize, max_sfb: usize) -> Result<Self> {
        let reset_group = if bs.read_bool()? {
            let group = bs.read_bits_leq32(5)? as u8;
            validate!(group > 0 && group <= 30);
            Some(group)
        }
        else {
            None
        };

        let limit = max_sfb.min(MAX_PREDICTION_SFB[sfi & 0xf]);

        let mut prediction_used = [false; MAX_SFB];

        for used in prediction_used[..limit].iter_mut() {
            *used = bs.read_bool()?;
        }

        Ok(Predictor { reset_group, prediction_used })
    }
}
