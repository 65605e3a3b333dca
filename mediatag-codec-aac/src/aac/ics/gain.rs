// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::{WindowSequence, MAX_WINDOWS};

const MAX_BANDS: usize = 4;
const MAX_ADJUST: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GainAdjust {
    pub alevcode: u8,
    pub aloccode: u8,
}

/// Gain control data of an AAC SSR stream. ISO/IEC 14496-3 section 4.6.12, Table 4.54.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GainControl {
    /// The number of the highest band carrying gain control data. Band 0 never does.
    pub max_band: u8,
    pub adjust_num: [[u8; MAX_WINDOWS]; MAX_BANDS],
    pub adjust: [[[GainAdjust; MAX_ADJUST]; MAX_WINDOWS]; MAX_BANDS],
}

impl GainControl {
    pub fn read<B: ReadBitsLtr>(bs: &mut B, window_sequence: WindowSequence) -> Result<Self> {
        let max_band = bs.read_bits_leq32(2)? as u8;

        let mut gain = GainControl {
            max_band,
            adjust_num: [[0; MAX_WINDOWS]; MAX_BANDS],
            adjust: [[[GainAdjust::default(); MAX_ADJUST]; MAX_WINDOWS]; MAX_BANDS],
        };

        // The number of windows and the location code width of the first and later windows.
        let (num_windows, first_aloc_bits, aloc_bits) = match window_sequence {
            WindowSequence::OnlyLong => (1, 5, 5),
            WindowSequence::LongStart => (2, 4, 2),
            WindowSequence::EightShort => (8, 2, 2),
            WindowSequence::LongStop => (2, 4, 5),
        };

        for bd in 1..=usize::from(max_band) {
            for wd in 0..num_windows {
                let adjust_num = bs.read_bits_leq32(3)? as u8;
                gain.adjust_num[bd][wd] = adjust_num;

                let bits = if wd == 0 { first_aloc_bits } else { aloc_bits };

                for ad in gain.adjust[bd][wd][..usize::from(adjust_num)].iter_mut() {
                    ad.alevcode = bs.read_bits_leq32(4)? as u8;
                    ad.aloccode = bs.read_bits_leq32(bits)? as u8;
                }
            }
        }

        Ok(gain)
    }
}
