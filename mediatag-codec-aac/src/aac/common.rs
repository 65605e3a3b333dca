// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use lazy_static::lazy_static;

pub const MAX_WINDOWS: usize = 8;
/// Maximum number of scalefactor bands in a long window.
pub const MAX_SFB: usize = 51;
/// Maximum number of sections per window group (8 windows of 15 bands).
pub const MAX_SECTIONS: usize = 8 * 15;
/// Maximum number of syntax elements in one raw data block.
pub const MAX_ELEMENTS: usize = 48;

pub const ZERO_HCB: u8 = 0;
pub const FIRST_PAIR_HCB: u8 = 5;
pub const ESC_HCB: u8 = 11;
pub const RESERVED_HCB: u8 = 12;
pub const NOISE_HCB: u8 = 13;
pub const INTENSITY_HCB2: u8 = 14;
pub const INTENSITY_HCB: u8 = 15;

/// Syntax element identifiers of a raw data block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Sce,
    Cpe,
    Cce,
    Lfe,
    Dse,
    Pce,
    Fil,
    End,
}

impl ElementType {
    pub fn from_id(id: u32) -> Self {
        match id & 0x7 {
            0 => ElementType::Sce,
            1 => ElementType::Cpe,
            2 => ElementType::Cce,
            3 => ElementType::Lfe,
            4 => ElementType::Dse,
            5 => ElementType::Pce,
            6 => ElementType::Fil,
            _ => ElementType::End,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// The number of output channels carried by an element of this type.
    pub fn channels(self) -> usize {
        match self {
            ElementType::Sce | ElementType::Lfe => 1,
            ElementType::Cpe => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Sce => "SCE",
            ElementType::Cpe => "CPE",
            ElementType::Cce => "CCE",
            ElementType::Lfe => "LFE",
            ElementType::Dse => "DSE",
            ElementType::Pce => "PCE",
            ElementType::Fil => "FIL",
            ElementType::End => "END",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowSequence {
    #[default]
    OnlyLong,
    LongStart,
    EightShort,
    LongStop,
}

impl WindowSequence {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => WindowSequence::OnlyLong,
            1 => WindowSequence::LongStart,
            2 => WindowSequence::EightShort,
            _ => WindowSequence::LongStop,
        }
    }

    #[inline(always)]
    pub fn is_short(self) -> bool {
        self == WindowSequence::EightShort
    }
}

/// Maximum number of scalefactor bands that may use MPEG-2 style prediction, per sampling
/// frequency index.
pub const MAX_PREDICTION_SFB: [usize; 16] =
    [33, 33, 38, 40, 40, 40, 41, 41, 37, 37, 37, 34, 34, 0, 0, 0];

/// Maximum number of scalefactor bands carrying long-term prediction flags.
pub const MAX_LTP_SFB: usize = 40;

pub const SWB_OFFSET_48K_LONG: [usize; 49 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 1024,
];

pub const SWB_OFFSET_48K_SHORT: [usize; 14 + 1] =
    [0, 4, 8, 12, 16, 20, 28, 36, 44, 56, 68, 80, 96, 112, 128];

pub const SWB_OFFSET_32K_LONG: [usize; 51 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 960, 992, 1024,
];

pub const SWB_OFFSET_8K_LONG: [usize; 40 + 1] = [
    0, 12, 24, 36, 48, 60, 72, 84, 96, 108, 120, 132, 144, 156, 172, 188, 204, 220, 236, 252, 268,
    288, 308, 328, 348, 372, 396, 420, 448, 476, 508, 544, 580, 620, 664, 712, 764, 820, 880, 944,
    1024,
];

pub const SWB_OFFSET_8K_SHORT: [usize; 15 + 1] =
    [0, 4, 8, 12, 16, 20, 24, 28, 36, 44, 52, 60, 72, 88, 108, 128];

pub const SWB_OFFSET_16K_LONG: [usize; 43 + 1] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 100, 112, 124, 136, 148, 160, 172, 184, 196, 212,
    228, 244, 260, 280, 300, 320, 344, 368, 396, 424, 456, 492, 532, 572, 616, 664, 716, 772, 832,
    896, 960, 1024,
];

pub const SWB_OFFSET_16K_SHORT: [usize; 15 + 1] =
    [0, 4, 8, 12, 16, 20, 24, 28, 32, 40, 48, 60, 72, 88, 108, 128];

pub const SWB_OFFSET_24K_LONG: [usize; 47 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 52, 60, 68, 76, 84, 92, 100, 108, 116, 124, 136,
    148, 160, 172, 188, 204, 220, 240, 260, 284, 308, 336, 364, 396, 432, 468, 508, 552, 600, 652,
    704, 768, 832, 896, 960, 1024,
];

pub const SWB_OFFSET_24K_SHORT: [usize; 15 + 1] =
    [0, 4, 8, 12, 16, 20, 24, 28, 36, 44, 52, 64, 76, 92, 108, 128];

pub const SWB_OFFSET_64K_LONG: [usize; 47 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 100, 112, 124, 140,
    156, 172, 192, 216, 240, 268, 304, 344, 384, 424, 464, 504, 544, 584, 624, 664, 704, 744, 784,
    824, 864, 904, 944, 984, 1024,
];

pub const SWB_OFFSET_64K_SHORT: [usize; 12 + 1] =
    [0, 4, 8, 12, 16, 20, 24, 32, 40, 48, 64, 92, 128];

pub const SWB_OFFSET_96K_LONG: [usize; 41 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 96, 108, 120, 132,
    144, 156, 172, 188, 212, 240, 276, 320, 384, 448, 512, 576, 640, 704, 768, 832, 896, 960, 1024,
];

// Low delay band layouts.

pub const SWB_OFFSET_512_48K: [usize; 36 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 60, 68, 76, 84, 92, 100, 112, 124,
    136, 148, 164, 184, 208, 236, 268, 300, 332, 364, 396, 428, 460, 512,
];

pub const SWB_OFFSET_512_32K: [usize; 37 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 96, 108, 120, 132,
    144, 160, 176, 192, 212, 236, 260, 288, 320, 352, 384, 416, 448, 480, 512,
];

pub const SWB_OFFSET_512_24K: [usize; 31 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 52, 60, 68, 80, 92, 104, 120, 140, 164, 192, 224,
    256, 288, 320, 352, 384, 416, 448, 480, 512,
];

pub const SWB_OFFSET_480_48K: [usize; 35 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64, 72, 80, 88, 96, 108, 120, 132,
    144, 156, 172, 188, 212, 240, 272, 304, 336, 368, 400, 432, 480,
];

pub const SWB_OFFSET_480_32K: [usize; 37 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 60, 64, 72, 80, 88, 96, 104, 112, 124,
    136, 148, 164, 180, 200, 224, 256, 288, 320, 352, 384, 416, 448, 480,
];

pub const SWB_OFFSET_480_24K: [usize; 30 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 52, 60, 68, 80, 92, 104, 120, 140, 164, 192, 224,
    256, 288, 320, 352, 384, 416, 448, 480,
];

#[derive(Clone, Copy)]
struct GASubbandInfo {
    long_bands: &'static [usize],
    short_bands: &'static [usize],
}

/// Band layouts for 1024 and 128 sample windows, indexed by sampling frequency index.
const AAC_SUBBAND_INFO: [GASubbandInfo; 13] = [
    // 96K
    GASubbandInfo { long_bands: &SWB_OFFSET_96K_LONG, short_bands: &SWB_OFFSET_64K_SHORT },
    // 88.2K
    GASubbandInfo { long_bands: &SWB_OFFSET_96K_LONG, short_bands: &SWB_OFFSET_64K_SHORT },
    // 64K
    GASubbandInfo { long_bands: &SWB_OFFSET_64K_LONG, short_bands: &SWB_OFFSET_64K_SHORT },
    // 48K
    GASubbandInfo { long_bands: &SWB_OFFSET_48K_LONG, short_bands: &SWB_OFFSET_48K_SHORT },
    // 44.1K
    GASubbandInfo { long_bands: &SWB_OFFSET_48K_LONG, short_bands: &SWB_OFFSET_48K_SHORT },
    // 32K
    GASubbandInfo { long_bands: &SWB_OFFSET_32K_LONG, short_bands: &SWB_OFFSET_48K_SHORT },
    // 24K
    GASubbandInfo { long_bands: &SWB_OFFSET_24K_LONG, short_bands: &SWB_OFFSET_24K_SHORT },
    // 22.05K
    GASubbandInfo { long_bands: &SWB_OFFSET_24K_LONG, short_bands: &SWB_OFFSET_24K_SHORT },
    // 16K
    GASubbandInfo { long_bands: &SWB_OFFSET_16K_LONG, short_bands: &SWB_OFFSET_16K_SHORT },
    // 12K
    GASubbandInfo { long_bands: &SWB_OFFSET_16K_LONG, short_bands: &SWB_OFFSET_16K_SHORT },
    // 11.025K
    GASubbandInfo { long_bands: &SWB_OFFSET_16K_LONG, short_bands: &SWB_OFFSET_16K_SHORT },
    // 8K
    GASubbandInfo { long_bands: &SWB_OFFSET_8K_LONG, short_bands: &SWB_OFFSET_8K_SHORT },
    // 7.35K
    GASubbandInfo { long_bands: &SWB_OFFSET_8K_LONG, short_bands: &SWB_OFFSET_8K_SHORT },
];

/// Truncates a band layout at `len`, terminating it with `len`.
fn truncate_bands(bands: &[usize], len: usize) -> Vec<usize> {
    let mut out: Vec<usize> = bands.iter().copied().take_while(|&offset| offset < len).collect();
    out.push(len);
    out
}

lazy_static! {
    /// Band layouts for 960 sample windows.
    static ref SWB_OFFSET_960: Vec<Vec<usize>> =
        AAC_SUBBAND_INFO.iter().map(|info| truncate_bands(info.long_bands, 960)).collect();

    /// Band layouts for 120 sample windows.
    static ref SWB_OFFSET_120: Vec<Vec<usize>> =
        AAC_SUBBAND_INFO.iter().map(|info| truncate_bands(info.short_bands, 120)).collect();
}

/// Get the scalefactor band offsets for a frame length, sampling frequency index, and window
/// size. Returns `None` for combinations that have no band layout.
pub fn band_offsets(frame_length: usize, sfi: usize, short: bool) -> Option<&'static [usize]> {
    if sfi >= AAC_SUBBAND_INFO.len() {
        return None;
    }

    let bands: &'static [usize] = match (frame_length, short) {
        (1024, false) => AAC_SUBBAND_INFO[sfi].long_bands,
        (1024, true) => AAC_SUBBAND_INFO[sfi].short_bands,
        (960, false) => &SWB_OFFSET_960[sfi],
        (960, true) => &SWB_OFFSET_120[sfi],
        (512, false) => match sfi {
            3 | 4 => &SWB_OFFSET_512_48K,
            5 => &SWB_OFFSET_512_32K,
            6 | 7 => &SWB_OFFSET_512_24K,
            _ => return None,
        },
        (480, false) => match sfi {
            3 | 4 => &SWB_OFFSET_480_48K,
            5 => &SWB_OFFSET_480_32K,
            6 | 7 => &SWB_OFFSET_480_24K,
            _ => return None,
        },
        _ => return None,
    };

    Some(bands)
}

macro_rules! validate {
    ($a:expr) => {
        if !$a {
            log::error!("check failed at {}:{}", file!(), line!());
            return mediatag_core::errors::invalid_data_error("aac: invalid data");
        }
    };
}

pub(crate) use validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_band_layouts_end_at_window_length() {
        for sfi in 0..13 {
            for (frame_length, short, len) in [(1024, false, 1024), (1024, true, 128)] {
                let bands = band_offsets(frame_length, sfi, short).unwrap();
                assert_eq!(bands[0], 0);
                assert_eq!(*bands.last().unwrap(), len);
            }
            assert_eq!(*band_offsets(960, sfi, false).unwrap().last().unwrap(), 960);
            assert_eq!(*band_offsets(960, sfi, true).unwrap().last().unwrap(), 120);
        }
    }

    #[test]
    fn verify_band_layouts_are_monotonic() {
        for sfi in 0..13 {
            for (frame_length, short) in
                [(1024, false), (1024, true), (960, false), (960, true), (512, false), (480, false)]
            {
                if let Some(bands) = band_offsets(frame_length, sfi, short) {
                    assert!(bands.len() <= MAX_SFB + 1);
                    assert!(bands.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    fn verify_960_band_counts() {
        // 48 kHz, 32 kHz, 24 kHz, 16 kHz, and 8 kHz.
        let expected = [(3, 49, 14), (5, 49, 14), (6, 46, 15), (8, 42, 15), (11, 40, 15)];

        for (sfi, num_long, num_short) in expected {
            assert_eq!(band_offsets(960, sfi, false).unwrap().len() - 1, num_long);
            assert_eq!(band_offsets(960, sfi, true).unwrap().len() - 1, num_short);
        }
    }

    #[test]
    fn verify_low_delay_layouts() {
        assert_eq!(band_offsets(512, 3, false).unwrap().len() - 1, 36);
        assert_eq!(band_offsets(480, 5, false).unwrap().len() - 1, 37);
        assert!(band_offsets(512, 0, false).is_none());
        assert!(band_offsets(480, 3, true).is_none());
        assert!(band_offsets(1024, 13, false).is_none());
    }

    #[test]
    fn verify_element_type_ids() {
        for id in 0..8 {
            assert_eq!(ElementType::from_id(id).id(), id);
        }
        assert_eq!(ElementType::Cpe.channels(), 2);
        assert_eq!(ElementType::Cce.channels(), 0);
    }
}
