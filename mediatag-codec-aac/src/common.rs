// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::audio::Channels;

/// MPEG-4 audio object types. The discriminant is the audio object type number.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum M4AType {
    None = 0,
    Main = 1,
    Lc = 2,
    Ssr = 3,
    Ltp = 4,
    Sbr = 5,
    Scalable = 6,
    TwinVQ = 7,
    Celp = 8,
    Hvxc = 9,
    Ttsi = 12,
    MainSynth = 13,
    WavetableSynth = 14,
    GeneralMIDI = 15,
    Algorithmic = 16,
    ER_AAC_LC = 17,
    ER_AAC_LTP = 19,
    ER_AAC_Scalable = 20,
    ER_TwinVQ = 21,
    ER_BSAC = 22,
    ER_AAC_LD = 23,
    ER_CELP = 24,
    ER_HVXC = 25,
    ER_HILN = 26,
    ER_Parametric = 27,
    Ssc = 28,
    PS = 29,
    MPEGSurround = 30,
    Layer1 = 32,
    Layer2 = 33,
    Layer3 = 34,
    Dst = 35,
    Als = 36,
    Sls = 37,
    SLSNonCore = 38,
    ER_AAC_ELD = 39,
    SMRSimple = 40,
    SMRMain = 41,
    Reserved = 255,
}

impl M4AType {
    /// Map an audio object type number to its `M4AType`.
    pub fn from_object_type(aot: u32) -> M4AType {
        match aot {
            0 => M4AType::None,
            1 => M4AType::Main,
            2 => M4AType::Lc,
            3 => M4AType::Ssr,
            4 => M4AType::Ltp,
            5 => M4AType::Sbr,
            6 => M4AType::Scalable,
            7 => M4AType::TwinVQ,
            8 => M4AType::Celp,
            9 => M4AType::Hvxc,
            12 => M4AType::Ttsi,
            13 => M4AType::MainSynth,
            14 => M4AType::WavetableSynth,
            15 => M4AType::GeneralMIDI,
            16 => M4AType::Algorithmic,
            17 => M4AType::ER_AAC_LC,
            19 => M4AType::ER_AAC_LTP,
            20 => M4AType::ER_AAC_Scalable,
            21 => M4AType::ER_TwinVQ,
            22 => M4AType::ER_BSAC,
            23 => M4AType::ER_AAC_LD,
            24 => M4AType::ER_CELP,
            25 => M4AType::ER_HVXC,
            26 => M4AType::ER_HILN,
            27 => M4AType::ER_Parametric,
            28 => M4AType::Ssc,
            29 => M4AType::PS,
            30 => M4AType::MPEGSurround,
            32 => M4AType::Layer1,
            33 => M4AType::Layer2,
            34 => M4AType::Layer3,
            35 => M4AType::Dst,
            36 => M4AType::Als,
            37 => M4AType::Sls,
            38 => M4AType::SLSNonCore,
            39 => M4AType::ER_AAC_ELD,
            40 => M4AType::SMRSimple,
            41 => M4AType::SMRMain,
            _ => M4AType::Reserved,
        }
    }

    /// Gets the audio object type number.
    pub fn object_type(self) -> u8 {
        self as u8
    }

    /// Returns true for the error resilient object types.
    pub fn is_error_resilient(self) -> bool {
        matches!(self as u8, 17..=27 | 39)
    }

    /// Returns true if the object type carries a GASpecificConfig.
    pub fn has_ga_specific_config(self) -> bool {
        matches!(self as u8, 1..=4 | 6 | 7 | 17 | 19..=23)
    }

    pub fn name(self) -> &'static str {
        match self {
            M4AType::None => "None",
            M4AType::Main => "AAC Main",
            M4AType::Lc => "AAC LC",
            M4AType::Ssr => "AAC SSR",
            M4AType::Ltp => "AAC LTP",
            M4AType::Sbr => "SBR",
            M4AType::Scalable => "AAC Scalable",
            M4AType::TwinVQ => "TwinVQ",
            M4AType::Celp => "CELP",
            M4AType::Hvxc => "HVXC",
            M4AType::Ttsi => "TTSI",
            M4AType::MainSynth => "Main synthetic",
            M4AType::WavetableSynth => "Wavetable synthesis",
            M4AType::GeneralMIDI => "General MIDI",
            M4AType::Algorithmic => "Algorithmic Synthesis and Audio FX",
            M4AType::ER_AAC_LC => "ER AAC LC",
            M4AType::ER_AAC_LTP => "ER AAC LTP",
            M4AType::ER_AAC_Scalable => "ER AAC Scalable",
            M4AType::ER_TwinVQ => "ER TwinVQ",
            M4AType::ER_BSAC => "ER BSAC",
            M4AType::ER_AAC_LD => "ER AAC LD",
            M4AType::ER_CELP => "ER CELP",
            M4AType::ER_HVXC => "ER HVXC",
            M4AType::ER_HILN => "ER HILN",
            M4AType::ER_Parametric => "ER Parametric",
            M4AType::Ssc => "SSC",
            M4AType::PS => "PS",
            M4AType::MPEGSurround => "MPEG Surround",
            M4AType::Layer1 => "Layer-1",
            M4AType::Layer2 => "Layer-2",
            M4AType::Layer3 => "Layer-3",
            M4AType::Dst => "DST",
            M4AType::Als => "ALS",
            M4AType::Sls => "SLS",
            M4AType::SLSNonCore => "SLS non-core",
            M4AType::ER_AAC_ELD => "ER AAC ELD",
            M4AType::SMRSimple => "SMR Simple",
            M4AType::SMRMain => "SMR Main",
            M4AType::Reserved => "(reserved)",
        }
    }
}

impl std::fmt::Display for M4AType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample rates indexed by sampling frequency index. Index 15 is the explicit rate escape.
pub const AAC_SAMPLE_RATES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350, 0, 0,
    0,
];

/// Output channel count indexed by channel configuration.
pub const AAC_CHANNELS: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 8];

/// Gets the sampling frequency index of the closest standard rate at or below `rate`, the way an
/// explicit sample rate is mapped onto the band tables.
pub fn sample_rate_index(rate: u32) -> u8 {
    const THRESHOLDS: [u32; 12] =
        [92017, 75132, 55426, 46009, 37566, 27713, 23004, 18783, 13856, 11502, 9391, 0];

    THRESHOLDS.iter().position(|&t| rate >= t).unwrap_or(11) as u8
}

/// Gets the channel layout of a channel configuration.
pub fn map_channel_config(channel_config: u8) -> Option<Channels> {
    let channels = match channel_config {
        1 => Channels::FRONT_CENTRE,
        2 => Channels::FRONT_LEFT | Channels::FRONT_RIGHT,
        3 => Channels::FRONT_CENTRE | Channels::FRONT_LEFT | Channels::FRONT_RIGHT,
        4 => {
            Channels::FRONT_CENTRE
                | Channels::FRONT_LEFT
                | Channels::FRONT_RIGHT
                | Channels::REAR_CENTRE
        }
        5 => {
            Channels::FRONT_CENTRE
                | Channels::FRONT_LEFT
                | Channels::FRONT_RIGHT
                | Channels::SIDE_LEFT
                | Channels::SIDE_RIGHT
        }
        6 => {
            Channels::FRONT_CENTRE
                | Channels::FRONT_LEFT
                | Channels::FRONT_RIGHT
                | Channels::SIDE_LEFT
                | Channels::SIDE_RIGHT
                | Channels::LFE1
        }
        7 => {
            Channels::FRONT_CENTRE
                | Channels::FRONT_LEFT
                | Channels::FRONT_RIGHT
                | Channels::SIDE_LEFT
                | Channels::SIDE_RIGHT
                | Channels::FRONT_LEFT_WIDE
                | Channels::FRONT_RIGHT_WIDE
                | Channels::LFE1
        }
        _ => return None,
    };
    Some(channels)
}
