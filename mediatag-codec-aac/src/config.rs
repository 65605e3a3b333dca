// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MPEG-4 AudioSpecificConfig. ISO/IEC 14496-3 section 1.6.2.1.
//!
//! An AudioSpecificConfig is the codec private data of AAC carried in MP4 and Matroska.

use std::fmt;

use log::debug;

use mediatag_core::errors::{invalid_data_error, not_implemented_error, Result};
use mediatag_core::io::{BitCursor, FiniteBitStream, ReadBitsLtr};

use crate::aac::{AacSetup, ProgramConfig};
use crate::common::{sample_rate_index, M4AType, AAC_SAMPLE_RATES};

const SYNC_EXTENSION_SBR: u32 = 0x2b7;
const SYNC_EXTENSION_PS: u32 = 0x548;

/// A sampling frequency, given either by index or explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingFrequency {
    /// The sampling frequency index, or 15 if the rate is explicit.
    pub index: u8,
    pub rate: u32,
}

impl SamplingFrequency {
    fn read<B: ReadBitsLtr>(bs: &mut B) -> Result<Self> {
        let index = bs.read_bits_leq32(4)? as u8;

        let rate = match index {
            0..=12 => AAC_SAMPLE_RATES[usize::from(index)],
            15 => bs.read_bits_leq32(24)?,
            _ => return invalid_data_error("aac: reserved sampling frequency index"),
        };

        if rate == 0 {
            return invalid_data_error("aac: sample rate of 0");
        }

        Ok(SamplingFrequency { index, rate })
    }

    /// Get the sampling frequency index used to select band tables. An explicit rate maps to
    /// the index of the closest standard rate.
    pub fn table_index(&self) -> u8 {
        if self.index == 15 {
            sample_rate_index(self.rate)
        }
        else {
            self.index
        }
    }
}

/// The MPEG-4 AudioSpecificConfig.
#[derive(Clone, Debug)]
pub struct AudioSpecificConfig {
    /// The audio object type of the core coder.
    pub object_type: M4AType,
    pub sampling_frequency: SamplingFrequency,
    pub channel_config: u8,
    /// The SBR output sampling frequency, if signalled.
    pub ext_sampling_frequency: Option<SamplingFrequency>,
    pub sbr_present: bool,
    pub ps_present: bool,
    /// Number of samples per channel in a frame.
    pub frame_length: u16,
    /// The delay of the core coder in samples, if the stream depends on one.
    pub core_coder_delay: Option<u16>,
    /// The embedded program config, for channel configuration 0.
    pub pce: Option<ProgramConfig>,
    /// The layer number of a scalable stream.
    pub layer: Option<u8>,
    pub section_data_resilience: bool,
    pub scalefactor_data_resilience: bool,
    pub spectral_data_resilience: bool,
    /// The error protection configuration of an error resilient stream.
    pub ep_config: Option<u8>,
}

impl AudioSpecificConfig {
    /// Read an AudioSpecificConfig from a buffer.
    pub fn read(buf: &[u8]) -> Result<Self> {
        let mut bs = BitCursor::new(buf);

        let mut object_type = read_object_type(&mut bs)?;
        let sampling_frequency = SamplingFrequency::read(&mut bs)?;
        let channel_config = bs.read_bits_leq32(4)? as u8;

        let mut asc = AudioSpecificConfig {
            object_type,
            sampling_frequency,
            channel_config,
            ext_sampling_frequency: None,
            sbr_present: false,
            ps_present: false,
            frame_length: 1024,
            core_coder_delay: None,
            pce: None,
            layer: None,
            section_data_resilience: false,
            scalefactor_data_resilience: false,
            spectral_data_resilience: false,
            ep_config: None,
        };

        // Explicit SBR and PS signalling.
        let explicit = matches!(object_type, M4AType::Sbr | M4AType::PS);

        if explicit {
            asc.sbr_present = true;
            asc.ps_present = object_type == M4AType::PS;
            asc.ext_sampling_frequency = Some(SamplingFrequency::read(&mut bs)?);

            object_type = read_object_type(&mut bs)?;

            if object_type == M4AType::ER_BSAC {
                let _extension_channel_config = bs.read_bits_leq32(4)?;
            }

            asc.object_type = object_type;
        }

        if object_type.has_ga_specific_config() {
            asc.read_ga_specific_config(&mut bs)?;
        }
        else {
            return not_implemented_error("aac: audio object type config");
        }

        if object_type.is_error_resilient() {
            let ep_config = bs.read_bits_leq32(2)? as u8;

            if ep_config >= 2 {
                return not_implemented_error("aac: error protection config");
            }

            asc.ep_config = Some(ep_config);
        }

        if !explicit && bs.bits_left() >= 16 {
            asc.read_sync_extension(&mut bs)?;
        }

        debug!("{}", asc);

        Ok(asc)
    }

    /// GASpecificConfig. ISO/IEC 14496-3 section 4.4.1, Table 4.1.
    fn read_ga_specific_config<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        let frame_length_flag = bs.read_bool()?;

        self.frame_length = match (self.object_type == M4AType::ER_AAC_LD, frame_length_flag) {
            (false, false) => 1024,
            (false, true) => 960,
            (true, false) => 512,
            (true, true) => 480,
        };

        if bs.read_bool()? {
            self.core_coder_delay = Some(bs.read_bits_leq32(14)? as u16);
        }

        let extension_flag = bs.read_bool()?;

        if self.channel_config == 0 {
            self.pce = Some(ProgramConfig::read(bs)?);
        }

        if matches!(self.object_type, M4AType::Scalable | M4AType::ER_AAC_Scalable) {
            self.layer = Some(bs.read_bits_leq32(3)? as u8);
        }

        if extension_flag {
            if self.object_type == M4AType::ER_BSAC {
                let _num_of_sub_frame = bs.read_bits_leq32(5)?;
                let _layer_length = bs.read_bits_leq32(11)?;
            }

            if matches!(
                self.object_type,
                M4AType::ER_AAC_LC
                    | M4AType::ER_AAC_LTP
                    | M4AType::ER_AAC_Scalable
                    | M4AType::ER_AAC_LD
            ) {
                self.section_data_resilience = bs.read_bool()?;
                self.scalefactor_data_resilience = bs.read_bool()?;
                self.spectral_data_resilience = bs.read_bool()?;
            }

            if bs.read_bool()? {
                return not_implemented_error("aac: version 3 extensions");
            }
        }

        Ok(())
    }

    /// Read the backward compatible extension signalling implicit SBR and PS.
    fn read_sync_extension<B>(&mut self, bs: &mut B) -> Result<()>
    where
        B: ReadBitsLtr + FiniteBitStream,
    {
        if bs.read_bits_leq32(11)? != SYNC_EXTENSION_SBR {
            return Ok(());
        }

        let ext_object_type = read_object_type(bs)?;

        match ext_object_type {
            M4AType::Sbr => {
                self.sbr_present = bs.read_bool()?;

                if self.sbr_present {
                    self.ext_sampling_frequency = Some(SamplingFrequency::read(bs)?);

                    if bs.bits_left() >= 12 && bs.read_bits_leq32(11)? == SYNC_EXTENSION_PS {
                        self.ps_present = bs.read_bool()?;
                    }
                }
            }
            M4AType::ER_BSAC => {
                self.sbr_present = bs.read_bool()?;

                if self.sbr_present {
                    self.ext_sampling_frequency = Some(SamplingFrequency::read(bs)?);
                }

                let _extension_channel_config = bs.read_bits_leq32(4)?;
            }
            _ => (),
        }

        Ok(())
    }

    /// Get the setup of the AAC raw data block parser for the stream.
    pub fn setup(&self) -> AacSetup {
        let mut setup = AacSetup::new(
            self.object_type,
            self.sampling_frequency.table_index(),
            self.channel_config,
        );

        if let Some(ext) = &self.ext_sampling_frequency {
            setup.ext_sampling_frequency_index = ext.table_index();
        }

        setup.frame_length = self.frame_length;
        setup.section_data_resilience = self.section_data_resilience;
        setup.scalefactor_data_resilience = self.scalefactor_data_resilience;
        setup.spectral_data_resilience = self.spectral_data_resilience;
        setup.ps_signalled = self.ps_present;
        setup
    }

    /// Get the output sample rate, including SBR.
    pub fn output_sample_rate(&self) -> u32 {
        match &self.ext_sampling_frequency {
            Some(ext) if self.sbr_present => ext.rate,
            _ => self.sampling_frequency.rate,
        }
    }
}

impl fmt::Display for AudioSpecificConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MPEG 4 Audio {}, {} Hz, channel config {}, {} samples per frame",
            self.object_type, self.sampling_frequency.rate, self.channel_config, self.frame_length
        )?;

        if self.sbr_present {
            write!(f, ", SBR {} Hz", self.output_sample_rate())?;
        }

        if self.ps_present {
            f.write_str(", PS")?;
        }

        Ok(())
    }
}

fn read_object_type<B: ReadBitsLtr>(bs: &mut B) -> Result<M4AType> {
    let object_type = match bs.read_bits_leq32(5)? {
        31 => 32 + bs.read_bits_leq32(6)?,
        object_type => object_type,
    };

    Ok(M4AType::from_object_type(object_type))
}
