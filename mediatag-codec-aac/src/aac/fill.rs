// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fill elements and their extension payloads. ISO/IEC 14496-3 section 4.4.2.7, Table 4.57.

use log::debug;
use smallvec::SmallVec;

use mediatag_core::diag::{DiagLevel, Diagnostics};
use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::{FiniteBitStream, ReadBitsLtr};

use crate::aac::common::ElementType;
use crate::aac::sbr::SbrElement;
use crate::aac::AacParser;

const EXT_FILL: u32 = 0;
const EXT_FILL_DATA: u32 = 1;
const EXT_DATA_ELEMENT: u32 = 2;
const EXT_DYNAMIC_RANGE: u32 = 11;
const EXT_SAC_DATA: u32 = 12;
const EXT_SBR_DATA: u32 = 13;
const EXT_SBR_DATA_CRC: u32 = 14;

const ANC_DATA: u32 = 0;

/// Maximum number of channels the excluded channel mask may describe.
const MAX_EXCLUDED_CHANNELS: usize = 64;

/// One band of dynamic range control information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynamicRangeBand {
    /// The top of the band, in units of 4 spectral lines.
    pub top: u8,
    /// Set if the gain is attenuating.
    pub sign: bool,
    /// The gain, in units of 0.25 dB.
    pub ctl: u8,
}

/// Dynamic range control information. ISO/IEC 14496-3 section 4.5.2.7, Table 4.52.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicRange {
    /// Instance tag of the program the information applies to.
    pub pce_tag: Option<u8>,
    /// Bit `i` is set if channel `i` is excluded from control.
    pub excluded_channels: u64,
    pub interpolation_scheme: u8,
    /// The program reference level, in units of -0.25 dB.
    pub prog_ref_level: Option<u8>,
    pub bands: SmallVec<[DynamicRangeBand; 16]>,
}

impl DynamicRange {
    /// Read dynamic range control information following the extension type. Returns the
    /// information and the number of bytes it occupied, including the extension type.
    pub fn read<B: ReadBitsLtr>(bs: &mut B) -> Result<(Self, usize)> {
        let mut n = 1;

        let pce_tag = if bs.read_bool()? {
            let tag = bs.read_bits_leq32(4)? as u8;
            let _drc_tag_reserved_bits = bs.read_bits_leq32(4)?;
            n += 1;
            Some(tag)
        }
        else {
            None
        };

        let mut excluded_channels = 0;

        if bs.read_bool()? {
            let mut num_excl_chan = 0;

            loop {
                if num_excl_chan + 7 > MAX_EXCLUDED_CHANNELS {
                    return invalid_data_error("aac: too many excluded drc channels");
                }

                for i in num_excl_chan..num_excl_chan + 7 {
                    if bs.read_bool()? {
                        excluded_channels |= 1 << i;
                    }
                }

                num_excl_chan += 7;
                n += 1;

                if !bs.read_bool()? {
                    break;
                }
            }
        }

        let mut num_bands = 1;
        let mut interpolation_scheme = 0;
        let mut bands = SmallVec::<[DynamicRangeBand; 16]>::new();

        if bs.read_bool()? {
            num_bands += bs.read_bits_leq32(4)? as usize;
            interpolation_scheme = bs.read_bits_leq32(4)? as u8;
            n += 1;

            for _ in 0..num_bands {
                let top = bs.read_bits_leq32(8)? as u8;
                bands.push(DynamicRangeBand { top, sign: false, ctl: 0 });
                n += 1;
            }
        }
        else {
            // A single band spanning the whole spectrum.
            bands.push(DynamicRangeBand { top: 255, sign: false, ctl: 0 });
        }

        let prog_ref_level = if bs.read_bool()? {
            let level = bs.read_bits_leq32(7)? as u8;
            let _prog_ref_level_reserved_bits = bs.read_bool()?;
            n += 1;
            Some(level)
        }
        else {
            None
        };

        for band in bands.iter_mut() {
            band.sign = bs.read_bool()?;
            band.ctl = bs.read_bits_leq32(7)? as u8;
            n += 1;
        }

        let drc = DynamicRange {
            pce_tag,
            excluded_channels,
            interpolation_scheme,
            prog_ref_level,
            bands,
        };

        Ok((drc, n))
    }
}

impl AacParser {
    /// Read a fill element following the element identifier. `last` is the index and type of
    /// the last single channel or channel pair element of the raw data block.
    pub(crate) fn read_fill<B: ReadBitsLtr + FiniteBitStream>(
        &mut self,
        bs: &mut B,
        last: Option<(usize, ElementType)>,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let mut count = bs.read_bits_leq32(4)? as usize;

        if count == 15 {
            count += bs.read_bits_leq32(8)? as usize;
            count -= 1;
        }

        while count > 0 {
            let n = self.read_extension_payload(bs, count, last, diag)?;

            count = match count.checked_sub(n) {
                Some(count) => count,
                None => return invalid_data_error("aac: extension payload overran fill element"),
            };
        }

        Ok(())
    }

    /// Read one extension payload of at most `count` bytes. Returns the number of bytes read.
    fn read_extension_payload<B: ReadBitsLtr + FiniteBitStream>(
        &mut self,
        bs: &mut B,
        count: usize,
        last: Option<(usize, ElementType)>,
        diag: &mut Diagnostics,
    ) -> Result<usize> {
        let extension_type = bs.read_bits_leq32(4)?;

        match extension_type {
            EXT_DYNAMIC_RANGE => {
                let (drc, n) = DynamicRange::read(bs)?;

                if n > count {
                    return invalid_data_error("aac: dynamic range overran fill element");
                }

                debug!("aac: dynamic range, bands={}", drc.bands.len());

                self.drc = Some(drc);
                Ok(n)
            }
            EXT_SBR_DATA | EXT_SBR_DATA_CRC => {
                self.read_sbr(bs, count, extension_type == EXT_SBR_DATA_CRC, last, diag)?;
                Ok(count)
            }
            EXT_DATA_ELEMENT => {
                let version = bs.read_bits_leq32(4)?;

                if version == ANC_DATA {
                    let mut len = 0;
                    let mut loops = 0;

                    loop {
                        let part = bs.read_bits_leq32(8)? as usize;
                        len += part;
                        loops += 1;

                        if part != 255 {
                            break;
                        }
                    }

                    bs.ignore_bits_u64(8 * len as u64)?;

                    Ok(len + loops + 1)
                }
                else {
                    bs.ignore_bits_u64(8 * (count as u64 - 1))?;
                    Ok(count)
                }
            }
            EXT_FILL | EXT_FILL_DATA | EXT_SAC_DATA => {
                bs.ignore_bits_u64(8 * (count as u64 - 1) + 4)?;
                Ok(count)
            }
            _ => {
                debug!("aac: unknown extension type {}", extension_type);

                bs.ignore_bits_u64(8 * (count as u64 - 1) + 4)?;
                Ok(count)
            }
        }
    }

    /// Read SBR data occupying the remainder of a fill element of `count` bytes.
    fn read_sbr<B: ReadBitsLtr + FiniteBitStream>(
        &mut self,
        bs: &mut B,
        count: usize,
        crc: bool,
        last: Option<(usize, ElementType)>,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let payload_bits = 8 * count as u64 - 4;

        let (index, element_type) = match last {
            Some(last) => last,
            None => {
                diag.add(
                    DiagLevel::Information,
                    "sbr data without a preceding channel element",
                    "aac fill element",
                );
                return bs.ignore_bits_u64(payload_bits);
            }
        };

        let start = bs.bits_left();

        let sample_rate = self.setup.sbr_sample_rate();
        let core_sample_rate = self.setup.sample_rate();
        let num_time_slots = self.setup.sbr_time_slots();

        let sbr = self.sbr[index]
            .get_or_insert_with(|| Box::new(SbrElement::new(sample_rate, core_sample_rate)));

        self.sbr_present = true;

        let result = sbr.read_extension(bs, element_type, crc, num_time_slots);

        if sbr.ps_present {
            self.ps_used = true;
        }

        result?;

        let used = start - bs.bits_left();

        if used > payload_bits {
            sbr.invalidate();
            return invalid_data_error("aac: sbr data overran fill element");
        }

        bs.ignore_bits_u64(payload_bits - used)
    }
}
