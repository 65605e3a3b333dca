// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::diag::Diagnostics;
use mediatag_core::errors::{invalid_data_error, not_implemented_error, Result};
use mediatag_core::io::ReadBitsLtr;

use crate::aac::codebooks;
use crate::aac::common::*;
use crate::aac::huffman::{codeword_dimension, read_spectral};
use crate::aac::AacSetup;
use crate::common::M4AType;

mod gain;
mod info;
mod ltp;
mod pulse;
mod tns;

pub use gain::{GainAdjust, GainControl};
pub use info::IcsInfo;
pub use ltp::{LtpData, Predictor};
pub use pulse::Pulse;
pub use tns::{Tns, TnsFilter};

/// An individual channel stream. ISO/IEC 14496-3 section 4.6.2, Table 4.50.
///
/// Holds the side information and the quantized spectral coefficients of one channel. Short
/// window coefficients are stored group interleaved: the coefficients of each group's windows
/// are interleaved per scalefactor band, as transmitted.
#[derive(Clone)]
pub struct Ics {
    pub global_gain: u8,
    pub info: IcsInfo,
    pub pulse: Option<Pulse>,
    pub tns: Option<Tns>,
    pub gain_control: Option<GainControl>,
    pub sections_per_group: [usize; MAX_WINDOWS],
    pub section_cb: [[u8; MAX_SECTIONS]; MAX_WINDOWS],
    pub section_start: [[u8; MAX_SECTIONS]; MAX_WINDOWS],
    pub section_end: [[u8; MAX_SECTIONS]; MAX_WINDOWS],
    pub sfb_cb: [[u8; MAX_SFB]; MAX_WINDOWS],
    pub scale_factors: [[i16; MAX_SFB]; MAX_WINDOWS],
    pub spectral: [i16; 1024],
}

impl Default for Ics {
    fn default() -> Self {
        Self::new()
    }
}

impl Ics {
    pub fn new() -> Self {
        Ics {
            global_gain: 0,
            info: IcsInfo::new(),
            pulse: None,
            tns: None,
            gain_control: None,
            sections_per_group: [0; MAX_WINDOWS],
            section_cb: [[0; MAX_SECTIONS]; MAX_WINDOWS],
            section_start: [[0; MAX_SECTIONS]; MAX_WINDOWS],
            section_end: [[0; MAX_SECTIONS]; MAX_WINDOWS],
            sfb_cb: [[0; MAX_SFB]; MAX_WINDOWS],
            scale_factors: [[0; MAX_SFB]; MAX_WINDOWS],
            spectral: [0; 1024],
        }
    }

    #[inline(always)]
    pub fn is_zero(&self, g: usize, sfb: usize) -> bool {
        self.sfb_cb[g][sfb] == ZERO_HCB
    }

    #[inline(always)]
    pub fn is_intensity(&self, g: usize, sfb: usize) -> bool {
        (self.sfb_cb[g][sfb] == INTENSITY_HCB) || (self.sfb_cb[g][sfb] == INTENSITY_HCB2)
    }

    #[inline(always)]
    pub fn is_noise(&self, g: usize, sfb: usize) -> bool {
        self.sfb_cb[g][sfb] == NOISE_HCB
    }

    /// Read an individual channel stream. If `common_window` is set, the ICS info was read by
    /// the enclosing channel pair and copied to this stream beforehand.
    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        setup: &AacSetup,
        common_window: bool,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let m4atype = setup.object_type;
        let is_er = m4atype.is_error_resilient();

        self.global_gain = bs.read_bits_leq32(8)? as u8;

        if !common_window {
            self.info.read(bs, setup, false)?;
        }

        self.read_section_data(bs, setup)?;

        if setup.scalefactor_data_resilience {
            return not_implemented_error("aac: reversible variable length scalefactors");
        }

        self.read_scale_factor_data(bs)?;

        self.pulse = Pulse::read(bs, self.info.swb_count)?;

        if self.pulse.is_some() && self.info.window_sequence.is_short() {
            return invalid_data_error("aac: pulse data in an eight short sequence");
        }

        let tns_data_present = bs.read_bool()?;
        let is_lc = matches!(m4atype, M4AType::Lc | M4AType::ER_AAC_LC);

        self.tns = None;

        // Error resilient streams carry the TNS data after the other side information.
        if tns_data_present && !is_er {
            self.tns = Some(Tns::read(bs, &self.info, is_lc)?);
        }

        self.gain_control = None;

        if bs.read_bool()? {
            if m4atype != M4AType::Ssr {
                return invalid_data_error("aac: gain control data outside of an ssr stream");
            }
            self.gain_control = Some(GainControl::read(bs, self.info.window_sequence)?);
        }

        if setup.spectral_data_resilience {
            let _length_of_reordered_spectral_data = bs.read_bits_leq32(14)?;
            let _length_of_longest_codeword = bs.read_bits_leq32(6)?;
        }

        if tns_data_present && is_er {
            self.tns = Some(Tns::read(bs, &self.info, is_lc)?);
        }

        if setup.spectral_data_resilience {
            return not_implemented_error("aac: huffman codeword reordering");
        }

        self.read_spectral_data(bs, diag)
    }

    fn read_section_data<B: ReadBitsLtr>(&mut self, bs: &mut B, setup: &AacSetup) -> Result<()> {
        let short = self.info.window_sequence.is_short();
        let resilience = setup.section_data_resilience;

        let sect_bits = if short { 3 } else { 5 };
        let sect_esc_val = (1 << sect_bits) - 1;
        let sect_cb_bits = if resilience { 5 } else { 4 };
        let max_sect_len = if short { MAX_SECTIONS } else { MAX_SFB };

        let max_sfb = self.info.max_sfb;

        self.sfb_cb = [[0; MAX_SFB]; MAX_WINDOWS];
        self.sections_per_group = [0; MAX_WINDOWS];

        for g in 0..self.info.window_group_count {
            let mut k = 0;
            let mut i = 0;

            while k < max_sfb {
                validate!(i < MAX_SECTIONS);

                let sect_cb = bs.read_bits_leq32(sect_cb_bits)? as u8;

                if sect_cb == RESERVED_HCB {
                    return invalid_data_error("aac: reserved codebook");
                }

                let mut sect_len = 0;

                if resilience && (sect_cb == ESC_HCB || sect_cb >= 16) {
                    sect_len = 1;
                }
                else {
                    loop {
                        let sect_len_incr = bs.read_bits_leq32(sect_bits)? as usize;

                        sect_len += sect_len_incr;

                        if sect_len_incr < sect_esc_val {
                            break;
                        }
                    }
                }

                validate!(sect_len <= max_sect_len);
                validate!(k + sect_len <= max_sfb);

                self.section_cb[g][i] = sect_cb;
                self.section_start[g][i] = k as u8;
                self.section_end[g][i] = (k + sect_len) as u8;

                self.sfb_cb[g][k..k + sect_len].fill(sect_cb);

                k += sect_len;
                i += 1;
            }

            self.sections_per_group[g] = i;
        }
        Ok(())
    }

    fn read_scale_factor_data<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        let mut noise_pcm_flag = true;
        let mut scf_intensity = 0i16;
        let mut scf_noise = i16::from(self.global_gain) - 90;
        let mut scf_normal = i16::from(self.global_gain);

        let scf_cb = &codebooks::SCALEFACTOR;

        self.scale_factors = [[0; MAX_SFB]; MAX_WINDOWS];

        for g in 0..self.info.window_group_count {
            for sfb in 0..self.info.max_sfb {
                self.scale_factors[g][sfb] = if self.is_zero(g, sfb) {
                    0
                }
                else if self.is_intensity(g, sfb) {
                    scf_intensity += scf_cb.read(bs)? as i16 - 60;
                    scf_intensity
                }
                else if self.is_noise(g, sfb) {
                    if noise_pcm_flag {
                        noise_pcm_flag = false;
                        scf_noise += (bs.read_bits_leq32(9)? as i16) - 256;
                    }
                    else {
                        scf_noise += scf_cb.read(bs)? as i16 - 60;
                    }
                    scf_noise
                }
                else {
                    scf_normal += scf_cb.read(bs)? as i16 - 60;
                    validate!((scf_normal >= 0) && (scf_normal < 256));
                    scf_normal
                }
            }
        }
        Ok(())
    }

    fn read_spectral_data<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        self.spectral.fill(0);

        let win_len = self.info.max_swb_offset;

        for g in 0..self.info.window_group_count {
            let base = self.info.group_start(g) * win_len;

            for i in 0..self.sections_per_group[g] {
                let cb = self.section_cb[g][i];

                if matches!(cb, ZERO_HCB | NOISE_HCB | INTENSITY_HCB | INTENSITY_HCB2) {
                    continue;
                }

                let offsets = &self.info.section_sfb_offset[g];

                let start = base + offsets[usize::from(self.section_start[g][i])];
                let end = base + offsets[usize::from(self.section_end[g][i])];

                validate!(end <= self.spectral.len());

                for out in self.spectral[start..end].chunks_exact_mut(codeword_dimension(cb)) {
                    read_spectral(bs, cb, out, diag)?;
                }
            }
        }
        Ok(())
    }
}
