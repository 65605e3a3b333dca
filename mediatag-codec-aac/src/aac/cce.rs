// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smallvec::SmallVec;

use mediatag_core::diag::Diagnostics;
use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

use crate::aac::codebooks;
use crate::aac::common::*;
use crate::aac::ics::Ics;
use crate::aac::AacSetup;

/// An element a coupling channel is coupled to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CouplingTarget {
    pub is_cpe: bool,
    pub tag: u8,
    /// Set if the coupling channel is applied to the left channel of a target channel pair.
    pub cc_l: bool,
    /// Set if the coupling channel is applied to the right channel of a target channel pair.
    pub cc_r: bool,
}

/// The gain elements of one gain element list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GainElements {
    /// A single gain for all bands.
    Common(i16),
    /// Differentially coded gains per window group and band. Bands coded with the zero codebook
    /// carry no gain.
    PerBand(Box<[[i16; MAX_SFB]; MAX_WINDOWS]>),
}

/// A coupling channel element. ISO/IEC 14496-3 section 4.6.8.3, Table 4.8.
#[derive(Clone)]
pub struct CouplingChannel {
    /// Set if the coupling channel is switched independently, after the inverse transform.
    pub ind_sw: bool,
    pub targets: SmallVec<[CouplingTarget; 8]>,
    /// Set if coupling is applied after temporal noise shaping, otherwise before.
    pub domain: bool,
    pub gain_element_sign: bool,
    pub gain_element_scale: u8,
    pub ics: Ics,
    /// The gain element lists following the first. The gains of the first list are implied.
    pub gain_lists: Vec<GainElements>,
}

impl Default for CouplingChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CouplingChannel {
    pub fn new() -> Self {
        CouplingChannel {
            ind_sw: false,
            targets: SmallVec::new(),
            domain: false,
            gain_element_sign: false,
            gain_element_scale: 0,
            ics: Ics::new(),
            gain_lists: Vec::new(),
        }
    }

    /// Read the coupling channel following the element instance tag.
    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        setup: &AacSetup,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        self.ind_sw = bs.read_bool()?;

        let num_coupled_elements = bs.read_bits_leq32(3)? as usize + 1;

        let mut num_gain_element_lists = 0;

        self.targets.clear();

        for _ in 0..num_coupled_elements {
            num_gain_element_lists += 1;

            let mut target = CouplingTarget {
                is_cpe: bs.read_bool()?,
                tag: bs.read_bits_leq32(4)? as u8,
                ..Default::default()
            };

            if target.is_cpe {
                target.cc_l = bs.read_bool()?;
                target.cc_r = bs.read_bool()?;

                if target.cc_l && target.cc_r {
                    num_gain_element_lists += 1;
                }
            }

            self.targets.push(target);
        }

        self.domain = bs.read_bool()?;
        self.gain_element_sign = bs.read_bool()?;
        self.gain_element_scale = bs.read_bits_leq32(2)? as u8;

        self.ics.read(bs, setup, false, diag)?;

        self.gain_lists.clear();

        for _ in 1..num_gain_element_lists {
            let common_gain_element_present = self.ind_sw || bs.read_bool()?;

            let gains = if common_gain_element_present {
                GainElements::Common(read_gain(bs)?)
            }
            else {
                let mut gains = Box::new([[0; MAX_SFB]; MAX_WINDOWS]);

                for g in 0..self.ics.info.window_group_count {
                    for sfb in 0..self.ics.info.max_sfb {
                        if !self.ics.is_zero(g, sfb) {
                            gains[g][sfb] = read_gain(bs)?;
                        }
                    }
                }

                GainElements::PerBand(gains)
            };

            self.gain_lists.push(gains);
        }

        Ok(())
    }
}

#[inline(always)]
fn read_gain<B: ReadBitsLtr>(bs: &mut B) -> Result<i16> {
    Ok(codebooks::SCALEFACTOR.read(bs)? as i16 - 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::codebooks::{scalefactor_codeword, spectral_codeword};
    use crate::common::M4AType;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    fn write_scalefactor(bw: &mut BitWriterLtr, diff: i32) {
        let (code, len) = scalefactor_codeword((diff + 60) as usize);
        bw.write_bits_leq32(code, len);
    }

    /// Write a long window channel stream with 2 bands coded by codebook 1 and all zero
    /// coefficients.
    fn write_ics(bw: &mut BitWriterLtr) {
        bw.write_bits_leq32(100, 8);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(2, 6);
        bw.write_bool(false);
        bw.write_bits_leq32(1, 4);
        bw.write_bits_leq32(2, 5);
        write_scalefactor(bw, 0);
        write_scalefactor(bw, 0);
        bw.write_bit_str("000");
        for _ in 0..2 {
            let (code, len) = spectral_codeword(1, 40);
            bw.write_bits_leq32(code, len);
        }
    }

    #[test]
    fn verify_gain_lists() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        // Dependently switched, 2 targets: a single channel, and both channels of a pair.
        bw.write_bit_str("0 001");
        bw.write_bit_str("0 0001");
        bw.write_bit_str("1 0010 1 1");
        bw.write_bit_str("1 0 10");
        write_ics(&mut bw);
        // A common gain, then per band gains.
        bw.write_bool(true);
        write_scalefactor(&mut bw, 5);
        bw.write_bool(false);
        write_scalefactor(&mut bw, -2);
        write_scalefactor(&mut bw, 3);
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cce = CouplingChannel::new();
        let mut bs = BitCursor::new(&buf);
        cce.read(&mut bs, &setup, &mut Diagnostics::new()).unwrap();

        assert_eq!(bs.pos(), end);
        assert!(!cce.ind_sw);
        assert_eq!(cce.targets.len(), 2);
        assert_eq!(cce.targets[0], CouplingTarget { tag: 1, ..Default::default() });
        assert_eq!(
            cce.targets[1],
            CouplingTarget { is_cpe: true, tag: 2, cc_l: true, cc_r: true }
        );
        assert!(cce.domain);
        assert!(!cce.gain_element_sign);
        assert_eq!(cce.gain_element_scale, 2);
        assert_eq!(cce.gain_lists.len(), 2);
        assert_eq!(cce.gain_lists[0], GainElements::Common(5));

        match &cce.gain_lists[1] {
            GainElements::PerBand(gains) => assert_eq!(&gains[0][..3], &[-2, 3, 0]),
            _ => panic!("expected per band gains"),
        }
    }

    #[test]
    fn verify_independently_switched() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        // Independently switched, 1 target: the left channel of a pair.
        bw.write_bit_str("1 000");
        bw.write_bit_str("1 0000 1 0");
        bw.write_bit_str("0 1 00");
        write_ics(&mut bw);
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cce = CouplingChannel::new();
        let mut bs = BitCursor::new(&buf);
        cce.read(&mut bs, &setup, &mut Diagnostics::new()).unwrap();

        assert_eq!(bs.pos(), end);
        assert!(cce.ind_sw);
        assert!(cce.gain_element_sign);
        assert!(cce.gain_lists.is_empty());
        assert_eq!(cce.ics.global_gain, 100);
    }

    #[test]
    fn verify_independently_switched_common_gain() {
        let setup = AacSetup::new(M4AType::Lc, 3, 2);

        let mut bw = BitWriterLtr::new();
        // Independently switched, both channels of a pair, so one extra gain list that is
        // implicitly a common gain.
        bw.write_bit_str("1 000");
        bw.write_bit_str("1 0000 1 1");
        bw.write_bit_str("0 0 00");
        write_ics(&mut bw);
        write_scalefactor(&mut bw, -7);
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut cce = CouplingChannel::new();
        cce.read(&mut BitCursor::new(&buf), &setup, &mut Diagnostics::new()).unwrap();

        assert_eq!(cce.gain_lists, vec![GainElements::Common(-7)]);
    }
}
