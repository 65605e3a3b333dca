// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use smallvec::SmallVec;

use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

const MAX_COMMENT_LEN: usize = 257;

/// A speaker position element of a program config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramElement {
    pub is_cpe: bool,
    pub tag: u8,
}

/// A coupling channel element of a program config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramCouplingElement {
    pub is_ind_sw: bool,
    pub tag: u8,
}

/// The matrix downmix of a program config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixMixdown {
    pub idx: u8,
    pub pseudo_surround: bool,
}

/// A program config element. ISO/IEC 14496-3 section 4.5.2.1, Table 4.2.
#[derive(Clone)]
pub struct ProgramConfig {
    pub tag: u8,
    pub object_type: u8,
    pub sampling_frequency_index: u8,
    pub front: SmallVec<[ProgramElement; 16]>,
    pub side: SmallVec<[ProgramElement; 16]>,
    pub back: SmallVec<[ProgramElement; 16]>,
    pub lfe: SmallVec<[u8; 4]>,
    pub assoc_data: SmallVec<[u8; 8]>,
    pub cc: SmallVec<[ProgramCouplingElement; 16]>,
    /// Element instance tag of the mono downmix.
    pub mono_mixdown: Option<u8>,
    /// Element instance tag of the stereo downmix.
    pub stereo_mixdown: Option<u8>,
    pub matrix_mixdown: Option<MatrixMixdown>,
    comment: [u8; MAX_COMMENT_LEN],
    comment_len: usize,
}

impl ProgramConfig {
    /// Read a program config element following the element identifier.
    pub fn read<B: ReadBitsLtr>(bs: &mut B) -> Result<Self> {
        let tag = bs.read_bits_leq32(4)? as u8;
        let object_type = bs.read_bits_leq32(2)? as u8;
        let sampling_frequency_index = bs.read_bits_leq32(4)? as u8;

        let num_front = bs.read_bits_leq32(4)? as usize;
        let num_side = bs.read_bits_leq32(4)? as usize;
        let num_back = bs.read_bits_leq32(4)? as usize;
        let num_lfe = bs.read_bits_leq32(2)? as usize;
        let num_assoc_data = bs.read_bits_leq32(3)? as usize;
        let num_cc = bs.read_bits_leq32(4)? as usize;

        let mono_mixdown =
            if bs.read_bool()? { Some(bs.read_bits_leq32(4)? as u8) } else { None };

        let stereo_mixdown =
            if bs.read_bool()? { Some(bs.read_bits_leq32(4)? as u8) } else { None };

        let matrix_mixdown = if bs.read_bool()? {
            Some(MatrixMixdown {
                idx: bs.read_bits_leq32(2)? as u8,
                pseudo_surround: bs.read_bool()?,
            })
        }
        else {
            None
        };

        let front = read_elements(bs, num_front)?;
        let side = read_elements(bs, num_side)?;
        let back = read_elements(bs, num_back)?;

        let mut lfe = SmallVec::new();
        for _ in 0..num_lfe {
            lfe.push(bs.read_bits_leq32(4)? as u8);
        }

        let mut assoc_data = SmallVec::new();
        for _ in 0..num_assoc_data {
            assoc_data.push(bs.read_bits_leq32(4)? as u8);
        }

        let mut cc = SmallVec::new();
        for _ in 0..num_cc {
            cc.push(ProgramCouplingElement {
                is_ind_sw: bs.read_bool()?,
                tag: bs.read_bits_leq32(4)? as u8,
            });
        }

        bs.realign();

        let comment_len = bs.read_bits_leq32(8)? as usize;
        let mut comment = [0; MAX_COMMENT_LEN];

        for byte in comment[..comment_len].iter_mut() {
            *byte = bs.read_bits_leq32(8)? as u8;
        }

        Ok(ProgramConfig {
            tag,
            object_type,
            sampling_frequency_index,
            front,
            side,
            back,
            lfe,
            assoc_data,
            cc,
            mono_mixdown,
            stereo_mixdown,
            matrix_mixdown,
            comment,
            comment_len,
        })
    }

    /// Get the comment field.
    pub fn comment(&self) -> &[u8] {
        &self.comment[..self.comment_len]
    }

    /// Get the number of output channels of the program.
    pub fn channels(&self) -> usize {
        let count = |elems: &[ProgramElement]| -> usize {
            elems.iter().map(|e| if e.is_cpe { 2 } else { 1 }).sum()
        };

        count(&self.front) + count(&self.side) + count(&self.back) + self.lfe.len()
    }
}

impl fmt::Debug for ProgramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramConfig")
            .field("tag", &self.tag)
            .field("object_type", &self.object_type)
            .field("sampling_frequency_index", &self.sampling_frequency_index)
            .field("front", &self.front)
            .field("side", &self.side)
            .field("back", &self.back)
            .field("lfe", &self.lfe)
            .field("assoc_data", &self.assoc_data)
            .field("cc", &self.cc)
            .field("mono_mixdown", &self.mono_mixdown)
            .field("stereo_mixdown", &self.stereo_mixdown)
            .field("matrix_mixdown", &self.matrix_mixdown)
            .field("comment", &self.comment())
            .finish()
    }
}

fn read_elements<B: ReadBitsLtr>(
    bs: &mut B,
    count: usize,
) -> Result<SmallVec<[ProgramElement; 16]>> {
    let mut elems = SmallVec::new();

    for _ in 0..count {
        elems.push(ProgramElement { is_cpe: bs.read_bool()?, tag: bs.read_bits_leq32(4)? as u8 });
    }

    Ok(elems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    /// A 5.1 program: front centre and a front pair, a back pair, and an LFE.
    fn write_surround_program(bw: &mut BitWriterLtr, comment: &[u8]) {
        bw.write_bit_str("0011 01 0011");
        bw.write_bit_str("0010 0000 0001 01 000 0000");
        // No mono or stereo downmix, a matrix downmix.
        bw.write_bit_str("0 0 1 10 1");
        bw.write_bit_str("0 0000 1 0001");
        bw.write_bit_str("1 0010");
        bw.write_bit_str("0000");
        bw.realign();
        bw.write_bits_leq32(comment.len() as u32, 8);
        for &byte in comment {
            bw.write_bits_leq32(u32::from(byte), 8);
        }
    }

    #[test]
    fn verify_surround_program() {
        let mut bw = BitWriterLtr::new();
        write_surround_program(&mut bw, b"mix");
        let buf = bw.into_inner();

        let mut bs = BitCursor::new(&buf);
        let pce = ProgramConfig::read(&mut bs).unwrap();

        assert_eq!((pce.tag, pce.object_type, pce.sampling_frequency_index), (3, 1, 3));
        assert_eq!(
            &pce.front[..],
            &[ProgramElement { is_cpe: false, tag: 0 }, ProgramElement { is_cpe: true, tag: 1 }]
        );
        assert!(pce.side.is_empty());
        assert_eq!(&pce.back[..], &[ProgramElement { is_cpe: true, tag: 2 }]);
        assert_eq!(&pce.lfe[..], &[0]);
        assert!(pce.mono_mixdown.is_none() && pce.stereo_mixdown.is_none());
        assert_eq!(pce.matrix_mixdown, Some(MatrixMixdown { idx: 2, pseudo_surround: true }));
        assert_eq!(pce.channels(), 6);
        assert_eq!(pce.comment(), b"mix");
        assert_eq!(bs.pos(), 8 * buf.len() as u64);
    }

    #[test]
    fn verify_mixdowns_and_coupling() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0001 11 0100");
        // One front pair, one associated data element, two coupling channels.
        bw.write_bit_str("0001 0000 0000 00 001 0010");
        bw.write_bit_str("1 0101 1 0110 0");
        bw.write_bit_str("1 0111");
        bw.write_bit_str("1000");
        bw.write_bit_str("1 1001 0 1010");
        bw.realign();
        bw.write_bits_leq32(0, 8);
        let buf = bw.into_inner();

        let pce = ProgramConfig::read(&mut BitCursor::new(&buf)).unwrap();

        assert_eq!((pce.mono_mixdown, pce.stereo_mixdown), (Some(5), Some(6)));
        assert!(pce.matrix_mixdown.is_none());
        assert_eq!(&pce.assoc_data[..], &[8]);
        assert_eq!(
            &pce.cc[..],
            &[
                ProgramCouplingElement { is_ind_sw: true, tag: 9 },
                ProgramCouplingElement { is_ind_sw: false, tag: 10 }
            ]
        );
        assert_eq!(pce.channels(), 2);
        assert!(pce.comment().is_empty());
    }

    #[test]
    fn verify_truncated_comment() {
        let mut bw = BitWriterLtr::new();
        write_surround_program(&mut bw, b"a long comment");
        let mut buf = bw.into_inner();
        buf.truncate(buf.len() - 4);

        let result = ProgramConfig::read(&mut BitCursor::new(&buf));
        assert!(matches!(result, Err(Error::Truncated)));
    }
}
