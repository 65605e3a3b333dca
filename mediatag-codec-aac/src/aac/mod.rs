// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The AAC raw data block parser. ISO/IEC 14496-3 subpart 4.
//!
//! An [`AacParser`] is constructed once per elementary stream from an [`AacSetup`], and then fed
//! one raw data block at a time. After each block the syntax elements of the block, and the state
//! that persists between blocks, may be inspected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use mediatag_core::diag::{DiagLevel, Diagnostics};
use mediatag_core::errors::{
    aborted_error, invalid_data_error, not_implemented_error, Error, Result,
};
use mediatag_core::io::{BitCursor, FiniteBitStream, ReadBitsLtr};

use crate::adts::AdtsHeader;
use crate::common::{M4AType, AAC_SAMPLE_RATES};

mod cce;
mod codebooks;
mod common;
mod cpe;
mod fill;
mod huffman;
mod ics;
mod pce;
mod sbr;

pub use cce::{CouplingChannel, CouplingTarget, GainElements};
pub use common::{ElementType, WindowSequence, MAX_ELEMENTS};
pub use cpe::ChannelPair;
pub use fill::{DynamicRange, DynamicRangeBand};
pub use ics::{GainAdjust, GainControl, Ics, IcsInfo, LtpData, Predictor, Pulse, Tns, TnsFilter};
pub use pce::{MatrixMixdown, ProgramConfig, ProgramCouplingElement, ProgramElement};
pub use sbr::{FrameClass, FrequencyTables, SbrChannel, SbrElement, SbrGrid, SbrHeader};
pub use sbr::{
    MAX_BANDS as SBR_MAX_BANDS, MAX_ENVELOPES as SBR_MAX_ENVELOPES,
    MAX_NOISE_BANDS as SBR_MAX_NOISE_BANDS,
};

use common::ElementType as Id;

/// Sampling frequency indices 0 through 12 map to a standard sample rate.
const NUM_STANDARD_RATES: usize = 13;

/// The immutable setup of an AAC elementary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AacSetup {
    /// The audio object type of the core coder.
    pub object_type: M4AType,
    pub sampling_frequency_index: u8,
    /// The sampling frequency index of the SBR output sample rate.
    pub ext_sampling_frequency_index: u8,
    pub channel_config: u8,
    /// Number of samples per channel in a frame: 1024 or 960, or 512 or 480 for low delay.
    pub frame_length: u16,
    pub section_data_resilience: bool,
    pub scalefactor_data_resilience: bool,
    pub spectral_data_resilience: bool,
    /// Set if parametric stereo is signalled by the codec configuration.
    pub ps_signalled: bool,
}

impl AacSetup {
    /// Instantiate a setup with the default frame length of the object type. The SBR output
    /// sample rate is assumed to be twice the core sample rate.
    pub fn new(object_type: M4AType, sampling_frequency_index: u8, channel_config: u8) -> Self {
        // The SBR and PS object types only signal the presence of an extension to AAC LC.
        let object_type = match object_type {
            M4AType::Sbr | M4AType::PS => M4AType::Lc,
            object_type => object_type,
        };

        let frame_length = if object_type == M4AType::ER_AAC_LD { 512 } else { 1024 };

        AacSetup {
            object_type,
            sampling_frequency_index,
            ext_sampling_frequency_index: double_rate_index(sampling_frequency_index),
            channel_config,
            frame_length,
            section_data_resilience: false,
            scalefactor_data_resilience: false,
            spectral_data_resilience: false,
            ps_signalled: false,
        }
    }

    #[inline(always)]
    pub fn sfi(&self) -> usize {
        usize::from(self.sampling_frequency_index)
    }

    #[inline(always)]
    pub fn frame_length(&self) -> usize {
        usize::from(self.frame_length)
    }

    /// Get the core sample rate.
    pub fn sample_rate(&self) -> u32 {
        AAC_SAMPLE_RATES[usize::from(self.sampling_frequency_index & 0xf)]
    }

    /// Get the SBR output sample rate.
    pub fn sbr_sample_rate(&self) -> u32 {
        let ext = usize::from(self.ext_sampling_frequency_index);

        if ext < NUM_STANDARD_RATES {
            AAC_SAMPLE_RATES[ext]
        }
        else {
            2 * self.sample_rate()
        }
    }

    /// Get the number of SBR time slots in a frame.
    fn sbr_time_slots(&self) -> u8 {
        if self.frame_length == 960 {
            15
        }
        else {
            16
        }
    }
}

impl From<&AdtsHeader> for AacSetup {
    fn from(header: &AdtsHeader) -> Self {
        AacSetup::new(
            header.object_type(),
            header.sampling_frequency_index(),
            header.channel_config(),
        )
    }
}

/// Get the sampling frequency index of twice the rate of index `sfi`, or `sfi` if there is no
/// such standard rate.
fn double_rate_index(sfi: u8) -> u8 {
    let rate = AAC_SAMPLE_RATES[usize::from(sfi & 0xf)];

    AAC_SAMPLE_RATES[..NUM_STANDARD_RATES]
        .iter()
        .position(|&r| rate > 0 && r == 2 * rate)
        .map_or(sfi, |i| i as u8)
}

/// Options for an [`AacParser`].
#[derive(Clone, Debug, Default)]
pub struct AacParserOptions {
    /// Treat a warning raised while parsing a raw data block as an invalid data error.
    pub strict: bool,
    /// When set by another thread, parsing stops before the next syntax element and returns
    /// `OperationAborted`.
    pub abort: Option<Arc<AtomicBool>>,
}

/// The body of a channel syntax element.
#[derive(Clone)]
pub enum ElementPayload {
    /// A single channel or low frequency effects channel.
    Single(Box<Ics>),
    /// A channel pair.
    Pair(Box<ChannelPair>),
    /// A coupling channel.
    Coupling(Box<CouplingChannel>),
}

/// A channel syntax element of a raw data block.
#[derive(Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub instance_tag: u8,
    pub payload: ElementPayload,
}

/// A data stream element. ISO/IEC 14496-3 section 4.6.9, Table 4.10.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStream {
    pub tag: u8,
    pub data: Vec<u8>,
}

/// The AAC raw data block parser.
pub struct AacParser {
    setup: AacSetup,
    opts: AacParserOptions,
    elements: Vec<Element>,
    data_streams: Vec<DataStream>,
    pce: Option<ProgramConfig>,
    drc: Option<DynamicRange>,
    /// SBR state indexed by the index of the element it extends.
    sbr: Vec<Option<Box<SbrElement>>>,
    sbr_present: bool,
    ps_used: bool,
    diag: Diagnostics,
}

impl AacParser {
    /// Instantiate a parser for a stream with the given setup.
    pub fn new(setup: AacSetup, opts: AacParserOptions) -> Result<Self> {
        if setup.sfi() >= NUM_STANDARD_RATES {
            return invalid_data_error("aac: invalid sampling frequency index");
        }

        let valid_frame_length = if setup.object_type == M4AType::ER_AAC_LD {
            matches!(setup.frame_length, 480 | 512)
        }
        else {
            matches!(setup.frame_length, 960 | 1024)
        };

        if !valid_frame_length {
            return invalid_data_error("aac: invalid frame length for object type");
        }

        match setup.object_type {
            M4AType::Main
            | M4AType::Lc
            | M4AType::Ssr
            | M4AType::Ltp
            | M4AType::ER_AAC_LC
            | M4AType::ER_AAC_LTP
            | M4AType::ER_AAC_LD => (),
            _ => return not_implemented_error("aac: unsupported object type"),
        }

        debug!(
            "aac: {}, sfi={}, ext_sfi={}, channel_config={}, frame_length={}",
            setup.object_type,
            setup.sampling_frequency_index,
            setup.ext_sampling_frequency_index,
            setup.channel_config,
            setup.frame_length
        );

        Ok(AacParser {
            setup,
            opts,
            elements: Vec::new(),
            data_streams: Vec::new(),
            pce: None,
            drc: None,
            sbr: (0..MAX_ELEMENTS).map(|_| None).collect(),
            sbr_present: false,
            ps_used: setup.ps_signalled,
            diag: Diagnostics::new(),
        })
    }

    /// Parse one raw data block.
    ///
    /// On error the syntax elements of the block are discarded and the SBR state of every
    /// element is invalidated.
    pub fn parse_raw_data_block(&mut self, buf: &[u8]) -> Result<()> {
        let mut bs = BitCursor::new(buf);
        let mut diag = Diagnostics::new();

        self.elements.clear();
        self.data_streams.clear();

        let result = if self.setup.object_type.is_error_resilient() {
            self.read_er_raw_data_block(&mut bs, &mut diag)
        }
        else {
            self.read_raw_data_block(&mut bs, &mut diag)
        };

        let result = result.and_then(|_| {
            if self.opts.strict && diag.worst_level() >= Some(DiagLevel::Warning) {
                self.diag.extend_from(&diag);
                return invalid_data_error("aac: warning raised in strict mode");
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                self.diag.extend_from(&diag);
                Ok(())
            }
            Err(err) => {
                self.discard();
                Err(err)
            }
        }
    }

    /// Parse an ADTS frame: the header, and the raw data block that follows it. Frames carrying
    /// more than one raw data block are not supported.
    pub fn parse_adts_frame(&mut self, buf: &[u8]) -> Result<AdtsHeader> {
        let header = AdtsHeader::read(buf)?;

        if header.frame_count() > 1 {
            return not_implemented_error("aac: multiple raw data blocks per adts frame");
        }

        if header.total_size() > buf.len() {
            return Err(Error::Truncated);
        }

        self.parse_raw_data_block(&buf[header.header_size()..header.total_size()])?;

        Ok(header)
    }

    fn discard(&mut self) {
        self.elements.clear();
        self.data_streams.clear();

        for sbr in self.sbr.iter_mut().flatten() {
            sbr.invalidate();
        }
    }

    fn check_abort(&self) -> Result<()> {
        match &self.opts.abort {
            Some(abort) if abort.load(Ordering::Relaxed) => aborted_error(),
            _ => Ok(()),
        }
    }

    /// ISO/IEC 14496-3 section 4.4.2.1, Table 4.3.
    fn read_raw_data_block<B: ReadBitsLtr + FiniteBitStream>(
        &mut self,
        bs: &mut B,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        // The last single channel or channel pair element. Fill elements carrying SBR data
        // extend it.
        let mut last = None;

        loop {
            self.check_abort()?;

            let id = Id::from_id(bs.read_bits_leq32(3)?);

            match id {
                Id::Sce | Id::Cpe => {
                    let index = self.read_channel_element(bs, id, diag)?;
                    last = Some((index, id));
                }
                Id::Cce | Id::Lfe => {
                    self.read_channel_element(bs, id, diag)?;
                }
                Id::Dse => self.read_data_stream(bs)?,
                Id::Pce => {
                    let pce = ProgramConfig::read(bs)?;

                    debug!("aac: program config, tag={}, channels={}", pce.tag, pce.channels());

                    if self.pce.is_none() {
                        self.pce = Some(pce);
                    }
                }
                Id::Fil => self.read_fill(bs, last, diag)?,
                Id::End => break,
            }
        }

        Ok(())
    }

    /// ISO/IEC 14496-3 section 4.4.2.1, Table 4.4.
    fn read_er_raw_data_block<B: ReadBitsLtr + FiniteBitStream>(
        &mut self,
        bs: &mut B,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let sequence: &[Id] = match self.setup.channel_config {
            1 => &[Id::Sce],
            2 => &[Id::Cpe],
            3 => &[Id::Sce, Id::Cpe],
            4 => &[Id::Sce, Id::Cpe, Id::Sce],
            5 => &[Id::Sce, Id::Cpe, Id::Cpe],
            6 => &[Id::Sce, Id::Cpe, Id::Cpe, Id::Sce],
            7 => &[Id::Sce, Id::Cpe, Id::Cpe, Id::Cpe, Id::Sce],
            _ => return not_implemented_error("aac: error resilient channel configuration"),
        };

        let mut last = None;

        for &id in sequence {
            self.check_abort()?;
            let index = self.read_channel_element(bs, id, diag)?;
            last = Some((index, id));
        }

        // Element ids are not coded in the fixed sequence. Fill elements extending the last
        // channel element may follow it.
        while bs.bits_left() >= 3 && bs.peek_bits_leq32(3) == Id::Fil.id() {
            self.check_abort()?;
            bs.ignore_bits(3)?;
            self.read_fill(bs, last, diag)?;
        }

        Ok(())
    }

    /// Read a channel element and return its index.
    fn read_channel_element<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        element_type: ElementType,
        diag: &mut Diagnostics,
    ) -> Result<usize> {
        if self.elements.len() >= MAX_ELEMENTS {
            return not_implemented_error("aac: too many syntax elements");
        }

        let instance_tag = bs.read_bits_leq32(4)? as u8;

        debug!("aac: {}, tag={}", element_type, instance_tag);

        let payload = match element_type {
            Id::Sce | Id::Lfe => {
                let mut ics = Box::new(Ics::new());
                ics.read(bs, &self.setup, false, diag)?;
                ElementPayload::Single(ics)
            }
            Id::Cpe => {
                let mut cpe = Box::new(ChannelPair::new());
                cpe.read(bs, &self.setup, diag)?;
                ElementPayload::Pair(cpe)
            }
            _ => {
                let mut cce = Box::new(CouplingChannel::new());
                cce.read(bs, &self.setup, diag)?;
                ElementPayload::Coupling(cce)
            }
        };

        self.elements.push(Element { element_type, instance_tag, payload });

        Ok(self.elements.len() - 1)
    }

    /// ISO/IEC 14496-3 section 4.4.2.7, Table 4.10.
    fn read_data_stream<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        let tag = bs.read_bits_leq32(4)? as u8;
        let align = bs.read_bool()?;

        let mut count = bs.read_bits_leq32(8)? as usize;

        if count == 255 {
            count += bs.read_bits_leq32(8)? as usize;
        }

        if align {
            bs.realign();
        }

        let mut data = Vec::with_capacity(count);

        for _ in 0..count {
            data.push(bs.read_bits_leq32(8)? as u8);
        }

        self.data_streams.push(DataStream { tag, data });

        Ok(())
    }

    pub fn setup(&self) -> &AacSetup {
        &self.setup
    }

    /// Get the channel syntax elements of the last raw data block.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Get the instance tags of the channel syntax elements of the last raw data block.
    pub fn instance_tags(&self) -> impl Iterator<Item = u8> + '_ {
        self.elements.iter().map(|elem| elem.instance_tag)
    }

    /// Get the number of output channels of the last raw data block.
    pub fn channels(&self) -> usize {
        self.elements.iter().map(|elem| elem.element_type.channels()).sum()
    }

    /// Get the data stream elements of the last raw data block.
    pub fn data_streams(&self) -> &[DataStream] {
        &self.data_streams
    }

    /// Get the first program config element seen.
    pub fn pce(&self) -> Option<&ProgramConfig> {
        self.pce.as_ref()
    }

    /// Get the most recent dynamic range control information.
    pub fn drc(&self) -> Option<&DynamicRange> {
        self.drc.as_ref()
    }

    /// Get the SBR state extending the element at `index`.
    pub fn sbr(&self, index: usize) -> Option<&SbrElement> {
        self.sbr.get(index)?.as_deref()
    }

    /// Returns true once SBR data has been seen.
    pub fn sbr_present(&self) -> bool {
        self.sbr_present
    }

    /// Returns true if parametric stereo has been signalled.
    pub fn ps_used(&self) -> bool {
        self.ps_used
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Take the accumulated diagnostics, leaving an empty log.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::codebooks::{scalefactor_codeword, spectral_codeword};
    use mediatag_core::io::BitWriterLtr;

    fn write_id(bw: &mut BitWriterLtr, id: Id, tag: u32) {
        bw.write_bits_leq32(id.id(), 3);
        if id != Id::End {
            bw.write_bits_leq32(tag, 4);
        }
    }

    /// Write a long window channel stream with no coded bands.
    fn write_silent_ics(bw: &mut BitWriterLtr) {
        bw.write_bits_leq32(100, 8);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(0, 6);
        bw.write_bool(false);
        bw.write_bit_str("000");
    }

    fn lc_parser(channel_config: u8) -> AacParser {
        AacParser::new(AacSetup::new(M4AType::Lc, 4, channel_config), Default::default()).unwrap()
    }

    #[test]
    fn verify_setup() {
        let setup = AacSetup::new(M4AType::Sbr, 6, 2);

        assert_eq!(setup.object_type, M4AType::Lc);
        assert_eq!(setup.frame_length(), 1024);
        assert_eq!(setup.sample_rate(), 24000);
        assert_eq!(setup.ext_sampling_frequency_index, 3);
        assert_eq!(setup.sbr_sample_rate(), 48000);

        // 96 kHz has no standard rate at twice the rate.
        let setup = AacSetup::new(M4AType::Lc, 0, 2);
        assert_eq!(setup.ext_sampling_frequency_index, 0);
        assert_eq!(setup.sbr_sample_rate(), 96000);

        let setup = AacSetup::new(M4AType::ER_AAC_LD, 3, 1);
        assert_eq!(setup.frame_length(), 512);
    }

    #[test]
    fn verify_setup_validation() {
        let opts = AacParserOptions::default;

        let result = AacParser::new(AacSetup::new(M4AType::Lc, 13, 2), opts());
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let mut setup = AacSetup::new(M4AType::Lc, 3, 2);
        setup.frame_length = 512;
        assert!(matches!(AacParser::new(setup, opts()), Err(Error::InvalidData(_))));

        setup.frame_length = 960;
        assert!(AacParser::new(setup, opts()).is_ok());

        let result = AacParser::new(AacSetup::new(M4AType::ER_BSAC, 3, 2), opts());
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    #[test]
    fn verify_element_sequence() {
        let mut parser = lc_parser(0);

        let mut bw = BitWriterLtr::new();
        write_id(&mut bw, Id::Sce, 0);
        write_silent_ics(&mut bw);
        write_id(&mut bw, Id::Cpe, 1);
        bw.write_bool(false);
        write_silent_ics(&mut bw);
        write_silent_ics(&mut bw);
        write_id(&mut bw, Id::Lfe, 2);
        write_silent_ics(&mut bw);
        write_id(&mut bw, Id::End, 0);
        let buf = bw.into_inner();

        parser.parse_raw_data_block(&buf).unwrap();

        assert_eq!(parser.element_count(), 3);
        assert_eq!(parser.channels(), 4);
        assert_eq!(parser.instance_tags().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(parser.elements()[2].element_type, Id::Lfe);
        assert!(matches!(parser.elements()[1].payload, ElementPayload::Pair(_)));
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn verify_data_stream() {
        let mut parser = lc_parser(1);

        let mut bw = BitWriterLtr::new();
        write_id(&mut bw, Id::Dse, 5);
        // Byte aligned, 3 bytes.
        bw.write_bool(true);
        bw.write_bits_leq32(3, 8);
        bw.realign();
        bw.write_bits_leq32(0xc0ffee, 24);
        write_id(&mut bw, Id::End, 0);
        let buf = bw.into_inner();

        parser.parse_raw_data_block(&buf).unwrap();

        assert_eq!(parser.element_count(), 0);
        assert_eq!(parser.data_streams(), &[DataStream { tag: 5, data: vec![0xc0, 0xff, 0xee] }]);
    }

    #[test]
    fn verify_missing_end() {
        let mut parser = lc_parser(1);

        let mut bw = BitWriterLtr::new();
        write_id(&mut bw, Id::Sce, 0);
        write_silent_ics(&mut bw);
        let buf = bw.into_inner();

        let result = parser.parse_raw_data_block(&buf);

        assert!(matches!(result, Err(Error::Truncated)));
        assert_eq!(parser.element_count(), 0);
    }

    #[test]
    fn verify_element_limit() {
        let mut parser = lc_parser(1);

        let mut bw = BitWriterLtr::new();
        for _ in 0..=MAX_ELEMENTS {
            write_id(&mut bw, Id::Sce, 0);
            write_silent_ics(&mut bw);
        }
        write_id(&mut bw, Id::End, 0);
        let buf = bw.into_inner();

        let result = parser.parse_raw_data_block(&buf);
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    #[test]
    fn verify_abort() {
        let abort = Arc::new(AtomicBool::new(true));
        let opts = AacParserOptions { abort: Some(abort.clone()), ..Default::default() };

        let mut parser = AacParser::new(AacSetup::new(M4AType::Lc, 4, 1), opts).unwrap();

        let mut bw = BitWriterLtr::new();
        write_id(&mut bw, Id::Sce, 0);
        write_silent_ics(&mut bw);
        write_id(&mut bw, Id::End, 0);
        let buf = bw.into_inner();

        assert!(matches!(parser.parse_raw_data_block(&buf), Err(Error::OperationAborted)));

        abort.store(false, Ordering::Relaxed);
        assert!(parser.parse_raw_data_block(&buf).is_ok());
    }

    /// An error resilient mono setup with virtual codebooks enabled.
    fn vcb11_setup() -> AacSetup {
        let mut setup = AacSetup::new(M4AType::ER_AAC_LC, 4, 1);
        setup.section_data_resilience = true;
        setup
    }

    /// Write a single channel with band 0 coded by virtual codebook 16, holding the value 17
    /// which exceeds the largest absolute value of the codebook.
    fn write_oversized_sce(bw: &mut BitWriterLtr) {
        bw.write_bits_leq32(0, 4);
        bw.write_bits_leq32(100, 8);
        bw.write_bit_str("0 00 0");
        bw.write_bits_leq32(1, 6);
        bw.write_bool(false);
        // Virtual codebook sections are one band long.
        bw.write_bits_leq32(16, 5);
        let (code, len) = scalefactor_codeword(60);
        bw.write_bits_leq32(code, len);
        bw.write_bit_str("000");
        // Band 0 holds 2 pairs of (16, 2). The escape of 16 codes 17.
        for _ in 0..2 {
            let (code, len) = spectral_codeword(11, 16 * 17 + 2);
            bw.write_bits_leq32(code, len);
            bw.write_bit_str("00");
            bw.write_bit_str("00001");
        }
    }

    #[test]
    fn verify_oversized_values_warn() {
        let mut parser = AacParser::new(vcb11_setup(), Default::default()).unwrap();

        let mut bw = BitWriterLtr::new();
        write_oversized_sce(&mut bw);
        let buf = bw.into_inner();

        parser.parse_raw_data_block(&buf).unwrap();

        match &parser.elements()[0].payload {
            ElementPayload::Single(ics) => assert_eq!(&ics.spectral[..4], &[0, 0, 0, 0]),
            _ => panic!("expected a single channel"),
        }
        assert_eq!(parser.diagnostics().len(), 2);
        assert_eq!(parser.diagnostics().worst_level(), Some(DiagLevel::Warning));
    }

    #[test]
    fn verify_strict_mode() {
        let opts = AacParserOptions { strict: true, ..Default::default() };
        let mut parser = AacParser::new(vcb11_setup(), opts).unwrap();

        let mut bw = BitWriterLtr::new();
        write_oversized_sce(&mut bw);
        let buf = bw.into_inner();

        let result = parser.parse_raw_data_block(&buf);

        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert_eq!(parser.element_count(), 0);
        assert!(parser.diagnostics().has(DiagLevel::Warning));
    }

    #[test]
    fn verify_error_resilient_sequence() {
        let mut parser =
            AacParser::new(AacSetup::new(M4AType::ER_AAC_LC, 3, 3), Default::default()).unwrap();

        let mut bw = BitWriterLtr::new();
        bw.write_bits_leq32(4, 4);
        write_silent_ics(&mut bw);
        bw.write_bits_leq32(9, 4);
        bw.write_bool(false);
        write_silent_ics(&mut bw);
        write_silent_ics(&mut bw);
        let buf = bw.into_inner();

        parser.parse_raw_data_block(&buf).unwrap();

        assert_eq!(parser.instance_tags().collect::<Vec<_>>(), vec![4, 9]);
        assert_eq!(parser.channels(), 3);
    }

    #[test]
    fn verify_error_resilient_without_channel_config() {
        let mut parser =
            AacParser::new(AacSetup::new(M4AType::ER_AAC_LC, 3, 0), Default::default()).unwrap();

        let result = parser.parse_raw_data_block(&[0; 8]);
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }
}
