// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spectral Band Replication (SBR) bitstream parsing. ISO/IEC 14496-3 subpart 4, section 4.4.2.8.
//!
//! SBR data is carried in fill elements following the single or channel pair element it extends.
//! Each such element owns one `SbrElement` that persists across frames, since envelope and noise
//! floor data may be coded as differentials against the previous frame.

mod data;
mod freq;
mod grid;
mod tables;

pub use data::{SbrChannel, MAX_BANDS, MAX_NOISE_BANDS};
pub use freq::FrequencyTables;
pub use grid::{FrameClass, SbrGrid, MAX_ENVELOPES};

#[cfg(test)]
pub(crate) use tables::SbrCodebook;

use log::debug;

use mediatag_core::errors::{invalid_data_error, not_implemented_error, Result};
use mediatag_core::io::ReadBitsLtr;

use crate::aac::common::ElementType;

const EXTENSION_ID_DRM_PS: u32 = 0;
const EXTENSION_ID_PS: u32 = 2;

/// The SBR header. ISO/IEC 14496-3 Table 4.63.
///
/// The default value holds the values the optional header fields take when they are not sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SbrHeader {
    /// Set if the envelopes are coded with a 3.0 dB amplitude resolution.
    pub amp_res: bool,
    pub start_freq: u8,
    pub stop_freq: u8,
    pub xover_band: u8,
    pub freq_scale: u8,
    pub alter_scale: bool,
    pub noise_bands: u8,
    pub limiter_bands: u8,
    pub limiter_gains: u8,
    pub interpol_freq: bool,
    pub smoothing_mode: bool,
}

impl Default for SbrHeader {
    fn default() -> Self {
        SbrHeader {
            amp_res: false,
            start_freq: 0,
            stop_freq: 0,
            xover_band: 0,
            freq_scale: 2,
            alter_scale: true,
            noise_bands: 2,
            limiter_bands: 2,
            limiter_gains: 2,
            interpol_freq: true,
            smoothing_mode: true,
        }
    }
}

impl SbrHeader {
    /// Read an SBR header.
    pub fn read<B: ReadBitsLtr>(bs: &mut B) -> Result<Self> {
        let mut header = SbrHeader {
            amp_res: bs.read_bool()?,
            start_freq: bs.read_bits_leq32(4)? as u8,
            stop_freq: bs.read_bits_leq32(4)? as u8,
            xover_band: bs.read_bits_leq32(3)? as u8,
            ..Default::default()
        };

        // Reserved.
        bs.ignore_bits(2)?;

        let header_extra_1 = bs.read_bool()?;
        let header_extra_2 = bs.read_bool()?;

        if header_extra_1 {
            header.freq_scale = bs.read_bits_leq32(2)? as u8;
            header.alter_scale = bs.read_bool()?;
            header.noise_bands = bs.read_bits_leq32(2)? as u8;
        }

        if header_extra_2 {
            header.limiter_bands = bs.read_bits_leq32(2)? as u8;
            header.limiter_gains = bs.read_bits_leq32(2)? as u8;
            header.interpol_freq = bs.read_bool()?;
            header.smoothing_mode = bs.read_bool()?;
        }

        Ok(header)
    }

    /// Returns true if the fields that the frequency band tables are derived from differ.
    fn spectrum_changed(&self, other: &SbrHeader) -> bool {
        self.start_freq != other.start_freq
            || self.stop_freq != other.stop_freq
            || self.xover_band != other.xover_band
            || self.freq_scale != other.freq_scale
            || self.alter_scale != other.alter_scale
            || self.noise_bands != other.noise_bands
    }
}

/// The persistent state of the SBR data extending one single or channel pair element.
#[derive(Clone, Debug)]
pub struct SbrElement {
    /// The most recently received header.
    pub header: SbrHeader,
    /// Number of headers received.
    pub header_count: u32,
    /// Set once a header has been received and the frequency band tables are valid. SBR data is
    /// only parsed while set.
    pub start: bool,
    /// Set while the frequency band tables must be rebuilt from the next header.
    pub reset: bool,
    /// The SBR output sample rate.
    pub sample_rate: u32,
    /// Ratio of the SBR output sample rate to the core sample rate, either 1 or 2.
    pub rate: u8,
    pub tables: Option<FrequencyTables>,
    /// Set if the channels of a channel pair are coupled.
    pub coupling: bool,
    /// Set once parametric stereo data has been signalled.
    pub ps_present: bool,
    pub channels: [SbrChannel; 2],
}

impl SbrElement {
    /// Instantiate the SBR state for an element with an SBR output rate of `sample_rate` and a
    /// core sample rate of `core_sample_rate`.
    pub fn new(sample_rate: u32, core_sample_rate: u32) -> Self {
        SbrElement {
            header: Default::default(),
            header_count: 0,
            start: false,
            reset: true,
            sample_rate,
            rate: if sample_rate == 2 * core_sample_rate { 2 } else { 1 },
            tables: None,
            coupling: false,
            ps_present: false,
            channels: Default::default(),
        }
    }

    /// Drop the state carried between frames. Parsing resumes with the next header.
    pub fn invalidate(&mut self) {
        self.start = false;
        self.reset = true;
    }

    /// Read the SBR extension payload of a fill element extending an element of type
    /// `element_type`. ISO/IEC 14496-3 Table 4.62.
    ///
    /// On error the element is invalidated.
    pub fn read_extension<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        element_type: ElementType,
        crc: bool,
        num_time_slots: u8,
    ) -> Result<()> {
        let result = self.read_extension_inner(bs, element_type, crc, num_time_slots);

        if result.is_err() {
            self.invalidate();
        }

        result
    }

    fn read_extension_inner<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        element_type: ElementType,
        crc: bool,
        num_time_slots: u8,
    ) -> Result<()> {
        if crc {
            // The CRC is not verified.
            bs.ignore_bits(10)?;
        }

        if bs.read_bool()? {
            self.read_header(bs)?;
        }

        if !self.start {
            debug!("sbr: no header received yet, skipping sbr data");
            return Ok(());
        }

        match element_type {
            ElementType::Sce | ElementType::Cce => {
                self.read_single_channel_data(bs, num_time_slots)
            }
            ElementType::Cpe => self.read_channel_pair_data(bs, num_time_slots),
            _ => invalid_data_error("sbr: invalid element type"),
        }
    }

    fn read_header<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        let header = SbrHeader::read(bs)?;

        self.header_count += 1;

        if header.spectrum_changed(&self.header) {
            self.reset = true;
        }
        else if header.limiter_bands != self.header.limiter_bands && !self.reset {
            if let Some(tables) = self.tables.as_mut() {
                tables.calc_limiter(header.limiter_bands);
            }
        }

        self.header = header;

        if self.reset {
            debug!(
                "sbr: reset, start_freq={}, stop_freq={}, xover_band={}, freq_scale={}",
                header.start_freq, header.stop_freq, header.xover_band, header.freq_scale
            );

            self.tables = Some(FrequencyTables::new(&header, self.sample_rate)?);
            self.reset = false;
        }

        self.start = true;

        Ok(())
    }

    /// ISO/IEC 14496-3 Table 4.65.
    fn read_single_channel_data<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        num_time_slots: u8,
    ) -> Result<()> {
        let tables = match self.tables.as_ref() {
            Some(tables) => tables,
            None => return invalid_data_error("sbr: missing frequency tables"),
        };

        // Reserved.
        if bs.read_bool()? {
            bs.ignore_bits(4)?;
        }

        let ch = &mut self.channels[0];

        ch.grid.read(bs, self.header.amp_res, num_time_slots)?;
        ch.read_dtdf(bs)?;
        ch.read_invf(bs, tables.n_q())?;
        ch.read_envelope(bs, tables, false)?;
        ch.read_noise(bs, tables, false)?;
        ch.read_harmonics(bs, tables.num_bands(true))?;

        self.read_extended_data(bs)
    }

    /// ISO/IEC 14496-3 Table 4.66.
    fn read_channel_pair_data<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        num_time_slots: u8,
    ) -> Result<()> {
        let tables = match self.tables.as_ref() {
            Some(tables) => tables,
            None => return invalid_data_error("sbr: missing frequency tables"),
        };

        // Reserved.
        if bs.read_bool()? {
            bs.ignore_bits(8)?;
        }

        self.coupling = bs.read_bool()?;

        let amp_res = self.header.amp_res;
        let [ch0, ch1] = &mut self.channels;

        if self.coupling {
            ch0.grid.read(bs, amp_res, num_time_slots)?;
            ch1.grid.copy_from(&ch0.grid);
            ch0.read_dtdf(bs)?;
            ch1.read_dtdf(bs)?;
            ch0.read_invf(bs, tables.n_q())?;
            ch1.copy_invf(ch0);
            ch0.read_envelope(bs, tables, false)?;
            ch0.read_noise(bs, tables, false)?;
            ch1.read_envelope(bs, tables, true)?;
            ch1.read_noise(bs, tables, true)?;
        }
        else {
            ch0.grid.read(bs, amp_res, num_time_slots)?;
            ch1.grid.read(bs, amp_res, num_time_slots)?;
            ch0.read_dtdf(bs)?;
            ch1.read_dtdf(bs)?;
            ch0.read_invf(bs, tables.n_q())?;
            ch1.read_invf(bs, tables.n_q())?;
            ch0.read_envelope(bs, tables, false)?;
            ch1.read_envelope(bs, tables, false)?;
            ch0.read_noise(bs, tables, false)?;
            ch1.read_noise(bs, tables, false)?;
        }

        ch0.read_harmonics(bs, tables.num_bands(true))?;
        ch1.read_harmonics(bs, tables.num_bands(true))?;

        self.read_extended_data(bs)
    }

    fn read_extended_data<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        if !bs.read_bool()? {
            return Ok(());
        }

        let mut size = bs.read_bits_leq32(4)?;

        if size == 15 {
            size += bs.read_bits_leq32(8)?;
        }

        let mut bits_left = 8 * size;

        while bits_left > 7 {
            let id = bs.read_bits_leq32(2)?;
            bits_left -= 2;

            match id {
                EXTENSION_ID_PS => {
                    self.ps_present = true;
                    return not_implemented_error("sbr: parametric stereo");
                }
                EXTENSION_ID_DRM_PS => {
                    return not_implemented_error("sbr: drm parametric stereo");
                }
                _ => {
                    bs.ignore_bits(6)?;
                    bits_left -= 6;
                }
            }
        }

        bs.ignore_bits(bits_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::sbr::tables::SbrCodebook;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    fn write_code(bw: &mut BitWriterLtr, cb: SbrCodebook, value: i32) {
        let (code, len) = cb.codeword(value);
        bw.write_bits_leq32(code, len);
    }

    /// Write a header with start frequency 5 and stop frequency 9. At 44.1 kHz this gives 16 high
    /// resolution bands, 8 low resolution bands, and 4 noise floor bands.
    fn write_header(bw: &mut BitWriterLtr) {
        bw.write_bit_str("1 0 0101 1001 000 00 0 0");
    }

    /// Write a FIXFIX grid with one envelope.
    fn write_single_envelope_grid(bw: &mut BitWriterLtr, high_res: bool) {
        bw.write_bit_str("00 00");
        bw.write_bool(high_res);
    }

    #[test]
    fn verify_header_defaults() {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("1 0011 1010 010 00 1 1 01 0 11 00 01 0 1");
        let buf = bw.into_inner();

        let header = SbrHeader::read(&mut BitCursor::new(&buf)).unwrap();

        assert!(header.amp_res);
        assert_eq!((header.start_freq, header.stop_freq, header.xover_band), (3, 10, 2));
        assert_eq!((header.freq_scale, header.alter_scale, header.noise_bands), (1, false, 3));
        assert_eq!((header.limiter_bands, header.limiter_gains), (0, 1));
        assert!(!header.interpol_freq);
        assert!(header.smoothing_mode);
    }

    #[test]
    fn verify_no_header() {
        let mut sbr = SbrElement::new(44100, 22050);
        assert_eq!(sbr.rate, 2);

        let buf = [0x00, 0x00];
        let mut bs = BitCursor::new(&buf);

        sbr.read_extension(&mut bs, ElementType::Sce, false, 16).unwrap();

        assert!(!sbr.start);
        assert_eq!(bs.pos(), 1);
    }

    #[test]
    fn verify_single_channel_frames() {
        let mut sbr = SbrElement::new(44100, 22050);

        let mut bw = BitWriterLtr::new();
        write_header(&mut bw);
        bw.write_bit_str("0");
        write_single_envelope_grid(&mut bw, true);
        bw.write_bit_str("0 0");
        bw.write_bit_str("01 01 01 01");
        bw.write_bits_leq32(50, 7);
        for _ in 1..16 {
            write_code(&mut bw, SbrCodebook::EnvFreq1_5dB, 0);
        }
        bw.write_bits_leq32(10, 5);
        for _ in 1..4 {
            write_code(&mut bw, SbrCodebook::EnvFreq3_0dB, 0);
        }
        bw.write_bit_str("0 0");
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut bs = BitCursor::new(&buf);
        sbr.read_extension(&mut bs, ElementType::Sce, false, 16).unwrap();

        assert_eq!(bs.pos(), end);
        assert!(sbr.start);
        assert_eq!(sbr.header_count, 1);
        assert_eq!(sbr.tables.as_ref().map(|t| t.num_bands(true)), Some(16));

        let ch = &sbr.channels[0];
        assert_eq!(ch.grid.num_env, 1);
        assert_eq!(&ch.env_facs_q[1][..16], &[50; 16]);
        assert_eq!(&ch.noise_facs_q[1][..4], &[10; 4]);
        assert_eq!(&ch.invf_mode[..4], &[1; 4]);

        // The next frame has no header and codes everything as time differentials.
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("0 0");
        write_single_envelope_grid(&mut bw, true);
        bw.write_bit_str("1 1");
        bw.write_bit_str("00 00 00 00");
        for _ in 0..16 {
            write_code(&mut bw, SbrCodebook::EnvTime1_5dB, 2);
        }
        for _ in 0..4 {
            write_code(&mut bw, SbrCodebook::NoiseTime3_0dB, -1);
        }
        bw.write_bit_str("1 1000000000000000");
        bw.write_bit_str("0");
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        sbr.read_extension(&mut BitCursor::new(&buf), ElementType::Sce, false, 16).unwrap();

        let ch = &sbr.channels[0];
        assert_eq!(&ch.env_facs_q[1][..16], &[52; 16]);
        assert_eq!(&ch.noise_facs_q[1][..4], &[9; 4]);
        assert_eq!(&ch.invf_mode[..4], &[0; 4]);
        assert_eq!(&ch.prev_invf_mode[..4], &[1; 4]);
        assert!(ch.add_harmonic[0]);
        assert!(!ch.add_harmonic[1]);
        assert_eq!(sbr.header_count, 1);
    }

    #[test]
    fn verify_coupled_channel_pair() {
        let mut sbr = SbrElement::new(44100, 22050);

        let mut bw = BitWriterLtr::new();
        write_header(&mut bw);
        bw.write_bit_str("0 1");
        write_single_envelope_grid(&mut bw, false);
        bw.write_bit_str("0 0 0 0");
        bw.write_bit_str("10 10 10 10");
        // Envelope and noise floor of the first channel.
        bw.write_bits_leq32(40, 7);
        for _ in 1..8 {
            write_code(&mut bw, SbrCodebook::EnvFreq1_5dB, 1);
        }
        bw.write_bits_leq32(6, 5);
        for _ in 1..4 {
            write_code(&mut bw, SbrCodebook::EnvFreq3_0dB, 0);
        }
        // Balance envelope and noise floor of the second channel.
        bw.write_bits_leq32(12, 6);
        for _ in 1..8 {
            write_code(&mut bw, SbrCodebook::EnvBalFreq1_5dB, -1);
        }
        bw.write_bits_leq32(6, 5);
        for _ in 1..4 {
            write_code(&mut bw, SbrCodebook::EnvBalFreq3_0dB, 0);
        }
        bw.write_bit_str("0 0 0");
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        sbr.read_extension(&mut BitCursor::new(&buf), ElementType::Cpe, false, 16).unwrap();

        assert!(sbr.coupling);

        let [ch0, ch1] = &sbr.channels;
        assert_eq!(ch0.grid, ch1.grid);
        assert_eq!(ch0.invf_mode, ch1.invf_mode);
        assert_eq!(&ch0.env_facs_q[1][..8], &[40, 41, 42, 43, 44, 45, 46, 47]);
        assert_eq!(&ch1.env_facs_q[1][..8], &[24, 22, 20, 18, 16, 14, 12, 10]);
        assert_eq!(&ch0.noise_facs_q[1][..4], &[6; 4]);
        assert_eq!(&ch1.noise_facs_q[1][..4], &[12; 4]);
    }

    fn write_empty_single_channel_data(bw: &mut BitWriterLtr) {
        bw.write_bit_str("0");
        write_single_envelope_grid(bw, false);
        bw.write_bit_str("0 0");
        bw.write_bit_str("00 00 00 00");
        bw.write_bits_leq32(0, 7);
        for _ in 1..8 {
            write_code(bw, SbrCodebook::EnvFreq1_5dB, 0);
        }
        bw.write_bits_leq32(0, 5);
        for _ in 1..4 {
            write_code(bw, SbrCodebook::EnvFreq3_0dB, 0);
        }
        bw.write_bit_str("0");
    }

    #[test]
    fn verify_unknown_extension_consumed() {
        let mut sbr = SbrElement::new(44100, 22050);

        let mut bw = BitWriterLtr::new();
        write_header(&mut bw);
        write_empty_single_channel_data(&mut bw);
        bw.write_bit_str("1 0010");
        bw.write_bit_str("01 101010");
        bw.write_bit_str("11 000000");
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut bs = BitCursor::new(&buf);
        sbr.read_extension(&mut bs, ElementType::Sce, false, 16).unwrap();

        assert_eq!(bs.pos(), end);
        assert!(!sbr.ps_present);
    }

    #[test]
    fn verify_parametric_stereo_not_implemented() {
        let mut sbr = SbrElement::new(44100, 22050);

        let mut bw = BitWriterLtr::new();
        write_header(&mut bw);
        write_empty_single_channel_data(&mut bw);
        bw.write_bit_str("1 0001");
        bw.write_bit_str("10 000000");
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let result = sbr.read_extension(&mut BitCursor::new(&buf), ElementType::Sce, false, 16);

        assert!(matches!(result, Err(Error::NotImplemented(_))));
        assert!(sbr.ps_present);
        assert!(!sbr.start);
        assert!(sbr.reset);
    }

    #[test]
    fn verify_invalid_header_resets() {
        let mut sbr = SbrElement::new(44100, 22050);

        // A crossover band beyond the master table.
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("1 0 0101 0000 111 00 1 0 00 1 10");
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let result = sbr.read_extension(&mut BitCursor::new(&buf), ElementType::Sce, false, 16);

        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert!(!sbr.start);
        assert!(sbr.reset);
        assert!(sbr.tables.is_none());
    }

    #[test]
    fn verify_crc_skipped() {
        let mut sbr = SbrElement::new(44100, 22050);

        let mut bw = BitWriterLtr::new();
        bw.write_bits_leq32(0x3ff, 10);
        write_header(&mut bw);
        write_empty_single_channel_data(&mut bw);
        bw.write_bit_str("0");
        let end = bw.bits_written();
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut bs = BitCursor::new(&buf);
        sbr.read_extension(&mut bs, ElementType::Sce, true, 16).unwrap();

        assert_eq!(bs.pos(), end);
        assert!(sbr.start);
    }
}
