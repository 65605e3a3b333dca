// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::ReadBitsLtr;

use crate::aac::sbr::freq::FrequencyTables;
use crate::aac::sbr::grid::{SbrGrid, MAX_ENVELOPES};
use crate::aac::sbr::tables::SbrCodebook;

/// Maximum number of SBR frequency bands at high resolution.
pub const MAX_BANDS: usize = 48;

/// Maximum number of SBR noise floor bands.
pub const MAX_NOISE_BANDS: usize = 5;

const MAX_ENVELOPE_VALUE: i32 = 127;
const MAX_NOISE_VALUE: i32 = 30;

/// The bitstream state of one SBR channel. Values carried over to the next frame for time
/// differential decoding are kept in row 0 of the envelope and noise floor data.
#[derive(Clone, Debug)]
pub struct SbrChannel {
    pub grid: SbrGrid,
    /// Set per envelope if the envelope is coded as a time differential.
    pub df_env: [bool; MAX_ENVELOPES],
    /// Set per noise floor if the noise floor is coded as a time differential.
    pub df_noise: [bool; 2],
    pub invf_mode: [u8; MAX_NOISE_BANDS],
    /// Inverse filtering modes of the previous frame.
    pub prev_invf_mode: [u8; MAX_NOISE_BANDS],
    /// Quantized envelope scalefactors. Row 0 holds the last envelope of the previous frame.
    pub env_facs_q: [[u8; MAX_BANDS]; MAX_ENVELOPES + 1],
    /// Quantized noise floor scalefactors. Row 0 holds the last noise floor of the previous
    /// frame.
    pub noise_facs_q: [[u8; MAX_NOISE_BANDS]; 3],
    pub add_harmonic_flag: bool,
    pub add_harmonic: [bool; MAX_BANDS],
}

impl Default for SbrChannel {
    fn default() -> Self {
        SbrChannel {
            grid: Default::default(),
            df_env: [false; MAX_ENVELOPES],
            df_noise: [false; 2],
            invf_mode: [0; MAX_NOISE_BANDS],
            prev_invf_mode: [0; MAX_NOISE_BANDS],
            env_facs_q: [[0; MAX_BANDS]; MAX_ENVELOPES + 1],
            noise_facs_q: [[0; MAX_NOISE_BANDS]; 3],
            add_harmonic_flag: false,
            add_harmonic: [false; MAX_BANDS],
        }
    }
}

impl SbrChannel {
    /// Read the delta coding direction of each envelope and noise floor. ISO/IEC 14496-3
    /// Table 4.71.
    pub fn read_dtdf<B: ReadBitsLtr>(&mut self, bs: &mut B) -> Result<()> {
        for df in self.df_env[..self.grid.num_env].iter_mut() {
            *df = bs.read_bool()?;
        }
        for df in self.df_noise[..self.grid.num_noise].iter_mut() {
            *df = bs.read_bool()?;
        }
        Ok(())
    }

    /// Read the inverse filtering mode of each noise floor band. ISO/IEC 14496-3 Table 4.72.
    pub fn read_invf<B: ReadBitsLtr>(&mut self, bs: &mut B, n_q: usize) -> Result<()> {
        self.prev_invf_mode = self.invf_mode;

        for mode in self.invf_mode[..n_q].iter_mut() {
            *mode = bs.read_bits_leq32(2)? as u8;
        }
        Ok(())
    }

    /// Take the inverse filtering modes of the first channel of a coupled channel pair.
    pub fn copy_invf(&mut self, src: &SbrChannel) {
        self.prev_invf_mode = self.invf_mode;
        self.invf_mode = src.invf_mode;
    }

    /// Read the envelope scalefactors. ISO/IEC 14496-3 Table 4.73.
    ///
    /// If `balance` is set, the channel is the second channel of a coupled channel pair and
    /// carries balance values coded with twice the step size.
    pub fn read_envelope<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        tables: &FrequencyTables,
        balance: bool,
    ) -> Result<()> {
        let amp_res = self.grid.amp_res;
        let delta = if balance { 2 } else { 1 };

        let (t_huff, f_huff) = SbrCodebook::envelope(balance, amp_res);

        // Width of the absolute start value of a frequency differential envelope.
        let start_bits = match (balance, amp_res) {
            (false, false) => 7,
            (false, true) | (true, false) => 6,
            (true, true) => 5,
        };

        let odd = tables.num_bands(true) & 1;

        for env in 0..self.grid.num_env {
            let res = self.grid.freq_res[env + 1];
            let prev_res = self.grid.freq_res[env];
            let num_bands = tables.num_bands(res);

            let (prev, cur) = self.env_facs_q.split_at_mut(env + 1);
            let prev = &prev[env];
            let cur = &mut cur[0];

            if self.df_env[env] {
                for band in 0..num_bands {
                    // Map the band onto the frequency resolution of the previous envelope.
                    let k = if res == prev_res {
                        band
                    }
                    else if res {
                        (band + odd) >> 1
                    }
                    else if band == 0 {
                        0
                    }
                    else {
                        2 * band - odd
                    };

                    let value = i32::from(prev[k]) + delta * t_huff.read(bs)?;
                    cur[band] = check_range(value, MAX_ENVELOPE_VALUE, "sbr: invalid envelope")?;
                }
            }
            else {
                let mut value = delta * bs.read_bits_leq32(start_bits)? as i32;
                cur[0] = value as u8;

                for band in 1..num_bands {
                    value += delta * f_huff.read(bs)?;
                    cur[band] = check_range(value, MAX_ENVELOPE_VALUE, "sbr: invalid envelope")?;
                }
            }
        }

        self.env_facs_q[0] = self.env_facs_q[self.grid.num_env];

        Ok(())
    }

    /// Read the noise floor scalefactors. ISO/IEC 14496-3 Table 4.74.
    pub fn read_noise<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        tables: &FrequencyTables,
        balance: bool,
    ) -> Result<()> {
        let delta = if balance { 2 } else { 1 };
        let n_q = tables.n_q();

        let (t_huff, f_huff) = SbrCodebook::noise(balance);

        for noise in 0..self.grid.num_noise {
            let (prev, cur) = self.noise_facs_q.split_at_mut(noise + 1);
            let prev = &prev[noise];
            let cur = &mut cur[0];

            if self.df_noise[noise] {
                for band in 0..n_q {
                    let value = i32::from(prev[band]) + delta * t_huff.read(bs)?;
                    cur[band] = check_range(value, MAX_NOISE_VALUE, "sbr: invalid noise floor")?;
                }
            }
            else {
                let mut value = delta * bs.read_bits_leq32(5)? as i32;
                cur[0] = value as u8;

                for band in 1..n_q {
                    value += delta * f_huff.read(bs)?;
                    cur[band] = check_range(value, MAX_NOISE_VALUE, "sbr: invalid noise floor")?;
                }
            }
        }

        self.noise_facs_q[0] = self.noise_facs_q[self.grid.num_noise];

        Ok(())
    }

    /// Read the added sinusoid flags. ISO/IEC 14496-3 Table 4.75.
    pub fn read_harmonics<B: ReadBitsLtr>(&mut self, bs: &mut B, n_high: usize) -> Result<()> {
        self.add_harmonic_flag = bs.read_bool()?;

        if self.add_harmonic_flag {
            for flag in self.add_harmonic[..n_high].iter_mut() {
                *flag = bs.read_bool()?;
            }
        }
        else {
            self.add_harmonic = [false; MAX_BANDS];
        }
        Ok(())
    }
}

#[inline(always)]
fn check_range(value: i32, max: i32, msg: &'static str) -> Result<u8> {
    if value < 0 || value > max {
        return invalid_data_error(msg);
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aac::sbr::SbrHeader;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    fn tables() -> FrequencyTables {
        // 16 high resolution bands, 8 low resolution bands, and 4 noise floor bands.
        let header = SbrHeader { start_freq: 5, stop_freq: 9, ..Default::default() };
        FrequencyTables::new(&header, 44100).unwrap()
    }

    fn write_code(bw: &mut BitWriterLtr, cb: SbrCodebook, value: i32) {
        let (code, len) = cb.codeword(value);
        bw.write_bits_leq32(code, len);
    }

    fn channel(num_env: usize, freq_res: bool, amp_res: bool) -> SbrChannel {
        let mut ch = SbrChannel::default();
        ch.grid.num_env = num_env;
        ch.grid.num_noise = if num_env > 1 { 2 } else { 1 };
        ch.grid.amp_res = amp_res;
        for res in ch.grid.freq_res[1..=num_env].iter_mut() {
            *res = freq_res;
        }
        ch
    }

    #[test]
    fn verify_frequency_differential_envelope() {
        let tables = tables();
        let mut ch = channel(1, false, true);

        let mut bw = BitWriterLtr::new();
        bw.write_bits_leq32(40, 6);
        for band in 1..8 {
            write_code(&mut bw, SbrCodebook::EnvFreq3_0dB, if band % 2 == 0 { 2 } else { -1 });
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        ch.read_envelope(&mut BitCursor::new(&buf), &tables, false).unwrap();

        assert_eq!(&ch.env_facs_q[1][..8], &[40, 39, 41, 40, 42, 41, 43, 42]);
        assert_eq!(ch.env_facs_q[0], ch.env_facs_q[1]);
    }

    #[test]
    fn verify_time_differential_resolution_mapping() {
        let tables = tables();
        let mut ch = channel(1, true, false);

        // The previous frame ended with a low resolution envelope.
        ch.grid.freq_res[0] = false;
        for (i, v) in ch.env_facs_q[0][..8].iter_mut().enumerate() {
            *v = 10 * i as u8;
        }
        ch.df_env[0] = true;

        let mut bw = BitWriterLtr::new();
        for _ in 0..16 {
            write_code(&mut bw, SbrCodebook::EnvTime1_5dB, 1);
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        ch.read_envelope(&mut BitCursor::new(&buf), &tables, false).unwrap();

        // With an even number of high resolution bands, high band j maps to low band j / 2.
        let expected: Vec<u8> = (0..16).map(|j| 10 * (j / 2) + 1).collect();
        assert_eq!(&ch.env_facs_q[1][..16], &expected[..]);
    }

    #[test]
    fn verify_balance_envelope_range() {
        let tables = tables();
        let mut ch = channel(1, false, true);

        // A balance start value of 30 is doubled to 60, then 4 steps of +12 exceed 127.
        let mut bw = BitWriterLtr::new();
        bw.write_bits_leq32(30, 5);
        for _ in 1..8 {
            write_code(&mut bw, SbrCodebook::EnvBalFreq3_0dB, 12);
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let result = ch.read_envelope(&mut BitCursor::new(&buf), &tables, true);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_noise_floors() {
        let tables = tables();
        let mut ch = channel(2, false, false);
        ch.df_noise = [false, true];

        let mut bw = BitWriterLtr::new();
        bw.write_bits_leq32(20, 5);
        for _ in 1..4 {
            write_code(&mut bw, SbrCodebook::EnvFreq3_0dB, -3);
        }
        for _ in 0..4 {
            write_code(&mut bw, SbrCodebook::NoiseTime3_0dB, 1);
        }
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        ch.read_noise(&mut BitCursor::new(&buf), &tables, false).unwrap();

        assert_eq!(&ch.noise_facs_q[1][..4], &[20, 17, 14, 11]);
        assert_eq!(&ch.noise_facs_q[2][..4], &[21, 18, 15, 12]);
        assert_eq!(ch.noise_facs_q[0], ch.noise_facs_q[2]);
    }

    #[test]
    fn verify_invf_and_harmonics() {
        let mut ch = channel(1, false, false);
        ch.invf_mode = [1, 1, 1, 1, 1];

        let mut bw = BitWriterLtr::new();
        bw.write_bit_str("11 10 01 00");
        bw.write_bit_str("1 101");
        bw.write_bits_leq32(0, 8);
        let buf = bw.into_inner();

        let mut bs = BitCursor::new(&buf);
        ch.read_invf(&mut bs, 4).unwrap();
        ch.read_harmonics(&mut bs, 3).unwrap();

        assert_eq!(ch.invf_mode, [3, 2, 1, 0, 1]);
        assert_eq!(ch.prev_invf_mode, [1; 5]);
        assert!(ch.add_harmonic_flag);
        assert_eq!(&ch.add_harmonic[..4], &[true, false, true, false]);
        assert_eq!(bs.pos(), 12);
    }
}
