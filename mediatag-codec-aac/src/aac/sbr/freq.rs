// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SBR frequency band tables. ISO/IEC 14496-3 section 4.6.18.3.

use mediatag_core::errors::{invalid_data_error, Result};

use smallvec::SmallVec;

use crate::aac::sbr::SbrHeader;

/// Start frequency offsets, indexed by sample rate class and `bs_start_freq`.
const SBR_OFFSET: [[i8; 16]; 6] = [
    [-8, -7, -6, -5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7],
    [-5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 9, 11, 13],
    [-5, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 9, 11, 13, 16],
    [-6, -4, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 9, 11, 13, 16],
    [-4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 9, 11, 13, 16],
    [-2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 9, 11, 13, 16, 20, 24],
];

/// Limiter bands per octave, warped, for `bs_limiter_bands` 1 through 3.
const LIMITER_BANDS_WARPED: [f32; 3] = [1.327_151_7, 1.185_092_8, 1.119_871_6];

const MAX_PATCHES: usize = 6;

type Bands = SmallVec<[i32; 64]>;

/// The frequency band tables of an SBR element, in QMF subbands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyTables {
    /// First QMF subband of the master table.
    pub k0: u8,
    /// Last QMF subband of the master table.
    pub k2: u8,
    /// First QMF subband of the SBR range.
    pub kx: u8,
    /// Number of QMF subbands in the SBR range.
    pub m: u8,
    pub master: SmallVec<[u8; 64]>,
    /// High frequency resolution band borders, `n_high + 1` entries.
    pub high: SmallVec<[u8; 64]>,
    /// Low frequency resolution band borders, `n_low + 1` entries.
    pub low: SmallVec<[u8; 32]>,
    /// Noise floor band borders, `n_q + 1` entries.
    pub noise: SmallVec<[u8; 8]>,
    /// Limiter band borders.
    pub limiter: SmallVec<[u8; 32]>,
    pub patch_num_subbands: SmallVec<[u8; MAX_PATCHES]>,
    pub patch_start_subband: SmallVec<[u8; MAX_PATCHES]>,
}

impl FrequencyTables {
    /// Derive all frequency band tables for the SBR header `header` at the SBR sample rate
    /// `sample_rate`.
    pub fn new(header: &SbrHeader, sample_rate: u32) -> Result<Self> {
        let (k0, k2, master) = master_table(header, sample_rate)?;

        let xover = usize::from(header.xover_band);
        let n_master = master.len() - 1;

        let high = &master[xover..];
        let n_high = n_master - xover;
        let n_low = (n_high + 1) / 2;

        let kx = high[0];
        let m = high[n_high] - high[0];

        if kx + m > 64 || kx > 32 {
            return invalid_data_error("sbr: invalid sbr range");
        }

        let odd = n_high & 1;

        let mut low = Bands::new();
        low.push(high[0]);
        low.extend((1..=n_low).map(|k| high[2 * k - odd]));

        let n_q = (f32::from(header.noise_bands) * (k2 as f32 / kx as f32).log2())
            .round_ties_even()
            .max(1.0) as usize;

        if n_q > 5 {
            return invalid_data_error("sbr: too many noise floor bands");
        }

        let mut noise = Bands::new();
        noise.push(low[0]);

        let mut i = 0;
        for k in 1..=n_q {
            i += (n_low - i) / (n_q + 1 - k);
            noise.push(low[i]);
        }

        let mut tables = FrequencyTables {
            k0: k0 as u8,
            k2: k2 as u8,
            kx: kx as u8,
            m: m as u8,
            master: master.iter().map(|&x| x as u8).collect(),
            high: high.iter().map(|&x| x as u8).collect(),
            low: low.iter().map(|&x| x as u8).collect(),
            noise: noise.iter().map(|&x| x as u8).collect(),
            ..Default::default()
        };

        tables.calc_patches(&master, sample_rate)?;
        tables.calc_limiter(header.limiter_bands);

        Ok(tables)
    }

    /// Number of bands in the master table.
    pub fn n_master(&self) -> usize {
        self.master.len() - 1
    }

    /// Number of bands at high (`true`) or low (`false`) frequency resolution.
    pub fn num_bands(&self, high_res: bool) -> usize {
        if high_res {
            self.high.len() - 1
        }
        else {
            self.low.len() - 1
        }
    }

    /// Number of noise floor bands.
    pub fn n_q(&self) -> usize {
        self.noise.len() - 1
    }

    /// Number of limiter bands.
    pub fn n_lim(&self) -> usize {
        self.limiter.len() - 1
    }

    fn calc_patches(&mut self, master: &[i32], sample_rate: u32) -> Result<()> {
        let k0 = i32::from(self.k0);
        let kx = i32::from(self.kx);
        let end = kx + i32::from(self.m);
        let n_master = master.len() - 1;

        let goal_sb = ((1000 << 11) + (sample_rate as i32 >> 1)) / sample_rate as i32;

        let mut k = if goal_sb < end {
            master.iter().position(|&f| f >= goal_sb).unwrap_or(n_master)
        }
        else {
            n_master
        };

        let mut msb = k0;
        let mut usb = kx;
        let mut sb;
        let mut last = None;

        self.patch_num_subbands.clear();
        self.patch_start_subband.clear();

        loop {
            if last == Some((k, msb)) || self.patch_num_subbands.len() >= MAX_PATCHES {
                return invalid_data_error("sbr: patch construction failed");
            }

            last = Some((k, msb));

            let mut i = k;
            let mut odd;

            loop {
                sb = master[i];
                odd = (sb + k0) & 1;

                if sb <= k0 - 1 + msb - odd {
                    break;
                }
                if i == 0 {
                    return invalid_data_error("sbr: patch construction failed");
                }
                i -= 1;
            }

            let num_subbands = (sb - usb).max(0);
            let start_subband = k0 - odd - num_subbands;

            if num_subbands > 0 {
                if start_subband < 0 {
                    return invalid_data_error("sbr: patch construction failed");
                }

                self.patch_num_subbands.push(num_subbands as u8);
                self.patch_start_subband.push(start_subband as u8);

                usb = sb;
                msb = sb;
            }
            else {
                msb = kx;
            }

            if master[k] - sb < 3 {
                k = n_master;
            }

            if sb == end {
                break;
            }
        }

        // A final patch narrower than 3 subbands is dropped.
        let num_patches = self.patch_num_subbands.len();

        if num_patches > 1 && self.patch_num_subbands[num_patches - 1] < 3 {
            self.patch_num_subbands.pop();
            self.patch_start_subband.pop();
        }

        if self.patch_num_subbands.is_empty() {
            return invalid_data_error("sbr: no patches");
        }

        Ok(())
    }

    /// Rebuild the limiter table for `limiter_bands`. ISO/IEC 14496-3 section 4.6.18.3.2.3.
    pub fn calc_limiter(&mut self, limiter_bands: u8) {
        let n_low = self.low.len() - 1;

        self.limiter.clear();

        if limiter_bands == 0 {
            self.limiter.push(self.low[0]);
            self.limiter.push(self.low[n_low]);
            return;
        }

        let warp = LIMITER_BANDS_WARPED[usize::from(limiter_bands.min(3) - 1)];
        let num_patches = self.patch_num_subbands.len();

        let mut patch_borders: SmallVec<[u8; MAX_PATCHES + 1]> = SmallVec::new();
        patch_borders.push(self.kx);

        for k in 0..num_patches {
            patch_borders.push(patch_borders[k] + self.patch_num_subbands[k]);
        }

        let mut lim: SmallVec<[u8; 32]> = self.low.clone();
        lim.extend_from_slice(&patch_borders[1..num_patches]);
        lim.sort_unstable();

        let mut n_lim = n_low + num_patches - 1;
        let mut out = 0;
        let mut pos = 1;

        while out < n_lim {
            let cur = lim[pos];

            if f32::from(cur) >= f32::from(lim[out]) * warp {
                out += 1;
                lim[out] = cur;
                pos += 1;
            }
            else if cur == lim[out] || !patch_borders.contains(&cur) {
                pos += 1;
                n_lim -= 1;
            }
            else if !patch_borders.contains(&lim[out]) {
                lim[out] = cur;
                pos += 1;
                n_lim -= 1;
            }
            else {
                out += 1;
                lim[out] = cur;
                pos += 1;
            }
        }

        lim.truncate(n_lim + 1);
        self.limiter = lim;
    }
}

/// Split the range `start..stop` into `num_bands` bands of logarithmically increasing width and
/// return the band widths.
fn make_bands(start: i32, stop: i32, num_bands: usize) -> Bands {
    let base = (stop as f32 / start as f32).powf(1.0 / num_bands as f32);

    let mut bands = Bands::new();
    let mut prod = start as f32;
    let mut previous = start;

    for _ in 0..num_bands - 1 {
        prod *= base;
        let present = prod.round_ties_even() as i32;
        bands.push(present - previous);
        previous = present;
    }

    bands.push(stop - previous);
    bands
}

/// Accumulate band widths into band borders starting at `start`. Every width must be positive.
fn accumulate(start: i32, widths: &[i32], borders: &mut Bands) -> Result<()> {
    let mut border = start;

    for &width in widths {
        if width <= 0 {
            return invalid_data_error("sbr: empty master frequency band");
        }
        border += width;
        borders.push(border);
    }

    Ok(())
}

fn check_n_master(n_master: i32, xover_band: u8) -> Result<()> {
    if n_master <= 0 || i32::from(xover_band) >= n_master {
        return invalid_data_error("sbr: invalid master frequency table size");
    }
    Ok(())
}

/// Derive k0, k2, and the master frequency band table. ISO/IEC 14496-3 section 4.6.18.3.2.
fn master_table(header: &SbrHeader, sample_rate: u32) -> Result<(i32, i32, Bands)> {
    let offsets = match sample_rate {
        16000 => &SBR_OFFSET[0],
        22050 => &SBR_OFFSET[1],
        24000 => &SBR_OFFSET[2],
        32000 => &SBR_OFFSET[3],
        44100 | 48000 | 64000 => &SBR_OFFSET[4],
        88200 | 96000 | 128000 | 176400 | 192000 => &SBR_OFFSET[5],
        _ => return invalid_data_error("sbr: unsupported sample rate"),
    };

    let fs = sample_rate as i32;

    let temp = if fs < 32000 {
        3000
    }
    else if fs < 64000 {
        4000
    }
    else {
        5000
    };

    let start_min = ((temp << 7) + (fs >> 1)) / fs;
    let stop_min = ((temp << 8) + (fs >> 1)) / fs;

    let k0 = start_min + i32::from(offsets[usize::from(header.start_freq & 0xf)]);

    let k2 = match header.stop_freq {
        0..=13 => {
            let mut stop_dk = make_bands(stop_min, 64, 13);
            stop_dk.sort_unstable();
            stop_min + stop_dk[..usize::from(header.stop_freq)].iter().sum::<i32>()
        }
        14 => 2 * k0,
        _ => 3 * k0,
    }
    .min(64);

    let max_qmf_subbands = if fs <= 32000 {
        48
    }
    else if fs == 44100 {
        35
    }
    else {
        32
    };

    if k2 - k0 > max_qmf_subbands || k2 <= k0 {
        return invalid_data_error("sbr: invalid frequency range");
    }

    let mut master = Bands::new();
    master.push(k0);

    if header.freq_scale == 0 {
        let dk = i32::from(header.alter_scale) + 1;
        let n_master = ((k2 - k0 + (dk & 2)) >> dk) << 1;

        check_n_master(n_master, header.xover_band)?;

        let n_master = n_master as usize;
        let mut widths: Bands = SmallVec::from_elem(dk, n_master);

        let k2diff = k2 - k0 - n_master as i32 * dk;

        if k2diff < 0 {
            widths[0] -= 1;
            if k2diff < -1 {
                widths[1] -= 1;
            }
        }
        else if k2diff > 0 {
            widths[n_master - 1] += 1;
        }

        accumulate(k0, &widths, &mut master)?;
    }
    else {
        let half_bands = 7.0 - f32::from(header.freq_scale);
        let two_regions = 49 * k2 > 110 * k0;
        let k1 = if two_regions { 2 * k0 } else { k2 };

        let num_bands_0 =
            2 * (half_bands * (k1 as f32 / k0 as f32).log2()).round_ties_even() as i32;

        if num_bands_0 <= 0 {
            return invalid_data_error("sbr: invalid master frequency table size");
        }

        let mut vdk0 = make_bands(k0, k1, num_bands_0 as usize);
        vdk0.sort_unstable();

        let vdk0_max = vdk0[vdk0.len() - 1];

        accumulate(k0, &vdk0, &mut master)?;

        if two_regions {
            let invwarp = if header.alter_scale { 0.769_230_77 } else { 1.0 };

            let num_bands_1 = 2 * (half_bands * invwarp * (k2 as f32 / k1 as f32).log2())
                .round_ties_even() as i32;

            if num_bands_1 <= 0 {
                return invalid_data_error("sbr: invalid master frequency table size");
            }

            let mut vdk1 = make_bands(k1, k2, num_bands_1 as usize);
            let last = vdk1.len() - 1;

            let vdk1_min = vdk1.iter().copied().min().unwrap_or(0);

            if vdk1_min < vdk0_max {
                vdk1.sort_unstable();
                let change = (vdk0_max - vdk1[0]).min((vdk1[last] - vdk1[0]) >> 1);
                vdk1[0] += change;
                vdk1[last] -= change;
            }

            vdk1.sort_unstable();

            accumulate(k1, &vdk1, &mut master)?;
        }

        check_n_master(master.len() as i32 - 1, header.xover_band)?;
    }

    Ok((k0, k2, master))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::errors::Error;

    fn header(start_freq: u8, stop_freq: u8, freq_scale: u8, alter_scale: bool) -> SbrHeader {
        SbrHeader { start_freq, stop_freq, freq_scale, alter_scale, ..Default::default() }
    }

    #[test]
    fn verify_default_log_tables() {
        let tables = FrequencyTables::new(&header(5, 9, 2, true), 44100).unwrap();

        assert_eq!((tables.k0, tables.k2, tables.kx, tables.m), (13, 47, 13, 34));
        assert_eq!(
            &tables.master[..],
            &[13, 14, 15, 16, 17, 18, 19, 20, 22, 24, 26, 29, 32, 35, 39, 43, 47]
        );
        assert_eq!(tables.high, tables.master);
        assert_eq!(&tables.low[..], &[13, 15, 17, 19, 22, 26, 32, 39, 47]);
        assert_eq!(&tables.noise[..], &[13, 17, 22, 32, 47]);
        assert_eq!(&tables.limiter[..], &[13, 17, 24, 35, 47]);
        assert_eq!(&tables.patch_num_subbands[..], &[11, 11, 12]);
        assert_eq!(&tables.patch_start_subband[..], &[1, 2, 1]);
        assert_eq!((tables.num_bands(true), tables.num_bands(false), tables.n_q()), (16, 8, 4));
    }

    #[test]
    fn verify_linear_tables() {
        let tables = FrequencyTables::new(&header(5, 9, 0, true), 44100).unwrap();

        assert_eq!(
            &tables.master[..],
            &[13, 14, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 43, 45, 47]
        );
        assert_eq!(&tables.low[..], &[13, 15, 19, 23, 27, 31, 35, 39, 43, 47]);
        assert_eq!(&tables.noise[..], &[13, 19, 27, 35, 47]);
        assert_eq!(&tables.limiter[..], &[13, 19, 25, 31, 37, 47]);
        assert_eq!(&tables.patch_num_subbands[..], &[12, 12, 10]);
    }

    #[test]
    fn verify_crossover_and_limiter_bands() {
        let mut hdr = header(3, 7, 1, false);
        hdr.xover_band = 1;
        hdr.noise_bands = 1;
        hdr.limiter_bands = 0;

        let tables = FrequencyTables::new(&hdr, 32000).unwrap();

        assert_eq!((tables.k0, tables.k2, tables.kx, tables.m), (15, 46, 16, 30));
        assert_eq!(tables.high[0], 16);
        assert_eq!(tables.n_master(), 20);
        assert_eq!(tables.num_bands(true), 19);
        assert_eq!(&tables.low[..], &[16, 17, 19, 21, 23, 26, 30, 34, 38, 42, 46]);
        assert_eq!(&tables.noise[..], &[16, 26, 46]);
        assert_eq!(&tables.limiter[..], &[16, 46]);
    }

    #[test]
    fn verify_stop_frequency_multiple() {
        let tables = FrequencyTables::new(&header(8, 14, 2, true), 24000).unwrap();

        assert_eq!((tables.k0, tables.k2), (20, 40));
        assert_eq!(&tables.master[..], &[20, 21, 22, 24, 26, 28, 30, 32, 34, 37, 40]);
        assert_eq!(&tables.patch_num_subbands[..], &[17, 3]);
        assert_eq!(&tables.limiter[..], &[20, 26, 37, 40]);
    }

    #[test]
    fn verify_invalid_ranges() {
        // Too many QMF subbands for 48 kHz.
        let result = FrequencyTables::new(&header(15, 15, 2, true), 48000);
        assert!(matches!(result, Err(Error::InvalidData(_))));

        // Unsupported sample rate.
        let result = FrequencyTables::new(&header(5, 9, 2, true), 8000);
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let mut hdr = header(5, 9, 2, true);
        hdr.xover_band = 7;
        let tables = FrequencyTables::new(&hdr, 44100).unwrap();
        assert_eq!(tables.kx, 20);

        // Crossover band beyond the master table.
        let mut hdr = header(5, 0, 0, true);
        assert!(FrequencyTables::new(&hdr, 44100).is_ok());
        hdr.xover_band = 7;
        let result = FrequencyTables::new(&hdr, 44100);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }
}
