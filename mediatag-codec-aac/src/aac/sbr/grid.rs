// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::errors::{invalid_data_error, Result};
use mediatag_core::io::ReadBitsLtr;

use log::debug;

/// Maximum number of SBR envelopes in one frame.
pub const MAX_ENVELOPES: usize = 5;

const CEIL_LOG2: [u32; 6] = [0, 1, 2, 2, 3, 3];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameClass {
    #[default]
    FixFix,
    FixVar,
    VarFix,
    VarVar,
}

impl FrameClass {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => FrameClass::FixFix,
            1 => FrameClass::FixVar,
            2 => FrameClass::VarFix,
            _ => FrameClass::VarVar,
        }
    }

    /// Returns true if the trailing border of the frame is variable.
    fn has_var_trail(self) -> bool {
        matches!(self, FrameClass::FixVar | FrameClass::VarVar)
    }
}

/// The time/frequency grid of one SBR channel. ISO/IEC 14496-3 section 4.5.2.8.2.2, Table 4.69.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SbrGrid {
    pub frame_class: FrameClass,
    pub num_env: usize,
    pub num_noise: usize,
    /// Set if the envelopes are coded with a 3.0 dB amplitude resolution.
    pub amp_res: bool,
    /// Frequency resolution of each envelope, starting at index 1. Index 0 holds the resolution
    /// of the last envelope of the previous frame.
    pub freq_res: [bool; MAX_ENVELOPES + 1],
    pub abs_bord_lead: u8,
    pub abs_bord_trail: u8,
    pub num_rel_lead: u8,
    pub num_rel_trail: u8,
    pub rel_bord_lead: [u8; 3],
    pub rel_bord_trail: [u8; 3],
    pub pointer: u8,
    /// Envelope time borders, `num_env + 1` entries.
    pub t_env: [u8; MAX_ENVELOPES + 1],
    /// Noise floor time borders, `num_noise + 1` entries.
    pub t_q: [u8; 3],
    /// Index of the envelope starting at a transient.
    pub transient_env: Option<usize>,
}

impl SbrGrid {
    /// Read the grid of one channel. `num_time_slots` is the nominal frame length in SBR time
    /// slots.
    pub fn read<B: ReadBitsLtr>(
        &mut self,
        bs: &mut B,
        amp_res: bool,
        num_time_slots: u8,
    ) -> Result<()> {
        self.freq_res[0] = self.freq_res[self.num_env];
        self.amp_res = amp_res;

        let frame_class = FrameClass::from_bits(bs.read_bits_leq32(2)?);

        let mut abs_bord_trail = i32::from(num_time_slots);
        let mut abs_bord_lead = 0;
        let mut num_rel_lead = 0;
        let mut num_rel_trail = 0;
        let mut rel_bord_lead = [0; 3];
        let mut rel_bord_trail = [0; 3];
        let mut pointer = 0;

        let num_env = match frame_class {
            FrameClass::FixFix => {
                let num_env = (1usize << bs.read_bits_leq32(2)?).min(MAX_ENVELOPES);

                if num_env == 1 {
                    self.amp_res = false;
                }

                num_rel_lead = num_env - 1;

                self.freq_res[1] = bs.read_bool()?;

                for i in 2..=num_env {
                    self.freq_res[i] = self.freq_res[1];
                }

                num_env
            }
            FrameClass::FixVar => {
                abs_bord_trail += bs.read_bits_leq32(2)? as i32;
                num_rel_trail = bs.read_bits_leq32(2)? as usize;

                for rel in rel_bord_trail[..num_rel_trail].iter_mut() {
                    *rel = bs.read_bits_leq32(2)? as u8;
                }

                let num_env = num_rel_trail + 1;

                pointer = bs.read_bits_leq32(CEIL_LOG2[num_env])?;

                // Frequency resolutions are transmitted last envelope first.
                for i in 0..num_env {
                    self.freq_res[num_env - i] = bs.read_bool()?;
                }

                num_env
            }
            FrameClass::VarFix => {
                abs_bord_lead = bs.read_bits_leq32(2)? as i32;
                num_rel_lead = bs.read_bits_leq32(2)? as usize;

                for rel in rel_bord_lead[..num_rel_lead].iter_mut() {
                    *rel = bs.read_bits_leq32(2)? as u8;
                }

                let num_env = num_rel_lead + 1;

                pointer = bs.read_bits_leq32(CEIL_LOG2[num_env])?;

                for i in 1..=num_env {
                    self.freq_res[i] = bs.read_bool()?;
                }

                num_env
            }
            FrameClass::VarVar => {
                abs_bord_lead = bs.read_bits_leq32(2)? as i32;
                abs_bord_trail += bs.read_bits_leq32(2)? as i32;
                num_rel_lead = bs.read_bits_leq32(2)? as usize;
                num_rel_trail = bs.read_bits_leq32(2)? as usize;

                let num_env = num_rel_lead + num_rel_trail + 1;

                if num_env > MAX_ENVELOPES {
                    return invalid_data_error("sbr: too many envelopes in a varvar frame");
                }

                for rel in rel_bord_lead[..num_rel_lead].iter_mut() {
                    *rel = bs.read_bits_leq32(2)? as u8;
                }
                for rel in rel_bord_trail[..num_rel_trail].iter_mut() {
                    *rel = bs.read_bits_leq32(2)? as u8;
                }

                pointer = bs.read_bits_leq32(CEIL_LOG2[num_env])?;

                for i in 1..=num_env {
                    self.freq_res[i] = bs.read_bool()?;
                }

                num_env
            }
        };

        if pointer as usize > num_env + 1 {
            return invalid_data_error("sbr: noise border pointer outside of the frame");
        }

        // Derive the envelope borders.
        let mut t_env = [0i32; MAX_ENVELOPES + 1];

        t_env[0] = abs_bord_lead;
        t_env[num_env] = abs_bord_trail;

        if frame_class == FrameClass::FixFix {
            let step = (abs_bord_trail + (num_env as i32 >> 1)) / num_env as i32;

            for i in 0..num_rel_lead {
                t_env[i + 1] = t_env[i] + step;
            }
        }
        else {
            for i in 0..num_rel_lead {
                t_env[i + 1] = t_env[i] + 2 * i32::from(rel_bord_lead[i]) + 2;
            }
            for i in 0..num_rel_trail {
                t_env[num_env - 1 - i] = t_env[num_env - i] - 2 * i32::from(rel_bord_trail[i]) - 2;
            }
        }

        for i in 1..=num_env {
            if t_env[i - 1] >= t_env[i] {
                debug!("sbr: envelope borders {:?}", &t_env[..=num_env]);
                return invalid_data_error("sbr: envelope borders are not strictly increasing");
            }
        }

        let num_noise = if num_env > 1 { 2 } else { 1 };

        let mut t_q = [0; 3];
        t_q[0] = t_env[0] as u8;
        t_q[num_noise] = t_env[num_env] as u8;

        if num_noise > 1 {
            let idx = match frame_class {
                FrameClass::FixFix => num_env >> 1,
                FrameClass::FixVar | FrameClass::VarVar => {
                    num_env - (pointer as usize).saturating_sub(1).max(1)
                }
                FrameClass::VarFix => match pointer {
                    0 => 1,
                    1 => num_env - 1,
                    _ => pointer as usize - 1,
                },
            };
            t_q[1] = t_env[idx] as u8;
        }

        self.transient_env = if frame_class.has_var_trail() && pointer > 0 {
            Some(num_env + 1 - pointer as usize)
        }
        else if frame_class == FrameClass::VarFix && pointer > 1 {
            Some(pointer as usize - 1)
        }
        else {
            None
        };

        self.frame_class = frame_class;
        self.num_env = num_env;
        self.num_noise = num_noise;
        self.abs_bord_lead = abs_bord_lead as u8;
        self.abs_bord_trail = abs_bord_trail as u8;
        self.num_rel_lead = num_rel_lead as u8;
        self.num_rel_trail = num_rel_trail as u8;
        self.rel_bord_lead = rel_bord_lead;
        self.rel_bord_trail = rel_bord_trail;
        self.pointer = pointer as u8;
        self.t_q = t_q;

        for (dst, &src) in self.t_env.iter_mut().zip(&t_env) {
            *dst = src as u8;
        }

        Ok(())
    }

    /// Copy the grid of the first channel of a coupled channel pair.
    pub fn copy_from(&mut self, src: &SbrGrid) {
        // The resolution of the previous frame's last envelope is retained.
        let prev_freq_res = self.freq_res[self.num_env];

        *self = *src;
        self.freq_res[0] = prev_freq_res;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::errors::Error;
    use mediatag_core::io::{BitCursor, BitWriterLtr};

    fn read_grid(bits: &str) -> Result<SbrGrid> {
        let mut bw = BitWriterLtr::new();
        bw.write_bit_str(bits);
        bw.write_bits_leq32(0, 16);
        let buf = bw.into_inner();

        let mut grid = SbrGrid::default();
        grid.read(&mut BitCursor::new(&buf), true, 16)?;
        Ok(grid)
    }

    #[test]
    fn verify_fixfix() {
        // Class FixFix, 2 envelopes, high frequency resolution.
        let grid = read_grid("00 01 1").unwrap();

        assert_eq!(grid.frame_class, FrameClass::FixFix);
        assert_eq!(grid.num_env, 2);
        assert_eq!(grid.num_noise, 2);
        assert!(grid.amp_res);
        assert_eq!(&grid.t_env[..3], &[0, 8, 16]);
        assert_eq!(grid.t_q, [0, 8, 16]);
        assert_eq!(&grid.freq_res[1..3], &[true, true]);
        assert_eq!(grid.transient_env, None);
    }

    #[test]
    fn verify_fixfix_single_envelope() {
        let grid = read_grid("00 00 0").unwrap();

        assert_eq!(grid.num_env, 1);
        assert_eq!(grid.num_noise, 1);
        assert!(!grid.amp_res);
        assert_eq!(&grid.t_env[..2], &[0, 16]);
        assert_eq!(&grid.t_q[..2], &[0, 16]);
    }

    #[test]
    fn verify_fixfix_envelope_count_capped() {
        // An exponent of 3 signals 8 envelopes, which is limited to 5.
        let grid = read_grid("00 11 1").unwrap();

        assert_eq!(grid.num_env, 5);
        assert_eq!(grid.num_noise, 2);
        assert_eq!(grid.t_env, [0, 3, 6, 9, 12, 16]);
        assert_eq!(grid.t_q, [0, 6, 16]);
        assert_eq!(&grid.freq_res[1..], &[true; 5]);
    }

    #[test]
    fn verify_fixvar() {
        // Class FixVar, trail +1, 2 relative trailing borders of 2 and 4 slots, pointer 1,
        // and resolutions transmitted last envelope first.
        let grid = read_grid("01 01 10 00 01 01 1 0 0").unwrap();

        assert_eq!(grid.frame_class, FrameClass::FixVar);
        assert_eq!(grid.num_env, 3);
        assert_eq!(grid.abs_bord_trail, 17);
        assert_eq!(&grid.t_env[..4], &[0, 11, 15, 17]);
        assert_eq!(&grid.freq_res[1..4], &[false, false, true]);
        assert_eq!(grid.pointer, 1);
        assert_eq!(grid.t_q, [0, 15, 17]);
        assert_eq!(grid.transient_env, Some(3));
    }

    #[test]
    fn verify_varfix() {
        // Class VarFix, lead 1, 1 relative leading border of 6 slots, pointer 2.
        let grid = read_grid("10 01 01 10 10 0 1").unwrap();

        assert_eq!(grid.frame_class, FrameClass::VarFix);
        assert_eq!(grid.num_env, 2);
        assert_eq!(&grid.t_env[..3], &[1, 7, 16]);
        assert_eq!(grid.t_q, [1, 7, 16]);
        assert_eq!(grid.transient_env, Some(1));
    }

    #[test]
    fn verify_varvar_borders() {
        // Class VarVar where the leading borders pass the trailing borders.
        let result = read_grid("11 11 00 01 01 11 11 00 000");
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_pointer_range() {
        // Class FixVar with 4 envelopes and a pointer of 7.
        let result = read_grid("01 00 11 00 00 00 111");
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn verify_copy_keeps_previous_resolution() {
        let mut first = read_grid("00 01 1").unwrap();
        first.freq_res[0] = false;

        let mut second = SbrGrid::default();
        second.num_env = 1;
        second.freq_res[1] = true;

        second.copy_from(&first);

        assert!(second.freq_res[0]);
        assert_eq!(second.num_env, 2);
        assert_eq!(second.t_env, first.t_env);
    }
}
