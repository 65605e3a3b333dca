// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quantized spectral coefficient decoding.

use mediatag_core::diag::{DiagLevel, Diagnostics};
use mediatag_core::errors::Result;
use mediatag_core::io::ReadBitsLtr;

use crate::aac::codebooks::SPECTRAL;
use crate::aac::common::*;

/// Largest absolute values of the virtual codebooks 16 through 31.
pub const VCB11_LAV: [i16; 16] =
    [16, 31, 47, 63, 95, 127, 159, 191, 223, 255, 319, 383, 511, 767, 1023, 2047];

/// Get the number of coefficients each codeword of spectral codebook `cb` decodes to.
#[inline(always)]
pub fn codeword_dimension(cb: u8) -> usize {
    if cb < FIRST_PAIR_HCB {
        4
    }
    else {
        2
    }
}

#[inline(always)]
fn apply_sign<B: ReadBitsLtr>(bs: &mut B, val: &mut i16) -> Result<()> {
    if *val != 0 && bs.read_bool()? {
        *val = -*val;
    }
    Ok(())
}

/// Read an escape sequence for a coefficient with a magnitude of 16. ISO/IEC 14496-3 section
/// 4.6.3.3.
fn read_escape<B: ReadBitsLtr>(bs: &mut B, val: i16) -> Result<i16> {
    if val.abs() != 16 {
        return Ok(val);
    }

    let n = bs.read_unary_ones_capped(9)?;
    validate!(n < 9);

    let word = (1 << (n + 4)) + bs.read_bits_leq32(n + 4)? as i16;

    Ok(if val < 0 { -word } else { word })
}

fn read_quad<B: ReadBitsLtr>(bs: &mut B, cb: u8, signed: bool, out: &mut [i16]) -> Result<()> {
    let cw = SPECTRAL[usize::from(cb - 1)].read(bs)? as i16;

    let quad = [cw / 27, (cw / 9) % 3, (cw / 3) % 3, cw % 3];

    if signed {
        for (out, q) in out.iter_mut().zip(quad) {
            *out = q - 1;
        }
    }
    else {
        for (out, q) in out.iter_mut().zip(quad) {
            *out = q;
            apply_sign(bs, out)?;
        }
    }
    Ok(())
}

fn read_pair<B: ReadBitsLtr>(bs: &mut B, cb: u8, out: &mut [i16]) -> Result<()> {
    // Codebook 12 never reaches here, virtual codebooks share codebook 11.
    let table_cb = cb.min(ESC_HCB);

    let cw = SPECTRAL[usize::from(table_cb - 1)].read(bs)? as i16;

    match cb {
        5 | 6 => {
            out[0] = cw / 9 - 4;
            out[1] = cw % 9 - 4;
        }
        7 | 8 => {
            out[0] = cw / 8;
            out[1] = cw % 8;
        }
        9 | 10 => {
            out[0] = cw / 13;
            out[1] = cw % 13;
        }
        _ => {
            out[0] = cw / 17;
            out[1] = cw % 17;
        }
    }

    if cb >= 7 {
        apply_sign(bs, &mut out[0])?;
        apply_sign(bs, &mut out[1])?;
    }

    if cb >= ESC_HCB {
        out[0] = read_escape(bs, out[0])?;
        out[1] = read_escape(bs, out[1])?;
    }
    Ok(())
}

/// Decode one codeword of spectral codebook `cb` into `out`. `out` must hold the codeword
/// dimension of the codebook: 4 coefficients for codebooks 1 through 4, and 2 otherwise.
///
/// Virtual codebook 11 values beyond the largest absolute value of the codebook are zeroed and
/// reported as a warning.
pub fn read_spectral<B: ReadBitsLtr>(
    bs: &mut B,
    cb: u8,
    out: &mut [i16],
    diag: &mut Diagnostics,
) -> Result<()> {
    match cb {
        1 | 2 => read_quad(bs, cb, true, out)?,
        3 | 4 => read_quad(bs, cb, false, out)?,
        5..=ESC_HCB => read_pair(bs, cb, out)?,
        RESERVED_HCB => {
            read_pair(bs, ESC_HCB, out)?;
            out[0] = 0;
            out[1] = 1;
        }
        16..=31 => {
            read_pair(bs, cb, out)?;

            let lav = VCB11_LAV[usize::from(cb - 16)];

            if out[0].abs() > lav || out[1].abs() > lav {
                diag.add(
                    DiagLevel::Warning,
                    format!(
                        "codebook {} values ({}, {}) exceed the largest absolute value {}",
                        cb, out[0], out[1], lav
                    ),
                    "aac spectral data",
                );
                out[0] = 0;
                out[1] = 0;
            }
        }
        _ => {
            validate!(false);
        }
    }
    Ok(())
}
