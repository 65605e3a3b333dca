// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bitstream parsing of MPEG-4 Advanced Audio Coding (AAC).
//!
//! The crate reads ADTS frame headers, the AudioSpecificConfig codec descriptor, and the syntax
//! elements of AAC raw data blocks, including SBR side information. No audio is decoded.

pub mod aac;
pub mod adts;
pub mod common;
pub mod config;

pub use aac::{AacParser, AacParserOptions, AacSetup};
pub use adts::{AdtsFrames, AdtsHeader};
pub use config::AudioSpecificConfig;
