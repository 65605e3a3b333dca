// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Project Mediatag
//!
//! Mediatag is a 100% pure Rust library for parsing media tags and codec bitstream side
//! information.
//!
//! # Support
//!
//! | Codec                        | Feature Flag | Default |
//! |------------------------------|--------------|---------|
//! | AAC (ADTS, ASC, raw blocks)  | `aac`        | Yes     |
//!
//! # Usage
//!
//! 1. Locate an ADTS frame with [`default::codecs::aac::adts::find_sync`], or read the
//!    AudioSpecificConfig of an MP4 or Matroska track with
//!    [`default::codecs::aac::AudioSpecificConfig::read`].
//! 2. Build an [`default::codecs::aac::AacSetup`] from the header or descriptor, and instantiate
//!    an [`default::codecs::aac::AacParser`].
//! 3. Feed each raw data block to the parser, then inspect its syntax elements, SBR state, and
//!    diagnostics.
//!
//! Tag values read from container metadata are modelled by [`core::meta::TagValue`].

pub mod default {
    //! The `default` module re-exports the enabled codec parsers.

    pub mod codecs {
        //! The `codecs` module re-exports all enabled codec bitstream parsers.

        #[cfg(feature = "aac")]
        pub use mediatag_codec_aac as aac;
    }
}

pub use mediatag_core as core;
