// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements bit-level I/O over contiguous byte buffers.
//!
//! Container readers locate a frame, or a codec-private descriptor, and hand its bytes to a
//! bitstream parser. The parser wraps those bytes in a [`BitCursor`] and consumes bits through the
//! [`ReadBitsLtr`] trait. All reads are unsigned and most-significant bit first.

mod bit;

pub use bit::*;
