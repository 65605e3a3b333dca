// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel layouts reported by stream parsers.

use bitflags::bitflags;

bitflags! {
    /// Speaker positions present in a stream, one bit per position.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Channels: u32 {
        /// Left, or the only channel of a mono stream.
        const FRONT_LEFT       = 1 << 0;
        const FRONT_RIGHT      = 1 << 1;
        const FRONT_CENTRE     = 1 << 2;
        /// First low frequency effects channel.
        const LFE1             = 1 << 3;
        const REAR_LEFT        = 1 << 4;
        const REAR_RIGHT       = 1 << 5;
        const REAR_CENTRE      = 1 << 8;
        /// Left surround.
        const SIDE_LEFT        = 1 << 9;
        /// Right surround.
        const SIDE_RIGHT       = 1 << 10;
        const FRONT_LEFT_WIDE  = 1 << 11;
        const FRONT_RIGHT_WIDE = 1 << 12;
    }
}

impl Channels {
    /// Number of speaker positions in the layout.
    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

impl std::fmt::Display for Channels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(Channels, &str); 11] = [
            (Channels::FRONT_LEFT, "FL"),
            (Channels::FRONT_RIGHT, "FR"),
            (Channels::FRONT_CENTRE, "FC"),
            (Channels::LFE1, "LFE"),
            (Channels::REAR_LEFT, "RL"),
            (Channels::REAR_RIGHT, "RR"),
            (Channels::REAR_CENTRE, "RC"),
            (Channels::SIDE_LEFT, "SL"),
            (Channels::SIDE_RIGHT, "SR"),
            (Channels::FRONT_LEFT_WIDE, "FLW"),
            (Channels::FRONT_RIGHT_WIDE, "FRW"),
        ];

        let mut first = true;

        for (channel, name) in NAMES {
            if self.contains(channel) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Channels;

    #[test]
    fn verify_layout_display() {
        let layout = Channels::FRONT_CENTRE | Channels::FRONT_LEFT | Channels::FRONT_RIGHT;
        assert_eq!(layout.count(), 3);
        assert_eq!(layout.to_string(), "FL+FR+FC");
        assert_eq!(Channels::empty().to_string(), "");
    }
}
