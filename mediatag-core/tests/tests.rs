// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mediatag_core::diag::{DiagLevel, Diagnostics};
use mediatag_core::errors::Error;
use mediatag_core::io::{BitCursor, BitWriterLtr, FiniteBitStream, ReadBitsLtr};
use mediatag_core::meta::{
    CompareFlags, DateTime, Encoding, Popularity, RatingScale, TagData, TagDataType, TagValue,
};

#[test]
fn bit_cursor_reads_written_fields() {
    let mut bw = BitWriterLtr::new();
    bw.write_bits_leq32(0xfff, 12);
    bw.write_bool(false);
    bw.write_bits_leq32(0, 2);
    bw.write_bool(true);
    bw.write_bits_leq64(0x1f_ffff_ffff, 37);
    bw.realign();

    let buf = bw.into_inner();
    assert_eq!(buf.len(), 7);

    let mut bs = BitCursor::new(&buf);
    assert_eq!(bs.peek_bits_leq32(16), 0xfff1);
    assert_eq!(bs.read_bits_leq32(12).unwrap(), 0xfff);
    bs.ignore_bits(3).unwrap();
    assert!(bs.read_bool().unwrap());
    assert_eq!(bs.read_bits_leq64(37).unwrap(), 0x1f_ffff_ffff);
    assert_eq!(bs.bits_left(), 3);
    bs.realign();
    assert_eq!(bs.bits_left(), 0);
    assert_eq!(bs.read_bool(), Err(Error::Truncated));
}

#[test]
fn diagnostics_worst_level_tracks_max() {
    let mut diag = Diagnostics::new();
    diag.add(DiagLevel::Warning, "clamped", "aac");
    diag.add(DiagLevel::Information, "sbr present", "aac");

    assert_eq!(diag.worst_level(), Some(DiagLevel::Warning));
    assert!(diag.has(DiagLevel::Information));
    assert_eq!((&diag).into_iter().count(), 2);
}

#[test]
fn popularity_scales_between_formats() {
    let value = TagValue::from(Popularity::new("foo", 40.0, 123, RatingScale::VorbisComment));

    assert_eq!(value.to_string(), "foo|40|123");

    let reparsed = TagValue::from(value.to_string());
    assert!(reparsed.equals(&value, CompareFlags::IGNORE_META_DATA));

    let pop = value.to_popularity().unwrap();
    assert_eq!(pop.rescaled(RatingScale::Unspecified).rating, 2.0);
}

#[test]
fn failed_conversion_leaves_value_intact() {
    let value = TagValue::from("not a number").with_language("eng");

    assert!(matches!(value.to_integer(), Err(Error::ConversionError(_))));
    assert!(value.to_date_time().is_err());
    assert_eq!(value.to_text().unwrap(), "not a number");
    assert_eq!(value.language(), "eng");
}

#[test]
fn tag_value_from_raw_bytes() {
    let value =
        TagValue::from_bytes(TagDataType::DateTime, Encoding::Latin1, b"2000-01-01".to_vec())
            .unwrap();

    assert_eq!(value.data(), &TagData::DateTime(DateTime::from_ticks(946_684_800 * 10_000_000)));
    assert_eq!(value.to_string(), "2000-01-01T00:00:00");
}
