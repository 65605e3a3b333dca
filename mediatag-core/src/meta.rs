// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `meta` module defines the format-independent tag value model.
//!
//! Container and tag readers materialize each tag payload as a [`TagValue`]: a [`TagData`] variant
//! plus attached metadata (description, MIME type, language and a read-only flag). A `TagValue`
//! can be converted between compatible variants. Conversions borrow the source and never modify
//! it; a conversion that cannot preserve the value fails with
//! [`Error::ConversionError`](crate::errors::Error::ConversionError).

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use encoding_rs::mem::{decode_latin1, encode_latin1_lossy, is_str_latin1};
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};

use crate::errors::{conversion_error, Error, Result};

/// The number of 100-nanosecond ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;
const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;

/// The `StandardGenreIndex` value meaning "no genre".
pub const NO_GENRE: u8 = 255;

/// The text encoding of a text payload or description.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    Latin1,
    Utf8,
    Utf16Le,
    Utf16Be,
    /// The encoding is not declared. Decoding tries UTF-8 and falls back to Latin-1.
    #[default]
    Unspecified,
}

impl Encoding {
    /// Gets the byte-order mark of the encoding, if it has one.
    pub fn bom(self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => &[0xef, 0xbb, 0xbf],
            Encoding::Utf16Le => &[0xff, 0xfe],
            Encoding::Utf16Be => &[0xfe, 0xff],
            _ => &[],
        }
    }

    /// Decode `buf` into a string. Trailing NUL terminators are dropped.
    pub fn decode(self, buf: &[u8]) -> Result<String> {
        let text = match self {
            Encoding::Latin1 => decode_latin1(buf),
            Encoding::Utf8 => decode_strict(UTF_8, buf, "meta: invalid utf-8 text")?,
            Encoding::Utf16Le => decode_strict(UTF_16LE, buf, "meta: invalid utf-16 text")?,
            Encoding::Utf16Be => decode_strict(UTF_16BE, buf, "meta: invalid utf-16 text")?,
            Encoding::Unspecified => UTF_8
                .decode_without_bom_handling_and_without_replacement(buf)
                .unwrap_or_else(|| decode_latin1(buf)),
        };

        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Encode `text` without a byte-order mark. Unspecified encodes as UTF-8.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Encoding::Latin1 => {
                if !is_str_latin1(text) {
                    return conversion_error("meta: not latin-1");
                }
                Ok(encode_latin1_lossy(text).into_owned())
            }
            Encoding::Utf8 | Encoding::Unspecified => Ok(text.as_bytes().to_vec()),
            // encoding_rs has no UTF-16 encoder.
            Encoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Encoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        }
    }

    fn strip_bom(self, buf: &[u8]) -> &[u8] {
        let bom = self.bom();

        if !bom.is_empty() && buf.starts_with(bom) {
            &buf[bom.len()..]
        }
        else {
            buf
        }
    }
}

/// Decode `buf` as `encoding`, failing on malformed input instead of substituting replacement
/// characters. A byte-order mark is not interpreted.
fn decode_strict<'a>(
    encoding: &'static encoding_rs::Encoding,
    buf: &'a [u8],
    err: &'static str,
) -> Result<Cow<'a, str>> {
    match encoding.decode_without_bom_handling_and_without_replacement(buf) {
        Some(text) => Ok(text),
        None => conversion_error(err),
    }
}

/// The data type of a `TagValue` variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TagDataType {
    Text,
    Integer,
    UnsignedInteger,
    StandardGenreIndex,
    PositionInSet,
    TimeSpan,
    DateTime,
    DateTimeExpression,
    Popularity,
    Picture,
    Binary,
    Undefined,
}

bitflags! {
    /// Options for comparing `TagValue`s.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CompareFlags: u8 {
        /// Compare textual representations without regard to case.
        const CASE_INSENSITIVE = 0x01;
        /// Ignore description, MIME type, and language.
        const IGNORE_META_DATA = 0x02;
    }
}

bitflags! {
    /// The components present in a `DateTimeExpression`.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DatePrecision: u8 {
        const YEAR     = 0x01;
        const MONTH    = 0x02;
        const DAY      = 0x04;
        const HOUR     = 0x08;
        const MINUTE   = 0x10;
        const SECOND   = 0x20;
        const FRACTION = 0x40;
    }
}

/// A position within a set, for example a track number and the track count. Either part may be
/// zero, meaning unknown.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PositionInSet {
    pub position: u32,
    pub total: u32,
}

impl PositionInSet {
    pub fn new(position: u32, total: u32) -> Self {
        PositionInSet { position, total }
    }
}

impl fmt::Display for PositionInSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.position, self.total) {
            (p, 0) => write!(f, "{}", p),
            (0, t) => write!(f, "/{}", t),
            (p, t) => write!(f, "{}/{}", p, t),
        }
    }
}

impl FromStr for PositionInSet {
    type Err = Error;

    /// Parses `"p"`, `"/t"`, or `"p/t"`.
    fn from_str(s: &str) -> Result<Self> {
        let parse_part = |part: &str| -> Result<u32> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(0);
            }
            part.parse::<u32>().map_err(|_| Error::ConversionError("meta: invalid position in set"))
        };

        let (position, total) = match s.split_once('/') {
            Some((p, t)) => (parse_part(p)?, parse_part(t)?),
            None if !s.trim().is_empty() => (parse_part(s)?, 0),
            None => return conversion_error("meta: empty position in set"),
        };

        Ok(PositionInSet { position, total })
    }
}

/// A signed duration in 100-nanosecond ticks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpan {
    pub ticks: i64,
}

impl TimeSpan {
    pub fn from_ticks(ticks: i64) -> Self {
        TimeSpan { ticks }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        TimeSpan { ticks: seconds.saturating_mul(TICKS_PER_SECOND) }
    }
}

impl fmt::Display for TimeSpan {
    /// Formats as `[-][d.]hh:mm:ss[.fffffff]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ticks = self.ticks.unsigned_abs();

        if self.ticks < 0 {
            f.write_str("-")?;
        }

        let days = ticks / TICKS_PER_DAY as u64;
        let hours = (ticks / TICKS_PER_HOUR as u64) % 24;
        let minutes = (ticks / TICKS_PER_MINUTE as u64) % 60;
        let seconds = (ticks / TICKS_PER_SECOND as u64) % 60;
        let fraction = ticks % TICKS_PER_SECOND as u64;

        if days > 0 {
            write!(f, "{}.", days)?;
        }

        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)?;

        if fraction > 0 {
            write!(f, ".{:07}", fraction)?;
        }

        Ok(())
    }
}

impl FromStr for TimeSpan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let mut parts = s.split(':');

        let (days, hours) = match parts.next() {
            Some(part) => match part.split_once('.') {
                Some((d, h)) => (parse_decimal(d)?, parse_decimal(h)?),
                None => (0, parse_decimal(part)?),
            },
            None => return conversion_error("meta: empty time span"),
        };

        let minutes = parts.next().map(parse_decimal).transpose()?;
        let seconds = parts.next();

        let (minutes, seconds) = match (minutes, seconds) {
            (Some(m), Some(sec)) => (m, sec),
            _ => return conversion_error("meta: time span requires hh:mm:ss"),
        };

        if parts.next().is_some() {
            return conversion_error("meta: too many time span components");
        }

        let (seconds, fraction) = match seconds.split_once('.') {
            Some((sec, frac)) => (parse_decimal(sec)?, parse_fraction(frac)?),
            None => (parse_decimal(seconds)?, 0),
        };

        if (days > 0 && hours >= 24) || minutes >= 60 || seconds >= 60 {
            return conversion_error("meta: time span component out of range");
        }

        let ticks = days
            .checked_mul(TICKS_PER_DAY)
            .and_then(|t| t.checked_add(hours.checked_mul(TICKS_PER_HOUR)?))
            .and_then(|t| t.checked_add(minutes * TICKS_PER_MINUTE + seconds * TICKS_PER_SECOND))
            .and_then(|t| t.checked_add(fraction))
            .ok_or(Error::ConversionError("meta: time span overflow"))?;

        Ok(TimeSpan { ticks: if negative { -ticks } else { ticks } })
    }
}

/// An instant in 100-nanosecond ticks since 1970-01-01T00:00:00 UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub ticks: i64,
}

impl DateTime {
    pub fn from_ticks(ticks: i64) -> Self {
        DateTime { ticks }
    }

    /// Build an instant from calendar fields, or return an error if a field is out of range.
    pub fn from_ymd_hms(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self> {
        let expr = DateTimeExpression {
            year,
            month,
            day,
            hour,
            minute,
            second,
            fraction: 0,
            utc_offset_minutes: None,
            precision: DatePrecision::YEAR
                | DatePrecision::MONTH
                | DatePrecision::DAY
                | DatePrecision::HOUR
                | DatePrecision::MINUTE
                | DatePrecision::SECOND,
        };
        expr.validate()?;
        Ok(expr.to_date_time())
    }

    /// Gets the full precision calendar representation in UTC.
    pub fn to_expression(self) -> DateTimeExpression {
        let days = self.ticks.div_euclid(TICKS_PER_DAY);
        let time = self.ticks.rem_euclid(TICKS_PER_DAY);

        let (year, month, day) = civil_from_days(days);

        let fraction = (time % TICKS_PER_SECOND) as u32;

        let mut precision = DatePrecision::YEAR
            | DatePrecision::MONTH
            | DatePrecision::DAY
            | DatePrecision::HOUR
            | DatePrecision::MINUTE
            | DatePrecision::SECOND;

        if fraction > 0 {
            precision |= DatePrecision::FRACTION;
        }

        DateTimeExpression {
            year: year as i32,
            month,
            day,
            hour: (time / TICKS_PER_HOUR) as u8,
            minute: ((time / TICKS_PER_MINUTE) % 60) as u8,
            second: ((time / TICKS_PER_SECOND) % 60) as u8,
            fraction,
            utc_offset_minutes: None,
            precision,
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_expression(), f)
    }
}

impl FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(s.parse::<DateTimeExpression>()?.to_date_time())
    }
}

/// A possibly partial ISO-8601 date and time, such as `2021`, `2021-07`, or
/// `2021-07-04T12:30:00.5+02:00`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DateTimeExpression {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Sub-second part in 100-nanosecond ticks.
    pub fraction: u32,
    /// Offset from UTC if a zone designator was present.
    pub utc_offset_minutes: Option<i16>,
    pub precision: DatePrecision,
}

impl DateTimeExpression {
    fn validate(&self) -> Result<()> {
        let month_ok =
            !self.precision.contains(DatePrecision::MONTH) || (1..=12).contains(&self.month);

        let day_ok = !self.precision.contains(DatePrecision::DAY)
            || (1..=days_in_month(self.year, self.month)).contains(&self.day);

        if !(0..=9999).contains(&self.year)
            || !month_ok
            || !day_ok
            || self.hour > 23
            || self.minute > 59
            || self.second > 59
            || i64::from(self.fraction) >= TICKS_PER_SECOND
        {
            return conversion_error("meta: date-time component out of range");
        }

        Ok(())
    }

    /// Converts to an instant. Missing components take their smallest value.
    pub fn to_date_time(&self) -> DateTime {
        let month = if self.precision.contains(DatePrecision::MONTH) { self.month } else { 1 };
        let day = if self.precision.contains(DatePrecision::DAY) { self.day } else { 1 };

        let days = days_from_civil(i64::from(self.year), month, day);

        let ticks = days * TICKS_PER_DAY
            + i64::from(self.hour) * TICKS_PER_HOUR
            + i64::from(self.minute) * TICKS_PER_MINUTE
            + i64::from(self.second) * TICKS_PER_SECOND
            + i64::from(self.fraction)
            - i64::from(self.utc_offset_minutes.unwrap_or(0)) * TICKS_PER_MINUTE;

        DateTime { ticks }
    }
}

impl fmt::Display for DateTimeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision;

        write!(f, "{:04}", self.year)?;

        if p.contains(DatePrecision::MONTH) {
            write!(f, "-{:02}", self.month)?;
        }
        if p.contains(DatePrecision::DAY) {
            write!(f, "-{:02}", self.day)?;
        }
        if p.contains(DatePrecision::HOUR) {
            write!(f, "T{:02}", self.hour)?;
        }
        if p.contains(DatePrecision::MINUTE) {
            write!(f, ":{:02}", self.minute)?;
        }
        if p.contains(DatePrecision::SECOND) {
            write!(f, ":{:02}", self.second)?;
        }
        if p.contains(DatePrecision::FRACTION) {
            let digits = format!("{:07}", self.fraction);
            let digits = digits.trim_end_matches('0');
            write!(f, ".{}", if digits.is_empty() { "0" } else { digits })?;
        }

        match self.utc_offset_minutes {
            Some(0) => f.write_str("Z"),
            Some(offset) => {
                let sign = if offset < 0 { '-' } else { '+' };
                let offset = offset.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, offset / 60, offset % 60)
            }
            None => Ok(()),
        }
    }
}

impl FromStr for DateTimeExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let buf = s.trim().as_bytes();
        let mut pos = 0;

        let mut expr = DateTimeExpression {
            year: take_digits(buf, &mut pos, 4)? as i32,
            precision: DatePrecision::YEAR,
            ..Default::default()
        };

        // Each component is only present if all coarser components are present.
        if take_byte(buf, &mut pos, b"-") {
            expr.month = take_digits(buf, &mut pos, 2)? as u8;
            expr.precision |= DatePrecision::MONTH;

            if take_byte(buf, &mut pos, b"-") {
                expr.day = take_digits(buf, &mut pos, 2)? as u8;
                expr.precision |= DatePrecision::DAY;

                if take_byte(buf, &mut pos, b"T ") {
                    expr.hour = take_digits(buf, &mut pos, 2)? as u8;
                    expr.precision |= DatePrecision::HOUR;

                    if take_byte(buf, &mut pos, b":") {
                        expr.minute = take_digits(buf, &mut pos, 2)? as u8;
                        expr.precision |= DatePrecision::MINUTE;

                        if take_byte(buf, &mut pos, b":") {
                            expr.second = take_digits(buf, &mut pos, 2)? as u8;
                            expr.precision |= DatePrecision::SECOND;

                            if take_byte(buf, &mut pos, b".,") {
                                let start = pos;
                                while pos < buf.len() && buf[pos].is_ascii_digit() {
                                    pos += 1;
                                }
                                let digits = std::str::from_utf8(&buf[start..pos]).unwrap_or("");
                                expr.fraction = parse_fraction(digits)? as u32;
                                expr.precision |= DatePrecision::FRACTION;
                            }
                        }
                    }
                }
            }
        }

        if expr.precision.contains(DatePrecision::HOUR) {
            if take_byte(buf, &mut pos, b"Z") {
                expr.utc_offset_minutes = Some(0);
            }
            else if pos < buf.len() && (buf[pos] == b'+' || buf[pos] == b'-') {
                let negative = buf[pos] == b'-';
                pos += 1;

                let hours = take_digits(buf, &mut pos, 2)?;
                take_byte(buf, &mut pos, b":");
                let minutes = take_digits(buf, &mut pos, 2)?;

                if hours > 23 || minutes > 59 {
                    return conversion_error("meta: invalid utc offset");
                }

                let offset = (hours * 60 + minutes) as i16;
                expr.utc_offset_minutes = Some(if negative { -offset } else { offset });
            }
        }

        if pos != buf.len() {
            return conversion_error("meta: trailing characters after date-time");
        }

        expr.validate()?;

        Ok(expr)
    }
}

/// The rating scale used by a tag format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RatingScale {
    /// Generic 1 to 5 stars.
    #[default]
    Unspecified,
    /// ID3v2 POPM, 1 to 255.
    Id3v2,
    /// Vorbis comment RATING, 20 to 100.
    VorbisComment,
    /// Matroska RATING, 0 to 5.
    Matroska,
}

impl RatingScale {
    /// The ratings that correspond to 1, 2, 3, 4, and 5 generic stars.
    fn anchors(self) -> [f64; 5] {
        match self {
            RatingScale::Unspecified | RatingScale::Matroska => [1.0, 2.0, 3.0, 4.0, 5.0],
            RatingScale::Id3v2 => [1.0, 64.0, 128.0, 196.0, 255.0],
            RatingScale::VorbisComment => [20.0, 40.0, 60.0, 80.0, 100.0],
        }
    }
}

/// Linearly interpolate `value` along the piecewise segments `from`, onto `to`. Both include an
/// implicit leading zero point. Values outside of the range are clamped.
fn interpolate(value: f64, from: &[f64; 5], to: &[f64; 5]) -> f64 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }

    let mut lo = (0.0, 0.0);

    for (&x, &y) in from.iter().zip(to.iter()) {
        if value <= x {
            return lo.1 + (value - lo.0) * (y - lo.1) / (x - lo.0);
        }
        lo = (x, y);
    }

    lo.1
}

/// A user rating and play count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Popularity {
    pub user: String,
    pub rating: f64,
    pub play_counter: u64,
    pub scale: RatingScale,
}

impl Popularity {
    pub fn new(user: &str, rating: f64, play_counter: u64, scale: RatingScale) -> Self {
        Popularity { user: user.to_string(), rating, play_counter, scale }
    }

    /// Gets the rating expressed on another scale. An unrated (zero) rating stays zero.
    pub fn rating_on(&self, scale: RatingScale) -> f64 {
        if scale == self.scale {
            return self.rating;
        }

        let generic = RatingScale::Unspecified.anchors();
        let stars = interpolate(self.rating, &self.scale.anchors(), &generic);
        interpolate(stars, &generic, &scale.anchors())
    }

    /// Returns a copy of this popularity with the rating converted to another scale.
    pub fn rescaled(&self, scale: RatingScale) -> Popularity {
        Popularity { rating: self.rating_on(scale), scale, ..self.clone() }
    }
}

impl fmt::Display for Popularity {
    /// Formats as `user|rating|play_counter`, omitting trailing zero fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user)?;

        if self.play_counter != 0 {
            write!(f, "|{}|{}", self.rating, self.play_counter)
        }
        else if self.rating != 0.0 {
            write!(f, "|{}", self.rating)
        }
        else {
            Ok(())
        }
    }
}

impl FromStr for Popularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '|');

        let user = parts.next().unwrap_or("").to_string();

        let rating = match parts.next().map(str::trim) {
            Some(r) if !r.is_empty() => {
                r.parse::<f64>().map_err(|_| Error::ConversionError("meta: invalid rating"))?
            }
            _ => 0.0,
        };

        let play_counter = match parts.next().map(str::trim) {
            Some(c) if !c.is_empty() => {
                c.parse::<u64>().map_err(|_| Error::ConversionError("meta: invalid play counter"))?
            }
            _ => 0,
        };

        Ok(Popularity { user, rating, play_counter, scale: RatingScale::Unspecified })
    }
}

/// The payload of a `TagValue`.
#[derive(Clone, Debug, PartialEq)]
pub enum TagData {
    /// Text in the declared encoding, without a byte-order mark.
    Text(Box<[u8]>, Encoding),
    Integer(i32),
    UnsignedInteger(u64),
    /// An ID3v1 genre index in 0..192, or `NO_GENRE`.
    StandardGenreIndex(u8),
    PositionInSet(PositionInSet),
    TimeSpan(TimeSpan),
    DateTime(DateTime),
    DateTimeExpression(DateTimeExpression),
    Popularity(Popularity),
    /// Picture data. The MIME type and description are carried by the `TagValue`.
    Picture(Box<[u8]>),
    Binary(Box<[u8]>),
    Undefined,
}

/// A tag payload with its attached metadata.
#[derive(Clone, Debug)]
pub struct TagValue {
    data: TagData,
    description: String,
    description_encoding: Encoding,
    mime_type: String,
    language: String,
    read_only: bool,
}

impl Default for TagValue {
    fn default() -> Self {
        TagValue::new(TagData::Undefined)
    }
}

impl TagValue {
    pub fn new(data: TagData) -> Self {
        TagValue {
            data,
            description: String::new(),
            description_encoding: Encoding::Unspecified,
            mime_type: String::new(),
            language: String::new(),
            read_only: false,
        }
    }

    /// Instantiate a text value. A leading byte-order mark matching `encoding` is stripped.
    pub fn text(buf: &[u8], encoding: Encoding) -> Self {
        TagValue::new(TagData::Text(Box::from(encoding.strip_bom(buf)), encoding))
    }

    /// Instantiate a picture value.
    pub fn picture(data: Vec<u8>, mime_type: &str, description: &str) -> Self {
        let mut value = TagValue::new(TagData::Picture(data.into_boxed_slice()));
        value.mime_type = mime_type.to_string();
        value.description = description.to_string();
        value
    }

    /// Instantiate a genre index value. Only 0..192 and `NO_GENRE` are accepted.
    pub fn standard_genre(index: u8) -> Result<Self> {
        if usize::from(index) >= GENRES.len() && index != NO_GENRE {
            return conversion_error("meta: genre index out of range");
        }
        Ok(TagValue::new(TagData::StandardGenreIndex(index)))
    }

    /// Instantiate a value of the given type from raw bytes. Text, binary, and picture data is
    /// stored as-is. Any other type is parsed from its textual form in the given encoding.
    pub fn from_bytes(data_type: TagDataType, encoding: Encoding, buf: Vec<u8>) -> Result<Self> {
        let value = match data_type {
            TagDataType::Text => TagValue::text(&buf, encoding),
            TagDataType::Binary => TagValue::new(TagData::Binary(buf.into_boxed_slice())),
            TagDataType::Picture => TagValue::new(TagData::Picture(buf.into_boxed_slice())),
            TagDataType::Undefined => TagValue::new(TagData::Undefined),
            _ => {
                let text = TagValue::text(&buf, encoding);

                let data = match data_type {
                    TagDataType::Integer => TagData::Integer(text.to_integer()?),
                    TagDataType::UnsignedInteger => {
                        TagData::UnsignedInteger(text.to_unsigned_integer()?)
                    }
                    TagDataType::StandardGenreIndex => {
                        TagData::StandardGenreIndex(text.to_standard_genre_index()?)
                    }
                    TagDataType::PositionInSet => {
                        TagData::PositionInSet(text.to_position_in_set()?)
                    }
                    TagDataType::TimeSpan => TagData::TimeSpan(text.to_time_span()?),
                    TagDataType::DateTime => TagData::DateTime(text.to_date_time()?),
                    TagDataType::DateTimeExpression => {
                        TagData::DateTimeExpression(text.to_date_time_expression()?)
                    }
                    _ => TagData::Popularity(text.to_popularity()?),
                };

                TagValue::new(data)
            }
        };

        Ok(value)
    }

    pub fn with_description(mut self, description: &str, encoding: Encoding) -> Self {
        self.description = description.to_string();
        self.description_encoding = encoding;
        self
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }

    /// Set the ISO-639-2 language code.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn data(&self) -> &TagData {
        &self.data
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn description_encoding(&self) -> Encoding {
        self.description_encoding
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn data_type(&self) -> TagDataType {
        match self.data {
            TagData::Text(..) => TagDataType::Text,
            TagData::Integer(_) => TagDataType::Integer,
            TagData::UnsignedInteger(_) => TagDataType::UnsignedInteger,
            TagData::StandardGenreIndex(_) => TagDataType::StandardGenreIndex,
            TagData::PositionInSet(_) => TagDataType::PositionInSet,
            TagData::TimeSpan(_) => TagDataType::TimeSpan,
            TagData::DateTime(_) => TagDataType::DateTime,
            TagData::DateTimeExpression(_) => TagDataType::DateTimeExpression,
            TagData::Popularity(_) => TagDataType::Popularity,
            TagData::Picture(_) => TagDataType::Picture,
            TagData::Binary(_) => TagDataType::Binary,
            TagData::Undefined => TagDataType::Undefined,
        }
    }

    /// Returns true if the value is undefined or holds an empty buffer.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            TagData::Text(buf, _) | TagData::Picture(buf) | TagData::Binary(buf) => buf.is_empty(),
            TagData::Undefined => true,
            _ => false,
        }
    }

    /// Gets the raw bytes of a text, picture, or binary value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            TagData::Text(buf, _) | TagData::Picture(buf) | TagData::Binary(buf) => Some(buf),
            _ => None,
        }
    }

    /// Gets the genre name of a genre index value, or of text naming a genre index.
    pub fn genre_name(&self) -> Option<&'static str> {
        self.to_standard_genre_index().ok().and_then(genre_name)
    }

    /// Gets the canonical textual representation of the value.
    pub fn to_text(&self) -> Result<String> {
        let text = match &self.data {
            TagData::Text(buf, encoding) => encoding.decode(buf)?,
            TagData::Integer(v) => v.to_string(),
            TagData::UnsignedInteger(v) => v.to_string(),
            TagData::StandardGenreIndex(NO_GENRE) => String::new(),
            TagData::StandardGenreIndex(v) => v.to_string(),
            TagData::PositionInSet(v) => v.to_string(),
            TagData::TimeSpan(v) => v.to_string(),
            TagData::DateTime(v) => {
                let expr = v.to_expression();
                if !(0..=9999).contains(&expr.year) {
                    return conversion_error("meta: date-time out of range");
                }
                expr.to_string()
            }
            TagData::DateTimeExpression(v) => v.to_string(),
            TagData::Popularity(v) => v.to_string(),
            TagData::Picture(_) | TagData::Binary(_) => {
                return conversion_error("meta: binary data has no text form")
            }
            TagData::Undefined => String::new(),
        };

        Ok(text)
    }

    /// Gets the canonical textual representation encoded in `encoding`, without a byte-order mark.
    pub fn to_text_encoded(&self, encoding: Encoding) -> Result<Vec<u8>> {
        encoding.encode(&self.to_text()?)
    }

    pub fn to_integer(&self) -> Result<i32> {
        match &self.data {
            TagData::Integer(v) => Ok(*v),
            TagData::UnsignedInteger(v) => {
                i32::try_from(*v).map_err(|_| Error::ConversionError("meta: integer out of range"))
            }
            TagData::StandardGenreIndex(v) => Ok(i32::from(*v)),
            TagData::Text(..) => self
                .to_text()?
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::ConversionError("meta: text is not an integer")),
            _ => conversion_error("meta: not convertible to an integer"),
        }
    }

    pub fn to_unsigned_integer(&self) -> Result<u64> {
        match &self.data {
            TagData::UnsignedInteger(v) => Ok(*v),
            TagData::Integer(v) => {
                u64::try_from(*v).map_err(|_| Error::ConversionError("meta: negative integer"))
            }
            TagData::StandardGenreIndex(v) => Ok(u64::from(*v)),
            TagData::Text(..) => self
                .to_text()?
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::ConversionError("meta: text is not an unsigned integer")),
            _ => conversion_error("meta: not convertible to an unsigned integer"),
        }
    }

    /// Gets a genre index. Integers are accepted if in 0..192 or equal to `NO_GENRE`. Text may
    /// be a number, a parenthesized number, or a genre name.
    pub fn to_standard_genre_index(&self) -> Result<u8> {
        let check = |v: i64| -> Result<u8> {
            if (0..GENRES.len() as i64).contains(&v) || v == i64::from(NO_GENRE) {
                Ok(v as u8)
            }
            else {
                conversion_error("meta: genre index out of range")
            }
        };

        match &self.data {
            TagData::StandardGenreIndex(v) => Ok(*v),
            TagData::Integer(v) => check(i64::from(*v)),
            TagData::UnsignedInteger(v) => check(i64::try_from(*v).unwrap_or(i64::MAX)),
            TagData::Text(..) => {
                let text = self.to_text()?;
                let text = text.trim();

                if text.is_empty() {
                    return Ok(NO_GENRE);
                }

                let number =
                    text.strip_prefix('(').and_then(|t| t.strip_suffix(')')).unwrap_or(text);

                if let Ok(v) = number.parse::<i64>() {
                    return check(v);
                }

                match genre_index(text) {
                    Some(index) => Ok(index),
                    None => conversion_error("meta: unknown genre"),
                }
            }
            _ => conversion_error("meta: not convertible to a genre index"),
        }
    }

    pub fn to_position_in_set(&self) -> Result<PositionInSet> {
        match &self.data {
            TagData::PositionInSet(v) => Ok(*v),
            TagData::Integer(_) | TagData::UnsignedInteger(_) => {
                let position = u32::try_from(self.to_unsigned_integer()?)
                    .map_err(|_| Error::ConversionError("meta: position out of range"))?;
                Ok(PositionInSet::new(position, 0))
            }
            TagData::Text(..) => self.to_text()?.parse(),
            _ => conversion_error("meta: not convertible to a position in set"),
        }
    }

    pub fn to_time_span(&self) -> Result<TimeSpan> {
        match &self.data {
            TagData::TimeSpan(v) => Ok(*v),
            TagData::Text(..) => self.to_text()?.parse(),
            _ => conversion_error("meta: not convertible to a time span"),
        }
    }

    pub fn to_date_time(&self) -> Result<DateTime> {
        match &self.data {
            TagData::DateTime(v) => Ok(*v),
            TagData::DateTimeExpression(v) => Ok(v.to_date_time()),
            TagData::Text(..) => self.to_text()?.parse(),
            _ => conversion_error("meta: not convertible to a date-time"),
        }
    }

    pub fn to_date_time_expression(&self) -> Result<DateTimeExpression> {
        match &self.data {
            TagData::DateTimeExpression(v) => Ok(*v),
            TagData::DateTime(v) => Ok(v.to_expression()),
            TagData::Text(..) => self.to_text()?.parse(),
            _ => conversion_error("meta: not convertible to a date-time expression"),
        }
    }

    pub fn to_popularity(&self) -> Result<Popularity> {
        match &self.data {
            TagData::Popularity(v) => Ok(v.clone()),
            TagData::Integer(_) | TagData::UnsignedInteger(_) => Ok(Popularity {
                rating: self.to_integer()? as f64,
                ..Default::default()
            }),
            TagData::Text(..) => self.to_text()?.parse(),
            _ => conversion_error("meta: not convertible to a popularity"),
        }
    }

    /// Compares two values.
    ///
    /// Values that have a textual form are equal if their canonical texts are equal. Picture and
    /// binary values are equal if their bytes are equal. A date-time never equals a time span.
    /// Unless `IGNORE_META_DATA` is set, the description, MIME type, and language must also match.
    pub fn equals(&self, other: &TagValue, flags: CompareFlags) -> bool {
        let ci = flags.contains(CompareFlags::CASE_INSENSITIVE);

        let text_eq =
            |a: &str, b: &str| if ci { a.to_lowercase() == b.to_lowercase() } else { a == b };

        if !flags.contains(CompareFlags::IGNORE_META_DATA)
            && !(text_eq(&self.description, &other.description)
                && self.mime_type == other.mime_type
                && self.language.eq_ignore_ascii_case(&other.language))
        {
            return false;
        }

        let is_binary = |v: &TagValue| matches!(v.data, TagData::Picture(_) | TagData::Binary(_));

        match (&self.data, &other.data) {
            (TagData::DateTime(_), TagData::TimeSpan(_)) => return false,
            (TagData::TimeSpan(_), TagData::DateTime(_)) => return false,
            _ => (),
        }

        if is_binary(self) || is_binary(other) {
            return is_binary(self) && is_binary(other) && self.as_bytes() == other.as_bytes();
        }

        match (self.to_text(), other.to_text()) {
            (Ok(a), Ok(b)) => text_eq(&a, &b),
            // Text that cannot be decoded only equals the identical undecodable text.
            (Err(_), Err(_)) => self.data == other.data,
            _ => false,
        }
    }
}

impl PartialEq for TagValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, CompareFlags::empty())
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<{} bytes>", self.as_bytes().map_or(0, <[u8]>::len)),
        }
    }
}

macro_rules! impl_from_for_tag_value {
    ($value:ident, $from:ty, $conv:expr) => {
        impl From<$from> for TagValue {
            fn from($value: $from) -> Self {
                TagValue::new($conv)
            }
        }
    };
}

impl_from_for_tag_value!(v, &str, TagData::Text(Box::from(v.as_bytes()), Encoding::Utf8));
impl_from_for_tag_value!(
    v,
    String,
    TagData::Text(v.into_bytes().into_boxed_slice(), Encoding::Utf8)
);
impl_from_for_tag_value!(v, i32, TagData::Integer(v));
impl_from_for_tag_value!(v, u64, TagData::UnsignedInteger(v));
impl_from_for_tag_value!(v, PositionInSet, TagData::PositionInSet(v));
impl_from_for_tag_value!(v, TimeSpan, TagData::TimeSpan(v));
impl_from_for_tag_value!(v, DateTime, TagData::DateTime(v));
impl_from_for_tag_value!(v, DateTimeExpression, TagData::DateTimeExpression(v));
impl_from_for_tag_value!(v, Popularity, TagData::Popularity(v));
impl_from_for_tag_value!(v, Vec<u8>, TagData::Binary(v.into_boxed_slice()));
impl_from_for_tag_value!(v, &[u8], TagData::Binary(Box::from(v)));

fn parse_decimal(s: &str) -> Result<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return conversion_error("meta: expected decimal digits");
    }
    s.parse::<i64>().map_err(|_| Error::ConversionError("meta: number out of range"))
}

/// Parse the digits after a decimal point into ticks. Digits beyond tick resolution are dropped.
fn parse_fraction(s: &str) -> Result<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return conversion_error("meta: invalid fraction");
    }

    let mut ticks = 0;

    for i in 0..7 {
        let digit = s.as_bytes().get(i).map_or(0, |b| i64::from(b - b'0'));
        ticks = 10 * ticks + digit;
    }

    Ok(ticks)
}

fn take_digits(buf: &[u8], pos: &mut usize, count: usize) -> Result<u32> {
    let end = *pos + count;

    if end > buf.len() || !buf[*pos..end].iter().all(u8::is_ascii_digit) {
        return conversion_error("meta: expected digits");
    }

    let value = buf[*pos..end].iter().fold(0, |acc, &b| 10 * acc + u32::from(b - b'0'));
    *pos = end;
    Ok(value)
}

fn take_byte(buf: &[u8], pos: &mut usize, any_of: &[u8]) -> bool {
    if *pos < buf.len() && any_of.contains(&buf[*pos]) {
        *pos += 1;
        true
    }
    else {
        false
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let (m, d) = (i64::from(month), i64::from(day));
    let y = if m <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Gets the name of an ID3v1 genre index.
pub fn genre_name(index: u8) -> Option<&'static str> {
    // Genre #133 is an offensive term and is withheld.
    if index == 133 {
        return None;
    }
    GENRES.get(usize::from(index)).copied()
}

fn genre_index(name: &str) -> Option<u8> {
    GENRES
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != 133)
        .find(|(_, genre)| genre.eq_ignore_ascii_case(name))
        .map(|(i, _)| i as u8)
}

/// Standard genres as per ID3v1, followed by the Winamp extensions.
const GENRES: &[&str] = &[
    "Blues", "Classic rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "Rhythm and Blues", "Rap", "Reggae", "Rock",
    "Techno", "Industrial", "Alternative", "Ska", "Death metal", "Pranks", "Soundtrack",
    "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz & Funk", "Fusion", "Trance", "Classical",
    "Instrumental", "Acid", "House", "Game", "Sound clip", "Gospel", "Noise", "Alternative Rock",
    "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
    "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance",
    "Dream", "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk",
    "Jungle", "Native US", "Cabaret", "New Wave", "Psychedelic", "Rave", "Show tunes", "Trailer",
    "Lo-Fi", "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock 'n Roll",
    "Hard Rock", "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion", "Bebop", "Latin",
    "Revival", "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock",
    "Psychedelic Rock", "Symphonic Rock", "Slow rock", "Big Band", "Chorus", "Easy Listening",
    "Acoustic", "Humour", "Speech", "Chanson", "Opera", "Chamber music", "Sonata", "Symphony",
    "Booty bass", "Primus", "Porn groove", "Satire", "Slow jam", "Club", "Tango", "Samba",
    "Folklore", "Ballad", "Power ballad", "Rhythmic Soul", "Freestyle", "Duet", "Punk Rock",
    "Drum solo", "A cappella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass", "Club-House",
    "Hardcore Techno", "Terror", "Indie", "BritPop", "(133)", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian",
    "Christian rock", "Merengue", "Salsa", "Thrash Metal", "Anime", "Jpop", "Synthpop", "Abstract",
    "Art Rock", "Baroque", "Bhangra", "Big beat", "Breakbeat", "Chillout", "Downtempo", "Dub",
    "EBM", "Eclectic", "Electro", "Electroclash", "Emo", "Experimental", "Garage", "Global", "IDM",
    "Illbient", "Industro-Goth", "Jam Band", "Krautrock", "Leftfield", "Lounge", "Math Rock",
    "New Romantic", "Nu-Breakz", "Post-Punk", "Post-Rock", "Psytrance", "Shoegaze", "Space Rock",
    "Trop Rock", "World Music", "Neoclassical", "Audiobook", "Audio theatre", "Neue Deutsche Welle",
    "Podcast", "Indie-Rock", "G-Funk", "Dubstep", "Garage Rock", "Psybient",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_text_bom_stripped() {
        let value = TagValue::text(&[0xff, 0xfe, b'h', 0, b'i', 0], Encoding::Utf16Le);
        assert_eq!(value.as_bytes(), Some(&[b'h', 0, b'i', 0][..]));
        assert_eq!(value.to_text().unwrap(), "hi");

        let value = TagValue::text(&[0xfe, 0xff, 0, b'h'], Encoding::Utf16Be);
        assert_eq!(value.to_text().unwrap(), "h");

        // A byte-order mark of another encoding is not stripped.
        let value = TagValue::text(&[0xef, 0xbb, 0xbf, b'x'], Encoding::Latin1);
        assert_eq!(value.as_bytes().unwrap().len(), 4);
    }

    #[test]
    fn verify_text_decoding() {
        let surrogates = [0x00, 0xe9, 0xd8, 0x3d, 0xde, 0x00];
        assert_eq!(Encoding::Utf16Be.decode(&surrogates).unwrap(), "é😀");
        assert_eq!(Encoding::Utf16Le.decode(&[b'a', 0, 0, 0]).unwrap(), "a");
        assert_eq!(Encoding::Latin1.decode(&[0x41, 0x80, 0xff]).unwrap(), "A\u{80}ÿ");
        assert_eq!(Encoding::Unspecified.decode(&[0x63, 0xe9]).unwrap(), "cé");

        let invalid = Err(Error::ConversionError("meta: invalid utf-16 text"));
        // Odd length.
        assert_eq!(Encoding::Utf16Le.decode(&[b'a', 0, b'b']), invalid);
        // Unpaired high surrogate.
        assert_eq!(Encoding::Utf16Be.decode(&[0xd8, 0x3d, 0x00, 0x41]), invalid);

        assert!(Encoding::Utf8.decode(&[0xc3]).is_err());
    }

    #[test]
    fn verify_text_to_integer() {
        assert_eq!(TagValue::from("  -42").to_integer(), Ok(-42));
        assert_eq!(TagValue::from("+7").to_integer(), Ok(7));
        assert_eq!(
            TagValue::from("abc").to_integer(),
            Err(Error::ConversionError("meta: text is not an integer"))
        );
        assert!(TagValue::from(u64::MAX).to_integer().is_err());
        assert_eq!(TagValue::from(12u64).to_integer(), Ok(12));
    }

    #[test]
    fn verify_genre_index_bounds() {
        assert_eq!(TagValue::from(17).to_standard_genre_index(), Ok(17));
        assert_eq!(TagValue::from(191).to_standard_genre_index(), Ok(191));
        assert_eq!(TagValue::from(255).to_standard_genre_index(), Ok(NO_GENRE));
        assert!(TagValue::from(192).to_standard_genre_index().is_err());
        assert!(TagValue::from(-1).to_standard_genre_index().is_err());
        assert!(TagValue::standard_genre(200).is_err());

        assert_eq!(TagValue::from("(17)").to_standard_genre_index(), Ok(17));
        assert_eq!(TagValue::from("rock").to_standard_genre_index(), Ok(17));
        assert_eq!(TagValue::from("Rock").genre_name(), Some("Rock"));
        assert_eq!(genre_name(133), None);
        assert_eq!(genre_name(191), Some(GENRES[191]));
    }

    #[test]
    fn verify_position_in_set_forms() {
        assert_eq!("3".parse::<PositionInSet>(), Ok(PositionInSet::new(3, 0)));
        assert_eq!("/12".parse::<PositionInSet>(), Ok(PositionInSet::new(0, 12)));
        assert_eq!("3/12".parse::<PositionInSet>(), Ok(PositionInSet::new(3, 12)));
        assert!("x/12".parse::<PositionInSet>().is_err());

        let positions =
            [PositionInSet::new(3, 0), PositionInSet::new(0, 12), PositionInSet::new(3, 12)];

        for pos in positions {
            let text = TagValue::from(TagValue::from(pos).to_string());
            assert_eq!(text.to_position_in_set(), Ok(pos));
        }
    }

    #[test]
    fn verify_text_round_trips() {
        let values = [
            TagValue::from(-123),
            TagValue::from(123u64),
            TagValue::from(TimeSpan::from_ticks(-(TICKS_PER_DAY + 5 * TICKS_PER_SECOND + 1))),
            TagValue::from(DateTime::from_ticks(1_234_567_890_123_456)),
            TagValue::from(DateTime::from_ticks(-TICKS_PER_DAY)),
        ];

        for value in values.iter() {
            let text = TagValue::from(value.to_string());

            let round_trip = match value.data() {
                TagData::Integer(_) => TagValue::from(text.to_integer().unwrap()),
                TagData::UnsignedInteger(_) => TagValue::from(text.to_unsigned_integer().unwrap()),
                TagData::TimeSpan(_) => TagValue::from(text.to_time_span().unwrap()),
                _ => TagValue::from(text.to_date_time().unwrap()),
            };

            assert_eq!(value.data(), round_trip.data());
        }
    }

    #[test]
    fn verify_date_time_text() {
        let dt = DateTime::from_ymd_hms(2021, 7, 4, 12, 30, 5).unwrap();
        assert_eq!(dt.to_string(), "2021-07-04T12:30:05");
        assert_eq!(DateTime::from_ticks(0).to_string(), "1970-01-01T00:00:00");

        let zoned: DateTime = "2021-07-04T14:30:05+02:00".parse().unwrap();
        assert_eq!(zoned, dt);

        assert!(DateTime::from_ymd_hms(2021, 2, 29, 0, 0, 0).is_err());
        assert!(DateTime::from_ymd_hms(2020, 2, 29, 0, 0, 0).is_ok());
    }

    #[test]
    fn verify_date_time_expression_precision() {
        let expr: DateTimeExpression = "2021-07".parse().unwrap();
        assert_eq!(expr.precision, DatePrecision::YEAR | DatePrecision::MONTH);
        assert_eq!(expr.to_string(), "2021-07");
        assert_eq!(
            expr.to_date_time(),
            DateTime::from_ymd_hms(2021, 7, 1, 0, 0, 0).unwrap()
        );

        let expr: DateTimeExpression = "1999-12-31 23:59:59.25Z".parse().unwrap();
        assert!(expr.precision.contains(DatePrecision::FRACTION));
        assert_eq!(expr.fraction, 2_500_000);
        assert_eq!(expr.to_string(), "1999-12-31T23:59:59.25Z");

        assert!("2021-13".parse::<DateTimeExpression>().is_err());
        assert!("2021-07-04T".parse::<DateTimeExpression>().is_err());
        assert!("21".parse::<DateTimeExpression>().is_err());
    }

    #[test]
    fn verify_date_time_never_equals_time_span() {
        let dt = TagValue::from(DateTime::from_ticks(0));
        let ts = TagValue::from(TimeSpan::from_ticks(0));
        assert_ne!(dt, ts);
        assert!(!dt.equals(&ts, CompareFlags::all()));
        assert!(!ts.equals(&dt, CompareFlags::all()));
    }

    #[test]
    fn verify_binary_not_text() {
        let picture = TagValue::picture(vec![1, 2, 3], "image/png", "cover");
        assert_eq!(
            picture.to_text(),
            Err(Error::ConversionError("meta: binary data has no text form"))
        );
        assert!(picture.to_integer().is_err());

        let binary = TagValue::from(vec![1u8, 2, 3]);
        assert!(binary.equals(&picture, CompareFlags::IGNORE_META_DATA));
        assert!(!binary.equals(&picture, CompareFlags::empty()));
        assert!(!binary.equals(&TagValue::from("\u{1}\u{2}\u{3}"), CompareFlags::IGNORE_META_DATA));
    }

    #[test]
    fn verify_compare_flags() {
        let a = TagValue::from("Hello").with_language("eng");
        let b = TagValue::from("HELLO").with_language("eng");
        let c = TagValue::text(b"HELLO", Encoding::Latin1).with_language("ger");

        assert_ne!(a, b);
        assert!(a.equals(&b, CompareFlags::CASE_INSENSITIVE));
        assert!(!b.equals(&c, CompareFlags::empty()));
        assert!(b.equals(&c, CompareFlags::IGNORE_META_DATA));

        // Text compares with numbers through the canonical form.
        assert_eq!(TagValue::from("5"), TagValue::from(5u64));
        assert_eq!(TagValue::from(5), TagValue::from(5u64));
    }

    #[test]
    fn verify_popularity_text_and_scale() {
        let pop = Popularity::new("foo", 40.0, 123, RatingScale::VorbisComment);
        let value = TagValue::from(pop.clone());

        assert_eq!(value.to_string(), "foo|40|123");

        let reparsed = TagValue::from(value.to_string());
        assert!(reparsed.equals(&value, CompareFlags::IGNORE_META_DATA));

        let parsed = reparsed.to_popularity().unwrap();
        assert_eq!(parsed.user, "foo");
        assert_eq!(parsed.rating, 40.0);
        assert_eq!(parsed.play_counter, 123);

        assert_eq!(pop.rating_on(RatingScale::Unspecified), 2.0);
        assert_eq!(pop.rescaled(RatingScale::Id3v2).rating, 64.0);
        assert_eq!(pop.rating_on(RatingScale::VorbisComment), 40.0);

        // Unrated stays unrated.
        let unrated = Popularity::new("bar", 0.0, 0, RatingScale::Id3v2);
        assert_eq!(unrated.rating_on(RatingScale::VorbisComment), 0.0);
        assert_eq!(unrated.to_string(), "bar");

        assert_eq!(Popularity::new("", 3.0, 0, RatingScale::Unspecified).to_string(), "|3");
        assert_eq!(Popularity::new("u", 0.0, 9, RatingScale::Unspecified).to_string(), "u|0|9");
    }

    #[test]
    fn verify_from_bytes() {
        let value =
            TagValue::from_bytes(TagDataType::Integer, Encoding::Latin1, b"77".to_vec()).unwrap();
        assert_eq!(value.data(), &TagData::Integer(77));

        let value = TagValue::from_bytes(
            TagDataType::PositionInSet,
            Encoding::Utf16Be,
            vec![0xfe, 0xff, 0, b'1', 0, b'/', 0, b'9'],
        )
        .unwrap();
        assert_eq!(value.data(), &TagData::PositionInSet(PositionInSet::new(1, 9)));

        let result = TagValue::from_bytes(TagDataType::TimeSpan, Encoding::Utf8, b"soon".to_vec());
        assert!(result.is_err());
    }

    #[test]
    fn verify_encode_text() {
        let value = TagValue::from("é");
        assert_eq!(value.to_text_encoded(Encoding::Latin1), Ok(vec![0xe9]));
        assert_eq!(value.to_text_encoded(Encoding::Utf16Be), Ok(vec![0x00, 0xe9]));
        assert!(TagValue::from("€").to_text_encoded(Encoding::Latin1).is_err());
        assert_eq!(value.to_text(), Ok(String::from("é")));
    }
}
