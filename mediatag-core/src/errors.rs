// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Mediatag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bitstream ended in the middle of a field.
    Truncated,
    /// The bitstream contained malformed data: a reserved bit was set, a sync word did not match,
    /// a field was out-of-bounds, or a table lookup overran.
    InvalidData(&'static str),
    /// A tag value could not be converted to the requested representation without losing its
    /// value.
    ConversionError(&'static str),
    /// The bitstream is syntactically valid but uses a feature, or a combination of features,
    /// that is not implemented.
    NotImplemented(&'static str),
    /// The operation was aborted at the request of the caller.
    OperationAborted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Truncated => {
                write!(f, "truncated bitstream")
            }
            Error::InvalidData(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            Error::ConversionError(msg) => {
                write!(f, "conversion failed: {}", msg)
            }
            Error::NotImplemented(feature) => {
                write!(f, "not implemented: {}", feature)
            }
            Error::OperationAborted => {
                write!(f, "operation aborted")
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a truncated bitstream error.
pub fn truncated_error<T>() -> Result<T> {
    Err(Error::Truncated)
}

/// Convenience function to create an invalid data error.
pub fn invalid_data_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidData(desc))
}

/// Convenience function to create a conversion error.
pub fn conversion_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ConversionError(desc))
}

/// Convenience function to create a not implemented error.
pub fn not_implemented_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::NotImplemented(feature))
}

/// Convenience function to create an operation aborted error.
pub fn aborted_error<T>() -> Result<T> {
    Err(Error::OperationAborted)
}
