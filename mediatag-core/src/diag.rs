// Mediatag
// Copyright (c) 2024-2026 The Project Mediatag Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `diag` module provides an append-only log of leveled messages collected while parsing.
//!
//! Parsers take a `&mut Diagnostics` and record recoverable anomalies into it. Fatal conditions are
//! returned as [`Error`](crate::errors::Error) instead.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::time::SystemTime;

use log::{debug, error, info, warn};

/// The severity of a diagnostic message. Levels are ordered from least to most severe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagLevel {
    Debug,
    Information,
    Warning,
    /// The output for the current unit should not be trusted.
    Critical,
    Fatal,
}

impl BitOr for DiagLevel {
    type Output = DiagLevel;

    /// Combining two levels yields the more severe one.
    fn bitor(self, rhs: Self) -> Self::Output {
        self.max(rhs)
    }
}

impl BitOrAssign for DiagLevel {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagLevel::Debug => "debug",
            DiagLevel::Information => "information",
            DiagLevel::Warning => "warning",
            DiagLevel::Critical => "critical",
            DiagLevel::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A single immutable diagnostic record.
#[derive(Clone, Debug)]
pub struct DiagMessage {
    level: DiagLevel,
    message: String,
    context: String,
    created: SystemTime,
}

impl DiagMessage {
    /// Create a new message stamped with the current time.
    pub fn new(level: DiagLevel, message: impl Into<String>, context: impl Into<String>) -> Self {
        DiagMessage {
            level,
            message: message.into(),
            context: context.into(),
            created: SystemTime::now(),
        }
    }

    pub fn level(&self) -> DiagLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The context in which the message was raised, for example the name of the sub-parser.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }
}

impl fmt::Display for DiagMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "[{}] {}", self.level, self.message)
        }
        else {
            write!(f, "[{}] {}: {}", self.level, self.context, self.message)
        }
    }
}

/// An ordered, append-only, sequence of `DiagMessage`s.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    messages: Vec<DiagMessage>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Append a message. The message is also forwarded to the `log` facade.
    pub fn push(&mut self, msg: DiagMessage) {
        match msg.level {
            DiagLevel::Debug => debug!("{}", msg),
            DiagLevel::Information => info!("{}", msg),
            DiagLevel::Warning => warn!("{}", msg),
            DiagLevel::Critical | DiagLevel::Fatal => error!("{}", msg),
        }
        self.messages.push(msg);
    }

    /// Append a new message built from its parts.
    pub fn add(
        &mut self,
        level: DiagLevel,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.push(DiagMessage::new(level, message, context));
    }

    /// Append copies of all messages in `other`.
    pub fn extend_from(&mut self, other: &Diagnostics) {
        self.messages.extend(other.messages.iter().cloned());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiagMessage> {
        self.messages.iter()
    }

    /// Gets the most severe level over all messages, or `None` if there are no messages.
    pub fn worst_level(&self) -> Option<DiagLevel> {
        self.messages.iter().map(|msg| msg.level).reduce(|a, b| a | b)
    }

    /// Returns true if at least one message has exactly the given level.
    pub fn has(&self, level: DiagLevel) -> bool {
        self.messages.iter().any(|msg| msg.level == level)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagMessage;
    type IntoIter = std::slice::Iter<'a, DiagMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_level_or_is_max() {
        assert_eq!(DiagLevel::Debug | DiagLevel::Warning, DiagLevel::Warning);
        assert_eq!(DiagLevel::Fatal | DiagLevel::Information, DiagLevel::Fatal);

        let mut level = DiagLevel::Critical;
        level |= DiagLevel::Warning;
        assert_eq!(level, DiagLevel::Critical);
        level |= DiagLevel::Fatal;
        assert_eq!(level, DiagLevel::Fatal);
    }

    #[test]
    fn verify_worst_level() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.worst_level(), None);
        assert!(diag.is_empty());

        diag.add(DiagLevel::Information, "one", "test");
        diag.add(DiagLevel::Warning, "two", "test");
        diag.add(DiagLevel::Debug, "three", "");

        assert_eq!(diag.worst_level(), Some(DiagLevel::Warning));
        assert!(diag.has(DiagLevel::Debug));
        assert!(!diag.has(DiagLevel::Critical));
        assert_eq!(diag.len(), 3);
    }

    #[test]
    fn verify_order_preserved() {
        let mut diag = Diagnostics::new();
        diag.add(DiagLevel::Warning, "first", "a");
        diag.add(DiagLevel::Debug, "second", "b");

        let msgs: Vec<&str> = diag.iter().map(|m| m.message()).collect();
        assert_eq!(msgs, ["first", "second"]);

        let mut other = Diagnostics::new();
        other.add(DiagLevel::Fatal, "third", "c");
        diag.extend_from(&other);

        assert_eq!(diag.len(), 3);
        assert_eq!(diag.worst_level(), Some(DiagLevel::Fatal));
        assert_eq!(format!("{}", diag.iter().last().unwrap()), "[fatal] c: third");
    }
}
