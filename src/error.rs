//! Structured parse failures and the programmer-error faults that bypass
//! ordinary recovery.
//!
//! [`ParseError`] carries the recoverable
//! categories (expected-set, unexpected token, user reasons) that flow
//! through `alt`/`atomic`, while [`RuntimeFault`] carries the three
//! programmer-error categories that abort a run outright.

use std::collections::BTreeSet;
use std::fmt;

/// A position in the input at which a failure was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl From<crate::cursor::Cursor> for Position {
    fn from(c: crate::cursor::Cursor) -> Self {
        Position {
            offset: c.offset(),
            line: c.line(),
            column: c.column(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A recoverable parse failure: position, expected-set, the unexpected
/// token (if any), and accumulated user reasons.
///
/// Pretty-printing a source snippet around the position is explicitly out
/// of scope — [`fmt::Display`] renders a flat single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    position: Position,
    expected: BTreeSet<String>,
    unexpected: Option<String>,
    reasons: Vec<String>,
}

impl ParseError {
    /// A failure with no information at all (the error produced by `empty`).
    pub fn blank(position: Position) -> Self {
        ParseError {
            position,
            expected: BTreeSet::new(),
            unexpected: None,
            reasons: Vec::new(),
        }
    }

    /// A failure expecting one of `expected`, optionally having found
    /// `unexpected`.
    pub fn expected(position: Position, expected: impl IntoIterator<Item = String>, unexpected: Option<String>) -> Self {
        ParseError {
            position,
            expected: expected.into_iter().collect(),
            unexpected,
            reasons: Vec::new(),
        }
    }

    /// A failure carrying only a user-supplied reason (`fail`, `explain`).
    pub fn reason(position: Position, reason: impl Into<String>) -> Self {
        ParseError {
            position,
            expected: BTreeSet::new(),
            unexpected: None,
            reasons: vec![reason.into()],
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn expected_set(&self) -> &BTreeSet<String> {
        &self.expected
    }

    pub fn unexpected(&self) -> Option<&str> {
        self.unexpected.as_deref()
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Replace the expected-set with a single label, dropping whatever was
    /// there before. Used by `label`.
    pub fn with_label(mut self, name: impl Into<String>) -> Self {
        self.expected = BTreeSet::from([name.into()]);
        self
    }

    /// Drop the expected-set entirely. Used by `hide`.
    pub fn hidden(mut self) -> Self {
        self.expected.clear();
        self
    }

    /// Append a user reason. Used by `explain`.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// Merge two failures: at the same position, union the
    /// expected-sets and concatenate reasons; a strictly later position
    /// dominates an earlier one.
    pub fn merge(self, other: Self) -> Self {
        match self.position.cmp(&other.position) {
            std::cmp::Ordering::Greater => self,
            std::cmp::Ordering::Less => other,
            std::cmp::Ordering::Equal => {
                let mut expected = self.expected;
                expected.extend(other.expected);
                let mut reasons = self.reasons;
                reasons.extend(other.reasons);
                ParseError {
                    position: self.position,
                    expected,
                    unexpected: self.unexpected.or(other.unexpected),
                    reasons,
                }
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: ", self.position)?;
        if !self.expected.is_empty() {
            let items: Vec<&str> = self.expected.iter().map(String::as_str).collect();
            write!(f, "expected {}", items.join(" or "))?;
            if let Some(found) = &self.unexpected {
                write!(f, ", found {found}")?;
            }
        } else if let Some(found) = &self.unexpected {
            write!(f, "unexpected {found}")?;
        } else if self.reasons.is_empty() {
            write!(f, "parse failed")?;
        }
        for reason in &self.reasons {
            write!(f, "; {reason}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// A register identity, used only to report which register faulted.
pub type RegisterId = u64;

/// Programmer-error categories: never recoverable by
/// `alt`, always fatal to the run they occur in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeFault {
    /// `get` was called on a [`crate::register::Register`] that was never
    /// written in this run.
    #[error("register {register} read at {position} before it was ever filled")]
    UnfilledRegister {
        register: RegisterId,
        position: Position,
    },

    /// `many`/`some`/... was applied to a sub-parser that succeeded without
    /// consuming input, which would iterate forever.
    #[error("non-consumptive iteration at {position}: sub-parser succeeded without consuming input")]
    NonConsumptiveIteration { position: Position },

    /// The same [`crate::register::Register`] was bound by two concurrent
    /// top-level runs.
    #[error("register {register} is already bound to another in-flight run")]
    RegisterReuse { register: RegisterId },
}

/// The error type returned by [`crate::parse`] and [`crate::parse_fully`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// An ordinary, recoverable parse failure reached the top level.
    #[error(transparent)]
    Error(#[from] ParseError),
    /// A programmer error aborted the run.
    #[error(transparent)]
    Aborted(#[from] RuntimeFault),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(offset: usize) -> Position {
        Position { offset, line: 1, column: offset as u32 + 1 }
    }

    #[test]
    fn merge_unions_expected_at_same_position() {
        let a = ParseError::expected(pos(3), ["digit".to_string()], Some("x".to_string()));
        let b = ParseError::expected(pos(3), ["letter".to_string()], None);
        let merged = a.merge(b);
        assert_eq!(
            merged.expected_set().iter().cloned().collect::<Vec<_>>(),
            vec!["digit".to_string(), "letter".to_string()]
        );
        assert_eq!(merged.unexpected(), Some("x"));
    }

    #[test]
    fn merge_prefers_later_position() {
        let early = ParseError::expected(pos(1), ["a".to_string()], None);
        let late = ParseError::expected(pos(5), ["b".to_string()], None);
        assert_eq!(early.clone().merge(late.clone()).position(), pos(5));
        assert_eq!(late.merge(early).position(), pos(5));
    }
}
