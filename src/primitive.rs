//! Primitive parsers.
//!
//! These are the leaves of every parser tree; every other combinator is
//! built out of these five plus the ones in [`crate::choice`],
//! [`crate::iter`] and [`crate::register`].

use std::marker::PhantomData;

use crate::cursor::Input;
use crate::error::ParseError;
use crate::runtime::{rt_trace, Runtime, Signal, StepResult};
use crate::Parser;

/// See [`pure`].
pub struct Pure<I: ?Sized, T>(T, PhantomData<I>);

impl<I: ?Sized, T: Clone> Clone for Pure<I, T> {
    fn clone(&self) -> Self {
        Pure(self.0.clone(), PhantomData)
    }
}

/// A parser that always succeeds with `x`, consuming no input.
///
/// ```
/// use parsley_core::prelude::*;
/// assert_eq!(parsley_core::parse(&pure::<str, _>(42), ""), Ok(42));
/// ```
pub fn pure<I: Input + ?Sized, T: Clone>(x: T) -> Pure<I, T> {
    Pure(x, PhantomData)
}

impl<I, T: Clone> Parser<I, T> for Pure<I, T>
where
    I: Input + ?Sized,
{
    fn run(&self, _rt: &mut Runtime<'_, I>) -> StepResult<T> {
        Ok(Signal::Good(self.0.clone()))
    }
}

/// See [`empty`].
pub struct Empty<I: ?Sized>(PhantomData<I>);

impl<I: ?Sized> Clone for Empty<I> {
    fn clone(&self) -> Self {
        Empty(PhantomData)
    }
}

/// A parser that always fails, carrying no information, consuming nothing.
pub fn empty<I: Input + ?Sized, T>() -> Empty<I> {
    Empty(PhantomData)
}

impl<I, T> Parser<I, T> for Empty<I>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<T> {
        Ok(Signal::Bad {
            error: ParseError::blank(rt.cursor().into()),
            consumed: false,
        })
    }
}

/// See [`fail`].
pub struct Fail<I: ?Sized>(String, PhantomData<I>);

impl<I: ?Sized> Clone for Fail<I> {
    fn clone(&self) -> Self {
        Fail(self.0.clone(), PhantomData)
    }
}

/// A parser that always fails with a user-supplied `reason`, consuming
/// nothing.
pub fn fail<I: Input + ?Sized, T>(reason: impl Into<String>) -> Fail<I> {
    Fail(reason.into(), PhantomData)
}

impl<I, T> Parser<I, T> for Fail<I>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<T> {
        Ok(Signal::Bad {
            error: ParseError::reason(rt.cursor().into(), self.0.clone()),
            consumed: false,
        })
    }
}

/// See [`satisfy`].
pub struct Satisfy<I: ?Sized, F> {
    pred: F,
    label: Option<String>,
    phantom: PhantomData<I>,
}

impl<I: ?Sized, F: Clone> Clone for Satisfy<I, F> {
    fn clone(&self) -> Self {
        Satisfy {
            pred: self.pred.clone(),
            label: self.label.clone(),
            phantom: PhantomData,
        }
    }
}

/// A parser that consumes one character if `pred` accepts it.
///
/// Fails without consuming at EOF or when `pred` rejects the next
/// character. `label`, if given, replaces the default "a single character"
/// expected-set entry.
pub fn satisfy<I: Input + ?Sized, F: Fn(&char) -> bool>(pred: F, label: Option<&str>) -> Satisfy<I, F> {
    Satisfy {
        pred,
        label: label.map(str::to_owned),
        phantom: PhantomData,
    }
}

impl<I, F> Parser<I, char> for Satisfy<I, F>
where
    I: Input + ?Sized,
    F: Fn(&char) -> bool,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<char> {
        let cursor = rt.cursor();
        match cursor.peek(rt.input()) {
            Some(c) if (self.pred)(&c) => {
                rt_trace!(target: "parsley_core::satisfy", offset = cursor.offset(), ch = %c, "consumed");
                rt.set_cursor(cursor.advance(rt.input()));
                Ok(Signal::Good(c))
            }
            found => {
                let label = self
                    .label
                    .clone()
                    .unwrap_or_else(|| "a character".to_string());
                Ok(Signal::Bad {
                    error: ParseError::expected(cursor.into(), [label], found.map(|c| c.to_string())),
                    consumed: false,
                })
            }
        }
    }
}

/// A parser that accepts any single character, failing only at EOF.
pub fn item<I: Input + ?Sized>() -> Satisfy<I, fn(&char) -> bool> {
    satisfy(|_| true, Some("any character"))
}

/// See [`eof`].
pub struct Eof<I: ?Sized>(PhantomData<I>);

impl<I: ?Sized> Clone for Eof<I> {
    fn clone(&self) -> Self {
        Eof(PhantomData)
    }
}

/// A parser that succeeds with `()` iff the cursor is at the end of input,
/// failing (without consuming) otherwise.
pub fn eof<I: Input + ?Sized>() -> Eof<I> {
    Eof(PhantomData)
}

impl<I> Parser<I, ()> for Eof<I>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        let cursor = rt.cursor();
        match cursor.peek(rt.input()) {
            None => Ok(Signal::Good(())),
            Some(c) => Ok(Signal::Bad {
                error: ParseError::expected(cursor.into(), ["end of input".to_string()], Some(c.to_string())),
                consumed: false,
            }),
        }
    }
}

/// See [`string`].
pub struct Str<I: ?Sized> {
    needle: String,
    phantom: PhantomData<I>,
}

impl<I: ?Sized> Clone for Str<I> {
    fn clone(&self) -> Self {
        Str {
            needle: self.needle.clone(),
            phantom: PhantomData,
        }
    }
}

/// A parser that matches the literal `s` character by character.
///
/// Per the LL(1) policy, a mismatch at character index `i > 0`
/// is reported as a *consuming* failure — the parser already committed to
/// this alternative by matching a prefix of it. Wrap in [`crate::Parser::atomic`]
/// to opt back into full backtracking over a partially-matched literal.
///
/// ```
/// use parsley_core::prelude::*;
/// let p = string::<str>("abc");
/// assert!(parsley_core::parse(&p, "ab").is_err());
/// ```
pub fn string<I: Input + ?Sized>(s: impl Into<String>) -> Str<I> {
    Str {
        needle: s.into(),
        phantom: PhantomData,
    }
}

impl<I> Parser<I, String> for Str<I>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<String> {
        let start = rt.cursor();
        let mut cursor = start;
        for (i, expected) in self.needle.chars().enumerate() {
            match cursor.peek(rt.input()) {
                Some(found) if found == expected => {
                    cursor = cursor.advance(rt.input());
                }
                found => {
                    rt.set_cursor(cursor);
                    return Ok(Signal::Bad {
                        error: ParseError::expected(
                            cursor.into(),
                            [self.needle.clone()],
                            found.map(|c| c.to_string()),
                        ),
                        consumed: i > 0,
                    });
                }
            }
        }
        rt.set_cursor(cursor);
        Ok(Signal::Good(self.needle.clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn pure_never_consumes() {
        assert_eq!(crate::parse(&pure::<str, _>('x'), "anything"), Ok('x'));
    }

    #[test]
    fn empty_always_fails_non_consuming() {
        assert!(crate::parse(&empty::<str, ()>(), "x").is_err());
    }

    #[test]
    fn satisfy_digit_then_many() {
        let digit = satisfy::<str, _>(|c: &char| c.is_ascii_digit(), Some("digit"));
        let p = digit.repeated();
        assert_eq!(crate::parse(&p, "123"), Ok(vec!['1', '2', '3']));
    }

    #[test]
    fn eof_succeeds_only_at_end() {
        assert_eq!(crate::parse(&eof::<str>(), ""), Ok(()));
        assert!(crate::parse(&eof::<str>(), "x").is_err());
    }

    #[test]
    fn string_partial_mismatch_consumes() {
        // string("abc") on "ab" fails CONSUMED=true at column 3
        let p = string::<str>("abc");
        let mut rt = crate::runtime::Runtime::new("ab");
        match p.run(&mut rt) {
            Ok(crate::runtime::Signal::Bad { consumed, error }) => {
                assert!(consumed);
                assert_eq!(error.position().column, 3);
            }
            _ => panic!("expected a consuming failure"),
        }
    }

    #[test]
    fn string_atomic_does_not_consume() {
        let p = string::<str>("abc").atomic();
        let mut rt = crate::runtime::Runtime::new("ab");
        match p.run(&mut rt) {
            Ok(crate::runtime::Signal::Bad { consumed, error }) => {
                assert!(!consumed);
                assert_eq!(error.position().column, 1);
            }
            _ => panic!("expected a non-consuming failure"),
        }
    }
}
