//! A parser combinator core: composable parsers over a character sequence,
//! LL(1)-by-default evaluation with explicit opt-in backtracking, a
//! register subsystem for mutable per-run state, and a structured error
//! model.
//!
//! Parsers are ordinary values — a [`Parser`] implementation is usually a
//! small struct wrapping whatever sub-parsers it composes, built by the
//! default methods on this trait. There is no separate grammar DSL or
//! macro layer; combinators are just functions and methods returning more
//! `Parser` values.
//!
//! By default, a failed alternative only gives way to the next one in an
//! [`Parser::or`] chain if it failed *without consuming any input* — this
//! is the LL(1) discipline. [`Parser::atomic`] opts a parser back into full
//! backtracking by turning any of its failures into a non-consuming one
//! and restoring the cursor.

/// Ordered choice, `atomic`, `lookAhead` and `notFollowedBy`.
pub mod choice;
/// `map`, `then`/`seq`, `ap`, `select` and the n-ary `lift2`.
pub mod combinator;
/// The input cursor and the [`cursor::Input`] trait it walks.
pub mod cursor;
/// Structured parse failures and the runtime faults that bypass them.
pub mod error;
/// `many`, `some`, `sepBy` and the rest of the iteration family.
pub mod iter;
/// Error-shaping combinators: `label`, `hide`, `explain`, `filter`.
pub mod label;
/// The five leaf parsers everything else is built from.
pub mod primitive;
/// Self-referential parser definitions.
pub mod recursive;
/// Mutable per-run register cells and the control-flow combinators on them.
pub mod register;
/// The evaluator that owns cursor and register state during one run.
pub mod runtime;

use std::marker::PhantomData;

use cursor::Input;
use error::ParseFailure;
use runtime::{Runtime, Signal, StepResult};

/// Commonly used functions, traits and types.
pub mod prelude {
    pub use crate::choice;
    pub use crate::combinator;
    pub use crate::iter;
    pub use crate::label::{self, explain, filter, filter_out, hide, label};
    pub use crate::primitive::{self, eof, pure, satisfy, string};
    pub use crate::register;
    pub use crate::Parser;
}

/// A parser from an input sequence `I` to an output value `O`.
///
/// Implementors only need [`Parser::run`]; everything else is a default
/// method building a small combinator struct around `self`.
pub trait Parser<I: Input + ?Sized, O> {
    /// Run this parser against the current position of `rt`, advancing its
    /// cursor on success (or on a failure that counts as "consuming").
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O>;

    /// Apply a pure function to a successful result.
    fn map<U, F: Fn(O) -> U>(self, f: F) -> combinator::Map<Self, F, O>
    where
        Self: Sized,
    {
        combinator::Map(self, f, PhantomData)
    }

    /// Run `self`, then `other`, keeping both outputs as a pair.
    fn then<Q, B>(self, other: Q) -> combinator::Seq<Self, Q>
    where
        Self: Sized,
        Q: Parser<I, B>,
    {
        combinator::Seq(self, other)
    }

    /// Run `self`, then `other`, keeping only `self`'s output.
    fn then_ignore<Q, B>(self, other: Q) -> combinator::ThenIgnore<Self, Q>
    where
        Self: Sized,
        Q: Parser<I, B>,
    {
        combinator::ThenIgnore(combinator::Seq(self, other))
    }

    /// Run `self`, then `other`, keeping only `other`'s output.
    fn ignore_then<Q, B>(self, other: Q) -> combinator::IgnoreThen<Self, Q>
    where
        Self: Sized,
        Q: Parser<I, B>,
    {
        combinator::IgnoreThen(combinator::Seq(self, other))
    }

    /// Applicative application: `self` yields a function, `other` yields
    /// its argument.
    fn ap<Q, A, B>(self, other: Q) -> combinator::Ap<Self, Q>
    where
        Self: Sized + Parser<I, A>,
        Q: Parser<I, O>,
        O: Fn(A) -> B,
    {
        combinator::Ap(combinator::Seq(self, other))
    }

    /// `self` yields `Left(u)` or `Right(a)`; on `Left`, `other` is run to
    /// get a function applied to `u`; on `Right`, the value is returned as
    /// is.
    fn select<Q, U, A, F>(self, other: Q) -> combinator::Select<Self, Q, U>
    where
        Self: Sized + Parser<I, combinator::Either<U, A>>,
        Q: Parser<I, F>,
        F: Fn(U) -> A,
    {
        combinator::Select(self, other, PhantomData)
    }

    /// Ordered choice: try `self`; if it fails without consuming input, try
    /// `other` and merge the expected-sets.
    fn or<Q>(self, other: Q) -> choice::Alt<Self, Q>
    where
        Self: Sized,
        Q: Parser<I, O>,
    {
        choice::Alt(self, other)
    }

    /// Turn any failure of `self` into a non-consuming one, restoring the
    /// cursor. The escape hatch from LL(1)-by-default into full
    /// backtracking.
    fn atomic(self) -> choice::Atomic<Self>
    where
        Self: Sized,
    {
        choice::Atomic(self)
    }

    /// Run `self`, but never advance the cursor: on success, restore the
    /// cursor and keep the value; on failure, propagate unchanged.
    fn look_ahead(self) -> choice::LookAhead<Self>
    where
        Self: Sized,
    {
        choice::LookAhead(self)
    }

    /// Succeed with `()`, without consuming, iff `self` would fail here.
    fn not_followed_by(self) -> choice::NotFollowedBy<Self, O>
    where
        Self: Sized,
    {
        choice::NotFollowedBy(self, PhantomData)
    }

    /// Zero or more repetitions, collected into a `Vec`.
    fn repeated(self) -> iter::Many<Self>
    where
        Self: Sized,
    {
        iter::Many(self)
    }

    /// One or more repetitions, collected into a `Vec`.
    fn repeated_at_least_one(self) -> iter::SomeP<Self>
    where
        Self: Sized,
    {
        iter::SomeP(self)
    }

    /// At least `n` repetitions, collected into a `Vec`.
    fn repeated_at_least(self, n: usize) -> iter::ManyN<Self>
    where
        Self: Sized,
    {
        iter::ManyN(self, n)
    }

    /// Exactly `n` repetitions, collected into a `Vec`.
    fn exactly(self, n: usize) -> iter::Exactly<Self>
    where
        Self: Sized,
    {
        iter::Exactly(self, n)
    }

    /// Zero or more repetitions, discarding the values.
    fn skip_repeated(self) -> iter::SkipMany<Self>
    where
        Self: Sized,
    {
        iter::SkipMany(self)
    }

    /// One or more repetitions, discarding the values.
    fn skip_repeated_at_least_one(self) -> iter::SkipSome<Self>
    where
        Self: Sized,
    {
        iter::SkipSome(self)
    }

    /// At least `n` repetitions, discarding the values.
    fn skip_repeated_at_least(self, n: usize) -> iter::SkipManyN<Self>
    where
        Self: Sized,
    {
        iter::SkipManyN(self, n)
    }

    /// Repeat until `end` succeeds, discarding `end`'s output.
    fn many_until<Q, OQ>(self, end: Q) -> iter::ManyUntil<Self, Q, OQ>
    where
        Self: Sized,
        Q: Parser<I, OQ>,
    {
        iter::ManyUntil(self, end, PhantomData)
    }

    /// Like [`Parser::many_until`], but requires at least one repetition
    /// and asserts `end` does not match immediately.
    fn some_until<Q, OQ>(self, end: Q) -> iter::SomeUntil<Self, Q, OQ>
    where
        Self: Sized,
        Q: Parser<I, OQ>,
    {
        iter::SomeUntil(self, end, PhantomData)
    }

    /// One or more repetitions of `self`, separated by `sep`.
    fn separated_by_1<Sep, OS>(self, sep: Sep) -> iter::SepBy1<Self, Sep, OS>
    where
        Self: Sized,
        Sep: Parser<I, OS>,
    {
        iter::SepBy1(self, sep, PhantomData)
    }

    /// Zero or more repetitions of `self`, separated by `sep`.
    fn separated_by<Sep, OS>(self, sep: Sep) -> choice::Alt<iter::SepBy1<Self, Sep, OS>, primitive::Pure<I, Vec<O>>>
    where
        Self: Sized,
        O: Clone,
        Sep: Parser<I, OS>,
    {
        choice::Alt(iter::SepBy1(self, sep, PhantomData), primitive::pure(Vec::new()))
    }

    /// One or more repetitions of `self`, each optionally followed by
    /// `sep`; a trailing separator is allowed.
    fn separated_end_by_1<Sep, OS>(self, sep: Sep) -> iter::SepEndBy1<Self, Sep, OS>
    where
        Self: Sized,
        Sep: Parser<I, OS>,
    {
        iter::SepEndBy1(self, sep, PhantomData)
    }

    /// Replace this parser's expected-set with `name` when it fails
    /// without consuming input.
    fn labelled(self, name: impl Into<String>) -> label::Label<Self>
    where
        Self: Sized,
    {
        label::label(self, name)
    }

    /// Drop this parser's expected-set on failure entirely.
    fn hidden(self) -> label::Hide<Self>
    where
        Self: Sized,
    {
        label::hide(self)
    }

    /// Append a user-facing reason to any failure.
    fn explained(self, reason: impl Into<String>) -> label::Explain<Self>
    where
        Self: Sized,
    {
        label::explain(self, reason)
    }

    /// Reject a successful value that does not satisfy `pred`.
    fn filtered<Pred>(self, pred: Pred) -> label::Filter<Self, Pred, O>
    where
        Self: Sized,
        Pred: Fn(&O) -> bool,
    {
        label::filter(self, pred)
    }

    /// Reject a successful value, supplying the failure's reason directly.
    fn filtered_out<F>(self, partial_reason: F) -> label::FilterOut<Self, F, O>
    where
        Self: Sized,
        F: Fn(&O) -> Option<String>,
    {
        label::filter_out(self, partial_reason)
    }
}

/// Run `parser` against `input`, succeeding even if trailing input remains
/// unconsumed. See [`parse_fully`] for a variant that additionally asserts
/// the whole of `input` was consumed.
pub fn parse<I, O>(parser: &impl Parser<I, O>, input: &I) -> Result<O, ParseFailure>
where
    I: Input + ?Sized,
{
    let mut rt = Runtime::new(input);
    match parser.run(&mut rt)? {
        Signal::Good(value) => Ok(value),
        Signal::Bad { error, .. } => Err(ParseFailure::Error(error)),
    }
}

/// `parse(parser <* eof, input)`: run `parser` over the whole of `input`,
/// requiring every character to be consumed.
pub fn parse_fully<I, O>(parser: &impl Parser<I, O>, input: &I) -> Result<O, ParseFailure>
where
    I: Input + ?Sized,
{
    let mut rt = Runtime::new(input);
    match parser.run(&mut rt)? {
        Signal::Good(value) => {
            if rt.cursor().at_eof(input) {
                Ok(value)
            } else {
                Err(ParseFailure::Error(error::ParseError::expected(
                    rt.cursor().into(),
                    ["end of input".to_string()],
                    rt.cursor().peek(input).map(|c| c.to_string()),
                )))
            }
        }
        Signal::Bad { error, .. } => Err(ParseFailure::Error(error)),
    }
}
