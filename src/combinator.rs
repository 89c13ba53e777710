//! Sequencing and mapping.
//!
//! `map` applies a pure function over a success value without touching the
//! consumption bit; `seq` (exposed on [`crate::Parser`] as `then`) runs two
//! parsers in order, and propagates the first's consumption into the
//! second's failure if `p` consumed: any failure of `q` is
//! reported as consuming").

use std::marker::PhantomData;

use crate::cursor::Input;
use crate::runtime::{Runtime, Signal, StepResult};
use crate::Parser;

/// See [`crate::Parser::map`].
pub struct Map<P, F, O>(pub(crate) P, pub(crate) F, pub(crate) PhantomData<O>);

impl<I, O, U, P, F> Parser<I, U> for Map<P, F, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    F: Fn(O) -> U,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<U> {
        Ok(self.0.run(rt)?.map(&self.1))
    }
}

/// `p.then(q)`: run `p`, then `q`, keeping both outputs as a pair. If `p`
/// consumed input, a subsequent failure of `q` is reported as consuming
/// even if `q` itself never advanced the cursor.
pub struct Seq<P, Q>(pub(crate) P, pub(crate) Q);

impl<I, A, B, P, Q> Parser<I, (A, B)> for Seq<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I, A>,
    Q: Parser<I, B>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<(A, B)> {
        let before = rt.cursor();
        let a = match self.0.run(rt)? {
            Signal::Good(a) => a,
            bad => return Ok(bad),
        };
        let p_consumed = rt.cursor().offset() != before.offset();
        match self.1.run(rt)? {
            Signal::Good(b) => Ok(Signal::Good((a, b))),
            Signal::Bad { error, consumed } => Ok(Signal::Bad {
                error,
                consumed: consumed || p_consumed,
            }),
        }
    }
}

/// Sequence, keeping only the left output. See [`crate::Parser::then_ignore`].
pub struct ThenIgnore<P, Q>(pub(crate) Seq<P, Q>);

impl<I, A, B, P, Q> Parser<I, A> for ThenIgnore<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I, A>,
    Q: Parser<I, B>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<A> {
        Ok(self.0.run(rt)?.map(|(a, _)| a))
    }
}

/// Sequence, keeping only the right output. See [`crate::Parser::ignore_then`].
pub struct IgnoreThen<P, Q>(pub(crate) Seq<P, Q>);

impl<I, A, B, P, Q> Parser<I, B> for IgnoreThen<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I, A>,
    Q: Parser<I, B>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<B> {
        Ok(self.0.run(rt)?.map(|(_, b)| b))
    }
}

/// Applicative application: `ap(pf, px) == lift(|f, x| f(x), pf, px)`.
/// See [`crate::Parser::ap`].
pub struct Ap<PF, PX>(pub(crate) Seq<PF, PX>);

impl<I, A, B, PF, PX, F> Parser<I, B> for Ap<PF, PX>
where
    I: Input + ?Sized,
    F: Fn(A) -> B,
    PF: Parser<I, F>,
    PX: Parser<I, A>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<B> {
        Ok(self.0.run(rt)?.map(|(f, x)| f(x)))
    }
}

/// A minimal sum type standing in for the "either" encoding `select` needs
/// to encode conditional continuations for [`crate::Parser::select`]. Not a
/// general-purpose `Either` — just enough structure for `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

/// `select(p_either, p_right)`: runs `p_either`; if it yields `Left(u)`,
/// runs `p_right` and applies its function output to `u`; if `Right(a)`,
/// returns `a` directly. See [`crate::Parser::select`].
pub struct Select<PE, PR, U>(pub(crate) PE, pub(crate) PR, pub(crate) PhantomData<U>);

impl<I, U, A, F, PE, PR> Parser<I, A> for Select<PE, PR, U>
where
    I: Input + ?Sized,
    F: Fn(U) -> A,
    PE: Parser<I, Either<U, A>>,
    PR: Parser<I, F>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<A> {
        match self.0.run(rt)? {
            Signal::Good(Either::Right(a)) => Ok(Signal::Good(a)),
            Signal::Good(Either::Left(u)) => match self.1.run(rt)? {
                Signal::Good(f) => Ok(Signal::Good(f(u))),
                Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
            },
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

/// An n-ary lift: `lift(f, p1, p2)` is left-to-right sequencing of `p1`
/// then `p2` with `f` applied to both outputs. Higher arities are built by
/// nesting `then`/`map` the same way; the binary case is the one exposed
/// directly since Rust lacks variadic generics.
pub fn lift2<I, A, B, C, P, Q, F>(f: F, p: P, q: Q) -> Map<Seq<P, Q>, impl Fn((A, B)) -> C, (A, B)>
where
    I: Input + ?Sized,
    P: Parser<I, A>,
    Q: Parser<I, B>,
    F: Fn(A, B) -> C,
{
    Map(Seq(p, q), move |(a, b)| f(a, b), PhantomData)
}
