//! Iteration primitives built on top of the primitive and sequencing
//! combinators.
//!
//! All of `many`/`some`/`manyN`/`skipMany*` share one loop — they differ
//! only in the minimum number of successes required before a non-consuming
//! failure is allowed to end the iteration cleanly rather than propagate.
//! `run_many` below is that shared loop; everything else composes it or
//! `run_many_until`.

use std::marker::PhantomData;

use crate::combinator::{Seq, ThenIgnore};
use crate::cursor::Input;
use crate::error::RuntimeFault;
use crate::runtime::{Runtime, Signal, StepResult};
use crate::Parser;

/// Run `p` repeatedly, requiring at least `min` successes. A non-consuming
/// failure after at least `min` successes ends the loop and returns the
/// accumulated values; a non-consuming failure before `min` successes, or
/// any consuming failure, propagates. A success that left the cursor
/// exactly where it started is the "non-consumptive iteration" programmer
/// error: `many`/`some` would otherwise loop forever.
fn run_many<I, O, P>(p: &P, rt: &mut Runtime<'_, I>, min: usize) -> StepResult<Vec<O>>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    let mut out = Vec::new();
    loop {
        let before = rt.cursor();
        match p.run(rt)? {
            Signal::Good(o) => {
                if rt.cursor().offset() == before.offset() {
                    return Err(RuntimeFault::NonConsumptiveIteration { position: before.into() });
                }
                out.push(o);
            }
            Signal::Bad { error, consumed: false } => {
                rt.set_cursor(before);
                if out.len() < min {
                    return Ok(Signal::Bad { error, consumed: false });
                }
                return Ok(Signal::Good(out));
            }
            Signal::Bad { error, consumed: true } => {
                return Ok(Signal::Bad { error, consumed: true })
            }
        }
    }
}

/// Run `p` repeatedly until `end` succeeds, discarding `end`'s result and
/// returning the accumulated `p`-results. A consuming failure of either
/// `p` or `end` fails the whole combinator.
fn run_many_until<I, O, OQ, P, Q>(
    p: &P,
    end: &Q,
    rt: &mut Runtime<'_, I>,
    mut out: Vec<O>,
) -> StepResult<Vec<O>>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Q: Parser<I, OQ>,
{
    loop {
        let before = rt.cursor();
        match end.run(rt)? {
            Signal::Good(_) => return Ok(Signal::Good(out)),
            Signal::Bad { error, consumed: true } => return Ok(Signal::Bad { error, consumed: true }),
            Signal::Bad { consumed: false, .. } => {
                rt.set_cursor(before);
                match p.run(rt)? {
                    Signal::Good(o) => out.push(o),
                    Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
                }
            }
        }
    }
}

/// See [`crate::Parser::repeated`] (`many`).
pub struct Many<P>(pub(crate) P);

impl<I, O, P> Parser<I, Vec<O>> for Many<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        run_many(&self.0, rt, 0)
    }
}

/// See [`crate::Parser::repeated_at_least_one`] (`some`).
pub struct SomeP<P>(pub(crate) P);

impl<I, O, P> Parser<I, Vec<O>> for SomeP<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        run_many(&self.0, rt, 1)
    }
}

/// See [`crate::Parser::repeated_at_least`] (`manyN`). The `n < 0` programmer
/// error described for dynamically-typed hosts cannot arise here: `n` is a
/// `usize`.
pub struct ManyN<P>(pub(crate) P, pub(crate) usize);

impl<I, O, P> Parser<I, Vec<O>> for ManyN<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        run_many(&self.0, rt, self.1)
    }
}

/// See [`crate::Parser::skip_repeated`] (`skipMany`): as [`Many`], discarding
/// the accumulated values.
pub struct SkipMany<P>(pub(crate) P);

impl<I, O, P> Parser<I, ()> for SkipMany<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        Ok(run_many(&self.0, rt, 0)?.map(|_| ()))
    }
}

/// See [`crate::Parser::skip_repeated_at_least_one`] (`skipSome`): as
/// [`SomeP`], discarding the accumulated values.
pub struct SkipSome<P>(pub(crate) P);

impl<I, O, P> Parser<I, ()> for SkipSome<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        Ok(run_many(&self.0, rt, 1)?.map(|_| ()))
    }
}

/// See [`crate::Parser::skip_repeated_at_least`] (`skipManyN`): as
/// [`ManyN`], discarding the accumulated values.
pub struct SkipManyN<P>(pub(crate) P, pub(crate) usize);

impl<I, O, P> Parser<I, ()> for SkipManyN<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        Ok(run_many(&self.0, rt, self.1)?.map(|_| ()))
    }
}

/// See [`crate::Parser::exactly`]. Unlike `manyN`, stops after exactly `n`
/// successes rather than continuing to consume further matches.
pub struct Exactly<P>(pub(crate) P, pub(crate) usize);

impl<I, O, P> Parser<I, Vec<O>> for Exactly<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        let mut out = Vec::with_capacity(self.1);
        let mut prior_consumed = false;
        for _ in 0..self.1 {
            let before = rt.cursor();
            match self.0.run(rt)? {
                Signal::Good(o) => {
                    prior_consumed = prior_consumed || rt.cursor().offset() != before.offset();
                    out.push(o);
                }
                Signal::Bad { error, consumed } => {
                    return Ok(Signal::Bad {
                        error,
                        consumed: consumed || prior_consumed,
                    })
                }
            }
        }
        Ok(Signal::Good(out))
    }
}

/// See [`crate::Parser::many_until`].
pub struct ManyUntil<P, Q, OQ>(pub(crate) P, pub(crate) Q, pub(crate) PhantomData<OQ>);

impl<I, O, OQ, P, Q> Parser<I, Vec<O>> for ManyUntil<P, Q, OQ>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Q: Parser<I, OQ>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        run_many_until(&self.0, &self.1, rt, Vec::new())
    }
}

/// See [`crate::Parser::some_until`]: `notFollowedBy(end)`, then `p`, then
/// `manyUntil(p, end)`.
pub struct SomeUntil<P, Q, OQ>(pub(crate) P, pub(crate) Q, pub(crate) PhantomData<OQ>);

impl<I, O, OQ, P, Q> Parser<I, Vec<O>> for SomeUntil<P, Q, OQ>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Q: Parser<I, OQ>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        let before = rt.cursor();
        let probe = self.1.run(rt)?;
        rt.set_cursor(before);
        if let Signal::Good(_) = probe {
            let found = before.peek(rt.input()).map(|c| c.to_string());
            return Ok(Signal::Bad {
                error: crate::error::ParseError::expected(before.into(), [], found),
                consumed: false,
            });
        }

        let mut out = Vec::new();
        match self.0.run(rt)? {
            Signal::Good(o) => out.push(o),
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        }
        run_many_until(&self.0, &self.1, rt, out)
    }
}

/// See [`crate::Parser::separated_by_1`] (`sepBy1`): `p` followed by
/// `many(sep *> p)`.
pub struct SepBy1<P, Sep, OS>(pub(crate) P, pub(crate) Sep, pub(crate) PhantomData<OS>);

impl<I, O, OS, P, Sep> Parser<I, Vec<O>> for SepBy1<P, Sep, OS>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Sep: Parser<I, OS>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        let mut out = Vec::new();
        match self.0.run(rt)? {
            Signal::Good(o) => out.push(o),
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        }
        loop {
            let before = rt.cursor();
            match self.1.run(rt)? {
                Signal::Bad { consumed: false, .. } => {
                    rt.set_cursor(before);
                    return Ok(Signal::Good(out));
                }
                Signal::Bad { error, consumed: true } => {
                    return Ok(Signal::Bad { error, consumed: true })
                }
                Signal::Good(_) => {
                    let sep_consumed = rt.cursor().offset() != before.offset();
                    match self.0.run(rt)? {
                        Signal::Good(o) => out.push(o),
                        Signal::Bad { error, consumed } => {
                            return Ok(Signal::Bad {
                                error,
                                consumed: consumed || sep_consumed,
                            })
                        }
                    }
                }
            }
        }
    }
}

/// See [`crate::Parser::separated_by`] (`sepBy`): `sepBy1` or an empty list.
pub fn sep_by<I, O, OS, P, Sep>(p: P, sep: Sep) -> impl Parser<I, Vec<O>>
where
    I: Input + ?Sized,
    O: Clone,
    P: Parser<I, O>,
    Sep: Parser<I, OS>,
{
    crate::choice::Alt(SepBy1(p, sep, PhantomData), crate::primitive::pure(Vec::new()))
}

/// See [`crate::Parser::separated_end_by_1`] (`sepEndBy1`): one or more
/// `p`s, each optionally followed by `sep`; a trailing separator is
/// allowed.
pub struct SepEndBy1<P, Sep, OS>(pub(crate) P, pub(crate) Sep, pub(crate) PhantomData<OS>);

impl<I, O, OS, P, Sep> Parser<I, Vec<O>> for SepEndBy1<P, Sep, OS>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Sep: Parser<I, OS>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<O>> {
        let mut out = Vec::new();
        match self.0.run(rt)? {
            Signal::Good(o) => out.push(o),
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        }
        loop {
            let before_sep = rt.cursor();
            match self.1.run(rt)? {
                Signal::Bad { consumed: false, .. } => {
                    rt.set_cursor(before_sep);
                    return Ok(Signal::Good(out));
                }
                Signal::Bad { error, consumed: true } => {
                    return Ok(Signal::Bad { error, consumed: true })
                }
                Signal::Good(_) => {
                    let sep_consumed = rt.cursor().offset() != before_sep.offset();
                    let before_p = rt.cursor();
                    match self.0.run(rt)? {
                        Signal::Good(o) => out.push(o),
                        Signal::Bad { consumed: false, .. } => {
                            // Trailing separator with no following `p`: stop cleanly.
                            rt.set_cursor(before_p);
                            return Ok(Signal::Good(out));
                        }
                        Signal::Bad { error, consumed: true } => {
                            return Ok(Signal::Bad {
                                error,
                                consumed: true || sep_consumed,
                            })
                        }
                    }
                }
            }
        }
    }
}

/// `endBy1(p, sep) = some(p <* sep)`; `endBy = many(p <* sep)`. Built by
/// composing the existing `Seq`/`ThenIgnore`/iteration primitives rather
/// than a bespoke loop.
pub fn end_by1<I, O, OS, P, Sep>(p: P, sep: Sep) -> ManyN<ThenIgnore<P, Sep>>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Sep: Parser<I, OS>,
{
    ManyN(ThenIgnore(Seq(p, sep)), 1)
}

pub fn end_by<I, O, OS, P, Sep>(p: P, sep: Sep) -> ManyN<ThenIgnore<P, Sep>>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Sep: Parser<I, OS>,
{
    ManyN(ThenIgnore(Seq(p, sep)), 0)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn digit() -> impl Parser<str, char> + Clone {
        primitive::satisfy::<str, _>(|c: &char| c.is_ascii_digit(), Some("digit"))
    }

    #[test]
    fn many_collects_and_stops_non_consuming() {
        let p = digit().repeated();
        assert_eq!(crate::parse(&p, "123a"), Ok(vec!['1', '2', '3']));
        assert_eq!(crate::parse(&p, ""), Ok(vec![]));
    }

    #[test]
    fn sep_by_collects_values_between_separators() {
        let p = iter::sep_by(digit(), primitive::string::<str>(", "));
        assert_eq!(crate::parse(&p, "7, 3, 2"), Ok(vec!['7', '3', '2']));
        assert_eq!(crate::parse(&p, ""), Ok(vec![]));
        assert!(crate::parse(&p, "1, 2, ").is_err());
    }

    #[test]
    fn many_until_consumes_through_terminator() {
        let p = iter::ManyUntil(primitive::item::<str>(), primitive::string::<str>("*/"), std::marker::PhantomData);
        assert_eq!(
            crate::parse(&p, "hello*/"),
            Ok(vec!['h', 'e', 'l', 'l', 'o'])
        );
    }

    #[test]
    fn sep_end_by_allows_trailing_separator() {
        let p = iter::SepEndBy1(digit(), primitive::string::<str>(","), std::marker::PhantomData);
        assert_eq!(crate::parse(&p, "1,2,3,"), Ok(vec!['1', '2', '3']));
        assert_eq!(crate::parse(&p, "1,2,3"), Ok(vec!['1', '2', '3']));
    }

    #[test]
    fn exactly_stops_at_n() {
        let p = iter::Exactly(digit(), 2);
        assert_eq!(crate::parse(&p.then_ignore(primitive::item::<str>()), "123"), Ok(vec!['1', '2']));
    }

    #[test]
    fn skip_many_discards_values_but_still_consumes() {
        let p = digit().skip_repeated().then_ignore(primitive::string::<str>("a"));
        assert_eq!(crate::parse(&p, "123a"), Ok(()));
        assert_eq!(crate::parse(&digit().skip_repeated(), ""), Ok(()));
    }

    #[test]
    fn skip_some_requires_at_least_one() {
        let p = digit().skip_repeated_at_least_one();
        assert!(crate::parse(&p, "").is_err());
        assert_eq!(crate::parse(&p, "1"), Ok(()));
    }

    #[test]
    fn skip_many_n_requires_the_minimum_count() {
        let p = digit().skip_repeated_at_least(2);
        assert!(crate::parse(&p, "1").is_err());
        assert_eq!(crate::parse(&p, "12"), Ok(()));
    }
}
