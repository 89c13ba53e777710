//! Ordered choice, explicit backtracking, and lookahead.
//!
//! This is the heart of the LL(1)-by-default policy: [`Alt`] only tries its
//! right branch when the left failed *without* consuming input. [`Atomic`]
//! is the escape hatch that turns any failure — consuming or not — into a
//! non-consuming one, restoring the cursor, so a caller can opt into full
//! backtracking exactly where they need it.

use std::marker::PhantomData;

use crate::cursor::Input;
use crate::error::ParseError;
use crate::runtime::{Runtime, Signal, StepResult};
use crate::Parser;

/// `alt(p, q)`: ordered choice. Run `p`; if it fails without consuming,
/// run `q` and merge the expected-sets; if it consumed, its failure is
/// final and `q` is never run. See [`crate::Parser::or`].
pub struct Alt<P, Q>(pub(crate) P, pub(crate) Q);

impl<I, O, P, Q> Parser<I, O> for Alt<P, Q>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Q: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(o) => Ok(Signal::Good(o)),
            Signal::Bad { error, consumed: true } => Ok(Signal::Bad { error, consumed: true }),
            Signal::Bad { error: left_err, consumed: false } => {
                rt.set_cursor(before);
                match self.1.run(rt)? {
                    Signal::Good(o) => Ok(Signal::Good(o)),
                    Signal::Bad { error: right_err, consumed } => Ok(Signal::Bad {
                        error: left_err.merge(right_err),
                        consumed,
                    }),
                }
            }
        }
    }
}

/// `atomic(p)`: run `p`; on any failure, restore the cursor and report the
/// failure as non-consuming, carrying the same error information. See
/// [`crate::Parser::atomic`].
///
/// `atomic(atomic(p))` is equivalent to `atomic(p)` (idempotent): wrapping
/// an already-non-consuming failure a second time is a no-op.
pub struct Atomic<P>(pub(crate) P);

impl<I, O, P> Parser<I, O> for Atomic<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(o) => Ok(Signal::Good(o)),
            Signal::Bad { error, .. } => {
                rt.set_cursor(before);
                Ok(Signal::Bad { error, consumed: false })
            }
        }
    }
}

/// `lookAhead(p)`: run `p`; on success, restore the cursor and yield the
/// value (the cursor never advances); on failure, propagate unchanged —
/// including whatever cursor position and consumption bit `p` left behind.
/// See [`crate::Parser::look_ahead`].
pub struct LookAhead<P>(pub(crate) P);

impl<I, O, P> Parser<I, O> for LookAhead<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(o) => {
                rt.set_cursor(before);
                Ok(Signal::Good(o))
            }
            bad => Ok(bad),
        }
    }
}

/// `notFollowedBy(p)`: run `p` under a saved cursor; if it succeeds, fail
/// non-consumingly with an "unexpected" message; if it fails, succeed with
/// `()`. The cursor is restored to its entry position in every outcome.
/// See [`crate::Parser::not_followed_by`].
pub struct NotFollowedBy<P, O>(pub(crate) P, pub(crate) PhantomData<O>);

impl<I, O, P> Parser<I, ()> for NotFollowedBy<P, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        let before = rt.cursor();
        let outcome = self.0.run(rt)?;
        rt.set_cursor(before);
        match outcome {
            Signal::Good(_) => {
                let found = before.peek(rt.input()).map(|c| c.to_string());
                Ok(Signal::Bad {
                    error: ParseError::expected(before.into(), [], found),
                    consumed: false,
                })
            }
            Signal::Bad { .. } => Ok(Signal::Good(())),
        }
    }
}

/// `choice(p1..pn)`: right-fold with `alt`, or `empty()` if the list is
/// empty.
pub fn choice<I, O>(parsers: Vec<Box<dyn Parser<I, O>>>) -> Box<dyn Parser<I, O>>
where
    I: Input + ?Sized + 'static,
    O: 'static,
{
    let mut iter = parsers.into_iter().rev();
    let mut acc = match iter.next() {
        Some(last) => last,
        None => Box::new(crate::primitive::empty::<I, O>()),
    };
    for p in iter {
        acc = Box::new(Alt(p, acc));
    }
    acc
}

/// `atomicChoice(p1..pn)`: right-fold with `atomic(p) or q`, except the
/// last alternative, which is left untouched so a true failure still
/// reports whatever consumption it actually performed.
pub fn atomic_choice<I, O>(parsers: Vec<Box<dyn Parser<I, O>>>) -> Box<dyn Parser<I, O>>
where
    I: Input + ?Sized + 'static,
    O: 'static,
{
    let mut iter = parsers.into_iter().rev();
    let mut acc = match iter.next() {
        Some(last) => last,
        None => return Box::new(crate::primitive::empty::<I, O>()),
    };
    for p in iter {
        acc = Box::new(Alt(Box::new(Atomic(p)) as Box<dyn Parser<I, O>>, acc));
    }
    acc
}

impl<I, O> Parser<I, O> for Box<dyn Parser<I, O>>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        (**self).run(rt)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::runtime::Signal;

    #[test]
    fn alt_does_not_try_right_after_consuming_failure() {
        // `string("ab")` consumes 'a' before failing on the second char, so
        // `.or(item())` must not be tried: the whole thing fails.
        let p = string::<str>("ab").map(|_| 'z').or(primitive::item::<str>());
        assert!(crate::parse(&p, "ax").is_err());
    }

    #[test]
    fn alt_tries_right_after_non_consuming_failure() {
        let p = primitive::satisfy::<str, _>(|c: &char| *c == 'x', Some("x")).or(primitive::item::<str>());
        assert_eq!(crate::parse(&p, "y"), Ok('y'));
    }

    #[test]
    fn alt_identity_laws() {
        let p = primitive::item::<str>();
        assert_eq!(
            crate::parse(&primitive::empty::<str, char>().or(primitive::item::<str>()), "a"),
            crate::parse(&p, "a")
        );
    }

    #[test]
    fn atomic_is_idempotent() {
        let once = string::<str>("abc").atomic();
        let twice = string::<str>("abc").atomic().atomic();
        let mut rt1 = crate::runtime::Runtime::new("ab");
        let mut rt2 = crate::runtime::Runtime::new("ab");
        let r1 = once.run(&mut rt1);
        let r2 = twice.run(&mut rt2);
        match (r1, r2) {
            (Ok(Signal::Bad { consumed: c1, .. }), Ok(Signal::Bad { consumed: c2, .. })) => {
                assert_eq!(c1, c2);
                assert!(!c1);
            }
            _ => panic!("expected both to fail non-consuming"),
        }
    }

    #[test]
    fn look_ahead_does_not_advance_cursor_on_success() {
        let p = string::<str>("abc").look_ahead();
        assert_eq!(crate::parse(&p.then_ignore(string::<str>("abc")), "abc").map(|_| ()), Ok(()));
    }

    #[test]
    fn not_followed_by_succeeds_when_pattern_absent() {
        let p = primitive::item::<str>().then_ignore(primitive::satisfy::<str, _>(|c: &char| *c == 'x', None).not_followed_by());
        assert_eq!(crate::parse(&p, "ab"), Ok('a'));
        assert!(crate::parse(&p, "ax").is_err());
    }
}
