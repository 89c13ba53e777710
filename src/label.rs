//! Error-shaping combinators: renaming, hiding, explaining and rejecting
//! values after the fact.

use std::marker::PhantomData;

use crate::cursor::Input;
use crate::error::ParseError;
use crate::runtime::{Runtime, Signal, StepResult};
use crate::Parser;

/// `label(p, name)`: on a non-consuming failure, replace `p`'s expected-set
/// with `{name}`. A consuming failure is left untouched — the parser has
/// already committed past the point a single label could usefully describe.
pub struct Label<P> {
    p: P,
    name: String,
}

impl<I, O, P> Parser<I, O> for Label<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        match self.p.run(rt)? {
            Signal::Bad { error, consumed: false } => Ok(Signal::Bad {
                error: error.with_label(self.name.clone()),
                consumed: false,
            }),
            other => Ok(other),
        }
    }
}

pub fn label<P>(p: P, name: impl Into<String>) -> Label<P> {
    Label { p, name: name.into() }
}

/// `hide(p)`: drop `p`'s expected-set entirely on failure. The usual use is
/// whitespace/comment skippers, whose "expected whitespace" noise would
/// otherwise dominate every error message around them.
pub struct Hide<P>(pub(crate) P);

impl<I, O, P> Parser<I, O> for Hide<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        match self.0.run(rt)? {
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error: error.hidden(), consumed }),
            good => Ok(good),
        }
    }
}

pub fn hide<P>(p: P) -> Hide<P> {
    Hide(p)
}

/// `explain(p, reason)`: append a user-facing reason to any failure of `p`.
pub struct Explain<P> {
    p: P,
    reason: String,
}

impl<I, O, P> Parser<I, O> for Explain<P>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        match self.p.run(rt)? {
            Signal::Bad { error, consumed } => Ok(Signal::Bad {
                error: error.with_reason(self.reason.clone()),
                consumed,
            }),
            good => Ok(good),
        }
    }
}

pub fn explain<P>(p: P, reason: impl Into<String>) -> Explain<P> {
    Explain { p, reason: reason.into() }
}

/// `filter(p, pred)`: if `p` succeeds with a value `pred` rejects, fail
/// instead. The failure's consumed bit mirrors whatever `p` itself
/// consumed to produce the value — by default this failure is inside the
/// committed region; wrap in [`crate::Parser::atomic`] to backtrack over it.
pub struct Filter<P, Pred, O>(pub(crate) P, pub(crate) Pred, pub(crate) PhantomData<O>);

impl<I, O, P, Pred> Parser<I, O> for Filter<P, Pred, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Pred: Fn(&O) -> bool,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(o) => {
                if (self.1)(&o) {
                    Ok(Signal::Good(o))
                } else {
                    let consumed = rt.cursor().offset() != before.offset();
                    Ok(Signal::Bad {
                        error: ParseError::reason(rt.cursor().into(), "value rejected by filter"),
                        consumed,
                    })
                }
            }
            bad => Ok(bad),
        }
    }
}

pub fn filter<I, O, P, Pred>(p: P, pred: Pred) -> Filter<P, Pred, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    Pred: Fn(&O) -> bool,
{
    Filter(p, pred, PhantomData)
}

/// `filterOut(p, partialReason)`: like [`filter`], but the rejecting
/// function supplies the failure's message directly.
pub struct FilterOut<P, F, O>(pub(crate) P, pub(crate) F, pub(crate) PhantomData<O>);

impl<I, O, P, F> Parser<I, O> for FilterOut<P, F, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    F: Fn(&O) -> Option<String>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(o) => match (self.1)(&o) {
                None => Ok(Signal::Good(o)),
                Some(reason) => {
                    let consumed = rt.cursor().offset() != before.offset();
                    Ok(Signal::Bad {
                        error: ParseError::reason(rt.cursor().into(), reason),
                        consumed,
                    })
                }
            },
            bad => Ok(bad),
        }
    }
}

pub fn filter_out<I, O, P, F>(p: P, partial_reason: F) -> FilterOut<P, F, O>
where
    I: Input + ?Sized,
    P: Parser<I, O>,
    F: Fn(&O) -> Option<String>,
{
    FilterOut(p, partial_reason, PhantomData)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn label_replaces_expected_on_non_consuming_failure() {
        let p = label(primitive::satisfy::<str, _>(|c: &char| c.is_ascii_digit(), Some("digit")), "number");
        match crate::parse(&p, "x") {
            Err(e) => assert!(e.to_string().contains("number")),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn label_is_not_applied_after_consuming_failure() {
        let p = label(string::<str>("abc"), "keyword");
        match crate::parse(&p, "abx") {
            Err(e) => assert!(!e.to_string().contains("keyword")),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn hide_clears_expected_set() {
        let p = hide(primitive::satisfy::<str, _>(|c: &char| c.is_whitespace(), Some("whitespace")));
        match crate::parse(&p, "x") {
            Err(e) => assert!(!e.to_string().contains("whitespace")),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn explain_appends_reason() {
        let p = explain(primitive::item::<str>(), "need at least one character");
        match crate::parse(&p, "") {
            Err(e) => assert!(e.to_string().contains("need at least one character")),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn filter_rejects_value_as_consuming_failure() {
        let p = filter(primitive::item::<str>(), |c: &char| c.is_ascii_digit());
        assert!(crate::parse(&p, "a").is_err());
        assert_eq!(crate::parse(&filter(primitive::item::<str>(), |c: &char| c.is_ascii_digit()), "5"), Ok('5'));
    }

    #[test]
    fn filter_out_carries_custom_reason() {
        let p = filter_out(primitive::item::<str>(), |c: &char| {
            if c.is_ascii_digit() {
                None
            } else {
                Some(format!("'{c}' is not a digit"))
            }
        });
        match crate::parse(&p, "a") {
            Err(e) => assert!(e.to_string().contains("is not a digit")),
            Ok(_) => panic!("expected failure"),
        }
    }
}
