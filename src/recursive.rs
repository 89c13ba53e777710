//! Self-referential parser definitions.
//!
//! A grammar rule that mentions itself (`expr := term ('+' term)*` where
//! `term` can itself contain a parenthesised `expr`) can't be built as an
//! ordinary Rust value — its own type would need to appear in its
//! definition. [`Recursive`] breaks the cycle the same way `BoxedParser`
//! erases a combinator's concrete type elsewhere in this crate: behind an
//! `Rc<dyn Parser<I, O>>`, filled in after construction.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cursor::Input;
use crate::runtime::{Runtime, StepResult};
use crate::Parser;

/// A parser whose definition may reference itself. Declared with
/// [`recursive`]; cloning shares the same underlying definition, which is
/// why a closure building a recursive grammar can capture a clone of it.
pub struct Recursive<I: ?Sized, O> {
    inner: Rc<RefCell<Option<Rc<dyn Parser<I, O>>>>>,
}

impl<I: ?Sized, O> Clone for Recursive<I, O> {
    fn clone(&self) -> Self {
        Recursive { inner: Rc::clone(&self.inner) }
    }
}

impl<I: Input + ?Sized + 'static, O: 'static> Recursive<I, O> {
    fn declare() -> Self {
        Recursive { inner: Rc::new(RefCell::new(None)) }
    }

    fn define(&self, parser: impl Parser<I, O> + 'static) {
        *self.inner.borrow_mut() = Some(Rc::new(parser));
    }
}

impl<I, O> Parser<I, O> for Recursive<I, O>
where
    I: Input + ?Sized,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let inner = self
            .inner
            .borrow()
            .clone()
            .expect("recursive parser used before its definition was supplied");
        inner.run(rt)
    }
}

/// Build a parser that may refer to itself: `build` receives a handle to
/// the parser being constructed and returns the actual grammar, which is
/// then wired in as that handle's definition.
///
/// ```
/// use parsley_core::prelude::*;
/// use parsley_core::recursive::recursive;
///
/// let balanced = recursive(|balanced| {
///     string::<str>("(")
///         .ignore_then(balanced)
///         .then_ignore(string::<str>(")"))
///         .map(|_| ())
///         .or(primitive::pure(()))
/// });
/// assert_eq!(parsley_core::parse(&balanced, "(())"), Ok(()));
/// ```
pub fn recursive<I, O, F, P>(build: F) -> Recursive<I, O>
where
    I: Input + ?Sized + 'static,
    O: 'static,
    P: Parser<I, O> + 'static,
    F: FnOnce(Recursive<I, O>) -> P,
{
    let handle = Recursive::declare();
    let parser = build(handle.clone());
    handle.define(parser);
    handle
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::recursive::recursive;

    #[test]
    fn recursive_parses_balanced_parens() {
        let balanced = recursive(|balanced| {
            string::<str>("(")
                .ignore_then(balanced)
                .then_ignore(string::<str>(")"))
                .map(|_| ())
                .or(primitive::pure(()))
        });
        assert_eq!(crate::parse(&balanced.clone().then_ignore(primitive::eof::<str>()), "((()))"), Ok(()));
        assert!(crate::parse(&balanced.then_ignore(primitive::eof::<str>()), "(()").is_err());
    }
}
