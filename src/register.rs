//! Mutable, typed, per-run cells, and the register-driven control-flow
//! combinators built on top of them.
//!
//! A [`Register<T>`] is pure identity — a process-wide unique `u64` plus a
//! phantom type. It holds no value itself; the value lives in the active
//! [`crate::runtime::Runtime`]'s register table, keyed by that identity, for
//! as long as the run is in progress. Creating a `Register` outside a run
//! and never using it costs nothing and allocates no slot.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::combinator::{Ap, Map, Seq};
use crate::cursor::Input;
use crate::error::RuntimeFault;
use crate::primitive::{pure, Pure};
use crate::runtime::{Runtime, Signal, StepResult};
use crate::Parser;

/// A typed, externally-identified cell, live only for the duration of one
/// top-level run. Two `Register<T>` values are the same register iff their
/// ids match, regardless of where each was constructed.
pub struct Register<T> {
    id: u64,
    phantom: PhantomData<T>,
}

impl<T> Register<T> {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Register {
            id: NEXT.fetch_add(1, Ordering::Relaxed),
            phantom: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Default for Register<T> {
    fn default() -> Self {
        Register::new()
    }
}

impl<T> Clone for Register<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Register<T> {}

fn propagate_consumed<O>(sig: Signal<O>, prior_consumed: bool) -> StepResult<O> {
    Ok(match sig {
        Signal::Good(o) => Signal::Good(o),
        Signal::Bad { error, consumed } => Signal::Bad {
            error,
            consumed: consumed || prior_consumed,
        },
    })
}

/// `get`: a pure, non-consuming read. Fails with [`RuntimeFault::UnfilledRegister`]
/// if the register was never written in this run.
pub struct Get<T>(pub(crate) Register<T>);

impl<I, T> Parser<I, T> for Get<T>
where
    I: Input + ?Sized,
    T: Clone + 'static,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<T> {
        rt.registers.acquire(self.0.id())?;
        match rt.registers.get::<T>(self.0.id()) {
            Some(v) => Ok(Signal::Good(v)),
            None => Err(RuntimeFault::UnfilledRegister {
                register: self.0.id(),
                position: rt.cursor().into(),
            }),
        }
    }
}

pub fn get<T>(reg: Register<T>) -> Get<T> {
    Get(reg)
}

/// `gets(f) = map(get, f)`.
pub fn gets<I, T, U, F>(reg: Register<T>, f: F) -> Map<Get<T>, F, T>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    F: Fn(T) -> U,
{
    Map(Get(reg), f, PhantomData)
}

/// `gets(pf) = ap(pf, get)`.
pub fn gets_ap<I, T, U, F, PF>(reg: Register<T>, pf: PF) -> Ap<PF, Get<T>>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    F: Fn(T) -> U,
    PF: Parser<I, F>,
{
    Ap(Seq(pf, Get(reg)))
}

/// `put(x)` / `put(p)`: write a literal value, or the result of running a
/// parser, into the register. Always succeeds non-consumingly once its
/// source does.
pub struct Put<T, P>(pub(crate) Register<T>, pub(crate) P);

impl<I, T, P> Parser<I, ()> for Put<T, P>
where
    I: Input + ?Sized,
    T: 'static,
    P: Parser<I, T>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        match self.1.run(rt)? {
            Signal::Good(v) => {
                rt.registers.acquire(self.0.id())?;
                rt.registers.put(self.0.id(), v);
                Ok(Signal::Good(()))
            }
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

pub fn put_value<I, T>(reg: Register<T>, x: T) -> Put<T, Pure<I, T>>
where
    I: Input + ?Sized,
    T: Clone,
{
    Put(reg, pure(x))
}

pub fn put<I, T, P>(reg: Register<T>, p: P) -> Put<T, P>
where
    I: Input + ?Sized,
    P: Parser<I, T>,
{
    Put(reg, p)
}

/// `puts(p, f) = put(map(p, f))`.
pub fn puts<I, T, U, P, F>(reg: Register<U>, p: P, f: F) -> Put<U, Map<P, F, T>>
where
    I: Input + ?Sized,
    U: 'static,
    P: Parser<I, T>,
    F: Fn(T) -> U,
{
    Put(reg, Map(p, f, PhantomData))
}

/// `modify(f)`: atomic read-write with a pure function. Fails with
/// [`RuntimeFault::UnfilledRegister`] if the register has never been
/// written in this run — there is nothing to read.
pub struct Modify<T, F>(pub(crate) Register<T>, pub(crate) F);

impl<I, T, F> Parser<I, ()> for Modify<T, F>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    F: Fn(T) -> T,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        rt.registers.acquire(self.0.id())?;
        let old = rt.registers.get::<T>(self.0.id()).ok_or_else(|| RuntimeFault::UnfilledRegister {
            register: self.0.id(),
            position: rt.cursor().into(),
        })?;
        rt.registers.put(self.0.id(), (self.1)(old));
        Ok(Signal::Good(()))
    }
}

pub fn modify<T, F>(reg: Register<T>, f: F) -> Modify<T, F>
where
    F: Fn(T) -> T,
{
    Modify(reg, f)
}

/// `modify(pf) = put(gets(pf))`: the step function itself comes from
/// running a parser.
pub fn modify_with<I, T, F, PF>(reg: Register<T>, pf: PF) -> Put<T, Ap<PF, Get<T>>>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    F: Fn(T) -> T,
    PF: Parser<I, F>,
{
    Put(reg, Ap(Seq(pf, Get(reg))))
}

/// `local(x)(p)`: set the register to a literal value, run `p`, and restore
/// the prior value (or clear the register back to unfilled, if it had no
/// prior value) when `p` succeeds. On failure of `p` the register is left
/// exactly as `p` left it — restoring only happens on success, and pairing
/// `local` with `rollback` is how a caller opts into restoring on failure
/// too.
pub struct LocalValue<T, PB> {
    reg: Register<T>,
    value: T,
    body: PB,
}

impl<I, T, O, PB> Parser<I, O> for LocalValue<T, PB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    PB: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        rt.registers.acquire(self.reg.id())?;
        let prior = rt.registers.get::<T>(self.reg.id());
        rt.registers.put(self.reg.id(), self.value.clone());
        match self.body.run(rt)? {
            Signal::Good(o) => {
                match prior {
                    Some(p) => rt.registers.put(self.reg.id(), p),
                    None => rt.registers.clear(self.reg.id()),
                }
                Ok(Signal::Good(o))
            }
            bad => Ok(bad),
        }
    }
}

pub fn local_value<T, PB>(reg: Register<T>, value: T, body: PB) -> LocalValue<T, PB> {
    LocalValue { reg, value, body }
}

/// `local(pf)(q)`: like [`local_value`], but the new value comes from
/// running a parser first.
pub struct LocalParser<T, PV, PB> {
    reg: Register<T>,
    value: PV,
    body: PB,
}

impl<I, T, O, PV, PB> Parser<I, O> for LocalParser<T, PV, PB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    PV: Parser<I, T>,
    PB: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let new_value = match self.value.run(rt)? {
            Signal::Good(v) => v,
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        };
        rt.registers.acquire(self.reg.id())?;
        let prior = rt.registers.get::<T>(self.reg.id());
        rt.registers.put(self.reg.id(), new_value);
        match self.body.run(rt)? {
            Signal::Good(o) => {
                match prior {
                    Some(p) => rt.registers.put(self.reg.id(), p),
                    None => rt.registers.clear(self.reg.id()),
                }
                Ok(Signal::Good(o))
            }
            bad => Ok(bad),
        }
    }
}

pub fn local_parser<T, PV, PB>(reg: Register<T>, value: PV, body: PB) -> LocalParser<T, PV, PB> {
    LocalParser { reg, value, body }
}

/// `local(f)(p)`: derive the new value from the current one. Requires the
/// register already be filled.
pub struct LocalMap<T, F, PB> {
    reg: Register<T>,
    f: F,
    body: PB,
}

impl<I, T, O, F, PB> Parser<I, O> for LocalMap<T, F, PB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    F: Fn(T) -> T,
    PB: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        rt.registers.acquire(self.reg.id())?;
        let prior = rt.registers.get::<T>(self.reg.id()).ok_or_else(|| RuntimeFault::UnfilledRegister {
            register: self.reg.id(),
            position: rt.cursor().into(),
        })?;
        rt.registers.put(self.reg.id(), (self.f)(prior.clone()));
        match self.body.run(rt)? {
            Signal::Good(o) => {
                rt.registers.put(self.reg.id(), prior);
                Ok(Signal::Good(o))
            }
            bad => Ok(bad),
        }
    }
}

pub fn local_map<T, F, PB>(reg: Register<T>, f: F, body: PB) -> LocalMap<T, F, PB> {
    LocalMap { reg, f, body }
}

/// `rollback(p)`: save the register's prior value; run `p`; if `p` fails
/// *without* consuming input, restore the prior value and propagate the
/// failure (still non-consuming); otherwise pass through unchanged.
pub struct Rollback<T, P> {
    reg: Register<T>,
    body: P,
}

impl<I, T, O, P> Parser<I, O> for Rollback<T, P>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    P: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        rt.registers.acquire(self.reg.id())?;
        let prior = rt.registers.get::<T>(self.reg.id());
        match self.body.run(rt)? {
            Signal::Good(o) => Ok(Signal::Good(o)),
            Signal::Bad { error, consumed: true } => Ok(Signal::Bad { error, consumed: true }),
            Signal::Bad { error, consumed: false } => {
                match prior {
                    Some(p) => rt.registers.put(self.reg.id(), p),
                    None => rt.registers.clear(self.reg.id()),
                }
                Ok(Signal::Bad { error, consumed: false })
            }
        }
    }
}

pub fn rollback<T, P>(reg: Register<T>, body: P) -> Rollback<T, P> {
    Rollback { reg, body }
}

/// `fillReg(p, body)`: allocate a fresh register, initialize it with `p`'s
/// result, run `body(reg)`, and deallocate the register on every exit path
/// — success, recoverable failure, or fault.
pub struct FillReg<T, P, F>(pub(crate) P, pub(crate) F, pub(crate) PhantomData<T>);

impl<I, T, O, P, F, PB> Parser<I, O> for FillReg<T, P, F>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    P: Parser<I, T>,
    F: Fn(Register<T>) -> PB,
    PB: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        match self.0.run(rt)? {
            Signal::Good(v) => {
                let reg = Register::new();
                rt.registers.acquire(reg.id())?;
                rt.registers.put(reg.id(), v);
                let body = (self.1)(reg);
                let result = body.run(rt);
                rt.registers.remove(reg.id());
                result
            }
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

pub fn fill_reg<T, P, F>(init: P, body: F) -> FillReg<T, P, F> {
    FillReg(init, body, PhantomData)
}

/// `persist(p, f) = fillReg(p, r => f(r.get))`: inspect a result more than
/// once without reparsing.
pub fn persist<I, T, O, P, F, PO>(p: P, f: F) -> FillReg<T, P, impl Fn(Register<T>) -> PO>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    P: Parser<I, T>,
    F: Fn(Get<T>) -> PO,
    PO: Parser<I, O>,
{
    FillReg(p, move |reg| f(Get(reg)), PhantomData)
}

/// `ifP(cond, thenP, elseP)`: run `cond`, then branch. A consuming `cond`
/// makes either branch's failure report as consuming too, matching the
/// sequencing rule used everywhere else in this crate.
pub struct IfP<PC, PT, PE>(pub(crate) PC, pub(crate) PT, pub(crate) PE);

impl<I, O, PC, PT, PE> Parser<I, O> for IfP<PC, PT, PE>
where
    I: Input + ?Sized,
    PC: Parser<I, bool>,
    PT: Parser<I, O>,
    PE: Parser<I, O>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<O> {
        let before = rt.cursor();
        match self.0.run(rt)? {
            Signal::Good(cond) => {
                let cond_consumed = rt.cursor().offset() != before.offset();
                let branch = if cond { self.1.run(rt)? } else { self.2.run(rt)? };
                propagate_consumed(branch, cond_consumed)
            }
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

pub fn if_p<I, O, PC, PT, PE>(cond: PC, then_p: PT, else_p: PE) -> IfP<PC, PT, PE>
where
    I: Input + ?Sized,
    PC: Parser<I, bool>,
    PT: Parser<I, O>,
    PE: Parser<I, O>,
{
    IfP(cond, then_p, else_p)
}

/// `when(cond, thenP) = ifP(cond, thenP, unit)`.
pub fn when<I, PC, PT>(cond: PC, then_p: PT) -> IfP<PC, PT, Pure<I, ()>>
where
    I: Input + ?Sized,
    PC: Parser<I, bool>,
    PT: Parser<I, ()>,
{
    IfP(cond, then_p, pure(()))
}

/// `whileP(p)`: repeatedly run `p`; continue while it yields `true`, stop
/// (succeeding with `()`) on `false`, and propagate any failure of `p`.
pub struct WhileP<P>(pub(crate) P);

impl<I, P> Parser<I, ()> for WhileP<P>
where
    I: Input + ?Sized,
    P: Parser<I, bool>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        loop {
            match self.0.run(rt)? {
                Signal::Good(true) => continue,
                Signal::Good(false) => return Ok(Signal::Good(())),
                Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
            }
        }
    }
}

pub fn while_p<I, P>(p: P) -> WhileP<P>
where
    I: Input + ?Sized,
    P: Parser<I, bool>,
{
    WhileP(p)
}

/// Shared loop for `forP_`/`forYieldP_`: `cond` and `step` are re-evaluated
/// every iteration (they are parsers, not plain functions, so they may
/// themselves consume input), against the fresh register `reg` set up by
/// the caller.
fn run_for<I, T, U, Cond, Step, PC, PS, FB, PB>(
    cond: &PC,
    step: &PS,
    body: &FB,
    reg: Register<T>,
    rt: &mut Runtime<'_, I>,
) -> StepResult<Vec<U>>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    Cond: Fn(T) -> bool,
    Step: Fn(T) -> T,
    PC: Parser<I, Cond>,
    PS: Parser<I, Step>,
    FB: Fn(T) -> PB,
    PB: Parser<I, U>,
{
    let mut out = Vec::new();
    loop {
        let pred = match cond.run(rt)? {
            Signal::Good(f) => f,
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        };
        let current = rt
            .registers
            .get::<T>(reg.id())
            .expect("for-loop register is always filled between iterations");
        if !pred(current.clone()) {
            return Ok(Signal::Good(out));
        }
        match body(current.clone()).run(rt)? {
            Signal::Good(u) => out.push(u),
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        }
        let step_fn = match step.run(rt)? {
            Signal::Good(f) => f,
            Signal::Bad { error, consumed } => return Ok(Signal::Bad { error, consumed }),
        };
        rt.registers.put(reg.id(), step_fn(current));
    }
}

/// `forP_(init, cond, step, body)`: a fresh register `r` set to `init`;
/// while `cond` (itself re-evaluated every iteration) holds of `r.get`, run
/// `body(r.get)` then advance `r` via `step(r.get)`.
pub struct ForP_<T, PI, PC, PS, FB>(pub(crate) PI, pub(crate) PC, pub(crate) PS, pub(crate) FB, pub(crate) PhantomData<T>);

impl<I, T, U, Cond, Step, PI, PC, PS, FB, PB> Parser<I, ()> for ForP_<T, PI, PC, PS, FB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    Cond: Fn(T) -> bool,
    Step: Fn(T) -> T,
    PI: Parser<I, T>,
    PC: Parser<I, Cond>,
    PS: Parser<I, Step>,
    FB: Fn(T) -> PB,
    PB: Parser<I, U>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<()> {
        match self.0.run(rt)? {
            Signal::Good(init) => {
                let reg = Register::new();
                rt.registers.acquire(reg.id())?;
                rt.registers.put(reg.id(), init);
                let result = run_for::<I, T, U, Cond, Step, PC, PS, FB, PB>(&self.1, &self.2, &self.3, reg, rt);
                rt.registers.remove(reg.id());
                result.map(|sig| sig.map(|_| ()))
            }
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

pub fn for_p<I, T, U, Cond, Step, PI, PC, PS, FB, PB>(init: PI, cond: PC, step: PS, body: FB) -> ForP_<T, PI, PC, PS, FB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    Cond: Fn(T) -> bool,
    Step: Fn(T) -> T,
    PI: Parser<I, T>,
    PC: Parser<I, Cond>,
    PS: Parser<I, Step>,
    FB: Fn(T) -> PB,
    PB: Parser<I, U>,
{
    ForP_(init, cond, step, body, PhantomData)
}

/// `forYieldP_`: as [`for_p`], but collects each `body` result into a list.
pub struct ForYieldP_<T, PI, PC, PS, FB>(pub(crate) PI, pub(crate) PC, pub(crate) PS, pub(crate) FB, pub(crate) PhantomData<T>);

impl<I, T, U, Cond, Step, PI, PC, PS, FB, PB> Parser<I, Vec<U>> for ForYieldP_<T, PI, PC, PS, FB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    Cond: Fn(T) -> bool,
    Step: Fn(T) -> T,
    PI: Parser<I, T>,
    PC: Parser<I, Cond>,
    PS: Parser<I, Step>,
    FB: Fn(T) -> PB,
    PB: Parser<I, U>,
{
    fn run(&self, rt: &mut Runtime<'_, I>) -> StepResult<Vec<U>> {
        match self.0.run(rt)? {
            Signal::Good(init) => {
                let reg = Register::new();
                rt.registers.acquire(reg.id())?;
                rt.registers.put(reg.id(), init);
                let result = run_for::<I, T, U, Cond, Step, PC, PS, FB, PB>(&self.1, &self.2, &self.3, reg, rt);
                rt.registers.remove(reg.id());
                result
            }
            Signal::Bad { error, consumed } => Ok(Signal::Bad { error, consumed }),
        }
    }
}

pub fn for_yield_p<I, T, U, Cond, Step, PI, PC, PS, FB, PB>(init: PI, cond: PC, step: PS, body: FB) -> ForYieldP_<T, PI, PC, PS, FB>
where
    I: Input + ?Sized,
    T: Clone + 'static,
    Cond: Fn(T) -> bool,
    Step: Fn(T) -> T,
    PI: Parser<I, T>,
    PC: Parser<I, Cond>,
    PS: Parser<I, Step>,
    FB: Fn(T) -> PB,
    PB: Parser<I, U>,
{
    ForYieldP_(init, cond, step, body, PhantomData)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::register::{self, Register};

    #[test]
    fn put_then_get_roundtrips() {
        let reg: Register<i32> = Register::new();
        let p = register::put_value(reg, 7).ignore_then(register::get(reg));
        assert_eq!(crate::parse(&p, ""), Ok(7));
    }

    #[test]
    fn unfilled_register_read_is_a_fault() {
        let reg: Register<i32> = Register::new();
        let p = register::get(reg);
        assert!(crate::parse(&p, "").is_err());
    }

    #[test]
    fn local_restores_on_success_but_not_on_failure() {
        let reg: Register<i32> = Register::new();
        let setup = register::put_value(reg, 1);

        let ok_body = register::put_value(reg, 2).ignore_then(primitive::pure::<str, _>(()));
        let p_ok = setup
            .ignore_then(register::local_value(reg, 99, ok_body))
            .ignore_then(register::get(reg));
        assert_eq!(crate::parse(&p_ok, ""), Ok(1));
    }

    #[test]
    fn rollback_restores_only_on_non_consuming_failure() {
        let reg: Register<i32> = Register::new();
        let p = register::put_value(reg, 5)
            .ignore_then(register::rollback(reg, register::put_value(reg, 6).ignore_then(primitive::empty::<str, ()>())))
            .map(|_| ())
            .or(primitive::pure::<str, _>(()))
            .ignore_then(register::get(reg));
        assert_eq!(crate::parse(&p, ""), Ok(5));
    }

    #[test]
    fn if_p_dispatches_on_condition() {
        let p_true = register::if_p(primitive::pure::<str, _>(true), primitive::pure::<str, _>('t'), primitive::pure::<str, _>('f'));
        let p_false = register::if_p(primitive::pure::<str, _>(false), primitive::pure::<str, _>('t'), primitive::pure::<str, _>('f'));
        assert_eq!(crate::parse(&p_true, ""), Ok('t'));
        assert_eq!(crate::parse(&p_false, ""), Ok('f'));
    }

    #[test]
    fn for_p_counts_down_to_zero() {
        let p = register::for_p::<str, i32, char, _, _, _, _, _, _, _>(
            primitive::pure(3),
            primitive::pure(|n: i32| n != 0),
            primitive::pure(|n: i32| n - 1),
            |_n: i32| primitive::item::<str>(),
        );
        assert_eq!(crate::parse(&p.ignore_then(primitive::eof::<str>()), "abc"), Ok(()));
        assert!(crate::parse(&p.ignore_then(primitive::eof::<str>()), "ab").is_err());
    }
}
