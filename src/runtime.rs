//! The evaluator: the single owner of mutable state during one top-level run.
//!
//! The evaluator is a state machine over
//! `(cursor, registers, handler-stack, error-accumulator)` with two
//! terminal states, `Good` and `Bad`. This crate takes the "direct
//! interpretation" approach: there is no separate
//! instruction stream, and the "handler stack" is the ordinary Rust call
//! stack — `atomic`, `lookAhead`, `rollback` and `local` save what they need
//! in a local variable before recursing and restore it after, which is
//! observationally identical to an explicit stack of restore frames.
//!
//! Programmer errors are modelled as a distinct
//! `Result` error channel ([`RuntimeFault`]) rather than a third [`Signal`]
//! variant precisely so that `?` makes them bypass every combinator's
//! failure handling automatically — `alt`, `atomic` and friends only ever
//! pattern-match on `Signal`, so a fault simply unwinds through them.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use crate::cursor::{Cursor, Input};
use crate::error::{ParseError, RuntimeFault};

/// The outcome of running one combinator: a produced value, or a recoverable
/// failure tagged with whether it consumed input (the
/// backtracking contract).
pub enum Signal<O> {
    Good(O),
    Bad { error: ParseError, consumed: bool },
}

impl<O> Signal<O> {
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> Signal<U> {
        match self {
            Signal::Good(o) => Signal::Good(f(o)),
            Signal::Bad { error, consumed } => Signal::Bad { error, consumed },
        }
    }
}

/// The result of a single evaluator step: a [`Signal`] on the happy/failure
/// path, or a [`RuntimeFault`] that aborts the run outright.
pub type StepResult<O> = Result<Signal<O>, RuntimeFault>;

fn active_registers() -> &'static Mutex<HashSet<u64>> {
    static ACTIVE: OnceLock<Mutex<HashSet<u64>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// The per-run register slot table.
///
/// Registers are identified process-wide by a unique `u64` (see
/// [`crate::register::Register::new`]); this table maps the identities
/// touched by *this* run to their boxed values. A register is "allocated a
/// slot index on first use within the run by inserting into
/// `slots` on first `put`; reading before that point is the
/// `UnfilledRegister` fault.
pub(crate) struct RegisterTable {
    slots: HashMap<u64, Box<dyn Any>>,
    acquired: HashSet<u64>,
}

impl RegisterTable {
    fn new() -> Self {
        RegisterTable {
            slots: HashMap::new(),
            acquired: HashSet::new(),
        }
    }

    /// Bind `id` to this run, detecting concurrent reuse across runs: sharing
    /// a register between two independent top-level runs is undefined
    /// behavior, and this is the guard that turns it into a diagnosed fault.
    pub(crate) fn acquire(&mut self, id: u64) -> Result<(), RuntimeFault> {
        if self.acquired.contains(&id) {
            return Ok(());
        }
        let mut active = active_registers().lock().unwrap();
        if !active.insert(id) {
            return Err(RuntimeFault::RegisterReuse { register: id });
        }
        self.acquired.insert(id);
        Ok(())
    }

    pub(crate) fn is_filled(&self, id: u64) -> bool {
        self.slots.contains_key(&id)
    }

    pub(crate) fn get<T: Clone + 'static>(&self, id: u64) -> Option<T> {
        self.slots
            .get(&id)
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn put<T: 'static>(&mut self, id: u64, value: T) {
        self.slots.insert(id, Box::new(value));
    }

    /// Remove a register's slot entirely. Used by `fillReg` to deallocate
    /// its scratch register on every exit path.
    pub(crate) fn remove(&mut self, id: u64) {
        self.slots.remove(&id);
        self.acquired.remove(&id);
        active_registers().lock().unwrap().remove(&id);
    }

    /// Clear a register's value without releasing its identity. Used by
    /// `local` to put a register back into the unfilled state it was in
    /// before entry, when it had no prior value to restore.
    pub(crate) fn clear(&mut self, id: u64) {
        self.slots.remove(&id);
    }
}

impl Drop for RegisterTable {
    fn drop(&mut self) {
        let mut active = active_registers().lock().unwrap();
        for id in self.acquired.drain() {
            active.remove(&id);
        }
    }
}

/// Owns the mutable state of one top-level run: the cursor, the register
/// table, and (when the `trace` feature is enabled) a tracing span stack.
///
/// Runs are strictly sequential and single-threaded; two runs may
/// execute concurrently on the same [`crate::Parser`] value in different
/// threads, each with its own `Runtime`.
pub struct Runtime<'i, I: Input + ?Sized> {
    input: &'i I,
    cursor: Cursor,
    pub(crate) registers: RegisterTable,
}

impl<'i, I: Input + ?Sized> Runtime<'i, I> {
    pub fn new(input: &'i I) -> Self {
        Runtime {
            input,
            cursor: Cursor::start(),
            registers: RegisterTable::new(),
        }
    }

    pub fn input(&self) -> &'i I {
        self.input
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }
}

/// Emit a trace event when the `trace` feature is enabled; a silent no-op
/// otherwise so the default build pays nothing for it.
#[cfg(feature = "trace")]
macro_rules! rt_trace {
    ($($arg:tt)*) => { tracing::trace!($($arg)*) };
}
#[cfg(not(feature = "trace"))]
macro_rules! rt_trace {
    ($($arg:tt)*) => {};
}
pub(crate) use rt_trace;
