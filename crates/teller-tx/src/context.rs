//! Per-task-of-control connection binding.
//!
//! An [`ExecutionContext`] holds at most one bound connection. It is `Send`
//! (when the connection is) so it can move into a worker thread or a
//! blocking task, but never `Sync`: a context is only ever used by the task
//! of control that owns it, which is what keeps concurrent units of work
//! from seeing each other's connection.
//!
//! Access to the bound connection is borrow-scoped through [`Ref`]. The
//! executor only accepts `'static` results, so a unit of work cannot return
//! a borrow of the connection and keep the slot locked past commit.

use std::cell::{Ref, RefCell};
use std::fmt;

use crate::errors::{Result, TxError};

/// Binding slot for the current connection of one task of control.
pub struct ExecutionContext<C> {
    slot: RefCell<Option<C>>,
}

impl<C> ExecutionContext<C> {
    /// Create an empty context.
    pub const fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    /// Bind `connection` as the current connection.
    ///
    /// Fails with [`TxError::AlreadyBound`] if a connection is already bound;
    /// the rejected connection is dropped.
    pub fn bind(&self, connection: C) -> Result<()> {
        let mut slot = self.slot.try_borrow_mut().map_err(|_| TxError::AlreadyBound)?;
        if slot.is_some() {
            return Err(TxError::AlreadyBound);
        }
        *slot = Some(connection);
        Ok(())
    }

    /// Whether a connection is bound.
    pub fn is_bound(&self) -> bool {
        // A slot that is currently borrowed is in use by a unit of work.
        self.slot.try_borrow().map_or(true, |slot| slot.is_some())
    }

    /// The bound connection, or `None` outside any unit of work.
    pub fn current(&self) -> Option<Ref<'_, C>> {
        let slot = self.slot.try_borrow().ok()?;
        Ref::filter_map(slot, Option::as_ref).ok()
    }

    /// The bound connection.
    ///
    /// This is the lookup business code uses inside a unit of work. Fails
    /// with [`TxError::NoActiveTransaction`] when nothing is bound.
    pub fn connection(&self) -> Result<Ref<'_, C>> {
        self.current().ok_or(TxError::NoActiveTransaction)
    }

    /// Remove and return the bound connection. Idempotent.
    pub fn clear(&self) -> Option<C> {
        self.slot.try_borrow_mut().ok().and_then(|mut slot| slot.take())
    }

    /// Run `f` with exclusive access to the bound connection.
    pub(crate) fn with_connection_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R> {
        let mut slot = self
            .slot
            .try_borrow_mut()
            .map_err(|_| TxError::AlreadyBound)?;
        let connection = slot.as_mut().ok_or(TxError::NoActiveTransaction)?;
        Ok(f(connection))
    }
}

impl<C> Default for ExecutionContext<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ExecutionContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
