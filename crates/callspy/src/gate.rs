//! Reentrant call gate.
//!
//! One thread at a time may be inside a spy's target. The thread holding
//! the gate may enter again, so a target that recurses through its own spy
//! nests instead of blocking. The gate is released when the outermost pass
//! drops, including during unwinding.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct GateState {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
pub(crate) struct CallGate {
    state: Mutex<GateState>,
    cv: Condvar,
}

impl CallGate {
    /// Block until this thread owns the gate, then take one level of it
    pub(crate) fn enter(&self) -> GatePass<'_> {
        let me = thread::current().id();
        let mut state = self.lock();
        while state.owner.is_some_and(|owner| owner != me) {
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.owner = Some(me);
        state.depth += 1;
        GatePass { gate: self }
    }

    /// Nesting depth held by the current owner
    pub(crate) fn depth(&self) -> usize {
        self.lock().depth
    }

    fn leave(&self) {
        let mut state = self.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.cv.notify_one();
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // the state lock is never held while a target runs
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One level of gate ownership; releases on drop
#[derive(Debug)]
pub(crate) struct GatePass<'a> {
    gate: &'a CallGate,
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
