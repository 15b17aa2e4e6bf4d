// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

/// Shared, mutable in-memory state with an optional checkpoint to roll back to.
#[derive(Debug)]
pub(crate) struct Checkpointed<T> {
    state: Rc<RefCell<T>>,
    checkpoint: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for Checkpointed<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            checkpoint: self.checkpoint.clone(),
        }
    }
}

impl<T: Clone + Default> Checkpointed<T> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(T::default())),
            checkpoint: Rc::new(RefCell::new(None)),
        }
    }

    pub fn state(&self) -> &RefCell<T> {
        &self.state
    }

    /// Remember the current state, unless a checkpoint was already taken.
    pub fn save(&self) {
        let mut checkpoint = self.checkpoint.borrow_mut();
        if checkpoint.is_none() {
            checkpoint.replace(self.state.borrow().clone());
        }
    }

    /// Go back to the remembered state.
    pub fn restore(&self) {
        if let Some(state) = self.checkpoint.borrow_mut().take() {
            *self.state.borrow_mut() = state;
        }
    }

    pub fn discard(&self) {
        self.checkpoint.borrow_mut().take();
    }
}
