//! Local persistence capability.
//!
//! The pipeline never owns a model instance. It reads a snapshot through
//! `Persistence::read` and asks for an atomic update through
//! `Persistence::mutate`.

use std::sync::{Arc, PoisonError, RwLock};

pub trait Persistence<M>: Send + Sync {
    /// Snapshot of the current state.
    fn read(&self) -> M;

    /// Apply `update` inside a single write scope. Readers observe either the
    /// state before or after the whole update, never a partial one.
    fn mutate(&self, update: &mut dyn FnMut(&mut M));
}

/// In-memory record shared between the caller and the pipeline.
#[derive(Debug, Default)]
pub struct Record<M> {
    inner: Arc<RwLock<M>>,
}

impl<M> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Clone> Record<M> {
    pub fn new(model: M) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    pub fn snapshot(&self) -> M {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<M: Clone + Send + Sync> Persistence<M> for Record<M> {
    fn read(&self) -> M {
        self.snapshot()
    }

    fn mutate(&self, update: &mut dyn FnMut(&mut M)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Work on a copy so a panicking update leaves the stored value intact.
        let mut working = guard.clone();
        update(&mut working);
        *guard = working;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        a: u32,
        b: u32,
    }

    #[test]
    fn mutate_applies_all_writes() {
        let record = Record::new(Pair::default());
        record.mutate(&mut |p: &mut Pair| {
            p.a = 1;
            p.b = 2;
        });
        assert_eq!(record.read(), Pair { a: 1, b: 2 });
    }

    #[test]
    fn clones_share_state() {
        let record = Record::new(Pair::default());
        let other = record.clone();
        other.mutate(&mut |p: &mut Pair| p.a = 5);
        assert_eq!(record.snapshot().a, 5);
    }

    #[test]
    fn panicking_update_leaves_previous_state() {
        let record = Record::new(Pair { a: 1, b: 1 });
        let result = catch_unwind(AssertUnwindSafe(|| {
            record.mutate(&mut |p: &mut Pair| {
                p.a = 99;
                panic!("write failed");
            });
        }));
        assert!(result.is_err());
        assert_eq!(record.read(), Pair { a: 1, b: 1 });

        // The lock is released and usable afterwards.
        record.mutate(&mut |p: &mut Pair| p.b = 2);
        assert_eq!(record.read(), Pair { a: 1, b: 2 });
    }
}
