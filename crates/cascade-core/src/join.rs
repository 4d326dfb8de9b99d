//! Two-branch join barrier used by parallel application

use crate::errors::Result;
use crate::outcome::lock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Completion<A, B> = Box<dyn FnOnce(Result<A>, Result<B>) + Send>;

/// Collects one result from each of two concurrent branches and fires its
/// completion exactly once, after both have reported.
pub(crate) struct JoinBarrier<A, B> {
    left: Mutex<Option<Result<A>>>,
    right: Mutex<Option<Result<B>>>,
    remaining: AtomicUsize,
    completion: Mutex<Option<Completion<A, B>>>,
}

impl<A: Send + 'static, B: Send + 'static> JoinBarrier<A, B> {
    pub(crate) fn new<F>(completion: F) -> Arc<Self>
    where
        F: FnOnce(Result<A>, Result<B>) + Send + 'static,
    {
        Arc::new(Self {
            left: Mutex::new(None),
            right: Mutex::new(None),
            remaining: AtomicUsize::new(2),
            completion: Mutex::new(Some(Box::new(completion))),
        })
    }

    pub(crate) fn complete_left(&self, outcome: Result<A>) {
        *lock(&self.left) = Some(outcome);
        self.arrive();
    }

    pub(crate) fn complete_right(&self, outcome: Result<B>) {
        *lock(&self.right) = Some(outcome);
        self.arrive();
    }

    fn arrive(&self) {
        // AcqRel: the last arriving branch must observe the other branch's slot write.
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let left = lock(&self.left).take();
        let right = lock(&self.right).take();
        let completion = lock(&self.completion).take();

        if let (Some(left), Some(right), Some(completion)) = (left, right, completion) {
            completion(left, right);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CascadeError;

    #[test]
    fn test_fires_only_after_both_sides() {
        let fired = Arc::new(Mutex::new(None));
        let sink = fired.clone();
        let barrier = JoinBarrier::<i32, &'static str>::new(move |a, b| {
            *sink.lock().unwrap() = Some((a, b));
        });

        barrier.complete_right(Ok("right"));
        assert!(fired.lock().unwrap().is_none());

        barrier.complete_left(Err(CascadeError::NoLoader));
        assert_eq!(
            fired.lock().unwrap().take(),
            Some((Err(CascadeError::NoLoader), Ok("right")))
        );
    }
}
