//! Completion callbacks
//!
//! Callbacks are `FnOnce`, so each one runs at most once by construction;
//! the registry guarantees it also runs at least once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Optional one-shot callback
#[derive(Default)]
pub struct Completion(Option<Box<dyn FnOnce()>>);

impl Completion {
    /// Wrap a callback
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(callback)))
    }

    /// No callback
    pub fn none() -> Self {
        Self(None)
    }

    /// Whether a callback is attached
    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Run the callback, if any
    pub fn fire(self) {
        if let Some(callback) = self.0 {
            callback();
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_some() { "Completion(Some)" } else { "Completion(None)" })
    }
}

struct BatchState {
    remaining: usize,
    sealed: bool,
    done: Option<Completion>,
}

impl BatchState {
    fn take_if_finished(&mut self) -> Option<Completion> {
        if self.sealed && self.remaining == 0 {
            self.done.take()
        } else {
            None
        }
    }
}

/// One callback for a whole batch of transitions
///
/// Hand out a member completion per transition with
/// [`BatchCompletion::member`], then [`BatchCompletion::seal`] the batch.
/// The batch callback fires once, after the seal and after every member
/// fired, whichever comes last.
pub struct BatchCompletion {
    state: Rc<RefCell<BatchState>>,
}

impl BatchCompletion {
    /// Start a batch
    pub fn new(done: Completion) -> Self {
        Self {
            state: Rc::new(RefCell::new(BatchState { remaining: 0, sealed: false, done: Some(done) })),
        }
    }

    /// Completion for one more member
    pub fn member(&self) -> Completion {
        self.state.borrow_mut().remaining += 1;
        let state = Rc::clone(&self.state);
        Completion::new(move || {
            let finished = {
                let mut state = state.borrow_mut();
                state.remaining = state.remaining.saturating_sub(1);
                state.take_if_finished()
            };
            if let Some(done) = finished {
                done.fire();
            }
        })
    }

    /// No more members will be added; returns the member count
    pub fn seal(self) -> usize {
        let (members, finished) = {
            let mut state = self.state.borrow_mut();
            state.sealed = true;
            (state.remaining, state.take_if_finished())
        };
        if let Some(done) = finished {
            done.fire();
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Completion) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, Completion::new(move || sink.set(sink.get() + 1)))
    }

    #[test]
    fn test_empty_batch_fires_on_seal() {
        let (count, done) = counter();
        BatchCompletion::new(done).seal();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_batch_waits_for_all_members() {
        let (count, done) = counter();
        let batch = BatchCompletion::new(done);
        let first = batch.member();
        let second = batch.member();
        assert_eq!(batch.seal(), 2);

        first.fire();
        assert_eq!(count.get(), 0);
        second.fire();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_members_finishing_before_seal() {
        let (count, done) = counter();
        let batch = BatchCompletion::new(done);
        batch.member().fire();
        batch.member().fire();
        assert_eq!(count.get(), 0);

        batch.seal();
        assert_eq!(count.get(), 1);
    }
}
