use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use anyhow::Result;
use futures::channel::oneshot;

type Listener = Box<dyn FnOnce(&Result<()>)>;

#[derive(Default)]
struct State {
    sender: Option<oneshot::Sender<Result<()>>>,
    settled: bool,
    listeners: Vec<Listener>,
}

/// Completion handle handed to a task body as its `done` input.
///
/// Settling is first-wins: the first call to [`Done::complete`], [`Done::fail`]
/// or [`Done::settle`] decides the result, and every later call is ignored.
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct Done {
    state: Rc<RefCell<State>>,
}

impl Done {
    /// Create a handle and the future that resolves once it settles.
    pub fn channel() -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        let done = Self {
            state: Rc::new(RefCell::new(State {
                sender: Some(sender),
                ..Default::default()
            })),
        };
        (done, Completion { receiver })
    }

    /// Signal success. Returns false if the handle had already settled.
    pub fn complete(&self) -> bool {
        self.settle(Ok(()))
    }

    /// Signal failure. Returns false if the handle had already settled.
    pub fn fail(&self, e: impl Into<anyhow::Error>) -> bool {
        self.settle(Err(e.into()))
    }

    pub fn settle(&self, result: Result<()>) -> bool {
        let (sender, listeners) = {
            let mut state = self.state.borrow_mut();
            if state.settled {
                return false;
            }
            state.settled = true;
            (state.sender.take(), std::mem::take(&mut state.listeners))
        };

        for listener in listeners {
            listener(&result);
        }
        if let Some(sender) = sender {
            // nobody is waiting for the result any more; that's fine.
            let _ = sender.send(result);
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        self.state.borrow().settled
    }

    /// Run `f` once, when this handle settles.
    /// Listeners added after settling never run.
    pub fn subscribe(&self, f: impl FnOnce(&Result<()>) + 'static) {
        let mut state = self.state.borrow_mut();
        if !state.settled {
            state.listeners.push(Box::new(f));
        }
    }

    /// True if both handles share the same state.
    pub fn same(&self, other: &Done) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Done(settled: {})", self.is_settled())
    }
}

/// Resolves with the result a [`Done`] settled with.
///
/// If every `Done` handle is dropped without settling,
/// this future stays pending forever.
pub struct Completion {
    receiver: oneshot::Receiver<Result<()>>,
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // sender dropped unsettled: nothing can complete us now.
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Pending,
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::cell::Cell;

    #[test]
    fn test_first_settle_wins() -> Result<()> {
        let (done, completion) = Done::channel();
        assert!(done.complete());
        assert!(!done.fail(anyhow::anyhow!("too late")));
        assert!(!done.clone().complete());
        block_on(completion)?;
        Ok(())
    }

    #[test]
    fn test_failure() {
        let (done, completion) = Done::channel();
        done.clone().fail(anyhow::anyhow!("broken"));
        let e = block_on(completion).unwrap_err();
        assert_eq!("broken", e.to_string());
    }

    #[test]
    fn test_listeners_fire_once() {
        let (done, _completion) = Done::channel();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        done.subscribe(move |result| {
            assert!(result.is_ok());
            counter.set(counter.get() + 1);
        });
        done.complete();
        done.complete();
        assert_eq!(1, count.get());

        // too late to listen:
        let counter = count.clone();
        done.subscribe(move |_| counter.set(counter.get() + 1));
        assert_eq!(1, count.get());
    }

    #[test]
    fn test_dropped_handle_never_completes() {
        let (done, completion) = Done::channel();
        drop(done);
        assert!(completion.now_or_never().is_none());
    }

    #[test]
    fn test_same() {
        let (a, _) = Done::channel();
        let (b, _) = Done::channel();
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }
}
