//! Worker threads and one-shot result handoff.
//!
//! [`Worker`] is a thread that processes messages from a rendezvous channel: a [`Worker::send`]
//! blocks until the thread picks the message up, so a sender can never build up a backlog.
//! [`Promise`] and [`PromiseHandle`] carry a single result back. The consumer polls
//! [`PromiseHandle::try_block`] without blocking, which distinguishes a pending promise from a
//! fulfilled one and from one whose producer died. That last case matters: a one-slot gate built
//! on the handle must notice a dead producer and release the slot instead of waiting forever.
//!
//! A panicking handler kills its worker thread. The panic is contained there and logged when the
//! thread is reaped; it is never rethrown on the thread that owns the [`Worker`].

use std::{
    io,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Sender, TryRecvError};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // One buffered slot, so fulfilling never blocks even when nobody is waiting yet.
    let (sender, recv) = crossbeam_channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
///
/// Fulfilling a [`Promise`] lets the connected [`PromiseHandle`] retrieve the value. Dropping a
/// [`Promise`] unfulfilled resolves the handle to [`PromiseDropped`] instead.
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// If a thread is currently waiting at [`PromiseHandle::block`], it will be woken up.
    ///
    /// This method does not block and does not fail. If the connected [`PromiseHandle`] was
    /// dropped, `value` is dropped and nothing else happens; this is what discards detection
    /// results that finish after their session was shut down.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: crossbeam_channel::Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Blocks the calling thread until the [`Promise`] is resolved.
    ///
    /// Returns [`PromiseDropped`] when the [`Promise`] was dropped without being fulfilled, which
    /// means the producing thread has exited or panicked.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Takes the resolved value without blocking, or returns the handle back while the promise is
    /// still pending.
    ///
    /// A resolved promise is either fulfilled with a value or was dropped unfulfilled
    /// ([`PromiseDropped`]); a producer that dies therefore shows up here, not as an eternally
    /// pending promise.
    pub fn try_block(self) -> Result<Result<T, PromiseDropped>, Self> {
        match self.recv.try_recv() {
            Ok(value) => Ok(Ok(value)),
            Err(TryRecvError::Disconnected) => Ok(Err(PromiseDropped { _priv: () })),
            Err(TryRecvError::Empty) => Err(self),
        }
    }
}

/// Resolution of a [`PromiseHandle`] whose [`Promise`] was dropped without being fulfilled.
#[derive(Debug, Clone, Copy)]
pub struct PromiseDropped {
    _priv: (),
}

/// A handle to a named worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread is closed and the thread is joined. A handler panic
/// kills only the worker thread; it is logged when the worker is reaped and never propagated to
/// the owning thread.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    thread: Option<JoinHandle<()>>,
    name: String,
}

impl<I: Send + 'static> Worker<I> {
    /// Spawns a worker thread that uses `handler` to process incoming messages.
    ///
    /// The channel to the thread is a rendezvous channel: [`Worker::send`] blocks until the
    /// thread has finished processing any preceding message and accepts the new one.
    pub fn spawn<N, F>(name: N, mut handler: F) -> io::Result<Self>
    where
        N: Into<String>,
        F: FnMut(I) + Send + 'static,
    {
        let name = name.into();
        let (sender, recv) = crossbeam_channel::bounded(0);
        let thread = thread::Builder::new().name(name.clone()).spawn({
            let name = name.clone();
            move || {
                log::trace!("worker '{name}' starting");
                for message in recv {
                    handler(message);
                }
                log::trace!("worker '{name}' exiting");
            }
        })?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
            name,
        })
    }

    /// Sends a message to the worker thread, blocking until the thread accepts it.
    ///
    /// If the thread has died, the message is dropped (resolving any [`Promise`] it carries as
    /// dropped) and the thread is reaped, logging its panic.
    pub fn send(&mut self, msg: I) {
        if let Some(sender) = &self.sender {
            if sender.send(msg).is_err() {
                self.sender = None;
                self.reap();
            }
        }
    }

    /// Joins the worker thread if it is still attached, logging a handler panic.
    fn reap(&mut self) {
        if let Some(thread) = self.thread.take() {
            if let Err(payload) = thread.join() {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| String::from(*s))
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".into());
                log::error!("worker '{}' panicked: {msg}", self.name);
            }
        }
    }
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the channel to signal the thread to exit, then reap it.
        drop(self.sender.take());
        self.reap();
    }
}
