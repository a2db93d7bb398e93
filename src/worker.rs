//! Worker threads and single-slot promises.
//!
//! The inference stage runs on a dedicated [`Worker`] thread that owns the
//! segmentation model. Results travel back through a [`Promise`], which the
//! frame pump polls without ever blocking its acquisition loop.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crossbeam::channel::Sender;

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity of 1 means that `Promise::fulfill` will never block, which is the property we want.
    let (sender, recv) = crossbeam::channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
///
/// Fulfilling a [`Promise`] lets the connected [`PromiseHandle`] retrieve the
/// value. A connected pair of [`Promise`] and [`PromiseHandle`] can be created
/// by calling [`promise`].
pub struct Promise<T> {
    inner: crossbeam::channel::Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// If a thread is currently waiting at [`PromiseHandle::block`], it will
    /// be woken up.
    ///
    /// This method does not block or fail. If the connected [`PromiseHandle`]
    /// was dropped, `value` will be dropped and nothing happens.
    pub fn fulfill(self, value: T) {
        // This ignores errors. The assumption is that the thread will exit
        // once it tries to obtain a new `Promise` to fulfill.
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value
/// of type `T`.
pub struct PromiseHandle<T> {
    recv: crossbeam::channel::Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Returns whether the associated [`Promise`] has been fulfilled.
    ///
    /// If this returns `true`, calling [`PromiseHandle::block`] on `self` will
    /// return the value immediately, without blocking.
    ///
    /// A promise that was dropped unfulfilled still reports `false` here; only
    /// [`PromiseHandle::block`] can observe that condition.
    pub fn is_fulfilled(&self) -> bool {
        !self.recv.is_empty()
    }
}

/// An error returned by [`PromiseHandle::block`] indicating that the connected
/// [`Promise`] object was dropped without being fulfilled.
#[derive(Debug, Clone, Copy)]
pub struct PromiseDropped {
    _priv: (),
}

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone)]
pub struct WorkerBuilder {
    name: Option<String>,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Spawns a [`Worker`] thread that builds its state with `init`, then uses
    /// `handler` to process incoming messages.
    ///
    /// `init` runs on the worker thread before the first message is accepted,
    /// so expensive setup (loading a model, say) does not block the spawning
    /// thread. If `init` fails, the error is logged and the worker exits; all
    /// messages sent to it are dropped.
    pub fn spawn<S, I, F, H>(self, init: F, mut handler: H) -> io::Result<Worker<I>>
    where
        S: 'static,
        I: Send + 'static,
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
        H: FnMut(&mut S, I) + Send + 'static,
    {
        let (sender, recv) = crossbeam::channel::bounded(0);
        let mut builder = thread::Builder::new();
        if let Some(name) = self.name.clone() {
            builder = builder.name(name);
        }
        let name = self.name.unwrap_or_else(|| "worker".into());
        let handle = builder.spawn(move || {
            log::trace!("worker '{name}' starting");
            let mut state = match init() {
                Ok(state) => state,
                Err(e) => {
                    log::error!("worker '{name}' failed to initialize: {e:#}");
                    return;
                }
            };
            for message in recv {
                handler(&mut state, message);
            }
            log::trace!("worker '{name}' exiting");
        })?;

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread will be dropped and the thread will
/// be joined. If the thread has panicked, the panic will be forwarded to the
/// thread dropping the `Worker`.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the channel to signal the thread to exit.
        drop(self.sender.take());

        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder { name: None }
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        // Wait for it to exit and propagate its panic if it panicked.
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => {}
                Err(payload) => {
                    if !thread::panicking() {
                        resume_unwind(payload);
                    }
                }
            }
        }
    }

    /// Sends a message to the worker thread.
    ///
    /// This will block until the thread is available to accept the message.
    ///
    /// If the worker has panicked, this will propagate the panic to the
    /// calling thread.
    pub fn send(&mut self, msg: I) {
        match self.sender.as_ref().unwrap().send(msg) {
            Ok(()) => {}
            Err(_) => {
                self.wait_for_exit();
            }
        }
    }
}
