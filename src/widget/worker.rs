//! # Background Workers
//!
//! Widgets whose data source can block (HTTP, IPC, slow files) poll it from a
//! worker on the tokio blocking pool instead of inside `update()`.
//!
//! ## Channels
//! - **Result slot**: a one-element channel. Before publishing, the worker
//!   drains any result the widget has not picked up yet, so `latest()` always
//!   sees the newest poll and never a backlog.
//! - **Stop**: a zero-capacity channel that is never sent on. Dropping the
//!   sender disconnects it, which wakes the worker out of its interval wait.
//! - **Done**: signalled once the poll loop has exited, so the scheduler can
//!   join with a timeout without touching the runtime.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tokio::runtime::Handle;

use super::SourceError;

pub type PollResult<T> = Result<T, SourceError>;

pub struct BackgroundWorker<T> {
    name: String,
    latest: Receiver<PollResult<T>>,
    stop: Option<Sender<()>>,
    done: Receiver<()>,
}

impl<T: Send + 'static> BackgroundWorker<T> {
    /// Runs `poll` immediately and then every `interval` until stopped.
    pub fn spawn<F>(handle: &Handle, name: impl Into<String>, interval: Duration, mut poll: F) -> Self
    where
        F: FnMut() -> PollResult<T> + Send + 'static,
    {
        let name = name.into();
        let (slot_tx, slot_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (done_tx, done_rx) = bounded(1);
        let drain = slot_rx.clone();
        let task_name = name.clone();

        handle.spawn_blocking(move || {
            log::debug!("Worker {task_name} started");
            loop {
                let result = poll();
                let _ = drain.try_recv();
                if slot_tx.try_send(result).is_err() {
                    break;
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
            log::debug!("Worker {task_name} finished");
            let _ = done_tx.send(());
        });

        Self {
            name,
            latest: slot_rx,
            stop: Some(stop_tx),
            done: done_rx,
        }
    }
}

impl<T> BackgroundWorker<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Newest unread poll result, if one arrived since the last call.
    pub fn latest(&self) -> Option<PollResult<T>> {
        match self.latest.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Signals the worker to exit after its current poll.
    pub fn stop(&mut self) {
        self.stop.take();
    }

    /// Waits up to `timeout` for the poll loop to exit.
    pub fn join(&self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Worker {} did not stop within {:?}", self.name, timeout);
                false
            }
        }
    }
}

impl<T> Drop for BackgroundWorker<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
