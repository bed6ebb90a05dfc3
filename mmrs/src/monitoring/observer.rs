//! Background tasks delivering remote notifications to user callbacks.
//!
//! Each handle keeps one [`ObserverSlot`] per kind of notification. Clones
//! of a handle share the slots, so registering an observer on any clone
//! replaces (aborts) the task registered before it. The task also stops
//! when the manager's shutdown channel closes or the last handle sharing
//! the slot is dropped.

use futures::{FutureExt, select};
use log::debug;
use std::future::Future;
use std::pin::pin;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct ObserverSlot {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ObserverSlot {
    /// Stores `task`, aborting the previously stored one.
    pub(crate) fn replace(&self, task: JoinHandle<()>) {
        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            debug!("Replacing previously registered observer");
            previous.abort();
        }
    }

    /// Returns `true` if an observer task is registered and still running.
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ObserverSlot {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

/// Spawns `work` into `slot`, stopping it when `shutdown` closes.
pub(crate) fn spawn_observer<F>(
    slot: &ObserverSlot,
    mut shutdown: watch::Receiver<()>,
    name: &'static str,
    work: F,
) where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut work = pin!(work.fuse());
        let mut stopped = pin!(
            async move {
                // Only the sender going away counts; sent values are ignored.
                while shutdown.changed().await.is_ok() {}
            }
            .fuse()
        );

        select! {
            _ = work => debug!("{name} observer stream ended"),
            _ = stopped => debug!("{name} observer stopped: manager dropped"),
        }
    });
    slot.replace(task);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn never_ending(tx: mpsc::Sender<()>) -> impl Future<Output = ()> + Send + 'static {
        async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn latest_registration_wins() {
        let (_shutdown_tx, shutdown) = watch::channel(());
        let slot = ObserverSlot::default();

        let (first_tx, mut first_rx) = mpsc::channel::<()>(1);
        let (second_tx, mut second_rx) = mpsc::channel::<()>(1);

        spawn_observer(&slot, shutdown.clone(), "first", never_ending(first_tx));
        spawn_observer(&slot, shutdown.clone(), "second", never_ending(second_tx));

        // The first task was aborted, dropping its sender.
        assert!(first_rx.recv().await.is_none());
        assert!(slot.is_active());
        assert!(second_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_observer() {
        let (shutdown_tx, shutdown) = watch::channel(());
        let slot = ObserverSlot::default();
        let (tx, mut rx) = mpsc::channel::<()>(1);

        spawn_observer(&slot, shutdown, "state", never_ending(tx));
        drop(shutdown_tx);

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropping_last_slot_owner_stops_observer() {
        let (_shutdown_tx, shutdown) = watch::channel(());
        let slot = Arc::new(ObserverSlot::default());
        let clone = Arc::clone(&slot);
        let (tx, mut rx) = mpsc::channel::<()>(1);

        spawn_observer(&clone, shutdown, "signal", never_ending(tx));
        drop(slot);
        assert!(clone.is_active());
        drop(clone);

        assert!(rx.recv().await.is_none());
    }
}
