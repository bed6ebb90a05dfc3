//! Registry of known remote objects and the single pending await request.
//!
//! The registry is fed serially by the object tracker task and read from
//! any caller task. All state sits behind one mutex that is never held
//! across an `.await`.
//!
//! At most one await request exists at a time. Installing a new one
//! completes the previous one with [`ModemError::Cancelled`]. Only
//! additions can resolve a request; removals never touch it.

use futures::{FutureExt, select};
use futures_timer::Delay;
use log::{debug, warn};
use std::fmt;
use std::future::Future;
use std::pin::{Pin, pin};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::Result;
use crate::api::models::{ModemError, ModemFilter};

/// An object the registry can track by its bus path.
pub(crate) trait TrackedObject: Clone + Send + 'static {
    fn object_path(&self) -> &str;
}

/// Future returned by an await request.
///
/// Resolves with the first object added after the request was made whose
/// identity matches the filter, or with [`ModemError::Cancelled`] if a newer
/// request replaced this one. Dropping the future abandons the request.
#[must_use = "an await request does nothing unless polled"]
pub struct PendingObject<H> {
    rx: oneshot::Receiver<Result<H>>,
}

impl<H> Future for PendingObject<H> {
    type Output = Result<H>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ModemError::Cancelled)))
    }
}

impl<H> PendingObject<H> {
    /// Waits for the request, failing with [`ModemError::Timeout`] once
    /// `limit` has elapsed. `None` waits indefinitely.
    pub(crate) async fn within(self, limit: Option<Duration>) -> Result<H> {
        let Some(limit) = limit else {
            return self.await;
        };

        let mut pending = self.fuse();
        let mut timeout = pin!(Delay::new(limit).fuse());
        select! {
            object = pending => object,
            _ = timeout => {
                warn!("No matching object appeared within {limit:?}");
                Err(ModemError::Timeout)
            }
        }
    }
}

struct Entry<H> {
    handle: H,
    identity: String,
}

struct AwaitRequest<H> {
    filter: ModemFilter,
    slot: oneshot::Sender<Result<H>>,
}

struct State<H> {
    known: Vec<Entry<H>>,
    pending: Option<AwaitRequest<H>>,
}

pub(crate) struct ObjectRegistry<H> {
    state: Mutex<State<H>>,
}

impl<H> fmt::Debug for ObjectRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ObjectRegistry")
            .field("known", &state.known.len())
            .field("pending", &state.pending.is_some())
            .finish()
    }
}

impl<H: TrackedObject> ObjectRegistry<H> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                known: Vec::new(),
                pending: None,
            }),
        }
    }

    // A panic while holding the lock cannot leave the state half-updated,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, State<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a newly announced object and offers it to the pending await.
    ///
    /// Returns `false` if the path was already known. In that case only the
    /// identity is refreshed (when non-empty) and the pending request is not
    /// evaluated.
    pub(crate) fn on_object_added(&self, handle: H, identity: String) -> bool {
        let mut state = self.lock();

        if let Some(entry) = state
            .known
            .iter_mut()
            .find(|e| e.handle.object_path() == handle.object_path())
        {
            debug!("Object {} announced again", handle.object_path());
            if !identity.is_empty() {
                entry.identity = identity;
            }
            return false;
        }

        debug!("Object added: {} ({identity})", handle.object_path());
        state.known.push(Entry {
            handle: handle.clone(),
            identity: identity.clone(),
        });

        if let Some(request) = state.pending.take() {
            if request.slot.is_closed() {
                debug!("Discarding abandoned await request for {}", request.filter);
            } else if request.filter.matches(&identity) {
                debug!("Await request for {} resolved", request.filter);
                let _ = request.slot.send(Ok(handle));
            } else {
                state.pending = Some(request);
            }
        }
        true
    }

    /// Forgets the object at `path`. Returns whether it was known.
    pub(crate) fn on_object_removed(&self, path: &str) -> bool {
        let mut state = self.lock();
        let before = state.known.len();
        state.known.retain(|e| e.handle.object_path() != path);
        let removed = state.known.len() != before;
        if removed {
            debug!("Object removed: {path}");
        }
        removed
    }

    /// Installs a new await request, cancelling the pending one.
    pub(crate) fn await_object(&self, filter: ModemFilter) -> PendingObject<H> {
        let (tx, rx) = oneshot::channel();
        let request = AwaitRequest { filter, slot: tx };

        let previous = self.lock().pending.replace(request);
        if let Some(previous) = previous {
            debug!("Cancelling await request for {}", previous.filter);
            let _ = previous.slot.send(Err(ModemError::Cancelled));
        }
        PendingObject { rx }
    }

    /// Snapshot of all known objects in announcement order.
    pub(crate) fn list(&self) -> Vec<H> {
        self.lock().known.iter().map(|e| e.handle.clone()).collect()
    }

    pub(crate) fn first(&self) -> Option<H> {
        self.lock().known.first().map(|e| e.handle.clone())
    }

    /// Identity recorded for the object at `path`, if known and non-empty.
    pub(crate) fn identity_of(&self, path: &str) -> Option<String> {
        self.lock()
            .known
            .iter()
            .find(|e| e.handle.object_path() == path)
            .map(|e| e.identity.clone())
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[derive(Debug, Clone, PartialEq)]
    struct Fake(String);

    impl TrackedObject for Fake {
        fn object_path(&self) -> &str {
            &self.0
        }
    }

    fn fake(n: u32) -> Fake {
        Fake(format!("/org/freedesktop/ModemManager1/Modem/{n}"))
    }

    #[test]
    fn added_objects_are_listed_in_order() {
        let reg = ObjectRegistry::new();
        assert!(reg.first().is_none());

        assert!(reg.on_object_added(fake(0), "111".into()));
        assert!(reg.on_object_added(fake(1), "222".into()));

        assert_eq!(reg.list(), vec![fake(0), fake(1)]);
        assert_eq!(reg.first(), Some(fake(0)));
        assert_eq!(reg.identity_of(&fake(1).0).as_deref(), Some("222"));
    }

    #[test]
    fn duplicate_announcements_do_not_duplicate() {
        let reg = ObjectRegistry::new();
        reg.on_object_added(fake(0), String::new());
        assert!(!reg.on_object_added(fake(0), "111".into()));

        assert_eq!(reg.list().len(), 1);
        assert_eq!(reg.identity_of(&fake(0).0).as_deref(), Some("111"));
    }

    #[test]
    fn duplicate_announcement_does_not_resolve_await() {
        let reg = ObjectRegistry::new();
        reg.on_object_added(fake(0), "111".into());

        let mut pending = reg.await_object(ModemFilter::Imei("111".into()));
        reg.on_object_added(fake(0), "111".into());
        assert!((&mut pending).now_or_never().is_none());

        reg.on_object_added(fake(1), "111".into());
        assert_eq!(pending.now_or_never().unwrap().unwrap(), fake(1));
    }

    #[test]
    fn removal_forgets_object() {
        let reg = ObjectRegistry::new();
        reg.on_object_added(fake(0), "111".into());
        assert!(reg.on_object_removed(&fake(0).0));
        assert!(!reg.on_object_removed(&fake(0).0));
        assert!(reg.list().is_empty());
    }

    #[test]
    fn await_resolves_on_matching_addition() {
        let reg = ObjectRegistry::new();
        let pending = reg.await_object(ModemFilter::Imei("222".into()));

        reg.on_object_added(fake(0), "111".into());
        reg.on_object_added(fake(1), "222".into());

        assert_eq!(pending.now_or_never().unwrap().unwrap(), fake(1));
    }

    #[test]
    fn any_filter_takes_next_addition() {
        let reg = ObjectRegistry::new();
        reg.on_object_added(fake(0), "111".into());

        let pending = reg.await_object(ModemFilter::Any);
        reg.on_object_added(fake(1), "222".into());

        assert_eq!(pending.now_or_never().unwrap().unwrap(), fake(1));
    }

    #[test]
    fn second_await_cancels_first() {
        let reg = ObjectRegistry::new();
        let first = reg.await_object(ModemFilter::Imei("X".into()));
        let second = reg.await_object(ModemFilter::Imei("X".into()));

        assert!(matches!(
            first.now_or_never(),
            Some(Err(ModemError::Cancelled))
        ));

        reg.on_object_added(fake(0), "X".into());
        assert_eq!(second.now_or_never().unwrap().unwrap(), fake(0));
    }

    #[test]
    fn removal_after_match_keeps_resolution() {
        let reg = ObjectRegistry::new();
        let pending = reg.await_object(ModemFilter::Imei("X".into()));

        reg.on_object_added(fake(0), "X".into());
        reg.on_object_removed(&fake(0).0);

        assert!(reg.list().is_empty());
        assert_eq!(pending.now_or_never().unwrap().unwrap(), fake(0));
    }

    #[test]
    fn removal_never_resolves_await() {
        let reg = ObjectRegistry::new();
        reg.on_object_added(fake(0), "X".into());

        let mut pending = reg.await_object(ModemFilter::Imei("X".into()));
        reg.on_object_removed(&fake(0).0);

        assert!((&mut pending).now_or_never().is_none());
    }

    #[test]
    fn abandoned_await_is_discarded() {
        let reg = ObjectRegistry::new();
        drop(reg.await_object(ModemFilter::Any));

        reg.on_object_added(fake(0), "111".into());
        assert!(reg.lock().pending.is_none());
    }

    #[test]
    fn unidentified_object_never_matches_imei_request() {
        let reg = ObjectRegistry::new();
        let mut pending = reg.await_object(ModemFilter::Imei(String::new()));

        reg.on_object_added(fake(7), String::new());
        assert!((&mut pending).now_or_never().is_none());

        reg.on_object_added(fake(8), "111".into());
        assert!((&mut pending).now_or_never().is_none());
        assert!(reg.lock().pending.is_some());
    }

    #[tokio::test]
    async fn request_times_out_when_nothing_matches() {
        let reg = ObjectRegistry::<Fake>::new();
        let pending = reg.await_object(ModemFilter::Imei("X".into()));
        reg.on_object_added(fake(0), "Y".into());

        let result = pending.within(Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(ModemError::Timeout)));
    }

    #[tokio::test]
    async fn request_resolved_before_timeout_returns_object() {
        let reg = ObjectRegistry::new();
        let pending = reg.await_object(ModemFilter::Imei("X".into()));
        reg.on_object_added(fake(0), "X".into());

        let object = pending.within(Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(object, fake(0));
    }

    #[tokio::test]
    async fn cancellation_wins_over_timeout() {
        let reg = ObjectRegistry::<Fake>::new();
        let first = reg.await_object(ModemFilter::Any);
        let _second = reg.await_object(ModemFilter::Any);

        let result = first.within(Some(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(ModemError::Cancelled)));
    }

    #[test]
    fn non_matching_addition_keeps_request_pending() {
        let reg = ObjectRegistry::new();
        let mut pending = reg.await_object(ModemFilter::Imei("X".into()));

        reg.on_object_added(fake(0), "Y".into());
        assert!((&mut pending).now_or_never().is_none());
        assert!(reg.lock().pending.is_some());
    }
}
