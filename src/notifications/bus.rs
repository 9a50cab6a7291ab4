// SPDX-License-Identifier: MPL-2.0
//! Notification lifecycle management.
//!
//! The `NotificationBus` is the single entry point for publishing and
//! dismissing notifications. It owns the store, the timer handles of every
//! active notification with a finite lifetime, and the scheduler those
//! handles come from. All of them sit behind one lock, so a publish, a
//! dismiss, or a fired timer each run as one uninterrupted step: the store
//! mutation, the timer bookkeeping and the subscriber broadcast happen
//! together.
//!
//! Subscribers may call back into the bus. A mutation requested from inside
//! a broadcast is queued and applied, in call order, as soon as the step
//! that triggered the broadcast has finished notifying. Reads inside a
//! callback see the snapshot being broadcast. Calls from other threads wait
//! for the whole step, queued mutations included.

use super::id::{IdGenerator, NotificationId};
use super::notification::{effective_duration, Notification, PublishOptions, Severity};
use super::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use super::store::{Store, SubscriberFn};
use crate::config::Config;
use crate::error::Result;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

thread_local! {
    /// Buses whose state lock is held further up this thread's stack.
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a bus as locked by the current thread until dropped.
struct Held(usize);

impl Held {
    fn enter(shared: &Shared) -> Self {
        let key = shared.key();
        HELD.with(|held| held.borrow_mut().push(key));
        Self(key)
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|&key| key == self.0) {
                held.remove(pos);
            }
        });
    }
}

/// Store plus the timer handle of each timed record.
#[derive(Debug, Default)]
struct BusState {
    store: Store,
    timers: HashMap<NotificationId, TimerHandle>,
}

/// A change to the bus state.
enum Mutation {
    Publish(Notification),
    Dismiss(NotificationId),
    DismissMany(Vec<NotificationId>),
    DismissAll,
    Teardown,
    Expire(NotificationId),
    Subscribe(u64, SubscriberFn),
    Unsubscribe(u64),
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish(record) => f.debug_tuple("Publish").field(record).finish(),
            Self::Dismiss(id) => f.debug_tuple("Dismiss").field(id).finish(),
            Self::DismissMany(ids) => f.debug_tuple("DismissMany").field(ids).finish(),
            Self::DismissAll => f.write_str("DismissAll"),
            Self::Teardown => f.write_str("Teardown"),
            Self::Expire(id) => f.debug_tuple("Expire").field(id).finish(),
            Self::Subscribe(key, _) => f.debug_tuple("Subscribe").field(key).finish(),
            Self::Unsubscribe(key) => f.debug_tuple("Unsubscribe").field(key).finish(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BusState>,
    /// Mutations requested from inside a broadcast, oldest first.
    deferred: Mutex<VecDeque<Mutation>>,
    /// Last broadcast snapshot, readable without the state lock.
    latest: watch::Receiver<Vec<Notification>>,
    next_subscriber: AtomicU64,
    scheduler: Arc<dyn Scheduler>,
    ids: IdGenerator,
    config: Config,
}

impl Shared {
    fn key(&self) -> usize {
        std::ptr::from_ref(self).addr()
    }

    /// Whether this thread is already inside a step on this bus.
    fn is_held(&self) -> bool {
        let key = self.key();
        HELD.with(|held| held.borrow().contains(&key))
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_deferred(&self) -> Option<Mutation> {
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Applies `mutation` as one step, or queues it when called from inside
    /// a broadcast on this thread. Returns `None` if it was queued.
    fn submit(self: &Arc<Self>, mutation: Mutation) -> Option<usize> {
        if self.is_held() {
            tracing::trace!(?mutation, "mutation queued behind current broadcast");
            self.deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(mutation);
            return None;
        }
        Some(self.step(|shared, state| shared.apply(state, mutation)))
    }

    /// Runs `f` under the state lock, then applies whatever its subscribers
    /// queued before releasing the lock.
    fn step<R>(self: &Arc<Self>, f: impl FnOnce(&Arc<Self>, &mut BusState) -> R) -> R {
        let mut state = self.lock();
        let _held = Held::enter(self);
        let result = f(self, &mut *state);
        while let Some(mutation) = self.next_deferred() {
            self.apply(&mut state, mutation);
        }
        result
    }

    /// Applies one mutation and returns how many records it retired.
    fn apply(self: &Arc<Self>, state: &mut BusState, mutation: Mutation) -> usize {
        match mutation {
            Mutation::Publish(record) => {
                self.insert(state, record);
                0
            }
            Mutation::Dismiss(id) => usize::from(self.dismiss_one(state, id)),
            Mutation::DismissMany(ids) => {
                self.dismiss_matching(state, |record| ids.contains(&record.id()))
            }
            Mutation::DismissAll => {
                self.cancel_timers(state);
                state.store.retire_where(|_| true).len()
            }
            Mutation::Teardown => {
                let cancelled = self.cancel_timers(state);
                let cleared = state.store.clear();
                tracing::debug!(cancelled, cleared, "notification bus torn down");
                cleared
            }
            Mutation::Expire(id) => usize::from(Self::retire_and_forget(state, id)),
            Mutation::Subscribe(key, callback) => {
                state.store.subscribe(key, callback);
                0
            }
            Mutation::Unsubscribe(key) => {
                state.store.unsubscribe(key);
                0
            }
        }
    }

    fn insert(self: &Arc<Self>, state: &mut BusState, record: Notification) {
        let id = record.id();
        let duration = record.duration();
        if let Err(err) = state.store.insert(record) {
            tracing::error!(%id, error = %err, "notification dropped");
            if cfg!(debug_assertions) {
                panic!("{err}");
            }
            return;
        }

        if let Some(delay) = duration {
            let bus = Arc::downgrade(self);
            let handle = self.scheduler.schedule(
                id,
                delay,
                Box::new(move |id| {
                    if let Some(shared) = bus.upgrade() {
                        shared.submit(Mutation::Expire(id));
                    }
                }),
            );
            state.timers.insert(id, handle);
        }
    }

    fn dismiss_one(&self, state: &mut BusState, id: NotificationId) -> bool {
        if let Some(handle) = state.timers.remove(&id) {
            self.scheduler.cancel(&handle);
        }
        let retired = state.store.retire(id).is_some();
        if retired {
            tracing::debug!(%id, "notification dismissed");
        } else {
            tracing::trace!(%id, "dismiss ignored, notification not active");
        }
        retired
    }

    fn dismiss_matching<F>(&self, state: &mut BusState, predicate: F) -> usize
    where
        F: FnMut(&Notification) -> bool,
    {
        let retired = state.store.retire_where(predicate);
        for record in &retired {
            if let Some(handle) = state.timers.remove(&record.id()) {
                self.scheduler.cancel(&handle);
            }
        }
        if !retired.is_empty() {
            tracing::debug!(count = retired.len(), "notifications dismissed");
        }
        retired.len()
    }

    /// Fired-timer path. The handle already fired, so it is only forgotten.
    fn retire_and_forget(state: &mut BusState, id: NotificationId) -> bool {
        state.timers.remove(&id);
        let retired = state.store.retire(id).is_some();
        if retired {
            tracing::debug!(%id, "notification expired");
        }
        retired
    }

    fn cancel_timers(&self, state: &mut BusState) -> usize {
        let count = state.timers.len();
        for (_, handle) in state.timers.drain() {
            self.scheduler.cancel(&handle);
        }
        count
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in state.timers.drain() {
            self.scheduler.cancel(&handle);
        }
    }
}

/// Publishes, tracks and retires notifications.
///
/// Cloning is cheap; every clone refers to the same bus.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    shared: Arc<Shared>,
}

impl NotificationBus {
    /// Creates an empty bus whose timers run on `scheduler`.
    #[must_use]
    pub fn new(config: Config, scheduler: Arc<dyn Scheduler>) -> Self {
        let state = BusState::default();
        let latest = state.store.watch();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                deferred: Mutex::new(VecDeque::new()),
                latest,
                next_subscriber: AtomicU64::new(0),
                scheduler,
                ids: IdGenerator::new(),
                config,
            }),
        }
    }

    /// Creates an empty bus whose timers run on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`](crate::error::Error::NoRuntime) when
    /// called outside a tokio runtime.
    pub fn with_tokio(config: Config) -> Result<Self> {
        Ok(Self::new(config, Arc::new(TokioScheduler::new()?)))
    }

    /// Returns the configuration the bus resolves default durations from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Publishes a notification and returns its id.
    ///
    /// Never fails: the kind was already normalized when the options were
    /// built, a missing duration falls back to the kind's default, and a
    /// non-positive one makes the notification persistent.
    pub fn publish(&self, options: PublishOptions) -> NotificationId {
        let PublishOptions {
            kind,
            message,
            duration_ms,
        } = options;
        let duration = effective_duration(duration_ms, self.shared.config.duration_for(kind));
        let id = self.shared.ids.next();

        // Warnings and errors double as diagnostics.
        match kind {
            Severity::Warning => tracing::warn!(%id, %message, "warning notification"),
            Severity::Error => tracing::error!(%id, %message, "error notification"),
            Severity::Success | Severity::Info => {
                tracing::debug!(%id, %kind, ?duration, "notification published");
            }
        }

        self.shared
            .submit(Mutation::Publish(Notification::new(id, kind, message, duration)));
        id
    }

    pub fn success(&self, message: impl Into<String>, duration_ms: Option<i64>) -> NotificationId {
        self.publish_kind(Severity::Success, message, duration_ms)
    }

    /// Publishes an error. Errors default to the longest lifetime.
    pub fn error(&self, message: impl Into<String>, duration_ms: Option<i64>) -> NotificationId {
        self.publish_kind(Severity::Error, message, duration_ms)
    }

    pub fn warning(&self, message: impl Into<String>, duration_ms: Option<i64>) -> NotificationId {
        self.publish_kind(Severity::Warning, message, duration_ms)
    }

    pub fn info(&self, message: impl Into<String>, duration_ms: Option<i64>) -> NotificationId {
        self.publish_kind(Severity::Info, message, duration_ms)
    }

    fn publish_kind(
        &self,
        kind: Severity,
        message: impl Into<String>,
        duration_ms: Option<i64>,
    ) -> NotificationId {
        self.publish(PublishOptions {
            kind,
            message: message.into(),
            duration_ms,
        })
    }

    /// Retires a notification and cancels its timer.
    ///
    /// Unknown, expired or already dismissed ids are ignored.
    pub fn dismiss(&self, id: NotificationId) {
        self.shared.submit(Mutation::Dismiss(id));
    }

    /// Retires every notification matching `predicate` and cancels their
    /// timers. Returns how many were retired.
    ///
    /// From inside a subscriber callback the predicate is evaluated against
    /// the snapshot being broadcast.
    pub fn dismiss_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&Notification) -> bool,
    {
        if self.shared.is_held() {
            let ids: Vec<_> = self
                .snapshot()
                .iter()
                .filter(|&record| predicate(record))
                .map(Notification::id)
                .collect();
            let count = ids.len();
            if count > 0 {
                self.shared.submit(Mutation::DismissMany(ids));
            }
            return count;
        }
        self.shared
            .step(move |shared, state| shared.dismiss_matching(state, predicate))
    }

    /// Retires every active notification and cancels all timers.
    pub fn dismiss_all(&self) -> usize {
        self.shared
            .submit(Mutation::DismissAll)
            .unwrap_or_else(|| self.len())
    }

    /// Cancels every outstanding timer, then clears the store.
    ///
    /// Subscribers receive an empty snapshot. The bus stays usable and
    /// behaves as freshly initialized afterwards.
    pub fn teardown(&self) {
        self.shared.submit(Mutation::Teardown);
    }

    /// Registers a callback receiving the ordered snapshot on every change.
    ///
    /// The callback runs while the bus is locked, so it should hand the
    /// snapshot off rather than do heavy work. Calls it makes back into the
    /// bus are applied once the current broadcast has finished.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Notification]) + Send + 'static,
    {
        let key = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.shared.submit(Mutation::Subscribe(key, Box::new(callback)));
        Subscription {
            key,
            bus: Arc::downgrade(&self.shared),
            active: AtomicBool::new(true),
        }
    }

    /// Returns a receiver always holding the latest snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Vec<Notification>> {
        let mut rx = self.shared.latest.clone();
        rx.mark_unchanged();
        rx
    }

    /// Returns the active notifications in publish order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.shared.latest.borrow().clone()
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.shared
            .latest
            .borrow()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.latest.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.latest.borrow().is_empty()
    }

    /// Returns the number of timers still waiting to retire a notification.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        if self.shared.is_held() {
            // One timer per timed record between steps.
            return self
                .shared
                .latest
                .borrow()
                .iter()
                .filter(|record| !record.is_persistent())
                .count();
        }
        self.shared.lock().timers.len()
    }
}

/// Registration returned by [`NotificationBus::subscribe`].
///
/// Dropping it leaves the callback registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    key: u64,
    bus: Weak<Shared>,
    active: AtomicBool,
}

impl Subscription {
    /// Removes the callback. Safe to call repeatedly, after the bus is gone,
    /// and from inside the callback itself.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.bus.upgrade() {
            shared.submit(Mutation::Unsubscribe(self.key));
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.bus.strong_count() > 0
    }
}
