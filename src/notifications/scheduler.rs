// SPDX-License-Identifier: MPL-2.0
//! Deferred, cancellable retirement timers.
//!
//! A [`Scheduler`] runs a one-shot callback after a delay and hands back a
//! revocable [`TimerHandle`]. It never touches the store itself: the bus
//! supplies the callback and decides what firing means.
//!
//! Two implementations are provided:
//!
//! - [`TokioScheduler`] spawns one lightweight task per timer on a tokio
//!   runtime.
//! - [`ManualScheduler`] keeps a virtual clock that the owner advances,
//!   which suits a polled event loop (advance on every tick) and tests.

use super::id::NotificationId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Callback run when a timer elapses.
pub type OnFire = Box<dyn FnOnce(NotificationId) + Send + 'static>;

/// Opaque, revocable reference to a pending timer.
///
/// Cancelling is idempotent and safe after the timer already fired.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: NotificationId,
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(id: NotificationId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn revoke(&self) {
        self.token.cancel();
    }
}

/// Schedules one-shot callbacks.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Runs `on_fire(id)` once after `delay`, unless cancelled first.
    fn schedule(&self, id: NotificationId, delay: Duration, on_fire: OnFire) -> TimerHandle;

    /// Revokes a timer. A no-op if it already fired or was cancelled.
    fn cancel(&self, handle: &TimerHandle) {
        tracing::trace!(id = %handle.id, "timer revoked");
        handle.revoke();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// TokioScheduler
// =============================================================================

/// Runs each timer as a task racing `tokio::time::sleep` against its token.
#[derive(Debug)]
pub struct TokioScheduler {
    runtime: Handle,
    /// Parent of every handed-out token.
    root: CancellationToken,
}

impl TokioScheduler {
    /// Creates a scheduler on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| Error::NoRuntime(err.to_string()))?;
        Ok(Self::with_handle(runtime))
    }

    /// Creates a scheduler spawning onto an explicit runtime.
    #[must_use]
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            root: CancellationToken::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, id: NotificationId, delay: Duration, on_fire: OnFire) -> TimerHandle {
        let token = self.root.child_token();
        let guard = token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                () = guard.cancelled() => {
                    tracing::trace!(%id, "timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if !guard.is_cancelled() {
                        tracing::trace!(%id, ?delay, "timer fired");
                        on_fire(id);
                    }
                }
            }
        });
        TimerHandle::new(id, token)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

// =============================================================================
// ManualScheduler
// =============================================================================

struct PendingTimer {
    id: NotificationId,
    token: CancellationToken,
    on_fire: OnFire,
}

#[derive(Default)]
struct VirtualClock {
    now: Duration,
    next_key: u64,
    /// Keyed by deadline, then scheduling order.
    pending: BTreeMap<(Duration, u64), PendingTimer>,
}

impl VirtualClock {
    fn prune(&mut self) {
        self.pending.retain(|_, timer| !timer.token.is_cancelled());
    }
}

/// Virtual-clock scheduler driven by explicit calls to [`advance`](Self::advance).
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<VirtualClock>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the virtual time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        lock(&self.clock).now
    }

    /// Returns the number of timers that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.clock)
            .pending
            .values()
            .filter(|timer| !timer.token.is_cancelled())
            .count()
    }

    /// Moves the clock forward, firing every due timer in deadline order.
    ///
    /// Callbacks run without the clock locked, so they may schedule or
    /// cancel further timers; those are honoured within the same advance if
    /// they fall due. Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = lock(&self.clock).now.saturating_add(by);
        let mut fired = 0;
        loop {
            let due = {
                let mut clock = lock(&self.clock);
                let next_deadline = clock.pending.keys().next().map(|&(deadline, _)| deadline);
                match next_deadline {
                    Some(deadline) if deadline <= target => {
                        clock.now = clock.now.max(deadline);
                        clock.pending.pop_first().map(|(_, timer)| timer)
                    }
                    _ => {
                        clock.now = target;
                        None
                    }
                }
            };
            let Some(timer) = due else {
                break;
            };
            if timer.token.is_cancelled() {
                continue;
            }
            tracing::trace!(id = %timer.id, "virtual timer fired");
            (timer.on_fire)(timer.id);
            fired += 1;
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, id: NotificationId, delay: Duration, on_fire: OnFire) -> TimerHandle {
        let token = CancellationToken::new();
        let mut clock = lock(&self.clock);
        let deadline = clock.now.saturating_add(delay);
        let key = clock.next_key;
        clock.next_key += 1;
        clock.pending.insert(
            (deadline, key),
            PendingTimer {
                id,
                token: token.clone(),
                on_fire,
            },
        );
        TimerHandle::new(id, token)
    }

    fn cancel(&self, handle: &TimerHandle) {
        tracing::trace!(id = %handle.id, "virtual timer revoked");
        handle.revoke();
        lock(&self.clock).prune();
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}
