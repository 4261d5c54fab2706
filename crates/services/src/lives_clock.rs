//! Lives bookkeeping plus the single pending regeneration timer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use practice_core::Clock;
use practice_core::model::{LivesError, LivesState, RegenSchedule};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Called when a life is expected back; usually re-fetches the authoritative count.
pub type RegenHook = Arc<dyn Fn() + Send + Sync>;

/// Holds the learner's lives and at most one armed regeneration timer.
///
/// Counts only ever come from the caller (`load` / `consume`); firing the
/// timer runs the hook and leaves the count alone. Dropping the clock cancels
/// the timer.
pub struct LivesClock {
    clock: Clock,
    state: LivesState,
    hook: RegenHook,
    pending: Option<JoinHandle<()>>,
    stale: bool,
}

impl LivesClock {
    #[must_use]
    pub fn new(clock: Clock, hook: RegenHook) -> Self {
        Self {
            clock,
            state: LivesState::default(),
            hook,
            pending: None,
            stale: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LivesState {
        &self.state
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.state.current()
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.state.max()
    }

    /// The loaded regeneration instant already passed; the count may be behind
    /// the authoritative one until the next `load`.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Replace the state with values read from the lives store.
    ///
    /// # Errors
    ///
    /// Returns `LivesError` for inconsistent values; the previous state and
    /// timer are kept in that case.
    pub fn load(
        &mut self,
        current: u32,
        max: u32,
        next_regen: RegenSchedule,
    ) -> Result<(), LivesError> {
        self.replace(LivesState::new(current, max, next_regen.instant())?, next_regen);
        Ok(())
    }

    /// Apply the count returned by an answer submission.
    ///
    /// # Errors
    ///
    /// Returns `LivesError::CurrentExceedsMax` if the count is above the
    /// current maximum; nothing changes in that case.
    pub fn consume(&mut self, new_current: u32, next_regen: RegenSchedule) -> Result<(), LivesError> {
        self.check_consume(new_current)?;
        let max = self.state.max();
        self.load(new_current, max, next_regen)
    }

    /// Check that `new_current` would be accepted by [`LivesClock::consume`].
    ///
    /// # Errors
    ///
    /// Returns `LivesError::CurrentExceedsMax` if the count is above the
    /// current maximum.
    pub fn check_consume(&self, new_current: u32) -> Result<(), LivesError> {
        let max = self.state.max();
        if new_current > max {
            return Err(LivesError::CurrentExceedsMax {
                current: new_current,
                max,
            });
        }
        Ok(())
    }

    fn replace(&mut self, state: LivesState, next_regen: RegenSchedule) {
        let next_regen = if state.is_full() {
            RegenSchedule::Idle
        } else {
            next_regen
        };
        self.stale = next_regen.is_due(self.clock.now());
        if self.stale {
            tracing::debug!(current = state.current(), "lives loaded with an elapsed regeneration");
        }
        self.state = state;
        self.schedule_regeneration(next_regen);
    }

    /// Cancel any pending timer, then arm one for `at`.
    ///
    /// An elapsed or unreadable instant runs the hook right away instead.
    pub fn schedule_regeneration(&mut self, at: RegenSchedule) {
        self.cancel();
        match at {
            RegenSchedule::Idle => {}
            RegenSchedule::Due => self.fire(),
            RegenSchedule::At(instant) => match self.clock.delay_until(instant) {
                Some(delay) => self.arm(delay),
                None => self.fire(),
            },
        }
    }

    fn fire(&self) {
        tracing::debug!("regeneration due now");
        (self.hook)();
    }

    fn arm(&mut self, delay: Duration) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(?delay, "no async runtime, regeneration timer not armed");
            return;
        };
        let hook = Arc::clone(&self.hook);
        tracing::debug!(?delay, "regeneration timer armed");
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            hook();
        }));
    }

    /// Drop the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// A timer is armed and has not fired yet.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for LivesClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for LivesClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivesClock")
            .field("state", &self.state)
            .field("pending", &self.has_pending())
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use practice_core::time::{fixed_clock, fixed_now};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_clock() -> (LivesClock, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let hook: RegenHook = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (LivesClock::new(fixed_clock(), hook), fired)
    }

    #[test]
    fn past_instant_fires_synchronously() {
        let (mut clock, fired) = counting_clock();
        clock.schedule_regeneration(RegenSchedule::At(fixed_now() - ChronoDuration::seconds(5)));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!clock.has_pending());
    }

    #[test]
    fn unreadable_instant_fires_synchronously() {
        let (mut clock, fired) = counting_clock();
        clock.schedule_regeneration(RegenSchedule::parse(Some("not a date")));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn load_with_elapsed_instant_marks_stale_without_changing_count() {
        let (mut clock, fired) = counting_clock();
        clock
            .load(1, 3, RegenSchedule::At(fixed_now() - ChronoDuration::minutes(1)))
            .unwrap();
        assert_eq!(clock.current(), 1);
        assert!(clock.is_stale());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        clock.load(2, 3, RegenSchedule::Idle).unwrap();
        assert!(!clock.is_stale());
    }

    #[test]
    fn invalid_consume_keeps_previous_state() {
        let (mut clock, _) = counting_clock();
        clock.load(2, 3, RegenSchedule::Idle).unwrap();
        assert_eq!(
            clock.check_consume(5),
            Err(LivesError::CurrentExceedsMax { current: 5, max: 3 })
        );
        assert_eq!(clock.check_consume(3), Ok(()));
        let err = clock.consume(5, RegenSchedule::Idle).unwrap_err();
        assert_eq!(err, LivesError::CurrentExceedsMax { current: 5, max: 3 });
        assert_eq!(clock.current(), 2);
    }

    #[test]
    fn full_lives_never_schedule() {
        let (mut clock, fired) = counting_clock();
        clock.load(3, 3, RegenSchedule::Due).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(clock.state().next_regen_at(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn future_instant_fires_once_after_delay() {
        let (mut clock, fired) = counting_clock();
        clock.consume(2, RegenSchedule::At(fixed_now() + ChronoDuration::seconds(60))).unwrap();
        assert!(clock.has_pending());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!clock.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_timer() {
        let (mut clock, fired) = counting_clock();
        clock.consume(2, RegenSchedule::At(fixed_now() + ChronoDuration::seconds(10))).unwrap();
        clock.consume(1, RegenSchedule::At(fixed_now() + ChronoDuration::seconds(30))).unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_prevent_late_callbacks() {
        let (mut clock, fired) = counting_clock();
        clock.consume(2, RegenSchedule::At(fixed_now() + ChronoDuration::seconds(10))).unwrap();
        clock.cancel();
        assert!(!clock.has_pending());

        let (mut dropped, dropped_fired) = counting_clock();
        dropped.consume(2, RegenSchedule::At(fixed_now() + ChronoDuration::seconds(10))).unwrap();
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(dropped_fired.load(Ordering::SeqCst), 0);
    }
}
