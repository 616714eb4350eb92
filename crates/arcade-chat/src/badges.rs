//! Badge recompute scheduling.
//!
//! `trigger` can be called on every mutation. The scheduler decides whether a
//! recompute runs now:
//!
//! - a trigger during an in-flight recompute never starts a second one,
//! - completed recomputes are at least `min_gap` apart; early triggers are
//!   dropped rather than queued,
//! - any dropped trigger (re)arms a single trailing timer `coalesce_delay`
//!   after the latest one, never before the gap ends, so the final state of a
//!   burst is always pushed,
//! - a periodic tick triggers as a safety net against missed pushes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use tracing::trace;

use arcade_shared::constants::{BADGE_COALESCE_MS, BADGE_MIN_GAP_MS, BADGE_TICK_MS};
use arcade_shared::UserId;

use crate::notifications::NotificationCenter;
use crate::presence::PresenceTracker;
use crate::timers::{TimerHandle, Timers};
use crate::unread::UnreadTracker;

#[derive(Debug, Clone, Copy)]
pub struct BadgeConfig {
    pub min_gap: Duration,
    pub coalesce_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            min_gap: Duration::from_millis(BADGE_MIN_GAP_MS),
            coalesce_delay: Duration::from_millis(BADGE_COALESCE_MS),
            tick_interval: Duration::from_millis(BADGE_TICK_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadgeTimer {
    Trailing,
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The caller must recompute now and then call [`BadgeScheduler::complete`].
    Run,
    /// A recompute is already running.
    InFlight,
    /// Too soon after the previous recompute.
    Throttled,
}

/// Every derived badge value at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeSnapshot {
    pub main: u32,
    /// Per-user counts for every user with a badge element: online users and
    /// anyone with unread messages.
    pub users: BTreeMap<UserId, u32>,
    pub notifications: u32,
}

impl BadgeSnapshot {
    pub fn compute(
        unread: &UnreadTracker,
        presence: &PresenceTracker,
        notifications: &NotificationCenter,
    ) -> Self {
        let mut users: BTreeMap<UserId, u32> = presence
            .online_ids()
            .into_iter()
            .map(|id| (id, 0))
            .collect();
        for entry in unread.entries() {
            users.insert(entry.peer_id, entry.count);
        }

        Self {
            main: unread.total(),
            users,
            notifications: notifications.unread_count(),
        }
    }
}

#[derive(Debug)]
pub struct BadgeScheduler {
    config: BadgeConfig,
    timers: Timers<BadgeTimer>,
    in_flight: bool,
    pending: bool,
    last_completed: Option<Instant>,
    trailing: Option<TimerHandle>,
    tick: Option<TimerHandle>,
    shown_users: BTreeSet<UserId>,
}

impl BadgeScheduler {
    pub fn new(config: BadgeConfig) -> Self {
        Self {
            config,
            timers: Timers::new(),
            in_flight: false,
            pending: false,
            last_completed: None,
            trailing: None,
            tick: None,
            shown_users: BTreeSet::new(),
        }
    }

    /// Arm the periodic safety tick.
    pub fn start(&mut self, now: Instant) {
        if self.tick.is_none() {
            self.tick = Some(
                self.timers
                    .schedule(now, self.config.tick_interval, BadgeTimer::Tick),
            );
        }
    }

    pub fn stop(&mut self) {
        self.timers.clear();
        self.tick = None;
        self.trailing = None;
        self.pending = false;
    }

    pub fn trigger(&mut self, now: Instant) -> TriggerOutcome {
        if self.in_flight {
            self.defer(now);
            return TriggerOutcome::InFlight;
        }

        if let Some(last) = self.last_completed {
            if now.duration_since(last) < self.config.min_gap {
                self.defer(now);
                return TriggerOutcome::Throttled;
            }
        }

        self.in_flight = true;
        self.pending = false;
        if let Some(trailing) = self.trailing.take() {
            self.timers.cancel(trailing);
        }
        TriggerOutcome::Run
    }

    pub fn complete(&mut self, now: Instant) {
        self.in_flight = false;
        self.last_completed = Some(now);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    fn defer(&mut self, now: Instant) {
        self.pending = true;
        if let Some(previous) = self.trailing.take() {
            self.timers.cancel(previous);
        }

        let mut deadline = now + self.config.coalesce_delay;
        if let Some(last) = self.last_completed {
            deadline = deadline.max(last + self.config.min_gap);
        }
        trace!(delay_ms = (deadline - now).as_millis() as u64, "Badge refresh deferred");
        self.trailing = Some(self.timers.schedule_at(deadline, BadgeTimer::Trailing));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire due timers. Returns `true` if the caller should `trigger` now.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut wants_trigger = false;

        for timer in self.timers.pop_due(now) {
            match timer {
                BadgeTimer::Trailing => {
                    self.trailing = None;
                    wants_trigger |= self.pending;
                }
                BadgeTimer::Tick => {
                    self.tick = Some(
                        self.timers
                            .schedule(now, self.config.tick_interval, BadgeTimer::Tick),
                    );
                    wants_trigger = true;
                }
            }
        }

        wants_trigger
    }

    /// Per-user badge pushes for a snapshot: every user in it, plus a zero
    /// for users shown last time that no longer have a badge.
    pub fn user_updates(&mut self, snapshot: &BadgeSnapshot) -> Vec<(UserId, u32)> {
        let mut updates: Vec<(UserId, u32)> =
            snapshot.users.iter().map(|(id, count)| (*id, *count)).collect();
        updates.extend(
            self.shown_users
                .iter()
                .filter(|id| !snapshot.users.contains_key(id))
                .map(|id| (*id, 0)),
        );
        self.shown_users = snapshot.users.keys().copied().collect();
        updates
    }
}

impl Default for BadgeScheduler {
    fn default() -> Self {
        Self::new(BadgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn run(scheduler: &mut BadgeScheduler, now: Instant) -> TriggerOutcome {
        let outcome = scheduler.trigger(now);
        if outcome == TriggerOutcome::Run {
            scheduler.complete(now);
        }
        outcome
    }

    #[test]
    fn test_first_trigger_runs() {
        let mut scheduler = BadgeScheduler::default();
        assert_eq!(scheduler.trigger(Instant::now()), TriggerOutcome::Run);
        assert!(scheduler.is_in_flight());
    }

    #[test]
    fn test_in_flight_blocks_reentry() {
        let mut scheduler = BadgeScheduler::default();
        let t0 = Instant::now();

        assert_eq!(scheduler.trigger(t0), TriggerOutcome::Run);
        assert_eq!(scheduler.trigger(t0), TriggerOutcome::InFlight);
        scheduler.complete(t0);
        assert!(!scheduler.is_in_flight());
    }

    #[test]
    fn test_min_gap_drops_then_trailing_fires() {
        let mut scheduler = BadgeScheduler::default();
        let t0 = Instant::now();

        assert_eq!(run(&mut scheduler, t0), TriggerOutcome::Run);
        for i in 1..=5 {
            assert_eq!(run(&mut scheduler, t0 + ms(i * 50)), TriggerOutcome::Throttled);
        }

        // Trailing deadline is held back to the end of the gap.
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(1_000)));
        assert!(!scheduler.poll(t0 + ms(999)));
        assert!(scheduler.poll(t0 + ms(1_000)));
        assert_eq!(run(&mut scheduler, t0 + ms(1_000)), TriggerOutcome::Run);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_trailing_is_debounced_after_gap() {
        let mut scheduler = BadgeScheduler::default();
        let t0 = Instant::now();

        run(&mut scheduler, t0);
        run(&mut scheduler, t0 + ms(900));
        run(&mut scheduler, t0 + ms(950));
        // Latest trigger at 950ms pushes the trailing call to 1150ms.
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(1_150)));
    }

    #[test]
    fn test_run_cancels_pending_trailing() {
        let mut scheduler = BadgeScheduler::default();
        let t0 = Instant::now();

        run(&mut scheduler, t0);
        run(&mut scheduler, t0 + ms(100));
        assert!(scheduler.next_deadline().is_some());

        assert_eq!(run(&mut scheduler, t0 + ms(2_000)), TriggerOutcome::Run);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_periodic_tick_reschedules() {
        let mut scheduler = BadgeScheduler::default();
        let t0 = Instant::now();

        scheduler.start(t0);
        scheduler.start(t0);
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(5_000)));
        assert!(scheduler.poll(t0 + ms(5_000)));
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(10_000)));

        scheduler.stop();
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_user_updates_clear_stale_badges() {
        let mut scheduler = BadgeScheduler::default();
        let mut unread = UnreadTracker::new();
        let presence = PresenceTracker::new();
        let notifications = NotificationCenter::new();

        unread.increment(UserId(7), "bob", Utc::now());
        unread.increment(UserId(8), "eve", Utc::now());
        let snapshot = BadgeSnapshot::compute(&unread, &presence, &notifications);
        assert_eq!(snapshot.main, 2);
        assert_eq!(
            scheduler.user_updates(&snapshot),
            vec![(UserId(7), 1), (UserId(8), 1)]
        );

        unread.mark_read(UserId(7));
        let snapshot = BadgeSnapshot::compute(&unread, &presence, &notifications);
        assert_eq!(
            scheduler.user_updates(&snapshot),
            vec![(UserId(8), 1), (UserId(7), 0)]
        );
        assert_eq!(
            scheduler.user_updates(&snapshot),
            vec![(UserId(8), 1)]
        );
    }
}
