//! Periodic tick driver for running timers.
//!
//! The [`Ticker`] is the only thing that moves a timer's elapsed value.
//! It keeps at most one schedule per timer id against its own logical
//! clock. Each fire reads the timer, adds the interval, writes the sum back
//! through [`TimerRegistry::advance`] and reports a [`Tick`] to the caller.
//!
//! A schedule ends when:
//! - its [`TickHandle`] is cancelled,
//! - the timer is stopped through [`Ticker::stop`],
//! - the timer is found stopped or missing at fire time.
//!
//! Rescheduling a timer cancels the previous schedule first, so two ticks
//! for the same timer are never pending at once. A handle from an earlier
//! schedule cannot cancel a later one.

use crate::timers::TimerRegistry;
use std::collections::BTreeMap;

/// Tick granularity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickInterval {
    /// 1000ms, for MM:SS display
    Seconds,
    /// 10ms, for MM:SS.cc display
    Centiseconds,
}

impl TickInterval {
    pub fn millis(&self) -> u64 {
        match self {
            TickInterval::Seconds => 1_000,
            TickInterval::Centiseconds => 10,
        }
    }
}

/// Handle identifying one schedule of one timer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickHandle {
    timer_id: String,
    generation: u64,
}

impl TickHandle {
    pub fn timer_id(&self) -> &str {
        &self.timer_id
    }
}

/// Notification emitted for every applied tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tick {
    pub timer_id: String,
    pub previous_ms: u64,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug)]
struct Schedule {
    interval: TickInterval,
    generation: u64,
    next_due_ms: u64,
}

#[derive(Debug, Default)]
pub struct Ticker {
    schedules: BTreeMap<String, Schedule>,
    next_generation: u64,
    clock_ms: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin ticking `timer_id`, replacing any existing schedule for it
    pub fn schedule(&mut self, timer_id: &str, interval: TickInterval) -> TickHandle {
        self.next_generation += 1;
        let generation = self.next_generation;

        let previous = self.schedules.insert(
            timer_id.to_string(),
            Schedule {
                interval,
                generation,
                next_due_ms: self.clock_ms.saturating_add(interval.millis()),
            },
        );
        if previous.is_some() {
            tracing::debug!("Replaced tick schedule for timer {}", timer_id);
        } else {
            tracing::debug!("Scheduled {:?} ticks for timer {}", interval, timer_id);
        }

        TickHandle {
            timer_id: timer_id.to_string(),
            generation,
        }
    }

    /// Cancel the schedule `handle` was issued for
    ///
    /// Idempotent. Returns `false` if that schedule already ended or has
    /// been replaced.
    pub fn cancel(&mut self, handle: &TickHandle) -> bool {
        let current = self
            .schedules
            .get(&handle.timer_id)
            .is_some_and(|s| s.generation == handle.generation);
        if current {
            self.schedules.remove(&handle.timer_id);
            tracing::debug!("Cancelled tick schedule for timer {}", handle.timer_id);
        }
        current
    }

    /// Cancel whatever schedule exists for `timer_id`
    pub fn cancel_timer(&mut self, timer_id: &str) -> bool {
        self.schedules.remove(timer_id).is_some()
    }

    /// Cancel ticking and stop the timer itself
    pub fn stop(&mut self, timers: &mut TimerRegistry, timer_id: &str) -> bool {
        self.cancel_timer(timer_id);
        timers.stop(timer_id)
    }

    /// Drop every schedule, e.g. when the display is torn down
    pub fn cancel_all(&mut self) {
        self.schedules.clear();
    }

    pub fn is_scheduled(&self, timer_id: &str) -> bool {
        self.schedules.contains_key(timer_id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.schedules.len()
    }

    /// Milliseconds of logical time the ticker has been advanced by
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Fire one tick for `timer_id` immediately, outside the clock
    pub fn fire(&mut self, timers: &mut TimerRegistry, timer_id: &str) -> Option<Tick> {
        let interval = self.schedules.get(timer_id)?.interval;
        self.apply(timers, timer_id, interval)
    }

    /// Move the logical clock forward and fire every tick that falls due
    ///
    /// Ticks are applied in due order, ties broken by timer id.
    pub fn advance_clock(&mut self, timers: &mut TimerRegistry, delta_ms: u64) -> Vec<Tick> {
        let target = self.clock_ms.saturating_add(delta_ms);
        let mut ticks = Vec::new();

        while let Some((timer_id, due)) = self.next_due(target) {
            self.clock_ms = due;
            let (interval, next_due) = match self.schedules.get_mut(&timer_id) {
                Some(schedule) => {
                    let next_due = due.checked_add(schedule.interval.millis());
                    if let Some(next) = next_due {
                        schedule.next_due_ms = next;
                    }
                    (schedule.interval, next_due)
                }
                None => break,
            };
            if let Some(tick) = self.apply(timers, &timer_id, interval) {
                ticks.push(tick);
            }
            if next_due.is_none() {
                // The logical clock cannot go past u64::MAX
                self.schedules.remove(&timer_id);
            }
        }

        self.clock_ms = target;
        ticks
    }

    // Map iteration is in id order and min_by_key keeps the first minimum
    fn next_due(&self, limit_ms: u64) -> Option<(String, u64)> {
        self.schedules
            .iter()
            .filter(|(_, s)| s.next_due_ms <= limit_ms)
            .min_by_key(|(_, s)| s.next_due_ms)
            .map(|(id, s)| (id.clone(), s.next_due_ms))
    }

    fn apply(
        &mut self,
        timers: &mut TimerRegistry,
        timer_id: &str,
        interval: TickInterval,
    ) -> Option<Tick> {
        let previous_ms = match timers.get(timer_id) {
            Some(timer) if timer.running => timer.elapsed_ms,
            _ => {
                // Stopped or gone: the schedule must not outlive the timer
                self.schedules.remove(timer_id);
                tracing::debug!("Timer {} no longer running, tick schedule dropped", timer_id);
                return None;
            }
        };

        let elapsed_ms = previous_ms.saturating_add(interval.millis());
        timers.advance(timer_id, elapsed_ms);
        tracing::trace!("Tick {} -> {}ms", timer_id, elapsed_ms);

        Some(Tick {
            timer_id: timer_id.to_string(),
            previous_ms,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimerKind;

    fn running_timer(timers: &mut TimerRegistry, id: &str) {
        timers.start(TimerKind::CodeBlue, Some(id));
    }

    #[test]
    fn test_n_ticks_accumulate_exactly() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");
        ticker.schedule("code", TickInterval::Seconds);

        let ticks = ticker.advance_clock(&mut timers, 5_000);

        assert_eq!(ticks.len(), 5);
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 5_000);
        assert_eq!(ticks.last().unwrap().previous_ms, 4_000);
    }

    #[test]
    fn test_centisecond_ticks() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");
        ticker.schedule("code", TickInterval::Centiseconds);

        ticker.advance_clock(&mut timers, 1_234);

        // 123 whole ticks; the remaining 4ms has not fallen due
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 1_230);
        ticker.advance_clock(&mut timers, 6);
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 1_240);
    }

    #[test]
    fn test_stopped_timer_drops_schedule() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");
        ticker.schedule("code", TickInterval::Seconds);
        ticker.advance_clock(&mut timers, 2_000);

        // Stopped behind the ticker's back
        timers.stop("code");
        let ticks = ticker.advance_clock(&mut timers, 3_000);

        assert!(ticks.is_empty());
        assert!(!ticker.is_scheduled("code"));
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 2_000);
    }

    #[test]
    fn test_missing_timer_drops_schedule() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        ticker.schedule("ghost", TickInterval::Seconds);

        assert!(ticker.fire(&mut timers, "ghost").is_none());
        assert!(!ticker.is_scheduled("ghost"));
    }

    #[test]
    fn test_reschedule_replaces_previous_schedule() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");

        let stale = ticker.schedule("code", TickInterval::Seconds);
        let current = ticker.schedule("code", TickInterval::Seconds);
        assert_eq!(ticker.scheduled_count(), 1);

        // One schedule means one tick per interval, not two
        ticker.advance_clock(&mut timers, 1_000);
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 1_000);

        // A stale handle cannot cancel the replacement
        assert!(!ticker.cancel(&stale));
        assert!(ticker.is_scheduled("code"));

        assert!(ticker.cancel(&current));
        assert!(!ticker.cancel(&current));
        ticker.advance_clock(&mut timers, 5_000);
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 1_000);
    }

    #[test]
    fn test_stop_cancels_and_freezes() {
        crate::logging::init_test();
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");
        ticker.schedule("code", TickInterval::Seconds);
        ticker.advance_clock(&mut timers, 3_000);

        assert!(ticker.stop(&mut timers, "code"));
        assert!(!ticker.stop(&mut timers, "code"));
        assert!(ticker.fire(&mut timers, "code").is_none());
        assert_eq!(timers.get("code").unwrap().elapsed_ms, 3_000);
    }

    #[test]
    fn test_ticks_interleave_in_due_order() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "b");
        running_timer(&mut timers, "a");
        ticker.schedule("b", TickInterval::Seconds);
        ticker.schedule("a", TickInterval::Seconds);

        let order: Vec<String> = ticker
            .advance_clock(&mut timers, 2_000)
            .into_iter()
            .map(|t| t.timer_id)
            .collect();

        assert_eq!(order, vec!["a", "b", "a", "b"]);
        assert_eq!(ticker.clock_ms(), 2_000);
    }

    #[test]
    fn test_cancel_all_stops_every_schedule() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "a");
        running_timer(&mut timers, "b");
        ticker.schedule("a", TickInterval::Seconds);
        ticker.schedule("b", TickInterval::Centiseconds);
        ticker.advance_clock(&mut timers, 1_000);

        ticker.cancel_all();
        let ticks = ticker.advance_clock(&mut timers, 5_000);

        assert!(ticks.is_empty());
        assert_eq!(ticker.scheduled_count(), 0);
        assert_eq!(timers.get("a").unwrap().elapsed_ms, 1_000);
        assert_eq!(timers.get("b").unwrap().elapsed_ms, 1_000);
        // The timers themselves keep running
        assert!(timers.is_running("a"));
    }

    #[test]
    fn test_clock_saturates_at_max() {
        let mut timers = TimerRegistry::new();
        let mut ticker = Ticker::new();
        running_timer(&mut timers, "code");
        ticker.advance_clock(&mut timers, u64::MAX - 1_500);
        ticker.schedule("code", TickInterval::Seconds);

        let ticks = ticker.advance_clock(&mut timers, u64::MAX);

        assert_eq!(ticks.len(), 1);
        assert_eq!(ticker.clock_ms(), u64::MAX);
        assert!(!ticker.is_scheduled("code"));
    }
}
