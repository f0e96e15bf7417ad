//! Timer registry: independently running and stopped timers.
//!
//! The registry never advances time by itself. An external driver (see
//! [`crate::ticker`]) reads a timer, computes the new elapsed value and
//! writes it back through [`TimerRegistry::advance`].

use crate::{Timer, TimerKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimerRegistry {
    timers: BTreeMap<String, Timer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer, generating an id unless one is supplied
    ///
    /// Starting with an id that already exists replaces that timer with a
    /// fresh one: elapsed returns to zero, cycles to zero, and it runs.
    pub fn start(&mut self, kind: TimerKind, explicit_id: Option<&str>) -> Timer {
        let id = explicit_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("timer_{}", Uuid::new_v4().simple()));

        let timer = Timer {
            id: id.clone(),
            kind,
            started_at: Utc::now(),
            elapsed_ms: 0,
            running: true,
            cycles: kind.counts_cycles().then_some(0),
        };

        if self.timers.insert(id.clone(), timer.clone()).is_some() {
            tracing::debug!("Restarted {} timer {} from zero", kind, id);
        } else {
            tracing::debug!("Started {} timer {}", kind, id);
        }
        timer
    }

    /// Stop a timer, freezing its elapsed value
    ///
    /// Idempotent; returns `false` for unknown or already stopped timers.
    pub fn stop(&mut self, timer_id: &str) -> bool {
        match self.timers.get_mut(timer_id) {
            Some(timer) if timer.running => {
                timer.running = false;
                tracing::debug!("Stopped timer {} at {}ms", timer_id, timer.elapsed_ms);
                true
            }
            _ => false,
        }
    }

    /// Set the absolute elapsed time of a running timer
    ///
    /// Stopped timers are frozen, so this is a no-op for them as well as
    /// for unknown ids.
    pub fn advance(&mut self, timer_id: &str, new_elapsed_ms: u64) -> bool {
        match self.timers.get_mut(timer_id) {
            Some(timer) if timer.running => {
                timer.elapsed_ms = new_elapsed_ms;
                true
            }
            Some(_) => {
                tracing::trace!("Timer {} is stopped, ignoring advance", timer_id);
                false
            }
            None => false,
        }
    }

    /// Count one more completed cycle on a cycle-counted timer
    pub fn increment_cycle(&mut self, timer_id: &str) -> bool {
        let Some(timer) = self.timers.get_mut(timer_id) else {
            return false;
        };

        match timer.cycles.as_mut() {
            Some(cycles) if timer.kind.counts_cycles() => {
                *cycles += 1;
                tracing::debug!("Timer {} cycle count now {}", timer_id, cycles);
                true
            }
            _ => {
                tracing::debug!("Timer {} does not count cycles", timer_id);
                false
            }
        }
    }

    /// Zero a timer's elapsed time and cycles, keeping its running state
    pub fn reset(&mut self, timer_id: &str) -> bool {
        let Some(timer) = self.timers.get_mut(timer_id) else {
            return false;
        };

        timer.elapsed_ms = 0;
        timer.started_at = Utc::now();
        if let Some(cycles) = timer.cycles.as_mut() {
            *cycles = 0;
        }
        tracing::debug!("Reset timer {} (running: {})", timer_id, timer.running);
        true
    }

    pub fn get(&self, timer_id: &str) -> Option<&Timer> {
        self.timers.get(timer_id)
    }

    /// Snapshot of all timers, ordered by id
    pub fn list(&self) -> Vec<Timer> {
        self.timers.values().cloned().collect()
    }

    /// First running timer of the given kind, by id order
    pub fn find_running(&self, kind: TimerKind) -> Option<&Timer> {
        self.timers.values().find(|t| t.kind == kind && t.running)
    }

    pub fn is_running(&self, timer_id: &str) -> bool {
        self.timers.get(timer_id).is_some_and(|t| t.running)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
