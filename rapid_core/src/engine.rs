//! Command layer over the shift registries.
//!
//! Each user-facing command maps onto one or more registry calls. This is
//! the only place that looks at both registries, and it keeps them
//! consistent:
//!
//! 1. **Check-then-create-or-update**: a protocol action for a kind with an
//!    active emergency is routed into that emergency's checklist; with none
//!    active, the emergency is created first. [`Engine::route_action`] is
//!    the single routine for this, used by every protocol command.
//! 2. **Timer association by id**: timers that belong to an emergency get
//!    ids derived from its uuid, so neither registry holds references into
//!    the other.
//! 3. **Interval prompts**: ticks on CPR and code-duration timers raise
//!    alerts at the configured intervals.

use crate::config::TimerSettings;
use crate::format::format_elapsed;
use crate::protocols::{protocol_for, START_CPR};
use crate::state::ShiftState;
use crate::ticker::{Tick, Ticker};
use crate::{ActivationRequest, Alert, Emergency, EmergencyKind, Severity, Timer, TimerKind};
use uuid::Uuid;

/// Result of a "start CPR" command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CprOutcome {
    pub emergency_id: Uuid,
    pub timer_id: String,
    /// True when a fresh CPR timer was started rather than a cycle counted
    pub timer_started: bool,
    pub cycles: u32,
}

pub struct Engine {
    state: ShiftState,
    settings: TimerSettings,
}

impl Engine {
    pub fn new(settings: TimerSettings) -> Self {
        Self::with_state(ShiftState::default(), settings)
    }

    pub fn with_state(state: ShiftState, settings: TimerSettings) -> Self {
        Self { state, settings }
    }

    pub fn state(&self) -> &ShiftState {
        &self.state
    }

    pub fn into_state(self) -> ShiftState {
        self.state
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Id of the timer tracking the overall duration of an emergency
    pub fn duration_timer_id(emergency_id: Uuid) -> String {
        format!("code-{}", emergency_id)
    }

    /// Id of the CPR cycle timer of an emergency
    pub fn cpr_timer_id(emergency_id: Uuid) -> String {
        format!("cpr-{}", emergency_id)
    }

    // ------------------------------------------------------------------
    // Emergencies
    // ------------------------------------------------------------------

    /// Activate a new emergency unconditionally
    ///
    /// Starts its duration timer when `auto_start_timers` is set.
    pub fn activate(&mut self, request: ActivationRequest) -> Emergency {
        let emergency = self.state.sessions.activate_with(request);
        tracing::info!("Activated {} response {}", emergency.kind, emergency.id);

        if self.settings.auto_start_timers {
            self.state.timers.start(
                emergency.kind.duration_timer_kind(),
                Some(&Self::duration_timer_id(emergency.id)),
            );
        }

        self.state.touch();
        emergency
    }

    /// Return the active emergency of `kind`, creating it if there is none
    pub fn begin_response(&mut self, kind: EmergencyKind) -> Emergency {
        if let Some(existing) = self.state.sessions.find_active(kind) {
            tracing::debug!("Joining active {} response {}", kind, existing.id);
            return existing.clone();
        }

        let checklist = protocol_for(kind).checklist();
        self.activate(ActivationRequest::new(kind, checklist))
    }

    /// Record a protocol action against the active emergency of `kind`
    ///
    /// Creates the emergency first when none is active. Returns the
    /// emergency as it stands after the action.
    pub fn route_action(&mut self, kind: EmergencyKind, label: &str) -> Emergency {
        let mut emergency = self.begin_response(kind);
        if self.complete_action(emergency.id, label) {
            emergency.completed_actions.push(label.to_string());
        }
        emergency
    }

    /// Start CPR for the active emergency of `kind`
    ///
    /// The first press starts the emergency's CPR timer; presses while it
    /// runs count another cycle. A stopped CPR timer is restarted fresh.
    pub fn start_cpr(&mut self, kind: EmergencyKind) -> CprOutcome {
        let emergency_id = self.route_action(kind, START_CPR).id;
        let timer_id = Self::cpr_timer_id(emergency_id);

        let timer_started = if self.state.timers.is_running(&timer_id) {
            self.state.timers.increment_cycle(&timer_id);
            false
        } else {
            self.state.timers.start(TimerKind::Cpr, Some(&timer_id));
            true
        };
        self.state.touch();

        let cycles = self
            .state
            .timers
            .get(&timer_id)
            .and_then(|t| t.cycles)
            .unwrap_or(0);
        tracing::info!(
            "CPR for {}: {} (cycles: {})",
            emergency_id,
            if timer_started { "timer started" } else { "cycle counted" },
            cycles
        );

        CprOutcome {
            emergency_id,
            timer_id,
            timer_started,
            cycles,
        }
    }

    pub fn complete_action(&mut self, emergency_id: Uuid, label: &str) -> bool {
        let changed = self.state.sessions.record_action_completed(emergency_id, label);
        if changed {
            self.state.touch();
        }
        changed
    }

    /// Resolve an emergency and stop the timers linked to it
    pub fn resolve(&mut self, emergency_id: Uuid) -> bool {
        let changed = self.state.sessions.resolve(emergency_id);
        if changed {
            self.stop_linked_timers(emergency_id);
            self.state.touch();
        }
        changed
    }

    /// Mark an emergency transferred and stop the timers linked to it
    pub fn transfer(&mut self, emergency_id: Uuid) -> bool {
        let changed = self.state.sessions.transfer(emergency_id);
        if changed {
            self.stop_linked_timers(emergency_id);
            self.state.touch();
        }
        changed
    }

    fn stop_linked_timers(&mut self, emergency_id: Uuid) {
        for timer_id in [
            Self::duration_timer_id(emergency_id),
            Self::cpr_timer_id(emergency_id),
        ] {
            self.state.timers.stop(&timer_id);
        }
    }

    /// Timers linked to an emergency by derived id
    pub fn timers_for(&self, emergency_id: Uuid) -> Vec<Timer> {
        [
            Self::duration_timer_id(emergency_id),
            Self::cpr_timer_id(emergency_id),
        ]
        .iter()
        .filter_map(|id| self.state.timers.get(id).cloned())
        .collect()
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub fn start_timer(&mut self, kind: TimerKind, explicit_id: Option<&str>) -> Timer {
        let timer = self.state.timers.start(kind, explicit_id);
        self.state.touch();
        timer
    }

    pub fn stop_timer(&mut self, timer_id: &str) -> bool {
        self.touch_if(|state| state.timers.stop(timer_id))
    }

    /// Set a timer's elapsed time directly
    ///
    /// Elapsed updates are high-frequency and do not bump `last_updated`.
    pub fn advance_timer(&mut self, timer_id: &str, elapsed_ms: u64) -> bool {
        self.state.timers.advance(timer_id, elapsed_ms)
    }

    pub fn increment_cycle(&mut self, timer_id: &str) -> bool {
        self.touch_if(|state| state.timers.increment_cycle(timer_id))
    }

    pub fn reset_timer(&mut self, timer_id: &str) -> bool {
        self.touch_if(|state| state.timers.reset(timer_id))
    }

    /// Drive the ticker forward and raise any interval prompts that fall due
    pub fn run_ticks(&mut self, ticker: &mut Ticker, delta_ms: u64) -> Vec<Tick> {
        let ticks = ticker.advance_clock(&mut self.state.timers, delta_ms);
        for tick in &ticks {
            self.on_tick(tick);
        }
        ticks
    }

    /// Raise prompts for interval boundaries crossed by one tick
    pub fn on_tick(&mut self, tick: &Tick) -> Vec<Alert> {
        let Some(kind) = self.state.timers.get(&tick.timer_id).map(|t| t.kind) else {
            return Vec::new();
        };

        let mut raised = Vec::new();
        match kind {
            TimerKind::Cpr => {
                let cycle_ms = self.settings.cpr_interval_secs.saturating_mul(1000);
                let lead_ms = self.settings.alert_before_interval_secs.saturating_mul(1000);
                let warn_at = cycle_ms.saturating_sub(lead_ms);
                let before = boundaries_reached(tick.previous_ms, warn_at, cycle_ms);
                let after = boundaries_reached(tick.elapsed_ms, warn_at, cycle_ms);
                if after > before {
                    raised.push(self.raise_alert(
                        format!(
                            "CPR cycle {} ends in {}s: prepare for rhythm check",
                            after, self.settings.alert_before_interval_secs
                        ),
                        Severity::Urgent,
                    ));
                }
            }
            TimerKind::CodeBlue => {
                let interval_ms = self.settings.medication_interval_secs.saturating_mul(1000);
                let before = boundaries_reached(tick.previous_ms, interval_ms, interval_ms);
                let after = boundaries_reached(tick.elapsed_ms, interval_ms, interval_ms);
                if after > before {
                    raised.push(self.raise_alert(
                        format!(
                            "{} into code: epinephrine due",
                            format_elapsed(tick.elapsed_ms, false)
                        ),
                        Severity::Warning,
                    ));
                }
            }
            _ => {}
        }
        raised
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    pub fn raise_alert(&mut self, message: impl Into<String>, severity: Severity) -> Alert {
        let alert = self.state.alerts.add(message, severity);
        self.state.touch();
        alert
    }

    pub fn dismiss_alert(&mut self, alert_id: Uuid) -> bool {
        self.touch_if(|state| state.alerts.dismiss(alert_id))
    }

    pub fn clear_alerts(&mut self) -> usize {
        let cleared = self.state.alerts.clear();
        self.state.touch();
        cleared
    }

    fn touch_if(&mut self, op: impl FnOnce(&mut ShiftState) -> bool) -> bool {
        let changed = op(&mut self.state);
        if changed {
            self.state.touch();
        }
        changed
    }
}

/// Number of points `first, first + period, first + 2*period, ...` at or below `elapsed_ms`
fn boundaries_reached(elapsed_ms: u64, first: u64, period: u64) -> u64 {
    if period == 0 || elapsed_ms < first {
        0
    } else {
        (elapsed_ms - first) / period + 1
    }
}
