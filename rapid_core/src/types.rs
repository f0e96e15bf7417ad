//! Core domain types for the emergency session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Emergencies and their lifecycle status
//! - Timers, including cycle-counted CPR timers
//! - Alerts raised during a shift

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Emergency Types
// ============================================================================

/// Category of emergency response
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    /// Cardiac arrest
    CodeBlue,
    CodeStroke,
    /// Behavioural emergency, and anything else without its own code
    CodeWhite,
    RapidResponse,
}

impl EmergencyKind {
    pub const ALL: [EmergencyKind; 4] = [
        EmergencyKind::CodeBlue,
        EmergencyKind::CodeStroke,
        EmergencyKind::CodeWhite,
        EmergencyKind::RapidResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyKind::CodeBlue => "code_blue",
            EmergencyKind::CodeStroke => "code_stroke",
            EmergencyKind::CodeWhite => "code_white",
            EmergencyKind::RapidResponse => "rapid_response",
        }
    }

    /// Timer kind used to track the overall duration of this emergency
    pub fn duration_timer_kind(&self) -> TimerKind {
        match self {
            EmergencyKind::CodeBlue => TimerKind::CodeBlue,
            EmergencyKind::CodeStroke => TimerKind::CodeStroke,
            EmergencyKind::CodeWhite | EmergencyKind::RapidResponse => TimerKind::RapidResponse,
        }
    }
}

impl fmt::Display for EmergencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmergencyKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "code_blue" | "cardiac_arrest" => Ok(EmergencyKind::CodeBlue),
            "code_stroke" | "stroke" => Ok(EmergencyKind::CodeStroke),
            "code_white" | "other" => Ok(EmergencyKind::CodeWhite),
            "rapid_response" | "rrt" => Ok(EmergencyKind::RapidResponse),
            other => Err(crate::Error::Other(format!(
                "Unknown emergency kind: {}",
                other
            ))),
        }
    }
}

/// Lifecycle status of an emergency
///
/// Transitions are one-way: `Active` moves to either terminal state and
/// never comes back.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    Active,
    Resolved,
    Transferred,
}

impl EmergencyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EmergencyStatus::Active)
    }
}

/// Optional patient details captured when an emergency is called
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PatientInfo {
    pub name: Option<String>,
    pub mrn: Option<String>,
    pub age: Option<u8>,
}

/// A tracked emergency event with its protocol checklist
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Emergency {
    pub id: Uuid,
    pub kind: EmergencyKind,
    pub started_at: DateTime<Utc>,
    pub status: EmergencyStatus,
    pub required_actions: Vec<String>,
    /// Completed labels in the order they were recorded, without duplicates
    pub completed_actions: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub patient: Option<PatientInfo>,
}

impl Emergency {
    pub fn is_active(&self) -> bool {
        self.status == EmergencyStatus::Active
    }

    pub fn is_completed(&self, label: &str) -> bool {
        self.completed_actions.iter().any(|a| a == label)
    }

    /// Required actions that have not been recorded yet, in checklist order
    pub fn outstanding_actions(&self) -> Vec<&str> {
        self.required_actions
            .iter()
            .filter(|a| !self.is_completed(a))
            .map(String::as_str)
            .collect()
    }
}

/// Parameters for activating an emergency
#[derive(Clone, Debug)]
pub struct ActivationRequest {
    pub kind: EmergencyKind,
    pub required_actions: Vec<String>,
    pub location: Option<String>,
    pub patient: Option<PatientInfo>,
}

impl ActivationRequest {
    pub fn new(kind: EmergencyKind, required_actions: Vec<String>) -> Self {
        Self {
            kind,
            required_actions,
            location: None,
            patient: None,
        }
    }
}

// ============================================================================
// Timer Types
// ============================================================================

/// Purpose of a timer
///
/// Only `Cpr` timers count cycles; every other kind is a plain stopwatch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    CodeBlue,
    CodeStroke,
    RapidResponse,
    Cpr,
    Medication,
}

impl TimerKind {
    pub fn counts_cycles(&self) -> bool {
        matches!(self, TimerKind::Cpr)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::CodeBlue => "code_blue",
            TimerKind::CodeStroke => "code_stroke",
            TimerKind::RapidResponse => "rapid_response",
            TimerKind::Cpr => "cpr",
            TimerKind::Medication => "medication",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "code_blue" => Ok(TimerKind::CodeBlue),
            "code_stroke" => Ok(TimerKind::CodeStroke),
            "rapid_response" => Ok(TimerKind::RapidResponse),
            "cpr" => Ok(TimerKind::Cpr),
            "medication" | "med" => Ok(TimerKind::Medication),
            other => Err(crate::Error::Other(format!("Unknown timer kind: {}", other))),
        }
    }
}

/// A running or stopped duration tracker
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timer {
    pub id: String,
    pub kind: TimerKind,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub running: bool,
    /// Completed cycles; `Some` only for cycle-counted timers
    #[serde(default)]
    pub cycles: Option<u32>,
}

// ============================================================================
// Alert Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Urgent,
    Warning,
}

impl FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "urgent" => Ok(Severity::Urgent),
            "warning" => Ok(Severity::Warning),
            other => Err(crate::Error::Other(format!("Unknown severity: {}", other))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}
