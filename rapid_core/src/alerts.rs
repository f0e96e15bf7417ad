//! Critical alerts raised during a shift.

use crate::{Alert, Severity};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only list of alerts with dismissal
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AlertLog {
    alerts: Vec<Alert>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: impl Into<String>, severity: Severity) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        };
        tracing::debug!("Alert {:?}: {}", alert.severity, alert.message);
        self.alerts.push(alert.clone());
        alert
    }

    pub fn dismiss(&mut self, alert_id: Uuid) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != alert_id);
        before != self.alerts.len()
    }

    /// Remove every alert, returning how many were cleared
    pub fn clear(&mut self) -> usize {
        let cleared = self.alerts.len();
        self.alerts.clear();
        cleared
    }

    pub fn list(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
